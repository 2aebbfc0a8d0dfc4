//! Cross-scenario analysis: comparison, demographic summary and unreachable
//! population, plus the stage runners that read and write the analysis
//! directory.

pub mod analyzer;
pub mod compare;
pub mod summary;
pub mod types;
pub mod unreachable;
pub mod utility;
