pub mod analyzers;
pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod metrics;
pub mod output;
pub mod parser;
pub mod quality;
pub mod table;
pub mod validate;
pub mod zone;
