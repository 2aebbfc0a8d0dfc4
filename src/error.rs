//! Error taxonomy for the metrics engine.
//!
//! Configuration and input problems are hard errors. Data-quality findings are
//! not errors at all; see [`crate::quality`].

use std::path::PathBuf;
use thiserror::Error;

/// Problems with the analysis configuration or with how it refers to the input tables.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("opportunity '{opportunity}' declares unknown method '{method}'")]
    UnknownMethod { opportunity: String, method: String },

    #[error("opportunity '{opportunity}' has an empty parameter list")]
    EmptyParameters { opportunity: String },

    #[error("opportunity '{opportunity}' has non-positive parameter {value}")]
    InvalidParameter { opportunity: String, value: i64 },

    #[error("opportunity '{opportunity}' is not a column of the opportunity table")]
    MissingOpportunity { opportunity: String },

    #[error("demographic category '{category}' is not a column of the demographics table")]
    MissingDemographic { category: String },

    #[error("scenario '{scenario}' has invalid start_datetime '{value}' (expected %Y-%m-%d %H:%M)")]
    InvalidDatetime { scenario: String, value: String },

    #[error("scenario '{scenario}' lists unknown transit mode '{mode}'")]
    UnknownTransitMode { scenario: String, mode: String },

    #[error("configuration declares no scenarios")]
    NoScenarios,

    #[error("infinity_value must be positive, got {0}")]
    InvalidInfinity(i64),

    #[error("zone_id_width must be positive")]
    InvalidZoneWidth,

    #[error("malformed configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Problems reading or decoding an input table.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("required input {} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("table '{table}' has no '{column}' column")]
    MissingColumn { table: String, column: String },

    #[error("table '{table}' row {row}: invalid zone id '{value}'")]
    InvalidZoneId {
        table: String,
        row: usize,
        value: String,
    },

    #[error("table '{table}' row {row}, column '{column}': cannot parse '{value}' as a number")]
    InvalidNumber {
        table: String,
        row: usize,
        column: String,
        value: String,
    },

    #[error("table '{table}' row {row}, column '{column}': negative value {value}")]
    NegativeValue {
        table: String,
        row: usize,
        column: String,
        value: f64,
    },

    #[error("table '{table}' lists zone '{zone}' more than once")]
    DuplicateZone { table: String, zone: String },

    #[error("csv decode failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Stage-level failure: either class of hard error.
#[derive(Error, Debug)]
pub enum AccessError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("input error: {0}")]
    Input(#[from] InputError),
}

impl From<std::io::Error> for AccessError {
    fn from(e: std::io::Error) -> Self {
        AccessError::Input(InputError::Io(e))
    }
}

impl From<csv::Error> for AccessError {
    fn from(e: csv::Error) -> Self {
        AccessError::Input(InputError::Csv(e))
    }
}

pub type AccessResult<T> = Result<T, AccessError>;
