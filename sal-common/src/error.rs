use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SalError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Config File Error: {0}")]
    Toml(#[from] Arc<toml::de::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Transport Error: {0}")]
    Transport(String),

    #[error("Remote Command Failed: {0}")]
    Remote(String),

    #[error("Invalid Name: {0}")]
    InvalidName(String),

    #[error("Resource Not Found: {0}")]
    NotFound(String),

    #[error("Generic Error: {0}")]
    Generic(String),
}

impl From<std::io::Error> for SalError {
    fn from(err: std::io::Error) -> Self {
        SalError::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for SalError {
    fn from(err: serde_json::Error) -> Self {
        SalError::Json(Arc::new(err))
    }
}

impl From<toml::de::Error> for SalError {
    fn from(err: toml::de::Error) -> Self {
        SalError::Toml(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, SalError>;
