use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum EstuaryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingEnv(Vec<String>),

    #[error("Invalid value for {var}: {reason}")]
    InvalidEnv { var: String, reason: String },

    #[error("Invalid digest header: {0}")]
    Document(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, EstuaryError>;
