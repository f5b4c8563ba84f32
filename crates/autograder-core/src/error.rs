//! Error types for autograder-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutograderError {
    #[error("failed to spawn interpreter: {0}")]
    Spawn(std::io::Error),

    #[error("timed out after {0} seconds")]
    Timeout(u64),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("could not parse model response: {message}")]
    Parse { message: String, raw: String },
}
