use thiserror::Error;

#[derive(Error, Debug)]
pub enum SplitError {
    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Worker failed: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SplitError>;
