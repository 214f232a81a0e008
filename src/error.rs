use thiserror::Error;

#[derive(Error, Debug)]
pub enum VtrimError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("End time can't be lower than or equal to start time ({start:.3} >= {end:.3}).")]
    InvalidRange { start: f64, end: f64 },

    #[error("A-B loop not defined.")]
    MissingBoundaries,

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

pub type Result<T> = std::result::Result<T, VtrimError>;
