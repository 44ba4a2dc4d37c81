use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("File copy failed: {0}")]
    Copy(#[from] fs_extra::error::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Directory listing failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid CSS selector: {0}")]
    Selector(String),

    #[error("Configuration error: {reason}")]
    InvalidConfig { reason: String },

    #[error("Directory not found: {path}")]
    MissingDirectory { path: String },
}

pub type Result<T> = std::result::Result<T, HarvestError>;
