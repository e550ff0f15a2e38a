use thiserror::Error;

pub type Result<T> = std::result::Result<T, ImenikError>;

#[derive(Error, Debug)]
pub enum ImenikError {
    #[error("Element not found: {selector} on {url}")]
    ElementNotFound { selector: String, url: String },

    #[error("Navigation error: {0}")]
    Navigation(String),

    #[error("Unsupported search form: {0}")]
    UnsupportedForm(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
