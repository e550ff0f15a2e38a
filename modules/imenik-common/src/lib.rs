pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, DirectorySelectors};
pub use error::{ImenikError, Result};
pub use types::*;
