//! Common error types for classview

use thiserror::Error;

/// Common result type for classview operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across classview crates
#[derive(Error, Debug)]
pub enum Error {
    /// Config file exists but could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
