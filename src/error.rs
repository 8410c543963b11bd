//! Error types for domain-blocklist.

use thiserror::Error;

/// Error type for aggregation runs.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport error while downloading a remote list (includes timeouts)
    #[error("download error: {0}")]
    Download(#[from] reqwest::Error),

    /// Remote list answered with something other than 200
    #[error("[{location}] returned HTTP code {status}")]
    HttpStatus { location: String, status: u16 },

    /// A configured source could not be retrieved or parsed
    #[error("[{location}] could not be loaded: {source}")]
    Source {
        location: String,
        #[source]
        source: Box<Error>,
    },

    /// Missing or unreadable configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Pattern rejected by the glob engine
    #[error("invalid glob pattern: {0}")]
    InvalidGlob(String),

    /// Output file could not be moved into place
    #[error("could not persist output file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

impl Error {
    /// Attribute an error to the source it came from.
    pub fn for_source(location: impl Into<String>, err: Error) -> Self {
        Error::Source {
            location: location.into(),
            source: Box::new(err),
        }
    }
}

/// Result type alias for domain-blocklist operations.
pub type Result<T> = std::result::Result<T, Error>;
