//! Error types for gdownload.

use std::path::PathBuf;
use thiserror::Error;

/// Every failure the library can report. All of them end the run, except
/// where the caller chooses to downgrade one to a warning (token caching).
#[derive(Error, Debug)]
pub enum Error {
    /// The OAuth client configuration could not be read or understood.
    #[error("Invalid credentials: {0}")]
    Config(String),

    /// The browser authorization or the token endpoint failed.
    #[error("Authorization failed: {0}")]
    Auth(String),

    /// A Gmail API call returned a non-success status.
    #[error("API request to {url} failed with status {status}: {body}")]
    Api {
        url: String,
        status: u16,
        body: String,
    },

    /// The HTTP request never produced a response.
    #[error("HTTP transport error: {0}")]
    Transport(String),

    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An attachment body was not valid base64.
    #[error("Cannot decode attachment: {0}")]
    Decode(#[from] base64::DecodeError),

    /// The token cache file could not be encoded or decoded.
    #[error("Token cache error: {0}")]
    Cache(#[from] bincode::Error),
}

/// Convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => {
                let url = response.get_url().to_string();
                let body = response
                    .into_string()
                    .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
                Self::Api { url, status, body }
            }
            ureq::Error::Transport(t) => Self::Transport(t.to_string()),
        }
    }
}
