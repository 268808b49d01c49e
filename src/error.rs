//! Error types for the retrieval workflow

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid identifier: empty input")]
    InvalidIdentifier,

    #[error("no match found for '{0}'")]
    NotFound(String),

    #[error("page navigation timed out after {0:?}")]
    NavigationTimeout(Duration),

    #[error("timed out after {timeout:?} waiting for '{selector}'")]
    ElementTimeout {
        selector: String,
        timeout: Duration,
    },

    #[error("download failed for {url}: {reason}")]
    DownloadFailed {
        url: String,
        reason: String,
    },

    #[error("browser command failed: {0}")]
    Browser(#[from] fantoccini::error::CmdError),

    #[error("could not establish WebDriver session: {0}")]
    Session(#[from] fantoccini::error::NewSessionError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl FetchError {
    /// Short label used in the per-entry summary so the user can tell a
    /// "not found" from a "timed out" and retry accordingly.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::InvalidIdentifier => "invalid identifier",
            FetchError::NotFound(_) => "not found",
            FetchError::NavigationTimeout(_) | FetchError::ElementTimeout { .. } => "timed out",
            FetchError::DownloadFailed { .. } => "download failed",
            FetchError::Browser(_) | FetchError::Session(_) => "browser error",
            FetchError::Http(_) => "http error",
            FetchError::Io(_) => "io error",
            FetchError::Archive(_) => "archive error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels_distinguish_timeouts_from_misses() {
        let timeout = FetchError::NavigationTimeout(Duration::from_secs(45));
        let wait = FetchError::ElementTimeout {
            selector: "table".to_string(),
            timeout: Duration::from_secs(15),
        };
        let miss = FetchError::NotFound("Reliance".to_string());

        assert_eq!(timeout.kind(), "timed out");
        assert_eq!(wait.kind(), "timed out");
        assert_eq!(miss.kind(), "not found");
    }
}
