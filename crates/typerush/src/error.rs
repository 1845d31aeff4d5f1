use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No data available: {0}")]
    DataUnavailable(String),

    #[error("Invalid video id: {0:?}")]
    InvalidVideoId(String),

    #[error("Invalid lyric track: {0}")]
    InvalidTrack(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    /// Check if this error means a source had nothing to offer
    pub fn is_data_unavailable(&self) -> bool {
        matches!(self, Error::DataUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::Io(io_err);
        assert!(err.is_not_found());

        let other_io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err2 = Error::Io(other_io_err);
        assert!(!err2.is_not_found());
    }

    #[test]
    fn test_error_is_data_unavailable() {
        assert!(Error::DataUnavailable("no prompts".into()).is_data_unavailable());
        assert!(!Error::InvalidVideoId("x".into()).is_data_unavailable());
    }

    #[test]
    fn test_error_display() {
        let err = Error::InvalidTrack("line 2 ends before it starts".into());
        assert_eq!(
            err.to_string(),
            "Invalid lyric track: line 2 ends before it starts"
        );
    }
}
