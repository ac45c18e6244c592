use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Precondition(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("git error: {0}")]
    Vcs(String),

    #[error("hosting error: {0}")]
    Hosting(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// User misuse: the operation was invoked in a state that does not allow it.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Error::Precondition(_) | Error::NotFound(_) | Error::Validation(_))
    }

    /// The persisted checkpoint model itself is broken.
    pub fn is_integrity(&self) -> bool {
        matches!(self, Error::Integrity(_))
    }
}

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Internal(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Hosting(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert!(Error::Precondition("no session".into()).is_precondition());
        assert!(Error::NotFound("checkpoint 9".into()).is_precondition());
        assert!(!Error::Integrity("two roots".into()).is_precondition());
        assert!(Error::Integrity("two roots".into()).is_integrity());
        assert!(!Error::Vcs("exit 1".into()).is_integrity());
    }

    #[test]
    fn test_precondition_message_is_bare() {
        let err = Error::Precondition("a session is already open".into());
        assert_eq!(err.to_string(), "a session is already open");
    }
}
