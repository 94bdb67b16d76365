use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Elevation is required, was refused, or the OS denied access
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Target process, cache path, startup item or backup record is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// The OS rejected the change
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("I/O error: {0}")]
    Io(io::Error),

    #[error("Backup record is malformed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SessionError {
    pub fn exit_code(&self) -> u8 {
        match self {
            SessionError::PermissionDenied(_) => 2,
            SessionError::NotFound(_) => 3,
            _ => 1,
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, SessionError::PermissionDenied(_))
    }
}

impl From<io::Error> for SessionError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::PermissionDenied => SessionError::PermissionDenied(e.to_string()),
            io::ErrorKind::NotFound => SessionError::NotFound(e.to_string()),
            _ => SessionError::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_kinds_map_to_session_kinds() {
        let denied: SessionError = io::Error::new(io::ErrorKind::PermissionDenied, "nope").into();
        assert!(denied.is_permission_denied());
        assert_eq!(denied.exit_code(), 2);

        let missing: SessionError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(missing, SessionError::NotFound(_)));
        assert_eq!(missing.exit_code(), 3);

        let other: SessionError = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert!(matches!(other, SessionError::Io(_)));
        assert_eq!(other.exit_code(), 1);
    }
}
