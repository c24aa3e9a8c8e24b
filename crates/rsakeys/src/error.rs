use thiserror::Error;

use crate::backend::BackendError;

/// Result codes returned by every key manager operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The caller broke the contract: missing input, bad terminator,
    /// out-of-range number, or a handle that is not valid.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// The output buffer cannot hold the result. Retry with `required` bytes.
    #[error("buffer too small: {required} bytes required")]
    BufferTooSmall { required: usize },

    /// The cryptographic operation itself failed.
    #[error("operation failed: {0}")]
    Failure(String),

    /// An internal invariant did not hold.
    #[error("unexpected: {0}")]
    Unexpected(String),
}

impl KeyError {
    /// Required capacity carried by `BufferTooSmall`, if that is the kind.
    pub fn required_size(&self) -> Option<usize> {
        match self {
            KeyError::BufferTooSmall { required } => Some(*required),
            _ => None,
        }
    }
}

impl From<BackendError> for KeyError {
    fn from(err: BackendError) -> Self {
        tracing::warn!("crypto backend: {}", err);
        KeyError::Failure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, KeyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_size_only_for_buffer_too_small() {
        assert_eq!(KeyError::BufferTooSmall { required: 42 }.required_size(), Some(42));
        assert_eq!(KeyError::InvalidParameter("x").required_size(), None);
        assert_eq!(KeyError::Failure("x".into()).required_size(), None);
    }

    #[test]
    fn test_backend_errors_become_failure() {
        let err: KeyError = BackendError::NotPrivate.into();
        assert!(matches!(err, KeyError::Failure(_)));
    }
}
