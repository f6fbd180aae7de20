use thiserror::Error;

pub type RpackResult<T> = Result<T, RpackError>;

/// Error taxonomy shared by every rpack crate.
///
/// `DecryptionFailed` carries no detail on purpose: a wrong secret and a
/// tampered ciphertext must be indistinguishable at the API boundary.
#[derive(Debug, Error)]
pub enum RpackError {
    #[error("entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid result descriptor: {0}")]
    InvalidResult(String),

    #[error("corrupt package: {0}")]
    CorruptArchive(String),

    #[error("not found in store: {0}")]
    NotFound(String),

    #[error("store integrity mismatch: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    #[error("package decryption failed")]
    DecryptionFailed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RpackError {
    /// Whether retrying against the same source could ever help.
    ///
    /// `IntegrityMismatch` and `EntropyUnavailable` are fatal for the
    /// source that produced them; retry policy for the rest belongs to
    /// the caller.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RpackError::IntegrityMismatch { .. } | RpackError::EntropyUnavailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decryption_failed_message_is_uniform() {
        assert_eq!(
            RpackError::DecryptionFailed.to_string(),
            "package decryption failed"
        );
    }

    #[test]
    fn integrity_mismatch_is_fatal() {
        let err = RpackError::IntegrityMismatch {
            expected: "aa".into(),
            actual: "bb".into(),
        };
        assert!(err.is_fatal());
        assert!(!RpackError::NotFound("x".into()).is_fatal());
    }
}
