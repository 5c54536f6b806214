use strum_macros::Display;

/// Whether running the failed step again can help.
///
/// The export retries a `Temporary` rasterizer failure once; if that fails
/// too the error becomes `Persistent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ErrorStatus {
    #[default]
    Permanent,
    Temporary,
    Persistent,
}

impl ErrorStatus {
    pub fn is_retryable(self) -> bool {
        self == ErrorStatus::Temporary
    }

    pub fn persist(self) -> Self {
        if self == ErrorStatus::Temporary {
            ErrorStatus::Persistent
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_lifecycle() {
        let status = ErrorStatus::Temporary;
        assert!(status.is_retryable());
        let status = status.persist();
        assert_eq!(status, ErrorStatus::Persistent);
        assert!(!status.is_retryable());
        assert_eq!(status.to_string(), "persistent");
    }

    #[test]
    fn test_permanent_stays_permanent() {
        assert!(!ErrorStatus::Permanent.is_retryable());
        assert_eq!(ErrorStatus::Permanent.persist(), ErrorStatus::Permanent);
    }
}
