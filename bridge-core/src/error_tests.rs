/*!
Tests for error types and their classification.
*/

#[cfg(test)]
mod tests {
    use crate::error::BridgeError;
    use std::io;

    #[test]
    fn test_bridge_error_display() {
        let error = BridgeError::validation("namespace cannot be empty");
        assert_eq!(
            error.to_string(),
            "Validation error: namespace cannot be empty"
        );

        let error = BridgeError::compression("truncated stream");
        assert_eq!(error.to_string(), "Compression error: truncated stream");

        let error = BridgeError::storage("disk full");
        assert_eq!(error.to_string(), "Storage error: disk full");

        let error = BridgeError::encoding("invalid byte 42");
        assert_eq!(error.to_string(), "Encoding error: invalid byte 42");
    }

    #[test]
    fn test_bridge_error_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let bridge_error = BridgeError::from(io_error);

        match bridge_error {
            BridgeError::Io(ref inner) => assert_eq!(inner.kind(), io::ErrorKind::NotFound),
            _ => panic!("Expected Io error variant"),
        }
    }

    #[test]
    fn test_bridge_error_from_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let bridge_error = BridgeError::from(json_error);

        assert!(matches!(bridge_error, BridgeError::Json(_)));
    }

    #[test]
    fn test_integrity_check_failed_error() {
        let error = BridgeError::IntegrityCheckFailed {
            expected: "abc123".to_string(),
            actual: "def456".to_string(),
        };

        assert!(error.to_string().contains("abc123"));
        assert!(error.to_string().contains("def456"));
    }

    #[test]
    fn test_corruption_classification() {
        assert!(BridgeError::encoding("bad base64").is_corruption());
        assert!(BridgeError::compression("bad gzip").is_corruption());
        assert!(BridgeError::invalid_format("newer version").is_corruption());
        assert!(BridgeError::IntegrityCheckFailed {
            expected: "a".to_string(),
            actual: "b".to_string(),
        }
        .is_corruption());

        assert!(!BridgeError::storage("unreachable").is_corruption());
        assert!(!BridgeError::validation("bad key").is_corruption());
        assert!(!BridgeError::Io(io::Error::new(io::ErrorKind::Other, "io")).is_corruption());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<BridgeError>();
        assert_sync::<BridgeError>();
    }

    #[test]
    fn test_error_result_type() {
        fn returns_error() -> crate::Result<()> {
            Err(BridgeError::validation("test error"))
        }

        assert!(returns_error().is_err());
    }
}
