use super::*;

#[test]
fn test_not_found_display_names_kind_and_id() {
    let error = StoreError::not_found(DocumentKind::Template, "abc");

    assert_eq!(error.to_string(), "template 'abc' not found");
    assert!(error.is_not_found());
    assert!(!error.is_retryable());
}

#[test]
fn test_only_conflicts_are_retryable() {
    let conflict = StoreError::Conflict {
        kind: DocumentKind::Version,
        id: "t1/0".to_string(),
    };
    assert!(conflict.is_retryable());

    assert!(!StoreError::ReadAfterWrite.is_retryable());
    assert!(!StoreError::Unavailable("down".to_string()).is_retryable());
    assert!(!StoreError::invalid_id(DocumentKind::Report, "").is_retryable());
}

#[test]
fn test_invalid_id_display() {
    let error = StoreError::invalid_id(DocumentKind::Template, "a/b");

    assert_eq!(error.to_string(), "invalid template id: 'a/b'");
}

#[test]
fn test_read_after_write_message() {
    assert_eq!(
        StoreError::ReadAfterWrite.to_string(),
        "transactions require all reads to be executed before all writes"
    );
}
