use shared::{FieldKind, ValidationError};

#[test]
fn test_too_long_message_reports_maximum() {
    let err = ValidationError::TooLong {
        field: FieldKind::CustomerNumber,
        max_length: 20,
        actual_length: 25,
    };

    let message = err.to_string();
    assert!(message.contains("customer number"));
    assert!(message.contains("20"));
    assert_eq!(err.field(), Some(FieldKind::CustomerNumber));
}

#[test]
fn test_not_found_message_names_both_values() {
    let err = ValidationError::NotFound {
        customer: "12345".to_string(),
        invoice: "INV-99".to_string(),
    };

    let message = err.to_string();
    assert!(message.contains("12345"));
    assert!(message.contains("INV-99"));
    assert_eq!(err.field(), None);
}

#[test]
fn test_missing_key_names_the_missing_field() {
    let err = ValidationError::MissingKey {
        field: FieldKind::InvoiceNumber,
    };

    assert_eq!(
        err.to_string(),
        "invoice number must be captured before the existence check"
    );
    assert_eq!(err.field(), Some(FieldKind::InvoiceNumber));

    let err = ValidationError::MissingKey {
        field: FieldKind::CustomerNumber,
    };
    assert_eq!(
        err.to_string(),
        "customer number must be captured before the existence check"
    );
}

#[test]
fn test_not_verified_names_the_pair() {
    let err = ValidationError::NotVerified {
        customer: "99999".to_string(),
        invoice: "INV-01".to_string(),
    };

    let message = err.to_string();
    assert!(message.contains("99999"));
    assert!(message.contains("INV-01"));
    assert_eq!(err.field(), None);
}

#[test]
fn test_validation_error_serializes_with_kind_tag() {
    let err = ValidationError::MissingKey {
        field: FieldKind::CustomerNumber,
    };
    let json = serde_json::to_value(&err).expect("serializable");
    assert_eq!(json["kind"], "missing_key");
    assert_eq!(json["field"], "customer_number");
}
