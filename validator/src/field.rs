//! Index field length validation
//!
//! Fields are trimmed and checked against their type-dependent maximum
//! length. A value that is too long is reported, never truncated.

use shared::{FieldKind, FieldLimits, IndexField, ValidationError, ValidationSession};
use tracing::{debug, warn};

/// Trim `value` and check its length (in characters) against `max_length`.
///
/// Returns the trimmed value on success.
pub fn validate_length(
    field: FieldKind,
    value: &str,
    max_length: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    let actual_length = trimmed.chars().count();

    if actual_length > max_length {
        return Err(ValidationError::TooLong {
            field,
            max_length,
            actual_length,
        });
    }

    Ok(trimmed.to_string())
}

/// Validates captured fields and accumulates them into the document's session
#[derive(Debug, Clone, Copy)]
pub struct FieldValidator {
    limits: FieldLimits,
}

impl FieldValidator {
    pub fn new(limits: FieldLimits) -> Self {
        FieldValidator { limits }
    }

    /// Validate a captured field.
    ///
    /// On success the field is normalized to its trimmed value and the
    /// returned session carries that value under the field's key. On failure
    /// neither the field nor `session` is touched.
    pub fn validate_field(
        &self,
        field: &mut IndexField,
        session: &ValidationSession,
    ) -> Result<ValidationSession, ValidationError> {
        let canonical = validate_length(field.kind, &field.raw_value, field.max_length)
            .map_err(|e| {
                warn!(field = field.kind.as_str(), error = %e, "Field failed length validation");
                e
            })?;

        debug!(
            field = field.kind.as_str(),
            value = %canonical,
            "Field passed length validation"
        );

        field.normalize(canonical.clone());
        Ok(session.with_value(field.kind, canonical))
    }

    /// Validate a raw value for `kind` using the configured limit
    pub fn validate_value(
        &self,
        kind: FieldKind,
        raw_value: &str,
        session: &ValidationSession,
    ) -> Result<(String, ValidationSession), ValidationError> {
        let mut field = self.limits.field(kind, raw_value);
        let next = self.validate_field(&mut field, session)?;
        Ok((field.raw_value, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn validator() -> FieldValidator {
        FieldValidator::new(FieldLimits::new(20, 15))
    }

    #[test]
    fn test_trims_and_stores_customer() {
        let mut field = IndexField::new(FieldKind::CustomerNumber, "  12345 ", 20);
        let session = validator()
            .validate_field(&mut field, &ValidationSession::blank())
            .unwrap();

        assert_eq!(field.raw_value, "12345");
        assert_eq!(session.customer_number, "12345");
        assert_eq!(session.invoice_number, "");
    }

    #[test]
    fn test_customer_too_long() {
        let raw = "1".repeat(25);
        let mut field = IndexField::new(FieldKind::CustomerNumber, raw.clone(), 20);
        let before = ValidationSession::blank().with_value(FieldKind::InvoiceNumber, "INV-01");

        let err = validator().validate_field(&mut field, &before).unwrap_err();

        assert_eq!(
            err,
            ValidationError::TooLong {
                field: FieldKind::CustomerNumber,
                max_length: 20,
                actual_length: 25,
            }
        );
        assert_eq!(field.raw_value, raw);
        assert_eq!(before.customer_number, "");
    }

    #[test]
    fn test_exact_limit_passes() {
        let value = "A".repeat(15);
        assert_eq!(
            validate_length(FieldKind::InvoiceNumber, &value, 15).unwrap(),
            value
        );
    }

    #[test]
    fn test_surrounding_whitespace_not_counted() {
        let value = format!("   {}\t\n", "A".repeat(15));
        assert_eq!(
            validate_length(FieldKind::InvoiceNumber, &value, 15).unwrap(),
            "A".repeat(15)
        );
    }

    #[test]
    fn test_length_counts_characters() {
        assert!(validate_length(FieldKind::CustomerNumber, "ÄÖÜ", 3).is_ok());
    }

    #[test]
    fn test_validate_value_uses_kind_limit() {
        let (value, session) = validator()
            .validate_value(FieldKind::InvoiceNumber, " INV-01 ", &ValidationSession::blank())
            .unwrap();
        assert_eq!(value, "INV-01");
        assert_eq!(session.invoice_number, "INV-01");

        let too_long = "X".repeat(16);
        assert!(validator()
            .validate_value(FieldKind::InvoiceNumber, &too_long, &ValidationSession::blank())
            .is_err());
    }

    proptest! {
        #[test]
        fn prop_within_limit_returns_trimmed(s in "\\PC{0,40}", max in 0usize..40) {
            let trimmed = s.trim();
            prop_assume!(trimmed.chars().count() <= max);
            prop_assert_eq!(
                validate_length(FieldKind::CustomerNumber, &s, max).unwrap(),
                trimmed.to_string()
            );
        }

        #[test]
        fn prop_over_limit_fails_without_session_change(s in "\\PC{1,40}", max in 0usize..20) {
            prop_assume!(s.trim().chars().count() > max);
            let session = ValidationSession::blank().with_value(FieldKind::CustomerNumber, "keep");
            let mut field = IndexField::new(FieldKind::CustomerNumber, s.clone(), max);

            let result = FieldValidator::new(FieldLimits::new(max, max)).validate_field(&mut field, &session);

            prop_assert!(result.is_err());
            prop_assert_eq!(session.customer_number.as_str(), "keep");
            prop_assert_eq!(field.raw_value, s);
        }

        #[test]
        fn prop_validation_is_idempotent(s in "[ A-Za-z0-9-]{0,30}") {
            let first = validate_length(FieldKind::InvoiceNumber, &s, 30).unwrap();
            let second = validate_length(FieldKind::InvoiceNumber, &first, 30).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
