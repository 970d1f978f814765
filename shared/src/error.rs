use crate::models::FieldKind;
use serde::Serialize;
use thiserror::Error;

/// Recoverable validation failure reported back to the operator.
///
/// A validation error only fails the current field or document; the batch
/// and its backend connection carry on.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("{field} must be at most {max_length} characters (got {actual_length})")]
    TooLong {
        field: FieldKind,
        max_length: usize,
        actual_length: usize,
    },
    #[error("customer number '{customer}' with invoice number '{invoice}' was not found")]
    NotFound { customer: String, invoice: String },
    #[error("{field} must be captured before the existence check")]
    MissingKey { field: FieldKind },
    #[error("customer number '{customer}' with invoice number '{invoice}' has not passed the existence check")]
    NotVerified { customer: String, invoice: String },
}

impl ValidationError {
    /// The field an operator should correct, when one can be singled out
    pub fn field(&self) -> Option<FieldKind> {
        match self {
            ValidationError::TooLong { field, .. } => Some(*field),
            ValidationError::MissingKey { field } => Some(*field),
            ValidationError::NotFound { .. } | ValidationError::NotVerified { .. } => None,
        }
    }
}
