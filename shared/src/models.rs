use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

// ═══════════════════════════════════════════════════════════════════════════
// INDEX FIELDS
// ═══════════════════════════════════════════════════════════════════════════

/// Index field types captured from a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    CustomerNumber,
    InvoiceNumber,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::CustomerNumber => "customer_number",
            FieldKind::InvoiceNumber => "invoice_number",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::CustomerNumber => write!(f, "customer number"),
            FieldKind::InvoiceNumber => write!(f, "invoice number"),
        }
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "customer" | "customer_number" | "custno" => Ok(FieldKind::CustomerNumber),
            "invoice" | "invoice_number" | "invno" => Ok(FieldKind::InvoiceNumber),
            other => Err(format!(
                "unknown field '{}' (expected 'customer' or 'invoice')",
                other
            )),
        }
    }
}

/// A single captured index field with its type-dependent length limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexField {
    pub kind: FieldKind,
    pub raw_value: String,
    pub max_length: usize,
}

impl IndexField {
    pub fn new(kind: FieldKind, raw_value: impl Into<String>, max_length: usize) -> Self {
        IndexField {
            kind,
            raw_value: raw_value.into(),
            max_length,
        }
    }

    /// Replace the captured value with its canonical form
    pub fn normalize(&mut self, canonical: String) {
        self.raw_value = canonical;
    }
}

/// Maximum lengths per field type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLimits {
    pub customer_max_length: usize,
    pub invoice_max_length: usize,
}

impl FieldLimits {
    pub const DEFAULT_CUSTOMER_MAX_LENGTH: usize = 20;
    pub const DEFAULT_INVOICE_MAX_LENGTH: usize = 15;

    pub fn new(customer_max_length: usize, invoice_max_length: usize) -> Self {
        FieldLimits {
            customer_max_length,
            invoice_max_length,
        }
    }

    pub fn max_length(&self, kind: FieldKind) -> usize {
        match kind {
            FieldKind::CustomerNumber => self.customer_max_length,
            FieldKind::InvoiceNumber => self.invoice_max_length,
        }
    }

    /// Build an index field of the given kind carrying its configured limit
    pub fn field(&self, kind: FieldKind, raw_value: impl Into<String>) -> IndexField {
        IndexField::new(kind, raw_value, self.max_length(kind))
    }
}

impl Default for FieldLimits {
    fn default() -> Self {
        FieldLimits::new(
            Self::DEFAULT_CUSTOMER_MAX_LENGTH,
            Self::DEFAULT_INVOICE_MAX_LENGTH,
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// VALIDATION SESSION
// ═══════════════════════════════════════════════════════════════════════════

/// Per-document key accumulated while the document's fields are captured.
///
/// Sessions are values: each successful validation produces a new session
/// instead of mutating shared state, and a new document always starts from
/// [`ValidationSession::blank`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSession {
    pub customer_number: String,
    pub invoice_number: String,
}

impl ValidationSession {
    pub fn blank() -> Self {
        ValidationSession::default()
    }

    pub fn value(&self, kind: FieldKind) -> &str {
        match kind {
            FieldKind::CustomerNumber => &self.customer_number,
            FieldKind::InvoiceNumber => &self.invoice_number,
        }
    }

    /// Return a copy of this session with `kind` set to `value`
    pub fn with_value(&self, kind: FieldKind, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        match kind {
            FieldKind::CustomerNumber => next.customer_number = value.into(),
            FieldKind::InvoiceNumber => next.invoice_number = value.into(),
        }
        next
    }

    pub fn has(&self, kind: FieldKind) -> bool {
        !self.value(kind).is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// DEPLOYMENT ENVIRONMENT
// ═══════════════════════════════════════════════════════════════════════════

/// Deployment environment selecting which backend the validator talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Test,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Test => write!(f, "test"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// BATCH INPUT AND REPORTING
// ═══════════════════════════════════════════════════════════════════════════

/// A document as delivered in a batch file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub customer_number: String,
    #[serde(default)]
    pub invoice_number: String,
    /// When set, the document is skipped outright with this reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        customer_number: impl Into<String>,
        invoice_number: impl Into<String>,
    ) -> Self {
        Document {
            id: id.into(),
            customer_number: customer_number.into(),
            invoice_number: invoice_number.into(),
            reject_reason: None,
        }
    }
}

/// Final state of a single document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentStatus {
    Accepted {
        customer_number: String,
        invoice_number: String,
    },
    Invalid {
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<FieldKind>,
        message: String,
    },
    Rejected {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReport {
    pub document_id: String,
    #[serde(flatten)]
    pub status: DocumentStatus,
}

/// Summary of one batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub environment: Environment,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub accepted: usize,
    pub invalid: usize,
    pub rejected: usize,
    pub documents: Vec<DocumentReport>,
}

impl BatchReport {
    pub fn new(environment: Environment) -> Self {
        BatchReport {
            batch_id: Uuid::new_v4(),
            environment,
            started_at: Utc::now(),
            finished_at: None,
            accepted: 0,
            invalid: 0,
            rejected: 0,
            documents: Vec::new(),
        }
    }

    pub fn record(&mut self, document_id: impl Into<String>, status: DocumentStatus) {
        match status {
            DocumentStatus::Accepted { .. } => self.accepted += 1,
            DocumentStatus::Invalid { .. } => self.invalid += 1,
            DocumentStatus::Rejected { .. } => self.rejected += 1,
        }
        self.documents.push(DocumentReport {
            document_id: document_id.into(),
            status,
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn processed(&self) -> usize {
        self.documents.len()
    }

    pub fn status_of(&self, document_id: &str) -> Option<&DocumentStatus> {
        self.documents
            .iter()
            .find(|d| d.document_id == document_id)
            .map(|d| &d.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_kind_from_str() {
        assert_eq!("customer".parse::<FieldKind>(), Ok(FieldKind::CustomerNumber));
        assert_eq!("INVOICE".parse::<FieldKind>(), Ok(FieldKind::InvoiceNumber));
        assert_eq!("invoice_number".parse::<FieldKind>(), Ok(FieldKind::InvoiceNumber));
        assert!("amount".parse::<FieldKind>().is_err());
    }

    #[test]
    fn test_limits_per_kind() {
        let limits = FieldLimits::new(20, 15);
        let field = limits.field(FieldKind::InvoiceNumber, "INV-01");
        assert_eq!(field.max_length, 15);
        assert_eq!(limits.max_length(FieldKind::CustomerNumber), 20);
    }

    #[test]
    fn test_session_with_value_leaves_original_untouched() {
        let blank = ValidationSession::blank();
        let next = blank.with_value(FieldKind::CustomerNumber, "12345");

        assert_eq!(blank.customer_number, "");
        assert_eq!(next.customer_number, "12345");
        assert!(next.has(FieldKind::CustomerNumber));
        assert!(!next.has(FieldKind::InvoiceNumber));

        let done = next.with_value(FieldKind::InvoiceNumber, "INV-01");
        assert!(done.has(FieldKind::InvoiceNumber));
        assert_eq!(next.invoice_number, "");
    }

    #[test]
    fn test_batch_report_counters() {
        let mut report = BatchReport::new(Environment::Test);
        report.record(
            "doc-1",
            DocumentStatus::Accepted {
                customer_number: "1".to_string(),
                invoice_number: "A".to_string(),
            },
        );
        report.record(
            "doc-2",
            DocumentStatus::Rejected {
                reason: "duplicate scan".to_string(),
            },
        );

        assert_eq!(report.accepted, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.invalid, 0);
        assert_eq!(report.processed(), 2);
        assert!(matches!(
            report.status_of("doc-2"),
            Some(DocumentStatus::Rejected { .. })
        ));
    }
}
