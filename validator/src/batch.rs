/// Batch runner
/// Feeds documents through the capture lifecycle and collects a batch report

use crate::error::{ValidatorError, ValidatorResult};
use crate::lifecycle::CaptureEvents;
use serde::Serialize;
use shared::{BatchReport, Document, DocumentStatus, Environment, FieldKind, ValidationSession};
use tracing::{error, info, warn};

/// Machine-readable result of a batch: the report plus the documents with
/// their canonical field values written back
#[derive(Debug, Serialize)]
pub struct BatchOutput<'a> {
    #[serde(flatten)]
    pub report: &'a BatchReport,
    pub normalized_documents: &'a [Document],
}

/// Run one batch of documents.
///
/// The connection is opened once and closed once, on every exit path once
/// `batch_open` has succeeded. A fatal error stops processing and is returned
/// after the batch is closed; recoverable errors are recorded per document.
/// Canonical (trimmed) field values are written back into `documents`.
pub async fn run_batch<H: CaptureEvents>(
    host: &mut H,
    environment: Environment,
    documents: &mut [Document],
) -> ValidatorResult<BatchReport> {
    let mut report = BatchReport::new(environment);

    host.batch_open().await?;
    info!(
        batch_id = %report.batch_id,
        environment = %environment,
        documents = documents.len(),
        "Batch started"
    );

    let outcome = process_documents(host, &mut report, documents).await;
    let closed = host.batch_close().await;

    if let Err(e) = &outcome {
        error!(
            batch_id = %report.batch_id,
            processed = report.processed(),
            error = %e,
            "Batch aborted"
        );
    }
    outcome?;
    closed?;

    report.finish();
    info!(
        batch_id = %report.batch_id,
        accepted = report.accepted,
        invalid = report.invalid,
        rejected = report.rejected,
        "Batch completed"
    );

    Ok(report)
}

async fn process_documents<H: CaptureEvents>(
    host: &mut H,
    report: &mut BatchReport,
    documents: &mut [Document],
) -> ValidatorResult<()> {
    for document in documents.iter_mut() {
        let status = match process_document(host, document).await {
            Ok(session) => DocumentStatus::Accepted {
                customer_number: session.customer_number,
                invoice_number: session.invoice_number,
            },
            Err(ValidatorError::Validation(e)) => {
                warn!(document = %document.id, error = %e, "Document failed validation");
                DocumentStatus::Invalid {
                    field: e.field(),
                    message: e.to_string(),
                }
            }
            Err(ValidatorError::RejectDocument { reason }) => DocumentStatus::Rejected { reason },
            Err(fatal) => return Err(fatal),
        };

        report.record(document.id.clone(), status);
    }

    Ok(())
}

/// Capture one document. A document that failed validation is abandoned so
/// the next one can open; only a fatal error leaves it open
async fn process_document<H: CaptureEvents>(
    host: &mut H,
    document: &mut Document,
) -> ValidatorResult<ValidationSession> {
    host.document_open(&document.id)?;

    if let Some(reason) = document.reject_reason.as_deref() {
        return Err(host.document_reject(reason));
    }

    match capture_fields(host, document).await {
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            host.document_abandon()?;
            Err(e)
        }
        Ok(()) => host.document_complete(),
    }
}

async fn capture_fields<H: CaptureEvents>(host: &mut H, document: &mut Document) -> ValidatorResult<()> {
    document.customer_number = host
        .field_captured(FieldKind::CustomerNumber, &document.customer_number)
        .await?;
    document.invoice_number = host
        .field_captured(FieldKind::InvoiceNumber, &document.invoice_number)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryConnector, OrderRecord};
    use crate::lifecycle::BatchSession;
    use shared::FieldLimits;

    #[tokio::test]
    async fn test_output_carries_normalized_documents() {
        let mut session = BatchSession::new(
            MemoryConnector::new(vec![OrderRecord::new("12345", "INV-01")]),
            FieldLimits::new(20, 15),
        );
        let mut documents = vec![
            Document::new("doc-1", " 12345 ", " INV-01"),
            Document::new("doc-2", "12345", "INV-02"),
        ];

        let report = run_batch(&mut session, Environment::Test, &mut documents)
            .await
            .unwrap();
        let output = BatchOutput {
            report: &report,
            normalized_documents: &documents,
        };
        let json = serde_json::to_value(&output).unwrap();

        assert_eq!(json["accepted"], 1);
        assert_eq!(json["invalid"], 1);
        assert_eq!(json["documents"].as_array().unwrap().len(), 2);
        assert_eq!(json["normalized_documents"][0]["customer_number"], "12345");
        assert_eq!(json["normalized_documents"][0]["invoice_number"], "INV-01");
        assert_eq!(json["normalized_documents"][1]["id"], "doc-2");
    }
}
