//! Batch and document lifecycle
//!
//! [`BatchSession`] is the state machine behind the capture host's events:
//!
//! ```text
//! Closed --batch_open--> Open --document_open--> Capturing --document_complete | document_abandon | document_reject--> Complete
//!                                                    ^                               |
//!                                                    +--------document_open----------+
//! Open | Capturing | Complete --batch_close--> Closed
//! ```
//!
//! A document only completes once its current customer/invoice pair has
//! passed the existence check; any later capture clears that mark. A
//! document that cannot be corrected is closed with `document_abandon`.
//!
//! The backend connection lives exactly as long as the batch is open.
//! Validation failures leave the connection alone; only `batch_close`
//! releases it.

use crate::checker::{CheckError, ExistenceChecker};
use crate::db::{RecordStore, StoreConnector};
use crate::error::{FatalError, ValidatorError, ValidatorResult};
use crate::field::FieldValidator;
use async_trait::async_trait;
use shared::{FieldKind, FieldLimits, ValidationError, ValidationSession};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchState {
    Closed,
    Open,
    Capturing {
        session: ValidationSession,
        /// Current pair passed the existence check
        verified: bool,
    },
    Complete(ValidationSession),
}

impl BatchState {
    pub fn name(&self) -> &'static str {
        match self {
            BatchState::Closed => "batch closed",
            BatchState::Open => "batch open",
            BatchState::Capturing { .. } => "capturing document fields",
            BatchState::Complete(_) => "document complete",
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, BatchState::Closed)
    }
}

/// Callbacks a capture host (or the bundled batch runner) drives.
///
/// Every callback resolves to success, a recoverable validation failure,
/// a rejected document, or a fatal error that aborts the batch.
#[async_trait]
pub trait CaptureEvents: Send {
    /// Acquire the backend connection for a new batch
    async fn batch_open(&mut self) -> ValidatorResult<()>;

    /// Start a document with a blank session
    fn document_open(&mut self, document_id: &str) -> ValidatorResult<()>;

    /// Post-capture event for one index field; returns the canonical value
    /// the host should write back into the field
    async fn field_captured(&mut self, kind: FieldKind, raw_value: &str) -> ValidatorResult<String>;

    /// Finish the current document and hand back its verified session.
    /// Fails with `ValidationError::NotVerified` while the pair has not
    /// passed the existence check; the document stays open for correction.
    fn document_complete(&mut self) -> ValidatorResult<ValidationSession>;

    /// Close the current document without accepting it
    fn document_abandon(&mut self) -> ValidatorResult<()>;

    /// Skip the current document. Returns the outcome to report: a
    /// `RejectDocument`, or a fatal error if no document is open.
    fn document_reject(&mut self, reason: &str) -> ValidatorError;

    /// Release the backend connection
    async fn batch_close(&mut self) -> ValidatorResult<()>;
}

fn invalid_transition(event: &'static str, state: &BatchState) -> ValidatorError {
    error!(event, state = state.name(), "Invalid lifecycle transition");
    FatalError::InvalidTransition {
        event,
        state: state.name(),
    }
    .into()
}

/// Validator state for one batch
pub struct BatchSession<C: StoreConnector> {
    connector: C,
    validator: FieldValidator,
    store: Option<C::Store>,
    state: BatchState,
    document_id: Option<String>,
}

impl<C: StoreConnector> BatchSession<C> {
    pub fn new(connector: C, limits: FieldLimits) -> Self {
        BatchSession {
            connector,
            validator: FieldValidator::new(limits),
            store: None,
            state: BatchState::Closed,
            document_id: None,
        }
    }

    pub fn state(&self) -> &BatchState {
        &self.state
    }

    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    /// Session of the document currently being captured or just completed
    pub fn session(&self) -> Option<&ValidationSession> {
        match &self.state {
            BatchState::Capturing { session, .. } | BatchState::Complete(session) => Some(session),
            _ => None,
        }
    }

    async fn check_existence(&mut self, session: &ValidationSession) -> ValidatorResult<()> {
        let store = match self.store.as_mut() {
            Some(store) => store,
            None => return Err(invalid_transition("field_captured", &BatchState::Closed)),
        };

        ExistenceChecker::new(store)
            .with_timeout(self.connector.query_timeout())
            .check_session(session)
            .await
            .map(|_| ())
            .map_err(|e| match e {
                CheckError::Validation(v) => ValidatorError::Validation(v),
                CheckError::Backend(db) => {
                    error!(error = %db, "Backend lookup failed, aborting batch");
                    FatalError::LookupFailed(db).into()
                }
            })
    }
}

#[async_trait]
impl<C> CaptureEvents for BatchSession<C>
where
    C: StoreConnector,
{
    async fn batch_open(&mut self) -> ValidatorResult<()> {
        if self.state != BatchState::Closed {
            return Err(invalid_transition("batch_open", &self.state));
        }

        let store = self.connector.connect().await.map_err(|e| {
            error!(error = %e, "Could not open batch");
            ValidatorError::from(FatalError::ConnectionFailed(e))
        })?;

        self.store = Some(store);
        self.state = BatchState::Open;
        info!("Batch opened");
        Ok(())
    }

    fn document_open(&mut self, document_id: &str) -> ValidatorResult<()> {
        match self.state {
            BatchState::Open | BatchState::Complete(_) => {
                self.state = BatchState::Capturing {
                    session: ValidationSession::blank(),
                    verified: false,
                };
                self.document_id = Some(document_id.to_string());
                debug!(document = document_id, "Document opened");
                Ok(())
            }
            _ => Err(invalid_transition("document_open", &self.state)),
        }
    }

    async fn field_captured(&mut self, kind: FieldKind, raw_value: &str) -> ValidatorResult<String> {
        let session = match &self.state {
            BatchState::Capturing { session, .. } => session.clone(),
            other => return Err(invalid_transition("field_captured", other)),
        };

        // Any capture invalidates an earlier existence check
        self.state = BatchState::Capturing {
            session: session.clone(),
            verified: false,
        };

        // The invoice event runs the lookup, so the customer key must already be in place
        if kind == FieldKind::InvoiceNumber && !session.has(FieldKind::CustomerNumber) {
            warn!(
                document = self.document_id.as_deref().unwrap_or_default(),
                "Invoice captured before customer number"
            );
            return Err(ValidationError::MissingKey {
                field: FieldKind::CustomerNumber,
            }
            .into());
        }

        let (canonical, next) = self.validator.validate_value(kind, raw_value, &session)?;
        self.state = BatchState::Capturing {
            session: next.clone(),
            verified: false,
        };

        if kind == FieldKind::InvoiceNumber {
            self.check_existence(&next).await?;
            self.state = BatchState::Capturing {
                session: next,
                verified: true,
            };
        }

        Ok(canonical)
    }

    fn document_complete(&mut self) -> ValidatorResult<ValidationSession> {
        match &self.state {
            BatchState::Capturing {
                session,
                verified: true,
            } => {
                let session = session.clone();
                self.state = BatchState::Complete(session.clone());
                debug!(
                    document = self.document_id.as_deref().unwrap_or_default(),
                    "Document complete"
                );
                Ok(session)
            }
            BatchState::Capturing { session, .. } => {
                warn!(
                    document = self.document_id.as_deref().unwrap_or_default(),
                    "Document completed before its pair was verified"
                );
                Err(ValidationError::NotVerified {
                    customer: session.customer_number.clone(),
                    invoice: session.invoice_number.clone(),
                }
                .into())
            }
            other => Err(invalid_transition("document_complete", other)),
        }
    }

    fn document_abandon(&mut self) -> ValidatorResult<()> {
        match &self.state {
            BatchState::Capturing { session, .. } => {
                self.state = BatchState::Complete(session.clone());
                debug!(
                    document = self.document_id.as_deref().unwrap_or_default(),
                    "Document abandoned"
                );
                Ok(())
            }
            other => Err(invalid_transition("document_abandon", other)),
        }
    }

    fn document_reject(&mut self, reason: &str) -> ValidatorError {
        match &self.state {
            BatchState::Capturing { session, .. } => {
                self.state = BatchState::Complete(session.clone());
                warn!(
                    document = self.document_id.as_deref().unwrap_or_default(),
                    reason, "Document rejected"
                );
                ValidatorError::RejectDocument {
                    reason: reason.to_string(),
                }
            }
            other => invalid_transition("document_reject", other),
        }
    }

    async fn batch_close(&mut self) -> ValidatorResult<()> {
        if self.state == BatchState::Closed {
            return Err(invalid_transition("batch_close", &self.state));
        }

        if let Some(mut store) = self.store.take() {
            // Dropping the store still releases the socket
            if let Err(e) = store.close().await {
                warn!(error = %e, "Backend connection did not close cleanly");
            }
        }

        self.state = BatchState::Closed;
        self.document_id = None;
        info!("Batch closed");
        Ok(())
    }
}

impl<C: StoreConnector> Drop for BatchSession<C> {
    fn drop(&mut self) {
        if self.state.is_open() {
            warn!("Batch session dropped while open; connection released without close");
        }
    }
}
