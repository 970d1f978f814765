/// Existence checker module
/// Confirms that a captured customer/invoice pair exists in the backend table

use crate::db::{DatabaseError, RecordStore};
use shared::{FieldKind, ValidationError, ValidationSession};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum CheckError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Backend(#[from] DatabaseError),
}

/// Runs the customer/invoice lookup against the batch's record store
pub struct ExistenceChecker<'a, S: RecordStore> {
    store: &'a mut S,
    query_timeout: Option<Duration>,
}

impl<'a, S: RecordStore> ExistenceChecker<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        ExistenceChecker {
            store,
            query_timeout: None,
        }
    }

    /// Bound every lookup by `limit`; `None` waits on the backend indefinitely
    pub fn with_timeout(mut self, limit: Option<Duration>) -> Self {
        self.query_timeout = limit;
        self
    }

    /// Number of backend rows matching the pair
    pub async fn count_matches(&mut self, customer: &str, invoice: &str) -> Result<i64, DatabaseError> {
        let query = self.store.count_matches(customer, invoice);
        match self.query_timeout {
            Some(limit) => tokio::time::timeout(limit, query).await.map_err(|_| {
                error!("Backend lookup timed out after {:?}", limit);
                DatabaseError::Timeout(limit)
            })?,
            None => query.await,
        }
    }

    /// Returns `Ok(true)` when at least one row matches.
    ///
    /// Both values must already be trimmed and length-validated. An empty
    /// value is rejected without touching the backend.
    pub async fn exists(&mut self, customer: &str, invoice: &str) -> Result<bool, CheckError> {
        if customer.is_empty() {
            return Err(ValidationError::MissingKey {
                field: FieldKind::CustomerNumber,
            }
            .into());
        }
        if invoice.is_empty() {
            return Err(ValidationError::MissingKey {
                field: FieldKind::InvoiceNumber,
            }
            .into());
        }

        let count = self.count_matches(customer, invoice).await?;
        debug!(
            "Existence check: customer={}, invoice={}, matches={}",
            customer, invoice, count
        );

        if count < 1 {
            warn!(
                "No backend record for customer={}, invoice={}",
                customer, invoice
            );
            return Err(ValidationError::NotFound {
                customer: customer.to_string(),
                invoice: invoice.to_string(),
            }
            .into());
        }

        info!("Backend record found: customer={}, invoice={}", customer, invoice);
        Ok(true)
    }

    /// Check the key accumulated in a document session
    pub async fn check_session(&mut self, session: &ValidationSession) -> Result<bool, CheckError> {
        self.exists(&session.customer_number, &session.invoice_number)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, OrderRecord};
    use async_trait::async_trait;

    /// Store whose lookups take `delay` before answering
    struct SlowStore {
        inner: MemoryStore,
        delay: Duration,
    }

    #[async_trait]
    impl RecordStore for SlowStore {
        async fn count_matches(&mut self, customer: &str, invoice: &str) -> Result<i64, DatabaseError> {
            tokio::time::sleep(self.delay).await;
            self.inner.count_matches(customer, invoice).await
        }

        async fn close(&mut self) -> Result<(), DatabaseError> {
            self.inner.close().await
        }
    }

    fn store() -> MemoryStore {
        MemoryStore::new(vec![
            OrderRecord::new("12345", "INV-01"),
            OrderRecord::new("12345", "INV-01"),
            OrderRecord::new("67890", "INV-02"),
        ])
    }

    #[tokio::test]
    async fn test_exists_with_matching_rows() {
        let mut store = store();
        let mut checker = ExistenceChecker::new(&mut store);

        assert!(checker.exists("12345", "INV-01").await.unwrap());
        assert_eq!(checker.count_matches("12345", "INV-01").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_missing_pair_names_both_values() {
        let mut store = store();
        let mut checker = ExistenceChecker::new(&mut store);

        let err = checker.exists("12345", "INV-02").await.unwrap_err();
        match err {
            CheckError::Validation(ValidationError::NotFound { customer, invoice }) => {
                assert_eq!(customer, "12345");
                assert_eq!(invoice, "INV-02");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_customer_skips_backend() {
        let mut store = store();
        store.close().await.unwrap();
        let mut checker = ExistenceChecker::new(&mut store);

        // Closed store: reaching the backend would surface as CheckError::Backend
        let err = checker.exists("", "INV-01").await.unwrap_err();
        assert!(matches!(
            err,
            CheckError::Validation(ValidationError::MissingKey {
                field: FieldKind::CustomerNumber
            })
        ));
    }

    #[tokio::test]
    async fn test_backend_failure_is_not_a_validation_error() {
        let mut store = store();
        store.close().await.unwrap();
        let mut checker = ExistenceChecker::new(&mut store);

        let err = checker.exists("12345", "INV-01").await.unwrap_err();
        assert!(matches!(err, CheckError::Backend(DatabaseError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_check_session() {
        let mut store = store();
        let mut checker = ExistenceChecker::new(&mut store);
        let session = ValidationSession::blank()
            .with_value(FieldKind::CustomerNumber, "67890")
            .with_value(FieldKind::InvoiceNumber, "INV-02");

        assert!(checker.check_session(&session).await.unwrap());
    }

    #[tokio::test]
    async fn test_slow_lookup_times_out() {
        let mut store = SlowStore {
            inner: store(),
            delay: Duration::from_millis(500),
        };
        let mut checker =
            ExistenceChecker::new(&mut store).with_timeout(Some(Duration::from_millis(20)));

        let err = checker.exists("12345", "INV-01").await.unwrap_err();
        match err {
            CheckError::Backend(DatabaseError::Timeout(limit)) => {
                assert_eq!(limit, Duration::from_millis(20));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lookup_within_timeout_succeeds() {
        let mut store = SlowStore {
            inner: store(),
            delay: Duration::from_millis(1),
        };
        let mut checker = ExistenceChecker::new(&mut store).with_timeout(Some(Duration::from_secs(5)));

        assert!(checker.exists("12345", "INV-01").await.unwrap());
    }
}
