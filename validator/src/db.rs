/// Backend record store module
/// Counts customer/invoice rows in the configured backend table

use crate::config::{validate_identifier, ConfigError, DatabaseConfig, LookupConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{Connection, PgConnection};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    ConnectionError(String),
    #[error("Database error: {0}")]
    SqlError(String),
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),
    #[error("Connection already closed")]
    ConnectionClosed,
}

/// Read-only view of the backend table, held for the lifetime of one batch
#[async_trait]
pub trait RecordStore: Send {
    /// Count rows matching both the customer and the invoice number exactly
    async fn count_matches(&mut self, customer: &str, invoice: &str) -> Result<i64, DatabaseError>;

    /// Release the underlying connection. Closing twice is a no-op.
    async fn close(&mut self) -> Result<(), DatabaseError>;
}

/// Opens a [`RecordStore`] when a batch starts
#[async_trait]
pub trait StoreConnector: Send + Sync {
    type Store: RecordStore;

    async fn connect(&self) -> Result<Self::Store, DatabaseError>;

    /// Upper bound on a single lookup; `None` leaves it to the driver
    fn query_timeout(&self) -> Option<Duration> {
        None
    }
}

/// Build the parameterized count statement for the configured table.
///
/// Only validated identifiers are placed in the SQL text; customer and
/// invoice values are always bound as `$1`/`$2`.
pub fn count_query(lookup: &LookupConfig) -> Result<String, ConfigError> {
    validate_identifier("LOOKUP_TABLE", &lookup.table)?;
    validate_identifier("LOOKUP_INVOICE_COLUMN", &lookup.invoice_column)?;
    validate_identifier("LOOKUP_CUSTOMER_COLUMN", &lookup.customer_column)?;

    Ok(format!(
        "SELECT COUNT(*) FROM {} WHERE {} = $1 AND {} = $2",
        lookup.table, lookup.invoice_column, lookup.customer_column
    ))
}

/// Single PostgreSQL connection owned by a batch
pub struct PgRecordStore {
    conn: Option<PgConnection>,
    sql: String,
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn count_matches(&mut self, customer: &str, invoice: &str) -> Result<i64, DatabaseError> {
        let conn = self.conn.as_mut().ok_or(DatabaseError::ConnectionClosed)?;

        debug!(
            "Counting backend rows: customer={}, invoice={}",
            customer, invoice
        );

        sqlx::query_scalar::<_, i64>(&self.sql)
            .bind(invoice)
            .bind(customer)
            .fetch_one(conn)
            .await
            .map_err(|e| {
                error!("Failed to count backend rows: {}", e);
                DatabaseError::SqlError(e.to_string())
            })
    }

    async fn close(&mut self) -> Result<(), DatabaseError> {
        match self.conn.take() {
            Some(conn) => {
                conn.close().await.map_err(|e| {
                    warn!("Failed to close backend connection cleanly: {}", e);
                    DatabaseError::ConnectionError(e.to_string())
                })?;
                info!("Backend connection closed");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// Connects to the PostgreSQL backend of the selected environment
pub struct PgConnector {
    database: DatabaseConfig,
    sql: String,
}

impl PgConnector {
    pub fn new(database: DatabaseConfig, lookup: &LookupConfig) -> Result<Self, ConfigError> {
        Ok(PgConnector {
            database,
            sql: count_query(lookup)?,
        })
    }
}

#[async_trait]
impl StoreConnector for PgConnector {
    type Store = PgRecordStore;

    async fn connect(&self) -> Result<PgRecordStore, DatabaseError> {
        let conn = PgConnection::connect(&self.database.connection_string)
            .await
            .map_err(|e| {
                error!("Failed to connect to backend: {}", e);
                DatabaseError::ConnectionError(e.to_string())
            })?;

        info!("Backend connection opened");

        Ok(PgRecordStore {
            conn: Some(conn),
            sql: self.sql.clone(),
        })
    }

    fn query_timeout(&self) -> Option<Duration> {
        self.database.query_timeout
    }
}

/// One row of the backend table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub customer_number: String,
    pub invoice_number: String,
}

impl OrderRecord {
    pub fn new(customer_number: impl Into<String>, invoice_number: impl Into<String>) -> Self {
        OrderRecord {
            customer_number: customer_number.into(),
            invoice_number: invoice_number.into(),
        }
    }
}

/// In-memory backend table for offline runs
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<OrderRecord>,
    closed: bool,
}

impl MemoryStore {
    pub fn new(records: Vec<OrderRecord>) -> Self {
        MemoryStore {
            records,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn count_matches(&mut self, customer: &str, invoice: &str) -> Result<i64, DatabaseError> {
        if self.closed {
            return Err(DatabaseError::ConnectionClosed);
        }

        let count = self
            .records
            .iter()
            .filter(|r| r.invoice_number == invoice && r.customer_number == customer)
            .count();

        Ok(count as i64)
    }

    async fn close(&mut self) -> Result<(), DatabaseError> {
        self.closed = true;
        Ok(())
    }
}

/// Hands out a fresh [`MemoryStore`] over a fixed record set per batch
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    records: Vec<OrderRecord>,
}

impl MemoryConnector {
    pub fn new(records: Vec<OrderRecord>) -> Self {
        MemoryConnector { records }
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    type Store = MemoryStore;

    async fn connect(&self) -> Result<MemoryStore, DatabaseError> {
        debug!("Opening in-memory store with {} records", self.records.len());
        Ok(MemoryStore::new(self.records.clone()))
    }
}
