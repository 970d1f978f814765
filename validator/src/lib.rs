// Library exports for the validator
pub mod batch;
pub mod checker;
pub mod config;
pub mod db;
pub mod error;
pub mod field;
pub mod input;
pub mod lifecycle;

pub use batch::{run_batch, BatchOutput};
pub use checker::{CheckError, ExistenceChecker};
pub use config::{ConfigError, DatabaseConfig, LookupConfig, ServiceConfig};
pub use db::{
    DatabaseError, MemoryConnector, MemoryStore, OrderRecord, PgConnector, PgRecordStore,
    RecordStore, StoreConnector,
};
pub use error::{FatalError, ValidatorError, ValidatorResult};
pub use field::{validate_length, FieldValidator};
pub use input::{load_documents, load_records, InputError};
pub use lifecycle::{BatchSession, BatchState, CaptureEvents};
