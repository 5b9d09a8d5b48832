//! Remote store adapter contracts.
//!
//! # Responsibility
//! - Define the coarse CRUD + indexed-query contract offered by the record
//!   store, with no cross-record atomicity.
//! - Define the store error taxonomy, including availability errors.
//!
//! # Invariants
//! - Every query carries the fixed non-empty-title predicate to exclude
//!   malformed records.
//! - Sorting is restricted by construction to indexed fields; arbitrary
//!   field sorting must not be assumed.
//! - Availability errors are surfaced verbatim and never retried here.

pub mod sqlite_store;

use crate::record::{Record, RecordId, RecordKind};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No account backs the store; caller must surface verbatim.
    AccountNotFound,
    /// The backing account exists but is restricted.
    AccountRestricted,
    /// Account status could not be determined.
    AccountUnknown,
    /// The requested record does not exist.
    NotFound(RecordId),
    /// Transport or backend failure during a read/write.
    Backend(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccountNotFound => {
                write!(f, "store account not found; sign in before syncing")
            }
            Self::AccountRestricted => write!(f, "store account is restricted"),
            Self::AccountUnknown => write!(f, "store account status is unknown"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::Backend(message) => write!(f, "store backend failure: {message}"),
        }
    }
}

impl Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Backend(value.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Backend(format!("payload encoding failed: {value}"))
    }
}

/// Fields the store indexes; the only legal sort targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Priority,
    CreatedAt,
    DeletedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// One indexed sort key for a store query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn ascending(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Descending,
        }
    }
}

/// Outcome of one record inside a batched save.
pub type BatchResult = (RecordId, StoreResult<()>);

/// Coarse CRUD + indexed-query contract of the remote record store.
///
/// Implementations must treat every call as an independent durable write;
/// there is no multi-record transaction and no caching inside the adapter.
pub trait RecordStore {
    /// Checks whether the backing account is usable. Called before first use;
    /// failures are surfaced to the caller without automatic retry.
    fn check_availability(&self) -> StoreResult<()>;

    /// Idempotent upsert by record identifier.
    fn save(&mut self, record: &Record) -> StoreResult<()>;

    /// Fetches one record, failing with `NotFound` when absent.
    fn fetch(&self, id: RecordId) -> StoreResult<Record>;

    /// Deletes one record, failing with `NotFound` when absent.
    fn delete(&mut self, id: RecordId) -> StoreResult<()>;

    /// Saves a batch; each record succeeds or fails independently.
    ///
    /// The outer error covers transport-level failure only. There is no
    /// all-or-nothing guarantee across the batch.
    fn save_many(&mut self, records: &[Record]) -> StoreResult<Vec<BatchResult>>;

    /// Queries all records of one kind whose title is non-empty, sorted by
    /// the given indexed keys.
    fn query(&self, kind: RecordKind, sort: &[SortKey]) -> StoreResult<Vec<Record>>;
}
