//! Core reconciliation logic for TaskLight.
//!
//! Keeps a local in-memory mirror of tasks and task groups consistent with a
//! remote record store that offers only coarse per-record CRUD and
//! indexed-field queries. Every mutating operation updates local state
//! optimistically, issues independent remote writes, and recovers from any
//! write failure by refetching authoritative state.

pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod record;
pub mod state;
pub mod store;

pub use engine::task_engine::{EngineError, EngineResult, TaskEngine};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::group::{Group, GroupId};
pub use model::task::{Priority, Task, TaskDraft, TaskId};
pub use model::ValidationError;
pub use record::mapper::{
    group_from_record, group_to_record, task_from_record, task_to_record, MapError,
};
pub use record::{FieldValue, Record, RecordId, RecordKind};
pub use state::LocalState;
pub use store::sqlite_store::SqliteRecordStore;
pub use store::{RecordStore, SortDirection, SortField, SortKey, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
