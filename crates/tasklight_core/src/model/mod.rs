//! Domain model for tasks and task groups.
//!
//! # Responsibility
//! - Define the canonical entities mirrored between local state and the
//!   remote record store.
//! - Provide lifecycle helpers for soft-delete tombstones.
//!
//! # Invariants
//! - Every entity is identified by a stable uuid that is never reused.
//! - `deleted_at` is `Some` exactly when `is_deleted` is `true`.
//! - Deletion is represented by tombstones; hard delete happens only through
//!   an explicit permanent-delete operation.

pub mod group;
pub mod task;

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Validation errors shared by task and group entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Title is blank after trim; such entities must not be persisted.
    EmptyTitle,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title must not be blank"),
        }
    }
}

impl Error for ValidationError {}

/// Returns the current wall-clock time in epoch milliseconds.
///
/// Clamps to `0` for clocks before the unix epoch instead of panicking.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
