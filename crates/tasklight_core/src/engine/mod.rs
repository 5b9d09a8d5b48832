//! Reconciliation engine.
//!
//! # Responsibility
//! - Execute every mutating operation as: update local state optimistically,
//!   issue independent remote writes, and on failure re-synchronize from the
//!   authoritative store.
//! - Own the completion/soft-delete cascade rules for tasks and groups.
//!
//! # Invariants
//! - Recovery from any write failure is reconcile-by-refetch, never local
//!   field rollback.
//! - Cascades are sequential per-record writes; there is no cross-record
//!   transaction to lean on.

pub mod task_engine;
