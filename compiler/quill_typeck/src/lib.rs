//! Quill Typeck - semantic analysis over a single mutable state.
//!
//! The checker's design constraint is that all semantic state lives in one
//! [`GlobalTables`] value, threaded by `&mut` through every check. Incremental
//! reuse works by snapshotting the tables' undo log per declaration
//! ([`GlobalTables::snapshot`]) and rewinding to a still-valid snapshot
//! instead of re-checking ([`GlobalTables::rewind`]).
//!
//! # Module Organization
//!
//! - `tables`: the global state, tagged undo log, snapshots, deferred checks
//! - `env`: persistent per-declaration environments
//! - `check`: [`check_decl`], one declaration at a time
//! - `warnings`: the warning-state flags snapshots carry

mod check;
mod env;
mod tables;
mod warnings;

pub use check::{check_decl, CheckedDecl};
pub use env::Env;
pub use tables::{Deferred, DeferredCheck, GlobalTables, Snapshot, StaleSnapshot};
pub use warnings::WarningFlags;
