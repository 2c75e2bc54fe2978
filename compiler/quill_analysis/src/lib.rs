//! Quill Analysis - the incremental re-analysis and caching engine.
//!
//! This crate answers one question cheaply, over and over: given the
//! current text of an edited buffer, what is its typed analysis? The
//! machinery is built bottom-up:
//!
//! - [`History`]: versioned streams with cursor addressing and a
//!   prefix-reusing `sync` operation.
//! - [`ProjectConfig`]: layered path chains, language extensions, derived
//!   keyword tables, and the [`Stamp`] that invalidates all of it at once.
//! - [`Buffer`]: per-document token and parse streams, resynchronized
//!   incrementally on every edit.
//! - [`AnalysisCache`]: a bounded cache of typed results with
//!   snapshot-validated prefix reuse over the checker's single mutable
//!   state.
//!
//! One query runs to completion before the next is accepted; the checker
//! tables are shared sequentially across cached sessions, which is why
//! every reuse path revalidates its snapshot before trusting it.
//!
//! # Module Organization
//!
//! - `history`: versioned streams and sync
//! - `config`: project configuration and validity stamps
//! - `buffer`: per-document incremental state
//! - `cache`: the bounded analysis cache
//! - `locate`: diagnostics and position queries over finished analyses

mod buffer;
mod cache;
mod config;
mod history;
mod locate;

pub use buffer::{Buffer, ParseItem, UpdateStats};
pub use cache::{
    AnalysisCache, AnalysisResult, AnalyzedDecl, CacheKey, Reuse, ReuseKind, CACHE_CAPACITY,
};
pub use config::{
    DeclaredConfig, PackageError, PackageFailure, PackagePaths, PackageResolver, ProjectConfig,
    Stamp, UnknownExtension, INTERFACE_EXTENSION,
};
pub use history::{History, SyncStats};
pub use locate::{errors, locate, Located};
