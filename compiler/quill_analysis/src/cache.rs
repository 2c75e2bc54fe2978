//! The bounded incremental analysis cache.
//!
//! Maps a project identity and a declaration sequence to a typed result,
//! reusing the longest compatible prefix of a previously cached analysis
//! and re-checking only the divergent suffix. Entries are immutable once
//! stored: a query either reuses one wholesale (after a consistency check
//! against the live checker tables) or stores a fresh replacement.
//!
//! The cache holds at most [`CACHE_CAPACITY`] entries, evicted oldest-first
//! on overflow. FIFO, not LRU: total cached state is bounded by a constant
//! regardless of edit or file count, and the invariant stays trivial.

use quill_diagnostic::Diagnostic;
use quill_ir::{Decl, ProgramShape, StringInterner, TypedNode};
use quill_typeck::{check_decl, Deferred, Env, GlobalTables, Snapshot, WarningFlags};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

/// Maximum number of cached analyses.
pub const CACHE_CAPACITY: usize = 5;

/// Identity of one cached analysis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub project_dir: PathBuf,
    pub file: Option<PathBuf>,
    /// Configuration identity, from the validity stamp.
    pub config_id: u64,
}

/// One fully analyzed declaration.
///
/// Everything needed to resume analysis right after this declaration:
/// the environment, the tables snapshot, and the session state (cumulative
/// caught errors, pending deferred checks, warning flags) in force at that
/// point.
#[derive(Debug, Clone)]
pub struct AnalyzedDecl {
    /// The parse tree this analysis was built from; prefix compatibility
    /// compares against it with deep equality, spans included.
    pub source: Decl,
    pub typed: TypedNode,
    pub env_after: Env,
    pub snapshot: Snapshot,
    pub caught: Vec<Diagnostic>,
    pub deferred: Vec<Deferred>,
    pub warnings: WarningFlags,
}

/// A complete analysis of one declaration sequence.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub shape: ProgramShape,
    pub decls: Vec<Arc<AnalyzedDecl>>,
    /// Environment after the last declaration.
    pub final_env: Env,
}

/// How much of a run was served from cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reuse {
    pub reused: usize,
    pub recomputed: usize,
}

/// Classification of one run's reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReuseKind {
    AllCached,
    PartialReuse,
    FullRecompute,
}

impl Reuse {
    pub fn kind(&self) -> ReuseKind {
        if self.recomputed == 0 {
            ReuseKind::AllCached
        } else if self.reused > 0 {
            ReuseKind::PartialReuse
        } else {
            ReuseKind::FullRecompute
        }
    }
}

struct CacheEntry {
    key: CacheKey,
    result: Arc<AnalysisResult>,
}

/// Bounded FIFO cache of analysis results.
#[derive(Default)]
pub struct AnalysisCache {
    entries: VecDeque<CacheEntry>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        AnalysisCache {
            entries: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find a cached result for `key`, consistency-checked against the
    /// live tables.
    ///
    /// The tables must be in the exact state the entry's tail snapshot
    /// implies; an entry that fails the check has been invalidated by a
    /// later session and is silently dropped, indistinguishable from a
    /// miss.
    pub fn lookup(
        &mut self,
        key: &CacheKey,
        tables: &GlobalTables,
    ) -> Option<Arc<AnalysisResult>> {
        let idx = self.entries.iter().position(|entry| entry.key == *key)?;
        let result = Arc::clone(&self.entries[idx].result);
        let tail = result
            .decls
            .last()
            .map_or(Snapshot::INITIAL, |decl| decl.snapshot);
        if tables.is_at(tail) {
            Some(result)
        } else {
            tracing::debug!("dropping cache entry with stale snapshot");
            self.entries.remove(idx);
            None
        }
    }

    /// Analyze a declaration sequence, reusing a cached prefix when one is
    /// compatible, and store the result.
    pub fn run(
        &mut self,
        key: CacheKey,
        shape: ProgramShape,
        decls: &[Decl],
        tables: &mut GlobalTables,
        interner: &StringInterner,
    ) -> (Arc<AnalysisResult>, Reuse) {
        let mut prefix: Vec<Arc<AnalyzedDecl>> = Vec::new();
        if let Some(prev) = self.lookup(&key, tables) {
            // A cached entry for the other program shape shares nothing.
            if prev.shape == shape {
                let n = compatible_prefix(tables, &prev.decls, decls);
                if n == decls.len() && n == prev.decls.len() {
                    tracing::debug!(decls = n, "analysis fully cached");
                    return (
                        prev,
                        Reuse {
                            reused: n,
                            recomputed: 0,
                        },
                    );
                }
                if n > 0 {
                    let tail = &prev.decls[n - 1];
                    if tables.rewind(tail.snapshot).is_ok() {
                        tables.restore_session(
                            tail.caught.clone(),
                            tail.deferred.clone(),
                            tail.warnings,
                        );
                        prefix = prev.decls[..n].to_vec();
                    }
                }
            }
        }
        if prefix.is_empty() {
            tables.reset();
        }

        let reused = prefix.len();
        let mut env = prefix
            .last()
            .map_or_else(Env::empty, |decl| decl.env_after.clone());
        let mut items = prefix;
        for decl in &decls[reused..] {
            let checked = check_decl(tables, interner, &env, decl);
            env = checked.env_after.clone();
            items.push(Arc::new(AnalyzedDecl {
                source: decl.clone(),
                typed: checked.typed,
                env_after: checked.env_after,
                snapshot: tables.snapshot(),
                caught: tables.caught().to_vec(),
                deferred: tables.deferred().to_vec(),
                warnings: tables.warnings(),
            }));
        }
        let recomputed = items.len() - reused;
        tracing::debug!(reused, recomputed, "analysis run complete");

        let result = Arc::new(AnalysisResult {
            shape,
            decls: items,
            final_env: env,
        });
        self.store(key, Arc::clone(&result));
        (result, Reuse { reused, recomputed })
    }

    fn store(&mut self, key: CacheKey, result: Arc<AnalysisResult>) {
        self.entries.retain(|entry| entry.key != key);
        self.entries.push_back(CacheEntry { key, result });
        while self.entries.len() > CACHE_CAPACITY {
            self.entries.pop_front();
        }
    }
}

/// Length of the reusable prefix shared by a cached analysis and a new
/// declaration sequence.
///
/// An item is reusable while its snapshot is still valid in the live
/// tables and the new declaration is structurally equal to the parse tree
/// the cached item was built from. Equality is deep and includes source
/// spans, so an edit that shifts a later declaration invalidates it even
/// when its own text is unchanged.
fn compatible_prefix(
    tables: &GlobalTables,
    cached: &[Arc<AnalyzedDecl>],
    new: &[Decl],
) -> usize {
    cached
        .iter()
        .zip(new)
        .take_while(|(item, decl)| tables.is_valid(item.snapshot) && item.source == **decl)
        .count()
}
