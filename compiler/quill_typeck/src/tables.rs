//! The checker's global mutable state and its snapshot protocol.
//!
//! There is exactly one [`GlobalTables`] per analysis session. All mutation
//! goes through it, and every mutation appends to a tagged undo log. A
//! [`Snapshot`] records a log position together with the tag of the entry
//! just below it; it stays valid only as long as that exact entry is still
//! in place, so a snapshot taken before a rewind can never validate against
//! state rebuilt after it.
//!
//! Alongside the binding log the tables carry three pieces of session state
//! that cached prefixes must restore byte-for-byte: the caught-error list,
//! the deferred-check queue, and the active warning flags.

use crate::warnings::WarningFlags;
use quill_diagnostic::Diagnostic;
use quill_ir::{Name, Span, StringInterner, Ty};
use rustc_hash::FxHashSet;
use thiserror::Error;

/// Error returned when a stale snapshot is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("snapshot at log position {pos} (tag {tag}) no longer matches the undo log")]
pub struct StaleSnapshot {
    pub pos: usize,
    pub tag: u64,
}

/// A tagged position in the undo log.
///
/// Cheap to copy and to validate; holds no reference into the tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pos: usize,
    tag: u64,
}

impl Snapshot {
    /// The snapshot of an empty log.
    pub const INITIAL: Snapshot = Snapshot { pos: 0, tag: 0 };
}

/// A semantic check postponed until the whole unit has been analyzed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deferred {
    pub span: Span,
    pub check: DeferredCheck,
}

/// Deferred check kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredCheck {
    /// `open M`: verify that module `M` exists in the project.
    OpenModule(Name),
}

impl Deferred {
    /// Run the check against the project's known modules.
    pub fn force(
        &self,
        known_modules: &FxHashSet<Name>,
        interner: &StringInterner,
    ) -> Option<Diagnostic> {
        match self.check {
            DeferredCheck::OpenModule(module) => {
                if known_modules.contains(&module) {
                    None
                } else {
                    Some(Diagnostic::semantic(
                        self.span,
                        format!("unknown module `{}`", interner.resolve(module)),
                    ))
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
struct LogEntry {
    name: Name,
    ty: Ty,
    tag: u64,
}

/// The single mutable type-checker state.
///
/// Callers hold it by `&mut`; holding the reference *is* the permission to
/// mutate, so there is no global to reset between sessions.
#[derive(Debug)]
pub struct GlobalTables {
    log: Vec<LogEntry>,
    next_tag: u64,
    caught: Vec<Diagnostic>,
    deferred: Vec<Deferred>,
    warnings: WarningFlags,
}

impl GlobalTables {
    pub fn new() -> Self {
        GlobalTables {
            log: Vec::new(),
            next_tag: 1,
            caught: Vec::new(),
            deferred: Vec::new(),
            warnings: WarningFlags::default(),
        }
    }

    /// Record a binding in the undo log.
    pub fn bind(&mut self, name: Name, ty: Ty) {
        let tag = self.next_tag;
        self.next_tag += 1;
        self.log.push(LogEntry { name, ty, tag });
    }

    /// Take a snapshot of the current log position.
    pub fn snapshot(&self) -> Snapshot {
        match self.log.last() {
            Some(entry) => Snapshot {
                pos: self.log.len(),
                tag: entry.tag,
            },
            None => Snapshot::INITIAL,
        }
    }

    /// Check whether `snap` still describes a live prefix of the log.
    ///
    /// Valid means the position is within bounds and the entry just below it
    /// carries the recorded tag. Tags are never reused, so a log that was
    /// rewound past `snap.pos` and regrown invalidates the snapshot even if
    /// it regrew to the same length.
    pub fn is_valid(&self, snap: Snapshot) -> bool {
        if snap.pos == 0 {
            return true;
        }
        match self.log.get(snap.pos - 1) {
            Some(entry) => entry.tag == snap.tag,
            None => false,
        }
    }

    /// Check whether the log is exactly at `snap`, with nothing above it.
    pub fn is_at(&self, snap: Snapshot) -> bool {
        self.is_valid(snap) && self.log.len() == snap.pos
    }

    /// Rewind the log to `snap`, discarding every entry above it.
    pub fn rewind(&mut self, snap: Snapshot) -> Result<(), StaleSnapshot> {
        if !self.is_valid(snap) {
            return Err(StaleSnapshot {
                pos: snap.pos,
                tag: snap.tag,
            });
        }
        self.log.truncate(snap.pos);
        Ok(())
    }

    /// Look up the most recent binding for `name` in the log.
    pub fn lookup(&self, name: Name) -> Option<Ty> {
        self.log
            .iter()
            .rev()
            .find(|entry| entry.name == name)
            .map(|entry| entry.ty)
    }

    /// Number of live log entries.
    pub fn log_len(&self) -> usize {
        self.log.len()
    }

    /// Record a caught error.
    pub fn catch(&mut self, diag: Diagnostic) {
        self.caught.push(diag);
    }

    /// The errors caught so far in this session.
    pub fn caught(&self) -> &[Diagnostic] {
        &self.caught
    }

    /// Queue a deferred check.
    pub fn defer(&mut self, check: Deferred) {
        self.deferred.push(check);
    }

    /// The deferred checks queued so far.
    pub fn deferred(&self) -> &[Deferred] {
        &self.deferred
    }

    pub fn warnings(&self) -> WarningFlags {
        self.warnings
    }

    pub fn set_warnings(&mut self, flags: WarningFlags) {
        self.warnings = flags;
    }

    /// Restore the session state backed up by an analyzed declaration.
    ///
    /// Used when analysis resumes from a cached prefix: the binding log is
    /// rewound separately via [`GlobalTables::rewind`]; this puts back the
    /// error, deferred, and warning state in force at that point.
    pub fn restore_session(
        &mut self,
        caught: Vec<Diagnostic>,
        deferred: Vec<Deferred>,
        warnings: WarningFlags,
    ) {
        self.caught = caught;
        self.deferred = deferred;
        self.warnings = warnings;
    }

    /// Reset everything for a fresh analysis of a unit.
    pub fn reset(&mut self) {
        self.log.clear();
        self.caught.clear();
        self.deferred.clear();
        self.warnings = WarningFlags::default();
    }
}

impl Default for GlobalTables {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use quill_ir::StringInterner;

    fn name(interner: &StringInterner, text: &str) -> Name {
        interner.intern(text)
    }

    #[test]
    fn snapshot_of_empty_log_is_initial() {
        let tables = GlobalTables::new();
        assert_eq!(tables.snapshot(), Snapshot::INITIAL);
        assert!(tables.is_valid(Snapshot::INITIAL));
        assert!(tables.is_at(Snapshot::INITIAL));
    }

    #[test]
    fn rewind_discards_entries_above_snapshot() {
        let interner = StringInterner::new();
        let mut tables = GlobalTables::new();

        tables.bind(name(&interner, "a"), Ty::Int);
        let snap = tables.snapshot();
        tables.bind(name(&interner, "b"), Ty::Str);
        assert_eq!(tables.log_len(), 2);

        tables.rewind(snap).unwrap();
        assert_eq!(tables.log_len(), 1);
        assert_eq!(tables.lookup(name(&interner, "b")), None);
        assert_eq!(tables.lookup(name(&interner, "a")), Some(Ty::Int));
    }

    #[test]
    fn regrown_log_invalidates_old_snapshot() {
        let interner = StringInterner::new();
        let mut tables = GlobalTables::new();

        tables.bind(name(&interner, "a"), Ty::Int);
        tables.bind(name(&interner, "b"), Ty::Str);
        let snap = tables.snapshot();

        tables.rewind(Snapshot::INITIAL).unwrap();
        tables.bind(name(&interner, "a"), Ty::Int);
        tables.bind(name(&interner, "b"), Ty::Str);

        // Same length, same bindings, but different tags.
        assert_eq!(tables.log_len(), snap.pos);
        assert!(!tables.is_valid(snap));
        assert_eq!(
            tables.rewind(snap),
            Err(StaleSnapshot {
                pos: snap.pos,
                tag: snap.tag,
            })
        );
    }

    #[test]
    fn is_at_requires_exact_position() {
        let interner = StringInterner::new();
        let mut tables = GlobalTables::new();

        tables.bind(name(&interner, "a"), Ty::Int);
        let snap = tables.snapshot();
        assert!(tables.is_at(snap));

        tables.bind(name(&interner, "b"), Ty::Str);
        assert!(tables.is_valid(snap), "prefix is still live");
        assert!(!tables.is_at(snap), "but the log has grown past it");
    }

    #[test]
    fn restore_session_replaces_error_and_warning_state() {
        let mut tables = GlobalTables::new();
        tables.catch(Diagnostic::semantic(Span::new(0, 1), "one"));
        tables.set_warnings(WarningFlags::empty());

        tables.restore_session(Vec::new(), Vec::new(), WarningFlags::default());
        assert!(tables.caught().is_empty());
        assert_eq!(tables.warnings(), WarningFlags::default());
    }

    #[test]
    fn deferred_open_reports_unknown_module() {
        let interner = StringInterner::new();
        let module = name(&interner, "Widget");
        let check = Deferred {
            span: Span::new(0, 11),
            check: DeferredCheck::OpenModule(module),
        };

        let mut known = FxHashSet::default();
        let diag = check.force(&known, &interner);
        assert!(diag.is_some());
        assert!(diag.unwrap().message.contains("Widget"));

        known.insert(module);
        assert_eq!(check.force(&known, &interner), None);
    }
}
