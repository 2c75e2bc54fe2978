//! Queries over a finished analysis: diagnostics and position lookup.

use crate::cache::AnalysisResult;
use quill_diagnostic::Diagnostic;
use quill_ir::{Name, Provenance, StringInterner, TypedNode};
use quill_typeck::Env;
use rustc_hash::FxHashSet;

/// All diagnostics for an analyzed unit.
///
/// Errors live on the *last* analyzed declaration: the caught list is
/// cumulative session state, since later declarations can surface errors
/// about earlier code. Outstanding deferred checks are forced here, against
/// the project's known modules, so every diagnostic for the unit appears
/// exactly once.
pub fn errors(
    result: &AnalysisResult,
    known_modules: &FxHashSet<Name>,
    interner: &StringInterner,
) -> Vec<Diagnostic> {
    let Some(last) = result.decls.last() else {
        return Vec::new();
    };
    let mut diagnostics = last.caught.clone();
    diagnostics.extend(
        last.deferred
            .iter()
            .filter_map(|check| check.force(known_modules, interner)),
    );
    diagnostics
}

/// Result of a position query.
#[derive(Debug)]
pub enum Located<'a> {
    /// The most deeply nested typed node covering the position.
    Node(&'a TypedNode),
    /// The position lies outside every declaration; the final environment
    /// is all that applies there.
    Outside(&'a Env),
}

/// Find the innermost typed node containing a byte position.
///
/// Walks from the outermost declaration inward, always descending into the
/// most specific child. Recovery placeholders are skipped in favor of a
/// well-formed sibling covering the same position, when one exists.
pub fn locate(result: &AnalysisResult, pos: u32) -> Located<'_> {
    for decl in &result.decls {
        if decl.typed.contains(pos) {
            return Located::Node(descend(&decl.typed, pos));
        }
    }
    Located::Outside(&result.final_env)
}

fn descend(node: &TypedNode, pos: u32) -> &TypedNode {
    let mut fallback = None;
    for child in &node.children {
        if !child.contains(pos) {
            continue;
        }
        if child.provenance == Provenance::WellFormed {
            return descend(child, pos);
        }
        fallback.get_or_insert(child);
    }
    match fallback {
        Some(child) => descend(child, pos),
        None => node,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{AnalysisCache, CacheKey};
    use pretty_assertions::assert_eq;
    use quill_ir::{ProgramShape, Span, Ty};
    use quill_lexer::{lex, KeywordTable, LexRestart};
    use quill_parse::assemble;
    use quill_typeck::GlobalTables;
    use std::path::PathBuf;

    fn analyze(source: &str, interner: &StringInterner) -> AnalysisResult {
        let table = KeywordTable::for_extensions(&FxHashSet::default());
        let items = lex(source, &table, interner, LexRestart::FROM_START);
        let assembled = assemble(&items, ProgramShape::Implementation);
        let mut tables = GlobalTables::new();
        let mut cache = AnalysisCache::new();
        let (result, _) = cache.run(
            CacheKey {
                project_dir: PathBuf::from("/p"),
                file: None,
                config_id: 0,
            },
            ProgramShape::Implementation,
            &assembled.decls,
            &mut tables,
            interner,
        );
        (*result).clone()
    }

    #[test]
    fn locate_finds_innermost_node() {
        let interner = StringInterner::new();
        let result = analyze("let x = (1 + 2) * 3", &interner);

        // Position inside `2`.
        let Located::Node(node) = locate(&result, 13) else {
            panic!("position is inside the declaration");
        };
        assert_eq!(node.span, Span::new(13, 14));
        assert_eq!(node.ty, Ty::Int);
    }

    #[test]
    fn locate_outside_all_declarations_yields_environment() {
        let interner = StringInterner::new();
        let result = analyze("let x = 1", &interner);
        let located = locate(&result, 500);
        let Located::Outside(env) = located else {
            panic!("position is past the declaration");
        };
        assert_eq!(env.lookup_value(interner.intern("x")), Some(Ty::Int));
    }

    #[test]
    fn locate_skips_recovery_placeholder_for_well_formed_sibling() {
        let well = TypedNode::leaf(Ty::Int, Span::new(4, 5), Provenance::WellFormed);
        let hole = TypedNode::leaf(Ty::Error, Span::point(4), Provenance::Recovered);
        let root = TypedNode::with_children(
            Ty::Int,
            Span::new(0, 9),
            Provenance::WellFormed,
            vec![hole, well],
        );
        let chosen = descend(&root, 4);
        assert_eq!(chosen.provenance, Provenance::WellFormed);
    }

    #[test]
    fn errors_surface_deferred_failures_once() {
        let interner = StringInterner::new();
        let result = analyze("open Ghost let x = missing", &interner);

        let known = FxHashSet::default();
        let diagnostics = errors(&result, &known, &interner);
        let ghost: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.message.contains("Ghost"))
            .collect();
        assert_eq!(ghost.len(), 1);
        assert!(diagnostics.iter().any(|d| d.message.contains("missing")));
    }

    #[test]
    fn errors_on_empty_unit_are_empty() {
        let interner = StringInterner::new();
        let result = analyze("", &interner);
        assert!(errors(&result, &FxHashSet::default(), &interner).is_empty());
    }
}
