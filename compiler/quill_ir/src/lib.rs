//! Quill IR - shared types for the Quill analyzer.
//!
//! Everything the analysis pipeline passes between phases lives here:
//! source spans, interned names, token items, parse-tree declarations,
//! and the typed tree produced by semantic analysis.
//!
//! # Module Organization
//!
//! - `span`: compact byte-offset source spans
//! - `interner`: interned identifier names
//! - `token`: token items (valid tokens or lexical errors)
//! - `decl`: top-level declaration parse trees
//! - `typed`: typed tree fragments and primitive types

mod decl;
mod interner;
mod span;
mod token;
mod typed;

pub use decl::{BinOp, Decl, DeclKind, ExprKind, ExprNode, Provenance, TyExpr, TyExprKind};
pub use interner::{Name, StringInterner};
pub use span::Span;
pub use token::{LexErrorKind, Token, TokenItem, TokenKind};
pub use typed::{Ty, TypedNode};

/// Which shape of program a buffer holds.
///
/// A module body (implementation) and a module interface are analyzed with
/// different initial environments and are never prefix-compatible with each
/// other in the analysis cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramShape {
    /// A module body: `let`, `type`, and `open` declarations.
    Implementation,
    /// A module interface: `val` signatures and `type` declarations.
    Interface,
}
