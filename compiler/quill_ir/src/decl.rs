//! Top-level declaration parse trees.
//!
//! Declarations are what the analysis cache keys reuse on: two runs share a
//! cached analysis prefix exactly as far as their declaration sequences are
//! structurally equal. Equality here is deep **and includes source spans**,
//! so an edit that shifts a later declaration invalidates its cached result
//! even when its own text is unchanged.
//!
//! Every node carries a [`Provenance`] tag so downstream consumers can tell
//! well-formed syntax apart from error-recovery placeholders without
//! special-casing node kinds.

use super::{Name, Span};

/// Whether a node came from well-formed syntax or from error recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    WellFormed,
    /// Synthesized by the recovery engine after a syntax error.
    Recovered,
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decl {
    pub kind: DeclKind,
    pub span: Span,
    pub provenance: Provenance,
}

impl Decl {
    /// Create a well-formed declaration.
    pub fn new(kind: DeclKind, span: Span) -> Self {
        Decl {
            kind,
            span,
            provenance: Provenance::WellFormed,
        }
    }

    /// Create a recovery placeholder declaration.
    pub fn recovered(kind: DeclKind, span: Span) -> Self {
        Decl {
            kind,
            span,
            provenance: Provenance::Recovered,
        }
    }

    /// The name this declaration binds, if any.
    pub fn name(&self) -> Option<Name> {
        match &self.kind {
            DeclKind::Let { name, .. }
            | DeclKind::TypeAlias { name, .. }
            | DeclKind::Val { name, .. } => Some(*name),
            DeclKind::Open { .. } => None,
        }
    }
}

/// Declaration kinds.
///
/// `Let`, `TypeAlias`, and `Open` belong to the implementation shape;
/// `Val` and `TypeAlias` to the interface shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclKind {
    /// `let NAME = EXPR`
    Let { name: Name, value: ExprNode },
    /// `type NAME = TY`
    TypeAlias { name: Name, ty: TyExpr },
    /// `open MODULE`
    Open { module: Name },
    /// `val NAME : TY`
    Val { name: Name, ty: TyExpr },
}

/// An expression parse node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprNode {
    pub kind: ExprKind,
    pub span: Span,
    pub provenance: Provenance,
}

impl ExprNode {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        ExprNode {
            kind,
            span,
            provenance: Provenance::WellFormed,
        }
    }

    /// A recovery placeholder standing in for a missing expression.
    pub fn missing(at: u32) -> Self {
        ExprNode {
            kind: ExprKind::Error,
            span: Span::point(at),
            provenance: Provenance::Recovered,
        }
    }
}

/// Expression kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    Int(i64),
    Str(Name),
    Bool(bool),
    Ident(Name),
    Binary {
        op: BinOp,
        lhs: Box<ExprNode>,
        rhs: Box<ExprNode>,
    },
    Paren(Box<ExprNode>),
    /// Placeholder produced by error recovery.
    Error,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
}

/// A type expression parse node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TyExpr {
    pub kind: TyExprKind,
    pub span: Span,
    pub provenance: Provenance,
}

impl TyExpr {
    pub fn new(kind: TyExprKind, span: Span) -> Self {
        TyExpr {
            kind,
            span,
            provenance: Provenance::WellFormed,
        }
    }

    /// A recovery placeholder standing in for a missing type.
    pub fn missing(at: u32) -> Self {
        TyExpr {
            kind: TyExprKind::Error,
            span: Span::point(at),
            provenance: Provenance::Recovered,
        }
    }
}

/// Type expression kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TyExprKind {
    Int,
    Str,
    Bool,
    Named(Name),
    /// Placeholder produced by error recovery.
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_includes_spans() {
        let a = Decl::new(
            DeclKind::Open { module: Name::EMPTY },
            Span::new(0, 10),
        );
        let mut b = a.clone();
        assert_eq!(a, b);

        b.span = Span::new(1, 11);
        assert_ne!(a, b, "a shifted declaration must not compare equal");
    }

    #[test]
    fn equality_includes_provenance() {
        let well = Decl::new(DeclKind::Open { module: Name::EMPTY }, Span::new(0, 4));
        let recovered = Decl::recovered(DeclKind::Open { module: Name::EMPTY }, Span::new(0, 4));
        assert_ne!(well, recovered);
    }

    #[test]
    fn bound_names() {
        let let_decl = Decl::new(
            DeclKind::Let {
                name: Name::EMPTY,
                value: ExprNode::new(ExprKind::Int(1), Span::new(8, 9)),
            },
            Span::new(0, 9),
        );
        assert_eq!(let_decl.name(), Some(Name::EMPTY));

        let open_decl = Decl::new(DeclKind::Open { module: Name::EMPTY }, Span::new(0, 6));
        assert_eq!(open_decl.name(), None);
    }

    #[test]
    fn missing_nodes_are_recovered_points() {
        let expr = ExprNode::missing(12);
        assert_eq!(expr.provenance, Provenance::Recovered);
        assert!(expr.span.is_empty());
        assert_eq!(expr.span.start, 12);
    }
}
