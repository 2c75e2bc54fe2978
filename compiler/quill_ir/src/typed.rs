//! Typed tree fragments.
//!
//! Semantic analysis turns each declaration into one [`TypedNode`] tree.
//! Nodes keep their source spans and provenance so position queries can walk
//! from the outermost declaration inward and skip recovery placeholders.

use super::{Name, Provenance, Span};
use std::fmt;

/// A Quill type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ty {
    Int,
    Str,
    Bool,
    /// A named type introduced by a `type` alias.
    Named(Name),
    /// The type of an expression that failed to check.
    Error,
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Int => write!(f, "int"),
            Ty::Str => write!(f, "str"),
            Ty::Bool => write!(f, "bool"),
            Ty::Named(name) => write!(f, "<type #{}>", name.index()),
            Ty::Error => write!(f, "<error>"),
        }
    }
}

/// One node of the typed tree.
///
/// Children are stored outermost-to-innermost in source order; a node's span
/// always covers its children's spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedNode {
    pub ty: Ty,
    pub span: Span,
    pub provenance: Provenance,
    pub children: Vec<TypedNode>,
}

impl TypedNode {
    /// Create a leaf node.
    pub fn leaf(ty: Ty, span: Span, provenance: Provenance) -> Self {
        TypedNode {
            ty,
            span,
            provenance,
            children: Vec::new(),
        }
    }

    /// Create an interior node with children.
    pub fn with_children(
        ty: Ty,
        span: Span,
        provenance: Provenance,
        children: Vec<TypedNode>,
    ) -> Self {
        TypedNode {
            ty,
            span,
            provenance,
            children,
        }
    }

    /// Check whether this node's range contains a byte position.
    #[inline]
    pub fn contains(&self, pos: u32) -> bool {
        self.span.contains(pos)
    }
}
