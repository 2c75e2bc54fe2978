//! Token sets for recovery boundaries.
//!
//! Bitset-based O(1) membership testing. Each bit in the u32 corresponds to
//! a `TokenKind` discriminant index; Quill has 24 token kinds, so u32
//! covers all variants.

use quill_ir::TokenKind;

/// A set of token kinds using bitset representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenSet(u32);

impl TokenSet {
    /// Create an empty token set.
    #[inline]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Add a token kind to this set (builder pattern for const contexts).
    #[inline]
    #[must_use]
    pub const fn with(self, kind: &TokenKind) -> Self {
        Self(self.0 | (1u32 << kind.discriminant_index()))
    }

    /// Union of two token sets.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Check if this set contains a token kind.
    #[inline]
    pub const fn contains(&self, kind: &TokenKind) -> bool {
        (self.0 & (1u32 << kind.discriminant_index())) != 0
    }

    /// Check if this set is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Count the number of token kinds in this set.
    #[inline]
    pub const fn count(&self) -> u32 {
        self.0.count_ones()
    }
}

impl Default for TokenSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Tokens that begin a top-level declaration.
///
/// Used both by the recovery automaton (to force a declaration boundary)
/// and by the buffer (to find a safe relex restart point).
pub const DECL_START: TokenSet = TokenSet::new()
    .with(&TokenKind::Let)
    .with(&TokenKind::Val)
    .with(&TokenKind::Type)
    .with(&TokenKind::Open);

/// Tokens that can appear as an expression operand.
pub const OPERAND: TokenSet = TokenSet::new()
    .with(&TokenKind::Int(0))
    .with(&TokenKind::Str(quill_ir::Name::EMPTY))
    .with(&TokenKind::True)
    .with(&TokenKind::False)
    .with(&TokenKind::Ident(quill_ir::Name::EMPTY));

/// Tokens that can appear in type position.
pub const TYPE_START: TokenSet = TokenSet::new()
    .with(&TokenKind::IntType)
    .with(&TokenKind::StrType)
    .with(&TokenKind::BoolType)
    .with(&TokenKind::Ident(quill_ir::Name::EMPTY))
    .with(&TokenKind::UpperIdent(quill_ir::Name::EMPTY));
