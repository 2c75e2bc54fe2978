//! Token items for the Quill lexer.
//!
//! A token item is either a valid token or a lexical error; the lexer never
//! raises on bad input, it emits an error item and keeps going. Items are
//! produced in strictly increasing position order.
//!
//! Two notions of equality apply to token items held behind `Arc`:
//! - *strong*: `Arc::ptr_eq` - same allocation, nothing changed
//! - *weak*: `PartialEq` - same kind and positions, safe to reuse derived
//!   parser state even though the allocation differs

use super::{Name, Span};
use std::fmt;

/// A token with its span in the source.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    #[inline]
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Token { kind, span }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} @ {}", self.kind, self.span)
    }
}

/// Token kinds for Quill.
///
/// `Begin`/`End` are only produced when the `blocks` language extension is
/// enabled; with the extension off they lex as plain identifiers.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum TokenKind {
    /// Integer literal: 42, `1_000`
    Int(i64),
    /// String literal (interned): "hello"
    Str(Name),
    /// Lowercase identifier (interned)
    Ident(Name),
    /// Capitalized identifier (interned): module names
    UpperIdent(Name),

    Let,
    Val,
    Type,
    Open,
    True,
    False,
    Begin,
    End,

    IntType,  // int
    StrType,  // str
    BoolType, // bool

    Eq,
    Colon,
    Plus,
    Minus,
    Star,
    LParen,
    RParen,

    /// Synthetic token anchoring the start of every token history.
    Start,
    /// End of input.
    Eof,
}

impl TokenKind {
    /// Stable discriminant index for bitset membership ([`u32`], dense).
    #[inline]
    pub const fn discriminant_index(&self) -> u32 {
        match self {
            TokenKind::Int(_) => 0,
            TokenKind::Str(_) => 1,
            TokenKind::Ident(_) => 2,
            TokenKind::UpperIdent(_) => 3,
            TokenKind::Let => 4,
            TokenKind::Val => 5,
            TokenKind::Type => 6,
            TokenKind::Open => 7,
            TokenKind::True => 8,
            TokenKind::False => 9,
            TokenKind::Begin => 10,
            TokenKind::End => 11,
            TokenKind::IntType => 12,
            TokenKind::StrType => 13,
            TokenKind::BoolType => 14,
            TokenKind::Eq => 15,
            TokenKind::Colon => 16,
            TokenKind::Plus => 17,
            TokenKind::Minus => 18,
            TokenKind::Star => 19,
            TokenKind::LParen => 20,
            TokenKind::RParen => 21,
            TokenKind::Start => 22,
            TokenKind::Eof => 23,
        }
    }
}

/// Kinds of lexical error surfaced as token items.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum LexErrorKind {
    /// A string literal without a closing quote.
    UnterminatedString,
    /// A byte that starts no token.
    InvalidChar(char),
    /// An integer literal that does not fit the integer type.
    IntOutOfRange,
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexErrorKind::UnterminatedString => write!(f, "unterminated string literal"),
            LexErrorKind::InvalidChar(c) => write!(f, "invalid character `{c}`"),
            LexErrorKind::IntOutOfRange => write!(f, "integer literal out of range"),
        }
    }
}

/// One item of the lexical stream: a valid token or a lexical error.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum TokenItem {
    Valid(Token),
    Error { kind: LexErrorKind, span: Span },
}

impl TokenItem {
    /// Source span covered by this item.
    #[inline]
    pub fn span(&self) -> Span {
        match self {
            TokenItem::Valid(token) => token.span,
            TokenItem::Error { span, .. } => *span,
        }
    }

    /// The token kind, if this item is a valid token.
    #[inline]
    pub fn kind(&self) -> Option<&TokenKind> {
        match self {
            TokenItem::Valid(token) => Some(&token.kind),
            TokenItem::Error { .. } => None,
        }
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, TokenItem::Error { .. })
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(
            self,
            TokenItem::Valid(Token {
                kind: TokenKind::Eof,
                ..
            })
        )
    }

    #[inline]
    pub fn is_start(&self) -> bool {
        matches!(
            self,
            TokenItem::Valid(Token {
                kind: TokenKind::Start,
                ..
            })
        )
    }

    /// The synthetic start item anchoring a token history.
    pub fn start_anchor() -> Self {
        TokenItem::Valid(Token::new(TokenKind::Start, Span::point(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminant_indices_are_dense_and_unique() {
        let kinds = [
            TokenKind::Int(0),
            TokenKind::Str(Name::EMPTY),
            TokenKind::Ident(Name::EMPTY),
            TokenKind::UpperIdent(Name::EMPTY),
            TokenKind::Let,
            TokenKind::Val,
            TokenKind::Type,
            TokenKind::Open,
            TokenKind::True,
            TokenKind::False,
            TokenKind::Begin,
            TokenKind::End,
            TokenKind::IntType,
            TokenKind::StrType,
            TokenKind::BoolType,
            TokenKind::Eq,
            TokenKind::Colon,
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Star,
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::Start,
            TokenKind::Eof,
        ];
        for (i, kind) in kinds.iter().enumerate() {
            assert_eq!(kind.discriminant_index() as usize, i);
        }
    }

    #[test]
    fn weak_equality_ignores_allocation() {
        let a = TokenItem::Valid(Token::new(TokenKind::Let, Span::new(0, 3)));
        let b = TokenItem::Valid(Token::new(TokenKind::Let, Span::new(0, 3)));
        assert_eq!(a, b);

        let shifted = TokenItem::Valid(Token::new(TokenKind::Let, Span::new(1, 4)));
        assert_ne!(a, shifted);
    }

    #[test]
    fn error_items_carry_spans() {
        let item = TokenItem::Error {
            kind: LexErrorKind::InvalidChar('#'),
            span: Span::new(5, 6),
        };
        assert!(item.is_error());
        assert_eq!(item.span(), Span::new(5, 6));
        assert_eq!(item.kind(), None);
    }

    #[test]
    fn start_anchor_is_start() {
        let anchor = TokenItem::start_anchor();
        assert!(anchor.is_start());
        assert!(!anchor.is_eof());
        assert!(anchor.span().is_empty());
    }
}
