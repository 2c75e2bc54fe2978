//! Keyword tables derived from the enabled language-extension set.
//!
//! Keywords affect the tokenization of every identifier-like token, so the
//! table is an input to the lexer rather than a constant: toggling an
//! extension produces a different table, and a buffer lexed under a stale
//! table must be relexed from the start.

use quill_ir::TokenKind;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;

/// A keyword-affecting language extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    /// Adds the `begin` / `end` block keywords.
    Blocks,
}

impl Extension {
    /// All known extensions.
    pub const ALL: [Extension; 1] = [Extension::Blocks];

    /// Look up an extension by its user-facing name.
    pub fn from_name(name: &str) -> Option<Extension> {
        match name {
            "blocks" => Some(Extension::Blocks),
            _ => None,
        }
    }

    /// The user-facing name.
    pub const fn name(self) -> &'static str {
        match self {
            Extension::Blocks => "blocks",
        }
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Keywords available in every configuration.
const BASE_KEYWORDS: [(&str, TokenKind); 9] = [
    ("bool", TokenKind::BoolType),
    ("false", TokenKind::False),
    ("int", TokenKind::IntType),
    ("let", TokenKind::Let),
    ("open", TokenKind::Open),
    ("str", TokenKind::StrType),
    ("true", TokenKind::True),
    ("type", TokenKind::Type),
    ("val", TokenKind::Val),
];

/// The lexer's keyword table for one extension configuration.
///
/// Derived from an extension set; two tables derived from set-equal
/// extension sets resolve identically. Consumers compare tables by `Arc`
/// identity (the project configuration memoizes one table per distinct
/// extension set), not by content.
pub struct KeywordTable {
    map: FxHashMap<&'static str, TokenKind>,
}

impl KeywordTable {
    /// Derive the table for an extension set.
    pub fn for_extensions(extensions: &FxHashSet<Extension>) -> Self {
        let mut map: FxHashMap<&'static str, TokenKind> = BASE_KEYWORDS.iter().cloned().collect();
        if extensions.contains(&Extension::Blocks) {
            map.insert("begin", TokenKind::Begin);
            map.insert("end", TokenKind::End);
        }
        KeywordTable { map }
    }

    /// Resolve identifier text to a keyword token kind, if it is one.
    #[inline]
    pub fn resolve(&self, text: &str) -> Option<TokenKind> {
        self.map.get(text).cloned()
    }

    /// Number of keywords in the table.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
