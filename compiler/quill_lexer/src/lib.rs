//! Quill Lexer - keyword-table-driven tokenization.
//!
//! The lexer fulfils the analysis engine's lexer contract: given a keyword
//! table and a restart point it produces a lazy, position-ordered sequence
//! of token items, signalling lexical errors as items rather than raising.
//!
//! # Main Entry Points
//!
//! - [`lex`]: collect all items from a restart point
//! - [`Tokens`]: the underlying restartable iterator
//! - [`KeywordTable`]: extension-derived keyword resolution

mod keywords;
mod lexer;

pub use keywords::{Extension, KeywordTable};
pub use lexer::{lex, LexRestart, Tokens};
