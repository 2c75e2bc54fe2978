//! Byte-cursor scanner producing token items.
//!
//! The lexer is a restartable iterator: given a [`LexRestart`] it resumes
//! scanning at an absolute byte offset and produces items in strictly
//! increasing position order. Lexical errors are emitted as items, never
//! raised, so a buffer with bad bytes still yields a complete stream.

use crate::KeywordTable;
use quill_ir::{LexErrorKind, Span, StringInterner, Token, TokenItem, TokenKind};
use std::sync::Arc;

/// Continuation priming a lexer run at an absolute byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexRestart {
    pub offset: u32,
}

impl LexRestart {
    /// Restart from the beginning of the buffer.
    pub const FROM_START: LexRestart = LexRestart { offset: 0 };

    #[inline]
    pub const fn at(offset: u32) -> Self {
        LexRestart { offset }
    }
}

/// Restartable token iterator over a source buffer.
pub struct Tokens<'src> {
    source: &'src str,
    keywords: &'src KeywordTable,
    interner: &'src StringInterner,
    pos: usize,
    emitted_eof: bool,
}

impl<'src> Tokens<'src> {
    /// Start scanning `source` from the restart point.
    ///
    /// A restart offset past the end of the buffer clamps to the end, so the
    /// iterator yields only the end-of-input item.
    pub fn new(
        source: &'src str,
        keywords: &'src KeywordTable,
        interner: &'src StringInterner,
        restart: LexRestart,
    ) -> Self {
        Tokens {
            source,
            keywords,
            interner,
            pos: (restart.offset as usize).min(source.len()),
            emitted_eof: false,
        }
    }

    #[inline]
    fn rest(&self) -> &'src str {
        &self.source[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    #[inline]
    fn span_from(&self, start: usize) -> Span {
        // Offsets are bounded by the buffer length; editor buffers past
        // u32::MAX bytes are not supported.
        Span::new(u32::try_from(start).unwrap_or(u32::MAX), self.pos_u32())
    }

    #[inline]
    fn pos_u32(&self) -> u32 {
        u32::try_from(self.pos).unwrap_or(u32::MAX)
    }

    fn scan_number(&mut self, start: usize) -> TokenItem {
        let bytes = self.source.as_bytes();
        while self.pos < bytes.len() && (bytes[self.pos].is_ascii_digit() || bytes[self.pos] == b'_')
        {
            self.pos += 1;
        }
        let text: String = self.source[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        match text.parse::<i64>() {
            Ok(value) => TokenItem::Valid(Token::new(TokenKind::Int(value), self.span_from(start))),
            Err(_) => TokenItem::Error {
                kind: LexErrorKind::IntOutOfRange,
                span: self.span_from(start),
            },
        }
    }

    fn scan_word(&mut self, start: usize) -> TokenItem {
        let bytes = self.source.as_bytes();
        while self.pos < bytes.len()
            && (bytes[self.pos].is_ascii_alphanumeric() || bytes[self.pos] == b'_')
        {
            self.pos += 1;
        }
        let text = &self.source[start..self.pos];
        let span = self.span_from(start);

        if let Some(kind) = self.keywords.resolve(text) {
            return TokenItem::Valid(Token::new(kind, span));
        }
        let name = self.interner.intern(text);
        let kind = if text.starts_with(|c: char| c.is_ascii_uppercase()) {
            TokenKind::UpperIdent(name)
        } else {
            TokenKind::Ident(name)
        };
        TokenItem::Valid(Token::new(kind, span))
    }

    fn scan_string(&mut self, start: usize) -> TokenItem {
        let bytes = self.source.as_bytes();
        self.pos += 1; // opening quote
        let content_start = self.pos;
        while self.pos < bytes.len() && bytes[self.pos] != b'"' && bytes[self.pos] != b'\n' {
            self.pos += 1;
        }
        if self.pos < bytes.len() && bytes[self.pos] == b'"' {
            let name = self.interner.intern(&self.source[content_start..self.pos]);
            self.pos += 1; // closing quote
            TokenItem::Valid(Token::new(TokenKind::Str(name), self.span_from(start)))
        } else {
            TokenItem::Error {
                kind: LexErrorKind::UnterminatedString,
                span: self.span_from(start),
            }
        }
    }

    fn scan_punct(&mut self, start: usize, c: char) -> TokenItem {
        self.pos += c.len_utf8();
        let span = self.span_from(start);
        let kind = match c {
            '=' => TokenKind::Eq,
            ':' => TokenKind::Colon,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            _ => {
                return TokenItem::Error {
                    kind: LexErrorKind::InvalidChar(c),
                    span,
                }
            }
        };
        TokenItem::Valid(Token::new(kind, span))
    }
}

impl Iterator for Tokens<'_> {
    type Item = Arc<TokenItem>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        if self.pos >= self.source.len() {
            if self.emitted_eof {
                return None;
            }
            self.emitted_eof = true;
            let at = self.pos_u32();
            return Some(Arc::new(TokenItem::Valid(Token::new(
                TokenKind::Eof,
                Span::point(at),
            ))));
        }

        let start = self.pos;
        let c = self.rest().chars().next()?;
        let item = if c.is_ascii_digit() {
            self.scan_number(start)
        } else if c.is_ascii_alphabetic() || c == '_' {
            self.scan_word(start)
        } else if c == '"' {
            self.scan_string(start)
        } else {
            self.scan_punct(start, c)
        };
        Some(Arc::new(item))
    }
}

/// Lex a buffer from a restart point, collecting all items.
///
/// The stream always ends with an end-of-input token at the buffer length.
pub fn lex(
    source: &str,
    keywords: &KeywordTable,
    interner: &StringInterner,
    restart: LexRestart,
) -> Vec<Arc<TokenItem>> {
    Tokens::new(source, keywords, interner, restart).collect()
}
