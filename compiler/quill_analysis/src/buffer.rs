//! Per-document incremental lexing and parsing state.
//!
//! A [`Buffer`] owns two versioned streams for one document: the token
//! stream and the parse stream of (token, recovery state) pairs derived
//! from it. Both are anchored at a synthetic start token so the parser's
//! start configuration always has a carrier item.
//!
//! [`Buffer::update`] is the incremental entry point: it decides where
//! re-lexing must resume, lexes the suffix, and synchronizes both streams
//! so that unaffected history is carried forward untouched. The semantic
//! analysis for a buffer whose parse stream has reached end of input is
//! memoized; an in-progress buffer is re-analyzed per query.

use crate::cache::{AnalysisCache, AnalysisResult, CacheKey};
use crate::config::Stamp;
use crate::history::{History, SyncStats};
use quill_ir::{ProgramShape, Span, StringInterner, TokenItem};
use quill_lexer::{lex, KeywordTable, LexRestart};
use quill_parse::{assemble, step, Assembled, Frame, RecoveryState, DECL_START};
use quill_typeck::GlobalTables;
use std::path::PathBuf;
use std::sync::Arc;

/// One item of the parse stream: a token with the recovery state reached
/// after consuming it.
#[derive(Debug, Clone)]
pub struct ParseItem {
    pub token: Arc<TokenItem>,
    pub state: RecoveryState,
}

/// A structural anchor captured by [`Buffer::set_mark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mark {
    frame: Frame,
    span: Span,
}

/// Per-stream reuse counts from one [`Buffer::update`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateStats {
    pub tokens: SyncStats,
    pub parse: SyncStats,
}

/// Incremental state for one open document.
pub struct Buffer {
    path: Option<PathBuf>,
    shape: ProgramShape,
    tokens: History<Arc<TokenItem>>,
    parse: History<ParseItem>,
    keywords: Arc<KeywordTable>,
    stamp: Stamp,
    mark: Option<Mark>,
    typed_memo: Option<Arc<AnalysisResult>>,
}

impl Buffer {
    /// Create a buffer with empty streams anchored at the start token.
    pub fn new(
        path: Option<PathBuf>,
        shape: ProgramShape,
        keywords: Arc<KeywordTable>,
        stamp: Stamp,
    ) -> Self {
        let (tokens, parse) = anchored_streams();
        Buffer {
            path,
            shape,
            tokens,
            parse,
            keywords,
            stamp,
            mark: None,
            typed_memo: None,
        }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub fn shape(&self) -> ProgramShape {
        self.shape
    }

    /// Token items currently held, anchor first.
    pub fn token_items(&self) -> &[Arc<TokenItem>] {
        self.tokens.items()
    }

    /// Parse items currently held, anchor first.
    pub fn parse_items(&self) -> &[ParseItem] {
        self.parse.items()
    }

    /// Whether the parse stream has consumed the end-of-input token.
    pub fn reached_eof(&self) -> bool {
        self.parse.items().last().is_some_and(|item| item.state.reached_eof)
    }

    /// Decide where re-lexing must resume.
    ///
    /// If the keyword table changed since the last lex, every token is
    /// suspect (keywords affect the tokenization of all identifier-like
    /// text) and both streams are reset for a full re-lex. Otherwise the
    /// token cursor scans backward from the end for the nearest safe
    /// boundary before `from` (a declaration keyword, a lexical-error
    /// item, or the anchor), then rewinds one step so the boundary token
    /// itself is re-lexed.
    pub fn start_lexing(
        &mut self,
        from: Option<u32>,
        keywords: &Arc<KeywordTable>,
    ) -> LexRestart {
        if !Arc::ptr_eq(&self.keywords, keywords) {
            tracing::debug!("keyword table changed, invalidating token history");
            self.keywords = Arc::clone(keywords);
            let (tokens, parse) = anchored_streams();
            self.tokens = tokens;
            self.parse = parse;
            self.typed_memo = None;
            return LexRestart::FROM_START;
        }

        let limit = from.unwrap_or(u32::MAX);
        self.tokens.seek_end();
        // The anchor satisfies the predicate, so the seek always lands.
        self.tokens.seek_backward(|item| {
            item.is_start()
                || (item.span().end <= limit
                    && (item.is_error()
                        || item.kind().is_some_and(|kind| DECL_START.contains(kind))))
        });
        self.tokens.move_by(-1);
        LexRestart::at(self.tokens.focused().span().end)
    }

    /// Re-lex from the restart point and synchronize both streams.
    ///
    /// Tokens before the restart point are carried forward by identity;
    /// re-lexed tokens that are content-equal to their predecessors keep
    /// their derived recovery states; genuinely new tokens get fresh states
    /// seeded from the previous item via the recovery automaton. Any
    /// memoized analysis is cleared.
    pub fn update(
        &mut self,
        source: &str,
        edit_at: Option<u32>,
        keywords: &Arc<KeywordTable>,
        stamp: &Stamp,
        interner: &StringInterner,
    ) -> UpdateStats {
        if !stamp.is_same(&self.stamp) {
            self.stamp = stamp.clone();
            self.typed_memo = None;
        }
        let restart = self.start_lexing(edit_at, keywords);

        let mut new_tokens: Vec<Arc<TokenItem>> =
            self.tokens.items()[..=self.tokens.position()].to_vec();
        new_tokens.extend(lex(source, &self.keywords, interner, restart));

        let (tokens, token_stats) = self.tokens.sync(
            &new_tokens,
            |prev, raw| Arc::ptr_eq(prev, raw),
            |prev, raw| prev == raw,
            |_, raw| Arc::clone(raw),
            |_, raw| Arc::clone(raw),
        );
        self.tokens = tokens;

        let token_items = self.tokens.items().to_vec();
        let (parse, parse_stats) = self.parse.sync(
            &token_items,
            |prev, raw| Arc::ptr_eq(&prev.token, raw),
            |prev, raw| *prev.token == **raw,
            |prev, raw| ParseItem {
                token: Arc::clone(raw),
                state: prev.state,
            },
            |last, raw| {
                let seed = last.map_or(RecoveryState::INITIAL, |item| item.state);
                ParseItem {
                    token: Arc::clone(raw),
                    state: step(&seed, raw),
                }
            },
        );
        self.parse = parse;
        self.typed_memo = None;

        UpdateStats {
            tokens: token_stats,
            parse: parse_stats,
        }
    }

    /// Assemble the buffer's current declaration sequence.
    pub fn declarations(&self) -> Assembled {
        assemble(self.tokens.items(), self.shape)
    }

    /// The buffer's semantic analysis.
    ///
    /// Memoized once the parse stream has reached end of input and while
    /// the validity stamp is unchanged; an in-progress buffer is analyzed
    /// afresh on every call.
    pub fn typer(
        &mut self,
        key: CacheKey,
        stamp: &Stamp,
        cache: &mut AnalysisCache,
        tables: &mut GlobalTables,
        interner: &StringInterner,
    ) -> Arc<AnalysisResult> {
        if !stamp.is_same(&self.stamp) {
            self.stamp = stamp.clone();
            self.typed_memo = None;
        }
        if let Some(memo) = &self.typed_memo {
            return Arc::clone(memo);
        }
        let assembled = self.declarations();
        let (result, _) = cache.run(key, self.shape, &assembled.decls, tables, interner);
        if self.reached_eof() {
            self.typed_memo = Some(Arc::clone(&result));
        }
        result
    }

    /// Capture the parse frame at a source position as a mark.
    ///
    /// Scans backward for the latest parse item whose token covers (or
    /// ends at or before) the position.
    pub fn set_mark(&mut self, at: u32) {
        let item = self
            .parse
            .items()
            .iter()
            .rev()
            .find(|item| {
                let span = item.token.span();
                span.contains(at) || span.end <= at
            });
        self.mark = item.map(|item| Mark {
            frame: item.state.frame,
            span: item.token.span(),
        });
    }

    /// Test whether the marked frame is still present at the same
    /// structural location in the current parse stream.
    pub fn get_mark(&self) -> bool {
        let Some(mark) = self.mark else {
            return false;
        };
        self.parse
            .items()
            .iter()
            .any(|item| item.state.frame == mark.frame && item.token.span() == mark.span)
    }
}

fn anchored_streams() -> (History<Arc<TokenItem>>, History<ParseItem>) {
    let anchor = Arc::new(TokenItem::start_anchor());
    let tokens = History::new(Arc::clone(&anchor));
    let parse = History::new(ParseItem {
        token: anchor,
        state: RecoveryState::INITIAL,
    });
    (tokens, parse)
}
