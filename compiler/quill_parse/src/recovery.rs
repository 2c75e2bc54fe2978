//! The deterministic recovery automaton.
//!
//! Parser state is purely derived from the token stream: [`step`] is a pure
//! function of (prior state, token item), so replaying the same tokens from
//! the same start state always yields the same recovery states. That
//! determinism is what lets the buffer carry parse states forward across
//! edits without replaying unaffected history.
//!
//! A [`RecoveryState`] pairs the automaton frame with the locally
//! synthesized repair (if any) that kept parsing going at this token.

use crate::token_set::{DECL_START, OPERAND, TYPE_START};
use quill_ir::{Span, TokenItem, TokenKind};

/// Position of the automaton inside the declaration grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frame {
    /// Between declarations, expecting a declaration keyword.
    TopLevel,
    /// After `let`, expecting the bound name.
    LetName,
    /// After the bound name, expecting `=`.
    LetEq,
    /// Inside a `let` initializer expression.
    ///
    /// `depth` counts open groups (parentheses and `begin`/`end` blocks);
    /// `needs_operand` is true when the next expression token must be an
    /// operand (after `=`, an operator, or an open group).
    LetExpr { depth: u32, needs_operand: bool },
    /// After `val`, expecting the signature name.
    ValName,
    /// After the signature name, expecting `:`.
    ValColon,
    /// After `:`, expecting a type.
    ValTy,
    /// After `type`, expecting the alias name.
    TypeName,
    /// After the alias name, expecting `=`.
    TypeEq,
    /// After `=`, expecting the aliased type.
    TypeTy,
    /// After `open`, expecting a module name.
    OpenName,
}

/// A locally synthesized repair applied to keep parsing after an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Repair {
    pub kind: RepairKind,
    pub span: Span,
}

/// Repair kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepairKind {
    /// The token was skipped as if deleted from the input.
    SkippedToken,
    /// A placeholder was inserted to complete the unfinished declaration.
    InsertedPlaceholder,
}

/// Parser automaton frame plus any repair applied at the current token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecoveryState {
    pub frame: Frame,
    pub repair: Option<Repair>,
    /// Set once the automaton has consumed the end-of-input token.
    pub reached_eof: bool,
    /// True when the current token begins a new top-level declaration.
    pub decl_start: bool,
}

impl RecoveryState {
    /// The parser's start configuration, anchored at the synthetic start
    /// token.
    pub const INITIAL: RecoveryState = RecoveryState {
        frame: Frame::TopLevel,
        repair: None,
        reached_eof: false,
        decl_start: false,
    };

    /// Whether this state carries a synthesized recovery repair.
    #[inline]
    pub const fn is_synthesized(&self) -> bool {
        self.repair.is_some()
    }

    /// Whether the declaration in progress is complete enough to be closed
    /// without inserting a placeholder.
    const fn at_clean_boundary(&self) -> bool {
        matches!(
            self.frame,
            Frame::TopLevel
                | Frame::LetExpr {
                    depth: 0,
                    needs_operand: false,
                }
        )
    }
}

/// Advance the automaton by one token item.
///
/// Deterministic: the result depends only on `prev` and `item`.
pub fn step(prev: &RecoveryState, item: &TokenItem) -> RecoveryState {
    let span = item.span();
    let Some(kind) = item.kind() else {
        // Lexical error items are skipped; the frame is unchanged.
        return RecoveryState {
            frame: prev.frame,
            repair: Some(Repair {
                kind: RepairKind::SkippedToken,
                span,
            }),
            reached_eof: false,
            decl_start: false,
        };
    };

    if matches!(kind, TokenKind::Eof) {
        let repair = if prev.at_clean_boundary() {
            None
        } else {
            Some(Repair {
                kind: RepairKind::InsertedPlaceholder,
                span,
            })
        };
        return RecoveryState {
            frame: Frame::TopLevel,
            repair,
            reached_eof: true,
            decl_start: false,
        };
    }

    // A declaration keyword always forces a boundary, repairing the
    // unfinished declaration with a placeholder if necessary.
    if DECL_START.contains(kind) {
        let repair = if prev.at_clean_boundary() {
            None
        } else {
            Some(Repair {
                kind: RepairKind::InsertedPlaceholder,
                span,
            })
        };
        let frame = match kind {
            TokenKind::Let => Frame::LetName,
            TokenKind::Val => Frame::ValName,
            TokenKind::Type => Frame::TypeName,
            _ => Frame::OpenName,
        };
        return RecoveryState {
            frame,
            repair,
            reached_eof: false,
            decl_start: true,
        };
    }

    let skipped = |frame: Frame| RecoveryState {
        frame,
        repair: Some(Repair {
            kind: RepairKind::SkippedToken,
            span,
        }),
        reached_eof: false,
        decl_start: false,
    };
    let advanced = |frame: Frame| RecoveryState {
        frame,
        repair: None,
        reached_eof: false,
        decl_start: false,
    };

    match prev.frame {
        Frame::TopLevel => skipped(Frame::TopLevel),
        Frame::LetName => match kind {
            TokenKind::Ident(_) => advanced(Frame::LetEq),
            _ => skipped(Frame::LetName),
        },
        Frame::LetEq => match kind {
            TokenKind::Eq => advanced(Frame::LetExpr {
                depth: 0,
                needs_operand: true,
            }),
            _ => skipped(Frame::LetEq),
        },
        Frame::LetExpr {
            depth,
            needs_operand,
        } => match kind {
            _ if OPERAND.contains(kind) => advanced(Frame::LetExpr {
                depth,
                needs_operand: false,
            }),
            TokenKind::Plus | TokenKind::Minus | TokenKind::Star => advanced(Frame::LetExpr {
                depth,
                needs_operand: true,
            }),
            TokenKind::LParen | TokenKind::Begin => advanced(Frame::LetExpr {
                depth: depth.saturating_add(1),
                needs_operand: true,
            }),
            TokenKind::RParen | TokenKind::End => {
                if depth == 0 {
                    skipped(prev.frame)
                } else {
                    advanced(Frame::LetExpr {
                        depth: depth - 1,
                        needs_operand,
                    })
                }
            }
            _ => skipped(prev.frame),
        },
        Frame::ValName => match kind {
            TokenKind::Ident(_) => advanced(Frame::ValColon),
            _ => skipped(Frame::ValName),
        },
        Frame::ValColon => match kind {
            TokenKind::Colon => advanced(Frame::ValTy),
            _ => skipped(Frame::ValColon),
        },
        Frame::ValTy => {
            if TYPE_START.contains(kind) {
                advanced(Frame::TopLevel)
            } else {
                skipped(Frame::ValTy)
            }
        }
        Frame::TypeName => match kind {
            TokenKind::Ident(_) => advanced(Frame::TypeEq),
            _ => skipped(Frame::TypeName),
        },
        Frame::TypeEq => match kind {
            TokenKind::Eq => advanced(Frame::TypeTy),
            _ => skipped(Frame::TypeEq),
        },
        Frame::TypeTy => {
            if TYPE_START.contains(kind) {
                advanced(Frame::TopLevel)
            } else {
                skipped(Frame::TypeTy)
            }
        }
        Frame::OpenName => match kind {
            TokenKind::UpperIdent(_) => advanced(Frame::TopLevel),
            _ => skipped(Frame::OpenName),
        },
    }
}

/// Replay the automaton over a full token sequence from [`RecoveryState::INITIAL`].
pub fn replay<'a, I>(items: I) -> Vec<RecoveryState>
where
    I: IntoIterator<Item = &'a TokenItem>,
{
    let mut states = Vec::new();
    let mut prev = RecoveryState::INITIAL;
    for item in items {
        let next = step(&prev, item);
        states.push(next);
        prev = next;
    }
    states
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_ir::{Name, StringInterner, Token};
    use quill_lexer::{lex, KeywordTable, LexRestart};
    use std::sync::Arc;

    fn tokenize(source: &str) -> Vec<Arc<TokenItem>> {
        let interner = StringInterner::new();
        let table = KeywordTable::for_extensions(&rustc_hash::FxHashSet::default());
        lex(source, &table, &interner, LexRestart::FROM_START)
    }

    fn replay_source(source: &str) -> Vec<RecoveryState> {
        let items = tokenize(source);
        replay(items.iter().map(AsRef::as_ref))
    }

    #[test]
    fn clean_let_binding_has_no_repairs() {
        let states = replay_source("let x = 1 + 2");
        assert!(states.iter().all(|s| !s.is_synthesized()));
        assert!(states.last().is_some_and(|s| s.reached_eof));
    }

    #[test]
    fn decl_keyword_marks_boundary() {
        let states = replay_source("let x = 1 let y = 2");
        let boundaries: Vec<usize> = states
            .iter()
            .enumerate()
            .filter(|(_, s)| s.decl_start)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(boundaries.len(), 2);
        assert_eq!(boundaries[0], 0);
    }

    #[test]
    fn unfinished_let_repairs_at_next_decl() {
        // `let x =` is missing its initializer when `let y = 2` begins.
        let states = replay_source("let x = let y = 2");
        let second_let = states
            .iter()
            .enumerate()
            .filter(|(_, s)| s.decl_start)
            .nth(1);
        let Some((_, state)) = second_let else {
            panic!("should find second declaration boundary");
        };
        assert_eq!(
            state.repair.map(|r| r.kind),
            Some(RepairKind::InsertedPlaceholder)
        );
    }

    #[test]
    fn unfinished_let_repairs_at_eof() {
        let states = replay_source("let x =");
        let Some(last) = states.last() else {
            panic!("should produce at least one state");
        };
        assert!(last.reached_eof);
        assert_eq!(
            last.repair.map(|r| r.kind),
            Some(RepairKind::InsertedPlaceholder)
        );
    }

    #[test]
    fn deeply_nested_groups_balance_exactly() {
        let mut source = String::from("let x = ");
        source.push_str(&"(".repeat(300));
        source.push('1');
        source.push_str(&")".repeat(300));
        let states = replay_source(&source);
        assert!(states.iter().all(|s| !s.is_synthesized()));
        assert!(states.last().is_some_and(|s| s.reached_eof));
    }

    #[test]
    fn stray_token_is_skipped() {
        let states = replay_source("let x = 1 )");
        assert!(states
            .iter()
            .any(|s| s.repair.map(|r| r.kind) == Some(RepairKind::SkippedToken)));
    }

    #[test]
    fn lexical_error_item_is_skipped_without_frame_change() {
        let before = RecoveryState::INITIAL;
        let item = TokenItem::Error {
            kind: quill_ir::LexErrorKind::InvalidChar('#'),
            span: Span::new(0, 1),
        };
        let after = step(&before, &item);
        assert_eq!(after.frame, before.frame);
        assert_eq!(
            after.repair.map(|r| r.kind),
            Some(RepairKind::SkippedToken)
        );
    }

    #[test]
    fn replay_is_deterministic() {
        let items = tokenize("let x = (1 + 2) * 3 open List val y : int");
        let first = replay(items.iter().map(AsRef::as_ref));
        let second = replay(items.iter().map(AsRef::as_ref));
        assert_eq!(first, second);
    }

    #[test]
    fn step_depends_only_on_state_and_token() {
        let token = TokenItem::Valid(Token::new(TokenKind::Ident(Name::EMPTY), Span::new(4, 5)));
        let state = RecoveryState {
            frame: Frame::LetName,
            repair: None,
            reached_eof: false,
            decl_start: false,
        };
        assert_eq!(step(&state, &token), step(&state, &token));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arbitrary_kind() -> impl Strategy<Value = TokenKind> {
            prop_oneof![
                Just(TokenKind::Let),
                Just(TokenKind::Val),
                Just(TokenKind::Type),
                Just(TokenKind::Open),
                Just(TokenKind::Eq),
                Just(TokenKind::Colon),
                Just(TokenKind::Plus),
                Just(TokenKind::Star),
                Just(TokenKind::LParen),
                Just(TokenKind::RParen),
                Just(TokenKind::IntType),
                Just(TokenKind::Ident(Name::EMPTY)),
                Just(TokenKind::UpperIdent(Name::EMPTY)),
                any::<i64>().prop_map(TokenKind::Int),
            ]
        }

        proptest! {
            // Replaying the same token sequence from the same start state
            // yields structurally equal recovery states both times.
            #[test]
            fn replay_deterministic(kinds in proptest::collection::vec(arbitrary_kind(), 0..64)) {
                let items: Vec<TokenItem> = kinds
                    .iter()
                    .enumerate()
                    .map(|(i, kind)| {
                        let at = u32::try_from(i).unwrap_or(u32::MAX);
                        TokenItem::Valid(Token::new(kind.clone(), Span::new(at, at + 1)))
                    })
                    .collect();
                let first = replay(items.iter());
                let second = replay(items.iter());
                prop_assert_eq!(first, second);
            }
        }
    }
}
