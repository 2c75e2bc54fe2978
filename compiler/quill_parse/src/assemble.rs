//! Declaration assembly from a token stream.
//!
//! Turns a position-ordered token item sequence into the top-level
//! declaration sequence the analysis cache consumes. Syntax errors never
//! abort assembly: unfinished declarations are completed with recovery
//! placeholders, stray tokens are skipped, and every repair is reported as
//! a diagnostic on the declaration it landed in.

use crate::token_set::{DECL_START, TYPE_START};
use quill_diagnostic::Diagnostic;
use quill_ir::{
    BinOp, Decl, DeclKind, ExprKind, ExprNode, Name, ProgramShape, Span, TokenItem, TokenKind,
    TyExpr, TyExprKind,
};
use std::sync::Arc;

/// Result of assembling one buffer's declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembled {
    pub decls: Vec<Decl>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Assemble the declaration sequence for a buffer.
///
/// `shape` decides which declaration forms are well-formed: `val`
/// signatures in an interface, `let`/`open` in an implementation. A
/// declaration of the wrong shape is still assembled, but marked recovered
/// and reported.
pub fn assemble(items: &[Arc<TokenItem>], shape: ProgramShape) -> Assembled {
    let mut asm = Assembler {
        items,
        pos: 0,
        shape,
        diagnostics: Vec::new(),
    };
    let decls = asm.run();
    tracing::trace!(
        decls = decls.len(),
        diagnostics = asm.diagnostics.len(),
        "assembled declaration sequence"
    );
    Assembled {
        decls,
        diagnostics: asm.diagnostics,
    }
}

struct Assembler<'a> {
    items: &'a [Arc<TokenItem>],
    pos: usize,
    shape: ProgramShape,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Assembler<'a> {
    fn run(&mut self) -> Vec<Decl> {
        let mut decls = Vec::new();
        loop {
            self.skip_to_decl_start();
            let Some(kind) = self.peek_kind() else { break };
            let decl = match kind {
                TokenKind::Let => self.decl_let(),
                TokenKind::Val => self.decl_val(),
                TokenKind::Type => self.decl_type(),
                TokenKind::Open => self.decl_open(),
                _ => break,
            };
            decls.push(decl);
        }
        decls
    }

    /// Skip error items and stray tokens until a declaration keyword or
    /// end of input, reporting each skip.
    fn skip_to_decl_start(&mut self) {
        while let Some(item) = self.current() {
            match item.kind() {
                None => {
                    self.diagnostics
                        .push(Diagnostic::syntax(item.span(), "skipped invalid token"));
                    self.pos += 1;
                }
                Some(TokenKind::Start) => self.pos += 1,
                Some(TokenKind::Eof) => {
                    self.pos = self.items.len();
                    return;
                }
                Some(kind) if DECL_START.contains(kind) => return,
                Some(kind) => {
                    self.diagnostics.push(Diagnostic::syntax(
                        item.span(),
                        format!("expected a declaration, found {kind:?}"),
                    ));
                    self.pos += 1;
                }
            }
        }
    }

    #[inline]
    fn current(&self) -> Option<&'a TokenItem> {
        self.items.get(self.pos).map(AsRef::as_ref)
    }

    /// Peek the kind of the current item, skipping over lexical errors.
    fn peek_kind(&mut self) -> Option<&'a TokenKind> {
        while let Some(item) = self.items.get(self.pos) {
            match item.kind() {
                None => {
                    self.diagnostics
                        .push(Diagnostic::syntax(item.span(), "skipped invalid token"));
                    self.pos += 1;
                }
                Some(TokenKind::Eof) => return None,
                Some(_) => break,
            }
        }
        self.items.get(self.pos).and_then(|item| item.kind())
    }

    fn bump(&mut self) -> Span {
        let span = self
            .current()
            .map_or(Span::DUMMY, quill_ir::TokenItem::span);
        self.pos += 1;
        span
    }

    /// Position just past the last consumed token.
    fn prev_end(&self) -> u32 {
        self.items
            .get(self.pos.saturating_sub(1))
            .map_or(0, |item| item.span().end)
    }

    fn eat(&mut self, expected: &TokenKind) -> Option<Span> {
        if self.peek_kind()? == expected {
            Some(self.bump())
        } else {
            None
        }
    }

    fn expect_ident(&mut self) -> Option<(Name, Span)> {
        match self.peek_kind() {
            Some(TokenKind::Ident(name)) => {
                let name = *name;
                Some((name, self.bump()))
            }
            _ => None,
        }
    }

    fn wrong_shape(&mut self, span: Span, what: &str) -> bool {
        let wrong = match self.shape {
            ProgramShape::Implementation => what == "val",
            ProgramShape::Interface => matches!(what, "let" | "open"),
        };
        if wrong {
            self.diagnostics.push(Diagnostic::syntax(
                span,
                format!("`{what}` declarations are not allowed in this program shape"),
            ));
        }
        wrong
    }

    fn decl_let(&mut self) -> Decl {
        let start = self.bump(); // let
        let mut recovered = self.wrong_shape(start, "let");

        let (name, _) = self.expect_ident().unwrap_or_else(|| {
            recovered = true;
            self.diagnostics
                .push(Diagnostic::syntax(start, "missing name after `let`"));
            (Name::EMPTY, Span::point(start.end))
        });
        if self.eat(&TokenKind::Eq).is_none() {
            recovered = true;
            self.diagnostics.push(Diagnostic::syntax(
                Span::point(self.prev_end()),
                "missing `=` in `let` declaration",
            ));
        }
        let value = self.expr(&mut recovered);
        let span = Span::new(start.start, value.span.end.max(start.end));
        let kind = DeclKind::Let { name, value };
        if recovered {
            Decl::recovered(kind, span)
        } else {
            Decl::new(kind, span)
        }
    }

    fn decl_val(&mut self) -> Decl {
        let start = self.bump(); // val
        let mut recovered = self.wrong_shape(start, "val");

        let (name, _) = self.expect_ident().unwrap_or_else(|| {
            recovered = true;
            self.diagnostics
                .push(Diagnostic::syntax(start, "missing name after `val`"));
            (Name::EMPTY, Span::point(start.end))
        });
        if self.eat(&TokenKind::Colon).is_none() {
            recovered = true;
            self.diagnostics.push(Diagnostic::syntax(
                Span::point(self.prev_end()),
                "missing `:` in `val` signature",
            ));
        }
        let ty = self.ty(&mut recovered);
        let span = Span::new(start.start, ty.span.end.max(start.end));
        let kind = DeclKind::Val { name, ty };
        if recovered {
            Decl::recovered(kind, span)
        } else {
            Decl::new(kind, span)
        }
    }

    fn decl_type(&mut self) -> Decl {
        let start = self.bump(); // type
        let mut recovered = false;

        let (name, _) = self.expect_ident().unwrap_or_else(|| {
            recovered = true;
            self.diagnostics
                .push(Diagnostic::syntax(start, "missing name after `type`"));
            (Name::EMPTY, Span::point(start.end))
        });
        if self.eat(&TokenKind::Eq).is_none() {
            recovered = true;
            self.diagnostics.push(Diagnostic::syntax(
                Span::point(self.prev_end()),
                "missing `=` in `type` declaration",
            ));
        }
        let ty = self.ty(&mut recovered);
        let span = Span::new(start.start, ty.span.end.max(start.end));
        let kind = DeclKind::TypeAlias { name, ty };
        if recovered {
            Decl::recovered(kind, span)
        } else {
            Decl::new(kind, span)
        }
    }

    fn decl_open(&mut self) -> Decl {
        let start = self.bump(); // open
        let mut recovered = self.wrong_shape(start, "open");

        let (module, end) = match self.peek_kind() {
            Some(TokenKind::UpperIdent(name)) => {
                let name = *name;
                let span = self.bump();
                (name, span.end)
            }
            _ => {
                recovered = true;
                self.diagnostics
                    .push(Diagnostic::syntax(start, "missing module name after `open`"));
                (Name::EMPTY, start.end)
            }
        };
        let span = Span::new(start.start, end);
        let kind = DeclKind::Open { module };
        if recovered {
            Decl::recovered(kind, span)
        } else {
            Decl::new(kind, span)
        }
    }

    // === Expressions ===

    fn expr(&mut self, recovered: &mut bool) -> ExprNode {
        let mut lhs = self.term(recovered);
        while let Some(op) = self.peek_binop(&[TokenKind::Plus, TokenKind::Minus]) {
            self.bump();
            let rhs = self.term(recovered);
            let span = lhs.span.merge(rhs.span);
            lhs = ExprNode::new(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }
        lhs
    }

    fn term(&mut self, recovered: &mut bool) -> ExprNode {
        let mut lhs = self.atom(recovered);
        while self.peek_binop(&[TokenKind::Star]).is_some() {
            self.bump();
            let rhs = self.atom(recovered);
            let span = lhs.span.merge(rhs.span);
            lhs = ExprNode::new(
                ExprKind::Binary {
                    op: BinOp::Mul,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }
        lhs
    }

    fn peek_binop(&mut self, accepted: &[TokenKind]) -> Option<BinOp> {
        let kind = self.peek_kind()?;
        if !accepted.contains(kind) {
            return None;
        }
        match kind {
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Sub),
            TokenKind::Star => Some(BinOp::Mul),
            _ => None,
        }
    }

    fn atom(&mut self, recovered: &mut bool) -> ExprNode {
        let Some(kind) = self.peek_kind().cloned() else {
            *recovered = true;
            let at = self.prev_end();
            self.diagnostics
                .push(Diagnostic::syntax(Span::point(at), "missing expression"));
            return ExprNode::missing(at);
        };
        match kind {
            TokenKind::Int(value) => {
                let span = self.bump();
                ExprNode::new(ExprKind::Int(value), span)
            }
            TokenKind::Str(name) => {
                let span = self.bump();
                ExprNode::new(ExprKind::Str(name), span)
            }
            TokenKind::True => {
                let span = self.bump();
                ExprNode::new(ExprKind::Bool(true), span)
            }
            TokenKind::False => {
                let span = self.bump();
                ExprNode::new(ExprKind::Bool(false), span)
            }
            TokenKind::Ident(name) => {
                let span = self.bump();
                ExprNode::new(ExprKind::Ident(name), span)
            }
            TokenKind::LParen | TokenKind::Begin => {
                let open = self.bump();
                let close_kind = if kind == TokenKind::LParen {
                    TokenKind::RParen
                } else {
                    TokenKind::End
                };
                let inner = self.expr(recovered);
                let end = match self.eat(&close_kind) {
                    Some(close) => close.end,
                    None => {
                        *recovered = true;
                        self.diagnostics.push(Diagnostic::syntax(
                            open,
                            "unclosed group in expression",
                        ));
                        inner.span.end
                    }
                };
                ExprNode::new(
                    ExprKind::Paren(Box::new(inner)),
                    Span::new(open.start, end),
                )
            }
            _ => {
                *recovered = true;
                let at = self.prev_end();
                self.diagnostics
                    .push(Diagnostic::syntax(Span::point(at), "missing expression"));
                ExprNode::missing(at)
            }
        }
    }

    // === Types ===

    fn ty(&mut self, recovered: &mut bool) -> TyExpr {
        let Some(kind) = self.peek_kind().cloned() else {
            *recovered = true;
            let at = self.prev_end();
            self.diagnostics
                .push(Diagnostic::syntax(Span::point(at), "missing type"));
            return TyExpr::missing(at);
        };
        if !TYPE_START.contains(&kind) {
            *recovered = true;
            let at = self.prev_end();
            self.diagnostics
                .push(Diagnostic::syntax(Span::point(at), "missing type"));
            return TyExpr::missing(at);
        }
        let span = self.bump();
        let ty_kind = match kind {
            TokenKind::IntType => TyExprKind::Int,
            TokenKind::StrType => TyExprKind::Str,
            TokenKind::BoolType => TyExprKind::Bool,
            TokenKind::Ident(name) | TokenKind::UpperIdent(name) => TyExprKind::Named(name),
            _ => TyExprKind::Error,
        };
        TyExpr::new(ty_kind, span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quill_ir::{Provenance, StringInterner};
    use quill_lexer::{lex, KeywordTable, LexRestart};
    use rustc_hash::FxHashSet;

    fn parse(source: &str, shape: ProgramShape) -> (Assembled, StringInterner) {
        let interner = StringInterner::new();
        let table = KeywordTable::for_extensions(&FxHashSet::default());
        let items = lex(source, &table, &interner, LexRestart::FROM_START);
        (assemble(&items, shape), interner)
    }

    #[test]
    fn assembles_let_bindings() {
        let (result, interner) = parse("let x = 1\nlet y = x + 2", ProgramShape::Implementation);
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.decls.len(), 2);

        let x = interner.intern("x");
        assert_eq!(result.decls[0].name(), Some(x));
        assert_eq!(result.decls[0].provenance, Provenance::WellFormed);
    }

    #[test]
    fn assembles_interface_signatures() {
        let (result, _) = parse("val x : int\nval s : str", ProgramShape::Interface);
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.decls.len(), 2);
        assert!(matches!(result.decls[0].kind, DeclKind::Val { .. }));
    }

    #[test]
    fn missing_initializer_yields_placeholder() {
        let (result, _) = parse("let x =\nlet y = 2", ProgramShape::Implementation);
        assert_eq!(result.decls.len(), 2);
        assert_eq!(result.decls[0].provenance, Provenance::Recovered);
        let DeclKind::Let { value, .. } = &result.decls[0].kind else {
            panic!("first declaration should be a let");
        };
        assert_eq!(value.kind, ExprKind::Error);
        // The second declaration is unaffected by the first one's error.
        assert_eq!(result.decls[1].provenance, Provenance::WellFormed);
        assert!(!result.diagnostics.is_empty());
    }

    #[test]
    fn operator_precedence() {
        let (result, _) = parse("let x = 1 + 2 * 3", ProgramShape::Implementation);
        let DeclKind::Let { value, .. } = &result.decls[0].kind else {
            panic!("should be a let");
        };
        let ExprKind::Binary { op, rhs, .. } = &value.kind else {
            panic!("should be a binary expression");
        };
        assert_eq!(*op, BinOp::Add);
        assert!(matches!(
            rhs.kind,
            ExprKind::Binary {
                op: BinOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn wrong_shape_is_recovered_not_fatal() {
        let (result, _) = parse("val x : int", ProgramShape::Implementation);
        assert_eq!(result.decls.len(), 1);
        assert_eq!(result.decls[0].provenance, Provenance::Recovered);
        assert!(!result.diagnostics.is_empty());
    }

    #[test]
    fn stray_tokens_are_skipped_with_diagnostics() {
        let (result, _) = parse(") ( let x = 1", ProgramShape::Implementation);
        assert_eq!(result.decls.len(), 1);
        assert!(result.diagnostics.len() >= 2);
        assert_eq!(result.decls[0].provenance, Provenance::WellFormed);
    }

    #[test]
    fn lexical_errors_do_not_abort_assembly() {
        let (result, _) = parse("let x = 1 # let y = 2", ProgramShape::Implementation);
        assert_eq!(result.decls.len(), 2);
    }

    #[test]
    fn spans_cover_whole_declarations() {
        let (result, _) = parse("let x = 1 + 2", ProgramShape::Implementation);
        assert_eq!(result.decls[0].span, Span::new(0, 13));
    }

    #[test]
    fn empty_input_yields_no_decls() {
        let (result, _) = parse("", ProgramShape::Implementation);
        assert!(result.decls.is_empty());
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn identical_input_assembles_identically() {
        let (first, _) = parse("let x = (1 + 2) * 3", ProgramShape::Implementation);
        let (second, _) = parse("let x = (1 + 2) * 3", ProgramShape::Implementation);
        assert_eq!(first, second);
    }
}
