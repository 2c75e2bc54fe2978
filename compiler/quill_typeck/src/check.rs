//! Per-declaration type checking.
//!
//! [`check_decl`] processes exactly one declaration. Semantic errors are
//! caught and recorded, never propagated: an ill-typed declaration still
//! yields a typed tree (with [`Ty::Error`] holes) and a successor
//! environment, so later declarations always get checked.

use crate::env::Env;
use crate::tables::{Deferred, DeferredCheck, GlobalTables};
use crate::warnings::WarningFlags;
use quill_diagnostic::Diagnostic;
use quill_ir::{
    BinOp, Decl, DeclKind, ExprKind, ExprNode, StringInterner, Ty, TyExpr, TyExprKind, TypedNode,
};

/// The result of checking one declaration.
#[derive(Debug, Clone)]
pub struct CheckedDecl {
    /// Typed tree for the declaration, spans preserved.
    pub typed: TypedNode,
    /// Environment in force after this declaration.
    pub env_after: Env,
    /// Errors and warnings this declaration produced.
    pub errors: Vec<Diagnostic>,
}

/// Check one declaration under `env`, mutating the global tables.
///
/// Bindings the declaration introduces are appended to the tables' undo log
/// and to the returned environment. Caught errors are recorded both in the
/// returned [`CheckedDecl`] and in the tables' session-wide caught list.
pub fn check_decl(
    tables: &mut GlobalTables,
    interner: &StringInterner,
    env: &Env,
    decl: &Decl,
) -> CheckedDecl {
    let mut checker = Checker {
        tables,
        interner,
        env,
        errors: Vec::new(),
    };
    let (typed, env_after) = checker.decl(decl);
    tracing::trace!(errors = checker.errors.len(), "checked declaration");
    CheckedDecl {
        typed,
        env_after,
        errors: checker.errors,
    }
}

struct Checker<'a> {
    tables: &'a mut GlobalTables,
    interner: &'a StringInterner,
    env: &'a Env,
    errors: Vec<Diagnostic>,
}

impl Checker<'_> {
    fn decl(&mut self, decl: &Decl) -> (TypedNode, Env) {
        match &decl.kind {
            DeclKind::Let { name, value } => {
                let value_node = self.expr(value);
                let ty = value_node.ty;
                if self.env.lookup_value(*name).is_some() {
                    self.warn(
                        WarningFlags::SHADOWING,
                        Diagnostic::warning(
                            decl.span,
                            format!("`{}` shadows an earlier binding", self.interner.resolve(*name)),
                        ),
                    );
                }
                self.tables.bind(*name, ty);
                let env_after = self.env.bind_value(*name, ty);
                let node =
                    TypedNode::with_children(ty, decl.span, decl.provenance, vec![value_node]);
                (node, env_after)
            }
            DeclKind::Val { name, ty } => {
                let ty_node = self.ty_expr(ty);
                let resolved = ty_node.ty;
                self.tables.bind(*name, resolved);
                let env_after = self.env.bind_value(*name, resolved);
                let node =
                    TypedNode::with_children(resolved, decl.span, decl.provenance, vec![ty_node]);
                (node, env_after)
            }
            DeclKind::TypeAlias { name, ty } => {
                let ty_node = self.ty_expr(ty);
                let resolved = ty_node.ty;
                if self.env.lookup_type(*name).is_some() {
                    self.warn(
                        WarningFlags::REDEFINED_TYPE,
                        Diagnostic::warning(
                            decl.span,
                            format!("type `{}` is redefined", self.interner.resolve(*name)),
                        ),
                    );
                }
                let env_after = self.env.bind_type(*name, resolved);
                let node =
                    TypedNode::with_children(resolved, decl.span, decl.provenance, vec![ty_node]);
                (node, env_after)
            }
            DeclKind::Open { module } => {
                // Module existence can only be judged against the finished
                // project view, so the check is queued for `errors()` time.
                self.tables.defer(Deferred {
                    span: decl.span,
                    check: DeferredCheck::OpenModule(*module),
                });
                let node = TypedNode::leaf(Ty::Named(*module), decl.span, decl.provenance);
                (node, self.env.clone())
            }
        }
    }

    fn expr(&mut self, expr: &ExprNode) -> TypedNode {
        match &expr.kind {
            ExprKind::Int(_) => TypedNode::leaf(Ty::Int, expr.span, expr.provenance),
            ExprKind::Str(_) => TypedNode::leaf(Ty::Str, expr.span, expr.provenance),
            ExprKind::Bool(_) => TypedNode::leaf(Ty::Bool, expr.span, expr.provenance),
            ExprKind::Ident(name) => {
                let ty = match self.env.lookup_value(*name) {
                    Some(ty) => ty,
                    None => {
                        self.report(Diagnostic::semantic(
                            expr.span,
                            format!("unbound identifier `{}`", self.interner.resolve(*name)),
                        ));
                        Ty::Error
                    }
                };
                TypedNode::leaf(ty, expr.span, expr.provenance)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs_node = self.expr(lhs);
                let rhs_node = self.expr(rhs);
                let ty = self.binary_ty(*op, &lhs_node, &rhs_node, expr);
                TypedNode::with_children(
                    ty,
                    expr.span,
                    expr.provenance,
                    vec![lhs_node, rhs_node],
                )
            }
            ExprKind::Paren(inner) => {
                let inner_node = self.expr(inner);
                let ty = inner_node.ty;
                TypedNode::with_children(ty, expr.span, expr.provenance, vec![inner_node])
            }
            ExprKind::Error => TypedNode::leaf(Ty::Error, expr.span, expr.provenance),
        }
    }

    /// Arithmetic is integer-only. An operand that already failed to check
    /// is not reported again here.
    fn binary_ty(
        &mut self,
        op: BinOp,
        lhs: &TypedNode,
        rhs: &TypedNode,
        expr: &ExprNode,
    ) -> Ty {
        if lhs.ty == Ty::Error || rhs.ty == Ty::Error {
            return Ty::Error;
        }
        if lhs.ty == Ty::Int && rhs.ty == Ty::Int {
            return Ty::Int;
        }
        let symbol = match op {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
        };
        self.report(Diagnostic::semantic(
            expr.span,
            format!("`{symbol}` expects int operands, got {} and {}", lhs.ty, rhs.ty),
        ));
        Ty::Error
    }

    fn ty_expr(&mut self, ty: &TyExpr) -> TypedNode {
        let resolved = match &ty.kind {
            TyExprKind::Int => Ty::Int,
            TyExprKind::Str => Ty::Str,
            TyExprKind::Bool => Ty::Bool,
            TyExprKind::Named(name) => match self.env.lookup_type(*name) {
                Some(_) => Ty::Named(*name),
                None => {
                    self.report(Diagnostic::semantic(
                        ty.span,
                        format!("unknown type `{}`", self.interner.resolve(*name)),
                    ));
                    Ty::Error
                }
            },
            TyExprKind::Error => Ty::Error,
        };
        TypedNode::leaf(resolved, ty.span, ty.provenance)
    }

    fn report(&mut self, diag: Diagnostic) {
        self.tables.catch(diag.clone());
        self.errors.push(diag);
    }

    fn warn(&mut self, class: WarningFlags, diag: Diagnostic) {
        if self.tables.warnings().contains(class) {
            self.report(diag);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quill_ir::{Provenance, Span};

    fn let_decl(interner: &StringInterner, name: &str, value: ExprNode, span: Span) -> Decl {
        Decl::new(
            DeclKind::Let {
                name: interner.intern(name),
                value,
            },
            span,
        )
    }

    fn int(value: i64, start: u32, end: u32) -> ExprNode {
        ExprNode::new(ExprKind::Int(value), Span::new(start, end))
    }

    #[test]
    fn let_binds_value_type() {
        let interner = StringInterner::new();
        let mut tables = GlobalTables::new();
        let env = Env::empty();

        let decl = let_decl(&interner, "x", int(1, 8, 9), Span::new(0, 9));
        let checked = check_decl(&mut tables, &interner, &env, &decl);

        assert!(checked.errors.is_empty());
        assert_eq!(checked.typed.ty, Ty::Int);
        assert_eq!(checked.env_after.lookup_value(interner.intern("x")), Some(Ty::Int));
        assert_eq!(tables.lookup(interner.intern("x")), Some(Ty::Int));
    }

    #[test]
    fn unbound_identifier_is_caught_not_fatal() {
        let interner = StringInterner::new();
        let mut tables = GlobalTables::new();
        let env = Env::empty();

        let value = ExprNode::new(ExprKind::Ident(interner.intern("missing")), Span::new(8, 15));
        let decl = let_decl(&interner, "x", value, Span::new(0, 15));
        let checked = check_decl(&mut tables, &interner, &env, &decl);

        assert_eq!(checked.errors.len(), 1);
        assert!(checked.errors[0].message.contains("missing"));
        assert_eq!(checked.typed.ty, Ty::Error);
        // The binding still lands so later declarations can reference it.
        assert_eq!(checked.env_after.lookup_value(interner.intern("x")), Some(Ty::Error));
        assert_eq!(tables.caught().len(), 1);
    }

    #[test]
    fn binary_mismatch_reports_once() {
        let interner = StringInterner::new();
        let mut tables = GlobalTables::new();
        let env = Env::empty();

        // 1 + "s" + 2: the inner mismatch poisons the outer sum silently.
        let inner = ExprNode::new(
            ExprKind::Binary {
                op: BinOp::Add,
                lhs: Box::new(int(1, 8, 9)),
                rhs: Box::new(ExprNode::new(
                    ExprKind::Str(interner.intern("s")),
                    Span::new(12, 15),
                )),
            },
            Span::new(8, 15),
        );
        let value = ExprNode::new(
            ExprKind::Binary {
                op: BinOp::Add,
                lhs: Box::new(inner),
                rhs: Box::new(int(2, 18, 19)),
            },
            Span::new(8, 19),
        );
        let decl = let_decl(&interner, "x", value, Span::new(0, 19));
        let checked = check_decl(&mut tables, &interner, &env, &decl);

        assert_eq!(checked.errors.len(), 1);
        assert_eq!(checked.typed.ty, Ty::Error);
    }

    #[test]
    fn shadowing_warns_when_enabled() {
        let interner = StringInterner::new();
        let mut tables = GlobalTables::new();
        let x = interner.intern("x");
        let env = Env::empty().bind_value(x, Ty::Int);

        let decl = let_decl(&interner, "x", int(2, 8, 9), Span::new(0, 9));
        let checked = check_decl(&mut tables, &interner, &env, &decl);
        assert_eq!(checked.errors.len(), 1);
        assert!(!checked.errors[0].is_error());

        tables.set_warnings(WarningFlags::empty());
        let silent = check_decl(&mut tables, &interner, &env, &decl);
        assert!(silent.errors.is_empty());
    }

    #[test]
    fn open_queues_a_deferred_check() {
        let interner = StringInterner::new();
        let mut tables = GlobalTables::new();
        let env = Env::empty();

        let decl = Decl::new(
            DeclKind::Open {
                module: interner.intern("Widget"),
            },
            Span::new(0, 11),
        );
        let checked = check_decl(&mut tables, &interner, &env, &decl);

        assert!(checked.errors.is_empty(), "existence is not judged here");
        assert_eq!(tables.deferred().len(), 1);
    }

    #[test]
    fn type_alias_resolves_and_rebinds() {
        let interner = StringInterner::new();
        let mut tables = GlobalTables::new();
        let env = Env::empty();

        let t = interner.intern("t");
        let alias = Decl::new(
            DeclKind::TypeAlias {
                name: t,
                ty: TyExpr::new(TyExprKind::Int, Span::new(9, 12)),
            },
            Span::new(0, 12),
        );
        let checked = check_decl(&mut tables, &interner, &env, &alias);
        assert!(checked.errors.is_empty());
        assert_eq!(checked.env_after.lookup_type(t), Some(Ty::Int));

        // A val using the alias resolves to the named type.
        let val = Decl::new(
            DeclKind::Val {
                name: interner.intern("v"),
                ty: TyExpr::new(TyExprKind::Named(t), Span::new(8, 9)),
            },
            Span::new(0, 9),
        );
        let checked_val = check_decl(&mut tables, &interner, &checked.env_after, &val);
        assert!(checked_val.errors.is_empty());
        assert_eq!(checked_val.typed.ty, Ty::Named(t));
    }

    #[test]
    fn unknown_type_is_an_error_hole() {
        let interner = StringInterner::new();
        let mut tables = GlobalTables::new();
        let env = Env::empty();

        let val = Decl::new(
            DeclKind::Val {
                name: interner.intern("v"),
                ty: TyExpr::new(
                    TyExprKind::Named(interner.intern("ghost")),
                    Span::new(8, 13),
                ),
            },
            Span::new(0, 13),
        );
        let checked = check_decl(&mut tables, &interner, &env, &val);
        assert_eq!(checked.errors.len(), 1);
        assert_eq!(checked.typed.ty, Ty::Error);
    }

    #[test]
    fn recovery_placeholder_checks_to_error_silently() {
        let interner = StringInterner::new();
        let mut tables = GlobalTables::new();
        let env = Env::empty();

        let decl = Decl::recovered(
            DeclKind::Let {
                name: interner.intern("x"),
                value: ExprNode::missing(8),
            },
            Span::new(0, 8),
        );
        let checked = check_decl(&mut tables, &interner, &env, &decl);
        assert!(checked.errors.is_empty(), "recovery holes are not re-reported");
        assert_eq!(checked.typed.ty, Ty::Error);
        assert_eq!(checked.typed.provenance, Provenance::Recovered);
    }
}
