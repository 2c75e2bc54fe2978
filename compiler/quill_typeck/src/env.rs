//! Per-declaration typing environments.
//!
//! Environments are persistent: binding returns a new [`Env`] sharing its
//! tail with the old one. Each analyzed declaration stores the environment in
//! force *after* it, so resuming analysis from a cached prefix is a cheap
//! clone of the last reusable entry's environment.

use quill_ir::{Name, Ty};
use std::sync::Arc;

#[derive(Debug)]
enum Binding {
    Value(Name, Ty),
    TypeAlias(Name, Ty),
}

#[derive(Debug)]
struct EnvNode {
    binding: Binding,
    parent: Option<Arc<EnvNode>>,
}

/// An immutable chain of value and type bindings.
///
/// Lookup walks from the most recent binding outward, so shadowing falls out
/// of chain order with no extra bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct Env {
    head: Option<Arc<EnvNode>>,
}

impl Env {
    /// The empty environment.
    pub fn empty() -> Self {
        Env { head: None }
    }

    /// Extend with a value binding.
    #[must_use]
    pub fn bind_value(&self, name: Name, ty: Ty) -> Env {
        self.push(Binding::Value(name, ty))
    }

    /// Extend with a type alias.
    #[must_use]
    pub fn bind_type(&self, name: Name, ty: Ty) -> Env {
        self.push(Binding::TypeAlias(name, ty))
    }

    fn push(&self, binding: Binding) -> Env {
        Env {
            head: Some(Arc::new(EnvNode {
                binding,
                parent: self.head.clone(),
            })),
        }
    }

    /// Look up the innermost value binding for `name`.
    pub fn lookup_value(&self, name: Name) -> Option<Ty> {
        self.iter().find_map(|binding| match binding {
            Binding::Value(n, ty) if *n == name => Some(*ty),
            _ => None,
        })
    }

    /// Look up the innermost type alias for `name`.
    pub fn lookup_type(&self, name: Name) -> Option<Ty> {
        self.iter().find_map(|binding| match binding {
            Binding::TypeAlias(n, ty) if *n == name => Some(*ty),
            _ => None,
        })
    }

    /// Number of bindings in the chain.
    pub fn depth(&self) -> usize {
        self.iter().count()
    }

    fn iter(&self) -> EnvIter<'_> {
        EnvIter {
            node: self.head.as_deref(),
        }
    }
}

struct EnvIter<'a> {
    node: Option<&'a EnvNode>,
}

impl<'a> Iterator for EnvIter<'a> {
    type Item = &'a Binding;

    fn next(&mut self) -> Option<&'a Binding> {
        let node = self.node?;
        self.node = node.parent.as_deref();
        Some(&node.binding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_ir::StringInterner;

    #[test]
    fn lookup_finds_innermost_binding() {
        let interner = StringInterner::new();
        let x = interner.intern("x");

        let env = Env::empty().bind_value(x, Ty::Int).bind_value(x, Ty::Str);
        assert_eq!(env.lookup_value(x), Some(Ty::Str));
    }

    #[test]
    fn binding_does_not_mutate_parent() {
        let interner = StringInterner::new();
        let x = interner.intern("x");

        let outer = Env::empty();
        let inner = outer.bind_value(x, Ty::Int);
        assert_eq!(outer.lookup_value(x), None);
        assert_eq!(inner.lookup_value(x), Some(Ty::Int));
        assert_eq!(inner.depth(), 1);
    }

    #[test]
    fn value_and_type_namespaces_are_separate() {
        let interner = StringInterner::new();
        let t = interner.intern("t");

        let env = Env::empty().bind_type(t, Ty::Int);
        assert_eq!(env.lookup_type(t), Some(Ty::Int));
        assert_eq!(env.lookup_value(t), None);
    }
}
