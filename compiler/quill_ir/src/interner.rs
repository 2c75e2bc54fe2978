//! String interner for identifier names.
//!
//! Provides O(1) interning and lookup so that names compare and hash as a
//! single `u32`. The analyzer is single-query synchronous, but the interner
//! is still lock-protected so token items can be shared across buffers.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// An interned identifier.
///
/// Equality and hashing compare the 4-byte index, not string contents.
/// Two `Name`s from the same interner are equal iff their texts are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(u32);

impl Name {
    /// The pre-interned empty string.
    pub const EMPTY: Name = Name(0);

    /// Raw index into the interner.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

struct InternerInner {
    map: FxHashMap<Arc<str>, u32>,
    strings: Vec<Arc<str>>,
}

/// Interner mapping strings to [`Name`]s.
///
/// The empty string is pre-interned as [`Name::EMPTY`].
pub struct StringInterner {
    inner: RwLock<InternerInner>,
}

impl StringInterner {
    /// Create a new interner with the empty string pre-interned.
    pub fn new() -> Self {
        let empty: Arc<str> = Arc::from("");
        let mut map = FxHashMap::default();
        map.insert(Arc::clone(&empty), 0);
        StringInterner {
            inner: RwLock::new(InternerInner {
                map,
                strings: vec![empty],
            }),
        }
    }

    /// Intern a string, returning its name.
    ///
    /// Repeated calls with equal text return the same name.
    pub fn intern(&self, text: &str) -> Name {
        {
            let inner = self.inner.read();
            if let Some(&idx) = inner.map.get(text) {
                return Name(idx);
            }
        }
        let mut inner = self.inner.write();
        // Re-check under the write lock; another intern may have raced here.
        if let Some(&idx) = inner.map.get(text) {
            return Name(idx);
        }
        let arc: Arc<str> = Arc::from(text);
        let idx = u32::try_from(inner.strings.len()).unwrap_or(u32::MAX);
        inner.strings.push(Arc::clone(&arc));
        inner.map.insert(arc, idx);
        Name(idx)
    }

    /// Resolve a name back to its text.
    ///
    /// Returns the empty string for names not issued by this interner.
    pub fn resolve(&self, name: Name) -> Arc<str> {
        let inner = self.inner.read();
        inner
            .strings
            .get(name.0 as usize)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&inner.strings[0]))
    }

    /// Number of interned strings, including the empty string.
    pub fn len(&self) -> usize {
        self.inner.read().strings.len()
    }

    /// Check whether only the empty string is interned.
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let interner = StringInterner::new();
        let a = interner.intern("foo");
        let b = interner.intern("foo");
        assert_eq!(a, b);
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn distinct_texts_get_distinct_names() {
        let interner = StringInterner::new();
        let a = interner.intern("foo");
        let b = interner.intern("bar");
        assert_ne!(a, b);
    }

    #[test]
    fn resolve_round_trips() {
        let interner = StringInterner::new();
        let name = interner.intern("module_name");
        assert_eq!(&*interner.resolve(name), "module_name");
    }

    #[test]
    fn empty_string_is_pre_interned() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern(""), Name::EMPTY);
        assert_eq!(&*interner.resolve(Name::EMPTY), "");
    }

    #[test]
    fn unknown_name_resolves_to_empty() {
        let interner = StringInterner::new();
        assert_eq!(&*interner.resolve(Name(999)), "");
    }
}
