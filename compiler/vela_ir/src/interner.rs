//! String interner for identifier storage.
//!
//! Provides O(1) interning and lookup with `&self` access so the interner
//! can be shared between the lexer, parser, and later phases.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::Name;

/// Interner storage behind the lock.
struct Inner {
    /// Map from string content to index.
    map: FxHashMap<&'static str, u32>,
    /// Storage for string contents.
    strings: Vec<&'static str>,
}

/// String interner.
///
/// Interned strings are leaked to obtain `'static` references; an interner
/// lives for the whole compilation session, so the leak is bounded by the
/// set of distinct identifiers in the input.
pub struct StringInterner {
    inner: RwLock<Inner>,
}

impl StringInterner {
    /// Create a new interner with the empty string pre-interned as
    /// [`Name::EMPTY`].
    pub fn new() -> Self {
        let mut map = FxHashMap::default();
        let empty: &'static str = "";
        map.insert(empty, 0);
        StringInterner {
            inner: RwLock::new(Inner {
                map,
                strings: vec![empty],
            }),
        }
    }

    /// Intern a string, returning its [`Name`].
    ///
    /// Interning the same content twice returns the same name.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "over 4 billion distinct identifiers would require a comparably absurd source buffer"
    )]
    pub fn intern(&self, text: &str) -> Name {
        {
            let inner = self.inner.read();
            if let Some(&idx) = inner.map.get(text) {
                return Name::from_raw(idx);
            }
        }
        let mut inner = self.inner.write();
        // Re-check under the write lock: another thread may have won the race.
        if let Some(&idx) = inner.map.get(text) {
            return Name::from_raw(idx);
        }
        let leaked: &'static str = Box::leak(text.to_owned().into_boxed_str());
        let idx = inner.strings.len() as u32;
        inner.strings.push(leaked);
        inner.map.insert(leaked, idx);
        Name::from_raw(idx)
    }

    /// Resolve a [`Name`] back to its text.
    ///
    /// # Panics
    /// Panics if the name was not produced by this interner.
    pub fn resolve(&self, name: Name) -> &'static str {
        let inner = self.inner.read();
        inner.strings[name.raw() as usize]
    }

    /// Number of interned strings (including the pre-interned empty string).
    pub fn len(&self) -> usize {
        self.inner.read().strings.len()
    }

    /// Check whether only the pre-interned empty string is present.
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
    fn test_intern_same_string_same_name() {
        let interner = StringInterner::new();
        let a = interner.intern("foo");
        let b = interner.intern("foo");
        assert_eq!(a, b);
    }

    #[test]
    fn test_intern_distinct_strings_distinct_names() {
        let interner = StringInterner::new();
        let a = interner.intern("foo");
        let b = interner.intern("bar");
        assert_ne!(a, b);
    }

    #[test]
    fn test_resolve_roundtrip() {
        let interner = StringInterner::new();
        let name = interner.intern("checkpoint");
        assert_eq!(interner.resolve(name), "checkpoint");
    }

    #[test]
    fn test_empty_preinterned() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern(""), Name::EMPTY);
        assert_eq!(interner.resolve(Name::EMPTY), "");
        assert!(interner.is_empty());
    }
}
