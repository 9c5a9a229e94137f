//! String interning for identifiers, member names and semantics.
//!
//! One [`StringCache`] lives in each compilation [`Context`](crate::context::Context).
//! Two calls to [`StringCache::intern`] with the same text return the same
//! [`Symbol`], so name comparisons anywhere in the compiler are a single
//! integer compare.

use string_interner::{StringInterner, DefaultSymbol, backend::StringBackend, Symbol as SymbolTrait};
use std::fmt;
use serde::{Serialize, Deserialize};

/// Type alias for our interner backend
type Backend = StringBackend<DefaultSymbol>;

/// A symbol representing an interned string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(u32);

impl Symbol {
    pub fn as_raw(&self) -> u32 { self.0 }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

/// Per-compilation string cache.
#[derive(Debug)]
pub struct StringCache {
    interner: StringInterner<Backend>,
}

impl Default for StringCache {
    fn default() -> Self { Self::new() }
}

impl StringCache {
    pub fn new() -> Self {
        Self { interner: StringInterner::new() }
    }

    pub fn intern(&mut self, s: &str) -> Symbol {
        let sym = self.interner.get_or_intern(s);
        Symbol(sym.to_usize() as u32)
    }

    /// Resolve a symbol back to its text.
    ///
    /// Symbols are only ever minted by this cache, so an unknown symbol means
    /// it came from another compilation; it resolves to `"<?>"`.
    pub fn resolve(&self, sym: Symbol) -> &str {
        DefaultSymbol::try_from_usize(sym.0 as usize)
            .and_then(|s| self.interner.resolve(s))
            .unwrap_or("<?>")
    }

    pub fn get(&self, s: &str) -> Option<Symbol> {
        self.interner.get(s).map(|sym| Symbol(sym.to_usize() as u32))
    }

    pub fn len(&self) -> usize { self.interner.len() }
    pub fn is_empty(&self) -> bool { self.interner.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interner() {
        let mut strings = StringCache::new();
        let sym1 = strings.intern("hello");
        let sym2 = strings.intern("world");
        let sym3 = strings.intern("hello");
        assert_eq!(sym1, sym3);
        assert_ne!(sym1, sym2);
        assert_eq!(strings.resolve(sym1), "hello");
        assert_eq!(strings.get("world"), Some(sym2));
        assert_eq!(strings.get("missing"), None);
    }

    #[test]
    fn test_caches_are_independent() {
        let mut a = StringCache::new();
        let mut b = StringCache::new();
        a.intern("only_in_a");
        let sym = b.intern("x");
        assert_eq!(b.len(), 1);
        assert_eq!(b.resolve(sym), "x");
        assert_eq!(a.len(), 1);
    }
}
