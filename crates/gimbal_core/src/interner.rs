//! Joint path interner
//!
//! Joint paths (`"/root/Armature/LeftGear"`) are compared and hashed on every
//! mask test and clip lookup. They are interned once into compact [`Symbol`]s
//! so the hot path never touches string data.

use std::sync::LazyLock;

use lasso::{Spur, ThreadedRodeo};

static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::new);

/// Compact identifier of an interned joint path.
pub type Symbol = Spur;

/// Interns a string and returns its symbol.
///
/// Returns the existing symbol when the string was already interned.
#[inline]
pub fn intern(s: &str) -> Symbol {
    INTERNER.get_or_intern(s)
}

/// Looks up the symbol of an already interned string without allocating.
#[inline]
pub fn get(s: &str) -> Option<Symbol> {
    INTERNER.get(s)
}

/// Resolves a symbol back to its string.
#[inline]
pub fn resolve(sym: Symbol) -> &'static str {
    INTERNER.resolve(&sym)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_and_resolve() {
        let a = intern("/root/Armature/Gear");
        let b = intern("/root/Armature/Gear");
        let c = intern("/root/Armature/Canopy");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(resolve(a), "/root/Armature/Gear");
        assert_eq!(resolve(c), "/root/Armature/Canopy");
    }

    #[test]
    fn test_get_does_not_intern() {
        let _ = intern("/root/present");

        assert!(get("/root/present").is_some());
        assert!(get("/root/never_interned_path").is_none());
    }
}
