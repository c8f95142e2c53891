//! Global String Interner
//!
//! Turns shader macro names and vertex attribute names into compact integer
//! [`Symbol`]s so that patch lists and attribute layouts compare and hash in
//! O(1).

use std::sync::LazyLock;

use lasso::{Spur, ThreadedRodeo};

static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::new);

/// Compact integer identifier of an interned string.
pub type Symbol = Spur;

/// Interns a string, returning the existing symbol when already present.
#[inline]
pub fn intern(s: &str) -> Symbol {
    INTERNER.get_or_intern(s)
}

/// Looks up an already interned string without allocating.
#[inline]
pub fn get(s: &str) -> Option<Symbol> {
    INTERNER.get(s)
}

/// Resolves a symbol back to its string.
///
/// # Panics
/// Panics if the symbol was not produced by this interner.
#[inline]
pub fn resolve(sym: Symbol) -> &'static str {
    INTERNER.resolve(&sym)
}

/// Pre-interns the names touched on the per-frame path.
pub fn preload_common_names() {
    let common = [
        // Macro patches
        "CC_RECEIVE_SHADOW",
        "CC_USE_LIGHT_PROBE",
        "CC_USE_INSTANCING",
        // Instanced world matrix rows
        "a_matWorld0",
        "a_matWorld1",
        "a_matWorld2",
        // Common vertex streams
        "a_position",
        "a_normal",
        "a_texCoord",
    ];

    for name in common {
        intern(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_and_resolve() {
        let s1 = intern("a_position");
        let s2 = intern("a_position");
        let s3 = intern("a_normal");

        assert_eq!(s1, s2);
        assert_ne!(s1, s3);
        assert_eq!(resolve(s3), "a_normal");
    }

    #[test]
    fn test_get() {
        let _ = intern("existing_patch");

        assert!(get("existing_patch").is_some());
        assert!(get("never_interned_patch").is_none());
    }
}
