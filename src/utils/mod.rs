//! Utility Module
//!
//! - [`interner`]: String interning for shader macro and attribute names
//! - [`time`]: Monotonic microsecond timer
//!
//! # String Interning
//!
//! Macro and attribute names are compared on every variant resolution.
//! Interned strings (Symbols) compare in O(1) time.
//!
//! ```rust,ignore
//! use myth_renderable::utils::interner;
//!
//! let sym1 = interner::intern("CC_USE_INSTANCING");
//! let sym2 = interner::intern("CC_USE_INSTANCING");
//! assert_eq!(sym1, sym2);
//! ```

pub mod interner;
pub mod time;

pub use interner::Symbol;
pub use time::Timer;
