//! Capacity types for the inline callable variant.
//!
//! An [`InlineCallable`](crate::InlineCallable) embeds its callee in a
//! buffer whose size and alignment are those of a chosen *space* type. The
//! space type is never instantiated; only its layout matters. Any type can
//! serve as a space, including a captured struct itself, but the
//! word-array aliases below cover the common cases:
//!
//! ```
//! use anycall::{InlineCallable, space};
//!
//! // Two words of capacity: fits a closure capturing one `u64` with room
//! // to spare.
//! let base = 40u64;
//! let mut add: InlineCallable<(u64,), u64, space::S2> =
//!     InlineCallable::new(move |x: u64| x + base);
//! assert_eq!(add.call((2,)), 42);
//! ```
//!
//! All aliases are arrays of `usize`, so their alignment is the machine
//! word's. Callees with stricter alignment (for example SIMD payloads)
//! need a custom space type with matching alignment.

/// Inline capacity of one machine word.
pub type S1 = [usize; 1];

/// Inline capacity of two machine words.
pub type S2 = [usize; 2];

/// Inline capacity of four machine words.
///
/// The default space of [`InlineCallable`](crate::InlineCallable): enough
/// for typical closures capturing a few pointers or counters.
pub type S4 = [usize; 4];

/// Inline capacity of eight machine words.
pub type S8 = [usize; 8];

/// Inline capacity of sixteen machine words.
pub type S16 = [usize; 16];

/// Inline capacity of thirty-two machine words.
pub type S32 = [usize; 32];
