//! Marker types and traits for defining cloneability and thread-safety
//! semantics.
//!
//! This module provides type-level markers that control what a callable
//! wrapper is allowed to do. These markers are used as generic parameters
//! in [`Callable<Args, Output, C, T>`](crate::Callable) and
//! [`InlineCallable`](crate::InlineCallable) to encode compile-time
//! guarantees about the erased callee.
//!
//! # Design Philosophy
//!
//! The constraints encoded by these markers are enforced at construction
//! time. It is impossible to construct a wrapper that violates the
//! invariants associated with its marker types. This means you can trust
//! that a `Callable<_, _, Cloneable>` really can be cloned, and that a
//! `Callable<_, _, _, Sendable>` really is `Send`.
//!
//! # Cloneability Markers
//!
//! Copy support is an opt-in capability, chosen when the wrapper is
//! created:
//!
//! - [`Cloneable`]: The wrapper was created from a `Clone` callee via a
//!   clone-capable constructor, and itself implements `Clone`.
//! - [`Uncloneable`]: The wrapper is move-only. This is the default; it
//!   places no `Clone` requirement on the callee.
//!
//! # Thread Safety Markers
//!
//! - [`Sendable`]: The erased callee is `Send`, so the wrapper can be
//!   moved to another thread (for example into a worker that drains a
//!   task queue). This is the default.
//! - [`Local`]: The callee may capture non-`Send` data (like `Rc` or raw
//!   pointers); the wrapper is confined to the thread that created it.
//!
//! No wrapper is `Sync`: invocation needs exclusive access to the callee's
//! captured state, so sharing a wrapper between threads requires external
//! synchronization either way.
//!
//! # Examples
//!
//! ```
//! use anycall::{Callable, markers};
//!
//! // Move-only, sendable callable (the defaults).
//! let mut plain: Callable<(u32,), u32> = Callable::new(|x: u32| x + 1);
//! assert_eq!(plain.call((1,)), 2);
//!
//! // Cloneable callable: the callee must implement `Clone`.
//! let mut counting: Callable<(), u32, markers::Cloneable> = Callable::new_cloneable({
//!     let mut calls = 0u32;
//!     move || {
//!         calls += 1;
//!         calls
//!     }
//! });
//! let mut branch = counting.clone();
//! assert_eq!(counting.call(()), 1);
//! assert_eq!(branch.call(()), 1);
//! ```
//!
//! Thread-confined callables capture non-`Send` data:
//!
//! ```
//! use std::{cell::Cell, rc::Rc};
//!
//! use anycall::{Callable, markers};
//!
//! let hits = Rc::new(Cell::new(0u32));
//! let captured = Rc::clone(&hits);
//! let mut local: Callable<(), (), markers::Uncloneable, markers::Local> =
//!     Callable::new_local(move || captured.set(captured.get() + 1));
//!
//! local.call(());
//! assert_eq!(hits.get(), 1);
//! ```
//!
//! A `Sendable` wrapper cannot be built from a non-`Send` callee:
//!
//! ```compile_fail
//! use std::rc::Rc;
//!
//! use anycall::Callable;
//!
//! let rc = Rc::new(1u32);
//! // Rc is not Send, so this does not compile.
//! let sendable: Callable<(), u32> = Callable::new(move || *rc);
//! ```

/// Marker type for wrappers that support cloning.
///
/// A wrapper carrying this marker was created through a clone-capable
/// constructor such as [`Callable::new_cloneable`](crate::Callable::new_cloneable),
/// which requires the callee to implement `Clone` and records a clone
/// entry in the callee's dispatch table. The wrapper itself implements
/// `Clone`; cloning runs the callee's `Clone` implementation and produces
/// an independently invocable wrapper.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Cloneable;

/// Marker type for move-only wrappers.
///
/// This is the default cloneability marker. It places no requirement on
/// the callee, and the wrapper can change hands only by moving. A
/// [`Cloneable`] wrapper can always forget its capability via
/// [`into_uncloneable`](crate::Callable::into_uncloneable), for example to
/// store mixed callables in one collection type.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Uncloneable;

/// Marker type indicating that the erased callee is `Send`.
///
/// This is the default thread-safety marker. Wrappers carrying it
/// implement `Send` and can be moved across threads, which is what a
/// task-queue consumer needs: build the callable on one thread, run it on
/// a worker.
///
/// # Examples
///
/// ```
/// use std::thread;
///
/// use anycall::Callable;
///
/// let mut job: Callable<(), u32> = Callable::new(|| 6 * 7);
///
/// let answer = thread::spawn(move || job.call(())).join().unwrap();
/// assert_eq!(answer, 42);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Sendable;

/// Marker type indicating that the wrapper is confined to one thread.
///
/// Use this marker when the callee captures thread-local data such as
/// `Rc`, `Cell` chains, or raw pointers. The wrapper does not implement
/// `Send`, so the confinement is enforced by the compiler rather than by
/// convention.
///
/// A [`Sendable`] wrapper can always be converted into a [`Local`] one
/// with [`into_local`](crate::Callable::into_local); the other direction
/// does not exist.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Local;

mod sealed_cloneability_marker {
    use super::*;

    pub trait Sealed: 'static {}

    impl Sealed for Cloneable {}
    impl Sealed for Uncloneable {}
}

/// Marker trait for the cloneability parameter of callable wrappers.
///
/// Implemented exactly for [`Cloneable`] and [`Uncloneable`]. The trait is
/// sealed: the set of cloneability modes is closed, which is what lets the
/// wrappers trust their marker parameter when deciding whether a clone
/// entry must be present in the dispatch table.
pub trait CloneabilityMarker: sealed_cloneability_marker::Sealed {}

impl CloneabilityMarker for Cloneable {}
impl CloneabilityMarker for Uncloneable {}

mod sealed_thread_safety_marker {
    use super::*;

    pub trait Sealed: 'static {}

    impl Sealed for Sendable {}
    impl Sealed for Local {}
}

/// Marker trait for the thread-safety parameter of callable wrappers.
///
/// Implemented exactly for [`Sendable`] and [`Local`]. The trait is
/// sealed: the set of thread-safety modes is closed, which is what makes
/// the `unsafe impl Send` for `Sendable` wrappers trustworthy.
pub trait ThreadSafetyMarker: sealed_thread_safety_marker::Sealed {}

impl ThreadSafetyMarker for Sendable {}
impl ThreadSafetyMarker for Local {}

/// Marker trait combining callee and thread-safety requirements.
///
/// This trait enforces thread-safety constraints on the callee at wrapper
/// construction time:
///
/// - For `T = Local`: implemented for all `Sized + 'static` types,
///   regardless of their `Send` status. This allows capturing types like
///   `Rc` in local wrappers.
///
/// - For `T = Sendable`: implemented only for `Sized + 'static` types
///   that are also `Send`. This ensures sendable wrappers can only be
///   constructed from callees that may cross threads.
///
/// The key insight is that this trait is used as a bound during wrapper
/// construction. You cannot create a `Callable<_, _, _, Sendable>` unless
/// the callee is `Send`, which makes it impossible to accidentally launder
/// a thread-local closure into another thread.
pub trait CalleeMarkerFor<T>: Sized + 'static {}

impl<F: Sized + 'static> CalleeMarkerFor<Local> for F {}

impl<F: Sized + 'static + Send> CalleeMarkerFor<Sendable> for F {}
