#![cfg_attr(not(doc), no_std)]
#![deny(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::as_ptr_cast_mut,
    clippy::ptr_as_ptr,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
// Extra checks on nightly
#![cfg_attr(nightly_extra_checks, feature(rustdoc_missing_doc_code_examples))]
#![cfg_attr(nightly_extra_checks, forbid(rustdoc::missing_doc_code_examples))]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Type-erased callable wrappers with pluggable storage.
//!
//! ## Overview
//!
//! This crate provides values that can hold *anything invocable with a
//! given signature* while giving you precise control over where the
//! wrapped callable's bytes live. One dispatch design (a per-type table
//! of plain function pointers, generated at compile time and shared
//! process-wide) backs three storage strategies:
//!
//! - [`Callable`]: owns its callee on the heap. Moves are pointer
//!   transfers; any callee size fits.
//! - [`InlineCallable`]: owns its callee inside a fixed-capacity buffer
//!   embedded in the wrapper. No allocation, ever; callees that do not
//!   fit are rejected up front rather than silently boxed.
//! - [`CallableRef`]: owns nothing. A two-word, trivially copyable view
//!   of a callable kept alive elsewhere, with a fast path that stores
//!   plain function pointers in the view itself.
//!
//! Unlike `Box<dyn FnMut(..)>`, the owning wrappers have an explicit
//! *empty* state, report the erased callee's type, make copy support an
//! opt-in capability, and let you choose the storage regime per use site
//! without changing the call sites.
//!
//! ## Quick Example
//!
//! ```
//! use anycall::Callable;
//!
//! let mut pipeline: Vec<Callable<(i64,), i64>> = vec![
//!     Callable::new(|x: i64| x + 1),
//!     Callable::new(|x: i64| x * 10),
//! ];
//!
//! let mut value = 3;
//! for stage in &mut pipeline {
//!     value = stage.call((value,));
//! }
//! assert_eq!(value, 40);
//! ```
//!
//! ## Core Concepts
//!
//! **Signatures are argument tuples.** A callable taking `(u32, bool)`
//! and returning `usize` is a `Callable<(u32, bool), usize>`; invocation
//! passes the tuple by value: `c.call((7, true))`. Arities 0 through 8
//! are supported out of the box.
//!
//! **Empty is a real state.** Every wrapper can be constructed empty and
//! becomes empty when its callee is [`take`](Callable::take)n out.
//! Invoking an empty wrapper is a precondition violation: `call` panics,
//! and `try_call` returns [`EmptyCallableError`](error::EmptyCallableError)
//! for callers that want to branch. No default output is ever
//! fabricated.
//!
//! **Capabilities are markers.** Copy support and thread affinity are
//! encoded in the type, not discovered at run time: a
//! `Callable<_, _, Cloneable>` implements `Clone` because it was built
//! from a `Clone` callee, and a `Callable<_, _, _, Sendable>` is `Send`
//! because its callee is. See [`markers`].
//!
//! ## Feeding a worker
//!
//! The owning wrappers are the natural currency of task queues: build
//! jobs anywhere, move them into a queue, and invoke them from whichever
//! worker pops them. A wrapper is not internally synchronized; each
//! instance must be invoked by one owner at a time.
//!
//! ```
//! use std::sync::mpsc;
//! use std::thread;
//!
//! use anycall::Callable;
//!
//! let (sender, receiver) = mpsc::channel::<Callable<(), ()>>();
//!
//! let worker = thread::spawn(move || {
//!     while let Ok(mut job) = receiver.recv() {
//!         job.call(());
//!     }
//! });
//!
//! let (done, signal) = mpsc::channel();
//! sender.send(Callable::new(move || done.send(42).unwrap())).unwrap();
//! drop(sender);
//!
//! assert_eq!(signal.recv().unwrap(), 42);
//! worker.join().unwrap();
//! ```
//!
//! ## `no_std`
//!
//! The crate is `no_std` with `alloc`. The `std` cargo feature switches
//! the internal dispatch-table registry from a spin lock to
//! `std::sync::RwLock`; functionality is identical either way.

#[cfg(test)]
extern crate alloc;

pub mod callable;
pub mod error;
pub mod markers;
pub mod prelude;
pub mod space;

pub use anycall_internals::callee::{Callee, FnAddr, SharedCallee};
pub use callable::{Callable, CallableRef, InlineCallable};
