#![no_std]
#![forbid(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::missing_docs_in_private_items,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
#![allow(rustdoc::private_intra_doc_links)]
//! Internal implementation crate for [`anycall`].
//!
//! # Overview
//!
//! This crate contains the low-level, type-erased data structures and unsafe
//! operations that power the [`anycall`] callable-wrapper library. It
//! provides the foundation for zero-cost type erasure through dispatch
//! tables of plain function pointers, with one table family per storage
//! strategy.
//!
//! **This crate is an implementation detail.** No semantic versioning
//! guarantees are provided. Users should depend on the [`anycall`] crate,
//! not this one.
//!
//! # Architecture
//!
//! The crate is organized around three storage families sharing one
//! dispatch-table design:
//!
//! - **[`boxed`]**: Heap-owning callable storage
//!   - [`RawCall`]: Owned callee with [`Box`]-based allocation
//!   - [`RawCallRef`]/[`RawCallMut`]: Borrowed references (shared/exclusive)
//!   - [`CallData`]: `#[repr(C)]` wrapper enabling field access on erased types
//!   - [`CallVtable`]: Function pointers for type-erased dispatch
//!
//! - **[`inline`]**: Fixed-capacity, buffer-embedded callable storage
//!   - [`RawInlineCall`]: Callee embedded in a caller-chosen buffer type,
//!     with the vtable option doubling as the emptiness flag
//!   - [`InlineVtable`]: Dispatch entries that operate in place, plus the
//!     callee's [`Layout`] for capacity checks
//!
//! - **[`view`]**: Non-owning callable views
//!   - [`RawView`]: A single combined invoke pointer paired with a
//!     tagged-union handle holding either an object address or a plain
//!     function pointer
//!
//! The [`callee`] module defines the traits the generated dispatch entries
//! call through ([`Callee`], [`SharedCallee`], [`FnAddr`]), and the
//! [`registry`] module interns one canonical `&'static` table per
//! (family, callee, signature) key for the lifetime of the process.
//!
//! # Safety Strategy
//!
//! Type erasure requires careful handling to maintain Rust's type safety
//! guarantees. When we erase a type like `CallData<Args, Output, MyClosure>`
//! to `CallData<Args, Output, Erased>`, we must ensure that the vtable
//! function pointers still match the actual concrete type stored in memory.
//!
//! This crate maintains safety through:
//!
//! - **Module-based encapsulation**: Safety-critical types keep fields
//!   module-private, making invariants locally verifiable within a single
//!   file
//! - **`#[repr(C)]` layout**: Enables safe field projection on type-erased
//!   pointers without constructing invalid references
//! - **Documented vtable contracts**: Each vtable method specifies exactly
//!   when it can be safely called
//!
//! See the individual module documentation ([`boxed`], [`inline`],
//! [`view`]) for detailed explanations of how these patterns are applied.
//!
//! [`anycall`]: https://docs.rs/anycall/latest/anycall/
//! [`CallData`]: boxed::data::CallData
//! [`CallVtable`]: boxed::vtable::CallVtable
//! [`InlineVtable`]: inline::vtable::InlineVtable
//! [`Callee`]: callee::Callee
//! [`SharedCallee`]: callee::SharedCallee
//! [`FnAddr`]: callee::FnAddr
//! [`Box`]: alloc::boxed::Box
//! [`Layout`]: core::alloc::Layout

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod boxed;
pub mod callee;
mod inline;
mod registry;
mod util;
mod view;

pub use boxed::{RawCall, RawCallMut, RawCallRef};
pub use inline::RawInlineCall;
pub use view::RawView;
