//! Commonly used items for convenient importing.
//!
//! The prelude module re-exports the most frequently used types and traits
//! from the anycall library. This allows you to import everything you need
//! with a single use statement.
//!
//! # Usage
//!
//! ```rust
//! use anycall::prelude::*;
//!
//! let mut jobs: Vec<Callable<(), u32>> = vec![
//!     Callable::new(|| 1),
//!     Callable::new(|| 2),
//! ];
//!
//! let total: u32 = jobs.iter_mut().map(|job| job.call(())).sum();
//! assert_eq!(total, 3);
//! ```
//!
//! # What's Included
//!
//! - **[`Callable`]**: The heap-backed, owning callable wrapper
//! - **[`InlineCallable`]**: The fixed-capacity, allocation-free wrapper
//! - **[`CallableRef`]**: The non-owning, trivially copyable view
//! - **[`Callee`] / [`SharedCallee`]**: The invocation traits, useful in
//!   generic bounds
//! - **[`markers`]**: Type markers for cloneability and thread safety
//! - **[`space`]**: Capacity types for the inline variant

pub use crate::{
    Callable, CallableRef, Callee, InlineCallable, SharedCallee, markers, space,
};
