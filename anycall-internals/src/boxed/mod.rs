//! Module containing the heap-owning callable storage family

mod data;
mod raw;
mod vtable;

pub use self::raw::{RawCall, RawCallMut, RawCallRef};
