//! Module containing the inline, fixed-capacity callable storage family

mod raw;
mod vtable;

pub use self::raw::RawInlineCall;
