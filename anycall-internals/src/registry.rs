//! Process-wide cache of canonical dispatch tables.
//!
//! Dispatch tables are generated as `const`-promoted `&'static` values, one
//! per monomorphization. Constant promotion alone does not guarantee pointer
//! identity across codegen units, so this module interns the first table
//! observed for each key and hands the same pointer back to every later
//! caller. The cache is keyed by the [`TypeId`] of a
//! `(family, callee, arguments)` triple, lives for the whole process, and is
//! never torn down; tables are immutable and harmless to leak.
//!
//! # Race safety
//!
//! First-time interning for a given key may race between threads. The read
//! path is lock-free of writers; on a miss the writer path re-checks under
//! the write lock, so exactly one candidate wins and all racing losers are
//! discarded. Losing is harmless: every candidate for a key is a promoted
//! constant with identical contents. No caller can observe a partially
//! initialized table, because a table is fully built (at compile time)
//! before its pointer ever reaches this module.

use core::{any::TypeId, ptr::NonNull};

use hashbrown::HashMap;

#[cfg(feature = "std")]
use std::sync as lock_impl;

#[cfg(not(feature = "std"))]
use spin as lock_impl;

/// Marker key for tables of the heap-owning family without a clone entry.
pub(crate) struct BoxedTables;

/// Marker key for tables of the heap-owning family with a clone entry.
pub(crate) struct BoxedCloneableTables;

/// Marker key for tables of the inline-owning family without a clone entry.
pub(crate) struct InlineTables;

/// Marker key for tables of the inline-owning family with a clone entry.
pub(crate) struct InlineCloneableTables;

/// A `'static` dispatch table pointer with its concrete table type erased.
struct TablePtr {
    /// Pointer to the promoted constant table.
    table: NonNull<()>,
}

// SAFETY: A `TablePtr` only ever stores a `&'static` reference to an
// immutable table struct consisting of function pointers and layout data,
// which is safe to hand out from any thread.
unsafe impl Send for TablePtr {}

// SAFETY: Same reasoning as the `Send` implementation above.
unsafe impl Sync for TablePtr {}

/// The interning map: one canonical table pointer per key.
type TableMap = HashMap<TypeId, TablePtr, rustc_hash::FxBuildHasher>;

/// Lock around the lazily created interning map.
///
/// Uses `std::sync::RwLock` when the `std` feature is enabled and a spin
/// lock otherwise, so the registry stays available under `no_std`.
#[repr(transparent)]
struct TableLock {
    /// The guarded map; `None` until the first interning.
    lock: lock_impl::RwLock<Option<TableMap>>,
}

impl TableLock {
    /// Creates an empty, unlocked registry.
    const fn new() -> Self {
        Self {
            lock: lock_impl::RwLock::new(None),
        }
    }

    /// Looks up the canonical pointer for `key`, if one has been interned.
    fn lookup(&self, key: TypeId) -> Option<NonNull<()>> {
        #[cfg(not(feature = "std"))]
        let guard = self.lock.read();

        #[cfg(feature = "std")]
        let guard = self
            .lock
            .read()
            .expect("unable to acquire the table registry lock");

        guard
            .as_ref()
            .and_then(|map| map.get(&key))
            .map(|entry| entry.table)
    }

    /// Interns `candidate` under `key`, returning the winning pointer.
    ///
    /// If another thread interned a table for `key` first, that table wins
    /// and `candidate` is discarded.
    fn intern(&self, key: TypeId, candidate: NonNull<()>) -> NonNull<()> {
        #[cfg(not(feature = "std"))]
        let mut guard = self.lock.write();

        #[cfg(feature = "std")]
        let mut guard = self
            .lock
            .write()
            .expect("unable to acquire the table registry lock");

        let map = guard.get_or_insert_with(TableMap::default);
        map.entry(key).or_insert(TablePtr { table: candidate }).table
    }
}

/// The process-wide table registry.
static TABLES: TableLock = TableLock::new();

/// Returns the canonical table pointer for the `(Family, F, Args)` key,
/// interning `candidate` if the key has not been seen before.
///
/// The returned pointer is stable for the lifetime of the process: every
/// call with the same key returns the same pointer, regardless of which
/// thread or codegen unit produced the candidate.
///
/// The cast back to a concrete table type is sound for callers because the
/// key determines the table's concrete type: `Family` fixes the table
/// family and capability set, and `(F, Args)` fixes the generic parameters
/// the table was instantiated with.
pub(crate) fn canonical<Family, F, Args>(candidate: NonNull<()>) -> NonNull<()>
where
    Family: 'static,
    F: 'static,
    Args: 'static,
{
    let key = TypeId::of::<(Family, F, Args)>();
    if let Some(existing) = TABLES.lookup(key) {
        return existing;
    }
    TABLES.intern(key, candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct KeyA;
    struct KeyB;

    static TABLE_ONE: u32 = 1;
    static TABLE_TWO: u32 = 2;

    #[test]
    fn test_first_candidate_wins() {
        let one = NonNull::from(&TABLE_ONE).cast::<()>();
        let two = NonNull::from(&TABLE_TWO).cast::<()>();

        let first = canonical::<KeyA, KeyA, ()>(one);
        let second = canonical::<KeyA, KeyA, ()>(two);

        assert_eq!(first, one);
        assert_eq!(second, one);
    }

    #[test]
    fn test_distinct_keys_do_not_collide() {
        let one = NonNull::from(&TABLE_ONE).cast::<()>();
        let two = NonNull::from(&TABLE_TWO).cast::<()>();

        let a = canonical::<KeyB, KeyA, ()>(one);
        let b = canonical::<KeyB, KeyB, ()>(two);

        assert_eq!(a, one);
        assert_eq!(b, two);
    }
}
