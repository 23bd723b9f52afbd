//! Vtable for type-erased callable operations of the heap-owning family.
//!
//! This module contains the [`CallVtable`] which enables invoking, cloning,
//! and dropping callees when their concrete type `F` has been erased. The
//! vtable stores function pointers that dispatch to the correct typed
//! implementations.
//!
//! This module encapsulates the fields of [`CallVtable`] so they cannot be
//! accessed directly. This visibility restriction guarantees the safety
//! invariant: **the vtable's type parameter must match the actual callee
//! type stored in the [`CallData`]**.
//!
//! # Safety Invariant
//!
//! This invariant is maintained because vtables are created as `&'static`
//! references via the table generators, which pair the function pointers
//! with a specific callee type `F` at compile time. The generators then
//! route the table through the [`registry`](crate::registry), so every
//! wrapper of the same callee type shares one canonical table instance.

use alloc::boxed::Box;
use core::{any::TypeId, ptr::NonNull};

use crate::{
    boxed::{
        data::CallData,
        raw::{RawCall, RawCallMut, RawCallRef},
    },
    callee::Callee,
    registry,
    util::Erased,
};

/// Vtable for type-erased callable operations.
///
/// Contains function pointers for performing operations on callees without
/// knowing their concrete type at compile time.
///
/// # Safety Invariant
///
/// The fields `call`, `clone`, and `drop` are guaranteed to point to the
/// functions defined below instantiated with the callee type `F` that was
/// used to create this [`CallVtable`].
pub(crate) struct CallVtable<Args: 'static, Output: 'static> {
    /// Gets the [`TypeId`] of the callee type that was used to create this
    /// [`CallVtable`].
    type_id: fn() -> TypeId,
    /// Gets the [`core::any::type_name`] of the callee type that was used
    /// to create this [`CallVtable`].
    type_name: fn() -> &'static str,
    /// Invokes the callee stored behind the handle with an argument tuple.
    call: unsafe fn(RawCallMut<'_, Args, Output>, Args) -> Output,
    /// Clones the callee into a freshly allocated [`RawCall`].
    ///
    /// `None` when the table was generated without clone support; the
    /// wrapper layer encodes this capability in its marker parameters.
    clone: Option<unsafe fn(RawCallRef<'_, Args, Output>) -> RawCall<Args, Output>>,
    /// Drops the [`Box<CallData<Args, Output, F>>`] instance pointed to by
    /// this pointer.
    drop: unsafe fn(NonNull<CallData<Args, Output, Erased>>),
}

impl<Args: 'static, Output: 'static> CallVtable<Args, Output> {
    /// Creates the per-monomorphization constant table for the callee type
    /// `F`, without a clone entry.
    const fn fresh<F: Callee<Args, Output = Output>>() -> &'static Self {
        const {
            &Self {
                type_id: TypeId::of::<F>,
                type_name: core::any::type_name::<F>,
                call: call::<Args, Output, F>,
                clone: None,
                drop: drop::<Args, Output, F>,
            }
        }
    }

    /// Creates the per-monomorphization constant table for the callee type
    /// `F`, with a clone entry.
    const fn fresh_cloneable<F: Callee<Args, Output = Output> + Clone>() -> &'static Self {
        const {
            &Self {
                type_id: TypeId::of::<F>,
                type_name: core::any::type_name::<F>,
                call: call::<Args, Output, F>,
                clone: Some(clone::<Args, Output, F>),
                drop: drop::<Args, Output, F>,
            }
        }
    }

    /// Returns the canonical move-only [`CallVtable`] for the callee type
    /// `F`.
    ///
    /// The table is interned in the process-wide registry on first use, so
    /// repeated calls always return the same `&'static` instance.
    pub(super) fn of<F: Callee<Args, Output = Output>>() -> &'static Self {
        let fresh = Self::fresh::<F>();
        let canonical = registry::canonical::<registry::BoxedTables, F, Args>(
            NonNull::from(fresh).cast::<()>(),
        );
        // SAFETY: Every pointer interned under the `(BoxedTables, F, Args)`
        // key was produced by `Self::fresh::<F>` for this exact `Args`,
        // `Output` and `F`, so the pointee has type `CallVtable<Args,
        // Output>` and lives for the whole process.
        unsafe { canonical.cast::<Self>().as_ref() }
    }

    /// Returns the canonical clone-capable [`CallVtable`] for the callee
    /// type `F`.
    pub(super) fn of_cloneable<F: Callee<Args, Output = Output> + Clone>() -> &'static Self {
        let fresh = Self::fresh_cloneable::<F>();
        let canonical = registry::canonical::<registry::BoxedCloneableTables, F, Args>(
            NonNull::from(fresh).cast::<()>(),
        );
        // SAFETY: Every pointer interned under the `(BoxedCloneableTables,
        // F, Args)` key was produced by `Self::fresh_cloneable::<F>` for
        // this exact `Args`, `Output` and `F`, so the pointee has type
        // `CallVtable<Args, Output>` and lives for the whole process.
        unsafe { canonical.cast::<Self>().as_ref() }
    }

    /// Gets the [`TypeId`] of the callee type that was used to create this
    /// [`CallVtable`].
    #[inline]
    pub(super) fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    /// Gets the [`core::any::type_name`] of the callee type that was used
    /// to create this [`CallVtable`].
    #[inline]
    pub(super) fn type_name(&self) -> &'static str {
        (self.type_name)()
    }

    /// Returns `true` if this table was generated with a clone entry.
    #[inline]
    pub(super) fn supports_clone(&self) -> bool {
        self.clone.is_some()
    }

    /// Invokes the callee using the [`F::call_mut`] function used when
    /// creating this [`CallVtable`].
    ///
    /// [`F::call_mut`]: Callee::call_mut
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. This [`CallVtable`] must be a vtable for the callee type stored
    ///    in the [`RawCallMut`].
    #[inline]
    pub(super) unsafe fn call(&self, ptr: RawCallMut<'_, Args, Output>, args: Args) -> Output {
        // SAFETY: We know that `self.call` points to the function
        // `call::<Args, Output, F>` below. That function's safety
        // requirements are upheld:
        // 1. Guaranteed by the caller
        unsafe { (self.call)(ptr, args) }
    }

    /// Clones the callee into a fresh heap allocation using the
    /// [`Clone::clone`] implementation captured when this [`CallVtable`]
    /// was created, if the table has a clone entry.
    ///
    /// Returns `None` if the table was generated without clone support.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. This [`CallVtable`] must be a vtable for the callee type stored
    ///    in the [`RawCallRef`].
    #[inline]
    pub(super) unsafe fn clone_callee(
        &self,
        ptr: RawCallRef<'_, Args, Output>,
    ) -> Option<RawCall<Args, Output>> {
        let clone = self.clone?;
        // SAFETY: We know that the entry points to the function
        // `clone::<Args, Output, F>` below. That function's safety
        // requirements are upheld:
        // 1. Guaranteed by the caller
        Some(unsafe { clone(ptr) })
    }

    /// Drops the `Box<CallData<Args, Output, F>>` instance pointed to by
    /// this pointer.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The pointer comes from [`Box<CallData<Args, Output, F>>`] via
    ///    [`Box::into_raw`]
    /// 2. This [`CallVtable`] must be a vtable for the callee type stored
    ///    in the [`CallData`].
    /// 3. This method drops the box, so the caller must ensure that the
    ///    pointer has not previously been dropped, that it is able to
    ///    transfer ownership of the pointer, and that it will not use the
    ///    pointer after calling this method.
    #[inline]
    pub(super) unsafe fn drop(&self, ptr: NonNull<CallData<Args, Output, Erased>>) {
        // SAFETY: We know that `self.drop` points to the function
        // `drop::<Args, Output, F>` below. That function's safety
        // requirements are upheld:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        // 3. Guaranteed by the caller
        unsafe { (self.drop)(ptr) }
    }
}

/// Invokes a callee through its [`Callee::call_mut`] implementation.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. The type `F` matches the actual callee type stored in the
///    [`CallData`] behind the [`RawCallMut`]
unsafe fn call<Args: 'static, Output: 'static, F>(
    ptr: RawCallMut<'_, Args, Output>,
    args: Args,
) -> Output
where
    F: Callee<Args, Output = Output>,
{
    // SAFETY:
    // 1. Guaranteed by the caller
    let callee: &mut F = unsafe { ptr.callee_downcast_mut_unchecked::<F>() };
    callee.call_mut(args)
}

/// Clones a callee into a freshly allocated [`RawCall`].
///
/// The new allocation reuses the clone-capable table generator, so the
/// clone is itself cloneable.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. The type `F` matches the actual callee type stored in the
///    [`CallData`] behind the [`RawCallRef`]
unsafe fn clone<Args: 'static, Output: 'static, F>(
    ptr: RawCallRef<'_, Args, Output>,
) -> RawCall<Args, Output>
where
    F: Callee<Args, Output = Output> + Clone,
{
    // SAFETY:
    // 1. Guaranteed by the caller
    let callee: &F = unsafe { ptr.callee_downcast_unchecked::<F>() };
    RawCall::new_cloneable(callee.clone())
}

/// Drops the [`Box<CallData<Args, Output, F>>`] instance pointed to by this
/// pointer.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. The pointer comes from [`Box<CallData<Args, Output, F>>`] via
///    [`Box::into_raw`]
/// 2. The callee type `F` matches the actual callee type stored in the
///    [`CallData`]
/// 3. This method drops the box, so the caller must ensure that the
///    pointer has not previously been dropped, that it is able to transfer
///    ownership of the pointer, and that it will not use the pointer after
///    calling this method.
unsafe fn drop<Args: 'static, Output: 'static, F: 'static>(
    ptr: NonNull<CallData<Args, Output, Erased>>,
) {
    let ptr: NonNull<CallData<Args, Output, F>> = ptr.cast();
    let ptr = ptr.as_ptr();
    // SAFETY: Our pointer has the correct type as guaranteed by the caller,
    // and it came from a call to `Box::into_raw` as also guaranteed by our
    // caller.
    let boxed = unsafe { Box::from_raw(ptr) };
    core::mem::drop(boxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_vtable_canonical() {
        let vtable1 = CallVtable::<(u32,), u32>::of::<fn(u32) -> u32>();
        let vtable2 = CallVtable::<(u32,), u32>::of::<fn(u32) -> u32>();

        // Both should be the exact same canonical instance
        assert!(core::ptr::eq(vtable1, vtable2));
    }

    #[test]
    fn test_cloneable_tables_are_distinct() {
        let plain = CallVtable::<(u32,), u32>::of::<fn(u32) -> u32>();
        let cloneable = CallVtable::<(u32,), u32>::of_cloneable::<fn(u32) -> u32>();

        assert!(!core::ptr::eq(plain, cloneable));
        assert!(!plain.supports_clone());
        assert!(cloneable.supports_clone());
    }

    #[test]
    fn test_call_vtable_type_id() {
        let vtable = CallVtable::<(u32,), u32>::of::<fn(u32) -> u32>();
        assert_eq!(vtable.type_id(), TypeId::of::<fn(u32) -> u32>());
    }
}
