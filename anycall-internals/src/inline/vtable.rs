//! Vtable for type-erased callable operations of the inline family.
//!
//! This module contains the [`InlineVtable`] which enables invoking,
//! cloning, and dropping callees stored in a fixed-capacity buffer when
//! their concrete type `F` has been erased. Unlike the heap family, the
//! storage location is not a dedicated allocation: the function pointers
//! receive a pointer directly to the callee's bytes inside the wrapper's
//! buffer, and the table additionally records the callee's [`Layout`] so
//! capacity checks can be performed against erased values.
//!
//! This module encapsulates the fields of [`InlineVtable`] so they cannot
//! be accessed directly. This visibility restriction guarantees the safety
//! invariant: **the vtable's type parameter must match the actual callee
//! type stored in the buffer it is paired with**.

use core::{alloc::Layout, any::TypeId, ptr::NonNull};

use crate::{callee::Callee, registry, util::Erased};

/// Vtable for type-erased operations on a callee embedded in a
/// fixed-capacity buffer.
///
/// # Safety Invariant
///
/// The fields `call`, `clone_into`, and `drop_in_place` are guaranteed to
/// point to the functions defined below instantiated with the callee type
/// `F` that was used to create this [`InlineVtable`], and `layout` is
/// guaranteed to be the [`Layout`] of that same `F`.
pub(crate) struct InlineVtable<Args: 'static, Output: 'static> {
    /// Gets the [`TypeId`] of the callee type that was used to create this
    /// [`InlineVtable`].
    type_id: fn() -> TypeId,
    /// Gets the [`core::any::type_name`] of the callee type that was used
    /// to create this [`InlineVtable`].
    type_name: fn() -> &'static str,
    /// The size and alignment of the callee type.
    layout: Layout,
    /// Invokes the callee stored at the given location.
    call: unsafe fn(NonNull<Erased>, Args) -> Output,
    /// Clones the callee from a source location into an uninitialized
    /// destination location.
    ///
    /// `None` when the table was generated without clone support.
    clone_into: Option<unsafe fn(NonNull<Erased>, NonNull<Erased>)>,
    /// Runs the callee's destructor at the given location, without freeing
    /// any memory.
    drop_in_place: unsafe fn(NonNull<Erased>),
}

impl<Args: 'static, Output: 'static> InlineVtable<Args, Output> {
    /// Creates the per-monomorphization constant table for the callee type
    /// `F`, without a clone entry.
    const fn fresh<F: Callee<Args, Output = Output>>() -> &'static Self {
        const {
            &Self {
                type_id: TypeId::of::<F>,
                type_name: core::any::type_name::<F>,
                layout: Layout::new::<F>(),
                call: call::<Args, Output, F>,
                clone_into: None,
                drop_in_place: drop_in_place::<F>,
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
                layout: Layout::new::<F>(),
                call: call::<Args, Output, F>,
                clone_into: Some(clone_into::<F>),
                drop_in_place: drop_in_place::<F>,
            }
        }
    }

    /// Returns the canonical move-only [`InlineVtable`] for the callee type
    /// `F`, interned in the process-wide registry on first use.
    pub(super) fn of<F: Callee<Args, Output = Output>>() -> &'static Self {
        let fresh = Self::fresh::<F>();
        let canonical = registry::canonical::<registry::InlineTables, F, Args>(
            NonNull::from(fresh).cast::<()>(),
        );
        // SAFETY: Every pointer interned under the `(InlineTables, F,
        // Args)` key was produced by `Self::fresh::<F>` for this exact
        // `Args`, `Output` and `F`, so the pointee has type
        // `InlineVtable<Args, Output>` and lives for the whole process.
        unsafe { canonical.cast::<Self>().as_ref() }
    }

    /// Returns the canonical clone-capable [`InlineVtable`] for the callee
    /// type `F`.
    pub(super) fn of_cloneable<F: Callee<Args, Output = Output> + Clone>() -> &'static Self {
        let fresh = Self::fresh_cloneable::<F>();
        let canonical = registry::canonical::<registry::InlineCloneableTables, F, Args>(
            NonNull::from(fresh).cast::<()>(),
        );
        // SAFETY: Every pointer interned under the `(InlineCloneableTables,
        // F, Args)` key was produced by `Self::fresh_cloneable::<F>` for
        // this exact `Args`, `Output` and `F`, so the pointee has type
        // `InlineVtable<Args, Output>` and lives for the whole process.
        unsafe { canonical.cast::<Self>().as_ref() }
    }

    /// Gets the [`TypeId`] of the callee type that was used to create this
    /// [`InlineVtable`].
    #[inline]
    pub(super) fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    /// Gets the [`core::any::type_name`] of the callee type that was used
    /// to create this [`InlineVtable`].
    #[inline]
    pub(super) fn type_name(&self) -> &'static str {
        (self.type_name)()
    }

    /// Returns the [`Layout`] of the callee type.
    #[inline]
    pub(super) fn layout(&self) -> Layout {
        self.layout
    }

    /// Returns `true` if this table was generated with a clone entry.
    #[inline]
    pub(super) fn supports_clone(&self) -> bool {
        self.clone_into.is_some()
    }

    /// Invokes the callee stored at `callee` with the given arguments.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `callee` points to a live value of the callee type this
    ///    [`InlineVtable`] was created for.
    /// 2. Access through `callee` is exclusive for the duration of the
    ///    call.
    #[inline]
    pub(super) unsafe fn call(&self, callee: NonNull<Erased>, args: Args) -> Output {
        // SAFETY: We know that `self.call` points to the function
        // `call::<Args, Output, F>` below. That function's safety
        // requirements are upheld:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        unsafe { (self.call)(callee, args) }
    }

    /// Clones the callee at `src` into the uninitialized location `dst`,
    /// if this table has a clone entry.
    ///
    /// Returns `false` without touching either location if the table was
    /// generated without clone support. On `true`, `dst` holds a live
    /// callee and `src` is unchanged.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `src` points to a live value of the callee type this
    ///    [`InlineVtable`] was created for.
    /// 2. `dst` is valid for writes of [`Self::layout`] bytes and does not
    ///    overlap `src`.
    #[inline]
    pub(super) unsafe fn clone_into(&self, src: NonNull<Erased>, dst: NonNull<Erased>) -> bool {
        let Some(clone_into) = self.clone_into else {
            return false;
        };
        // SAFETY: We know that the entry points to the function
        // `clone_into::<F>` below. That function's safety requirements are
        // upheld:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        unsafe { clone_into(src, dst) };
        true
    }

    /// Runs the callee's destructor at `callee`, without freeing memory.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `callee` points to a live value of the callee type this
    ///    [`InlineVtable`] was created for.
    /// 2. The value is not used, and its destructor not run again, after
    ///    this call unless a new value is constructed at the location
    ///    first.
    #[inline]
    pub(super) unsafe fn drop_in_place(&self, callee: NonNull<Erased>) {
        // SAFETY: We know that `self.drop_in_place` points to the function
        // `drop_in_place::<F>` below. That function's safety requirements
        // are upheld:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        unsafe { (self.drop_in_place)(callee) }
    }
}

/// Invokes a buffer-resident callee through its [`Callee::call_mut`]
/// implementation.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `callee` points to a live value of type `F`.
/// 2. Access through `callee` is exclusive for the duration of the call.
unsafe fn call<Args: 'static, Output: 'static, F>(callee: NonNull<Erased>, args: Args) -> Output
where
    F: Callee<Args, Output = Output>,
{
    let mut callee = callee.cast::<F>();
    // SAFETY: The pointee is a live `F` and access is exclusive, both
    // guaranteed by the caller.
    let callee = unsafe { callee.as_mut() };
    callee.call_mut(args)
}

/// Clones a buffer-resident callee into an uninitialized location.
///
/// If the clone panics, nothing has been written to `dst`; the caller must
/// treat `dst` as still uninitialized.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `src` points to a live value of type `F`.
/// 2. `dst` is valid for writes of `F` and does not overlap `src`.
unsafe fn clone_into<F: Clone + 'static>(src: NonNull<Erased>, dst: NonNull<Erased>) {
    // SAFETY: The pointee is a live `F` as guaranteed by the caller, and
    // shared access suffices for cloning.
    let src: &F = unsafe { src.cast::<F>().as_ref() };
    let cloned = src.clone();
    // SAFETY: `dst` is valid for writes of `F` as guaranteed by the caller.
    unsafe { dst.cast::<F>().as_ptr().write(cloned) };
}

/// Runs a buffer-resident callee's destructor in place.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `callee` points to a live value of type `F`.
/// 2. The value is not used, and its destructor not run again, after this
///    call unless a new value is constructed at the location first.
unsafe fn drop_in_place<F: 'static>(callee: NonNull<Erased>) {
    let callee = callee.cast::<F>().as_ptr();
    // SAFETY: The pointee is a live `F` with exclusive access, guaranteed
    // by the caller, and the caller promises not to double-drop.
    unsafe { core::ptr::drop_in_place(callee) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_vtable_canonical() {
        let vtable1 = InlineVtable::<(), u32>::of::<fn() -> u32>();
        let vtable2 = InlineVtable::<(), u32>::of::<fn() -> u32>();

        assert!(core::ptr::eq(vtable1, vtable2));
    }

    #[test]
    fn test_inline_vtable_layout() {
        let vtable = InlineVtable::<(), u32>::of::<fn() -> u32>();
        assert_eq!(vtable.layout(), Layout::new::<fn() -> u32>());
    }

    #[test]
    fn test_inline_and_boxed_tables_do_not_collide() {
        // The same callee type gets independent tables per storage family;
        // the registry keys them apart.
        let plain = InlineVtable::<(), u32>::of::<fn() -> u32>();
        let cloneable = InlineVtable::<(), u32>::of_cloneable::<fn() -> u32>();

        assert!(!core::ptr::eq(plain, cloneable));
        assert!(!plain.supports_clone());
        assert!(cloneable.supports_clone());
    }
}
