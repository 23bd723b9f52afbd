//! This module encapsulates the fields of the [`CallData`]. Since this is
//! the only place they are visible, this means that the type of the
//! [`CallVtable`] is guaranteed to always be in sync with the type of the
//! actual callee. This follows from the fact that they are in sync when
//! created and that the API offers no way to change the [`CallVtable`] or
//! callee type after creation.

use crate::{
    boxed::{
        raw::{RawCallMut, RawCallRef},
        vtable::CallVtable,
    },
    callee::Callee,
};

/// Type-erased callee storage block with vtable-based dispatch.
///
/// This struct uses `#[repr(C)]` to enable safe field access in type-erased
/// contexts, allowing access to the vtable field even when the concrete
/// callee type `F` is unknown.
#[repr(C)]
pub(super) struct CallData<Args: 'static, Output: 'static, F: 'static> {
    /// The vtable of this callee
    vtable: &'static CallVtable<Args, Output>,
    /// The actual callee
    callee: F,
}

impl<Args: 'static, Output: 'static, F: 'static> CallData<Args, Output, F> {
    /// Creates a new [`CallData`] holding the specified callee.
    ///
    /// The generated vtable has no clone entry, so the resulting block is
    /// move-only.
    #[inline]
    pub(super) fn new(callee: F) -> Self
    where
        F: Callee<Args, Output = Output>,
    {
        Self {
            vtable: CallVtable::of::<F>(),
            callee,
        }
    }

    /// Creates a new [`CallData`] holding the specified callee, with a
    /// vtable that includes a clone entry.
    #[inline]
    pub(super) fn new_cloneable(callee: F) -> Self
    where
        F: Callee<Args, Output = Output> + Clone,
    {
        Self {
            vtable: CallVtable::of_cloneable::<F>(),
            callee,
        }
    }
}

impl<'a, Args: 'static, Output: 'static> RawCallRef<'a, Args, Output> {
    /// Returns a reference to the [`CallVtable`] of the [`CallData`]
    /// instance.
    #[inline]
    pub(super) fn vtable(self) -> &'static CallVtable<Args, Output> {
        let ptr = self.as_ptr();
        // SAFETY: We don't know the actual inner callee type, but we do know
        // that the pointer points to an instance of `CallData<Args, Output,
        // F>` for some specific `F`. Since `CallData` is `#[repr(C)]`, it is
        // safe to create pointers to the fields before the actual callee.
        //
        // We need to take care to avoid creating an actual reference to the
        // `CallData` itself though, as that would still be undefined
        // behavior since we don't have the right type.
        let vtable_ptr: *const &'static CallVtable<Args, Output> =
            unsafe { &raw const (*ptr).vtable };

        // SAFETY: Dereferencing the pointer and getting out the
        // `&'static CallVtable` is valid for the same reasons
        unsafe { *vtable_ptr }
    }

    /// Accesses the inner callee of the [`CallData`] instance as a
    /// reference to the specified type.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the type `F` matches the actual callee
    /// type stored in the [`CallData`].
    #[inline]
    pub unsafe fn callee_downcast_unchecked<F: 'static>(self) -> &'a F {
        // SAFETY: The inner function requires that `F` matches the type
        // stored, but that is guaranteed by our caller.
        let this = unsafe { self.cast_inner::<F>() };
        &this.callee
    }
}

impl<'a, Args: 'static, Output: 'static> RawCallMut<'a, Args, Output> {
    /// Accesses the inner callee of the [`CallData`] instance as a mutable
    /// reference to the specified type.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the type `F` matches the actual callee
    /// type stored in the [`CallData`].
    #[inline]
    pub unsafe fn callee_downcast_mut_unchecked<F: 'static>(self) -> &'a mut F {
        // SAFETY: The inner function requires that `F` matches the type
        // stored, but that is guaranteed by our caller.
        let this = unsafe { self.cast_inner_mut::<F>() };
        &mut this.callee
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_data_field_offsets() {
        use core::mem::{offset_of, size_of};

        #[repr(align(32))]
        struct LargeAlignment {
            _value: u8,
        }

        type Vtable = &'static CallVtable<(), ()>;

        assert_eq!(offset_of!(CallData<(), (), u8>, vtable), 0);
        assert_eq!(offset_of!(CallData<(), (), u32>, vtable), 0);
        assert_eq!(offset_of!(CallData<(), (), [u64; 4]>, vtable), 0);
        assert_eq!(offset_of!(CallData<(), (), LargeAlignment>, vtable), 0);

        assert!(offset_of!(CallData<(), (), u8>, callee) >= size_of::<Vtable>());
        assert!(offset_of!(CallData<(), (), u32>, callee) >= size_of::<Vtable>());
        assert!(offset_of!(CallData<(), (), [u64; 4]>, callee) >= size_of::<Vtable>());
        assert!(offset_of!(CallData<(), (), LargeAlignment>, callee) >= size_of::<Vtable>());
    }
}
