//! Type-erased callable pointer types for the heap-owning family.
//!
//! This module encapsulates the `ptr` field of [`RawCall`], [`RawCallRef`],
//! and [`RawCallMut`], ensuring it is only visible within this module. This
//! visibility restriction guarantees the safety invariant: **the pointer
//! always comes from `Box<CallData<Args, Output, F>>`**.
//!
//! # Safety Invariant
//!
//! Since the `ptr` field can only be set via [`RawCall::new`] or
//! [`RawCall::new_cloneable`] (which create it from `Box::into_raw`), and
//! cannot be modified afterward (no `pub` or `pub(crate)` fields), the
//! pointer provenance remains valid throughout the value's lifetime.
//!
//! The [`RawCall::drop`] implementation relies on this invariant to safely
//! reconstruct the `Box` and deallocate the memory.
//!
//! # Type Erasure
//!
//! The concrete callee type parameter `F` is erased by casting to
//! `CallData<Args, Output, Erased>`. The vtable stored within the
//! `CallData` provides the runtime type information needed to safely
//! invoke, clone, and drop the callee. The argument and output types stay
//! concrete: a wrapper always knows its signature, only the callee behind
//! it is opaque.

use alloc::boxed::Box;
use core::{any::TypeId, ptr::NonNull};

use crate::{boxed::data::CallData, callee::Callee, util::Erased};

/// A pointer to a [`CallData`] that is guaranteed to point to an
/// initialized instance of a [`CallData<Args, Output, F>`] for some
/// specific `F`, though we do not know which actual `F` it is.
///
/// However, the pointer is allowed to transition into a non-initialized
/// state inside the [`RawCall::drop`] method.
///
/// The pointer is guaranteed to have been created using [`Box::into_raw`].
///
/// We cannot use a [`Box<CallData<Args, Output, F>>`] directly, because
/// that does not allow us to type-erase the `F`.
#[repr(transparent)]
pub struct RawCall<Args: 'static, Output: 'static> {
    /// Pointer to the inner callee storage block
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long
    /// as this struct exists:
    ///
    /// 1. The pointer must have been created from a `Box<CallData<Args,
    ///    Output, F>>` for some `F` using `Box::into_raw`.
    /// 2. The pointer will point to the same `CallData<Args, Output, F>`
    ///    for the entire lifetime of this object.
    /// 3. The pointee is properly initialized for the entire lifetime of
    ///    this object, except during the execution of the `Drop`
    ///    implementation.
    ptr: NonNull<CallData<Args, Output, Erased>>,
}

impl<Args: 'static, Output: 'static> RawCall<Args, Output> {
    /// Creates a new move-only [`RawCall`] embedding the specified callee.
    #[inline]
    pub fn new<F>(callee: F) -> Self
    where
        F: Callee<Args, Output = Output>,
    {
        Self::from_data(CallData::new(callee))
    }

    /// Creates a new [`RawCall`] embedding the specified callee, whose
    /// vtable carries a clone entry.
    #[inline]
    pub fn new_cloneable<F>(callee: F) -> Self
    where
        F: Callee<Args, Output = Output> + Clone,
    {
        Self::from_data(CallData::new_cloneable(callee))
    }

    /// Boxes a fully built [`CallData`] and erases its callee type.
    fn from_data<F: 'static>(data: CallData<Args, Output, F>) -> Self {
        let ptr = Box::new(data);
        let ptr: *mut CallData<Args, Output, F> = Box::into_raw(ptr);
        let ptr: *mut CallData<Args, Output, Erased> = ptr.cast::<CallData<Args, Output, Erased>>();

        // SAFETY: `Box::into_raw` returns a non-null pointer
        let ptr: NonNull<CallData<Args, Output, Erased>> = unsafe { NonNull::new_unchecked(ptr) };

        Self { ptr }
    }

    /// Returns a shared reference to the [`CallData`] instance.
    #[inline]
    pub fn as_ref(&self) -> RawCallRef<'_, Args, Output> {
        RawCallRef {
            ptr: self.ptr,
            _marker: core::marker::PhantomData,
        }
    }

    /// Returns an exclusive reference to the [`CallData`] instance.
    ///
    /// Exclusivity follows from the `&mut self` borrow: no other reference
    /// to the inner block can exist while the returned handle is alive.
    #[inline]
    pub fn as_mut(&mut self) -> RawCallMut<'_, Args, Output> {
        RawCallMut {
            ptr: self.ptr,
            _marker: core::marker::PhantomData,
        }
    }
}

impl<Args: 'static, Output: 'static> core::ops::Drop for RawCall<Args, Output> {
    #[inline]
    fn drop(&mut self) {
        let vtable = self.as_ref().vtable();

        // SAFETY:
        // 1. The pointer comes from `Box::into_raw` (guaranteed by the
        //    constructors of `RawCall`)
        // 2. The vtable returned by `self.as_ref().vtable()` is guaranteed
        //    to match the data in the `CallData`.
        // 3. The pointer is initialized and has not previously been freed
        //    as guaranteed by the invariants on this type. We are correctly
        //    transferring ownership here and the pointer is not used
        //    afterwards, as we are in the drop function.
        unsafe { vtable.drop(self.ptr) }
    }
}

/// A lifetime-bound shared pointer to a [`CallData`] that is guaranteed to
/// point to an initialized instance of a [`CallData<Args, Output, F>`] for
/// some specific `F`, though we do not know which actual `F` it is.
///
/// We cannot use a [`&'a CallData<Args, Output, F>`] directly, because that
/// would require us to know the actual type of the callee, which we do not.
///
/// [`&'a CallData<Args, Output, F>`]: CallData
#[repr(transparent)]
pub struct RawCallRef<'a, Args: 'static, Output: 'static> {
    /// Pointer to the inner callee storage block
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long
    /// as this struct exists:
    ///
    /// 1. The pointer must have been created from a `Box<CallData<Args,
    ///    Output, F>>` for some `F` using `Box::into_raw`.
    /// 2. The pointer will point to the same `CallData<Args, Output, F>`
    ///    for the entire lifetime of this object.
    ptr: NonNull<CallData<Args, Output, Erased>>,

    /// Marker to tell the compiler that we should behave the same as a
    /// `&'a CallData<Args, Output, Erased>`
    _marker: core::marker::PhantomData<&'a CallData<Args, Output, Erased>>,
}

impl<Args: 'static, Output: 'static> Clone for RawCallRef<'_, Args, Output> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Args: 'static, Output: 'static> Copy for RawCallRef<'_, Args, Output> {}

impl<'a, Args: 'static, Output: 'static> RawCallRef<'a, Args, Output> {
    /// Casts the [`RawCallRef`] to a [`CallData<Args, Output, F>`]
    /// reference.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The type `F` matches the actual callee type stored in the
    ///    [`CallData`].
    #[inline]
    pub(super) unsafe fn cast_inner<F: 'static>(self) -> &'a CallData<Args, Output, F> {
        // Debug assertion to catch type mismatches in case of bugs
        debug_assert_eq!(self.vtable().type_id(), TypeId::of::<F>());

        let this = self.ptr.cast::<CallData<Args, Output, F>>();
        // SAFETY: Converting the NonNull pointer to a reference is sound
        // because:
        // - The pointer is non-null, properly aligned, and dereferenceable
        //   (guaranteed by RawCallRef's type invariants)
        // - The pointee is properly initialized (RawCallRef's invariants
        //   guarantee it points to an initialized CallData<Args, Output, F>
        //   for some F)
        // - The type `F` matches the actual callee type (guaranteed by
        //   caller)
        // - Shared access is allowed
        // - The reference lifetime 'a is valid (tied to RawCallRef<'a>'s
        //   lifetime)
        unsafe { this.as_ref() }
    }

    /// Returns a raw pointer to the [`CallData`] instance.
    #[inline]
    pub(super) fn as_ptr(self) -> *const CallData<Args, Output, Erased> {
        self.ptr.as_ptr()
    }

    /// Returns the [`TypeId`] of the callee.
    #[inline]
    pub fn callee_type_id(self) -> TypeId {
        self.vtable().type_id()
    }

    /// Returns the [`core::any::type_name`] of the callee.
    #[inline]
    pub fn callee_type_name(self) -> &'static str {
        self.vtable().type_name()
    }

    /// Returns `true` if the callee's vtable carries a clone entry, i.e.
    /// the block was created with [`RawCall::new_cloneable`].
    #[inline]
    pub fn supports_clone(self) -> bool {
        self.vtable().supports_clone()
    }

    /// Clones the callee into a freshly allocated [`RawCall`], if the
    /// vtable carries a clone entry.
    ///
    /// Returns `None` if the block was created with [`RawCall::new`]. The
    /// referenced callee is left untouched either way.
    #[inline]
    pub fn clone_callee(self) -> Option<RawCall<Args, Output>> {
        let vtable = self.vtable();
        // SAFETY:
        // 1. The vtable returned by `self.vtable()` is guaranteed to match
        //    the data in the `CallData`.
        unsafe { vtable.clone_callee(self) }
    }
}

/// A lifetime-bound exclusive pointer to a [`CallData`] that is guaranteed
/// to point to an initialized instance of a [`CallData<Args, Output, F>`]
/// for some specific `F`, though we do not know which actual `F` it is.
///
/// Invocation requires this handle rather than [`RawCallRef`], because
/// calling goes through the callee's [`Callee::call_mut`] implementation
/// and therefore needs exclusive access to the callee's captured state.
#[repr(transparent)]
pub struct RawCallMut<'a, Args: 'static, Output: 'static> {
    /// Pointer to the inner callee storage block
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long
    /// as this struct exists:
    ///
    /// 1. The pointer must have been created from a `Box<CallData<Args,
    ///    Output, F>>` for some `F` using `Box::into_raw`.
    /// 2. The pointer will point to the same `CallData<Args, Output, F>`
    ///    for the entire lifetime of this object.
    /// 3. No other reference to the pointee exists while this object is
    ///    alive; access through it is exclusive.
    ptr: NonNull<CallData<Args, Output, Erased>>,

    /// Marker to tell the compiler that we should behave the same as a
    /// `&'a mut CallData<Args, Output, Erased>`
    _marker: core::marker::PhantomData<&'a mut CallData<Args, Output, Erased>>,
}

impl<'a, Args: 'static, Output: 'static> RawCallMut<'a, Args, Output> {
    /// Casts the [`RawCallMut`] to a mutable [`CallData<Args, Output, F>`]
    /// reference.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The type `F` matches the actual callee type stored in the
    ///    [`CallData`].
    #[inline]
    pub(super) unsafe fn cast_inner_mut<F: 'static>(self) -> &'a mut CallData<Args, Output, F> {
        // Debug assertion to catch type mismatches in case of bugs
        debug_assert_eq!(self.as_ref().vtable().type_id(), TypeId::of::<F>());

        let mut this = self.ptr.cast::<CallData<Args, Output, F>>();
        // SAFETY: Converting the NonNull pointer to a mutable reference is
        // sound because:
        // - The pointer is non-null, properly aligned, and dereferenceable
        //   (guaranteed by RawCallMut's type invariants)
        // - The pointee is properly initialized (RawCallMut's invariants
        //   guarantee it points to an initialized CallData<Args, Output, F>
        //   for some F)
        // - The type `F` matches the actual callee type (guaranteed by
        //   caller)
        // - Exclusive access is guaranteed by the invariants on this type
        // - The reference lifetime 'a is valid (tied to RawCallMut<'a>'s
        //   lifetime)
        unsafe { this.as_mut() }
    }

    /// Returns a shared [`RawCallRef`] borrowing from this handle.
    #[inline]
    pub fn as_ref(&self) -> RawCallRef<'_, Args, Output> {
        RawCallRef {
            ptr: self.ptr,
            _marker: core::marker::PhantomData,
        }
    }

    /// Reborrows this handle for a shorter lifetime.
    #[inline]
    pub fn reborrow(&mut self) -> RawCallMut<'_, Args, Output> {
        RawCallMut {
            ptr: self.ptr,
            _marker: core::marker::PhantomData,
        }
    }

    /// Invokes the callee with the given argument tuple.
    ///
    /// Consuming the handle makes reentrant invocation through the same
    /// borrow impossible; a new handle must be created from the owning
    /// [`RawCall`] for each call.
    #[inline]
    pub fn call(self, args: Args) -> Output {
        let vtable = self.as_ref().vtable();
        // SAFETY:
        // 1. The vtable returned by `self.as_ref().vtable()` is guaranteed
        //    to match the data in the `CallData`.
        unsafe { vtable.call(self, args) }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use core::mem::size_of;

    use super::*;

    #[test]
    fn test_raw_call_size() {
        assert_eq!(size_of::<RawCall<(), ()>>(), size_of::<usize>());
        assert_eq!(size_of::<Option<RawCall<(), ()>>>(), size_of::<usize>());
        assert_eq!(
            size_of::<Result<(), RawCall<(u32,), u32>>>(),
            size_of::<usize>()
        );

        assert_eq!(size_of::<RawCallRef<'_, (), ()>>(), size_of::<usize>());
        assert_eq!(
            size_of::<Option<RawCallRef<'_, (), ()>>>(),
            size_of::<usize>()
        );
        assert_eq!(size_of::<RawCallMut<'_, (), ()>>(), size_of::<usize>());
    }

    #[test]
    fn test_raw_call_invoke() {
        let mut raw: RawCall<(u32,), u32> = RawCall::new(|x: u32| x * 2);

        assert_eq!(raw.as_mut().call((4,)), 8);
        assert_eq!(raw.as_mut().call((5,)), 10);
    }

    #[test]
    fn test_raw_call_type_info() {
        let int_call: RawCall<(), u32> = RawCall::new(|| 1u32);
        let string_call: RawCall<(), String> = RawCall::new(String::new);

        assert_ne!(
            int_call.as_ref().callee_type_id(),
            string_call.as_ref().callee_type_id()
        );

        // The vtables should be different
        assert!(!core::ptr::eq(
            int_call.as_ref().vtable(),
            string_call.as_ref().vtable()
        ));
    }

    #[test]
    fn test_raw_call_downcast() {
        fn triple(x: u32) -> u32 {
            x * 3
        }

        let raw: RawCall<(u32,), u32> = RawCall::new(triple as fn(u32) -> u32);
        assert_eq!(
            raw.as_ref().callee_type_id(),
            TypeId::of::<fn(u32) -> u32>()
        );

        // SAFETY: We just checked that the stored callee type is
        // `fn(u32) -> u32`.
        let callee: &fn(u32) -> u32 = unsafe { raw.as_ref().callee_downcast_unchecked() };
        assert_eq!(callee(7), 21);
    }

    #[test]
    fn test_clone_callee() {
        let raw: RawCall<(u32,), u32> = RawCall::new_cloneable(|x: u32| x + 10);
        assert!(raw.as_ref().supports_clone());

        let mut cloned = raw.as_ref().clone_callee().unwrap();
        assert_eq!(cloned.as_mut().call((1,)), 11);

        let move_only: RawCall<(u32,), u32> = RawCall::new(|x: u32| x + 10);
        assert!(!move_only.as_ref().supports_clone());
        assert!(move_only.as_ref().clone_callee().is_none());
    }

    #[test]
    fn test_send_sync() {
        static_assertions::assert_not_impl_any!(RawCall<(), ()>: Send, Sync);
        static_assertions::assert_not_impl_any!(RawCallRef<'_, (), ()>: Send, Sync);
        static_assertions::assert_not_impl_any!(RawCallMut<'_, (), ()>: Send, Sync);
    }
}
