//! Non-owning, type-erased callable views.
//!
//! The borrowing family does not use a struct-shaped dispatch table: with
//! no ownership there is nothing to clone or drop, so the whole table
//! degenerates to a single invoke entry stored directly in the view, next
//! to an opaque [`ViewHandle`].
//!
//! The handle is a tagged-union-without-a-tag: it holds either the address
//! of a callee object owned elsewhere, or a plain function pointer. Rust
//! (like C) does not permit storing a function pointer in a data pointer,
//! so the union carries both representations and the paired invoke entry
//! acts as the tag: each constructor stores the matching variant and an
//! invoke function that reads only that variant back.
//!
//! # Lifetime
//!
//! A [`RawView`] borrowing an object is bound to the referent's lifetime
//! through its `'a` parameter, so the classic use-after-expiry hazard of
//! non-owning callable views is rejected by the borrow checker instead of
//! being a documented caller obligation. Views over plain function
//! pointers have no referent and are `'static`.

use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::{
    callee::{FnAddr, SharedCallee},
    util::Erased,
};

/// Opaque storage handle of a [`RawView`]: either the address of a callee
/// object, or a signature-erased function pointer.
///
/// Which variant is live is known only to the invoke entry the handle was
/// paired with at construction.
#[derive(Clone, Copy)]
union ViewHandle {
    /// Address of a callee object owned and kept alive by the caller.
    object: NonNull<Erased>,
    /// A plain function pointer with its signature erased.
    code: fn(),
}

/// A non-owning, type-erased view of a callable.
///
/// Holds an invoke entry and the [`ViewHandle`] it was paired with; copying
/// the view copies the pair and never touches the referenced callee.
///
/// # Safety Invariant
///
/// The following safety invariants are guaranteed to be upheld as long as
/// this struct exists:
///
/// 1. If `call` is an object trampoline, `handle.object` is the live
///    variant and points to a value of the trampoline's callee type, valid
///    for the lifetime `'a`.
/// 2. If `call` is a code trampoline, `handle.code` is the live variant and
///    was erased from a function pointer of the trampoline's type.
pub struct RawView<'a, Args: 'static, Output: 'static> {
    /// Combined dispatch entry: invokes the callee behind `handle`.
    call: unsafe fn(ViewHandle, Args) -> Output,
    /// The opaque storage handle `call` knows how to read.
    handle: ViewHandle,
    /// Marker to tell the compiler that we should behave the same as a
    /// `&'a` reference to the (erased) referent.
    _referent: PhantomData<&'a Erased>,
}

impl<Args: 'static, Output: 'static> Clone for RawView<'_, Args, Output> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Args: 'static, Output: 'static> Copy for RawView<'_, Args, Output> {}

impl<'a, Args: 'static, Output: 'static> RawView<'a, Args, Output> {
    /// Creates a view of a callee object owned and kept alive by the
    /// caller.
    ///
    /// The view stores only the object's address; the `'a` bound keeps it
    /// from outliving the referent.
    #[inline]
    pub fn new<F>(callee: &'a F) -> Self
    where
        F: SharedCallee<Args, Output = Output>,
    {
        Self {
            call: call_object::<Args, Output, F>,
            handle: ViewHandle {
                object: NonNull::from(callee).cast::<Erased>(),
            },
            _referent: PhantomData,
        }
    }

    /// Creates a view of a plain function pointer.
    ///
    /// The function's address is stored inside the handle itself, so the
    /// view has no referent and is valid for the `'static` lifetime.
    #[inline]
    pub fn from_fn<P>(ptr: P) -> RawView<'static, Args, Output>
    where
        P: FnAddr<Args, Output = Output>,
    {
        RawView {
            call: call_code::<Args, Output, P>,
            handle: ViewHandle { code: ptr.erase() },
            _referent: PhantomData,
        }
    }

    /// Invokes the viewed callable with the given argument tuple.
    #[inline]
    pub fn call(self, args: Args) -> Output {
        // SAFETY: `call` and `handle` were paired by one of the
        // constructors, so the entry reads the variant that is actually
        // live (invariants 1 and 2), and the `'a` bound guarantees any
        // referenced object is still alive.
        unsafe { (self.call)(self.handle, args) }
    }
}

/// Invoke entry for views over callee objects.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `handle.object` is the live union variant and points to a live value
///    of type `F`.
unsafe fn call_object<Args: 'static, Output: 'static, F>(
    handle: ViewHandle,
    args: Args,
) -> Output
where
    F: SharedCallee<Args, Output = Output>,
{
    // SAFETY: `object` is the live variant, guaranteed by the caller.
    let object = unsafe { handle.object };
    // SAFETY: The pointee is a live `F`, guaranteed by the caller; shared
    // access suffices for `SharedCallee`.
    let callee = unsafe { object.cast::<F>().as_ref() };
    callee.call(args)
}

/// Invoke entry for views over plain function pointers.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `handle.code` is the live union variant and was produced by
///    [`FnAddr::erase`] on a value of type `P`.
unsafe fn call_code<Args: 'static, Output: 'static, P>(handle: ViewHandle, args: Args) -> Output
where
    P: FnAddr<Args, Output = Output>,
{
    // SAFETY: `code` is the live variant, guaranteed by the caller.
    let code = unsafe { handle.code };
    // SAFETY: `code` came from `P::erase`, guaranteed by the caller.
    unsafe { P::call_erased(code, args) }
}

#[cfg(test)]
mod tests {
    use core::mem::size_of;

    use super::*;

    #[test]
    fn test_view_size() {
        // An invoke entry plus a handle: two words, no allocation.
        assert_eq!(size_of::<RawView<'_, (), ()>>(), 2 * size_of::<usize>());
    }

    #[test]
    fn test_view_of_object() {
        let offset = 5u32;
        let add = move |x: u32| x + offset;

        let view = RawView::new(&add);
        let copy = view;

        assert_eq!(view.call((1,)), 6);
        assert_eq!(copy.call((2,)), 7);
    }

    #[test]
    fn test_view_of_fn_pointer() {
        fn negate(x: i32) -> i32 {
            -x
        }

        let view: RawView<'static, (i32,), i32> = RawView::<(i32,), i32>::from_fn(negate as fn(i32) -> i32);
        assert_eq!(view.call((3,)), -3);
    }

    #[test]
    fn test_send_sync() {
        static_assertions::assert_not_impl_any!(RawView<'_, (), ()>: Send, Sync);
    }
}
