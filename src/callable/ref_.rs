use anycall_internals::{
    RawView,
    callee::{FnAddr, SharedCallee},
};

use crate::error::EmptyCallableError;

/// A non-owning, trivially copyable view of a callable with the signature
/// `Args -> Output`.
///
/// A `CallableRef` stores no callee of its own: it references a callable
/// whose storage is owned and kept alive elsewhere. Copying the view
/// copies two words and never touches the referenced callee, and dropping
/// it is a no-op. The view's validity tracks the *referent*, not the
/// view, so a copy remains invocable after the view it was copied from is
/// gone.
///
/// The `'a` lifetime ties every view to its referent: invoking a view
/// whose referent has been dropped is rejected by the borrow checker, not
/// deferred to a runtime check. Views created from plain function
/// pointers via [`from_fn`](CallableRef::from_fn) have no referent and
/// are `'static`.
///
/// Because the view shares the callee rather than owning it, the callee
/// must be invocable through a shared reference (`Fn`, not just `FnMut`).
///
/// # Examples
///
/// ```
/// use anycall::CallableRef;
///
/// let base = 10u32;
/// let add_base = move |x: u32| x + base;
///
/// let view = CallableRef::new(&add_base);
/// let copy = view;
///
/// assert_eq!(view.call((1,)), 11);
/// assert_eq!(copy.call((2,)), 12);
/// ```
pub struct CallableRef<'a, Args: 'static, Output: 'static> {
    /// The view, or `None` for the empty state.
    raw: Option<RawView<'a, Args, Output>>,
}

impl<Args: 'static, Output: 'static> Clone for CallableRef<'_, Args, Output> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Args: 'static, Output: 'static> Copy for CallableRef<'_, Args, Output> {}

impl<'a, Args: 'static, Output: 'static> CallableRef<'a, Args, Output> {
    /// Creates a view of a callee owned and kept alive by the caller.
    ///
    /// No allocation takes place and no ownership is assumed; the caller
    /// remains responsible for the callee's lifetime, and the borrow
    /// checker holds the caller to it.
    #[must_use]
    pub fn new<F>(callee: &'a F) -> Self
    where
        F: SharedCallee<Args, Output = Output>,
    {
        Self {
            raw: Some(RawView::new(callee)),
        }
    }

    /// Creates a view of a plain function pointer.
    ///
    /// The function's address is stored inside the view's own handle, so
    /// there is no referent to outlive: the resulting view is `'static`.
    ///
    /// # Examples
    /// ```
    /// use anycall::CallableRef;
    ///
    /// fn double(x: u32) -> u32 {
    ///     x * 2
    /// }
    ///
    /// let view: CallableRef<'static, (u32,), u32> = CallableRef::from_fn(double as fn(u32) -> u32);
    /// assert_eq!(view.call((21,)), 42);
    /// ```
    #[must_use]
    pub fn from_fn<P>(ptr: P) -> CallableRef<'static, Args, Output>
    where
        P: FnAddr<Args, Output = Output>,
    {
        CallableRef {
            raw: Some(RawView::<Args, Output>::from_fn(ptr)),
        }
    }

    /// Creates an empty `CallableRef` referencing nothing.
    #[must_use]
    pub const fn empty() -> Self {
        Self { raw: None }
    }

    /// Returns `true` if the view references nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_none()
    }

    /// Invokes the referenced callable with the given argument tuple.
    ///
    /// Invocation goes through a shared reference, so the view can be
    /// invoked any number of times and from any number of copies.
    ///
    /// # Panics
    ///
    /// Panics if the view is empty. Use
    /// [`try_call`](CallableRef::try_call) when emptiness is an expected
    /// state.
    pub fn call(&self, args: Args) -> Output {
        match self.raw {
            Some(raw) => raw.call(args),
            None => panic!("attempted to invoke an empty CallableRef"),
        }
    }

    /// Invokes the referenced callable, or returns an error if the view
    /// is empty.
    pub fn try_call(&self, args: Args) -> Result<Output, EmptyCallableError> {
        match self.raw {
            Some(raw) => Ok(raw.call(args)),
            None => Err(EmptyCallableError),
        }
    }
}

impl<Args: 'static, Output: 'static> Default for CallableRef<'_, Args, Output> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<Args: 'static, Output: 'static> core::fmt::Debug for CallableRef<'_, Args, Output> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.raw.is_some() {
            f.write_str("CallableRef")
        } else {
            f.write_str("CallableRef(empty)")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_is_copy() {
        static_assertions::assert_impl_all!(CallableRef<'_, (), ()>: Copy, Clone);
        static_assertions::assert_not_impl_any!(CallableRef<'_, (), ()>: Send, Sync);
    }

    #[test]
    fn test_invoke_matches_direct_invocation() {
        let callee = |a: u8, b: u8| a.wrapping_mul(b);
        let view = CallableRef::new(&callee);

        assert_eq!(view.call((3, 5)), callee(3, 5));
    }

    #[test]
    fn test_copy_outlives_original_view() {
        let offset = 2u32;
        let shift = move |x: u32| x << offset;

        let copy = {
            let view = CallableRef::new(&shift);
            view
        };

        // The original view is gone, but the referent is alive, so the
        // copy stays valid.
        assert_eq!(copy.call((1,)), 4);
    }

    #[test]
    fn test_fn_pointer_views_are_static() {
        fn parity(x: u64) -> bool {
            x % 2 == 0
        }

        fn make_view() -> CallableRef<'static, (u64,), bool> {
            CallableRef::from_fn(parity as fn(u64) -> bool)
        }

        let view = make_view();
        assert!(view.call((4,)));
        assert!(!view.call((5,)));
    }

    #[test]
    fn test_empty_invocation_is_signaled() {
        let empty: CallableRef<'_, (), ()> = CallableRef::empty();
        assert!(empty.is_empty());
        assert!(empty.try_call(()).is_err());
    }

    #[test]
    #[should_panic = "empty CallableRef"]
    fn test_empty_invocation_panics() {
        let empty: CallableRef<'_, (u8,), u8> = CallableRef::empty();
        let _ = empty.call((1,));
    }
}
