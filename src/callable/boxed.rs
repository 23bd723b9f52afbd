use core::any::TypeId;

use anycall_internals::{RawCall, callee::Callee};

use crate::{
    error::EmptyCallableError,
    markers::{
        CalleeMarkerFor, Cloneable, CloneabilityMarker, Local, Sendable, ThreadSafetyMarker,
        Uncloneable,
    },
};

/// FIXME: Once rust-lang/rust#132922 gets resolved, we can make the `raw`
/// field an unsafe field and remove this module.
mod limit_field_access {
    use core::marker::PhantomData;

    use anycall_internals::{RawCall, RawCallMut, RawCallRef};

    use crate::markers::{Sendable, Uncloneable};

    /// A type-erased, heap-backed callable with the signature
    /// `Args -> Output`.
    ///
    /// A `Callable` either embeds one exclusively owned callee on the heap,
    /// or is *empty*: a present dispatch table and a live callee always go
    /// together. Invoking a non-empty callable runs the callee; invoking an
    /// empty one is a precondition violation (see
    /// [`call`](Callable::call)).
    ///
    /// # Type Parameters
    /// - `Args`: The argument tuple of the signature, e.g. `(u32, bool)`.
    /// - `Output`: The value an invocation produces.
    /// - `Cloneability`: Either [`Cloneable`] or [`Uncloneable`]. Copy
    ///   support is opt-in at construction.
    /// - `ThreadSafety`: Either [`Sendable`] or [`Local`].
    ///
    /// [`Cloneable`]: crate::markers::Cloneable
    /// [`Uncloneable`]: crate::markers::Uncloneable
    /// [`Sendable`]: crate::markers::Sendable
    /// [`Local`]: crate::markers::Local
    pub struct Callable<
        Args: 'static,
        Output: 'static,
        Cloneability: 'static = Uncloneable,
        ThreadSafety: 'static = Sendable,
    > {
        /// # Safety
        ///
        /// The following safety invariants are guaranteed to be upheld as
        /// long as this struct exists:
        ///
        /// 1. If `Cloneability = Cloneable` and a callee is embedded, its
        ///    dispatch table carries a clone entry.
        /// 2. If `ThreadSafety = Sendable` and a callee is embedded, the
        ///    callee is `Send`.
        raw: Option<RawCall<Args, Output>>,
        /// Cloneability marker; carries no data.
        _cloneability: PhantomData<Cloneability>,
        /// Thread-safety marker; carries no data.
        _thread_safety: PhantomData<ThreadSafety>,
    }

    impl<Args: 'static, Output: 'static, C, T> Callable<Args, Output, C, T> {
        /// Creates a `Callable` from an optional raw callee.
        ///
        /// # Safety
        ///
        /// The caller must ensure:
        ///
        /// 1. If `C = Cloneable` and `raw` is `Some`: the embedded callee's
        ///    dispatch table carries a clone entry.
        /// 2. If `T = Sendable` and `raw` is `Some`: the embedded callee is
        ///    `Send`.
        #[must_use]
        pub(crate) const unsafe fn from_raw(raw: Option<RawCall<Args, Output>>) -> Self {
            // SAFETY: We must uphold the safety invariants of the raw
            // field:
            // 1. Guaranteed by caller
            // 2. Guaranteed by caller
            Callable {
                raw,
                _cloneability: PhantomData,
                _thread_safety: PhantomData,
            }
        }

        /// Consumes the `Callable` and returns the inner raw callee, if
        /// any.
        #[must_use]
        pub(crate) fn into_raw(self) -> Option<RawCall<Args, Output>> {
            // SAFETY: We are destroying `self`, so we no longer need to
            // uphold any safety invariants.
            self.raw
        }

        /// Removes and returns the inner raw callee, leaving `self` empty.
        #[must_use]
        pub(crate) fn take_raw(&mut self) -> Option<RawCall<Args, Output>> {
            // SAFETY: We must uphold the safety invariants of the raw
            // field: both invariants only constrain an embedded callee, and
            // after this call there is none.
            self.raw.take()
        }

        /// Returns a shared handle to the inner raw callee, if any.
        #[must_use]
        pub(crate) fn raw(&self) -> Option<RawCallRef<'_, Args, Output>> {
            // SAFETY: We must uphold the safety invariants of the raw
            // field: no mutation is possible through the `RawCallRef`.
            self.raw.as_ref().map(RawCall::as_ref)
        }

        /// Returns an exclusive handle to the inner raw callee, if any.
        #[must_use]
        pub(crate) fn raw_mut(&mut self) -> Option<RawCallMut<'_, Args, Output>> {
            // SAFETY: We must uphold the safety invariants of the raw
            // field: invoking the callee through the `RawCallMut` cannot
            // change its type or its dispatch table.
            self.raw.as_mut().map(RawCall::as_mut)
        }
    }
}
pub use limit_field_access::Callable;

impl<Args: 'static, Output: 'static, T: ThreadSafetyMarker> Callable<Args, Output, Uncloneable, T> {
    /// Allocates a new move-only `Callable` embedding the given callee.
    ///
    /// The thread-safety marker is enforced here: a
    /// [`Sendable`](crate::markers::Sendable) callable can only be built
    /// from a `Send` callee. When type inference cannot settle the marker,
    /// use [`new_sendable`](Callable::new_sendable) or
    /// [`new_local`](Callable::new_local) instead.
    ///
    /// # Examples
    /// ```
    /// use anycall::Callable;
    ///
    /// let mut double: Callable<(u32,), u32> = Callable::new(|x: u32| x * 2);
    /// assert_eq!(double.call((21,)), 42);
    /// ```
    #[must_use]
    pub fn new<F>(callee: F) -> Self
    where
        F: Callee<Args, Output = Output> + CalleeMarkerFor<T>,
    {
        let raw = RawCall::new(callee);

        // SAFETY:
        // 1. `C = Uncloneable`, so this is trivially true.
        // 2. If `T = Sendable`, the bound `F: CalleeMarkerFor<Sendable>`
        //    guarantees that the callee is `Send`.
        unsafe { Callable::from_raw(Some(raw)) }
    }
}

impl<Args: 'static, Output: 'static, T: ThreadSafetyMarker> Callable<Args, Output, Cloneable, T> {
    /// Allocates a new clone-capable `Callable` embedding the given
    /// callee.
    ///
    /// The callee must implement `Clone`; its dispatch table records a
    /// clone entry, and the resulting wrapper implements `Clone` itself.
    ///
    /// # Examples
    /// ```
    /// use anycall::{Callable, markers};
    ///
    /// let mut greet: Callable<(&'static str,), usize, markers::Cloneable> =
    ///     Callable::new_cloneable(|name: &'static str| name.len());
    ///
    /// let mut copy = greet.clone();
    /// assert_eq!(greet.call(("ada",)), 3);
    /// assert_eq!(copy.call(("turing",)), 6);
    /// ```
    #[must_use]
    pub fn new_cloneable<F>(callee: F) -> Self
    where
        F: Callee<Args, Output = Output> + Clone + CalleeMarkerFor<T>,
    {
        let raw = RawCall::new_cloneable(callee);

        // SAFETY:
        // 1. The raw callee was created with `RawCall::new_cloneable`, so
        //    its dispatch table carries a clone entry.
        // 2. If `T = Sendable`, the bound `F: CalleeMarkerFor<Sendable>`
        //    guarantees that the callee is `Send`.
        unsafe { Callable::from_raw(Some(raw)) }
    }
}

impl<Args: 'static, Output: 'static> Callable<Args, Output, Uncloneable, Sendable> {
    /// Creates a new `Callable` with [`Sendable`] thread safety.
    ///
    /// This is a convenience method that calls [`Callable::new`] with an
    /// explicit [`Sendable`] marker. Use this method when you're having
    /// trouble with type inference for the thread-safety parameter.
    #[must_use]
    pub fn new_sendable<F>(callee: F) -> Self
    where
        F: Callee<Args, Output = Output> + Send,
    {
        Self::new(callee)
    }
}

impl<Args: 'static, Output: 'static> Callable<Args, Output, Uncloneable, Local> {
    /// Creates a new `Callable` with [`Local`] thread safety.
    ///
    /// This is a convenience method that calls [`Callable::new`] with an
    /// explicit [`Local`] marker. Use this method when the callee captures
    /// non-`Send` data, or when you're having trouble with type inference
    /// for the thread-safety parameter.
    #[must_use]
    pub fn new_local<F>(callee: F) -> Self
    where
        F: Callee<Args, Output = Output>,
    {
        Self::new(callee)
    }
}

impl<Args: 'static, Output: 'static> Callable<Args, Output, Cloneable, Sendable> {
    /// Creates a new clone-capable `Callable` with [`Sendable`] thread
    /// safety.
    ///
    /// This is a convenience method that calls [`Callable::new_cloneable`]
    /// with an explicit [`Sendable`] marker.
    #[must_use]
    pub fn new_cloneable_sendable<F>(callee: F) -> Self
    where
        F: Callee<Args, Output = Output> + Clone + Send,
    {
        Self::new_cloneable(callee)
    }
}

impl<Args: 'static, Output: 'static> Callable<Args, Output, Cloneable, Local> {
    /// Creates a new clone-capable `Callable` with [`Local`] thread
    /// safety.
    ///
    /// This is a convenience method that calls [`Callable::new_cloneable`]
    /// with an explicit [`Local`] marker.
    #[must_use]
    pub fn new_cloneable_local<F>(callee: F) -> Self
    where
        F: Callee<Args, Output = Output> + Clone,
    {
        Self::new_cloneable(callee)
    }
}

impl<Args: 'static, Output: 'static, C: CloneabilityMarker, T: ThreadSafetyMarker>
    Callable<Args, Output, C, T>
{
    /// Creates an empty `Callable`: no dispatch table, no callee, no
    /// allocation.
    ///
    /// # Examples
    /// ```
    /// use anycall::Callable;
    ///
    /// let mut idle: Callable<(), ()> = Callable::empty();
    /// assert!(idle.is_empty());
    /// assert!(idle.try_call(()).is_err());
    /// ```
    #[must_use]
    pub const fn empty() -> Self {
        // SAFETY:
        // 1. No callee is embedded, so this is trivially true.
        // 2. No callee is embedded, so this is trivially true.
        unsafe { Self::from_raw(None) }
    }

    /// Returns `true` if no callee is embedded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw().is_none()
    }

    /// Invokes the embedded callee with the given argument tuple.
    ///
    /// Each invocation goes through the callee's dispatch table and runs
    /// the callee itself; side effects of earlier invocations are visible
    /// to later ones.
    ///
    /// # Panics
    ///
    /// Panics if the callable is empty. Invoking an empty callable is a
    /// precondition violation; use [`try_call`](Callable::try_call) when
    /// emptiness is an expected state.
    ///
    /// # Examples
    /// ```
    /// use anycall::Callable;
    ///
    /// let mut counter: Callable<(), u32> = Callable::new({
    ///     let mut count = 0u32;
    ///     move || {
    ///         count += 1;
    ///         count
    ///     }
    /// });
    ///
    /// assert_eq!(counter.call(()), 1);
    /// assert_eq!(counter.call(()), 2);
    /// ```
    pub fn call(&mut self, args: Args) -> Output {
        match self.raw_mut() {
            Some(raw) => raw.call(args),
            None => panic!("attempted to invoke an empty Callable"),
        }
    }

    /// Invokes the embedded callee, or returns an error if the callable is
    /// empty.
    ///
    /// The callee's own output is never interpreted or wrapped; the error
    /// case exists solely for the empty state.
    pub fn try_call(&mut self, args: Args) -> Result<Output, EmptyCallableError> {
        match self.raw_mut() {
            Some(raw) => Ok(raw.call(args)),
            None => Err(EmptyCallableError),
        }
    }

    /// Moves the embedded callee into a new `Callable`, leaving `self`
    /// empty.
    ///
    /// Ownership of the heap storage transfers directly; the callee is
    /// neither cloned nor relocated.
    ///
    /// # Examples
    /// ```
    /// use anycall::Callable;
    ///
    /// let mut original: Callable<(), u32> = Callable::new(|| 1);
    /// let mut moved = original.take();
    ///
    /// assert!(original.is_empty());
    /// assert_eq!(moved.call(()), 1);
    /// ```
    #[must_use]
    pub fn take(&mut self) -> Self {
        let raw = self.take_raw();
        // SAFETY:
        // 1. Carried over: the callee and its dispatch table are unchanged,
        //    so a clone entry present under `self`'s invariant is still
        //    present.
        // 2. Carried over: the callee is unchanged, so `Send`-ness under
        //    `self`'s invariant still holds.
        unsafe { Self::from_raw(raw) }
    }

    /// Returns the [`TypeId`] of the embedded callee, or `None` when
    /// empty.
    #[must_use]
    pub fn callee_type_id(&self) -> Option<TypeId> {
        self.raw().map(|raw| raw.callee_type_id())
    }

    /// Returns the [`core::any::type_name`] of the embedded callee, or
    /// `None` when empty.
    #[must_use]
    pub fn callee_type_name(&self) -> Option<&'static str> {
        self.raw().map(|raw| raw.callee_type_name())
    }
}

impl<Args: 'static, Output: 'static, C: CloneabilityMarker> Callable<Args, Output, C, Sendable> {
    /// Changes the thread-safety marker of this `Callable` to [`Local`].
    ///
    /// This method does not modify the callable in any way. It only has
    /// the effect of "forgetting" that the embedded callee is actually
    /// `Send`; there is no way back.
    #[must_use]
    pub fn into_local(self) -> Callable<Args, Output, C, Local> {
        let raw = self.into_raw();

        // SAFETY:
        // 1. Carried over from `self`'s invariants.
        // 2. `T = Local`, so this is trivially true.
        unsafe { Callable::from_raw(raw) }
    }
}

impl<Args: 'static, Output: 'static, T: ThreadSafetyMarker> Callable<Args, Output, Cloneable, T> {
    /// Changes the cloneability marker of this `Callable` to
    /// [`Uncloneable`].
    ///
    /// This method does not modify the callable in any way. It only has
    /// the effect of "forgetting" that the embedded callee can be cloned,
    /// for example to store clone-capable and move-only callables in the
    /// same collection.
    #[must_use]
    pub fn into_uncloneable(self) -> Callable<Args, Output, Uncloneable, T> {
        let raw = self.into_raw();

        // SAFETY:
        // 1. `C = Uncloneable`, so this is trivially true.
        // 2. Carried over from `self`'s invariants.
        unsafe { Callable::from_raw(raw) }
    }
}

impl<Args: 'static, Output: 'static, T: ThreadSafetyMarker> Clone
    for Callable<Args, Output, Cloneable, T>
{
    fn clone(&self) -> Self {
        let raw = self.raw().map(|raw| match raw.clone_callee() {
            Some(cloned) => cloned,
            // Invariant 1 of the raw field: a `Cloneable` wrapper only ever
            // embeds callees whose table carries a clone entry.
            None => unreachable!("clone-capable callable backed by a table without a clone entry"),
        });

        // SAFETY:
        // 1. The clone was produced by the clone entry, which allocates
        //    through the clone-capable table generator.
        // 2. The clone has the same callee type as the original, so
        //    `Send`-ness under `self`'s invariant carries over.
        unsafe { Self::from_raw(raw) }
    }
}

impl<Args: 'static, Output: 'static, C: CloneabilityMarker, T: ThreadSafetyMarker> Default
    for Callable<Args, Output, C, T>
{
    fn default() -> Self {
        Self::empty()
    }
}

impl<Args: 'static, Output: 'static, C, T> core::fmt::Debug for Callable<Args, Output, C, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.raw().map(|raw| raw.callee_type_name()) {
            Some(name) => write!(f, "Callable({name})"),
            None => f.write_str("Callable(empty)"),
        }
    }
}

// SAFETY: The `Sendable` marker guarantees (invariant 2 of the raw field)
// that any embedded callee is `Send`. The wrapper holds nothing else
// besides the pointer to that callee, so it is safe to send it to another
// thread. No `Sync` implementation is provided: invocation requires
// exclusive access.
unsafe impl<Args: 'static, Output: 'static, C: 'static> Send
    for Callable<Args, Output, C, Sendable>
{
}

/// Generates marker-weakening `From` implementations between `Callable`
/// instantiations.
macro_rules! from_impls {
    ($(
        $cloneability1:ty => $cloneability2:ty,
        $thread_safety1:ty => $thread_safety2:ty,
        [$($op:ident),*]
    );* $(;)?) => {
        $(
            impl<Args: 'static, Output: 'static>
                From<Callable<Args, Output, $cloneability1, $thread_safety1>>
                for Callable<Args, Output, $cloneability2, $thread_safety2>
            {
                fn from(
                    callable: Callable<Args, Output, $cloneability1, $thread_safety1>,
                ) -> Self {
                    callable
                        $(
                            .$op()
                        )*
                }
            }
        )*
    };
}

from_impls!(
    Uncloneable => Uncloneable, Sendable => Local, [into_local];
    Cloneable => Uncloneable, Sendable => Sendable, [into_uncloneable];
    Cloneable => Uncloneable, Sendable => Local, [into_uncloneable, into_local];
    Cloneable => Uncloneable, Local => Local, [into_uncloneable];
    Cloneable => Cloneable, Sendable => Local, [into_local];
);

#[cfg(test)]
mod tests {
    use alloc::{rc::Rc, string::String};
    use core::cell::Cell;

    use super::*;

    #[allow(dead_code)]
    struct NonSend(*const ());
    static_assertions::assert_not_impl_any!(NonSend: Send, Sync);

    #[test]
    fn test_callable_send() {
        static_assertions::assert_impl_all!(Callable<(), (), Uncloneable, Sendable>: Send);
        static_assertions::assert_impl_all!(Callable<(u32,), String, Cloneable, Sendable>: Send);

        static_assertions::assert_not_impl_any!(Callable<(), (), Uncloneable, Sendable>: Sync);
        static_assertions::assert_not_impl_any!(Callable<(), (), Uncloneable, Local>: Send, Sync);
        static_assertions::assert_not_impl_any!(Callable<(), (), Cloneable, Local>: Send, Sync);
    }

    #[test]
    fn test_callable_clone_markers() {
        static_assertions::assert_impl_all!(Callable<(), (), Cloneable, Sendable>: Clone);
        static_assertions::assert_impl_all!(Callable<(), (), Cloneable, Local>: Clone);

        static_assertions::assert_not_impl_any!(Callable<(), (), Uncloneable, Sendable>: Clone);
        static_assertions::assert_not_impl_any!(Callable<(), (), Uncloneable, Local>: Clone);
    }

    #[test]
    fn test_invoke_matches_direct_invocation() {
        let callee = |a: i64, b: i64| a - b;
        let mut wrapped: Callable<(i64, i64), i64> = Callable::new(callee);

        assert_eq!(wrapped.call((10, 4)), callee(10, 4));
    }

    #[test]
    fn test_reference_captured_counter_sees_side_effects() {
        let counter = Rc::new(Cell::new(0u32));
        let captured = Rc::clone(&counter);

        let mut wrapped: Callable<(), u32, Uncloneable, Local> = Callable::new_local(move || {
            captured.set(captured.get() + 1);
            captured.get()
        });

        assert_eq!(wrapped.call(()), 1);
        // The second invocation reflects the first call's side effect.
        assert_eq!(wrapped.call(()), 2);
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn test_take_leaves_source_empty() {
        let mut original: Callable<(u8,), u8> = Callable::new(|x: u8| x + 1);
        let mut moved = original.take();

        assert!(original.is_empty());
        assert!(!moved.is_empty());
        assert_eq!(moved.call((1,)), 2);
        assert_eq!(original.try_call((1,)), Err(EmptyCallableError));
    }

    #[test]
    fn test_clone_state_is_independent() {
        let mut original: Callable<(), u32, Cloneable> = Callable::new_cloneable({
            let mut hits = 0u32;
            move || {
                hits += 1;
                hits
            }
        });

        let mut cloned = original.clone();

        // Mutations through the clone are not observable through the
        // original: the captured counter was copied, not shared.
        assert_eq!(cloned.call(()), 1);
        assert_eq!(cloned.call(()), 2);
        assert_eq!(original.call(()), 1);
    }

    #[test]
    fn test_clone_of_shared_capture_shares_state() {
        let counter = Rc::new(Cell::new(0u32));
        let captured = Rc::clone(&counter);

        let mut original: Callable<(), u32, Cloneable, Local> =
            Callable::new_cloneable_local(move || {
                captured.set(captured.get() + 1);
                captured.get()
            });
        let mut cloned = original.clone();

        // The capture itself is a shared reference, so both wrappers
        // observe the same state.
        assert_eq!(original.call(()), 1);
        assert_eq!(cloned.call(()), 2);
    }

    #[test]
    fn test_empty_invocation_is_signaled() {
        let mut empty: Callable<(u32,), u32> = Callable::empty();

        assert!(empty.is_empty());
        assert_eq!(empty.callee_type_id(), None);
        assert_eq!(empty.try_call((1,)), Err(EmptyCallableError));
    }

    #[test]
    #[should_panic = "empty Callable"]
    fn test_empty_invocation_panics() {
        let mut empty: Callable<(), ()> = Callable::empty();
        empty.call(());
    }

    #[test]
    fn test_marker_coercions_preserve_behavior() {
        let cloneable: Callable<(), u32, Cloneable> = Callable::new_cloneable(|| 9);
        let mut weakened: Callable<(), u32, Uncloneable, Local> = cloneable.into();

        assert_eq!(weakened.call(()), 9);
    }

    #[test]
    fn test_debug_formatting() {
        use alloc::format;

        let empty: Callable<(), ()> = Callable::empty();
        assert_eq!(format!("{empty:?}"), "Callable(empty)");

        let full: Callable<(u8,), u8> = Callable::new(|x: u8| x);
        assert!(format!("{full:?}").starts_with("Callable("));
    }
}
