use core::{alloc::Layout, any::TypeId};

use anycall_internals::{RawInlineCall, callee::Callee};

use crate::{
    error::{CapacityError, EmptyCallableError},
    markers::{
        CalleeMarkerFor, Cloneable, CloneabilityMarker, Local, Sendable, ThreadSafetyMarker,
        Uncloneable,
    },
};

/// FIXME: Once rust-lang/rust#132922 gets resolved, we can make the `raw`
/// field an unsafe field and remove this module.
mod limit_field_access {
    use core::marker::PhantomData;

    use anycall_internals::RawInlineCall;

    use crate::{
        markers::{Sendable, Uncloneable},
        space,
    };

    /// A type-erased callable embedded in a fixed-capacity buffer, with
    /// the signature `Args -> Output`.
    ///
    /// An `InlineCallable` stores its callee directly inside the wrapper;
    /// no heap allocation ever takes place. In exchange, the callee must
    /// fit the buffer: its size and alignment are checked against the
    /// `Space` parameter before construction, and oversized callees are
    /// rejected outright rather than silently spilled to the heap.
    ///
    /// # Type Parameters
    /// - `Args`: The argument tuple of the signature, e.g. `(u32, bool)`.
    /// - `Output`: The value an invocation produces.
    /// - `Space`: Any type whose size and alignment define the buffer; see
    ///   [`space`](crate::space).
    /// - `Cloneability`: Either [`Cloneable`] or [`Uncloneable`].
    /// - `ThreadSafety`: Either [`Sendable`] or [`Local`].
    ///
    /// [`Cloneable`]: crate::markers::Cloneable
    /// [`Uncloneable`]: crate::markers::Uncloneable
    /// [`Sendable`]: crate::markers::Sendable
    /// [`Local`]: crate::markers::Local
    pub struct InlineCallable<
        Args: 'static,
        Output: 'static,
        Space: 'static = space::S4,
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
        raw: RawInlineCall<Args, Output, Space>,
        /// Cloneability marker; carries no data.
        _cloneability: PhantomData<Cloneability>,
        /// Thread-safety marker; carries no data.
        _thread_safety: PhantomData<ThreadSafety>,
    }

    impl<Args: 'static, Output: 'static, Space, C, T> InlineCallable<Args, Output, Space, C, T> {
        /// Creates an `InlineCallable` from raw inline storage.
        ///
        /// # Safety
        ///
        /// The caller must ensure:
        ///
        /// 1. If `C = Cloneable` and `raw` embeds a callee: the callee's
        ///    dispatch table carries a clone entry.
        /// 2. If `T = Sendable` and `raw` embeds a callee: the callee is
        ///    `Send`.
        #[must_use]
        pub(crate) const unsafe fn from_raw(raw: RawInlineCall<Args, Output, Space>) -> Self {
            // SAFETY: We must uphold the safety invariants of the raw
            // field:
            // 1. Guaranteed by caller
            // 2. Guaranteed by caller
            InlineCallable {
                raw,
                _cloneability: PhantomData,
                _thread_safety: PhantomData,
            }
        }

        /// Consumes the `InlineCallable` and returns the raw inline
        /// storage.
        #[must_use]
        pub(crate) fn into_raw(self) -> RawInlineCall<Args, Output, Space> {
            // SAFETY: We are destroying `self`, so we no longer need to
            // uphold any safety invariants.
            self.raw
        }

        /// Returns a shared reference to the raw inline storage.
        #[must_use]
        pub(crate) fn raw(&self) -> &RawInlineCall<Args, Output, Space> {
            // SAFETY: We must uphold the safety invariants of the raw
            // field: no mutation is possible through the shared reference.
            &self.raw
        }

        /// Returns an exclusive reference to the raw inline storage.
        #[must_use]
        pub(crate) fn raw_mut(&mut self) -> &mut RawInlineCall<Args, Output, Space> {
            // SAFETY: We must uphold the safety invariants of the raw
            // field: invoking the callee cannot change its type or its
            // dispatch table, and replacing the storage wholesale (e.g.
            // `take`) only ever leaves the empty state behind, for which
            // both invariants hold vacuously.
            &mut self.raw
        }
    }
}
pub use limit_field_access::InlineCallable;

impl<Args: 'static, Output: 'static, Space: 'static, T: ThreadSafetyMarker>
    InlineCallable<Args, Output, Space, Uncloneable, T>
{
    /// Creates a new move-only `InlineCallable` embedding the given callee
    /// in the wrapper's buffer.
    ///
    /// The capacity constraint is checked at compile time: instantiating
    /// this method with a callee whose size or alignment exceeds `Space`
    /// fails the build. Use [`try_new`](InlineCallable::try_new) for a
    /// run-time check instead.
    ///
    /// # Examples
    /// ```
    /// use anycall::{InlineCallable, space};
    ///
    /// let step = 3u64;
    /// let mut advance: InlineCallable<(u64,), u64, space::S2> =
    ///     InlineCallable::new(move |position: u64| position + step);
    ///
    /// assert_eq!(advance.call((4,)), 7);
    /// ```
    #[must_use]
    pub fn new<F>(callee: F) -> Self
    where
        F: Callee<Args, Output = Output> + CalleeMarkerFor<T>,
    {
        let raw = RawInlineCall::new(callee);

        // SAFETY:
        // 1. `C = Uncloneable`, so this is trivially true.
        // 2. If `T = Sendable`, the bound `F: CalleeMarkerFor<Sendable>`
        //    guarantees that the callee is `Send`.
        unsafe { InlineCallable::from_raw(raw) }
    }

    /// Creates a new move-only `InlineCallable`, checking the capacity
    /// constraint at run time.
    ///
    /// On rejection nothing has been constructed; the callee is handed
    /// back inside the [`CapacityError`].
    ///
    /// # Errors
    ///
    /// Returns a [`CapacityError`] if the callee's size or alignment
    /// exceeds that of `Space`.
    pub fn try_new<F>(callee: F) -> Result<Self, CapacityError<F>>
    where
        F: Callee<Args, Output = Output> + CalleeMarkerFor<T>,
    {
        match RawInlineCall::try_new(callee) {
            // SAFETY:
            // 1. `C = Uncloneable`, so this is trivially true.
            // 2. If `T = Sendable`, the bound `F: CalleeMarkerFor<Sendable>`
            //    guarantees that the callee is `Send`.
            Ok(raw) => Ok(unsafe { InlineCallable::from_raw(raw) }),
            Err(callee) => Err(CapacityError::new(
                callee,
                Layout::new::<F>(),
                Layout::new::<Space>(),
            )),
        }
    }
}

impl<Args: 'static, Output: 'static, Space: 'static, T: ThreadSafetyMarker>
    InlineCallable<Args, Output, Space, Cloneable, T>
{
    /// Creates a new clone-capable `InlineCallable` embedding the given
    /// callee in the wrapper's buffer.
    ///
    /// The callee must implement `Clone`; cloning the wrapper clones the
    /// callee into the new wrapper's own buffer.
    #[must_use]
    pub fn new_cloneable<F>(callee: F) -> Self
    where
        F: Callee<Args, Output = Output> + Clone + CalleeMarkerFor<T>,
    {
        let raw = RawInlineCall::new_cloneable(callee);

        // SAFETY:
        // 1. The raw storage was created with
        //    `RawInlineCall::new_cloneable`, so its dispatch table carries
        //    a clone entry.
        // 2. If `T = Sendable`, the bound `F: CalleeMarkerFor<Sendable>`
        //    guarantees that the callee is `Send`.
        unsafe { InlineCallable::from_raw(raw) }
    }

    /// Creates a new clone-capable `InlineCallable`, checking the capacity
    /// constraint at run time.
    ///
    /// # Errors
    ///
    /// Returns a [`CapacityError`] if the callee's size or alignment
    /// exceeds that of `Space`.
    pub fn try_new_cloneable<F>(callee: F) -> Result<Self, CapacityError<F>>
    where
        F: Callee<Args, Output = Output> + Clone + CalleeMarkerFor<T>,
    {
        match RawInlineCall::try_new_cloneable(callee) {
            // SAFETY:
            // 1. The raw storage was created with
            //    `RawInlineCall::try_new_cloneable`, so its dispatch table
            //    carries a clone entry.
            // 2. If `T = Sendable`, the bound `F: CalleeMarkerFor<Sendable>`
            //    guarantees that the callee is `Send`.
            Ok(raw) => Ok(unsafe { InlineCallable::from_raw(raw) }),
            Err(callee) => Err(CapacityError::new(
                callee,
                Layout::new::<F>(),
                Layout::new::<Space>(),
            )),
        }
    }
}

impl<Args: 'static, Output: 'static, Space: 'static>
    InlineCallable<Args, Output, Space, Uncloneable, Sendable>
{
    /// Creates a new `InlineCallable` with [`Sendable`] thread safety.
    ///
    /// This is a convenience method that calls [`InlineCallable::new`]
    /// with an explicit [`Sendable`] marker. Use this method when you're
    /// having trouble with type inference for the thread-safety parameter.
    #[must_use]
    pub fn new_sendable<F>(callee: F) -> Self
    where
        F: Callee<Args, Output = Output> + Send,
    {
        Self::new(callee)
    }
}

impl<Args: 'static, Output: 'static, Space: 'static>
    InlineCallable<Args, Output, Space, Uncloneable, Local>
{
    /// Creates a new `InlineCallable` with [`Local`] thread safety.
    ///
    /// This is a convenience method that calls [`InlineCallable::new`]
    /// with an explicit [`Local`] marker for callees capturing non-`Send`
    /// data.
    #[must_use]
    pub fn new_local<F>(callee: F) -> Self
    where
        F: Callee<Args, Output = Output>,
    {
        Self::new(callee)
    }
}

impl<Args: 'static, Output: 'static, Space: 'static, C: CloneabilityMarker, T: ThreadSafetyMarker>
    InlineCallable<Args, Output, Space, C, T>
{
    /// The buffer capacity in bytes.
    #[must_use]
    pub const fn capacity() -> usize {
        size_of::<Space>()
    }

    /// Returns `true` if a value of type `F` would fit the buffer.
    #[must_use]
    pub const fn fits<F>() -> bool {
        RawInlineCall::<Args, Output, Space>::fits::<F>()
    }

    /// Creates an empty `InlineCallable`: no dispatch table, an
    /// uninitialized buffer.
    #[must_use]
    pub const fn empty() -> Self {
        // SAFETY:
        // 1. No callee is embedded, so this is trivially true.
        // 2. No callee is embedded, so this is trivially true.
        unsafe { Self::from_raw(RawInlineCall::empty()) }
    }

    /// Returns `true` if no callee is embedded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw().is_empty()
    }

    /// Invokes the embedded callee with the given argument tuple.
    ///
    /// # Panics
    ///
    /// Panics if the callable is empty. Invoking an empty callable is a
    /// precondition violation; use
    /// [`try_call`](InlineCallable::try_call) when emptiness is an
    /// expected state.
    pub fn call(&mut self, args: Args) -> Output {
        match self.raw_mut().call(args) {
            Some(output) => output,
            None => panic!("attempted to invoke an empty InlineCallable"),
        }
    }

    /// Invokes the embedded callee, or returns an error if the callable
    /// is empty.
    pub fn try_call(&mut self, args: Args) -> Result<Output, EmptyCallableError> {
        self.raw_mut().call(args).ok_or(EmptyCallableError)
    }

    /// Moves the embedded callee into a new `InlineCallable`, leaving
    /// `self` empty.
    ///
    /// Unlike the heap variant there is no pointer to hand over: the
    /// callee's bytes are relocated into the returned wrapper's buffer.
    /// The source reports empty immediately, and the callee's destructor
    /// will run exactly once, when the returned wrapper is dropped.
    ///
    /// # Examples
    /// ```
    /// use anycall::InlineCallable;
    ///
    /// let mut a: InlineCallable<(), u32> = InlineCallable::new(|| 5);
    /// let mut b = a.take();
    ///
    /// assert!(a.is_empty());
    /// assert_eq!(b.call(()), 5);
    /// ```
    #[must_use]
    pub fn take(&mut self) -> Self {
        core::mem::replace(self, Self::empty())
    }

    /// Returns the [`TypeId`] of the embedded callee, or `None` when
    /// empty.
    #[must_use]
    pub fn callee_type_id(&self) -> Option<TypeId> {
        self.raw().callee_type_id()
    }

    /// Returns the [`core::any::type_name`] of the embedded callee, or
    /// `None` when empty.
    #[must_use]
    pub fn callee_type_name(&self) -> Option<&'static str> {
        self.raw().callee_type_name()
    }
}

impl<Args: 'static, Output: 'static, Space: 'static, C: CloneabilityMarker>
    InlineCallable<Args, Output, Space, C, Sendable>
{
    /// Changes the thread-safety marker of this `InlineCallable` to
    /// [`Local`].
    ///
    /// This method does not modify the callable in any way; it only
    /// "forgets" that the embedded callee is actually `Send`.
    #[must_use]
    pub fn into_local(self) -> InlineCallable<Args, Output, Space, C, Local> {
        let raw = self.into_raw();

        // SAFETY:
        // 1. Carried over from `self`'s invariants.
        // 2. `T = Local`, so this is trivially true.
        unsafe { InlineCallable::from_raw(raw) }
    }
}

impl<Args: 'static, Output: 'static, Space: 'static, T: ThreadSafetyMarker>
    InlineCallable<Args, Output, Space, Cloneable, T>
{
    /// Changes the cloneability marker of this `InlineCallable` to
    /// [`Uncloneable`].
    ///
    /// This method does not modify the callable in any way; it only
    /// "forgets" that the embedded callee can be cloned.
    #[must_use]
    pub fn into_uncloneable(self) -> InlineCallable<Args, Output, Space, Uncloneable, T> {
        let raw = self.into_raw();

        // SAFETY:
        // 1. `C = Uncloneable`, so this is trivially true.
        // 2. Carried over from `self`'s invariants.
        unsafe { InlineCallable::from_raw(raw) }
    }
}

impl<Args: 'static, Output: 'static, Space: 'static, T: ThreadSafetyMarker> Clone
    for InlineCallable<Args, Output, Space, Cloneable, T>
{
    fn clone(&self) -> Self {
        let raw = match self.raw().try_clone() {
            Some(cloned) => cloned,
            // Invariant 1 of the raw field: a `Cloneable` wrapper only ever
            // embeds callees whose table carries a clone entry.
            None => unreachable!("clone-capable callable backed by a table without a clone entry"),
        };

        // SAFETY:
        // 1. The clone shares the original's dispatch table, which carries
        //    a clone entry under `self`'s invariant.
        // 2. The clone has the same callee type as the original, so
        //    `Send`-ness under `self`'s invariant carries over.
        unsafe { Self::from_raw(raw) }
    }
}

impl<Args: 'static, Output: 'static, Space: 'static, C: CloneabilityMarker, T: ThreadSafetyMarker>
    Default for InlineCallable<Args, Output, Space, C, T>
{
    fn default() -> Self {
        Self::empty()
    }
}

impl<Args: 'static, Output: 'static, Space, C, T> core::fmt::Debug
    for InlineCallable<Args, Output, Space, C, T>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.raw().callee_type_name() {
            Some(name) => write!(f, "InlineCallable({name})"),
            None => f.write_str("InlineCallable(empty)"),
        }
    }
}

// SAFETY: The `Sendable` marker guarantees (invariant 2 of the raw field)
// that any embedded callee is `Send`. The buffer holds nothing besides
// that callee's bytes, so it is safe to send the wrapper to another
// thread. No `Sync` implementation is provided: invocation requires
// exclusive access.
unsafe impl<Args: 'static, Output: 'static, Space: 'static, C: 'static> Send
    for InlineCallable<Args, Output, Space, C, Sendable>
{
}

#[cfg(test)]
mod tests {
    use alloc::{rc::Rc, vec::Vec};
    use core::cell::RefCell;

    use super::*;
    use crate::space;

    #[test]
    fn test_inline_send_markers() {
        static_assertions::assert_impl_all!(
            InlineCallable<(), (), space::S4, Uncloneable, Sendable>: Send
        );
        static_assertions::assert_not_impl_any!(
            InlineCallable<(), (), space::S4, Uncloneable, Local>: Send, Sync
        );
        static_assertions::assert_not_impl_any!(
            InlineCallable<(), (), space::S4, Uncloneable, Sendable>: Sync
        );
    }

    #[test]
    fn test_inline_clone_markers() {
        static_assertions::assert_impl_all!(
            InlineCallable<(), (), space::S4, Cloneable, Sendable>: Clone
        );
        static_assertions::assert_not_impl_any!(
            InlineCallable<(), (), space::S4, Uncloneable, Sendable>: Clone
        );
    }

    #[test]
    fn test_invoke_matches_direct_invocation() {
        let callee = |a: u32, b: u32| a * b;
        let mut wrapped: InlineCallable<(u32, u32), u32> = InlineCallable::new(callee);

        assert_eq!(wrapped.call((6, 7)), callee(6, 7));
    }

    #[test]
    fn test_capacity_rejection_before_construction() {
        let big = [1u64; 12];
        let rejected = InlineCallable::<(), u64, space::S4>::try_new(move || big[0]);

        let error = match rejected {
            Ok(_) => panic!("twelve u64 words must not fit four usize words"),
            Err(error) => error,
        };
        assert!(error.required().size() > error.available().size());

        // The callee is recovered intact; no partial construction
        // happened.
        let mut callee = error.into_callee();
        assert_eq!(callee(), 1);
    }

    #[test]
    fn test_move_runs_destructor_once() {
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

        struct AppendOnDrop(Rc<RefCell<Vec<&'static str>>>);
        impl Drop for AppendOnDrop {
            fn drop(&mut self) {
                self.0.borrow_mut().push("drop");
            }
        }

        let sentinel = AppendOnDrop(Rc::clone(&log));
        let mut a: InlineCallable<(), usize, space::S4, Uncloneable, Local> =
            InlineCallable::new_local(move || sentinel.0.borrow().len());

        let mut b = a.take();
        assert!(a.is_empty());
        assert_eq!(b.call(()), 0);

        drop(a);
        drop(b);

        // Exactly one destructor run in total across both wrappers.
        assert_eq!(log.borrow().as_slice(), ["drop"]);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut original: InlineCallable<(), u32, space::S2, Cloneable> =
            InlineCallable::new_cloneable({
                let mut hits = 0u32;
                move || {
                    hits += 1;
                    hits
                }
            });

        let mut cloned = original.clone();
        assert_eq!(original.call(()), 1);
        assert_eq!(original.call(()), 2);
        assert_eq!(cloned.call(()), 1);
    }

    #[test]
    fn test_empty_invocation_is_signaled() {
        let mut empty: InlineCallable<(), ()> = InlineCallable::empty();
        assert!(empty.try_call(()).is_err());
        assert_eq!(empty.callee_type_name(), None);
    }

    #[test]
    #[should_panic = "empty InlineCallable"]
    fn test_empty_invocation_panics() {
        let mut empty: InlineCallable<(), ()> = InlineCallable::empty();
        empty.call(());
    }

    #[test]
    fn test_capacity_constants() {
        assert_eq!(
            InlineCallable::<(), (), space::S4>::capacity(),
            4 * size_of::<usize>()
        );
        assert!(InlineCallable::<(), (), space::S4>::fits::<[usize; 4]>());
        assert!(!InlineCallable::<(), (), space::S4>::fits::<[usize; 5]>());
    }
}
