//! Error types surfaced by the callable wrappers.

use core::alloc::Layout;

/// Error returned when attempting to invoke a wrapper in the empty state.
///
/// An empty wrapper holds no dispatch table and no callee, so there is
/// nothing to run. [`try_call`](crate::Callable::try_call) surfaces this
/// error for callers that want to branch on emptiness;
/// [`call`](crate::Callable::call) treats the same condition as a
/// precondition violation and panics instead. Neither ever substitutes a
/// default output value.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct EmptyCallableError;

impl core::fmt::Display for EmptyCallableError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("attempted to invoke an empty callable")
    }
}

impl core::error::Error for EmptyCallableError {}

/// Error returned when a callee does not fit an inline wrapper's storage
/// region.
///
/// Contains the callee that was rejected, allowing you to recover it,
/// for example to box it into a heap-backed
/// [`Callable`](crate::Callable) instead. The rejection happens before
/// any construction takes place: the callee is handed back exactly as it
/// was passed in, and the wrapper's storage is untouched. There is never
/// a silent fallback to the heap.
pub struct CapacityError<F> {
    /// The rejected callee, unchanged.
    callee: F,
    /// The layout the callee would have needed.
    required: Layout,
    /// The layout the storage region actually offers.
    available: Layout,
}

impl<F> CapacityError<F> {
    /// Creates a new capacity error for a rejected callee.
    pub(crate) fn new(callee: F, required: Layout, available: Layout) -> Self {
        Self {
            callee,
            required,
            available,
        }
    }

    /// The size and alignment the rejected callee would have needed.
    #[must_use]
    pub fn required(&self) -> Layout {
        self.required
    }

    /// The size and alignment the storage region offers.
    #[must_use]
    pub fn available(&self) -> Layout {
        self.available
    }

    /// Consumes the error and returns the rejected callee.
    #[must_use]
    pub fn into_callee(self) -> F {
        self.callee
    }
}

impl<F> core::fmt::Debug for CapacityError<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CapacityError")
            .field("required", &self.required)
            .field("available", &self.available)
            .finish_non_exhaustive()
    }
}

impl<F> core::fmt::Display for CapacityError<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "callee needs {} bytes aligned to {}, but the inline storage region offers {} bytes aligned to {}",
            self.required.size(),
            self.required.align(),
            self.available.size(),
            self.available.align(),
        )
    }
}

impl<F> core::error::Error for CapacityError<F> {}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn test_empty_callable_error_display() {
        assert_eq!(
            EmptyCallableError.to_string(),
            "attempted to invoke an empty callable"
        );
    }

    #[test]
    fn test_capacity_error_reports_layouts() {
        let error = CapacityError::new((), Layout::new::<[u64; 8]>(), Layout::new::<[u64; 2]>());

        assert_eq!(error.required().size(), 64);
        assert_eq!(error.available().size(), 16);

        let message = error.to_string();
        assert!(message.contains("64 bytes"));
        assert!(message.contains("16 bytes"));
    }
}
