//! Integration tests for the anycall-internals crate.
//!
//! These tests exercise the three storage families through their public
//! raw interfaces: heap-owning [`RawCall`], fixed-capacity
//! [`RawInlineCall`], and the non-owning [`RawView`], together with the
//! canonical-table behavior that backs them.

use std::{
    cell::RefCell,
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};

use anycall_internals::{RawCall, RawInlineCall, RawView};

#[test]
fn test_raw_call_invokes_like_the_original() {
    let callee = |a: i32, b: i32| a * 10 + b;
    let expected = callee(3, 4);

    let mut raw: RawCall<(i32, i32), i32> = RawCall::new(callee);
    assert_eq!(raw.as_mut().call((3, 4)), expected);
}

#[test]
fn test_raw_call_captured_state_persists() {
    let mut total = 0u64;
    let mut raw: RawCall<(u64,), u64> = RawCall::new(move |n: u64| {
        total += n;
        total
    });

    assert_eq!(raw.as_mut().call((5,)), 5);
    assert_eq!(raw.as_mut().call((7,)), 12);
}

#[test]
fn test_raw_call_drop_runs_exactly_once() {
    struct DropCounter(Arc<AtomicUsize>);
    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let drops = Arc::new(AtomicUsize::new(0));
    let counter = DropCounter(Arc::clone(&drops));

    let mut raw: RawCall<(), usize> = RawCall::new(move || counter.0.load(Ordering::SeqCst));
    assert_eq!(raw.as_mut().call(()), 0);

    drop(raw);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_raw_call_clone_is_independent() {
    let raw: RawCall<(u32,), u32> = RawCall::new_cloneable({
        let mut seen = 0u32;
        move |n: u32| {
            seen += n;
            seen
        }
    });

    let mut cloned = raw.as_ref().clone_callee().expect("table has a clone entry");

    // The clone starts from the state at the time of cloning and diverges
    // from there.
    assert_eq!(cloned.as_mut().call((2,)), 2);
    assert_eq!(cloned.as_mut().call((2,)), 4);

    let mut original = raw;
    assert_eq!(original.as_mut().call((1,)), 1);
}

#[test]
fn test_raw_call_type_identity() {
    fn named(x: u8) -> u8 {
        x
    }

    let raw: RawCall<(u8,), u8> = RawCall::new(named as fn(u8) -> u8);
    assert_eq!(
        raw.as_ref().callee_type_id(),
        std::any::TypeId::of::<fn(u8) -> u8>()
    );
    assert!(raw.as_ref().callee_type_name().contains("fn(u8) -> u8"));
}

#[test]
fn test_concurrent_first_use_of_one_callee_type() {
    // All threads race to create the first dispatch table for this callee
    // type; whatever the interleaving, every wrapper must behave the same.
    fn square(x: u64) -> u64 {
        x * x
    }

    let handles: Vec<_> = (0..8)
        .map(|i| {
            thread::spawn(move || {
                let mut raw: RawCall<(u64,), u64> = RawCall::new(square as fn(u64) -> u64);
                raw.as_mut().call((i,))
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let i = i as u64;
        assert_eq!(handle.join().unwrap(), i * i);
    }
}

type Buffer = [usize; 4];

#[test]
fn test_inline_call_basic() {
    let mut raw: RawInlineCall<(usize, usize), usize, Buffer> =
        RawInlineCall::new(|a: usize, b: usize| a + b);

    assert!(!raw.is_empty());
    assert_eq!(raw.call((40, 2)), Some(42));
}

#[test]
fn test_inline_call_rejects_oversized_at_runtime() {
    let big = [7usize; 16];
    let rejected = RawInlineCall::<(), usize, Buffer>::try_new(move || big[0]);

    // The callee comes back intact and can still be used directly.
    let mut callee = rejected.err().expect("16 words cannot fit in 4");
    assert_eq!(callee(), 7);
}

#[test]
fn test_inline_move_then_drop_runs_destructor_once() {
    let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

    struct Logged(Rc<RefCell<Vec<&'static str>>>);
    impl Drop for Logged {
        fn drop(&mut self) {
            self.0.borrow_mut().push("destructor");
        }
    }

    let logged = Logged(Rc::clone(&log));
    let a: RawInlineCall<(), usize, Buffer> = RawInlineCall::new(move || logged.0.borrow().len());

    let mut b = a;
    assert_eq!(b.call(()), Some(0));
    drop(b);

    assert_eq!(log.borrow().as_slice(), ["destructor"]);
}

#[test]
fn test_view_tracks_referent_not_wrapper() {
    let base = 100u32;
    let add_base = move |x: u32| x + base;

    let copy = {
        let view = RawView::new(&add_base);
        view
    };

    // The original view is gone; the copy stays valid as long as
    // `add_base` itself is alive.
    assert_eq!(copy.call((11,)), 111);
}

#[test]
fn test_view_of_plain_function() {
    fn shout(len: usize) -> usize {
        len * 2
    }

    let view: RawView<'static, (usize,), usize> =
        RawView::<(usize,), usize>::from_fn(shout as fn(usize) -> usize);
    assert_eq!(view.call((21,)), 42);
}
