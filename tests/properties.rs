//! Property-based tests for function containers.
//!
//! These tests verify:
//! - Deep copies are independent from their source
//! - Moves leave the source empty and preserve behaviour
//! - Downcast matches the stored type only

use proptest::prelude::*;
use tfn::{BadCall, LTFn, Placement};

/// Builds an accumulator callable, inline or boxed depending on `large`.
fn accumulator(start: u64, large: bool) -> LTFn<fn(u64) -> u64> {
    if large {
        let mut state = [start, 0, 0, 0];
        LTFn::new(move |x: u64| {
            state[0] = state[0].wrapping_add(x);
            state[0]
        })
    } else {
        let mut state = start;
        LTFn::new(move |x: u64| {
            state = state.wrapping_add(x);
            state
        })
    }
}

proptest! {
    /// Copy then diverge: calls on one side never show up on the other.
    #[test]
    fn clone_is_independent(
        start in any::<u64>(),
        large in any::<bool>(),
        before in prop::collection::vec(any::<u64>(), 0..8),
        after in prop::collection::vec(any::<u64>(), 0..8),
    ) {
        let mut a = accumulator(start, large);
        let mut expected = start;
        for x in &before {
            expected = expected.wrapping_add(*x);
            prop_assert_eq!(a.call(*x), Ok(expected));
        }

        let mut b = a.clone();

        for x in &after {
            a.call(*x).unwrap();
        }
        drop(a);

        prop_assert_eq!(b.call(0), Ok(expected));
    }

    /// Move: source is empty, destination continues where source stopped.
    #[test]
    fn take_preserves_state(
        start in any::<u64>(),
        large in any::<bool>(),
        inputs in prop::collection::vec(any::<u64>(), 0..8),
    ) {
        let mut a = accumulator(start, large);
        let placement = a.placement();
        prop_assert_eq!(placement, Some(if large { Placement::Boxed } else { Placement::Inline }));

        let mut expected = start;
        for x in &inputs {
            expected = expected.wrapping_add(*x);
            a.call(*x).unwrap();
        }

        let mut b = a.take();
        prop_assert!(a.is_empty());
        prop_assert_eq!(a.call(1), Err(BadCall));
        prop_assert_eq!(b.placement(), placement);
        prop_assert_eq!(b.call(0), Ok(expected));
    }

    /// Downcast succeeds for the stored type and nothing else.
    #[test]
    fn downcast_exact(value in any::<u64>()) {
        let f: LTFn<fn() -> u64> = LTFn::new(Constant(value));

        prop_assert_eq!(f.downcast_ref::<Constant>().map(|c| c.0), Some(value));
        prop_assert!(f.downcast_ref::<u64>().is_none());
        prop_assert!(f.downcast_ref::<fn() -> u64>().is_none());

        let empty: LTFn<fn() -> u64> = LTFn::empty();
        prop_assert!(empty.downcast_ref::<Constant>().is_none());
    }
}

#[derive(Clone, Debug)]
struct Constant(u64);

impl tfn::Callable<fn() -> u64> for Constant {
    fn invoke(&mut self, (): ()) -> u64 {
        self.0
    }
}
