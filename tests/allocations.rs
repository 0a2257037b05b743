//! Heap behaviour of function containers, observed through a counting global allocator.
//!
//! Counters are thread-local, so tests running in parallel don't see each other's allocations.

use std::{
    alloc::{GlobalAlloc, Layout, System},
    cell::Cell,
};

use tfn::{Callable, LTFn, Placement, TFn};

struct CountingAlloc;

thread_local! {
    static ALLOCS: Cell<usize> = const { Cell::new(0) };
    static DEALLOCS: Cell<usize> = const { Cell::new(0) };
}

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let _ = ALLOCS.try_with(|c| c.set(c.get() + 1));
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        let _ = DEALLOCS.try_with(|c| c.set(c.get() + 1));
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Stats {
    allocs: usize,
    deallocs: usize,
}

/// Runs `f` and returns allocations it performed.
fn measure<R>(f: impl FnOnce() -> R) -> (R, Stats) {
    let allocs = ALLOCS.with(Cell::get);
    let deallocs = DEALLOCS.with(Cell::get);

    let result = f();

    let stats = Stats {
        allocs: ALLOCS.with(Cell::get) - allocs,
        deallocs: DEALLOCS.with(Cell::get) - deallocs,
    };
    (result, stats)
}

/// Runs every logging callsite once, so lazy registration is not measured.
fn warm_up() {
    let mut f = LTFn::<fn(usize) -> u64>::new(large_closure());
    let _ = f.clone();
    f.reset();
    let _ = f.call(0);
}

fn large_closure() -> impl FnMut(usize) -> u64 + Clone {
    let mut state = [1u64, 2, 3, 4];
    move |i: usize| {
        state[i] += 1;
        state[i]
    }
}

#[test]
fn small_callables_never_allocate() {
    warm_up();
    let offset = 7u64;

    let (mut f, stats) = measure(|| LTFn::<fn(u64) -> u64>::new(move |x: u64| x + offset));
    assert_eq!(stats, Stats { allocs: 0, deallocs: 0 });
    assert_eq!(f.placement(), Some(Placement::Inline));

    let ((), stats) = measure(|| {
        assert_eq!(f.call(35), Ok(42));

        let mut copy = f.clone();
        assert_eq!(copy.call(1), Ok(8));

        let mut moved = copy.take();
        assert_eq!(moved.call(2), Ok(9));

        f.clone_from(&moved);
        f.take_from(&mut moved);
        drop(moved);
    });
    assert_eq!(stats, Stats { allocs: 0, deallocs: 0 });

    let (f, stats) = measure(|| TFn::<fn() -> u32>::new(|| 42));
    assert_eq!(stats, Stats { allocs: 0, deallocs: 0 });
    drop(f);
}

#[test]
fn large_callable_allocates_exactly_once() {
    warm_up();
    let (f, stats) = measure(|| LTFn::<fn(usize) -> u64>::new(large_closure()));
    assert_eq!(stats, Stats { allocs: 1, deallocs: 0 });
    assert_eq!(f.placement(), Some(Placement::Boxed));

    let ((), stats) = measure(move || drop(f));
    assert_eq!(stats, Stats { allocs: 0, deallocs: 1 });
}

#[test]
fn large_callable_copy_and_move() {
    warm_up();
    let mut f = LTFn::<fn(usize) -> u64>::new(large_closure());

    // Copy gets a fresh allocation.
    let (mut copy, stats) = measure(|| f.clone());
    assert_eq!(stats, Stats { allocs: 1, deallocs: 0 });

    // Move only transfers the pointer.
    let (mut moved, stats) = measure(|| copy.take());
    assert_eq!(stats, Stats { allocs: 0, deallocs: 0 });
    assert!(copy.is_empty());

    assert_eq!(moved.call(0), Ok(2));
    assert_eq!(f.call(0), Ok(2));

    let ((), stats) = measure(move || {
        drop(copy);
        drop(moved);
        drop(f);
    });
    assert_eq!(stats, Stats { allocs: 0, deallocs: 2 });
}

#[test]
fn reassignment_releases_old_allocation() {
    warm_up();
    let mut f = LTFn::<fn(usize) -> u64>::new(large_closure());

    // Small over large.
    let ((), stats) = measure(|| f.set(|i: usize| i as u64));
    assert_eq!(stats, Stats { allocs: 0, deallocs: 1 });
    assert_eq!(f.placement(), Some(Placement::Inline));
    assert_eq!(f.call(5), Ok(5));

    // Large over small.
    let ((), stats) = measure(|| f.set(large_closure()));
    assert_eq!(stats, Stats { allocs: 1, deallocs: 0 });
    assert_eq!(f.placement(), Some(Placement::Boxed));
    assert_eq!(f.call(3), Ok(5));

    // Large over large.
    let other = LTFn::<fn(usize) -> u64>::new(large_closure());
    let ((), stats) = measure(|| f.clone_from(&other));
    assert_eq!(stats, Stats { allocs: 1, deallocs: 1 });
    assert_eq!(f.call(3), Ok(5));

    let ((), stats) = measure(|| f.reset());
    assert_eq!(stats, Stats { allocs: 0, deallocs: 1 });
    assert!(f.is_empty());
}

#[test]
fn from_box_does_not_reallocate() {
    warm_up();
    let boxed = Box::new(large_closure());

    let (mut f, stats) = measure(move || LTFn::<fn(usize) -> u64>::from_box(boxed));
    assert_eq!(stats, Stats { allocs: 0, deallocs: 0 });
    assert_eq!(f.call(1), Ok(3));

    // Small callable is unboxed, releasing the box.
    let value = 42u32;
    let small = Box::new(move || value);
    let (mut g, stats) = measure(move || LTFn::<fn() -> u32>::from_box(small));
    assert_eq!(stats, Stats { allocs: 0, deallocs: 1 });
    assert_eq!(g.placement(), Some(Placement::Inline));
    assert_eq!(g.call(), Ok(42));
}

#[test]
fn downcast_unboxes_and_releases() {
    warm_up();
    let f = LTFn::<fn(usize) -> u64>::new(Lookup {
        items: [10, 20, 30, 40],
    });

    let (value, stats) = measure(move || f.downcast::<Lookup>());
    let value = value.unwrap_or_else(|_| panic!("expected downcast to succeed"));
    assert_eq!(value.items, [10, 20, 30, 40]);
    assert_eq!(stats, Stats { allocs: 0, deallocs: 1 });
}

#[derive(Clone)]
struct Lookup {
    items: [u64; 4],
}

impl Callable<fn(usize) -> u64> for Lookup {
    fn invoke(&mut self, (i,): (usize,)) -> u64 {
        self.items[i]
    }
}
