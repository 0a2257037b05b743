//! This crate provides type-erased callables as replacement for `Box<dyn FnMut>`
//! that can store small closures inline without heap allocation.
//!
//! `TFn` is a type-erased callable that can store any `Clone` callable that implements `Send`, `Sync` and is `'static`.
//! `LTFn` is relaxed version of `TFn` that doesn't require `Send`, `Sync` bounds.
//!
//! Both are parametrized by the call signature, spelled as function pointer type, e.g. `LTFn<fn(u32) -> u32>`.
//! Inline storage is one machine word. Callables that fit are stored in place, others are boxed.
//! Containers are values: cloning makes a deep copy of the callable, and `take` moves it out leaving the source empty.
//!
//! ## Usage
//!
//! ```
//! use tfn::{BadCall, LTFn, Placement};
//!
//! // Closure capturing single `u32` fits inline storage, so no allocation is performed.
//! let offset = 2u32;
//! let mut f: LTFn<fn(u32) -> u32> = LTFn::new(move |x: u32| x + offset);
//! assert_eq!(f.placement(), Some(Placement::Inline));
//! assert_eq!(f.call(40), Ok(42));
//!
//! // Large closures are boxed.
//! let mut counters = [0u64; 4];
//! let mut g: LTFn<fn(usize) -> u64> = LTFn::new(move |i: usize| {
//!     counters[i] += 1;
//!     counters[i]
//! });
//! assert_eq!(g.placement(), Some(Placement::Boxed));
//! assert_eq!(g.call(1), Ok(1));
//! assert_eq!(g.call(1), Ok(2));
//!
//! // Deep copy.
//! let mut h = g.clone();
//! assert_eq!(h.call(1), Ok(3));
//! assert_eq!(g.call(1), Ok(3));
//!
//! // Destructive move.
//! let mut moved = g.take();
//! assert!(g.is_empty());
//! assert_eq!(g.call(1), Err(BadCall));
//! assert_eq!(moved.call(1), Ok(4));
//!
//! // Get reference to the callable.
//! fn answer() -> u32 {
//!     42
//! }
//!
//! let f: LTFn<fn() -> u32> = LTFn::new(answer as fn() -> u32);
//! assert!(f.downcast_ref::<fn() -> u32>().is_some());
//! assert!(f.downcast_ref::<u32>().is_none());
//! ```

#![no_std]

extern crate alloc;

mod error;
mod signature;
mod storage;
mod tfn;
mod vtable;

pub use self::{
    error::BadCall,
    signature::{Callable, Signature},
    storage::Placement,
    tfn::{LTFn, TFn},
};
