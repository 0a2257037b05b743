//! Call signatures and callables matching them.
//!
//! A signature is spelled as a function pointer type, e.g. `fn(u32, u32) -> u64`.
//! Arguments and return type must be `'static`, so higher-ranked signatures like
//! `fn(&str) -> usize` are not supported, use `fn(&'static str) -> usize` instead.

use crate::{BadCall, LTFn, TFn};

/// Call signature `fn(A0, .., An) -> R` supported by function containers.
///
/// Implemented for function pointer types with up to 8 arguments.
pub trait Signature: 'static {
    /// Arguments packed into a tuple.
    type Args;

    /// Return type.
    type Output;
}

/// Value that can be called with signature `S`.
///
/// Implemented for every `FnMut` closure, function item and function pointer
/// that matches the signature.
/// Can be implemented manually for named types that should be callable.
pub trait Callable<S: Signature> {
    /// Calls the value with arguments packed into a tuple.
    fn invoke(&mut self, args: S::Args) -> S::Output;
}

macro_rules! signatures {
    ($($arg:ident: $ty:ident),*) => {
        impl<R $(, $ty)*> Signature for fn($($ty),*) -> R
        where
            R: 'static,
            $($ty: 'static,)*
        {
            type Args = ($($ty,)*);
            type Output = R;
        }

        impl<F, R $(, $ty)*> Callable<fn($($ty),*) -> R> for F
        where
            F: FnMut($($ty),*) -> R,
            R: 'static,
            $($ty: 'static,)*
        {
            #[inline(always)]
            fn invoke(&mut self, ($($arg,)*): ($($ty,)*)) -> R {
                (*self)($($arg),*)
            }
        }

        impl<R $(, $ty)*> LTFn<fn($($ty),*) -> R>
        where
            R: 'static,
            $($ty: 'static,)*
        {
            /// Calls the stored callable with the given arguments.
            ///
            /// Returns [`BadCall`] if nothing is stored.
            #[inline]
            pub fn call(&mut self $(, $arg: $ty)*) -> Result<R, BadCall> {
                self.invoke(($($arg,)*))
            }
        }

        impl<R $(, $ty)*> TFn<fn($($ty),*) -> R>
        where
            R: 'static,
            $($ty: 'static,)*
        {
            /// Calls the stored callable with the given arguments.
            ///
            /// Returns [`BadCall`] if nothing is stored.
            #[inline]
            pub fn call(&mut self $(, $arg: $ty)*) -> Result<R, BadCall> {
                self.invoke(($($arg,)*))
            }
        }
    };
}

signatures!();
signatures!(a0: A0);
signatures!(a0: A0, a1: A1);
signatures!(a0: A0, a1: A1, a2: A2);
signatures!(a0: A0, a1: A1, a2: A2, a3: A3);
signatures!(a0: A0, a1: A1, a2: A2, a3: A3, a4: A4);
signatures!(a0: A0, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5);
signatures!(a0: A0, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6);
signatures!(a0: A0, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7);
