//! Operation table for type-erased callables.
//!
//! Every table is a `&'static` constant created for a pair of callable type `F`
//! and signature `S`. Its function pointers are all instantiated with the same
//! `F`, and they agree with the placement of `F` chosen by [`Placement::of`].
//! The empty table is the only one with no placement.

use core::any::{type_name, TypeId};

use alloc::boxed::Box;

use crate::{
    signature::{Callable, Signature},
    storage::{InlineStorage, Placement},
    BadCall,
};

/// Returns reference to the value stored in the storage.
///
/// # Safety
///
/// Storage must hold an initialized `F` placed according to `Placement::of::<F>()`.
pub(crate) unsafe fn value_ref<F>(storage: &InlineStorage) -> &F {
    match Placement::of::<F>() {
        // Safety: It was initialized as `F`.
        Placement::Inline => unsafe { storage.as_ref::<F>().assume_init_ref() },
        // Safety: It was initialized as `Box<F>`.
        Placement::Boxed => unsafe { &**storage.as_ref::<Box<F>>().assume_init_ref() },
    }
}

/// Returns mutable reference to the value stored in the storage.
///
/// # Safety
///
/// Storage must hold an initialized `F` placed according to `Placement::of::<F>()`.
pub(crate) unsafe fn value_mut<F>(storage: &mut InlineStorage) -> &mut F {
    match Placement::of::<F>() {
        // Safety: It was initialized as `F`.
        Placement::Inline => unsafe { storage.as_mut::<F>().assume_init_mut() },
        // Safety: It was initialized as `Box<F>`.
        Placement::Boxed => unsafe { &mut **storage.as_mut::<Box<F>>().assume_init_mut() },
    }
}

/// Reads the value out of the storage, releasing the box if there is one.
///
/// # Safety
///
/// Storage must hold an initialized `F` placed according to `Placement::of::<F>()`.
/// The storage is logically uninitialized afterwards.
pub(crate) unsafe fn value_read<F>(storage: &InlineStorage) -> F {
    match Placement::of::<F>() {
        // Safety: It was initialized as `F`.
        Placement::Inline => unsafe { storage.as_ref::<F>().assume_init_read() },
        // Safety: It was initialized as `Box<F>`.
        Placement::Boxed => *unsafe { storage.as_ref::<Box<F>>().assume_init_read() },
    }
}

/// Writes the value into the storage according to `Placement::of::<F>()`.
/// Boxes the value if it does not fit.
///
/// Any value previously held by the storage is overwritten without being dropped.
pub(crate) fn value_write<F>(storage: &mut InlineStorage, value: F) {
    match Placement::of::<F>() {
        Placement::Inline => {
            storage.as_mut::<F>().write(value);
        }
        Placement::Boxed => {
            tracing::trace!(
                callable = type_name::<F>(),
                size = core::mem::size_of::<F>(),
                align = core::mem::align_of::<F>(),
                "callable does not fit inline storage, boxing"
            );
            storage.as_mut::<Box<F>>().write(Box::new(value));
        }
    }
}

unsafe fn clone_value<F: Clone>(src: &InlineStorage) -> InlineStorage {
    // Clone before touching the new storage, so a panic leaves nothing behind.
    // Safety: The table is bound to storage holding `F`.
    let value = unsafe { value_ref::<F>(src) }.clone();

    let mut storage = InlineStorage::new();
    value_write(&mut storage, value);
    storage
}

unsafe fn relocate_value<F>(src: &mut InlineStorage, dst: &mut InlineStorage) {
    match Placement::of::<F>() {
        Placement::Inline => {
            // Safety: It was initialized as `F`, the source is rebound to the empty table by the caller.
            let value = unsafe { src.as_ref::<F>().assume_init_read() };
            dst.as_mut::<F>().write(value);
        }
        Placement::Boxed => {
            // Only the pointer moves.
            // Safety: It was initialized as `Box<F>`, the source is rebound to the empty table by the caller.
            let boxed = unsafe { src.as_ref::<Box<F>>().assume_init_read() };
            dst.as_mut::<Box<F>>().write(boxed);
        }
    }
}

unsafe fn call_value<F, S>(storage: &mut InlineStorage, args: S::Args) -> Result<S::Output, BadCall>
where
    F: Callable<S>,
    S: Signature,
{
    // Safety: The table is bound to storage holding `F`.
    let f = unsafe { value_mut::<F>(storage) };
    Ok(f.invoke(args))
}

unsafe fn drop_value<F>(storage: &mut InlineStorage) {
    match Placement::of::<F>() {
        // Safety: It was initialized as `F`.
        Placement::Inline => unsafe { storage.as_mut::<F>().assume_init_drop() },
        // Safety: It was initialized as `Box<F>`.
        Placement::Boxed => unsafe { storage.as_mut::<Box<F>>().assume_init_drop() },
    }
}

/// Type tag of the empty table. Private, so no downcast can ever match it.
struct Vacant;

fn vacant_name() -> &'static str {
    "<empty>"
}

fn clone_vacant(_src: &InlineStorage) -> InlineStorage {
    InlineStorage::new()
}

fn relocate_vacant(_src: &mut InlineStorage, _dst: &mut InlineStorage) {}

fn call_vacant<S: Signature>(
    _storage: &mut InlineStorage,
    _args: S::Args,
) -> Result<S::Output, BadCall> {
    tracing::debug!(signature = type_name::<S>(), "empty function called");
    Err(BadCall)
}

fn drop_vacant(_storage: &mut InlineStorage) {}

/// Virtual table to operate on the storage.
///
/// Emptiness is defined by the table alone.
/// Storage bound to the empty table is never read.
pub(crate) struct VTable<S: Signature> {
    /// `None` for the empty table.
    pub placement: Option<Placement>,
    pub type_id: fn() -> TypeId,
    pub type_name: fn() -> &'static str,

    /// Deep copy. The source keeps its value.
    pub clone: unsafe fn(&InlineStorage) -> InlineStorage,

    /// Moves the value from the first storage into the second one.
    /// The caller must rebind the source to the empty table.
    pub relocate: unsafe fn(&mut InlineStorage, &mut InlineStorage),

    pub call: unsafe fn(&mut InlineStorage, S::Args) -> Result<S::Output, BadCall>,

    /// Drops the value or releases its box.
    /// The caller must rebind the storage to the empty table.
    pub drop: unsafe fn(&mut InlineStorage),
}

impl<S: Signature> VTable<S> {
    /// Returns the table for callable type `F`.
    pub const fn of<F>() -> &'static Self
    where
        F: Callable<S> + Clone + 'static,
    {
        const {
            &VTable {
                placement: Some(Placement::of::<F>()),
                type_id: TypeId::of::<F>,
                type_name: type_name::<F>,
                clone: clone_value::<F>,
                relocate: relocate_value::<F>,
                call: call_value::<F, S>,
                drop: drop_value::<F>,
            }
        }
    }

    /// Returns the table that holds nothing.
    pub const fn vacant() -> &'static Self {
        const {
            &VTable {
                placement: None,
                type_id: TypeId::of::<Vacant>,
                type_name: vacant_name,
                clone: clone_vacant,
                relocate: relocate_vacant,
                call: call_vacant::<S>,
                drop: drop_vacant,
            }
        }
    }

    #[inline(always)]
    pub fn is_vacant(&self) -> bool {
        self.placement.is_none()
    }
}
