use core::mem::{align_of, size_of, MaybeUninit};

/// Number of machine words available for inline storage.
const INLINE_WORDS: usize = 1;

pub(crate) const INLINE_SIZE: usize = size_of::<[usize; INLINE_WORDS]>();
pub(crate) const INLINE_ALIGN: usize = align_of::<usize>();

/// How a callable occupies the inline storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Placement {
    /// The value lives directly inside the storage. No allocation.
    Inline,

    /// The storage holds a `Box` pointing to the value.
    Boxed,
}

impl Placement {
    /// Classifies type `T`.
    ///
    /// The result depends on size and alignment of `T` only,
    /// so it is the same every time it is computed.
    pub const fn of<T>() -> Self {
        if InlineStorage::fits::<T>() {
            Placement::Inline
        } else {
            Placement::Boxed
        }
    }
}

/// Storage that can hold one machine word worth of data with machine word alignment.
#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct InlineStorage {
    pub storage: MaybeUninit<[usize; INLINE_WORDS]>,
}

// Boxed values are stored as a single pointer.
const _: () = assert!(InlineStorage::fits::<alloc::boxed::Box<u128>>());

impl InlineStorage {
    /// Construct new storage without initializing any value in it.
    pub const fn new() -> Self {
        InlineStorage {
            storage: MaybeUninit::uninit(),
        }
    }

    /// Returns `true` if the type `T` fits into the storage.
    ///
    /// Moves in Rust are plain relocations that cannot fail,
    /// so size and alignment are the only constraints.
    pub const fn fits<T>() -> bool {
        size_of::<T>() <= INLINE_SIZE && align_of::<T>() <= INLINE_ALIGN
    }

    /// Returns reference to the potentially uninitialized value.
    /// Type must be not larger than `INLINE_SIZE` and not more aligned than `INLINE_ALIGN`.
    ///
    /// The caller is responsible to ensure that the type is correct and the value is initialized before accessing it.
    pub fn as_ref<T>(&self) -> &MaybeUninit<T> {
        // Not const, so that branches for the other placement still compile.
        assert!(size_of::<T>() <= INLINE_SIZE);
        assert!(align_of::<T>() <= INLINE_ALIGN);

        // Safety: This cast is safe due to the size and alignment constraints.
        unsafe { &*self.storage.as_ptr().cast() }
    }

    /// Returns mutable reference to the potentially uninitialized value.
    /// Type must be not larger than `INLINE_SIZE` and not more aligned than `INLINE_ALIGN`.
    ///
    /// The caller is responsible to ensure that the type is correct and the value is initialized before accessing it.
    pub fn as_mut<T>(&mut self) -> &mut MaybeUninit<T> {
        assert!(size_of::<T>() <= INLINE_SIZE);
        assert!(align_of::<T>() <= INLINE_ALIGN);

        // Safety: This cast is safe due to the size and alignment constraints.
        unsafe { &mut *self.storage.as_mut_ptr().cast() }
    }
}
