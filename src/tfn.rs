use core::{
    any::TypeId,
    fmt,
    marker::PhantomData,
    mem::{self, ManuallyDrop},
};

use alloc::boxed::Box;

use crate::{
    signature::{Callable, Signature},
    storage::{InlineStorage, Placement, INLINE_ALIGN, INLINE_SIZE},
    vtable::{value_mut, value_read, value_ref, value_write, VTable},
    BadCall,
};

/// Function container with fixed-size inlined storage.
/// Callables that fit in the storage are stored without allocation.
/// Callables that are too large are boxed.
/// Stored callables may not implement `Send` and `Sync`.
/// For thread-safe version see [`TFn`].
///
/// `S` is the call signature, spelled as function pointer type.
///
/// # Example
///
/// ```
/// # use tfn::LTFn;
/// let offset = 10u32;
/// let mut f: LTFn<fn(u32) -> u32> = LTFn::new(move |x: u32| x + offset);
///
/// assert_eq!(f.call(32), Ok(42));
/// ```
pub struct LTFn<S: Signature> {
    vtable: &'static VTable<S>,
    storage: InlineStorage,
    unsend: PhantomData<*mut u8>,
}

impl<S: Signature> Drop for LTFn<S> {
    #[inline(always)]
    fn drop(&mut self) {
        unsafe {
            (self.vtable.drop)(&mut self.storage);
        }
    }
}

impl<S: Signature> Clone for LTFn<S> {
    /// Deep copy.
    /// Boxed callable gets a fresh allocation.
    #[inline]
    fn clone(&self) -> Self {
        LTFn {
            vtable: self.vtable,
            // Safety: The table is bound to this storage.
            storage: unsafe { (self.vtable.clone)(&self.storage) },
            unsend: PhantomData,
        }
    }

    /// Replaces the stored callable with a deep copy of the source's one.
    ///
    /// The copy is made before the old callable is dropped.
    /// If cloning panics, `self` is left unchanged.
    #[inline]
    fn clone_from(&mut self, source: &Self) {
        let copy = source.clone();
        *self = copy;
    }
}

impl<S: Signature> Default for LTFn<S> {
    #[inline(always)]
    fn default() -> Self {
        LTFn::empty()
    }
}

impl<S: Signature> fmt::Debug for LTFn<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LTFn")
            .field("callable", &(self.vtable.type_name)())
            .field("placement", &self.vtable.placement)
            .finish()
    }
}

impl<S: Signature> LTFn<S> {
    /// Size of the inline storage in bytes.
    pub const INLINE_SIZE: usize = INLINE_SIZE;

    /// Alignment of the inline storage in bytes.
    pub const INLINE_ALIGN: usize = INLINE_ALIGN;

    /// Returns `true` if the type `F` fits and can be stored without allocation.
    /// If `true`, then `LTFn::new::<F>` is guaranteed to not allocate.
    ///
    /// # Example
    ///
    /// ```
    /// # use tfn::LTFn;
    /// // Function pointer takes exactly one word.
    /// assert!(LTFn::<fn() -> u32>::fits::<fn() -> u32>());
    /// assert!(!LTFn::<fn() -> u32>::fits::<[u64; 2]>());
    /// ```
    pub const fn fits<F>() -> bool {
        InlineStorage::fits::<F>()
    }

    /// Returns how a callable of type `F` would be stored.
    pub const fn placement_of<F>() -> Placement {
        Placement::of::<F>()
    }

    /// Construct new empty [`LTFn`].
    ///
    /// Calling it returns [`BadCall`].
    ///
    /// # Example
    ///
    /// ```
    /// # use tfn::{BadCall, LTFn};
    /// let mut f: LTFn<fn() -> u32> = LTFn::empty();
    ///
    /// assert!(f.is_empty());
    /// assert_eq!(f.call(), Err(BadCall));
    /// ```
    #[inline(always)]
    pub const fn empty() -> Self {
        LTFn {
            vtable: VTable::vacant(),
            storage: InlineStorage::new(),
            unsend: PhantomData,
        }
    }

    /// Construct new [`LTFn`] with the given callable.
    ///
    /// If the type `F` fits in the storage, it is stored without allocation.
    /// Otherwise, it will be boxed.
    ///
    /// Type of callable may not implement `Send` or `Sync`.
    /// But [`LTFn`] itself does not implement `Send` and `Sync`.
    /// For `Send` and `Sync` container see [`TFn`].
    ///
    /// # Example
    ///
    /// ```
    /// # use tfn::LTFn;
    /// let mut f: LTFn<fn(u32, u32) -> u32> = LTFn::new(|a: u32, b: u32| a * b);
    ///
    /// assert_eq!(f.call(6, 7), Ok(42));
    /// ```
    #[inline]
    pub fn new<F>(f: F) -> Self
    where
        F: Callable<S> + Clone + 'static,
    {
        let mut storage = InlineStorage::new();
        value_write(&mut storage, f);

        LTFn {
            vtable: VTable::of::<F>(),
            storage,
            unsend: PhantomData,
        }
    }

    /// Construct new [`LTFn`] from the given boxed callable.
    ///
    /// If type fits in the storage, callable will be unboxed.
    /// Otherwise it will be stored as boxed, but no allocation will be performed.
    ///
    /// # Example
    ///
    /// ```
    /// # use tfn::{LTFn, Placement};
    /// let table = [1u64, 2, 3, 4];
    /// let boxed = Box::new(move |i: usize| table[i]);
    ///
    /// // No additional allocation is performed.
    /// let mut f: LTFn<fn(usize) -> u64> = LTFn::from_box(boxed);
    ///
    /// assert_eq!(f.placement(), Some(Placement::Boxed));
    /// assert_eq!(f.call(3), Ok(4));
    /// ```
    #[inline]
    pub fn from_box<F>(boxed: Box<F>) -> Self
    where
        F: Callable<S> + Clone + 'static,
    {
        let mut storage = InlineStorage::new();

        match Placement::of::<F>() {
            Placement::Inline => {
                storage.as_mut::<F>().write(*boxed);
            }
            Placement::Boxed => {
                storage.as_mut::<Box<F>>().write(boxed);
            }
        }

        LTFn {
            vtable: VTable::of::<F>(),
            storage,
            unsend: PhantomData,
        }
    }

    /// Returns `true` if no callable is stored.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.vtable.is_vacant()
    }

    /// Returns placement of the stored callable.
    /// Returns `None` if no callable is stored.
    #[inline(always)]
    pub fn placement(&self) -> Option<Placement> {
        self.vtable.placement
    }

    /// Returns the type id of the stored callable.
    /// Returns `None` if no callable is stored.
    ///
    /// # Example
    ///
    /// ```
    /// # use tfn::LTFn;
    /// use core::any::TypeId;
    ///
    /// fn answer() -> u32 { 42 }
    ///
    /// let f: LTFn<fn() -> u32> = LTFn::new(answer as fn() -> u32);
    ///
    /// assert_eq!(f.type_id(), Some(TypeId::of::<fn() -> u32>()));
    /// ```
    #[inline]
    pub fn type_id(&self) -> Option<TypeId> {
        if self.is_empty() {
            None
        } else {
            Some((self.vtable.type_id)())
        }
    }

    /// Returns the type name of the stored callable.
    /// Returns `None` if no callable is stored.
    #[inline]
    pub fn type_name(&self) -> Option<&'static str> {
        if self.is_empty() {
            None
        } else {
            Some((self.vtable.type_name)())
        }
    }

    /// Returns `true` if the stored callable is of type `T` exactly.
    /// Always returns `false` if no callable is stored.
    #[inline]
    pub fn is<T>(&self) -> bool
    where
        T: 'static,
    {
        self.type_id() == Some(TypeId::of::<T>())
    }

    /// Calls the stored callable with arguments packed into a tuple.
    ///
    /// Returns [`BadCall`] if nothing is stored.
    /// Prefer `call` with unpacked arguments.
    ///
    /// # Example
    ///
    /// ```
    /// # use tfn::LTFn;
    /// let mut f: LTFn<fn(u32, u32) -> u32> = LTFn::new(|a: u32, b: u32| a + b);
    ///
    /// assert_eq!(f.invoke((40, 2)), Ok(42));
    /// ```
    #[inline]
    pub fn invoke(&mut self, args: S::Args) -> Result<S::Output, BadCall> {
        // Safety: The table is bound to this storage.
        unsafe { (self.vtable.call)(&mut self.storage, args) }
    }

    /// Drops the stored callable, leaving this container empty.
    #[inline]
    pub fn reset(&mut self) {
        // Rebind first, so a panicking drop can't cause a double drop.
        let vtable = mem::replace(&mut self.vtable, VTable::vacant());

        // Safety: The table was bound to this storage.
        unsafe {
            (vtable.drop)(&mut self.storage);
        }
    }

    /// Moves the stored callable out, leaving this container empty.
    ///
    /// No allocation is performed, boxed callable keeps its box.
    ///
    /// # Example
    ///
    /// ```
    /// # use tfn::LTFn;
    /// let mut a: LTFn<fn() -> u32> = LTFn::new(|| 42);
    /// let mut b = a.take();
    ///
    /// assert!(a.is_empty());
    /// assert_eq!(b.call(), Ok(42));
    /// ```
    #[inline]
    pub fn take(&mut self) -> Self {
        let mut taken = LTFn::empty();
        taken.take_from(self);
        taken
    }

    /// Drops the stored callable and moves the source's one in.
    /// The source is left empty.
    #[inline]
    pub fn take_from(&mut self, source: &mut Self) {
        self.reset();

        let vtable = mem::replace(&mut source.vtable, VTable::vacant());

        // Safety: The table was bound to the source storage, and this storage is vacant.
        unsafe {
            (vtable.relocate)(&mut source.storage, &mut self.storage);
        }
        self.vtable = vtable;
    }

    /// Replaces the stored callable with another container's one.
    /// Returns the previous contents.
    #[inline(always)]
    pub fn replace(&mut self, other: Self) -> Self {
        mem::replace(self, other)
    }

    /// Replaces the stored callable with a new one.
    ///
    /// The new callable is placed before the old one is dropped.
    #[inline]
    pub fn set<F>(&mut self, f: F)
    where
        F: Callable<S> + Clone + 'static,
    {
        *self = LTFn::new(f);
    }

    /// Returns some reference to the stored callable if it is of type `T`.
    /// Otherwise returns none.
    ///
    /// # Example
    ///
    /// ```
    /// # use tfn::LTFn;
    /// fn answer() -> u32 { 42 }
    ///
    /// let f: LTFn<fn() -> u32> = LTFn::new(answer as fn() -> u32);
    ///
    /// assert!(f.downcast_ref::<fn() -> u32>().is_some());
    /// assert!(f.downcast_ref::<u32>().is_none());
    /// ```
    #[inline]
    pub fn downcast_ref<T>(&self) -> Option<&T>
    where
        T: 'static,
    {
        if self.is::<T>() {
            Some(unsafe { self.downcast_ref_unchecked::<T>() })
        } else {
            None
        }
    }

    /// Returns some mutable reference to the stored callable if it is of type `T`.
    /// Otherwise returns none.
    #[inline]
    pub fn downcast_mut<T>(&mut self) -> Option<&mut T>
    where
        T: 'static,
    {
        if self.is::<T>() {
            Some(unsafe { self.downcast_mut_unchecked::<T>() })
        } else {
            None
        }
    }

    /// Returns the stored callable if it is of type `T`.
    /// Otherwise return self back.
    ///
    /// This will unbox the callable if it was stored as boxed.
    #[inline]
    pub fn downcast<T>(self) -> Result<T, Self>
    where
        T: 'static,
    {
        if self.is::<T>() {
            Ok(unsafe { self.downcast_unchecked() })
        } else {
            Err(self)
        }
    }

    /// Returns reference to the stored callable without type checking.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the type is correct.
    #[inline]
    pub unsafe fn downcast_ref_unchecked<T>(&self) -> &T
    where
        T: 'static,
    {
        debug_assert!(self.is::<T>());
        unsafe { value_ref::<T>(&self.storage) }
    }

    /// Returns mutable reference to the stored callable without type checking.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the type is correct.
    #[inline]
    pub unsafe fn downcast_mut_unchecked<T>(&mut self) -> &mut T
    where
        T: 'static,
    {
        debug_assert!(self.is::<T>());
        unsafe { value_mut::<T>(&mut self.storage) }
    }

    /// Returns the stored callable without type checking.
    ///
    /// This will unbox the callable if it was stored as boxed.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the type is correct.
    #[inline]
    pub unsafe fn downcast_unchecked<T>(self) -> T
    where
        T: 'static,
    {
        debug_assert!(self.is::<T>());
        // Prevent dropping using `vtable.drop`.
        let me = ManuallyDrop::new(self);

        // Read value out, box is released.
        unsafe { value_read::<T>(&me.storage) }
    }
}

/// Function container with fixed-size inlined storage.
/// Callables that fit in the storage are stored without allocation.
/// Callables that are too large are boxed.
/// Requires `Send` and `Sync`.
/// For thread-local version see [`LTFn`].
///
/// The container is not synchronized, calling requires `&mut`.
pub struct TFn<S: Signature> {
    inner: LTFn<S>,
}

// Safety: Every constructor requires stored callable to be `Send` and `Sync`.
unsafe impl<S: Signature> Send for TFn<S> {}
unsafe impl<S: Signature> Sync for TFn<S> {}

impl<S: Signature> Clone for TFn<S> {
    #[inline]
    fn clone(&self) -> Self {
        TFn {
            inner: self.inner.clone(),
        }
    }

    #[inline]
    fn clone_from(&mut self, source: &Self) {
        self.inner.clone_from(&source.inner);
    }
}

impl<S: Signature> Default for TFn<S> {
    #[inline(always)]
    fn default() -> Self {
        TFn::empty()
    }
}

impl<S: Signature> fmt::Debug for TFn<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TFn")
            .field("callable", &(self.inner.vtable.type_name)())
            .field("placement", &self.inner.vtable.placement)
            .finish()
    }
}

impl<S: Signature> From<TFn<S>> for LTFn<S> {
    #[inline(always)]
    fn from(value: TFn<S>) -> Self {
        value.inner
    }
}

impl<S: Signature> TFn<S> {
    /// Size of the inline storage in bytes.
    pub const INLINE_SIZE: usize = INLINE_SIZE;

    /// Alignment of the inline storage in bytes.
    pub const INLINE_ALIGN: usize = INLINE_ALIGN;

    /// Returns `true` if the type `F` fits and can be stored without allocation.
    /// If `true`, then `TFn::new::<F>` is guaranteed to not allocate.
    pub const fn fits<F>() -> bool {
        InlineStorage::fits::<F>()
    }

    /// Returns how a callable of type `F` would be stored.
    pub const fn placement_of<F>() -> Placement {
        Placement::of::<F>()
    }

    /// Construct new empty [`TFn`].
    #[inline(always)]
    pub const fn empty() -> Self {
        TFn {
            inner: LTFn::empty(),
        }
    }

    /// Construct new [`TFn`] with the given callable.
    ///
    /// If the type `F` fits in the storage, it is stored without allocation.
    /// Otherwise, it will be boxed.
    ///
    /// Type of callable must implement both `Send` and `Sync`.
    /// For types that do not implement `Send` or `Sync`, use [`LTFn`].
    ///
    /// # Example
    ///
    /// ```
    /// # use tfn::TFn;
    /// let mut f: TFn<fn(u32) -> u32> = TFn::new(|x: u32| x + 1);
    ///
    /// let handle = std::thread::spawn(move || f.call(41));
    ///
    /// assert_eq!(handle.join().unwrap(), Ok(42));
    /// ```
    #[inline]
    pub fn new<F>(f: F) -> Self
    where
        F: Callable<S> + Clone + Send + Sync + 'static,
    {
        TFn {
            inner: LTFn::new(f),
        }
    }

    /// Construct new [`TFn`] from the given boxed callable.
    ///
    /// If type fits in the storage, callable will be unboxed.
    /// Otherwise it will be stored as boxed, but no allocation will be performed.
    #[inline]
    pub fn from_box<F>(boxed: Box<F>) -> Self
    where
        F: Callable<S> + Clone + Send + Sync + 'static,
    {
        TFn {
            inner: LTFn::from_box(boxed),
        }
    }

    /// Returns `true` if no callable is stored.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns placement of the stored callable.
    /// Returns `None` if no callable is stored.
    #[inline(always)]
    pub fn placement(&self) -> Option<Placement> {
        self.inner.placement()
    }

    /// Returns the type id of the stored callable.
    /// Returns `None` if no callable is stored.
    #[inline]
    pub fn type_id(&self) -> Option<TypeId> {
        self.inner.type_id()
    }

    /// Returns the type name of the stored callable.
    /// Returns `None` if no callable is stored.
    #[inline]
    pub fn type_name(&self) -> Option<&'static str> {
        self.inner.type_name()
    }

    /// Returns `true` if the stored callable is of type `T` exactly.
    #[inline]
    pub fn is<T>(&self) -> bool
    where
        T: 'static,
    {
        self.inner.is::<T>()
    }

    /// Calls the stored callable with arguments packed into a tuple.
    ///
    /// Returns [`BadCall`] if nothing is stored.
    #[inline]
    pub fn invoke(&mut self, args: S::Args) -> Result<S::Output, BadCall> {
        self.inner.invoke(args)
    }

    /// Drops the stored callable, leaving this container empty.
    #[inline]
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Moves the stored callable out, leaving this container empty.
    #[inline]
    pub fn take(&mut self) -> Self {
        TFn {
            inner: self.inner.take(),
        }
    }

    /// Drops the stored callable and moves the source's one in.
    /// The source is left empty.
    #[inline]
    pub fn take_from(&mut self, source: &mut Self) {
        self.inner.take_from(&mut source.inner);
    }

    /// Replaces the stored callable with another container's one.
    /// Returns the previous contents.
    #[inline(always)]
    pub fn replace(&mut self, other: Self) -> Self {
        mem::replace(self, other)
    }

    /// Replaces the stored callable with a new one.
    #[inline]
    pub fn set<F>(&mut self, f: F)
    where
        F: Callable<S> + Clone + Send + Sync + 'static,
    {
        self.inner.set(f);
    }

    /// Returns some reference to the stored callable if it is of type `T`.
    /// Otherwise returns none.
    #[inline]
    pub fn downcast_ref<T>(&self) -> Option<&T>
    where
        T: 'static,
    {
        self.inner.downcast_ref()
    }

    /// Returns some mutable reference to the stored callable if it is of type `T`.
    /// Otherwise returns none.
    #[inline]
    pub fn downcast_mut<T>(&mut self) -> Option<&mut T>
    where
        T: 'static,
    {
        self.inner.downcast_mut()
    }

    /// Returns the stored callable if it is of type `T`.
    /// Otherwise return self back.
    #[inline]
    pub fn downcast<T>(self) -> Result<T, TFn<S>>
    where
        T: 'static,
    {
        if self.is::<T>() {
            Ok(unsafe { self.inner.downcast_unchecked() })
        } else {
            Err(self)
        }
    }

    /// Returns reference to the stored callable without type checking.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the type is correct.
    #[inline]
    pub unsafe fn downcast_ref_unchecked<T>(&self) -> &T
    where
        T: 'static,
    {
        unsafe { self.inner.downcast_ref_unchecked() }
    }

    /// Returns mutable reference to the stored callable without type checking.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the type is correct.
    #[inline]
    pub unsafe fn downcast_mut_unchecked<T>(&mut self) -> &mut T
    where
        T: 'static,
    {
        unsafe { self.inner.downcast_mut_unchecked() }
    }

    /// Returns the stored callable without type checking.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the type is correct.
    #[inline]
    pub unsafe fn downcast_unchecked<T>(self) -> T
    where
        T: 'static,
    {
        unsafe { self.inner.downcast_unchecked() }
    }
}
