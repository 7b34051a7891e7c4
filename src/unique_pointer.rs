use crate::compressed_pair::CompressedPair;
use crate::traits::{Bitwise, Lifecycle, Unavailable};
use std::fmt::{self, Debug};
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

/// Disposes of the pointee of a [`UniquePointer`].
pub trait Deleter<T> {
    /// # Safety
    ///
    /// `ptr` must point to a live value this deleter is able to dispose of, and must not be used
    /// afterwards.
    unsafe fn delete(&self, ptr: NonNull<T>);
}

/// Deletes values that were allocated by `Box`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DefaultDeleter;

impl<T> Deleter<T> for DefaultDeleter {
    #[inline]
    unsafe fn delete(&self, ptr: NonNull<T>) {
        mem::drop(Box::from_raw(ptr.as_ptr()));
    }
}

impl<'a, T, D: Deleter<T>> Deleter<T> for &'a D {
    #[inline]
    unsafe fn delete(&self, ptr: NonNull<T>) {
        (**self).delete(ptr)
    }
}

/// Sole owner of a heap value, released through `D`.
///
/// The deleter shares storage with the pointer, so with the zero-sized [`DefaultDeleter`] a
/// `UniquePointer` is exactly one pointer wide. The pointee is deleted exactly once: on
/// [`reset`](UniquePointer::reset) or when the pointer is dropped, unless it was
/// [`release`](UniquePointer::release)d first.
pub struct UniquePointer<T, D: Deleter<T> = DefaultDeleter> {
    pair: CompressedPair<D, Option<NonNull<T>>>,
}

unsafe impl<T: Send, D: Deleter<T> + Send> Send for UniquePointer<T, D> {}
unsafe impl<T: Sync, D: Deleter<T> + Sync> Sync for UniquePointer<T, D> {}

impl<T> UniquePointer<T, DefaultDeleter> {
    /// Moves `value` to the heap.
    pub fn new(value: T) -> UniquePointer<T, DefaultDeleter> {
        let ptr = NonNull::from(Box::leak(Box::new(value)));
        UniquePointer { pair: CompressedPair::new(DefaultDeleter, Some(ptr)) }
    }

    pub fn null() -> UniquePointer<T, DefaultDeleter> {
        UniquePointer::null_in(DefaultDeleter)
    }
}

impl<T, D: Deleter<T>> UniquePointer<T, D> {
    /// Takes ownership of `ptr`, to be disposed of by `deleter`.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live value that nothing else owns, and `deleter` must be able to
    /// dispose of it.
    pub unsafe fn from_raw_in(ptr: NonNull<T>, deleter: D) -> UniquePointer<T, D> {
        UniquePointer { pair: CompressedPair::new(deleter, Some(ptr)) }
    }

    pub fn null_in(deleter: D) -> UniquePointer<T, D> {
        UniquePointer { pair: CompressedPair::new(deleter, None) }
    }

    #[inline(always)]
    pub fn is_null(&self) -> bool {
        self.pair.second().is_none()
    }

    pub fn get(&self) -> Option<&T> {
        self.pair.second().map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.pair.second().map(|ptr| unsafe { &mut *ptr.as_ptr() })
    }

    #[inline(always)]
    pub fn as_ptr(&self) -> Option<NonNull<T>> {
        *self.pair.second()
    }

    #[inline(always)]
    pub fn deleter(&self) -> &D {
        self.pair.first()
    }

    /// Gives up ownership without deleting. The pointer becomes null.
    pub fn release(&mut self) -> Option<NonNull<T>> {
        self.pair.second_mut().take()
    }

    /// Deletes the pointee, if any. The pointer becomes null.
    pub fn reset(&mut self) {
        if let Some(old) = self.release() {
            unsafe { self.deleter().delete(old) };
        }
    }

    /// Deletes the current pointee, if any, and takes ownership of `ptr`.
    ///
    /// # Safety
    ///
    /// Same contract as [`from_raw_in`](UniquePointer::from_raw_in). Resetting to the pointer
    /// already owned is allowed and keeps it.
    pub unsafe fn reset_to(&mut self, ptr: NonNull<T>) {
        if self.as_ptr() == Some(ptr) {
            return;
        }
        let (deleter, slot) = self.pair.as_mut();
        if let Some(old) = mem::replace(slot, Some(ptr)) {
            deleter.delete(old);
        }
    }

    /// Moves ownership out, leaving this pointer null with a copy of its deleter.
    pub fn take(&mut self) -> UniquePointer<T, D>
        where D: Clone
    {
        let ptr = self.release();
        UniquePointer { pair: CompressedPair::new(self.deleter().clone(), ptr) }
    }
}

impl<T, D: Deleter<T>> Drop for UniquePointer<T, D> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T, D: Deleter<T> + Default> Default for UniquePointer<T, D> {
    fn default() -> Self {
        UniquePointer::null_in(D::default())
    }
}

impl<T, D: Deleter<T>> Deref for UniquePointer<T, D> {
    type Target = T;

    /// # Panics
    ///
    /// Panics when the pointer is null.
    fn deref(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => panic!("dereferenced a null UniquePointer"),
        }
    }
}

impl<T, D: Deleter<T>> DerefMut for UniquePointer<T, D> {
    fn deref_mut(&mut self) -> &mut T {
        match self.get_mut() {
            Some(value) => value,
            None => panic!("dereferenced a null UniquePointer"),
        }
    }
}

impl<T: Debug, D: Deleter<T>> Debug for UniquePointer<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f.debug_tuple("UniquePointer").field(value).finish(),
            None => f.write_str("UniquePointer(null)"),
        }
    }
}

impl<T, D: Deleter<T>> Lifecycle for UniquePointer<T, D> {
    type Move = Bitwise;
    type Copy = Unavailable;
}
