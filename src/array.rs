use crate::allocator::{handle_reserve_error, Allocator, Heap, TryReserveError};
use crate::compressed_pair::CompressedPair;
use crate::lifecycle::{self, ConstructFrom, CopyStrategy, Direction, MoveStrategy};
use crate::traits::{Bitwise, ElementWise, Lifecycle, Meet, MeetOf};
use std::alloc::Layout;
use std::fmt::Debug;
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};

/// Contiguous, growable storage for `T`, with memory from `A`.
///
/// Slots `[0, count)` hold live values and slots `[count, max_count)` are raw. The buffer is
/// null exactly when `max_count` is zero. Capacity grows to exactly what an operation needs and
/// never shrinks unless [`shrink_to_fit`](Array::shrink_to_fit) is called.
///
/// Element values are relocated with the `Move` strategy of their [`Lifecycle`] profile and
/// duplicated with its `Copy` strategy, so an `ElementWise` type observes exactly one move
/// construction and one destruction per relocated value, and a `Bitwise` type none at all.
pub struct Array<T, A: Allocator = Heap> {
    storage: CompressedPair<A, *mut T>,
    count: usize,
    max_count: usize,
    _owns: PhantomData<T>,
}

unsafe impl<T: Send, A: Allocator + Send> Send for Array<T, A> {}
unsafe impl<T: Sync, A: Allocator + Sync> Sync for Array<T, A> {}

impl<T> Array<T, Heap> {
    pub const fn new() -> Array<T, Heap> {
        Array::new_in(Heap)
    }

    pub fn with_capacity(max_count: usize) -> Array<T, Heap>
        where T: Lifecycle, T::Move: MoveStrategy<T>
    {
        Array::with_capacity_in(max_count, Heap)
    }

    /// Copies `items` into a new array with room for `extra` more values.
    pub fn from_slice(items: &[T], extra: usize) -> Array<T, Heap>
        where T: Lifecycle, T::Copy: CopyStrategy<T>, T::Move: MoveStrategy<T>
    {
        Array::from_slice_in(items, extra, Heap)
    }
}

impl<T, A: Allocator> Array<T, A> {
    /// Creates an empty array. Does not allocate.
    pub const fn new_in(allocator: A) -> Array<T, A> {
        Array {
            storage: CompressedPair::new(allocator, ptr::null_mut()),
            count: 0,
            max_count: 0,
            _owns: PhantomData,
        }
    }

    pub fn with_capacity_in(max_count: usize, allocator: A) -> Array<T, A>
        where T: Lifecycle, T::Move: MoveStrategy<T>
    {
        let mut array = Array::new_in(allocator);
        array.reserve(max_count);
        array
    }

    /// Copies `items` into a new array, allocated once with room for `extra` more values.
    pub fn from_slice_in(items: &[T], extra: usize, allocator: A) -> Array<T, A>
        where T: Lifecycle, T::Copy: CopyStrategy<T>, T::Move: MoveStrategy<T>
    {
        let max_count = items.len().checked_add(extra)
            .unwrap_or_else(|| handle_reserve_error(TryReserveError::CapacityOverflow));
        let mut array = Array::with_capacity_in(max_count, allocator);
        unsafe {
            <T::Copy as CopyStrategy<T>>::copy_construct(items.as_ptr(), array.data_ptr(), items.len());
        }
        array.count = items.len();
        array
    }

    /// Collects `iter` into a new array.
    ///
    /// The upper size hint, or the lower one when there is none, is reserved up front, so a
    /// filtering iterator allocates once and may leave spare capacity.
    pub fn from_iter_in<I: IntoIterator<Item = T>>(iter: I, allocator: A) -> Array<T, A>
        where T: Lifecycle, T::Move: MoveStrategy<T>
    {
        let iter = iter.into_iter();
        let (lower, upper) = iter.size_hint();
        let mut array = Array::with_capacity_in(upper.unwrap_or(lower), allocator);
        for item in iter {
            array.emplace_back(item);
        }
        array
    }

    /// Number of live values.
    #[inline(always)]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Number of slots owned by the buffer.
    #[inline(always)]
    pub fn max_count(&self) -> usize {
        self.max_count
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Pointer to the first slot; null when nothing is allocated.
    #[inline(always)]
    pub fn data(&self) -> *const T {
        *self.storage.second()
    }

    #[inline(always)]
    pub fn data_mut(&mut self) -> *mut T {
        *self.storage.second()
    }

    #[inline(always)]
    pub fn allocator(&self) -> &A {
        self.storage.first()
    }

    pub fn as_slice(&self) -> &[T] {
        let data = self.data_ptr();
        if data.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(data, self.count) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let data = self.data_ptr();
        if data.is_null() {
            return &mut [];
        }
        unsafe { std::slice::from_raw_parts_mut(data, self.count) }
    }

    /// Ensures room for at least `max_count` values, allocating exactly that many slots.
    pub fn reserve(&mut self, max_count: usize)
        where T: Lifecycle, T::Move: MoveStrategy<T>
    {
        if let Err(e) = self.try_reserve(max_count) {
            handle_reserve_error(e);
        }
    }

    /// Fallible [`reserve`](Array::reserve). On error the array is unchanged.
    pub fn try_reserve(&mut self, max_count: usize) -> Result<(), TryReserveError>
        where T: Lifecycle, T::Move: MoveStrategy<T>
    {
        if max_count <= self.max_count {
            return Ok(());
        }
        let (data, allocated) = self.allocate_buffer(max_count)?;
        debug!(target: crate::logging::TARGET_ARRAY, "reserve {} -> {} slots", self.max_count, allocated);
        unsafe { self.relocate_into(data, allocated, self.count, 0) };
        Ok(())
    }

    /// Reallocates to exactly `count` slots, or releases the buffer when empty.
    pub fn shrink_to_fit(&mut self)
        where T: Lifecycle, T::Move: MoveStrategy<T>
    {
        if self.count == self.max_count {
            return;
        }
        debug!(target: crate::logging::TARGET_ARRAY, "shrink {} -> {} slots", self.max_count, self.count);
        if self.count == 0 {
            unsafe { self.release_buffer() };
            return;
        }
        let (data, allocated) = self.allocate_buffer(self.count)
            .unwrap_or_else(|e| handle_reserve_error(e));
        unsafe { self.relocate_into(data, allocated, self.count, 0) };
    }

    /// Moves `value` into position `index`, shifting later values one slot up.
    ///
    /// When the array is full, the capacity grows by exactly one slot and every existing value
    /// is relocated once, directly into its final slot.
    ///
    /// # Panics
    ///
    /// Panics if `index > count`.
    pub fn emplace_at_to_ref(&mut self, index: usize, value: T) -> &mut T
        where T: Lifecycle, T::Move: MoveStrategy<T>
    {
        self.emplace_at_with(index, move || value)
    }

    /// Constructs the value at `index` from `make`. `make` runs before the array changes, so a
    /// panic in it leaves the array untouched.
    ///
    /// # Panics
    ///
    /// Panics if `index > count`.
    pub fn emplace_at_with<F>(&mut self, index: usize, make: F) -> &mut T
        where T: Lifecycle, T::Move: MoveStrategy<T>, F: FnOnce() -> T
    {
        assert!(index <= self.count, "emplace index {} is past count {}", index, self.count);
        let value = make();
        unsafe {
            if self.count == self.max_count {
                let required = self.count.checked_add(1)
                    .unwrap_or_else(|| handle_reserve_error(TryReserveError::CapacityOverflow));
                let (data, allocated) = self.allocate_buffer(required)
                    .unwrap_or_else(|e| handle_reserve_error(e));
                debug!(target: crate::logging::TARGET_ARRAY, "grow {} -> {} slots", self.max_count, allocated);
                self.relocate_into(data, allocated, index, 1);
            } else {
                let data = self.data_ptr();
                let count = mem::replace(&mut self.count, index);
                <T::Move as MoveStrategy<T>>::relocate(data.add(index), data.add(index + 1), count - index, Direction::BackToFront);
                self.count = count;
            }
            let slot = self.data_ptr().add(index);
            slot.write(value);
            self.count += 1;
            &mut *slot
        }
    }

    pub fn emplace_default_at_to_ref(&mut self, index: usize) -> &mut T
        where T: Lifecycle + Default, T::Move: MoveStrategy<T>
    {
        self.emplace_at_with(index, T::default)
    }

    /// Inserts a copy of `source` made with `T`'s copy strategy.
    pub fn emplace_copy_at_to_ref(&mut self, index: usize, source: &T) -> &mut T
        where T: Lifecycle, T::Move: MoveStrategy<T>, T::Copy: CopyStrategy<T>
    {
        self.emplace_at_with(index, || lifecycle::copy_one::<T, T::Copy>(source))
    }

    pub fn emplace_back(&mut self, value: T) -> &mut T
        where T: Lifecycle, T::Move: MoveStrategy<T>
    {
        self.emplace_at_with(self.count, move || value)
    }

    pub fn emplace_back_with<F>(&mut self, make: F) -> &mut T
        where T: Lifecycle, T::Move: MoveStrategy<T>, F: FnOnce() -> T
    {
        self.emplace_at_with(self.count, make)
    }

    /// Removes the value at `index` and returns it, shifting later values one slot down.
    ///
    /// # Panics
    ///
    /// Panics if `index >= count`.
    pub fn remove_at(&mut self, index: usize) -> T
        where T: Lifecycle, T::Move: MoveStrategy<T>
    {
        assert!(index < self.count, "remove index {} is past count {}", index, self.count);
        unsafe {
            let data = self.data_ptr();
            let count = mem::replace(&mut self.count, index);
            let value = ptr::read(data.add(index));
            <T::Move as MoveStrategy<T>>::relocate(data.add(index + 1), data.add(index), count - index - 1, Direction::FrontToBack);
            self.count = count - 1;
            value
        }
    }

    /// Destroys the value at `index` in place, shifting later values one slot down.
    ///
    /// # Panics
    ///
    /// Panics if `index >= count`.
    pub fn erase_at(&mut self, index: usize)
        where T: Lifecycle, T::Move: MoveStrategy<T>
    {
        assert!(index < self.count, "erase index {} is past count {}", index, self.count);
        unsafe {
            let data = self.data_ptr();
            let count = mem::replace(&mut self.count, index);
            lifecycle::destroy(data.add(index), 1);
            <T::Move as MoveStrategy<T>>::relocate(data.add(index + 1), data.add(index), count - index - 1, Direction::FrontToBack);
            self.count = count - 1;
        }
    }

    pub fn pop_back(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        self.count -= 1;
        Some(unsafe { ptr::read(self.data_ptr().add(self.count)) })
    }

    /// Destroys the values from `count` on. Capacity is unchanged.
    pub fn truncate(&mut self, count: usize) {
        if count >= self.count {
            return;
        }
        let surplus = self.count - count;
        self.count = count;
        unsafe { lifecycle::destroy(self.data_ptr().add(count), surplus) };
    }

    /// Destroys every value. Capacity is unchanged.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Grows with default-constructed values, or truncates, to exactly `count` values.
    pub fn resize_default(&mut self, count: usize)
        where T: Lifecycle + Default, T::Move: MoveStrategy<T>
    {
        if count <= self.count {
            self.truncate(count);
            return;
        }
        self.reserve(count);
        unsafe { lifecycle::construct_default(self.data_ptr().add(self.count), count - self.count) };
        self.count = count;
    }

    /// Replaces the contents with copies of `items`.
    ///
    /// Live values in the overlap are copy-assigned, surplus values destroyed and missing ones
    /// copy-constructed. Only when `items` does not fit the current capacity are all values
    /// destroyed and the buffer replaced by one of exactly `items.len()` slots.
    pub fn assign(&mut self, items: &[T])
        where T: Lifecycle, T::Copy: CopyStrategy<T>
    {
        unsafe {
            self.assign_with(
                items.len(),
                |dst, from, count| <T::Copy as CopyStrategy<T>>::copy_assign(items.as_ptr().add(from), dst, count),
                |dst, from, count| <T::Copy as CopyStrategy<T>>::copy_construct(items.as_ptr().add(from), dst, count),
            )
        }
    }

    /// [`assign`](Array::assign) from values of another type, one element at a time.
    pub fn assign_convert<U>(&mut self, items: &[U])
        where T: ConstructFrom<U>
    {
        unsafe {
            self.assign_with(
                items.len(),
                |dst, from, count| lifecycle::convert_assign(items.as_ptr().add(from), dst, count),
                |dst, from, count| lifecycle::convert_construct(items.as_ptr().add(from), dst, count),
            )
        }
    }

    /// Replaces the contents with the values of `items`, moving each into place.
    ///
    /// Follows the capacity rules of [`assign`](Array::assign); overlapping slots are
    /// overwritten, which drops their previous values.
    pub fn assign_iter<I>(&mut self, items: I)
        where I: IntoIterator<Item = T>, I::IntoIter: ExactSizeIterator
    {
        let mut items = items.into_iter();
        let incoming = items.len();
        if incoming > self.max_count {
            self.clear();
            unsafe { self.replace_buffer(incoming) };
        }
        let data = self.data_ptr();
        let mut index = 0;
        while index < incoming {
            let item = match items.next() {
                Some(item) => item,
                None => break,
            };
            unsafe {
                if index < self.count {
                    *data.add(index) = item;
                } else {
                    data.add(index).write(item);
                    self.count += 1;
                }
            }
            index += 1;
        }
        self.truncate(index);
    }

    /// Moves the contents out, leaving this array empty with a copy of its allocator.
    pub fn take(&mut self) -> Array<T, A>
        where A: Clone
    {
        let empty = Array::new_in(self.allocator().clone());
        mem::replace(self, empty)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    #[inline(always)]
    fn data_ptr(&self) -> *mut T {
        *self.storage.second()
    }

    /// The three-way assignment shared by the slice-based `assign` variants.
    ///
    /// `assign(dst, from, count)` overwrites live slots and `construct(dst, from, count)` fills
    /// raw ones, both from source position `from`.
    unsafe fn assign_with<FA, FC>(&mut self, incoming: usize, assign: FA, construct: FC)
        where FA: FnOnce(*mut T, usize, usize), FC: FnOnce(*mut T, usize, usize)
    {
        if incoming > self.max_count {
            self.clear();
            self.replace_buffer(incoming);
            construct(self.data_ptr(), 0, incoming);
            self.count = incoming;
        } else if incoming <= self.count {
            assign(self.data_ptr(), 0, incoming);
            self.truncate(incoming);
        } else {
            let data = self.data_ptr();
            let count = self.count;
            assign(data, 0, count);
            construct(data.add(count), count, incoming - count);
            self.count = incoming;
        }
    }

    /// Returns `(data, max_count)` of a fresh buffer with room for at least `max_count` values.
    fn allocate_buffer(&self, max_count: usize) -> Result<(*mut T, usize), TryReserveError> {
        if mem::size_of::<T>() == 0 {
            return Ok((NonNull::dangling().as_ptr(), max_count));
        }
        let layout = Layout::array::<T>(max_count).map_err(|_| TryReserveError::CapacityOverflow)?;
        let block = self.allocator().allocate(layout)
            .map_err(|_| TryReserveError::AllocError { layout })?;
        let allocated = (block.size / mem::size_of::<T>()).max(max_count);
        trace!(target: crate::logging::TARGET_ARRAY, "buffer of {} slots at {:?}", allocated, block.ptr);
        Ok((block.ptr.as_ptr() as *mut T, allocated))
    }

    /// Returns a buffer obtained from `allocate_buffer` to the allocator.
    unsafe fn free_buffer(&self, data: *mut T, max_count: usize) {
        if max_count == 0 || mem::size_of::<T>() == 0 {
            return;
        }
        let layout = Layout::from_size_align_unchecked(mem::size_of::<T>() * max_count, mem::align_of::<T>());
        trace!(target: crate::logging::TARGET_ARRAY, "release {} slots at {:?}", max_count, data);
        self.allocator().free(NonNull::new_unchecked(data as *mut u8), layout);
    }

    /// Frees the buffer. All values must already be destroyed.
    unsafe fn release_buffer(&mut self) {
        debug_assert_eq!(0, self.count, "release_buffer with live values");
        let data = mem::replace(self.storage.second_mut(), ptr::null_mut());
        let max_count = mem::replace(&mut self.max_count, 0);
        self.free_buffer(data, max_count);
    }

    /// Swaps the empty current buffer for a fresh one of `max_count` slots.
    unsafe fn replace_buffer(&mut self, max_count: usize) {
        let (data, allocated) = self.allocate_buffer(max_count)
            .unwrap_or_else(|e| handle_reserve_error(e));
        debug!(target: crate::logging::TARGET_ARRAY, "replace {} -> {} slots", self.max_count, allocated);
        self.release_buffer();
        *self.storage.second_mut() = data;
        self.max_count = allocated;
    }

    /// Relocates every live value into the fresh buffer `data` and installs it.
    ///
    /// Values before `gap` keep their index; the others land `gap_len` slots higher, so each
    /// value is relocated exactly once even when the caller is about to fill a gap.
    unsafe fn relocate_into(&mut self, data: *mut T, max_count: usize, gap: usize, gap_len: usize)
        where T: Lifecycle, T::Move: MoveStrategy<T>
    {
        let old_data = self.data_ptr();
        let old_max_count = self.max_count;
        // a panicking relocation leaks the values instead of destroying them twice
        let count = mem::replace(&mut self.count, 0);
        if count > 0 {
            <T::Move as MoveStrategy<T>>::relocate(old_data, data, gap, Direction::FrontToBack);
            <T::Move as MoveStrategy<T>>::relocate(old_data.add(gap), data.add(gap + gap_len), count - gap, Direction::FrontToBack);
        }
        self.free_buffer(old_data, old_max_count);
        *self.storage.second_mut() = data;
        self.max_count = max_count;
        self.count = count;
    }
}

impl<T, A: Allocator> Drop for Array<T, A> {
    fn drop(&mut self) {
        unsafe {
            lifecycle::destroy(self.data_ptr(), self.count);
            self.count = 0;
            self.release_buffer();
        }
    }
}

impl<T, A: Allocator + Default> Default for Array<T, A> {
    fn default() -> Self {
        Array::new_in(A::default())
    }
}

impl<T, A> Clone for Array<T, A>
    where T: Lifecycle, T::Copy: CopyStrategy<T>, T::Move: MoveStrategy<T>, A: Allocator + Clone
{
    /// Allocates exactly `count` slots and copy-constructs every value.
    fn clone(&self) -> Self {
        Array::from_slice_in(self.as_slice(), 0, self.allocator().clone())
    }

    fn clone_from(&mut self, source: &Self) {
        self.assign(source.as_slice());
    }
}

impl<T, A: Allocator> Deref for Array<T, A> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator> DerefMut for Array<T, A> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Debug, A: Allocator> Debug for Array<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, A: Allocator, B: Allocator> PartialEq<Array<T, B>> for Array<T, A> {
    fn eq(&self, other: &Array<T, B>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, A: Allocator> Eq for Array<T, A> {}

impl<T: PartialEq, A: Allocator> PartialEq<[T]> for Array<T, A> {
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}

impl<T: PartialEq, A: Allocator, const N: usize> PartialEq<[T; N]> for Array<T, A> {
    fn eq(&self, other: &[T; N]) -> bool {
        self.as_slice() == &other[..]
    }
}

impl<T, A> FromIterator<T> for Array<T, A>
    where T: Lifecycle, T::Move: MoveStrategy<T>, A: Allocator + Default
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Array::from_iter_in(iter, A::default())
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a Array<T, A> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut Array<T, A> {
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

// Only the buffer pointer moves.
impl<T: Lifecycle, A: Allocator> Lifecycle for Array<T, A>
    where T::Copy: Meet<ElementWise>
{
    type Move = Bitwise;
    type Copy = MeetOf<T::Copy, ElementWise>;
}
