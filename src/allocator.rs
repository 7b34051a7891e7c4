use std::alloc::Layout;
use std::cell::Cell;
use std::fmt::{Debug, Display};
use std::ptr::NonNull;

/// A block of memory handed out by an [`Allocator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block {
    pub ptr: NonNull<u8>,
    /// Usable bytes, at least the requested size.
    pub size: usize,
}

/// Allocation failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocError;

impl Display for AllocError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt("memory allocation failed", f)
    }
}

impl std::error::Error for AllocError {}

/// Growing a container failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TryReserveError {
    /// The requested capacity does not fit a `Layout`.
    CapacityOverflow,
    /// The allocator refused the request.
    AllocError { layout: Layout },
}

impl Display for TryReserveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TryReserveError::CapacityOverflow => Display::fmt("capacity overflow", f),
            TryReserveError::AllocError { layout } => write!(f, "allocator failed to provide {} bytes aligned to {}", layout.size(), layout.align()),
        }
    }
}

impl std::error::Error for TryReserveError {}

/// The memory source of a container.
///
/// # Safety
///
/// A block returned by `allocate` must be valid for reads and writes of `size` bytes, aligned to
/// the requested alignment, and must stay valid until it is passed to `free`.
pub unsafe trait Allocator {
    fn allocate(&self, layout: Layout) -> Result<Block, AllocError>;

    /// Returns a block to the allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate` on this allocator, and `layout` must have the alignment
    /// requested there and a size between the requested size and the returned `Block::size`.
    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout);
}

unsafe impl<'a, A: Allocator + ?Sized> Allocator for &'a A {
    #[inline(always)]
    fn allocate(&self, layout: Layout) -> Result<Block, AllocError> {
        (**self).allocate(layout)
    }

    #[inline(always)]
    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) {
        (**self).free(ptr, layout)
    }
}

/// The process-wide global allocator. Zero-sized, so containers holding it pay no storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Heap;

unsafe impl Allocator for Heap {
    fn allocate(&self, layout: Layout) -> Result<Block, AllocError> {
        if layout.size() == 0 {
            // the alignment is a non-zero power of two, so it doubles as a dangling address
            let ptr = NonNull::new(layout.align() as *mut u8).ok_or(AllocError)?;
            return Ok(Block { ptr, size: 0 });
        }
        let ptr = NonNull::new(unsafe { std::alloc::alloc(layout) }).ok_or(AllocError)?;
        trace!(target: crate::logging::TARGET_ALLOC, "alloc {} bytes at {:?}", layout.size(), ptr);
        Ok(Block { ptr, size: layout.size() })
    }

    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        trace!(target: crate::logging::TARGET_ALLOC, "free  {} bytes at {:?}", layout.size(), ptr);
        std::alloc::dealloc(ptr.as_ptr(), layout);
    }
}

/// Wraps an allocator and counts the calls made through it.
///
/// The counters are plain `Cell`s; share the allocator between containers by reference
/// (`&Counting`) on a single thread.
#[derive(Default)]
pub struct Counting<A = Heap> {
    inner: A,
    allocations: Cell<usize>,
    frees: Cell<usize>,
}

impl Counting<Heap> {
    pub fn new() -> Counting<Heap> {
        Counting::wrap(Heap)
    }
}

impl<A> Counting<A> {
    pub fn wrap(inner: A) -> Counting<A> {
        Counting {
            inner,
            allocations: Cell::new(0),
            frees: Cell::new(0),
        }
    }

    /// Number of successful `allocate` calls so far.
    #[inline(always)]
    pub fn allocation_count(&self) -> usize {
        self.allocations.get()
    }

    /// Number of `free` calls so far.
    #[inline(always)]
    pub fn free_count(&self) -> usize {
        self.frees.get()
    }

    /// Blocks handed out and not yet returned.
    #[inline(always)]
    pub fn live_count(&self) -> usize {
        self.allocations.get() - self.frees.get()
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

impl<A> Debug for Counting<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Counting")
            .field("allocations", &self.allocations.get())
            .field("frees", &self.frees.get())
            .finish()
    }
}

unsafe impl<A: Allocator> Allocator for Counting<A> {
    fn allocate(&self, layout: Layout) -> Result<Block, AllocError> {
        let block = self.inner.allocate(layout)?;
        self.allocations.set(self.allocations.get() + 1);
        Ok(block)
    }

    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) {
        self.frees.set(self.frees.get() + 1);
        self.inner.free(ptr, layout)
    }
}

/// Allocation policy of the infallible container operations.
#[cold]
pub(crate) fn handle_reserve_error(error: TryReserveError) -> ! {
    match error {
        TryReserveError::CapacityOverflow => panic!("capacity overflow"),
        TryReserveError::AllocError { layout } => std::alloc::handle_alloc_error(layout),
    }
}

#[cfg(test)]
mod allocator_tests {
    use super::*;

    #[test]
    fn heap_round_trip() {
        let layout = Layout::array::<u64>(4).unwrap();
        let block = Heap.allocate(layout).unwrap();
        assert!(block.size >= layout.size());
        unsafe {
            let words = block.ptr.as_ptr() as *mut u64;
            words.write(7);
            words.add(3).write(9);
            assert_eq!(16, *words + *words.add(3));
            Heap.free(block.ptr, layout);
        }
    }

    #[test]
    fn zero_sized_requests_do_not_touch_the_heap() {
        let layout = Layout::from_size_align(0, 8).unwrap();
        let block = Heap.allocate(layout).unwrap();
        assert_eq!(0, block.size);
        assert_eq!(0, block.ptr.as_ptr() as usize % 8);
        unsafe { Heap.free(block.ptr, layout) };
    }

    #[test]
    fn counting_through_a_reference() {
        let counting = Counting::new();
        let layout = Layout::new::<u32>();
        let by_ref = &counting;
        let a = by_ref.allocate(layout).unwrap();
        let b = counting.allocate(layout).unwrap();
        assert_eq!(2, counting.allocation_count());
        assert_eq!(2, counting.live_count());
        unsafe {
            by_ref.free(a.ptr, layout);
            counting.free(b.ptr, layout);
        }
        assert_eq!(2, counting.free_count());
        assert_eq!(0, counting.live_count());
    }

    #[test]
    fn errors_display() {
        assert_eq!("memory allocation failed", AllocError.to_string());
        assert_eq!("capacity overflow", TryReserveError::CapacityOverflow.to_string());
    }
}
