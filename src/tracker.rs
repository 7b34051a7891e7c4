//! This module is for testing only

use crate::allocator::{AllocError, Allocator, Block, Heap};
use crate::lifecycle::Relocate;
use crate::traits::{Bitwise, ElementWise, Lifecycle};
use crate::unique_pointer::{DefaultDeleter, Deleter};
use std::alloc::Layout;
use std::cell::{Cell, RefCell};
use std::ptr::{self, NonNull};
use std::rc::Rc;

/// Lifecycle calls observed on tracked values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counts {
    pub constructed: usize,
    pub copy_constructed: usize,
    pub move_constructed: usize,
    pub copy_assigned: usize,
    pub destroyed: usize,
}

pub type Counter = Rc<RefCell<Counts>>;

pub fn counter() -> Counter {
    Rc::new(RefCell::new(Counts::default()))
}

/// Element-wise movable and copyable value that records every lifecycle call.
#[derive(Debug)]
pub struct Tracked {
    pub value: i32,
    /// How many times this particular value was move-constructed into a new slot.
    pub relocations: usize,
    pub counter: Counter,
}

impl Tracked {
    pub fn new(value: i32, counter: &Counter) -> Tracked {
        counter.borrow_mut().constructed += 1;
        Tracked { value, relocations: 0, counter: counter.clone() }
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        self.counter.borrow_mut().copy_constructed += 1;
        Tracked { value: self.value, relocations: 0, counter: self.counter.clone() }
    }

    fn clone_from(&mut self, source: &Self) {
        self.counter.borrow_mut().copy_assigned += 1;
        self.value = source.value;
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.counter.borrow_mut().destroyed += 1;
    }
}

impl PartialEq for Tracked {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Lifecycle for Tracked {
    type Move = ElementWise;
    type Copy = ElementWise;
}

unsafe impl Relocate for Tracked {
    unsafe fn relocate(src: *mut Self, dst: *mut Self) {
        let source = &*src;
        source.counter.borrow_mut().move_constructed += 1;
        let moved = Tracked {
            value: source.value,
            relocations: source.relocations + 1,
            counter: source.counter.clone(),
        };
        ptr::drop_in_place(src);
        dst.write(moved);
    }
}

/// Bitwise movable value: relocation must not be visible in its counts.
#[derive(Debug)]
pub struct TrackedPod {
    pub value: i32,
    pub counter: Counter,
}

impl TrackedPod {
    pub fn new(value: i32, counter: &Counter) -> TrackedPod {
        counter.borrow_mut().constructed += 1;
        TrackedPod { value, counter: counter.clone() }
    }
}

impl Clone for TrackedPod {
    fn clone(&self) -> Self {
        self.counter.borrow_mut().copy_constructed += 1;
        TrackedPod { value: self.value, counter: self.counter.clone() }
    }

    fn clone_from(&mut self, source: &Self) {
        self.counter.borrow_mut().copy_assigned += 1;
        self.value = source.value;
    }
}

impl Drop for TrackedPod {
    fn drop(&mut self) {
        self.counter.borrow_mut().destroyed += 1;
    }
}

impl Lifecycle for TrackedPod {
    type Move = Bitwise;
    type Copy = ElementWise;
}

/// The default deleter plus a call counter.
#[derive(Debug, Default)]
pub struct CountingDeleter {
    base: DefaultDeleter,
    pub calls: Cell<usize>,
}

impl<T> Deleter<T> for CountingDeleter {
    unsafe fn delete(&self, ptr: NonNull<T>) {
        self.calls.set(self.calls.get() + 1);
        Deleter::<T>::delete(&self.base, ptr);
    }
}

/// Heap allocator that grants a fixed number of requests and refuses the rest.
#[derive(Debug)]
pub struct Refusing {
    remaining: Cell<usize>,
    refused: Cell<usize>,
}

impl Refusing {
    pub fn after(granted: usize) -> Refusing {
        Refusing { remaining: Cell::new(granted), refused: Cell::new(0) }
    }

    pub fn refused(&self) -> usize {
        self.refused.get()
    }
}

unsafe impl Allocator for Refusing {
    fn allocate(&self, layout: Layout) -> Result<Block, AllocError> {
        if self.remaining.get() == 0 {
            self.refused.set(self.refused.get() + 1);
            return Err(AllocError);
        }
        self.remaining.set(self.remaining.get() - 1);
        Heap.allocate(layout)
    }

    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) {
        Heap.free(ptr, layout)
    }
}

#[test]
fn tracked_counts() {
    let counts = counter();
    let a = Tracked::new(1, &counts);
    let mut b = a.clone();
    b.clone_from(&a);
    std::mem::drop(a);
    assert_eq!(Counts { constructed: 1, copy_constructed: 1, move_constructed: 0, copy_assigned: 1, destroyed: 1 }, *counts.borrow());
    std::mem::drop(b);
    assert_eq!(2, counts.borrow().destroyed);
}
