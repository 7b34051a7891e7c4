//! The element-lifecycle engine.
//!
//! Containers construct, relocate, copy and destroy ranges of slots through the functions in
//! this module. Which code runs is decided by the strategy markers of the element's
//! [`Lifecycle`](crate::Lifecycle) profile, so a `Bitwise` type gets a single `memmove` where an
//! `ElementWise` type gets one constructor and one destructor call per element.
//!
//! All functions here work on raw slots. Callers own the bookkeeping of which slots are live.

use crate::traits::{Bitwise, ElementWise, IsTriviallyDestructible, Lifecycle, Predicate, Strategy};
use std::mem::{self, MaybeUninit};
use std::ptr;

/// Order in which an element-wise relocation visits the range.
///
/// Shifting toward higher addresses inside one buffer must run back to front and shifting toward
/// lower addresses front to back, so that no source element is overwritten before it was moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    FrontToBack,
    BackToFront,
}

/// The per-element move constructor used by [`ElementWise`] relocation.
///
/// # Safety
///
/// `relocate` must leave a live value in `dst` and leave `src` as raw, already destroyed
/// storage. Implementations usually move-construct the new value from `*src`, run the
/// destructor of `*src` and then write the new value to `dst`. Implementations should not panic:
/// a panic leaks the rest of the range being relocated.
pub unsafe trait Relocate: Sized {
    unsafe fn relocate(src: *mut Self, dst: *mut Self);
}

/// Relocation of live values between slots.
pub trait MoveStrategy<T>: Strategy {
    /// Relocates `count` live values from `src` into the raw slots at `dst`.
    ///
    /// The ranges may overlap when `direction` matches the direction of the shift.
    ///
    /// # Safety
    ///
    /// `src..src + count` must be live and `dst..dst + count` raw (except where it overlaps the
    /// source). Afterwards the source slots that are not part of the destination are raw.
    unsafe fn relocate(src: *mut T, dst: *mut T, count: usize, direction: Direction);
}

impl<T> MoveStrategy<T> for Bitwise {
    #[inline]
    unsafe fn relocate(src: *mut T, dst: *mut T, count: usize, _direction: Direction) {
        if count == 0 {
            return;
        }
        ptr::copy(src, dst, count);
    }
}

impl<T: Relocate> MoveStrategy<T> for ElementWise {
    unsafe fn relocate(src: *mut T, dst: *mut T, count: usize, direction: Direction) {
        match direction {
            Direction::FrontToBack => {
                for i in 0..count {
                    T::relocate(src.add(i), dst.add(i));
                }
            }
            Direction::BackToFront => {
                for i in (0..count).rev() {
                    T::relocate(src.add(i), dst.add(i));
                }
            }
        }
    }
}

// Elements relocate one by one with their own strategy.
unsafe impl<T: Lifecycle, const N: usize> Relocate for [T; N]
    where T::Move: MoveStrategy<T>
{
    unsafe fn relocate(src: *mut Self, dst: *mut Self) {
        <T::Move as MoveStrategy<T>>::relocate(src as *mut T, dst as *mut T, N, Direction::FrontToBack);
    }
}

/// Duplication of live values.
pub trait CopyStrategy<T>: Strategy {
    /// Constructs `count` values in the raw slots at `dst` as copies of `src`.
    ///
    /// # Safety
    ///
    /// `src..src + count` must be live, `dst..dst + count` raw, and the two must not overlap.
    /// If a copy panics, the values already constructed are destroyed again.
    unsafe fn copy_construct(src: *const T, dst: *mut T, count: usize);

    /// Overwrites `count` live values at `dst` with copies of `src`.
    ///
    /// # Safety
    ///
    /// Both ranges must be live and must not overlap.
    unsafe fn copy_assign(src: *const T, dst: *mut T, count: usize);
}

impl<T: Copy> CopyStrategy<T> for Bitwise {
    #[inline]
    unsafe fn copy_construct(src: *const T, dst: *mut T, count: usize) {
        if count == 0 {
            return;
        }
        ptr::copy_nonoverlapping(src, dst, count);
    }

    #[inline]
    unsafe fn copy_assign(src: *const T, dst: *mut T, count: usize) {
        if count == 0 {
            return;
        }
        ptr::copy_nonoverlapping(src, dst, count);
    }
}

impl<T: Clone> CopyStrategy<T> for ElementWise {
    unsafe fn copy_construct(src: *const T, dst: *mut T, count: usize) {
        construct_with(dst, count, |i| (*src.add(i)).clone());
    }

    unsafe fn copy_assign(src: *const T, dst: *mut T, count: usize) {
        for i in 0..count {
            (*dst.add(i)).clone_from(&*src.add(i));
        }
    }
}

/// Construction of `Self` from a value of another type, used when a container is filled from
/// `U` elements.
pub trait ConstructFrom<U>: Sized {
    fn construct_from(source: &U) -> Self;

    fn assign_from(&mut self, source: &U) {
        *self = Self::construct_from(source);
    }
}

impl<T: Clone> ConstructFrom<T> for T {
    #[inline]
    fn construct_from(source: &T) -> T {
        source.clone()
    }

    #[inline]
    fn assign_from(&mut self, source: &T) {
        self.clone_from(source);
    }
}

macro_rules! widening_construct_from {
    ($($from:ty => $($to:ty),+;)*) => {
        $($(
            impl ConstructFrom<$from> for $to {
                #[inline]
                fn construct_from(source: &$from) -> $to {
                    <$to>::from(*source)
                }
            }
        )+)*
    };
}

widening_construct_from! {
    u8 => u16, u32, u64, u128, usize, i16, i32, i64, i128;
    u16 => u32, u64, u128, usize, i32, i64, i128;
    u32 => u64, u128, i64, i128;
    u64 => u128, i128;
    i8 => i16, i32, i64, i128, isize;
    i16 => i32, i64, i128, isize;
    i32 => i64, i128;
    i64 => i128;
    f32 => f64;
}

impl<'a> ConstructFrom<&'a str> for String {
    fn construct_from(source: &&'a str) -> String {
        String::from(*source)
    }

    fn assign_from(&mut self, source: &&'a str) {
        self.clear();
        self.push_str(source);
    }
}

/// Destroys `count` live values at `ptr`, leaving raw slots. No-op for trivially destructible
/// types.
///
/// # Safety
///
/// `ptr..ptr + count` must be live.
#[inline]
pub unsafe fn destroy<T>(ptr: *mut T, count: usize) {
    if <IsTriviallyDestructible<T>>::VALUE || count == 0 {
        return;
    }
    ptr::drop_in_place(ptr::slice_from_raw_parts_mut(ptr, count));
}

/// Constructs `count` values at `dst`, the `i`-th from `make(i)`.
///
/// # Safety
///
/// `dst..dst + count` must be raw. If `make` panics, the values already constructed are
/// destroyed before unwinding continues.
pub unsafe fn construct_with<T, F: FnMut(usize) -> T>(dst: *mut T, count: usize, mut make: F) {
    let mut guard = InitGuard { start: dst, initialized: 0 };
    while guard.initialized < count {
        dst.add(guard.initialized).write(make(guard.initialized));
        guard.initialized += 1;
    }
    mem::forget(guard);
}

/// Default-constructs `count` values at `dst`.
///
/// # Safety
///
/// Same contract as [`construct_with`].
pub unsafe fn construct_default<T: Default>(dst: *mut T, count: usize) {
    construct_with(dst, count, |_| T::default());
}

/// Constructs `count` values of `T` at `dst` from the `U` values at `src`.
///
/// # Safety
///
/// Same contract as [`CopyStrategy::copy_construct`].
pub unsafe fn convert_construct<T, U>(src: *const U, dst: *mut T, count: usize)
    where T: ConstructFrom<U>
{
    construct_with(dst, count, |i| T::construct_from(&*src.add(i)));
}

/// Assigns `count` live values of `T` at `dst` from the `U` values at `src`.
///
/// # Safety
///
/// Same contract as [`CopyStrategy::copy_assign`].
pub unsafe fn convert_assign<T, U>(src: *const U, dst: *mut T, count: usize)
    where T: ConstructFrom<U>
{
    for i in 0..count {
        (*dst.add(i)).assign_from(&*src.add(i));
    }
}

/// Copies a single value through `T`'s copy strategy.
pub fn copy_one<T, S: CopyStrategy<T>>(source: &T) -> T {
    let mut slot = MaybeUninit::<T>::uninit();
    unsafe {
        S::copy_construct(source, slot.as_mut_ptr(), 1);
        slot.assume_init()
    }
}

/// Destroys the initialized prefix of a range if construction unwinds.
struct InitGuard<T> {
    start: *mut T,
    initialized: usize,
}

impl<T> Drop for InitGuard<T> {
    fn drop(&mut self) {
        unsafe { destroy(self.start, self.initialized) };
    }
}

#[cfg(test)]
mod lifecycle_tests {
    use super::*;
    use crate::tracker::{counter, Tracked};
    use std::mem::MaybeUninit;

    fn slots<T, const N: usize>() -> [MaybeUninit<T>; N] {
        unsafe { MaybeUninit::uninit().assume_init() }
    }

    #[test]
    fn element_wise_relocation_moves_and_destroys_each_value_once() {
        let counts = counter();
        let mut src = slots::<Tracked, 3>();
        let mut dst = slots::<Tracked, 3>();
        unsafe {
            construct_with(src.as_mut_ptr() as *mut Tracked, 3, |i| Tracked::new(i as i32, &counts));
            <ElementWise as MoveStrategy<Tracked>>::relocate(
                src.as_mut_ptr() as *mut Tracked,
                dst.as_mut_ptr() as *mut Tracked,
                3,
                Direction::FrontToBack,
            );
        }
        let c = *counts.borrow();
        assert_eq!(3, c.constructed);
        assert_eq!(3, c.move_constructed);
        assert_eq!(3, c.destroyed);
        unsafe {
            let moved = dst.as_mut_ptr() as *mut Tracked;
            assert_eq!(2, (*moved.add(2)).value);
            assert_eq!(1, (*moved.add(2)).relocations);
            destroy(moved, 3);
        }
        assert_eq!(6, counts.borrow().destroyed);
    }

    #[test]
    fn back_to_front_shift_keeps_values_in_order() {
        let counts = counter();
        let mut buf = slots::<Tracked, 4>();
        let base = buf.as_mut_ptr() as *mut Tracked;
        unsafe {
            construct_with(base, 3, |i| Tracked::new(10 + i as i32, &counts));
            <ElementWise as MoveStrategy<Tracked>>::relocate(base, base.add(1), 3, Direction::BackToFront);
            base.write(Tracked::new(9, &counts));
            let values: Vec<i32> = (0..4).map(|i| (*base.add(i)).value).collect();
            assert_eq!(vec![9, 10, 11, 12], values);
            destroy(base, 4);
        }
        let c = *counts.borrow();
        assert_eq!(4, c.constructed);
        assert_eq!(3, c.move_constructed);
        assert_eq!(3 + 4, c.destroyed);
    }

    #[test]
    fn bitwise_relocation_handles_overlap() {
        let mut buf = [1u32, 2, 3, 4, 0];
        unsafe {
            <Bitwise as MoveStrategy<u32>>::relocate(buf.as_mut_ptr(), buf.as_mut_ptr().add(1), 4, Direction::FrontToBack);
        }
        assert_eq!([1, 1, 2, 3, 4], buf);
    }

    #[test]
    fn element_wise_copy_uses_clone_and_clone_from() {
        let counts = counter();
        let source = [Tracked::new(1, &counts), Tracked::new(2, &counts)];
        let mut target = slots::<Tracked, 2>();
        let target = target.as_mut_ptr() as *mut Tracked;
        unsafe {
            <ElementWise as CopyStrategy<Tracked>>::copy_construct(source.as_ptr(), target, 2);
            assert_eq!(2, counts.borrow().copy_constructed);
            <ElementWise as CopyStrategy<Tracked>>::copy_assign(source.as_ptr(), target, 2);
            assert_eq!(2, counts.borrow().copy_assigned);
            assert_eq!(2, (*target.add(1)).value);
            destroy(target, 2);
        }
        assert_eq!(2, counts.borrow().destroyed);
    }

    #[test]
    fn panicking_construction_destroys_the_built_prefix() {
        let counts = counter();
        let mut buf = slots::<Tracked, 4>();
        let base = buf.as_mut_ptr() as *mut Tracked;
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| unsafe {
            construct_with(base, 4, |i| {
                if i == 2 {
                    panic!("construction failed");
                }
                Tracked::new(i as i32, &counts)
            });
        }));
        assert!(result.is_err());
        assert_eq!(2, counts.borrow().constructed);
        assert_eq!(2, counts.borrow().destroyed);
    }

    #[test]
    fn heterogeneous_construction() {
        let source = [1i32, -2, 3];
        let mut target = slots::<i64, 3>();
        let target = target.as_mut_ptr() as *mut i64;
        unsafe {
            convert_construct(source.as_ptr(), target, 3);
            assert_eq!(-2i64, *target.add(1));
        }
        let mut name = String::from("old");
        name.assign_from(&"new");
        assert_eq!("new", name);
    }

    #[test]
    fn destroy_skips_trivial_types() {
        let mut values = [1u8, 2, 3];
        unsafe { destroy(values.as_mut_ptr(), 3) };
        assert_eq!([1, 2, 3], values);
    }
}
