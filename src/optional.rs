use crate::lifecycle::{self, CopyStrategy, Direction, MoveStrategy, Relocate};
use crate::traits::{ElementWise, Lifecycle, Meet, MeetOf};
use std::fmt::{self, Debug};
use std::mem::{self, MaybeUninit};
use std::ptr;

/// A slot that may or may not hold a `T`.
///
/// Unlike `Option<T>`, the slot has a stable address, so element-wise movable values can be
/// relocated in place and copies go through `T`'s copy strategy.
pub struct Optional<T> {
    engaged: bool,
    slot: MaybeUninit<T>,
}

impl<T> Optional<T> {
    #[inline(always)]
    pub const fn none() -> Optional<T> {
        Optional { engaged: false, slot: MaybeUninit::uninit() }
    }

    #[inline(always)]
    pub const fn some(value: T) -> Optional<T> {
        Optional { engaged: true, slot: MaybeUninit::new(value) }
    }

    #[inline(always)]
    pub fn has_value(&self) -> bool {
        self.engaged
    }

    pub fn get(&self) -> Option<&T> {
        if self.engaged {
            Some(unsafe { &*self.slot.as_ptr() })
        } else {
            None
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        if self.engaged {
            Some(unsafe { &mut *self.slot.as_mut_ptr() })
        } else {
            None
        }
    }

    /// # Panics
    ///
    /// Panics when empty.
    pub fn value(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => panic!("Optional has no value"),
        }
    }

    /// # Panics
    ///
    /// Panics when empty.
    pub fn value_mut(&mut self) -> &mut T {
        match self.get_mut() {
            Some(value) => value,
            None => panic!("Optional has no value"),
        }
    }

    /// Destroys the current value, if any, and stores `value`.
    pub fn emplace(&mut self, value: T) -> &mut T {
        self.reset();
        self.slot = MaybeUninit::new(value);
        self.engaged = true;
        unsafe { &mut *self.slot.as_mut_ptr() }
    }

    /// Destroys the current value, if any.
    pub fn reset(&mut self) {
        if mem::replace(&mut self.engaged, false) {
            unsafe { lifecycle::destroy(self.slot.as_mut_ptr(), 1) };
        }
    }

    pub fn take(&mut self) -> Option<T> {
        if mem::replace(&mut self.engaged, false) {
            Some(unsafe { ptr::read(self.slot.as_ptr()) })
        } else {
            None
        }
    }

    pub fn into_option(mut self) -> Option<T> {
        self.take()
    }
}

impl<T> Drop for Optional<T> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T> Default for Optional<T> {
    fn default() -> Self {
        Optional::none()
    }
}

impl<T> From<Option<T>> for Optional<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Optional::some(value),
            None => Optional::none(),
        }
    }
}

impl<T> From<T> for Optional<T> {
    fn from(value: T) -> Self {
        Optional::some(value)
    }
}

impl<T> Clone for Optional<T>
    where T: Lifecycle, T::Copy: CopyStrategy<T>
{
    fn clone(&self) -> Self {
        match self.get() {
            Some(value) => Optional::some(lifecycle::copy_one::<T, T::Copy>(value)),
            None => Optional::none(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        match (self.engaged, source.get()) {
            (true, Some(value)) => unsafe {
                <T::Copy as CopyStrategy<T>>::copy_assign(value, self.slot.as_mut_ptr(), 1);
            },
            (false, Some(value)) => unsafe {
                <T::Copy as CopyStrategy<T>>::copy_construct(value, self.slot.as_mut_ptr(), 1);
                self.engaged = true;
            },
            (_, None) => self.reset(),
        }
    }
}

impl<T: Debug> Debug for Optional<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f.debug_tuple("Some").field(value).finish(),
            None => f.write_str("None"),
        }
    }
}

impl<T: PartialEq> PartialEq for Optional<T> {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl<T: Eq> Eq for Optional<T> {}

impl<T: Lifecycle> Lifecycle for Optional<T>
    where T::Copy: Meet<ElementWise>
{
    type Move = T::Move;
    type Copy = MeetOf<T::Copy, ElementWise>;
}

unsafe impl<T: Lifecycle> Relocate for Optional<T>
    where T::Move: MoveStrategy<T>
{
    unsafe fn relocate(src: *mut Self, dst: *mut Self) {
        let engaged = mem::replace(&mut (*src).engaged, false);
        ptr::addr_of_mut!((*dst).engaged).write(false);
        if engaged {
            <T::Move as MoveStrategy<T>>::relocate(
                (*src).slot.as_mut_ptr(),
                ptr::addr_of_mut!((*dst).slot) as *mut T,
                1,
                Direction::FrontToBack,
            );
            (*dst).engaged = true;
        }
    }
}

#[cfg(test)]
mod optional_tests {
    use super::*;
    use crate::tracker::{counter, Tracked, TrackedPod};
    use crate::traits::{IsBitwiseMovable, IsCopyConstructible, Predicate};
    use crate::unique_pointer::UniquePointer;
    use crate::Array;

    #[test]
    fn engage_and_reset() {
        let counts = counter();
        let mut optional = Optional::none();
        assert!(!optional.has_value());
        assert!(optional.get().is_none());
        optional.emplace(Tracked::new(1, &counts));
        assert_eq!(1, optional.value().value);
        optional.emplace(Tracked::new(2, &counts));
        assert_eq!(1, counts.borrow().destroyed);
        optional.value_mut().value += 1;
        assert_eq!(3, optional.value().value);
        optional.reset();
        optional.reset();
        assert_eq!(2, counts.borrow().destroyed);
        assert!(!optional.has_value());
    }

    #[test]
    #[should_panic(expected = "Optional has no value")]
    fn empty_value_panics() {
        let optional: Optional<u8> = Optional::none();
        optional.value();
    }

    #[test]
    fn take_and_conversions() {
        let mut optional: Optional<String> = Optional::from(String::from("a"));
        assert_eq!(Some(String::from("a")), optional.take());
        assert_eq!(None, optional.take());
        assert_eq!(Some(4), Optional::<i32>::from(Some(4)).into_option());
        assert_eq!(None, Optional::<u8>::from(None).into_option());
        assert_eq!("Some(4)", format!("{:?}", Optional::some(4)));
        assert_eq!("None", format!("{:?}", Optional::<u8>::default()));
    }

    #[test]
    fn drop_destroys_an_engaged_value() {
        let counts = counter();
        {
            let _engaged = Optional::some(Tracked::new(1, &counts));
            let _empty: Optional<Tracked> = Optional::none();
        }
        assert_eq!(1, counts.borrow().destroyed);
    }

    #[test]
    fn clone_goes_through_the_copy_strategy() {
        let counts = counter();
        let source = Optional::some(Tracked::new(7, &counts));
        let copy = source.clone();
        assert_eq!(1, counts.borrow().copy_constructed);
        assert_eq!(source, copy);

        let mut engaged = Optional::some(Tracked::new(1, &counts));
        engaged.clone_from(&source);
        assert_eq!(1, counts.borrow().copy_assigned);
        assert_eq!(7, engaged.value().value);

        let mut empty = Optional::none();
        empty.clone_from(&source);
        assert_eq!(2, counts.borrow().copy_constructed);

        let destroyed = counts.borrow().destroyed;
        engaged.clone_from(&Optional::none());
        assert!(!engaged.has_value());
        assert_eq!(destroyed + 1, counts.borrow().destroyed);
    }

    #[test]
    fn profile_follows_the_payload() {
        assert!(<IsBitwiseMovable<Optional<TrackedPod>>>::VALUE);
        assert!(!<IsBitwiseMovable<Optional<Tracked>>>::VALUE);
        assert!(<IsCopyConstructible<Optional<u32>>>::VALUE);
        assert!(!<IsCopyConstructible<Optional<UniquePointer<u32>>>>::VALUE);
    }

    #[test]
    fn element_wise_payload_is_relocated_in_place() {
        let counts = counter();
        let mut array: Array<Optional<Tracked>> = Array::new();
        array.emplace_back(Optional::some(Tracked::new(1, &counts)));
        array.emplace_back(Optional::none());
        array.emplace_at_to_ref(0, Optional::some(Tracked::new(0, &counts)));
        let c = *counts.borrow();
        assert_eq!(2, c.constructed);
        assert_eq!(2, c.move_constructed);
        assert_eq!(2, c.destroyed);
        assert_eq!(Some(2), array[1].get().map(|t| t.relocations));
        assert!(!array[2].has_value());
    }
}
