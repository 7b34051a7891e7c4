use crate::lifecycle::{Direction, MoveStrategy, Relocate};
use crate::traits::{Lifecycle, Meet, MeetOf};
use std::ptr;

/// Two values stored side by side, where a zero-sized half takes no space.
///
/// Containers use it to keep a stateless allocator or deleter next to their data pointer
/// without growing. Every derived capability (`Default`, `Clone`, `Copy`, comparison) holds
/// exactly when it holds for both halves, and so does the [`Lifecycle`] profile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompressedPair<A, B> {
    first: A,
    second: B,
}

impl<A, B> CompressedPair<A, B> {
    #[inline(always)]
    pub const fn new(first: A, second: B) -> CompressedPair<A, B> {
        CompressedPair { first, second }
    }

    #[inline(always)]
    pub fn first(&self) -> &A {
        &self.first
    }

    #[inline(always)]
    pub fn first_mut(&mut self) -> &mut A {
        &mut self.first
    }

    #[inline(always)]
    pub fn second(&self) -> &B {
        &self.second
    }

    #[inline(always)]
    pub fn second_mut(&mut self) -> &mut B {
        &mut self.second
    }

    /// Borrows both halves at once.
    #[inline(always)]
    pub fn as_mut(&mut self) -> (&mut A, &mut B) {
        (&mut self.first, &mut self.second)
    }

    pub fn into_inner(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A, B> From<(A, B)> for CompressedPair<A, B> {
    fn from((first, second): (A, B)) -> Self {
        CompressedPair::new(first, second)
    }
}

impl<A: Lifecycle, B: Lifecycle> Lifecycle for CompressedPair<A, B>
    where
        A::Move: Meet<B::Move>,
        A::Copy: Meet<B::Copy>,
{
    type Move = MeetOf<A::Move, B::Move>;
    type Copy = MeetOf<A::Copy, B::Copy>;
}

// Each half is relocated with its own strategy, so a bitwise half stays a byte copy.
unsafe impl<A: Lifecycle, B: Lifecycle> Relocate for CompressedPair<A, B>
    where
        A::Move: MoveStrategy<A>,
        B::Move: MoveStrategy<B>,
{
    unsafe fn relocate(src: *mut Self, dst: *mut Self) {
        <A::Move as MoveStrategy<A>>::relocate(
            ptr::addr_of_mut!((*src).first),
            ptr::addr_of_mut!((*dst).first),
            1,
            Direction::FrontToBack,
        );
        <B::Move as MoveStrategy<B>>::relocate(
            ptr::addr_of_mut!((*src).second),
            ptr::addr_of_mut!((*dst).second),
            1,
            Direction::FrontToBack,
        );
    }
}
