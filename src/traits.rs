//! Compile-time lifecycle profiles and the boolean predicates derived from them.
//!
//! Every element type stored in this crate's containers declares a [`Lifecycle`] profile: one
//! strategy marker for relocation (`Move`) and one for duplication (`Copy`). The containers never
//! inspect a type at run time; the profile selects the code path during monomorphization, and a
//! missing capability ([`Unavailable`]) simply leaves the dependent operation without an impl.

use std::marker::PhantomData;

/// A compile-time boolean.
pub trait Predicate {
    const VALUE: bool;
}

/// Always true.
pub struct True;

/// Always false.
pub struct False;

/// `A && B`.
pub struct And<A, B>(PhantomData<fn() -> (A, B)>);

/// `A || B`.
pub struct Or<A, B>(PhantomData<fn() -> (A, B)>);

/// `!A`.
pub struct Not<A>(PhantomData<fn() -> A>);

impl Predicate for True {
    const VALUE: bool = true;
}

impl Predicate for False {
    const VALUE: bool = false;
}

impl<A: Predicate, B: Predicate> Predicate for And<A, B> {
    const VALUE: bool = A::VALUE && B::VALUE;
}

impl<A: Predicate, B: Predicate> Predicate for Or<A, B> {
    const VALUE: bool = A::VALUE || B::VALUE;
}

impl<A: Predicate> Predicate for Not<A> {
    const VALUE: bool = !A::VALUE;
}

/// A way of performing one lifecycle operation.
///
/// The set of strategies is closed: [`Bitwise`], [`ElementWise`] and [`Unavailable`].
pub trait Strategy {
    /// The operation exists at all.
    const AVAILABLE: bool;
    /// The operation is equivalent to a raw byte copy.
    const BITWISE: bool;
}

/// The operation is a byte copy of the whole range; no constructor or destructor runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bitwise;

/// The operation runs the element's own constructor, assignment or destructor once per element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ElementWise;

/// The type does not support the operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Unavailable;

impl Strategy for Bitwise {
    const AVAILABLE: bool = true;
    const BITWISE: bool = true;
}

impl Strategy for ElementWise {
    const AVAILABLE: bool = true;
    const BITWISE: bool = false;
}

impl Strategy for Unavailable {
    const AVAILABLE: bool = false;
    const BITWISE: bool = false;
}

/// Type-level conjunction of two strategies: the cheapest strategy valid for an aggregate
/// holding one member of each.
pub trait Meet<S: Strategy>: Strategy {
    type Output: Strategy;
}

/// Shorthand for `<A as Meet<B>>::Output`.
pub type MeetOf<A, B> = <A as Meet<B>>::Output;

impl Meet<Bitwise> for Bitwise {
    type Output = Bitwise;
}

impl Meet<ElementWise> for Bitwise {
    type Output = ElementWise;
}

impl Meet<Unavailable> for Bitwise {
    type Output = Unavailable;
}

impl Meet<Bitwise> for ElementWise {
    type Output = ElementWise;
}

impl Meet<ElementWise> for ElementWise {
    type Output = ElementWise;
}

impl Meet<Unavailable> for ElementWise {
    type Output = Unavailable;
}

impl<S: Strategy> Meet<S> for Unavailable {
    type Output = Unavailable;
}

/// The lifecycle profile of a type.
///
/// `Move` describes how a live value is relocated from one slot to another and `Copy` how a
/// second value is constructed from, or assigned from, an existing one. Use
/// [`bitwise_lifecycle!`](crate::bitwise_lifecycle) or [`lifecycle!`](crate::lifecycle) to
/// declare a profile for your own types.
pub trait Lifecycle: Sized {
    type Move: Strategy;
    type Copy: Strategy;
}

/// Destruction is a no-op.
pub struct IsTriviallyDestructible<T>(PhantomData<fn() -> T>);

/// Values can be relocated.
pub struct IsMoveConstructible<T>(PhantomData<fn() -> T>);

/// Relocation is a byte copy.
pub struct IsBitwiseMovable<T>(PhantomData<fn() -> T>);

/// Values can be duplicated.
pub struct IsCopyConstructible<T>(PhantomData<fn() -> T>);

/// Duplication is a byte copy.
pub struct IsBitwiseCopyable<T>(PhantomData<fn() -> T>);

/// Existing values can be overwritten from another value.
pub struct IsCopyAssignable<T>(PhantomData<fn() -> T>);

/// Overwriting from another value is a byte copy.
pub struct IsBitwiseCopyAssignable<T>(PhantomData<fn() -> T>);

/// Every lifecycle operation of `T` is a byte copy or a no-op.
pub type IsTrivial<T> = And<And<IsBitwiseCopyable<T>, IsBitwiseMovable<T>>, IsTriviallyDestructible<T>>;

impl<T> Predicate for IsTriviallyDestructible<T> {
    const VALUE: bool = !std::mem::needs_drop::<T>();
}

impl<T: Lifecycle> Predicate for IsMoveConstructible<T> {
    const VALUE: bool = <T::Move as Strategy>::AVAILABLE;
}

impl<T: Lifecycle> Predicate for IsBitwiseMovable<T> {
    const VALUE: bool = <T::Move as Strategy>::BITWISE;
}

impl<T: Lifecycle> Predicate for IsCopyConstructible<T> {
    const VALUE: bool = <T::Copy as Strategy>::AVAILABLE;
}

impl<T: Lifecycle> Predicate for IsBitwiseCopyable<T> {
    const VALUE: bool = <T::Copy as Strategy>::BITWISE;
}

// Clone provides copy construction and copy assignment together.
impl<T: Lifecycle> Predicate for IsCopyAssignable<T> {
    const VALUE: bool = <T::Copy as Strategy>::AVAILABLE;
}

impl<T: Lifecycle> Predicate for IsBitwiseCopyAssignable<T> {
    const VALUE: bool = <T::Copy as Strategy>::BITWISE;
}

/// Returns `true` when each bitwise claim of `T`'s profile implies the weaker claim.
pub const fn is_consistent<T: Lifecycle>() -> bool {
    let moves = !<T::Move as Strategy>::BITWISE || <T::Move as Strategy>::AVAILABLE;
    let copies = !<T::Copy as Strategy>::BITWISE || <T::Copy as Strategy>::AVAILABLE;
    let trivial_copies = !<T::Copy as Strategy>::BITWISE || !std::mem::needs_drop::<T>();
    moves && copies && trivial_copies
}

/// Declares an all-bitwise [`Lifecycle`] profile for `Copy` types.
///
/// ```
/// #[derive(Clone, Copy)]
/// struct Point { x: i32, y: i32 }
///
/// relic::bitwise_lifecycle!(Point);
/// ```
#[macro_export]
macro_rules! bitwise_lifecycle {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::Lifecycle for $ty {
                type Move = $crate::Bitwise;
                type Copy = $crate::Bitwise;
            }
        )*
    };
}

/// Declares a [`Lifecycle`] profile with explicit strategies.
///
/// ```
/// #[derive(Clone)]
/// struct Name(String);
///
/// relic::lifecycle!(Name: move = Bitwise, copy = ElementWise);
/// ```
#[macro_export]
macro_rules! lifecycle {
    ($ty:ty: move = $mv:ident, copy = $cp:ident) => {
        impl $crate::Lifecycle for $ty {
            type Move = $crate::$mv;
            type Copy = $crate::$cp;
        }
    };
}

bitwise_lifecycle!(
    u8, u16, u32, u64, u128, usize,
    i8, i16, i32, i64, i128, isize,
    f32, f64, bool, char, (),
);

lifecycle!(String: move = Bitwise, copy = ElementWise);

impl<'a, T: ?Sized> Lifecycle for &'a T {
    type Move = Bitwise;
    type Copy = Bitwise;
}

impl<'a, T: ?Sized> Lifecycle for &'a mut T {
    type Move = Bitwise;
    type Copy = Unavailable;
}

impl<T: ?Sized> Lifecycle for *const T {
    type Move = Bitwise;
    type Copy = Bitwise;
}

impl<T: ?Sized> Lifecycle for *mut T {
    type Move = Bitwise;
    type Copy = Bitwise;
}

macro_rules! fn_pointer_lifecycle {
    ($($arg:ident),*) => {
        impl<R, $($arg),*> Lifecycle for fn($($arg),*) -> R {
            type Move = Bitwise;
            type Copy = Bitwise;
        }
    };
}

fn_pointer_lifecycle!();
fn_pointer_lifecycle!(A);
fn_pointer_lifecycle!(A, B);
fn_pointer_lifecycle!(A, B, C);

impl<T: Lifecycle, const N: usize> Lifecycle for [T; N] {
    type Move = T::Move;
    type Copy = T::Copy;
}

// The heap allocation stays put; only the owning pointer moves.
impl<T: Lifecycle> Lifecycle for Box<T>
    where T::Copy: Meet<ElementWise>
{
    type Move = Bitwise;
    type Copy = MeetOf<T::Copy, ElementWise>;
}

impl<T: Lifecycle> Lifecycle for Vec<T>
    where T::Copy: Meet<ElementWise>
{
    type Move = Bitwise;
    type Copy = MeetOf<T::Copy, ElementWise>;
}

// Element-wise relocation needs a slot address, which `Option` does not expose; use
// `Optional` for such payloads.
impl<T: Lifecycle<Move = Bitwise>> Lifecycle for Option<T> {
    type Move = Bitwise;
    type Copy = T::Copy;
}
