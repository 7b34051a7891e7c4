//! Allocator-parameterized containers whose element handling is chosen per type.
//!
//! Every element type declares a [`Lifecycle`] profile: how its values move between slots and
//! how they are copied. [`Array`] and the small aggregates ([`CompressedPair`], [`Optional`],
//! [`UniquePointer`]) relocate bitwise-movable values with a single `memmove` and call the
//! per-element hooks only for types that need them.

#[macro_use]
mod logging;

pub mod traits;
pub mod lifecycle;
mod allocator;
mod compressed_pair;
mod array;
mod optional;
mod unique_pointer;

pub use traits::{Lifecycle, Strategy, Bitwise, ElementWise, Unavailable, Meet, MeetOf, Predicate};
pub use lifecycle::{Relocate, Direction, MoveStrategy, CopyStrategy, ConstructFrom};
pub use allocator::{Allocator, Block, Heap, Counting, AllocError, TryReserveError};
pub use compressed_pair::CompressedPair;
pub use array::Array;
pub use optional::Optional;
pub use unique_pointer::{UniquePointer, Deleter, DefaultDeleter};

#[cfg(test)]
mod tracker;
