//! Hash algorithm implementations.

mod difference;

pub use difference::{DifferenceHasher, DEFAULT_HASH_SIZE};
