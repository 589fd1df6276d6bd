//! Core domain models shared across all Voyage crates.
//!
//! These are the "truth" types: what the store holds and the API serializes.
//! Identifiers are UUID v7, so they sort by creation time.

pub mod follow;
pub mod listing;
pub mod vacation;

pub use follow::*;
pub use listing::*;
pub use vacation::*;
