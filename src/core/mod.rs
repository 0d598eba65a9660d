//! Core primitives.
//!
//! Seeded randomness shared by the registry and every match.

pub mod rng;

pub use rng::{DeterministicRng, derive_match_seed};
