//! Membership model implementations.
//!
//! Models are implemented as small, pure functions so that fitting/selection code
//! can stay generic over the model kind.

pub mod model;

pub use model::*;
