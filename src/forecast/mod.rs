//! Membership forecasting and contact-rate conversion.
//!
//! Monthly membership history is fitted with the regression family in
//! `crate::fit`, projected forward, and converted into monthly call volume.

pub mod membership;
pub mod volume;

pub use membership::*;
pub use volume::*;
