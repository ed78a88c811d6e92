//! Mathematical utilities: yearly Fourier basis and least squares.

pub mod basis;
pub mod ols;

pub use basis::*;
pub use ols::*;
