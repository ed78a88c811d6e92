//! Input/output helpers.
//!
//! - history CSV ingest + validation (`ingest`)
//! - forecast CSV exports and reload (`export`)
//! - run summary JSON read/write (`summary`)

pub mod export;
pub mod ingest;
pub mod summary;

pub use export::*;
pub use ingest::*;
pub use summary::*;
