//! Crash-safe, cross-process issuance of sequential artifact IDs.
//!
//! Every [`IdGenerator::next_id`] call takes an OS file lock, reads the
//! counter store (rebuilding it from artifacts on disk when it is missing or
//! unreadable), formats and conflict-checks the next value, and atomically
//! replaces the store before releasing the lock.

pub mod config;
pub mod counter;
pub mod error;
pub mod family;
pub mod generator;
pub mod io;
pub mod lock;
pub mod paths;
pub mod recovery;
pub mod state;

pub use error::{IdError, Result};
pub use family::Family;
pub use generator::IdGenerator;
