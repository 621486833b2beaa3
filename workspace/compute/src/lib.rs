//! Domain engines of the registrar: grade computation, teacher rosters and
//! academic record formatting.
//!
//! Each engine has a pure core working on already-loaded models and async
//! entry points that load what the core needs through a
//! [`sea_orm::DatabaseConnection`].

pub mod error;
pub mod grading;
pub mod record;
pub mod roster;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ComputeError, Result};
