//! # ns-core
//!
//! Shared foundation for the NextStat distribution crates:
//! - [`Error`] / [`Result`]: the error taxonomy every fallible API returns
//! - [`VarId`] / [`Point`]: identifiers of upstream random variables and one
//!   concrete assignment of their values

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Point, VarId};

/// Crate version, shared by the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
