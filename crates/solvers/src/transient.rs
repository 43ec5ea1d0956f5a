//! Solvers that march a rod forward in time.
//!
//! # Solvers
//!
//! - [`implicit`]: backward-difference implicit stepping with reported frames

pub mod implicit;
