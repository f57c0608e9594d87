//! Run configuration for Vigil.
//!
//! This module defines the check set and the global knobs an invocation
//! runs with, how they are read from disk and how they are sanity checked.

mod methods;
mod types;

pub use types::{CheckSpec, Config, ConfigBuilder};
