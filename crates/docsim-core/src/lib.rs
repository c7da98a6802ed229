//! docsim-core
//!
//! Shared types, errors, configuration and vector math for the lexical and
//! semantic similarity engines.

pub mod config;
pub mod corpus;
pub mod error;
pub mod math;
pub mod rows;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
