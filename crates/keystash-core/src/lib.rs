//! # Keystash Core
//!
//! Core types and error definitions shared by the Keystash crates.
//! Cache keys, namespaces, and the unified error type live here so that
//! store implementations and accessors agree on them.

pub mod error;
pub mod key;
pub mod result;

pub use error::*;
pub use key::*;
pub use result::*;
