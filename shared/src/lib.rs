//! Shared types for the time-entry ledger
//!
//! Contains only the vocabulary shared across component boundaries: entity
//! structs, id newtypes, status enums, and the logging setup used by the
//! service binary. Component-internal types stay in their components.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
