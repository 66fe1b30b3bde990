//! # weir-core
//! Foundation types and traits for the Weir incentive engine.

pub mod constants;
pub mod error;
pub mod events;
pub mod traits;
pub mod types;
