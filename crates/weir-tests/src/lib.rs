//! Integration and adversarial test suite for the Weir engine.
//!
//! This crate contains end-to-end tests exercising the full incentive
//! lifecycle through the public façade, plus adversarial tests that
//! attempt to break the accounting invariants (reward conservation,
//! accumulator monotonicity, penalty splits) under hostile inputs.

pub mod helpers;
