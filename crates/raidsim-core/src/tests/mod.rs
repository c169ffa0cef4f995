//! Cross-module tests of the simulation core.
//!
//! - `determinism.rs`: same spec and seed reproduce bit-identical results
//! - `scenarios.rs`: end-to-end encounters with hand-checkable outcomes
//! - `helpers.rs`: spec builders shared by both

mod determinism;
mod helpers;
