//! Cross-crate test suite for Tollgate.
//!
//! Scenario tests drive the in-memory chain through whole admission-policy
//! histories; property tests check timeline and commit invariants under
//! random inputs.

pub mod helpers;
