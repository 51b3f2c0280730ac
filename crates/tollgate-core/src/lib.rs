//! # tollgate-core
//! Foundation types and traits for the Tollgate admission-policy engine.

pub mod activation;
pub mod address;
pub mod commit;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod genesis;
pub mod merkle;
pub mod staging;
pub mod traits;
pub mod types;
