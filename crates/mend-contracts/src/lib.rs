//! # mend-contracts
//!
//! Shared types and error contracts for the MEND policy repair engine.
//!
//! Every crate in the workspace imports from here. No business logic lives in
//! this crate, only data definitions and error types.

pub mod document;
pub mod error;
pub mod repair;
