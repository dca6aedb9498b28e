//! # stepwise-contracts
//!
//! Shared types, schemas, and contracts for the stepwise execution core.
//!
//! All crates in the workspace import from here. No execution logic lives in
//! this crate, only data definitions, small invariant helpers and the error
//! type.

pub mod error;
pub mod goal;
pub mod plan;
pub mod policy;
pub mod tool;
pub mod verify;
