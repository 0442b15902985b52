//! Shared types, adapter traits, and error types for the Gateward
//! admission-control layer.
//!
//! This crate contains the foundational types shared between the core
//! crate and all counter-store adapter implementations. Extracting these
//! into a separate crate allows adapters to compile in parallel with the
//! core's components.

pub mod counter_store;
pub mod error;
pub mod prelude;
pub mod types;

// vim: ts=4
