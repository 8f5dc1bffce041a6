//! Shared domain types for Relaydesk.
//!
//! This crate contains the core domain types used across the relay:
//! Client, Message, relay configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod client;
pub mod config;
pub mod error;
pub mod message;
