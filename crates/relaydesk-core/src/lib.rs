//! Relay logic and repository trait definitions for Relaydesk.
//!
//! This crate defines the "ports" (repository and transport traits) that the
//! infrastructure layer implements, the administrator command grammar, and
//! the relay engine that ties them together. It depends only on
//! `relaydesk-types` -- never on `relaydesk-infra` or any database/IO crate.

pub mod command;
pub mod relay;
pub mod repository;
pub mod transport;
