//! Infrastructure layer for Relaydesk.
//!
//! Contains implementations of the ports defined in `relaydesk-core`:
//! SQLite conversation storage, the Telegram Bot API transport, and the
//! configuration/data-directory loaders.

pub mod config;
pub mod sqlite;
pub mod telegram;
