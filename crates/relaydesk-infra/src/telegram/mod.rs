//! Telegram Bot API adapter.
//!
//! `client` performs the HTTP calls and implements the relay's `Transport`
//! port; `types` holds the wire structs and their conversion into
//! `InboundEvent`s.

pub mod client;
pub mod types;

pub use client::{TelegramClient, TelegramError};
