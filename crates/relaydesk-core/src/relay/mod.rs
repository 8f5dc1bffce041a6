//! The relay between clients and the administrator.
//!
//! `engine` implements the inbound/outbound message flows and the two query
//! flows on top of a `ConversationRepository` and a `Transport`. `render`
//! turns their results into the plain text the administrator sees.

pub mod engine;
pub mod render;

pub use engine::{AdminReply, RelayEngine};
