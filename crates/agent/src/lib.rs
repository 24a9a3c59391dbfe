//! Chat runtime for the print shop portal.
//!
//! Owns one [`ConversationContext`](printdesk_core::ConversationContext) per
//! session and feeds user input through the
//! [`FlowRegistry`](printdesk_core::FlowRegistry) one turn at a time.
//!
//! # Key Types
//!
//! - `ChatRuntime` - entry point used by transports and the CLI
//! - `SessionArena` - session state keyed by session id
//! - `ChatReply` - what a transport renders after each turn

pub mod runtime;
pub mod session;

pub use runtime::{ChatReply, ChatRuntime, RuntimeError};
pub use session::{SessionArena, SessionEntry};
