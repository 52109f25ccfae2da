//! Conversation store: messages and per-session turn state.

pub mod ids;
pub mod message;
pub mod state;

pub use ids::SessionId;
pub use message::{Message, Role};
pub use state::{ConversationSnapshot, ConversationState, TurnPhase};
