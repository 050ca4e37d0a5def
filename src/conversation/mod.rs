//! Trip-planning conversation: steps, inputs, the pure transition function
//! and the engine that applies it to stored sessions.

pub mod effect;
pub mod engine;
pub mod event;
pub mod parser;
pub mod prompts;
pub mod state;
pub mod transition;

pub use effect::{Effect, InlineAction, Reply, SUMMARY_CALLBACK};
pub use engine::ConversationEngine;
pub use event::{Event, Input};
pub use state::ConversationState;
pub use transition::{TransitionResult, transition};
