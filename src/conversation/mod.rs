// src/conversation/mod.rs — Conversation core: prompts, sequencing, sessions

pub mod prompt;
pub mod registry;
pub mod reply;
pub mod sequencer;

pub use registry::{ConversationSession, SessionHandle, SessionRegistry};
pub use reply::{AssistantReply, Expression};
pub use sequencer::{ConversationStep, Progress, Sequencer, Speaker, Turn, TurnOutcome};
