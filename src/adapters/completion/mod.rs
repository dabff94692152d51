//! Completion service adapters.

pub mod anthropic;
pub mod scripted;

pub use anthropic::AnthropicCompletionService;
pub use scripted::{ScriptedCompletionService, ScriptedReply};
