//! # Transcript
//!
//! The append-only message log shared by every actor in a run.
//!
//! A transcript belongs to exactly one run. Sequence numbers start at 0 (the
//! seeded task) and increase by one per appended message.

pub mod log;
pub mod message;

pub use log::Transcript;
pub use message::{render_history, ContentPart, Message, MessageContent, ToolCall, TASK_SOURCE};
