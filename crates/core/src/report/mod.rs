//! # Report
//!
//! Post-run artifact extraction and storage.
//!
//! - `normalize` - message payload → plain text
//! - `synthesizer` - priority-fallback extraction of the final artifact
//! - `document` - markdown framing and timestamped identifiers
//! - `sink` - durable storage behind the [`ArtifactSink`] contract

pub mod document;
pub mod normalize;
pub mod sink;
pub mod synthesizer;

pub use document::{report_identifier, ReportDocument};
pub use normalize::{looks_like_tool_invocation, normalize_content};
pub use sink::{ArtifactSink, FileArtifactSink, MemoryArtifactSink, SqliteArtifactSink};
pub use synthesizer::{Synthesizer, SynthesizerConfig};
