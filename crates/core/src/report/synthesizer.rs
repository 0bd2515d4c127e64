//! # Transcript Synthesizer
//!
//! Extracts a single final artifact from a finished transcript:
//!
//! 1. the first substantive message from the designated final role
//! 2. otherwise every substantive message under a `## source` heading
//! 3. otherwise every non-empty message, headed and separated
//!
//! Payloads are normalized to text once, before any tier looks at them.

use serde::{Deserialize, Serialize};

use super::normalize::{looks_like_tool_invocation, normalize_content};
use crate::transcript::Transcript;

/// Heading of the last-resort tier
const PROCESS_LOG_TITLE: &str = "# Analysis Log";

/// Synthesizer thresholds; a message qualifies when its trimmed length exceeds them
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthesizerConfig {
    /// Actor whose message is preferred as the artifact
    pub final_role: String,
    pub final_min_chars: usize,
    pub substantive_min_chars: usize,
    pub fallback_min_chars: usize,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            final_role: "ReportGenerator".to_string(),
            final_min_chars: 10,
            substantive_min_chars: 50,
            fallback_min_chars: 5,
        }
    }
}

/// Priority-fallback artifact extraction
#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    config: SynthesizerConfig,
}

impl Synthesizer {
    pub fn new(config: SynthesizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SynthesizerConfig {
        &self.config
    }

    /// Produce the artifact for `transcript`. Empty when nothing qualifies.
    pub fn synthesize(&self, transcript: &Transcript) -> String {
        let texts: Vec<(&str, String)> = transcript
            .iter()
            .filter_map(|m| normalize_content(&m.content).map(|text| (m.source.as_str(), text)))
            .collect();

        if let Some(report) = self.final_role_message(&texts) {
            tracing::debug!(role = %self.config.final_role, "using final role message");
            return report;
        }

        let substantive = self.substantive_sections(&texts);
        if !substantive.is_empty() {
            tracing::debug!("final role silent, using substantive sections");
            return substantive;
        }

        tracing::debug!("no substantive content, using process log");
        self.process_log(&texts)
    }

    fn final_role_message(&self, texts: &[(&str, String)]) -> Option<String> {
        texts
            .iter()
            .find(|(source, text)| {
                *source == self.config.final_role
                    && text.trim().chars().count() > self.config.final_min_chars
                    && !looks_like_tool_invocation(text)
            })
            .map(|(_, text)| text.clone())
    }

    fn substantive_sections(&self, texts: &[(&str, String)]) -> String {
        texts
            .iter()
            .filter(|(_, text)| {
                text.trim().chars().count() > self.config.substantive_min_chars
                    && !looks_like_tool_invocation(text)
            })
            .map(|(source, text)| format!("## {}\n\n{}", source, text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn process_log(&self, texts: &[(&str, String)]) -> String {
        let sections: Vec<String> = texts
            .iter()
            .filter(|(_, text)| text.trim().chars().count() > self.config.fallback_min_chars)
            .map(|(source, text)| format!("## {}\n\n{}\n\n---\n\n", source, text))
            .collect();
        if sections.is_empty() {
            return String::new();
        }
        format!("{}\n\n{}", PROCESS_LOG_TITLE, sections.concat())
    }
}
