//! # Turn State Machine
//!
//! `Idle → Selecting → Executing → (Terminated | Selecting)`, plus `Failed`
//! for aborted runs. Terminal states never resume.

use serde::{Deserialize, Serialize};

/// Stage of a selector-driven run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStage {
    /// Not started
    Idle,
    /// Asking the policy for the next speaker
    Selecting,
    /// Running the chosen actor
    Executing,
    /// Stopped normally
    Terminated,
    /// Aborted with an error
    Failed,
}

/// The run's turn state
#[derive(Debug, Clone)]
pub struct TurnState {
    pub stage: TurnStage,
    /// Completed actor turns
    pub turns: usize,
}

impl Default for TurnState {
    fn default() -> Self {
        Self {
            stage: TurnStage::Idle,
            turns: 0,
        }
    }
}

impl TurnState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move along the normal cycle; terminal stages stay put
    pub fn advance(&mut self) {
        self.stage = match self.stage {
            TurnStage::Idle => TurnStage::Selecting,
            TurnStage::Selecting => TurnStage::Executing,
            TurnStage::Executing => {
                self.turns += 1;
                TurnStage::Selecting
            }
            TurnStage::Terminated => TurnStage::Terminated,
            TurnStage::Failed => TurnStage::Failed,
        };
    }

    /// Stop normally
    pub fn terminate(&mut self) {
        if self.stage == TurnStage::Executing {
            self.turns += 1;
        }
        if !self.is_terminal() {
            self.stage = TurnStage::Terminated;
        }
    }

    /// Abort
    pub fn fail(&mut self) {
        if !self.is_terminal() {
            self.stage = TurnStage::Failed;
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.stage, TurnStage::Terminated | TurnStage::Failed)
    }
}
