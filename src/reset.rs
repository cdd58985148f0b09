//! Confirmation gate in front of the destructive reset

use crate::notify::Navigator;
use crate::state::{JobState, JobStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Phase of the reset confirmation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPhase {
    /// No confirmation is shown
    #[default]
    Closed,
    /// The user is asked to confirm the reset
    Confirming,
}

/// Two-step confirm/cancel state machine for resetting the job
///
/// Requesting a reset never touches the job state; only [`confirm`] does.
///
/// [`confirm`]: ResetConfirmationFlow::confirm
#[derive(Debug, Default)]
pub struct ResetConfirmationFlow {
    phase: ResetPhase,
}

impl ResetConfirmationFlow {
    /// Create a closed flow
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase
    pub fn phase(&self) -> ResetPhase {
        self.phase
    }

    /// Open the confirmation; returns `false` if it was already open
    pub fn request(&mut self) -> bool {
        if self.phase == ResetPhase::Confirming {
            return false;
        }
        debug!("reset requested, awaiting confirmation");
        self.phase = ResetPhase::Confirming;
        true
    }

    /// Close the confirmation without resetting; returns `false` if it was closed
    pub fn cancel(&mut self) -> bool {
        if self.phase == ResetPhase::Closed {
            return false;
        }
        debug!("reset cancelled");
        self.phase = ResetPhase::Closed;
        true
    }

    /// Confirm the reset
    ///
    /// Closes the confirmation, returns the job state to its initial shape and
    /// signals navigation back to the submission view, in that order. Returns
    /// `false` and does nothing if no confirmation was open.
    pub fn confirm(&mut self, store: &JobStore, navigator: &dyn Navigator) -> bool {
        if self.phase == ResetPhase::Closed {
            return false;
        }
        self.phase = ResetPhase::Closed;
        store.update(JobState::reset);
        info!("job reset, returning to submission");
        navigator.return_to_submission();
        true
    }
}
