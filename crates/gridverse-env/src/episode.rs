//! Episode state machine and lifecycle management.
//!
//! An episode is a single rollout from reset to termination or truncation.
//! [`Episode`] tracks the lifecycle state, step count and accumulated reward.

use gridverse_core::error::LifecycleError;

// ---------------------------------------------------------------------------
// EpisodeState
// ---------------------------------------------------------------------------

/// Lifecycle state of the environment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EpisodeState {
    /// Before the first reset.
    #[default]
    Uninitialized,
    /// Accepting steps.
    Ready,
    /// Ended by the terminating function or the step limit.
    Done,
}

impl EpisodeState {
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Done)
    }

    /// `Ok` only in [`Ready`](Self::Ready).
    pub const fn require_ready(self) -> Result<(), LifecycleError> {
        match self {
            Self::Ready => Ok(()),
            Self::Uninitialized => Err(LifecycleError::Uninitialized),
            Self::Done => Err(LifecycleError::EpisodeDone),
        }
    }
}

// ---------------------------------------------------------------------------
// Episode
// ---------------------------------------------------------------------------

/// Statistics and lifecycle of the current episode.
#[derive(Clone, Debug, Default)]
pub struct Episode {
    pub state: EpisodeState,
    /// Steps taken this episode.
    pub step_count: u32,
    /// Sum of rewards this episode.
    pub total_reward: f32,
    /// Whether the last step hit the step limit.
    pub truncated: bool,
    /// Seed the environment generator was last seeded with.
    pub seed: Option<u64>,
    /// Number of resets since construction.
    pub episode_number: u32,
}

impl Episode {
    /// Start a new episode in `Ready`.
    pub const fn reset(&mut self, seed: Option<u64>) {
        self.state = EpisodeState::Ready;
        self.step_count = 0;
        self.total_reward = 0.0;
        self.truncated = false;
        if seed.is_some() {
            self.seed = seed;
        }
        self.episode_number += 1;
    }

    /// Count one step and its reward. Fails outside `Ready`.
    pub fn advance(&mut self, reward: f32) -> Result<(), LifecycleError> {
        self.state.require_ready()?;
        self.step_count += 1;
        self.total_reward += reward;
        Ok(())
    }

    pub const fn terminate(&mut self) {
        self.state = EpisodeState::Done;
    }

    /// Move to `Done` once `max_steps` steps have been taken. Returns `true`
    /// when this call ended the episode.
    pub fn check_truncation(&mut self, max_steps: Option<u32>) -> bool {
        match max_steps {
            Some(limit) if self.state.is_ready() && self.step_count >= limit => {
                self.state = EpisodeState::Done;
                self.truncated = true;
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.state.is_done()
    }

    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.state.is_ready()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
