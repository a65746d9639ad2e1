//! Round lifecycle as pure transitions over plain values.
//!
//! ```text
//! Idle --begin--> Submitting --apply_outcome--> Settled --acknowledge--> Idle
//!                     |  \--undecoded--> Undecoded --acknowledge--> Idle
//!                     \--reject--> Idle
//! ```

use crate::{
    error::{
        Error,
        Result,
    },
    moves::{
        MoveChoice,
        Outcome,
    },
    outcome::DecodedOutcome,
};
use serde::{
    Deserialize,
    Serialize,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    #[default]
    Idle,
    Submitting,
    /// Outcome decoded and shown, waiting for the player to acknowledge.
    Settled,
    /// Confirmed on the ledger but the result could not be decoded.
    Undecoded,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundState {
    pub move_choice: Option<MoveChoice>,
    pub opponent_choice: Option<MoveChoice>,
    pub outcome: Option<Outcome>,
    pub phase: RoundPhase,
}

impl RoundState {
    pub fn processing(&self) -> bool {
        self.phase == RoundPhase::Submitting
    }

    pub fn is_idle(&self) -> bool {
        self.phase == RoundPhase::Idle
    }

    pub fn begin(&self, choice: MoveChoice) -> Result<RoundState> {
        if !self.is_idle() {
            return Err(Error::RoundInProgress);
        }
        Ok(RoundState {
            move_choice: Some(choice),
            opponent_choice: None,
            outcome: None,
            phase: RoundPhase::Submitting,
        })
    }

    /// Nothing was committed: back to a clean idle round.
    pub fn reject(&self) -> RoundState {
        RoundState::default()
    }

    pub fn undecoded(&self) -> RoundState {
        RoundState {
            phase: RoundPhase::Undecoded,
            ..*self
        }
    }

    pub fn acknowledge(&self) -> Result<RoundState> {
        match self.phase {
            RoundPhase::Submitting => Err(Error::RoundInProgress),
            _ => Ok(RoundState::default()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreTally {
    pub wins: u64,
    pub losses: u64,
    pub draws: u64,
}

impl ScoreTally {
    pub fn record(self, outcome: Outcome) -> ScoreTally {
        match outcome {
            Outcome::Win => ScoreTally {
                wins: self.wins + 1,
                ..self
            },
            Outcome::Lose => ScoreTally {
                losses: self.losses + 1,
                ..self
            },
            Outcome::Draw => ScoreTally {
                draws: self.draws + 1,
                ..self
            },
        }
    }

    pub fn rounds(&self) -> u64 {
        self.wins + self.losses + self.draws
    }
}

/// Settles a submitted round with its decoded outcome and counts it once.
pub fn apply_outcome(
    state: &RoundState,
    tally: ScoreTally,
    decoded: &DecodedOutcome,
) -> (RoundState, ScoreTally) {
    let settled = RoundState {
        move_choice: state.move_choice,
        opponent_choice: Some(decoded.opponent),
        outcome: Some(decoded.outcome),
        phase: RoundPhase::Settled,
    };
    (settled, tally.record(decoded.outcome))
}
