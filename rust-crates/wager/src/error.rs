use crate::moves::{
    MoveChoice,
    Outcome,
};
use thiserror::Error;

/// Everything that can go wrong while playing a round or talking to the
/// ledger.
///
/// Variants that could misattribute a result or misrepresent funds are
/// surfaced to the player. `StoreParse` and `Storage` are recovered inside
/// the skin store and never reach the UI.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("insufficient funds: need {required}, have {available}")]
    InsufficientFunds { required: u64, available: u64 },
    #[error("stake {0} is not one of the allowed stakes")]
    StakeNotAllowed(u64),
    #[error("amount must be greater than zero")]
    ZeroAmount,
    #[error("{0} whole tokens overflow the base-unit range")]
    AmountOverflow(u64),
    #[error("no account connected")]
    NoAccount,
    #[error("a round is already in progress")]
    RoundInProgress,
    #[error("signing declined: {0}")]
    SigningDeclined(String),
    #[error("submission failed: {0}")]
    SubmissionFailed(String),
    #[error("no GameResult event in transaction {digest}")]
    EventNotFound { digest: String },
    #[error("schema mismatch on `{field}`: {reason}")]
    SchemaMismatch { field: String, reason: String },
    #[error("unknown move code {0}")]
    UnknownMoveCode(u8),
    #[error("unknown outcome code {0}")]
    UnknownOutcomeCode(u8),
    #[error("ledger reported {reported} for {player} against {house}")]
    InconsistentOutcome {
        player: MoveChoice,
        house: MoveChoice,
        reported: Outcome,
    },
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("ledger read failed: {0}")]
    Ledger(String),
    #[error("stored preferences unreadable: {0}")]
    StoreParse(String),
    #[error("preference storage failed: {0}")]
    Storage(String),
    #[error("invalid mint request: {0}")]
    InvalidMintRequest(String),
    #[error("no faucet configured for this deployment")]
    FaucetUnavailable,
}

impl Error {
    pub fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::SchemaMismatch {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for rejections the player can recover from by playing again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::SigningDeclined(_) | Error::SubmissionFailed(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
