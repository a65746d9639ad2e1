//! Client-side orchestration for the rock/paper/scissors wager game.
//!
//! The ledger owns the game logic. This crate picks the coins that fund a
//! wager, builds and submits the play call once per round, decodes the
//! `GameResult` event the ledger emits, keeps the score tally, polls balances
//! after writes, and remembers which collectible skin each account shows for
//! each move.

pub mod assets;
pub mod collectibles;
pub mod config;
pub mod error;
pub mod ledger;
pub mod moves;
pub mod outcome;
pub mod reconciler;
pub mod round;
pub mod session;
pub mod skins;
pub mod submitter;
pub mod transaction;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use error::{
    Error,
    Result,
};
pub use ledger::{
    Address,
    LedgerReader,
    ObjectId,
    SigningProvider,
};
pub use moves::{
    MoveChoice,
    Outcome,
    determine_outcome,
};
pub use session::{
    GameSession,
    RoundReport,
};
