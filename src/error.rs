//! Error taxonomy for room and game operations.

use thiserror::Error;
use validator::ValidationErrors;

use crate::store::StoreError;

/// Errors surfaced by Room Manager and Game Session operations.
///
/// Validation failures (`RoomFull`, `UsernameTaken`, `NotAuthorized`, ...)
/// are recoverable at the call site and meant for user-facing notification;
/// none of them mutate room state. `StoreUnavailable` wraps transient
/// backend failures.
#[derive(Debug, Error)]
pub enum RoomError {
    /// No room exists under the given code.
    #[error("room `{0}` not found")]
    RoomNotFound(String),
    /// The room already holds `max_players` participants.
    #[error("room `{0}` is full")]
    RoomFull(String),
    /// Joining is rejected once the host has started the game.
    #[error("game already started in room `{0}`")]
    GameAlreadyStarted(String),
    /// Another participant already uses this username (case-insensitive).
    #[error("username `{0}` is already taken")]
    UsernameTaken(String),
    /// A non-host caller attempted a host-only operation.
    #[error("only the room host may perform this operation")]
    NotAuthorized,
    /// The addressed participant is not a member of the room.
    #[error("participant `{0}` is not in the room")]
    ParticipantNotFound(String),
    /// Answer submitted while no game is in progress.
    #[error("no game is in progress in room `{0}`")]
    GameNotStarted(String),
    /// Ran out of attempts to allocate a collision-free room code.
    #[error("failed to allocate a unique room code after {attempts} attempts")]
    RoomCreation {
        /// Number of candidate codes that were tried.
        attempts: u32,
    },
    /// Room configuration rejected at creation time.
    #[error("invalid room configuration: {0}")]
    InvalidConfig(String),
    /// The question snapshot for a game start was unusable.
    #[error("invalid question set: {0}")]
    InvalidQuestions(String),
    /// Underlying document store failed.
    #[error("store unavailable")]
    StoreUnavailable(#[from] StoreError),
}

impl From<ValidationErrors> for RoomError {
    fn from(err: ValidationErrors) -> Self {
        RoomError::InvalidConfig(err.to_string())
    }
}
