//! Room lifecycle phases derived from the shared document.
//!
//! Unlike an in-process state machine, the authoritative state lives in the
//! room document itself, so the phase is a pure projection of a document
//! snapshot (or its absence). The legal flow is
//! `Waiting -> InProgress -> Finished`, with `InProgress -> Waiting` only via
//! an explicit host restart and any phase collapsing to `Closed` when the
//! document is deleted.

use crate::room::model::Room;

/// Authoritative lifecycle states of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// Pre-game lobby: participants may join and leave freely.
    Waiting,
    /// Host timer loop active, `current_question_index` advancing.
    InProgress,
    /// Question list exhausted; scores frozen for the leaderboard read.
    Finished,
    /// Room document deleted. Terminal and unrecoverable.
    Closed,
}

impl RoomPhase {
    /// Project a phase from a watched document snapshot.
    pub fn of(snapshot: Option<&Room>) -> Self {
        let Some(room) = snapshot else {
            return RoomPhase::Closed;
        };
        if room.is_finished() {
            RoomPhase::Finished
        } else if room.game_started {
            RoomPhase::InProgress
        } else {
            RoomPhase::Waiting
        }
    }

    /// Whether participants may still join in this phase.
    pub fn accepts_joins(&self) -> bool {
        matches!(self, RoomPhase::Waiting)
    }
}
