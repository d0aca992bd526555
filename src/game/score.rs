//! Score aggregation and leaderboard construction.

use serde::Serialize;

use crate::error::RoomError;
use crate::room::manager::RoomManager;
use crate::room::model::Participant;

/// One leaderboard row.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// Display name of the participant.
    pub username: String,
    /// Final score.
    pub score: u32,
}

/// Sort participants into a descending leaderboard.
///
/// The sort is stable so ties keep the store-returned participant order,
/// which keeps results deterministic across clients.
pub fn leaderboard<'a>(
    participants: impl IntoIterator<Item = &'a Participant>,
) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = participants
        .into_iter()
        .map(|participant| LeaderboardEntry {
            username: participant.username.clone(),
            score: participant.score,
        })
        .collect();
    entries.sort_by(|a, b| b.score.cmp(&a.score));
    entries
}

/// Single-entry leaderboard for a solo game.
pub fn solo_leaderboard(username: &str, score: u32) -> Vec<LeaderboardEntry> {
    vec![LeaderboardEntry {
        username: username.to_owned(),
        score,
    }]
}

/// Read the final leaderboard of a room game.
pub async fn room_results(
    manager: &RoomManager,
    room_id: &str,
) -> Result<Vec<LeaderboardEntry>, RoomError> {
    let room = manager
        .room(room_id)
        .await?
        .ok_or_else(|| RoomError::RoomNotFound(room_id.to_owned()))?;
    Ok(leaderboard(room.participants.values()))
}
