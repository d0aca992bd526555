//! Shared room document and its sub-entities.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

use crate::catalog::Question;

/// Countdown seconds granted per question unless configured otherwise.
pub const DEFAULT_TIMER_SECONDS: u32 = 10;
/// Default participant capacity of a room.
pub const DEFAULT_MAX_PLAYERS: u32 = 8;

/// A room member tracked with a running score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    /// Stable user (or guest) identity.
    pub user_id: String,
    /// Display name, unique within the room case-insensitively.
    pub username: String,
    /// Running score; only ever incremented, one point per correct answer.
    #[serde(default)]
    pub score: u32,
}

impl Participant {
    /// New participant with a zero score.
    pub fn new(user_id: String, username: String) -> Self {
        Self {
            user_id,
            username,
            score: 0,
        }
    }
}

/// Closed room configuration, validated at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Eq)]
pub struct RoomConfig {
    /// Participant capacity, host included.
    #[validate(range(min = 1, max = 32))]
    pub max_players: u32,
    /// Countdown seconds granted per question.
    #[validate(range(min = 3, max = 120))]
    pub default_timer_seconds: u32,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: DEFAULT_MAX_PLAYERS,
            default_timer_seconds: DEFAULT_TIMER_SECONDS,
        }
    }
}

/// The shared, document-store-resident room record.
///
/// A room document's existence is its lifecycle marker: creation inserts it,
/// closure deletes it, and subscribers treat "no longer exists" as the
/// authoritative terminal signal. Only the host mutates `game_started`,
/// `timer`, `current_question_index`, and the frozen `questions` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Short collision-checked room code.
    pub id: String,
    /// Identity of the creator; confers exclusive progression authority.
    pub host_id: String,
    /// Creation/capacity settings, fixed at creation.
    pub config: RoomConfig,
    /// Ordered membership, unique by user id.
    pub participants: IndexMap<String, Participant>,
    /// False until the host starts; cleared again on restart or game end.
    pub game_started: bool,
    /// Question snapshot frozen at game start, empty while waiting.
    pub questions: Vec<Question>,
    /// Index of the question in play; reaching `questions.len()` ends the game.
    pub current_question_index: usize,
    /// Seconds remaining on the current question, host-decremented.
    pub timer: u32,
    /// Which participants have answered the current question.
    pub answers_received: IndexMap<String, bool>,
    /// Theme picked in the lobby, mutable until game start.
    pub selected_theme_name: Option<String>,
    /// Creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Room {
    /// Fresh waiting room with the creator as host and sole participant.
    pub fn new(id: String, host_id: String, host_username: String, config: RoomConfig) -> Self {
        let mut participants = IndexMap::new();
        participants.insert(
            host_id.clone(),
            Participant::new(host_id.clone(), host_username),
        );
        Self {
            id,
            host_id,
            config,
            participants,
            game_started: false,
            questions: Vec::new(),
            current_question_index: 0,
            timer: 0,
            answers_received: IndexMap::new(),
            selected_theme_name: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Whether the question list has been exhausted.
    ///
    /// Derived, never stored: true once a game's snapshot exists and the
    /// index has reached its length.
    pub fn is_finished(&self) -> bool {
        !self.questions.is_empty() && self.current_question_index >= self.questions.len()
    }

    /// The question currently in play, if any.
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question_index)
    }

    /// Whether every participant has answered the current question.
    pub fn all_answered(&self) -> bool {
        !self.participants.is_empty()
            && self
                .participants
                .keys()
                .all(|user_id| self.answers_received.get(user_id).copied().unwrap_or(false))
    }

    /// Whether a username is already taken by a different participant,
    /// compared case-insensitively.
    pub fn username_taken(&self, user_id: &str, username: &str) -> bool {
        self.participants.values().any(|participant| {
            participant.user_id != user_id
                && participant.username.eq_ignore_ascii_case(username)
        })
    }
}
