//! Room lifecycle operations and live room watches.
//!
//! The manager is the only component that writes room documents. Every
//! mutation runs as a store transaction so concurrent clients (a host timer
//! tick racing a participant's answer, two participants answering in the
//! same instant) can never lose each other's writes.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_stream::stream;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::watch;
use tracing::{debug, info};
use validator::Validate;

use crate::catalog::Question;
use crate::error::RoomError;
use crate::room::code::{CodeGenerator, NumericCodeGenerator};
use crate::room::model::{Participant, Room, RoomConfig};
use crate::store::{Mutation, MutationOutcome, RoomStore};

/// Candidate codes tried before room creation gives up.
pub const CODE_ATTEMPTS: u32 = 16;

/// Result of a leave operation, so callers can tell a host-initiated
/// closure apart from a voluntary self-removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The participant left; the room lives on.
    Left,
    /// The room is gone, either because the host left or because it was
    /// already closed.
    RoomClosed,
}

/// Acknowledgement of an answer submission.
#[derive(Debug, Clone, Copy)]
pub struct AnswerAck {
    /// False when the participant had already answered this question; the
    /// duplicate submission changed nothing.
    pub accepted: bool,
    /// True once every participant has answered the current question, the
    /// host's cue to reveal early.
    pub all_answered: bool,
}

/// Derived progression snapshot pushed to game-state watchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameStateSnapshot {
    /// Seconds remaining on the current question.
    pub timer: u32,
    /// Index of the question in play.
    pub current_question_index: usize,
    /// Whether the question list has been exhausted. Computed, never stored.
    pub is_finished: bool,
}

impl GameStateSnapshot {
    fn of(room: &Room) -> Self {
        Self {
            timer: room.timer,
            current_question_index: room.current_question_index,
            is_finished: room.is_finished(),
        }
    }
}

/// Authoritative room lifecycle and progression operations.
pub struct RoomManager {
    store: Arc<dyn RoomStore>,
    codes: Box<dyn CodeGenerator>,
}

impl RoomManager {
    /// Manager over a store, generating numeric room codes.
    pub fn new(store: Arc<dyn RoomStore>) -> Self {
        Self::with_code_generator(store, Box::new(NumericCodeGenerator))
    }

    /// Manager with a custom code source (tests force collisions this way).
    pub fn with_code_generator(store: Arc<dyn RoomStore>, codes: Box<dyn CodeGenerator>) -> Self {
        Self { store, codes }
    }

    /// Create a room with the caller as host and sole participant.
    ///
    /// Candidate codes are collision-checked against the store; after
    /// [`CODE_ATTEMPTS`] taken codes the operation fails with
    /// [`RoomError::RoomCreation`].
    pub async fn create_room(
        &self,
        host_id: &str,
        host_username: &str,
        config: RoomConfig,
    ) -> Result<String, RoomError> {
        config.validate()?;

        for _ in 0..CODE_ATTEMPTS {
            let code = self.codes.generate();
            let room = Room::new(
                code.clone(),
                host_id.to_owned(),
                host_username.to_owned(),
                config.clone(),
            );
            if self.store.insert_room(room).await? {
                info!(room = %code, host = %host_id, "room created");
                return Ok(code);
            }
            debug!(room = %code, "room code collision, retrying");
        }

        Err(RoomError::RoomCreation {
            attempts: CODE_ATTEMPTS,
        })
    }

    /// Point-in-time snapshot of a room document.
    pub async fn room(&self, room_id: &str) -> Result<Option<Room>, RoomError> {
        Ok(self.store.get_room(room_id).await?)
    }

    /// Add a participant to a waiting room.
    ///
    /// Set-union semantics: re-joining under an already-enrolled user id is
    /// a no-op. All preconditions are checked inside the transaction, so
    /// concurrent joins cannot over-fill the room.
    pub async fn join_room(
        &self,
        room_id: &str,
        user_id: &str,
        username: &str,
    ) -> Result<(), RoomError> {
        let room_code = room_id.to_owned();
        let user = user_id.to_owned();
        let name = username.to_owned();
        self.mutate(
            room_id,
            Box::new(move |room| {
                if room.game_started {
                    return Err(RoomError::GameAlreadyStarted(room_code));
                }
                if room.participants.contains_key(&user) {
                    return Ok(());
                }
                if room.username_taken(&user, &name) {
                    return Err(RoomError::UsernameTaken(name));
                }
                if room.participants.len() as u32 >= room.config.max_players {
                    return Err(RoomError::RoomFull(room_code));
                }
                room.participants
                    .insert(user.clone(), Participant::new(user, name));
                Ok(())
            }),
        )
        .await?;
        Ok(())
    }

    /// Remove a participant, closing the room when the host leaves.
    ///
    /// Idempotent: leaving an already-closed room reports `RoomClosed`
    /// instead of erroring.
    pub async fn leave_room(
        &self,
        room_id: &str,
        user_id: &str,
    ) -> Result<LeaveOutcome, RoomError> {
        let Some(room) = self.store.get_room(room_id).await? else {
            return Ok(LeaveOutcome::RoomClosed);
        };

        if room.host_id == user_id {
            self.store.delete_room(room_id).await?;
            info!(room = %room_id, "host left, room closed");
            return Ok(LeaveOutcome::RoomClosed);
        }

        let user = user_id.to_owned();
        let outcome = self
            .store
            .update_room(
                room_id,
                Box::new(move |room| {
                    if room.participants.shift_remove(&user).is_none() {
                        return Err(RoomError::ParticipantNotFound(user.clone()));
                    }
                    room.answers_received.shift_remove(&user);
                    Ok(())
                }),
            )
            .await?;

        match outcome {
            MutationOutcome::Committed(_) => Ok(LeaveOutcome::Left),
            MutationOutcome::Aborted(err) => Err(err),
            // The room vanished between the read and the write.
            MutationOutcome::Missing => Ok(LeaveOutcome::RoomClosed),
        }
    }

    /// Pick the lobby theme. Host-only and frozen once the game starts.
    pub async fn select_theme(
        &self,
        room_id: &str,
        caller_id: &str,
        theme: &str,
    ) -> Result<(), RoomError> {
        let room_code = room_id.to_owned();
        let caller = caller_id.to_owned();
        let theme = theme.to_owned();
        self.mutate(
            room_id,
            Box::new(move |room| {
                if room.host_id != caller {
                    return Err(RoomError::NotAuthorized);
                }
                if room.game_started {
                    return Err(RoomError::GameAlreadyStarted(room_code));
                }
                room.selected_theme_name = Some(theme);
                Ok(())
            }),
        )
        .await?;
        Ok(())
    }

    /// Freeze the question snapshot and start the game. Host-only.
    pub async fn start_game(
        &self,
        room_id: &str,
        caller_id: &str,
        questions: Vec<Question>,
    ) -> Result<Room, RoomError> {
        let room_code = room_id.to_owned();
        let caller = caller_id.to_owned();
        self.mutate(
            room_id,
            Box::new(move |room| {
                if room.host_id != caller {
                    return Err(RoomError::NotAuthorized);
                }
                if room.game_started {
                    return Err(RoomError::GameAlreadyStarted(room_code));
                }
                if questions.is_empty() {
                    return Err(RoomError::InvalidQuestions(
                        "a game needs at least one question".into(),
                    ));
                }
                let mut snapshot = questions;
                for (index, question) in snapshot.iter_mut().enumerate() {
                    question.index = index;
                }
                room.questions = snapshot;
                room.game_started = true;
                room.current_question_index = 0;
                room.timer = room.config.default_timer_seconds;
                room.answers_received.clear();
                Ok(())
            }),
        )
        .await
    }

    /// Advance to `next_index`, or end the game on index exhaustion.
    ///
    /// Host-only. The stored index never moves backwards and never exceeds
    /// the question count; reaching the count clears `game_started` and
    /// freezes scores for the leaderboard read.
    pub async fn advance_question(
        &self,
        room_id: &str,
        caller_id: &str,
        next_index: usize,
    ) -> Result<Room, RoomError> {
        let room_code = room_id.to_owned();
        let caller = caller_id.to_owned();
        self.mutate(
            room_id,
            Box::new(move |room| {
                if room.host_id != caller {
                    return Err(RoomError::NotAuthorized);
                }
                if room.questions.is_empty() {
                    return Err(RoomError::GameNotStarted(room_code));
                }
                let next = next_index.max(room.current_question_index);
                if next >= room.questions.len() {
                    room.current_question_index = room.questions.len();
                    room.game_started = false;
                    room.timer = 0;
                } else {
                    room.current_question_index = next;
                    room.timer = room.config.default_timer_seconds;
                }
                room.answers_received.clear();
                Ok(())
            }),
        )
        .await
    }

    /// Record a participant's answer for the current question.
    ///
    /// At most one score increment per participant per question: a repeated
    /// submission is acknowledged with `accepted: false` and changes
    /// nothing. Scores are never decremented.
    pub async fn submit_answer(
        &self,
        room_id: &str,
        user_id: &str,
        correct: bool,
    ) -> Result<AnswerAck, RoomError> {
        let room_code = room_id.to_owned();
        let user = user_id.to_owned();
        let accepted = Arc::new(AtomicBool::new(false));
        let accepted_flag = accepted.clone();

        let room = self
            .mutate(
                room_id,
                Box::new(move |room| {
                    if !room.game_started || room.is_finished() {
                        return Err(RoomError::GameNotStarted(room_code));
                    }
                    if !room.participants.contains_key(&user) {
                        return Err(RoomError::ParticipantNotFound(user.clone()));
                    }
                    if room.answers_received.get(&user).copied().unwrap_or(false) {
                        return Ok(());
                    }
                    room.answers_received.insert(user.clone(), true);
                    if correct {
                        if let Some(participant) = room.participants.get_mut(&user) {
                            participant.score += 1;
                        }
                    }
                    accepted_flag.store(true, Ordering::SeqCst);
                    Ok(())
                }),
            )
            .await?;

        Ok(AnswerAck {
            accepted: accepted.load(Ordering::SeqCst),
            all_answered: room.all_answered(),
        })
    }

    /// Decrement the countdown by one second. Host-only.
    ///
    /// Returns the remaining seconds; a return of zero is the timeout cue.
    pub async fn tick_timer(&self, room_id: &str, caller_id: &str) -> Result<u32, RoomError> {
        let room_code = room_id.to_owned();
        let caller = caller_id.to_owned();
        let room = self
            .mutate(
                room_id,
                Box::new(move |room| {
                    if room.host_id != caller {
                        return Err(RoomError::NotAuthorized);
                    }
                    if !room.game_started {
                        return Err(RoomError::GameNotStarted(room_code));
                    }
                    room.timer = room.timer.saturating_sub(1);
                    Ok(())
                }),
            )
            .await?;
        Ok(room.timer)
    }

    /// Force-mark every silent participant as answered-incorrect. Host-only.
    ///
    /// Run at timeout so a silent or disconnected participant can never
    /// stall the room; no score changes.
    pub async fn expire_question(&self, room_id: &str, caller_id: &str) -> Result<Room, RoomError> {
        let room_code = room_id.to_owned();
        let caller = caller_id.to_owned();
        self.mutate(
            room_id,
            Box::new(move |room| {
                if room.host_id != caller {
                    return Err(RoomError::NotAuthorized);
                }
                if !room.game_started {
                    return Err(RoomError::GameNotStarted(room_code));
                }
                let silent: Vec<String> = room
                    .participants
                    .keys()
                    .filter(|user_id| {
                        !room
                            .answers_received
                            .get(user_id.as_str())
                            .copied()
                            .unwrap_or(false)
                    })
                    .cloned()
                    .collect();
                for user_id in silent {
                    room.answers_received.insert(user_id, true);
                }
                room.timer = 0;
                Ok(())
            }),
        )
        .await
    }

    /// Reset the room to the waiting lobby. Host-only.
    ///
    /// Clears scores, the question snapshot, and progression state; watchers
    /// observe `game_started` flipping back to false.
    pub async fn restart_game(&self, room_id: &str, caller_id: &str) -> Result<(), RoomError> {
        let caller = caller_id.to_owned();
        self.mutate(
            room_id,
            Box::new(move |room| {
                if room.host_id != caller {
                    return Err(RoomError::NotAuthorized);
                }
                for participant in room.participants.values_mut() {
                    participant.score = 0;
                }
                room.questions.clear();
                room.current_question_index = 0;
                room.timer = 0;
                room.answers_received.clear();
                room.game_started = false;
                Ok(())
            }),
        )
        .await?;
        Ok(())
    }

    /// Raw document watch; `None` is the authoritative room-closed signal.
    pub async fn watch_room(
        &self,
        room_id: &str,
    ) -> Result<watch::Receiver<Option<Room>>, RoomError> {
        Ok(self.store.watch_room(room_id).await?)
    }

    /// Live `game_started` values, deduplicated.
    ///
    /// Non-hosts use this to detect both game start and a host restart or
    /// stop. The stream ends when the room document disappears.
    pub async fn watch_game_started(
        &self,
        room_id: &str,
    ) -> Result<BoxStream<'static, bool>, RoomError> {
        let mut receiver = self.store.watch_room(room_id).await?;
        let stream = stream! {
            let mut last = None;
            loop {
                let current = receiver
                    .borrow_and_update()
                    .as_ref()
                    .map(|room| room.game_started);
                match current {
                    Some(value) => {
                        if last != Some(value) {
                            last = Some(value);
                            yield value;
                        }
                    }
                    None => break,
                }
                if receiver.changed().await.is_err() {
                    break;
                }
            }
        };
        Ok(stream.boxed())
    }

    /// Live progression snapshots, deduplicated.
    ///
    /// Non-host sessions mirror these into their local countdown instead of
    /// running a clock of their own. The stream ends on room closure.
    pub async fn watch_game_state(
        &self,
        room_id: &str,
    ) -> Result<BoxStream<'static, GameStateSnapshot>, RoomError> {
        let mut receiver = self.store.watch_room(room_id).await?;
        let stream = stream! {
            let mut last = None;
            loop {
                let current = receiver
                    .borrow_and_update()
                    .as_ref()
                    .map(GameStateSnapshot::of);
                match current {
                    Some(snapshot) => {
                        if last != Some(snapshot) {
                            last = Some(snapshot);
                            yield snapshot;
                        }
                    }
                    None => break,
                }
                if receiver.changed().await.is_err() {
                    break;
                }
            }
        };
        Ok(stream.boxed())
    }

    /// Run a transaction, mapping a vanished document to `RoomNotFound`.
    async fn mutate(&self, room_id: &str, mutation: Mutation) -> Result<Room, RoomError> {
        match self.store.update_room(room_id, mutation).await? {
            MutationOutcome::Committed(room) => Ok(room),
            MutationOutcome::Aborted(err) => Err(err),
            MutationOutcome::Missing => Err(RoomError::RoomNotFound(room_id.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::catalog::{Question, QuestionOption};
    use crate::store::memory::MemoryRoomStore;

    /// Code source that replays a fixed sequence, to force collisions.
    struct ScriptedCodes(Mutex<VecDeque<&'static str>>);

    impl ScriptedCodes {
        fn new(codes: &[&'static str]) -> Box<Self> {
            Box::new(Self(Mutex::new(codes.iter().copied().collect())))
        }
    }

    impl CodeGenerator for ScriptedCodes {
        fn generate(&self) -> String {
            self.0
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted code sequence exhausted")
                .to_owned()
        }
    }

    fn questions(count: usize) -> Vec<Question> {
        (0..count)
            .map(|i| Question {
                id: format!("q{i}"),
                text: format!("question {i}"),
                image_url: None,
                options: vec![
                    QuestionOption {
                        text: "right".into(),
                        is_correct: true,
                    },
                    QuestionOption {
                        text: "wrong".into(),
                        is_correct: false,
                    },
                ],
                topic: None,
                approved: true,
                index: 0,
            })
            .collect()
    }

    fn manager() -> RoomManager {
        RoomManager::new(Arc::new(MemoryRoomStore::new()))
    }

    async fn room_with_two(manager: &RoomManager) -> String {
        let code = manager
            .create_room("host-1", "Anna", RoomConfig::default())
            .await
            .unwrap();
        manager.join_room(&code, "user-2", "Bruno").await.unwrap();
        code
    }

    #[tokio::test]
    async fn creation_retries_on_code_collision() {
        let store = Arc::new(MemoryRoomStore::new());
        let first = RoomManager::with_code_generator(
            store.clone(),
            ScriptedCodes::new(&["11111"]),
        );
        first
            .create_room("host-1", "Anna", RoomConfig::default())
            .await
            .unwrap();

        // Second creation draws the taken code first and must retry.
        let second = RoomManager::with_code_generator(
            store.clone(),
            ScriptedCodes::new(&["11111", "22222"]),
        );
        let code = second
            .create_room("host-2", "Bruno", RoomConfig::default())
            .await
            .unwrap();
        assert_eq!(code, "22222");
    }

    #[tokio::test]
    async fn creation_gives_up_after_exhausting_attempts() {
        let store = Arc::new(MemoryRoomStore::new());
        RoomManager::with_code_generator(store.clone(), ScriptedCodes::new(&["11111"]))
            .create_room("host-1", "Anna", RoomConfig::default())
            .await
            .unwrap();

        let colliding: Vec<&'static str> = vec!["11111"; CODE_ATTEMPTS as usize];
        let manager = RoomManager::with_code_generator(store, ScriptedCodes::new(&colliding));
        let err = manager
            .create_room("host-2", "Bruno", RoomConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::RoomCreation { .. }));
    }

    #[tokio::test]
    async fn creation_rejects_invalid_config() {
        let err = manager()
            .create_room(
                "host-1",
                "Anna",
                RoomConfig {
                    max_players: 0,
                    default_timer_seconds: 10,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn join_preconditions_fail_distinctly_without_mutating() {
        let manager = manager();
        let code = manager
            .create_room(
                "host-1",
                "Anna",
                RoomConfig {
                    max_players: 2,
                    default_timer_seconds: 10,
                },
            )
            .await
            .unwrap();

        let err = manager.join_room(&code, "user-2", "anna").await.unwrap_err();
        assert!(matches!(err, RoomError::UsernameTaken(_)));

        manager.join_room(&code, "user-2", "Bruno").await.unwrap();
        let err = manager.join_room(&code, "user-3", "Carla").await.unwrap_err();
        assert!(matches!(err, RoomError::RoomFull(_)));

        // Re-joining under the same user id is a set-union no-op.
        manager.join_room(&code, "user-2", "Bruno").await.unwrap();
        let room = manager.room(&code).await.unwrap().unwrap();
        assert_eq!(room.participants.len(), 2);

        let err = manager
            .join_room("00000", "user-4", "Dora")
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::RoomNotFound(_)));
    }

    #[tokio::test]
    async fn join_rejected_once_game_started() {
        let manager = manager();
        let code = room_with_two(&manager).await;
        manager
            .start_game(&code, "host-1", questions(2))
            .await
            .unwrap();

        let err = manager.join_room(&code, "user-3", "Carla").await.unwrap_err();
        assert!(matches!(err, RoomError::GameAlreadyStarted(_)));
        let room = manager.room(&code).await.unwrap().unwrap();
        assert_eq!(room.participants.len(), 2);
    }

    #[tokio::test]
    async fn host_exclusivity_leaves_state_unchanged() {
        let manager = manager();
        let code = room_with_two(&manager).await;

        let err = manager
            .start_game(&code, "user-2", questions(2))
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::NotAuthorized));

        manager
            .start_game(&code, "host-1", questions(2))
            .await
            .unwrap();
        for result in [
            manager.advance_question(&code, "user-2", 1).await.err(),
            manager.tick_timer(&code, "user-2").await.err(),
            manager.expire_question(&code, "user-2").await.err(),
        ] {
            assert!(matches!(result, Some(RoomError::NotAuthorized)));
        }
        let err = manager.restart_game(&code, "user-2").await.unwrap_err();
        assert!(matches!(err, RoomError::NotAuthorized));

        let room = manager.room(&code).await.unwrap().unwrap();
        assert_eq!(room.current_question_index, 0);
        assert_eq!(room.timer, room.config.default_timer_seconds);
        assert!(room.game_started);
    }

    #[tokio::test]
    async fn leave_is_idempotent_and_host_leave_closes() {
        let manager = manager();
        let code = room_with_two(&manager).await;

        assert_eq!(
            manager.leave_room(&code, "user-2").await.unwrap(),
            LeaveOutcome::Left
        );
        let err = manager.leave_room(&code, "user-2").await.unwrap_err();
        assert!(matches!(err, RoomError::ParticipantNotFound(_)));

        assert_eq!(
            manager.leave_room(&code, "host-1").await.unwrap(),
            LeaveOutcome::RoomClosed
        );
        // Both repeats on the closed room report closure without erroring.
        assert_eq!(
            manager.leave_room(&code, "host-1").await.unwrap(),
            LeaveOutcome::RoomClosed
        );
        assert_eq!(
            manager.leave_room(&code, "user-2").await.unwrap(),
            LeaveOutcome::RoomClosed
        );
    }

    #[tokio::test]
    async fn duplicate_answers_score_at_most_once() {
        let manager = manager();
        let code = room_with_two(&manager).await;
        manager
            .start_game(&code, "host-1", questions(2))
            .await
            .unwrap();

        let ack = manager.submit_answer(&code, "user-2", true).await.unwrap();
        assert!(ack.accepted);
        assert!(!ack.all_answered);

        let ack = manager.submit_answer(&code, "user-2", true).await.unwrap();
        assert!(!ack.accepted);

        let ack = manager.submit_answer(&code, "host-1", false).await.unwrap();
        assert!(ack.accepted);
        assert!(ack.all_answered);

        let room = manager.room(&code).await.unwrap().unwrap();
        assert_eq!(room.participants["user-2"].score, 1);
        assert_eq!(room.participants["host-1"].score, 0);
    }

    #[tokio::test]
    async fn answers_outside_a_game_are_rejected() {
        let manager = manager();
        let code = room_with_two(&manager).await;
        let err = manager
            .submit_answer(&code, "user-2", true)
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::GameNotStarted(_)));
    }

    #[tokio::test]
    async fn advancement_terminates_at_index_exhaustion() {
        let manager = manager();
        let code = room_with_two(&manager).await;
        manager
            .start_game(&code, "host-1", questions(3))
            .await
            .unwrap();

        for next in 1..=3 {
            manager.advance_question(&code, "host-1", next).await.unwrap();
        }
        let room = manager.room(&code).await.unwrap().unwrap();
        assert!(room.is_finished());
        assert!(!room.game_started);
        assert_eq!(room.current_question_index, 3);

        // Further advancement requests cannot move the index.
        manager.advance_question(&code, "host-1", 7).await.unwrap();
        let room = manager.room(&code).await.unwrap().unwrap();
        assert_eq!(room.current_question_index, 3);
    }

    #[tokio::test]
    async fn expire_marks_silent_participants_without_scoring() {
        let manager = manager();
        let code = room_with_two(&manager).await;
        manager
            .start_game(&code, "host-1", questions(1))
            .await
            .unwrap();
        manager.submit_answer(&code, "host-1", true).await.unwrap();

        let room = manager.expire_question(&code, "host-1").await.unwrap();
        assert!(room.all_answered());
        assert_eq!(room.timer, 0);
        assert_eq!(room.participants["user-2"].score, 0);
        assert_eq!(room.participants["host-1"].score, 1);
    }

    #[tokio::test]
    async fn restart_returns_to_lobby_with_cleared_scores() {
        let manager = manager();
        let code = room_with_two(&manager).await;
        manager
            .start_game(&code, "host-1", questions(1))
            .await
            .unwrap();
        manager.submit_answer(&code, "user-2", true).await.unwrap();
        manager.restart_game(&code, "host-1").await.unwrap();

        let room = manager.room(&code).await.unwrap().unwrap();
        assert!(!room.game_started);
        assert!(room.questions.is_empty());
        assert_eq!(room.current_question_index, 0);
        assert_eq!(room.participants["user-2"].score, 0);
    }

    #[tokio::test]
    async fn game_started_watch_deduplicates_and_ends_on_closure() {
        let manager = manager();
        let code = room_with_two(&manager).await;
        let mut started = manager.watch_game_started(&code).await.unwrap();

        assert_eq!(started.next().await, Some(false));
        manager.select_theme(&code, "host-1", "Science").await.unwrap();
        manager
            .start_game(&code, "host-1", questions(1))
            .await
            .unwrap();
        assert_eq!(started.next().await, Some(true));
        manager.restart_game(&code, "host-1").await.unwrap();
        assert_eq!(started.next().await, Some(false));

        manager.leave_room(&code, "host-1").await.unwrap();
        assert_eq!(started.next().await, None);
    }

    #[tokio::test]
    async fn game_state_watch_reports_derived_finish() {
        let manager = manager();
        let code = room_with_two(&manager).await;
        manager
            .start_game(&code, "host-1", questions(1))
            .await
            .unwrap();
        let mut states = manager.watch_game_state(&code).await.unwrap();

        let first = states.next().await.unwrap();
        assert_eq!(first.current_question_index, 0);
        assert_eq!(first.timer, 10);
        assert!(!first.is_finished);

        manager.advance_question(&code, "host-1", 1).await.unwrap();
        let last = states.next().await.unwrap();
        assert!(last.is_finished);
    }
}
