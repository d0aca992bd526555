//! Per-client game session controllers.
//!
//! The same answering flow serves solo play (the client is its own timing
//! authority) and room play (state is mirrored from the shared room
//! document; only the host's session drives progression). Session context
//! (identity, room id, theme) is passed in explicitly; there is no ambient
//! state.

use std::sync::Arc;

use futures::StreamExt;
use rand::seq::SliceRandom;
use tracing::info;

use crate::catalog::{Question, QuestionFilter, QuestionSource};
use crate::error::RoomError;
use crate::game::score::{self, LeaderboardEntry};
use crate::room::driver::HostDriver;
use crate::room::manager::{GameStateSnapshot, LeaveOutcome, RoomManager};
use crate::room::model::{DEFAULT_TIMER_SECONDS, RoomConfig};

/// Number of questions drawn for a game.
pub const GAME_QUESTION_COUNT: usize = 10;

/// Result of a local countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Countdown still running; carries the remaining seconds.
    Counting(u32),
    /// The deadline just passed: the correct answer is revealed and an
    /// incorrect answer has been recorded for the player.
    Expired,
    /// Nothing to count (input already locked or game over).
    Idle,
}

/// Presentation marks for the question in play. Client-local only, never
/// persisted to the room document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionMarks {
    /// Option the player picked, if any.
    pub selected: Option<usize>,
    /// Whether the correct options are currently revealed.
    pub revealed: bool,
}

/// Draw up to [`GAME_QUESTION_COUNT`] shuffled questions for a theme.
///
/// Question order and each question's option order are shuffled with a
/// uniform Fisher-Yates; correctness travels with the option, so the
/// shuffle never affects bookkeeping.
pub async fn draw_questions(
    source: &dyn QuestionSource,
    theme: &str,
) -> Result<Vec<Question>, RoomError> {
    let mut pool = source.query(QuestionFilter::for_theme(theme)).await?;
    if pool.is_empty() {
        return Err(RoomError::InvalidQuestions(format!(
            "no approved questions for theme `{theme}`"
        )));
    }
    let mut rng = rand::rng();
    pool.shuffle(&mut rng);
    pool.truncate(GAME_QUESTION_COUNT);
    for (index, question) in pool.iter_mut().enumerate() {
        question.index = index;
        question.options.shuffle(&mut rng);
    }
    Ok(pool)
}

fn shuffle_options(questions: &mut [Question]) {
    let mut rng = rand::rng();
    for question in questions {
        question.options.shuffle(&mut rng);
    }
}

/// Solo game: a fixed-size question run with a fully local countdown.
#[derive(Debug)]
pub struct SoloSession {
    username: String,
    questions: Vec<Question>,
    current_index: usize,
    timer_seconds: u32,
    countdown: u32,
    allow_answer: bool,
    score: u32,
    finished: bool,
    marks: QuestionMarks,
}

impl SoloSession {
    /// Load a shuffled question run for the theme and start the first
    /// countdown.
    pub async fn start(
        source: &dyn QuestionSource,
        username: &str,
        theme: &str,
    ) -> Result<Self, RoomError> {
        let questions = draw_questions(source, theme).await?;
        info!(player = %username, theme = %theme, count = questions.len(), "solo game started");
        Ok(Self {
            username: username.to_owned(),
            questions,
            current_index: 0,
            timer_seconds: DEFAULT_TIMER_SECONDS,
            countdown: DEFAULT_TIMER_SECONDS,
            allow_answer: true,
            score: 0,
            finished: false,
            marks: QuestionMarks::default(),
        })
    }

    /// The question in play, `None` once the run is finished.
    pub fn current_question(&self) -> Option<&Question> {
        if self.finished {
            return None;
        }
        self.questions.get(self.current_index)
    }

    /// Remaining seconds on the local countdown.
    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    /// Whether answer input is currently accepted.
    pub fn allow_answer(&self) -> bool {
        self.allow_answer
    }

    /// Current presentation marks.
    pub fn marks(&self) -> &QuestionMarks {
        &self.marks
    }

    /// Accumulated score.
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Whether the run is over.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Answer the current question.
    ///
    /// Returns the correctness of the pick, or `None` when input is locked
    /// (already answered, timed out, or game over). Answering locks further
    /// input and reveals the correct options; a correct pick scores one
    /// point and a wrong pick scores nothing — scores never go down.
    pub fn select_option(&mut self, option_index: usize) -> Option<bool> {
        if !self.allow_answer || self.finished {
            return None;
        }
        let correct = self
            .questions
            .get(self.current_index)?
            .options
            .get(option_index)?
            .is_correct;
        self.allow_answer = false;
        self.countdown = 0;
        self.marks = QuestionMarks {
            selected: Some(option_index),
            revealed: true,
        };
        if correct {
            self.score += 1;
        }
        Some(correct)
    }

    /// Advance the local countdown by one second.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.allow_answer || self.finished {
            return TickOutcome::Idle;
        }
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown > 0 {
            return TickOutcome::Counting(self.countdown);
        }
        // Deadline: reveal and record an unanswered question as incorrect.
        self.allow_answer = false;
        self.marks = QuestionMarks {
            selected: None,
            revealed: true,
        };
        TickOutcome::Expired
    }

    /// Move to the next question after the reveal pause, or finish the run.
    pub fn advance(&mut self) {
        if self.finished {
            return;
        }
        self.current_index += 1;
        if self.current_index >= self.questions.len() {
            self.finished = true;
            info!(player = %self.username, score = self.score, "solo game finished");
            return;
        }
        self.countdown = self.timer_seconds;
        self.allow_answer = true;
        self.marks = QuestionMarks::default();
    }

    /// Reset the run: zero score, reshuffled questions, back to the first
    /// countdown.
    pub fn restart(&mut self) {
        let mut rng = rand::rng();
        self.questions.shuffle(&mut rng);
        for (index, question) in self.questions.iter_mut().enumerate() {
            question.index = index;
            question.options.shuffle(&mut rng);
        }
        self.current_index = 0;
        self.countdown = self.timer_seconds;
        self.allow_answer = true;
        self.score = 0;
        self.finished = false;
        self.marks = QuestionMarks::default();
    }

    /// Single-entry leaderboard for the local player.
    pub fn results(&self) -> Vec<LeaderboardEntry> {
        score::solo_leaderboard(&self.username, self.score)
    }
}

/// Terminal reason a room session stopped receiving state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The question list was exhausted; results are readable.
    Finished,
    /// The host stopped or restarted the game.
    Stopped,
    /// The room document disappeared (host left or room closed).
    RoomClosed,
}

/// Room-backed game session for one participant.
///
/// The host's session owns the [`HostDriver`]; every other session is
/// purely reactive and mirrors progression from the room document.
pub struct RoomSession {
    manager: Arc<RoomManager>,
    room_id: String,
    user_id: String,
    username: String,
    is_host: bool,
    driver: Option<HostDriver>,
    questions: Vec<Question>,
    current_index: usize,
    countdown: u32,
    finished: bool,
    allow_answer: bool,
    marks: QuestionMarks,
}

impl RoomSession {
    /// Create a room and enter it as host.
    pub async fn create(
        manager: Arc<RoomManager>,
        user_id: &str,
        username: &str,
        config: RoomConfig,
    ) -> Result<Self, RoomError> {
        let room_id = manager.create_room(user_id, username, config).await?;
        Ok(Self::attach(manager, room_id, user_id, username, true))
    }

    /// Join an existing room as a regular participant.
    pub async fn join(
        manager: Arc<RoomManager>,
        room_id: &str,
        user_id: &str,
        username: &str,
    ) -> Result<Self, RoomError> {
        manager.join_room(room_id, user_id, username).await?;
        Ok(Self::attach(
            manager,
            room_id.to_owned(),
            user_id,
            username,
            false,
        ))
    }

    fn attach(
        manager: Arc<RoomManager>,
        room_id: String,
        user_id: &str,
        username: &str,
        is_host: bool,
    ) -> Self {
        Self {
            manager,
            room_id,
            user_id: user_id.to_owned(),
            username: username.to_owned(),
            is_host,
            driver: None,
            questions: Vec::new(),
            current_index: 0,
            countdown: 0,
            finished: false,
            allow_answer: false,
            marks: QuestionMarks::default(),
        }
    }

    /// Code of the joined room.
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Whether this session carries host authority.
    pub fn is_host(&self) -> bool {
        self.is_host
    }

    /// Pick the lobby theme (host only, before the game starts).
    pub async fn select_theme(&self, theme: &str) -> Result<(), RoomError> {
        self.manager
            .select_theme(&self.room_id, &self.user_id, theme)
            .await
    }

    /// Start the game (host only): draw and freeze the question snapshot,
    /// then spawn the timer loop that drives every participant forward.
    pub async fn start(&mut self, source: &dyn QuestionSource) -> Result<(), RoomError> {
        let room = self
            .manager
            .room(&self.room_id)
            .await?
            .ok_or_else(|| RoomError::RoomNotFound(self.room_id.clone()))?;
        let theme = room
            .selected_theme_name
            .unwrap_or_else(|| crate::catalog::MIX_THEME.to_owned());

        let questions = draw_questions(source, &theme).await?;
        let room = self
            .manager
            .start_game(&self.room_id, &self.user_id, questions)
            .await?;
        self.load_snapshot(&room.questions, room.timer);

        let driver = HostDriver::spawn(
            self.manager.clone(),
            self.room_id.clone(),
            self.user_id.clone(),
        )
        .await?;
        self.driver = Some(driver);
        Ok(())
    }

    /// Block until the host starts the game (non-hosts).
    ///
    /// Returns `false` when the room closes before a start is observed.
    pub async fn wait_for_start(&mut self) -> Result<bool, RoomError> {
        let mut started = self.manager.watch_game_started(&self.room_id).await?;
        while let Some(value) = started.next().await {
            if value {
                let room = self
                    .manager
                    .room(&self.room_id)
                    .await?
                    .ok_or_else(|| RoomError::RoomNotFound(self.room_id.clone()))?;
                self.load_snapshot(&room.questions, room.timer);
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn load_snapshot(&mut self, questions: &[Question], timer: u32) {
        self.questions = questions.to_vec();
        // Cosmetic per-client reshuffle; correctness travels with the option.
        shuffle_options(&mut self.questions);
        self.current_index = 0;
        self.countdown = timer;
        self.finished = false;
        self.allow_answer = true;
        self.marks = QuestionMarks::default();
    }

    /// Run the reactive loop until the game ends, the host stops it, or the
    /// room closes.
    ///
    /// Applies every progression snapshot to the local mirror; intended for
    /// non-host participants, though the host's view works the same way.
    pub async fn run_until_end(&mut self) -> Result<SessionEnd, RoomError> {
        let mut states = self.manager.watch_game_state(&self.room_id).await?;
        let mut stopped = self.manager.watch_game_started(&self.room_id).await?;

        loop {
            tokio::select! {
                state = states.next() => {
                    match state {
                        Some(snapshot) => {
                            self.apply(snapshot);
                            if self.finished {
                                return Ok(SessionEnd::Finished);
                            }
                        }
                        None => return Ok(SessionEnd::RoomClosed),
                    }
                }
                started = stopped.next() => {
                    match started {
                        Some(false) => {
                            // `game_started` also flips false on a natural
                            // finish; only a live question list means the
                            // host stopped or restarted the game.
                            let finished = self
                                .manager
                                .room(&self.room_id)
                                .await?
                                .map(|room| room.is_finished())
                                .unwrap_or(false);
                            if finished {
                                self.finished = true;
                                self.allow_answer = false;
                                return Ok(SessionEnd::Finished);
                            }
                            return Ok(SessionEnd::Stopped);
                        }
                        Some(true) => {}
                        None => return Ok(SessionEnd::RoomClosed),
                    }
                }
            }
        }
    }

    /// Mirror one progression snapshot into the local view.
    pub fn apply(&mut self, snapshot: GameStateSnapshot) {
        if snapshot.is_finished {
            self.finished = true;
            self.allow_answer = false;
            self.countdown = 0;
            return;
        }
        if snapshot.current_question_index != self.current_index {
            // Host advanced: unlock input for the fresh question.
            self.current_index = snapshot.current_question_index;
            self.allow_answer = true;
            self.marks = QuestionMarks::default();
        }
        self.countdown = snapshot.timer;
        if snapshot.timer == 0 && self.allow_answer {
            // Deadline or full-house reveal reached without a local answer.
            self.allow_answer = false;
            self.marks.revealed = true;
        }
    }

    /// The locally mirrored question in play.
    pub fn current_question(&self) -> Option<&Question> {
        if self.finished {
            return None;
        }
        self.questions.get(self.current_index)
    }

    /// Remaining seconds mirrored from the room document.
    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    /// Whether answer input is currently accepted.
    pub fn allow_answer(&self) -> bool {
        self.allow_answer
    }

    /// Current presentation marks.
    pub fn marks(&self) -> &QuestionMarks {
        &self.marks
    }

    /// Whether the mirrored game has ended.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Answer the current question through the Room Manager.
    ///
    /// Input locks immediately, before the store round-trip, so a double
    /// click cannot race two submissions; a failed write unlocks it again
    /// since no answer was recorded. Returns the correctness of the pick,
    /// or `None` when input is locked.
    pub async fn select_option(
        &mut self,
        option_index: usize,
    ) -> Result<Option<bool>, RoomError> {
        if !self.allow_answer || self.finished {
            return Ok(None);
        }
        let Some(option) = self
            .questions
            .get(self.current_index)
            .and_then(|question| question.options.get(option_index))
        else {
            return Ok(None);
        };
        let correct = option.is_correct;

        self.allow_answer = false;
        self.marks = QuestionMarks {
            selected: Some(option_index),
            revealed: true,
        };
        if let Err(err) = self
            .manager
            .submit_answer(&self.room_id, &self.user_id, correct)
            .await
        {
            // Nothing was recorded; hand the player their attempt back.
            self.allow_answer = true;
            self.marks = QuestionMarks::default();
            return Err(err);
        }
        Ok(Some(correct))
    }

    /// Read the room leaderboard.
    pub async fn results(&self) -> Result<Vec<LeaderboardEntry>, RoomError> {
        score::room_results(&self.manager, &self.room_id).await
    }

    /// Reset the room to the lobby (host only).
    pub async fn restart(&mut self) -> Result<(), RoomError> {
        self.teardown();
        self.manager
            .restart_game(&self.room_id, &self.user_id)
            .await
    }

    /// Leave the room, closing it when called by the host.
    pub async fn leave(&mut self) -> Result<LeaveOutcome, RoomError> {
        self.teardown();
        self.manager.leave_room(&self.room_id, &self.user_id).await
    }

    /// Stop the timer loop and drop live subscriptions.
    ///
    /// Called on every path that ends the session so no interval keeps
    /// writing to a finished or deleted room.
    pub fn teardown(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.stop();
        }
    }

    /// Display name this session joined under.
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl Drop for RoomSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
