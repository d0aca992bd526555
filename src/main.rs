//! Demo binary: runs a scripted three-player room game end to end over the
//! in-memory document store, with every client living in its own task and
//! coordinating only through room-document writes and watches.

use std::sync::Arc;

use anyhow::Result;
use futures::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trivia_rooms::catalog::{MemoryQuestionSource, Question, QuestionOption, QuestionSource};
use trivia_rooms::config::AppConfig;
use trivia_rooms::game::score;
use trivia_rooms::game::session::RoomSession;
use trivia_rooms::identity::SessionIdentity;
use trivia_rooms::room::manager::RoomManager;
use trivia_rooms::store::memory::MemoryRoomStore;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let manager = Arc::new(RoomManager::new(Arc::new(MemoryRoomStore::new())));
    let source: Arc<dyn QuestionSource + Send + Sync> =
        Arc::new(MemoryQuestionSource::new(demo_questions()));

    // Host client: create the room and pick a theme.
    let host_identity = SessionIdentity::anonymous();
    let host_id = host_identity.user_id_or_guest();
    let mut host = RoomSession::create(manager.clone(), &host_id, "Anna", config.room_config())
        .await?;
    let room_id = host.room_id().to_owned();
    info!(room = %room_id, "room open, share the code");

    // Lobby view: log membership changes as they propagate.
    let lobby_watch = manager.watch_room(&room_id).await?;
    tokio::spawn(async move {
        let mut lobby = WatchStream::new(lobby_watch);
        while let Some(snapshot) = lobby.next().await {
            match snapshot {
                Some(room) => info!(participants = room.participants.len(), "lobby update"),
                None => {
                    info!("room closed");
                    break;
                }
            }
        }
    });

    // Two guest clients join and wait for the start signal.
    let mut guests = Vec::new();
    for username in ["Bruno", "Carla"] {
        let identity = SessionIdentity::anonymous();
        let user_id = identity.user_id_or_guest();
        let mut session = RoomSession::join(manager.clone(), &room_id, &user_id, username).await?;
        let manager = manager.clone();
        guests.push(tokio::spawn(async move {
            if session.wait_for_start().await? {
                play(manager, session).await
            } else {
                Ok(session)
            }
        }));
    }

    host.select_theme("Mix").await?;
    host.start(source.as_ref()).await?;
    info!(room = %room_id, "game started");

    // The host answers through the same reactive loop as everyone else.
    let host_task = tokio::spawn(play(manager.clone(), host));
    let mut host = host_task.await??;
    for guest in guests {
        guest.await??;
    }

    let board = score::room_results(&manager, &room_id).await?;
    for (rank, entry) in board.iter().enumerate() {
        info!(rank = rank + 1, player = %entry.username, score = entry.score, "final standing");
    }

    host.leave().await?;
    Ok(())
}

/// Reactive client loop: mirror room state and answer each question once.
async fn play(manager: Arc<RoomManager>, mut session: RoomSession) -> Result<RoomSession> {
    let room_id = session.room_id().to_owned();
    let username = session.username().to_owned();
    let mut states = manager.watch_game_state(&room_id).await?;

    while let Some(snapshot) = states.next().await {
        session.apply(snapshot);
        if session.is_finished() {
            info!(player = %username, "game over");
            break;
        }
        if session.allow_answer() {
            let option_count = session
                .current_question()
                .map(|question| question.options.len())
                .unwrap_or(0);
            if option_count == 0 {
                continue;
            }
            let pick = rand::Rng::random_range(&mut rand::rng(), 0..option_count);
            if let Some(correct) = session.select_option(pick).await? {
                info!(player = %username, correct, "answered");
            }
        }
    }
    Ok(session)
}

fn demo_questions() -> Vec<Question> {
    let q = |id: &str, text: &str, right: &str, wrongs: [&str; 3], topic: &str| Question {
        id: id.into(),
        text: text.into(),
        image_url: None,
        options: std::iter::once(QuestionOption {
            text: right.into(),
            is_correct: true,
        })
        .chain(wrongs.iter().map(|wrong| QuestionOption {
            text: (*wrong).into(),
            is_correct: false,
        }))
        .collect(),
        topic: Some(topic.into()),
        approved: true,
        index: 0,
    };
    vec![
        q(
            "q1",
            "Which planet is known as the red planet?",
            "Mars",
            ["Venus", "Jupiter", "Mercury"],
            "Science",
        ),
        q(
            "q2",
            "What is the longest river in the world?",
            "The Nile",
            ["The Amazon", "The Danube", "The Yangtze"],
            "Geography",
        ),
        q(
            "q3",
            "Who wrote Don Quixote?",
            "Miguel de Cervantes",
            ["Lope de Vega", "Garcilaso", "Quevedo"],
            "Literature",
        ),
        q(
            "q4",
            "In which year did the Berlin Wall fall?",
            "1989",
            ["1961", "1975", "1991"],
            "History",
        ),
    ]
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
