//! Host-side timer loop.
//!
//! Only the client whose user id matches the room's `host_id` runs this
//! task; every other participant is purely reactive, deriving its view from
//! room-document change notifications. One timing authority means N clients
//! never disagree on the countdown, at the cost of the documented
//! stall-on-host-disconnect limitation.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, warn};

use crate::error::RoomError;
use crate::room::manager::RoomManager;
use crate::room::model::Room;

/// Pause between a question's deadline (or full-answer condition) and the
/// advance to the next question, during which clients show the correct
/// option.
pub const REVEAL_DELAY: Duration = Duration::from_millis(3000);

/// Handle to the spawned host timer task.
///
/// The task ends on its own when the game finishes, the room closes, or the
/// host restarts; dropping the handle aborts it on every other teardown
/// path so no stray interval keeps writing to a dead room.
pub struct HostDriver {
    handle: JoinHandle<()>,
}

impl HostDriver {
    /// Spawn the timer loop for a freshly started game.
    pub async fn spawn(
        manager: Arc<RoomManager>,
        room_id: String,
        host_id: String,
    ) -> Result<Self, RoomError> {
        let watch = manager.watch_room(&room_id).await?;
        let handle = tokio::spawn(run_loop(manager, room_id, host_id, watch));
        Ok(Self { handle })
    }

    /// Stop driving the room. Idempotent.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for HostDriver {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run_loop(
    manager: Arc<RoomManager>,
    room_id: String,
    host_id: String,
    mut watch: tokio::sync::watch::Receiver<Option<Room>>,
) {
    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of a tokio interval completes immediately; consume it
    // so decrements land one full second apart.
    ticker.tick().await;

    debug!(room = %room_id, "host timer loop started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = match manager.room(&room_id).await {
                    Ok(snapshot) => snapshot,
                    Err(err) => {
                        warn!(room = %room_id, error = %err, "room read failed; retrying next tick");
                        continue;
                    }
                };
                let Some(room) = snapshot else { break };
                if !room.game_started || room.is_finished() {
                    break;
                }

                if room.all_answered() {
                    match finish_question(&manager, &room_id, &host_id).await {
                        ControlFlow::Continue(()) => {
                            // Give the fresh question a full first second.
                            ticker.reset();
                            continue;
                        }
                        ControlFlow::Break(()) => break,
                    }
                }

                match manager.tick_timer(&room_id, &host_id).await {
                    Ok(0) => {
                        // Deadline reached: default the silent participants
                        // and move on after the reveal.
                        match finish_question(&manager, &room_id, &host_id).await {
                            ControlFlow::Continue(()) => ticker.reset(),
                            ControlFlow::Break(()) => break,
                        }
                    }
                    Ok(_) => {}
                    Err(RoomError::StoreUnavailable(err)) => {
                        // Best effort: a dropped decrement is retried
                        // implicitly by the next second's tick.
                        warn!(room = %room_id, error = %err, "timer tick dropped");
                    }
                    Err(err) => {
                        debug!(room = %room_id, error = %err, "timer loop stopping");
                        break;
                    }
                }
            }
            changed = watch.changed() => {
                if changed.is_err() {
                    break;
                }
                let observed = watch
                    .borrow_and_update()
                    .as_ref()
                    .map(|room| (room.game_started, room.is_finished(), room.all_answered()));
                match observed {
                    None => break,
                    Some((false, _, _)) | Some((_, true, _)) => break,
                    // Everyone answered before the deadline: reveal in the
                    // same tick instead of waiting the timer out.
                    Some((true, false, true)) => {
                        match finish_question(&manager, &room_id, &host_id).await {
                            ControlFlow::Continue(()) => ticker.reset(),
                            ControlFlow::Break(()) => break,
                        }
                    }
                    Some(_) => {}
                }
            }
        }
    }

    debug!(room = %room_id, "host timer loop ended");
}

/// Reveal the current question and advance past it.
///
/// Marks every unanswered participant as answered-incorrect, holds the
/// reveal for [`REVEAL_DELAY`], then advances the index. Returns `Break`
/// once the loop has nothing left to drive.
async fn finish_question(
    manager: &RoomManager,
    room_id: &str,
    host_id: &str,
) -> ControlFlow<()> {
    let room = match manager.expire_question(room_id, host_id).await {
        Ok(room) => room,
        Err(RoomError::StoreUnavailable(err)) => {
            warn!(room = %room_id, error = %err, "reveal write dropped; retrying next tick");
            return ControlFlow::Continue(());
        }
        Err(err) => {
            debug!(room = %room_id, error = %err, "stopping at reveal");
            return ControlFlow::Break(());
        }
    };

    sleep(REVEAL_DELAY).await;

    let next_index = room.current_question_index + 1;
    match manager.advance_question(room_id, host_id, next_index).await {
        Ok(room) if room.is_finished() => ControlFlow::Break(()),
        Ok(_) => ControlFlow::Continue(()),
        Err(RoomError::StoreUnavailable(err)) => {
            warn!(room = %room_id, error = %err, "advance write dropped; retrying next tick");
            ControlFlow::Continue(())
        }
        Err(err) => {
            debug!(room = %room_id, error = %err, "stopping at advance");
            ControlFlow::Break(())
        }
    }
}
