//! In-memory [`RoomStore`] used by tests and the demo binary.
//!
//! Each room document lives inside a `tokio::sync::watch` channel, so a
//! committed write and its change notification are a single operation. The
//! watch channel's internal lock is what makes [`RoomStore::update_room`] an
//! atomic read-modify-write: concurrent transactions on one document are
//! serialized, never interleaved.

use dashmap::DashMap;
use futures::{FutureExt, future::BoxFuture};
use tokio::sync::watch;

use crate::room::model::Room;
use crate::store::{Mutation, MutationOutcome, RoomStore, StoreResult};

/// Process-local room store keyed by room code.
#[derive(Default)]
pub struct MemoryRoomStore {
    rooms: DashMap<String, watch::Sender<Option<Room>>>,
}

impl MemoryRoomStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoomStore for MemoryRoomStore {
    fn insert_room(&self, room: Room) -> BoxFuture<'static, StoreResult<bool>> {
        let inserted = match self.rooms.entry(room.id.clone()) {
            dashmap::Entry::Occupied(_) => false,
            dashmap::Entry::Vacant(slot) => {
                let (tx, _rx) = watch::channel(Some(room));
                slot.insert(tx);
                true
            }
        };
        async move { Ok(inserted) }.boxed()
    }

    fn get_room(&self, id: &str) -> BoxFuture<'static, StoreResult<Option<Room>>> {
        let snapshot = self
            .rooms
            .get(id)
            .and_then(|entry| entry.value().borrow().clone());
        async move { Ok(snapshot) }.boxed()
    }

    fn update_room(
        &self,
        id: &str,
        mutation: Mutation,
    ) -> BoxFuture<'static, StoreResult<MutationOutcome>> {
        let mut outcome = MutationOutcome::Missing;
        if let Some(entry) = self.rooms.get(id) {
            entry.value().send_if_modified(|slot| {
                let Some(room) = slot.as_mut() else {
                    return false;
                };
                match mutation(room) {
                    Ok(()) => {
                        outcome = MutationOutcome::Committed(room.clone());
                        true
                    }
                    Err(err) => {
                        outcome = MutationOutcome::Aborted(err);
                        false
                    }
                }
            });
        }
        async move { Ok(outcome) }.boxed()
    }

    fn delete_room(&self, id: &str) -> BoxFuture<'static, StoreResult<bool>> {
        let deleted = match self.rooms.remove(id) {
            Some((_, tx)) => {
                // Publish the terminal `None` before the sender drops so
                // subscribers observe closure rather than a bare channel error.
                tx.send_replace(None);
                true
            }
            None => false,
        };
        async move { Ok(deleted) }.boxed()
    }

    fn watch_room(
        &self,
        id: &str,
    ) -> BoxFuture<'static, StoreResult<watch::Receiver<Option<Room>>>> {
        let receiver = match self.rooms.get(id) {
            Some(entry) => entry.value().subscribe(),
            None => {
                let (tx, rx) = watch::channel(None);
                drop(tx);
                rx
            }
        };
        async move { Ok(receiver) }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RoomError;
    use crate::room::model::{Participant, Room, RoomConfig};

    fn sample_room(id: &str) -> Room {
        Room::new(
            id.into(),
            "host-1".into(),
            "Anna".into(),
            RoomConfig::default(),
        )
    }

    #[tokio::test]
    async fn insert_reports_collisions() {
        let store = MemoryRoomStore::new();
        assert!(store.insert_room(sample_room("11111")).await.unwrap());
        assert!(!store.insert_room(sample_room("11111")).await.unwrap());
        assert!(store.insert_room(sample_room("22222")).await.unwrap());
    }

    #[tokio::test]
    async fn update_commits_and_notifies() {
        let store = MemoryRoomStore::new();
        store.insert_room(sample_room("11111")).await.unwrap();
        let mut watcher = store.watch_room("11111").await.unwrap();
        watcher.mark_unchanged();

        let outcome = store
            .update_room(
                "11111",
                Box::new(|room| {
                    room.participants.insert(
                        "user-2".into(),
                        Participant::new("user-2".into(), "Bruno".into()),
                    );
                    Ok(())
                }),
            )
            .await
            .unwrap();

        match outcome {
            MutationOutcome::Committed(room) => assert_eq!(room.participants.len(), 2),
            other => panic!("expected commit, got {other:?}"),
        }
        assert!(watcher.has_changed().unwrap());
    }

    #[tokio::test]
    async fn aborted_update_leaves_document_untouched() {
        let store = MemoryRoomStore::new();
        store.insert_room(sample_room("11111")).await.unwrap();
        let mut watcher = store.watch_room("11111").await.unwrap();
        watcher.mark_unchanged();

        let outcome = store
            .update_room(
                "11111",
                Box::new(|room| {
                    room.game_started = true;
                    Err(RoomError::NotAuthorized)
                }),
            )
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            MutationOutcome::Aborted(RoomError::NotAuthorized)
        ));
        assert!(!watcher.has_changed().unwrap());
        let room = store.get_room("11111").await.unwrap().unwrap();
        assert!(!room.game_started);
    }

    #[tokio::test]
    async fn update_on_missing_room_is_a_noop() {
        let store = MemoryRoomStore::new();
        let outcome = store
            .update_room("99999", Box::new(|_room| Ok(())))
            .await
            .unwrap();
        assert!(matches!(outcome, MutationOutcome::Missing));
    }

    #[tokio::test]
    async fn delete_publishes_terminal_none() {
        let store = MemoryRoomStore::new();
        store.insert_room(sample_room("11111")).await.unwrap();
        let mut watcher = store.watch_room("11111").await.unwrap();

        assert!(store.delete_room("11111").await.unwrap());
        watcher.changed().await.unwrap();
        assert!(watcher.borrow().is_none());

        // Idempotent: the second delete reports "already gone".
        assert!(!store.delete_room("11111").await.unwrap());
    }

    #[tokio::test]
    async fn watch_on_unknown_room_yields_none() {
        let store = MemoryRoomStore::new();
        let watcher = store.watch_room("00000").await.unwrap();
        assert!(watcher.borrow().is_none());
    }

    #[tokio::test]
    async fn concurrent_increments_both_survive() {
        let store = std::sync::Arc::new(MemoryRoomStore::new());
        let mut room = sample_room("11111");
        room.participants.insert(
            "user-2".into(),
            Participant::new("user-2".into(), "Bruno".into()),
        );
        store.insert_room(room).await.unwrap();

        let mut tasks = Vec::new();
        for user in ["host-1", "user-2"] {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .update_room(
                        "11111",
                        Box::new(move |room| {
                            if let Some(p) = room.participants.get_mut(user) {
                                p.score += 1;
                            }
                            Ok(())
                        }),
                    )
                    .await
                    .unwrap()
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let room = store.get_room("11111").await.unwrap().unwrap();
        let scores: Vec<u32> = room.participants.values().map(|p| p.score).collect();
        assert_eq!(scores, vec![1, 1]);
    }
}
