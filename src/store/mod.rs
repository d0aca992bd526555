//! Document store abstraction for room documents.
//!
//! The store is the only channel between clients: every cross-client effect
//! travels as a room-document write observed through a watch subscription.
//! Concurrent writers therefore never overwrite each other's fields blindly;
//! all mutation goes through [`RoomStore::update_room`], an atomic
//! read-modify-write scoped to one document.

pub mod memory;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::watch;

use crate::error::RoomError;
use crate::room::model::Room;

/// Backend failure while reading or writing a room document.
///
/// Callers treat these as transient: the host timer loop logs the failure
/// and retries on its next tick rather than tearing the room down.
#[derive(Debug, Error)]
#[error("room store failed during {operation}: {message}")]
pub struct StoreError {
    /// Store operation that failed (`insert`, `update`, `watch`, ...).
    pub operation: &'static str,
    /// Backend-specific description of the failure.
    pub message: String,
}

/// Result alias for room store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Transaction body applied to a room document under the store's lock.
///
/// Returning an error aborts the transaction: the document is left untouched
/// and no change notification is published.
pub type Mutation = Box<dyn FnOnce(&mut Room) -> Result<(), RoomError> + Send>;

/// Result of a transactional room update.
#[derive(Debug)]
pub enum MutationOutcome {
    /// The mutation committed; carries the post-commit document snapshot.
    Committed(Room),
    /// The mutation body rejected the update; the document is unchanged.
    Aborted(RoomError),
    /// The room document no longer exists. Writers racing a deleted room
    /// land here and must treat it as a no-op, not a failure.
    Missing,
}

/// Abstraction over the persistence layer for room documents.
///
/// Documents are keyed by room code. Deletion is the authoritative closure
/// signal: watchers observe `None` and must treat it as terminal.
pub trait RoomStore: Send + Sync {
    /// Insert a fresh room document keyed by `room.id`.
    ///
    /// Returns `false` without touching the store when the code is already
    /// taken, so callers can drive a collision-retry loop.
    fn insert_room(&self, room: Room) -> BoxFuture<'static, StoreResult<bool>>;

    /// Fetch a point-in-time snapshot of a room document.
    fn get_room(&self, id: &str) -> BoxFuture<'static, StoreResult<Option<Room>>>;

    /// Atomically read-modify-write a room document.
    fn update_room(&self, id: &str, mutation: Mutation)
    -> BoxFuture<'static, StoreResult<MutationOutcome>>;

    /// Delete a room document, closing the room for every subscriber.
    ///
    /// Returns `false` when no document existed (idempotent).
    fn delete_room(&self, id: &str) -> BoxFuture<'static, StoreResult<bool>>;

    /// Subscribe to live snapshots of a room document.
    ///
    /// The receiver yields `Some(room)` after each committed write and a
    /// final `None` once the room is deleted. Subscribing to an unknown id
    /// yields an immediate `None`.
    fn watch_room(&self, id: &str)
    -> BoxFuture<'static, StoreResult<watch::Receiver<Option<Room>>>>;
}
