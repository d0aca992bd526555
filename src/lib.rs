//! Library crate for trivia-rooms, exposing the room synchronization core
//! for binaries and integration tests.

pub mod catalog;
pub mod config;
pub mod error;
pub mod game;
pub mod identity;
pub mod room;
pub mod store;
