//! Room Manager: lifecycle, membership, host authority, and the host-side
//! timer loop driving question progression.

pub mod code;
pub mod driver;
pub mod manager;
pub mod model;
pub mod phase;
