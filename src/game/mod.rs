//! Game simulation modules

pub mod arena;
pub mod combat;
pub mod config;
pub mod physics;
pub mod room;
pub mod seats;
pub mod snapshot;

pub use arena::{Arena, ArenaError, ArenaStatus, Participant};
pub use config::{ArenaConfig, ArenaConfigError};
pub use room::{ArenaRoom, RoomRegistry};
pub use snapshot::ArenaSnapshot;
