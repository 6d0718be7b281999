//! WebSocket transport

pub mod handler;
pub mod protocol;
pub mod session;

pub use handler::{ws_handler, ws_room_handler};
