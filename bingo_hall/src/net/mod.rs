//! Wire protocol and event fan-out for the real-time session gateway.

pub mod messages;
pub mod rooms;

pub use messages::{ClientAction, ServerEvent};
pub use rooms::{ConnId, RoomId, Rooms};
