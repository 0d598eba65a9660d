//! Network Layer
//!
//! WebSocket transport, matchmaking registry and event delivery.
//! Game rules live in `game/`; this layer only routes.

pub mod gateway;
pub mod protocol;
pub mod session;
pub mod server;

pub use gateway::BroadcastGateway;
pub use protocol::{ClientMessage, ServerMessage};
pub use session::{Joined, SessionRegistry};
pub use server::{dispatch, GameServer, ServerConfig, GameServerError};
