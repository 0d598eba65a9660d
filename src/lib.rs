//! # Broadside Match Server
//!
//! Authoritative server for two-player Battleship over WebSocket.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     BROADSIDE SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  └── rng.rs      - Seeded Xorshift128+ PRNG                  │
//! │                                                              │
//! │  game/           - Rules (transport-agnostic)                │
//! │  ├── board.rs    - Grid, placement, shot resolution          │
//! │  ├── fleet.rs    - Ships and fleet layouts                   │
//! │  ├── state.rs    - Match state machine                       │
//! │  ├── events.rs   - Events returned as data                   │
//! │  └── error.rs    - Rejection reasons                         │
//! │                                                              │
//! │  network/        - Transport                                 │
//! │  ├── server.rs   - WebSocket server and command dispatch     │
//! │  ├── protocol.rs - Message types                             │
//! │  ├── session.rs  - Matchmaking and match registry            │
//! │  └── gateway.rs  - Per-connection event delivery             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Match Lifecycle
//!
//! Matches move `waiting → setup → battle → finished`. Every operation
//! either applies fully and returns the events to deliver, or is rejected
//! with no effect. All randomness (match ids, room codes, first turn) comes
//! from a seeded PRNG, so a fixed seed replays a session exactly.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::rng::DeterministicRng;
pub use game::board::{Board, Position, BOARD_SIZE};
pub use game::error::{GameError, PlacementError};
pub use game::state::{ConnectionId, Match, MatchId, MatchPhase};
pub use network::{GameServer, ServerConfig, SessionRegistry};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
