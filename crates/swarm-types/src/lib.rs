//! Core types for the swarm engine — zero external deps beyond serde.
//!
//! This crate defines every type shared across the engine, data catalog,
//! and server: hex geometry, IDs, enums, board/game state, actions, the
//! wire protocol, and the error taxonomy. It has no game logic of its own.

pub mod action;
pub mod enums;
pub mod errors;
pub mod hex;
pub mod ids;
pub mod protocol;
pub mod state;

pub use action::{BoardAction, GameAction, Movement};
pub use enums::*;
pub use errors::{GameError, LegalityError};
pub use hex::{Loc, Plane};
pub use ids::*;
pub use protocol::{BoardSnapshot, GameSnapshot, Query, Response};
pub use state::{
    Board, BoardState, Game, KilledRecord, LoggedAction, Piece, PieceSpec, PieceStats,
    SpellPlayInfo, TechState, Tile, UnsummonedRecord,
};
