//! Colonist - replay colonist.io game logs onto a Catan board model
//!
//! The crate reads the plain-text log a colonist.io game prints and rebuilds
//! the state it describes:
//! - Cube coordinates for hexes, their vertices and edges
//! - A board of tiles, ports, settlements and roads with placement queries
//! - Player hands, structures, development cards and victory points
//! - A recursive-descent parser for the log grammar
//!
//! # Flow
//!
//! Text goes through [`grammar`] into a typed [`grammar::GameLog`], then the
//! [`interpreter`] applies each event to a [`game::GameState`]. The log never
//! says where a structure was placed; a [`locator::Locator`] supplies that
//! when known. [`replay`] ties the steps together so a failing log leaves
//! the caller's state untouched.
//!
//! # Modules
//!
//! - [`hex`]: Coordinate system for hex tiles, vertices, and edges
//! - [`board`]: Board registries, longest road, placement queries
//! - [`player`]: Player state, hands and purchases
//! - [`game`]: Roster, bonuses and victory points
//! - [`grammar`]: Log parser
//! - [`interpreter`]: Applies parsed events
//! - [`replay`]: Transactional entry points

pub mod board;
pub mod config;
pub mod game;
pub mod grammar;
pub mod hex;
pub mod interpreter;
pub mod locator;
pub mod player;
pub mod replay;

// Re-export commonly used types
pub use board::{
    Board, BoardError, BoardRecords, Hex, HexRecord, PlayerId, Port, PortRates, PortRecord,
    Resource, Road, Settlement, Terrain,
};
pub use config::{Affordability, ReplayConfig};
pub use game::{DiceRoll, GameError, GameState, GameSummary, PlayerSummary};
pub use grammar::{parse_game, parse_opening, parse_turn, Event, GameLog, ParseError, Structure};
pub use hex::{Edge, GeometryError, HexCoord, Triple};
pub use interpreter::Interpreter;
pub use locator::{Locator, NoLocator, ScriptedLocator};
pub use player::{DevelopmentCard, Player, PlayerColor, Purchase, PurchaseOption, ResourceHand};
pub use replay::{replay, replay_opening, replay_turn, ReplayError};
