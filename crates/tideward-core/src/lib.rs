//! Deterministic simultaneous-move turn engine.
//!
//! All player commands for a turn are collected up front and resolved in one
//! pass with fixed tie-breaks, so identical inputs always produce identical
//! states. Hosts construct a [`Game`], feed it commands through one of the
//! `process_turn*` entry points (or a [`CommandSource`]), and read results
//! back as snapshots, events, and replays.

mod config;
mod game;
mod map;
mod player;
mod ship;
mod source;
mod state;
mod stats;
mod store;
mod turn;

pub mod sim;

pub use crate::config::{
    load_config, ConfigError, ConfigSource, GameConfig, OffenseAction, OffensePolicy,
};
pub use crate::game::{Game, GameError, ReplayImportError};
pub use crate::map::GameMap;
pub use crate::player::{Player, PlayerStats};
pub use crate::ship::{Depot, Ship};
pub use crate::source::{CommandSource, ScriptedSource, SourceError};
pub use crate::state::GameState;
pub use crate::stats::{standings, FinalStanding};
pub use crate::store::EntityStore;
pub use crate::turn::CommandError;
