use serde::{Deserialize, Serialize};

use tideward_protocol::{Location, PlayerId};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ship {
    pub owner: PlayerId,
    pub position: Location,
    /// Energy carried, capped at `GameConfig::max_cargo`.
    pub cargo: i32,
    /// Recomputed every turn from nearby enemy ship density.
    pub inspired: bool,
}

impl Ship {
    pub fn new(owner: PlayerId, position: Location) -> Self {
        Self {
            owner,
            position,
            cargo: 0,
            inspired: false,
        }
    }
}

/// A built drop-off structure. Ships deposit cargo on any friendly depot or
/// on their owner's shipyard.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Depot {
    pub owner: PlayerId,
    pub position: Location,
}
