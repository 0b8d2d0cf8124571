use serde::{Deserialize, Serialize};

use crate::{DepotId, Location, PlayerId, ShipId};

/// Full game state for initial sync or mid-game resume.
///
/// A snapshot must reconstruct the data model exactly, entity ids and
/// generations included, so replays branched from it stay deterministic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub turn: u32,
    pub map: MapSnapshot,
    pub players: Vec<PlayerSnapshot>,
    pub ships: Vec<ShipSnapshot>,
    #[serde(default)]
    pub depots: Vec<DepotSnapshot>,
    /// Generation counter of every ship-store slot, freed slots included.
    /// Without these, an entity created after a resume could reuse a freed
    /// slot at a different generation than in the original run.
    #[serde(default)]
    pub ship_slots: Vec<u32>,
    #[serde(default)]
    pub depot_slots: Vec<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapSnapshot {
    pub width: u32,
    pub height: u32,
    /// Row-major cell energy.
    pub cells: Vec<i32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub energy: i32,
    pub shipyard: Location,
    pub alive: bool,
    #[serde(default)]
    pub total_production: i32,
    #[serde(default)]
    pub last_turn_alive: u32,
    #[serde(default)]
    pub offenses: u32,
    #[serde(default)]
    pub rank: Option<u32>,
}

/// Compact ship state for network and resume.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShipSnapshot {
    pub id: ShipId,
    pub owner: PlayerId,
    pub pos: Location,
    pub cargo: i32,
    #[serde(default)]
    pub inspired: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DepotSnapshot {
    pub id: DepotId,
    pub owner: PlayerId,
    pub pos: Location,
}
