use serde::{Deserialize, Serialize};

use crate::{DepotId, Direction, Location, PlayerId, ShipId};

/// Why a player left the game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EliminationReason {
    /// Offense count crossed the configured threshold.
    Offenses,
    /// A single offense whose policy action is immediate elimination.
    PolicyAction,
    /// No ships left and not enough energy to commission one.
    NoAssets,
}

/// Severity class of a rejected command, used to pick the policy response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OffenseClass {
    /// Input could not be decoded, or the player failed to respond.
    Malformed,
    /// Well-formed but unaffordable or otherwise survivable.
    Illegal,
    /// Reference-integrity or game-rule breach (wrong owner, duplicate orders).
    Violation,
}

/// All engine→host events. Fully serializable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // Game flow
    TurnStarted {
        turn: u32,
    },
    TurnEnded {
        turn: u32,
    },
    GameEnded {
        turn: u32,
    },

    // Commands and offenses
    OffenseRecorded {
        player: PlayerId,
        class: OffenseClass,
        reason: String,
    },
    PlayerEliminated {
        player: PlayerId,
        turn: u32,
        reason: EliminationReason,
    },

    // Ship lifecycle
    ShipSpawned {
        ship: ShipId,
        owner: PlayerId,
        at: Location,
    },
    /// A staged spawn lost its shipyard cell and was refunded.
    SpawnCancelled {
        owner: PlayerId,
        at: Location,
    },
    ShipMoved {
        ship: ShipId,
        owner: PlayerId,
        from: Location,
        to: Location,
    },
    /// A move lost a contested cell; the ship holds its origin, cost refunded.
    MoveNullified {
        ship: ShipId,
        owner: PlayerId,
        at: Location,
        attempted: Direction,
    },
    ShipCaptured {
        ship: ShipId,
        old_owner: PlayerId,
        new_owner: PlayerId,
        at: Location,
    },

    // Economy
    DepotBuilt {
        depot: DepotId,
        owner: PlayerId,
        at: Location,
        cost_paid: i32,
    },
    EnergyMined {
        ship: ShipId,
        owner: PlayerId,
        at: Location,
        amount: i32,
        inspired: bool,
    },
    EnergyDeposited {
        ship: ShipId,
        owner: PlayerId,
        at: Location,
        amount: i32,
    },
}
