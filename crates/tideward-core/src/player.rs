use serde::{Deserialize, Serialize};

use tideward_protocol::{Location, PlayerId};

/// Per-player running totals used for end-of-game ranking.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlayerStats {
    /// Energy banked this turn; folded into `total_production` at end of turn.
    pub turn_production: i32,
    pub total_production: i32,
    pub last_turn_alive: u32,
    /// Offending turns accumulated toward the elimination threshold.
    pub offenses: u32,
    /// Assigned exactly once, at game end. 1 is the winner.
    pub rank: Option<u32>,
}

/// A participant. Players are never removed mid-game; `alive` flips once and
/// the statistics are retained for final accounting.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub energy: i32,
    pub shipyard: Location,
    pub alive: bool,
    pub stats: PlayerStats,
}

impl Player {
    pub fn new(id: PlayerId, name: String, energy: i32, shipyard: Location) -> Self {
        Self {
            id,
            name,
            energy,
            shipyard,
            alive: true,
            stats: PlayerStats::default(),
        }
    }
}
