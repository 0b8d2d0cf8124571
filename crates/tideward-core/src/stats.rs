use serde::{Deserialize, Serialize};

use tideward_protocol::PlayerId;

use crate::player::Player;

/// One row of the final standings, for external results reporters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FinalStanding {
    pub player: PlayerId,
    pub name: String,
    /// 1 is the winner.
    pub rank: u32,
    pub last_turn_alive: u32,
    pub total_production: i32,
}

/// Assign final ranks in place. Primary key: last turn alive, descending
/// (survivors outrank the eliminated). Secondary: total production,
/// descending. Final tie-break: player id, ascending, so the order is always
/// strict and total. Runs exactly once, at game end.
pub(crate) fn rank_players(players: &mut [Player]) {
    debug_assert!(players.iter().all(|p| p.stats.rank.is_none()));

    let mut order: Vec<usize> = (0..players.len()).collect();
    order.sort_by(|&a, &b| {
        let pa = &players[a];
        let pb = &players[b];
        pb.stats
            .last_turn_alive
            .cmp(&pa.stats.last_turn_alive)
            .then(pb.stats.total_production.cmp(&pa.stats.total_production))
            .then(pa.id.cmp(&pb.id))
    });

    for (position, index) in order.into_iter().enumerate() {
        players[index].stats.rank = Some(position as u32 + 1);
    }
}

/// Final standings sorted by rank. Only meaningful after `rank_players`.
pub fn standings(players: &[Player]) -> Vec<FinalStanding> {
    let mut rows: Vec<FinalStanding> = players
        .iter()
        .map(|p| FinalStanding {
            player: p.id,
            name: p.name.clone(),
            rank: p.stats.rank.unwrap_or(u32::MAX),
            last_turn_alive: p.stats.last_turn_alive,
            total_production: p.stats.total_production,
        })
        .collect();
    rows.sort_by_key(|row| row.rank);
    rows
}
