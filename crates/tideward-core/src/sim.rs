//! Headless simulation harness: drive a full game from a scripted (or any
//! other) command source and distill the event stream into metrics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use tideward_protocol::{Event, PlayerId, Snapshot};

use crate::game::{Game, GameError};
use crate::source::CommandSource;
use crate::stats::FinalStanding;

/// Per-player aggregates for a finished simulation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlayerMetrics {
    pub total_production: i32,
    pub offenses: u32,
    pub ships_spawned: u32,
    pub ships_lost_to_capture: u32,
    pub ships_captured: u32,
    pub moves_nullified: u32,
    pub spawns_cancelled: u32,
    pub depots_built: u32,
    pub eliminated_turn: Option<u32>,
    pub rank: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GameMetrics {
    pub players: BTreeMap<PlayerId, PlayerMetrics>,
    pub total_events: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimResult {
    pub turns_played: u32,
    pub standings: Vec<FinalStanding>,
    pub metrics: GameMetrics,
    pub final_snapshot: Snapshot,
}

impl SimResult {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Run `game` to completion against `source` and aggregate the results.
/// The game must be freshly constructed (or resumed mid-run).
pub fn run_sim(mut game: Game, source: &mut dyn CommandSource) -> Result<SimResult, GameError> {
    let events = game.run_game(source)?;

    let mut metrics = GameMetrics {
        total_events: events.len(),
        ..GameMetrics::default()
    };
    for event in &events {
        match event {
            Event::ShipSpawned { owner, .. } => {
                metrics.players.entry(*owner).or_default().ships_spawned += 1;
            }
            Event::SpawnCancelled { owner, .. } => {
                metrics.players.entry(*owner).or_default().spawns_cancelled += 1;
            }
            Event::MoveNullified { owner, .. } => {
                metrics.players.entry(*owner).or_default().moves_nullified += 1;
            }
            Event::DepotBuilt { owner, .. } => {
                metrics.players.entry(*owner).or_default().depots_built += 1;
            }
            Event::ShipCaptured {
                old_owner,
                new_owner,
                ..
            } => {
                metrics
                    .players
                    .entry(*old_owner)
                    .or_default()
                    .ships_lost_to_capture += 1;
                metrics.players.entry(*new_owner).or_default().ships_captured += 1;
            }
            Event::PlayerEliminated { player, turn, .. } => {
                metrics.players.entry(*player).or_default().eliminated_turn = Some(*turn);
            }
            _ => {}
        }
    }

    let standings = game.rankings();
    for row in &standings {
        let entry = metrics.players.entry(row.player).or_default();
        entry.total_production = row.total_production;
        entry.rank = row.rank;
    }
    for player in game.state().players() {
        metrics.players.entry(player.id).or_default().offenses = player.stats.offenses;
    }

    info!(
        turns = game.state().turn(),
        players = standings.len(),
        "simulation finished"
    );

    Ok(SimResult {
        turns_played: game.state().turn(),
        standings,
        metrics,
        final_snapshot: game.snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::map::GameMap;
    use crate::source::ScriptedSource;
    use tideward_protocol::Location;

    fn short_game() -> Game {
        let config = GameConfig {
            max_turns: 5,
            ..GameConfig::default()
        };
        let map = GameMap::new(8, 8, 200);
        Game::new(
            config,
            map,
            vec![
                ("north".to_string(), Location::new(2, 2)),
                ("south".to_string(), Location::new(5, 5)),
            ],
        )
        .expect("game init")
    }

    #[test]
    fn sim_runs_to_the_turn_limit() {
        let game = short_game();
        let script = vec![[
            (PlayerId(0), "g".to_string()),
            (PlayerId(1), "g".to_string()),
        ]
        .into_iter()
        .collect()];
        let mut source = ScriptedSource::new(script);

        let result = run_sim(game, &mut source).expect("sim");
        assert_eq!(result.turns_played, 5);
        assert_eq!(result.standings.len(), 2);
        assert_eq!(result.metrics.players[&PlayerId(0)].ships_spawned, 1);
        assert_eq!(result.final_snapshot.turn, 5);
    }

    #[test]
    fn standings_cover_every_player_with_unique_ranks() {
        let game = short_game();
        let mut source = ScriptedSource::default();

        let result = run_sim(game, &mut source).expect("sim");
        let mut ranks: Vec<u32> = result.standings.iter().map(|row| row.rank).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![1, 2]);
    }

    #[test]
    fn sim_result_serializes_to_json() {
        let game = short_game();
        let mut source = ScriptedSource::default();
        let result = run_sim(game, &mut source).expect("sim");
        let json = result.to_json().expect("json");
        assert!(json.contains("\"turns_played\": 5"));
    }
}
