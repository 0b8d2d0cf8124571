use serde::{Deserialize, Serialize};
use thiserror::Error;

use tideward_protocol::wire::hash_bytes_fnv1a64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("json encode error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// What the turn processor does with an offending command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffenseAction {
    /// Drop the offending command, keep the rest of the player's turn.
    SkipCommand,
    /// Discard the player's entire turn.
    VoidTurn,
    /// Void the turn and eliminate the player at end-of-turn processing.
    Eliminate,
}

/// Policy response per offense severity class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffensePolicy {
    /// Undecodable input or a non-responding player.
    #[serde(default = "default_malformed_action")]
    pub malformed: OffenseAction,
    /// Well-formed but unaffordable or otherwise survivable.
    #[serde(default = "default_illegal_action")]
    pub illegal: OffenseAction,
    /// Reference-integrity or game-rule breach.
    #[serde(default = "default_violation_action")]
    pub violation: OffenseAction,
}

impl Default for OffensePolicy {
    fn default() -> Self {
        Self {
            malformed: default_malformed_action(),
            illegal: default_illegal_action(),
            violation: default_violation_action(),
        }
    }
}

fn default_malformed_action() -> OffenseAction {
    OffenseAction::VoidTurn
}

fn default_illegal_action() -> OffenseAction {
    OffenseAction::SkipCommand
}

fn default_violation_action() -> OffenseAction {
    OffenseAction::VoidTurn
}

/// All tunable game constants. Every policy constant the engine consults is
/// an explicit field here; nothing is inferred from call order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Hard turn limit; the game ends when the turn counter reaches it.
    pub max_turns: u32,
    /// Energy debited to commission a ship at the shipyard.
    pub spawn_cost: i32,
    /// Base energy cost of converting a ship into a depot. The ship's cargo
    /// and the cell's energy are credited against it.
    pub depot_cost: i32,
    /// Cargo capacity per ship.
    pub max_cargo: i32,
    /// A mining ship extracts `ceil(cell / extract_ratio)` per turn.
    pub extract_ratio: i32,
    /// Leaving a cell costs `floor(cell / move_cost_ratio)` cargo.
    pub move_cost_ratio: i32,
    /// Radius of the enemy-density scan for inspiration.
    pub inspiration_radius: i32,
    /// Enemy ships within radius needed to set the inspired flag.
    pub inspiration_ship_count: usize,
    /// An inspired ship gains `extracted * multiplier` bonus cargo.
    pub inspired_bonus_multiplier: i32,
    /// Radius within which entities of different players can interact.
    pub interaction_radius: i32,
    /// Enemy-minus-friendly ship surplus required to capture a ship.
    pub capture_margin: usize,
    /// Master switch for the capture rule.
    pub captures_enabled: bool,
    /// Energy each player starts with.
    pub initial_energy: i32,
    pub offense_policy: OffensePolicy,
    /// Offending turns before forced elimination (checked at end of turn).
    pub elimination_threshold: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_turns: 400,
            spawn_cost: 1000,
            depot_cost: 4000,
            max_cargo: 1000,
            extract_ratio: 4,
            move_cost_ratio: 10,
            inspiration_radius: 4,
            inspiration_ship_count: 2,
            inspired_bonus_multiplier: 2,
            interaction_radius: 3,
            capture_margin: 3,
            captures_enabled: true,
            initial_energy: 5000,
            offense_policy: OffensePolicy::default(),
            elimination_threshold: 3,
        }
    }
}

pub enum ConfigSource<'a> {
    Embedded,
    Path(String),
    Bytes(&'a [u8]),
}

pub fn load_config(source: ConfigSource<'_>) -> Result<GameConfig, ConfigError> {
    let config: GameConfig = match source {
        ConfigSource::Embedded => serde_yaml::from_str(include_str!("../data/config.yaml"))?,
        ConfigSource::Path(path) => serde_yaml::from_str(&std::fs::read_to_string(path)?)?,
        ConfigSource::Bytes(bytes) => serde_yaml::from_slice(bytes)?,
    };
    config.validate()?;
    Ok(config)
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extract_ratio <= 0 {
            return Err(ConfigError::Invalid("extract_ratio must be positive".into()));
        }
        if self.move_cost_ratio <= 0 {
            return Err(ConfigError::Invalid(
                "move_cost_ratio must be positive".into(),
            ));
        }
        if self.max_turns == 0 {
            return Err(ConfigError::Invalid("max_turns must be positive".into()));
        }
        if self.max_cargo <= 0 {
            return Err(ConfigError::Invalid("max_cargo must be positive".into()));
        }
        Ok(())
    }

    /// Stable hash of the canonical JSON encoding, recorded into replays so
    /// a replay is rejected when run under different constants.
    pub fn config_hash(&self) -> Result<u64, ConfigError> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hash_bytes_fnv1a64(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_config_matches_defaults() {
        let config = load_config(ConfigSource::Embedded).expect("config load");
        assert_eq!(config, GameConfig::default());
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let config = load_config(ConfigSource::Bytes(b"max_turns: 50\nspawn_cost: 200\n"))
            .expect("config load");
        assert_eq!(config.max_turns, 50);
        assert_eq!(config.spawn_cost, 200);
        assert_eq!(config.extract_ratio, GameConfig::default().extract_ratio);
    }

    #[test]
    fn invalid_ratio_is_rejected() {
        let err = load_config(ConfigSource::Bytes(b"extract_ratio: 0\n"));
        assert!(err.is_err());
    }

    #[test]
    fn hash_tracks_content() {
        let a = GameConfig::default();
        let mut b = GameConfig::default();
        assert_eq!(a.config_hash().unwrap(), b.config_hash().unwrap());
        b.spawn_cost = 1;
        assert_ne!(a.config_hash().unwrap(), b.config_hash().unwrap());
    }
}
