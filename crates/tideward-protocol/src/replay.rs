use serde::{Deserialize, Serialize};

use crate::{Command, PlayerId, Snapshot};

/// A complete recorded game: the initial state plus every issued command.
///
/// Re-running the turns against an engine built from `initial` under the same
/// config hash reproduces the final state byte-for-byte.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplayFile {
    /// Replay file schema version.
    pub version: u32,
    /// Deterministic hash of the game config (used to reject mismatched replays).
    pub config_hash: u64,
    pub initial: Snapshot,
    #[serde(default)]
    pub turns: Vec<ReplayTurn>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplayTurn {
    pub turn: u32,
    /// Per-player issued commands, in ascending player-id order.
    pub commands: Vec<PlayerCommands>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerCommands {
    pub player: PlayerId,
    pub commands: Vec<Command>,
    /// The player's raw input failed to decode (or the player never
    /// responded). Replaying re-raises the malformed-class offense so
    /// offense accumulation stays faithful.
    #[serde(default)]
    pub malformed: bool,
}

pub const REPLAY_VERSION: u32 = 1;
