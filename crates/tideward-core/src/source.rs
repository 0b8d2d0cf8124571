use std::collections::BTreeMap;

use thiserror::Error;

use tideward_protocol::PlayerId;

use crate::state::GameState;

/// Failure surfaced by the player-I/O collaborator. Both variants are handled
/// like a parse error for the turn and count toward elimination thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("player failed to respond in time")]
    Timeout,
    #[error("player connection closed")]
    Closed,
}

/// The player-I/O collaborator: yields one raw command stream per playable
/// player per turn. Timeouts are the collaborator's responsibility; the
/// engine only sees text or an error.
pub trait CommandSource {
    /// Called once at the start of every turn, before any player is polled.
    fn begin_turn(&mut self, _turn: u32) {}

    fn commands_for(
        &mut self,
        player: PlayerId,
        state: &GameState,
    ) -> Result<String, SourceError>;
}

/// Pre-scripted command streams, used by tests and the headless harness.
/// Players missing from a turn's script submit an empty (no-op) stream.
#[derive(Clone, Debug, Default)]
pub struct ScriptedSource {
    turns: Vec<BTreeMap<PlayerId, String>>,
    cursor: usize,
}

impl ScriptedSource {
    pub fn new(turns: Vec<BTreeMap<PlayerId, String>>) -> Self {
        Self { turns, cursor: 0 }
    }

    pub fn push_turn(&mut self, turn: BTreeMap<PlayerId, String>) {
        self.turns.push(turn);
    }
}

impl CommandSource for ScriptedSource {
    fn begin_turn(&mut self, turn: u32) {
        self.cursor = (turn as usize).saturating_sub(1);
    }

    fn commands_for(
        &mut self,
        player: PlayerId,
        _state: &GameState,
    ) -> Result<String, SourceError> {
        Ok(self
            .turns
            .get(self.cursor)
            .and_then(|turn| turn.get(&player))
            .cloned()
            .unwrap_or_default())
    }
}
