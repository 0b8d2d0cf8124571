use std::collections::BTreeMap;

use thiserror::Error;
use tracing::info;

use tideward_protocol::{
    Command, Event, Location, PlayerId, ReplayFile, ReplayTurn, Snapshot, REPLAY_VERSION,
};

use crate::config::{ConfigError, GameConfig};
use crate::map::GameMap;
use crate::source::CommandSource;
use crate::state::GameState;
use crate::stats::{standings, FinalStanding};
use crate::turn::{self, PlayerInput};

#[derive(Debug, Error)]
pub enum GameError {
    #[error("player count {0} exceeds the supported maximum of 16")]
    TooManyPlayers(usize),
    #[error("the game has already ended")]
    GameOver,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ReplayImportError {
    #[error("unsupported replay version: {0}")]
    UnsupportedVersion(u32),
    #[error("config hash mismatch (expected {expected:#x}, got {got:#x})")]
    ConfigHashMismatch { expected: u64, got: u64 },
    #[error("replay out of sync at turn record {index} (expected T{expected_turn}, got T{got_turn})")]
    TurnOutOfSync {
        index: usize,
        expected_turn: u32,
        got_turn: u32,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// The authoritative game controller. Exposes lifecycle entry points only;
/// the turn pipeline itself lives in a crate-private module.
#[derive(Clone, Debug)]
pub struct Game {
    config: GameConfig,
    state: GameState,
    initial: Snapshot,
    command_log: Vec<ReplayTurn>,
    finished: bool,
}

impl Game {
    /// Fresh game on an externally generated map. One `(name, shipyard)`
    /// pair per player; player ids are assigned in order.
    pub fn new(
        config: GameConfig,
        map: GameMap,
        players: Vec<(String, Location)>,
    ) -> Result<Self, GameError> {
        config.validate()?;
        if players.len() > 16 {
            return Err(GameError::TooManyPlayers(players.len()));
        }

        let (names, shipyards): (Vec<String>, Vec<Location>) = players.into_iter().unzip();
        let state = GameState::new(map, names, shipyards, config.initial_energy);
        let initial = state.snapshot();

        info!(
            players = state.players().len(),
            width = state.map().width(),
            height = state.map().height(),
            "game initialized"
        );

        Ok(Self {
            config,
            state,
            initial,
            command_log: Vec::new(),
            finished: false,
        })
    }

    /// Mid-game resume from a snapshot. The snapshot becomes the replay's
    /// initial state, so replays branched here stay self-contained.
    pub fn from_snapshot(config: GameConfig, snapshot: &Snapshot) -> Result<Self, GameError> {
        config.validate()?;
        if snapshot.players.len() > 16 {
            return Err(GameError::TooManyPlayers(snapshot.players.len()));
        }

        let state = GameState::from_snapshot(snapshot);
        // A snapshot of a finished game stays finished; ranks are write-once.
        let finished = state.players().iter().any(|p| p.stats.rank.is_some());

        info!(turn = state.turn(), "game resumed from snapshot");

        Ok(Self {
            config,
            state,
            initial: snapshot.clone(),
            command_log: Vec::new(),
            finished,
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }

    pub fn game_ended(&self) -> bool {
        self.finished || turn::game_ended(&self.state, &self.config)
    }

    pub fn player_can_play(&self, player: PlayerId) -> bool {
        turn::player_can_play(&self.state, &self.config, player)
    }

    /// Whether another player's entity or structure is within interaction
    /// range of `location`, on current positions.
    pub fn possible_interaction(&self, owner: PlayerId, location: Location) -> bool {
        self.state
            .possible_interaction(owner, location, self.config.interaction_radius)
    }

    /// Pull raw command text from the player-I/O collaborator and process
    /// one turn. Collaborator failures become malformed-class offenses.
    pub fn process_turn(
        &mut self,
        source: &mut dyn CommandSource,
    ) -> Result<Vec<Event>, GameError> {
        if self.game_ended() {
            return Err(GameError::GameOver);
        }

        source.begin_turn(self.state.turn() + 1);
        let mut inputs = BTreeMap::new();
        for id in self.playable_players() {
            let input = match source.commands_for(id, &self.state) {
                Ok(text) => PlayerInput::Text(text),
                Err(_) => PlayerInput::Failed,
            };
            inputs.insert(id, input);
        }
        Ok(self.run_turn_inputs(inputs))
    }

    /// Process one turn from pre-collected raw text, keyed by player id.
    pub fn process_turn_from_input(
        &mut self,
        inputs: BTreeMap<PlayerId, String>,
    ) -> Result<Vec<Event>, GameError> {
        if self.game_ended() {
            return Err(GameError::GameOver);
        }

        let inputs = inputs
            .into_iter()
            .filter(|(id, _)| self.player_can_play(*id))
            .map(|(id, text)| (id, PlayerInput::Text(text)))
            .collect();
        Ok(self.run_turn_inputs(inputs))
    }

    /// Process one turn from pre-parsed command sequences, keyed by player
    /// id. All three entry points converge on the same pipeline.
    pub fn process_turn_commands(
        &mut self,
        commands: BTreeMap<PlayerId, Vec<Command>>,
    ) -> Result<Vec<Event>, GameError> {
        if self.game_ended() {
            return Err(GameError::GameOver);
        }

        let inputs = commands
            .into_iter()
            .filter(|(id, _)| self.player_can_play(*id))
            .map(|(id, commands)| (id, PlayerInput::Commands(commands)))
            .collect();
        Ok(self.run_turn_inputs(inputs))
    }

    /// Drive the game to completion: turns until `game_ended`, then final
    /// ranking. Returns every event of the run.
    pub fn run_game(&mut self, source: &mut dyn CommandSource) -> Result<Vec<Event>, GameError> {
        let mut events = Vec::new();
        while !self.game_ended() {
            events.extend(self.process_turn(source)?);
        }
        events.extend(self.end_game());
        Ok(events)
    }

    /// Finalize: assign ranks exactly once. Idempotent.
    pub fn end_game(&mut self) -> Vec<Event> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;
        let mut events = Vec::new();
        turn::end_game(&mut self.state, &mut events);
        events
    }

    /// Final standings; empty until `end_game` has run.
    pub fn rankings(&self) -> Vec<FinalStanding> {
        if !self.finished {
            return Vec::new();
        }
        standings(self.state.players())
    }

    pub fn export_replay(&self) -> Result<ReplayFile, GameError> {
        Ok(ReplayFile {
            version: REPLAY_VERSION,
            config_hash: self.config.config_hash()?,
            initial: self.initial.clone(),
            turns: self.command_log.clone(),
        })
    }

    /// Rebuild a game by re-running a replay through the normal pipeline.
    pub fn from_replay(
        config: GameConfig,
        replay: &ReplayFile,
    ) -> Result<Self, ReplayImportError> {
        if replay.version != REPLAY_VERSION {
            return Err(ReplayImportError::UnsupportedVersion(replay.version));
        }
        let expected = config.config_hash()?;
        if replay.config_hash != expected {
            return Err(ReplayImportError::ConfigHashMismatch {
                expected,
                got: replay.config_hash,
            });
        }

        let mut game = Game {
            state: GameState::from_snapshot(&replay.initial),
            initial: replay.initial.clone(),
            config,
            command_log: Vec::new(),
            finished: false,
        };

        for (index, recorded) in replay.turns.iter().enumerate() {
            let expected_turn = game.state.turn() + 1;
            if recorded.turn != expected_turn {
                return Err(ReplayImportError::TurnOutOfSync {
                    index,
                    expected_turn,
                    got_turn: recorded.turn,
                });
            }

            let inputs = recorded
                .commands
                .iter()
                .map(|pc| {
                    let input = if pc.malformed {
                        PlayerInput::Failed
                    } else {
                        PlayerInput::Commands(pc.commands.clone())
                    };
                    (pc.player, input)
                })
                .collect();
            game.run_turn_inputs(inputs);
        }

        Ok(game)
    }

    fn playable_players(&self) -> Vec<PlayerId> {
        self.state
            .players()
            .iter()
            .filter(|p| turn::player_can_play(&self.state, &self.config, p.id))
            .map(|p| p.id)
            .collect()
    }

    fn run_turn_inputs(&mut self, inputs: BTreeMap<PlayerId, PlayerInput>) -> Vec<Event> {
        let report = turn::run_turn(&mut self.state, &self.config, inputs);
        self.command_log.push(ReplayTurn {
            turn: self.state.turn(),
            commands: report.issued,
        });
        report.events
    }
}
