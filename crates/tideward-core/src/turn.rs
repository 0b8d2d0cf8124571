//! The turn pipeline: validate and partition commands, apply effects,
//! resolve contested cells and captures, harvest, recompute derived flags,
//! and close out the turn. Crate-private; hosts drive it through `Game`.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::{debug, info, warn};

use tideward_protocol::{
    parse_commands, Command, Direction, EliminationReason, Event, Location, OffenseClass,
    PlayerCommands, PlayerId, ShipId,
};

use crate::config::{GameConfig, OffenseAction};
use crate::ship::{Depot, Ship};
use crate::state::GameState;
use crate::stats;

/// A command rejected during validation, attributed to the issuing player.
/// Contained within the turn; never aborts the game.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("malformed input: {0}")]
    Malformed(String),
    #[error("player failed to respond")]
    NoResponse,
    #[error("unknown ship {0}")]
    UnknownShip(u64),
    #[error("ship {0} belongs to another player")]
    NotYourShip(u64),
    #[error("ship {0} was given more than one order")]
    DuplicateOrder(u64),
    #[error("more than one spawn in a single turn")]
    DuplicateSpawn,
    #[error("not enough energy")]
    InsufficientEnergy,
    #[error("not enough cargo to pay the move cost")]
    InsufficientCargo,
    #[error("a structure already occupies that cell")]
    StructureInTheWay,
}

impl CommandError {
    pub fn class(&self) -> OffenseClass {
        match self {
            CommandError::Malformed(_) | CommandError::NoResponse => OffenseClass::Malformed,
            CommandError::InsufficientEnergy
            | CommandError::InsufficientCargo
            | CommandError::StructureInTheWay => OffenseClass::Illegal,
            CommandError::UnknownShip(_)
            | CommandError::NotYourShip(_)
            | CommandError::DuplicateOrder(_)
            | CommandError::DuplicateSpawn => OffenseClass::Violation,
        }
    }
}

/// One player's input for a turn, before validation.
pub(crate) enum PlayerInput {
    Text(String),
    Commands(Vec<Command>),
    /// The I/O collaborator reported a failure for this player.
    Failed,
}

/// What a completed turn hands back to the controller.
pub(crate) struct TurnReport {
    pub events: Vec<Event>,
    /// Commands as issued (post-parse, pre-validation), for replay recording.
    pub issued: Vec<PlayerCommands>,
}

struct MoveIntent {
    ship: ShipId,
    owner: PlayerId,
    from: Location,
    to: Location,
    direction: Direction,
    cost: i32,
    strength: i32,
}

struct SpawnIntent {
    owner: PlayerId,
    at: Location,
}

struct ConstructIntent {
    ship: ShipId,
    owner: PlayerId,
}

#[derive(Default)]
struct Staged {
    constructs: Vec<ConstructIntent>,
    moves: Vec<MoveIntent>,
    spawns: Vec<SpawnIntent>,
}

/// Run one full turn against the state. `inputs` holds exactly the players
/// being collected this turn; absent players issue nothing.
pub(crate) fn run_turn(
    state: &mut GameState,
    config: &GameConfig,
    inputs: BTreeMap<PlayerId, PlayerInput>,
) -> TurnReport {
    let mut events = Vec::new();
    let mut issued = Vec::new();

    // Start turn.
    state.turn += 1;
    let turn = state.turn;
    for player in state.players.iter_mut() {
        player.stats.turn_production = 0;
    }
    events.push(Event::TurnStarted { turn });
    debug!(turn, "turn started");

    // Validate & partition.
    let mut offenders: BTreeSet<PlayerId> = BTreeSet::new();
    let mut pending_elimination: BTreeSet<PlayerId> = BTreeSet::new();
    let mut staged = Staged::default();

    for (player_id, input) in inputs {
        let (commands, malformed) = match input {
            PlayerInput::Text(text) => match parse_commands(&text) {
                Ok(commands) => (commands, false),
                Err(err) => {
                    handle_error(
                        &mut offenders,
                        &mut pending_elimination,
                        &mut events,
                        config,
                        player_id,
                        CommandError::Malformed(err.to_string()),
                    );
                    (Vec::new(), true)
                }
            },
            PlayerInput::Commands(commands) => (commands, false),
            PlayerInput::Failed => {
                handle_error(
                    &mut offenders,
                    &mut pending_elimination,
                    &mut events,
                    config,
                    player_id,
                    CommandError::NoResponse,
                );
                (Vec::new(), true)
            }
        };

        issued.push(PlayerCommands {
            player: player_id,
            commands: commands.clone(),
            malformed,
        });

        validate_player_commands(
            state,
            config,
            player_id,
            commands,
            &mut staged,
            &mut offenders,
            &mut pending_elimination,
            &mut events,
        );
    }

    for &offender in &offenders {
        if let Some(player) = state.player_mut(offender) {
            player.stats.offenses += 1;
        }
    }

    // Apply effects.
    apply_constructs(state, config, &staged.constructs, &mut events);
    for spawn in &staged.spawns {
        if let Some(player) = state.player_mut(spawn.owner) {
            player.energy -= config.spawn_cost;
        }
    }

    // Resolve interactions.
    let moved = resolve_movement(state, config, staged.moves, staged.spawns, &mut events);
    if config.captures_enabled {
        resolve_captures(state, config, &mut events);
    }
    harvest(state, config, &moved, &mut events);

    // Update derived flags.
    update_inspiration(state, config);

    // End turn.
    end_turn(state, config, &pending_elimination, &mut events);

    TurnReport { events, issued }
}

/// Classify a command error, record the offense, and apply the configured
/// policy action. Returns the action so the caller can stop validating a
/// voided turn.
fn handle_error(
    offenders: &mut BTreeSet<PlayerId>,
    pending_elimination: &mut BTreeSet<PlayerId>,
    events: &mut Vec<Event>,
    config: &GameConfig,
    player: PlayerId,
    error: CommandError,
) -> OffenseAction {
    let class = error.class();
    let action = match class {
        OffenseClass::Malformed => config.offense_policy.malformed,
        OffenseClass::Illegal => config.offense_policy.illegal,
        OffenseClass::Violation => config.offense_policy.violation,
    };

    warn!(%player, %error, ?class, ?action, "command rejected");
    offenders.insert(player);
    events.push(Event::OffenseRecorded {
        player,
        class,
        reason: error.to_string(),
    });

    if action == OffenseAction::Eliminate {
        pending_elimination.insert(player);
    }
    action
}

#[allow(clippy::too_many_arguments)]
fn validate_player_commands(
    state: &GameState,
    config: &GameConfig,
    player_id: PlayerId,
    commands: Vec<Command>,
    staged: &mut Staged,
    offenders: &mut BTreeSet<PlayerId>,
    pending_elimination: &mut BTreeSet<PlayerId>,
    events: &mut Vec<Event>,
) {
    let Some(player) = state.player(player_id) else {
        return;
    };
    let shipyard = player.shipyard;

    let mut ordered: BTreeSet<u64> = BTreeSet::new();
    let mut budget = player.energy;
    let mut spawned = false;
    let mut accepted = Staged::default();

    let mut voided = false;
    for command in commands {
        let result = validate_command(
            state,
            config,
            player_id,
            shipyard,
            &command,
            &mut ordered,
            &mut budget,
            &mut spawned,
            &mut accepted,
        );
        if let Err(error) = result {
            let action = handle_error(
                offenders,
                pending_elimination,
                events,
                config,
                player_id,
                error,
            );
            match action {
                OffenseAction::SkipCommand => continue,
                OffenseAction::VoidTurn | OffenseAction::Eliminate => {
                    voided = true;
                    break;
                }
            }
        }
    }

    if !voided {
        staged.constructs.extend(accepted.constructs);
        staged.moves.extend(accepted.moves);
        staged.spawns.extend(accepted.spawns);
    }
}

#[allow(clippy::too_many_arguments)]
fn validate_command(
    state: &GameState,
    config: &GameConfig,
    player_id: PlayerId,
    shipyard: Location,
    command: &Command,
    ordered: &mut BTreeSet<u64>,
    budget: &mut i32,
    spawned: &mut bool,
    accepted: &mut Staged,
) -> Result<(), CommandError> {
    match command {
        Command::Move { ship, direction } => {
            let ship_ref = state
                .ship(*ship)
                .ok_or(CommandError::UnknownShip(ship.to_raw()))?;
            if ship_ref.owner != player_id {
                return Err(CommandError::NotYourShip(ship.to_raw()));
            }
            if !ordered.insert(ship.to_raw()) {
                return Err(CommandError::DuplicateOrder(ship.to_raw()));
            }
            if *direction == Direction::Still {
                // Holding position is the default; nothing to stage.
                return Ok(());
            }

            let from = ship_ref.position;
            let cost = state.map().energy_at(from) / config.move_cost_ratio;
            if cost > ship_ref.cargo {
                return Err(CommandError::InsufficientCargo);
            }
            accepted.moves.push(MoveIntent {
                ship: *ship,
                owner: player_id,
                from,
                to: state.map().normalize(from.step(*direction)),
                direction: *direction,
                cost,
                strength: ship_ref.cargo,
            });
            Ok(())
        }
        Command::Spawn => {
            if *spawned {
                return Err(CommandError::DuplicateSpawn);
            }
            if *budget < config.spawn_cost {
                return Err(CommandError::InsufficientEnergy);
            }
            *budget -= config.spawn_cost;
            *spawned = true;
            accepted.spawns.push(SpawnIntent {
                owner: player_id,
                at: shipyard,
            });
            Ok(())
        }
        Command::Construct { ship } => {
            let ship_ref = state
                .ship(*ship)
                .ok_or(CommandError::UnknownShip(ship.to_raw()))?;
            if ship_ref.owner != player_id {
                return Err(CommandError::NotYourShip(ship.to_raw()));
            }
            if !ordered.insert(ship.to_raw()) {
                return Err(CommandError::DuplicateOrder(ship.to_raw()));
            }
            if state.structure_owner(ship_ref.position).is_some() {
                return Err(CommandError::StructureInTheWay);
            }

            let credit = ship_ref.cargo + state.map().energy_at(ship_ref.position);
            let cost = (config.depot_cost - credit).max(0);
            if *budget < cost {
                return Err(CommandError::InsufficientEnergy);
            }
            *budget -= cost;
            accepted.constructs.push(ConstructIntent {
                ship: *ship,
                owner: player_id,
            });
            Ok(())
        }
    }
}

fn apply_constructs(
    state: &mut GameState,
    config: &GameConfig,
    constructs: &[ConstructIntent],
    events: &mut Vec<Event>,
) {
    for intent in constructs {
        let Some(ship) = state.ships.remove(intent.ship) else {
            continue;
        };
        let at = ship.position;
        let cell = *state.map.energy_at_mut(at);
        let cost_paid = (config.depot_cost - ship.cargo - cell).max(0);
        *state.map.energy_at_mut(at) = 0;
        if let Some(player) = state.player_mut(intent.owner) {
            player.energy -= cost_paid;
        }
        let depot = state.depots.insert(Depot {
            owner: intent.owner,
            position: at,
        });
        events.push(Event::DepotBuilt {
            depot,
            owner: intent.owner,
            at,
            cost_paid,
        });
    }
}

enum Contender {
    Move(MoveIntent),
    Spawn(SpawnIntent),
}

impl Contender {
    /// Contest priority: contributed strength (cargo) descending, then owner
    /// id ascending, then ship id ascending. Spawns always rank last.
    fn priority(&self) -> (i32, PlayerId, u64) {
        match self {
            Contender::Move(m) => (m.strength, m.owner, m.ship.to_raw()),
            Contender::Spawn(s) => (i32::MIN, s.owner, u64::MAX),
        }
    }
}

/// Resolve all movement and staged spawns in one deterministic pass over the
/// pre-turn positions. A ship that does not move holds its cell; contested
/// empty cells go to the strongest entrant and every loser is nullified back
/// onto its origin, cascading until stable. Returns the set of ships that
/// actually changed cell.
fn resolve_movement(
    state: &mut GameState,
    config: &GameConfig,
    moves: Vec<MoveIntent>,
    spawns: Vec<SpawnIntent>,
    events: &mut Vec<Event>,
) -> BTreeSet<u64> {
    let moving: BTreeSet<u64> = moves.iter().map(|m| m.ship.to_raw()).collect();
    let mut holders: BTreeSet<usize> = state
        .ships
        .iter_ordered()
        .filter(|(id, _)| !moving.contains(&id.to_raw()))
        .map(|(_, ship)| state.map.index_of(ship.position))
        .collect();

    let mut pending: Vec<Contender> = moves
        .into_iter()
        .map(Contender::Move)
        .chain(spawns.into_iter().map(Contender::Spawn))
        .collect();

    loop {
        // Group contenders by destination cell.
        let mut by_dest: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (position, contender) in pending.iter().enumerate() {
            let dest = match contender {
                Contender::Move(m) => state.map.index_of(m.to),
                Contender::Spawn(s) => state.map.index_of(s.at),
            };
            by_dest.entry(dest).or_default().push(position);
        }

        let mut nullified: Vec<usize> = Vec::new();
        for (dest, entrants) in &by_dest {
            if holders.contains(dest) {
                nullified.extend(entrants.iter().copied());
            } else if entrants.len() > 1 {
                let winner = entrants
                    .iter()
                    .copied()
                    .max_by(|&a, &b| {
                        let (sa, oa, ia) = pending[a].priority();
                        let (sb, ob, ib) = pending[b].priority();
                        sa.cmp(&sb).then(ob.cmp(&oa)).then(ib.cmp(&ia))
                    })
                    .expect("non-empty entrant group");
                nullified.extend(entrants.iter().copied().filter(|&e| e != winner));
            }
        }

        if nullified.is_empty() {
            break;
        }

        nullified.sort_unstable();
        for position in nullified.into_iter().rev() {
            match pending.swap_remove(position) {
                Contender::Move(m) => {
                    holders.insert(state.map.index_of(m.from));
                    events.push(Event::MoveNullified {
                        ship: m.ship,
                        owner: m.owner,
                        at: m.from,
                        attempted: m.direction,
                    });
                }
                Contender::Spawn(s) => {
                    // Refund: the cost was debited when the spawn was staged.
                    if let Some(player) = state.player_mut(s.owner) {
                        player.energy += config.spawn_cost;
                    }
                    events.push(Event::SpawnCancelled {
                        owner: s.owner,
                        at: s.at,
                    });
                }
            }
        }
    }

    // Commit survivors. Destinations are now pairwise distinct and unheld,
    // so swaps and chains land atomically.
    let mut committed_moves: Vec<MoveIntent> = Vec::new();
    let mut committed_spawns: Vec<SpawnIntent> = Vec::new();
    for contender in pending {
        match contender {
            Contender::Move(m) => committed_moves.push(m),
            Contender::Spawn(s) => committed_spawns.push(s),
        }
    }
    committed_moves.sort_by_key(|m| m.ship.to_raw());
    committed_spawns.sort_by_key(|s| s.owner);

    let mut moved = BTreeSet::new();
    for intent in committed_moves {
        if let Some(ship) = state.ships.get_mut(intent.ship) {
            ship.cargo -= intent.cost;
            ship.position = intent.to;
            moved.insert(intent.ship.to_raw());
            events.push(Event::ShipMoved {
                ship: intent.ship,
                owner: intent.owner,
                from: intent.from,
                to: intent.to,
            });
        }
    }
    for intent in committed_spawns {
        let ship = state.ships.insert(Ship::new(intent.owner, intent.at));
        moved.insert(ship.to_raw());
        events.push(Event::ShipSpawned {
            ship,
            owner: intent.owner,
            at: intent.at,
        });
    }

    moved
}

/// Simultaneous capture pass over post-movement positions. A ship flips to
/// the locally dominant enemy when outnumbered by at least the configured
/// margin; `possible_interaction` gates the scan.
fn resolve_captures(state: &mut GameState, config: &GameConfig, events: &mut Vec<Event>) {
    let positions: Vec<(ShipId, PlayerId, Location)> = state
        .ships
        .iter_ordered()
        .map(|(id, ship)| (id, ship.owner, ship.position))
        .collect();

    let mut captures: Vec<(ShipId, PlayerId, PlayerId, Location)> = Vec::new();
    for &(ship_id, owner, position) in &positions {
        if !state.possible_interaction(owner, position, config.interaction_radius) {
            continue;
        }

        let mut counts: BTreeMap<PlayerId, usize> = BTreeMap::new();
        for &(other_id, other_owner, other_pos) in &positions {
            if other_id == ship_id {
                continue;
            }
            if state.map.distance(position, other_pos) <= config.interaction_radius {
                *counts.entry(other_owner).or_insert(0) += 1;
            }
        }

        let friendly = counts.get(&owner).copied().unwrap_or(0);
        let enemies: usize = counts
            .iter()
            .filter(|(&p, _)| p != owner)
            .map(|(_, &n)| n)
            .sum();
        if enemies < friendly + config.capture_margin {
            continue;
        }

        // Dominant enemy: highest local ship count, ties to lowest id.
        let new_owner = counts
            .iter()
            .filter(|(&p, _)| p != owner)
            .max_by(|(pa, na), (pb, nb)| na.cmp(nb).then(pb.cmp(pa)))
            .map(|(&p, _)| p);
        if let Some(new_owner) = new_owner {
            captures.push((ship_id, owner, new_owner, position));
        }
    }

    for (ship_id, old_owner, new_owner, at) in captures {
        if let Some(ship) = state.ships.get_mut(ship_id) {
            ship.owner = new_owner;
            info!(%old_owner, %new_owner, "ship captured");
            events.push(Event::ShipCaptured {
                ship: ship_id,
                old_owner,
                new_owner,
                at,
            });
        }
    }
}

/// Extraction and deposits. Ships that stayed on their cell mine it; the
/// inspired flag in effect is the one computed at the end of the previous
/// turn. Ships sitting on a friendly structure then bank their cargo.
fn harvest(
    state: &mut GameState,
    config: &GameConfig,
    moved: &BTreeSet<u64>,
    events: &mut Vec<Event>,
) {
    let ship_ids = state.ships.ids_ordered();

    for id in &ship_ids {
        if moved.contains(&id.to_raw()) {
            continue;
        }
        let Some(ship) = state.ships.get(*id) else {
            continue;
        };
        let (owner, position, cargo, inspired) =
            (ship.owner, ship.position, ship.cargo, ship.inspired);

        let cell = state.map.energy_at(position);
        let extracted = (cell + config.extract_ratio - 1) / config.extract_ratio;
        let take = extracted.min(config.max_cargo - cargo).max(0);
        if take == 0 {
            continue;
        }

        *state.map.energy_at_mut(position) -= take;
        let bonus = if inspired {
            take * config.inspired_bonus_multiplier
        } else {
            0
        };
        let new_cargo = (cargo + take + bonus).min(config.max_cargo);
        let gained = new_cargo - cargo;
        if let Some(ship) = state.ships.get_mut(*id) {
            ship.cargo = new_cargo;
        }
        events.push(Event::EnergyMined {
            ship: *id,
            owner,
            at: position,
            amount: gained,
            inspired,
        });
    }

    for id in &ship_ids {
        let Some(ship) = state.ships.get(*id) else {
            continue;
        };
        let (owner, position, cargo) = (ship.owner, ship.position, ship.cargo);
        if cargo == 0 || state.structure_owner(position) != Some(owner) {
            continue;
        }
        if let Some(ship) = state.ships.get_mut(*id) {
            ship.cargo = 0;
        }
        if let Some(player) = state.player_mut(owner) {
            player.energy += cargo;
            player.stats.turn_production += cargo;
        }
        events.push(Event::EnergyDeposited {
            ship: *id,
            owner,
            at: position,
            amount: cargo,
        });
    }
}

/// Pure recomputation of the inspired flag for every ship from
/// post-resolution positions: inspired iff enough enemy ships sit within the
/// inspiration radius.
pub(crate) fn update_inspiration(state: &mut GameState, config: &GameConfig) {
    let positions: Vec<(ShipId, PlayerId, Location)> = state
        .ships
        .iter_ordered()
        .map(|(id, ship)| (id, ship.owner, ship.position))
        .collect();

    for &(ship_id, owner, position) in &positions {
        let enemies = positions
            .iter()
            .filter(|&&(_, other_owner, other_pos)| {
                other_owner != owner
                    && state.map.distance(position, other_pos) <= config.inspiration_radius
            })
            .count();
        if let Some(ship) = state.ships.get_mut(ship_id) {
            ship.inspired = enemies >= config.inspiration_ship_count;
        }
    }
}

/// Whether a player can still influence the game on the next turn.
pub(crate) fn player_can_play(state: &GameState, config: &GameConfig, player: PlayerId) -> bool {
    let Some(p) = state.player(player) else {
        return false;
    };
    p.alive && (state.ship_count(player) > 0 || p.energy >= config.spawn_cost)
}

/// Fold the turn's production into running totals, then process eliminations:
/// policy-triggered, threshold-triggered, and loss of all assets.
fn end_turn(
    state: &mut GameState,
    config: &GameConfig,
    pending_elimination: &BTreeSet<PlayerId>,
    events: &mut Vec<Event>,
) {
    let turn = state.turn;

    // update_player_stats: everyone alive through this turn gets credit for it.
    for player in state.players.iter_mut() {
        if player.alive {
            player.stats.total_production += player.stats.turn_production;
            player.stats.last_turn_alive = turn;
        }
    }

    let ids: Vec<PlayerId> = state.players.iter().map(|p| p.id).collect();
    for id in ids {
        let Some(player) = state.player(id) else {
            continue;
        };
        if !player.alive {
            continue;
        }

        let reason = if pending_elimination.contains(&id) {
            Some(EliminationReason::PolicyAction)
        } else if player.stats.offenses >= config.elimination_threshold {
            Some(EliminationReason::Offenses)
        } else if !player_can_play(state, config, id) {
            Some(EliminationReason::NoAssets)
        } else {
            None
        };

        if let Some(reason) = reason {
            kill_player(state, id, reason, events);
        }
    }

    events.push(Event::TurnEnded { turn });
    debug!(turn, "turn ended");
}

/// Remove a player from future turns. Their ships dump cargo where they
/// stand, their depots disappear, and their statistics are kept for ranking.
pub(crate) fn kill_player(
    state: &mut GameState,
    player_id: PlayerId,
    reason: EliminationReason,
    events: &mut Vec<Event>,
) {
    let turn = state.turn;
    let Some(player) = state.player_mut(player_id) else {
        return;
    };
    if !player.alive {
        return;
    }
    player.alive = false;
    player.stats.last_turn_alive = turn;
    state.release_player_assets(player_id);

    info!(%player_id, turn, ?reason, "player eliminated");
    events.push(Event::PlayerEliminated {
        player: player_id,
        turn,
        reason,
    });
}

/// True when at most one player can still act, or the turn limit is reached.
pub(crate) fn game_ended(state: &GameState, config: &GameConfig) -> bool {
    if state.turn >= config.max_turns {
        return true;
    }
    let playable = state
        .players
        .iter()
        .filter(|p| player_can_play(state, config, p.id))
        .count();
    match state.players.len() {
        0 | 1 => playable == 0,
        _ => playable <= 1,
    }
}

/// Final ranking; runs exactly once at game end.
pub(crate) fn end_game(state: &mut GameState, events: &mut Vec<Event>) {
    stats::rank_players(&mut state.players);
    events.push(Event::GameEnded { turn: state.turn });
    info!(turn = state.turn, "game ended");
}
