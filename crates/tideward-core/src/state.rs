use tideward_protocol::{
    DepotSnapshot, EntityId, Location, PlayerId, PlayerSnapshot, ShipId, ShipSnapshot, Snapshot,
};

use crate::map::GameMap;
use crate::player::{Player, PlayerStats};
use crate::ship::{Depot, Ship};
use crate::store::EntityStore;

/// Canonical mutable game state: players, their ships and depots, and the
/// energy grid. All iteration is in stable id order, so any walk over the
/// store is deterministic.
#[derive(Clone, Debug)]
pub struct GameState {
    pub(crate) turn: u32,
    pub(crate) map: GameMap,
    pub(crate) players: Vec<Player>,
    pub(crate) ships: EntityStore<Ship>,
    pub(crate) depots: EntityStore<Depot>,
}

impl GameState {
    /// Fresh game: one shipyard per player, no ships yet.
    pub(crate) fn new(
        map: GameMap,
        names: Vec<String>,
        shipyards: Vec<Location>,
        initial_energy: i32,
    ) -> Self {
        debug_assert_eq!(names.len(), shipyards.len());
        let players = names
            .into_iter()
            .zip(shipyards)
            .enumerate()
            .map(|(index, (name, shipyard))| {
                Player::new(
                    PlayerId(index as u8),
                    name,
                    initial_energy,
                    map.normalize(shipyard),
                )
            })
            .collect();

        Self {
            turn: 0,
            map,
            players,
            ships: EntityStore::default(),
            depots: EntityStore::default(),
        }
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn map(&self) -> &GameMap {
        &self.map
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id.0 as usize)
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id.0 as usize)
    }

    pub fn ship(&self, id: ShipId) -> Option<&Ship> {
        self.ships.get(id)
    }

    pub fn ships(&self) -> impl Iterator<Item = (ShipId, &Ship)> {
        self.ships.iter_ordered()
    }

    pub fn depots(&self) -> impl Iterator<Item = (EntityId, &Depot)> {
        self.depots.iter_ordered()
    }

    pub fn ship_count(&self, player: PlayerId) -> usize {
        self.ships
            .iter_ordered()
            .filter(|(_, ship)| ship.owner == player)
            .count()
    }

    /// The ship occupying a cell, if any. Holds the one-ship-per-cell
    /// invariant between turns, so at most one match exists.
    pub fn ship_at(&self, location: Location) -> Option<ShipId> {
        let location = self.map.normalize(location);
        self.ships
            .iter_ordered()
            .find(|(_, ship)| ship.position == location)
            .map(|(id, _)| id)
    }

    /// Owner of the shipyard or depot on a cell, if any.
    pub fn structure_owner(&self, location: Location) -> Option<PlayerId> {
        let location = self.map.normalize(location);
        if let Some(player) = self.players.iter().find(|p| p.shipyard == location) {
            return Some(player.id);
        }
        self.depots
            .iter_ordered()
            .find(|(_, depot)| depot.position == location)
            .map(|(_, depot)| depot.owner)
    }

    /// Whether any other player's ship or structure lies within
    /// `interaction_radius` of `location`. Evaluated on current (pre-turn)
    /// positions; decides if contested resolution rules apply there.
    pub fn possible_interaction(
        &self,
        owner: PlayerId,
        location: Location,
        interaction_radius: i32,
    ) -> bool {
        let within = |pos: Location| self.map.distance(location, pos) <= interaction_radius;

        if self
            .ships
            .iter_ordered()
            .any(|(_, ship)| ship.owner != owner && within(ship.position))
        {
            return true;
        }
        if self
            .depots
            .iter_ordered()
            .any(|(_, depot)| depot.owner != owner && within(depot.position))
        {
            return true;
        }
        self.players
            .iter()
            .any(|player| player.id != owner && player.alive && within(player.shipyard))
    }

    /// Remove a dead player's assets. Ship cargo is dumped onto the cells the
    /// ships occupied; depots disappear with their owner.
    pub(crate) fn release_player_assets(&mut self, player: PlayerId) {
        let ships: Vec<ShipId> = self
            .ships
            .iter_ordered()
            .filter(|(_, ship)| ship.owner == player)
            .map(|(id, _)| id)
            .collect();
        for id in ships {
            if let Some(ship) = self.ships.remove(id) {
                *self.map.energy_at_mut(ship.position) += ship.cargo;
            }
        }

        let depots: Vec<EntityId> = self
            .depots
            .iter_ordered()
            .filter(|(_, depot)| depot.owner == player)
            .map(|(id, _)| id)
            .collect();
        for id in depots {
            self.depots.remove(id);
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            turn: self.turn,
            map: self.map.to_snapshot(),
            players: self
                .players
                .iter()
                .map(|p| PlayerSnapshot {
                    id: p.id,
                    name: p.name.clone(),
                    energy: p.energy,
                    shipyard: p.shipyard,
                    alive: p.alive,
                    total_production: p.stats.total_production,
                    last_turn_alive: p.stats.last_turn_alive,
                    offenses: p.stats.offenses,
                    rank: p.stats.rank,
                })
                .collect(),
            ships: self
                .ships
                .iter_ordered()
                .map(|(id, s)| ShipSnapshot {
                    id,
                    owner: s.owner,
                    pos: s.position,
                    cargo: s.cargo,
                    inspired: s.inspired,
                })
                .collect(),
            depots: self
                .depots
                .iter_ordered()
                .map(|(id, d)| DepotSnapshot {
                    id,
                    owner: d.owner,
                    pos: d.position,
                })
                .collect(),
            ship_slots: self.ships.slot_generations(),
            depot_slots: self.depots.slot_generations(),
        }
    }

    /// Exact reconstruction from a snapshot, ids and generations included.
    pub(crate) fn from_snapshot(snapshot: &Snapshot) -> Self {
        let map = GameMap::from_snapshot(&snapshot.map);

        let players = snapshot
            .players
            .iter()
            .map(|p| Player {
                id: p.id,
                name: p.name.clone(),
                energy: p.energy,
                shipyard: map.normalize(p.shipyard),
                alive: p.alive,
                stats: PlayerStats {
                    turn_production: 0,
                    total_production: p.total_production,
                    last_turn_alive: p.last_turn_alive,
                    offenses: p.offenses,
                    rank: p.rank,
                },
            })
            .collect();

        let ships = EntityStore::from_entries(
            snapshot
                .ships
                .iter()
                .map(|s| {
                    (
                        s.id,
                        Ship {
                            owner: s.owner,
                            position: map.normalize(s.pos),
                            cargo: s.cargo,
                            inspired: s.inspired,
                        },
                    )
                })
                .collect(),
            &snapshot.ship_slots,
        );

        let depots = EntityStore::from_entries(
            snapshot
                .depots
                .iter()
                .map(|d| {
                    (
                        d.id,
                        Depot {
                            owner: d.owner,
                            position: map.normalize(d.pos),
                        },
                    )
                })
                .collect(),
            &snapshot.depot_slots,
        );

        Self {
            turn: snapshot.turn,
            map,
            players,
            ships,
            depots,
        }
    }
}

// Mutable access to internals for embedded/host-runtime builds.
#[cfg(feature = "full-visibility")]
impl GameState {
    pub fn map_mut(&mut self) -> &mut GameMap {
        &mut self.map
    }

    pub fn players_mut(&mut self) -> &mut Vec<Player> {
        &mut self.players
    }

    pub fn ships_mut(&mut self) -> &mut EntityStore<Ship> {
        &mut self.ships
    }

    pub fn depots_mut(&mut self) -> &mut EntityStore<Depot> {
        &mut self.depots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_player_state() -> GameState {
        let map = GameMap::new(8, 8, 100);
        GameState::new(
            map,
            vec!["a".to_string(), "b".to_string()],
            vec![Location::new(1, 4), Location::new(6, 4)],
            5000,
        )
    }

    #[test]
    fn interaction_sees_enemy_ships_in_radius() {
        let mut state = two_player_state();
        let friendly = Ship::new(PlayerId(0), Location::new(3, 0));
        state.ships.insert(friendly);
        let enemy = Ship::new(PlayerId(1), Location::new(3, 2));
        state.ships.insert(enemy);

        assert!(state.possible_interaction(PlayerId(0), Location::new(3, 0), 3));
        assert!(!state.possible_interaction(PlayerId(0), Location::new(3, 0), 1));
        // The friendly ship alone never triggers an interaction for its owner.
        assert!(!state.possible_interaction(PlayerId(1), Location::new(3, 2), 1));
    }

    #[test]
    fn interaction_sees_enemy_shipyards() {
        let state = two_player_state();
        assert!(state.possible_interaction(PlayerId(0), Location::new(5, 4), 2));
        assert!(!state.possible_interaction(PlayerId(0), Location::new(3, 4), 2));
    }

    #[test]
    fn released_ships_dump_cargo_onto_cells() {
        let mut state = two_player_state();
        let mut ship = Ship::new(PlayerId(1), Location::new(2, 2));
        ship.cargo = 77;
        state.ships.insert(ship);

        state.release_player_assets(PlayerId(1));
        assert_eq!(state.ship_count(PlayerId(1)), 0);
        assert_eq!(state.map.energy_at(Location::new(2, 2)), 177);
    }

    #[test]
    fn snapshot_round_trip_is_exact() {
        let mut state = two_player_state();
        let id = state.ships.insert(Ship::new(PlayerId(0), Location::new(2, 3)));
        state.ships.remove(id);
        state.ships.insert(Ship::new(PlayerId(0), Location::new(2, 3)));
        state.depots.insert(Depot {
            owner: PlayerId(1),
            position: Location::new(5, 5),
        });
        state.turn = 12;

        let snapshot = state.snapshot();
        let back = GameState::from_snapshot(&snapshot);
        assert_eq!(back.snapshot(), snapshot);
    }

    #[test]
    fn restored_state_reuses_freed_slots_identically() {
        let mut state = two_player_state();
        let first = state.ships.insert(Ship::new(PlayerId(0), Location::new(2, 3)));
        state.ships.insert(Ship::new(PlayerId(1), Location::new(5, 5)));
        state.ships.remove(first);

        let mut restored = GameState::from_snapshot(&state.snapshot());

        // The next insertion must land on the same slot at the same
        // generation in both stores, or the two histories diverge.
        let expected = state.ships.insert(Ship::new(PlayerId(0), Location::new(3, 3)));
        let got = restored.ships.insert(Ship::new(PlayerId(0), Location::new(3, 3)));
        assert_eq!(got, expected);
        assert_eq!(got.generation, first.generation + 1);
    }
}
