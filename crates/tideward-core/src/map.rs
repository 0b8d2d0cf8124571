use tideward_protocol::{Direction, Location, MapSnapshot};

/// Toroidal energy grid. Both axes wrap, so every location normalizes onto
/// the map and distances are wrapped Manhattan.
#[derive(Clone, Debug)]
pub struct GameMap {
    width: u32,
    height: u32,
    cells: Vec<i32>,
}

impl GameMap {
    pub fn new(width: u32, height: u32, fill_energy: i32) -> Self {
        let cells = vec![fill_energy; (width as usize) * (height as usize)];
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn from_snapshot(snapshot: &MapSnapshot) -> Self {
        let expected = (snapshot.width as usize) * (snapshot.height as usize);
        let mut cells = snapshot.cells.clone();
        cells.resize(expected, 0);
        Self {
            width: snapshot.width,
            height: snapshot.height,
            cells,
        }
    }

    pub fn to_snapshot(&self) -> MapSnapshot {
        MapSnapshot {
            width: self.width,
            height: self.height,
            cells: self.cells.clone(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Wrap a location onto the map.
    pub fn normalize(&self, location: Location) -> Location {
        Location {
            x: location.x.rem_euclid(self.width as i32),
            y: location.y.rem_euclid(self.height as i32),
        }
    }

    /// Row-major cell index of a (possibly unnormalized) location.
    pub fn index_of(&self, location: Location) -> usize {
        let norm = self.normalize(location);
        (norm.y as usize) * (self.width as usize) + (norm.x as usize)
    }

    pub fn location_at_index(&self, index: usize) -> Option<Location> {
        if index >= self.cells.len() {
            return None;
        }
        Some(Location {
            x: (index % self.width as usize) as i32,
            y: (index / self.width as usize) as i32,
        })
    }

    /// Wrapped Manhattan distance.
    pub fn distance(&self, a: Location, b: Location) -> i32 {
        let a = self.normalize(a);
        let b = self.normalize(b);
        let dx = (a.x - b.x).abs();
        let dy = (a.y - b.y).abs();
        dx.min(self.width as i32 - dx) + dy.min(self.height as i32 - dy)
    }

    pub fn energy_at(&self, location: Location) -> i32 {
        self.cells[self.index_of(location)]
    }

    pub fn energy_at_mut(&mut self, location: Location) -> &mut i32 {
        let index = self.index_of(location);
        &mut self.cells[index]
    }

    pub fn cells(&self) -> &[i32] {
        &self.cells
    }

    /// The four adjacent cells, normalized.
    pub fn neighbors(&self, location: Location) -> impl Iterator<Item = Location> + '_ {
        Direction::CARDINALS
            .into_iter()
            .map(move |dir| self.normalize(location.step(dir)))
    }

    /// Normalized locations with wrapped distance `<= radius`, in a stable
    /// row-major scan order of the whole grid.
    pub fn locations_in_radius(&self, center: Location, radius: i32) -> Vec<Location> {
        let radius = radius.max(0);
        let mut out = Vec::new();
        for index in 0..self.cells.len() {
            let loc = self
                .location_at_index(index)
                .expect("index within cell bounds");
            if self.distance(center, loc) <= radius {
                out.push(loc);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_wraps_both_axes() {
        let map = GameMap::new(8, 4, 0);
        assert_eq!(map.normalize(Location::new(-1, -1)), Location::new(7, 3));
        assert_eq!(map.normalize(Location::new(9, 5)), Location::new(1, 1));
    }

    #[test]
    fn distance_takes_the_short_way_around() {
        let map = GameMap::new(8, 8, 0);
        assert_eq!(map.distance(Location::new(0, 0), Location::new(7, 0)), 1);
        assert_eq!(map.distance(Location::new(0, 0), Location::new(4, 4)), 8);
        assert_eq!(map.distance(Location::new(1, 1), Location::new(1, 6)), 3);
    }

    #[test]
    fn radius_query_counts_match_diamond_size() {
        let map = GameMap::new(16, 16, 0);
        let center = Location::new(8, 8);
        // Manhattan ball of radius r has 2r^2 + 2r + 1 cells.
        for radius in 0..4 {
            let count = map.locations_in_radius(center, radius).len() as i32;
            assert_eq!(count, 2 * radius * radius + 2 * radius + 1);
        }
    }

    #[test]
    fn snapshot_round_trip_preserves_cells() {
        let mut map = GameMap::new(3, 2, 5);
        *map.energy_at_mut(Location::new(2, 1)) = 99;
        let back = GameMap::from_snapshot(&map.to_snapshot());
        assert_eq!(back.cells(), map.cells());
    }
}
