use serde::{Deserialize, Serialize};

/// A discrete cell coordinate. Wrapping and distance are owned by the map,
/// so locations themselves are plain offsets with no bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub x: i32,
    pub y: i32,
}

impl Location {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The (unnormalized) cell one step in `direction`.
    #[inline]
    pub fn step(self, direction: Direction) -> Location {
        let (dx, dy) = direction.offset();
        Location {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the four cardinal moves, or staying put.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
    Still,
}

impl Direction {
    pub const CARDINALS: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Grid delta with y growing southward.
    #[inline]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::Still => (0, 0),
        }
    }

    /// Single-character wire code used in the textual command stream.
    #[inline]
    pub const fn wire_code(self) -> char {
        match self {
            Direction::North => 'n',
            Direction::South => 's',
            Direction::East => 'e',
            Direction::West => 'w',
            Direction::Still => 'o',
        }
    }

    pub fn from_wire_code(c: char) -> Option<Direction> {
        match c {
            'n' => Some(Direction::North),
            's' => Some(Direction::South),
            'e' => Some(Direction::East),
            'w' => Some(Direction::West),
            'o' => Some(Direction::Still),
            _ => None,
        }
    }
}
