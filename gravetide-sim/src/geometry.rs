//! Grid positions, directions and line tracing.
use serde::{Deserialize, Serialize};

/// A tile coordinate on a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub const fn offset(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self::new(self.x + dx, self.y + dy)
    }
}

/// The eight compass directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Direction {
    pub const ALL: [Self; 8] = [
        Self::N,
        Self::NE,
        Self::E,
        Self::SE,
        Self::S,
        Self::SW,
        Self::W,
        Self::NW,
    ];

    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::N => (0, -1),
            Self::NE => (1, -1),
            Self::E => (1, 0),
            Self::SE => (1, 1),
            Self::S => (0, 1),
            Self::SW => (-1, 1),
            Self::W => (-1, 0),
            Self::NW => (-1, -1),
        }
    }

    /// Direction of a unit step from `from` to an adjacent `to`.
    #[must_use]
    pub fn between(from: Point, to: Point) -> Option<Self> {
        let delta = ((to.x - from.x).signum(), (to.y - from.y).signum());
        Self::ALL.into_iter().find(|dir| dir.delta() == delta)
    }
}

/// Chebyshev distance: diagonal steps cost the same as straight ones.
#[must_use]
pub fn grid_distance(a: Point, b: Point) -> i32 {
    (a.x - b.x).abs().max((a.y - b.y).abs())
}

#[must_use]
pub fn is_adjacent(a: Point, b: Point) -> bool {
    grid_distance(a, b) == 1
}

/// Bresenham line from `from` to `to`, excluding `from` and including `to`.
#[must_use]
pub fn trace_line(from: Point, to: Point) -> Vec<Point> {
    let mut line = Vec::new();
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx + dy;
    let mut current = from;
    while current != to {
        let doubled = 2 * err;
        if doubled >= dy {
            err += dy;
            current.x += sx;
        }
        if doubled <= dx {
            err += dx;
            current.y += sy;
        }
        line.push(current);
    }
    line
}

/// Tiles exactly `radius` steps from `center`, in row-major order.
#[must_use]
pub fn ring(center: Point, radius: i32) -> Vec<Point> {
    if radius <= 0 {
        return vec![center];
    }
    let mut tiles = Vec::new();
    for y in (center.y - radius)..=(center.y + radius) {
        for x in (center.x - radius)..=(center.x + radius) {
            let p = Point::new(x, y);
            if grid_distance(center, p) == radius {
                tiles.push(p);
            }
        }
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_chebyshev() {
        assert_eq!(grid_distance(Point::new(0, 0), Point::new(3, 2)), 3);
        assert!(is_adjacent(Point::new(1, 1), Point::new(2, 2)));
        assert!(!is_adjacent(Point::new(1, 1), Point::new(1, 1)));
    }

    #[test]
    fn line_excludes_start_and_reaches_end() {
        let line = trace_line(Point::new(0, 0), Point::new(4, 2));
        assert_eq!(line.len(), 4);
        assert_eq!(line.last(), Some(&Point::new(4, 2)));
        assert!(!line.contains(&Point::new(0, 0)));
        assert!(trace_line(Point::new(2, 2), Point::new(2, 2)).is_empty());
    }

    #[test]
    fn rings_have_expected_sizes() {
        assert_eq!(ring(Point::new(5, 5), 0), vec![Point::new(5, 5)]);
        assert_eq!(ring(Point::new(5, 5), 1).len(), 8);
        assert_eq!(ring(Point::new(5, 5), 2).len(), 16);
    }

    #[test]
    fn direction_between_neighbours() {
        let from = Point::new(3, 3);
        for dir in Direction::ALL {
            assert_eq!(Direction::between(from, from.offset(dir)), Some(dir));
        }
        assert_eq!(Direction::between(from, from), None);
    }
}
