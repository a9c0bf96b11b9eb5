use std::ops::{Add, Mul};

/// Cube coordinates for a hex grid. Always satisfies `x + y + z == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cube {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Cube {
    /// Unit steps around a hex, in ring-walk order.
    pub const DIRECTIONS: [Cube; 6] = [
        Cube { x: 1, y: 0, z: -1 },
        Cube { x: 1, y: -1, z: 0 },
        Cube { x: 0, y: -1, z: 1 },
        Cube { x: -1, y: 0, z: 1 },
        Cube { x: -1, y: 1, z: 0 },
        Cube { x: 0, y: 1, z: -1 },
    ];

    /// Direction a ring walk starts from.
    const RING_START: usize = 4;

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Convert "odd-r" offset coordinates (odd rows shoved right) to cube.
    ///
    /// Uses floor division so the conversion stays exact for every row.
    pub fn from_offset(row: i32, col: i32) -> Self {
        let x = col - (row - (row & 1)).div_euclid(2);
        let z = row;
        Self { x, y: -x - z, z }
    }

    /// Inverse of [`Cube::from_offset`], returning `(row, col)`.
    pub fn to_offset(self) -> (i32, i32) {
        let row = self.z;
        let col = self.x + (row - (row & 1)).div_euclid(2);
        (row, col)
    }

    pub fn neighbor(self, direction: usize) -> Cube {
        self + Self::DIRECTIONS[direction % 6]
    }

    pub fn neighbors(self) -> impl Iterator<Item = Cube> {
        Self::DIRECTIONS.into_iter().map(move |d| self + d)
    }

    /// Hex distance: half the Manhattan distance in cube space.
    pub fn distance(self, other: Cube) -> u32 {
        ((self.x - other.x).unsigned_abs()
            + (self.y - other.y).unsigned_abs()
            + (self.z - other.z).unsigned_abs())
            / 2
    }

    /// All coordinates at exactly `radius` from `self`.
    ///
    /// Radius 0 yields only the center. Otherwise yields `6 * radius`
    /// distinct coordinates, never the center.
    pub fn ring(self, radius: u32) -> RingIter {
        RingIter::new(self, radius)
    }

    /// Rings 1 through `radius` concatenated. Never includes the center.
    pub fn cumulative_ring(self, radius: u32) -> impl Iterator<Item = Cube> {
        (1..=radius).flat_map(move |r| self.ring(r))
    }
}

impl Add for Cube {
    type Output = Cube;

    fn add(self, other: Cube) -> Cube {
        Cube {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Mul<i32> for Cube {
    type Output = Cube;

    fn mul(self, rhs: i32) -> Cube {
        Cube {
            x: self.x * rhs,
            y: self.y * rhs,
            z: self.z * rhs,
        }
    }
}

/// Walks one hex ring edge by edge.
pub struct RingIter {
    radius: u32,
    side: usize,
    step: u32,
    current: Option<Cube>,
}

impl RingIter {
    fn new(center: Cube, radius: u32) -> Self {
        if radius == 0 {
            return Self {
                radius,
                side: 6,
                step: 0,
                current: Some(center),
            };
        }

        let start = center + Cube::DIRECTIONS[Cube::RING_START] * radius as i32;
        Self {
            radius,
            side: 0,
            step: 0,
            current: Some(start),
        }
    }
}

impl Iterator for RingIter {
    type Item = Cube;

    fn next(&mut self) -> Option<Cube> {
        let hex = self.current?;

        if self.side >= 6 {
            self.current = None;
            return Some(hex);
        }

        self.step += 1;
        let next = hex.neighbor(self.side);
        if self.step >= self.radius {
            self.step = 0;
            self.side += 1;
        }
        // The walk closes back on its start after the sixth edge.
        self.current = if self.side >= 6 { None } else { Some(next) };
        Some(hex)
    }
}
