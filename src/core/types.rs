//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

/// Game-assigned entity identifier, unique within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Gatherable resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Food,
    Wood,
    Stone,
    Metal,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Resource::Food,
        Resource::Wood,
        Resource::Stone,
        Resource::Metal,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Resource::Food => "food",
            Resource::Wood => "wood",
            Resource::Stone => "stone",
            Resource::Metal => "metal",
        }
    }

    /// Title-cased name for action labels
    pub fn title(&self) -> &'static str {
        match self {
            Resource::Food => "Food",
            Resource::Wood => "Wood",
            Resource::Stone => "Stone",
            Resource::Metal => "Metal",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stockpile of the four resources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCounts {
    pub food: u32,
    pub wood: u32,
    pub stone: u32,
    pub metal: u32,
}

impl ResourceCounts {
    pub fn new(food: u32, wood: u32, stone: u32, metal: u32) -> Self {
        Self { food, wood, stone, metal }
    }

    pub fn get(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Food => self.food,
            Resource::Wood => self.wood,
            Resource::Stone => self.stone,
            Resource::Metal => self.metal,
        }
    }

    /// Sum of all four stocks; widened so game-sized values cannot overflow
    pub fn total(&self) -> u64 {
        Resource::ALL.iter().map(|&r| u64::from(self.get(r))).sum()
    }
}

/// Ground-plane position `(x, z)`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    pub fn distance(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    pub fn offset(&self, dx: f64, dz: f64) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }

    /// Mean of a set of positions, `None` when empty
    pub fn centroid<'a>(positions: impl IntoIterator<Item = &'a Position>) -> Option<Position> {
        let mut count = 0usize;
        let mut sum = Position::default();
        for p in positions {
            sum.x += p.x;
            sum.z += p.z;
            count += 1;
        }
        if count == 0 {
            None
        } else {
            Some(Position::new(sum.x / count as f64, sum.z / count as f64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_counts_lookup() {
        let counts = ResourceCounts::new(40, 200, 0, 7);
        assert_eq!(counts.get(Resource::Food), 40);
        assert_eq!(counts.get(Resource::Wood), 200);
        assert_eq!(counts.get(Resource::Metal), 7);
        assert_eq!(counts.total(), 247);
    }

    #[test]
    fn test_total_at_u32_boundary() {
        let counts = ResourceCounts::new(u32::MAX, u32::MAX, u32::MAX, u32::MAX);
        assert_eq!(counts.total(), 4 * u64::from(u32::MAX));
    }

    #[test]
    fn test_position_distance_and_centroid() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-9);

        let c = Position::centroid([a, b].iter()).unwrap();
        assert!((c.x - 1.5).abs() < 1e-9);
        assert!((c.z - 2.0).abs() < 1e-9);
        assert!(Position::centroid(std::iter::empty()).is_none());
    }

    #[test]
    fn test_resource_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Resource::Stone).unwrap(), "\"stone\"");
    }
}
