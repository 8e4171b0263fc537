use serde::{Deserialize, Serialize};

pub mod carrier;
pub mod entity;
pub mod explorer;
pub mod geometry;
pub mod message;
pub mod world;

/// Unique identifier for entities (agents, rocks, obstacles, etc.).
pub type EntityId = usize;

/// Represents a 2D coordinate in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The position reached after one step along `heading`.
    pub fn offset(self, heading: Heading) -> Self {
        Self {
            x: self.x + heading.dx,
            y: self.y + heading.dy,
        }
    }
}

/// Per-tick displacement vector of a moving agent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Heading {
    pub dx: f64,
    pub dy: f64,
}

impl Heading {
    pub const ZERO: Heading = Heading { dx: 0.0, dy: 0.0 };

    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    pub fn is_zero(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }
}

/// Selects whether explorers lay and follow chemical-trail particles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldKind {
    /// Explorers search and self-deliver with no indirect coordination.
    Standard,
    /// Explorers drop trail particles at pickup sites and follow trails
    /// laid by others.
    Trails,
}

impl WorldKind {
    pub fn trails_enabled(&self) -> bool {
        matches!(self, WorldKind::Trails)
    }
}
