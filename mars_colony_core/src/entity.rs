use serde::{Deserialize, Serialize};

use crate::{
    EntityId, Position,
    carrier::Carrier,
    explorer::Explorer,
    geometry::Bounds,
};

/// Static resource item; removed from the world the moment an explorer
/// picks it up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rock {
    pub id: EntityId,
    pub position: Position,
}

impl Rock {
    pub const SIZE: f64 = 3.0;

    pub fn new(id: EntityId, position: Position) -> Self {
        Self { id, position }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::around(self.position, Self::SIZE)
    }
}

/// Static impassable region; never removed during a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: EntityId,
    pub position: Position,
}

impl Obstacle {
    pub const SIZE: f64 = 15.0;

    pub fn new(id: EntityId, position: Position) -> Self {
        Self { id, position }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::around(self.position, Self::SIZE)
    }
}

/// The unique delivery target. At most one per world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarsBase {
    pub id: EntityId,
    pub position: Position,
}

impl MarsBase {
    pub const SIZE: f64 = 20.0;

    pub fn new(id: EntityId, position: Position) -> Self {
        Self { id, position }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::around(self.position, Self::SIZE)
    }
}

/// Ephemeral trail marker dropped by explorers in trail mode, consumed
/// when a trail-following agent reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub id: EntityId,
    pub position: Position,
}

impl Particle {
    pub const SIZE: f64 = 5.0;

    pub fn new(id: EntityId, position: Position) -> Self {
        Self { id, position }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::around(self.position, Self::SIZE)
    }
}

/// Closed enumeration of every entity kind the registry can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Rock,
    Obstacle,
    Base,
    Particle,
    Explorer,
    Carrier,
}

/// An owned entity handed to `World::add`, routed to the matching
/// per-kind arena by an exhaustive match.
#[derive(Debug)]
pub enum Entity {
    Rock(Rock),
    Obstacle(Obstacle),
    Base(MarsBase),
    Particle(Particle),
    Explorer(Explorer),
    Carrier(Carrier),
}

impl Entity {
    pub fn id(&self) -> EntityId {
        match self {
            Entity::Rock(r) => r.id,
            Entity::Obstacle(o) => o.id,
            Entity::Base(b) => b.id,
            Entity::Particle(p) => p.id,
            Entity::Explorer(e) => e.id,
            Entity::Carrier(c) => c.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Rock(_) => EntityKind::Rock,
            Entity::Obstacle(_) => EntityKind::Obstacle,
            Entity::Base(_) => EntityKind::Base,
            Entity::Particle(_) => EntityKind::Particle,
            Entity::Explorer(_) => EntityKind::Explorer,
            Entity::Carrier(_) => EntityKind::Carrier,
        }
    }
}

/// A borrowed entity yielded by `World::entities`, for read-only
/// iteration by renderers and diagnostics.
#[derive(Debug, Clone, Copy)]
pub enum EntityView<'a> {
    Rock(&'a Rock),
    Obstacle(&'a Obstacle),
    Base(&'a MarsBase),
    Particle(&'a Particle),
    Explorer(&'a Explorer),
    Carrier(&'a Carrier),
}

impl EntityView<'_> {
    pub fn id(&self) -> EntityId {
        match self {
            EntityView::Rock(r) => r.id,
            EntityView::Obstacle(o) => o.id,
            EntityView::Base(b) => b.id,
            EntityView::Particle(p) => p.id,
            EntityView::Explorer(e) => e.id,
            EntityView::Carrier(c) => c.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityView::Rock(_) => EntityKind::Rock,
            EntityView::Obstacle(_) => EntityKind::Obstacle,
            EntityView::Base(_) => EntityKind::Base,
            EntityView::Particle(_) => EntityKind::Particle,
            EntityView::Explorer(_) => EntityKind::Explorer,
            EntityView::Carrier(_) => EntityKind::Carrier,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            EntityView::Rock(r) => r.position,
            EntityView::Obstacle(o) => o.position,
            EntityView::Base(b) => b.position,
            EntityView::Particle(p) => p.position,
            EntityView::Explorer(e) => e.position,
            EntityView::Carrier(c) => c.position,
        }
    }

    pub fn bounds(&self) -> Bounds {
        match self {
            EntityView::Rock(r) => r.bounds(),
            EntityView::Obstacle(o) => o.bounds(),
            EntityView::Base(b) => b.bounds(),
            EntityView::Particle(p) => p.bounds(),
            EntityView::Explorer(e) => e.bounds(),
            EntityView::Carrier(c) => c.bounds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_routes_id_and_kind() {
        let rock = Entity::Rock(Rock::new(7, Position::new(1.0, 2.0)));
        assert_eq!(rock.id(), 7);
        assert_eq!(rock.kind(), EntityKind::Rock);

        let base = Entity::Base(MarsBase::new(0, Position::new(3.0, 4.0)));
        assert_eq!(base.kind(), EntityKind::Base);
    }

    #[test]
    fn bounds_use_the_kind_half_extent() {
        let o = Obstacle::new(1, Position::new(50.0, 50.0));
        assert_eq!(o.bounds().top_left.x, 50.0 - Obstacle::SIZE);
        assert_eq!(o.bounds().bottom_right.y, 50.0 + Obstacle::SIZE);
    }
}
