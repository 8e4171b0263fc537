use rand::{SeedableRng, rngs::StdRng};

use crate::{
    EntityId, Heading, Position,
    explorer::{Explorer, random_heading},
    geometry::{Bounds, heading_towards},
    message::{Inbox, MessageKind},
    world::WorldView,
};

/// World mutation a carrier decided on this tick, applied by the world
/// before the unconditional move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CarrierAction {
    /// Advance along the current heading with no other effect.
    Move,
    /// Hand the hauled rock over at the base.
    DeliverAtBase,
    /// Take the rock from the requesting explorer it has reached.
    TakeRock { explorer: EntityId },
    /// Adopt a pending request and tell the requester to hold position.
    AcceptRequest { explorer: EntityId },
}

/// Relay agent: answers explorer pickup requests, collects their rocks
/// in the field, and returns them to the base.
#[derive(Debug, Clone)]
pub struct Carrier {
    pub id: EntityId,
    pub position: Position,
    pub heading: Heading,
    pub inbox: Inbox,
    /// Rocks delivered through this carrier so far.
    pub rocks: u32,
    /// True while hauling a rock taken from an explorer.
    pub has_rock: bool,
    /// The explorer currently being serviced, if any.
    pub target: Option<EntityId>,
    rng: StdRng,
}

impl Carrier {
    pub const SIZE: f64 = 7.0;
    pub const MAX_VELOCITY: f64 = 2.0;
    pub const PICKUP_REACH: f64 = 1.0;
    pub const MAX_NEW_DIRECTION_ATTEMPTS: u32 = 5;

    pub fn new(id: EntityId, position: Position, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let heading = random_heading(&mut rng, Self::MAX_VELOCITY);
        Self {
            id,
            position,
            heading,
            inbox: Inbox::new(),
            rocks: 0,
            has_rock: false,
            target: None,
            rng,
        }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::around(self.position, Self::SIZE)
    }

    /// Per-tick priority rules, mirroring the explorer machine: blocked,
    /// deliver, haul home, service the current target, accept the oldest
    /// request, patrol. Exactly one branch fires; the world moves the
    /// carrier afterwards.
    pub fn next_action(&mut self, view: &WorldView, explorers: &[Explorer]) -> CarrierAction {
        // 1 | avoid obstacles
        if !self.can_move(view) {
            self.avoid_obstacles(view);
            return CarrierAction::Move;
        }

        // 2 | hauling and at the base
        if self.has_rock && self.at_base(view) {
            return CarrierAction::DeliverAtBase;
        }

        // 3 | hauling, away from the base
        if self.has_rock {
            if let Some(base) = view.base {
                self.heading = heading_towards(self.position, base.position, Self::MAX_VELOCITY);
            }
            return CarrierAction::Move;
        }

        // 4 | traveling to the current target
        if let Some(target) = self.target {
            let Some(explorer) = explorers.iter().find(|e| e.id == target) else {
                // Requester vanished; forget the request.
                self.target = None;
                self.inbox.clear_from(target);
                return CarrierAction::Move;
            };
            if self.bounds().overlaps(&explorer.bounds(), Self::PICKUP_REACH) {
                if explorer.has_rock {
                    return CarrierAction::TakeRock { explorer: target };
                }
                // Stale request: the rock is already gone.
                self.target = None;
                self.inbox.clear_from(target);
                return CarrierAction::Move;
            }
            // Steer to the requester's live position; it holds still
            // once our Wait arrives.
            self.heading = heading_towards(self.position, explorer.position, Self::MAX_VELOCITY);
            return CarrierAction::Move;
        }

        // 5 | adopt the oldest pending request
        if let Some(message) = self.inbox.first_of(MessageKind::Come) {
            let source = message.source();
            self.target = Some(source);
            return CarrierAction::AcceptRequest { explorer: source };
        }

        // 6 | idle: patrol on the current heading
        CarrierAction::Move
    }

    /// Carriers pass through agents, rocks, and particles; obstacles,
    /// the base, and the world edge block.
    fn can_move(&self, view: &WorldView) -> bool {
        let next = Bounds::around(self.position.offset(self.heading), Self::SIZE);

        if !next.in_world(view.width, view.height) {
            return false;
        }
        if view.obstacles.iter().any(|o| next.overlaps(&o.bounds(), 0.0)) {
            return false;
        }
        if let Some(base) = view.base {
            if next.overlaps(&base.bounds(), 0.0) {
                return false;
            }
        }
        true
    }

    fn avoid_obstacles(&mut self, view: &WorldView) {
        let mut attempts = 0;
        while !self.can_move(view) && attempts < Self::MAX_NEW_DIRECTION_ATTEMPTS {
            self.heading = random_heading(&mut self.rng, Self::MAX_VELOCITY);
            attempts += 1;
        }
    }

    fn at_base(&self, view: &WorldView) -> bool {
        view.base
            .is_some_and(|base| self.bounds().overlaps(&base.bounds(), Self::PICKUP_REACH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_carrier_is_idle() {
        let c = Carrier::new(3, Position::new(5.0, 5.0), 11);
        assert_eq!(c.rocks, 0);
        assert!(!c.has_rock);
        assert!(c.target.is_none());
        assert!(c.inbox.is_empty());
    }

    #[test]
    fn carrier_is_faster_than_explorer() {
        assert!(Carrier::MAX_VELOCITY > Explorer::MAX_VELOCITY);
        let c = Carrier::new(3, Position::new(5.0, 5.0), 11);
        let speed = (c.heading.dx.powi(2) + c.heading.dy.powi(2)).sqrt();
        assert!((speed - Carrier::MAX_VELOCITY).abs() < 1e-9);
    }
}
