use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    EntityId, Heading, Position,
    carrier::Carrier,
    geometry::{Bounds, heading_towards, normalize},
    message::{Inbox, MessageKind},
    world::WorldView,
};

/// World mutation an explorer decided on this tick, applied by the
/// world before the unconditional move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExplorerAction {
    /// Advance along the current heading with no other effect.
    Move,
    /// Hand the carried rock over at the base.
    DropAtBase,
    /// Collect a reachable rock, optionally marking the spot with a
    /// trail particle.
    PickUp { rock: EntityId, leave_trail: bool },
    /// Drop a trail particle at the current position while hauling.
    LayTrail,
    /// Consume a reached trail particle.
    ConsumeTrail { particle: EntityId },
    /// Broadcast a `Come` request to every carrier inbox.
    RequestPickup,
}

/// Mobile agent that searches the field for rocks and hauls them back
/// to the base, or hands them off to a carrier when one answers.
#[derive(Debug, Clone)]
pub struct Explorer {
    pub id: EntityId,
    pub position: Position,
    pub heading: Heading,
    /// Age in ticks since creation.
    pub ticks: u64,
    pub has_rock: bool,
    pub inbox: Inbox,
    /// Tick of the last trail particle laid while hauling.
    pub initial_drop_tick: u64,
    rng: StdRng,
}

impl Explorer {
    pub const SIZE: f64 = 7.0;
    pub const MAX_VELOCITY: f64 = 1.3;
    pub const PICKUP_REACH: f64 = 1.0;
    pub const SENSOR_RANGE: f64 = 15.0;
    pub const PARTICLE_SENSOR_RANGE: f64 = 100.0;
    pub const MAX_NEW_DIRECTION_ATTEMPTS: u32 = 5;
    /// Sensing is suppressed this long so fresh spawns disperse before
    /// converging on known rocks.
    pub const SENSE_DELAY: u64 = 100;
    /// Minimum tick gap between trail particles laid while hauling.
    pub const PARTICLE_DROP_INTERVAL: u64 = 10;

    pub fn new(id: EntityId, position: Position, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let heading = random_heading(&mut rng, Self::MAX_VELOCITY);
        Self {
            id,
            position,
            heading,
            ticks: 0,
            has_rock: false,
            inbox: Inbox::new(),
            initial_drop_tick: 0,
            rng,
        }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::around(self.position, Self::SIZE)
    }

    /// Clears the carry flag when a carrier takes the rock.
    pub fn transfer_rock_to_carrier(&mut self) {
        self.has_rock = false;
    }

    /// Evaluates the per-tick priority rules. Exactly one branch fires;
    /// steering mutates the explorer's own heading here, while world
    /// mutations are returned for the scheduler to apply. The world
    /// performs the unconditional move afterwards.
    pub fn next_action(&mut self, view: &WorldView, carriers: &[Carrier]) -> ExplorerAction {
        // 1 | avoid obstacles
        if !self.can_move(view) {
            self.avoid_obstacles(view);
            return ExplorerAction::Move;
        }

        // 2 | carrying and at the base
        if self.has_rock && self.at_base(view) {
            return ExplorerAction::DropAtBase;
        }

        // 3 | carrying, away from the base
        if self.has_rock {
            return self.haul(view, carriers);
        }

        // 4 | rock sensed: pick it up if reachable, else steer to it
        if let Some(sensed) = self.sense_rock(view) {
            if let Some(rock) = self.reachable_rock(view) {
                return ExplorerAction::PickUp {
                    rock,
                    leave_trail: view.kind.trails_enabled(),
                };
            }
            self.heading = heading_towards(self.position, sensed, Self::MAX_VELOCITY);
            return ExplorerAction::Move;
        }

        // 5 | trail particle sensed
        if view.kind.trails_enabled() {
            if let Some(sensed) = self.sense_particle(view) {
                if let Some(particle) = self.reachable_particle(view) {
                    return ExplorerAction::ConsumeTrail { particle };
                }
                self.heading = heading_towards(self.position, sensed, Self::MAX_VELOCITY);
                return ExplorerAction::Move;
            }
        }

        // 6 | nothing to do: keep wandering
        ExplorerAction::Move
    }

    /// Carrying away from the base: hold for an answering carrier, or
    /// head home, re-laying the trail and asking for a relay en route.
    fn haul(&mut self, view: &WorldView, carriers: &[Carrier]) -> ExplorerAction {
        if self.inbox.first_of(MessageKind::Wait).is_some() {
            // A carrier is on its way; stand still until it arrives.
            self.heading = Heading::ZERO;
            return ExplorerAction::Move;
        }

        if let Some(base) = view.base {
            self.heading = heading_towards(self.position, base.position, Self::MAX_VELOCITY);
        }

        // A rock still sense-adjacent while hauling marks a deposit
        // worth flagging with a trail particle, rate-limited.
        if view.kind.trails_enabled()
            && self.reachable_rock(view).is_some()
            && self.ticks - self.initial_drop_tick > Self::PARTICLE_DROP_INTERVAL
        {
            return ExplorerAction::LayTrail;
        }

        if !carriers.is_empty() {
            return ExplorerAction::RequestPickup;
        }

        ExplorerAction::Move
    }

    /// True iff one step along the current heading keeps the explorer
    /// inside the world and clear of everything that blocks it.
    /// All agents, particles, and rocks are passable.
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

    /// Re-rolls the heading until a step becomes possible, giving up
    /// after a bounded number of attempts; the move still happens and
    /// the next tick retries.
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

    /// First rock within pickup reach, in registration order.
    fn reachable_rock(&self, view: &WorldView) -> Option<EntityId> {
        view.rocks
            .iter()
            .find(|rock| self.bounds().overlaps(&rock.bounds(), Self::PICKUP_REACH))
            .map(|rock| rock.id)
    }

    /// First rock within sensor range, in registration order. Suppressed
    /// until the explorer has aged past the sense delay.
    fn sense_rock(&self, view: &WorldView) -> Option<Position> {
        if self.ticks < Self::SENSE_DELAY {
            return None;
        }
        view.rocks
            .iter()
            .find(|rock| self.bounds().overlaps(&rock.bounds(), Self::SENSOR_RANGE))
            .map(|rock| rock.position)
    }

    fn reachable_particle(&self, view: &WorldView) -> Option<EntityId> {
        view.particles
            .iter()
            .find(|p| self.bounds().overlaps(&p.bounds(), Self::PICKUP_REACH))
            .map(|p| p.id)
    }

    fn sense_particle(&self, view: &WorldView) -> Option<Position> {
        view.particles
            .iter()
            .find(|p| self.bounds().overlaps(&p.bounds(), Self::PARTICLE_SENSOR_RANGE))
            .map(|p| p.position)
    }
}

/// Uniform random direction scaled to `speed`. The (measure-zero) zero
/// draw yields the zero heading.
pub(crate) fn random_heading(rng: &mut StdRng, speed: f64) -> Heading {
    let dx: f64 = rng.random_range(-speed..=speed);
    let dy: f64 = rng.random_range(-speed..=speed);
    normalize(dx, dy, speed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_explorer_starts_empty_handed_with_unit_speed() {
        let e = Explorer::new(1, Position::new(10.0, 10.0), 42);
        assert!(!e.has_rock);
        assert_eq!(e.ticks, 0);
        assert!(e.inbox.is_empty());
        let speed = (e.heading.dx.powi(2) + e.heading.dy.powi(2)).sqrt();
        assert!((speed - Explorer::MAX_VELOCITY).abs() < 1e-9);
    }

    #[test]
    fn same_seed_same_initial_heading() {
        let a = Explorer::new(1, Position::new(0.0, 0.0), 7);
        let b = Explorer::new(1, Position::new(0.0, 0.0), 7);
        assert_eq!(a.heading, b.heading);
    }

    #[test]
    fn transfer_clears_carry_flag() {
        let mut e = Explorer::new(1, Position::new(0.0, 0.0), 7);
        e.has_rock = true;
        e.transfer_rock_to_carrier();
        assert!(!e.has_rock);
    }
}
