use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    EntityId, Position, WorldKind,
    carrier::{Carrier, CarrierAction},
    entity::{Entity, EntityKind, EntityView, MarsBase, Obstacle, Particle, Rock},
    explorer::{Explorer, ExplorerAction},
    geometry::Bounds,
    message::Message,
};

/// Errors raised by the entity registry. Registry misuse is a
/// programming error; callers are expected to fail loudly on these.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorldError {
    #[error("entity {0} is not registered in the world")]
    NotRegistered(EntityId),
    #[error("entity {0} is already registered in the world")]
    AlreadyRegistered(EntityId),
    #[error("the world already has a base")]
    DuplicateBase,
    #[error("no collision-free position found for a {kind:?} after {attempts} attempts")]
    SpawnExhausted { kind: EntityKind, attempts: u32 },
    #[error("a {kind:?} of half-extent {half_extent} cannot fit a {width}x{height} field")]
    FieldTooSmall {
        kind: EntityKind,
        half_extent: f64,
        width: f64,
        height: f64,
    },
}

/// Startup configuration: field dimensions, population counts, trail
/// mode, and the seed that makes a run reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    pub width: f64,
    pub height: f64,
    pub kind: WorldKind,
    pub obstacles: u32,
    pub rocks: u32,
    pub explorers: u32,
    pub carriers: u32,
    pub seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            width: 800.0,
            height: 600.0,
            kind: WorldKind::Standard,
            obstacles: 20,
            rocks: 100,
            explorers: 10,
            carriers: 0,
            seed: 0,
        }
    }
}

/// Read-only view of the static and passive field contents, handed to
/// an agent while it decides its action. Agent lists are passed
/// separately so the deciding agent can be borrowed mutably.
#[derive(Debug)]
pub struct WorldView<'a> {
    pub width: f64,
    pub height: f64,
    pub kind: WorldKind,
    pub rocks: &'a [Rock],
    pub obstacles: &'a [Obstacle],
    pub particles: &'a [Particle],
    pub base: Option<&'a MarsBase>,
}

/// 64-bit fractional golden-ratio constant; spreads consecutive agent
/// ids uniformly across the seed space.
const SEED_MIX: u64 = 0x9e37_79b9_7f4a_7c15;

/// Independent per-agent seed derived from the run seed, stable under
/// population changes elsewhere in the world.
fn agent_seed(global_seed: u64, id: EntityId) -> u64 {
    global_seed ^ (id as u64).wrapping_mul(SEED_MIX)
}

/// Authoritative entity registry and tick scheduler.
///
/// Entities live in one arena per kind; `order` records registration
/// order across kinds and backs `entities()` iteration. An id appears
/// exactly once in `order` and in exactly one arena.
#[derive(Debug)]
pub struct World {
    width: f64,
    height: f64,
    kind: WorldKind,
    next_entity_id: EntityId,
    order: Vec<(EntityKind, EntityId)>,
    rocks: Vec<Rock>,
    obstacles: Vec<Obstacle>,
    particles: Vec<Particle>,
    explorers: Vec<Explorer>,
    carriers: Vec<Carrier>,
    base: Option<MarsBase>,
    rocks_collected: u32,
    rocks_target: u32,
    ticks: u64,
}

impl World {
    const MAX_SCATTER_ATTEMPTS: u32 = 1000;

    pub fn new(width: f64, height: f64, kind: WorldKind, rocks_target: u32) -> Self {
        World {
            width,
            height,
            kind,
            next_entity_id: 0,
            order: Vec::new(),
            rocks: Vec::new(),
            obstacles: Vec::new(),
            particles: Vec::new(),
            explorers: Vec::new(),
            carriers: Vec::new(),
            base: None,
            rocks_collected: 0,
            rocks_target,
            ticks: 0,
        }
    }

    /// Builds and populates a world: base at the center, agents
    /// mustered at its corner, obstacles and rocks scattered at
    /// collision-free random positions.
    pub fn from_config(config: &WorldConfig) -> Result<World, WorldError> {
        let mut world = World::new(config.width, config.height, config.kind, config.rocks);
        let mut rng = StdRng::seed_from_u64(config.seed);

        let base_position = Position::new(config.width / 2.0, config.height / 2.0);
        let base_id = world.reserve_entity_id();
        world.add(Entity::Base(MarsBase::new(base_id, base_position)))?;

        let muster = Position::new(
            base_position.x + MarsBase::SIZE + Explorer::SIZE,
            base_position.y + MarsBase::SIZE + Explorer::SIZE,
        );
        for _ in 0..config.explorers {
            let id = world.reserve_entity_id();
            world.add(Entity::Explorer(Explorer::new(
                id,
                muster,
                agent_seed(config.seed, id),
            )))?;
        }
        for _ in 0..config.carriers {
            let id = world.reserve_entity_id();
            world.add(Entity::Carrier(Carrier::new(
                id,
                muster,
                agent_seed(config.seed, id),
            )))?;
        }

        for _ in 0..config.obstacles {
            let position = world.scatter_position(&mut rng, Obstacle::SIZE, EntityKind::Obstacle)?;
            let id = world.reserve_entity_id();
            world.add(Entity::Obstacle(Obstacle::new(id, position)))?;
        }
        for _ in 0..config.rocks {
            let position = world.scatter_position(&mut rng, Rock::SIZE, EntityKind::Rock)?;
            let id = world.reserve_entity_id();
            world.add(Entity::Rock(Rock::new(id, position)))?;
        }

        Ok(world)
    }

    /// Rejection-samples an in-bounds position whose box clears every
    /// registered entity.
    fn scatter_position(
        &self,
        rng: &mut StdRng,
        half_extent: f64,
        kind: EntityKind,
    ) -> Result<Position, WorldError> {
        // An empty sample range would panic inside rand; reject the
        // configuration up front instead.
        if 2.0 * half_extent > self.width || 2.0 * half_extent > self.height {
            return Err(WorldError::FieldTooSmall {
                kind,
                half_extent,
                width: self.width,
                height: self.height,
            });
        }
        for _ in 0..Self::MAX_SCATTER_ATTEMPTS {
            let position = Position::new(
                rng.random_range(half_extent..=self.width - half_extent),
                rng.random_range(half_extent..=self.height - half_extent),
            );
            let bounds = Bounds::around(position, half_extent);
            if self.entities().all(|e| !bounds.overlaps(&e.bounds(), 0.0)) {
                return Ok(position);
            }
        }
        Err(WorldError::SpawnExhausted {
            kind,
            attempts: Self::MAX_SCATTER_ATTEMPTS,
        })
    }

    /// Hands out a fresh entity id.
    pub fn reserve_entity_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    /// Registers an entity, routing it to its kind's arena (or the base
    /// singleton).
    pub fn add(&mut self, entity: Entity) -> Result<EntityId, WorldError> {
        let id = entity.id();
        if self.order.iter().any(|(_, existing)| *existing == id) {
            return Err(WorldError::AlreadyRegistered(id));
        }
        let kind = entity.kind();
        match entity {
            Entity::Rock(rock) => self.rocks.push(rock),
            Entity::Obstacle(obstacle) => self.obstacles.push(obstacle),
            Entity::Particle(particle) => self.particles.push(particle),
            Entity::Explorer(explorer) => self.explorers.push(explorer),
            Entity::Carrier(carrier) => self.carriers.push(carrier),
            Entity::Base(base) => {
                if self.base.is_some() {
                    return Err(WorldError::DuplicateBase);
                }
                self.base = Some(base);
            }
        }
        self.order.push((kind, id));
        self.next_entity_id = self.next_entity_id.max(id + 1);
        Ok(id)
    }

    /// Unregisters an entity by id.
    pub fn remove(&mut self, id: EntityId) -> Result<(), WorldError> {
        let index = self
            .order
            .iter()
            .position(|(_, existing)| *existing == id)
            .ok_or(WorldError::NotRegistered(id))?;
        let (kind, _) = self.order.remove(index);
        match kind {
            EntityKind::Rock => self.rocks.retain(|r| r.id != id),
            EntityKind::Obstacle => self.obstacles.retain(|o| o.id != id),
            EntityKind::Particle => self.particles.retain(|p| p.id != id),
            EntityKind::Explorer => self.explorers.retain(|e| e.id != id),
            EntityKind::Carrier => self.carriers.retain(|c| c.id != id),
            EntityKind::Base => self.base = None,
        }
        Ok(())
    }

    /// Advances the simulation one step: explorers act first, then
    /// carriers, each in stable registration order, so a carrier may
    /// react to an explorer's new state within the same tick but never
    /// the other way round.
    pub fn tick(&mut self) {
        for index in 0..self.explorers.len() {
            let action = {
                let view = WorldView {
                    width: self.width,
                    height: self.height,
                    kind: self.kind,
                    rocks: &self.rocks,
                    obstacles: &self.obstacles,
                    particles: &self.particles,
                    base: self.base.as_ref(),
                };
                self.explorers[index].next_action(&view, &self.carriers)
            };
            self.apply_explorer_action(index, action);
        }
        for index in 0..self.carriers.len() {
            let action = {
                let view = WorldView {
                    width: self.width,
                    height: self.height,
                    kind: self.kind,
                    rocks: &self.rocks,
                    obstacles: &self.obstacles,
                    particles: &self.particles,
                    base: self.base.as_ref(),
                };
                self.carriers[index].next_action(&view, &self.explorers)
            };
            self.apply_carrier_action(index, action);
        }
        self.ticks += 1;
    }

    fn apply_explorer_action(&mut self, index: usize, action: ExplorerAction) {
        match action {
            ExplorerAction::Move => {}
            ExplorerAction::DropAtBase => {
                self.explorers[index].has_rock = false;
                self.rock_collected();
            }
            ExplorerAction::PickUp { rock, leave_trail } => {
                self.explorers[index].has_rock = true;
                self.remove(rock).expect("picked rock is registered");
                if leave_trail {
                    let position = self.explorers[index].position;
                    self.spawn_particle(position);
                }
            }
            ExplorerAction::LayTrail => {
                let explorer = &mut self.explorers[index];
                explorer.initial_drop_tick = explorer.ticks;
                let position = explorer.position;
                self.spawn_particle(position);
            }
            ExplorerAction::ConsumeTrail { particle } => {
                self.remove(particle)
                    .expect("consumed particle is registered");
            }
            ExplorerAction::RequestPickup => {
                let explorer = &self.explorers[index];
                let (source, x, y) = (explorer.id, explorer.position.x, explorer.position.y);
                for carrier in &mut self.carriers {
                    carrier.inbox.push(Message::Come { source, x, y });
                }
            }
        }
        // Movement is unconditional; a still-blocked heading just
        // retries next tick.
        let explorer = &mut self.explorers[index];
        explorer.position = explorer.position.offset(explorer.heading);
        explorer.ticks += 1;
    }

    fn apply_carrier_action(&mut self, index: usize, action: CarrierAction) {
        match action {
            CarrierAction::Move => {}
            CarrierAction::DeliverAtBase => {
                self.carriers[index].has_rock = false;
                self.rock_collected();
            }
            CarrierAction::TakeRock { explorer } => {
                if let Some(requester) = self.explorers.iter_mut().find(|e| e.id == explorer) {
                    requester.transfer_rock_to_carrier();
                    // The hold is over; any other carrier's Wait is
                    // consumed with the rock.
                    requester.inbox.clear();
                }
                let carrier = &mut self.carriers[index];
                carrier.has_rock = true;
                carrier.rocks += 1;
                carrier.target = None;
                carrier.inbox.clear_from(explorer);
            }
            CarrierAction::AcceptRequest { explorer } => {
                let carrier_id = self.carriers[index].id;
                if let Some(requester) = self.explorers.iter_mut().find(|e| e.id == explorer) {
                    requester.inbox.push(Message::Wait { source: carrier_id });
                }
            }
        }
        let carrier = &mut self.carriers[index];
        carrier.position = carrier.position.offset(carrier.heading);
    }

    fn spawn_particle(&mut self, position: Position) {
        let id = self.reserve_entity_id();
        self.add(Entity::Particle(Particle::new(id, position)))
            .expect("fresh particle id is unregistered");
    }

    /// Records one delivered rock. Called exactly once per successful
    /// drop-off.
    pub fn rock_collected(&mut self) {
        self.rocks_collected += 1;
    }

    /// True once the configured number of rocks has been delivered.
    pub fn is_done(&self) -> bool {
        self.rocks_collected == self.rocks_target
    }

    /// Rocks currently hauled by carriers; a diagnostic sum, not part
    /// of the tick path.
    pub fn rocks_in_carriers(&self) -> u32 {
        self.carriers.iter().map(|c| c.rocks).sum()
    }

    /// Read-only iteration over every registered entity, in
    /// registration order.
    pub fn entities(&self) -> impl Iterator<Item = EntityView<'_>> {
        self.order.iter().filter_map(|(kind, id)| match kind {
            EntityKind::Rock => self
                .rocks
                .iter()
                .find(|r| r.id == *id)
                .map(EntityView::Rock),
            EntityKind::Obstacle => self
                .obstacles
                .iter()
                .find(|o| o.id == *id)
                .map(EntityView::Obstacle),
            EntityKind::Particle => self
                .particles
                .iter()
                .find(|p| p.id == *id)
                .map(EntityView::Particle),
            EntityKind::Explorer => self
                .explorers
                .iter()
                .find(|e| e.id == *id)
                .map(EntityView::Explorer),
            EntityKind::Carrier => self
                .carriers
                .iter()
                .find(|c| c.id == *id)
                .map(EntityView::Carrier),
            EntityKind::Base => self
                .base
                .as_ref()
                .filter(|b| b.id == *id)
                .map(EntityView::Base),
        })
    }

    pub fn width(&self) -> f64 {
        self.width
    }
    pub fn height(&self) -> f64 {
        self.height
    }
    pub fn kind(&self) -> WorldKind {
        self.kind
    }
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
    pub fn rocks_collected(&self) -> u32 {
        self.rocks_collected
    }
    pub fn rocks_target(&self) -> u32 {
        self.rocks_target
    }
    pub fn rocks(&self) -> &[Rock] {
        &self.rocks
    }
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }
    pub fn explorers(&self) -> &[Explorer] {
        &self.explorers
    }
    pub fn carriers(&self) -> &[Carrier] {
        &self.carriers
    }
    pub fn base(&self) -> Option<&MarsBase> {
        self.base.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_world() -> World {
        World::new(800.0, 600.0, WorldKind::Standard, 5)
    }

    #[test]
    fn added_entity_appears_exactly_once() {
        let mut world = empty_world();
        let id = world.reserve_entity_id();
        world
            .add(Entity::Rock(Rock::new(id, Position::new(10.0, 10.0))))
            .unwrap();

        assert_eq!(world.rocks().len(), 1);
        assert_eq!(world.entities().filter(|e| e.id() == id).count(), 1);
        assert_eq!(world.entities().count(), 1);
    }

    #[test]
    fn removed_entity_is_gone_from_arena_and_order() {
        let mut world = empty_world();
        let id = world.reserve_entity_id();
        world
            .add(Entity::Rock(Rock::new(id, Position::new(10.0, 10.0))))
            .unwrap();
        world.remove(id).unwrap();

        assert!(world.rocks().is_empty());
        assert_eq!(world.entities().count(), 0);
        assert_eq!(world.remove(id), Err(WorldError::NotRegistered(id)));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut world = empty_world();
        let id = world.reserve_entity_id();
        world
            .add(Entity::Rock(Rock::new(id, Position::new(10.0, 10.0))))
            .unwrap();
        let err = world
            .add(Entity::Rock(Rock::new(id, Position::new(20.0, 20.0))))
            .unwrap_err();
        assert_eq!(err, WorldError::AlreadyRegistered(id));
    }

    #[test]
    fn second_base_is_rejected_and_removal_clears_singleton() {
        let mut world = empty_world();
        let first = world.reserve_entity_id();
        world
            .add(Entity::Base(MarsBase::new(first, Position::new(400.0, 300.0))))
            .unwrap();
        let second = world.reserve_entity_id();
        let err = world
            .add(Entity::Base(MarsBase::new(second, Position::new(10.0, 10.0))))
            .unwrap_err();
        assert_eq!(err, WorldError::DuplicateBase);

        world.remove(first).unwrap();
        assert!(world.base().is_none());
    }

    #[test]
    fn entities_iterate_in_registration_order() {
        let mut world = empty_world();
        let rock = world.reserve_entity_id();
        world
            .add(Entity::Rock(Rock::new(rock, Position::new(10.0, 10.0))))
            .unwrap();
        let obstacle = world.reserve_entity_id();
        world
            .add(Entity::Obstacle(Obstacle::new(
                obstacle,
                Position::new(100.0, 100.0),
            )))
            .unwrap();

        let ids: Vec<EntityId> = world.entities().map(|e| e.id()).collect();
        assert_eq!(ids, vec![rock, obstacle]);
    }

    #[test]
    fn is_done_tracks_the_target() {
        let mut world = World::new(100.0, 100.0, WorldKind::Standard, 2);
        assert!(!world.is_done());
        world.rock_collected();
        assert!(!world.is_done());
        world.rock_collected();
        assert!(world.is_done());
        assert_eq!(world.rocks_collected(), 2);
    }

    #[test]
    fn rocks_in_carriers_sums_all_carriers() {
        let mut world = empty_world();
        for rocks in [2, 3] {
            let id = world.reserve_entity_id();
            let mut carrier = Carrier::new(id, Position::new(50.0, 50.0), 1);
            carrier.rocks = rocks;
            world.add(Entity::Carrier(carrier)).unwrap();
        }
        assert_eq!(world.rocks_in_carriers(), 5);
    }

    #[test]
    fn from_config_populates_the_requested_counts() {
        let config = WorldConfig {
            obstacles: 5,
            rocks: 12,
            explorers: 3,
            carriers: 2,
            seed: 9,
            ..WorldConfig::default()
        };
        let world = World::from_config(&config).unwrap();

        assert_eq!(world.obstacles().len(), 5);
        assert_eq!(world.rocks().len(), 12);
        assert_eq!(world.explorers().len(), 3);
        assert_eq!(world.carriers().len(), 2);
        assert!(world.base().is_some());
        assert_eq!(world.entities().count(), 5 + 12 + 3 + 2 + 1);
        assert_eq!(world.rocks_target(), 12);
    }

    #[test]
    fn undersized_field_is_an_error_not_a_panic() {
        // 25x25 cannot hold an obstacle box of half-extent 15.
        let config = WorldConfig {
            width: 25.0,
            height: 25.0,
            obstacles: 1,
            rocks: 0,
            explorers: 0,
            carriers: 0,
            ..WorldConfig::default()
        };
        let err = World::from_config(&config).unwrap_err();
        assert!(matches!(
            err,
            WorldError::FieldTooSmall {
                kind: EntityKind::Obstacle,
                ..
            }
        ));
    }

    #[test]
    fn from_config_is_deterministic_for_a_seed() {
        let config = WorldConfig {
            seed: 1234,
            ..WorldConfig::default()
        };
        let a = World::from_config(&config).unwrap();
        let b = World::from_config(&config).unwrap();

        let positions_a: Vec<(f64, f64)> =
            a.entities().map(|e| (e.position().x, e.position().y)).collect();
        let positions_b: Vec<(f64, f64)> =
            b.entities().map(|e| (e.position().x, e.position().y)).collect();
        assert_eq!(positions_a, positions_b);
    }

    #[test]
    fn scattered_rocks_clear_obstacles_and_stay_in_bounds() {
        let config = WorldConfig {
            seed: 77,
            ..WorldConfig::default()
        };
        let world = World::from_config(&config).unwrap();

        for rock in world.rocks() {
            assert!(rock.bounds().in_world(world.width(), world.height()));
            for obstacle in world.obstacles() {
                assert!(!rock.bounds().overlaps(&obstacle.bounds(), 0.0));
            }
        }
    }
}
