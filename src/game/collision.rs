//! Collider registry shared by everything solid in the world.
//!
//! Colliders live in a fixed array of slots. A query is a linear scan over
//! the active slots, filtered by the querier's `collides_with` mask and an
//! axis-aligned overlap test. There is no spatial partitioning: the world
//! never holds more than [`MAX_COLLIDERS`] colliders.

use std::ops::{BitOr, BitOrAssign};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{GameSystems, particles::ParticleEmitter};
use crate::screens::Screen;

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<CollisionWorld>();

    app.add_systems(
        Update,
        sync_collider_hitboxes
            .after(GameSystems::Movement)
            .before(GameSystems::Combat)
            .run_if(in_state(Screen::Gameplay)),
    );

    // Entities despawned by state scoping leave their slots behind.
    app.add_systems(PostUpdate, release_orphaned_colliders);
    app.add_systems(OnExit(Screen::Gameplay), clear_colliders);
}

/// Capacity of the registry.
pub const MAX_COLLIDERS: usize = 1024;

/// Hits reported by a single [`CollisionWorld::check`]. Further hits are dropped.
pub const MAX_HITS_PER_CHECK: usize = 10;

/// Bitmask describing what a collider is, or what it wants to hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionLayers(u8);

impl CollisionLayers {
    pub const NONE: Self = Self(0);
    pub const PLAYER: Self = Self(1 << 0);
    pub const ENVIRONMENT: Self = Self(1 << 1);
    pub const ENEMY: Self = Self(1 << 2);
    pub const ITEM: Self = Self(1 << 3);
    pub const ENEMY_PROJECTILE: Self = Self(1 << 4);
    pub const PLAYER_PROJECTILE: Self = Self(1 << 5);

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for CollisionLayers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CollisionLayers {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Back-reference from a collider to whatever it belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColliderOwner {
    #[default]
    None,
    Entity(Entity),
    /// A pooled particle, addressed by its emitter and slot.
    Particle { emitter: Entity, index: usize },
}

impl ColliderOwner {
    pub fn entity(self) -> Option<Entity> {
        match self {
            Self::Entity(entity) => Some(entity),
            Self::Particle { emitter, .. } => Some(emitter),
            Self::None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Collider {
    pub hitbox: Rect,
    /// What this collider is.
    pub layer: CollisionLayers,
    /// Layers this collider reports hits against.
    pub collides_with: CollisionLayers,
    pub owner: ColliderOwner,
}

impl Collider {
    pub fn new(
        center: Vec2,
        size: Vec2,
        layer: CollisionLayers,
        collides_with: CollisionLayers,
    ) -> Self {
        Self {
            hitbox: Rect::from_center_size(center, size),
            layer,
            collides_with,
            owner: ColliderOwner::None,
        }
    }

    pub fn with_owner(mut self, owner: ColliderOwner) -> Self {
        self.owner = owner;
        self
    }
}

/// Handle to a registered collider.
///
/// The generation changes every time a slot is reused, so a handle kept
/// past its [`CollisionWorld::reset`] never reaches the new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderId {
    index: u32,
    generation: u32,
}

impl ColliderId {
    pub fn index(self) -> usize {
        self.index as usize
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CollisionError {
    #[error("collider registry is full ({capacity} slots)")]
    RegistryFull { capacity: usize },
    #[error("collider {0:?} is not registered")]
    UnknownCollider(ColliderId),
}

/// One match reported by a query: the collider as it was at query time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionHit {
    pub id: ColliderId,
    pub collider: Collider,
}

impl CollisionHit {
    pub fn layer(&self) -> CollisionLayers {
        self.collider.layer
    }

    pub fn owner(&self) -> ColliderOwner {
        self.collider.owner
    }
}

/// Fixed-capacity hit buffer, reused across queries.
#[derive(Debug, Clone)]
pub struct CollisionHits {
    hits: Vec<CollisionHit>,
}

impl Default for CollisionHits {
    fn default() -> Self {
        Self {
            hits: Vec::with_capacity(MAX_HITS_PER_CHECK),
        }
    }
}

impl CollisionHits {
    /// Returns false when the buffer is already full.
    fn push(&mut self, hit: CollisionHit) -> bool {
        if self.is_full() {
            return false;
        }
        self.hits.push(hit);
        true
    }

    pub fn clear(&mut self) {
        self.hits.clear();
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.hits.len() >= MAX_HITS_PER_CHECK
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollisionHit> {
        self.hits.iter()
    }

    /// True if any reported hit is on one of `layers`.
    pub fn any_on(&self, layers: CollisionLayers) -> bool {
        self.hits.iter().any(|hit| hit.layer().intersects(layers))
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    collider: Collider,
    generation: u32,
    active: bool,
}

/// The global collider registry.
#[derive(Resource, Debug)]
pub struct CollisionWorld {
    slots: Vec<Slot>,
    live: usize,
}

impl Default for CollisionWorld {
    fn default() -> Self {
        Self::with_capacity(MAX_COLLIDERS)
    }
}

/// Strict AABB overlap. Touching edges and empty rectangles never collide.
#[must_use]
pub fn overlaps(a: &Rect, b: &Rect) -> bool {
    !a.is_empty()
        && !b.is_empty()
        && a.min.x < b.max.x
        && b.min.x < a.max.x
        && a.min.y < b.max.y
        && b.min.y < a.max.y
}

impl CollisionWorld {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![Slot::default(); capacity],
            live: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of active colliders.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Store `collider` in the first free slot.
    pub fn register(&mut self, collider: Collider) -> Result<ColliderId, CollisionError> {
        let Some(index) = self.slots.iter().position(|slot| !slot.active) else {
            return Err(CollisionError::RegistryFull {
                capacity: self.slots.len(),
            });
        };

        let slot = &mut self.slots[index];
        slot.generation = slot.generation.wrapping_add(1);
        slot.active = true;
        slot.collider = collider;
        self.live += 1;

        Ok(ColliderId {
            index: index as u32,
            generation: slot.generation,
        })
    }

    /// The slot `id` was issued for, active or not. `None` once the slot was reused.
    fn slot(&self, id: ColliderId) -> Option<&Slot> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
    }

    fn slot_mut(&mut self, id: ColliderId) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
    }

    pub fn get(&self, id: ColliderId) -> Option<&Collider> {
        self.slot(id)
            .filter(|slot| slot.active)
            .map(|slot| &slot.collider)
    }

    pub fn is_active(&self, id: ColliderId) -> bool {
        self.get(id).is_some()
    }

    pub fn set_hitbox(&mut self, id: ColliderId, hitbox: Rect) -> Result<(), CollisionError> {
        match self.slot_mut(id) {
            Some(slot) if slot.active => {
                slot.collider.hitbox = hitbox;
                Ok(())
            }
            _ => Err(CollisionError::UnknownCollider(id)),
        }
    }

    pub fn set_layers(
        &mut self,
        id: ColliderId,
        layer: CollisionLayers,
        collides_with: CollisionLayers,
    ) -> Result<(), CollisionError> {
        match self.slot_mut(id) {
            Some(slot) if slot.active => {
                slot.collider.layer = layer;
                slot.collider.collides_with = collides_with;
                Ok(())
            }
            _ => Err(CollisionError::UnknownCollider(id)),
        }
    }

    /// Active colliders overlapping `hitbox` whose layer is in `mask`.
    fn overlapping(
        &self,
        hitbox: Rect,
        mask: CollisionLayers,
        skip: Option<usize>,
    ) -> impl Iterator<Item = CollisionHit> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(move |(index, slot)| {
                slot.active
                    && Some(*index) != skip
                    && mask.intersects(slot.collider.layer)
                    && overlaps(&hitbox, &slot.collider.hitbox)
            })
            .map(|(index, slot)| CollisionHit {
                id: ColliderId {
                    index: index as u32,
                    generation: slot.generation,
                },
                collider: slot.collider,
            })
    }

    /// Scan the registry for colliders hit by `id`, writing them into `hits`.
    ///
    /// A collider that was reset simply reports nothing. A handle whose slot
    /// has since been reused is a caller bug and is logged.
    pub fn check(&self, id: ColliderId, hits: &mut CollisionHits) -> bool {
        hits.clear();

        let Some(slot) = self.slot(id) else {
            warn!("Collision check on unknown collider {:?}", id);
            return false;
        };
        if !slot.active {
            return false;
        }

        let me = slot.collider;
        for hit in self.overlapping(me.hitbox, me.collides_with, Some(id.index())) {
            if !hits.push(hit) {
                break;
            }
        }

        !hits.is_empty()
    }

    /// Like [`Self::check`] but stops at the first hit.
    pub fn any_hit(&self, id: ColliderId) -> bool {
        let Some(me) = self.get(id) else {
            return false;
        };
        self.overlapping(me.hitbox, me.collides_with, Some(id.index()))
            .next()
            .is_some()
    }

    /// Would `id` hit anything on `mask` if it were moved to `hitbox`?
    pub fn would_hit(&self, id: ColliderId, hitbox: Rect, mask: CollisionLayers) -> bool {
        self.overlapping(hitbox, mask, Some(id.index()))
            .next()
            .is_some()
    }

    /// Move a `size` box from `center` by `delta`, one axis at a time,
    /// dropping the axes that would end up overlapping `mask`.
    pub fn slide(
        &self,
        id: ColliderId,
        center: Vec2,
        size: Vec2,
        delta: Vec2,
        mask: CollisionLayers,
    ) -> Vec2 {
        let mut position = center;
        for step in [Vec2::new(delta.x, 0.0), Vec2::new(0.0, delta.y)] {
            if step == Vec2::ZERO {
                continue;
            }
            let candidate = position + step;
            if !self.would_hit(id, Rect::from_center_size(candidate, size), mask) {
                position = candidate;
            }
        }
        position
    }

    /// Probe with a rectangle that is not registered.
    pub fn query(&self, hitbox: Rect, mask: CollisionLayers, hits: &mut CollisionHits) -> bool {
        hits.clear();
        for hit in self.overlapping(hitbox, mask, None) {
            if !hits.push(hit) {
                break;
            }
        }
        !hits.is_empty()
    }

    pub fn query_any(&self, hitbox: Rect, mask: CollisionLayers) -> bool {
        self.overlapping(hitbox, mask, None).next().is_some()
    }

    /// Free the slot. Stale handles are ignored.
    pub fn reset(&mut self, id: ColliderId) {
        let Some(slot) = self.slot_mut(id) else {
            return;
        };
        if !slot.active {
            return;
        }
        slot.active = false;
        slot.collider = Collider::default();
        self.live -= 1;
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.active = false;
            slot.collider = Collider::default();
        }
        self.live = 0;
    }

    /// Reset every collider whose owning entity is gone.
    pub fn prune_orphans(&mut self, alive: impl Fn(Entity) -> bool) -> usize {
        let mut pruned = 0;
        for slot in &mut self.slots {
            if !slot.active {
                continue;
            }
            let Some(owner) = slot.collider.owner.entity() else {
                continue;
            };
            if !alive(owner) {
                slot.active = false;
                slot.collider = Collider::default();
                pruned += 1;
            }
        }
        self.live -= pruned;
        pruned
    }

    /// Active colliders, for the debug overlay.
    pub fn iter(&self) -> impl Iterator<Item = &Collider> {
        self.slots
            .iter()
            .filter(|slot| slot.active)
            .map(|slot| &slot.collider)
    }
}

/// Collider registered on behalf of an entity.
#[derive(Component, Debug, Clone, Copy)]
pub struct ColliderHandle(pub ColliderId);

/// Keeps an entity's collider centered on its `Transform`.
#[derive(Component, Debug, Clone, Copy)]
pub struct HitboxSize(pub Vec2);

fn sync_collider_hitboxes(
    mut world: ResMut<CollisionWorld>,
    movers: Query<(&ColliderHandle, &HitboxSize, &Transform), Changed<Transform>>,
) {
    for (handle, size, transform) in &movers {
        let hitbox = Rect::from_center_size(transform.translation.truncate(), size.0);
        if let Err(e) = world.set_hitbox(handle.0, hitbox) {
            debug!("Hitbox sync skipped: {}", e);
        }
    }
}

fn release_orphaned_colliders(
    mut world: ResMut<CollisionWorld>,
    owners: Query<(), With<ColliderHandle>>,
    emitters: Query<(), With<ParticleEmitter>>,
) {
    let pruned = world.prune_orphans(|entity| owners.contains(entity) || emitters.contains(entity));
    if pruned > 0 {
        debug!("Released {} orphaned colliders", pruned);
    }
}

fn clear_colliders(mut world: ResMut<CollisionWorld>) {
    world.clear();
    info!("Collision registry cleared");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(center: Vec2, size: f32) -> Rect {
        Rect::from_center_size(center, Vec2::splat(size))
    }

    fn wall(center: Vec2) -> Collider {
        Collider::new(
            center,
            Vec2::splat(20.0),
            CollisionLayers::ENVIRONMENT,
            CollisionLayers::NONE,
        )
    }

    fn player(center: Vec2) -> Collider {
        Collider::new(
            center,
            Vec2::splat(16.0),
            CollisionLayers::PLAYER,
            CollisionLayers::ENVIRONMENT | CollisionLayers::ENEMY,
        )
    }

    #[test]
    fn test_layers_bit_ops() {
        let mask = CollisionLayers::ENVIRONMENT | CollisionLayers::ENEMY;
        assert!(mask.intersects(CollisionLayers::ENEMY));
        assert!(!mask.intersects(CollisionLayers::ITEM));
        assert!(mask.contains(CollisionLayers::ENVIRONMENT));
        assert!(!CollisionLayers::ENEMY.contains(mask));
        assert!(CollisionLayers::NONE.is_empty());
        assert_eq!(mask.bits(), 0b110);
    }

    #[test]
    fn test_overlap_is_strict() {
        let a = square(Vec2::ZERO, 10.0);
        assert!(overlaps(&a, &square(Vec2::new(9.0, 0.0), 10.0)));
        // Sharing an edge is not a collision.
        assert!(!overlaps(&a, &square(Vec2::new(10.0, 0.0), 10.0)));
        assert!(!overlaps(&a, &square(Vec2::new(0.0, 25.0), 10.0)));
        // Zero-area rectangles never collide.
        assert!(!overlaps(&a, &Rect::from_center_size(Vec2::ZERO, Vec2::new(0.0, 5.0))));
    }

    #[test]
    fn test_register_reuses_first_free_slot() {
        let mut world = CollisionWorld::with_capacity(4);
        let a = world.register(wall(Vec2::ZERO)).unwrap();
        let b = world.register(wall(Vec2::X * 100.0)).unwrap();
        assert_eq!((a.index(), b.index()), (0, 1));
        assert_eq!(world.len(), 2);

        world.reset(a);
        assert_eq!(world.len(), 1);

        let c = world.register(wall(Vec2::Y * 100.0)).unwrap();
        assert_eq!(c.index(), 0);
        assert_ne!(a, c);
    }

    #[test]
    fn test_register_fails_when_full() {
        let mut world = CollisionWorld::with_capacity(2);
        world.register(wall(Vec2::ZERO)).unwrap();
        world.register(wall(Vec2::ZERO)).unwrap();
        assert_eq!(
            world.register(wall(Vec2::ZERO)),
            Err(CollisionError::RegistryFull { capacity: 2 })
        );
        assert_eq!(world.len(), 2);
    }

    #[test]
    fn test_check_filters_by_mask_and_skips_self() {
        let mut world = CollisionWorld::default();
        let me = world.register(player(Vec2::ZERO)).unwrap();
        world.register(wall(Vec2::new(5.0, 0.0))).unwrap();
        // Overlaps, but the player does not collide with items.
        world
            .register(Collider::new(
                Vec2::ZERO,
                Vec2::splat(10.0),
                CollisionLayers::ITEM,
                CollisionLayers::PLAYER,
            ))
            .unwrap();
        // Enemy layer, but far away.
        world
            .register(Collider::new(
                Vec2::new(500.0, 0.0),
                Vec2::splat(10.0),
                CollisionLayers::ENEMY,
                CollisionLayers::PLAYER,
            ))
            .unwrap();

        let mut hits = CollisionHits::default();
        assert!(world.check(me, &mut hits));
        assert_eq!(hits.len(), 1);
        assert!(hits.any_on(CollisionLayers::ENVIRONMENT));
        assert!(!hits.any_on(CollisionLayers::ITEM));
        assert!(hits.iter().all(|hit| hit.id != me));
    }

    #[test]
    fn test_mask_is_one_directional() {
        let mut world = CollisionWorld::default();
        let player = world.register(player(Vec2::ZERO)).unwrap();
        let wall = world.register(wall(Vec2::ZERO)).unwrap();

        let mut hits = CollisionHits::default();
        assert!(world.check(player, &mut hits));
        // Walls collide with nothing, so they never report the player.
        assert!(!world.check(wall, &mut hits));
        assert!(hits.is_empty());
    }

    #[test]
    fn test_hit_buffer_drops_overflow() {
        let mut world = CollisionWorld::default();
        let me = world.register(player(Vec2::ZERO)).unwrap();
        for _ in 0..(MAX_HITS_PER_CHECK + 5) {
            world.register(wall(Vec2::ZERO)).unwrap();
        }

        let mut hits = CollisionHits::default();
        assert!(world.check(me, &mut hits));
        assert_eq!(hits.len(), MAX_HITS_PER_CHECK);
    }

    #[test]
    fn test_reset_collider_reports_nothing() {
        let mut world = CollisionWorld::default();
        let me = world.register(player(Vec2::ZERO)).unwrap();
        world.register(wall(Vec2::ZERO)).unwrap();
        let mut hits = CollisionHits::default();
        assert!(world.check(me, &mut hits));

        // The slot stays free, so the handle is merely inactive.
        world.reset(me);
        assert!(!world.check(me, &mut hits));
        assert!(hits.is_empty());
        assert!(!world.any_hit(me));
        assert!(world.get(me).is_none());
    }

    #[test]
    fn test_stale_handle_does_not_alias_new_occupant() {
        let mut world = CollisionWorld::default();
        let old = world.register(player(Vec2::ZERO)).unwrap();
        world.reset(old);
        let new = world.register(wall(Vec2::ZERO)).unwrap();
        assert_eq!(old.index(), new.index());

        // Resetting through the stale handle must not free the new collider.
        world.reset(old);
        assert!(world.is_active(new));
        assert!(world.set_hitbox(old, square(Vec2::ZERO, 1.0)).is_err());
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn test_set_hitbox_moves_collider() {
        let mut world = CollisionWorld::default();
        let me = world.register(player(Vec2::new(100.0, 0.0))).unwrap();
        world.register(wall(Vec2::ZERO)).unwrap();
        assert!(!world.any_hit(me));

        world.set_hitbox(me, square(Vec2::new(5.0, 0.0), 16.0)).unwrap();
        assert!(world.any_hit(me));
        assert!(!world.would_hit(me, square(Vec2::new(100.0, 0.0), 16.0), CollisionLayers::ENVIRONMENT));
    }

    #[test]
    fn test_slide_keeps_the_free_axis() {
        let mut world = CollisionWorld::default();
        world.register(wall(Vec2::new(20.0, 0.0))).unwrap();
        let me = world.register(player(Vec2::ZERO)).unwrap();

        let moved = world.slide(
            me,
            Vec2::ZERO,
            Vec2::splat(10.0),
            Vec2::new(8.0, 5.0),
            CollisionLayers::ENVIRONMENT,
        );
        assert_eq!(moved, Vec2::new(0.0, 5.0));

        let moved = world.slide(
            me,
            Vec2::ZERO,
            Vec2::splat(10.0),
            Vec2::new(-8.0, 0.0),
            CollisionLayers::ENVIRONMENT,
        );
        assert_eq!(moved, Vec2::new(-8.0, 0.0));
    }

    #[test]
    fn test_query_probe() {
        let mut world = CollisionWorld::default();
        world.register(wall(Vec2::ZERO)).unwrap();
        world.register(player(Vec2::new(40.0, 0.0))).unwrap();

        let mut hits = CollisionHits::default();
        assert!(world.query(square(Vec2::ZERO, 1.0), CollisionLayers::ENVIRONMENT, &mut hits));
        assert_eq!(hits.len(), 1);
        assert!(!world.query_any(square(Vec2::new(40.0, 0.0), 1.0), CollisionLayers::ENVIRONMENT));
        assert!(world.query_any(square(Vec2::new(40.0, 0.0), 1.0), CollisionLayers::PLAYER));
    }

    #[test]
    fn test_prune_orphans_only_touches_dead_owners() {
        let mut ecs = World::new();
        let alive = ecs.spawn_empty().id();
        let dead = ecs.spawn_empty().id();
        ecs.despawn(dead);

        let mut world = CollisionWorld::default();
        let kept = world
            .register(wall(Vec2::ZERO).with_owner(ColliderOwner::Entity(alive)))
            .unwrap();
        let dropped = world
            .register(wall(Vec2::ZERO).with_owner(ColliderOwner::Particle {
                emitter: dead,
                index: 3,
            }))
            .unwrap();
        let ownerless = world.register(wall(Vec2::ZERO)).unwrap();

        let pruned = world.prune_orphans(|entity| ecs.get_entity(entity).is_ok());
        assert_eq!(pruned, 1);
        assert!(world.is_active(kept));
        assert!(!world.is_active(dropped));
        assert!(world.is_active(ownerless));
        assert_eq!(world.len(), 2);
    }

    #[test]
    fn test_clear_empties_registry() {
        let mut world = CollisionWorld::default();
        for i in 0..10 {
            world.register(wall(Vec2::X * i as f32)).unwrap();
        }
        world.clear();
        assert!(world.is_empty());
        assert_eq!(world.iter().count(), 0);
    }
}
