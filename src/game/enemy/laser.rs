//! Aiming lasers, traced one unit at a time through the collider registry.

use bevy::prelude::*;

use crate::game::collision::{CollisionHits, CollisionLayers, CollisionWorld};

/// Upper bound on the number of steps a laser takes.
pub const MAX_LASER_STEPS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaserTrace {
    pub end: Vec2,
    pub hit_player: bool,
}

/// Walk from `origin` along `direction` until something on `mask` is touched
/// or `max_length` is reached.
pub fn march_laser(
    world: &CollisionWorld,
    origin: Vec2,
    direction: Vec2,
    max_length: f32,
    mask: CollisionLayers,
) -> LaserTrace {
    let direction = direction.normalize_or_zero();
    let steps = (max_length.max(0.0) as usize).min(MAX_LASER_STEPS);
    let mut hits = CollisionHits::default();

    for step in 1..=steps {
        let point = origin + direction * step as f32;
        if world.query(Rect::from_center_size(point, Vec2::ONE), mask, &mut hits) {
            return LaserTrace {
                end: point,
                hit_player: hits.any_on(CollisionLayers::PLAYER),
            };
        }
    }
    LaserTrace {
        end: origin + direction * steps as f32,
        hit_player: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::collision::Collider;

    fn world_with(center: Vec2, layer: CollisionLayers) -> CollisionWorld {
        let mut world = CollisionWorld::default();
        world
            .register(Collider::new(
                center,
                Vec2::splat(20.0),
                layer,
                CollisionLayers::NONE,
            ))
            .unwrap();
        world
    }

    #[test]
    fn test_laser_stops_at_walls() {
        let world = world_with(Vec2::new(100.0, 0.0), CollisionLayers::ENVIRONMENT);
        let mask = CollisionLayers::ENVIRONMENT | CollisionLayers::PLAYER;
        let trace = march_laser(&world, Vec2::ZERO, Vec2::X, 500.0, mask);
        assert!(!trace.hit_player);
        assert!((89.0..=91.0).contains(&trace.end.x), "{:?}", trace.end);
    }

    #[test]
    fn test_laser_reports_player() {
        let world = world_with(Vec2::new(0.0, 50.0), CollisionLayers::PLAYER);
        let mask = CollisionLayers::ENVIRONMENT | CollisionLayers::PLAYER;
        let trace = march_laser(&world, Vec2::ZERO, Vec2::Y, 500.0, mask);
        assert!(trace.hit_player);
    }

    #[test]
    fn test_laser_length_is_capped() {
        let world = CollisionWorld::default();
        let trace = march_laser(&world, Vec2::ZERO, Vec2::X, 1.0e6, CollisionLayers::ENVIRONMENT);
        assert_eq!(trace.end, Vec2::new(MAX_LASER_STEPS as f32, 0.0));
        assert!(!trace.hit_player);
    }
}
