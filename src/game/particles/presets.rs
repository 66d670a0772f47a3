//! Emitter presets used across the game.

use bevy::{color::Alpha, prelude::*};

use super::{ColliderTemplate, EmitterPreset, Movement};
use crate::game::collision::CollisionLayers;

/// Bullets are squares of this size, collider included.
pub const BULLET_SIZE: f32 = 3.0;

fn rgba(r: u8, g: u8, b: u8, a: u8) -> LinearRgba {
    Color::srgba_u8(r, g, b, a).to_linear()
}

impl EmitterPreset {
    /// Player bullets. One burst is one trigger pull.
    pub fn bullet(speed: f32, lifetime: f32, spread_degrees: f32, pellets: u32) -> Self {
        Self {
            spread_degrees,
            emission_interval: 0.0,
            burst_count: pellets,
            max_particles: 256,
            particle_lifetime: lifetime,
            particle_speed: speed,
            movement: Some(Movement::Linear),
            start_color: rgba(255, 240, 170, 255),
            end_color: rgba(255, 170, 60, 255),
            start_size: Vec2::splat(BULLET_SIZE),
            end_size: Vec2::splat(BULLET_SIZE),
            collider: Some(ColliderTemplate {
                size: Vec2::splat(BULLET_SIZE),
                layer: CollisionLayers::PLAYER_PROJECTILE,
                collides_with: CollisionLayers::ENVIRONMENT | CollisionLayers::ENEMY,
            }),
            depth: 6.0,
            ..default()
        }
    }

    pub fn enemy_bullet(speed: f32, lifetime: f32, spread_degrees: f32) -> Self {
        Self {
            burst_count: 1,
            max_particles: 64,
            start_color: rgba(255, 60, 60, 255),
            end_color: rgba(200, 0, 80, 255),
            collider: Some(ColliderTemplate {
                size: Vec2::splat(BULLET_SIZE),
                layer: CollisionLayers::ENEMY_PROJECTILE,
                collides_with: CollisionLayers::ENVIRONMENT | CollisionLayers::PLAYER,
            }),
            ..Self::bullet(speed, lifetime, spread_degrees, 1)
        }
    }

    /// Sparks thrown back off whatever a bullet hit.
    pub fn bullet_fragments() -> Self {
        Self {
            spread_degrees: 120.0,
            emission_interval: 0.0,
            burst_count: 6,
            max_particles: 192,
            particle_lifetime: 0.25,
            particle_speed: 90.0,
            movement: Some(Movement::Decelerated),
            start_color: rgba(255, 230, 120, 255),
            end_color: rgba(255, 90, 20, 0),
            start_size: Vec2::splat(2.0),
            end_size: Vec2::splat(1.0),
            depth: 7.0,
            ..default()
        }
    }

    pub fn muzzle_flash() -> Self {
        Self {
            spread_degrees: 40.0,
            emission_interval: 0.0,
            burst_count: 8,
            max_particles: 96,
            particle_lifetime: 0.08,
            particle_speed: 140.0,
            drag: 10.0,
            start_color: rgba(255, 255, 220, 255),
            end_color: rgba(255, 180, 40, 0),
            start_size: Vec2::splat(3.0),
            end_size: Vec2::splat(1.0),
            depth: 7.0,
            ..default()
        }
    }

    fn casing(size: Vec2, color: LinearRgba) -> Self {
        Self {
            spread_degrees: 50.0,
            emission_interval: 0.0,
            burst_count: 1,
            max_particles: 48,
            particle_lifetime: 0.6,
            particle_speed: 70.0,
            movement: Some(Movement::Decelerated),
            start_color: color,
            end_color: color.with_alpha(0.0),
            start_size: size,
            end_size: size,
            depth: 4.0,
            ..default()
        }
    }

    pub fn casing_pistol() -> Self {
        Self::casing(Vec2::new(2.0, 1.0), rgba(214, 170, 70, 255))
    }

    pub fn casing_rifle() -> Self {
        Self::casing(Vec2::new(3.0, 1.0), rgba(200, 150, 50, 255))
    }

    pub fn casing_shotgun() -> Self {
        Self::casing(Vec2::new(4.0, 2.0), rgba(190, 40, 40, 255))
    }

    /// Fireball sized so most particles stop near `radius`.
    pub fn explosion(radius: f32) -> Self {
        Self {
            spread_degrees: 360.0,
            emission_interval: 0.0,
            burst_count: 48,
            max_particles: 48,
            particle_lifetime: 0.45,
            particle_speed: radius * 5.0,
            drag: 6.0,
            start_color: rgba(255, 200, 80, 255),
            end_color: rgba(80, 70, 70, 0),
            start_size: Vec2::splat(6.0),
            end_size: Vec2::splat(2.0),
            depth: 8.0,
            ..default()
        }
    }

    /// Oil and scrap sprayed when a robot dies.
    pub fn blood_oil() -> Self {
        Self {
            spread_degrees: 360.0,
            emission_interval: 0.0,
            burst_count: 16,
            max_particles: 16,
            particle_lifetime: 0.7,
            particle_speed: 70.0,
            drag: 5.0,
            start_color: rgba(40, 40, 50, 255),
            end_color: rgba(20, 20, 30, 0),
            start_size: Vec2::splat(3.0),
            end_size: Vec2::splat(2.0),
            depth: 3.0,
            ..default()
        }
    }

    pub fn heal() -> Self {
        Self {
            direction: Vec2::Y,
            spread_degrees: 70.0,
            emission_interval: 0.0,
            burst_count: 14,
            max_particles: 14,
            particle_lifetime: 0.8,
            particle_speed: 30.0,
            movement: Some(Movement::Sine),
            start_color: rgba(90, 255, 120, 255),
            end_color: rgba(90, 255, 120, 0),
            start_size: Vec2::splat(3.0),
            end_size: Vec2::splat(1.0),
            depth: 8.0,
            ..default()
        }
    }

    /// Afterimage left while the player dashes. Runs while active.
    pub fn dash_trail() -> Self {
        Self {
            spread_degrees: 0.0,
            emission_interval: 0.01,
            burst_count: 1,
            max_particles: 64,
            emitter_lifetime: -1.0,
            loop_count: -1,
            particle_lifetime: 0.2,
            particle_speed: 0.0,
            start_color: rgba(120, 200, 255, 160),
            end_color: rgba(120, 200, 255, 0),
            start_size: Vec2::splat(14.0),
            end_size: Vec2::splat(8.0),
            depth: 2.0,
            ..default()
        }
    }

    /// Swirl marking where an enemy is about to appear.
    pub fn spawn_warning() -> Self {
        Self {
            spread_degrees: 360.0,
            emission_interval: 0.1,
            burst_count: 3,
            max_particles: 32,
            emitter_lifetime: -1.0,
            loop_count: -1,
            particle_lifetime: 0.5,
            particle_speed: 25.0,
            movement: Some(Movement::Spiral),
            start_color: rgba(255, 40, 40, 220),
            end_color: rgba(255, 40, 40, 0),
            start_size: Vec2::splat(3.0),
            end_size: Vec2::splat(1.0),
            depth: 2.0,
            ..default()
        }
    }

    /// Static that crackles off a damaged robot.
    pub fn sparks() -> Self {
        Self {
            spread_degrees: 360.0,
            emission_interval: 0.0,
            burst_count: 5,
            max_particles: 10,
            particle_lifetime: 0.3,
            particle_speed: 40.0,
            movement: Some(Movement::Jitter),
            start_color: rgba(140, 220, 255, 255),
            end_color: rgba(255, 255, 255, 0),
            start_size: Vec2::splat(2.0),
            end_size: Vec2::splat(1.0),
            depth: 7.0,
            ..default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bullet_presets_collide_with_the_right_layers() {
        let player = EmitterPreset::bullet(400.0, 1.0, 4.0, 1).collider.unwrap();
        assert_eq!(player.layer, CollisionLayers::PLAYER_PROJECTILE);
        assert!(player.collides_with.intersects(CollisionLayers::ENEMY));
        assert!(!player.collides_with.intersects(CollisionLayers::PLAYER));

        let enemy = EmitterPreset::enemy_bullet(300.0, 1.5, 0.5).collider.unwrap();
        assert_eq!(enemy.layer, CollisionLayers::ENEMY_PROJECTILE);
        assert!(enemy.collides_with.intersects(CollisionLayers::PLAYER));
        assert!(!enemy.collides_with.intersects(CollisionLayers::ENEMY));
    }

    #[test]
    fn test_effect_presets_have_no_colliders() {
        for preset in [
            EmitterPreset::bullet_fragments(),
            EmitterPreset::muzzle_flash(),
            EmitterPreset::casing_shotgun(),
            EmitterPreset::explosion(50.0),
            EmitterPreset::blood_oil(),
            EmitterPreset::heal(),
        ] {
            assert!(preset.collider.is_none());
            assert!(preset.burst_count as usize <= preset.max_particles);
        }
    }

    #[test]
    fn test_preset_survives_json() {
        let preset = EmitterPreset::bullet(400.0, 1.0, 4.0, 8);
        let json = serde_json::to_string(&preset).unwrap();
        let back: EmitterPreset = serde_json::from_str(&json).unwrap();
        assert_eq!(back.burst_count, 8);
        assert_eq!(
            back.collider.map(|c| c.layer),
            Some(CollisionLayers::PLAYER_PROJECTILE)
        );
    }
}
