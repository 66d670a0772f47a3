//! Swappable particle movements.
//!
//! A movement replaces the default drag/gravity integration for every
//! particle of an emitter.

use std::f32::consts::PI;

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::Particle;

/// Per-frame input handed to a movement.
#[derive(Debug, Clone, Copy)]
pub struct MovementContext {
    pub dt: f32,
}

/// A user-supplied movement callback.
pub type MovementFn = fn(&mut Particle, &MovementContext);

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Movement {
    /// Constant speed and direction.
    Linear,
    /// Gains [`ACCELERATION`] units/s every second.
    Accelerated,
    /// Loses speed proportionally to itself.
    Decelerated,
    /// Direction turns at [`SPIRAL_TURN_RATE`].
    Spiral,
    /// Linear plus up to one unit of random shake per frame.
    Jitter,
    /// Linear plus a circular wobble.
    Sine,
    #[serde(skip)]
    Custom(MovementFn),
}

const ACCELERATION: f32 = 100.0;
const DECELERATION: f32 = 2.7;
/// Radians per second.
const SPIRAL_TURN_RATE: f32 = PI;
const SINE_AMPLITUDE: f32 = 10.0;

impl Movement {
    pub fn apply(self, particle: &mut Particle, ctx: &MovementContext) {
        match self {
            Self::Linear => linear(particle, ctx),
            Self::Accelerated => accelerated(particle, ctx),
            Self::Decelerated => decelerated(particle, ctx),
            Self::Spiral => spiral(particle, ctx),
            Self::Jitter => jitter(particle, ctx),
            Self::Sine => sine(particle, ctx),
            Self::Custom(movement) => movement(particle, ctx),
        }
    }
}

fn advance(particle: &mut Particle, dt: f32) {
    particle.position += particle.direction * particle.speed * dt;
}

pub fn linear(particle: &mut Particle, ctx: &MovementContext) {
    advance(particle, ctx.dt);
}

pub fn accelerated(particle: &mut Particle, ctx: &MovementContext) {
    particle.speed += ACCELERATION * ctx.dt;
    advance(particle, ctx.dt);
}

pub fn decelerated(particle: &mut Particle, ctx: &MovementContext) {
    particle.speed -= particle.speed * DECELERATION * ctx.dt;
    advance(particle, ctx.dt);
}

pub fn spiral(particle: &mut Particle, ctx: &MovementContext) {
    particle.direction = Vec2::from_angle(SPIRAL_TURN_RATE * ctx.dt).rotate(particle.direction);
    advance(particle, ctx.dt);
}

pub fn jitter(particle: &mut Particle, ctx: &MovementContext) {
    advance(particle, ctx.dt);
    let mut rng = rand::rng();
    particle.position += Vec2::new(
        rng.random_range(-1..=1) as f32,
        rng.random_range(-1..=1) as f32,
    );
}

pub fn sine(particle: &mut Particle, ctx: &MovementContext) {
    advance(particle, ctx.dt);
    let phase = particle.age * particle.wobble;
    particle.position += Vec2::new(phase.sin(), phase.cos()) * SINE_AMPLITUDE * ctx.dt;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moving_right() -> Particle {
        Particle {
            direction: Vec2::X,
            speed: 10.0,
            alive: true,
            lifetime: 5.0,
            ..default()
        }
    }

    const CTX: MovementContext = MovementContext { dt: 0.5 };

    #[test]
    fn test_linear_keeps_speed() {
        let mut particle = moving_right();
        Movement::Linear.apply(&mut particle, &CTX);
        assert_eq!(particle.position, Vec2::new(5.0, 0.0));
        assert_eq!(particle.speed, 10.0);
    }

    #[test]
    fn test_accelerated_and_decelerated() {
        let mut fast = moving_right();
        Movement::Accelerated.apply(&mut fast, &CTX);
        assert_eq!(fast.speed, 60.0);
        assert_eq!(fast.position.x, 30.0);

        let mut slow = moving_right();
        Movement::Decelerated.apply(&mut slow, &CTX);
        assert!((slow.speed - 10.0 * (1.0 - 2.7 * 0.5)).abs() < 1e-5);
    }

    #[test]
    fn test_spiral_turns_half_circle_per_second() {
        let mut particle = moving_right();
        let ctx = MovementContext { dt: 1.0 };
        Movement::Spiral.apply(&mut particle, &ctx);
        assert!((particle.direction - Vec2::NEG_X).length() < 1e-4);
    }

    #[test]
    fn test_jitter_stays_within_one_unit() {
        let mut particle = moving_right();
        for _ in 0..20 {
            let before = particle.position + Vec2::X * 5.0;
            Movement::Jitter.apply(&mut particle, &CTX);
            let offset = particle.position - before;
            assert!(offset.x.abs() <= 1.0 && offset.y.abs() <= 1.0);
        }
    }

    #[test]
    fn test_custom_callback_is_used() {
        fn freeze(particle: &mut Particle, _: &MovementContext) {
            particle.speed = 0.0;
        }
        let mut particle = moving_right();
        Movement::Custom(freeze).apply(&mut particle, &CTX);
        assert_eq!(particle.speed, 0.0);
        assert_eq!(particle.position, Vec2::ZERO);
    }
}
