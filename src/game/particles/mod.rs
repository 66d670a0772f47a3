//! Pooled particle emitters.
//!
//! Every emitter owns a fixed array of particles that is allocated once and
//! recycled: emitting reinitializes the next dead slot, and retiring a
//! particle hands its slot back. A particle may carry its own collider,
//! registered in the shared [`CollisionWorld`], which is how bullets work.

mod movement;
mod presets;

use bevy::{color::Mix, prelude::*};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{
    FloorEntity, GameSystems,
    collision::{Collider, ColliderId, ColliderOwner, CollisionLayers, CollisionWorld},
};
use crate::{PausableSystems, screens::Screen};

pub use movement::{Movement, MovementContext, MovementFn};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(
        Update,
        update_emitters
            .in_set(GameSystems::Effects)
            .in_set(PausableSystems)
            .run_if(in_state(Screen::Gameplay)),
    );

    // Drawing keeps running while paused so the frozen scene stays visible.
    app.add_systems(
        Update,
        draw_particles
            .after(GameSystems::Effects)
            .run_if(in_state(Screen::Gameplay)),
    );
}

/// One pooled particle.
#[derive(Debug, Clone, Default)]
pub struct Particle {
    pub position: Vec2,
    /// Unit heading.
    pub direction: Vec2,
    pub speed: f32,
    pub age: f32,
    pub lifetime: f32,
    pub alive: bool,
    pub color: LinearRgba,
    pub size: Vec2,
    /// Per-particle frequency for wobbling movements.
    pub wobble: f32,
    pub collider: Option<ColliderId>,
}

/// Collider cloned onto every particle an emitter spawns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ColliderTemplate {
    pub size: Vec2,
    pub layer: CollisionLayers,
    pub collides_with: CollisionLayers,
}

/// Everything an emitter copies into the particles it spawns, plus its own
/// emission schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterPreset {
    pub direction: Vec2,
    /// Full cone width. Each particle deviates by up to half of it.
    pub spread_degrees: f32,
    /// Seconds between bursts.
    pub emission_interval: f32,
    pub burst_count: u32,
    pub max_particles: usize,
    /// Length of one emission cycle. Negative never ends.
    pub emitter_lifetime: f32,
    /// Cycles left after the current one. -1 loops forever.
    pub loop_count: i32,
    pub destroy_when_done: bool,
    pub particle_lifetime: f32,
    pub particle_speed: f32,
    /// Replaces drag and gravity when set.
    pub movement: Option<Movement>,
    pub start_color: LinearRgba,
    pub end_color: LinearRgba,
    pub start_size: Vec2,
    pub end_size: Vec2,
    pub gravity: Vec2,
    pub drag: f32,
    pub collider: Option<ColliderTemplate>,
    /// Draw depth.
    pub depth: f32,
}

impl Default for EmitterPreset {
    fn default() -> Self {
        Self {
            direction: Vec2::NEG_Y,
            spread_degrees: 360.0,
            emission_interval: 0.01,
            burst_count: 10,
            max_particles: 512,
            emitter_lifetime: 0.0,
            loop_count: 1,
            destroy_when_done: false,
            particle_lifetime: 30.0,
            particle_speed: 20.0,
            movement: None,
            start_color: Color::srgba_u8(255, 0, 0, 100).to_linear(),
            end_color: Color::srgba_u8(255, 255, 0, 0).to_linear(),
            start_size: Vec2::splat(3.0),
            end_size: Vec2::splat(1.0),
            gravity: Vec2::ZERO,
            drag: 4.0,
            collider: None,
            depth: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterStatus {
    /// Emitting, or still has particles in flight.
    Running,
    /// Inactive and empty, but kept around for reuse.
    Idle,
    /// Inactive, empty and flagged `destroy_when_done`.
    Finished,
}

#[derive(Component, Debug, Clone)]
pub struct ParticleEmitter {
    preset: EmitterPreset,
    pub position: Vec2,
    pub direction: Vec2,
    pub active: bool,
    age: f32,
    loops_left: i32,
    since_emission: f32,
    ready_index: Option<usize>,
    particles: Vec<Particle>,
}

impl ParticleEmitter {
    pub fn new(preset: EmitterPreset, position: Vec2) -> Self {
        let particles = vec![Particle::default(); preset.max_particles];
        Self {
            position,
            direction: preset.direction.normalize_or(Vec2::X),
            active: false,
            age: 0.0,
            loops_left: preset.loop_count,
            since_emission: preset.emission_interval,
            ready_index: (!particles.is_empty()).then_some(0),
            particles,
            preset,
        }
    }

    /// A self-destructing emitter that fires a single cycle.
    pub fn one_shot(mut preset: EmitterPreset, position: Vec2, direction: Vec2) -> Self {
        preset.destroy_when_done = true;
        let mut emitter = Self::new(preset, position);
        emitter.direction = direction.normalize_or(emitter.direction);
        emitter.activate_once();
        emitter
    }

    pub fn preset(&self) -> &EmitterPreset {
        &self.preset
    }

    /// Later emissions use the changes. The pool keeps the size it was
    /// built with, whatever `max_particles` says.
    pub fn preset_mut(&mut self) -> &mut EmitterPreset {
        &mut self.preset
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn iter_alive(&self) -> impl Iterator<Item = (usize, &Particle)> {
        self.particles
            .iter()
            .enumerate()
            .filter(|(_, particle)| particle.alive)
    }

    pub fn alive_count(&self) -> usize {
        self.particles.iter().filter(|p| p.alive).count()
    }

    pub fn ready_index(&self) -> Option<usize> {
        self.ready_index
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Run one more cycle, even if the loop budget is spent.
    pub fn activate_once(&mut self) {
        self.active = true;
        self.age = 0.0;
        if self.loops_left == 0 {
            self.loops_left = 1;
        }
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.age = 0.0;
    }

    /// Stop emitting and despawn once the last particle is gone.
    pub fn finish(&mut self) {
        self.preset.destroy_when_done = true;
        self.deactivate();
    }

    fn next_ready_after(&self, index: usize) -> Option<usize> {
        let len = self.particles.len();
        (1..=len)
            .map(|offset| (index + offset) % len)
            .find(|&i| !self.particles[i].alive)
    }

    /// Reinitialize the ready slot from the preset. `owner` is the emitter's
    /// entity, recorded on the particle's collider.
    pub fn emit(&mut self, owner: Entity, world: &mut CollisionWorld) {
        let Some(index) = self.ready_index else {
            return;
        };

        let half_spread = self.preset.spread_degrees.to_radians() / 2.0;
        let mut rng = rand::rng();
        let angle = if half_spread > 0.0 {
            rng.random_range(-half_spread..=half_spread)
        } else {
            0.0
        };

        let preset = &self.preset;
        let collider = preset.collider.and_then(|template| {
            let collider = Collider::new(
                self.position,
                template.size,
                template.layer,
                template.collides_with,
            )
            .with_owner(ColliderOwner::Particle {
                emitter: owner,
                index,
            });
            match world.register(collider) {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!("Particle spawned without collider: {}", e);
                    None
                }
            }
        });

        self.particles[index] = Particle {
            position: self.position,
            direction: Vec2::from_angle(angle).rotate(self.direction),
            speed: preset.particle_speed,
            age: 0.0,
            lifetime: preset.particle_lifetime,
            alive: true,
            color: preset.start_color,
            size: preset.start_size,
            wobble: rng.random_range(1.0..5.0),
            collider,
        };

        self.ready_index = self.next_ready_after(index);
    }

    pub fn burst(&mut self, count: u32, owner: Entity, world: &mut CollisionWorld) {
        for _ in 0..count {
            self.emit(owner, world);
        }
    }

    /// Move the emitter and fire one preset-sized burst there.
    pub fn burst_at(
        &mut self,
        position: Vec2,
        direction: Vec2,
        owner: Entity,
        world: &mut CollisionWorld,
    ) {
        self.position = position;
        self.direction = direction.normalize_or(self.direction);
        self.burst(self.preset.burst_count, owner, world);
    }

    fn retire(&mut self, index: usize, world: &mut CollisionWorld) {
        let particle = &mut self.particles[index];
        particle.alive = false;
        if let Some(id) = particle.collider.take() {
            world.reset(id);
        }
        if self.ready_index.is_none() {
            self.ready_index = Some(index);
        }
    }

    /// Kill a particle before its lifetime runs out.
    pub fn kill_particle(&mut self, index: usize, world: &mut CollisionWorld) {
        if self.particles.get(index).is_some_and(|p| p.alive) {
            self.retire(index, world);
        }
    }

    /// Age, move and restyle every live particle.
    pub fn update_particles(&mut self, dt: f32, world: &mut CollisionWorld) {
        let ctx = MovementContext { dt };
        for index in 0..self.particles.len() {
            if !self.particles[index].alive {
                continue;
            }

            let particle = &mut self.particles[index];
            particle.age += dt;
            if particle.age >= particle.lifetime {
                self.retire(index, world);
                continue;
            }

            match self.preset.movement {
                Some(movement) => movement.apply(particle, &ctx),
                None => {
                    particle.speed -= particle.speed * self.preset.drag * dt;
                    let velocity =
                        particle.direction * particle.speed + self.preset.gravity * particle.age;
                    particle.position += velocity * dt;
                }
            }

            let t = particle.age / particle.lifetime;
            particle.color = self.preset.start_color.mix(&self.preset.end_color, t);
            particle.size = self.preset.start_size.lerp(self.preset.end_size, t);

            if let (Some(id), Some(template)) = (particle.collider, self.preset.collider) {
                let hitbox = Rect::from_center_size(particle.position, template.size);
                if world.set_hitbox(id, hitbox).is_err() {
                    particle.collider = None;
                }
            }
        }
    }

    /// Advance particles, then the emission schedule.
    pub fn update(&mut self, dt: f32, owner: Entity, world: &mut CollisionWorld) -> EmitterStatus {
        self.update_particles(dt, world);
        self.since_emission += dt;

        if !self.active {
            if self.particles.iter().any(|p| p.alive) {
                return EmitterStatus::Running;
            }
            return if self.preset.destroy_when_done {
                EmitterStatus::Finished
            } else {
                EmitterStatus::Idle
            };
        }

        self.age += dt;
        if self.preset.emitter_lifetime >= 0.0 && self.age >= self.preset.emitter_lifetime {
            self.age = 0.0;
            if self.loops_left == 0 {
                self.active = false;
                return EmitterStatus::Running;
            }
            if self.loops_left > 0 {
                self.loops_left -= 1;
            }
        }

        if self.since_emission >= self.preset.emission_interval {
            self.since_emission = 0.0;
            self.burst(self.preset.burst_count, owner, world);
        }

        EmitterStatus::Running
    }

    /// Free every particle collider, e.g. before despawning the emitter.
    pub fn release_colliders(&mut self, world: &mut CollisionWorld) {
        for particle in &mut self.particles {
            if let Some(id) = particle.collider.take() {
                world.reset(id);
            }
        }
    }
}

/// Spawn a self-despawning effect that belongs to the current floor.
pub fn spawn_effect(
    commands: &mut Commands,
    preset: EmitterPreset,
    position: Vec2,
    direction: Vec2,
) -> Entity {
    commands
        .spawn((
            Name::new("Particle Effect"),
            ParticleEmitter::one_shot(preset, position, direction),
            FloorEntity,
            DespawnOnExit(Screen::Gameplay),
        ))
        .id()
}

fn update_emitters(
    mut commands: Commands,
    time: Res<Time>,
    mut world: ResMut<CollisionWorld>,
    mut emitters: Query<(Entity, &mut ParticleEmitter)>,
) {
    let dt = time.delta_secs();
    for (entity, mut emitter) in &mut emitters {
        if emitter.update(dt, entity, &mut world) == EmitterStatus::Finished {
            emitter.release_colliders(&mut world);
            commands.entity(entity).despawn();
        }
    }
}

/// Sprite recycled to draw one particle per frame.
#[derive(Component)]
struct ParticleSprite;

/// Sprites are spawned in chunks of this size when the pool runs dry.
const SPRITE_POOL_CHUNK: usize = 64;

fn draw_particles(
    mut commands: Commands,
    emitters: Query<&ParticleEmitter>,
    mut sprites: Query<(&mut Transform, &mut Sprite, &mut Visibility), With<ParticleSprite>>,
) {
    let mut pool = sprites.iter_mut();
    let mut missing: usize = 0;

    for emitter in &emitters {
        let depth = emitter.preset().depth;
        for (_, particle) in emitter.iter_alive() {
            if particle.color.alpha <= 0.0 {
                continue;
            }
            let Some((mut transform, mut sprite, mut visibility)) = pool.next() else {
                missing += 1;
                continue;
            };
            transform.translation = particle.position.extend(depth);
            sprite.color = particle.color.into();
            sprite.custom_size = Some(particle.size);
            visibility.set_if_neq(Visibility::Visible);
        }
    }

    for (_, _, mut visibility) in pool {
        visibility.set_if_neq(Visibility::Hidden);
    }

    if missing > 0 {
        let chunks = missing.div_ceil(SPRITE_POOL_CHUNK);
        for _ in 0..chunks * SPRITE_POOL_CHUNK {
            commands.spawn((
                Name::new("Particle Sprite"),
                ParticleSprite,
                Sprite::from_color(Color::WHITE, Vec2::ONE),
                Transform::default(),
                Visibility::Hidden,
                DespawnOnExit(Screen::Gameplay),
            ));
        }
        debug!("Particle sprite pool grew by {}", chunks * SPRITE_POOL_CHUNK);
    }
}
