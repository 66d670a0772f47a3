//! Robots: room waves, spawn warnings, steering, damage and death.

mod ai;
mod laser;
mod roster;

use std::collections::HashMap;

use bevy::{color::Mix, prelude::*};

use super::{
    FloorEntity, GameSystems,
    collision::{
        Collider, ColliderHandle, ColliderOwner, CollisionLayers, CollisionWorld, HitboxSize,
    },
    map::{ChunkKind, CurrentFloor, FloorReady, RoomEntered},
    particles::{EmitterPreset, ParticleEmitter, spawn_effect},
    player::{DamagePlayer, PLAYER_SIZE, Player},
    polish::ScreenShake,
    state::RunStats,
    weapon::Projectile,
};
use crate::{
    PausableSystems,
    audio::{SoundLibrary, sound_effect},
    screens::Screen,
};

pub use ai::{Action, Brain, Decision, EnemyView, Phase, damage_taken_scale, steer, think};
pub use laser::{LaserTrace, march_laser};
pub use roster::{EnemyKind, EnemyStats, LAST_STAGE, StageComposition, composition, roll_room};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<RoomWaves>();
    app.add_message::<DamageEnemy>();
    app.add_message::<EnemyKilled>();
    app.add_message::<RoomCleared>();
    app.add_message::<Explosion>();

    app.add_systems(
        Update,
        (
            forget_waves,
            spawn_room_waves,
            hatch_spawn_warnings,
            buff_allies,
            think_enemies,
        )
            .chain()
            .in_set(GameSystems::Intent)
            .in_set(PausableSystems)
            .run_if(in_state(Screen::Gameplay)),
    );
    app.add_systems(
        Update,
        steer_enemies
            .in_set(GameSystems::Movement)
            .in_set(PausableSystems)
            .run_if(in_state(Screen::Gameplay)),
    );
    app.add_systems(
        Update,
        (contact_damage, resolve_explosions)
            .in_set(GameSystems::Combat)
            .in_set(PausableSystems)
            .run_if(in_state(Screen::Gameplay)),
    );
    app.add_systems(
        Update,
        (apply_enemy_damage, reap_enemies)
            .chain()
            .in_set(GameSystems::Effects)
            .in_set(PausableSystems)
            .run_if(in_state(Screen::Gameplay)),
    );
    app.add_systems(
        Update,
        (draw_lasers, tint_enemies)
            .in_set(GameSystems::Ui)
            .run_if(in_state(Screen::Gameplay)),
    );
}

/// Cap on live enemies plus pending spawns.
pub const MAX_ENEMIES: usize = 100;
/// How long a spawn warning shows before the enemy appears.
const SPAWN_WARNING_SECS: f32 = 1.0;
const TACTICIAN_RADIUS: f32 = 200.0;
const TACTICIAN_MAX_ALLIES: usize = 5;
const TACTICIAN_BUFF: f32 = 1.25;
const LASER_LENGTH: f32 = 700.0;
const ENEMY_MASK: CollisionLayers = CollisionLayers::PLAYER
    .union(CollisionLayers::ENVIRONMENT)
    .union(CollisionLayers::ENEMY);

#[derive(Component, Debug, Clone)]
pub struct Enemy {
    pub kind: EnemyKind,
    pub stats: EnemyStats,
    pub health: f32,
    pub velocity: Vec2,
    pub facing: Vec2,
    pub buff: f32,
    pub brain: Brain,
    pub decision: Decision,
    /// Chunk whose wave this enemy belongs to.
    pub room: IVec2,
    detonated: bool,
}

impl Enemy {
    pub fn new(kind: EnemyKind, room: IVec2) -> Self {
        let stats = kind.stats();
        Self {
            kind,
            stats,
            health: stats.health,
            velocity: Vec2::ZERO,
            facing: Vec2::NEG_Y,
            buff: 1.0,
            brain: Brain::default(),
            decision: Decision::default(),
            room,
            detonated: false,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    /// Returns the damage actually dealt after armor and stance.
    pub fn take_damage(&mut self, amount: f32) -> f32 {
        let dealt = amount * self.stats.armor * damage_taken_scale(self.kind, &self.brain);
        self.health -= dealt;
        dealt
    }

    /// Returns the health actually restored.
    pub fn heal(&mut self, amount: f32) -> f32 {
        let before = self.health;
        self.health = (self.health + amount).min(self.stats.health);
        self.health - before
    }
}

/// Enemy bullets, for kinds that shoot.
#[derive(Component, Debug, Clone, Copy)]
struct EnemyGun(Entity);

/// Marker where an enemy is about to appear.
#[derive(Component, Debug, Clone, Copy)]
struct SpawnWarning {
    kind: EnemyKind,
    room: IVec2,
    remaining: f32,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct DamageEnemy {
    pub enemy: Entity,
    pub amount: f32,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct EnemyKilled {
    pub kind: EnemyKind,
    pub position: Vec2,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct RoomCleared {
    pub chunk: IVec2,
}

/// Area damage that hurts the player.
#[derive(Message, Debug, Clone, Copy)]
pub struct Explosion {
    pub position: Vec2,
    pub radius: f32,
    pub damage: f32,
}

/// Enemies still standing (or about to spawn) per room.
#[derive(Resource, Debug, Default)]
pub struct RoomWaves {
    remaining: HashMap<IVec2, usize>,
}

impl RoomWaves {
    pub fn remaining(&self, chunk: IVec2) -> usize {
        self.remaining.get(&chunk).copied().unwrap_or(0)
    }

    fn add(&mut self, chunk: IVec2, count: usize) {
        *self.remaining.entry(chunk).or_default() += count;
    }

    /// Returns true when this was the room's last enemy.
    fn remove_one(&mut self, chunk: IVec2) -> bool {
        let Some(count) = self.remaining.get_mut(&chunk) else {
            return false;
        };
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.remaining.remove(&chunk);
            return true;
        }
        false
    }
}

/// Bullets for kinds that shoot: (speed, lifetime, spread, damage).
fn gun_for(kind: EnemyKind) -> Option<(f32, f32, f32, f32)> {
    match kind {
        EnemyKind::Echo => Some((300.0, 1.5, 4.0, ai::ECHO_BULLET_DAMAGE)),
        EnemyKind::Vantage => Some((700.0, 1.5, 0.0, ai::VANTAGE_SHOT_DAMAGE)),
        EnemyKind::Sentry => Some((400.0, 1.5, 0.5, ai::SENTRY_SHOT_DAMAGE)),
        _ => None,
    }
}

fn forget_waves(mut ready: MessageReader<FloorReady>, mut waves: ResMut<RoomWaves>) {
    if ready.read().last().is_some() {
        waves.remaining.clear();
    }
}

fn spawn_room_waves(
    mut commands: Commands,
    mut entered: MessageReader<RoomEntered>,
    floor: Option<Res<CurrentFloor>>,
    mut waves: ResMut<RoomWaves>,
    enemies: Query<(), With<Enemy>>,
    warnings: Query<(), With<SpawnWarning>>,
) {
    let Some(floor) = floor else {
        entered.clear();
        return;
    };
    let mut rng = rand::rng();
    let mut budget = MAX_ENEMIES.saturating_sub(enemies.iter().count() + warnings.iter().count());

    for room in entered.read() {
        if room.kind != ChunkKind::Normal {
            continue;
        }
        let mut wave = roll_room(floor.stage, &mut rng);
        wave.truncate(budget);
        budget -= wave.len();

        let mut spawned = 0;
        for kind in wave {
            let Some(position) = floor.layout.random_tile_in_room(room.chunk, &mut rng) else {
                continue;
            };
            let mut marker = ParticleEmitter::new(EmitterPreset::spawn_warning(), position);
            marker.activate();
            commands.spawn((
                Name::new("Spawn Warning"),
                SpawnWarning {
                    kind,
                    room: room.chunk,
                    remaining: SPAWN_WARNING_SECS,
                },
                marker,
                FloorEntity,
                DespawnOnExit(Screen::Gameplay),
            ));
            spawned += 1;
        }
        waves.add(room.chunk, spawned);
        info!("Room {} wakes up: {} robots", room.chunk, spawned);
    }
}

fn hatch_spawn_warnings(
    mut commands: Commands,
    time: Res<Time>,
    mut world: ResMut<CollisionWorld>,
    mut waves: ResMut<RoomWaves>,
    mut cleared: MessageWriter<RoomCleared>,
    mut warnings: Query<(Entity, &mut SpawnWarning, &mut ParticleEmitter)>,
) {
    for (entity, mut warning, mut marker) in &mut warnings {
        warning.remaining -= time.delta_secs();
        if warning.remaining > 0.0 {
            continue;
        }
        commands.entity(entity).remove::<SpawnWarning>();
        marker.finish();

        let position = marker.position;
        let stats = warning.kind.stats();
        if world.query_any(Rect::from_center_size(position, stats.hitbox), ENEMY_MASK) {
            debug!("{:?} spawn at {} blocked", warning.kind, position);
            if waves.remove_one(warning.room) {
                cleared.write(RoomCleared {
                    chunk: warning.room,
                });
            }
            continue;
        }
        spawn_enemy(&mut commands, &mut world, warning.kind, warning.room, position);
    }
}

fn spawn_enemy(
    commands: &mut Commands,
    world: &mut CollisionWorld,
    kind: EnemyKind,
    room: IVec2,
    position: Vec2,
) {
    let stats = kind.stats();
    let enemy = commands
        .spawn((
            Name::new(format!("{kind:?}")),
            Enemy::new(kind, room),
            Sprite::from_color(kind.color(), stats.hitbox),
            Transform::from_translation(position.extend(5.0)),
            HitboxSize(stats.hitbox),
            FloorEntity,
            DespawnOnExit(Screen::Gameplay),
        ))
        .id();

    let collider = Collider::new(position, stats.hitbox, CollisionLayers::ENEMY, ENEMY_MASK)
        .with_owner(ColliderOwner::Entity(enemy));
    match world.register(collider) {
        Ok(id) => {
            commands.entity(enemy).insert(ColliderHandle(id));
        }
        Err(e) => {
            warn!("{:?} dropped, no collider: {}", kind, e);
            commands.entity(enemy).despawn();
            return;
        }
    }

    if let Some((speed, lifetime, spread, damage)) = gun_for(kind) {
        let gun = commands
            .spawn((
                Name::new("Enemy Bullets"),
                ParticleEmitter::new(EmitterPreset::enemy_bullet(speed, lifetime, spread), position),
                Projectile {
                    damage,
                    fragments: None,
                },
                FloorEntity,
                DespawnOnExit(Screen::Gameplay),
            ))
            .id();
        commands.entity(enemy).insert(EnemyGun(gun));
    }
}

fn buff_allies(mut enemies: Query<(Entity, &mut Enemy, &Transform)>) {
    let snapshot: Vec<(Entity, EnemyKind, Vec2)> = enemies
        .iter()
        .map(|(entity, enemy, transform)| (entity, enemy.kind, transform.translation.truncate()))
        .collect();

    let mut buffed = Vec::new();
    for &(tactician, kind, center) in &snapshot {
        if kind != EnemyKind::Tactician {
            continue;
        }
        let mut near: Vec<(f32, Entity)> = snapshot
            .iter()
            .filter(|(entity, _, _)| *entity != tactician)
            .map(|&(entity, _, position)| (position.distance(center), entity))
            .filter(|(distance, _)| *distance <= TACTICIAN_RADIUS)
            .collect();
        near.sort_by(|a, b| a.0.total_cmp(&b.0));
        buffed.extend(near.into_iter().take(TACTICIAN_MAX_ALLIES).map(|(_, e)| e));
    }

    for (entity, mut enemy, _) in &mut enemies {
        let buff = if buffed.contains(&entity) { TACTICIAN_BUFF } else { 1.0 };
        if enemy.buff != buff {
            enemy.buff = buff;
        }
    }
}

fn think_enemies(
    time: Res<Time>,
    floor: Option<Res<CurrentFloor>>,
    mut world: ResMut<CollisionWorld>,
    mut explosions: MessageWriter<Explosion>,
    players: Query<&Transform, With<Player>>,
    mut enemies: Query<(Entity, &mut Enemy, &Transform, Option<&EnemyGun>)>,
    mut emitters: Query<&mut ParticleEmitter>,
    mut commands: Commands,
) {
    let (Some(floor), Ok(player)) = (floor, players.single()) else {
        return;
    };
    let player = player.translation.truncate();
    let dt = time.delta_secs();
    let mut rng = rand::rng();

    let allies: Vec<(Entity, EnemyKind, Vec2)> = enemies
        .iter()
        .map(|(entity, enemy, transform, _)| (entity, enemy.kind, transform.translation.truncate()))
        .collect();
    let mut heals = Vec::new();

    for (entity, mut enemy, transform, gun) in &mut enemies {
        if enemy.is_dead() {
            continue;
        }
        let position = transform.translation.truncate();
        let nearest_ally = allies
            .iter()
            .filter(|(other, kind, _)| *other != entity && *kind != EnemyKind::Recharge)
            .map(|(_, _, ally)| *ally)
            .min_by(|a, b| a.distance_squared(position).total_cmp(&b.distance_squared(position)));
        let view = EnemyView {
            position,
            player,
            line_of_sight: floor.layout.line_of_sight(position, player),
            health: enemy.health,
            max_health: enemy.stats.health,
            buff: enemy.buff,
            nearest_ally,
        };

        let Enemy { kind, brain, .. } = &mut *enemy;
        let decision = think(*kind, brain, &view, dt, &mut rng);
        enemy.decision = decision;
        if decision.direction != Vec2::ZERO {
            enemy.facing = decision.direction;
        }

        match decision.action {
            Some(Action::Fire { direction }) => {
                let Some(EnemyGun(gun)) = gun else {
                    continue;
                };
                if let Ok(mut bullets) = emitters.get_mut(*gun) {
                    let offset = enemy.stats.hitbox.max_element() / 2.0 + 2.0;
                    bullets.burst_at(position + direction * offset, direction, *gun, &mut world);
                }
            }
            Some(Action::Blast {
                radius,
                damage,
                fatal,
            }) => {
                explosions.write(Explosion {
                    position,
                    radius,
                    damage,
                });
                if fatal {
                    enemy.detonated = true;
                    enemy.health = 0.0;
                }
            }
            Some(Action::HealAllies { radius, amount }) => {
                heals.push((entity, position, radius, amount));
                spawn_effect(&mut commands, EmitterPreset::heal(), position, Vec2::Y);
            }
            None => {}
        }
    }

    for (healer, center, radius, amount) in heals {
        for (entity, mut enemy, transform, _) in &mut enemies {
            if entity == healer || enemy.is_dead() {
                continue;
            }
            if transform.translation.truncate().distance(center) > radius {
                continue;
            }
            // Recharges top each other up at half rate.
            let amount = if enemy.kind == EnemyKind::Recharge {
                amount / 2.0
            } else {
                amount
            };
            enemy.heal(amount);
        }
    }
}

fn steer_enemies(
    time: Res<Time>,
    world: Res<CollisionWorld>,
    mut enemies: Query<(&mut Enemy, &mut Transform, &ColliderHandle), Without<Player>>,
) {
    let dt = time.delta_secs();
    for (mut enemy, mut transform, handle) in &mut enemies {
        if enemy.is_dead() {
            continue;
        }
        let stats = enemy.stats;
        let max_speed = stats.max_speed * enemy.buff * enemy.decision.speed_scale;
        let mut velocity = steer(
            enemy.velocity,
            enemy.decision.direction,
            max_speed,
            stats.acceleration,
            stats.drag,
            dt,
        );

        let position = transform.translation.truncate();
        let delta = velocity * dt;
        let moved = world.slide(handle.0, position, stats.hitbox, delta, ENEMY_MASK);
        // Blocked axes lose their speed.
        if moved.x == position.x {
            velocity.x = 0.0;
        }
        if moved.y == position.y {
            velocity.y = 0.0;
        }
        enemy.velocity = velocity;
        if moved != position {
            transform.translation = moved.extend(transform.translation.z);
        }
    }
}

fn contact_damage(
    world: Res<CollisionWorld>,
    enemies: Query<(&Enemy, &Transform, &ColliderHandle)>,
    mut damage: MessageWriter<DamagePlayer>,
) {
    for (enemy, transform, handle) in &enemies {
        if enemy.is_dead() || enemy.stats.contact_damage <= 0.0 {
            continue;
        }
        // Movement never lets the boxes overlap, so touch means within a pixel or two.
        let reach = Rect::from_center_size(
            transform.translation.truncate(),
            enemy.stats.hitbox + Vec2::splat(4.0),
        );
        if world.would_hit(handle.0, reach, CollisionLayers::PLAYER) {
            damage.write(DamagePlayer {
                amount: enemy.stats.contact_damage * enemy.decision.contact_scale,
            });
        }
    }
}

fn resolve_explosions(
    mut commands: Commands,
    mut explosions: MessageReader<Explosion>,
    mut damage: MessageWriter<DamagePlayer>,
    mut shake: ResMut<ScreenShake>,
    sounds: Option<Res<SoundLibrary>>,
    players: Query<&Transform, With<Player>>,
) {
    let player = players.single().ok().map(|t| t.translation.truncate());
    for explosion in explosions.read() {
        spawn_effect(
            &mut commands,
            EmitterPreset::explosion(explosion.radius),
            explosion.position,
            Vec2::Y,
        );
        shake.add_trauma(0.5);
        if let Some(sounds) = &sounds {
            commands.spawn(sound_effect(sounds.explosion.clone()));
        }
        let in_range = player.is_some_and(|player| {
            player.distance(explosion.position) <= explosion.radius + PLAYER_SIZE / 2.0
        });
        if in_range {
            damage.write(DamagePlayer {
                amount: explosion.damage,
            });
        }
    }
}

fn apply_enemy_damage(
    mut commands: Commands,
    mut hits: MessageReader<DamageEnemy>,
    mut enemies: Query<(&mut Enemy, &Transform)>,
) {
    for hit in hits.read() {
        let Ok((mut enemy, transform)) = enemies.get_mut(hit.enemy) else {
            continue;
        };
        if enemy.is_dead() {
            continue;
        }
        enemy.take_damage(hit.amount);
        spawn_effect(
            &mut commands,
            EmitterPreset::sparks(),
            transform.translation.truncate(),
            Vec2::Y,
        );
    }
}

fn reap_enemies(
    mut commands: Commands,
    mut world: ResMut<CollisionWorld>,
    mut stats: ResMut<RunStats>,
    mut waves: ResMut<RoomWaves>,
    mut killed: MessageWriter<EnemyKilled>,
    mut cleared: MessageWriter<RoomCleared>,
    mut explosions: MessageWriter<Explosion>,
    enemies: Query<(Entity, &Enemy, &Transform, &ColliderHandle, Option<&EnemyGun>)>,
    mut emitters: Query<&mut ParticleEmitter>,
) {
    for (entity, enemy, transform, handle, gun) in &enemies {
        if !enemy.is_dead() {
            continue;
        }
        let position = transform.translation.truncate();
        world.reset(handle.0);

        if enemy.kind == EnemyKind::Kamikaze && !enemy.detonated {
            explosions.write(Explosion {
                position,
                radius: ai::KAMIKAZE_BLAST_RADIUS,
                damage: ai::KAMIKAZE_BLAST_DAMAGE,
            });
        }
        // Bullets already in flight outlive their shooter.
        if let Some(EnemyGun(gun)) = gun {
            if let Ok(mut bullets) = emitters.get_mut(*gun) {
                bullets.finish();
            }
        }

        spawn_effect(&mut commands, EmitterPreset::blood_oil(), position, Vec2::Y);
        stats.robots_destroyed += 1;
        killed.write(EnemyKilled {
            kind: enemy.kind,
            position,
        });
        if waves.remove_one(enemy.room) {
            info!("Room {} cleared", enemy.room);
            cleared.write(RoomCleared { chunk: enemy.room });
        }
        commands.entity(entity).despawn();
    }
}

fn draw_lasers(
    mut gizmos: Gizmos,
    world: Res<CollisionWorld>,
    enemies: Query<(&Enemy, &Transform)>,
) {
    let mask = CollisionLayers::ENVIRONMENT | CollisionLayers::PLAYER;
    for (enemy, transform) in &enemies {
        let Some(direction) = enemy.decision.laser else {
            continue;
        };
        let origin = transform.translation.truncate();
        let start = origin + direction * (enemy.stats.hitbox.max_element() / 2.0 + 1.0);
        let trace = march_laser(&world, start, direction, LASER_LENGTH, mask);
        let color = if trace.hit_player {
            Color::srgba(1.0, 0.1, 0.1, 0.9)
        } else {
            Color::srgba(1.0, 0.2, 0.2, 0.45)
        };
        gizmos.line_2d(start, trace.end, color);
    }
}

fn tint_enemies(time: Res<Time>, mut enemies: Query<(&Enemy, &mut Sprite)>) {
    let blink = (time.elapsed_secs() * 16.0).sin() > 0.0;
    for (enemy, mut sprite) in &mut enemies {
        let base = enemy.kind.color();
        let color = match enemy.brain.phase {
            Phase::Charging if blink => Color::WHITE,
            Phase::Armed | Phase::Dashing => base.mix(&Color::WHITE, 0.4),
            _ if ai::is_enraged(enemy.kind, enemy.health) => base.mix(&Color::BLACK, 0.3),
            _ => base,
        };
        if sprite.color != color {
            sprite.color = color;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_armor_and_sabot_stance_reduce_damage() {
        let mut juggernaut = Enemy::new(EnemyKind::Juggernaut, IVec2::ZERO);
        assert_eq!(juggernaut.take_damage(40.0), 20.0);
        assert_eq!(juggernaut.health, 180.0);

        let mut sabot = Enemy::new(EnemyKind::Sabot, IVec2::ZERO);
        sabot.brain.phase = Phase::Dashing;
        assert_eq!(sabot.take_damage(40.0), 30.0);
    }

    #[test]
    fn test_heal_clamps_to_max() {
        let mut proxy = Enemy::new(EnemyKind::Proxy, IVec2::ZERO);
        proxy.take_damage(30.0);
        assert_eq!(proxy.heal(100.0), 30.0);
        assert_eq!(proxy.health, 80.0);
    }

    #[test]
    fn test_room_waves_report_the_last_enemy() {
        let mut waves = RoomWaves::default();
        let room = IVec2::new(1, 2);
        waves.add(room, 2);
        assert!(!waves.remove_one(room));
        assert!(waves.remove_one(room));
        assert_eq!(waves.remaining(room), 0);
        assert!(!waves.remove_one(room));
    }

    #[test]
    fn test_tacticians_buff_nearest_allies() {
        let mut app = App::new();
        app.add_systems(Update, buff_allies);

        let spawn = |app: &mut App, kind, x: f32| {
            app.world_mut()
                .spawn((Enemy::new(kind, IVec2::ZERO), Transform::from_xyz(x, 0.0, 0.0)))
                .id()
        };
        let tactician = spawn(&mut app, EnemyKind::Tactician, 0.0);
        let near: Vec<_> = (1..=6)
            .map(|i| spawn(&mut app, EnemyKind::Proxy, i as f32 * 20.0))
            .collect();
        let far = spawn(&mut app, EnemyKind::Proxy, 500.0);

        app.update();

        let buff = |app: &App, entity| app.world().get::<Enemy>(entity).unwrap().buff;
        for entity in &near[..5] {
            assert_eq!(buff(&app, *entity), TACTICIAN_BUFF);
        }
        assert_eq!(buff(&app, near[5]), 1.0);
        assert_eq!(buff(&app, far), 1.0);
        assert_eq!(buff(&app, tactician), 1.0);
    }
}
