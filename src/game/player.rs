//! The player: input, movement, dashing and health.

use bevy::{prelude::*, window::PrimaryWindow};

use super::{
    GameSystems,
    collision::{
        Collider, ColliderHandle, ColliderOwner, CollisionLayers, CollisionWorld, HitboxSize,
    },
    map::{CurrentFloor, FloorReady},
    particles::{EmitterPreset, ParticleEmitter, spawn_effect},
    polish::ScreenShake,
    state::RunStats,
};
use crate::{
    AppSystems, PausableSystems,
    audio::{SoundLibrary, sound_effect},
    screens::Screen,
};

pub(super) fn plugin(app: &mut App) {
    app.register_type::<Player>();
    app.init_resource::<PlayerInput>();
    app.add_message::<DamagePlayer>();
    app.add_message::<PlayerDied>();

    app.add_systems(
        Update,
        record_player_input
            .in_set(AppSystems::RecordInput)
            .in_set(PausableSystems)
            .run_if(in_state(Screen::Gameplay)),
    );
    app.add_systems(
        Update,
        place_player
            .in_set(GameSystems::Intent)
            .run_if(in_state(Screen::Gameplay)),
    );
    app.add_systems(
        Update,
        (move_player, steer_dash_trail)
            .chain()
            .in_set(GameSystems::Movement)
            .in_set(PausableSystems)
            .run_if(in_state(Screen::Gameplay)),
    );
    app.add_systems(
        Update,
        apply_player_damage
            .in_set(GameSystems::Effects)
            .in_set(PausableSystems)
            .run_if(in_state(Screen::Gameplay)),
    );
    app.add_systems(
        Update,
        (blink_when_invulnerable, draw_aim)
            .in_set(GameSystems::Ui)
            .run_if(in_state(Screen::Gameplay)),
    );
    app.add_systems(OnEnter(Screen::Gameplay), reset_player_input);
}

pub const WALK_SPEED: f32 = 100.0;
pub const DASH_SPEED: f32 = 1000.0;
pub const DASH_DURATION: f32 = 0.1;
pub const DASH_COOLDOWN: f32 = 1.0;
pub const MAX_HEALTH: f32 = 100.0;
pub const PLAYER_SIZE: f32 = 16.0;
/// Grace period after every hit.
const INVULNERABILITY: f32 = 0.5;

const PLAYER_COLOR: Color = Color::srgb(0.85, 0.9, 1.0);

#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct Player {
    pub health: f32,
    pub max_health: f32,
    /// Unit vector from the player towards the cursor.
    pub aim: Vec2,
    invulnerable_for: f32,
    dash_left: f32,
    dash_cooldown: f32,
    dash_direction: Vec2,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            health: MAX_HEALTH,
            max_health: MAX_HEALTH,
            aim: Vec2::X,
            invulnerable_for: 0.0,
            dash_left: 0.0,
            dash_cooldown: 0.0,
            dash_direction: Vec2::ZERO,
        }
    }
}

impl Player {
    pub fn tick(&mut self, dt: f32) {
        self.invulnerable_for = (self.invulnerable_for - dt).max(0.0);
        self.dash_left = (self.dash_left - dt).max(0.0);
        self.dash_cooldown = (self.dash_cooldown - dt).max(0.0);
    }

    pub fn is_dashing(&self) -> bool {
        self.dash_left > 0.0
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable_for > 0.0 || self.is_dashing()
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    /// 0 right after a dash, 1 when the next one is ready.
    pub fn dash_charge(&self) -> f32 {
        1.0 - self.dash_cooldown / DASH_COOLDOWN
    }

    pub fn try_dash(&mut self, direction: Vec2) -> bool {
        if self.dash_cooldown > 0.0 || direction == Vec2::ZERO {
            return false;
        }
        self.dash_direction = direction.normalize();
        self.dash_left = DASH_DURATION;
        self.dash_cooldown = DASH_COOLDOWN;
        true
    }

    /// Velocity for this frame given the movement input.
    pub fn velocity(&self, movement: Vec2) -> Vec2 {
        if self.is_dashing() {
            self.dash_direction * DASH_SPEED
        } else {
            movement.normalize_or_zero() * WALK_SPEED
        }
    }

    /// Returns whether the hit landed.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if self.is_invulnerable() || self.is_dead() {
            return false;
        }
        self.health = (self.health - amount).max(0.0);
        self.invulnerable_for = INVULNERABILITY;
        true
    }

    /// Returns the health actually restored.
    pub fn heal(&mut self, amount: f32) -> f32 {
        let before = self.health;
        self.health = (self.health + amount).min(self.max_health);
        self.health - before
    }
}

/// What the player asked for this frame.
#[derive(Resource, Debug, Default, Clone)]
pub struct PlayerInput {
    pub movement: Vec2,
    pub cursor_world: Option<Vec2>,
    pub fire_held: bool,
    pub fire_pressed: bool,
    pub dash: bool,
    pub interact: bool,
    pub reload: bool,
}

/// Hurt the player, subject to invulnerability.
#[derive(Message, Debug, Clone, Copy)]
pub struct DamagePlayer {
    pub amount: f32,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct PlayerDied;

#[derive(Component)]
struct DashTrail;

fn reset_player_input(mut input: ResMut<PlayerInput>) {
    *input = PlayerInput::default();
}

fn record_player_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    mouse: Res<ButtonInput<MouseButton>>,
    window: Query<&Window, With<PrimaryWindow>>,
    camera: Query<(&Camera, &GlobalTransform)>,
    mut input: ResMut<PlayerInput>,
) {
    let mut movement = Vec2::ZERO;
    if keyboard.pressed(KeyCode::KeyW) {
        movement.y += 1.0;
    }
    if keyboard.pressed(KeyCode::KeyS) {
        movement.y -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyA) {
        movement.x -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyD) {
        movement.x += 1.0;
    }

    let cursor_world = match (window.single(), camera.single()) {
        (Ok(window), Ok((camera, camera_transform))) => window
            .cursor_position()
            .and_then(|cursor| camera.viewport_to_world_2d(camera_transform, cursor).ok()),
        _ => None,
    };

    *input = PlayerInput {
        movement: movement.normalize_or_zero(),
        cursor_world,
        fire_held: mouse.pressed(MouseButton::Left),
        fire_pressed: mouse.just_pressed(MouseButton::Left),
        dash: keyboard.any_just_pressed([KeyCode::Space, KeyCode::ShiftLeft, KeyCode::ShiftRight]),
        interact: keyboard.just_pressed(KeyCode::KeyE),
        reload: keyboard.just_pressed(KeyCode::KeyR),
    };
}

/// Spawn the player on the first floor, move them to the start room after that.
fn place_player(
    mut commands: Commands,
    mut ready: MessageReader<FloorReady>,
    floor: Option<Res<CurrentFloor>>,
    mut world: ResMut<CollisionWorld>,
    mut players: Query<(&mut Transform, &ColliderHandle), With<Player>>,
) {
    if ready.read().last().is_none() {
        return;
    }
    let Some(floor) = floor else {
        return;
    };
    let spawn = floor.spawn_point();

    if let Ok((mut transform, handle)) = players.single_mut() {
        transform.translation = spawn.extend(transform.translation.z);
        if let Err(e) = world.set_hitbox(
            handle.0,
            Rect::from_center_size(spawn, Vec2::splat(PLAYER_SIZE)),
        ) {
            warn!("Player collider lost while changing floors: {}", e);
        }
        return;
    }

    let player = commands
        .spawn((
            Name::new("Player"),
            Player::default(),
            Sprite::from_color(PLAYER_COLOR, Vec2::splat(PLAYER_SIZE)),
            Transform::from_translation(spawn.extend(10.0)),
            HitboxSize(Vec2::splat(PLAYER_SIZE)),
            DespawnOnExit(Screen::Gameplay),
        ))
        .id();

    let collider = Collider::new(
        spawn,
        Vec2::splat(PLAYER_SIZE),
        CollisionLayers::PLAYER,
        CollisionLayers::ENVIRONMENT | CollisionLayers::ENEMY | CollisionLayers::ITEM,
    )
    .with_owner(ColliderOwner::Entity(player));
    match world.register(collider) {
        Ok(id) => {
            commands.entity(player).insert(ColliderHandle(id));
        }
        Err(e) => error!("Player spawned without a collider: {}", e),
    }

    commands.spawn((
        Name::new("Dash Trail"),
        DashTrail,
        ParticleEmitter::new(EmitterPreset::dash_trail(), spawn),
        DespawnOnExit(Screen::Gameplay),
    ));
    info!("Player spawned at {}", spawn);
}

fn move_player(
    time: Res<Time>,
    input: Res<PlayerInput>,
    world: Res<CollisionWorld>,
    mut commands: Commands,
    sounds: Option<Res<SoundLibrary>>,
    mut players: Query<(&mut Player, &mut Transform, &ColliderHandle)>,
) {
    let dt = time.delta_secs();
    for (mut player, mut transform, handle) in &mut players {
        player.tick(dt);

        let position = transform.translation.truncate();
        if let Some(cursor) = input.cursor_world {
            player.aim = (cursor - position).normalize_or(player.aim);
        }

        if input.dash {
            let direction = if input.movement == Vec2::ZERO {
                player.aim
            } else {
                input.movement
            };
            if player.try_dash(direction) {
                if let Some(sounds) = &sounds {
                    commands.spawn(sound_effect(sounds.dash.clone()));
                }
            }
        }

        // Dashing goes through enemies, never through walls.
        let mask = if player.is_dashing() {
            CollisionLayers::ENVIRONMENT
        } else {
            CollisionLayers::ENVIRONMENT | CollisionLayers::ENEMY
        };
        let delta = player.velocity(input.movement) * dt;
        let moved = world.slide(handle.0, position, Vec2::splat(PLAYER_SIZE), delta, mask);
        if moved != position {
            transform.translation = moved.extend(transform.translation.z);
        }
    }
}

fn steer_dash_trail(
    players: Query<(&Player, &Transform)>,
    mut trails: Query<&mut ParticleEmitter, With<DashTrail>>,
) {
    let Ok((player, transform)) = players.single() else {
        return;
    };
    for mut trail in &mut trails {
        trail.position = transform.translation.truncate();
        if player.is_dashing() {
            if !trail.active {
                trail.activate();
            }
        } else if trail.active {
            trail.deactivate();
        }
    }
}

fn apply_player_damage(
    mut commands: Commands,
    mut damage: MessageReader<DamagePlayer>,
    mut died: MessageWriter<PlayerDied>,
    mut stats: ResMut<RunStats>,
    mut shake: ResMut<ScreenShake>,
    sounds: Option<Res<SoundLibrary>>,
    mut players: Query<(&mut Player, &Transform)>,
) {
    let Ok((mut player, transform)) = players.single_mut() else {
        damage.clear();
        return;
    };
    for hit in damage.read() {
        if !player.take_damage(hit.amount) {
            continue;
        }
        stats.hits_taken += 1;
        shake.add_trauma(0.35);
        if let Some(sounds) = &sounds {
            commands.spawn(sound_effect(sounds.hit.clone()));
        }
        spawn_effect(
            &mut commands,
            EmitterPreset::sparks(),
            transform.translation.truncate(),
            Vec2::Y,
        );
        debug!("Player took {} damage, {} left", hit.amount, player.health);

        if player.is_dead() {
            died.write(PlayerDied);
            break;
        }
    }
}

fn blink_when_invulnerable(time: Res<Time>, mut players: Query<(&Player, &mut Sprite)>) {
    for (player, mut sprite) in &mut players {
        let alpha = if player.is_invulnerable() && !player.is_dashing() {
            if (time.elapsed_secs() * 20.0).sin() > 0.0 { 0.3 } else { 1.0 }
        } else {
            1.0
        };
        sprite.color = PLAYER_COLOR.with_alpha(alpha);
    }
}

fn draw_aim(mut gizmos: Gizmos, players: Query<(&Player, &Transform)>) {
    for (player, transform) in &players {
        let origin = transform.translation.truncate();
        gizmos.line_2d(
            origin + player.aim * 12.0,
            origin + player.aim * 22.0,
            Color::srgba(1.0, 1.0, 1.0, 0.6),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_grants_invulnerability() {
        let mut player = Player::default();
        assert!(player.take_damage(30.0));
        assert_eq!(player.health, 70.0);
        assert!(!player.take_damage(30.0));
        assert_eq!(player.health, 70.0);

        player.tick(INVULNERABILITY);
        assert!(player.take_damage(30.0));
        assert_eq!(player.health, 40.0);
    }

    #[test]
    fn test_dash_locks_direction_and_grants_invulnerability() {
        let mut player = Player::default();
        assert!(player.try_dash(Vec2::new(0.0, 2.0)));
        assert!(player.is_dashing());
        assert!(player.is_invulnerable());
        assert_eq!(player.velocity(Vec2::X), Vec2::Y * DASH_SPEED);
        assert!(!player.take_damage(10.0));

        // Cooldown outlasts the dash itself.
        player.tick(DASH_DURATION);
        assert!(!player.is_dashing());
        assert_eq!(player.velocity(Vec2::X), Vec2::X * WALK_SPEED);
        assert!(!player.try_dash(Vec2::X));

        player.tick(DASH_COOLDOWN);
        assert_eq!(player.dash_charge(), 1.0);
        assert!(player.try_dash(Vec2::X));
    }

    #[test]
    fn test_zero_direction_does_not_dash() {
        let mut player = Player::default();
        assert!(!player.try_dash(Vec2::ZERO));
        assert_eq!(player.dash_charge(), 1.0);
    }

    #[test]
    fn test_heal_clamps_to_max() {
        let mut player = Player::default();
        player.take_damage(10.0);
        assert_eq!(player.heal(50.0), 10.0);
        assert_eq!(player.health, MAX_HEALTH);
    }

    #[test]
    fn test_death_at_zero() {
        let mut player = Player::default();
        assert!(player.take_damage(250.0));
        assert!(player.is_dead());
        assert_eq!(player.health, 0.0);
        player.tick(1.0);
        assert!(!player.take_damage(1.0));
    }
}
