//! Firearms: the arsenal table, trigger timing, magazines and bullet impacts.
//!
//! A gun owns four emitters. Bullets are particles of the bullet emitter and
//! carry `PLAYER_PROJECTILE` colliders; every frame those colliders are
//! checked and the ones touching a wall or an enemy die in a burst of
//! fragments.

use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::{
    GameSystems,
    collision::{CollisionHits, CollisionLayers, CollisionWorld},
    enemy::DamageEnemy,
    particles::{EmitterPreset, ParticleEmitter},
    player::{DamagePlayer, Player, PlayerInput},
    polish::ScreenShake,
    state::RunStats,
};
use crate::{
    PausableSystems,
    audio::{SoundLibrary, sound_effect},
    screens::Screen,
};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(
        Update,
        equip_new_players
            .in_set(GameSystems::Intent)
            .run_if(in_state(Screen::Gameplay)),
    );
    app.add_systems(
        Update,
        (operate_gun, resolve_bullets)
            .chain()
            .in_set(GameSystems::Combat)
            .in_set(PausableSystems)
            .run_if(in_state(Screen::Gameplay)),
    );
}

/// Every run starts with this.
pub const STARTING_GUN: GunKind = GunKind::Glock;

/// Distance from the shooter's center to where bullets appear.
const MUZZLE_OFFSET: f32 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FireMode {
    /// One shot per click.
    Semi,
    /// Fires while the trigger is held.
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CasingKind {
    Pistol,
    Rifle,
    Shotgun,
}

impl CasingKind {
    pub fn preset(self) -> EmitterPreset {
        match self {
            Self::Pistol => EmitterPreset::casing_pistol(),
            Self::Rifle => EmitterPreset::casing_rifle(),
            Self::Shotgun => EmitterPreset::casing_shotgun(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GunStats {
    pub name: String,
    /// Rounds per minute.
    pub fire_rate: f32,
    pub fire_mode: FireMode,
    pub spread_degrees: f32,
    pub damage: f32,
    pub bullet_lifetime: f32,
    pub bullet_speed: f32,
    pub bullets_per_shot: u32,
    pub magazine: u32,
    pub reload_time: f32,
    pub casing: CasingKind,
}

impl GunStats {
    pub fn cooldown_secs(&self) -> f32 {
        60.0 / self.fire_rate
    }

    pub fn bullet_preset(&self) -> EmitterPreset {
        EmitterPreset::bullet(
            self.bullet_speed,
            self.bullet_lifetime,
            self.spread_degrees,
            self.bullets_per_shot,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Reflect)]
pub enum GunKind {
    Glock,
    Kriss,
    M4a1,
    ScarH,
    Beretta,
}

impl GunKind {
    pub const ALL: [Self; 5] = [
        Self::Glock,
        Self::Kriss,
        Self::M4a1,
        Self::ScarH,
        Self::Beretta,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Glock => "Glock 17",
            Self::Kriss => "KRISS Vector",
            Self::M4a1 => "M4A1 URG-I",
            Self::ScarH => "FN SCAR-H",
            Self::Beretta => "Beretta 1301 Tactical",
        }
    }

    pub fn stats(self) -> GunStats {
        let (fire_rate, fire_mode, spread_degrees, damage, bullet_lifetime) = match self {
            Self::Glock => (400.0, FireMode::Semi, 4.0, 20.0, 1.0),
            Self::Kriss => (1200.0, FireMode::Auto, 8.0, 12.0, 0.8),
            Self::M4a1 => (800.0, FireMode::Auto, 3.0, 22.0, 1.2),
            Self::ScarH => (550.0, FireMode::Auto, 2.0, 40.0, 1.5),
            Self::Beretta => (120.0, FireMode::Semi, 30.0, 14.0, 0.4),
        };
        let (bullet_speed, bullets_per_shot, magazine, reload_time, casing) = match self {
            Self::Glock => (600.0, 1, 17, 1.2, CasingKind::Pistol),
            Self::Kriss => (550.0, 1, 33, 1.6, CasingKind::Pistol),
            Self::M4a1 => (700.0, 1, 30, 2.0, CasingKind::Rifle),
            Self::ScarH => (750.0, 1, 20, 2.2, CasingKind::Rifle),
            Self::Beretta => (500.0, 8, 7, 2.5, CasingKind::Shotgun),
        };
        GunStats {
            name: self.name().to_string(),
            fire_rate,
            fire_mode,
            spread_degrees,
            damage,
            bullet_lifetime,
            bullet_speed,
            bullets_per_shot,
            magazine,
            reload_time,
            casing,
        }
    }
}

/// The gun the player is holding.
#[derive(Component, Debug, Clone)]
pub struct Gun {
    pub kind: GunKind,
    pub stats: GunStats,
    pub ammo_in_mag: u32,
    cooldown: Timer,
    reloading: Option<Timer>,
}

impl Gun {
    pub fn new(kind: GunKind) -> Self {
        let stats = kind.stats();
        let mut cooldown = Timer::from_seconds(stats.cooldown_secs(), TimerMode::Once);
        cooldown.tick(cooldown.duration());
        Self {
            kind,
            ammo_in_mag: stats.magazine,
            stats,
            cooldown,
            reloading: None,
        }
    }

    /// Returns true on the frame a reload completes.
    pub fn tick(&mut self, delta: Duration) -> bool {
        self.cooldown.tick(delta);
        let Some(reload) = &mut self.reloading else {
            return false;
        };
        if !reload.tick(delta).is_finished() {
            return false;
        }
        self.reloading = None;
        self.ammo_in_mag = self.stats.magazine;
        true
    }

    pub fn is_reloading(&self) -> bool {
        self.reloading.is_some()
    }

    /// 0..1 while reloading.
    pub fn reload_progress(&self) -> Option<f32> {
        self.reloading.as_ref().map(Timer::fraction)
    }

    pub fn start_reload(&mut self) -> bool {
        if self.is_reloading() || self.ammo_in_mag == self.stats.magazine {
            return false;
        }
        self.reloading = Some(Timer::from_seconds(
            self.stats.reload_time,
            TimerMode::Once,
        ));
        true
    }

    /// Consume a round if the trigger, cooldown and magazine allow it.
    pub fn try_fire(&mut self, trigger_held: bool, trigger_pressed: bool) -> bool {
        let trigger = match self.stats.fire_mode {
            FireMode::Semi => trigger_pressed,
            FireMode::Auto => trigger_held,
        };
        if !trigger || self.is_reloading() || !self.cooldown.is_finished() {
            return false;
        }
        if self.ammo_in_mag == 0 {
            self.start_reload();
            return false;
        }

        self.ammo_in_mag -= 1;
        self.cooldown.reset();
        if self.ammo_in_mag == 0 {
            self.start_reload();
        }
        true
    }
}

/// Emitters a gun fires through.
#[derive(Component, Debug, Clone, Copy)]
pub struct GunEmitters {
    pub bullets: Entity,
    pub fragments: Entity,
    pub muzzle: Entity,
    pub casing: Entity,
}

/// Marks an emitter whose particles are bullets.
#[derive(Component, Debug, Clone, Copy)]
pub struct Projectile {
    pub damage: f32,
    /// Burst where a bullet dies, if any.
    pub fragments: Option<Entity>,
}

fn equip_new_players(
    mut commands: Commands,
    players: Query<(Entity, &Transform), Added<Player>>,
) {
    for (player, transform) in &players {
        let position = transform.translation.truncate();
        let gun = Gun::new(STARTING_GUN);

        let fragments = commands
            .spawn((
                Name::new("Bullet Fragments"),
                ParticleEmitter::new(EmitterPreset::bullet_fragments(), position),
                DespawnOnExit(Screen::Gameplay),
            ))
            .id();
        let bullets = commands
            .spawn((
                Name::new("Player Bullets"),
                ParticleEmitter::new(gun.stats.bullet_preset(), position),
                Projectile {
                    damage: gun.stats.damage,
                    fragments: Some(fragments),
                },
                DespawnOnExit(Screen::Gameplay),
            ))
            .id();
        let muzzle = commands
            .spawn((
                Name::new("Muzzle Flash"),
                ParticleEmitter::new(EmitterPreset::muzzle_flash(), position),
                DespawnOnExit(Screen::Gameplay),
            ))
            .id();
        let casing = commands
            .spawn((
                Name::new("Casings"),
                ParticleEmitter::new(gun.stats.casing.preset(), position),
                DespawnOnExit(Screen::Gameplay),
            ))
            .id();

        commands.entity(player).insert((
            gun,
            GunEmitters {
                bullets,
                fragments,
                muzzle,
                casing,
            },
        ));
    }
}

/// Copy `preset` into an emitter while keeping its pool size.
fn restyle(emitter: &mut ParticleEmitter, preset: EmitterPreset) {
    let max_particles = emitter.preset().max_particles;
    *emitter.preset_mut() = EmitterPreset {
        max_particles,
        ..preset
    };
}

fn operate_gun(
    mut commands: Commands,
    time: Res<Time>,
    input: Res<PlayerInput>,
    mut world: ResMut<CollisionWorld>,
    mut stats: ResMut<RunStats>,
    mut shake: ResMut<ScreenShake>,
    sounds: Option<Res<SoundLibrary>>,
    mut guns: Query<(&Player, &Transform, &mut Gun, &GunEmitters)>,
    mut projectiles: Query<&mut Projectile>,
    mut emitters: Query<&mut ParticleEmitter>,
) {
    for (player, transform, mut gun, gun_emitters) in &mut guns {
        if gun.tick(time.delta()) {
            debug!("{} reloaded", gun.stats.name);
        }
        if input.reload && gun.start_reload() {
            debug!("Reloading {}", gun.stats.name);
        }

        if !gun.try_fire(input.fire_held, input.fire_pressed) {
            continue;
        }

        let aim = player.aim;
        let muzzle = transform.translation.truncate() + aim * MUZZLE_OFFSET;
        let owner = gun_emitters.bullets;

        if let Ok(mut projectile) = projectiles.get_mut(owner) {
            projectile.damage = gun.stats.damage;
        }
        if let Ok(mut bullets) = emitters.get_mut(owner) {
            restyle(&mut bullets, gun.stats.bullet_preset());
            bullets.burst_at(muzzle, aim, owner, &mut world);
        }
        if let Ok(mut flash) = emitters.get_mut(gun_emitters.muzzle) {
            flash.position = muzzle;
            flash.direction = aim;
            flash.activate_once();
        }
        if let Ok(mut casing) = emitters.get_mut(gun_emitters.casing) {
            restyle(&mut casing, gun.stats.casing.preset());
            casing.position = transform.translation.truncate();
            casing.direction = aim.perp();
            casing.activate_once();
        }

        stats.ammo_spent += 1;
        shake.add_trauma(0.05 + 0.03 * gun.stats.bullets_per_shot as f32);
        if let Some(sounds) = &sounds {
            commands.spawn(sound_effect(sounds.shot.clone()));
        }
    }
}

struct Impact {
    index: usize,
    position: Vec2,
    direction: Vec2,
    target: Option<(CollisionLayers, Entity)>,
}

/// Kill every bullet touching something it collides with and deal its damage.
fn resolve_bullets(
    mut world: ResMut<CollisionWorld>,
    mut hits: Local<CollisionHits>,
    mut impacts: Local<Vec<Impact>>,
    projectiles: Query<(Entity, &Projectile)>,
    mut emitters: Query<&mut ParticleEmitter>,
    mut damage_enemy: MessageWriter<DamageEnemy>,
    mut damage_player: MessageWriter<DamagePlayer>,
) {
    for (entity, projectile) in &projectiles {
        let Ok(mut bullets) = emitters.get_mut(entity) else {
            continue;
        };

        impacts.clear();
        for (index, particle) in bullets.iter_alive() {
            let Some(id) = particle.collider else {
                continue;
            };
            if !world.check(id, &mut hits) {
                continue;
            }
            let target = hits
                .iter()
                .filter(|hit| {
                    hit.layer()
                        .intersects(CollisionLayers::ENEMY | CollisionLayers::PLAYER)
                })
                .find_map(|hit| hit.owner().entity().map(|owner| (hit.layer(), owner)));
            impacts.push(Impact {
                index,
                position: particle.position,
                direction: particle.direction,
                target,
            });
        }

        for impact in impacts.iter() {
            bullets.kill_particle(impact.index, &mut world);
            match impact.target {
                Some((layer, enemy)) if layer.contains(CollisionLayers::ENEMY) => {
                    damage_enemy.write(DamageEnemy {
                        enemy,
                        amount: projectile.damage,
                    });
                }
                Some((layer, _)) if layer.contains(CollisionLayers::PLAYER) => {
                    damage_player.write(DamagePlayer {
                        amount: projectile.damage,
                    });
                }
                _ => {}
            }
        }

        let Some(fragments_entity) = projectile.fragments else {
            continue;
        };
        let Ok(mut fragments) = emitters.get_mut(fragments_entity) else {
            continue;
        };
        for impact in impacts.iter() {
            fragments.burst_at(
                impact.position,
                -impact.direction,
                fragments_entity,
                &mut world,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elapse(gun: &mut Gun, secs: f32) -> bool {
        gun.tick(Duration::from_secs_f32(secs))
    }

    #[test]
    fn test_arsenal_matches_table() {
        let scar = GunKind::ScarH.stats();
        assert_eq!(scar.damage, 40.0);
        assert_eq!(scar.magazine, 20);
        assert!((scar.cooldown_secs() - 60.0 / 550.0).abs() < 1e-6);

        let shotgun = GunKind::Beretta.stats();
        assert_eq!(shotgun.bullets_per_shot, 8);
        assert_eq!(shotgun.fire_mode, FireMode::Semi);
        assert_eq!(shotgun.bullet_preset().burst_count, 8);

        let names: Vec<_> = GunKind::ALL.iter().map(|kind| kind.name()).collect();
        assert_eq!(names[1], "KRISS Vector");
    }

    #[test]
    fn test_semi_needs_a_fresh_press() {
        let mut gun = Gun::new(GunKind::Glock);
        assert!(gun.try_fire(true, true));
        elapse(&mut gun, 1.0);
        assert!(!gun.try_fire(true, false));
        assert!(gun.try_fire(true, true));
    }

    #[test]
    fn test_auto_fires_while_held_after_cooldown() {
        let mut gun = Gun::new(GunKind::M4a1);
        assert!(gun.try_fire(true, false));
        assert!(!gun.try_fire(true, false));
        let cooldown = gun.stats.cooldown_secs();
        elapse(&mut gun, cooldown);
        assert!(gun.try_fire(true, false));
        assert_eq!(gun.ammo_in_mag, 28);
    }

    #[test]
    fn test_empty_magazine_reloads_itself() {
        let mut gun = Gun::new(GunKind::Beretta);
        for _ in 0..7 {
            assert!(gun.try_fire(false, true));
            elapse(&mut gun, 0.5);
        }
        assert_eq!(gun.ammo_in_mag, 0);
        assert!(gun.is_reloading());
        assert!(!gun.try_fire(false, true));

        assert!(elapse(&mut gun, 2.5));
        assert_eq!(gun.ammo_in_mag, 7);
        assert!(gun.try_fire(false, true));
    }

    #[test]
    fn test_manual_reload_needs_missing_rounds() {
        let mut gun = Gun::new(GunKind::Kriss);
        assert!(!gun.start_reload());
        gun.try_fire(true, false);
        assert!(gun.start_reload());
        assert!(!gun.start_reload());
        assert_eq!(gun.reload_progress(), Some(0.0));
    }

    #[test]
    fn test_gun_stats_survive_json() {
        let json = serde_json::to_string(&GunKind::Kriss.stats()).unwrap();
        let stats: GunStats = serde_json::from_str(&json).unwrap();
        assert_eq!(stats.magazine, 33);
        assert_eq!(stats.fire_mode, FireMode::Auto);
    }

    #[test]
    fn test_bullet_hitting_a_wall_bursts_fragments_owned_by_their_emitter() {
        use crate::game::collision::{Collider, ColliderOwner};

        let mut app = App::new();
        app.init_resource::<CollisionWorld>();
        app.add_message::<DamageEnemy>();
        app.add_message::<DamagePlayer>();
        app.add_systems(Update, resolve_bullets);

        let position = Vec2::new(50.0, 0.0);
        app.world_mut()
            .resource_mut::<CollisionWorld>()
            .register(Collider::new(
                position,
                Vec2::splat(20.0),
                CollisionLayers::ENVIRONMENT,
                CollisionLayers::NONE,
            ))
            .unwrap();

        // A preset with a collider, so the fragments' owners show up in the registry.
        let fragments = app.world_mut().spawn_empty().id();
        let fragment_emitter =
            ParticleEmitter::new(EmitterPreset::bullet(100.0, 1.0, 0.0, 1), position);
        app.world_mut().entity_mut(fragments).insert(fragment_emitter);

        let bullets = app.world_mut().spawn_empty().id();
        let mut bullet_emitter =
            ParticleEmitter::new(EmitterPreset::bullet(400.0, 1.0, 0.0, 1), position);
        let mut registry = app.world_mut().resource_mut::<CollisionWorld>();
        bullet_emitter.emit(bullets, &mut registry);
        app.world_mut().entity_mut(bullets).insert((
            bullet_emitter,
            Projectile {
                damage: 10.0,
                fragments: Some(fragments),
            },
        ));

        app.update();

        let world = app.world();
        assert_eq!(world.get::<ParticleEmitter>(bullets).unwrap().alive_count(), 0);
        assert!(world.get::<ParticleEmitter>(fragments).unwrap().alive_count() > 0);

        let owners: Vec<Entity> = world
            .resource::<CollisionWorld>()
            .iter()
            .filter_map(|collider| match collider.owner {
                ColliderOwner::Particle { emitter, .. } => Some(emitter),
                _ => None,
            })
            .collect();
        assert!(!owners.is_empty());
        assert!(owners.iter().all(|owner| *owner == fragments));
    }
}
