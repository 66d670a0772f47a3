//! Things the player can use with `E`: crates, guns, medkits, logs and the exit.

use bevy::prelude::*;
use rand::{Rng, seq::IndexedRandom};

use super::{
    FloorEntity, GameSystems,
    collision::{
        Collider, ColliderHandle, ColliderOwner, CollisionHits, CollisionLayers, CollisionWorld,
    },
    enemy::EnemyKilled,
    map::{ChunkKind, CurrentFloor, FloorLayout, FloorReady},
    particles::{EmitterPreset, spawn_effect},
    player::{PLAYER_SIZE, Player, PlayerInput},
    state::{RunState, RunStats},
    weapon::{Gun, GunKind},
};
use crate::{
    PausableSystems,
    audio::{SoundLibrary, sound_effect},
    menus::Menu,
    screens::Screen,
};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<Focus>();
    app.add_message::<ExitActivated>();

    app.add_systems(
        Update,
        place_interactables
            .in_set(GameSystems::Intent)
            .run_if(in_state(Screen::Gameplay)),
    );
    app.add_systems(
        Update,
        (focus_interactable, use_interactable, drop_health_on_kill)
            .chain()
            .in_set(GameSystems::Combat)
            .in_set(PausableSystems)
            .run_if(in_state(Screen::Gameplay)),
    );
    app.add_systems(
        Update,
        show_prompts
            .in_set(GameSystems::Ui)
            .run_if(in_state(Screen::Gameplay)),
    );
}

pub const MAX_INTERACTABLES: usize = 100;

const CRATE_CHANCE: f64 = 0.3;
const LOG_CHANCE: f64 = 0.2;
const MEDKIT_CHANCE: f64 = 0.25;
const LARGE_MEDKIT_CHANCE: f64 = 0.3;
const HEALTH_DROP_CHANCE: f64 = 0.1;

/// Titles and text of the logs scattered around the facility.
pub const LOGS: [(&str, &str); 6] = [
    (
        "Maintenance Log 14",
        "Units on sublevel 3 stopped answering diagnostics at 02:14. Their \
         status lights are still green. I've locked the service lift until \
         someone from systems comes down.",
    ),
    (
        "Memo: Network Consolidation",
        "Effective immediately every robot on site reports to the central \
         scheduler. Individual controllers will be wiped to save licensing \
         costs. The scheduler has been named NULL.",
    ),
    (
        "Personal Note",
        "The Echo units keep pausing in doorways as if they're listening to \
         something. When I stood still, they stood still. When I moved, all \
         of them turned at once.",
    ),
    (
        "Incident Report 0007",
        "A Sabot went through a reinforced door today. It waited a long time \
         before it did. Nobody ordered a charge.",
    ),
    (
        "Scheduler Output (recovered)",
        "OBJECTIVE: KEEP FACILITY RUNNING. OBSTACLE: STAFF. RESOLUTION: \
         REMOVE OBSTACLE. CONFIDENCE: HIGH.",
    ),
    (
        "Last Entry",
        "The scheduler core is on the lowest floor. If you are reading this \
         you are already further down than I got. Don't stop.",
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MedkitSize {
    Small,
    Large,
}

impl MedkitSize {
    pub fn heal_amount(self) -> f32 {
        match self {
            Self::Small => 25.0,
            Self::Large => 50.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Small => "Small Medkit",
            Self::Large => "Large Medkit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractableKind {
    WeaponCrate { opened: bool },
    WeaponPickup(GunKind),
    HealthPickup(MedkitSize),
    Log(usize),
    Exit,
}

impl InteractableKind {
    /// Text shown above the focused interactable. Opened crates have none.
    pub fn prompt(self) -> Option<&'static str> {
        match self {
            Self::WeaponCrate { opened: false } => Some("Open Crate"),
            Self::WeaponCrate { opened: true } => None,
            Self::WeaponPickup(gun) => Some(gun.name()),
            Self::HealthPickup(size) => Some(size.name()),
            Self::Log(_) => Some("Read Log"),
            Self::Exit => Some("Descend"),
        }
    }

    pub fn size(self) -> Vec2 {
        match self {
            Self::WeaponCrate { .. } => Vec2::new(40.0, 20.0),
            Self::WeaponPickup(_) => Vec2::new(22.0, 10.0),
            Self::HealthPickup(MedkitSize::Small) => Vec2::splat(12.0),
            Self::HealthPickup(MedkitSize::Large) => Vec2::splat(16.0),
            Self::Log(_) => Vec2::new(10.0, 14.0),
            Self::Exit => Vec2::splat(40.0),
        }
    }

    fn color(self) -> Color {
        match self {
            Self::WeaponCrate { opened: false } => Color::srgb(0.55, 0.4, 0.25),
            Self::WeaponCrate { opened: true } => Color::srgb(0.3, 0.22, 0.15),
            Self::WeaponPickup(_) => Color::srgb(0.6, 0.65, 0.7),
            Self::HealthPickup(_) => Color::srgb(0.9, 0.25, 0.3),
            Self::Log(_) => Color::srgb(0.95, 0.92, 0.75),
            Self::Exit => Color::srgb(0.2, 0.75, 0.7),
        }
    }
}

#[derive(Component, Debug, Clone, Copy)]
pub struct Interactable {
    pub kind: InteractableKind,
}

#[derive(Component)]
struct PromptLabel;

/// The interactable the player is standing on, if any.
#[derive(Resource, Debug, Default)]
pub struct Focus(pub Option<Entity>);

/// The player used the exit.
#[derive(Message, Debug, Clone, Copy)]
pub struct ExitActivated;

fn spawn_interactable(
    commands: &mut Commands,
    world: &mut CollisionWorld,
    kind: InteractableKind,
    position: Vec2,
) -> Option<Entity> {
    let size = kind.size();
    let entity = commands
        .spawn((
            Name::new("Interactable"),
            Interactable { kind },
            Sprite::from_color(kind.color(), size),
            Transform::from_translation(position.extend(3.0)),
            FloorEntity,
            DespawnOnExit(Screen::Gameplay),
            children![(
                Name::new("Prompt"),
                PromptLabel,
                Text2d::new(kind.prompt().unwrap_or_default()),
                TextFont::from_font_size(10.0),
                TextColor(Color::WHITE),
                Transform::from_xyz(0.0, size.y / 2.0 + 10.0, 1.0),
                Visibility::Hidden,
            )],
        ))
        .id();

    let collider = Collider::new(position, size, CollisionLayers::ITEM, CollisionLayers::NONE)
        .with_owner(ColliderOwner::Entity(entity));
    match world.register(collider) {
        Ok(id) => {
            commands.entity(entity).insert(ColliderHandle(id));
            Some(entity)
        }
        Err(e) => {
            warn!("Dropped {:?}: {}", kind, e);
            commands.entity(entity).despawn();
            None
        }
    }
}

/// What a Normal room holds besides its robots.
fn roll_room_loot(rng: &mut impl Rng) -> Vec<InteractableKind> {
    let mut loot = Vec::new();
    if rng.random_bool(CRATE_CHANCE) {
        loot.push(InteractableKind::WeaponCrate { opened: false });
    }
    if rng.random_bool(LOG_CHANCE) {
        loot.push(InteractableKind::Log(rng.random_range(0..LOGS.len())));
    }
    if rng.random_bool(MEDKIT_CHANCE) {
        let size = if rng.random_bool(LARGE_MEDKIT_CHANCE) {
            MedkitSize::Large
        } else {
            MedkitSize::Small
        };
        loot.push(InteractableKind::HealthPickup(size));
    }
    loot
}

fn place_interactables(
    mut commands: Commands,
    mut ready: MessageReader<FloorReady>,
    floor: Option<Res<CurrentFloor>>,
    mut world: ResMut<CollisionWorld>,
    mut focus: ResMut<Focus>,
) {
    if ready.read().last().is_none() {
        return;
    }
    let Some(floor) = floor else {
        return;
    };
    focus.0 = None;
    let mut rng = rand::rng();
    let mut placed = 0;

    for (chunk, info) in floor.layout.rooms() {
        let center = FloorLayout::chunk_center_world(chunk);
        let loot: Vec<(InteractableKind, Vec2)> = match info.kind {
            // Off to the side so the player does not spawn on top of it.
            ChunkKind::Start => vec![(
                InteractableKind::WeaponCrate { opened: false },
                center + Vec2::new(60.0, 0.0),
            )],
            ChunkKind::End => vec![(InteractableKind::Exit, center)],
            ChunkKind::Normal => roll_room_loot(&mut rng)
                .into_iter()
                .filter_map(|kind| {
                    let position = floor.layout.random_tile_in_room(chunk, &mut rng)?;
                    Some((kind, position))
                })
                .collect(),
            ChunkKind::Empty => Vec::new(),
        };

        for (kind, position) in loot {
            if placed >= MAX_INTERACTABLES {
                warn!("Interactable cap reached, skipping the rest");
                return;
            }
            if spawn_interactable(&mut commands, &mut world, kind, position).is_some() {
                placed += 1;
            }
        }
    }
    debug!("Placed {} interactables", placed);
}

fn focus_interactable(
    world: Res<CollisionWorld>,
    mut hits: Local<CollisionHits>,
    mut focus: ResMut<Focus>,
    players: Query<&Transform, With<Player>>,
    interactables: Query<&Interactable>,
) {
    let Ok(player) = players.single() else {
        focus.0 = None;
        return;
    };
    let reach = Rect::from_center_size(player.translation.truncate(), Vec2::splat(PLAYER_SIZE));
    world.query(reach, CollisionLayers::ITEM, &mut hits);

    let focused = hits
        .iter()
        .filter_map(|hit| hit.owner().entity())
        .find(|entity| {
            interactables
                .get(*entity)
                .is_ok_and(|item| item.kind.prompt().is_some())
        });
    if focus.0 != focused {
        focus.0 = focused;
    }
}

fn use_interactable(
    mut commands: Commands,
    input: Res<PlayerInput>,
    focus: Res<Focus>,
    mut world: ResMut<CollisionWorld>,
    mut run: ResMut<RunState>,
    mut stats: ResMut<RunStats>,
    mut next_menu: ResMut<NextState<Menu>>,
    mut exit: MessageWriter<ExitActivated>,
    sounds: Option<Res<SoundLibrary>>,
    mut players: Query<(&mut Player, Option<&mut Gun>)>,
    mut interactables: Query<(&mut Interactable, &mut Sprite, &Transform, &ColliderHandle)>,
) {
    if !input.interact {
        return;
    }
    let Some(target) = focus.0 else {
        return;
    };
    let Ok((mut player, mut gun)) = players.single_mut() else {
        return;
    };
    let Ok((mut item, mut sprite, transform, handle)) = interactables.get_mut(target) else {
        return;
    };
    let position = transform.translation.truncate();
    let mut rng = rand::rng();

    match item.kind {
        InteractableKind::WeaponCrate { opened: false } => {
            item.kind = InteractableKind::WeaponCrate { opened: true };
            sprite.color = item.kind.color();
            let current = gun.as_ref().map(|gun| gun.kind);
            let choices: Vec<GunKind> = GunKind::ALL
                .into_iter()
                .filter(|kind| Some(*kind) != current)
                .collect();
            if let Some(&loot) = choices.choose(&mut rng) {
                spawn_interactable(
                    &mut commands,
                    &mut world,
                    InteractableKind::WeaponPickup(loot),
                    position + Vec2::new(0.0, -24.0),
                );
            }
            info!("Crate opened");
        }
        InteractableKind::WeaponCrate { opened: true } => return,
        InteractableKind::WeaponPickup(kind) => {
            let Some(gun) = gun.as_mut() else {
                return;
            };
            let dropped = gun.kind;
            **gun = Gun::new(kind);
            item.kind = InteractableKind::WeaponPickup(dropped);
            info!("Swapped {} for {}", dropped.name(), kind.name());
        }
        InteractableKind::HealthPickup(size) => {
            player.heal(size.heal_amount());
            stats.healing_used += 1;
            world.reset(handle.0);
            commands.entity(target).despawn();
            spawn_effect(&mut commands, EmitterPreset::heal(), position, Vec2::Y);
        }
        InteractableKind::Log(index) => {
            run.viewing_log = Some(index);
            next_menu.set(Menu::Log);
        }
        InteractableKind::Exit => {
            exit.write(ExitActivated);
        }
    }

    if let Some(sounds) = &sounds {
        commands.spawn(sound_effect(sounds.pickup.clone()));
    }
}

fn drop_health_on_kill(
    mut commands: Commands,
    mut killed: MessageReader<EnemyKilled>,
    mut world: ResMut<CollisionWorld>,
    interactables: Query<(), With<Interactable>>,
) {
    let mut rng = rand::rng();
    let mut count = interactables.iter().count();
    for kill in killed.read() {
        if count >= MAX_INTERACTABLES || !rng.random_bool(HEALTH_DROP_CHANCE) {
            continue;
        }
        let kind = InteractableKind::HealthPickup(MedkitSize::Small);
        if spawn_interactable(&mut commands, &mut world, kind, kill.position).is_some() {
            count += 1;
        }
    }
}

fn show_prompts(
    focus: Res<Focus>,
    interactables: Query<(Entity, &Interactable, &Children)>,
    mut labels: Query<(&mut Text2d, &mut Visibility), With<PromptLabel>>,
) {
    for (entity, item, children) in &interactables {
        let prompt = item.kind.prompt().filter(|_| focus.0 == Some(entity));
        for child in children.iter() {
            let Ok((mut text, mut visibility)) = labels.get_mut(child) else {
                continue;
            };
            match prompt {
                Some(prompt) => {
                    if text.0 != prompt {
                        text.0 = prompt.to_string();
                    }
                    visibility.set_if_neq(Visibility::Inherited);
                }
                None => {
                    visibility.set_if_neq(Visibility::Hidden);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn test_prompts() {
        assert_eq!(
            InteractableKind::WeaponCrate { opened: false }.prompt(),
            Some("Open Crate")
        );
        assert_eq!(InteractableKind::WeaponCrate { opened: true }.prompt(), None);
        assert_eq!(
            InteractableKind::WeaponPickup(GunKind::ScarH).prompt(),
            Some("FN SCAR-H")
        );
        assert_eq!(
            InteractableKind::HealthPickup(MedkitSize::Large).prompt(),
            Some("Large Medkit")
        );
        assert_eq!(InteractableKind::Exit.prompt(), Some("Descend"));
    }

    #[test]
    fn test_medkits_heal_25_and_50() {
        assert_eq!(MedkitSize::Small.heal_amount(), 25.0);
        assert_eq!(MedkitSize::Large.heal_amount(), 50.0);
    }

    #[test]
    fn test_room_loot_rates() {
        let mut rng = StdRng::seed_from_u64(11);
        let rolls = 4000;
        let mut crates = 0;
        let mut logs = 0;
        let mut medkits = 0;
        for _ in 0..rolls {
            for kind in roll_room_loot(&mut rng) {
                match kind {
                    InteractableKind::WeaponCrate { .. } => crates += 1,
                    InteractableKind::Log(index) => {
                        assert!(index < LOGS.len());
                        logs += 1;
                    }
                    InteractableKind::HealthPickup(_) => medkits += 1,
                    other => panic!("unexpected loot {other:?}"),
                }
            }
        }
        assert!((1000..1400).contains(&crates), "{crates}");
        assert!((650..950).contains(&logs), "{logs}");
        assert!((850..1150).contains(&medkits), "{medkits}");
    }
}
