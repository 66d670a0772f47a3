//! The current floor: generation requests, tiles, wall colliders and room tracking.

mod generation;
mod minimap;

use std::collections::HashSet;

use bevy::prelude::*;

use super::{
    FloorEntity, GameSystems,
    collision::{Collider, ColliderHandle, ColliderOwner, CollisionLayers, CollisionWorld},
    particles::ParticleEmitter,
    player::Player,
};
use crate::{PausableSystems, screens::Screen};

pub use generation::{
    CHUNK_TILES, ChunkKind, FloorLayout, MAP_CHUNKS, TILE_SIZE, TileRect, generate_floor,
};

pub(super) fn plugin(app: &mut App) {
    app.add_message::<FloorRequested>();
    app.add_message::<FloorReady>();
    app.add_message::<RoomEntered>();

    app.add_plugins(minimap::plugin);

    app.add_systems(
        Update,
        build_floor
            .before(GameSystems::Intent)
            .run_if(in_state(Screen::Gameplay)),
    );
    app.add_systems(
        Update,
        track_player_chunk
            .in_set(GameSystems::Intent)
            .in_set(PausableSystems)
            .run_if(in_state(Screen::Gameplay).and(resource_exists::<CurrentFloor>)),
    );
    app.add_systems(OnExit(Screen::Gameplay), remove_current_floor);
}

/// Ask for the floor to be torn down and rebuilt from `seed`.
#[derive(Message, Debug, Clone, Copy)]
pub struct FloorRequested {
    pub stage: u32,
    pub seed: u64,
}

/// Written once a requested floor exists.
#[derive(Message, Debug, Clone, Copy)]
pub struct FloorReady {
    pub stage: u32,
}

/// The player walked into a chunk for the first time this floor.
#[derive(Message, Debug, Clone, Copy)]
pub struct RoomEntered {
    pub chunk: IVec2,
    pub kind: ChunkKind,
}

#[derive(Resource, Debug)]
pub struct CurrentFloor {
    pub layout: FloorLayout,
    pub stage: u32,
    pub visited: HashSet<IVec2>,
    pub player_chunk: Option<IVec2>,
}

impl CurrentFloor {
    pub fn spawn_point(&self) -> Vec2 {
        FloorLayout::chunk_center_world(self.layout.start)
    }

    pub fn exit_discovered(&self) -> bool {
        self.visited.contains(&self.layout.end)
    }
}

const FLOOR_COLOR: Color = Color::srgb(0.11, 0.11, 0.14);
const START_FLOOR_COLOR: Color = Color::srgb(0.10, 0.14, 0.16);
const END_FLOOR_COLOR: Color = Color::srgb(0.16, 0.12, 0.10);
const WALL_COLOR: Color = Color::srgb(0.33, 0.35, 0.43);

fn build_floor(
    mut commands: Commands,
    mut requests: MessageReader<FloorRequested>,
    mut ready: MessageWriter<FloorReady>,
    mut world: ResMut<CollisionWorld>,
    mut old_floor: Query<
        (Entity, Option<&ColliderHandle>, Option<&mut ParticleEmitter>),
        With<FloorEntity>,
    >,
) {
    let Some(&request) = requests.read().last() else {
        return;
    };

    for (entity, handle, emitter) in &mut old_floor {
        if let Some(handle) = handle {
            world.reset(handle.0);
        }
        if let Some(mut emitter) = emitter {
            emitter.release_colliders(&mut world);
        }
        commands.entity(entity).despawn();
    }

    let layout = generate_floor(request.seed);
    info!(
        "Floor {} generated from seed {}: {} rooms, exit at {}",
        request.stage,
        request.seed,
        layout.room_count(),
        layout.end
    );

    for rect in layout.floor_rects() {
        let area = rect.to_world();
        let color = match FloorLayout::chunk_at_world(area.center()).and_then(|c| layout.chunk(c)) {
            Some(chunk) if chunk.kind == ChunkKind::Start => START_FLOOR_COLOR,
            Some(chunk) if chunk.kind == ChunkKind::End => END_FLOOR_COLOR,
            _ => FLOOR_COLOR,
        };
        commands.spawn((
            Name::new("Floor"),
            FloorEntity,
            Sprite::from_color(color, area.size()),
            Transform::from_translation(area.center().extend(0.0)),
            DespawnOnExit(Screen::Gameplay),
        ));
    }

    let walls = layout.wall_rects();
    for rect in &walls {
        let area = rect.to_world();
        let entity = commands
            .spawn((
                Name::new("Wall"),
                FloorEntity,
                Sprite::from_color(WALL_COLOR, area.size()),
                Transform::from_translation(area.center().extend(1.0)),
                DespawnOnExit(Screen::Gameplay),
            ))
            .id();

        let collider = Collider {
            hitbox: area,
            layer: CollisionLayers::ENVIRONMENT,
            collides_with: CollisionLayers::NONE,
            owner: ColliderOwner::Entity(entity),
        };
        match world.register(collider) {
            Ok(id) => {
                commands.entity(entity).insert(ColliderHandle(id));
            }
            Err(e) => warn!("Wall at {:?} has no collider: {}", rect.min, e),
        }
    }
    debug!("Registered {} wall colliders", walls.len());

    commands.insert_resource(CurrentFloor {
        layout,
        stage: request.stage,
        visited: HashSet::new(),
        player_chunk: None,
    });
    ready.write(FloorReady {
        stage: request.stage,
    });
}

fn track_player_chunk(
    mut floor: ResMut<CurrentFloor>,
    player: Query<&Transform, With<Player>>,
    mut entered: MessageWriter<RoomEntered>,
) {
    let Ok(transform) = player.single() else {
        return;
    };
    let chunk = FloorLayout::chunk_at_world(transform.translation.truncate());
    if chunk == floor.player_chunk {
        return;
    }
    floor.player_chunk = chunk;

    let Some(chunk) = chunk else {
        return;
    };
    let Some(kind) = floor.layout.chunk(chunk).map(|c| c.kind) else {
        return;
    };
    if kind != ChunkKind::Empty && floor.visited.insert(chunk) {
        debug!("Entered {:?} room at {}", kind, chunk);
        entered.write(RoomEntered { chunk, kind });
    }
}

fn remove_current_floor(mut commands: Commands) {
    commands.remove_resource::<CurrentFloor>();
}
