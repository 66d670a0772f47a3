//! Chunk overview in the top-right corner.

use bevy::prelude::*;

use super::{ChunkKind, CurrentFloor, MAP_CHUNKS};
use crate::{game::hud::HudElement, screens::Screen};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(OnEnter(Screen::Gameplay), spawn_minimap);
    app.add_systems(
        Update,
        paint_minimap.run_if(in_state(Screen::Gameplay).and(resource_exists::<CurrentFloor>)),
    );
}

const CELL_SIZE: f32 = 14.0;

#[derive(Component, Debug, Clone, Copy)]
struct MinimapCell(IVec2);

fn spawn_minimap(mut commands: Commands) {
    let root = commands
        .spawn((
            Name::new("Minimap"),
            HudElement,
            Node {
                position_type: PositionType::Absolute,
                top: Val::Px(12.0),
                right: Val::Px(12.0),
                display: Display::Grid,
                grid_template_columns: RepeatedGridTrack::px(MAP_CHUNKS as u16, CELL_SIZE),
                grid_template_rows: RepeatedGridTrack::px(MAP_CHUNKS as u16, CELL_SIZE),
                row_gap: Val::Px(2.0),
                column_gap: Val::Px(2.0),
                padding: UiRect::all(Val::Px(4.0)),
                ..default()
            },
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.5)),
            DespawnOnExit(Screen::Gameplay),
        ))
        .id();

    // Grid rows fill top-down, chunk rows count upward.
    for y in (0..MAP_CHUNKS).rev() {
        for x in 0..MAP_CHUNKS {
            let cell = commands
                .spawn((
                    Name::new("Minimap Cell"),
                    MinimapCell(IVec2::new(x, y)),
                    Node::default(),
                    BackgroundColor(Color::NONE),
                ))
                .id();
            commands.entity(root).add_child(cell);
        }
    }
}

fn cell_color(floor: &CurrentFloor, chunk: IVec2) -> Color {
    let Some(info) = floor.layout.chunk(chunk) else {
        return Color::NONE;
    };
    if floor.player_chunk == Some(chunk) {
        return Color::srgb(0.4, 0.85, 1.0);
    }
    if !floor.visited.contains(&chunk) {
        // Unvisited rooms next to a visited one show up dimly.
        let adjacent = [IVec2::X, IVec2::NEG_X, IVec2::Y, IVec2::NEG_Y]
            .into_iter()
            .any(|offset| floor.visited.contains(&(chunk + offset)));
        return if info.kind != ChunkKind::Empty && adjacent {
            Color::srgba(0.5, 0.5, 0.55, 0.35)
        } else {
            Color::NONE
        };
    }
    match info.kind {
        ChunkKind::End => Color::srgb(0.95, 0.55, 0.2),
        ChunkKind::Start => Color::srgb(0.55, 0.75, 0.6),
        _ => Color::srgb(0.6, 0.6, 0.65),
    }
}

fn paint_minimap(floor: Res<CurrentFloor>, mut cells: Query<(&MinimapCell, &mut BackgroundColor)>) {
    for (cell, mut background) in &mut cells {
        background.set_if_neq(BackgroundColor(cell_color(&floor, cell.0)));
    }
}
