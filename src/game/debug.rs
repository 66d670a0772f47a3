//! Debug visualization for the collider registry.
//!
//! Toggle with `F1` during gameplay.
//! Shows:
//! - Every active collider, colored by layer
//! - The chunk grid
//! - How full the registry is

use bevy::{color::palettes::css, input::common_conditions::input_just_pressed, prelude::*};

use super::{
    GameSystems,
    collision::{CollisionLayers, CollisionWorld},
    map::{CHUNK_TILES, MAP_CHUNKS, TILE_SIZE},
};
use crate::{LaunchOptions, screens::Screen};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<DebugColliders>();
    app.add_systems(Startup, apply_launch_options);

    app.add_systems(
        Update,
        toggle_debug.run_if(in_state(Screen::Gameplay).and(input_just_pressed(KeyCode::F1))),
    );
    app.add_systems(OnEnter(Screen::Gameplay), spawn_fill_label);
    app.add_systems(
        Update,
        (draw_colliders, draw_chunk_grid)
            .in_set(GameSystems::Ui)
            .run_if(in_state(Screen::Gameplay).and(debug_visible)),
    );
    app.add_systems(
        Update,
        update_fill_label
            .in_set(GameSystems::Ui)
            .run_if(in_state(Screen::Gameplay)),
    );
}

/// Whether the collider overlay is drawn.
#[derive(Resource, Default)]
pub struct DebugColliders(pub bool);

#[derive(Component)]
struct RegistryFillLabel;

fn debug_visible(debug: Res<DebugColliders>) -> bool {
    debug.0
}

fn apply_launch_options(options: Res<LaunchOptions>, mut debug: ResMut<DebugColliders>) {
    debug.0 = options.debug_colliders;
}

fn toggle_debug(mut debug: ResMut<DebugColliders>) {
    debug.0 = !debug.0;
    let state = if debug.0 { "ON" } else { "OFF" };
    info!("Collider overlay: {}", state);
}

/// Overlay color for a collider's own layer.
pub fn layer_color(layer: CollisionLayers) -> Color {
    let color = if layer.contains(CollisionLayers::PLAYER) {
        css::LIMEGREEN
    } else if layer.contains(CollisionLayers::ENEMY) {
        css::INDIAN_RED
    } else if layer.contains(CollisionLayers::ITEM) {
        css::GOLD
    } else if layer.contains(CollisionLayers::PLAYER_PROJECTILE) {
        css::LIGHT_CYAN
    } else if layer.contains(CollisionLayers::ENEMY_PROJECTILE) {
        css::ORANGE
    } else if layer.contains(CollisionLayers::ENVIRONMENT) {
        css::STEEL_BLUE
    } else {
        css::WHITE
    };
    color.with_alpha(0.8).into()
}

fn draw_colliders(mut gizmos: Gizmos, world: Res<CollisionWorld>) {
    for collider in world.iter() {
        gizmos.rect_2d(
            Isometry2d::from_translation(collider.hitbox.center()),
            collider.hitbox.size(),
            layer_color(collider.layer),
        );
    }
}

fn draw_chunk_grid(mut gizmos: Gizmos) {
    let chunk_size = CHUNK_TILES as f32 * TILE_SIZE;
    let extent = MAP_CHUNKS as f32 * chunk_size;
    let color = css::WHITE.with_alpha(0.15);
    for i in 0..=MAP_CHUNKS {
        let offset = i as f32 * chunk_size;
        gizmos.line_2d(Vec2::new(offset, 0.0), Vec2::new(offset, extent), color);
        gizmos.line_2d(Vec2::new(0.0, offset), Vec2::new(extent, offset), color);
    }
}

fn spawn_fill_label(mut commands: Commands) {
    commands.spawn((
        Name::new("Registry Fill"),
        RegistryFillLabel,
        Text::new(""),
        TextFont::from_font_size(14.0),
        TextColor(css::LIMEGREEN.into()),
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(10.0),
            bottom: Val::Px(10.0),
            ..default()
        },
        Visibility::Hidden,
        DespawnOnExit(Screen::Gameplay),
    ));
}

fn update_fill_label(
    debug: Res<DebugColliders>,
    world: Res<CollisionWorld>,
    mut label: Query<(&mut Text, &mut Visibility), With<RegistryFillLabel>>,
) {
    let Ok((mut text, mut visibility)) = label.single_mut() else {
        return;
    };
    if !debug.0 {
        visibility.set_if_neq(Visibility::Hidden);
        return;
    }
    visibility.set_if_neq(Visibility::Inherited);
    text.0 = format!("colliders {}/{}", world.len(), world.capacity());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_colors_are_distinct() {
        let layers = [
            CollisionLayers::PLAYER,
            CollisionLayers::ENEMY,
            CollisionLayers::ITEM,
            CollisionLayers::PLAYER_PROJECTILE,
            CollisionLayers::ENEMY_PROJECTILE,
            CollisionLayers::ENVIRONMENT,
        ];
        for (i, a) in layers.iter().enumerate() {
            for b in &layers[i + 1..] {
                assert_ne!(layer_color(*a), layer_color(*b));
            }
        }
    }
}
