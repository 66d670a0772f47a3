//! Heads-up display: health, ammo, floor and dash readiness. `Tab` hides it.

use bevy::{input::common_conditions::input_just_pressed, prelude::*};

use super::{
    GameSystems,
    player::Player,
    state::RunState,
    weapon::Gun,
};
use crate::{PausableSystems, config::Settings, screens::Screen, theme::palette::HUD_TEXT};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(OnEnter(Screen::Gameplay), (apply_hud_setting, spawn_hud).chain());
    app.add_systems(
        Update,
        toggle_hud
            .in_set(PausableSystems)
            .run_if(in_state(Screen::Gameplay).and(input_just_pressed(KeyCode::Tab))),
    );
    app.add_systems(
        Update,
        (
            show_hud,
            update_health_bar,
            update_ammo_label,
            update_floor_label,
            update_dash_bar,
        )
            .in_set(GameSystems::Ui)
            .run_if(in_state(Screen::Gameplay)),
    );
}

const BAR_WIDTH: f32 = 160.0;
const HEALTH_FILL: Color = Color::srgb(0.85, 0.2, 0.25);
const DASH_READY: Color = Color::srgb(0.35, 0.75, 0.95);
const DASH_CHARGING: Color = Color::srgb(0.25, 0.35, 0.45);

/// Hidden together when the HUD is toggled off.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct HudElement;

#[derive(Component)]
struct HealthFill;

#[derive(Component)]
struct AmmoLabel;

#[derive(Component)]
struct FloorLabel;

#[derive(Component)]
struct DashFill;

fn bar(name: &'static str, fill: impl Bundle, color: Color) -> impl Bundle {
    (
        Name::new(name),
        Node {
            width: Val::Px(BAR_WIDTH),
            height: Val::Px(10.0),
            ..default()
        },
        BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.6)),
        children![(
            fill,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                ..default()
            },
            BackgroundColor(color),
        )],
    )
}

fn hud_text(marker: impl Bundle) -> impl Bundle {
    (
        marker,
        Text::new(""),
        TextFont::from_font_size(16.0),
        TextColor(HUD_TEXT),
    )
}

fn spawn_hud(mut commands: Commands) {
    commands.spawn((
        Name::new("HUD"),
        HudElement,
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(12.0),
            top: Val::Px(12.0),
            flex_direction: FlexDirection::Column,
            row_gap: Val::Px(6.0),
            ..default()
        },
        Pickable::IGNORE,
        DespawnOnExit(Screen::Gameplay),
        children![
            hud_text(FloorLabel),
            bar("Health Bar", HealthFill, HEALTH_FILL),
            hud_text(AmmoLabel),
            bar("Dash Bar", DashFill, DASH_READY),
        ],
    ));
}

fn apply_hud_setting(settings: Res<Settings>, mut run: ResMut<RunState>) {
    run.hud_visible = settings.hud_visible;
}

fn toggle_hud(mut run: ResMut<RunState>) {
    run.hud_visible = !run.hud_visible;
    debug!("HUD visible: {}", run.hud_visible);
}

fn show_hud(run: Res<RunState>, mut elements: Query<&mut Visibility, With<HudElement>>) {
    let visibility = if run.hud_visible {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };
    for mut element in &mut elements {
        element.set_if_neq(visibility);
    }
}

fn update_health_bar(
    players: Query<&Player>,
    mut fill: Query<&mut Node, With<HealthFill>>,
) {
    let (Ok(player), Ok(mut node)) = (players.single(), fill.single_mut()) else {
        return;
    };
    let percent = 100.0 * (player.health / player.max_health).clamp(0.0, 1.0);
    node.width = Val::Percent(percent);
}

/// `12 / 17  Glock 17`, or the reload progress while reloading.
pub fn ammo_text(gun: &Gun) -> String {
    match gun.reload_progress() {
        Some(progress) => format!(
            "Reloading {:>3.0}%  {}",
            progress * 100.0,
            gun.kind.name()
        ),
        None => format!(
            "{} / {}  {}",
            gun.ammo_in_mag,
            gun.stats.magazine,
            gun.kind.name()
        ),
    }
}

fn update_ammo_label(guns: Query<&Gun, With<Player>>, mut label: Query<&mut Text, With<AmmoLabel>>) {
    let (Ok(gun), Ok(mut text)) = (guns.single(), label.single_mut()) else {
        return;
    };
    let ammo = ammo_text(gun);
    if text.0 != ammo {
        text.0 = ammo;
    }
}

fn update_floor_label(run: Res<RunState>, mut label: Query<&mut Text, With<FloorLabel>>) {
    if !run.is_changed() {
        return;
    }
    let Ok(mut text) = label.single_mut() else {
        return;
    };
    text.0 = format!("Floor {}", run.stage);
}

fn update_dash_bar(
    players: Query<&Player>,
    mut fill: Query<(&mut Node, &mut BackgroundColor), With<DashFill>>,
) {
    let (Ok(player), Ok((mut node, mut color))) = (players.single(), fill.single_mut()) else {
        return;
    };
    let charge = player.dash_charge();
    node.width = Val::Percent(100.0 * charge);
    color.set_if_neq(BackgroundColor(if charge >= 1.0 {
        DASH_READY
    } else {
        DASH_CHARGING
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::weapon::GunKind;

    #[test]
    fn test_ammo_text() {
        let mut gun = Gun::new(GunKind::Glock);
        assert_eq!(ammo_text(&gun), "17 / 17  Glock 17");

        gun.ammo_in_mag = 4;
        assert_eq!(ammo_text(&gun), "4 / 17  Glock 17");

        assert!(gun.start_reload());
        assert_eq!(ammo_text(&gun), "Reloading   0%  Glock 17");
    }

    #[test]
    fn test_tab_hides_every_hud_element() {
        let mut app = App::new();
        app.insert_resource(RunState {
            hud_visible: false,
            ..default()
        });
        let hud = app.world_mut().spawn((HudElement, Visibility::Inherited)).id();
        let other = app.world_mut().spawn(Visibility::Inherited).id();
        app.add_systems(Update, show_hud);
        app.update();

        assert_eq!(app.world().get::<Visibility>(hud), Some(&Visibility::Hidden));
        assert_eq!(app.world().get::<Visibility>(other), Some(&Visibility::Inherited));
    }
}
