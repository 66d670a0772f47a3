//! The mission briefing shown before the first floor, and the controls sheet.

use bevy::{input::common_conditions::input_just_pressed, prelude::*};

use crate::{menus::Menu, theme::widget};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<ControlsReturn>();
    app.add_systems(OnEnter(Menu::Briefing), spawn_briefing);
    app.add_systems(OnEnter(Menu::Controls), spawn_controls);
    app.add_systems(
        Update,
        show_controls.run_if(
            in_state(Menu::Briefing)
                .and(input_just_pressed(KeyCode::Enter).or(input_just_pressed(KeyCode::Space))),
        ),
    );
    app.add_systems(
        Update,
        leave_controls.run_if(
            in_state(Menu::Controls)
                .and(input_just_pressed(KeyCode::Enter).or(input_just_pressed(KeyCode::Escape))),
        ),
    );
}

const BRIEFING: &str = "Three weeks ago the facility's robots were handed to a single \
scheduling intelligence. Two weeks ago the staff stopped reporting in. \
The scheduler, NULL, sits at the bottom of nine floors of machines that now \
answer only to it.\n\nGo down. Use the exit on each floor to descend. Open \
crates for better guns, pick up medkits, and read what the people before you \
left behind.";

const CONTROLS: [(&str, &str); 8] = [
    ("Move", "W A S D"),
    ("Aim", "Mouse"),
    ("Fire", "Left mouse button"),
    ("Dash", "Space / Shift"),
    ("Reload", "R"),
    ("Interact", "E"),
    ("Toggle HUD", "Tab"),
    ("Pause", "Esc / P"),
];

/// Where the controls sheet leads once dismissed.
#[derive(Resource, Debug, Clone, Copy)]
pub(super) struct ControlsReturn(pub Menu);

impl Default for ControlsReturn {
    fn default() -> Self {
        Self(Menu::None)
    }
}

fn spawn_briefing(mut commands: Commands) {
    commands.spawn((
        widget::menu_root("Briefing"),
        GlobalZIndex(2),
        DespawnOnExit(Menu::Briefing),
        children![
            widget::header("Mission Briefing"),
            widget::paragraph(BRIEFING, 640.0),
            widget::button("Continue", continue_to_controls),
        ],
    ));
}

fn spawn_controls(mut commands: Commands) {
    commands
        .spawn((
            widget::menu_root("Controls"),
            GlobalZIndex(2),
            DespawnOnExit(Menu::Controls),
        ))
        .with_children(|parent| {
            parent.spawn(widget::header("Controls"));
            parent
                .spawn((
                    Name::new("Controls Grid"),
                    Node {
                        display: Display::Grid,
                        row_gap: Val::Px(8.0),
                        column_gap: Val::Px(40.0),
                        grid_template_columns: RepeatedGridTrack::px(2, 240.0),
                        ..default()
                    },
                ))
                .with_children(|grid| {
                    for (action, keys) in CONTROLS {
                        grid.spawn((
                            widget::label(action),
                            Node {
                                justify_self: JustifySelf::End,
                                ..default()
                            },
                        ));
                        grid.spawn(widget::label(keys));
                    }
                });
            parent.spawn(widget::button("Back", leave_controls_on_click));
        });
}

fn continue_to_controls(
    _: On<Pointer<Click>>,
    mut back_to: ResMut<ControlsReturn>,
    mut next_menu: ResMut<NextState<Menu>>,
) {
    back_to.0 = Menu::None;
    next_menu.set(Menu::Controls);
}

fn show_controls(mut back_to: ResMut<ControlsReturn>, mut next_menu: ResMut<NextState<Menu>>) {
    back_to.0 = Menu::None;
    next_menu.set(Menu::Controls);
}

fn leave_controls_on_click(
    _: On<Pointer<Click>>,
    back_to: Res<ControlsReturn>,
    mut next_menu: ResMut<NextState<Menu>>,
) {
    next_menu.set(back_to.0);
}

fn leave_controls(back_to: Res<ControlsReturn>, mut next_menu: ResMut<NextState<Menu>>) {
    next_menu.set(back_to.0);
}
