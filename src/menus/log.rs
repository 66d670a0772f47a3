//! Viewer for the logs found lying around the floors.

use bevy::{input::common_conditions::input_just_pressed, prelude::*};

use crate::{
    game::{LOGS, RunState},
    menus::Menu,
    theme::widget,
};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(OnEnter(Menu::Log), spawn_log_viewer);
    app.add_systems(OnExit(Menu::Log), forget_log);
    app.add_systems(
        Update,
        close_log.run_if(
            in_state(Menu::Log)
                .and(input_just_pressed(KeyCode::Escape).or(input_just_pressed(KeyCode::KeyE))),
        ),
    );
}

fn spawn_log_viewer(
    mut commands: Commands,
    run: Res<RunState>,
    mut next_menu: ResMut<NextState<Menu>>,
) {
    let Some((title, body)) = run.viewing_log.and_then(|index| LOGS.get(index)) else {
        warn!("Log viewer opened without a log");
        next_menu.set(Menu::None);
        return;
    };

    commands.spawn((
        widget::menu_root("Log Viewer"),
        GlobalZIndex(2),
        DespawnOnExit(Menu::Log),
        children![
            widget::header(*title),
            widget::paragraph(*body, 560.0),
            widget::button("Close", close_log_on_click),
        ],
    ));
}

fn forget_log(mut run: ResMut<RunState>) {
    run.viewing_log = None;
}

fn close_log_on_click(_: On<Pointer<Click>>, mut next_menu: ResMut<NextState<Menu>>) {
    next_menu.set(Menu::None);
}

fn close_log(mut next_menu: ResMut<NextState<Menu>>) {
    next_menu.set(Menu::None);
}
