//! The screen state for the main gameplay. The floor, player and enemies
//! are spawned by the game plugins once a run starts.

use bevy::{input::common_conditions::input_just_pressed, prelude::*};

use crate::{Pause, menus::Menu, screens::Screen};

pub(super) fn plugin(app: &mut App) {
    // Toggle pause on key press.
    app.add_systems(
        Update,
        open_pause_menu.run_if(
            in_state(Screen::Gameplay)
                .and(in_state(Menu::None))
                .and(input_just_pressed(KeyCode::KeyP).or(input_just_pressed(KeyCode::Escape))),
        ),
    );

    // Any menu over the game freezes it.
    app.add_systems(OnExit(Menu::None), pause.run_if(in_state(Screen::Gameplay)));
    app.add_systems(OnEnter(Menu::None), unpause.run_if(in_state(Screen::Gameplay)));
    app.add_systems(OnExit(Screen::Gameplay), (close_menu, unpause));
}

fn unpause(mut next_pause: ResMut<NextState<Pause>>) {
    next_pause.set(Pause(false));
}

fn pause(mut next_pause: ResMut<NextState<Pause>>) {
    next_pause.set(Pause(true));
}

fn open_pause_menu(mut next_menu: ResMut<NextState<Menu>>) {
    next_menu.set(Menu::Pause);
}

fn close_menu(mut next_menu: ResMut<NextState<Menu>>) {
    next_menu.set(Menu::None);
}
