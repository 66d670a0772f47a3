//! The game's menus and transitions between them.

mod briefing;
mod credits;
mod log;
mod main;
mod pause;
mod run_end;
mod settings;

use bevy::prelude::*;

pub(super) fn plugin(app: &mut App) {
    app.init_state::<Menu>();

    app.add_plugins((
        briefing::plugin,
        credits::plugin,
        log::plugin,
        main::plugin,
        pause::plugin,
        run_end::plugin,
        settings::plugin,
    ));
}

#[derive(States, Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum Menu {
    #[default]
    None,
    Main,
    Credits,
    Settings,
    Pause,
    Briefing,
    Controls,
    Log,
    Death,
    Win,
}
