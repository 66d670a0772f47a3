//! The death and win screens: the run's numbers, then retry or quit.

use bevy::{ecs::spawn::SpawnWith, prelude::*};

use crate::{
    LaunchOptions,
    game::{RunRecords, RunStats, StartRun},
    menus::Menu,
    screens::Screen,
    theme::widget,
};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(OnEnter(Menu::Death), spawn_death_menu);
    app.add_systems(OnEnter(Menu::Win), spawn_win_menu);
}

fn spawn_death_menu(commands: Commands, stats: Res<RunStats>, records: Res<RunRecords>) {
    spawn_run_end(commands, Menu::Death, "You Died", &stats, &records);
}

fn spawn_win_menu(commands: Commands, stats: Res<RunStats>, records: Res<RunRecords>) {
    spawn_run_end(commands, Menu::Win, "NULL Is Offline", &stats, &records);
}

fn spawn_run_end(
    mut commands: Commands,
    menu: Menu,
    title: &'static str,
    stats: &RunStats,
    records: &RunRecords,
) {
    let rows = stats.summary();
    let placing = records
        .latest
        .map(|rank| format!("New record: #{}", rank + 1));

    commands.spawn((
        widget::menu_root("Run End Menu"),
        GlobalZIndex(2),
        DespawnOnExit(menu),
        Children::spawn(SpawnWith(move |parent: &mut ChildSpawner| {
            parent.spawn(widget::header(title));
            parent
                .spawn((
                    Name::new("Run Stats"),
                    Node {
                        display: Display::Grid,
                        row_gap: Val::Px(6.0),
                        column_gap: Val::Px(30.0),
                        grid_template_columns: RepeatedGridTrack::px(2, 220.0),
                        margin: UiRect::vertical(Val::Px(12.0)),
                        ..default()
                    },
                ))
                .with_children(|grid| {
                    for (name, value) in rows {
                        grid.spawn((
                            widget::label(name),
                            Node {
                                justify_self: JustifySelf::End,
                                ..default()
                            },
                        ));
                        grid.spawn(widget::label(value));
                    }
                });
            if let Some(placing) = placing {
                parent.spawn(widget::label(placing));
            }
            parent.spawn(widget::button("Retry", retry));
            parent.spawn(widget::button("Quit to title", quit_to_title));
        })),
    ));
}

fn retry(
    _: On<Pointer<Click>>,
    options: Res<LaunchOptions>,
    mut start: MessageWriter<StartRun>,
) {
    start.write(StartRun::from_options(&options));
}

fn quit_to_title(_: On<Pointer<Click>>, mut next_screen: ResMut<NextState<Screen>>) {
    next_screen.set(Screen::Title);
}
