//! The credits menu.

use bevy::{ecs::spawn::SpawnWith, input::common_conditions::input_just_pressed, prelude::*};

use crate::{menus::Menu, theme::widget};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(OnEnter(Menu::Credits), spawn_credits_menu);
    app.add_systems(
        Update,
        go_back.run_if(in_state(Menu::Credits).and(input_just_pressed(KeyCode::Escape))),
    );
}

const CREDITS: [(&str, &[&str]); 3] = [
    ("Created by", &["The Null Mind team"]),
    ("Sound", &["Synthesized at startup, no samples"]),
    ("Built with", &["Bevy", "rand, serde, clap"]),
];

fn spawn_credits_menu(mut commands: Commands) {
    commands.spawn((
        widget::menu_root("Credits Menu"),
        GlobalZIndex(2),
        DespawnOnExit(Menu::Credits),
        Children::spawn(SpawnWith(|parent: &mut ChildSpawner| {
            parent.spawn(widget::header("Credits"));
            for (section, lines) in CREDITS {
                parent
                    .spawn((
                        widget::label(section),
                        Node {
                            margin: UiRect::top(Val::Px(12.0)),
                            ..default()
                        },
                    ))
                    .insert(TextFont::from_font_size(26.0));
                for line in lines {
                    parent.spawn(widget::label(*line));
                }
            }
            parent.spawn((
                Name::new("Spacer"),
                Node {
                    height: Val::Px(20.0),
                    ..default()
                },
            ));
            parent.spawn(widget::button("Back", go_back_on_click));
        })),
    ));
}

fn go_back_on_click(_: On<Pointer<Click>>, mut next_menu: ResMut<NextState<Menu>>) {
    next_menu.set(Menu::Main);
}

fn go_back(mut next_menu: ResMut<NextState<Menu>>) {
    next_menu.set(Menu::Main);
}
