//! The settings menu.
//!
//! Changes apply immediately and are saved when the menu closes.

use bevy::{
    ecs::{spawn::SpawnWith, system::IntoObserverSystem},
    input::common_conditions::input_just_pressed,
    prelude::*,
};

use crate::{
    config::{Settings, step_volume},
    menus::Menu,
    screens::Screen,
    theme::widget,
};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(OnEnter(Menu::Settings), spawn_settings_menu);
    app.add_systems(
        Update,
        go_back.run_if(in_state(Menu::Settings).and(input_just_pressed(KeyCode::Escape))),
    );

    app.add_systems(
        Update,
        update_settings_labels.run_if(in_state(Menu::Settings)),
    );
}

/// Which setting a value label shows.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
enum SettingLabel {
    MasterVolume,
    SfxVolume,
    ScreenShake,
}

impl SettingLabel {
    fn text(self, settings: &Settings) -> String {
        match self {
            Self::MasterVolume => format!("{:3.0}%", 100.0 * settings.master_volume),
            Self::SfxVolume => format!("{:3.0}%", 100.0 * settings.sfx_volume),
            Self::ScreenShake => if settings.screen_shake { "On" } else { "Off" }.to_string(),
        }
    }
}

fn spawn_settings_menu(mut commands: Commands) {
    commands.spawn((
        widget::menu_root("Settings Menu"),
        GlobalZIndex(2),
        DespawnOnExit(Menu::Settings),
        Children::spawn(SpawnWith(|parent: &mut ChildSpawner| {
            parent.spawn(widget::header("Settings"));
            parent
                .spawn((
                    Name::new("Settings Grid"),
                    Node {
                        display: Display::Grid,
                        row_gap: Val::Px(10.0),
                        column_gap: Val::Px(30.0),
                        grid_template_columns: RepeatedGridTrack::px(2, 260.0),
                        margin: UiRect::bottom(Val::Px(20.0)),
                        ..default()
                    },
                ))
                .with_children(|grid| {
                    grid.spawn(row_label("Master Volume"));
                    grid.spawn(volume_widget(
                        SettingLabel::MasterVolume,
                        lower_master_volume,
                        raise_master_volume,
                    ));
                    grid.spawn(row_label("Effects Volume"));
                    grid.spawn(volume_widget(
                        SettingLabel::SfxVolume,
                        lower_sfx_volume,
                        raise_sfx_volume,
                    ));
                    grid.spawn(row_label("Screen Shake"));
                    grid.spawn((
                        Name::new("Screen Shake Widget"),
                        Node {
                            justify_self: JustifySelf::Start,
                            align_items: AlignItems::Center,
                            column_gap: Val::Px(10.0),
                            ..default()
                        },
                        children![
                            widget::button_small("~", toggle_screen_shake),
                            value_label(SettingLabel::ScreenShake),
                        ],
                    ));
                });
            parent.spawn(widget::button("Back", go_back_on_click));
        })),
    ));
}

fn row_label(text: &'static str) -> impl Bundle {
    (
        widget::label(text),
        Node {
            justify_self: JustifySelf::End,
            ..default()
        },
    )
}

fn value_label(setting: SettingLabel) -> impl Bundle {
    (
        widget::label(""),
        setting,
        Node {
            width: Val::Px(60.0),
            justify_content: JustifyContent::Center,
            ..default()
        },
    )
}

fn volume_widget<M1, M2>(
    setting: SettingLabel,
    lower: impl IntoObserverSystem<Pointer<Click>, (), M1>,
    raise: impl IntoObserverSystem<Pointer<Click>, (), M2>,
) -> impl Bundle {
    (
        Name::new("Volume Widget"),
        Node {
            justify_self: JustifySelf::Start,
            align_items: AlignItems::Center,
            column_gap: Val::Px(10.0),
            ..default()
        },
        children![
            widget::button_small("-", lower),
            value_label(setting),
            widget::button_small("+", raise),
        ],
    )
}

fn lower_master_volume(_: On<Pointer<Click>>, mut settings: ResMut<Settings>) {
    settings.master_volume = step_volume(settings.master_volume, -1);
}

fn raise_master_volume(_: On<Pointer<Click>>, mut settings: ResMut<Settings>) {
    settings.master_volume = step_volume(settings.master_volume, 1);
}

fn lower_sfx_volume(_: On<Pointer<Click>>, mut settings: ResMut<Settings>) {
    settings.sfx_volume = step_volume(settings.sfx_volume, -1);
}

fn raise_sfx_volume(_: On<Pointer<Click>>, mut settings: ResMut<Settings>) {
    settings.sfx_volume = step_volume(settings.sfx_volume, 1);
}

fn toggle_screen_shake(_: On<Pointer<Click>>, mut settings: ResMut<Settings>) {
    settings.screen_shake = !settings.screen_shake;
}

fn update_settings_labels(
    settings: Res<Settings>,
    mut labels: Query<(&SettingLabel, &mut Text)>,
) {
    for (setting, mut text) in &mut labels {
        let value = setting.text(&settings);
        if text.0 != value {
            text.0 = value;
        }
    }
}

fn go_back_on_click(
    _: On<Pointer<Click>>,
    screen: Res<State<Screen>>,
    mut next_menu: ResMut<NextState<Menu>>,
) {
    next_menu.set(if screen.get() == &Screen::Title {
        Menu::Main
    } else {
        Menu::Pause
    });
}

fn go_back(screen: Res<State<Screen>>, mut next_menu: ResMut<NextState<Menu>>) {
    next_menu.set(if screen.get() == &Screen::Title {
        Menu::Main
    } else {
        Menu::Pause
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_show_current_values() {
        let settings = Settings {
            master_volume: 0.5,
            sfx_volume: 1.2,
            screen_shake: false,
            ..default()
        };
        assert_eq!(SettingLabel::MasterVolume.text(&settings), " 50%");
        assert_eq!(SettingLabel::SfxVolume.text(&settings), "120%");
        assert_eq!(SettingLabel::ScreenShake.text(&settings), "Off");
    }
}
