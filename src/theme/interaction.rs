use bevy::prelude::*;

use crate::audio::{SoundLibrary, sound_effect};

pub(super) fn plugin(app: &mut App) {
    app.register_type::<InteractionPalette>();
    app.add_systems(Update, apply_interaction_palette);
    app.add_observer(play_on_click_sound_effect);
}

/// Palette for widget interactions. Add this to an entity that supports
/// [`Interaction`]s, such as a button, to change its [`BackgroundColor`] based
/// on the current interaction state.
#[derive(Component, Debug, Reflect)]
#[reflect(Component)]
pub struct InteractionPalette {
    pub none: Color,
    pub hovered: Color,
    pub pressed: Color,
}

impl InteractionPalette {
    pub fn color(&self, interaction: Interaction) -> Color {
        match interaction {
            Interaction::None => self.none,
            Interaction::Hovered => self.hovered,
            Interaction::Pressed => self.pressed,
        }
    }
}

fn apply_interaction_palette(
    mut palette_query: Query<
        (&Interaction, &InteractionPalette, &mut BackgroundColor),
        Changed<Interaction>,
    >,
) {
    for (interaction, palette, mut background) in &mut palette_query {
        *background = palette.color(*interaction).into();
    }
}

fn play_on_click_sound_effect(
    click: On<Pointer<Click>>,
    sounds: Option<Res<SoundLibrary>>,
    interaction_query: Query<(), With<Interaction>>,
    mut commands: Commands,
) {
    let Some(sounds) = sounds else {
        return;
    };
    if interaction_query.contains(click.entity) {
        commands.spawn(sound_effect(sounds.click.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_follows_interaction() {
        let palette = InteractionPalette {
            none: Color::BLACK,
            hovered: Color::WHITE,
            pressed: Color::NONE,
        };
        assert_eq!(palette.color(Interaction::None), Color::BLACK);
        assert_eq!(palette.color(Interaction::Hovered), Color::WHITE);
        assert_eq!(palette.color(Interaction::Pressed), Color::NONE);
    }
}
