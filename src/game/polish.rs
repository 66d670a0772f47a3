//! Game feel: the camera trailing the player and screen shake.

use bevy::prelude::*;
use rand::Rng;

use super::{GameSystems, player::Player};
use crate::{PausableSystems, config::Settings, screens::Screen};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<ScreenShake>();
    app.add_systems(OnEnter(Screen::Gameplay), reset_shake);
    app.add_systems(
        Update,
        (follow_player, apply_screen_shake)
            .chain()
            .in_set(GameSystems::Effects)
            .in_set(PausableSystems)
            .run_if(in_state(Screen::Gameplay)),
    );
}

// =============================================================================
// CAMERA FOLLOW
// =============================================================================

/// How quickly the camera closes the gap to the player, per second.
const FOLLOW_RATE: f32 = 8.0;
/// Beyond this the camera snaps, e.g. after changing floors.
const SNAP_DISTANCE: f32 = 400.0;

fn follow_player(
    time: Res<Time>,
    mut shake: ResMut<ScreenShake>,
    players: Query<&Transform, With<Player>>,
) {
    let Ok(player) = players.single() else {
        return;
    };
    let target = player.translation.truncate();
    let current = shake.base_position.truncate();
    let next = if current.distance(target) > SNAP_DISTANCE {
        target
    } else {
        current.lerp(target, (FOLLOW_RATE * time.delta_secs()).min(1.0))
    };
    shake.base_position = next.extend(shake.base_position.z);
}

// =============================================================================
// SCREEN SHAKE
// =============================================================================

/// Where the camera wants to be, plus how hard it is shaking.
#[derive(Resource, Default)]
pub struct ScreenShake {
    /// Current trauma level (0.0 to 1.0).
    pub trauma: f32,
    /// Base position to return to.
    pub base_position: Vec3,
}

impl ScreenShake {
    pub fn add_trauma(&mut self, amount: f32) {
        self.trauma = (self.trauma + amount).clamp(0.0, 1.0);
    }

    /// Offset scale for the current trauma. Squared so small hits stay subtle.
    pub fn intensity(&self) -> f32 {
        self.trauma * self.trauma
    }

    pub fn decay(&mut self, dt: f32) {
        self.trauma = (self.trauma - TRAUMA_DECAY * dt).max(0.0);
    }
}

/// Maximum shake offset in pixels.
const MAX_SHAKE_OFFSET: f32 = 10.0;
/// How fast trauma decays per second.
const TRAUMA_DECAY: f32 = 2.5;

fn reset_shake(mut shake: ResMut<ScreenShake>) {
    *shake = ScreenShake::default();
}

fn apply_screen_shake(
    time: Res<Time>,
    settings: Res<Settings>,
    mut shake: ResMut<ScreenShake>,
    mut camera_query: Query<&mut Transform, (With<Camera2d>, Without<Player>)>,
) {
    let Ok(mut camera_transform) = camera_query.single_mut() else {
        return;
    };

    let mut offset = Vec2::ZERO;
    if shake.trauma > 0.0 && settings.screen_shake {
        let mut rng = rand::rng();
        let amount = MAX_SHAKE_OFFSET * shake.intensity();
        offset = Vec2::new(
            rng.random_range(-1.0..1.0) * amount,
            rng.random_range(-1.0..1.0) * amount,
        );
    }
    shake.decay(time.delta_secs());

    camera_transform.translation.x = shake.base_position.x + offset.x;
    camera_transform.translation.y = shake.base_position.y + offset.y;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trauma_is_clamped() {
        let mut shake = ScreenShake::default();
        shake.add_trauma(0.6);
        shake.add_trauma(0.6);
        assert_eq!(shake.trauma, 1.0);
        assert_eq!(shake.intensity(), 1.0);

        shake.add_trauma(-3.0);
        assert_eq!(shake.trauma, 0.0);
    }

    #[test]
    fn test_trauma_decays_to_zero() {
        let mut shake = ScreenShake::default();
        shake.add_trauma(0.5);
        shake.decay(0.1);
        assert!((shake.trauma - 0.25).abs() < 1e-5);
        assert!((shake.intensity() - 0.0625).abs() < 1e-5);
        shake.decay(1.0);
        assert_eq!(shake.trauma, 0.0);
    }

    #[test]
    fn test_camera_snaps_to_a_distant_player() {
        let mut app = App::new();
        app.init_resource::<Time>();
        app.init_resource::<ScreenShake>();
        app.world_mut()
            .spawn((Player::default(), Transform::from_xyz(1000.0, 0.0, 0.0)));
        app.add_systems(Update, follow_player);

        app.update();
        let shake = app.world().resource::<ScreenShake>();
        assert_eq!(shake.base_position.truncate(), Vec2::new(1000.0, 0.0));
    }
}
