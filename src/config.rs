//! Player settings, persisted as JSON in the user's config directory.

use bevy::{audio::Volume, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    menus::Menu,
    persist::{config_path, load_json, save_json},
};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<Settings>();
    app.add_systems(Startup, load_settings);
    app.add_systems(Update, apply_master_volume.run_if(resource_changed::<Settings>));
    app.add_systems(OnExit(Menu::Settings), save_settings);
}

const SETTINGS_FILE: &str = "settings.json";

pub const MIN_VOLUME: f32 = 0.0;
pub const MAX_VOLUME: f32 = 3.0;
/// Volume change per `-`/`+` click.
pub const VOLUME_STEP: f32 = 0.1;

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Linear, drives `GlobalVolume`.
    pub master_volume: f32,
    /// Linear, applied to every sound effect on top of the master volume.
    pub sfx_volume: f32,
    pub screen_shake: bool,
    pub hud_visible: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            master_volume: 1.0,
            sfx_volume: 1.0,
            screen_shake: true,
            hud_visible: true,
        }
    }
}

/// Step a linear volume by `steps` clicks, staying within the allowed range.
pub fn step_volume(volume: f32, steps: i32) -> f32 {
    let stepped = volume + steps as f32 * VOLUME_STEP;
    // Snap to the step grid so repeated clicks don't drift.
    ((stepped / VOLUME_STEP).round() * VOLUME_STEP).clamp(MIN_VOLUME, MAX_VOLUME)
}

fn load_settings(mut settings: ResMut<Settings>) {
    let Some(path) = config_path(SETTINGS_FILE) else {
        warn!("Could not determine config directory for settings");
        return;
    };
    match load_json::<Settings>(&path) {
        Ok(Some(loaded)) => {
            info!("Loaded settings from {:?}", path);
            *settings = loaded;
        }
        Ok(None) => info!("No settings at {:?}, using defaults", path),
        Err(e) => warn!("Using default settings: {:#}", e),
    }
}

fn save_settings(settings: Res<Settings>) {
    let Some(path) = config_path(SETTINGS_FILE) else {
        warn!("Could not determine config directory for saving settings");
        return;
    };
    match save_json(&path, &*settings) {
        Ok(()) => info!("Saved settings to {:?}", path),
        Err(e) => warn!("Failed to save settings: {:#}", e),
    }
}

fn apply_master_volume(settings: Res<Settings>, mut global_volume: ResMut<GlobalVolume>) {
    global_volume.volume = Volume::Linear(settings.master_volume);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_steps_are_clamped() {
        assert!((step_volume(1.0, 1) - 1.1).abs() < 1e-5);
        assert!((step_volume(1.0, -3) - 0.7).abs() < 1e-5);
        assert_eq!(step_volume(0.05, -1), 0.0);
        assert_eq!(step_volume(2.95, 2), MAX_VOLUME);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: Settings = serde_json::from_str(r#"{ "sfx_volume": 0.4 }"#).unwrap();
        assert_eq!(
            settings,
            Settings {
                sfx_volume: 0.4,
                ..default()
            }
        );
    }

    #[test]
    fn test_settings_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        let settings = Settings {
            master_volume: 0.5,
            screen_shake: false,
            ..default()
        };
        save_json(&path, &settings).unwrap();
        assert_eq!(load_json::<Settings>(&path).unwrap(), Some(settings));
    }
}
