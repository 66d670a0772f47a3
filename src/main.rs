// Support configuring Bevy lints within code.
#![cfg_attr(bevy_lint, feature(register_tool), register_tool(bevy))]
// Disable console on Windows for non-dev builds.
#![cfg_attr(not(feature = "dev"), windows_subsystem = "windows")]

mod audio;
mod config;
mod game;
mod menus;
mod persist;
mod screens;
mod theme;

use anyhow::anyhow;
use bevy::{asset::AssetMetaCheck, prelude::*};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Null Mind: a top-down shooter", long_about = None)]
struct Args {
    /// Fixed map seed, random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Floor to start on
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=9))]
    stage: u32,

    /// Window width
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Window height
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Start with the collider overlay on
    #[arg(long)]
    debug_colliders: bool,
}

/// Command line choices, available to every plugin.
#[derive(Resource, Debug, Clone)]
pub struct LaunchOptions {
    pub seed: Option<u64>,
    pub stage: u32,
    pub window_size: UVec2,
    pub debug_colliders: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            seed: None,
            stage: 1,
            window_size: UVec2::new(1280, 720),
            debug_colliders: false,
        }
    }
}

impl From<Args> for LaunchOptions {
    fn from(args: Args) -> Self {
        Self {
            seed: args.seed,
            stage: args.stage,
            window_size: UVec2::new(args.width, args.height),
            debug_colliders: args.debug_colliders,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let options = LaunchOptions::from(Args::parse());
    match App::new().add_plugins(AppPlugin { options }).run() {
        AppExit::Success => Ok(()),
        AppExit::Error(code) => Err(anyhow!("exited with code {code}")),
    }
}

pub struct AppPlugin {
    pub options: LaunchOptions,
}

impl Plugin for AppPlugin {
    fn build(&self, app: &mut App) {
        // Add Bevy plugins.
        app.add_plugins(
            DefaultPlugins
                .set(AssetPlugin {
                    // Wasm builds will check for meta files (that don't exist) if this isn't set.
                    // This causes errors and even panics on web build on itch.
                    // See https://github.com/bevyengine/bevy_github_ci_template/issues/48.
                    meta_check: AssetMetaCheck::Never,
                    ..default()
                })
                .set(WindowPlugin {
                    primary_window: Window {
                        title: "Null Mind".to_string(),
                        resolution: (self.options.window_size.x, self.options.window_size.y)
                            .into(),
                        fit_canvas_to_parent: true,
                        ..default()
                    }
                    .into(),
                    ..default()
                }),
        );
        app.insert_resource(self.options.clone());
        app.insert_resource(ClearColor(Color::srgb(0.04, 0.04, 0.06)));

        // Add other plugins.
        app.add_plugins((
            config::plugin,
            audio::plugin,
            game::plugin,
            menus::plugin,
            screens::plugin,
            theme::plugin,
        ));

        // Order new `AppSystems` variants by adding them here:
        app.configure_sets(
            Update,
            (
                AppSystems::TickTimers,
                AppSystems::RecordInput,
                AppSystems::Update,
            )
                .chain(),
        );

        // Set up the `Pause` state.
        app.init_state::<Pause>();
        app.configure_sets(Update, PausableSystems.run_if(in_state(Pause(false))));

        // Spawn the main camera.
        app.add_systems(Startup, spawn_camera);
    }
}

/// High-level groupings of systems for the app in the `Update` schedule.
/// When adding a new variant, make sure to order it in the `configure_sets`
/// call above.
#[derive(SystemSet, Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
enum AppSystems {
    /// Tick timers.
    TickTimers,
    /// Record player input.
    RecordInput,
    /// Do everything else (consider splitting this into further variants).
    Update,
}

/// Whether or not the game is paused.
#[derive(States, Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
struct Pause(pub bool);

/// A system set for systems that shouldn't run while the game is paused.
#[derive(SystemSet, Copy, Clone, Eq, PartialEq, Hash, Debug)]
struct PausableSystems;

fn spawn_camera(mut commands: Commands) {
    commands.spawn((Name::new("Camera"), Camera2d));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_fill_launch_options() {
        let args = Args::parse_from(["null_mind", "--seed", "42", "--stage", "3", "--debug-colliders"]);
        let options = LaunchOptions::from(args);
        assert_eq!(options.seed, Some(42));
        assert_eq!(options.stage, 3);
        assert_eq!(options.window_size, UVec2::new(1280, 720));
        assert!(options.debug_colliders);
    }

    #[test]
    fn test_stage_outside_the_floors_is_rejected() {
        assert!(Args::try_parse_from(["null_mind", "--stage", "10"]).is_err());
        assert!(Args::try_parse_from(["null_mind", "--stage", "0"]).is_err());
    }
}
