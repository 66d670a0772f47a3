//! Run state: the current stage, floor transitions, run statistics and how a run ends.
//!
//! Win: use the exit on the last floor.
//! Lose: the player's health reaches zero.

use bevy::prelude::*;

use super::{
    FloorEntity, GameSystems,
    collision::{ColliderHandle, CollisionWorld},
    enemy::LAST_STAGE,
    interactable::ExitActivated,
    map::FloorRequested,
    particles::ParticleEmitter,
    player::{Player, PlayerDied},
};
use crate::{LaunchOptions, PausableSystems, menus::Menu, screens::Screen};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<RunState>();
    app.init_resource::<RunStats>();
    app.register_type::<RunStats>();
    app.add_message::<StartRun>();
    app.add_message::<RunEnded>();

    app.add_systems(
        OnEnter(Screen::Gameplay),
        (request_first_run, spawn_fade_overlay),
    );
    app.add_systems(
        Update,
        begin_run
            .before(GameSystems::Intent)
            .run_if(in_state(Screen::Gameplay)),
    );
    app.add_systems(
        Update,
        (start_transition, advance_transition, end_run_on_death, tick_run_time)
            .chain()
            .in_set(GameSystems::Effects)
            .in_set(PausableSystems)
            .run_if(in_state(Screen::Gameplay)),
    );
    app.add_systems(
        Update,
        draw_fade
            .in_set(GameSystems::Ui)
            .run_if(in_state(Screen::Gameplay)),
    );
}

/// Length of the fade between floors.
pub const TRANSITION_SECS: f32 = 2.0;

#[derive(Resource, Debug, Clone)]
pub struct RunState {
    pub stage: u32,
    pub seed: u64,
    /// Running while the screen fades to the next floor.
    pub transition: Option<Timer>,
    /// Index into the log list while a log is open.
    pub viewing_log: Option<usize>,
    pub hud_visible: bool,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            stage: 1,
            seed: 0,
            transition: None,
            viewing_log: None,
            hud_visible: true,
        }
    }
}

impl RunState {
    pub fn floor_seed(&self) -> u64 {
        self.seed.wrapping_add(u64::from(self.stage))
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }
}

#[derive(Resource, Debug, Default, Clone, PartialEq, Reflect)]
#[reflect(Resource)]
pub struct RunStats {
    /// Seconds spent on floors, excluding pauses and fades.
    pub run_time: f32,
    pub ammo_spent: u32,
    pub hits_taken: u32,
    pub healing_used: u32,
    pub robots_destroyed: u32,
    pub stage_reached: u32,
}

impl RunStats {
    pub fn reset(&mut self, stage: u32) {
        *self = Self {
            stage_reached: stage,
            ..default()
        };
    }

    /// Rows of the end-of-run table.
    pub fn summary(&self) -> [(&'static str, String); 6] {
        [
            ("Floor", self.stage_reached.to_string()),
            ("Time", format_run_time(self.run_time)),
            ("Robots destroyed", self.robots_destroyed.to_string()),
            ("Healing items used", self.healing_used.to_string()),
            ("Hits taken", self.hits_taken.to_string()),
            ("Ammo spent", self.ammo_spent.to_string()),
        ]
    }
}

/// Start a fresh run from `stage` with `seed`.
#[derive(Message, Debug, Clone, Copy)]
pub struct StartRun {
    pub stage: u32,
    pub seed: u64,
}

impl StartRun {
    /// Uses the seed and stage given on the command line, if any.
    pub fn from_options(options: &LaunchOptions) -> Self {
        Self {
            stage: options.stage.clamp(1, LAST_STAGE),
            seed: options.seed.unwrap_or_else(rand::random),
        }
    }
}

/// A run ended by dying or by leaving the last floor.
#[derive(Message, Debug, Clone, Copy)]
pub struct RunEnded {
    pub won: bool,
}

/// `mm:ss`, minutes keep counting past an hour.
pub fn format_run_time(secs: f32) -> String {
    let total = secs.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[derive(Component)]
struct FadeOverlay;

fn request_first_run(options: Res<LaunchOptions>, mut start: MessageWriter<StartRun>) {
    start.write(StartRun::from_options(&options));
}

fn begin_run(
    mut commands: Commands,
    mut starts: MessageReader<StartRun>,
    mut run: ResMut<RunState>,
    mut stats: ResMut<RunStats>,
    mut world: ResMut<CollisionWorld>,
    mut floors: MessageWriter<FloorRequested>,
    mut next_menu: ResMut<NextState<Menu>>,
    players: Query<(Entity, &ColliderHandle), With<Player>>,
    mut gear: Query<(Entity, &mut ParticleEmitter), Without<FloorEntity>>,
) {
    let Some(&start) = starts.read().last() else {
        return;
    };

    // A retry starts over with a fresh player.
    for (entity, handle) in &players {
        world.reset(handle.0);
        commands.entity(entity).despawn();
    }
    // Gun and dash emitters follow the player, the floor owns the rest.
    for (entity, mut emitter) in &mut gear {
        emitter.release_colliders(&mut world);
        commands.entity(entity).despawn();
    }

    *run = RunState {
        stage: start.stage,
        seed: start.seed,
        hud_visible: run.hud_visible,
        ..default()
    };
    stats.reset(start.stage);
    floors.write(FloorRequested {
        stage: run.stage,
        seed: run.floor_seed(),
    });

    next_menu.set(if start.stage == 1 {
        Menu::Briefing
    } else {
        Menu::None
    });
    info!("Run started on floor {} with seed {}", start.stage, start.seed);
}

fn start_transition(mut exits: MessageReader<ExitActivated>, mut run: ResMut<RunState>) {
    if exits.read().last().is_none() || run.is_transitioning() {
        return;
    }
    run.transition = Some(Timer::from_seconds(TRANSITION_SECS, TimerMode::Once));
    info!("Leaving floor {}", run.stage);
}

fn advance_transition(
    time: Res<Time>,
    mut run: ResMut<RunState>,
    mut stats: ResMut<RunStats>,
    mut floors: MessageWriter<FloorRequested>,
    mut ended: MessageWriter<RunEnded>,
    mut next_menu: ResMut<NextState<Menu>>,
) {
    let Some(timer) = run.transition.as_mut() else {
        return;
    };
    if !timer.tick(time.delta()).is_finished() {
        return;
    }
    run.transition = None;

    if run.stage >= LAST_STAGE {
        info!("Run won in {}", format_run_time(stats.run_time));
        ended.write(RunEnded { won: true });
        next_menu.set(Menu::Win);
        return;
    }

    run.stage += 1;
    stats.stage_reached = stats.stage_reached.max(run.stage);
    floors.write(FloorRequested {
        stage: run.stage,
        seed: run.floor_seed(),
    });
    info!("Descending to floor {}", run.stage);
}

fn end_run_on_death(
    mut died: MessageReader<PlayerDied>,
    mut run: ResMut<RunState>,
    stats: Res<RunStats>,
    mut ended: MessageWriter<RunEnded>,
    mut next_menu: ResMut<NextState<Menu>>,
) {
    if died.read().last().is_none() {
        return;
    }
    run.transition = None;
    info!(
        "Player died on floor {} after {}",
        run.stage,
        format_run_time(stats.run_time)
    );
    ended.write(RunEnded { won: false });
    next_menu.set(Menu::Death);
}

fn tick_run_time(time: Res<Time>, run: Res<RunState>, mut stats: ResMut<RunStats>) {
    if !run.is_transitioning() {
        stats.run_time += time.delta_secs();
    }
}

fn spawn_fade_overlay(mut commands: Commands) {
    commands.spawn((
        Name::new("Fade Overlay"),
        FadeOverlay,
        Node {
            position_type: PositionType::Absolute,
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        },
        BackgroundColor(Color::NONE),
        Pickable::IGNORE,
        GlobalZIndex(1),
        DespawnOnExit(Screen::Gameplay),
    ));
}

/// Fades to black while leaving a floor and back in once the next one is up.
fn draw_fade(
    time: Res<Time>,
    run: Res<RunState>,
    mut overlay: Query<&mut BackgroundColor, With<FadeOverlay>>,
) {
    let Ok(mut background) = overlay.single_mut() else {
        return;
    };
    let alpha = match &run.transition {
        Some(timer) => timer.fraction(),
        None => (background.0.alpha() - time.delta_secs() * 2.0).max(0.0),
    };
    if alpha != background.0.alpha() {
        background.0 = Color::BLACK.with_alpha(alpha);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy::state::app::StatesPlugin;

    use super::*;

    #[test]
    fn test_format_run_time() {
        assert_eq!(format_run_time(0.0), "00:00");
        assert_eq!(format_run_time(59.9), "00:59");
        assert_eq!(format_run_time(61.0), "01:01");
        assert_eq!(format_run_time(3725.0), "62:05");
        assert_eq!(format_run_time(-3.0), "00:00");
    }

    #[test]
    fn test_floor_seed_follows_stage() {
        let mut run = RunState {
            seed: 100,
            ..default()
        };
        assert_eq!(run.floor_seed(), 101);
        run.stage = 4;
        assert_eq!(run.floor_seed(), 104);

        run.seed = u64::MAX;
        assert_eq!(run.floor_seed(), 3);
    }

    #[test]
    fn test_reset_keeps_only_the_stage() {
        let mut stats = RunStats {
            run_time: 12.0,
            ammo_spent: 40,
            hits_taken: 3,
            healing_used: 1,
            robots_destroyed: 9,
            stage_reached: 2,
        };
        stats.reset(5);
        assert_eq!(
            stats,
            RunStats {
                stage_reached: 5,
                ..default()
            }
        );
    }

    #[test]
    fn test_summary_rows() {
        let stats = RunStats {
            run_time: 125.0,
            robots_destroyed: 17,
            stage_reached: 3,
            ..default()
        };
        let summary = stats.summary();
        assert_eq!(summary[0], ("Floor", "3".to_string()));
        assert_eq!(summary[1], ("Time", "02:05".to_string()));
        assert_eq!(summary[2], ("Robots destroyed", "17".to_string()));
    }

    #[test]
    fn test_exit_on_last_floor_wins() {
        let mut app = App::new();
        app.init_resource::<Time>();
        app.init_resource::<RunStats>();
        app.add_plugins(StatesPlugin);
        app.init_state::<Menu>();
        app.add_message::<FloorRequested>();
        app.add_message::<RunEnded>();
        app.insert_resource(RunState {
            stage: LAST_STAGE,
            transition: Some(Timer::new(Duration::ZERO, TimerMode::Once)),
            ..default()
        });
        app.add_systems(Update, advance_transition);
        app.update();

        let ended = app.world().resource::<Messages<RunEnded>>();
        let mut cursor = ended.get_cursor();
        let won: Vec<bool> = cursor.read(ended).map(|e| e.won).collect();
        assert_eq!(won, vec![true]);
        assert!(app.world().resource::<RunState>().transition.is_none());
    }
}
