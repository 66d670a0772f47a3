//! The game itself: a top-down shooter across nine generated floors.
//!
//! Everything solid lives in the [`collision::CollisionWorld`] registry,
//! and bullets are particles that carry their own colliders. Frame order:
//! - `Intent`: floor requests, room tracking and enemy decisions
//! - `Movement`: player and enemy motion against the registry
//! - `Combat`: firing, bullet resolution and damage
//! - `Effects`: particle emitters and screen shake
//! - `Ui`: HUD and overlays

mod collision;
mod debug;
mod enemy;
mod hud;
mod interactable;
mod map;
mod particles;
mod player;
mod polish;
mod records;
mod state;
mod weapon;

use bevy::prelude::*;

use crate::AppSystems;

pub use interactable::LOGS;
pub use records::RunRecords;
pub use state::{RunState, RunStats, StartRun, format_run_time};

pub(super) fn plugin(app: &mut App) {
    app.configure_sets(
        Update,
        (
            GameSystems::Intent,
            GameSystems::Movement,
            GameSystems::Combat,
            GameSystems::Effects,
            GameSystems::Ui,
        )
            .chain()
            .in_set(AppSystems::Update),
    );

    app.add_plugins((
        collision::plugin,
        particles::plugin,
        map::plugin,
        player::plugin,
        weapon::plugin,
        enemy::plugin,
        interactable::plugin,
        state::plugin,
        records::plugin,
        hud::plugin,
        polish::plugin,
        debug::plugin,
    ));
}

/// Ordered phases of a gameplay frame.
#[derive(SystemSet, Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum GameSystems {
    Intent,
    Movement,
    Combat,
    Effects,
    Ui,
}

/// Torn down with the floor it was spawned on.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct FloorEntity;
