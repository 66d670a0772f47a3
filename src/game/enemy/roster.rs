//! Enemy kinds, their stats and which of them show up on each floor.

use std::ops::RangeInclusive;

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Reflect)]
pub enum EnemyKind {
    Proxy,
    Echo,
    Kamikaze,
    Vantage,
    Recharge,
    Tactician,
    Sabot,
    Radius,
    Sentry,
    Juggernaut,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemyStats {
    pub hitbox: Vec2,
    pub health: f32,
    pub max_speed: f32,
    pub acceleration: f32,
    pub drag: f32,
    pub contact_damage: f32,
    /// Multiplier on incoming damage.
    pub armor: f32,
}

impl EnemyKind {
    pub const ALL: [Self; 10] = [
        Self::Proxy,
        Self::Echo,
        Self::Kamikaze,
        Self::Vantage,
        Self::Recharge,
        Self::Tactician,
        Self::Sabot,
        Self::Radius,
        Self::Sentry,
        Self::Juggernaut,
    ];

    pub fn stats(self) -> EnemyStats {
        let (hitbox, health, max_speed, acceleration, drag, contact_damage) = match self {
            Self::Proxy => (Vec2::splat(25.0), 80.0, 120.0, 450.0, 4.0, 15.0),
            Self::Echo => (Vec2::new(20.0, 32.0), 100.0, 100.0, 500.0, 5.0, 0.0),
            Self::Kamikaze => (Vec2::splat(15.0), 100.0, 100.0, 500.0, 5.0, 10.0),
            Self::Vantage => (Vec2::splat(26.0), 45.0, 80.0, 300.0, 5.0, 30.0),
            Self::Recharge => (Vec2::splat(20.0), 100.0, 150.0, 500.0, 5.0, 10.0),
            Self::Tactician => (Vec2::splat(24.0), 90.0, 90.0, 350.0, 4.0, 8.0),
            Self::Sabot => (Vec2::splat(28.0), 60.0, 140.0, 600.0, 3.0, 25.0),
            Self::Radius => (Vec2::splat(30.0), 85.0, 85.0, 420.0, 4.5, 20.0),
            Self::Sentry => (Vec2::splat(20.0), 75.0, 0.0, 0.0, 0.0, 35.0),
            Self::Juggernaut => (Vec2::splat(40.0), 200.0, 60.0, 250.0, 8.0, 35.0),
        };
        EnemyStats {
            hitbox,
            health,
            max_speed,
            acceleration,
            drag,
            contact_damage,
            armor: if self == Self::Juggernaut { 0.5 } else { 1.0 },
        }
    }

    pub fn color(self) -> Color {
        match self {
            Self::Proxy => Color::srgb(0.85, 0.35, 0.35),
            Self::Echo => Color::srgb(0.55, 0.45, 0.9),
            Self::Kamikaze => Color::srgb(1.0, 0.6, 0.15),
            Self::Vantage => Color::srgb(0.35, 0.8, 0.85),
            Self::Recharge => Color::srgb(0.35, 0.9, 0.45),
            Self::Tactician => Color::srgb(0.95, 0.85, 0.3),
            Self::Sabot => Color::srgb(0.75, 0.75, 0.8),
            Self::Radius => Color::srgb(0.9, 0.3, 0.75),
            Self::Sentry => Color::srgb(0.5, 0.55, 0.6),
            Self::Juggernaut => Color::srgb(0.6, 0.2, 0.2),
        }
    }
}

/// Enemy mix for one floor: relative weights and how many per room.
#[derive(Debug, Clone)]
pub struct StageComposition {
    pub weights: &'static [(EnemyKind, u32)],
    pub count: RangeInclusive<u32>,
}

pub const LAST_STAGE: u32 = 9;

/// Stages outside 1..=9 are clamped.
pub fn composition(stage: u32) -> StageComposition {
    use EnemyKind::*;

    let (weights, count): (&'static [(EnemyKind, u32)], RangeInclusive<u32>) =
        match stage.clamp(1, LAST_STAGE) {
            1 => (&[(Proxy, 15), (Echo, 6)], 10..=15),
            2 => (&[(Proxy, 20), (Echo, 9), (Kamikaze, 8)], 12..=20),
            3 => (&[(Vantage, 8), (Recharge, 4), (Kamikaze, 15)], 15..=20),
            4 => (&[(Echo, 12), (Vantage, 10), (Tactician, 5)], 15..=25),
            5 => (
                &[
                    (Echo, 15),
                    (Proxy, 20),
                    (Tactician, 7),
                    (Sabot, 5),
                    (Kamikaze, 15),
                ],
                18..=30,
            ),
            6 => (
                &[(Radius, 10), (Tactician, 5), (Sabot, 10), (Recharge, 5)],
                15..=20,
            ),
            7 => (
                &[(Sentry, 4), (Recharge, 5), (Radius, 7), (Kamikaze, 20)],
                20..=25,
            ),
            8 => (&[(Juggernaut, 3), (Recharge, 5), (Radius, 7)], 12..=15),
            _ => (
                &[(Juggernaut, 3), (Sabot, 7), (Sentry, 4), (Radius, 7)],
                15..=20,
            ),
        };
    StageComposition { weights, count }
}

impl StageComposition {
    pub fn pick(&self, rng: &mut impl Rng) -> EnemyKind {
        let total: u32 = self.weights.iter().map(|(_, weight)| weight).sum();
        let mut roll = rng.random_range(0..total);
        for &(kind, weight) in self.weights {
            if roll < weight {
                return kind;
            }
            roll -= weight;
        }
        self.weights[0].0
    }
}

/// The enemies for one room on `stage`.
pub fn roll_room(stage: u32, rng: &mut impl Rng) -> Vec<EnemyKind> {
    let composition = composition(stage);
    let count = rng.random_range(composition.count.clone());
    (0..count).map(|_| composition.pick(rng)).collect()
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn test_roll_room_respects_count_and_roster() {
        let mut rng = StdRng::seed_from_u64(9);
        for stage in 1..=LAST_STAGE {
            let composition = composition(stage);
            for _ in 0..20 {
                let room = roll_room(stage, &mut rng);
                assert!(composition.count.contains(&(room.len() as u32)));
                for kind in room {
                    assert!(composition.weights.iter().any(|(k, _)| *k == kind));
                }
            }
        }
    }

    #[test]
    fn test_weights_shape_the_mix() {
        let mut rng = StdRng::seed_from_u64(1);
        let first = composition(1);
        let proxies = (0..2000)
            .filter(|_| first.pick(&mut rng) == EnemyKind::Proxy)
            .count();
        // 15 of 21.
        assert!((1250..1600).contains(&proxies), "{proxies}");
    }

    #[test]
    fn test_stage_is_clamped() {
        assert_eq!(composition(0).count, composition(1).count);
        assert_eq!(composition(42).count, composition(9).count);
    }

    #[test]
    fn test_only_the_juggernaut_is_armored() {
        for kind in EnemyKind::ALL {
            let armor = kind.stats().armor;
            assert_eq!(armor < 1.0, kind == EnemyKind::Juggernaut);
        }
        assert_eq!(EnemyKind::Sentry.stats().max_speed, 0.0);
    }
}
