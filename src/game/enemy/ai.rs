//! Enemy decision making.
//!
//! [`think`] is a pure function of what the enemy can see and its own
//! [`Brain`], so every behavior can be exercised without a running game.

use std::f32::consts::FRAC_PI_4;

use bevy::prelude::*;
use rand::Rng;

use super::roster::EnemyKind;

/// What an enemy knows about the world this frame.
#[derive(Debug, Clone, Copy)]
pub struct EnemyView {
    pub position: Vec2,
    pub player: Vec2,
    pub line_of_sight: bool,
    pub health: f32,
    pub max_health: f32,
    /// Tactician buff. Scales speed and every timer.
    pub buff: f32,
    /// Closest ally that is not a Recharge.
    pub nearest_ally: Option<Vec2>,
}

impl EnemyView {
    fn to_player(&self) -> Vec2 {
        (self.player - self.position).normalize_or_zero()
    }

    fn distance(&self) -> f32 {
        self.position.distance(self.player)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    /// Winding up: Proxy arming, Radius and Sabot charging.
    Charging,
    Armed,
    Aiming,
    Firing,
    Dashing,
    Reloading,
    Cooldown,
}

/// Per-enemy state carried between decisions.
#[derive(Debug, Clone, Default)]
pub struct Brain {
    pub phase: Phase,
    pub timer: f32,
    /// Second clock for kinds that run two schedules.
    pub retarget: f32,
    pub shots_left: u32,
    pub heading: Vec2,
    /// Locked destination or aim point.
    pub target: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Fire { direction: Vec2 },
    /// Area damage around the enemy. `fatal` blasts kill the enemy too.
    Blast {
        radius: f32,
        damage: f32,
        fatal: bool,
    },
    HealAllies { radius: f32, amount: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub direction: Vec2,
    pub speed_scale: f32,
    pub contact_scale: f32,
    /// Direction of a visible aiming laser.
    pub laser: Option<Vec2>,
    pub action: Option<Action>,
}

impl Default for Decision {
    fn default() -> Self {
        Self {
            direction: Vec2::ZERO,
            speed_scale: 1.0,
            contact_scale: 1.0,
            laser: None,
            action: None,
        }
    }
}

impl Decision {
    fn toward(direction: Vec2) -> Self {
        Self {
            direction,
            ..default()
        }
    }
}

pub const DETECTION_RANGE: f32 = 500.0;

const PROXY_ARM_RANGE: f32 = 150.0;
const PROXY_ARM_TIME: f32 = 2.0;
const PROXY_ARMED_CONTACT: f32 = 1.5;

const ECHO_BURST: u32 = 3;
const ECHO_BURST_INTERVAL: f32 = 0.12;
const ECHO_BURST_COOLDOWN: f32 = 1.5;
pub const ECHO_BULLET_DAMAGE: f32 = 10.0;

const KAMIKAZE_TRIGGER: f32 = 22.0;
pub const KAMIKAZE_BLAST_RADIUS: f32 = 50.0;
pub const KAMIKAZE_BLAST_DAMAGE: f32 = 30.0;

const VANTAGE_PREFERRED: f32 = 350.0;
const VANTAGE_AIM_TIME: f32 = 1.2;
const VANTAGE_COOLDOWN: f32 = 1.5;
pub const VANTAGE_SHOT_DAMAGE: f32 = 30.0;

const RECHARGE_RADIUS: f32 = 120.0;
const RECHARGE_AMOUNT: f32 = 100.0;

const TACTICIAN_NEAR: f32 = 250.0;
const TACTICIAN_FAR: f32 = 400.0;

const SABOT_RANGE: f32 = 400.0;
const SABOT_CHARGE_TIME: f32 = 1.5;
const SABOT_DASH_SCALE: f32 = 2.5;
const SABOT_DASH_TIME: f32 = 1.0;
const SABOT_COOLDOWN: f32 = 2.0;
const SABOT_DASH_DAMAGE_TAKEN: f32 = 0.75;

const RADIUS_RANGE: f32 = 120.0;
const RADIUS_CHARGE_TIME: f32 = 2.0;
const RADIUS_COOLDOWN: f32 = 3.0;
pub const RADIUS_BLAST_DAMAGE: f32 = 35.0;

const SENTRY_RANGE: f32 = 600.0;
const SENTRY_AIM_TIME: f32 = 0.8;
const SENTRY_MAGAZINE: u32 = 8;
/// 200 rounds per minute.
const SENTRY_FIRE_INTERVAL: f32 = 60.0 / 200.0;
const SENTRY_RELOAD_TIME: f32 = 2.0;
pub const SENTRY_SHOT_DAMAGE: f32 = 35.0;

const JUGGERNAUT_ENRAGE_HEALTH: f32 = 75.0;
const JUGGERNAUT_ENRAGED_SPEED: f32 = 1.0 / 0.7;
const JUGGERNAUT_ENRAGED_CONTACT: f32 = 1.5;

/// Decide what `kind` does this frame. `dt` is scaled by the buff here.
pub fn think(
    kind: EnemyKind,
    brain: &mut Brain,
    view: &EnemyView,
    dt: f32,
    rng: &mut impl Rng,
) -> Decision {
    let dt = dt * view.buff;
    match kind {
        EnemyKind::Proxy => proxy(brain, view, dt),
        EnemyKind::Echo => echo(brain, view, dt),
        EnemyKind::Kamikaze => kamikaze(view),
        EnemyKind::Vantage => vantage(brain, view, dt),
        EnemyKind::Recharge => recharge(brain, view, dt, rng),
        EnemyKind::Tactician => tactician(view),
        EnemyKind::Sabot => sabot(brain, view, dt),
        EnemyKind::Radius => radius(brain, view, dt),
        EnemyKind::Sentry => sentry(brain, view, dt),
        EnemyKind::Juggernaut => juggernaut(view),
    }
}

/// Incoming damage multiplier on top of armor.
pub fn damage_taken_scale(kind: EnemyKind, brain: &Brain) -> f32 {
    if kind == EnemyKind::Sabot && brain.phase == Phase::Dashing {
        SABOT_DASH_DAMAGE_TAKEN
    } else {
        1.0
    }
}

fn chase_within(view: &EnemyView, range: f32) -> Vec2 {
    if view.distance() < range {
        view.to_player()
    } else {
        Vec2::ZERO
    }
}

fn proxy(brain: &mut Brain, view: &EnemyView, dt: f32) -> Decision {
    let mut decision = Decision::toward(view.to_player());
    match brain.phase {
        Phase::Idle if view.distance() < PROXY_ARM_RANGE => {
            brain.phase = Phase::Charging;
            brain.timer = PROXY_ARM_TIME;
        }
        Phase::Charging => {
            brain.timer -= dt;
            if brain.timer <= 0.0 {
                brain.phase = Phase::Armed;
            }
        }
        Phase::Armed => decision.contact_scale = PROXY_ARMED_CONTACT,
        _ => {}
    }
    decision
}

fn echo(brain: &mut Brain, view: &EnemyView, dt: f32) -> Decision {
    let mut decision = Decision::toward(chase_within(view, DETECTION_RANGE));
    brain.timer -= dt;
    let engaged = view.line_of_sight && view.distance() < DETECTION_RANGE;

    match brain.phase {
        Phase::Idle if engaged && brain.timer <= 0.0 => {
            brain.phase = Phase::Firing;
            brain.shots_left = ECHO_BURST;
            brain.timer = 0.0;
        }
        Phase::Firing if brain.timer <= 0.0 => {
            decision.action = Some(Action::Fire {
                direction: view.to_player(),
            });
            brain.shots_left = brain.shots_left.saturating_sub(1);
            if brain.shots_left == 0 {
                brain.phase = Phase::Idle;
                brain.timer = ECHO_BURST_COOLDOWN;
            } else {
                brain.timer = ECHO_BURST_INTERVAL;
            }
        }
        _ => {}
    }
    decision
}

fn kamikaze(view: &EnemyView) -> Decision {
    let mut decision = Decision::toward(chase_within(view, DETECTION_RANGE));
    if view.distance() < KAMIKAZE_TRIGGER {
        decision.action = Some(Action::Blast {
            radius: KAMIKAZE_BLAST_RADIUS,
            damage: KAMIKAZE_BLAST_DAMAGE,
            fatal: true,
        });
    }
    decision
}

/// Approach, back off or circle so the player stays between `near` and `far`.
fn keep_distance(view: &EnemyView, near: f32, far: f32) -> Vec2 {
    let to_player = view.to_player();
    let distance = view.distance();
    if distance > far {
        to_player
    } else if distance < near {
        -to_player
    } else {
        to_player.perp()
    }
}

fn vantage(brain: &mut Brain, view: &EnemyView, dt: f32) -> Decision {
    if view.distance() >= DETECTION_RANGE {
        brain.phase = Phase::Idle;
        return Decision::default();
    }
    let mut decision = Decision::toward(keep_distance(
        view,
        VANTAGE_PREFERRED - 30.0,
        VANTAGE_PREFERRED + 30.0,
    ));
    brain.timer -= dt;

    match brain.phase {
        Phase::Idle | Phase::Cooldown if view.line_of_sight && brain.timer <= 0.0 => {
            brain.phase = Phase::Aiming;
            brain.timer = VANTAGE_AIM_TIME;
        }
        Phase::Aiming if !view.line_of_sight => brain.phase = Phase::Idle,
        Phase::Aiming => {
            // Stands still while the laser tracks.
            decision.direction = Vec2::ZERO;
            decision.laser = Some(view.to_player());
            if brain.timer <= 0.0 {
                decision.action = Some(Action::Fire {
                    direction: view.to_player(),
                });
                brain.phase = Phase::Cooldown;
                brain.timer = VANTAGE_COOLDOWN;
            }
        }
        _ => {}
    }
    decision
}

fn random_heading(rng: &mut impl Rng) -> Vec2 {
    Vec2::from_angle(rng.random_range(0.0..std::f32::consts::TAU))
}

fn recharge(brain: &mut Brain, view: &EnemyView, dt: f32, rng: &mut impl Rng) -> Decision {
    let mut decision = Decision::default();

    brain.timer -= dt;
    if brain.timer <= 0.0 {
        brain.timer = rng.random_range(1.0..=3.0);
        decision.action = Some(Action::HealAllies {
            radius: RECHARGE_RADIUS,
            amount: RECHARGE_AMOUNT,
        });
    }

    brain.retarget -= dt;
    if brain.retarget <= 0.0 {
        brain.retarget = rng.random_range(0.5..=2.0);
        brain.heading = match view.nearest_ally {
            Some(ally) => {
                let jitter = rng.random_range(-FRAC_PI_4..=FRAC_PI_4);
                Vec2::from_angle(jitter).rotate((ally - view.position).normalize_or_zero())
            }
            None => random_heading(rng),
        };
    }
    decision.direction = brain.heading;
    decision
}

fn tactician(view: &EnemyView) -> Decision {
    Decision::toward(keep_distance(view, TACTICIAN_NEAR, TACTICIAN_FAR))
}

fn sabot(brain: &mut Brain, view: &EnemyView, dt: f32) -> Decision {
    brain.timer -= dt;
    match brain.phase {
        Phase::Idle | Phase::Cooldown => {
            let mut decision = Decision::toward(chase_within(view, DETECTION_RANGE));
            if brain.timer <= 0.0 && view.line_of_sight && view.distance() < SABOT_RANGE {
                brain.phase = Phase::Charging;
                brain.timer = SABOT_CHARGE_TIME;
                decision.direction = Vec2::ZERO;
            }
            decision
        }
        Phase::Charging => {
            if brain.timer <= 0.0 {
                brain.phase = Phase::Dashing;
                brain.timer = SABOT_DASH_TIME;
                brain.target = view.player;
            }
            Decision::default()
        }
        Phase::Dashing => {
            let offset = brain.target - view.position;
            if brain.timer <= 0.0 || offset.length() < 10.0 {
                brain.phase = Phase::Cooldown;
                brain.timer = SABOT_COOLDOWN;
                return Decision::default();
            }
            Decision {
                direction: offset.normalize_or_zero(),
                speed_scale: SABOT_DASH_SCALE,
                ..default()
            }
        }
        _ => {
            brain.phase = Phase::Idle;
            Decision::default()
        }
    }
}

fn radius(brain: &mut Brain, view: &EnemyView, dt: f32) -> Decision {
    brain.timer -= dt;
    match brain.phase {
        Phase::Charging => {
            if brain.timer > 0.0 {
                return Decision {
                    direction: view.to_player(),
                    speed_scale: 0.3,
                    ..default()
                };
            }
            brain.phase = Phase::Cooldown;
            brain.timer = RADIUS_COOLDOWN;
            Decision {
                action: Some(Action::Blast {
                    radius: RADIUS_RANGE,
                    damage: RADIUS_BLAST_DAMAGE,
                    fatal: false,
                }),
                ..default()
            }
        }
        _ => {
            if brain.timer <= 0.0 && view.distance() < RADIUS_RANGE {
                brain.phase = Phase::Charging;
                brain.timer = RADIUS_CHARGE_TIME;
            }
            Decision::toward(view.to_player())
        }
    }
}

fn sentry(brain: &mut Brain, view: &EnemyView, dt: f32) -> Decision {
    let mut decision = Decision::default();
    let engaged = view.line_of_sight && view.distance() < SENTRY_RANGE;
    brain.timer -= dt;

    match brain.phase {
        Phase::Reloading => {
            if brain.timer <= 0.0 {
                brain.phase = Phase::Idle;
            }
        }
        _ if !engaged => brain.phase = Phase::Idle,
        Phase::Idle => {
            brain.phase = Phase::Aiming;
            brain.timer = SENTRY_AIM_TIME;
            decision.laser = Some(view.to_player());
        }
        Phase::Aiming => {
            decision.laser = Some(view.to_player());
            if brain.timer <= 0.0 {
                brain.phase = Phase::Firing;
                brain.shots_left = SENTRY_MAGAZINE;
                brain.timer = 0.0;
            }
        }
        Phase::Firing => {
            decision.laser = Some(view.to_player());
            if brain.timer <= 0.0 {
                decision.action = Some(Action::Fire {
                    direction: view.to_player(),
                });
                brain.shots_left = brain.shots_left.saturating_sub(1);
                if brain.shots_left == 0 {
                    brain.phase = Phase::Reloading;
                    brain.timer = SENTRY_RELOAD_TIME;
                } else {
                    brain.timer = SENTRY_FIRE_INTERVAL;
                }
            }
        }
        _ => brain.phase = Phase::Idle,
    }
    decision
}

pub fn is_enraged(kind: EnemyKind, health: f32) -> bool {
    kind == EnemyKind::Juggernaut && health < JUGGERNAUT_ENRAGE_HEALTH
}

fn juggernaut(view: &EnemyView) -> Decision {
    let mut decision = Decision::toward(view.to_player());
    if is_enraged(EnemyKind::Juggernaut, view.health) {
        decision.speed_scale = JUGGERNAUT_ENRAGED_SPEED;
        decision.contact_scale = JUGGERNAUT_ENRAGED_CONTACT;
    }
    decision
}

/// Accelerate along `desired`, damp sideways drift, then apply drag.
pub fn steer(
    velocity: Vec2,
    desired: Vec2,
    max_speed: f32,
    acceleration: f32,
    drag: f32,
    dt: f32,
) -> Vec2 {
    let mut velocity = velocity;
    if desired != Vec2::ZERO {
        let forward_dir = desired.normalize();
        let forward = velocity.dot(forward_dir);
        let lateral = velocity - forward_dir * forward;
        let forward = (forward + acceleration * dt).min(max_speed);
        velocity = forward_dir * forward + lateral * 0.9;
    }
    velocity - velocity * (drag * dt).min(1.0)
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn view(position: Vec2, player: Vec2) -> EnemyView {
        EnemyView {
            position,
            player,
            line_of_sight: true,
            health: 100.0,
            max_health: 100.0,
            buff: 1.0,
            nearest_ally: None,
        }
    }

    fn run(kind: EnemyKind, brain: &mut Brain, view: &EnemyView, secs: f32) -> Vec<Decision> {
        let mut rng = StdRng::seed_from_u64(5);
        let steps = (secs / 0.05).round() as usize;
        (0..steps)
            .map(|_| think(kind, brain, view, 0.05, &mut rng))
            .collect()
    }

    fn fired(decisions: &[Decision]) -> usize {
        decisions
            .iter()
            .filter(|d| matches!(d.action, Some(Action::Fire { .. })))
            .count()
    }

    #[test]
    fn test_proxy_arms_when_close() {
        let mut brain = Brain::default();
        let far = view(Vec2::ZERO, Vec2::new(300.0, 0.0));
        let decisions = run(EnemyKind::Proxy, &mut brain, &far, 3.0);
        assert_eq!(brain.phase, Phase::Idle);
        assert_eq!(decisions[0].direction, Vec2::X);

        let near = view(Vec2::ZERO, Vec2::new(100.0, 0.0));
        run(EnemyKind::Proxy, &mut brain, &near, 1.0);
        assert_eq!(brain.phase, Phase::Charging);
        let decisions = run(EnemyKind::Proxy, &mut brain, &near, 1.5);
        assert_eq!(brain.phase, Phase::Armed);
        assert_eq!(decisions.last().unwrap().contact_scale, PROXY_ARMED_CONTACT);
    }

    #[test]
    fn test_echo_fires_three_round_bursts_with_sight() {
        let mut brain = Brain::default();
        let seen = view(Vec2::ZERO, Vec2::new(200.0, 0.0));
        let decisions = run(EnemyKind::Echo, &mut brain, &seen, 1.0);
        assert_eq!(fired(&decisions), 3);

        let mut brain = Brain::default();
        let hidden = EnemyView {
            line_of_sight: false,
            ..seen
        };
        assert_eq!(fired(&run(EnemyKind::Echo, &mut brain, &hidden, 3.0)), 0);
    }

    #[test]
    fn test_echo_ignores_distant_player() {
        let mut brain = Brain::default();
        let far = view(Vec2::ZERO, Vec2::new(800.0, 0.0));
        let decisions = run(EnemyKind::Echo, &mut brain, &far, 2.0);
        assert_eq!(fired(&decisions), 0);
        assert_eq!(decisions[0].direction, Vec2::ZERO);
    }

    #[test]
    fn test_kamikaze_blows_up_on_contact() {
        let mut brain = Brain::default();
        let mut rng = StdRng::seed_from_u64(0);
        let close = view(Vec2::ZERO, Vec2::new(10.0, 0.0));
        let decision = think(EnemyKind::Kamikaze, &mut brain, &close, 0.016, &mut rng);
        assert_eq!(
            decision.action,
            Some(Action::Blast {
                radius: KAMIKAZE_BLAST_RADIUS,
                damage: KAMIKAZE_BLAST_DAMAGE,
                fatal: true
            })
        );
    }

    #[test]
    fn test_vantage_aims_before_firing() {
        let mut brain = Brain::default();
        let seen = view(Vec2::ZERO, Vec2::new(350.0, 0.0));
        let decisions = run(EnemyKind::Vantage, &mut brain, &seen, 1.1);
        assert_eq!(fired(&decisions), 0);
        assert_eq!(decisions.last().unwrap().laser, Some(Vec2::X));

        let decisions = run(EnemyKind::Vantage, &mut brain, &seen, 0.2);
        assert_eq!(fired(&decisions), 1);
        assert_eq!(brain.phase, Phase::Cooldown);
    }

    #[test]
    fn test_vantage_keeps_its_distance() {
        let mut brain = Brain::default();
        let mut rng = StdRng::seed_from_u64(0);
        let hidden = |player| EnemyView {
            line_of_sight: false,
            ..view(Vec2::ZERO, player)
        };
        let close = think(EnemyKind::Vantage, &mut brain, &hidden(Vec2::new(100.0, 0.0)), 0.01, &mut rng);
        assert_eq!(close.direction, Vec2::NEG_X);
        let far = think(EnemyKind::Vantage, &mut brain, &hidden(Vec2::new(450.0, 0.0)), 0.01, &mut rng);
        assert_eq!(far.direction, Vec2::X);
    }

    #[test]
    fn test_recharge_heals_on_a_timer_and_follows_allies() {
        let mut brain = Brain::default();
        let mut with_ally = view(Vec2::ZERO, Vec2::new(300.0, 0.0));
        with_ally.nearest_ally = Some(Vec2::new(0.0, 100.0));
        let decisions = run(EnemyKind::Recharge, &mut brain, &with_ally, 3.2);
        let heals = decisions
            .iter()
            .filter(|d| matches!(d.action, Some(Action::HealAllies { .. })))
            .count();
        assert!((2..=4).contains(&heals), "{heals}");
        // Within 45 degrees of the ally.
        assert!(brain.heading.angle_to(Vec2::Y).abs() <= FRAC_PI_4 + 1e-4);
    }

    #[test]
    fn test_buff_speeds_up_timers() {
        let seen = view(Vec2::ZERO, Vec2::new(350.0, 0.0));
        let buffed = EnemyView { buff: 1.25, ..seen };
        let mut normal = Brain::default();
        let mut fast = Brain::default();
        let slow_shots = fired(&run(EnemyKind::Vantage, &mut normal, &seen, 1.1));
        let fast_shots = fired(&run(EnemyKind::Vantage, &mut fast, &buffed, 1.1));
        assert_eq!(slow_shots, 0);
        assert_eq!(fast_shots, 1);
    }

    #[test]
    fn test_sabot_charges_then_dashes_at_locked_target() {
        let mut brain = Brain::default();
        let seen = view(Vec2::ZERO, Vec2::new(300.0, 0.0));
        run(EnemyKind::Sabot, &mut brain, &seen, 0.05);
        assert_eq!(brain.phase, Phase::Charging);
        run(EnemyKind::Sabot, &mut brain, &seen, 1.6);
        assert_eq!(brain.phase, Phase::Dashing);
        assert_eq!(brain.target, seen.player);
        assert_eq!(damage_taken_scale(EnemyKind::Sabot, &brain), SABOT_DASH_DAMAGE_TAKEN);

        // The player moved, the dash still goes for the locked spot.
        let moved = view(Vec2::ZERO, Vec2::new(0.0, 300.0));
        let decision = run(EnemyKind::Sabot, &mut brain, &moved, 0.05)[0];
        assert_eq!(decision.direction, Vec2::X);
        assert_eq!(decision.speed_scale, SABOT_DASH_SCALE);
    }

    #[test]
    fn test_radius_detonates_and_survives() {
        let mut brain = Brain::default();
        let near = view(Vec2::ZERO, Vec2::new(80.0, 0.0));
        let decisions = run(EnemyKind::Radius, &mut brain, &near, 2.2);
        let blasts: Vec<_> = decisions.iter().filter_map(|d| d.action).collect();
        assert_eq!(
            blasts,
            vec![Action::Blast {
                radius: RADIUS_RANGE,
                damage: RADIUS_BLAST_DAMAGE,
                fatal: false
            }]
        );
        assert_eq!(brain.phase, Phase::Cooldown);
    }

    #[test]
    fn test_sentry_empties_magazine_then_reloads() {
        let mut brain = Brain::default();
        let seen = view(Vec2::ZERO, Vec2::new(200.0, 0.0));
        let decisions = run(EnemyKind::Sentry, &mut brain, &seen, 4.0);
        assert_eq!(fired(&decisions), SENTRY_MAGAZINE as usize);
        assert_eq!(brain.phase, Phase::Reloading);
        assert!(decisions.iter().all(|d| d.direction == Vec2::ZERO));
    }

    #[test]
    fn test_juggernaut_enrages_when_hurt() {
        let mut brain = Brain::default();
        let mut rng = StdRng::seed_from_u64(0);
        let mut hurt = view(Vec2::ZERO, Vec2::X * 100.0);
        hurt.health = 60.0;
        let decision = think(EnemyKind::Juggernaut, &mut brain, &hurt, 0.016, &mut rng);
        assert!(decision.speed_scale > 1.4);
        assert_eq!(decision.contact_scale, JUGGERNAUT_ENRAGED_CONTACT);
    }

    #[test]
    fn test_steer_caps_speed_and_damps_drift() {
        let mut velocity = Vec2::new(0.0, 50.0);
        for _ in 0..200 {
            velocity = steer(velocity, Vec2::X, 100.0, 500.0, 0.0, 0.05);
        }
        assert!((velocity.x - 100.0).abs() < 1e-3);
        assert!(velocity.y.abs() < 1e-3);

        let stopped = steer(Vec2::new(100.0, 0.0), Vec2::ZERO, 100.0, 500.0, 5.0, 0.1);
        assert!((stopped.x - 50.0).abs() < 1e-3);
    }
}
