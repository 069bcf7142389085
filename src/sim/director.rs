//! Enemy director
//!
//! Adaptive spawner. Reads the smoothed combat rating once per frame and
//! derives population targets, spawn rate and enemy multipliers from it.
//! Spawns are paid for out of a fractional budget so the rate stays smooth
//! across frame times.

use glam::DVec2;
use serde::Serialize;

use super::entities::{AiKind, DamageTextBuffer, Enemy, EnemyKind, EnemyStatus};
use super::numeric::{clamp_finite, safe_non_neg, safe_number};
use super::state::SimulationState;
use crate::consts::*;

/// Static description of an enemy archetype
#[derive(Debug, Clone, Copy)]
pub struct EnemyDef {
    pub kind: EnemyKind,
    pub width: f64,
    pub height: f64,
    pub hp: f64,
    /// Multiplier on the base enemy speed
    pub speed: f64,
    pub damage: f64,
    pub exp: f64,
    pub ai: AiKind,
    pub weight: f64,
    /// Director progress required before this type can be drawn
    pub unlock: f64,
    pub armor: f64,
    pub orbit_radius: f64,
    pub keep_distance: f64,
    pub split_count: u32,
    pub split_kind: EnemyKind,
    pub shoot_interval: f64,
    pub bullet_speed: f64,
    pub elite: bool,
}

#[allow(clippy::too_many_arguments)]
const fn def(
    kind: EnemyKind,
    width: f64,
    height: f64,
    hp: f64,
    speed: f64,
    damage: f64,
    exp: f64,
    ai: AiKind,
    weight: f64,
    unlock: f64,
) -> EnemyDef {
    EnemyDef {
        kind,
        width,
        height,
        hp,
        speed,
        damage,
        exp,
        ai,
        weight,
        unlock,
        armor: 0.0,
        orbit_radius: 180.0,
        keep_distance: 220.0,
        split_count: 0,
        split_kind: EnemyKind::Swarm,
        shoot_interval: 2.0,
        bullet_speed: 250.0,
        elite: false,
    }
}

use super::entities::AiKind as A;
use super::entities::EnemyKind as K;

/// Every enemy archetype. Elites are drawn by their own roll, never by weight.
pub static ENEMY_DEFS: [EnemyDef; 16] = [
    def(K::Grunt, 30.0, 30.0, 30.0, 1.00, 1.00, 1.00, A::Chase, 45.0, 0.00),
    def(K::Runner, 24.0, 24.0, 22.0, 1.55, 0.95, 0.85, A::Chase, 25.0, 0.00),
    def(K::Brute, 44.0, 30.0, 60.0, 0.85, 1.30, 1.60, A::Chase, 12.0, 0.15),
    def(K::Tank, 52.0, 52.0, 110.0, 0.70, 1.45, 2.40, A::Chase, 8.0, 0.30),
    EnemyDef {
        armor: 0.35,
        ..def(K::Shielder, 34.0, 34.0, 48.0, 1.00, 1.10, 1.50, A::Chase, 10.0, 0.20)
    },
    def(K::Zigzag, 30.0, 30.0, 40.0, 1.15, 1.05, 1.35, A::Zigzag, 10.0, 0.25),
    EnemyDef {
        orbit_radius: 170.0,
        ..def(K::Orbiter, 30.0, 30.0, 42.0, 1.10, 1.05, 1.40, A::Orbit, 9.0, 0.30)
    },
    def(K::Dasher, 28.0, 28.0, 36.0, 1.05, 1.25, 1.45, A::Dash, 10.0, 0.20),
    EnemyDef {
        keep_distance: 200.0,
        ..def(K::Ranger, 34.0, 22.0, 46.0, 1.10, 1.10, 1.50, A::Kite, 7.0, 0.35)
    },
    def(K::Spawner, 38.0, 38.0, 70.0, 0.80, 1.20, 2.20, A::Spawner, 5.0, 0.45),
    EnemyDef {
        split_count: 3,
        split_kind: K::Swarm,
        ..def(K::Splitter, 40.0, 40.0, 78.0, 0.90, 1.25, 2.60, A::Chase, 4.0, 0.50)
    },
    def(K::Swarm, 18.0, 18.0, 14.0, 1.80, 0.80, 0.55, A::Chase, 6.0, 0.00),
    def(K::Predictor, 32.0, 32.0, 45.0, 1.20, 1.15, 1.70, A::Predict, 8.0, 0.25),
    def(K::Flanker, 26.0, 26.0, 35.0, 1.35, 1.10, 1.40, A::Flank, 9.0, 0.20),
    EnemyDef {
        shoot_interval: 1.8,
        bullet_speed: 280.0,
        ..def(K::Shooter, 28.0, 28.0, 32.0, 0.75, 1.00, 1.80, A::Ranged, 6.0, 0.35)
    },
    EnemyDef {
        elite: true,
        ..def(K::Elite, 58.0, 58.0, 180.0, 1.00, 1.90, 4.20, A::Chase, 2.0, 0.55)
    },
];

/// Definition for `kind`
pub fn enemy_def(kind: EnemyKind) -> &'static EnemyDef {
    ENEMY_DEFS
        .iter()
        .find(|d| d.kind == kind)
        .unwrap_or(&ENEMY_DEFS[0])
}

/// Spawn rate before population feedback
pub fn base_spawn_rate(level: u32, strength: f64) -> f64 {
    clamp_finite(1.2 + level as f64 * 0.08 + strength * 2.4, 0.8, 8.0)
}

/// Spawn rate with population feedback: boosted under 75% of target,
/// throttled over 110%, zero at the hard cap
pub fn compute_spawn_rate(level: u32, strength: f64, population: usize, target: usize, max: usize) -> f64 {
    let n = population as f64;
    let mut rate = base_spawn_rate(level, strength);
    if n < target as f64 * 0.75 {
        rate *= 1.35;
    }
    if n > target as f64 * 1.10 {
        rate *= 0.25;
    }
    if population >= max {
        rate = 0.0;
    }
    rate
}

/// Adaptive director state
#[derive(Debug, Clone, Serialize)]
pub struct Director {
    pub last_t: Option<f64>,
    pub spawn_budget: f64,
    /// Enemies per second
    pub spawn_rate: f64,
    /// Normalized combat rating, in [0, 1.8]
    pub strength: f64,
    /// Enemy hp multiplier
    pub diff: f64,
    /// Enemy contact damage multiplier
    pub dmg_mul: f64,
    pub speed_mul: f64,
    pub target_enemies: usize,
    pub max_enemies: usize,
    pub elite_chance: f64,
    /// Unlock progress for enemy types, in [0, 1]
    pub progress: f64,
}

impl Default for Director {
    fn default() -> Self {
        Self {
            last_t: None,
            spawn_budget: 0.0,
            spawn_rate: 1.8,
            strength: 0.0,
            diff: 1.0,
            dmg_mul: 1.0,
            speed_mul: 1.0,
            target_enemies: 15,
            max_enemies: 80,
            elite_chance: 0.06,
            progress: 0.0,
        }
    }
}

impl Director {
    /// Recompute multipliers, population targets and spawn rate
    pub fn retune(&mut self, level: u32, strength: f64, time_alive: f64, population: usize) {
        let lvl = level as f64;
        let s = clamp_finite(strength, 0.0, 1.8);
        let time_prog = clamp_finite(time_alive / 240.0, 0.0, 1.0);

        self.strength = s;
        self.progress = clamp_finite(0.55 * time_prog + 0.45 * clamp_finite(s / 1.2, 0.0, 1.0), 0.0, 1.0);

        self.diff = clamp_finite(1.0 + (lvl - 1.0) * 0.13 + s * 1.1, 1.0, 8.0);
        self.dmg_mul = clamp_finite(1.0 + (lvl - 1.0) * 0.12 + s * 0.35, 1.0, 5.0);
        self.speed_mul = clamp_finite(1.0 + (lvl - 1.0) * 0.04 + s * 0.25 + time_prog * 0.3, 1.0, 2.0);

        self.target_enemies = clamp_finite(12.0 + lvl + s * 20.0, 12.0, 120.0).round() as usize;
        self.max_enemies = clamp_finite(self.target_enemies as f64 + 30.0 + s * 20.0, 50.0, 160.0).round() as usize;

        self.spawn_rate = compute_spawn_rate(level, s, population, self.target_enemies, self.max_enemies);
        self.elite_chance = clamp_finite(0.04 + 0.08 * s + 0.08 * self.progress, 0.04, 0.30);
    }
}

/// One director update. Runs on real time even when the frame is paused so
/// resuming never triggers a burst.
pub fn step(state: &mut SimulationState, now: f64) {
    let dt_base = match state.director.last_t {
        Some(last) => {
            let dt = now - last;
            if dt.is_finite() && dt > 0.0 { dt } else { DEFAULT_DT }
        }
        None => DEFAULT_DT,
    };
    let dt_base = dt_base.clamp(MIN_DT, MAX_DT);
    state.director.last_t = Some(now);

    if state.paused || state.game_over {
        return;
    }

    let time_scale = if state.time_warp_active && now < state.time_warp_end {
        DIRECTOR_TIME_WARP_SCALE
    } else {
        1.0
    };
    let hit_scale = if state.settings.hit_stop_enabled && now < state.hit_stop_end {
        state.hit_stop_scale
    } else {
        1.0
    };
    let dt = dt_base * time_scale * hit_scale;

    state.update_combat_rating(now);

    let strength = clamp_finite(state.combat.rating_smooth / 650.0, 0.0, 1.8);
    let time_alive = (now - state.start_time).max(0.0);
    let level = state.player.level;
    let population = state.enemies.len();
    state.director.retune(level, strength, time_alive, population);

    let d = &mut state.director;
    d.spawn_budget = safe_non_neg(d.spawn_budget + d.spawn_rate * dt, 0.0);

    let mut spawned = 0;
    while state.director.spawn_budget >= 1.0
        && spawned < MAX_SPAWNS_PER_TICK
        && state.enemies.len() < state.director.max_enemies
    {
        spawn_enemy(state, now);
        state.director.spawn_budget -= 1.0;
        spawned += 1;
    }

    if spawned > 1 {
        log::debug!(
            "Director spawned {} (alive {}, target {}, rate {:.2})",
            spawned,
            state.enemies.len(),
            state.director.target_enemies,
            state.director.spawn_rate
        );
    }
}

/// Elite roll first, then a weighted draw among unlocked non-elite types
pub fn pick_enemy_def(state: &mut SimulationState) -> &'static EnemyDef {
    let progress = clamp_finite(state.director.progress, 0.0, 1.0);
    let elite_chance = state.director.elite_chance;
    let weight_scale = 1.0 + state.director.strength * 0.35;

    if state.chance(elite_chance) {
        return enemy_def(EnemyKind::Elite);
    }

    let pool = || {
        ENEMY_DEFS
            .iter()
            .filter(move |d| !d.elite && progress >= d.unlock)
            .map(move |d| (d, safe_non_neg(d.weight, 1.0) * weight_scale))
    };

    let total: f64 = pool().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return enemy_def(EnemyKind::Grunt);
    }

    let mut r = state.rand_range(0.0, total);
    for (d, w) in pool() {
        r -= w;
        if r <= 0.0 {
            return d;
        }
    }
    enemy_def(EnemyKind::Grunt)
}

/// Spawn one director-picked enemy just outside the viewport
pub fn spawn_enemy(state: &mut SimulationState, now: f64) -> usize {
    let def = pick_enemy_def(state);

    let half_w = state.settings.viewport_width * 0.5 + SPAWN_PADDING;
    let half_h = state.settings.viewport_height * 0.5 + SPAWN_PADDING;
    let center = state.player.pos;

    let side = state.rand_range(0.0, 1.0);
    let mut pos = if side < 0.25 {
        DVec2::new(center.x - half_w, center.y + state.rand_range(-half_h, half_h))
    } else if side < 0.50 {
        DVec2::new(center.x + half_w, center.y + state.rand_range(-half_h, half_h))
    } else if side < 0.75 {
        DVec2::new(center.x + state.rand_range(-half_w, half_w), center.y - half_h)
    } else {
        DVec2::new(center.x + state.rand_range(-half_w, half_w), center.y + half_h)
    };

    pos.x += state.rand_range(-SPAWN_JITTER, SPAWN_JITTER);
    pos.y += state.rand_range(-SPAWN_JITTER, SPAWN_JITTER);

    create_enemy_from_def(state, def, pos, now, false)
}

/// Spawn an enemy of `kind` at `pos`; returns its index
pub fn spawn_enemy_at(state: &mut SimulationState, kind: EnemyKind, pos: DVec2, now: f64, minion: bool) -> usize {
    create_enemy_from_def(state, enemy_def(kind), pos, now, minion)
}

/// Instantiate `def`, scaled by the director's current multipliers
pub fn create_enemy_from_def(
    state: &mut SimulationState,
    def: &EnemyDef,
    pos: DVec2,
    now: f64,
    minion: bool,
) -> usize {
    let d = &state.director;
    let diff = safe_number(d.diff, 1.0);
    let speed_mul = safe_number(d.speed_mul, 1.0);
    let strength = safe_number(d.strength, 0.0);

    let hp = clamp_finite(safe_non_neg(def.hp, 30.0) * diff, 1.0, 200_000.0);
    let speed = safe_non_neg(
        state.settings.base_enemy_speed * safe_non_neg(def.speed, 1.0) * speed_mul * (1.0 + strength * 0.18),
        10.0,
    );

    let next_shot = now + state.rand_range(0.5, 1.5);
    let ai_seed = state.rand_range(0.0, 1000.0);
    let flank_angle = state.rand_range(0.0, std::f64::consts::TAU);
    let id = state.next_entity_id();

    state.enemies.push(Enemy {
        id,
        kind: def.kind,
        ai: def.ai,
        pos,
        size: DVec2::new(safe_non_neg(def.width, 30.0), safe_non_neg(def.height, 30.0)),
        rot: 0.0,
        hp,
        max_hp: hp,
        speed,
        armor: clamp_finite(def.armor, 0.0, 0.85),
        damage_mul: clamp_finite(def.damage, 0.2, 5.0),
        exp_mul: clamp_finite(def.exp, 0.1, 20.0),
        orbit_radius: def.orbit_radius,
        keep_distance: def.keep_distance,
        split_count: def.split_count,
        split_kind: def.split_kind,
        shoot_interval: def.shoot_interval,
        bullet_speed: def.bullet_speed,
        minion,
        elite: def.elite,
        next_shot,
        next_dash: 0.0,
        dash_end: 0.0,
        next_spawn: 0.0,
        ai_seed,
        predicted: pos,
        flank_angle,
        status: EnemyStatus::default(),
        damage_text: DamageTextBuffer::default(),
        last_hit_fx: 0.0,
        hit_flash_until: 0.0,
        dead: false,
        kill_queued: false,
        killed: false,
        removed: false,
    });
    state.enemies.len() - 1
}

/// Scatter `count` minions of `kind` around `origin`
pub fn spawn_minions(state: &mut SimulationState, kind: EnemyKind, origin: DVec2, count: u32, now: f64) {
    let def = enemy_def(kind);
    for _ in 0..count.max(1) {
        let angle = state.rand_range(0.0, std::f64::consts::TAU);
        let r = state.rand_range(10.0, 22.0);
        create_enemy_from_def(state, def, origin + crate::direction(angle) * r, now, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;
    use proptest::prelude::*;

    #[test]
    fn test_defs_complete() {
        assert_eq!(ENEMY_DEFS.len(), 16);
        assert_eq!(enemy_def(EnemyKind::Shielder).armor, 0.35);
        assert_eq!(enemy_def(EnemyKind::Splitter).split_count, 3);
        assert_eq!(enemy_def(EnemyKind::Orbiter).orbit_radius, 170.0);
        assert_eq!(enemy_def(EnemyKind::Grunt).orbit_radius, 180.0);
        assert!(enemy_def(EnemyKind::Elite).elite);
        assert_eq!(ENEMY_DEFS.iter().filter(|d| d.elite).count(), 1);
    }

    #[test]
    fn test_retune_baseline() {
        let mut d = Director::default();
        d.retune(1, 0.0, 0.0, 0);
        assert_eq!(d.diff, 1.0);
        assert_eq!(d.target_enemies, 13);
        assert_eq!(d.max_enemies, 50);
        assert!((d.spawn_rate - 1.28 * 1.35).abs() < 1e-9);
        assert_eq!(d.elite_chance, 0.04);
    }

    #[test]
    fn test_retune_bounded() {
        let mut d = Director::default();
        d.retune(500, 50.0, 1e9, 0);
        assert_eq!(d.diff, 8.0);
        assert_eq!(d.dmg_mul, 5.0);
        assert_eq!(d.speed_mul, 2.0);
        assert_eq!(d.target_enemies, 120);
        assert_eq!(d.max_enemies, 160);
        assert!((d.elite_chance - 0.264).abs() < 1e-9);
        assert_eq!(d.progress, 1.0);
    }

    #[test]
    fn test_step_spawns_outside_viewport() {
        let mut state = SimulationState::new(5, Settings::default(), 0.0);
        state.director.spawn_budget = 3.5;
        step(&mut state, 0.0);
        assert_eq!(state.enemies.len(), 3);
        for e in &state.enemies {
            let off = e.pos - state.player.pos;
            assert!(off.x.abs() >= 400.0 + SPAWN_PADDING - SPAWN_JITTER || off.y.abs() >= 300.0 + SPAWN_PADDING - SPAWN_JITTER);
        }
    }

    #[test]
    fn test_step_caps_spawns_per_tick() {
        let mut state = SimulationState::new(5, Settings::default(), 0.0);
        state.director.spawn_budget = 100.0;
        step(&mut state, 0.0);
        assert_eq!(state.enemies.len(), MAX_SPAWNS_PER_TICK as usize);
    }

    #[test]
    fn test_step_skipped_while_paused() {
        let mut state = SimulationState::new(5, Settings::default(), 0.0);
        state.paused = true;
        state.director.spawn_budget = 5.0;
        step(&mut state, 1.0);
        assert!(state.enemies.is_empty());
        assert_eq!(state.director.last_t, Some(1.0));
    }

    #[test]
    fn test_population_never_exceeds_max() {
        let mut state = SimulationState::new(5, Settings::default(), 0.0);
        let mut now = 0.0;
        for _ in 0..20_000 {
            now += 0.05;
            step(&mut state, now);
            assert!(state.enemies.len() <= state.director.max_enemies);
        }
        // Nothing dies here, so the population settles at the cap
        assert_eq!(state.enemies.len(), state.director.max_enemies);
        assert_eq!(state.director.spawn_rate, 0.0);
    }

    #[test]
    fn test_enemy_scaled_by_director() {
        let mut state = SimulationState::new(5, Settings::default(), 0.0);
        state.director.diff = 2.0;
        state.director.speed_mul = 1.5;
        let idx = spawn_enemy_at(&mut state, EnemyKind::Grunt, DVec2::ZERO, 0.0, false);
        let e = &state.enemies[idx];
        assert_eq!(e.hp, 60.0);
        assert_eq!(e.max_hp, 60.0);
        assert!((e.speed - 120.0).abs() < 1e-9);
        assert!(e.next_shot >= 0.5 && e.next_shot < 1.5);
    }

    #[test]
    fn test_minions_flagged() {
        let mut state = SimulationState::new(5, Settings::default(), 0.0);
        spawn_minions(&mut state, EnemyKind::Swarm, DVec2::new(100.0, 0.0), 3, 0.0);
        assert_eq!(state.enemies.len(), 3);
        for e in &state.enemies {
            assert!(e.minion);
            assert_eq!(e.kind, EnemyKind::Swarm);
            let d = e.pos.distance(DVec2::new(100.0, 0.0));
            assert!((10.0..=22.0).contains(&d));
        }
    }

    #[test]
    fn test_locked_types_never_drawn() {
        let mut state = SimulationState::new(5, Settings::default(), 0.0);
        state.director.elite_chance = 0.0;
        state.director.progress = 0.0;
        for _ in 0..500 {
            let def = pick_enemy_def(&mut state);
            assert!(def.unlock <= 0.0);
        }
    }

    proptest! {
        #[test]
        fn test_spawn_rate_zero_at_cap(level in 1u32..200, strength in 0.0..1.8f64, extra in 0usize..100) {
            let mut d = Director::default();
            d.retune(level, strength, 0.0, 0);
            let rate = compute_spawn_rate(level, strength, d.max_enemies + extra, d.target_enemies, d.max_enemies);
            prop_assert_eq!(rate, 0.0);
        }

        #[test]
        fn test_spawn_rate_boosted_under_target(level in 1u32..200, strength in 0.0..1.8f64, frac in 0.0..0.75f64) {
            let mut d = Director::default();
            d.retune(level, strength, 0.0, 0);
            let population = (d.target_enemies as f64 * frac).floor() as usize;
            prop_assume!((population as f64) < d.target_enemies as f64 * 0.75);
            let rate = compute_spawn_rate(level, strength, population, d.target_enemies, d.max_enemies);
            prop_assert!(rate > base_spawn_rate(level, strength));
        }
    }
}
