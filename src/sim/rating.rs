//! Combat rating
//!
//! Turns the last 30 seconds of play into a single unbounded power score.
//! The director reads the smoothed value to scale spawns and difficulty.

use std::collections::VecDeque;

use serde::Serialize;

use super::numeric::{clamp_finite, lerp, safe_non_neg, safe_number};
use super::player::{AcquiredSkill, PlayerStats};
use super::state::SimulationState;
use crate::Settings;

/// Sliding window length in seconds
pub const RATING_WINDOW: f64 = 30.0;
/// Minimum spacing between recomputations
pub const RATING_EVAL_INTERVAL: f64 = 0.15;

/// Timestamped samples for one metric
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventWindow {
    samples: VecDeque<(f64, f64)>,
}

impl EventWindow {
    pub fn push(&mut self, t: f64, value: f64) {
        self.samples.push_back((t, safe_non_neg(value, 0.0)));
    }

    /// Drop samples older than `t - window`
    pub fn prune(&mut self, t: f64, window: f64) {
        let cutoff = t - window;
        while self.samples.front().is_some_and(|&(st, _)| st < cutoff) {
            self.samples.pop_front();
        }
    }

    /// Sum of samples inside the window ending at `t`
    pub fn sum(&mut self, t: f64, window: f64) -> f64 {
        self.prune(t, window);
        safe_non_neg(self.samples.iter().map(|&(_, v)| v).sum(), 0.0)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Micro-events batched between flushes
#[derive(Debug, Clone, Default, Serialize)]
struct Accumulator {
    kills: f64,
    damage_dealt: f64,
    damage_taken: f64,
    exp: f64,
    level_ups: f64,
}

/// Rates fed into the rating formula
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatingInputs {
    pub kills_per_min: f64,
    pub damage_per_sec: f64,
    pub damage_taken_per_sec: f64,
    pub exp_per_sec: f64,
    pub levels_per_min: f64,
    pub build_dps: f64,
    pub skill_score: f64,
    pub hp_ratio: f64,
    /// Seconds since the player was last hit
    pub since_hit: f64,
}

/// log1p-normalized metric; reaches 1.0 at `reference` and keeps growing
fn normalize(value: f64, reference: f64) -> f64 {
    (value.max(0.0).ln_1p() / reference.ln_1p()).max(0.0)
}

/// Rating for a set of rates: 1000 × weighted sum, floored at 0
pub fn compute_rating(inputs: &RatingInputs) -> f64 {
    let efficiency = inputs.damage_per_sec / inputs.damage_taken_per_sec.max(1.0);
    let calm = clamp_finite(inputs.since_hit / RATING_WINDOW, 0.0, 1.0);
    let hp = clamp_finite(inputs.hp_ratio, 0.0, 1.0);

    let raw = 0.18 * normalize(inputs.build_dps, 1200.0)
        + 0.18 * normalize(inputs.damage_per_sec, 900.0)
        + 0.16 * normalize(inputs.kills_per_min, 80.0)
        + 0.12 * normalize(inputs.exp_per_sec, 120.0)
        + 0.10 * normalize(inputs.levels_per_min, 10.0)
        + 0.10 * normalize(inputs.skill_score, 120.0)
        + 0.08 * normalize(efficiency, 12.0)
        + 0.05 * calm
        + 0.03 * hp;

    safe_non_neg(1000.0 * raw, 0.0)
}

/// Rough sustained damage output implied by the stat block alone
pub fn estimate_build_dps(s: &PlayerStats) -> f64 {
    let crit = 1.0 + clamp_finite(s.crit_rate, 0.0, 1.0) * (safe_number(s.crit_damage_multi, 2.0) - 1.0);
    let interval = safe_number(s.shoot_interval, 0.6).max(0.06);
    let bullets = safe_non_neg(s.bullet_damage * crit * s.bullet_count as f64 / interval, 0.0);

    // Drones fire every 0.8s and miss some shots
    let drones = if s.drone_count > 0 {
        safe_non_neg(s.bullet_damage * crit * s.drone_count as f64 * (1.0 / 0.8) * 0.65, 0.0)
    } else {
        0.0
    };

    let blades = safe_non_neg(
        s.blade_orbit_count as f64 * s.blade_orbit_damage * s.blade_orbit_speed * 0.55,
        0.0,
    );
    let shields = safe_non_neg(
        s.orbital_shield_count as f64 * s.orbital_shield_damage * s.orbital_shield_speed * 0.35,
        0.0,
    );
    let aura = if s.lightning_aura_enabled {
        safe_non_neg(s.lightning_aura_damage * 1.2, 0.0)
    } else {
        0.0
    };

    safe_non_neg(bullets + drones + blades + shields + aura, 0.0)
}

/// Weighted count of acquired skills by tier
pub fn estimate_skill_score(acquired: &[AcquiredSkill]) -> f64 {
    const TIER_SCORE: [f64; 6] = [0.0, 1.0, 1.6, 2.3, 3.2, 4.2];
    let score: f64 = acquired
        .iter()
        .map(|s| TIER_SCORE[s.tier.clamp(1, 5) as usize])
        .sum();
    safe_non_neg(score, 0.0)
}

/// Combat rating state
#[derive(Debug, Clone, Serialize)]
pub struct CombatRating {
    pub kills: EventWindow,
    pub damage_dealt: EventWindow,
    pub damage_taken: EventWindow,
    pub exp: EventWindow,
    pub level_ups: EventWindow,
    acc: Accumulator,

    /// Latest unsmoothed rating
    pub rating: f64,
    pub rating_smooth: f64,
    pub tier: String,
    pub tier_color: String,
    pub peak: f64,
    /// Smoothed rating integrated over time
    pub integral: f64,
    pub last_eval: Option<f64>,
    /// Inputs of the latest evaluation
    #[serde(skip)]
    pub last_inputs: RatingInputs,
}

impl Default for CombatRating {
    fn default() -> Self {
        Self {
            kills: EventWindow::default(),
            damage_dealt: EventWindow::default(),
            damage_taken: EventWindow::default(),
            exp: EventWindow::default(),
            level_ups: EventWindow::default(),
            acc: Accumulator::default(),
            rating: 0.0,
            rating_smooth: 0.0,
            tier: "D".to_string(),
            tier_color: "rgba(255,255,255,.92)".to_string(),
            peak: 0.0,
            integral: 0.0,
            last_eval: None,
            last_inputs: RatingInputs::default(),
        }
    }
}

impl CombatRating {
    pub fn record_kill(&mut self) {
        self.acc.kills += 1.0;
    }

    pub fn record_damage_dealt(&mut self, amount: f64) {
        self.acc.damage_dealt = safe_non_neg(self.acc.damage_dealt + amount, 0.0);
    }

    pub fn record_damage_taken(&mut self, amount: f64) {
        self.acc.damage_taken = safe_non_neg(self.acc.damage_taken + amount, 0.0);
    }

    pub fn record_exp(&mut self, amount: f64) {
        self.acc.exp = safe_non_neg(self.acc.exp + amount, 0.0);
    }

    pub fn record_level_up(&mut self) {
        self.acc.level_ups += 1.0;
    }

    /// Move batched micro-events into the windows as one sample each
    fn flush(&mut self, t: f64) {
        let acc = std::mem::take(&mut self.acc);
        if acc.kills > 0.0 {
            self.kills.push(t, acc.kills);
        }
        if acc.damage_dealt > 0.0 {
            self.damage_dealt.push(t, acc.damage_dealt);
        }
        if acc.damage_taken > 0.0 {
            self.damage_taken.push(t, acc.damage_taken);
        }
        if acc.exp > 0.0 {
            self.exp.push(t, acc.exp);
        }
        if acc.level_ups > 0.0 {
            self.level_ups.push(t, acc.level_ups);
        }
    }

    /// Flush, then recompute at most every `RATING_EVAL_INTERVAL`
    pub fn update(
        &mut self,
        t: f64,
        stats: &PlayerStats,
        acquired: &[AcquiredSkill],
        last_damage_time: Option<f64>,
        settings: &Settings,
    ) {
        self.flush(t);

        if self.last_eval.is_some_and(|last| t - last < RATING_EVAL_INTERVAL) {
            return;
        }

        let dt = match self.last_eval {
            Some(last) => (t - last).clamp(0.0, 0.25),
            None => 0.0,
        };
        self.last_eval = Some(t);

        let w = RATING_WINDOW;
        let inputs = RatingInputs {
            kills_per_min: self.kills.sum(t, w) * 60.0 / w,
            damage_per_sec: self.damage_dealt.sum(t, w) / w,
            damage_taken_per_sec: self.damage_taken.sum(t, w) / w,
            exp_per_sec: self.exp.sum(t, w) / w,
            levels_per_min: self.level_ups.sum(t, w) * 60.0 / w,
            build_dps: estimate_build_dps(stats),
            skill_score: estimate_skill_score(acquired),
            hp_ratio: stats.hp_ratio(),
            since_hit: last_damage_time.map_or(w, |lt| t - lt),
        };
        self.rating = compute_rating(&inputs);
        self.last_inputs = inputs;

        let alpha = clamp_finite(dt * 2.2, 0.04, 0.25);
        self.rating_smooth = if self.rating_smooth == 0.0 {
            self.rating
        } else {
            safe_non_neg(lerp(self.rating_smooth, self.rating, alpha), 0.0)
        };
        self.peak = self.peak.max(self.rating_smooth);
        self.integral = safe_non_neg(self.integral + self.rating_smooth * dt, 0.0);

        if let Some(tier) = settings.tier_for(self.rating) {
            self.tier.clone_from(&tier.label);
            self.tier_color.clone_from(&tier.color);
        }
    }
}

impl SimulationState {
    /// Refresh the rating from the player's current state
    pub fn update_combat_rating(&mut self, now: f64) {
        self.combat.update(
            now,
            &self.player.stats,
            &self.player.acquired,
            self.player.last_damage_time,
            &self.settings,
        );
    }
}
