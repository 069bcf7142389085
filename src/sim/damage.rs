//! Damage and status pipeline
//!
//! Every source of enemy damage funnels through `apply_damage_to_enemy`, so
//! armor, stats, floating numbers and death handling happen in one place.
//! Death is never resolved inline: the enemy is flagged and queued.

use super::entities::EffectKind;
use super::numeric::{clamp_finite, safe_non_neg, safe_number};
use super::state::SimulationState;
use crate::consts::*;

/// How a hit should be presented
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HitMeta {
    pub crit: bool,
    pub lucky: bool,
    /// Show the number now instead of aggregating it as DOT
    pub immediate: bool,
}

impl HitMeta {
    /// Direct hit (bullet, orbital, mine, meteor)
    pub const DIRECT: HitMeta = HitMeta {
        crit: false,
        lucky: false,
        immediate: true,
    };
    /// Damage over time or ambient sources
    pub const DOT: HitMeta = HitMeta {
        crit: false,
        lucky: false,
        immediate: false,
    };
}

impl SimulationState {
    /// Player outgoing damage after situational modifiers, in this order:
    /// low hp, critical state, kill streak, rage, stationary, momentum,
    /// symbiosis, clearing, crowd control, gambler, execute.
    pub fn calculate_damage(&mut self, base: f64, target_hp_ratio: f64, now: f64) -> f64 {
        let mut damage = base;
        let hp_ratio = self.player.stats.raw_hp_ratio();
        let s = &self.player.stats;

        if s.low_hp_damage_boost && hp_ratio < s.low_hp_threshold {
            damage *= s.low_hp_damage_multi;
        }

        if s.critical_state_enabled {
            // Peaks at 2x when health sits exactly at half
            damage *= 1.0 + (0.5 - (hp_ratio - 0.5).abs()) * 2.0;
        }

        if s.kill_streak_enabled {
            let bonus = (self.player.kill_streak as f64 * 0.1).min(s.kill_streak_max_bonus);
            damage *= 1.0 + bonus;
        }

        if s.rage_on_hit && now < self.player.rage_end {
            damage *= 1.0 + s.rage_damage_bonus;
        }

        if s.stationary_damage_bonus > 0.0 && !self.player.was_moving {
            damage *= 1.0 + s.stationary_damage_bonus;
        }

        if s.momentum_damage {
            damage *= 1.0 + self.player.current_momentum * 0.5;
        }

        if s.symbiosis_enabled {
            let bonus = (self.enemies.len() as f64 * 0.05).min(0.5);
            damage *= 1.0 + bonus;
        }

        if s.clearing_bonus && self.nearby_enemies < 5 {
            damage *= 1.5;
        }

        // Crowd control is an acknowledged no-op branch: nothing is applied
        // for dense crowds, but the flag is still carried by the skill.
        if s.crowd_control && self.nearby_enemies > 10 {}

        let execute = s.execute_enabled && target_hp_ratio < s.execute_threshold;

        if s.gambler_mode {
            damage *= self.rand_range(0.5, 2.0);
        }

        if execute {
            damage *= 2.0;
        }

        safe_non_neg(damage, 0.0)
    }

    /// Roll freeze, burn and poison from the bullet stat block
    pub fn apply_status_effects(&mut self, idx: usize, now: f64) {
        let s = self.player.stats.clone();

        if s.freeze_chance > 0.0 && self.chance(s.freeze_chance) {
            let status = &mut self.enemies[idx].status;
            status.frozen_until = status.frozen_until.max(now + s.freeze_duration);
        }

        if s.burn_chance > 0.0 && self.chance(s.burn_chance) {
            let origin = self.enemies[idx].pos;
            let status = &mut self.enemies[idx].status;
            status.burn_end = now + s.burn_duration;
            status.burn_damage = s.burn_damage;

            if s.burn_spread {
                for (i, near) in self.enemies.iter_mut().enumerate() {
                    if i == idx || near.dead {
                        continue;
                    }
                    if near.pos.distance_squared(origin) < 50.0 * 50.0 {
                        near.status.burn_end = now + s.burn_duration * 0.5;
                        near.status.burn_damage = s.burn_damage * 0.5;
                    }
                }
            }
        }

        if s.poison_chance > 0.0 && self.chance(s.poison_chance) {
            let status = &mut self.enemies[idx].status;
            status.poison_end = now + s.poison_duration;
            status.poison_damage = s.poison_damage;
        }
    }

    /// Orbiting blades carry their own status chances
    pub fn apply_blade_status_effects(&mut self, idx: usize, now: f64) {
        let s = &self.player.stats;
        let (freeze, freeze_dur) = (s.blade_orbit_freeze_chance, s.blade_orbit_freeze_duration);
        let (burn, burn_dur, burn_dmg) = (
            s.blade_orbit_burn_chance,
            s.blade_orbit_burn_duration,
            s.blade_orbit_burn_damage,
        );
        let (poison, poison_dur, poison_dmg) = (
            s.blade_orbit_poison_chance,
            s.blade_orbit_poison_duration,
            s.blade_orbit_poison_damage,
        );

        if freeze > 0.0 && self.chance(freeze) {
            let status = &mut self.enemies[idx].status;
            status.frozen_until = status.frozen_until.max(now + freeze_dur);
        }
        if burn > 0.0 && self.chance(burn) {
            let status = &mut self.enemies[idx].status;
            status.burn_end = now + burn_dur;
            status.burn_damage = burn_dmg;
        }
        if poison > 0.0 && self.chance(poison) {
            let status = &mut self.enemies[idx].status;
            status.poison_end = now + poison_dur;
            status.poison_damage = poison_dmg;
        }
    }

    /// Apply `amount` to enemy `idx`. Dead or already-killed enemies ignore it.
    pub fn apply_damage_to_enemy(&mut self, idx: usize, amount: f64, now: f64, meta: HitMeta) {
        let Some(enemy) = self.enemies.get(idx) else {
            return;
        };
        if enemy.dead || enemy.killed {
            return;
        }

        let mut dmg = safe_non_neg(amount, 0.0);
        if dmg <= 0.0 {
            return;
        }

        let armor = clamp_finite(safe_number(enemy.armor, 0.0), 0.0, 0.85);
        if armor > 0.0 {
            dmg *= 1.0 - armor;
        }
        let dmg = safe_non_neg(dmg, 0.0);
        if dmg <= 0.0 {
            return;
        }

        self.run_stats.damage_dealt = safe_non_neg(self.run_stats.damage_dealt + dmg, 0.0);
        self.combat.record_damage_dealt(dmg);

        if meta.immediate {
            let pos = self.enemies[idx].pos;
            self.show_damage_number(pos, dmg, meta.crit, meta.lucky, now);
        } else {
            self.accumulate_damage_text(idx, dmg, now, meta.crit, meta.lucky);
        }

        let instant_kill = self.player.stats.instant_kill_threshold;
        let enemy = &mut self.enemies[idx];
        enemy.hp = safe_non_neg(enemy.hp - dmg, 0.0);

        if instant_kill > 0.0 && enemy.max_hp > 0.0 && enemy.hp / enemy.max_hp < instant_kill {
            enemy.hp = 0.0;
        }

        if enemy.hp <= 0.0 {
            enemy.hp = 0.0;
            enemy.dead = true;
            self.queue_kill(idx, now);
        } else if now - enemy.last_hit_fx > ENEMY_HIT_FX_INTERVAL && self.effects.len() < MAX_EFFECTS {
            enemy.last_hit_fx = now;
            let pos = enemy.pos;
            self.push_effect(EffectKind::EnemyHit, pos, now, 0.10);
        }
    }

    /// Aggregate DOT numbers so they surface at most every interval
    pub fn accumulate_damage_text(&mut self, idx: usize, amount: f64, now: f64, crit: bool, lucky: bool) {
        let enemy = &mut self.enemies[idx];
        let pos = enemy.pos;
        let buf = &mut enemy.damage_text;
        buf.acc = safe_non_neg(buf.acc + amount, 0.0);
        buf.crit |= crit;
        buf.lucky |= lucky;

        if buf.next <= 0.0 {
            buf.next = now + DAMAGE_TEXT_INTERVAL;
        }

        if now >= buf.next {
            let mut shown = None;
            if buf.acc >= DAMAGE_TEXT_MIN {
                shown = Some((buf.acc, buf.crit, buf.lucky));
                buf.acc = 0.0;
                buf.crit = false;
                buf.lucky = false;
            }
            buf.next = now + DAMAGE_TEXT_INTERVAL;
            if let Some((value, crit, lucky)) = shown {
                self.show_damage_number(pos, value, crit, lucky, now);
            }
        }
    }

    /// Surface any pending DOT number immediately
    pub fn flush_damage_text(&mut self, idx: usize, now: f64) {
        let enemy = &mut self.enemies[idx];
        let pos = enemy.pos;
        let buf = &mut enemy.damage_text;
        if buf.acc <= 0.0 {
            return;
        }
        let (value, crit, lucky) = (buf.acc, buf.crit, buf.lucky);
        buf.acc = 0.0;
        buf.crit = false;
        buf.lucky = false;
        buf.next = now + DAMAGE_TEXT_INTERVAL;
        self.show_damage_number(pos, value, crit, lucky, now);
    }

    /// Arc from enemy `from` to successive nearest enemies, decaying each hop
    pub fn trigger_chain_lightning(&mut self, from: usize, damage: f64, hops: u32, now: f64) {
        let decay = self.player.stats.chain_damage_decay;
        let mut cursor = from;
        let mut damage = damage;
        let mut visited = vec![self.enemies[from].id];

        for _ in 0..hops.min(MAX_CHAIN_HOPS) {
            let origin = self.enemies[cursor].pos;
            let target = self
                .enemies
                .iter()
                .enumerate()
                .filter(|(_, e)| !e.dead && !visited.contains(&e.id))
                .map(|(i, e)| (i, e.pos.distance_squared(origin)))
                .filter(|&(_, d2)| d2 < CHAIN_RADIUS * CHAIN_RADIUS)
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(i, _)| i);
            let Some(target) = target else {
                break;
            };

            let to = self.enemies[target].pos;
            self.push_effect(EffectKind::Line { to }, origin, now, 0.20);
            self.apply_damage_to_enemy(target, damage, now, HitMeta::DIRECT);

            visited.push(self.enemies[target].id);
            damage *= decay;
            cursor = target;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;
    use crate::sim::director::spawn_enemy_at;
    use crate::sim::entities::EnemyKind;
    use glam::DVec2;
    use proptest::prelude::*;

    fn state_with_grunt() -> SimulationState {
        let mut state = SimulationState::new(11, Settings::default(), 0.0);
        spawn_enemy_at(&mut state, EnemyKind::Grunt, DVec2::new(50.0, 0.0), 0.0, false);
        state
    }

    #[test]
    fn test_base_damage_passes_through() {
        let mut state = state_with_grunt();
        assert_eq!(state.calculate_damage(15.0, 1.0, 0.0), 15.0);
    }

    #[test]
    fn test_modifier_stack() {
        let mut state = state_with_grunt();
        state.player.stats.low_hp_damage_boost = true;
        state.player.stats.health = 10.0;
        state.player.stats.kill_streak_enabled = true;
        state.player.kill_streak = 3;
        state.player.stats.execute_enabled = true;
        state.player.stats.execute_threshold = 0.3;
        // 10 * 1.5 * 1.3 * 2
        let dmg = state.calculate_damage(10.0, 0.1, 0.0);
        assert!((dmg - 39.0).abs() < 1e-9);
    }

    #[test]
    fn test_critical_state_peaks_at_half() {
        let mut state = state_with_grunt();
        state.player.stats.critical_state_enabled = true;
        state.player.stats.health = 50.0;
        assert!((state.calculate_damage(10.0, 1.0, 0.0) - 20.0).abs() < 1e-9);
        state.player.stats.health = 100.0;
        assert!((state.calculate_damage(10.0, 1.0, 0.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_crowd_control_is_noop() {
        let mut state = state_with_grunt();
        state.player.stats.crowd_control = true;
        state.nearby_enemies = 50;
        assert_eq!(state.calculate_damage(15.0, 1.0, 0.0), 15.0);
    }

    #[test]
    fn test_armor_reduces_damage() {
        let mut state = SimulationState::new(11, Settings::default(), 0.0);
        spawn_enemy_at(&mut state, EnemyKind::Shielder, DVec2::ZERO, 0.0, false);
        let before = state.enemies[0].hp;
        state.apply_damage_to_enemy(0, 10.0, 0.0, HitMeta::DIRECT);
        assert!((before - state.enemies[0].hp - 6.5).abs() < 1e-9);
        assert!((state.run_stats.damage_dealt - 6.5).abs() < 1e-9);
    }

    #[test]
    fn test_lethal_damage_queues_once() {
        let mut state = state_with_grunt();
        state.apply_damage_to_enemy(0, 1e9, 0.0, HitMeta::DIRECT);
        assert_eq!(state.enemies[0].hp, 0.0);
        assert!(state.enemies[0].dead);
        assert!(state.enemies[0].kill_queued);
        assert_eq!(state.kill_queue.len(), 1);

        // Further damage to a dead enemy is ignored
        state.apply_damage_to_enemy(0, 50.0, 0.0, HitMeta::DIRECT);
        assert_eq!(state.kill_queue.len(), 1);
        assert_eq!(state.enemies[0].hp, 0.0);
    }

    #[test]
    fn test_instant_kill_threshold() {
        let mut state = state_with_grunt();
        state.player.stats.instant_kill_threshold = 0.2;
        let max = state.enemies[0].max_hp;
        state.apply_damage_to_enemy(0, max * 0.85, 0.0, HitMeta::DIRECT);
        assert!(state.enemies[0].dead);
    }

    #[test]
    fn test_dot_text_aggregates() {
        let mut state = state_with_grunt();
        state.apply_damage_to_enemy(0, 0.3, 1.0, HitMeta::DOT);
        state.apply_damage_to_enemy(0, 0.3, 1.05, HitMeta::DOT);
        let texts = |s: &SimulationState| {
            s.effects
                .iter()
                .filter(|e| matches!(e.kind, EffectKind::DamageText { .. }))
                .count()
        };
        assert_eq!(texts(&state), 0);
        state.apply_damage_to_enemy(0, 0.3, 1.2, HitMeta::DOT);
        assert_eq!(texts(&state), 1);
        assert_eq!(state.enemies[0].damage_text.acc, 0.0);
    }

    #[test]
    fn test_freeze_keeps_longest() {
        let mut state = state_with_grunt();
        state.player.stats.freeze_chance = 1.0;
        state.player.stats.freeze_duration = 1.0;
        state.enemies[0].status.frozen_until = 10.0;
        state.apply_status_effects(0, 2.0);
        assert_eq!(state.enemies[0].status.frozen_until, 10.0);
        state.apply_status_effects(0, 9.5);
        assert_eq!(state.enemies[0].status.frozen_until, 10.5);
    }

    #[test]
    fn test_burn_spreads_at_half_strength() {
        let mut state = state_with_grunt();
        spawn_enemy_at(&mut state, EnemyKind::Grunt, DVec2::new(80.0, 0.0), 0.0, false);
        spawn_enemy_at(&mut state, EnemyKind::Grunt, DVec2::new(400.0, 0.0), 0.0, false);
        state.player.stats.burn_chance = 1.0;
        state.player.stats.burn_damage = 10.0;
        state.player.stats.burn_duration = 3.0;
        state.player.stats.burn_spread = true;
        state.apply_status_effects(0, 1.0);
        assert_eq!(state.enemies[0].status.burn_end, 4.0);
        assert_eq!(state.enemies[1].status.burn_damage, 5.0);
        assert_eq!(state.enemies[1].status.burn_end, 2.5);
        assert_eq!(state.enemies[2].status.burn_end, 0.0);
    }

    #[test]
    fn test_chain_lightning_visits_each_enemy_once() {
        let mut state = SimulationState::new(11, Settings::default(), 0.0);
        for i in 0..3 {
            spawn_enemy_at(&mut state, EnemyKind::Tank, DVec2::new(i as f64 * 100.0, 0.0), 0.0, false);
        }
        state.player.stats.chain_damage_decay = 0.5;
        let hp: Vec<f64> = state.enemies.iter().map(|e| e.hp).collect();
        state.trigger_chain_lightning(0, 8.0, 10, 0.0);

        assert_eq!(state.enemies[0].hp, hp[0]);
        assert!((hp[1] - state.enemies[1].hp - 8.0).abs() < 1e-9);
        assert!((hp[2] - state.enemies[2].hp - 4.0).abs() < 1e-9);
        let lines = state
            .effects
            .iter()
            .filter(|e| matches!(e.kind, EffectKind::Line { .. }))
            .count();
        assert_eq!(lines, 2);
    }

    proptest! {
        #[test]
        fn test_damage_finite_under_extreme_stats(
            base in any::<f64>(),
            ratio in any::<f64>(),
            health in any::<f64>(),
            max_health in any::<f64>(),
            streak in any::<u32>(),
            streak_bonus in any::<f64>(),
            rage in any::<f64>(),
            stationary in any::<f64>(),
            momentum in any::<f64>(),
            low_multi in any::<f64>(),
        ) {
            let mut state = state_with_grunt();
            let s = &mut state.player.stats;
            s.health = health;
            s.max_health = max_health;
            s.low_hp_damage_boost = true;
            s.low_hp_threshold = 2.0;
            s.low_hp_damage_multi = low_multi;
            s.critical_state_enabled = true;
            s.kill_streak_enabled = true;
            s.kill_streak_max_bonus = streak_bonus;
            s.rage_on_hit = true;
            s.rage_damage_bonus = rage;
            s.stationary_damage_bonus = stationary;
            s.momentum_damage = true;
            s.symbiosis_enabled = true;
            s.clearing_bonus = true;
            s.gambler_mode = true;
            s.execute_enabled = true;
            s.execute_threshold = 0.5;
            state.player.kill_streak = streak;
            state.player.rage_end = 1.0;
            state.player.current_momentum = momentum;

            let dmg = state.calculate_damage(base, ratio, 0.0);
            prop_assert!(dmg.is_finite());
            prop_assert!(dmg >= 0.0);
        }

        #[test]
        fn test_enemy_hp_never_negative(hits in proptest::collection::vec(any::<f64>(), 1..20)) {
            let mut state = state_with_grunt();
            for (i, amount) in hits.iter().enumerate() {
                state.apply_damage_to_enemy(0, *amount, i as f64 * 0.1, HitMeta::DOT);
                prop_assert!(state.enemies[0].hp >= 0.0);
                prop_assert!(state.enemies[0].hp.is_finite());
            }
        }
    }
}
