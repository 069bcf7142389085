//! Deferred enemy death
//!
//! Damage only flags an enemy dead and queues it here. Death effects run
//! when the queue is drained, so explosions that kill more enemies extend
//! the queue instead of recursing.

use std::collections::VecDeque;

use glam::DVec2;

use super::damage::HitMeta;
use super::director::spawn_minions;
use super::entities::{EffectKind, ExpOrb, PoisonCloud};
use super::fx::colors;
use super::numeric::{clamp_finite, safe_non_neg, safe_number};
use super::state::SimulationState;
use crate::consts::*;

/// A queued death
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KillEntry {
    /// Index at queue time; verified against `id` before use
    pub index: usize,
    pub id: u32,
    pub t: f64,
}

/// FIFO of pending deaths
#[derive(Debug, Clone, Default)]
pub struct KillQueue {
    entries: VecDeque<KillEntry>,
}

impl KillQueue {
    pub fn push(&mut self, entry: KillEntry) {
        self.entries.push_back(entry);
    }

    pub fn pop_front(&mut self) -> Option<KillEntry> {
        self.entries.pop_front()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SimulationState {
    /// Queue enemy `idx` for death handling. Idempotent.
    pub fn queue_kill(&mut self, idx: usize, now: f64) {
        let Some(enemy) = self.enemies.get_mut(idx) else {
            return;
        };
        if enemy.killed || enemy.kill_queued {
            return;
        }
        enemy.kill_queued = true;
        let id = enemy.id;
        self.kill_queue.push(KillEntry { index: idx, id, t: now });
    }

    /// Current index of a queued enemy
    fn resolve_kill_entry(&self, entry: &KillEntry) -> Option<usize> {
        match self.enemies.get(entry.index) {
            Some(e) if e.id == entry.id => Some(entry.index),
            _ => self.enemies.iter().position(|e| e.id == entry.id),
        }
    }

    /// Drain the kill queue in FIFO order, including kills it causes
    pub fn process_kill_queue(&mut self) {
        let mut processed = 0usize;

        while let Some(entry) = self.kill_queue.pop_front() {
            if processed >= KILL_QUEUE_GUARD {
                log::warn!(
                    "Kill queue guard tripped after {} entries, dropping {} more",
                    processed,
                    self.kill_queue.len() + 1
                );
                self.kill_queue.clear();
                break;
            }
            processed += 1;

            let Some(idx) = self.resolve_kill_entry(&entry) else {
                continue;
            };
            if self.enemies[idx].killed {
                continue;
            }

            self.flush_damage_text(idx, entry.t);

            let enemy = &mut self.enemies[idx];
            enemy.killed = true;
            enemy.kill_queued = false;
            self.kill_enemy(idx, entry.t);
        }
    }

    /// Death handling. Only the kill queue calls this.
    fn kill_enemy(&mut self, idx: usize, now: f64) {
        let enemy = &mut self.enemies[idx];
        if enemy.removed {
            return;
        }
        enemy.removed = true;

        let pos = enemy.pos;
        let heavy = enemy.is_heavy();
        let was_poisoned = enemy.status.was_poisoned();
        let split_count = enemy.split_count;
        let split_kind = enemy.split_kind;

        if heavy {
            self.hit_stop(0.07, 0.16, now);
            self.shake_camera(0.18, 12.0, now);
            self.flash(colors::ORANGE, 0.18, 0.12, now);
            self.emit_burst(pos, 28, colors::ORANGE, now, 720.0);
        } else {
            self.hit_stop(0.05, 0.22, now);
            self.shake_camera(0.12, 8.0, now);
            self.flash(colors::ORANGE, 0.12, 0.12, now);
            self.emit_burst(pos, 18, colors::GOLD, now, 560.0);
        }

        let stats = &self.player.stats;
        if stats.death_explosion {
            let radius = stats.death_explosion_radius;
            let damage = stats.bullet_damage * 0.5;
            self.push_effect(EffectKind::Explosion { radius }, pos, now, 0.20);
            for i in 0..self.enemies.len() {
                if i != idx && self.enemies[i].pos.distance_squared(pos) < radius * radius {
                    self.apply_damage_to_enemy(i, damage, now, HitMeta::DOT);
                }
            }
        }

        if self.player.stats.poison_explode && was_poisoned {
            self.spawn_poison_cloud(pos, now);
        }

        self.player.kill_streak = self.player.kill_streak.saturating_add(1);
        self.player.last_kill_time = now;
        self.run_stats.kills += 1;
        self.combat.record_kill();

        let heal = self.player.stats.kill_heal_amount;
        if heal > 0.0 {
            self.heal(heal);
        }

        if self.player.stats.time_warp_on_kill && self.chance(TIME_WARP_CHANCE) {
            self.time_warp_active = true;
            self.time_warp_end = now + TIME_WARP_DURATION;
        }

        let exp = self.compute_exp_drop(idx);
        self.spawn_exp_orb(pos, exp);

        if split_count > 0 {
            spawn_minions(self, split_kind, pos, split_count, now);
        }
    }

    /// Exp value for killing enemy `idx`, in [`EXP_DROP_MIN`, `EXP_DROP_MAX`]
    pub fn compute_exp_drop(&mut self, idx: usize) -> f64 {
        let enemy = &self.enemies[idx];
        let type_mul = clamp_finite(safe_number(enemy.exp_mul, 1.0), 0.1, 20.0);
        let minion = enemy.minion;

        let diff = safe_number(self.director.diff, 1.0);
        let diff_mul = 1.0 + (diff - 1.0).max(0.0).sqrt() * 0.55;

        // Comeback bonus up to +25% at low health
        let hp_ratio = self.player.stats.hp_ratio();
        let risk = clamp_finite((0.35 - hp_ratio) / 0.35, 0.0, 1.0);
        let risk_mul = 1.0 + 0.25 * risk;

        let streak_mul = 1.0 + (self.player.kill_streak as f64 * 0.01).min(0.15);
        let jitter = self.rand_range(0.92, 1.08);

        let mut exp = 10.0 * type_mul * diff_mul * risk_mul * streak_mul * jitter;
        if minion {
            exp *= 0.65;
        }
        clamp_finite(exp, EXP_DROP_MIN, EXP_DROP_MAX)
    }

    pub fn spawn_exp_orb(&mut self, pos: DVec2, value: f64) {
        let value = clamp_finite(safe_non_neg(value, 12.0), EXP_DROP_MIN, EXP_DROP_MAX);
        let radius = clamp_finite(3.5 + value.sqrt() * 0.32, 4.0, 11.0);
        let id = self.next_entity_id();
        self.exp_orbs.push(ExpOrb {
            id,
            pos,
            radius,
            value,
            dead: false,
        });
    }

    pub fn spawn_poison_cloud(&mut self, pos: DVec2, now: f64) {
        let id = self.next_entity_id();
        self.poison_clouds.push(PoisonCloud {
            id,
            pos,
            radius: 60.0,
            born: now,
            ticks: 0,
            next_tick: now,
            fade_start: now + 3.0,
            fade_end: now + 3.5,
            dead: false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;
    use crate::sim::director::spawn_enemy_at;
    use crate::sim::entities::EnemyKind;
    use crate::sim::tick::{TickInput, tick};

    fn new_state() -> SimulationState {
        SimulationState::new(21, Settings::default(), 0.0)
    }

    #[test]
    fn test_runaway_queue_is_force_cleared() {
        let mut state = new_state();
        let total = KILL_QUEUE_GUARD + 5;
        for i in 0..total {
            let pos = DVec2::new(3000.0 + (i % 100) as f64, (i / 100) as f64);
            let idx = spawn_enemy_at(&mut state, EnemyKind::Grunt, pos, 0.0, false);
            let enemy = &mut state.enemies[idx];
            enemy.hp = 0.0;
            enemy.dead = true;
            state.queue_kill(idx, 0.0);
        }
        assert_eq!(state.kill_queue.len(), total);

        state.process_kill_queue();
        assert!(state.kill_queue.is_empty());
        assert_eq!(state.run_stats.kills, KILL_QUEUE_GUARD as u64);

        // The dropped entries are still swept on the next frame
        tick(&mut state, &TickInput::default(), 0.016);
        assert!(state.enemies.is_empty());
        assert_eq!(state.run_stats.kills, KILL_QUEUE_GUARD as u64);
    }

    #[test]
    fn test_crit_kill_yields_one_kill_and_one_orb() {
        let mut state = new_state();
        spawn_enemy_at(&mut state, EnemyKind::Grunt, DVec2::new(40.0, 0.0), 0.0, false);
        assert_eq!(state.enemies[0].hp, 30.0);

        let base = state.calculate_damage(15.0, state.enemies[0].hp_ratio(), 0.0);
        let dmg = base * 2.0;
        state.apply_damage_to_enemy(0, dmg, 0.0, HitMeta { crit: true, ..HitMeta::DIRECT });

        assert_eq!(state.enemies[0].hp, 0.0);
        assert!(state.enemies[0].kill_queued);
        assert_eq!(state.kill_queue.len(), 1);

        state.process_kill_queue();
        assert!(state.kill_queue.is_empty());
        assert_eq!(state.run_stats.kills, 1);
        assert_eq!(state.exp_orbs.len(), 1);
        let value = state.exp_orbs[0].value;
        assert!((EXP_DROP_MIN..=EXP_DROP_MAX).contains(&value));
        assert!(state.enemies[0].killed);
        assert!(state.enemies[0].removed);

        // Re-queueing a killed enemy is a no-op
        state.queue_kill(0, 0.1);
        state.process_kill_queue();
        assert_eq!(state.run_stats.kills, 1);
        assert_eq!(state.exp_orbs.len(), 1);
    }

    #[test]
    fn test_queue_kill_idempotent() {
        let mut state = new_state();
        spawn_enemy_at(&mut state, EnemyKind::Grunt, DVec2::ZERO, 0.0, false);
        state.queue_kill(0, 0.0);
        state.queue_kill(0, 0.0);
        assert_eq!(state.kill_queue.len(), 1);
    }

    #[test]
    fn test_chained_explosions_resolve_iteratively() {
        let mut state = new_state();
        state.player.stats.death_explosion = true;
        state.player.stats.death_explosion_radius = 15.0;
        state.player.stats.bullet_damage = 1e6;
        let n = 1500;
        for i in 0..n {
            spawn_enemy_at(&mut state, EnemyKind::Grunt, DVec2::new(i as f64 * 10.0, 0.0), 0.0, false);
        }

        state.apply_damage_to_enemy(0, 1e6, 0.0, HitMeta::DIRECT);
        assert_eq!(state.kill_queue.len(), 1);
        state.process_kill_queue();

        assert!(state.kill_queue.is_empty());
        assert_eq!(state.run_stats.kills, n as u64);
        assert_eq!(state.exp_orbs.len(), n);
        assert!(state.enemies.iter().all(|e| e.killed && e.removed));
    }

    #[test]
    fn test_minion_exp_reduced() {
        let mut state = new_state();
        spawn_enemy_at(&mut state, EnemyKind::Grunt, DVec2::ZERO, 0.0, false);
        spawn_enemy_at(&mut state, EnemyKind::Grunt, DVec2::ZERO, 0.0, true);
        let full = state.compute_exp_drop(0);
        let minion = state.compute_exp_drop(1);
        assert!((9.2..=10.8).contains(&full));
        assert!((5.98..=7.02).contains(&minion));
    }

    #[test]
    fn test_exp_drop_clamped() {
        let mut state = new_state();
        spawn_enemy_at(&mut state, EnemyKind::Elite, DVec2::ZERO, 0.0, false);
        state.enemies[0].exp_mul = 1e12;
        state.director.diff = 1e12;
        state.player.kill_streak = u32::MAX;
        assert_eq!(state.compute_exp_drop(0), EXP_DROP_MAX);
    }

    #[test]
    fn test_splitter_spawns_swarm() {
        let mut state = new_state();
        spawn_enemy_at(&mut state, EnemyKind::Splitter, DVec2::new(200.0, 0.0), 0.0, false);
        state.apply_damage_to_enemy(0, 1e6, 0.0, HitMeta::DIRECT);
        state.process_kill_queue();
        let swarm: Vec<_> = state.enemies.iter().filter(|e| e.kind == EnemyKind::Swarm).collect();
        assert_eq!(swarm.len(), 3);
        assert!(swarm.iter().all(|e| e.minion && !e.dead));
    }

    #[test]
    fn test_poisoned_enemy_leaves_cloud() {
        let mut state = new_state();
        state.player.stats.poison_explode = true;
        spawn_enemy_at(&mut state, EnemyKind::Grunt, DVec2::ZERO, 0.0, false);
        state.enemies[0].status.poison_end = 0.5;
        state.apply_damage_to_enemy(0, 1e6, 1.0, HitMeta::DIRECT);
        state.process_kill_queue();
        assert_eq!(state.poison_clouds.len(), 1);
        assert_eq!(state.poison_clouds[0].fade_end, 4.5);
    }

    #[test]
    fn test_kill_updates_streak_and_heal() {
        let mut state = new_state();
        state.player.stats.kill_heal_amount = 5.0;
        state.player.stats.health = 50.0;
        spawn_enemy_at(&mut state, EnemyKind::Grunt, DVec2::ZERO, 0.0, false);
        state.apply_damage_to_enemy(0, 1e6, 2.0, HitMeta::DIRECT);
        state.process_kill_queue();
        assert_eq!(state.player.kill_streak, 1);
        assert_eq!(state.player.last_kill_time, 2.0);
        assert_eq!(state.player.stats.health, 55.0);
    }
}
