//! Collision passes and hit responses
//!
//! Every shape is treated as a circle: enemies and bullets use half their
//! larger box side. Passes run over index ranges and only flag removals;
//! the sweep at the end of the tick does the actual removal.

use glam::DVec2;

use super::damage::HitMeta;
use super::entities::{EffectKind, OrbitalKind};
use super::fx::colors;
use super::numeric::{clamp_finite, safe_non_neg, safe_number};
use super::state::SimulationState;
use crate::heading;

/// Base contact damage before director and type multipliers
const CONTACT_DAMAGE: f64 = 9.0;

/// Whether two circles touch (inclusive)
#[inline]
pub fn circles_overlap(a: DVec2, ra: f64, b: DVec2, rb: f64) -> bool {
    let rr = ra + rb;
    a.distance_squared(b) <= rr * rr
}

impl SimulationState {
    // === Passes ===

    /// Bullets against enemies. Expired bullets are retired here, and a
    /// bullet never damages the same enemy twice.
    pub(crate) fn collide_bullets(&mut self, now: f64) {
        // Split and overload append bullets; they are tested this frame too
        let mut bi = 0;
        while bi < self.bullets.len() {
            if self.bullets[bi].dead {
                bi += 1;
                continue;
            }
            if now >= self.bullets[bi].die {
                let pos = self.bullets[bi].pos;
                if self.player.stats.black_hole_on_death {
                    self.create_black_hole(pos, now, true);
                }
                self.bullets[bi].dead = true;
                bi += 1;
                continue;
            }

            for ei in 0..self.enemies.len() {
                let (e, b) = (&self.enemies[ei], &self.bullets[bi]);
                if e.dead || b.has_hit(e.id) {
                    continue;
                }
                if circles_overlap(e.pos, e.half_extent(), b.pos, b.half_extent()) {
                    let id = e.id;
                    self.bullets[bi].hit_ids.push(id);
                    self.handle_bullet_hit(bi, ei, now);
                    if self.bullets[bi].dead {
                        break;
                    }
                }
            }
            bi += 1;
        }
    }

    /// Each mine detonates on the first enemy it touches
    pub(crate) fn collide_mines(&mut self, now: f64) {
        for mi in 0..self.mines.len() {
            let (pos, r) = (self.mines[mi].pos, self.mines[mi].radius);
            if self.mines[mi].dead {
                continue;
            }
            let triggered = self
                .enemies
                .iter()
                .any(|e| !e.dead && circles_overlap(e.pos, e.half_extent(), pos, r));
            if triggered {
                self.handle_mine_hit(mi, now);
            }
        }
    }

    pub(crate) fn collide_player(&mut self, now: f64) {
        for ei in 0..self.enemies.len() {
            let e = &self.enemies[ei];
            if !e.dead && circles_overlap(e.pos, e.half_extent(), self.player.pos, self.player.radius) {
                self.handle_player_hit(ei, now);
            }
        }
    }

    // === Responses ===

    /// Full bullet hit: damage, feedback, status, splash, arcs, splits,
    /// lifesteal, marks, pierce and overload
    pub fn handle_bullet_hit(&mut self, bi: usize, ei: usize, now: f64) {
        let b = &self.bullets[bi];
        let (bullet_pos, bullet_vel, charge, from_drone) = (b.pos, b.vel, b.charge_bonus, b.from_drone);
        let base = if from_drone {
            self.player.stats.drone_damage
        } else {
            self.player.stats.bullet_damage
        };

        let target_ratio = self.enemies[ei].hp_ratio();
        let mut damage = self.calculate_damage(base, target_ratio, now);
        damage *= if charge > 0.0 { charge } else { 1.0 };
        if self.enemies[ei].status.is_vulnerable(now) {
            damage *= 1.0 + self.player.stats.vulnerability_bonus;
        }

        let mut crit_rate = self.player.stats.crit_rate;
        if self.player.stats.revenge_enabled && self.player.revenge_next_crit {
            crit_rate = 1.0;
            self.player.revenge_next_crit = false;
        }
        let crit = self.chance(crit_rate);
        if crit {
            damage *= self.player.stats.crit_damage_multi;
        }
        let lucky = self.chance(self.player.stats.lucky_crit_chance);
        if lucky {
            damage *= self.player.stats.lucky_crit_multi;
        }
        let damage = safe_non_neg(damage, 0.0);
        let meta = HitMeta {
            crit,
            lucky,
            immediate: true,
        };

        self.apply_damage_to_enemy(ei, damage, now, meta);

        let enemy_pos = self.enemies[ei].pos;
        let big = crit || lucky;
        if big {
            self.hit_stop(0.05, 0.22, now);
            self.shake_camera(0.10, 7.0, now);
        } else {
            self.hit_stop(0.03, 0.34, now);
            self.shake_camera(0.06, 3.0, now);
        }
        let sparks = if big { 12 } else { 7 };
        self.emit_sparks(enemy_pos, sparks, colors::GOLD, now, Some(heading(bullet_vel)));

        self.apply_status_effects(ei, now);

        let s = &self.player.stats;
        if s.knockback_force > 0.0 {
            let push = (enemy_pos - bullet_pos).try_normalize().unwrap_or(DVec2::X);
            self.enemies[ei].pos += push * s.knockback_force * 0.1;
        }

        let s = &self.player.stats;
        let area = s.area_damage_radius;
        if area > 0.0 {
            let knock = s.explosion_knockback;
            let center = self.enemies[ei].pos;
            self.push_effect(EffectKind::Explosion { radius: area }, center, now, 0.20);
            for i in 0..self.enemies.len() {
                let offset = self.enemies[i].pos - center;
                if i == ei || offset.length_squared() >= area * area {
                    continue;
                }
                self.apply_damage_to_enemy(i, damage * 0.5, now, meta);
                if knock {
                    let push = offset.try_normalize().unwrap_or(DVec2::X);
                    self.enemies[i].pos += push * 50.0;
                }
            }
        } else {
            self.push_effect(EffectKind::Hit, bullet_pos, now, 0.10);
        }

        let s = &self.player.stats;
        if s.chain_lightning {
            let (decay, hops) = (s.chain_damage_decay, s.chain_count);
            self.trigger_chain_lightning(ei, damage * decay, hops, now);
        }

        let s = &self.player.stats;
        if s.split_on_hit {
            let n = s.split_count;
            let current = heading(bullet_vel);
            let half = (n / 2) as f64;
            let (origin, source) = (self.enemies[ei].pos, self.enemies[ei].id);
            for i in 0..n {
                self.create_split_bullet(origin, current + (i as f64 - half) * 0.5, source, now);
            }
        }

        let (steal_chance, steal) = (self.player.stats.lifesteal_chance, self.player.stats.lifesteal_percent);
        if self.chance(steal_chance) {
            self.heal(damage * steal);
        }

        if self.player.stats.vulnerability_mark {
            self.enemies[ei].status.vulnerable_until = now + 3.0;
        }

        let b = &mut self.bullets[bi];
        if b.pierce_left > 0 {
            b.pierce_left -= 1;
        } else {
            b.dead = true;
        }

        if self.chance(self.player.stats.overload_chance) {
            self.shoot(now);
        }
    }

    /// Shield or blade touching an enemy for the first frame
    pub fn handle_orbital_hit(&mut self, oi: usize, ei: usize, now: f64) {
        let (kind, rot) = (self.orbitals[oi].kind, self.orbitals[oi].rot);
        let damage = match kind {
            OrbitalKind::Shield => self.player.stats.orbital_shield_damage,
            OrbitalKind::Blade => self.player.stats.blade_orbit_damage,
        };
        self.apply_damage_to_enemy(ei, damage, now, HitMeta::DIRECT);

        if kind != OrbitalKind::Blade {
            return;
        }

        let e = &mut self.enemies[ei];
        e.hit_flash_until = e.hit_flash_until.max(now + 0.08);
        let pos = e.pos;
        self.push_effect(EffectKind::Slash { angle: rot }, pos, now, 0.12);
        self.emit_sparks(pos, 10, colors::WHITE, now, Some(rot));
        self.hit_stop(0.02, 0.35, now);
        self.shake_camera(0.07, 4.0, now);

        self.apply_blade_status_effects(ei, now);
        let (chance, percent) = (
            self.player.stats.blade_orbit_lifesteal_chance,
            self.player.stats.blade_orbit_lifesteal_percent,
        );
        if chance > 0.0 && self.chance(chance) {
            self.heal(damage * percent);
        }
    }

    /// Detonate mine `mi`, damaging everything in its blast
    pub fn handle_mine_hit(&mut self, mi: usize, now: f64) {
        let mine = &mut self.mines[mi];
        mine.dead = true;
        let (pos, damage, radius) = (mine.pos, mine.damage, mine.blast_radius);

        self.push_effect(EffectKind::Explosion { radius }, pos, now, 0.20);
        self.flash(colors::ORANGE, 0.12, 0.12, now);
        self.shake_camera(0.14, 11.0, now);
        self.hit_stop(0.06, 0.20, now);
        self.emit_burst(pos, 26, colors::ORANGE, now, 780.0);

        for i in 0..self.enemies.len() {
            let e = &self.enemies[i];
            if !e.dead && e.pos.distance_squared(pos) < radius * radius {
                self.apply_damage_to_enemy(i, damage, now, HitMeta::DIRECT);
            }
        }
    }

    /// Contact with enemy `ei`. Nothing at all happens inside the
    /// invulnerability window.
    pub fn handle_player_hit(&mut self, ei: usize, now: f64) {
        if self.player.is_invulnerable(now) {
            return;
        }
        if self.try_avoid_hit(now, Some(ei)) {
            return;
        }

        let dmg_mul = safe_number(self.director.dmg_mul, 1.0);
        let type_mul = clamp_finite(safe_number(self.enemies[ei].damage_mul, 1.0), 0.2, 5.0);
        let damage = self.mitigate(CONTACT_DAMAGE * dmg_mul * type_mul);

        let (thorns, slow) = (self.player.stats.thorns_damage_percent, self.player.stats.thorns_slow);
        if thorns > 0.0 {
            self.apply_damage_to_enemy(ei, damage * thorns, now, HitMeta::DOT);
            if slow {
                self.enemies[ei].status.slowed = true;
            }
        }

        self.take_damage(damage, now);

        let s = &self.player.stats;
        if s.rage_on_hit {
            self.player.rage_end = now + 3.0;
        }
        if s.revenge_enabled {
            self.player.revenge_next_crit = true;
        }
        self.player.last_hit = now;
        self.player.last_damage_time = Some(now);

        let pos = self.player.pos;
        self.hit_stop(0.06, 0.22, now);
        self.shake_camera(0.28, 16.0, now);
        self.emit_burst(pos, 18, colors::RED, now, 520.0);
    }

    /// Enemy projectile reaching the player. Blocks never counter here.
    pub fn handle_enemy_bullet_hit(&mut self, damage: f64, now: f64) {
        if self.player.is_invulnerable(now) {
            return;
        }
        if self.try_avoid_hit(now, None) {
            return;
        }

        let damage = self.mitigate(damage);
        self.take_damage(damage, now);
        self.player.last_hit = now;
        self.player.last_damage_time = Some(now);

        let pos = self.player.pos;
        self.shake_camera(0.15, 8.0, now);
        self.emit_burst(pos, 10, colors::RED, now, 400.0);
    }

    /// Dodge and block rolls. `attacker` receives the perfect-block counter.
    fn try_avoid_hit(&mut self, now: f64, attacker: Option<usize>) -> bool {
        if self.chance(self.player.stats.dodge_chance) {
            self.show_label("DODGE", colors::CYAN, now);
            if self.player.stats.dodge_invincibility {
                self.player.last_hit = now;
            }
            return true;
        }

        if self.chance(self.player.stats.block_chance) {
            self.show_label("BLOCK", colors::WHITE, now);
            if let Some(ei) = attacker {
                if self.player.stats.perfect_block_counter {
                    let counter = self.player.stats.bullet_damage * 2.0;
                    self.apply_damage_to_enemy(ei, counter, now, HitMeta::DOT);
                }
            }
            return true;
        }
        false
    }

    /// Damage reduction, then the per-hit cap
    fn mitigate(&self, raw: f64) -> f64 {
        let s = &self.player.stats;
        let reduced = raw * (1.0 - s.damage_reduction);
        safe_non_neg(reduced.min(s.max_health * s.damage_cap), 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;
    use crate::sim::director::spawn_enemy_at;
    use crate::sim::entities::EnemyKind;

    fn new_state() -> SimulationState {
        SimulationState::new(21, Settings::default(), 0.0)
    }

    #[test]
    fn test_circles_overlap_inclusive() {
        assert!(circles_overlap(DVec2::ZERO, 1.0, DVec2::new(2.0, 0.0), 1.0));
        assert!(!circles_overlap(DVec2::ZERO, 1.0, DVec2::new(2.01, 0.0), 1.0));
    }

    #[test]
    fn test_pierce_hits_each_enemy_once() {
        let mut state = new_state();
        state.player.stats.crit_rate = 0.0;
        state.player.stats.pierce_count = 2;
        let ids: Vec<usize> = (0..4)
            .map(|k| spawn_enemy_at(&mut state, EnemyKind::Tank, DVec2::new(100.0 + k as f64 * 10.0, 0.0), 0.0, false))
            .collect();
        let hp = state.enemies[0].hp;

        state.create_bullet(0.0, 0.0);
        state.bullets[0].pos = DVec2::new(115.0, 0.0);
        state.collide_bullets(0.1);
        // Running the pass again must not re-hit anyone
        state.collide_bullets(0.1);

        let b = &state.bullets[0];
        assert!(b.dead);
        assert_eq!(b.hit_ids.len(), 3);
        assert_eq!(b.pierce_left, 0);
        let damaged = ids.iter().filter(|&&i| state.enemies[i].hp < hp).count();
        assert_eq!(damaged, 3);
        for &i in &ids[..3] {
            assert!((state.enemies[i].hp - (hp - 15.0)).abs() < 1e-9);
        }
        assert_eq!(state.enemies[ids[3]].hp, hp);
    }

    #[test]
    fn test_expired_bullet_leaves_black_hole() {
        let mut state = new_state();
        state.player.stats.black_hole_on_death = true;
        state.create_bullet(0.0, 0.0);
        state.collide_bullets(10.0);
        assert!(state.bullets[0].dead);
        assert_eq!(state.black_holes.len(), 1);
        assert!(state.black_holes[0].small);
    }

    #[test]
    fn test_iframes_block_all_mutation() {
        let mut state = new_state();
        state.player.stats.dodge_chance = 0.5;
        state.player.stats.thorns_damage_percent = 1.0;
        let i = spawn_enemy_at(&mut state, EnemyKind::Grunt, DVec2::new(5.0, 0.0), 0.0, false);
        state.player.last_hit = 9.8;
        state.drain_events();

        let before = serde_json::to_string(&state.snapshot()).unwrap();
        let rng_before = state.rng.clone();
        state.handle_player_hit(i, 10.0);
        state.collide_player(10.0);

        assert_eq!(serde_json::to_string(&state.snapshot()).unwrap(), before);
        assert!(state.rng == rng_before);
        assert!(state.drain_events().is_empty());
        assert_eq!(state.run_stats.damage_taken, 0.0);
    }

    #[test]
    fn test_contact_damage_and_followups() {
        let mut state = new_state();
        state.player.stats.rage_on_hit = true;
        state.player.stats.revenge_enabled = true;
        state.player.stats.thorns_damage_percent = 0.5;
        state.player.stats.thorns_slow = true;
        let i = spawn_enemy_at(&mut state, EnemyKind::Tank, DVec2::new(5.0, 0.0), 0.0, false);
        let hp = state.enemies[i].hp;

        state.handle_player_hit(i, 10.0);
        // 9 * 1.0 * 1.45
        let expected = 9.0 * 1.45;
        assert!((state.player.stats.health - (100.0 - expected)).abs() < 1e-9);
        assert!((state.enemies[i].hp - (hp - expected * 0.5)).abs() < 1e-9);
        assert!(state.enemies[i].status.slowed);
        assert_eq!(state.player.rage_end, 13.0);
        assert!(state.player.revenge_next_crit);
        assert_eq!(state.player.last_damage_time, Some(10.0));
    }

    #[test]
    fn test_damage_cap_limits_hit() {
        let mut state = new_state();
        state.player.stats.damage_cap = 0.05;
        let i = spawn_enemy_at(&mut state, EnemyKind::Elite, DVec2::new(5.0, 0.0), 0.0, false);
        state.handle_player_hit(i, 1.0);
        assert!((state.player.stats.health - 95.0).abs() < 1e-9);
    }

    #[test]
    fn test_dodge_avoids_damage() {
        let mut state = new_state();
        state.player.stats.dodge_chance = 1.0;
        state.player.stats.dodge_invincibility = true;
        let i = spawn_enemy_at(&mut state, EnemyKind::Grunt, DVec2::new(5.0, 0.0), 0.0, false);
        state.handle_player_hit(i, 2.0);
        assert_eq!(state.player.stats.health, 100.0);
        assert_eq!(state.player.last_hit, 2.0);
        assert!(state.effects.iter().any(|e| matches!(&e.kind, EffectKind::Label { text, .. } if text == "DODGE")));
    }

    #[test]
    fn test_perfect_block_counters() {
        let mut state = new_state();
        state.player.stats.block_chance = 1.0;
        state.player.stats.perfect_block_counter = true;
        let i = spawn_enemy_at(&mut state, EnemyKind::Tank, DVec2::new(5.0, 0.0), 0.0, false);
        let hp = state.enemies[i].hp;
        state.handle_player_hit(i, 2.0);
        assert_eq!(state.player.stats.health, 100.0);
        assert!((state.enemies[i].hp - (hp - 30.0)).abs() < 1e-9);
    }

    #[test]
    fn test_mine_blast() {
        let mut state = new_state();
        let near = spawn_enemy_at(&mut state, EnemyKind::Tank, DVec2::new(200.0, 0.0), 0.0, false);
        let far = spawn_enemy_at(&mut state, EnemyKind::Tank, DVec2::new(200.0, 100.0), 0.0, false);
        let hp = state.enemies[near].hp;
        state.drop_mine(DVec2::new(220.0, 0.0), 0.0);

        state.collide_mines(0.1);
        assert!(state.mines[0].dead);
        assert!((state.enemies[near].hp - (hp - 50.0)).abs() < 1e-9);
        assert_eq!(state.enemies[far].hp, hp);

        state.collide_mines(0.2);
        assert!((state.enemies[near].hp - (hp - 50.0)).abs() < 1e-9);
    }

    #[test]
    fn test_area_splash_half_damage() {
        let mut state = new_state();
        state.player.stats.crit_rate = 0.0;
        state.player.stats.area_damage_radius = 60.0;
        let a = spawn_enemy_at(&mut state, EnemyKind::Tank, DVec2::new(300.0, 0.0), 0.0, false);
        let b = spawn_enemy_at(&mut state, EnemyKind::Tank, DVec2::new(300.0, 40.0), 0.0, false);
        let hp = state.enemies[a].hp;

        state.create_bullet(0.0, 0.0);
        state.handle_bullet_hit(0, a, 0.0);
        assert!((state.enemies[a].hp - (hp - 15.0)).abs() < 1e-9);
        assert!((state.enemies[b].hp - (hp - 7.5)).abs() < 1e-9);
    }

    #[test]
    fn test_revenge_forces_crit_once() {
        let mut state = new_state();
        state.player.stats.crit_rate = 0.0;
        state.player.stats.revenge_enabled = true;
        state.player.revenge_next_crit = true;
        let a = spawn_enemy_at(&mut state, EnemyKind::Elite, DVec2::new(300.0, 0.0), 0.0, false);
        let hp = state.enemies[a].hp;

        state.create_bullet(0.0, 0.0);
        state.handle_bullet_hit(0, a, 0.0);
        assert!((state.enemies[a].hp - (hp - 30.0)).abs() < 1e-9);
        assert!(!state.player.revenge_next_crit);
    }

    #[test]
    fn test_split_spawns_fragments() {
        let mut state = new_state();
        state.player.stats.split_on_hit = true;
        state.player.stats.split_count = 3;
        let a = spawn_enemy_at(&mut state, EnemyKind::Tank, DVec2::new(300.0, 0.0), 0.0, false);
        state.create_bullet(0.0, 0.0);
        state.handle_bullet_hit(0, a, 0.0);
        assert_eq!(state.bullets.len(), 4);
        let angles: Vec<f64> = state.bullets[1..].iter().map(|b| heading(b.vel)).collect();
        assert!((angles[0] + 0.5).abs() < 1e-9);
        assert!(angles[1].abs() < 1e-9);
        assert!((angles[2] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_split_fragments_skip_origin_enemy() {
        let hp_after_volley = |split: bool| {
            let mut state = new_state();
            state.player.stats.split_on_hit = split;
            state.player.stats.split_count = 2;
            let a = spawn_enemy_at(&mut state, EnemyKind::Tank, DVec2::new(30.0, 0.0), 0.0, false);
            state.enemies[a].hp = 10_000.0;
            state.enemies[a].max_hp = 10_000.0;
            state.create_bullet(0.0, 0.0);
            state.bullets[0].pos = state.enemies[a].pos;

            state.collide_bullets(0.0);
            if split {
                assert_eq!(state.bullets.len(), 3);
                let origin = state.enemies[a].id;
                assert!(state.bullets[1..].iter().all(|b| b.hit_ids == vec![origin]));
            }
            state.enemies[a].hp
        };
        // Fragments add no damage to the enemy that spawned them
        assert_eq!(hp_after_volley(true), hp_after_volley(false));
        assert!(hp_after_volley(true) < 10_000.0);
    }
}
