//! Per-frame entity systems and spawners
//!
//! Enemy steering, orbitals, summons, projectiles, timed hazards and
//! pickups. Every system runs over index ranges so damage calls can
//! re-borrow the state between entities.

use std::collections::HashSet;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

use glam::DVec2;

use super::damage::HitMeta;
use super::director::spawn_minions;
use super::entities::*;
use super::fx::colors;
use super::numeric::{clamp_finite, safe_non_neg, safe_number};
use super::state::SimulationState;
use crate::consts::*;
use crate::{direction, heading, normalize_angle};

/// Distance ranged enemies try to hold
const RANGED_KEEP_DISTANCE: f64 = 180.0;
/// How far ahead predictors lead the player, in seconds
const PREDICT_LOOKAHEAD: f64 = 0.8;
const FLANK_DISTANCE: f64 = 120.0;

const GHOST_STEP: f64 = 3.0;
const GHOST_REACH: f64 = 30.0;
const GHOST_DAMAGE: f64 = 5.0;

pub(crate) const FIRE_TRAIL_INTERVAL: f64 = 0.1;
const FIRE_TRAIL_TICK: f64 = 0.2;
const FIRE_TRAIL_REACH: f64 = 20.0;

const METEOR_DELAY: f64 = 1.0;
const METEOR_RADIUS: f64 = 80.0;

const BLACK_HOLE_TICK: f64 = 0.05;
const BLACK_HOLE_CORE: f64 = 30.0;
const BLACK_HOLE_DAMAGE: f64 = 10.0;

const POISON_CLOUD_TICK: f64 = 0.3;
const POISON_CLOUD_TICKS: u32 = 10;

const ENEMY_BULLET_DAMAGE: f64 = 6.0;

impl SimulationState {
    // === Enemies ===

    /// Steering, AI timers and DOT ticks for every enemy
    pub(crate) fn update_enemies(&mut self, dt: f64, now: f64) {
        let player_pos = self.player.pos;
        let player_vel =
            self.player.movement * self.settings.base_player_speed * self.player.stats.speed_multi;
        let firing_angle = if self.player.stats.suppression_enabled {
            self.firing_angle()
        } else {
            None
        };

        // Spawners append minions; they get updated this frame too
        let mut i = 0;
        while i < self.enemies.len() {
            if self.enemies[i].dead {
                i += 1;
                continue;
            }

            let status = &mut self.enemies[i].status;
            if status.frozen_until > 0.0 && now >= status.frozen_until {
                status.frozen_until = 0.0;
            }
            if status.ghost_slow_until > 0.0 && now >= status.ghost_slow_until {
                status.slowed = false;
                status.ghost_slow_until = 0.0;
            }

            if !self.enemies[i].status.is_frozen(now) {
                self.steer_enemy(i, dt, now, player_pos, player_vel, firing_angle);
            }

            let status = &self.enemies[i].status;
            let burn = status.is_burning(now).then_some(status.burn_damage);
            let poison = status.is_poisoned(now).then_some(status.poison_damage);
            if let Some(dmg) = burn {
                self.apply_damage_to_enemy(i, dmg * dt * 10.0, now, HitMeta::DOT);
            }
            if let Some(dmg) = poison {
                self.apply_damage_to_enemy(i, dmg * dt * 10.0, now, HitMeta::DOT);
            }

            let status = &mut self.enemies[i].status;
            if status.vulnerable_until > 0.0 && now >= status.vulnerable_until {
                status.vulnerable_until = 0.0;
            }
            i += 1;
        }
    }

    fn steer_enemy(
        &mut self,
        i: usize,
        dt: f64,
        now: f64,
        player_pos: DVec2,
        player_vel: DVec2,
        firing_angle: Option<f64>,
    ) {
        let e = &self.enemies[i];
        let ai = e.ai;
        let to_player = player_pos - e.pos;
        let dist = to_player.length().max(0.001);
        let mut angle = heading(to_player);
        let mut speed = safe_non_neg(e.speed, self.settings.base_enemy_speed);

        if self.in_firing_direction(firing_angle, i) {
            speed *= 0.6;
        }
        if e.status.slowed {
            speed *= 0.5;
        }

        match ai {
            AiKind::Chase => {}
            AiKind::Zigzag => {
                angle += (now * 3.2 + e.ai_seed).sin() * 0.9;
            }
            AiKind::Orbit => {
                let target_r = if e.orbit_radius > 0.0 { e.orbit_radius } else { 180.0 };
                let err = clamp_finite((dist - target_r) / target_r, -0.75, 0.75);
                angle += FRAC_PI_2 + err;
            }
            AiKind::Dash => {
                if self.enemies[i].next_dash < 1e-6 {
                    let wait = self.rand_range(1.0, 2.2);
                    self.enemies[i].next_dash = now + wait;
                }
                if now >= self.enemies[i].next_dash {
                    let wait = self.rand_range(1.8, 3.2);
                    let e = &mut self.enemies[i];
                    e.dash_end = now + 0.28;
                    e.next_dash = now + wait;
                }
                if now < self.enemies[i].dash_end {
                    speed *= 2.6;
                }
            }
            AiKind::Kite => {
                let keep = if e.keep_distance > 0.0 { e.keep_distance } else { 220.0 };
                if dist < keep * 0.85 {
                    angle += PI;
                    speed *= 1.05;
                } else if dist < keep * 1.10 {
                    angle += FRAC_PI_2;
                    speed *= 0.95;
                }
            }
            AiKind::Spawner => {
                speed *= 0.85;
                if self.enemies[i].next_spawn < 1e-6 {
                    let wait = self.rand_range(1.6, 2.6);
                    self.enemies[i].next_spawn = now + wait;
                }
                if now >= self.enemies[i].next_spawn {
                    let s = safe_number(self.director.strength, 0.0);
                    let extra = u32::from(self.chance(0.25));
                    let count = (2 + (s * 1.3).floor() as u32 + extra).clamp(2, 5);
                    let origin = self.enemies[i].pos;
                    spawn_minions(self, EnemyKind::Swarm, origin, count, now);

                    let cooldown = self.rand_range(2.2, 3.8) / (1.0 + s * 0.35);
                    self.enemies[i].next_spawn = now + cooldown;
                }
            }
            AiKind::Predict => {
                let predicted = player_pos + player_vel * PREDICT_LOOKAHEAD;
                let e = &mut self.enemies[i];
                e.predicted = predicted;
                angle = heading(predicted - e.pos);
                speed *= 1.15;
            }
            AiKind::Flank => {
                let e = &mut self.enemies[i];
                e.flank_angle += dt * 0.8;
                let target = player_pos + direction(e.flank_angle) * FLANK_DISTANCE;
                if target.distance(e.pos) < 50.0 {
                    speed *= 1.4;
                } else {
                    angle = heading(target - e.pos);
                }
            }
            AiKind::Ranged => {
                let seed = e.ai_seed;
                if dist < RANGED_KEEP_DISTANCE * 0.7 {
                    angle += PI;
                    speed *= 1.1;
                } else if dist < RANGED_KEEP_DISTANCE * 1.2 {
                    let side = if (now * 2.0 + seed).sin() > 0.0 { 1.0 } else { -1.0 };
                    angle += FRAC_PI_2 * side;
                    speed *= 0.8;
                }
                if now >= self.enemies[i].next_shot {
                    self.create_enemy_bullet(i, now);
                    let jitter = self.rand_range(0.8, 1.2);
                    let e = &mut self.enemies[i];
                    e.next_shot = now + e.shoot_interval * jitter;
                }
            }
        }

        let e = &mut self.enemies[i];
        e.pos += direction(angle) * speed * dt;
        e.rot = angle - FRAC_PI_2;
    }

    // === Orbitals ===

    /// Keep shield/blade counts in step with stats, place them and fire
    /// contact-begin hits
    pub(crate) fn update_orbitals(&mut self, now: f64) {
        let stats = &self.player.stats;
        let (want_shields, want_blades) = (stats.orbital_shield_count, stats.blade_orbit_count);
        let mut shields = self.orbitals.iter().filter(|o| o.kind == OrbitalKind::Shield).count() as u32;
        let mut blades = self.orbitals.iter().filter(|o| o.kind == OrbitalKind::Blade).count() as u32;
        while shields < want_shields {
            self.create_orbital(OrbitalKind::Shield);
            shields += 1;
        }
        while blades < want_blades {
            self.create_orbital(OrbitalKind::Blade);
            blades += 1;
        }

        let s = &self.player.stats;
        let shield_step = TAU / want_shields.max(1) as f64;
        let blade_step = TAU / want_blades.max(1) as f64;
        let blade_size = DVec2::new(BLADE_LENGTH, BLADE_WIDTH) * s.blade_orbit_scale;
        let center = self.player.pos;

        let (mut si, mut bi) = (0.0, 0.0);
        for o in &mut self.orbitals {
            let (angle, radius) = match o.kind {
                OrbitalKind::Shield => {
                    let a = now * 2.0 * s.orbital_shield_speed + si * shield_step;
                    si += 1.0;
                    (a, SHIELD_ORBIT_RADIUS)
                }
                OrbitalKind::Blade => {
                    let a = now * 3.0 * s.blade_orbit_speed + bi * blade_step;
                    bi += 1.0;
                    o.size = blade_size;
                    (a, s.blade_orbit_radius)
                }
            };
            o.pos = center + direction(angle) * radius;
            o.rot = angle;
        }

        for oi in 0..self.orbitals.len() {
            let mut touching = std::mem::take(&mut self.orbitals[oi].contacts_next);
            touching.clear();
            let (pos, reach) = (self.orbitals[oi].pos, self.orbitals[oi].contact_radius());

            for ei in 0..self.enemies.len() {
                let e = &self.enemies[ei];
                if e.dead {
                    continue;
                }
                let rr = reach + e.half_extent();
                if e.pos.distance_squared(pos) <= rr * rr {
                    let id = e.id;
                    touching.insert(id);
                    if !self.orbitals[oi].contacts.contains(&id) {
                        self.handle_orbital_hit(oi, ei, now);
                    }
                }
            }

            let o = &mut self.orbitals[oi];
            o.contacts_next = std::mem::replace(&mut o.contacts, touching);
        }
    }

    fn create_orbital(&mut self, kind: OrbitalKind) {
        let id = self.next_entity_id();
        self.orbitals.push(Orbital {
            id,
            kind,
            pos: self.player.pos,
            radius: SHIELD_RADIUS,
            size: DVec2::new(BLADE_LENGTH, BLADE_WIDTH),
            rot: 0.0,
            contacts: HashSet::new(),
            contacts_next: HashSet::new(),
        });
    }

    // === Summons ===

    pub(crate) fn update_drones(&mut self, now: f64) {
        while self.drones.len() < self.player.stats.drone_count as usize {
            let id = self.next_entity_id();
            let pos = self.player.pos + DVec2::new(0.0, 60.0);
            self.drones.push(Drone { id, pos, last_shot: 0.0 });
        }

        for i in 0..self.drones.len() {
            let pos = self.drones[i].pos;
            if now - self.drones[i].last_shot > DRONE_FIRE_INTERVAL {
                if let Some(target) = self.closest_enemy(pos) {
                    let aim = self.enemies[target].pos;
                    self.fire_drone_bullet(pos, aim, now);
                    self.drones[i].last_shot = now;
                }
            }

            let offset = DVec2::new(self.rand_range(-50.0, 50.0), self.rand_range(50.0, 80.0));
            let target = self.player.pos + offset;
            self.drones[i].pos += (target - pos) * 0.02;
        }
    }

    pub(crate) fn update_ghosts(&mut self, now: f64) {
        while self.ghosts.len() < self.player.stats.ghost_count as usize {
            let id = self.next_entity_id();
            let pos = self.player.pos;
            self.ghosts.push(Ghost { id, pos });
        }

        let slow = self.player.stats.ghost_slow;
        for i in 0..self.ghosts.len() {
            let pos = self.ghosts[i].pos;
            match self.closest_enemy(pos) {
                Some(target) => {
                    let to = self.enemies[target].pos - pos;
                    let dist = to.length();
                    if dist > GHOST_REACH {
                        self.ghosts[i].pos += to / dist * GHOST_STEP;
                    } else {
                        self.apply_damage_to_enemy(target, GHOST_DAMAGE, now, HitMeta::DOT);
                        if slow {
                            let status = &mut self.enemies[target].status;
                            status.slowed = true;
                            status.ghost_slow_until = now + 1.0;
                        }
                    }
                }
                None => {
                    let drift = (self.player.pos - pos) * 0.05;
                    self.ghosts[i].pos += drift;
                }
            }
        }

        for e in self.enemies.iter_mut().filter(|e| !e.dead) {
            if e.status.ghost_slow_until > 0.0 && now >= e.status.ghost_slow_until {
                e.status.slowed = false;
                e.status.ghost_slow_until = 0.0;
            }
        }
    }

    /// Turn bullets toward their nearest enemy
    pub(crate) fn update_bullet_homing(&mut self, dt: f64) {
        let strength = self.player.stats.homing_strength;
        if strength <= 0.0 {
            return;
        }

        for i in 0..self.bullets.len() {
            let Some(target) = self.closest_enemy(self.bullets[i].pos) else {
                continue;
            };
            let target_pos = self.enemies[target].pos;
            let b = &mut self.bullets[i];
            let current = heading(b.vel);
            let diff = normalize_angle(heading(target_pos - b.pos) - current);
            let turned = current + diff * strength * dt * 10.0;
            b.vel = direction(turned) * b.vel.length();
            b.rot = turned - FRAC_PI_2;
        }
    }

    /// Aura damage is per second
    pub(crate) fn update_lightning_aura(&mut self, dt: f64, now: f64) {
        let s = &self.player.stats;
        if !s.lightning_aura_enabled {
            return;
        }
        let r2 = s.lightning_aura_radius * s.lightning_aura_radius;
        let damage = s.lightning_aura_damage * dt;
        let center = self.player.pos;

        for i in 0..self.enemies.len() {
            let e = &self.enemies[i];
            if !e.dead && e.pos.distance_squared(center) < r2 {
                self.apply_damage_to_enemy(i, damage, now, HitMeta::DOT);
            }
        }
    }

    /// Move enemy projectiles; they hit the player, expire, or get culled
    pub(crate) fn update_enemy_bullets(&mut self, dt: f64, now: f64) {
        for i in 0..self.enemy_bullets.len() {
            let b = &mut self.enemy_bullets[i];
            if b.dead {
                continue;
            }
            b.pos += b.vel * dt;
            if now - b.born > ENEMY_BULLET_LIFETIME {
                b.dead = true;
                continue;
            }

            let dist = self.player.pos.distance(b.pos);
            if dist < self.player.radius + b.radius {
                b.dead = true;
                let damage = b.damage;
                self.handle_enemy_bullet_hit(damage, now);
                continue;
            }
            if dist > ENEMY_BULLET_CULL_DISTANCE {
                b.dead = true;
            }
        }
    }

    // === Hazards ===

    /// Fire trails, meteor warnings, black holes and poison clouds
    pub(crate) fn update_hazards(&mut self, now: f64) {
        self.update_fire_trails(now);
        self.update_meteors(now);
        self.update_black_holes(now);
        self.update_poison_clouds(now);
    }

    fn update_fire_trails(&mut self, now: f64) {
        let damage = self.player.stats.fire_trail_damage;
        let slow = self.player.stats.fire_trail_slow;

        for ti in 0..self.fire_trails.len() {
            let trail = &mut self.fire_trails[ti];
            if now >= trail.die {
                trail.dead = true;
                continue;
            }
            if now - trail.last_tick < FIRE_TRAIL_TICK {
                continue;
            }
            trail.last_tick = now;
            let pos = trail.pos;

            for ei in 0..self.enemies.len() {
                let e = &self.enemies[ei];
                if e.dead || e.pos.distance_squared(pos) >= FIRE_TRAIL_REACH * FIRE_TRAIL_REACH {
                    continue;
                }
                self.apply_damage_to_enemy(ei, damage, now, HitMeta::DOT);
                if slow {
                    self.enemies[ei].status.slowed = true;
                }
            }
        }
    }

    fn update_meteors(&mut self, now: f64) {
        for mi in 0..self.meteor_warnings.len() {
            let w = &mut self.meteor_warnings[mi];
            let age = now - w.born;
            let pos = w.pos;

            if age > METEOR_DELAY && !w.resolved {
                w.resolved = true;
                self.push_effect(EffectKind::Explosion { radius: METEOR_RADIUS }, pos, now, 0.20);
                self.flash(colors::RED, 0.10, 0.10, now);
                self.shake_camera(0.16, 12.0, now);
                self.hit_stop(0.05, 0.22, now);
                self.emit_burst(pos, 30, colors::RED, now, 820.0);

                let damage = self.player.stats.meteor_damage;
                for ei in 0..self.enemies.len() {
                    let e = &self.enemies[ei];
                    if !e.dead && e.pos.distance_squared(pos) < METEOR_RADIUS * METEOR_RADIUS {
                        self.apply_damage_to_enemy(ei, damage, now, HitMeta::DIRECT);
                    }
                }
            }
            if age > METEOR_DELAY + 0.05 {
                self.meteor_warnings[mi].dead = true;
            }
        }
    }

    fn update_black_holes(&mut self, now: f64) {
        let pull = self.player.stats.black_hole_power * 5.0;

        for hi in 0..self.black_holes.len() {
            let bh = &mut self.black_holes[hi];
            if now >= bh.next_tick && now <= bh.end {
                bh.next_tick += BLACK_HOLE_TICK;
                let (center, reach) = (bh.pos, bh.radius * 2.0);

                for ei in 0..self.enemies.len() {
                    let e = &mut self.enemies[ei];
                    if e.dead {
                        continue;
                    }
                    let to = center - e.pos;
                    let dist = to.length();
                    if dist >= reach {
                        continue;
                    }
                    let len = if dist > 0.0 { dist } else { 1.0 };
                    e.pos += to / len * pull;
                    if dist < BLACK_HOLE_CORE {
                        self.apply_damage_to_enemy(ei, BLACK_HOLE_DAMAGE, now, HitMeta::DOT);
                    }
                }
            }
            let bh = &mut self.black_holes[hi];
            if now > bh.fade_end {
                bh.dead = true;
            }
        }
    }

    fn update_poison_clouds(&mut self, now: f64) {
        let damage = self.player.stats.poison_damage;

        for ci in 0..self.poison_clouds.len() {
            let cloud = &mut self.poison_clouds[ci];
            if now >= cloud.next_tick && cloud.ticks < POISON_CLOUD_TICKS {
                cloud.next_tick += POISON_CLOUD_TICK;
                cloud.ticks += 1;
                let (pos, r) = (cloud.pos, cloud.radius);

                for ei in 0..self.enemies.len() {
                    let e = &self.enemies[ei];
                    if !e.dead && e.pos.distance_squared(pos) < r * r {
                        self.apply_damage_to_enemy(ei, damage, now, HitMeta::DOT);
                    }
                }
            }
            let cloud = &mut self.poison_clouds[ci];
            if now > cloud.fade_end {
                cloud.dead = true;
            }
        }
    }

    // === Pickups ===

    /// Magnetize orbs in range and collect the ones touching the player
    pub(crate) fn update_exp_orbs(&mut self, now: f64) {
        let magnet_all = self.player.stats.exp_magnet_all;
        let range = self.player.stats.pickup_range;
        let pull = if magnet_all { 0.15 } else { 0.1 };

        for i in 0..self.exp_orbs.len() {
            let player = self.player.pos;
            let orb = &mut self.exp_orbs[i];
            if orb.dead {
                continue;
            }
            let to = player - orb.pos;
            let dist = to.length();
            if magnet_all || dist < range {
                orb.pos += to * pull;
            }

            if dist < self.player.radius + orb.radius {
                orb.dead = true;
                let (pos, value) = (orb.pos, orb.value);
                self.emit_sparks(pos, 6, colors::GREEN, now, None);
                self.add_exp(value, now);
            }
        }
    }

    // === Spawners ===

    /// Fire a volley at the nearest enemy
    pub fn shoot(&mut self, now: f64) {
        let Some(target) = self.closest_enemy(self.player.pos) else {
            return;
        };
        let base = heading(self.enemies[target].pos - self.player.pos);
        self.push_effect(EffectKind::Muzzle { angle: base }, self.player.pos, now, 0.06);

        let s = &self.player.stats;
        let count = s.bullet_count;
        if s.all_direction_fire {
            let step = TAU / count.max(1) as f64;
            for i in 0..count {
                self.create_bullet(i as f64 * step, now);
            }
        } else {
            let spread = s.spread_angle;
            let start = base - (count.saturating_sub(1)) as f64 * spread / 2.0;
            for i in 0..count {
                self.create_bullet(start + i as f64 * spread, now);
            }
        }

        if self.player.stats.recoil_push {
            self.player.pos -= direction(base) * 5.0;
        }
    }

    /// Player bullet; consumes stored charge
    pub fn create_bullet(&mut self, angle: f64, now: f64) {
        let s = &self.player.stats;
        let size = DVec2::new(8.0, 20.0) * s.bullet_scale;
        let speed = self.settings.base_bullet_speed * s.bullet_speed_multi;
        let (life, pierce) = (s.bullet_lifetime, s.pierce_count);

        let mut charge_bonus = 1.0;
        if s.charge_attack_enabled && self.player.current_charge > 0.0 {
            charge_bonus = 1.0 + self.player.current_charge;
            self.player.current_charge = 0.0;
        }

        let pos = self.player.pos;
        self.push_bullet(pos, angle, speed, size, now + life, pierce, charge_bonus, false);
    }

    /// Fragment spawned by a splitting hit on enemy `source`, which it passes through
    pub fn create_split_bullet(&mut self, pos: DVec2, angle: f64, source: u32, now: f64) {
        let speed = self.settings.base_bullet_speed * 0.7;
        self.push_bullet(pos, angle, speed, DVec2::new(6.0, 12.0), now + 0.8, 0, 1.0, false);
        if let Some(fragment) = self.bullets.last_mut() {
            fragment.hit_ids.push(source);
        }
    }

    pub fn fire_drone_bullet(&mut self, from: DVec2, at: DVec2, now: f64) {
        let angle = heading(at - from);
        self.push_bullet(from, angle, 400.0, DVec2::new(4.0, 8.0), now + 1.5, 0, 1.0, true);
    }

    #[allow(clippy::too_many_arguments)]
    fn push_bullet(
        &mut self,
        pos: DVec2,
        angle: f64,
        speed: f64,
        size: DVec2,
        die: f64,
        pierce_left: u32,
        charge_bonus: f64,
        from_drone: bool,
    ) {
        let id = self.next_entity_id();
        self.bullets.push(Bullet {
            id,
            pos,
            vel: direction(angle) * speed,
            size,
            rot: angle - FRAC_PI_2,
            born: self.now,
            die,
            pierce_left,
            charge_bonus,
            hit_ids: Vec::new(),
            from_drone,
            dead: false,
        });
    }

    /// Aimed shot from enemy `idx`
    pub fn create_enemy_bullet(&mut self, idx: usize, now: f64) {
        let e = &self.enemies[idx];
        let to = self.player.pos - e.pos;
        let dist = to.length().max(1.0);
        let speed = if e.bullet_speed > 0.0 { e.bullet_speed } else { 250.0 };
        let damage = safe_non_neg(
            ENEMY_BULLET_DAMAGE * safe_number(self.director.dmg_mul, 1.0) * safe_number(e.damage_mul, 1.0),
            0.0,
        );
        let pos = e.pos;

        let id = self.next_entity_id();
        self.enemy_bullets.push(EnemyBullet {
            id,
            pos,
            vel: to / dist * speed,
            damage,
            born: now,
            radius: ENEMY_BULLET_RADIUS,
            dead: false,
        });
    }

    pub fn drop_mine(&mut self, pos: DVec2, now: f64) {
        let id = self.next_entity_id();
        let s = &self.player.stats;
        self.mines.push(Mine {
            id,
            pos,
            radius: 10.0,
            damage: s.mine_damage,
            blast_radius: s.mine_radius,
            born: now,
            dead: false,
        });
    }

    pub fn create_fire_trail(&mut self, pos: DVec2, now: f64) {
        let id = self.next_entity_id();
        self.fire_trails.push(FireTrail {
            id,
            pos,
            radius: 15.0,
            born: now,
            die: now + 1.5,
            last_tick: now,
            dead: false,
        });
    }

    /// Telegraph a meteor somewhere near the player
    pub fn summon_meteor(&mut self, now: f64) {
        let offset = DVec2::new(self.rand_range(-200.0, 200.0), self.rand_range(-200.0, 200.0));
        let id = self.next_entity_id();
        self.meteor_warnings.push(MeteorWarning {
            id,
            pos: self.player.pos + offset,
            born: now,
            resolved: false,
            dead: false,
        });
    }

    pub fn create_black_hole(&mut self, pos: DVec2, now: f64, small: bool) {
        let (radius, duration) = if small { (50.0, 1.5) } else { (100.0, 3.0) };
        let id = self.next_entity_id();
        self.black_holes.push(BlackHole {
            id,
            pos,
            radius,
            end: now + duration,
            fade_end: now + duration + 0.3,
            next_tick: now,
            small,
            dead: false,
        });
    }
}
