//! Frame update
//!
//! One ordered pass per call. Kill-queue draining brackets the body,
//! movement precedes collision, and cleanup always runs last.

use glam::DVec2;

use super::ai::FIRE_TRAIL_INTERVAL;
use super::numeric::clamp_finite;
use super::state::SimulationState;
use crate::consts::*;

/// Movement requested for a single frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    /// Joystick direction; length is capped at 1
    pub movement: DVec2,
}

impl TickInput {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            movement: DVec2::new(x, y),
        }
    }

    /// Non-finite input becomes zero, longer vectors are shortened to unit length
    pub fn sanitized(self) -> Self {
        let movement = if self.movement.is_finite() {
            self.movement.clamp_length_max(1.0)
        } else {
            DVec2::ZERO
        };
        Self { movement }
    }
}

/// Advance the simulation to clock value `now`
pub fn tick(state: &mut SimulationState, input: &TickInput, now: f64) {
    let dt_base = match state.last_update {
        Some(last) => {
            let dt = now - last;
            if dt.is_finite() && dt > 0.0 { dt } else { DEFAULT_DT }
        }
        None => DEFAULT_DT,
    };
    let dt_base = dt_base.clamp(MIN_DT, MAX_DT);
    state.last_update = Some(now);
    state.now = now;
    state.fx_particles_this_frame = 0;

    // Always drained so a paused frame never leaves kills half-applied
    if !state.kill_queue.is_empty() {
        state.process_kill_queue();
    }

    if state.paused {
        return;
    }

    if state.time_warp_active && now > state.time_warp_end {
        state.time_warp_active = false;
    }

    let player_pos = state.player.pos;
    state.nearby_enemies = state
        .enemies
        .iter()
        .filter(|e| !e.dead && e.pos.distance_squared(player_pos) < NEARBY_RANGE * NEARBY_RANGE)
        .count();

    let time_scale = if state.time_warp_active { TIME_WARP_SCALE } else { 1.0 };
    let mut hit_scale = 1.0;
    if state.settings.hit_stop_enabled {
        if now < state.hit_stop_end {
            hit_scale = clamp_finite(state.hit_stop_scale, 0.05, 1.0);
        } else {
            state.hit_stop_scale = 1.0;
        }
    }
    let dt = dt_base * time_scale * hit_scale;

    if let Some(at) = state.player.pending_death_at {
        if now >= at {
            if state.player.stats.health <= 1.0 {
                state.end_run();
            }
            state.player.pending_death_at = None;
        }
    }
    if state.game_over {
        return;
    }

    let input = input.sanitized();
    let moving = move_player(state, input.movement, dt, now);

    auto_fire(state, moving, now);
    periodic_triggers(state, moving, now);

    state.update_enemies(dt, now);
    state.update_orbitals(now);
    state.update_drones(now);
    state.update_ghosts(now);
    state.update_bullet_homing(dt);
    state.update_lightning_aura(dt, now);
    state.update_enemy_bullets(dt, now);

    for b in state.bullets.iter_mut().filter(|b| !b.dead) {
        b.pos += b.vel * dt;
    }

    state.update_hazards(now);
    state.update_exp_orbs(now);

    state.collide_bullets(now);
    state.collide_mines(now);
    state.collide_player(now);

    state.process_kill_queue();
    state.update_particles(dt, now);
    cleanup(state, now);
}

/// Returns whether the player moved this frame
fn move_player(state: &mut SimulationState, movement: DVec2, dt: f64, now: f64) -> bool {
    let moving = movement != DVec2::ZERO;
    let player = &mut state.player;
    let s = &player.stats;

    if moving {
        let mut speed = state.settings.base_player_speed * s.speed_multi;
        if s.momentum_enabled {
            player.current_momentum = (player.current_momentum + dt * 2.0).min(1.0);
            speed *= 1.0 + player.current_momentum * 0.5;
        }
        player.pos += movement * speed * dt;

        if player.stats.fire_trail_enabled && now - player.timers.last_fire_trail > FIRE_TRAIL_INTERVAL {
            player.timers.last_fire_trail = now;
            let pos = player.pos;
            state.create_fire_trail(pos, now);
        }
    } else {
        if s.charge_attack_enabled {
            player.current_charge = (player.current_charge + dt * s.charge_speed).min(s.charge_max_bonus);
        }
        if s.momentum_enabled {
            player.current_momentum = (player.current_momentum - dt * 3.0).max(0.0);
        }
    }

    state.player.was_moving = moving;
    state.player.movement = movement;
    state.camera.pos = state.player.pos;
    moving
}

fn auto_fire(state: &mut SimulationState, moving: bool, now: f64) {
    let s = &state.player.stats;
    let mut interval = s.shoot_interval;
    if moving && s.moving_fire_rate_bonus > 0.0 {
        interval *= 1.0 - s.moving_fire_rate_bonus;
    }
    if s.berserker_mode && s.raw_hp_ratio() < s.berserker_threshold {
        interval *= 0.5;
    }

    if now - state.player.timers.last_shoot > interval && !state.enemies.is_empty() {
        state.shoot(now);
        state.player.timers.last_shoot = now;
    }
}

/// Regen, mines, meteors, black hole and streak decay, each on its own timer
fn periodic_triggers(state: &mut SimulationState, moving: bool, now: f64) {
    let s = &state.player.stats;
    let mut regen = s.regen_rate;
    let recently_hit = state.player.last_damage_time.is_some_and(|t| now - t < 5.0);
    if s.combat_regen_boost && recently_hit {
        regen *= 3.0;
    }
    if s.emergency_heal_active && s.raw_hp_ratio() < 0.25 {
        regen += s.max_health * 0.05;
    }
    if regen > 0.0 && now - state.player.timers.last_regen > 1.0 {
        state.heal(regen);
        state.player.timers.last_regen = now;
    }

    let s = &state.player.stats;
    if s.mine_drop_enabled && moving && now - state.player.timers.last_mine > s.mine_drop_interval {
        let pos = state.player.pos;
        state.drop_mine(pos, now);
        state.player.timers.last_mine = now;
    }

    let s = &state.player.stats;
    if s.meteor_enabled && now - state.player.timers.last_meteor > s.meteor_interval {
        for _ in 0..s.meteor_count {
            state.summon_meteor(now);
        }
        state.player.timers.last_meteor = now;
    }

    if state.player.stats.black_hole_ability && now - state.player.timers.last_black_hole > 15.0 {
        let pos = state.player.pos;
        state.create_black_hole(pos, now, false);
        state.player.timers.last_black_hole = now;
    }

    let player = &mut state.player;
    if player.stats.kill_streak_enabled && now - player.last_kill_time > 3.0 {
        player.kill_streak = player.kill_streak.saturating_sub(1);
    }
}

/// Swap-remove every element matching `expired`, walking indices high to low
pub fn sweep<T>(items: &mut Vec<T>, expired: impl Fn(&T) -> bool) {
    for i in (0..items.len()).rev() {
        if expired(&items[i]) {
            items.swap_remove(i);
        }
    }
}

fn cleanup(state: &mut SimulationState, now: f64) {
    sweep(&mut state.enemies, |e| e.is_expired());
    sweep(&mut state.bullets, |b| b.dead);
    sweep(&mut state.enemy_bullets, |b| b.dead);
    sweep(&mut state.exp_orbs, |o| o.dead);
    sweep(&mut state.mines, |m| m.dead);
    sweep(&mut state.fire_trails, |f| f.dead);
    sweep(&mut state.meteor_warnings, |m| m.dead);
    sweep(&mut state.black_holes, |b| b.dead);
    sweep(&mut state.poison_clouds, |p| p.dead);
    sweep(&mut state.particles, |p| p.dead);
    sweep(&mut state.effects, |e| now >= e.end);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;
    use crate::sim::director::spawn_enemy_at;
    use crate::sim::entities::EnemyKind;
    use proptest::prelude::*;

    const FRAME: f64 = 1.0 / 60.0;

    fn new_state(seed: u64) -> SimulationState {
        SimulationState::new(seed, Settings::default(), 0.0)
    }

    fn run(state: &mut SimulationState, frames: usize) {
        for f in 0..frames {
            let t = f as f64 * FRAME;
            let input = TickInput::new((t * 0.7).cos(), (t * 0.7).sin());
            state.advance(&input, t);
            while state.leveling_up {
                state.select_skill(0);
            }
        }
    }

    #[test]
    fn test_first_frame_uses_default_dt() {
        let mut state = new_state(1);
        tick(&mut state, &TickInput::new(1.0, 0.0), 1.0);
        assert!((state.player.pos.x - 3.2).abs() < 1e-9);
        assert_eq!(state.camera.pos, state.player.pos);
        assert!(state.player.was_moving);
    }

    #[test]
    fn test_long_frame_is_clamped() {
        let mut state = new_state(1);
        tick(&mut state, &TickInput::new(1.0, 0.0), 0.0);
        tick(&mut state, &TickInput::new(1.0, 0.0), 1.0);
        // 3.2 then 200 * 0.05
        assert!((state.player.pos.x - 13.2).abs() < 1e-9);
    }

    #[test]
    fn test_input_sanitized() {
        assert_eq!(TickInput::new(f64::NAN, 1.0).sanitized().movement, DVec2::ZERO);
        let clamped = TickInput::new(3.0, 4.0).sanitized().movement;
        assert!((clamped.length() - 1.0).abs() < 1e-9);
        assert_eq!(TickInput::new(0.5, 0.0).sanitized().movement, DVec2::new(0.5, 0.0));
    }

    #[test]
    fn test_sweep_removes_matching() {
        let mut items = vec![1, 2, 3, 4, 5];
        sweep(&mut items, |x| x % 2 == 0);
        items.sort();
        assert_eq!(items, vec![1, 3, 5]);
    }

    #[test]
    fn test_kill_queue_drains_while_paused() {
        let mut state = new_state(2);
        let i = spawn_enemy_at(&mut state, EnemyKind::Grunt, DVec2::new(200.0, 0.0), 0.0, false);
        state.enemies[i].dead = true;
        state.queue_kill(i, 0.0);
        state.paused = true;

        tick(&mut state, &TickInput::default(), 0.1);
        assert!(state.kill_queue.is_empty());
        assert_eq!(state.run_stats.kills, 1);
        // Paused: no cleanup yet
        assert_eq!(state.enemies.len(), 1);
        assert_eq!(state.player.pos, DVec2::ZERO);
    }

    #[test]
    fn test_cleanup_sweeps_expired() {
        let mut state = new_state(2);
        let i = spawn_enemy_at(&mut state, EnemyKind::Grunt, DVec2::new(600.0, 0.0), 0.0, false);
        state.enemies[i].dead = true;
        state.create_bullet(0.0, 0.0);
        state.bullets[0].dead = true;
        state.show_label("BLOCK", 0xffffff, 0.0);

        tick(&mut state, &TickInput::default(), 5.0);
        assert!(state.enemies.is_empty());
        assert!(state.bullets.is_empty());
        assert!(state.effects.is_empty());
    }

    #[test]
    fn test_last_stand_resolves() {
        let mut state = new_state(3);
        state.player.stats.health = 1.0;
        state.player.pending_death_at = Some(5.0);
        tick(&mut state, &TickInput::default(), 4.0);
        assert!(!state.game_over);
        tick(&mut state, &TickInput::default(), 5.0);
        assert!(state.game_over);
        assert!(state.player.pending_death_at.is_none());

        let mut healed = new_state(3);
        healed.player.stats.health = 40.0;
        healed.player.pending_death_at = Some(5.0);
        tick(&mut healed, &TickInput::default(), 5.0);
        assert!(!healed.game_over);
        assert!(healed.player.pending_death_at.is_none());
    }

    #[test]
    fn test_regen_once_per_second() {
        let mut state = new_state(4);
        state.player.stats.health = 50.0;
        state.player.stats.regen_rate = 2.0;
        tick(&mut state, &TickInput::default(), 1.5);
        tick(&mut state, &TickInput::default(), 1.51);
        assert!((state.player.stats.health - 52.0).abs() < 1e-9);
    }

    #[test]
    fn test_charge_builds_while_stationary() {
        let mut state = new_state(4);
        state.player.stats.charge_attack_enabled = true;
        state.player.stats.charge_speed = 1.0;
        state.player.stats.charge_max_bonus = 0.02;
        tick(&mut state, &TickInput::default(), 0.0);
        assert!((state.player.current_charge - 0.016).abs() < 1e-9);
        tick(&mut state, &TickInput::default(), 0.05);
        assert!((state.player.current_charge - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_auto_fire_needs_enemies() {
        let mut state = new_state(5);
        tick(&mut state, &TickInput::default(), 1.0);
        assert!(state.bullets.is_empty());

        spawn_enemy_at(&mut state, EnemyKind::Tank, DVec2::new(400.0, 0.0), 1.0, false);
        tick(&mut state, &TickInput::default(), 1.02);
        assert_eq!(state.bullets.len(), 1);
        assert_eq!(state.player.timers.last_shoot, 1.02);
    }

    #[test]
    fn test_same_seed_same_run() {
        let mut a = new_state(99);
        let mut b = new_state(99);
        run(&mut a, 900);
        run(&mut b, 900);
        let ja = serde_json::to_string(&a.snapshot()).unwrap();
        let jb = serde_json::to_string(&b.snapshot()).unwrap();
        assert_eq!(ja, jb);
        assert_eq!(a.run_stats.kills, b.run_stats.kills);
    }

    proptest! {
        #[test]
        fn test_arbitrary_input_keeps_player_finite(
            xs in prop::collection::vec((-1e9f64..1e9, -1e9f64..1e9), 1..60)
        ) {
            let mut state = new_state(7);
            for (i, (x, y)) in xs.into_iter().enumerate() {
                tick(&mut state, &TickInput::new(x, y), i as f64 * FRAME);
            }
            prop_assert!(state.player.pos.is_finite());
            prop_assert!(state.player.pos.length() <= 60.0 * 200.0 * MAX_DT + 1e-6);
        }
    }
}
