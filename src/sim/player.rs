//! Player state, stat block and progression
//!
//! `PlayerStats` is the flat block every skill mutates. Runtime bookkeeping
//! (timers, streaks, charge) lives on `Player` next to it.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::fx::colors;
use super::numeric::{clamp_finite, safe_non_neg};
use super::state::{GameEvent, SimulationState};
use crate::consts::*;

/// Every tunable the skill system can touch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerStats {
    // === Core ===
    pub health: f64,
    pub max_health: f64,
    pub speed_multi: f64,
    pub bullet_damage: f64,
    pub shoot_interval: f64,
    pub bullet_count: u32,
    pub bullet_speed_multi: f64,
    pub bullet_scale: f64,
    pub bullet_lifetime: f64,
    pub knockback_force: f64,
    pub spread_angle: f64,
    pub pickup_range: f64,
    pub exp_magnet_all: bool,
    pub crit_rate: f64,
    pub crit_damage_multi: f64,
    pub damage_reduction: f64,
    pub exp_multiplier: f64,
    pub regen_rate: f64,
    pub luck_bonus: f64,
    pub move_shoot_penalty: bool,

    // === Bullet variants ===
    pub pierce_count: u32,
    pub lifesteal_chance: f64,
    pub lifesteal_percent: f64,
    pub area_damage_radius: f64,
    pub homing_strength: f64,
    pub split_on_hit: bool,
    pub split_count: u32,
    pub bounce_count: u32,
    pub bullet_gravity_pull: f64,
    pub freeze_chance: f64,
    pub freeze_duration: f64,
    pub burn_chance: f64,
    pub burn_damage: f64,
    pub burn_duration: f64,
    pub burn_spread: bool,
    pub poison_chance: f64,
    pub poison_damage: f64,
    pub poison_duration: f64,
    pub poison_explode: bool,
    pub chain_lightning: bool,
    pub chain_count: u32,
    pub chain_damage_decay: f64,
    pub explosion_knockback: bool,
    pub black_hole_on_death: bool,

    // === Defense ===
    pub orbital_shield_count: u32,
    pub orbital_shield_speed: f64,
    pub orbital_shield_damage: f64,
    pub thorns_damage_percent: f64,
    pub thorns_slow: bool,
    pub dodge_chance: f64,
    pub dodge_invincibility: bool,
    pub iframe_duration: f64,
    pub low_hp_damage_boost: bool,
    pub low_hp_threshold: f64,
    pub low_hp_damage_multi: f64,
    pub berserker_mode: bool,
    pub berserker_threshold: f64,
    pub emergency_heal_active: bool,
    pub phoenix_revive: bool,
    pub phoenix_chance: f64,
    /// Largest single hit as a fraction of max health
    pub damage_cap: f64,
    pub adaptive_armor: bool,
    pub last_stand: bool,
    pub block_chance: f64,
    pub perfect_block_counter: bool,
    pub combat_regen_boost: bool,

    // === Summons ===
    pub drone_count: u32,
    pub drone_damage: f64,
    pub mine_drop_enabled: bool,
    pub mine_drop_interval: f64,
    pub mine_damage: f64,
    pub mine_radius: f64,
    pub turret_count: u32,
    pub turret_aoe: bool,
    pub turret_damage: f64,
    pub blade_orbit_count: u32,
    pub blade_orbit_radius: f64,
    pub blade_orbit_damage: f64,
    pub ghost_count: u32,
    pub ghost_slow: bool,
    pub fire_trail_enabled: bool,
    pub fire_trail_damage: f64,
    pub fire_trail_slow: bool,
    pub meteor_enabled: bool,
    pub meteor_interval: f64,
    pub meteor_count: u32,
    pub meteor_damage: f64,
    pub lightning_aura_enabled: bool,
    pub lightning_aura_radius: f64,
    /// Damage per second inside the aura
    pub lightning_aura_damage: f64,
    pub shadow_clone_count: u32,
    pub shadow_clone_duration: f64,
    pub black_hole_ability: bool,
    pub black_hole_power: f64,

    // === Triggers ===
    pub kill_streak_enabled: bool,
    pub kill_streak_max_bonus: f64,
    pub kill_streak_decay: f64,
    pub kill_heal_amount: f64,
    pub kill_attack_speed_boost: bool,
    pub death_explosion: bool,
    pub death_explosion_radius: f64,
    pub chain_explosion: bool,
    pub rage_on_hit: bool,
    pub rage_damage_bonus: f64,
    pub revenge_enabled: bool,
    pub lucky_crit_chance: f64,
    pub lucky_crit_multi: f64,
    pub execute_enabled: bool,
    pub execute_threshold: f64,
    pub instant_kill_threshold: f64,
    pub overload_chance: f64,
    pub overload_chain: bool,
    pub time_warp_on_kill: bool,

    // === Special ===
    pub charge_attack_enabled: bool,
    pub charge_speed: f64,
    pub charge_max_bonus: f64,
    pub dash_enabled: bool,
    pub dash_cooldown: f64,
    pub dash_damage: bool,
    pub ammo_recovery_chance: f64,
    pub free_attack_chance: f64,
    pub melee_counter_enabled: bool,
    pub all_direction_fire: bool,
    pub recoil_push: bool,
    pub suppression_enabled: bool,
    pub vulnerability_mark: bool,
    pub vulnerability_bonus: f64,
    pub moving_fire_rate_bonus: f64,
    pub stationary_damage_bonus: f64,
    pub gambler_mode: bool,
    pub critical_state_enabled: bool,
    pub symbiosis_enabled: bool,
    pub clearing_bonus: bool,
    pub crowd_control: bool,
    pub momentum_enabled: bool,
    pub momentum_damage: bool,

    // === Blade upgrades ===
    pub blade_orbit_speed: f64,
    pub blade_orbit_scale: f64,
    pub blade_orbit_freeze_chance: f64,
    pub blade_orbit_freeze_duration: f64,
    pub blade_orbit_burn_chance: f64,
    pub blade_orbit_burn_damage: f64,
    pub blade_orbit_burn_duration: f64,
    pub blade_orbit_poison_chance: f64,
    pub blade_orbit_poison_damage: f64,
    pub blade_orbit_poison_duration: f64,
    pub blade_orbit_lifesteal_chance: f64,
    pub blade_orbit_lifesteal_percent: f64,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            health: PLAYER_START_HEALTH,
            max_health: PLAYER_START_HEALTH,
            speed_multi: 1.0,
            bullet_damage: 15.0,
            shoot_interval: 0.6,
            bullet_count: 1,
            bullet_speed_multi: 1.0,
            bullet_scale: 1.0,
            bullet_lifetime: 1.5,
            knockback_force: 0.0,
            spread_angle: 0.15,
            pickup_range: 100.0,
            exp_magnet_all: false,
            crit_rate: 0.05,
            crit_damage_multi: 2.0,
            damage_reduction: 0.0,
            exp_multiplier: 1.0,
            regen_rate: 0.0,
            luck_bonus: 0.0,
            move_shoot_penalty: true,

            pierce_count: 0,
            lifesteal_chance: 0.0,
            lifesteal_percent: 0.2,
            area_damage_radius: 0.0,
            homing_strength: 0.0,
            split_on_hit: false,
            split_count: 0,
            bounce_count: 0,
            bullet_gravity_pull: 0.0,
            freeze_chance: 0.0,
            freeze_duration: 0.0,
            burn_chance: 0.0,
            burn_damage: 0.0,
            burn_duration: 0.0,
            burn_spread: false,
            poison_chance: 0.0,
            poison_damage: 0.0,
            poison_duration: 0.0,
            poison_explode: false,
            chain_lightning: false,
            chain_count: 0,
            chain_damage_decay: 0.7,
            explosion_knockback: false,
            black_hole_on_death: false,

            orbital_shield_count: 0,
            orbital_shield_speed: 1.0,
            orbital_shield_damage: 20.0,
            thorns_damage_percent: 0.0,
            thorns_slow: false,
            dodge_chance: 0.0,
            dodge_invincibility: false,
            iframe_duration: 0.5,
            low_hp_damage_boost: false,
            low_hp_threshold: 0.2,
            low_hp_damage_multi: 1.5,
            berserker_mode: false,
            berserker_threshold: 0.3,
            emergency_heal_active: false,
            phoenix_revive: false,
            phoenix_chance: 0.0,
            damage_cap: 1.0,
            adaptive_armor: false,
            last_stand: false,
            block_chance: 0.0,
            perfect_block_counter: false,
            combat_regen_boost: false,

            drone_count: 0,
            drone_damage: 10.0,
            mine_drop_enabled: false,
            mine_drop_interval: 2.0,
            mine_damage: 50.0,
            mine_radius: 60.0,
            turret_count: 0,
            turret_aoe: false,
            turret_damage: 10.0,
            blade_orbit_count: 0,
            blade_orbit_radius: 120.0,
            blade_orbit_damage: 12.0,
            ghost_count: 0,
            ghost_slow: false,
            fire_trail_enabled: false,
            fire_trail_damage: 8.0,
            fire_trail_slow: false,
            meteor_enabled: false,
            meteor_interval: 10.0,
            meteor_count: 1,
            meteor_damage: 80.0,
            lightning_aura_enabled: false,
            lightning_aura_radius: 0.0,
            lightning_aura_damage: 5.0,
            shadow_clone_count: 0,
            shadow_clone_duration: 5.0,
            black_hole_ability: false,
            black_hole_power: 1.0,

            kill_streak_enabled: false,
            kill_streak_max_bonus: 1.0,
            kill_streak_decay: 1.0,
            kill_heal_amount: 0.0,
            kill_attack_speed_boost: false,
            death_explosion: false,
            death_explosion_radius: 50.0,
            chain_explosion: false,
            rage_on_hit: false,
            rage_damage_bonus: 0.0,
            revenge_enabled: false,
            lucky_crit_chance: 0.0,
            lucky_crit_multi: 10.0,
            execute_enabled: false,
            execute_threshold: 0.0,
            instant_kill_threshold: 0.0,
            overload_chance: 0.0,
            overload_chain: false,
            time_warp_on_kill: false,

            charge_attack_enabled: false,
            charge_speed: 1.0,
            charge_max_bonus: 2.0,
            dash_enabled: false,
            dash_cooldown: 3.0,
            dash_damage: false,
            ammo_recovery_chance: 0.0,
            free_attack_chance: 0.0,
            melee_counter_enabled: false,
            all_direction_fire: false,
            recoil_push: false,
            suppression_enabled: false,
            vulnerability_mark: false,
            vulnerability_bonus: 0.0,
            moving_fire_rate_bonus: 0.0,
            stationary_damage_bonus: 0.0,
            gambler_mode: false,
            critical_state_enabled: false,
            symbiosis_enabled: false,
            clearing_bonus: false,
            crowd_control: false,
            momentum_enabled: false,
            momentum_damage: false,

            blade_orbit_speed: 1.0,
            blade_orbit_scale: 1.0,
            blade_orbit_freeze_chance: 0.0,
            blade_orbit_freeze_duration: 0.0,
            blade_orbit_burn_chance: 0.0,
            blade_orbit_burn_damage: 0.0,
            blade_orbit_burn_duration: 0.0,
            blade_orbit_poison_chance: 0.0,
            blade_orbit_poison_damage: 0.0,
            blade_orbit_poison_duration: 0.0,
            blade_orbit_lifesteal_chance: 0.0,
            blade_orbit_lifesteal_percent: 0.2,
        }
    }
}

impl PlayerStats {
    /// Current health as a fraction of max, in [0, 1]
    pub fn hp_ratio(&self) -> f64 {
        clamp_finite(self.health / self.max_health.max(1.0), 0.0, 1.0)
    }

    /// Raw health/max ratio as the damage modifiers read it
    pub fn raw_hp_ratio(&self) -> f64 {
        if self.max_health > 0.0 {
            self.health / self.max_health
        } else {
            0.0
        }
    }
}

/// A skill the player has taken, for scoring and display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquiredSkill {
    pub id: String,
    pub tier: u8,
}

/// "Time since last X" cadence timers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerTimers {
    pub last_shoot: f64,
    pub last_regen: f64,
    pub last_mine: f64,
    pub last_meteor: f64,
    pub last_black_hole: f64,
    pub last_fire_trail: f64,
}

/// The player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub pos: DVec2,
    pub radius: f64,
    /// Time of the last accepted hit (drives i-frames)
    pub last_hit: f64,
    pub stats: PlayerStats,

    // === Progression ===
    pub level: u32,
    pub current_exp: f64,
    pub max_exp: f64,
    pub acquired: Vec<AcquiredSkill>,

    // === Combat runtime ===
    pub kill_streak: u32,
    pub last_kill_time: f64,
    pub rage_end: f64,
    pub revenge_next_crit: bool,
    pub current_charge: f64,
    pub current_momentum: f64,
    pub was_moving: bool,
    /// Last sanitized movement input
    pub movement: DVec2,
    /// `None` until the first damage taken
    pub last_damage_time: Option<f64>,
    /// Scheduled death after a last stand
    pub pending_death_at: Option<f64>,
    pub timers: PlayerTimers,
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

impl Player {
    pub fn new() -> Self {
        Self {
            pos: DVec2::ZERO,
            radius: PLAYER_RADIUS,
            last_hit: -999.0,
            stats: PlayerStats::default(),
            level: 1,
            current_exp: 0.0,
            max_exp: START_MAX_EXP,
            acquired: Vec::new(),
            kill_streak: 0,
            last_kill_time: 0.0,
            rage_end: 0.0,
            revenge_next_crit: false,
            current_charge: 0.0,
            current_momentum: 0.0,
            was_moving: false,
            movement: DVec2::ZERO,
            last_damage_time: None,
            pending_death_at: None,
            timers: PlayerTimers::default(),
        }
    }

    /// Inside the post-hit invulnerability window
    pub fn is_invulnerable(&self, now: f64) -> bool {
        now - self.last_hit < self.stats.iframe_duration
    }

    pub fn exp_ratio(&self) -> f64 {
        if self.max_exp > 0.0 {
            clamp_finite(self.current_exp / self.max_exp, 0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Exp requirement growth for reaching `next_level`
pub fn exp_curve_multiplier(next_level: u32) -> f64 {
    if next_level <= 6 {
        1.12
    } else if next_level <= 12 {
        1.16
    } else {
        1.20
    }
}

/// Early-run exp boost so the first levels come quickly
pub fn early_exp_boost(elapsed: f64) -> f64 {
    if elapsed < 45.0 {
        1.35
    } else if elapsed < 90.0 {
        1.15
    } else {
        1.0
    }
}

impl SimulationState {
    /// Restore health, clamped to max
    pub fn heal(&mut self, amount: f64) {
        let amount = safe_non_neg(amount, 0.0);
        let stats = &mut self.player.stats;
        let max_hp = safe_non_neg(stats.max_health, 0.0);
        stats.health = clamp_finite(safe_non_neg(stats.health + amount, 0.0), 0.0, max_hp);
        self.emit_state_changed();
    }

    /// Apply damage to the player and resolve death, phoenix and last stand
    pub fn take_damage(&mut self, amount: f64, now: f64) {
        let amount = safe_non_neg(amount, 0.0);

        self.run_stats.damage_taken = safe_non_neg(self.run_stats.damage_taken + amount, 0.0);
        self.combat.record_damage_taken(amount);
        self.player.stats.health = safe_non_neg(self.player.stats.health - amount, 0.0);

        self.flash(colors::RED, 0.30, 0.20, now);

        if self.player.stats.health <= 0.0 {
            let phoenix_chance = self.player.stats.phoenix_chance;
            if self.player.stats.phoenix_revive && self.chance(phoenix_chance) {
                let stats = &mut self.player.stats;
                stats.health = safe_non_neg(stats.max_health * 0.3, 1.0);
                stats.phoenix_revive = false;
                self.push_effect(super::entities::EffectKind::Phoenix, self.player.pos, now, 0.5);
                log::info!("Phoenix revive at {:.0} hp", self.player.stats.health);
            } else if self.player.stats.last_stand {
                self.player.stats.health = 1.0;
                self.player.stats.last_stand = false;
                self.player.pending_death_at = Some(now + 3.0);
            } else {
                self.end_run();
            }
        }
        self.emit_state_changed();
    }

    /// Stop the run: health to zero, simulation paused
    pub(crate) fn end_run(&mut self) {
        if self.game_over {
            return;
        }
        self.player.stats.health = 0.0;
        self.paused = true;
        self.game_over = true;
        log::info!(
            "Game over at level {} after {} kills",
            self.player.level,
            self.run_stats.kills
        );
        self.push_event(GameEvent::GameOver);
    }

    /// Grant exp, levelling up (and pausing for a skill pick) when the bar fills
    pub fn add_exp(&mut self, amount: f64, now: f64) {
        let boost = early_exp_boost(now - self.start_time);
        let amount = safe_non_neg(amount, 0.0);
        let gained = safe_non_neg(amount * boost * self.player.stats.exp_multiplier, 0.0);

        self.run_stats.exp_gained = safe_non_neg(self.run_stats.exp_gained + gained, 0.0);
        self.combat.record_exp(gained);

        let player = &mut self.player;
        player.current_exp = safe_non_neg(player.current_exp + gained, 0.0);

        if player.current_exp >= player.max_exp {
            player.current_exp = safe_non_neg(player.current_exp - player.max_exp, 0.0);
            let next_level = player.level + 1;
            player.max_exp = safe_non_neg(player.max_exp * exp_curve_multiplier(next_level), 1.0);
            player.level = next_level;
            log::info!("Level up -> {} (next at {:.0} exp)", next_level, player.max_exp);

            self.combat.record_level_up();
            self.paused = true;

            let pos = self.player.pos;
            self.flash(colors::GOLD, 0.22, 0.18, now);
            self.shake_camera(0.22, 10.0, now);
            self.hit_stop(0.10, 0.18, now);
            self.emit_burst(pos, 26, colors::GOLD, now, 520.0);

            self.begin_level_up();
        }

        self.emit_state_changed();
    }
}
