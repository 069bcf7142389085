//! Skill registry and level-up selection
//!
//! A skill is a named, tiered mutator over `PlayerStats`. The registry is a
//! static table; drawing is weighted by tier and the player's level.

use super::player::{AcquiredSkill, PlayerStats};
use super::state::{GameEvent, SimulationState};

/// Choices offered per level-up
pub const CHOICES_PER_LEVEL: usize = 3;

/// A level-up reward
#[derive(Debug)]
pub struct Skill {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Rarity class 1-5
    pub tier: u8,
    /// Only offered once the player owns blades
    pub requires_blades: bool,
    /// Never recorded as acquired, so it can recur
    pub repeatable: bool,
    pub apply: fn(&mut PlayerStats),
}

const fn skill(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    tier: u8,
    apply: fn(&mut PlayerStats),
) -> Skill {
    Skill {
        id,
        name,
        description,
        tier,
        requires_blades: false,
        repeatable: false,
        apply,
    }
}

const fn blade(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    tier: u8,
    apply: fn(&mut PlayerStats),
) -> Skill {
    Skill {
        requires_blades: true,
        ..skill(id, name, description, tier, apply)
    }
}

const fn training(id: &'static str, name: &'static str, description: &'static str, apply: fn(&mut PlayerStats)) -> Skill {
    Skill {
        repeatable: true,
        ..skill(id, name, description, 1, apply)
    }
}

/// Scale max health, keeping current health within it
fn scale_max_health(s: &mut PlayerStats, factor: f64) {
    s.max_health *= factor;
    s.health = s.health.min(s.max_health);
}

pub static SKILLS: &[Skill] = &[
    // === Core ===
    skill("power_shot", "Power Shot", "Damage +15%", 1, |s| s.bullet_damage *= 1.15),
    skill("rapid_fire", "Rapid Fire", "Fire rate +12%", 1, |s| s.shoot_interval *= 0.88),
    skill("swift_step", "Swift Step", "Move speed +15%", 1, |s| s.speed_multi *= 1.15),
    skill("big_rounds", "Big Rounds", "Bullet size +25%", 1, |s| s.bullet_scale *= 1.25),
    skill("vitality", "Vitality", "Max health +30", 1, |s| {
        s.max_health += 30.0;
        s.health += 30.0;
    }),
    skill("velocity", "Velocity", "Bullet speed +20%", 1, |s| s.bullet_speed_multi *= 1.2),
    skill("long_range", "Long Range", "Bullet lifetime +0.5s", 1, |s| s.bullet_lifetime += 0.5),
    skill("marksman", "Marksman", "Crit rate +8%", 1, |s| s.crit_rate += 0.08),
    skill("crit_master", "Crit Master", "Crit damage +30%", 1, |s| s.crit_damage_multi += 0.3),
    skill("magnetism", "Magnetism", "Pickup range +40%", 1, |s| s.pickup_range *= 1.4),
    skill("plating", "Plating", "Damage taken -10%", 1, |s| s.damage_reduction += 0.1),
    skill("fast_learner", "Fast Learner", "Exp gained +15%", 1, |s| s.exp_multiplier *= 1.15),
    skill("lucky_star", "Lucky Star", "Rare drop rate +10%", 1, |s| s.luck_bonus += 0.1),
    skill("lightweight", "Lightweight", "No fire rate loss while moving", 1, |s| {
        s.move_shoot_penalty = false
    }),
    skill("recovery", "Recovery", "Regenerate 0.5 health per second", 1, |s| s.regen_rate += 0.5),
    // === Bullet variants ===
    skill("multishot", "Multishot", "+1 bullet", 2, |s| s.bullet_count += 1),
    skill("scattergun", "Scattergun", "+3 bullets, wider spread", 2, |s| {
        s.bullet_count += 3;
        s.spread_angle += 0.25;
    }),
    skill("piercing", "Piercing Rounds", "Bullets pierce 1 enemy", 2, |s| s.pierce_count += 1),
    skill("splitting", "Splitting Rounds", "Bullets split in 2 on hit", 3, |s| {
        s.split_on_hit = true;
        s.split_count = 2;
    }),
    skill("homing", "Homing", "Bullets steer toward enemies", 2, |s| s.homing_strength += 0.3),
    skill("seeker", "Seeker", "Much stronger homing", 3, |s| s.homing_strength += 0.7),
    skill("ricochet", "Ricochet", "Bullets bounce once", 2, |s| s.bounce_count += 1),
    skill("super_ricochet", "Super Ricochet", "Bullets bounce 3 times", 3, |s| s.bounce_count += 3),
    skill("frost_rounds", "Frost Rounds", "20% chance to freeze for 1s", 2, |s| {
        s.freeze_chance += 0.2;
        s.freeze_duration = s.freeze_duration.max(1.0);
    }),
    skill("frost_master", "Frost Master", "Freeze chance +30%, duration +1s", 3, |s| {
        s.freeze_chance += 0.3;
        s.freeze_duration += 1.0;
    }),
    skill("incendiary", "Incendiary", "Bullets ignite enemies for 3s", 2, |s| {
        s.burn_chance = 1.0;
        s.burn_damage = 5.0;
        s.burn_duration = 3.0;
    }),
    skill("hellfire", "Hellfire", "Burn damage +100%, spreads to neighbours", 3, |s| {
        s.burn_damage *= 2.0;
        s.burn_spread = true;
    }),
    skill("venom", "Venom", "Bullets poison enemies for 5s", 2, |s| {
        s.poison_chance = 1.0;
        s.poison_damage = 3.0;
        s.poison_duration = 5.0;
    }),
    skill("toxic_burst", "Toxic Burst", "Poison +100%, poisoned enemies burst on death", 3, |s| {
        s.poison_damage *= 2.0;
        s.poison_explode = true;
    }),
    skill("chain_lightning", "Chain Lightning", "Hits arc to 2 nearby enemies", 3, |s| {
        s.chain_lightning = true;
        s.chain_count = 2;
    }),
    skill("superconductor", "Superconductor", "+2 arcs, no damage decay", 3, |s| {
        s.chain_count += 2;
        s.chain_damage_decay = 1.0;
    }),
    skill("explosive", "Explosive Rounds", "Hits explode in a small area", 2, |s| s.area_damage_radius = 30.0),
    skill("nuke", "Nuke", "Explosion radius +100%, knocks back", 3, |s| {
        s.area_damage_radius *= 2.0;
        s.explosion_knockback = true;
    }),
    skill("gravity_rounds", "Gravity Rounds", "Bullets pull nearby enemies", 2, |s| {
        s.bullet_gravity_pull = 50.0
    }),
    skill("singularity_rounds", "Singularity Rounds", "Expiring bullets leave a black hole", 3, |s| {
        s.black_hole_on_death = true
    }),
    // === Defense ===
    skill("energy_shield", "Energy Shield", "1 orbiting shield orb", 2, |s| s.orbital_shield_count += 1),
    skill("shield_matrix", "Shield Matrix", "+2 shield orbs, faster orbit", 3, |s| {
        s.orbital_shield_count += 2;
        s.orbital_shield_speed *= 1.5;
    }),
    skill("thorns", "Thorns", "Reflect 30% of damage taken", 2, |s| s.thorns_damage_percent += 0.3),
    skill("thorn_master", "Thorn Master", "Reflect +50%, slows attackers", 3, |s| {
        s.thorns_damage_percent += 0.5;
        s.thorns_slow = true;
    }),
    skill("evasion", "Evasion", "20% chance to dodge", 2, |s| s.dodge_chance += 0.2),
    skill("phantom", "Phantom", "Dodging grants brief invulnerability", 3, |s| {
        s.dodge_invincibility = true
    }),
    skill("iframes", "Afterimage", "Invulnerability after a hit +0.5s", 2, |s| s.iframe_duration += 0.5),
    skill("last_ditch", "Last Ditch", "Damage +50% below 20% health", 2, |s| {
        s.low_hp_damage_boost = true;
        s.low_hp_threshold = 0.2;
        s.low_hp_damage_multi = 1.5;
    }),
    skill("berserker", "Berserker", "Fire rate x2 below 30% health", 3, |s| {
        s.berserker_mode = true;
        s.berserker_threshold = 0.3;
    }),
    skill("vampire", "Vampire", "10% chance to heal 20% of damage dealt", 2, |s| {
        s.lifesteal_chance += 0.1;
        s.lifesteal_percent = 0.2;
    }),
    skill("blood_pact", "Blood Pact", "Always lifesteal, max health -20%", 3, |s| {
        s.lifesteal_chance = 1.0;
        s.lifesteal_percent = 0.15;
        scale_max_health(s, 0.8);
    }),
    skill("regeneration", "Regeneration", "Regenerate 2 health per second", 2, |s| s.regen_rate += 2.0),
    skill("super_regen", "Super Regen", "Regen x3 for 5s after a hit", 3, |s| s.combat_regen_boost = true),
    skill("emergency_repair", "Emergency Repair", "Heal 5% per second below 25% health", 2, |s| {
        s.emergency_heal_active = true
    }),
    skill("phoenix", "Phoenix", "50% chance to revive at 30% health", 3, |s| {
        s.phoenix_revive = true;
        s.phoenix_chance = 0.5;
    }),
    skill("tenacity", "Tenacity", "A single hit deals at most 25% max health", 3, |s| s.damage_cap = 0.25),
    skill("adaptive_armor", "Adaptive Armor", "Repeated damage types hurt less", 2, |s| s.adaptive_armor = true),
    skill("last_stand", "Last Stand", "Survive a lethal hit for 3s", 3, |s| s.last_stand = true),
    skill("block", "Block", "15% chance to block a hit", 2, |s| s.block_chance += 0.15),
    skill("perfect_block", "Perfect Block", "Blocks counter for 200% damage", 3, |s| {
        s.perfect_block_counter = true
    }),
    // === Summons ===
    skill("drone", "Attack Drone", "1 drone that fires at enemies", 2, |s| s.drone_count += 1),
    skill("drone_squadron", "Drone Squadron", "+2 drones, stronger shots", 3, |s| {
        s.drone_count += 2;
        s.drone_damage *= 1.5;
    }),
    skill("minelayer", "Minelayer", "Drop mines while moving", 2, |s| {
        s.mine_drop_enabled = true;
        s.mine_drop_interval = 2.0;
    }),
    skill("demolitions", "Demolitions", "Mine damage +100%, blast +50%", 3, |s| {
        s.mine_damage *= 2.0;
        s.mine_radius *= 1.5;
    }),
    skill("turret", "Auto Turret", "Deploy a turret", 2, |s| s.turret_count += 1),
    skill("heavy_turret", "Heavy Turret", "Turret shots deal area damage", 3, |s| {
        s.turret_aoe = true;
        s.turret_damage *= 1.5;
    }),
    skill("blade_orbit", "Blade Orbit", "2 blades circle around you", 2, |s| s.blade_orbit_count += 2),
    skill("dance_of_death", "Dance of Death", "+4 blades, wider orbit", 3, |s| {
        s.blade_orbit_count += 4;
        s.blade_orbit_radius *= 1.5;
    }),
    skill("ghost", "Ghost", "A ghost hunts the nearest enemy", 2, |s| s.ghost_count += 1),
    skill("ghost_legion", "Ghost Legion", "+3 ghosts, touches slow", 3, |s| {
        s.ghost_count += 3;
        s.ghost_slow = true;
    }),
    skill("fire_trail", "Fire Trail", "Leave burning ground while moving", 2, |s| s.fire_trail_enabled = true),
    skill("road_to_hell", "Road to Hell", "Fire damage +100%, slows", 3, |s| {
        s.fire_trail_damage *= 2.0;
        s.fire_trail_slow = true;
    }),
    skill("meteor", "Meteor Call", "A meteor strikes every 10s", 2, |s| {
        s.meteor_enabled = true;
        s.meteor_interval = 10.0;
    }),
    skill("meteor_shower", "Meteor Shower", "Meteors x3, interval halved", 3, |s| {
        s.meteor_count *= 3;
        s.meteor_interval *= 0.5;
    }),
    skill("lightning_aura", "Lightning Aura", "Shock nearby enemies continuously", 2, |s| {
        s.lightning_aura_enabled = true;
        s.lightning_aura_radius = 100.0;
    }),
    skill("thunder_god", "Thunder God", "Aura radius +100%, damage +50%", 3, |s| {
        s.lightning_aura_radius *= 2.0;
        s.lightning_aura_damage *= 1.5;
    }),
    skill("shadow_clone", "Shadow Clone", "A shadow mirrors your attacks", 3, |s| s.shadow_clone_count += 1),
    skill("doppelganger", "Doppelganger", "+2 shadows, longer duration", 3, |s| {
        s.shadow_clone_count += 2;
        s.shadow_clone_duration *= 1.5;
    }),
    skill("black_hole", "Black Hole", "Summon a black hole every 15s", 3, |s| s.black_hole_ability = true),
    skill("singularity", "Singularity", "Black hole pull and damage +100%", 3, |s| {
        s.black_hole_power *= 2.0
    }),
    // === Triggers ===
    skill("kill_streak", "Kill Streak", "Consecutive kills boost damage", 2, |s| s.kill_streak_enabled = true),
    skill("rampage", "Rampage", "Higher streak cap, slower decay", 3, |s| {
        s.kill_streak_max_bonus *= 2.0;
        s.kill_streak_decay *= 0.5;
    }),
    skill("bloodthirst", "Bloodthirst", "Kills heal 2", 2, |s| s.kill_heal_amount = 2.0),
    skill("soul_eater", "Soul Eater", "Kills heal 5 and speed up attacks", 3, |s| {
        s.kill_heal_amount = 5.0;
        s.kill_attack_speed_boost = true;
    }),
    skill("death_burst", "Death Burst", "Enemies explode on death", 2, |s| {
        s.death_explosion = true;
        s.death_explosion_radius = 50.0;
    }),
    skill("chain_reaction", "Chain Reaction", "Explosions can set off more explosions", 3, |s| {
        s.chain_explosion = true
    }),
    skill("rage", "Rage", "Damage +25% for 3s after a hit", 2, |s| {
        s.rage_on_hit = true;
        s.rage_damage_bonus = 0.25;
    }),
    skill("revenge", "Revenge", "Next attack after a hit always crits", 3, |s| s.revenge_enabled = true),
    skill("lucky_hit", "Lucky Hit", "5% chance for 10x damage", 2, |s| {
        s.lucky_crit_chance = 0.05;
        s.lucky_crit_multi = 10.0;
    }),
    skill("fortune", "Fortune", "Lucky hit chance doubled", 3, |s| s.lucky_crit_chance *= 2.0),
    skill("execute", "Execute", "Double damage to enemies under 30% health", 2, |s| {
        s.execute_enabled = true;
        s.execute_threshold = 0.3;
    }),
    skill("reaper", "Reaper", "Instantly kill enemies under 20% health", 3, |s| {
        s.instant_kill_threshold = 0.2
    }),
    skill("overload", "Overload", "Hits may trigger another volley", 2, |s| s.overload_chance = 0.3),
    skill("infinite_overload", "Infinite Overload", "Overload can chain", 3, |s| s.overload_chain = true),
    skill("time_warp", "Time Warp", "Kills may briefly slow time", 3, |s| s.time_warp_on_kill = true),
    // === Special ===
    skill("gatling", "Gatling", "Fire rate x2, damage -40%", 3, |s| {
        s.shoot_interval *= 0.5;
        s.bullet_damage *= 0.6;
    }),
    skill("sniper", "Sniper", "Fire rate -50%, damage x2, long range", 3, |s| {
        s.shoot_interval *= 2.0;
        s.bullet_damage *= 2.0;
        s.bullet_lifetime = 10.0;
    }),
    skill("shotgun", "Shotgun", "+5 bullets, wide spread, short range", 3, |s| {
        s.bullet_count += 5;
        s.spread_angle = 0.8;
        s.bullet_lifetime *= 0.5;
    }),
    skill("charge_attack", "Charge Attack", "Standing still charges the next shot", 2, |s| {
        s.charge_attack_enabled = true
    }),
    skill("super_charge", "Super Charge", "Charge speed +100%, higher cap", 3, |s| {
        s.charge_speed *= 2.0;
        s.charge_max_bonus *= 1.5;
    }),
    skill("dash", "Dash", "Double-tap to dash", 2, |s| {
        s.dash_enabled = true;
        s.dash_cooldown = 3.0;
    }),
    skill("lightning_dash", "Lightning Dash", "Dashing damages enemies in the path", 3, |s| {
        s.dash_damage = true
    }),
    skill("ammo_recovery", "Ammo Recovery", "Missed shots have a 30% refund chance", 2, |s| {
        s.ammo_recovery_chance = 0.3
    }),
    skill("perpetual_motion", "Perpetual Motion", "Hits may skip the fire cooldown", 2, |s| {
        s.free_attack_chance = 0.2
    }),
    skill("melee_counter", "Melee Counter", "Shockwave when enemies get close", 2, |s| {
        s.melee_counter_enabled = true
    }),
    skill("barrage", "Barrage", "Fire in every direction", 3, |s| {
        s.bullet_count += 8;
        s.spread_angle = std::f64::consts::TAU / s.bullet_count as f64;
        s.all_direction_fire = true;
    }),
    skill("recoil", "Recoil", "Shots push you backward", 2, |s| s.recoil_push = true),
    skill("suppression", "Suppression", "Enemies in the line of fire slow down", 2, |s| {
        s.suppression_enabled = true
    }),
    skill("vulnerability", "Vulnerability Mark", "Hit enemies take +30% damage for 3s", 2, |s| {
        s.vulnerability_mark = true;
        s.vulnerability_bonus = 0.3;
    }),
    skill("run_and_gun", "Run and Gun", "Fire rate +30% while moving", 2, |s| s.moving_fire_rate_bonus = 0.3),
    skill("steady_aim", "Steady Aim", "Damage +40% while standing still", 2, |s| {
        s.stationary_damage_bonus = 0.4
    }),
    skill("glass_cannon", "Glass Cannon", "Damage +100%, max health -50%", 3, |s| {
        s.bullet_damage *= 2.0;
        scale_max_health(s, 0.5);
    }),
    skill("juggernaut", "Juggernaut", "Health +100%, move speed -20%", 3, |s| {
        s.max_health *= 2.0;
        s.health *= 2.0;
        s.speed_multi *= 0.8;
    }),
    skill("gambler", "Gambler", "Each hit deals 50%-200% damage", 2, |s| s.gambler_mode = true),
    skill("critical_state", "Critical State", "More damage the closer health is to 50%", 3, |s| {
        s.critical_state_enabled = true
    }),
    skill("symbiosis", "Symbiosis", "+5% damage per enemy (max 50%)", 2, |s| s.symbiosis_enabled = true),
    skill("clean_sweep", "Clean Sweep", "Damage +50% with fewer than 5 enemies near", 2, |s| {
        s.clearing_bonus = true
    }),
    skill("crowd_breaker", "Crowd Breaker", "Area damage when more than 10 enemies are near", 2, |s| {
        s.crowd_control = true
    }),
    skill("momentum", "Momentum", "Speed builds while moving", 2, |s| s.momentum_enabled = true),
    skill("kinetic_force", "Kinetic Force", "Momentum also boosts damage", 3, |s| s.momentum_damage = true),
    // === Blade upgrades ===
    blade("blade_mastery", "Blade Mastery", "Blade damage +30%", 1, |s| s.blade_orbit_damage *= 1.30),
    blade("blade_reach", "Blade Reach", "Blade orbit radius +20", 1, |s| s.blade_orbit_radius += 20.0),
    blade("blade_tempo", "Blade Tempo", "Blade spin speed +25%", 1, |s| s.blade_orbit_speed *= 1.25),
    blade("blade_growth", "Blade Growth", "+1 blade", 2, |s| s.blade_orbit_count += 1),
    blade("blade_storm", "Blade Storm", "+3 blades, spin speed +20%", 3, |s| {
        s.blade_orbit_count += 3;
        s.blade_orbit_speed *= 1.20;
    }),
    blade("great_blades", "Great Blades", "Blade size +35%, damage +15%", 2, |s| {
        s.blade_orbit_scale *= 1.35;
        s.blade_orbit_damage *= 1.15;
    }),
    blade("frost_blades", "Frost Blades", "Blades freeze 20% of the time for 0.8s", 2, |s| {
        s.blade_orbit_freeze_chance = (s.blade_orbit_freeze_chance + 0.20).min(1.0);
        s.blade_orbit_freeze_duration = s.blade_orbit_freeze_duration.max(0.8);
    }),
    blade("flame_blades", "Flame Blades", "Blades ignite 30% of the time for 2s", 2, |s| {
        s.blade_orbit_burn_chance = (s.blade_orbit_burn_chance + 0.30).min(1.0);
        s.blade_orbit_burn_duration = s.blade_orbit_burn_duration.max(2.0);
        s.blade_orbit_burn_damage = s.blade_orbit_burn_damage.max(4.0);
    }),
    blade("venom_blades", "Venom Blades", "Blades poison 30% of the time for 3s", 2, |s| {
        s.blade_orbit_poison_chance = (s.blade_orbit_poison_chance + 0.30).min(1.0);
        s.blade_orbit_poison_duration = s.blade_orbit_poison_duration.max(3.0);
        s.blade_orbit_poison_damage = s.blade_orbit_poison_damage.max(3.0);
    }),
    blade("vampire_blades", "Vampire Blades", "Blades lifesteal 15% of the time", 3, |s| {
        s.blade_orbit_lifesteal_chance = (s.blade_orbit_lifesteal_chance + 0.15).min(1.0);
        s.blade_orbit_lifesteal_percent = s.blade_orbit_lifesteal_percent.max(0.20);
    }),
];

/// Repeatable picks used when the pool runs dry
pub static FALLBACK_SKILLS: &[Skill] = &[
    training("training_damage", "Training: Damage", "Repeatable. Damage +5%", |s| {
        s.bullet_damage *= 1.05
    }),
    training("training_fire_rate", "Training: Fire Rate", "Repeatable. Fire interval -5%", |s| {
        s.shoot_interval *= 0.95
    }),
    training("training_health", "Training: Health", "Repeatable. Max health +10, heal 10", |s| {
        s.max_health += 10.0;
        s.health = (s.health + 10.0).min(s.max_health);
    }),
];

/// Look up a skill by id, fallbacks included
pub fn find_skill(id: &str) -> Option<&'static Skill> {
    SKILLS
        .iter()
        .chain(FALLBACK_SKILLS.iter())
        .find(|s| s.id == id)
}

/// Draw weight for a tier at a player level
pub fn tier_weight(tier: u8, level: u32) -> f64 {
    let weight = match tier {
        1 => 14u32.saturating_sub(level / 3).max(2),
        2 => (3 + level / 4).min(8),
        3 => (1 + level / 5).min(5),
        4 => (level / 7).min(3),
        5 => (level / 10).min(1),
        _ => 1,
    };
    weight as f64
}

/// Whether `skill` can be offered given what the player already has
fn is_eligible(skill: &Skill, stats: &PlayerStats, acquired: &[AcquiredSkill]) -> bool {
    if skill.requires_blades && stats.blade_orbit_count == 0 {
        return false;
    }
    !acquired.iter().any(|a| a.id == skill.id)
}

impl SimulationState {
    /// Draw three unique choices: weighted without replacement, then
    /// topped up from the repeatable pool
    pub fn draw_skill_choices(&mut self) -> Vec<&'static Skill> {
        let level = self.player.level;
        let mut candidates: Vec<(&'static Skill, f64)> = SKILLS
            .iter()
            .filter(|s| is_eligible(s, &self.player.stats, &self.player.acquired))
            .map(|s| (s, tier_weight(s.tier, level)))
            .filter(|&(_, w)| w > 0.0)
            .collect();

        let mut chosen: Vec<&'static Skill> = Vec::with_capacity(CHOICES_PER_LEVEL);
        while chosen.len() < CHOICES_PER_LEVEL && !candidates.is_empty() {
            let total: f64 = candidates.iter().map(|&(_, w)| w).sum();
            let mut r = self.rand_range(0.0, total);
            let mut pick = candidates.len() - 1;
            for (i, &(_, w)) in candidates.iter().enumerate() {
                r -= w;
                if r <= 0.0 {
                    pick = i;
                    break;
                }
            }
            chosen.push(candidates.swap_remove(pick).0);
        }

        let mut fallback = FALLBACK_SKILLS.iter().cycle();
        while chosen.len() < CHOICES_PER_LEVEL {
            let Some(s) = fallback.next() else {
                break;
            };
            if !chosen.iter().any(|c| c.name == s.name) {
                chosen.push(s);
            }
        }
        chosen
    }

    /// Pause for a skill pick and announce it. A level gained while a pick
    /// is already on screen is queued behind it.
    pub(crate) fn begin_level_up(&mut self) {
        self.pending_level_ups = self.pending_level_ups.saturating_add(1);
        if !self.leveling_up {
            self.skill_choices = self.draw_skill_choices();
            self.leveling_up = true;
        }
        self.paused = true;
        let level = self.player.level;
        self.push_event(GameEvent::LevelUp { level });
    }

    /// Choices waiting for `select_skill`; empty when not levelling up
    pub fn pending_choices(&self) -> &[&'static Skill] {
        if self.leveling_up { &self.skill_choices } else { &[] }
    }

    /// Apply the pending choice at `index`, then draw for the next queued
    /// level-up or resume
    pub fn select_skill(&mut self, index: usize) -> Option<&'static Skill> {
        if !self.leveling_up {
            log::warn!("select_skill({}) called with no level-up pending", index);
            return None;
        }
        let Some(&skill) = self.skill_choices.get(index) else {
            log::warn!(
                "select_skill({}) out of range, {} choices pending",
                index,
                self.skill_choices.len()
            );
            return None;
        };

        (skill.apply)(&mut self.player.stats);
        if !skill.repeatable {
            self.player.acquired.push(AcquiredSkill {
                id: skill.id.to_string(),
                tier: skill.tier,
            });
        }
        log::debug!("Selected skill {} (tier {})", skill.id, skill.tier);

        self.pending_level_ups = self.pending_level_ups.saturating_sub(1);
        if self.pending_level_ups > 0 {
            self.skill_choices = self.draw_skill_choices();
        } else {
            self.skill_choices.clear();
            self.leveling_up = false;
            self.paused = self.game_over;
        }
        self.emit_state_changed();
        Some(skill)
    }
}
