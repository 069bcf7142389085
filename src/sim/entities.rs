//! Entity records
//!
//! Every entity is a fixed struct. Timed statuses use `0.0` as the
//! "inactive" sentinel and removal is flagged, then swept at end of frame.

use std::collections::HashSet;

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Enemy archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    Grunt,
    Runner,
    Brute,
    Tank,
    Shielder,
    Zigzag,
    Orbiter,
    Dasher,
    Ranger,
    Spawner,
    Splitter,
    Swarm,
    Predictor,
    Flanker,
    Shooter,
    Elite,
}

impl EnemyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnemyKind::Grunt => "grunt",
            EnemyKind::Runner => "runner",
            EnemyKind::Brute => "brute",
            EnemyKind::Tank => "tank",
            EnemyKind::Shielder => "shielder",
            EnemyKind::Zigzag => "zigzag",
            EnemyKind::Orbiter => "orbiter",
            EnemyKind::Dasher => "dasher",
            EnemyKind::Ranger => "ranger",
            EnemyKind::Spawner => "spawner",
            EnemyKind::Splitter => "splitter",
            EnemyKind::Swarm => "swarm",
            EnemyKind::Predictor => "predictor",
            EnemyKind::Flanker => "flanker",
            EnemyKind::Shooter => "shooter",
            EnemyKind::Elite => "elite",
        }
    }
}

/// Movement behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiKind {
    /// Straight at the player
    Chase,
    /// Sinusoidal weave around the chase heading
    Zigzag,
    /// Circle the player at a preferred radius
    Orbit,
    /// Chase with periodic speed bursts
    Dash,
    /// Hold a distance: flee when close, strafe at range
    Kite,
    /// Slow chase, periodically spawns minions
    Spawner,
    /// Head for where the player will be
    Predict,
    /// Approach from a rotating side offset, then rush
    Flank,
    /// Keep range and fire projectiles
    Ranged,
}

/// Status timers and flags carried by every enemy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnemyStatus {
    pub frozen_until: f64,
    pub burn_end: f64,
    pub burn_damage: f64,
    pub poison_end: f64,
    pub poison_damage: f64,
    pub vulnerable_until: f64,
    /// Halves movement speed while set
    pub slowed: bool,
    /// Slow applied by ghosts expires at this time
    pub ghost_slow_until: f64,
}

impl EnemyStatus {
    pub fn is_frozen(&self, now: f64) -> bool {
        self.frozen_until > 0.0 && now < self.frozen_until
    }

    pub fn is_burning(&self, now: f64) -> bool {
        self.burn_end > 0.0 && now < self.burn_end
    }

    pub fn is_poisoned(&self, now: f64) -> bool {
        self.poison_end > 0.0 && now < self.poison_end
    }

    /// True once any poison has been applied, even if expired
    pub fn was_poisoned(&self) -> bool {
        self.poison_end > 0.0
    }

    pub fn is_vulnerable(&self, now: f64) -> bool {
        self.vulnerable_until > 0.0 && now < self.vulnerable_until
    }
}

/// Pending floating-number aggregation for damage-over-time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DamageTextBuffer {
    pub acc: f64,
    pub crit: bool,
    pub lucky: bool,
    pub next: f64,
}

/// An enemy entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: u32,
    pub kind: EnemyKind,
    pub ai: AiKind,
    pub pos: DVec2,
    /// Bounding box width/height
    pub size: DVec2,
    pub rot: f64,
    pub hp: f64,
    pub max_hp: f64,
    pub speed: f64,
    /// Fraction of incoming damage absorbed, in [0, 0.85]
    pub armor: f64,
    pub damage_mul: f64,
    pub exp_mul: f64,

    // Behaviour parameters
    pub orbit_radius: f64,
    pub keep_distance: f64,
    pub split_count: u32,
    pub split_kind: EnemyKind,
    pub shoot_interval: f64,
    pub bullet_speed: f64,
    pub minion: bool,
    pub elite: bool,

    // AI runtime
    pub next_shot: f64,
    pub next_dash: f64,
    pub dash_end: f64,
    pub next_spawn: f64,
    pub ai_seed: f64,
    pub predicted: DVec2,
    pub flank_angle: f64,

    pub status: EnemyStatus,
    pub damage_text: DamageTextBuffer,
    pub last_hit_fx: f64,
    pub hit_flash_until: f64,

    // Lifecycle: dead -> kill_queued -> killed/removed
    pub dead: bool,
    pub kill_queued: bool,
    pub killed: bool,
    pub removed: bool,
}

impl Enemy {
    /// Collision radius (half the larger box side)
    pub fn half_extent(&self) -> f64 {
        self.size.x.max(self.size.y) / 2.0
    }

    /// Big enemies get heavier kill feedback
    pub fn is_heavy(&self) -> bool {
        self.kind == EnemyKind::Elite || self.max_hp >= 140.0
    }

    pub fn hp_ratio(&self) -> f64 {
        let max = if self.max_hp > 0.0 { self.max_hp } else { self.hp };
        if max > 0.0 { self.hp / max } else { 0.0 }
    }

    /// Alive and not yet claimed by the kill queue
    pub fn is_targetable(&self) -> bool {
        !self.dead && !self.kill_queued
    }

    /// Should be swept at end of frame
    pub fn is_expired(&self) -> bool {
        self.dead || self.removed
    }
}

/// A player projectile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bullet {
    pub id: u32,
    pub pos: DVec2,
    pub vel: DVec2,
    pub size: DVec2,
    pub rot: f64,
    pub born: f64,
    pub die: f64,
    pub pierce_left: u32,
    /// Damage multiplier from stored charge
    pub charge_bonus: f64,
    /// Enemies already damaged by this bullet
    pub hit_ids: Vec<u32>,
    pub from_drone: bool,
    pub dead: bool,
}

impl Bullet {
    pub fn half_extent(&self) -> f64 {
        self.size.x.max(self.size.y) / 2.0
    }

    pub fn has_hit(&self, enemy_id: u32) -> bool {
        self.hit_ids.contains(&enemy_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrbitalKind {
    Shield,
    Blade,
}

/// Player-attached rotating contact damager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Orbital {
    pub id: u32,
    pub kind: OrbitalKind,
    pub pos: DVec2,
    /// Shield radius
    pub radius: f64,
    /// Blade box
    pub size: DVec2,
    pub rot: f64,
    /// Enemies touching this orbital last frame
    #[serde(skip)]
    pub contacts: HashSet<u32>,
    /// Scratch set swapped with `contacts` every frame
    #[serde(skip)]
    pub contacts_next: HashSet<u32>,
}

impl Orbital {
    pub fn contact_radius(&self) -> f64 {
        match self.kind {
            OrbitalKind::Shield => self.radius,
            OrbitalKind::Blade => self.size.x.max(self.size.y) / 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drone {
    pub id: u32,
    pub pos: DVec2,
    pub last_shot: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ghost {
    pub id: u32,
    pub pos: DVec2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mine {
    pub id: u32,
    pub pos: DVec2,
    /// Trigger radius
    pub radius: f64,
    pub damage: f64,
    pub blast_radius: f64,
    pub born: f64,
    pub dead: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireTrail {
    pub id: u32,
    pub pos: DVec2,
    pub radius: f64,
    pub born: f64,
    pub die: f64,
    pub last_tick: f64,
    pub dead: bool,
}

/// Telegraphed meteor impact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeteorWarning {
    pub id: u32,
    pub pos: DVec2,
    pub born: f64,
    pub resolved: bool,
    pub dead: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlackHole {
    pub id: u32,
    pub pos: DVec2,
    pub radius: f64,
    pub end: f64,
    pub fade_end: f64,
    pub next_tick: f64,
    pub small: bool,
    pub dead: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoisonCloud {
    pub id: u32,
    pub pos: DVec2,
    pub radius: f64,
    pub born: f64,
    pub ticks: u32,
    pub next_tick: f64,
    pub fade_start: f64,
    pub fade_end: f64,
    pub dead: bool,
}

/// Projectile fired by ranged enemies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyBullet {
    pub id: u32,
    pub pos: DVec2,
    pub vel: DVec2,
    pub damage: f64,
    pub born: f64,
    pub radius: f64,
    pub dead: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpOrb {
    pub id: u32,
    pub pos: DVec2,
    pub radius: f64,
    pub value: f64,
    pub dead: bool,
}

/// A particle for visual effects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: DVec2,
    /// Position last frame, for streak rendering
    pub prev_pos: DVec2,
    pub vel: DVec2,
    pub radius: f64,
    pub color: u32,
    pub born: f64,
    pub die: f64,
    pub dead: bool,
}

/// Short-lived visual marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EffectKind {
    Hit,
    EnemyHit,
    Explosion { radius: f64 },
    DamageText { text: String, crit: bool, lucky: bool },
    Label { text: String, color: u32 },
    Phoenix,
    /// Chain lightning arc to `to`
    Line { to: DVec2 },
    Muzzle { angle: f64 },
    Slash { angle: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Effect {
    pub kind: EffectKind,
    pub pos: DVec2,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScreenFlash {
    pub color: u32,
    pub intensity: f64,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Camera {
    pub pos: DVec2,
    pub shake_end: f64,
    pub shake_amp: f64,
}
