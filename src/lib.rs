//! Survivor Sim - simulation core for a top-down survival shooter
//!
//! Core modules:
//! - `sim`: Frame-driven simulation (entities, damage, director, skills)
//! - `settings`: Runtime configuration loaded from JSON

pub mod settings;
pub mod sim;

pub use settings::{QualityPreset, RatingTier, Settings};

use glam::DVec2;

/// Simulation tuning constants
pub mod consts {
    /// Frame delta used when no previous frame exists or the clock misbehaves
    pub const DEFAULT_DT: f64 = 0.016;
    /// Real frame delta is clamped to this range before scaling
    pub const MIN_DT: f64 = 0.001;
    pub const MAX_DT: f64 = 0.05;

    /// Simulation speed while a time warp is active
    pub const TIME_WARP_SCALE: f64 = 0.5;
    /// Director runs slightly faster than the sim during a warp
    pub const DIRECTOR_TIME_WARP_SCALE: f64 = 0.55;
    pub const TIME_WARP_DURATION: f64 = 2.0;
    pub const TIME_WARP_CHANCE: f64 = 0.1;

    /// Player defaults
    pub const PLAYER_RADIUS: f64 = 15.0;
    pub const PLAYER_START_HEALTH: f64 = 100.0;
    pub const START_MAX_EXP: f64 = 70.0;

    /// Enemies closer than this count toward density-based damage bonuses
    pub const NEARBY_RANGE: f64 = 300.0;

    /// Hard ceiling on kill-queue iterations in one drain
    pub const KILL_QUEUE_GUARD: usize = 20_000;

    /// Live visual effect cap
    pub const MAX_EFFECTS: usize = 1200;
    /// Minimum spacing between enemy hit-flash effects
    pub const ENEMY_HIT_FX_INTERVAL: f64 = 0.08;

    /// Floating DOT damage numbers
    pub const DAMAGE_TEXT_INTERVAL: f64 = 0.12;
    pub const DAMAGE_TEXT_MIN: f64 = 0.75;

    /// Chain lightning search radius and absolute hop ceiling
    pub const CHAIN_RADIUS: f64 = 150.0;
    pub const MAX_CHAIN_HOPS: u32 = 16;

    /// Director limits
    pub const MAX_SPAWNS_PER_TICK: u32 = 10;
    pub const SPAWN_PADDING: f64 = 160.0;
    pub const SPAWN_JITTER: f64 = 40.0;

    /// Exp pickup values
    pub const EXP_DROP_MIN: f64 = 1.0;
    pub const EXP_DROP_MAX: f64 = 1200.0;

    /// Enemy projectiles
    pub const ENEMY_BULLET_LIFETIME: f64 = 3.0;
    pub const ENEMY_BULLET_CULL_DISTANCE: f64 = 1500.0;
    pub const ENEMY_BULLET_RADIUS: f64 = 6.0;

    /// Orbitals
    pub const SHIELD_ORBIT_RADIUS: f64 = 70.0;
    pub const SHIELD_RADIUS: f64 = 12.0;
    pub const BLADE_LENGTH: f64 = 30.0;
    pub const BLADE_WIDTH: f64 = 6.0;

    /// Drones fire on this cadence
    pub const DRONE_FIRE_INTERVAL: f64 = 0.8;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(angle: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    if !angle.is_finite() {
        return 0.0;
    }
    (angle + PI).rem_euclid(TAU) - PI
}

/// Unit vector pointing along `angle`
#[inline]
pub fn direction(angle: f64) -> DVec2 {
    DVec2::new(angle.cos(), angle.sin())
}

/// Heading of a vector in radians
#[inline]
pub fn heading(v: DVec2) -> f64 {
    v.y.atan2(v.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(2.5 * PI) - 0.5 * PI).abs() < 1e-9);
        assert!((normalize_angle(-0.5) + 0.5).abs() < 1e-12);
        assert_eq!(normalize_angle(f64::NAN), 0.0);
        let big = normalize_angle(1e12);
        assert!((-PI..PI).contains(&big));
    }

    #[test]
    fn test_direction_heading_agree() {
        for a in [-3.0, -1.2, 0.0, 0.7, 2.9] {
            assert!((heading(direction(a)) - a).abs() < 1e-12);
        }
    }
}
