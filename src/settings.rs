//! Simulation settings
//!
//! Loaded from JSON at startup. Every field has a default so partial files work.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    /// Maximum live particles for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 300,
            QualityPreset::Medium => 900,
            QualityPreset::High => 1800,
        }
    }

    /// Maximum particles spawned in a single frame
    pub fn particles_per_frame(&self) -> usize {
        match self {
            QualityPreset::Low => 80,
            QualityPreset::Medium => 240,
            QualityPreset::High => 400,
        }
    }
}

/// One row of the combat rating tier table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingTier {
    /// Lowest rating that earns this tier
    pub min: f64,
    pub label: String,
    /// CSS-style color for HUD badges
    pub color: String,
}

impl RatingTier {
    fn new(min: f64, label: &str, color: &str) -> Self {
        Self {
            min,
            label: label.to_string(),
            color: color.to_string(),
        }
    }
}

/// Default tier table, ascending by threshold
pub fn default_rating_tiers() -> Vec<RatingTier> {
    vec![
        RatingTier::new(0.0, "D", "rgba(255,255,255,.92)"),
        RatingTier::new(280.0, "C", "#9ca3af"),
        RatingTier::new(420.0, "B", "#4aa3ff"),
        RatingTier::new(560.0, "A", "#34c759"),
        RatingTier::new(700.0, "S", "#ffd60a"),
        RatingTier::new(820.0, "SS", "#ff9f0a"),
        RatingTier::new(920.0, "SSS", "#ff3b30"),
        RatingTier::new(1500.0, "SSS+", "#ff6b6b"),
        RatingTier::new(2000.0, "SSSS", "#ff1493"),
        RatingTier::new(3000.0, "EX", "#00ffff"),
        RatingTier::new(5000.0, "X", "#ff00ff"),
    ]
}

/// Simulation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Particle budget preset
    pub quality: QualityPreset,

    // === Feedback ===
    /// Particle effects (kill bursts, sparks)
    pub particles: bool,
    /// Camera shake on impacts
    pub screen_shake: bool,
    /// Full-screen color flashes
    pub screen_flash: bool,
    /// Brief slow-motion on hits and kills. Off by default: it reads as input lag.
    pub hit_stop_enabled: bool,

    // === World ===
    /// Player speed in pixels/s before multipliers
    pub base_player_speed: f64,
    /// Bullet speed in pixels/s before multipliers
    pub base_bullet_speed: f64,
    /// Enemy speed in pixels/s before type and director multipliers
    pub base_enemy_speed: f64,
    /// Visible area used to place spawns just off-screen
    pub viewport_width: f64,
    pub viewport_height: f64,

    // === Rating ===
    /// Tier thresholds, ascending
    pub rating_tiers: Vec<RatingTier>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,

            particles: true,
            screen_shake: true,
            screen_flash: true,
            hit_stop_enabled: false,

            base_player_speed: 200.0,
            base_bullet_speed: 600.0,
            base_enemy_speed: 80.0,
            viewport_width: 800.0,
            viewport_height: 600.0,

            rating_tiers: default_rating_tiers(),
        }
    }
}

impl Settings {
    /// Create settings from a quality preset
    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    /// Effective live particle cap
    pub fn max_particles(&self) -> usize {
        if !self.particles {
            0
        } else {
            self.quality.max_particles()
        }
    }

    /// Effective per-frame particle cap
    pub fn particles_per_frame(&self) -> usize {
        if !self.particles {
            0
        } else {
            self.quality.particles_per_frame()
        }
    }

    /// Highest tier whose threshold the rating reaches
    pub fn tier_for(&self, rating: f64) -> Option<&RatingTier> {
        self.rating_tiers
            .iter()
            .filter(|tier| rating >= tier.min)
            .max_by(|a, b| a.min.total_cmp(&b.min))
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load settings from a JSON file, falling back to defaults
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(err) => {
                    log::warn!("Invalid settings in {}: {err}; using defaults", path.display());
                    Self::default()
                }
            },
            Err(err) => {
                log::info!("No settings at {} ({err}); using defaults", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings = Settings::from_json(r#"{ "hit_stop_enabled": true }"#).unwrap();
        assert!(settings.hit_stop_enabled);
        assert_eq!(settings.base_bullet_speed, 600.0);
        assert_eq!(settings.rating_tiers.len(), 11);
    }

    #[test]
    fn test_tier_lookup() {
        let settings = Settings::default();
        assert_eq!(settings.tier_for(0.0).unwrap().label, "D");
        assert_eq!(settings.tier_for(279.9).unwrap().label, "D");
        assert_eq!(settings.tier_for(280.0).unwrap().label, "C");
        assert_eq!(settings.tier_for(919.0).unwrap().label, "SS");
        assert_eq!(settings.tier_for(1_000_000.0).unwrap().label, "X");
    }

    #[test]
    fn test_tier_lookup_unsorted_table() {
        let mut settings = Settings::default();
        settings.rating_tiers.reverse();
        assert_eq!(settings.tier_for(600.0).unwrap().label, "A");
        assert_eq!(settings.tier_for(0.0).unwrap().label, "D");
    }

    #[test]
    fn test_particles_disabled() {
        let settings = Settings {
            particles: false,
            ..Settings::default()
        };
        assert_eq!(settings.max_particles(), 0);
        assert_eq!(settings.particles_per_frame(), 0);
        assert_eq!(Settings::default().max_particles(), 900);
        assert_eq!(Settings::default().particles_per_frame(), 240);
    }

    #[test]
    fn test_round_trip_json() {
        let settings = Settings::from_preset(QualityPreset::High);
        let json = settings.to_json().unwrap();
        let back = Settings::from_json(&json).unwrap();
        assert_eq!(back.quality, QualityPreset::High);
    }
}
