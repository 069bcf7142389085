//! Feedback effects: particles, markers, shake, flash, hit-stop
//!
//! Purely presentational, but budgeted: a mass-kill frame must not be able
//! to spawn unbounded particles or effects.

use glam::DVec2;

use super::entities::{Effect, EffectKind, Particle, ScreenFlash};
use super::numeric::{format_short, safe_non_neg};
use super::state::SimulationState;
use crate::consts::MAX_EFFECTS;
use crate::direction;

/// Palette shared by feedback effects (0xRRGGBB)
pub mod colors {
    pub const RED: u32 = 0xff3b30;
    pub const ORANGE: u32 = 0xff9f0a;
    pub const GOLD: u32 = 0xffd60a;
    pub const GREEN: u32 = 0x34c759;
    pub const CYAN: u32 = 0x00d7ff;
    pub const WHITE: u32 = 0xffffff;
}

impl SimulationState {
    /// Particles still allowed this frame
    fn particle_budget(&self) -> usize {
        let total = self
            .settings
            .max_particles()
            .saturating_sub(self.particles.len());
        let frame = self
            .settings
            .particles_per_frame()
            .saturating_sub(self.fx_particles_this_frame);
        total.min(frame)
    }

    /// Radial burst of sparks
    pub fn emit_burst(&mut self, pos: DVec2, count: usize, color: u32, now: f64, speed: f64) {
        let n = count.min(self.particle_budget());
        if n == 0 {
            return;
        }
        self.fx_particles_this_frame += n;

        for _ in 0..n {
            let angle = self.rand_range(0.0, std::f64::consts::TAU);
            let sp = self.rand_range(speed * 0.35, speed);
            let life = self.rand_range(0.18, 0.42);
            let radius = self.rand_range(1.5, 3.8);
            self.particles.push(Particle {
                pos,
                prev_pos: pos,
                vel: direction(angle) * sp,
                radius,
                color,
                born: now,
                die: now + life,
                dead: false,
            });
        }
    }

    /// Sparks, optionally sprayed around `base_angle`
    pub fn emit_sparks(&mut self, pos: DVec2, count: usize, color: u32, now: f64, base_angle: Option<f64>) {
        let n = count.min(self.particle_budget());
        if n == 0 {
            return;
        }
        self.fx_particles_this_frame += n;

        for _ in 0..n {
            let angle = match base_angle {
                Some(base) => base + self.rand_range(-0.9, 0.9),
                None => self.rand_range(0.0, std::f64::consts::TAU),
            };
            let sp = self.rand_range(260.0, 680.0);
            let life = self.rand_range(0.10, 0.24);
            let radius = self.rand_range(1.2, 3.0);
            self.particles.push(Particle {
                pos,
                prev_pos: pos,
                vel: direction(angle) * sp,
                radius,
                color,
                born: now,
                die: now + life,
                dead: false,
            });
        }
    }

    /// Add a visual marker; dropped silently once the effect cap is hit
    pub fn push_effect(&mut self, kind: EffectKind, pos: DVec2, now: f64, duration: f64) -> bool {
        if self.effects.len() >= MAX_EFFECTS {
            return false;
        }
        self.effects.push(Effect {
            kind,
            pos,
            start: now,
            end: now + duration,
        });
        true
    }

    /// Floating damage number above `pos`
    pub fn show_damage_number(&mut self, pos: DVec2, value: f64, crit: bool, lucky: bool, now: f64) {
        let text = format_short(safe_non_neg(value, 0.0));
        self.push_effect(
            EffectKind::DamageText { text, crit, lucky },
            pos - DVec2::new(0.0, 10.0),
            now,
            0.5,
        );
    }

    pub fn show_label(&mut self, text: &str, color: u32, now: f64) {
        let pos = self.player.pos;
        self.push_effect(
            EffectKind::Label {
                text: text.to_string(),
                color,
            },
            pos,
            now,
            0.5,
        );
    }

    pub fn flash(&mut self, color: u32, intensity: f64, duration: f64, now: f64) {
        if !self.settings.screen_flash {
            return;
        }
        self.screen_flash = Some(ScreenFlash {
            color,
            intensity,
            start: now,
            end: now + duration,
        });
    }

    /// Slow-motion request; no-op unless enabled in settings
    pub fn hit_stop(&mut self, duration: f64, scale: f64, now: f64) {
        if !self.settings.hit_stop_enabled {
            return;
        }
        self.hit_stop_end = self.hit_stop_end.max(now + duration);
        self.hit_stop_scale = self.hit_stop_scale.min(scale);
    }

    pub fn shake_camera(&mut self, duration: f64, amplitude: f64, now: f64) {
        if !self.settings.screen_shake {
            return;
        }
        self.camera.shake_end = self.camera.shake_end.max(now + duration);
        self.camera.shake_amp = self.camera.shake_amp.max(amplitude);
    }

    /// Integrate particles with drag and flag expired ones
    pub fn update_particles(&mut self, dt: f64, now: f64) {
        for p in &mut self.particles {
            p.prev_pos = p.pos;
            p.pos += p.vel * dt;
            p.vel *= 0.90;
            if now > p.die {
                p.dead = true;
            }
        }
        if self.camera.shake_end <= now {
            self.camera.shake_amp = 0.0;
        }
        if self.screen_flash.is_some_and(|f| now >= f.end) {
            self.screen_flash = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;

    #[test]
    fn test_particle_frame_budget() {
        let mut state = SimulationState::new(3, Settings::default(), 0.0);
        for _ in 0..20 {
            state.emit_burst(DVec2::ZERO, 28, colors::GOLD, 0.0, 560.0);
        }
        assert_eq!(state.particles.len(), 240);
        assert_eq!(state.fx_particles_this_frame, 240);
    }

    #[test]
    fn test_particle_total_budget() {
        let mut state = SimulationState::new(3, Settings::default(), 0.0);
        for _ in 0..10 {
            state.fx_particles_this_frame = 0;
            state.emit_sparks(DVec2::ZERO, 200, colors::WHITE, 0.0, Some(0.0));
        }
        assert_eq!(state.particles.len(), 900);
    }

    #[test]
    fn test_effect_cap() {
        let mut state = SimulationState::new(3, Settings::default(), 0.0);
        for _ in 0..(MAX_EFFECTS + 50) {
            state.push_effect(EffectKind::Hit, DVec2::ZERO, 0.0, 1.0);
        }
        assert_eq!(state.effects.len(), MAX_EFFECTS);
    }

    #[test]
    fn test_hit_stop_disabled_by_default() {
        let mut state = SimulationState::new(3, Settings::default(), 0.0);
        state.hit_stop(0.1, 0.2, 5.0);
        assert_eq!(state.hit_stop_end, 0.0);
        assert_eq!(state.hit_stop_scale, 1.0);

        state.settings.hit_stop_enabled = true;
        state.hit_stop(0.1, 0.2, 5.0);
        assert!((state.hit_stop_end - 5.1).abs() < 1e-9);
        assert_eq!(state.hit_stop_scale, 0.2);
    }

    #[test]
    fn test_particles_expire() {
        let mut state = SimulationState::new(3, Settings::default(), 0.0);
        state.emit_burst(DVec2::ZERO, 5, colors::RED, 0.0, 400.0);
        state.update_particles(0.016, 1.0);
        assert!(state.particles.iter().all(|p| p.dead));
    }
}
