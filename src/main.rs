//! Survivor Sim headless runner
//!
//! Drives the simulation with scripted movement at 60 fps, always taking
//! the first skill offered, and logs a summary at the end.
//!
//! Usage: `survivor-sim [seed] [seconds] [settings.json]`

use survivor_sim::Settings;
use survivor_sim::sim::{SimObserver, SimulationState, TickInput};

const FRAME: f64 = 1.0 / 60.0;

/// Logs events as they arrive and counts level-ups needing a pick
#[derive(Default)]
struct LogObserver {
    pending_picks: u32,
    game_over: bool,
}

impl SimObserver for LogObserver {
    fn on_level_up(&mut self, level: u32) {
        log::debug!("Level {level} reached, choosing a skill");
        self.pending_picks += 1;
    }

    fn on_game_over(&mut self) {
        self.game_over = true;
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(42);
    let seconds: f64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(60.0);
    let settings = match args.next() {
        Some(path) => Settings::load_from(path),
        None => Settings::default(),
    };

    log::info!("Survivor Sim (headless) seed={seed} duration={seconds:.0}s");
    let mut state = SimulationState::new(seed, settings, 0.0);
    let mut observer = LogObserver::default();

    let frames = (seconds / FRAME).ceil() as u64;
    for frame in 0..frames {
        let t = frame as f64 * FRAME;
        // Slow circle around the origin
        let input = TickInput::new((t * 0.6).cos(), (t * 0.6).sin());
        state.advance(&input, t);
        state.dispatch_events(&mut observer);

        while observer.pending_picks > 0 {
            observer.pending_picks -= 1;
            if let Some(skill) = state.select_skill(0) {
                log::info!("Picked {} (tier {})", skill.name, skill.tier);
            }
            state.dispatch_events(&mut observer);
        }
        if observer.game_over {
            break;
        }
    }

    let stats = &state.run_stats;
    log::info!(
        "Run finished at {:.1}s: level {}, {} kills, {:.0} dealt, {:.0} taken, rating {:.0} ({})",
        state.now - state.start_time,
        state.player.level,
        stats.kills,
        stats.damage_dealt,
        stats.damage_taken,
        state.combat.rating_smooth,
        state.combat.tier,
    );
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is driven by the host page on wasm
}
