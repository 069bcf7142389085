//! Simulation state and core bookkeeping
//!
//! `SimulationState` owns every entity array, the director, the combat
//! scorer and the RNG. All simulation functions take it by `&mut`.

use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use super::director::Director;
use super::entities::*;
use super::kill_queue::KillQueue;
use super::player::Player;
use super::rating::CombatRating;
use super::skills::Skill;
use super::tick::{TickInput, tick};
use crate::settings::Settings;

/// Notifications raised by the simulation, delivered in order
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// HUD-relevant values changed
    StateChanged {
        exp_ratio: f64,
        hp_ratio: f64,
        level: u32,
    },
    /// Simulation paused; three choices are waiting in `pending_choices`
    LevelUp { level: u32 },
    /// Run ended
    GameOver,
}

/// Receiver for [`GameEvent`]s
pub trait SimObserver {
    fn on_state_changed(&mut self, _exp_ratio: f64, _hp_ratio: f64, _level: u32) {}
    fn on_level_up(&mut self, _level: u32) {}
    fn on_game_over(&mut self) {}
}

/// Per-run totals
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub kills: u64,
    pub damage_dealt: f64,
    pub damage_taken: f64,
    pub exp_gained: f64,
}

/// Read-only view handed to renderers and persistence layers
#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub time: f64,
    pub camera: Camera,
    pub player: &'a Player,
    pub enemies: &'a [Enemy],
    pub bullets: &'a [Bullet],
    pub enemy_bullets: &'a [EnemyBullet],
    pub exp_orbs: &'a [ExpOrb],
    pub orbitals: &'a [Orbital],
    pub drones: &'a [Drone],
    pub ghosts: &'a [Ghost],
    pub mines: &'a [Mine],
    pub fire_trails: &'a [FireTrail],
    pub meteor_warnings: &'a [MeteorWarning],
    pub black_holes: &'a [BlackHole],
    pub poison_clouds: &'a [PoisonCloud],
    pub effects: &'a [Effect],
    pub particles: &'a [Particle],
    pub screen_flash: Option<ScreenFlash>,
    pub rating: f64,
    pub rating_tier: &'a str,
    pub paused: bool,
    pub game_over: bool,
}

/// Complete simulation state
#[derive(Debug, Clone)]
pub struct SimulationState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub settings: Settings,
    pub rng: Pcg32,
    /// Clock value the run started at
    pub start_time: f64,
    /// Clock value of the previous frame
    pub last_update: Option<f64>,
    /// Latest clock value seen by `tick`
    pub now: f64,

    pub paused: bool,
    pub game_over: bool,
    pub leveling_up: bool,
    /// Level-ups still owed a skill pick, including the one on screen
    pub pending_level_ups: u32,

    pub player: Player,
    pub camera: Camera,

    pub enemies: Vec<Enemy>,
    pub bullets: Vec<Bullet>,
    pub enemy_bullets: Vec<EnemyBullet>,
    pub exp_orbs: Vec<ExpOrb>,
    pub orbitals: Vec<Orbital>,
    pub drones: Vec<Drone>,
    pub ghosts: Vec<Ghost>,
    pub mines: Vec<Mine>,
    pub fire_trails: Vec<FireTrail>,
    pub meteor_warnings: Vec<MeteorWarning>,
    pub black_holes: Vec<BlackHole>,
    pub poison_clouds: Vec<PoisonCloud>,
    /// Visual markers (not gameplay-affecting)
    pub effects: Vec<Effect>,
    /// Visual particles (not gameplay-affecting)
    pub particles: Vec<Particle>,

    pub screen_flash: Option<ScreenFlash>,
    pub hit_stop_end: f64,
    pub hit_stop_scale: f64,
    pub time_warp_active: bool,
    pub time_warp_end: f64,

    /// Live enemies within range of the player, refreshed each frame
    pub nearby_enemies: usize,
    /// Particles spawned so far this frame
    pub fx_particles_this_frame: usize,

    pub kill_queue: KillQueue,
    pub combat: CombatRating,
    pub director: Director,
    pub run_stats: RunStats,

    /// Choices offered at the current level-up
    pub skill_choices: Vec<&'static Skill>,
    events: Vec<GameEvent>,
    next_id: u32,
}

impl SimulationState {
    /// Create a new run; `now` is the clock value the run starts at
    pub fn new(seed: u64, settings: Settings, now: f64) -> Self {
        Self {
            seed,
            settings,
            rng: Pcg32::seed_from_u64(seed),
            start_time: now,
            last_update: None,
            now,
            paused: false,
            game_over: false,
            leveling_up: false,
            pending_level_ups: 0,
            player: Player::new(),
            camera: Camera::default(),
            enemies: Vec::new(),
            bullets: Vec::new(),
            enemy_bullets: Vec::new(),
            exp_orbs: Vec::new(),
            orbitals: Vec::new(),
            drones: Vec::new(),
            ghosts: Vec::new(),
            mines: Vec::new(),
            fire_trails: Vec::new(),
            meteor_warnings: Vec::new(),
            black_holes: Vec::new(),
            poison_clouds: Vec::new(),
            effects: Vec::new(),
            particles: Vec::new(),
            screen_flash: None,
            hit_stop_end: 0.0,
            hit_stop_scale: 1.0,
            time_warp_active: false,
            time_warp_end: 0.0,
            nearby_enemies: 0,
            fx_particles_this_frame: 0,
            kill_queue: KillQueue::default(),
            combat: CombatRating::default(),
            director: Director::default(),
            run_stats: RunStats::default(),
            skill_choices: Vec::new(),
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// One loop iteration: frame update, then the director
    pub fn advance(&mut self, input: &TickInput, now: f64) {
        tick(self, input, now);
        super::director::step(self, now);
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            time: self.now,
            camera: self.camera,
            player: &self.player,
            enemies: &self.enemies,
            bullets: &self.bullets,
            enemy_bullets: &self.enemy_bullets,
            exp_orbs: &self.exp_orbs,
            orbitals: &self.orbitals,
            drones: &self.drones,
            ghosts: &self.ghosts,
            mines: &self.mines,
            fire_trails: &self.fire_trails,
            meteor_warnings: &self.meteor_warnings,
            black_holes: &self.black_holes,
            poison_clouds: &self.poison_clouds,
            effects: &self.effects,
            particles: &self.particles,
            screen_flash: self.screen_flash,
            rating: self.combat.rating_smooth,
            rating_tier: &self.combat.tier,
            paused: self.paused,
            game_over: self.game_over,
        }
    }

    // === Events ===

    /// Queue an event. Back-to-back `StateChanged` collapse into the latest one.
    pub(crate) fn push_event(&mut self, event: GameEvent) {
        if matches!(event, GameEvent::StateChanged { .. })
            && matches!(self.events.last(), Some(GameEvent::StateChanged { .. }))
        {
            self.events.pop();
        }
        self.events.push(event);
    }

    pub(crate) fn emit_state_changed(&mut self) {
        let event = GameEvent::StateChanged {
            exp_ratio: self.player.exp_ratio(),
            hp_ratio: self.player.stats.hp_ratio(),
            level: self.player.level,
        };
        self.push_event(event);
    }

    /// Take all pending events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Deliver pending events to an observer, oldest first
    pub fn dispatch_events(&mut self, observer: &mut impl SimObserver) {
        for event in self.drain_events() {
            match event {
                GameEvent::StateChanged {
                    exp_ratio,
                    hp_ratio,
                    level,
                } => observer.on_state_changed(exp_ratio, hp_ratio, level),
                GameEvent::LevelUp { level } => observer.on_level_up(level),
                GameEvent::GameOver => observer.on_game_over(),
            }
        }
    }

    // === RNG ===

    /// Uniform draw in `[lo, hi)`; returns `lo` for an empty range
    pub(crate) fn rand_range(&mut self, lo: f64, hi: f64) -> f64 {
        if hi > lo {
            self.rng.random_range(lo..hi)
        } else {
            lo
        }
    }

    /// Bernoulli trial; always draws so the stream stays aligned
    pub(crate) fn chance(&mut self, p: f64) -> bool {
        self.rng.random::<f64>() < p
    }

    // === Queries ===

    /// Index of the nearest live, unclaimed enemy to `from`
    pub fn closest_enemy(&self, from: DVec2) -> Option<usize> {
        self.enemies
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_targetable())
            .min_by(|(_, a), (_, b)| {
                a.pos
                    .distance_squared(from)
                    .total_cmp(&b.pos.distance_squared(from))
            })
            .map(|(i, _)| i)
    }

    /// Heading of the player's auto-aim, if anything is targetable
    pub fn firing_angle(&self) -> Option<f64> {
        self.closest_enemy(self.player.pos)
            .map(|t| crate::heading(self.enemies[t].pos - self.player.pos))
    }

    /// Whether `enemy_idx` sits roughly along `aim`, as returned by `firing_angle`
    pub fn in_firing_direction(&self, aim: Option<f64>, enemy_idx: usize) -> bool {
        let Some(firing) = aim else {
            return false;
        };
        let to_enemy = crate::heading(self.enemies[enemy_idx].pos - self.player.pos);
        (firing - to_enemy).abs() < 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        level_ups: Vec<u32>,
        state_changes: usize,
        game_over: bool,
    }

    impl SimObserver for Recorder {
        fn on_state_changed(&mut self, _exp_ratio: f64, _hp_ratio: f64, _level: u32) {
            self.state_changes += 1;
        }
        fn on_level_up(&mut self, level: u32) {
            self.level_ups.push(level);
        }
        fn on_game_over(&mut self) {
            self.game_over = true;
        }
    }

    #[test]
    fn test_entity_ids_increase() {
        let mut state = SimulationState::new(1, Settings::default(), 0.0);
        let a = state.next_entity_id();
        let b = state.next_entity_id();
        assert!(b > a);
    }

    #[test]
    fn test_state_changed_coalesces() {
        let mut state = SimulationState::new(1, Settings::default(), 0.0);
        state.heal(1.0);
        state.heal(1.0);
        state.heal(1.0);
        assert_eq!(state.drain_events().len(), 1);
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_dispatch_events_in_order() {
        let mut state = SimulationState::new(1, Settings::default(), 0.0);
        state.push_event(GameEvent::LevelUp { level: 2 });
        state.emit_state_changed();
        state.push_event(GameEvent::GameOver);

        let mut recorder = Recorder::default();
        state.dispatch_events(&mut recorder);
        assert_eq!(recorder.level_ups, vec![2]);
        assert_eq!(recorder.state_changes, 1);
        assert!(recorder.game_over);
    }

    #[test]
    fn test_firing_direction_follows_closest() {
        use super::super::director::spawn_enemy_at;

        let mut state = SimulationState::new(1, Settings::default(), 0.0);
        assert!(state.firing_angle().is_none());

        let near = spawn_enemy_at(&mut state, EnemyKind::Grunt, DVec2::new(100.0, 0.0), 0.0, false);
        let behind = spawn_enemy_at(&mut state, EnemyKind::Grunt, DVec2::new(300.0, 20.0), 0.0, false);
        let side = spawn_enemy_at(&mut state, EnemyKind::Grunt, DVec2::new(0.0, 200.0), 0.0, false);

        assert_eq!(state.closest_enemy(state.player.pos), Some(near));
        let aim = state.firing_angle();
        assert!(state.in_firing_direction(aim, near));
        assert!(state.in_firing_direction(aim, behind));
        assert!(!state.in_firing_direction(aim, side));
        assert!(!state.in_firing_direction(None, near));

        state.enemies[near].kill_queued = true;
        assert_eq!(state.closest_enemy(state.player.pos), Some(behind));
    }

    #[test]
    fn test_snapshot_serializes() {
        let state = SimulationState::new(1, Settings::default(), 0.0);
        let json = serde_json::to_string(&state.snapshot()).unwrap();
        assert!(json.contains("\"enemies\":[]"));
    }
}
