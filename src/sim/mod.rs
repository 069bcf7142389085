//! Frame-driven simulation module
//!
//! All gameplay logic lives here. Given the same seed, clock values and
//! inputs, a run replays identically:
//! - Seeded RNG only
//! - Stable iteration order (array index, removal only at end of frame)
//! - No rendering or platform dependencies

pub mod ai;
pub mod collision;
pub mod damage;
pub mod director;
pub mod entities;
pub mod fx;
pub mod kill_queue;
pub mod numeric;
pub mod player;
pub mod rating;
pub mod skills;
pub mod state;
pub mod tick;

pub use damage::HitMeta;
pub use director::{Director, EnemyDef, ENEMY_DEFS};
pub use entities::{AiKind, Enemy, EnemyKind};
pub use player::{Player, PlayerStats};
pub use rating::CombatRating;
pub use skills::{SKILLS, Skill, find_skill};
pub use state::{GameEvent, RunStats, SimObserver, SimulationState, Snapshot};
pub use tick::{TickInput, tick};
