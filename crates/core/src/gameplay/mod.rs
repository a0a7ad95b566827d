//! Beat-driven gameplay consumers.
//!
//! Every consumer is handed the clock at spawn time, subscribes its own gate
//! (or handler) to the beat feed, and keeps the returned token so it can
//! unsubscribe on despawn. Tile geometry is reached through the [`Grid`]
//! trait; [`TileMap`] is a plain in-memory implementation.

mod enemy;
mod grid;
mod instrument;
mod player;
mod pulse;
mod spawner;

pub use enemy::{EnemyId, EnemyMover, EnemyStep};
pub use grid::{Direction, Grid, GridCell, InstrumentId, TileMap};
pub use instrument::{Instrument, InstrumentKind};
pub use player::{MoveOutcome, PlayerMover};
pub use pulse::BeatPulse;
pub use spawner::{EnemySpawner, SpawnRequest};
