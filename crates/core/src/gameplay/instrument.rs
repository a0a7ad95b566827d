use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::enemy::EnemyId;
use super::grid::{Direction, GridCell, InstrumentId};
use crate::timeline::Scheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentKind {
    Piano,
    Drums,
    Guitar,
}

/// A placed instrument. Playing it fires a straight attack along `facing`
/// after a short delay.
#[derive(Debug)]
pub struct Instrument {
    id: InstrumentId,
    kind: InstrumentKind,
    position: GridCell,
    facing: Direction,
    range: i32,
    attack_delay_secs: f64,
    pending: Scheduler<()>,
}

impl Instrument {
    pub fn new(
        id: InstrumentId,
        kind: InstrumentKind,
        position: GridCell,
        facing: Direction,
        range: i32,
        attack_delay_secs: f64,
    ) -> Self {
        Self {
            id,
            kind,
            position,
            facing,
            range: range.max(0),
            attack_delay_secs: attack_delay_secs.max(0.0),
            pending: Scheduler::new(),
        }
    }

    pub fn id(&self) -> InstrumentId {
        self.id
    }

    pub fn kind(&self) -> InstrumentKind {
        self.kind
    }

    pub fn position(&self) -> GridCell {
        self.position
    }

    pub fn pending_attacks(&self) -> usize {
        self.pending.len()
    }

    pub fn activate(&mut self, now: f64) {
        info!(id = ?self.id, kind = ?self.kind, "instrument played");
        self.pending.schedule(now + self.attack_delay_secs, ());
    }

    /// Whether `cell` lies in the attack line, excluding the instrument's own
    /// tile.
    pub fn covers(&self, cell: GridCell) -> bool {
        let (fx, fy) = self.facing.delta();
        let dx = i64::from(cell.x) - i64::from(self.position.x);
        let dy = i64::from(cell.y) - i64::from(self.position.y);

        let sideways = dx * i64::from(fy) - dy * i64::from(fx);
        let ahead = dx * i64::from(fx) + dy * i64::from(fy);
        sideways == 0 && (1..=i64::from(self.range)).contains(&ahead)
    }

    /// Resolves attacks that are due at `now` and returns the enemies they
    /// hit, each at most once.
    pub fn update(&mut self, now: f64, enemies: &[(EnemyId, GridCell)]) -> Vec<EnemyId> {
        let fired = self.pending.drain_due(now).len();
        if fired == 0 {
            return Vec::new();
        }

        let hits: BTreeSet<EnemyId> = enemies
            .iter()
            .filter(|(_, cell)| self.covers(*cell))
            .map(|(id, _)| *id)
            .collect();
        debug!(id = ?self.id, waves = fired, hits = hits.len(), "instrument attack resolved");
        hits.into_iter().collect()
    }
}
