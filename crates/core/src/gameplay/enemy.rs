use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::grid::{Direction, Grid, GridCell};
use crate::clock::{BeatClock, BeatClockView};
use crate::events::SubscriptionId;
use crate::gate::{subscribe_gate, BeatGate, SharedGate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(pub u32);

/// What an enemy did on a granted beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyStep {
    Moved(GridCell),
    /// The tile ahead has no ground; the enemy holds position.
    Blocked(GridCell),
}

/// Advances one tile north every `beats_per_move` beats.
#[derive(Debug)]
pub struct EnemyMover {
    id: EnemyId,
    position: GridCell,
    view: BeatClockView,
    gate: SharedGate,
    subscription: SubscriptionId,
}

impl EnemyMover {
    pub fn spawn(clock: &mut BeatClock, id: EnemyId, position: GridCell, beats_per_move: u32) -> Self {
        let gate = BeatGate::every_n_beats(beats_per_move).into_shared();
        let subscription = subscribe_gate(clock, &gate);
        debug!(?id, ?position, beats_per_move, "enemy spawned");
        Self {
            id,
            position,
            view: clock.view(),
            gate,
            subscription,
        }
    }

    pub fn id(&self) -> EnemyId {
        self.id
    }

    pub fn position(&self) -> GridCell {
        self.position
    }

    /// Called every tick; acts at most once per granted beat.
    pub fn update(&mut self, grid: &impl Grid, now: f64) -> Option<EnemyStep> {
        if !self.gate.borrow_mut().try_consume(&self.view.timing(), now) {
            return None;
        }

        let target = self.position.step(Direction::North, 1);
        if grid.is_ground(target) {
            self.position = target;
            Some(EnemyStep::Moved(target))
        } else {
            warn!(id = ?self.id, ?target, "enemy path blocked: no ground ahead");
            Some(EnemyStep::Blocked(self.position))
        }
    }

    pub fn despawn(self, clock: &mut BeatClock) {
        clock.unsubscribe(self.subscription);
        debug!(id = ?self.id, "enemy despawned");
    }
}
