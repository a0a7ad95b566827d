use tracing::{debug, info};

use super::grid::GridCell;
use crate::clock::{BeatClock, BeatClockView};
use crate::events::SubscriptionId;
use crate::gate::{subscribe_gate, BeatGate, SharedGate};

/// Ask the owner to create an enemy at `cell`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnRequest {
    pub cell: GridCell,
}

/// Emits a [`SpawnRequest`] every `beats_per_spawn` beats while active.
#[derive(Debug)]
pub struct EnemySpawner {
    cell: GridCell,
    active: bool,
    view: BeatClockView,
    gate: SharedGate,
    subscription: SubscriptionId,
}

impl EnemySpawner {
    /// Creates an active spawner.
    pub fn spawn(clock: &mut BeatClock, cell: GridCell, beats_per_spawn: u32) -> Self {
        let gate = BeatGate::every_n_beats(beats_per_spawn).into_shared();
        let subscription = subscribe_gate(clock, &gate);
        Self {
            cell,
            active: true,
            view: clock.view(),
            gate,
            subscription,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Resumes spawning. The beat count restarts from zero.
    pub fn start_spawning(&mut self) {
        if !self.active {
            self.gate.borrow_mut().reset();
            self.active = true;
            info!(cell = ?self.cell, "spawner started");
        }
    }

    pub fn stop_spawning(&mut self) {
        if self.active {
            self.active = false;
            info!(cell = ?self.cell, "spawner stopped");
        }
    }

    pub fn update(&mut self, now: f64) -> Option<SpawnRequest> {
        if !self.active {
            return None;
        }
        if !self.gate.borrow_mut().try_consume(&self.view.timing(), now) {
            return None;
        }
        debug!(cell = ?self.cell, "spawn requested");
        Some(SpawnRequest { cell: self.cell })
    }

    pub fn despawn(self, clock: &mut BeatClock) {
        clock.unsubscribe(self.subscription);
    }
}
