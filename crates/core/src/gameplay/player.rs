use tracing::debug;

use super::grid::{Direction, Grid, GridCell, InstrumentId};
use crate::clock::{BeatClock, BeatClockView};
use crate::events::SubscriptionId;
use crate::gate::{subscribe_gate, BeatGate, SharedGate};
use crate::grading::{grade_at, AccuracyGrade, Thresholds};

/// Result of a movement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The player stepped onto `to`.
    Moved { to: GridCell, grade: AccuracyGrade },
    /// The target held an instrument; the player stays put and plays it.
    Interacted {
        instrument: InstrumentId,
        grade: AccuracyGrade,
    },
    /// No ground, or a wall. The beat's permission is kept.
    Blocked,
    /// Outside the move window, or the beat was already used.
    OffBeat,
}

/// Grid-locked player movement: one step per beat, inside the move window.
#[derive(Debug)]
pub struct PlayerMover {
    position: GridCell,
    view: BeatClockView,
    gate: SharedGate,
    subscription: SubscriptionId,
    thresholds: Thresholds,
}

impl PlayerMover {
    pub fn spawn(
        clock: &mut BeatClock,
        position: GridCell,
        move_window_secs: f64,
        thresholds: Thresholds,
    ) -> Self {
        let gate = BeatGate::windowed(move_window_secs).into_shared();
        let subscription = subscribe_gate(clock, &gate);
        Self {
            position,
            view: clock.view(),
            gate,
            subscription,
            thresholds,
        }
    }

    pub fn position(&self) -> GridCell {
        self.position
    }

    /// Whether a move attempted at `now` would pass the beat gate.
    pub fn can_move(&self, now: f64) -> bool {
        self.gate.borrow().is_open(&self.view.timing(), now)
    }

    pub fn try_move(&mut self, direction: Direction, grid: &impl Grid, now: f64) -> MoveOutcome {
        let timing = self.view.timing();
        if !self.gate.borrow().is_open(&timing, now) {
            return MoveOutcome::OffBeat;
        }

        let target = self.position.step(direction, 1);
        let grade = grade_at(&timing, now, &self.thresholds);

        if let Some(instrument) = grid.instrument_at(target) {
            self.gate.borrow_mut().try_consume(&timing, now);
            debug!(?instrument, ?target, %grade, "player played instrument");
            return MoveOutcome::Interacted { instrument, grade };
        }

        if !grid.is_walkable(target) {
            return MoveOutcome::Blocked;
        }

        self.gate.borrow_mut().try_consume(&timing, now);
        debug!(from = ?self.position, to = ?target, %grade, "player moved");
        self.position = target;
        MoveOutcome::Moved { to: target, grade }
    }

    pub fn despawn(self, clock: &mut BeatClock) {
        clock.unsubscribe(self.subscription);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{BeatNotification, TimelinePosition};
    use crate::gameplay::TileMap;

    fn playing_clock() -> BeatClock {
        let mut clock = BeatClock::new(0.01, 4);
        clock.mark_ready().unwrap();
        clock.start().unwrap();
        clock
    }

    fn beat() -> BeatNotification {
        BeatNotification::beat(TimelinePosition {
            tempo_bpm: 120.0,
            ..Default::default()
        })
    }

    fn level() -> TileMap {
        let mut map = TileMap::rectangle(GridCell::new(0, 0), GridCell::new(4, 4));
        map.add_wall(GridCell::new(2, 1));
        map.place_instrument(GridCell::new(1, 2), InstrumentId(7));
        map
    }

    #[test]
    fn moves_once_per_beat() {
        let mut clock = playing_clock();
        let mut player = PlayerMover::spawn(&mut clock, GridCell::new(1, 1), 0.2, Thresholds::default());
        let map = level();

        assert_eq!(player.try_move(Direction::West, &map, 0.0), MoveOutcome::OffBeat);

        clock.tick(&[beat()], 0.0);
        assert_eq!(
            player.try_move(Direction::South, &map, 0.03),
            MoveOutcome::Moved {
                to: GridCell::new(1, 0),
                grade: AccuracyGrade::Perfect
            }
        );
        assert_eq!(player.try_move(Direction::North, &map, 0.04), MoveOutcome::OffBeat);

        clock.tick(&[beat()], 0.5);
        assert!(matches!(
            player.try_move(Direction::North, &map, 0.58),
            MoveOutcome::Moved { grade: AccuracyGrade::Good, .. }
        ));
        assert_eq!(player.position(), GridCell::new(1, 1));
    }

    #[test]
    fn blocked_moves_keep_the_beat() {
        let mut clock = playing_clock();
        let mut player = PlayerMover::spawn(&mut clock, GridCell::new(1, 1), 0.2, Thresholds::default());
        let map = level();
        clock.tick(&[beat()], 0.0);

        assert_eq!(player.try_move(Direction::East, &map, 0.01), MoveOutcome::Blocked);
        assert!(player.can_move(0.02));
        assert!(matches!(
            player.try_move(Direction::West, &map, 0.02),
            MoveOutcome::Moved { .. }
        ));
    }

    #[test]
    fn walking_into_an_instrument_plays_it() {
        let mut clock = playing_clock();
        let mut player = PlayerMover::spawn(&mut clock, GridCell::new(1, 1), 0.2, Thresholds::default());
        let map = level();
        clock.tick(&[beat()], 0.0);

        assert_eq!(
            player.try_move(Direction::North, &map, 0.12),
            MoveOutcome::Interacted {
                instrument: InstrumentId(7),
                grade: AccuracyGrade::Miss
            }
        );
        assert_eq!(player.position(), GridCell::new(1, 1));
        assert!(!player.can_move(0.13));
    }

    #[test]
    fn late_input_outside_window_is_off_beat() {
        let mut clock = playing_clock();
        let mut player = PlayerMover::spawn(&mut clock, GridCell::new(1, 1), 0.2, Thresholds::default());
        let map = level();
        clock.tick(&[beat()], 0.0);

        assert_eq!(player.try_move(Direction::West, &map, 0.25), MoveOutcome::OffBeat);
        assert!(matches!(
            player.try_move(Direction::West, &map, 0.46),
            MoveOutcome::Moved { grade: AccuracyGrade::Perfect, .. }
        ));
    }

    #[test]
    fn despawned_player_leaves_the_beat_feed() {
        let mut clock = playing_clock();
        let player = PlayerMover::spawn(&mut clock, GridCell::new(0, 0), 0.2, Thresholds::default());
        let gate = player.gate.clone();

        player.despawn(&mut clock);
        clock.tick(&[beat()], 0.0);
        assert!(!gate.borrow().permission().can_act);
    }
}
