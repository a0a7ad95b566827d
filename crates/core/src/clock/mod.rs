//! Beat clock: tracks tempo and beat position in simulation wall time and fans
//! beat, bar, drift and marker events out to subscribers.
//!
//! "Time since last beat" is measured from the wall time at which the last
//! beat notification was processed, wrapped by the current beat interval. The
//! native timeline position is available from the bridge for diagnostics but
//! is not used for timing decisions.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::audio::{BeatNotification, TimelinePosition};
use crate::events::{
    BarStarted, BeatOccurred, DriftWarning, MarkerReached, Observers, SubscriptionId,
};
use crate::{AppConfig, BeatError, Result};

/// Sentinel returned by [`BeatClock::time_since_last_beat`] when no beat
/// grid is available.
pub const NOT_PLAYING: f64 = f64::MAX;

/// Lifecycle of the beat clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Uninitialized,
    Ready,
    Playing,
    Stopped,
}

/// Copyable snapshot of the clock's timing state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BeatTiming {
    pub playing: bool,
    pub tempo_bpm: f32,
    pub beat_interval_secs: f64,
    pub last_beat_wall_time: Option<f64>,
    pub beat_index: i32,
    pub bar_index: i32,
}

impl BeatTiming {
    /// Seconds elapsed since the most recent beat boundary, wrapped by the
    /// beat interval. `None` unless playing with a known beat grid.
    pub fn seconds_since_last_beat(&self, now: f64) -> Option<f64> {
        let interval = self.beat_interval_secs;
        if !self.playing || !(interval.is_finite() && interval > 0.0) {
            return None;
        }
        let last = self.last_beat_wall_time?;
        let elapsed = (now - last).max(0.0);
        Some(elapsed % self.beat_interval_secs)
    }

    /// Fractional progress through the current beat, in `[0, 1)`.
    pub fn beat_phase(&self, now: f64) -> Option<f64> {
        self.seconds_since_last_beat(now)
            .map(|elapsed| elapsed / self.beat_interval_secs)
    }

    /// [`BeatTiming::beat_phase`], or [`NOT_PLAYING`] without a beat grid.
    pub fn time_since_last_beat(&self, now: f64) -> f64 {
        self.beat_phase(now).unwrap_or(NOT_PLAYING)
    }

    /// Distance in seconds to the closer of the previous and next beat.
    pub fn seconds_to_nearest_beat(&self, now: f64) -> Option<f64> {
        self.seconds_since_last_beat(now)
            .map(|elapsed| elapsed.min(self.beat_interval_secs - elapsed))
    }
}

/// Read-only handle on the clock's timing, handed to consumers at wiring
/// time. Always reflects the state published by the last clock update.
#[derive(Debug, Clone)]
pub struct BeatClockView(Rc<Cell<BeatTiming>>);

impl BeatClockView {
    /// A view that is not connected to any clock.
    pub fn fixed(timing: BeatTiming) -> Self {
        Self(Rc::new(Cell::new(timing)))
    }

    pub fn timing(&self) -> BeatTiming {
        self.0.get()
    }

    pub fn is_playing(&self) -> bool {
        self.timing().playing
    }

    pub fn beat_interval_secs(&self) -> f64 {
        self.timing().beat_interval_secs
    }

    pub fn time_since_last_beat(&self, now: f64) -> f64 {
        self.timing().time_since_last_beat(now)
    }
}

/// Fixed-capacity ring of recent beat wall times.
#[derive(Debug, Clone)]
pub struct BeatHistory {
    capacity: usize,
    stamps: VecDeque<f64>,
}

impl BeatHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            stamps: VecDeque::with_capacity(capacity),
        }
    }

    /// Records a beat time, evicting the oldest entry when full.
    pub fn push(&mut self, wall_time: f64) {
        if self.stamps.len() == self.capacity {
            self.stamps.pop_front();
        }
        self.stamps.push_back(wall_time);
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.stamps.clear();
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.stamps.iter().copied()
    }

    pub fn latest(&self) -> Option<f64> {
        self.stamps.back().copied()
    }

    /// Mean gap between consecutive recorded beats.
    pub fn average_interval(&self) -> Option<f64> {
        let mut sum = 0.0;
        let mut count = 0;
        for (earlier, later) in self.stamps.iter().zip(self.stamps.iter().skip(1)) {
            let interval = later - earlier;
            if interval > f64::EPSILON {
                sum += interval;
                count += 1;
            }
        }

        (count > 0).then(|| sum / count as f64)
    }
}

/// Owns the beat timing state. Lives on the simulation thread only.
pub struct BeatClock {
    state: ClockState,
    drift_tolerance_secs: f64,
    tempo_bpm: f32,
    beat_interval_secs: f64,
    last_beat_wall_time: Option<f64>,
    current_beat_index: i32,
    current_bar_index: i32,
    beats_processed: u64,
    history: BeatHistory,
    published: Rc<Cell<BeatTiming>>,
    next_subscription: u64,
    beat_observers: Observers<BeatOccurred>,
    bar_observers: Observers<BarStarted>,
    drift_observers: Observers<DriftWarning>,
    marker_observers: Observers<MarkerReached>,
}

impl BeatClock {
    pub fn new(drift_tolerance_secs: f64, history_capacity: usize) -> Self {
        Self {
            state: ClockState::Uninitialized,
            drift_tolerance_secs: drift_tolerance_secs.max(0.0),
            tempo_bpm: 0.0,
            beat_interval_secs: 0.0,
            last_beat_wall_time: None,
            current_beat_index: 0,
            current_bar_index: 0,
            beats_processed: 0,
            history: BeatHistory::new(history_capacity),
            published: Rc::new(Cell::new(BeatTiming::default())),
            next_subscription: 0,
            beat_observers: Observers::new(),
            bar_observers: Observers::new(),
            drift_observers: Observers::new(),
            marker_observers: Observers::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.timing.drift_tolerance_secs,
            config.audio.history_capacity,
        )
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == ClockState::Playing
    }

    /// `Uninitialized | Stopped -> Ready`. Clears the beat state left over
    /// from a previous session.
    pub fn mark_ready(&mut self) -> Result<()> {
        self.transition(ClockState::Ready)?;
        self.tempo_bpm = 0.0;
        self.beat_interval_secs = 0.0;
        self.last_beat_wall_time = None;
        self.current_beat_index = 0;
        self.current_bar_index = 0;
        self.beats_processed = 0;
        self.history.clear();
        self.publish();
        Ok(())
    }

    /// `Ready -> Playing`.
    pub fn start(&mut self) -> Result<()> {
        self.transition(ClockState::Playing)?;
        self.publish();
        Ok(())
    }

    /// `Playing -> Stopped`. Callers flush pending notifications first.
    pub fn stop(&mut self) -> Result<()> {
        self.transition(ClockState::Stopped)?;
        self.publish();
        Ok(())
    }

    fn transition(&mut self, to: ClockState) -> Result<()> {
        let allowed = matches!(
            (self.state, to),
            (ClockState::Uninitialized, ClockState::Ready)
                | (ClockState::Stopped, ClockState::Ready)
                | (ClockState::Ready, ClockState::Playing)
                | (ClockState::Playing, ClockState::Stopped)
        );
        if !allowed {
            return Err(BeatError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        debug!(from = ?self.state, ?to, "beat clock transition");
        self.state = to;
        Ok(())
    }

    /// Applies drained notifications in arrival order at wall time `now`.
    /// Notifications arriving outside `Playing` are discarded.
    pub fn tick(&mut self, notifications: &[BeatNotification], now: f64) {
        if notifications.is_empty() {
            return;
        }
        if self.state != ClockState::Playing {
            debug!(
                count = notifications.len(),
                state = ?self.state,
                "discarding beat notifications outside playback"
            );
            return;
        }

        for notification in notifications {
            if notification.is_marker_only() {
                self.apply_marker(notification.position, now);
            } else {
                self.apply_beat(notification.position, now);
            }
        }
    }

    fn apply_marker(&mut self, position: TimelinePosition, now: f64) {
        debug!(position_ms = position.position_ms, "timeline marker");
        self.marker_observers.emit(&MarkerReached {
            position,
            wall_time: now,
        });
    }

    fn apply_beat(&mut self, position: TimelinePosition, now: f64) {
        let expected = 60.0 / f64::from(position.tempo_bpm);

        if let Some(last) = self.last_beat_wall_time {
            let actual = now - last;
            if (actual - expected).abs() > self.drift_tolerance_secs {
                warn!(
                    expected,
                    actual,
                    beat = position.beat_index,
                    bar = position.bar_index,
                    "beat drift detected"
                );
                self.drift_observers
                    .emit(&DriftWarning { expected, actual });
            }
        }

        if position.tempo_bpm != self.tempo_bpm {
            info!(
                from = self.tempo_bpm,
                to = position.tempo_bpm,
                interval = expected,
                "tempo changed"
            );
        }

        self.tempo_bpm = position.tempo_bpm;
        self.beat_interval_secs = expected;
        self.last_beat_wall_time = Some(now);
        self.current_beat_index = position.beat_index;
        self.current_bar_index = position.bar_index;
        self.beats_processed += 1;
        self.history.push(now);
        self.publish();

        debug!(
            beat = position.beat_index,
            bar = position.bar_index,
            time = now,
            tempo = position.tempo_bpm,
            "beat"
        );

        if position.beat_index == 0 {
            self.bar_observers.emit(&BarStarted {
                bar_index: position.bar_index,
                wall_time: now,
            });
        }
        self.beat_observers.emit(&BeatOccurred {
            beat_index: position.beat_index,
            bar_index: position.bar_index,
            wall_time: now,
        });
    }

    fn publish(&self) {
        self.published.set(self.timing());
    }

    pub fn timing(&self) -> BeatTiming {
        BeatTiming {
            playing: self.is_playing(),
            tempo_bpm: self.tempo_bpm,
            beat_interval_secs: self.beat_interval_secs,
            last_beat_wall_time: self.last_beat_wall_time,
            beat_index: self.current_beat_index,
            bar_index: self.current_bar_index,
        }
    }

    /// Read-only view for consumers wired at construction time.
    pub fn view(&self) -> BeatClockView {
        BeatClockView(Rc::clone(&self.published))
    }

    pub fn time_since_last_beat(&self, now: f64) -> f64 {
        self.timing().time_since_last_beat(now)
    }

    pub fn seconds_to_nearest_beat(&self, now: f64) -> Option<f64> {
        self.timing().seconds_to_nearest_beat(now)
    }

    pub fn tempo_bpm(&self) -> f32 {
        self.tempo_bpm
    }

    pub fn beat_interval_secs(&self) -> f64 {
        self.beat_interval_secs
    }

    pub fn last_beat_wall_time(&self) -> Option<f64> {
        self.last_beat_wall_time
    }

    pub fn current_beat_index(&self) -> i32 {
        self.current_beat_index
    }

    pub fn current_bar_index(&self) -> i32 {
        self.current_bar_index
    }

    pub fn beats_processed(&self) -> u64 {
        self.beats_processed
    }

    pub fn drift_tolerance_secs(&self) -> f64 {
        self.drift_tolerance_secs
    }

    pub fn history(&self) -> &BeatHistory {
        &self.history
    }

    /// Tempo implied by the recorded beat gaps, as opposed to the tempo the
    /// engine reports.
    pub fn measured_tempo_bpm(&self) -> Option<f64> {
        self.history
            .average_interval()
            .map(|interval| 60.0 / interval)
    }

    pub fn on_beat(&mut self, handler: impl FnMut(&BeatOccurred) + 'static) -> SubscriptionId {
        let id = self.allocate_subscription();
        self.beat_observers.subscribe_with(id, handler);
        id
    }

    pub fn on_bar_start(&mut self, handler: impl FnMut(&BarStarted) + 'static) -> SubscriptionId {
        let id = self.allocate_subscription();
        self.bar_observers.subscribe_with(id, handler);
        id
    }

    pub fn on_drift(&mut self, handler: impl FnMut(&DriftWarning) + 'static) -> SubscriptionId {
        let id = self.allocate_subscription();
        self.drift_observers.subscribe_with(id, handler);
        id
    }

    pub fn on_marker(&mut self, handler: impl FnMut(&MarkerReached) + 'static) -> SubscriptionId {
        let id = self.allocate_subscription();
        self.marker_observers.subscribe_with(id, handler);
        id
    }

    /// Removes the subscription behind `id`, whichever feed it belongs to.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.beat_observers.unsubscribe(id)
            || self.bar_observers.unsubscribe(id)
            || self.drift_observers.unsubscribe(id)
            || self.marker_observers.unsubscribe(id)
    }

    fn allocate_subscription(&mut self) -> SubscriptionId {
        self.next_subscription += 1;
        SubscriptionId::from_raw(self.next_subscription)
    }
}

impl std::fmt::Debug for BeatClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeatClock")
            .field("state", &self.state)
            .field("tempo_bpm", &self.tempo_bpm)
            .field("beat_interval_secs", &self.beat_interval_secs)
            .field("last_beat_wall_time", &self.last_beat_wall_time)
            .field("current_beat_index", &self.current_beat_index)
            .field("history", &self.history.len())
            .field("beat_observers", &self.beat_observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use approx::assert_relative_eq;

    use super::*;

    fn beat(beat_index: i32, tempo_bpm: f32) -> BeatNotification {
        BeatNotification::beat(TimelinePosition {
            beat_index,
            bar_index: 0,
            tempo_bpm,
            position_ms: 0,
        })
    }

    fn playing_clock() -> BeatClock {
        let mut clock = BeatClock::new(0.01, 4);
        clock.mark_ready().unwrap();
        clock.start().unwrap();
        clock
    }

    #[test]
    fn interval_follows_every_tempo_change() {
        let mut clock = playing_clock();
        for (step, tempo) in [60.0_f32, 90.0, 120.0, 174.0, 133.3].into_iter().enumerate() {
            clock.tick(&[beat(0, tempo)], step as f64);
            assert_eq!(clock.beat_interval_secs(), 60.0 / f64::from(tempo));
            assert_eq!(clock.tempo_bpm(), tempo);
        }
    }

    #[test]
    fn on_time_beats_raise_no_drift() {
        let mut clock = playing_clock();
        let drifts = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&drifts);
        clock.on_drift(move |warning| sink.borrow_mut().push(*warning));

        for index in 0..16 {
            let jitter = if index % 2 == 0 { 0.004 } else { -0.004 };
            clock.tick(&[beat(index % 4, 120.0)], index as f64 * 0.5 + jitter);
        }

        assert!(drifts.borrow().is_empty());
    }

    #[test]
    fn one_late_gap_raises_exactly_one_drift() {
        let mut clock = playing_clock();
        let drifts = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&drifts);
        clock.on_drift(move |warning| sink.borrow_mut().push(*warning));

        let gaps = [0.5, 0.5, 0.5 + 0.01 + 0.03, 0.5, 0.5];
        let mut now = 0.0;
        clock.tick(&[beat(0, 120.0)], now);
        for gap in gaps {
            now += gap;
            clock.tick(&[beat(1, 120.0)], now);
        }

        let drifts = drifts.borrow();
        assert_eq!(drifts.len(), 1);
        assert_relative_eq!(drifts[0].expected, 0.5);
        assert_relative_eq!(drifts[0].actual, 0.54, epsilon = 1e-9);
    }

    #[test]
    fn beats_drained_after_a_hitch_each_measure_from_the_frame() {
        let mut clock = playing_clock();
        let drifts = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&drifts);
        clock.on_drift(move |warning| sink.borrow_mut().push(*warning));

        clock.tick(&[beat(0, 120.0)], 0.0);
        clock.tick(&[beat(1, 120.0), beat(2, 120.0)], 1.0);

        let drifts = drifts.borrow();
        assert_eq!(drifts.len(), 2);
        assert_relative_eq!(drifts[0].actual, 1.0);
        assert_relative_eq!(drifts[1].actual, 0.0);
        assert_eq!(clock.beats_processed(), 3);
        assert_eq!(clock.current_beat_index(), 2);
    }

    #[test]
    fn first_beat_skips_interval_math() {
        let mut clock = playing_clock();
        let drifts = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&drifts);
        clock.on_drift(move |_| *sink.borrow_mut() += 1);

        clock.tick(&[beat(0, 120.0)], 37.25);
        assert_eq!(*drifts.borrow(), 0);
        assert_eq!(clock.last_beat_wall_time(), Some(37.25));
    }

    #[test]
    fn phase_tracks_elapsed_fraction_of_beat() {
        let mut clock = playing_clock();
        clock.tick(&[beat(0, 120.0)], 0.0);

        assert_relative_eq!(clock.time_since_last_beat(0.1), 0.2, epsilon = 1e-9);
        assert_relative_eq!(clock.time_since_last_beat(0.4), 0.8, epsilon = 1e-9);

        let mut previous = 0.0;
        for step in 0..50 {
            let phase = clock.time_since_last_beat(step as f64 * 0.0099);
            assert!(phase >= previous);
            assert!(phase < 1.0);
            previous = phase;
        }

        clock.tick(&[beat(1, 120.0)], 0.5);
        assert_relative_eq!(clock.time_since_last_beat(0.5), 0.0);
    }

    #[test]
    fn sentinel_when_not_playing() {
        let mut clock = BeatClock::new(0.01, 4);
        assert_eq!(clock.time_since_last_beat(1.0), NOT_PLAYING);

        clock.mark_ready().unwrap();
        clock.start().unwrap();
        assert_eq!(clock.time_since_last_beat(1.0), NOT_PLAYING);

        clock.tick(&[beat(0, 120.0)], 1.0);
        assert!(clock.time_since_last_beat(1.1) < 1.0);

        clock.stop().unwrap();
        assert_eq!(clock.time_since_last_beat(1.1), NOT_PLAYING);
        assert_eq!(clock.seconds_to_nearest_beat(1.1), None);
    }

    #[test]
    fn nearest_beat_distance_wraps_around_boundary() {
        let mut clock = playing_clock();
        clock.tick(&[beat(0, 120.0)], 0.0);

        assert_relative_eq!(clock.seconds_to_nearest_beat(0.02).unwrap(), 0.02, epsilon = 1e-9);
        assert_relative_eq!(clock.seconds_to_nearest_beat(0.49).unwrap(), 0.01, epsilon = 1e-9);
        assert_relative_eq!(clock.seconds_to_nearest_beat(0.25).unwrap(), 0.25, epsilon = 1e-9);
    }

    #[test]
    fn bar_start_precedes_beat_on_downbeat() {
        let mut clock = playing_clock();
        let order = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&order);
        clock.on_beat(move |event| sink.borrow_mut().push(format!("beat{}", event.beat_index)));
        let sink = Rc::clone(&order);
        clock.on_bar_start(move |event| sink.borrow_mut().push(format!("bar{}", event.bar_index)));

        clock.tick(&[beat(3, 120.0), beat(0, 120.0), beat(1, 120.0)], 0.0);

        assert_eq!(*order.borrow(), vec!["beat3", "bar0", "beat0", "beat1"]);
    }

    #[test]
    fn markers_skip_interval_math() {
        let mut clock = playing_clock();
        let markers = Rc::new(RefCell::new(0));
        let beats = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&markers);
        clock.on_marker(move |_| *sink.borrow_mut() += 1);
        let sink = Rc::clone(&beats);
        clock.on_beat(move |_| *sink.borrow_mut() += 1);

        clock.tick(&[beat(0, 120.0)], 0.0);
        clock.tick(
            &[
                BeatNotification::marker(TimelinePosition::default()),
                beat(1, 0.0),
            ],
            0.2,
        );

        assert_eq!(*markers.borrow(), 2);
        assert_eq!(*beats.borrow(), 1);
        assert_eq!(clock.last_beat_wall_time(), Some(0.0));
        assert_eq!(clock.beat_interval_secs(), 0.5);
    }

    #[test]
    fn unusable_tempo_never_reaches_the_phase() {
        let mut clock = playing_clock();
        assert_eq!(clock.time_since_last_beat(0.1), NOT_PLAYING);

        clock.tick(&[beat(0, f32::NAN), beat(1, f32::INFINITY)], 0.0);
        assert_eq!(clock.beat_interval_secs(), 0.0);
        assert_eq!(clock.time_since_last_beat(0.1), NOT_PLAYING);

        clock.tick(&[beat(2, 120.0)], 1.0);
        clock.tick(&[beat(3, f32::NAN)], 1.2);
        assert_relative_eq!(clock.time_since_last_beat(1.1), 0.2, epsilon = 1e-9);
        assert_eq!(clock.beats_processed(), 1);
    }

    #[test]
    fn corrupt_interval_reads_as_not_playing() {
        let timing = BeatTiming {
            playing: true,
            tempo_bpm: f32::NAN,
            beat_interval_secs: f64::NAN,
            last_beat_wall_time: Some(0.0),
            beat_index: 0,
            bar_index: 0,
        };
        assert_eq!(timing.beat_phase(0.1), None);
        assert_eq!(timing.time_since_last_beat(0.1), NOT_PLAYING);
    }

    #[test]
    fn view_sees_state_inside_handlers() {
        let mut clock = playing_clock();
        let view = clock.view();
        let seen = Rc::new(RefCell::new(None));

        let sink = Rc::clone(&seen);
        let handler_view = view.clone();
        clock.on_beat(move |_| *sink.borrow_mut() = handler_view.timing().last_beat_wall_time);

        clock.tick(&[beat(0, 100.0)], 2.5);

        assert_eq!(*seen.borrow(), Some(2.5));
        assert_relative_eq!(view.beat_interval_secs(), 0.6);
    }

    #[test]
    fn history_is_a_bounded_ring() {
        let mut clock = playing_clock();
        for index in 0..10 {
            clock.tick(&[beat(index % 4, 120.0)], index as f64 * 0.5);
        }

        let history = clock.history();
        assert_eq!(history.len(), 4);
        assert_eq!(history.iter().collect::<Vec<_>>(), vec![3.0, 3.5, 4.0, 4.5]);
        assert_relative_eq!(clock.measured_tempo_bpm().unwrap(), 120.0, epsilon = 1e-9);
    }

    #[test]
    fn notifications_outside_playback_are_discarded() {
        let mut clock = BeatClock::new(0.01, 4);
        clock.mark_ready().unwrap();
        clock.tick(&[beat(0, 120.0)], 0.0);

        assert_eq!(clock.beats_processed(), 0);
        assert_eq!(clock.beat_interval_secs(), 0.0);
    }

    #[test]
    fn lifecycle_rejects_invalid_transitions() {
        let mut clock = BeatClock::new(0.01, 4);
        assert!(matches!(
            clock.start(),
            Err(BeatError::InvalidTransition {
                from: ClockState::Uninitialized,
                to: ClockState::Playing
            })
        ));

        clock.mark_ready().unwrap();
        clock.start().unwrap();
        clock.tick(&[beat(2, 120.0)], 0.0);
        clock.stop().unwrap();
        assert!(clock.stop().is_err());

        clock.mark_ready().unwrap();
        assert_eq!(clock.state(), ClockState::Ready);
        assert_eq!(clock.last_beat_wall_time(), None);
        assert!(clock.history().is_empty());
    }

    #[test]
    fn unsubscribed_handlers_stop_receiving() {
        let mut clock = playing_clock();
        let hits = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&hits);
        let id = clock.on_beat(move |_| *sink.borrow_mut() += 1);

        clock.tick(&[beat(0, 120.0)], 0.0);
        assert!(clock.unsubscribe(id));
        clock.tick(&[beat(1, 120.0)], 0.5);

        assert_eq!(*hits.borrow(), 1);
        assert!(!clock.unsubscribe(id));
    }
}
