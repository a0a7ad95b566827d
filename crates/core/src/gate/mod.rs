//! Beat gates: per-consumer permission that limits an action to once per beat
//! (optionally inside a time window around the beat) or once per N beats.

use std::cell::RefCell;
use std::rc::Rc;

use crate::clock::{BeatClock, BeatTiming};
use crate::events::SubscriptionId;

/// Grant rule applied by a [`BeatGate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GatePolicy {
    /// Once per beat, only while within `window_secs` of a beat boundary on
    /// either side.
    EveryBeat { window_secs: f64 },
    /// Once every `beats` beats, at any time.
    EveryNBeats { beats: u32 },
}

/// Permission state owned by a single consumer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatePermission {
    pub can_act: bool,
    pub beats_since_last_action: u32,
}

#[derive(Debug, Clone)]
pub struct BeatGate {
    policy: GatePolicy,
    permission: GatePermission,
}

/// Gate shared between its owner and the clock's beat subscription.
pub type SharedGate = Rc<RefCell<BeatGate>>;

impl BeatGate {
    pub fn new(policy: GatePolicy) -> Self {
        let policy = match policy {
            GatePolicy::EveryBeat { window_secs } => GatePolicy::EveryBeat {
                window_secs: window_secs.max(0.0),
            },
            GatePolicy::EveryNBeats { beats } => GatePolicy::EveryNBeats {
                beats: beats.max(1),
            },
        };
        Self {
            policy,
            permission: GatePermission::default(),
        }
    }

    /// Once-per-beat gate with a window around each beat.
    pub fn windowed(window_secs: f64) -> Self {
        Self::new(GatePolicy::EveryBeat { window_secs })
    }

    /// Once-per-`beats` gate without a window.
    pub fn every_n_beats(beats: u32) -> Self {
        Self::new(GatePolicy::EveryNBeats { beats })
    }

    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    pub fn permission(&self) -> GatePermission {
        self.permission
    }

    pub fn into_shared(self) -> SharedGate {
        Rc::new(RefCell::new(self))
    }

    pub fn on_beat(&mut self) {
        let permission = &mut self.permission;
        permission.beats_since_last_action = permission.beats_since_last_action.saturating_add(1);

        match self.policy {
            GatePolicy::EveryBeat { .. } => permission.can_act = true,
            GatePolicy::EveryNBeats { beats } => {
                if permission.beats_since_last_action >= beats {
                    permission.can_act = true;
                    permission.beats_since_last_action = 0;
                }
            }
        }
    }

    /// Whether [`BeatGate::try_consume`] would grant at `now`.
    pub fn is_open(&self, timing: &BeatTiming, now: f64) -> bool {
        if !self.permission.can_act {
            return false;
        }

        match self.policy {
            GatePolicy::EveryBeat { window_secs } => timing
                .seconds_to_nearest_beat(now)
                .is_some_and(|offset| offset <= window_secs),
            GatePolicy::EveryNBeats { .. } => true,
        }
    }

    /// Takes the permission if the gate is open. No side effects otherwise.
    pub fn try_consume(&mut self, timing: &BeatTiming, now: f64) -> bool {
        if !self.is_open(timing, now) {
            return false;
        }

        self.permission.can_act = false;
        if let GatePolicy::EveryBeat { .. } = self.policy {
            self.permission.beats_since_last_action = 0;
        }
        true
    }

    /// Drops any pending permission, e.g. when the owner respawns.
    pub fn reset(&mut self) {
        self.permission = GatePermission::default();
    }
}

/// Feeds the clock's beat events into `gate`. The subscription only holds a
/// weak reference, so dropping the gate silences it; unsubscribe with the
/// returned token to remove it entirely.
pub fn subscribe_gate(clock: &mut BeatClock, gate: &SharedGate) -> SubscriptionId {
    let gate = Rc::downgrade(gate);
    clock.on_beat(move |_| {
        if let Some(gate) = gate.upgrade() {
            gate.borrow_mut().on_beat();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{BeatNotification, TimelinePosition};

    fn timing(last_beat: f64) -> BeatTiming {
        BeatTiming {
            playing: true,
            tempo_bpm: 120.0,
            beat_interval_secs: 0.5,
            last_beat_wall_time: Some(last_beat),
            beat_index: 0,
            bar_index: 0,
        }
    }

    #[test]
    fn windowed_gate_grants_once_per_beat() {
        let mut gate = BeatGate::windowed(0.2);
        let timing = timing(0.0);

        assert!(!gate.try_consume(&timing, 0.01));

        gate.on_beat();
        let grants = (0..20)
            .filter(|step| gate.try_consume(&timing, 0.01 + *step as f64 * 0.001))
            .count();
        assert_eq!(grants, 1);

        gate.on_beat();
        assert!(gate.try_consume(&timing, 0.02));
    }

    #[test]
    fn windowed_gate_wraps_around_the_boundary() {
        let timing = timing(0.0);
        for (now, expected) in [(0.02, true), (0.49, true), (0.25, false), (0.2, true), (0.29, false)] {
            let mut gate = BeatGate::windowed(0.2);
            gate.on_beat();
            assert_eq!(gate.try_consume(&timing, now), expected, "at t={now}");
        }
    }

    #[test]
    fn rejected_attempt_keeps_permission() {
        let mut gate = BeatGate::windowed(0.2);
        let timing = timing(0.0);
        gate.on_beat();

        assert!(!gate.try_consume(&timing, 0.25));
        assert!(gate.permission().can_act);
        assert!(gate.try_consume(&timing, 0.45));
    }

    #[test]
    fn windowed_gate_needs_a_beat_grid() {
        let mut gate = BeatGate::windowed(0.2);
        gate.on_beat();
        let stopped = BeatTiming {
            playing: false,
            ..timing(0.0)
        };
        assert!(!gate.try_consume(&stopped, 0.0));
    }

    #[test]
    fn every_four_beats_grants_on_the_fourth() {
        let mut gate = BeatGate::every_n_beats(4);
        let timing = BeatTiming::default();
        let mut grants = Vec::new();

        for beat in 1..=12 {
            gate.on_beat();
            if gate.try_consume(&timing, 0.0) {
                grants.push(beat);
            }
        }

        assert_eq!(grants, vec![4, 8, 12]);
    }

    #[test]
    fn zero_beat_cadence_behaves_as_one() {
        let gate = BeatGate::every_n_beats(0);
        assert_eq!(gate.policy(), GatePolicy::EveryNBeats { beats: 1 });
    }

    #[test]
    fn subscribed_gate_follows_clock_beats() {
        let mut clock = BeatClock::new(0.01, 4);
        clock.mark_ready().unwrap();
        clock.start().unwrap();
        let gate = BeatGate::every_n_beats(2).into_shared();
        let id = subscribe_gate(&mut clock, &gate);

        let beat = BeatNotification::beat(TimelinePosition {
            tempo_bpm: 120.0,
            ..Default::default()
        });
        clock.tick(&[beat], 0.0);
        assert!(!gate.borrow().permission().can_act);
        clock.tick(&[beat], 0.5);
        assert!(gate.borrow().permission().can_act);

        assert!(clock.unsubscribe(id));
        gate.borrow_mut().reset();
        clock.tick(&[beat, beat], 1.0);
        assert_eq!(gate.borrow().permission(), GatePermission::default());
    }

    #[test]
    fn dropped_gate_is_ignored_by_the_clock() {
        let mut clock = BeatClock::new(0.01, 4);
        clock.mark_ready().unwrap();
        clock.start().unwrap();
        let gate = BeatGate::windowed(0.1).into_shared();
        subscribe_gate(&mut clock, &gate);
        drop(gate);

        clock.tick(
            &[BeatNotification::beat(TimelinePosition {
                tempo_bpm: 120.0,
                ..Default::default()
            })],
            0.0,
        );
        assert_eq!(clock.beats_processed(), 1);
    }
}
