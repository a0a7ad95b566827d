use std::cell::Cell;
use std::f64::consts::PI;
use std::rc::Rc;

use crate::clock::BeatClock;
use crate::events::SubscriptionId;

/// Visual scale bump that follows every beat.
#[derive(Debug)]
pub struct BeatPulse {
    pulse_scale: f32,
    duration_secs: f64,
    started_at: Rc<Cell<Option<f64>>>,
    subscription: SubscriptionId,
}

impl BeatPulse {
    pub fn spawn(clock: &mut BeatClock, pulse_scale: f32, duration_secs: f64) -> Self {
        let started_at = Rc::new(Cell::new(None));
        let start = Rc::clone(&started_at);
        let subscription = clock.on_beat(move |beat| start.set(Some(beat.wall_time)));
        Self {
            pulse_scale,
            duration_secs,
            started_at,
            subscription,
        }
    }

    /// Scale multiplier at `now`: rises and falls once over the pulse
    /// duration, and is `1.0` otherwise.
    pub fn scale_at(&self, now: f64) -> f32 {
        let Some(start) = self.started_at.get() else {
            return 1.0;
        };
        if self.duration_secs <= 0.0 {
            return 1.0;
        }

        let progress = (now - start) / self.duration_secs;
        if !(0.0..=1.0).contains(&progress) {
            return 1.0;
        }
        1.0 + (progress * PI).sin() as f32 * self.pulse_scale
    }

    pub fn despawn(self, clock: &mut BeatClock) {
        clock.unsubscribe(self.subscription);
    }
}
