use std::time::Instant;

/// Simulation wall clock, in seconds since it was started.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackClock {
    origin: Instant,
}

impl PlaybackClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn now_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Work item due at `pending_at` (simulation seconds).
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEvent<T> {
    pub pending_at: f64,
    pub payload: T,
}

impl<T> ScheduledEvent<T> {
    pub fn new(pending_at: f64, payload: T) -> Self {
        Self {
            pending_at,
            payload,
        }
    }
}

/// Delayed actions checked once per tick. Events with the same due time come
/// out in the order they were scheduled.
#[derive(Debug)]
pub struct Scheduler<T> {
    events: Vec<ScheduledEvent<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, pending_at: f64, payload: T) {
        let index = self
            .events
            .partition_point(|event| event.pending_at.total_cmp(&pending_at).is_le());
        self.events
            .insert(index, ScheduledEvent::new(pending_at, payload));
    }

    /// Removes and returns every event due at or before `now`, earliest first.
    pub fn drain_due(&mut self, now: f64) -> Vec<T> {
        let due = self
            .events
            .partition_point(|event| event.pending_at <= now);
        self.events
            .drain(..due)
            .map(|event| event.payload)
            .collect()
    }

    /// Due time of the earliest pending event.
    pub fn next_due(&self) -> Option<f64> {
        self.events.first().map(|event| event.pending_at)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
