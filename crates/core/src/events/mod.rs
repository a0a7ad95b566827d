//! Events fanned out by the beat clock and the observer lists that carry them.

use crate::audio::TimelinePosition;

/// Fired once per beat notification with a usable tempo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatOccurred {
    pub beat_index: i32,
    pub bar_index: i32,
    /// Simulation wall time at which the beat was processed.
    pub wall_time: f64,
}

/// Fired ahead of [`BeatOccurred`] when the beat opens a bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarStarted {
    pub bar_index: i32,
    pub wall_time: f64,
}

/// Observability signal: the measured beat gap disagrees with the tempo.
/// Never alters scheduling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftWarning {
    pub expected: f64,
    pub actual: f64,
}

impl DriftWarning {
    pub fn error(&self) -> f64 {
        self.actual - self.expected
    }
}

/// A timeline marker, or a beat that arrived without a usable tempo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerReached {
    pub position: TimelinePosition,
    pub wall_time: f64,
}

/// Token returned by a subscription; hand it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

type Handler<E> = Box<dyn FnMut(&E)>;

/// Ordered list of handlers invoked synchronously on emit.
pub struct Observers<E> {
    handlers: Vec<(SubscriptionId, Handler<E>)>,
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }
}

impl<E> Observers<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under a token allocated by the owner, which shares
    /// one id space across all of its lists.
    pub(crate) fn subscribe_with(&mut self, id: SubscriptionId, handler: impl FnMut(&E) + 'static) {
        self.handlers.push((id, Box::new(handler)));
    }

    /// Removes a handler. Returns `false` when the token is unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(existing, _)| *existing != id);
        self.handlers.len() != before
    }

    /// Delivers `event` to every handler in subscription order.
    pub fn emit(&mut self, event: &E) {
        for (_, handler) in &mut self.handlers {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<E> std::fmt::Debug for Observers<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
