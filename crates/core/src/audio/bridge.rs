use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicI32, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::{debug, error, info, warn};

use super::{
    decode_marker, AudioEngine, BeatNotification, BeatPayload, CallbackKind, CallbackStatus,
    EventRef, InstanceHandle, PlaybackState, StopMode, TimelineCallback, TimelinePosition,
};
use crate::{EngineTransientError, InitError};

/// Timeline fields written by the audio callback and readable from anywhere.
///
/// Only primitive atomics live here, so the callback can publish the latest
/// timeline position without taking a lock. The slot also counts faults the
/// callback had to swallow; the bridge reports them from the simulation side.
#[derive(Debug, Default)]
pub struct TimelineSlot {
    beat_index: AtomicI32,
    bar_index: AtomicI32,
    tempo_bits: AtomicU32,
    position_ms: AtomicI32,
    received: AtomicU64,
    malformed: AtomicU64,
    dropped: AtomicU64,
    panicked: AtomicU64,
}

impl TimelineSlot {
    fn store(&self, position: &TimelinePosition) {
        self.beat_index.store(position.beat_index, Ordering::Relaxed);
        self.bar_index.store(position.bar_index, Ordering::Relaxed);
        self.tempo_bits
            .store(position.tempo_bpm.to_bits(), Ordering::Relaxed);
        self.position_ms
            .store(position.position_ms, Ordering::Relaxed);
    }

    /// Latest position published by the audio callback. Fields are read
    /// individually, so a snapshot taken mid-update may mix two beats.
    pub fn snapshot(&self) -> TimelinePosition {
        TimelinePosition {
            beat_index: self.beat_index.load(Ordering::Relaxed),
            bar_index: self.bar_index.load(Ordering::Relaxed),
            tempo_bpm: f32::from_bits(self.tempo_bits.load(Ordering::Relaxed)),
            position_ms: self.position_ms.load(Ordering::Relaxed),
        }
    }

    pub fn faults(&self) -> CallbackFaults {
        CallbackFaults {
            received: self.received.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
        }
    }
}

/// Running totals of what the audio callback saw and had to discard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallbackFaults {
    pub received: u64,
    pub malformed: u64,
    pub dropped: u64,
    pub panicked: u64,
}

/// Owns the playback instance and the handoff between the audio engine's
/// callback context and the simulation thread.
///
/// The callback only writes atomics into the [`TimelineSlot`] and pushes
/// [`BeatNotification`]s into a single-producer/single-consumer ring. The
/// simulation thread drains that ring once per tick.
pub struct AudioClockBridge<E: AudioEngine> {
    engine: E,
    queue_capacity: usize,
    instance: Option<InstanceHandle>,
    slot: Option<Arc<TimelineSlot>>,
    consumer: Option<HeapCons<BeatNotification>>,
    reported: CallbackFaults,
    publish: PublishFn,
}

/// Work done by the timeline callback for one notification.
type PublishFn = fn(&TimelineSlot, &mut HeapProd<BeatNotification>, CallbackKind, &[u8]);

impl<E: AudioEngine> AudioClockBridge<E> {
    pub fn new(engine: E, queue_capacity: usize) -> Self {
        Self {
            engine,
            queue_capacity: queue_capacity.max(1),
            instance: None,
            slot: None,
            consumer: None,
            reported: CallbackFaults::default(),
            publish: publish_notification,
        }
    }

    #[cfg(test)]
    fn with_publisher(mut self, publish: PublishFn) -> Self {
        self.publish = publish;
        self
    }

    /// Creates the playback instance for `event` and installs the timeline
    /// callback. Any previous instance is torn down first.
    pub fn initialize(&mut self, event: &EventRef) -> Result<(), InitError> {
        self.shutdown();

        if event.is_null() {
            error!("music event reference is null; music will not start");
            return Err(InitError::NullEventReference);
        }

        let handle = self.engine.create_instance(event).map_err(|err| {
            error!(event = event.path(), %err, "audio engine refused to create instance");
            InitError::EngineRejected(err.to_string())
        })?;

        let slot = Arc::new(TimelineSlot::default());
        let (producer, consumer) = HeapRb::<BeatNotification>::new(self.queue_capacity).split();
        let callback = timeline_callback(Arc::clone(&slot), producer, self.publish);

        if let Err(err) = self.engine.set_beat_callback(handle, callback) {
            error!(event = event.path(), %err, "audio engine refused the timeline callback");
            if let Err(release_err) = self.engine.release(handle) {
                warn!(%release_err, "failed to release rejected instance");
            }
            return Err(InitError::EngineRejected(err.to_string()));
        }

        info!(event = event.path(), ?handle, "music instance initialised");
        self.instance = Some(handle);
        self.slot = Some(slot);
        self.consumer = Some(consumer);
        self.reported = CallbackFaults::default();
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.instance.is_some()
    }

    pub fn start(&mut self) -> Result<(), EngineTransientError> {
        let handle = self.handle("start")?;
        self.engine.start(handle)
    }

    pub fn stop(&mut self, mode: StopMode) -> Result<(), EngineTransientError> {
        let handle = self.handle("stop")?;
        self.engine.stop(handle, mode)
    }

    pub fn timeline_position_ms(&self) -> Result<i32, EngineTransientError> {
        let handle = self.handle("timeline_position_ms")?;
        self.engine.timeline_position_ms(handle)
    }

    pub fn playback_state(&self) -> Result<PlaybackState, EngineTransientError> {
        let handle = self.handle("playback_state")?;
        self.engine.playback_state(handle)
    }

    /// Last timeline position written by the audio callback.
    pub fn timeline(&self) -> Option<TimelinePosition> {
        self.slot.as_ref().map(|slot| slot.snapshot())
    }

    pub fn faults(&self) -> CallbackFaults {
        self.slot
            .as_ref()
            .map(|slot| slot.faults())
            .unwrap_or_default()
    }

    /// Pops every queued notification in arrival order. Never blocks.
    pub fn drain_pending_events(&mut self) -> Vec<BeatNotification> {
        let Some(consumer) = self.consumer.as_mut() else {
            return Vec::new();
        };

        let events: Vec<BeatNotification> = consumer.pop_iter().collect();
        self.report_faults();
        events
    }

    /// Stops playback, releases the instance and drops the shared slot.
    /// Queued notifications are discarded. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.instance.take() {
            if let Err(err) = self.engine.stop(handle, StopMode::Immediate) {
                warn!(%err, "failed to stop music instance during shutdown");
            }
            if let Err(err) = self.engine.release(handle) {
                warn!(%err, "failed to release music instance during shutdown");
            }
            info!(?handle, "music instance released");
        }

        if let Some(mut consumer) = self.consumer.take() {
            let discarded = consumer.pop_iter().count();
            if discarded > 0 {
                debug!(discarded, "discarded pending beat notifications");
            }
        }
        self.slot = None;
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    fn handle(&self, operation: &'static str) -> Result<InstanceHandle, EngineTransientError> {
        self.instance
            .ok_or_else(|| EngineTransientError::new(operation, "no playback instance"))
    }

    fn report_faults(&mut self) {
        let Some(slot) = self.slot.as_ref() else {
            return;
        };
        let current = slot.faults();
        let previous = self.reported;

        if current.malformed > previous.malformed {
            warn!(
                count = current.malformed - previous.malformed,
                "ignored malformed timeline payloads"
            );
        }
        if current.dropped > previous.dropped {
            warn!(
                count = current.dropped - previous.dropped,
                capacity = self.queue_capacity,
                "beat queue full; notifications dropped"
            );
        }
        if current.panicked > previous.panicked {
            error!(
                count = current.panicked - previous.panicked,
                "timeline callback panicked; notification swallowed"
            );
        }
        self.reported = current;
    }
}

impl<E: AudioEngine> Drop for AudioClockBridge<E> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<E: AudioEngine> std::fmt::Debug for AudioClockBridge<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioClockBridge")
            .field("queue_capacity", &self.queue_capacity)
            .field("instance", &self.instance)
            .field("reported", &self.reported)
            .finish_non_exhaustive()
    }
}

fn timeline_callback(
    slot: Arc<TimelineSlot>,
    mut producer: HeapProd<BeatNotification>,
    publish: PublishFn,
) -> TimelineCallback {
    Box::new(move |kind, payload| {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            publish(&slot, &mut producer, kind, payload)
        }));
        if outcome.is_err() {
            slot.panicked.fetch_add(1, Ordering::Relaxed);
        }
        CallbackStatus::Ok
    })
}

// Runs on the audio engine's thread: no allocation, no locks, no logging.
fn publish_notification(
    slot: &TimelineSlot,
    producer: &mut HeapProd<BeatNotification>,
    kind: CallbackKind,
    payload: &[u8],
) {
    slot.received.fetch_add(1, Ordering::Relaxed);

    let notification = match kind {
        CallbackKind::Beat => match BeatPayload::decode(payload) {
            Some(beat) => {
                slot.store(&beat.position);
                BeatNotification::beat(beat.position)
            }
            None => {
                slot.malformed.fetch_add(1, Ordering::Relaxed);
                return;
            }
        },
        CallbackKind::Marker => match decode_marker(payload) {
            Some(position_ms) => {
                slot.position_ms.store(position_ms, Ordering::Relaxed);
                BeatNotification::marker(slot.snapshot())
            }
            None => {
                slot.malformed.fetch_add(1, Ordering::Relaxed);
                return;
            }
        },
    };

    if producer.try_push(notification).is_err() {
        slot.dropped.fetch_add(1, Ordering::Relaxed);
    }
}
