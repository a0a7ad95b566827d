//! Metronome that stands in for the external audio engine. It fires timeline
//! callbacks from its own thread, the way a real mixer would.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use beat_runner_core::audio::{
    encode_marker, CallbackKind, EventRef, InstanceHandle, PlaybackState, StopMode,
    TimelineCallback,
};
use beat_runner_core::{AudioEngine, BeatPayload, EngineTransientError, TimelinePosition};
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

const EVENT_PREFIX: &str = "event:/";
const POLL_SLICE: Duration = Duration::from_millis(2);

#[derive(Debug, Clone, Copy)]
pub struct MetronomeSettings {
    pub bpm: f32,
    pub beats_per_bar: i32,
    /// Maximum random offset applied to each beat, either side.
    pub jitter_ms: f64,
    /// Fire a timeline marker at the start of every N-th bar. Zero disables.
    pub marker_every_bars: i32,
    pub seed: u64,
}

impl Default for MetronomeSettings {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            beats_per_bar: 4,
            jitter_ms: 0.0,
            marker_every_bars: 4,
            seed: 7,
        }
    }
}

type SharedCallback = Arc<Mutex<Option<TimelineCallback>>>;

struct Instance {
    handle: InstanceHandle,
    callback: SharedCallback,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    started_at: Option<Instant>,
    state: PlaybackState,
}

pub struct SimulatedEngine {
    settings: MetronomeSettings,
    next_handle: u64,
    instance: Option<Instance>,
}

impl SimulatedEngine {
    pub fn new(settings: MetronomeSettings) -> Self {
        Self {
            settings,
            next_handle: 0,
            instance: None,
        }
    }

    fn instance(&self, handle: InstanceHandle) -> Result<&Instance, EngineTransientError> {
        self.instance
            .as_ref()
            .filter(|instance| instance.handle == handle)
            .ok_or_else(|| EngineTransientError::new("lookup", format!("unknown instance {handle:?}")))
    }

    fn instance_mut(&mut self, handle: InstanceHandle) -> Result<&mut Instance, EngineTransientError> {
        self.instance
            .as_mut()
            .filter(|instance| instance.handle == handle)
            .ok_or_else(|| EngineTransientError::new("lookup", format!("unknown instance {handle:?}")))
    }
}

impl Instance {
    fn halt(&mut self) -> Result<(), EngineTransientError> {
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| EngineTransientError::new("stop", "metronome thread panicked"))?;
        }
        self.state = PlaybackState::Stopped;
        Ok(())
    }
}

impl AudioEngine for SimulatedEngine {
    fn create_instance(&mut self, event: &EventRef) -> Result<InstanceHandle, EngineTransientError> {
        if !event.path().starts_with(EVENT_PREFIX) {
            return Err(EngineTransientError::new(
                "create_instance",
                format!("event `{}` not found", event.path()),
            ));
        }

        self.next_handle += 1;
        let handle = InstanceHandle(self.next_handle);
        self.instance = Some(Instance {
            handle,
            callback: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
            started_at: None,
            state: PlaybackState::Stopped,
        });
        debug!(?handle, event = event.path(), "simulated instance created");
        Ok(handle)
    }

    fn start(&mut self, handle: InstanceHandle) -> Result<(), EngineTransientError> {
        let settings = self.settings;
        let instance = self.instance_mut(handle)?;
        if instance.worker.is_some() {
            return Ok(());
        }

        let origin = Instant::now();
        let callback = Arc::clone(&instance.callback);
        let running = Arc::clone(&instance.running);
        running.store(true, Ordering::Release);

        let worker = thread::Builder::new()
            .name("metronome".into())
            .spawn(move || run_metronome(settings, origin, callback, running))
            .map_err(|err| EngineTransientError::new("start", err.to_string()))?;

        instance.worker = Some(worker);
        instance.started_at = Some(origin);
        instance.state = PlaybackState::Playing;
        info!(bpm = settings.bpm, jitter_ms = settings.jitter_ms, "metronome running");
        Ok(())
    }

    fn stop(&mut self, handle: InstanceHandle, mode: StopMode) -> Result<(), EngineTransientError> {
        let instance = self.instance_mut(handle)?;
        instance.halt()?;
        debug!(?handle, ?mode, "metronome stopped");
        Ok(())
    }

    fn release(&mut self, handle: InstanceHandle) -> Result<(), EngineTransientError> {
        let instance = self.instance_mut(handle)?;
        instance.halt()?;
        instance.callback.lock().take();
        self.instance = None;
        Ok(())
    }

    fn timeline_position_ms(&self, handle: InstanceHandle) -> Result<i32, EngineTransientError> {
        let instance = self.instance(handle)?;
        let elapsed = instance
            .started_at
            .map(|origin| origin.elapsed().as_millis())
            .unwrap_or(0);
        Ok(i32::try_from(elapsed).unwrap_or(i32::MAX))
    }

    fn set_beat_callback(
        &mut self,
        handle: InstanceHandle,
        callback: TimelineCallback,
    ) -> Result<(), EngineTransientError> {
        let instance = self.instance_mut(handle)?;
        *instance.callback.lock() = Some(callback);
        Ok(())
    }

    fn playback_state(&self, handle: InstanceHandle) -> Result<PlaybackState, EngineTransientError> {
        Ok(self.instance(handle)?.state)
    }
}

impl Drop for SimulatedEngine {
    fn drop(&mut self) {
        if let Some(instance) = self.instance.as_mut() {
            let _ = instance.halt();
        }
    }
}

fn run_metronome(
    settings: MetronomeSettings,
    origin: Instant,
    callback: SharedCallback,
    running: Arc<AtomicBool>,
) {
    let interval = 60.0 / f64::from(settings.bpm);
    let beats_per_bar = settings.beats_per_bar.max(1);
    let mut rng = SmallRng::seed_from_u64(settings.seed);
    let mut count: u32 = 0;

    loop {
        let jitter = if settings.jitter_ms > 0.0 {
            rng.random_range(-settings.jitter_ms..=settings.jitter_ms) / 1000.0
        } else {
            0.0
        };
        let due = origin + Duration::from_secs_f64((f64::from(count) * interval + jitter).max(0.0));

        while Instant::now() < due {
            if !running.load(Ordering::Acquire) {
                return;
            }
            thread::sleep(due.saturating_duration_since(Instant::now()).min(POLL_SLICE));
        }
        if !running.load(Ordering::Acquire) {
            return;
        }

        let beat_index = (count % beats_per_bar as u32) as i32;
        let bar_index = (count / beats_per_bar as u32) as i32;
        let position_ms = i32::try_from(origin.elapsed().as_millis()).unwrap_or(i32::MAX);

        let payload = BeatPayload::new(TimelinePosition {
            beat_index,
            bar_index,
            tempo_bpm: settings.bpm,
            position_ms,
        })
        .encode();

        if let Some(callback) = callback.lock().as_mut() {
            callback(CallbackKind::Beat, &payload);
            let marker_due = settings.marker_every_bars > 0
                && beat_index == 0
                && bar_index > 0
                && bar_index % settings.marker_every_bars == 0;
            if marker_due {
                callback(CallbackKind::Marker, &encode_marker(position_ms));
            }
        }

        count = count.wrapping_add(1);
    }
}
