//! Composition root for a music session: owns the audio bridge and the beat
//! clock, and is the only place that moves the clock through its lifecycle.

use tracing::{debug, error, info, warn};

use crate::audio::{AudioClockBridge, AudioEngine, EventRef, StopMode};
use crate::clock::{BeatClock, BeatClockView, ClockState};
use crate::diagnostics::DebugOverlay;
use crate::events::{BarStarted, BeatOccurred, SubscriptionId};
use crate::{AppConfig, BeatError, Result};

pub struct MusicSession<E: AudioEngine> {
    event: EventRef,
    bridge: AudioClockBridge<E>,
    clock: BeatClock,
}

impl<E: AudioEngine> MusicSession<E> {
    pub fn new(engine: E, config: &AppConfig) -> Self {
        Self {
            event: EventRef::from_config(config.audio.music_event.as_deref()),
            bridge: AudioClockBridge::new(engine, config.audio.queue_capacity),
            clock: BeatClock::from_config(config),
        }
    }

    /// Binds the configured music event. On failure the session stays silent:
    /// no beats are ever delivered and every gate stays closed.
    pub fn initialize(&mut self) -> Result<()> {
        if self.clock.is_playing() {
            self.clock.stop()?;
        }

        if let Err(err) = self.bridge.initialize(&self.event) {
            error!(%err, "music session failed to initialise; continuing without beats");
            return Err(err.into());
        }

        if self.clock.state() != ClockState::Ready {
            self.clock.mark_ready()?;
        }
        Ok(())
    }

    /// Starts playback. Engine failures are logged and leave the session as
    /// it was.
    pub fn start_music(&mut self) -> Result<()> {
        match self.clock.state() {
            ClockState::Playing => {
                debug!("music already playing");
                return Ok(());
            }
            ClockState::Uninitialized => {
                warn!("start requested before the music session was initialised");
                return Err(BeatError::InvalidTransition {
                    from: ClockState::Uninitialized,
                    to: ClockState::Playing,
                });
            }
            ClockState::Stopped => self.clock.mark_ready()?,
            ClockState::Ready => {}
        }

        if let Err(err) = self.bridge.start() {
            warn!(%err, "music start skipped");
            return Err(err.into());
        }
        self.clock.start()?;
        info!(event = self.event.path(), "music started");
        Ok(())
    }

    /// Stops playback, processing notifications that were already queued so
    /// the clock ends on the last beat the engine actually played.
    pub fn stop_music(&mut self, mode: StopMode, now: f64) -> Result<()> {
        if !self.clock.is_playing() {
            return Ok(());
        }

        if let Err(err) = self.bridge.stop(mode) {
            warn!(%err, "music stop skipped");
            return Err(err.into());
        }

        let pending = self.bridge.drain_pending_events();
        self.clock.tick(&pending, now);
        self.clock.stop()?;
        info!(
            beats = self.clock.beats_processed(),
            last_beat = self.clock.current_beat_index(),
            "music stopped"
        );
        Ok(())
    }

    /// Drains the bridge and advances the clock. Call once per simulation
    /// tick, before any consumer logic. Returns the number of notifications
    /// processed.
    pub fn update(&mut self, now: f64) -> usize {
        let pending = self.bridge.drain_pending_events();
        self.clock.tick(&pending, now);
        pending.len()
    }

    /// Tears the session down. Queued notifications are discarded.
    pub fn shutdown(&mut self) {
        self.bridge.shutdown();
        if self.clock.is_playing() {
            if let Err(err) = self.clock.stop() {
                warn!(%err, "beat clock did not stop cleanly");
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn clock(&self) -> &BeatClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut BeatClock {
        &mut self.clock
    }

    pub fn view(&self) -> BeatClockView {
        self.clock.view()
    }

    pub fn overlay(&self) -> DebugOverlay {
        DebugOverlay::capture(&self.clock)
    }

    pub fn bridge(&self) -> &AudioClockBridge<E> {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut AudioClockBridge<E> {
        &mut self.bridge
    }

    pub fn beat_interval_secs(&self) -> f64 {
        self.clock.beat_interval_secs()
    }

    pub fn time_since_last_beat(&self, now: f64) -> f64 {
        self.clock.time_since_last_beat(now)
    }

    pub fn on_beat(&mut self, handler: impl FnMut(&BeatOccurred) + 'static) -> SubscriptionId {
        self.clock.on_beat(handler)
    }

    pub fn on_bar_start(&mut self, handler: impl FnMut(&BarStarted) + 'static) -> SubscriptionId {
        self.clock.on_bar_start(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.clock.unsubscribe(id)
    }
}

impl<E: AudioEngine> std::fmt::Debug for MusicSession<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MusicSession")
            .field("event", &self.event)
            .field("bridge", &self.bridge)
            .field("clock", &self.clock)
            .finish()
    }
}
