//! Shared audio engine double for the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use beat_runner_core::audio::{
    CallbackKind, EventRef, InstanceHandle, PlaybackState, StopMode, TimelineCallback,
};
use beat_runner_core::{AudioEngine, BeatPayload, EngineTransientError, TimelinePosition};

/// Callback slot that any thread can fire into, like a real engine's
/// mixer thread would.
#[derive(Clone, Default)]
pub struct CallbackHandle(Arc<Mutex<Option<TimelineCallback>>>);

impl CallbackHandle {
    pub fn fire(&self, kind: CallbackKind, payload: &[u8]) {
        if let Some(callback) = self.0.lock().unwrap().as_mut() {
            callback(kind, payload);
        }
    }

    pub fn fire_beat(&self, bar_index: i32, beat_index: i32, tempo_bpm: f32) {
        let payload = BeatPayload::new(TimelinePosition {
            beat_index,
            bar_index,
            tempo_bpm,
            position_ms: 0,
        })
        .encode();
        self.fire(CallbackKind::Beat, &payload);
    }

    pub fn is_installed(&self) -> bool {
        self.0.lock().unwrap().is_some()
    }
}

#[derive(Default)]
pub struct ThreadedEngine {
    pub callback: CallbackHandle,
    state: Option<PlaybackState>,
}

impl ThreadedEngine {
    pub fn new() -> (Self, CallbackHandle) {
        let engine = Self::default();
        let handle = engine.callback.clone();
        (engine, handle)
    }
}

impl AudioEngine for ThreadedEngine {
    fn create_instance(&mut self, _event: &EventRef) -> Result<InstanceHandle, EngineTransientError> {
        self.state = Some(PlaybackState::Stopped);
        Ok(InstanceHandle(42))
    }

    fn start(&mut self, _handle: InstanceHandle) -> Result<(), EngineTransientError> {
        self.state = Some(PlaybackState::Playing);
        Ok(())
    }

    fn stop(&mut self, _handle: InstanceHandle, _mode: StopMode) -> Result<(), EngineTransientError> {
        self.state = Some(PlaybackState::Stopped);
        Ok(())
    }

    fn release(&mut self, _handle: InstanceHandle) -> Result<(), EngineTransientError> {
        self.callback.0.lock().unwrap().take();
        self.state = None;
        Ok(())
    }

    fn timeline_position_ms(&self, _handle: InstanceHandle) -> Result<i32, EngineTransientError> {
        Ok(0)
    }

    fn set_beat_callback(
        &mut self,
        _handle: InstanceHandle,
        callback: TimelineCallback,
    ) -> Result<(), EngineTransientError> {
        *self.callback.0.lock().unwrap() = Some(callback);
        Ok(())
    }

    fn playback_state(&self, _handle: InstanceHandle) -> Result<PlaybackState, EngineTransientError> {
        self.state
            .ok_or_else(|| EngineTransientError::new("playback_state", "instance released"))
    }
}
