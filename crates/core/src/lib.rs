//! Core library for the Beat Runner engine.
//!
//! Beats reported by the audio engine on its own thread are queued by the
//! [`audio`] bridge, drained once per simulation tick into the [`clock`], and
//! fanned out to gameplay consumers through per-consumer [`gate`]s. Each
//! module owns one stage of that pipeline; [`session`] wires them together.

pub mod audio;
pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod gameplay;
pub mod gate;
pub mod grading;
pub mod session;
pub mod timeline;

pub use audio::{
    AudioClockBridge, AudioEngine, BeatNotification, BeatPayload, EventRef, StopMode,
    TimelinePosition,
};
pub use clock::{BeatClock, BeatClockView, BeatTiming, ClockState, NOT_PLAYING};
pub use config::{AppConfig, AudioConfig, GameplayConfig, TimingConfig};
pub use diagnostics::DebugOverlay;
pub use error::{BeatError, EngineTransientError, InitError, Result};
pub use events::{BarStarted, BeatOccurred, DriftWarning, MarkerReached, SubscriptionId};
pub use gate::{subscribe_gate, BeatGate, GatePolicy, SharedGate};
pub use grading::{classify, grade_at, AccuracyGrade, Thresholds};
pub use session::MusicSession;
pub use timeline::{PlaybackClock, Scheduler};
