use std::fmt;

use serde::Serialize;

use crate::clock::BeatClock;

/// Read-only debug readout of the beat clock. Nothing reads it back for
/// timing decisions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DebugOverlay {
    pub is_playing: bool,
    pub tempo_bpm: f32,
    pub beat_interval_secs: f64,
    pub last_beat_wall_time: Option<f64>,
    pub measured_tempo_bpm: Option<f64>,
}

impl DebugOverlay {
    pub fn capture(clock: &BeatClock) -> Self {
        Self {
            is_playing: clock.is_playing(),
            tempo_bpm: clock.tempo_bpm(),
            beat_interval_secs: clock.beat_interval_secs(),
            last_beat_wall_time: clock.last_beat_wall_time(),
            measured_tempo_bpm: clock.measured_tempo_bpm(),
        }
    }
}

impl fmt::Display for DebugOverlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Music Playing: {}", self.is_playing)?;
        writeln!(f, "Current Tempo: {}", self.tempo_bpm)?;
        writeln!(f, "Beat Interval: {:.3}s", self.beat_interval_secs)?;
        match self.last_beat_wall_time {
            Some(time) => write!(f, "Last Beat Time: {time:.3}s"),
            None => write!(f, "Last Beat Time: -"),
        }
    }
}
