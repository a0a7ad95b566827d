//! Interface to the external audio engine and the bridge that carries its
//! timeline notifications over to the simulation thread.
//!
//! The engine itself (decoding, mixing, DSP) is a black box. It is reached
//! through the [`AudioEngine`] trait and reports beats by invoking a
//! [`TimelineCallback`] from whatever thread it mixes on. The payload layout
//! handed to that callback is fixed and little-endian:
//!
//! | kind   | layout                                                              |
//! |--------|---------------------------------------------------------------------|
//! | beat   | `bar:i32 beat:i32 position_ms:i32 tempo:f32 sig_upper:i32 sig_lower:i32` |
//! | marker | `position_ms:i32` followed by an optional, ignored name             |

mod bridge;

pub use bridge::{AudioClockBridge, CallbackFaults, TimelineSlot};

use serde::{Deserialize, Serialize};

use crate::EngineTransientError;

/// Size in bytes of an encoded beat payload.
pub const BEAT_PAYLOAD_LEN: usize = 24;
/// Minimum size in bytes of an encoded marker payload.
pub const MARKER_PAYLOAD_LEN: usize = 4;

/// Opaque handle to a playback instance owned by the audio engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceHandle(pub u64);

/// Reference to a music event known to the audio engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRef(String);

impl EventRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// An event reference that points at nothing.
    pub fn null() -> Self {
        Self::default()
    }

    /// Builds a reference from an optional configured path.
    pub fn from_config(path: Option<&str>) -> Self {
        path.map(Self::new).unwrap_or_default()
    }

    pub fn is_null(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn path(&self) -> &str {
        &self.0
    }
}

/// How playback should come to a halt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    AllowFadeOut,
    Immediate,
}

/// Playback state as reported by the audio engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Starting,
    Playing,
    Sustaining,
    Stopping,
    Stopped,
}

/// Notification types the engine reports through the timeline callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    Beat,
    Marker,
}

/// Status handed back to the engine from the timeline callback. The bridge
/// only ever answers [`CallbackStatus::Ok`] so playback is never disturbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStatus {
    Ok,
}

/// Callback installed on a playback instance. Invoked by the engine on its own
/// execution context.
pub type TimelineCallback = Box<dyn FnMut(CallbackKind, &[u8]) -> CallbackStatus + Send + 'static>;

/// Operations the bridge needs from the audio engine.
pub trait AudioEngine {
    fn create_instance(&mut self, event: &EventRef)
        -> Result<InstanceHandle, EngineTransientError>;

    fn start(&mut self, handle: InstanceHandle) -> Result<(), EngineTransientError>;

    fn stop(&mut self, handle: InstanceHandle, mode: StopMode)
        -> Result<(), EngineTransientError>;

    /// Frees the instance. The engine must drop any callback installed on it.
    fn release(&mut self, handle: InstanceHandle) -> Result<(), EngineTransientError>;

    fn timeline_position_ms(&self, handle: InstanceHandle) -> Result<i32, EngineTransientError>;

    fn set_beat_callback(
        &mut self,
        handle: InstanceHandle,
        callback: TimelineCallback,
    ) -> Result<(), EngineTransientError>;

    fn playback_state(&self, handle: InstanceHandle)
        -> Result<PlaybackState, EngineTransientError>;
}

/// Snapshot of the music timeline at the instant a notification fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelinePosition {
    /// Beat within the current bar, starting at zero.
    pub beat_index: i32,
    pub bar_index: i32,
    pub tempo_bpm: f32,
    pub position_ms: i32,
}

/// Decoded beat payload, including the time signature the engine reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatPayload {
    pub position: TimelinePosition,
    pub signature_upper: i32,
    pub signature_lower: i32,
}

impl BeatPayload {
    pub fn new(position: TimelinePosition) -> Self {
        Self {
            position,
            signature_upper: 4,
            signature_lower: 4,
        }
    }

    /// Decodes a beat payload. Returns `None` for short buffers or a
    /// non-finite tempo. Never allocates.
    pub fn decode(payload: &[u8]) -> Option<Self> {
        if payload.len() < BEAT_PAYLOAD_LEN {
            return None;
        }

        let bar_index = read_i32(payload, 0)?;
        let beat_index = read_i32(payload, 4)?;
        let position_ms = read_i32(payload, 8)?;
        let tempo_bpm = f32::from_le_bytes(payload.get(12..16)?.try_into().ok()?);
        if !tempo_bpm.is_finite() {
            return None;
        }

        Some(Self {
            position: TimelinePosition {
                beat_index,
                bar_index,
                tempo_bpm,
                position_ms,
            },
            signature_upper: read_i32(payload, 16)?,
            signature_lower: read_i32(payload, 20)?,
        })
    }

    pub fn encode(&self) -> [u8; BEAT_PAYLOAD_LEN] {
        let mut out = [0u8; BEAT_PAYLOAD_LEN];
        out[0..4].copy_from_slice(&self.position.bar_index.to_le_bytes());
        out[4..8].copy_from_slice(&self.position.beat_index.to_le_bytes());
        out[8..12].copy_from_slice(&self.position.position_ms.to_le_bytes());
        out[12..16].copy_from_slice(&self.position.tempo_bpm.to_le_bytes());
        out[16..20].copy_from_slice(&self.signature_upper.to_le_bytes());
        out[20..24].copy_from_slice(&self.signature_lower.to_le_bytes());
        out
    }
}

/// Decodes the timeline position carried by a marker payload.
pub fn decode_marker(payload: &[u8]) -> Option<i32> {
    read_i32(payload, 0)
}

pub fn encode_marker(position_ms: i32) -> [u8; MARKER_PAYLOAD_LEN] {
    position_ms.to_le_bytes()
}

fn read_i32(payload: &[u8], offset: usize) -> Option<i32> {
    let bytes = payload.get(offset..offset + 4)?;
    Some(i32::from_le_bytes(bytes.try_into().ok()?))
}

/// What kind of timeline point a notification marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Beat,
    Marker,
}

/// Record handed from the audio callback to the simulation thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatNotification {
    pub kind: NotificationKind,
    pub position: TimelinePosition,
}

impl BeatNotification {
    pub fn beat(position: TimelinePosition) -> Self {
        Self {
            kind: NotificationKind::Beat,
            position,
        }
    }

    pub fn marker(position: TimelinePosition) -> Self {
        Self {
            kind: NotificationKind::Marker,
            position,
        }
    }

    /// True when the notification carries no usable tempo and must not take
    /// part in interval math.
    pub fn is_marker_only(&self) -> bool {
        let tempo = self.position.tempo_bpm;
        self.kind == NotificationKind::Marker || !(tempo.is_finite() && tempo > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_beat_payload_fields() {
        let payload = BeatPayload {
            position: TimelinePosition {
                beat_index: 2,
                bar_index: 7,
                tempo_bpm: 128.0,
                position_ms: 13_125,
            },
            signature_upper: 3,
            signature_lower: 4,
        };

        let decoded = BeatPayload::decode(&payload.encode()).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn rejects_truncated_beat_payload() {
        let bytes = BeatPayload::new(TimelinePosition::default()).encode();
        assert!(BeatPayload::decode(&bytes[..BEAT_PAYLOAD_LEN - 1]).is_none());
        assert!(BeatPayload::decode(&[]).is_none());
    }

    #[test]
    fn rejects_non_finite_tempo() {
        let mut bytes = BeatPayload::new(TimelinePosition::default()).encode();
        bytes[12..16].copy_from_slice(&f32::NAN.to_le_bytes());
        assert!(BeatPayload::decode(&bytes).is_none());
    }

    #[test]
    fn marker_payload_ignores_trailing_name() {
        let mut bytes = encode_marker(4_500).to_vec();
        bytes.extend_from_slice(b"chorus");
        assert_eq!(decode_marker(&bytes), Some(4_500));
        assert_eq!(decode_marker(&bytes[..3]), None);
    }

    #[test]
    fn zero_tempo_beats_are_marker_only() {
        let beat = BeatNotification::beat(TimelinePosition::default());
        assert!(beat.is_marker_only());

        let beat = BeatNotification::beat(TimelinePosition {
            tempo_bpm: 90.0,
            ..Default::default()
        });
        assert!(!beat.is_marker_only());

        for tempo_bpm in [f32::NAN, f32::INFINITY, -120.0] {
            let beat = BeatNotification::beat(TimelinePosition {
                tempo_bpm,
                ..Default::default()
            });
            assert!(beat.is_marker_only(), "tempo {tempo_bpm}");
        }
    }

    #[test]
    fn empty_event_reference_is_null() {
        assert!(EventRef::null().is_null());
        assert!(EventRef::new("   ").is_null());
        assert!(EventRef::from_config(None).is_null());
        assert!(!EventRef::from_config(Some("event:/Music/Main")).is_null());
    }
}
