use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{BeatError, Result};

/// Top-level configuration structure for the game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub timing: TimingConfig,
    pub gameplay: GameplayConfig,
}

impl AppConfig {
    /// Parses a configuration document. Missing sections and fields fall back
    /// to their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a configuration file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.audio.validate()?;
        self.timing.validate()?;
        self.gameplay.validate()
    }
}

/// Configuration specific to the audio bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Music event to instantiate. `None` (or empty) means no music was set up.
    pub music_event: Option<String>,
    /// Capacity of the queue between the audio callback and the simulation.
    pub queue_capacity: usize,
    /// Number of recent beat timestamps kept by the beat clock.
    pub history_capacity: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            music_event: Some("event:/Music/Main".to_string()),
            queue_capacity: 64,
            history_capacity: 4,
        }
    }
}

impl AudioConfig {
    fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(BeatError::config("audio.queue_capacity must be non-zero"));
        }
        if self.history_capacity == 0 {
            return Err(BeatError::config("audio.history_capacity must be non-zero"));
        }
        Ok(())
    }
}

/// Timing thresholds, all expressed in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub drift_tolerance_secs: f64,
    pub perfect_threshold_secs: f64,
    pub good_threshold_secs: f64,
    pub move_window_secs: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            drift_tolerance_secs: 0.01,
            perfect_threshold_secs: 0.05,
            good_threshold_secs: 0.1,
            move_window_secs: 0.2,
        }
    }
}

impl TimingConfig {
    fn validate(&self) -> Result<()> {
        let fields = [
            ("timing.drift_tolerance_secs", self.drift_tolerance_secs),
            ("timing.perfect_threshold_secs", self.perfect_threshold_secs),
            ("timing.good_threshold_secs", self.good_threshold_secs),
            ("timing.move_window_secs", self.move_window_secs),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(BeatError::config(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if self.perfect_threshold_secs > self.good_threshold_secs {
            return Err(BeatError::config(
                "timing.perfect_threshold_secs must not exceed timing.good_threshold_secs",
            ));
        }
        Ok(())
    }
}

/// Cadence and tuning for the beat-driven gameplay consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplayConfig {
    pub beats_per_enemy_move: u32,
    pub beats_per_spawn: u32,
    /// Reach of an instrument attack, in grid cells.
    pub attack_range: i32,
    /// Delay between activating an instrument and resolving its hits.
    pub attack_delay_secs: f64,
    pub pulse_scale: f32,
    pub pulse_duration_secs: f64,
}

impl Default for GameplayConfig {
    fn default() -> Self {
        Self {
            beats_per_enemy_move: 2,
            beats_per_spawn: 12,
            attack_range: 5,
            attack_delay_secs: 0.1,
            pulse_scale: 0.2,
            pulse_duration_secs: 0.1,
        }
    }
}

impl GameplayConfig {
    fn validate(&self) -> Result<()> {
        if self.beats_per_enemy_move == 0 || self.beats_per_spawn == 0 {
            return Err(BeatError::config(
                "gameplay beat cadences must be at least one beat",
            ));
        }
        if self.attack_range < 0 {
            return Err(BeatError::config("gameplay.attack_range must be non-negative"));
        }
        if !(self.attack_delay_secs >= 0.0 && self.pulse_duration_secs > 0.0) {
            return Err(BeatError::config(
                "gameplay delays must be non-negative and the pulse duration positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_documents_fill_in_defaults() {
        let config =
            AppConfig::from_json_str(r#"{ "gameplay": { "beats_per_spawn": 3 } }"#).unwrap();

        assert_eq!(config.gameplay.beats_per_spawn, 3);
        assert_eq!(config.gameplay.beats_per_enemy_move, 2);
        assert_eq!(config.timing, TimingConfig::default());
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let err = AppConfig::from_json_str(
            r#"{ "timing": { "perfect_threshold_secs": 0.2, "good_threshold_secs": 0.1 } }"#,
        )
        .unwrap_err();

        assert!(matches!(err, BeatError::Config(_)));
    }

    #[test]
    fn rejects_zero_cadence() {
        let err =
            AppConfig::from_json_str(r#"{ "gameplay": { "beats_per_enemy_move": 0 } }"#)
                .unwrap_err();
        assert!(format!("{err}").contains("at least one beat"));
    }

    #[test]
    fn survives_json_round_trip() {
        let config = AppConfig::default();
        let json = config.to_json_pretty().unwrap();
        assert_eq!(AppConfig::from_json_str(&json).unwrap(), config);
    }
}
