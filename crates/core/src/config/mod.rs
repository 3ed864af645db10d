use std::{fs, path::Path, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{AccentMap, MetronomeError, Result};

pub const MIN_BPM: u32 = 30;
pub const MAX_BPM: u32 = 300;
pub const DEFAULT_BPM: u32 = 120;

pub const MIN_SIGNATURE: u32 = 2;
pub const MAX_SIGNATURE: u32 = 32;
pub const DEFAULT_SIGNATURE: u32 = 4;

/// Tempo settings shared by the scheduler and the interpolator.
///
/// Values are always inside `[MIN_BPM, MAX_BPM]` and
/// `[MIN_SIGNATURE, MAX_SIGNATURE]`; out of range input is clamped rather
/// than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TempoConfig {
    pub bpm: u32,
    pub beats_per_measure: u32,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            beats_per_measure: DEFAULT_SIGNATURE,
        }
    }
}

impl TempoConfig {
    pub fn new(bpm: u32, beats_per_measure: u32) -> Self {
        Self::from_raw(i64::from(bpm), i64::from(beats_per_measure))
    }

    /// Builds a config from unvalidated UI input, clamping both fields.
    pub fn from_raw(bpm: i64, beats_per_measure: i64) -> Self {
        Self {
            bpm: clamp_field(bpm, MIN_BPM, MAX_BPM),
            beats_per_measure: clamp_field(beats_per_measure, MIN_SIGNATURE, MAX_SIGNATURE),
        }
    }

    pub fn clamped(self) -> Self {
        Self::new(self.bpm, self.beats_per_measure)
    }

    pub fn with_bpm(self, bpm: i64) -> Self {
        Self::from_raw(bpm, i64::from(self.beats_per_measure))
    }

    pub fn with_signature(self, beats_per_measure: i64) -> Self {
        Self::from_raw(i64::from(self.bpm), beats_per_measure)
    }

    pub fn adjust_bpm(self, delta: i64) -> Self {
        self.with_bpm(i64::from(self.bpm) + delta)
    }

    pub fn adjust_signature(self, delta: i64) -> Self {
        self.with_signature(i64::from(self.beats_per_measure) + delta)
    }

    /// Time a single beat occupies, `60 / bpm` seconds.
    pub fn beat_period(&self) -> Duration {
        Duration::from_secs_f64(60.0 / f64::from(self.bpm.max(1)))
    }

    pub fn beats_per_second(&self) -> f32 {
        self.bpm as f32 / 60.0
    }
}

fn clamp_field(value: i64, min: u32, max: u32) -> u32 {
    // Bounds fit in u32 so the narrowing cannot truncate.
    value.clamp(i64::from(min), i64::from(max)) as u32
}

/// Settings for the frame loop and the indicator animation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Frame-rate cap of the render loop.
    pub fps: u32,
    /// Time constant of the exponential scale/colour decay, in seconds.
    pub decay_seconds: f32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            fps: 120,
            decay_seconds: 0.25,
        }
    }
}

impl DisplayConfig {
    pub fn frame_budget(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.clamp(1, 1000)))
    }
}

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tempo: TempoConfig,
    /// Beats that start out accented, written as a list of 1-based indices.
    pub accents: AccentMap,
    pub display: DisplayConfig,
    /// Directory holding `low.wav` and `high.wav`.
    pub sound_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tempo: TempoConfig::default(),
            accents: AccentMap::default(),
            display: DisplayConfig::default(),
            sound_dir: PathBuf::from("snd"),
        }
    }
}

impl AppConfig {
    /// Reads a JSON configuration file. Tempo values are clamped after
    /// parsing, so a file may hold out of range numbers.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        Self::from_json(&text).map_err(|source| MetronomeError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(text: &str) -> std::result::Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(text)?;
        config.tempo = config.tempo.clamped();
        Ok(config)
    }
}
