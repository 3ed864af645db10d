//! Core library for the metronome.
//!
//! Each module owns one piece of the timing pipeline: tempo configuration,
//! the accent set, beat scheduling, the visual interpolation that animates
//! the indicator between beats, and the click output seam. [`Metronome`] ties
//! them together into the state owned by a frame loop. Nothing here draws,
//! plays sound or reads the keyboard; the application crate does that.

pub mod accent;
pub mod audio;
pub mod config;
pub mod error;
pub mod metronome;
pub mod timeline;
pub mod visual;

pub use accent::AccentMap;
pub use audio::{ClickOutput, MutedOutput, SamplePaths};
pub use config::{AppConfig, DisplayConfig, TempoConfig};
pub use error::{MetronomeError, Result};
pub use metronome::{Command, Metronome};
pub use timeline::{
    BeatEvent, BeatScheduler, Click, Clock, ManualClock, ScheduledBeat, SchedulerState,
    SystemClock,
};
pub use visual::{Appearance, Marker, Point, Track, VisualInterpolator, VisualState};
