use std::path::{Path, PathBuf};

use crate::{Click, MetronomeError, Result};

/// File name of the unaccented click inside the sound directory.
pub const LOW_SAMPLE: &str = "low.wav";
/// File name of the accented click inside the sound directory.
pub const HIGH_SAMPLE: &str = "high.wav";

/// Locations of the two click samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplePaths {
    pub low: PathBuf,
    pub high: PathBuf,
}

impl SamplePaths {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            low: dir.join(LOW_SAMPLE),
            high: dir.join(HIGH_SAMPLE),
        }
    }

    pub fn path(&self, click: Click) -> &Path {
        match click {
            Click::Low => &self.low,
            Click::High => &self.high,
        }
    }

    /// Checks that both samples exist as regular files.
    pub fn ensure_present(&self) -> Result<()> {
        for click in [Click::Low, Click::High] {
            let path = self.path(click);
            if !path.is_file() {
                return Err(MetronomeError::SampleLoad {
                    path: path.to_path_buf(),
                    reason: "file not found".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Plays the click for a fired beat.
///
/// Implementations must not fail the frame: a click that cannot be played is
/// dropped (and logged) by the implementation itself.
pub trait ClickOutput {
    fn play(&mut self, click: Click);
}

/// Output that only counts clicks. Used for `--mute` and offline simulation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MutedOutput {
    low: u64,
    high: u64,
}

impl MutedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self, click: Click) -> u64 {
        match click {
            Click::Low => self.low,
            Click::High => self.high,
        }
    }
}

impl ClickOutput for MutedOutput {
    fn play(&mut self, click: Click) {
        match click {
            Click::Low => self.low += 1,
            Click::High => self.high += 1,
        }
    }
}

impl<T: ClickOutput + ?Sized> ClickOutput for &mut T {
    fn play(&mut self, click: Click) {
        (**self).play(click);
    }
}
