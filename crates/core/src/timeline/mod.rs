use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::{AccentMap, TempoConfig};

/// Source of elapsed time for the frame loop.
pub trait Clock {
    /// Time since the last restart.
    fn elapsed(&self) -> Duration;

    /// Returns the time since the last restart and starts counting from zero.
    fn restart(&mut self) -> Duration;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::start()
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn restart(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.started);
        self.started = now;
        elapsed
    }
}

/// Clock that only moves when told to. Drives offline simulation and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualClock {
    since_restart: Duration,
    total: Duration,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, delta: Duration) {
        self.since_restart += delta;
        self.total += delta;
    }

    /// Time advanced since construction, unaffected by restarts.
    pub fn total(&self) -> Duration {
        self.total
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.since_restart
    }

    fn restart(&mut self) -> Duration {
        std::mem::take(&mut self.since_restart)
    }
}

/// Which of the two click samples a beat triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Click {
    Low,
    High,
}

impl Click {
    pub fn for_accent(accented: bool) -> Self {
        if accented {
            Self::High
        } else {
            Self::Low
        }
    }
}

/// Reported by [`BeatScheduler::tick`] when a beat boundary is crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatEvent {
    /// 1-based index of the beat that fired.
    pub beat: u32,
    pub accented: bool,
}

impl BeatEvent {
    pub fn click(&self) -> Click {
        Click::for_accent(self.accented)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for the accumulator to reach a full beat period.
    Idle,
    /// A full period has elapsed; cleared by the same `tick` that observes it.
    Fired,
}

/// Turns frame deltas into discrete beat events.
///
/// The scheduler restarts its accumulator from zero every time a beat fires:
/// overshoot past the period is dropped and at most one beat fires per
/// [`tick`](Self::tick), however long the frame was.
#[derive(Debug, Clone)]
pub struct BeatScheduler {
    tempo: TempoConfig,
    current_beat: u32,
    elapsed: Duration,
}

impl Default for BeatScheduler {
    fn default() -> Self {
        Self::new(TempoConfig::default())
    }
}

impl BeatScheduler {
    pub fn new(tempo: TempoConfig) -> Self {
        Self {
            tempo: tempo.clamped(),
            current_beat: 1,
            elapsed: Duration::ZERO,
        }
    }

    /// Applies the live tempo settings.
    ///
    /// A signature different from the previous call starts a new measure:
    /// the beat index goes back to 1 and the partially elapsed beat is
    /// thrown away. A BPM change alone keeps both.
    pub fn configure(&mut self, tempo: TempoConfig) {
        let tempo = tempo.clamped();
        if tempo.beats_per_measure != self.tempo.beats_per_measure {
            tracing::debug!(
                from = self.tempo.beats_per_measure,
                to = tempo.beats_per_measure,
                "signature changed, restarting measure"
            );
            self.current_beat = 1;
            self.elapsed = Duration::ZERO;
        }
        self.tempo = tempo;
    }

    /// Advances the accumulator by `delta` and fires at most one beat.
    pub fn tick(&mut self, delta: Duration, accents: &AccentMap) -> Option<BeatEvent> {
        self.elapsed = self.elapsed.saturating_add(delta);
        if self.state() == SchedulerState::Idle {
            return None;
        }

        self.elapsed = Duration::ZERO;
        let event = BeatEvent {
            beat: self.current_beat,
            accented: accents.is_accented(self.current_beat),
        };
        self.current_beat = if self.current_beat >= self.tempo.beats_per_measure {
            1
        } else {
            self.current_beat + 1
        };
        Some(event)
    }

    pub fn state(&self) -> SchedulerState {
        if self.elapsed >= self.beat_period() {
            SchedulerState::Fired
        } else {
            SchedulerState::Idle
        }
    }

    /// Beat that the next fire will report.
    pub fn current_beat(&self) -> u32 {
        self.current_beat
    }

    pub fn elapsed_since_last_beat(&self) -> Duration {
        self.elapsed
    }

    /// Period derived from the current BPM, not the one in force when the
    /// beat started.
    pub fn beat_period(&self) -> Duration {
        self.tempo.beat_period()
    }

    pub fn tempo(&self) -> TempoConfig {
        self.tempo
    }

    /// Fraction of the current beat that has elapsed, in `[0, 1]`.
    pub fn phase(&self) -> f32 {
        let period = self.beat_period().as_secs_f32();
        if period <= 0.0 {
            return 0.0;
        }
        (self.elapsed.as_secs_f32() / period).clamp(0.0, 1.0)
    }
}

/// A fired beat stamped with the clock time it fired at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledBeat {
    pub time_seconds: f64,
    pub beat: u32,
    pub accented: bool,
    pub click: Click,
}

impl ScheduledBeat {
    pub fn new(time: Duration, event: BeatEvent) -> Self {
        Self {
            time_seconds: time.as_secs_f64(),
            beat: event.beat,
            accented: event.accented,
            click: event.click(),
        }
    }
}
