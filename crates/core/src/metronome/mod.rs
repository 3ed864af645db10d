use std::time::Duration;

use crate::{
    AccentMap, AppConfig, BeatEvent, BeatScheduler, Clock, ClickOutput, ManualClock, Marker,
    MutedOutput, ScheduledBeat, TempoConfig, Track, VisualInterpolator, VisualState,
};

/// Edits coming from the configuration surface (keyboard or widgets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    IncreaseBpm,
    DecreaseBpm,
    IncreaseSignature,
    DecreaseSignature,
    /// Raw BPM typed into a field; clamped before use.
    SetBpm(i64),
    /// Raw signature typed into a field; clamped before use.
    SetSignature(i64),
    ToggleAccent(u32),
    /// Restores default tempo, signature and accents together.
    Reset,
}

/// All metronome state owned by the frame loop.
#[derive(Debug, Clone)]
pub struct Metronome {
    tempo: TempoConfig,
    accents: AccentMap,
    scheduler: BeatScheduler,
    visual: VisualInterpolator,
}

impl Default for Metronome {
    fn default() -> Self {
        Self::new(&AppConfig::default(), Track::default())
    }
}

impl Metronome {
    pub fn new(config: &AppConfig, track: Track) -> Self {
        let tempo = config.tempo.clamped();
        Self {
            tempo,
            accents: config.accents,
            scheduler: BeatScheduler::new(tempo),
            visual: VisualInterpolator::new(track, config.display.decay_seconds),
        }
    }

    pub fn apply(&mut self, command: Command) {
        match command {
            Command::IncreaseBpm => self.tempo = self.tempo.adjust_bpm(1),
            Command::DecreaseBpm => self.tempo = self.tempo.adjust_bpm(-1),
            Command::IncreaseSignature => self.tempo = self.tempo.adjust_signature(1),
            Command::DecreaseSignature => self.tempo = self.tempo.adjust_signature(-1),
            Command::SetBpm(bpm) => self.tempo = self.tempo.with_bpm(bpm),
            Command::SetSignature(signature) => self.tempo = self.tempo.with_signature(signature),
            Command::ToggleAccent(beat) => {
                if let Some(accented) = self.accents.toggle(beat) {
                    tracing::debug!(beat, accented, "accent toggled");
                }
            }
            Command::Reset => self.reset(),
        }
    }

    /// Back to 120 BPM, four beats and only the downbeat accented.
    pub fn reset(&mut self) {
        tracing::debug!("restoring default tempo and accents");
        self.tempo = TempoConfig::default();
        self.accents = AccentMap::default();
    }

    /// Runs one frame of `delta` wall time.
    ///
    /// Settings edited since the last frame are pushed into the scheduler
    /// first, so a signature change restarts the measure before any beat can
    /// fire against the old bound; the indicator goes back to the first slot
    /// with it. A fired beat plays its click exactly once and leaves the
    /// indicator sitting on its slot.
    pub fn frame(&mut self, delta: Duration, output: &mut impl ClickOutput) -> Option<BeatEvent> {
        let restarted =
            self.scheduler.tempo().beats_per_measure != self.tempo.beats_per_measure;
        self.scheduler.configure(self.tempo);
        let fired = self.scheduler.tick(delta, &self.accents);

        self.visual.advance_frame(delta, &self.tempo);
        if restarted {
            self.visual.reset();
        }
        if let Some(event) = fired {
            tracing::trace!(beat = event.beat, accented = event.accented, "beat");
            output.play(event.click());
            self.visual
                .on_beat_fired(event.beat, self.tempo.beats_per_measure, event.accented);
        }
        fired
    }

    /// Runs frames of `frame_delta` against a manual clock until `duration`
    /// has elapsed and returns every beat that fired, stamped with its time.
    pub fn simulate(&mut self, frame_delta: Duration, duration: Duration) -> Vec<ScheduledBeat> {
        let mut beats = Vec::new();
        if frame_delta.is_zero() {
            return beats;
        }

        let mut clock = ManualClock::new();
        let mut output = MutedOutput::new();
        while clock.total() < duration {
            clock.advance(frame_delta);
            let delta = clock.restart();
            if let Some(event) = self.frame(delta, &mut output) {
                beats.push(ScheduledBeat::new(clock.total(), event));
            }
        }
        beats
    }

    pub fn tempo(&self) -> TempoConfig {
        self.tempo
    }

    pub fn accents(&self) -> &AccentMap {
        &self.accents
    }

    /// Beat that will fire next.
    pub fn current_beat(&self) -> u32 {
        self.scheduler.current_beat()
    }

    /// Progress through the current beat in `[0, 1]`.
    pub fn phase(&self) -> f32 {
        self.scheduler.phase()
    }

    pub fn indicator(&self) -> &VisualState {
        self.visual.state()
    }

    pub fn markers(&self) -> Vec<Marker> {
        self.visual.markers(self.tempo.beats_per_measure, &self.accents)
    }

    pub fn visual(&self) -> &VisualInterpolator {
        &self.visual
    }

    pub fn set_track(&mut self, track: Track) {
        self.visual.set_track(track);
    }
}
