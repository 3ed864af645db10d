use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{config::MIN_SIGNATURE, AccentMap, TempoConfig};

/// Share of a slot step the indicator drifts over one beat.
const DRIFT_FRACTION: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Horizontal track the indicator travels along, from the first beat slot at
/// `left` to the last one at `right`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub left: f32,
    pub right: f32,
    pub y: f32,
}

impl Default for Track {
    /// A 640x480 surface with a 20 unit border.
    fn default() -> Self {
        Self::new(20.0, 620.0, 240.0)
    }
}

impl Track {
    pub fn new(left: f32, right: f32, y: f32) -> Self {
        Self {
            left: left.min(right),
            right: right.max(left),
            y,
        }
    }

    pub fn length(&self) -> f32 {
        self.right - self.left
    }

    /// Distance between neighbouring beat slots.
    pub fn step(&self, beats_per_measure: u32) -> f32 {
        debug_assert!(
            beats_per_measure >= MIN_SIGNATURE,
            "signature must be clamped before layout"
        );
        self.length() / beats_per_measure.saturating_sub(1).max(1) as f32
    }

    /// X coordinate of the 1-based `beat` slot. The last slot sits exactly on
    /// the right margin.
    pub fn slot(&self, beat: u32, beats_per_measure: u32) -> f32 {
        if beat >= beats_per_measure {
            return self.right;
        }
        let x = self.left + self.step(beats_per_measure) * beat.saturating_sub(1) as f32;
        self.clamp(x)
    }

    pub fn clamp(&self, x: f32) -> f32 {
        x.clamp(self.left, self.right)
    }

    /// Position of `x` along the track in `[0, 1]`.
    pub fn fraction(&self, x: f32) -> f32 {
        let length = self.length();
        if length <= 0.0 {
            return 0.0;
        }
        ((x - self.left) / length).clamp(0.0, 1.0)
    }
}

/// Scale and colour intensity of a drawn shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    pub scale: f32,
    /// Brightness in `[0, 1]`.
    pub intensity: f32,
}

impl Appearance {
    pub const ACCENT_STRIKE: Self = Self::new(1.5, 220.0 / 255.0);
    pub const NORMAL_STRIKE: Self = Self::new(1.0, 120.0 / 255.0);
    pub const RESTING: Self = Self::new(0.6, 60.0 / 255.0);

    pub const ACCENT_MARKER: Self = Self::new(1.4, 0.9);
    pub const NORMAL_MARKER: Self = Self::new(1.0, 0.45);

    pub const fn new(scale: f32, intensity: f32) -> Self {
        Self { scale, intensity }
    }

    pub fn struck(accented: bool) -> Self {
        if accented {
            Self::ACCENT_STRIKE
        } else {
            Self::NORMAL_STRIKE
        }
    }

    /// 8-bit grey level for renderers that want a colour channel.
    pub fn gray(&self) -> u8 {
        (self.intensity.clamp(0.0, 1.0) * 255.0).round() as u8
    }

    fn decay_towards(&mut self, rest: Self, factor: f32) {
        self.scale = rest.scale + (self.scale - rest.scale) * factor;
        self.intensity = rest.intensity + (self.intensity - rest.intensity) * factor;
    }
}

/// What the renderer draws for the moving indicator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualState {
    pub position: Point,
    pub appearance: Appearance,
}

/// One beat slot on the track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub beat: u32,
    pub position: Point,
    pub appearance: Appearance,
    pub accented: bool,
    /// Whether this is the beat that fired last.
    pub current: bool,
}

/// Continuous indicator animation between discrete beats.
#[derive(Debug, Clone)]
pub struct VisualInterpolator {
    track: Track,
    state: VisualState,
    decay_seconds: f32,
    last_beat: Option<u32>,
}

impl Default for VisualInterpolator {
    fn default() -> Self {
        Self::new(Track::default(), 0.25)
    }
}

impl VisualInterpolator {
    pub fn new(track: Track, decay_seconds: f32) -> Self {
        Self {
            track,
            state: VisualState {
                position: Point::new(track.left, track.y),
                appearance: Appearance::RESTING,
            },
            decay_seconds: decay_seconds.max(0.0),
            last_beat: None,
        }
    }

    /// Snaps the indicator onto the slot of `beat` and restarts the strike
    /// animation. The snap discards whatever drift accumulated since the
    /// previous beat.
    pub fn on_beat_fired(&mut self, beat: u32, beats_per_measure: u32, accented: bool) {
        self.state.position = Point::new(self.track.slot(beat, beats_per_measure), self.track.y);
        self.state.appearance = Appearance::struck(accented);
        self.last_beat = Some(beat);
    }

    /// Advances the animation by `delta`.
    ///
    /// Scale and colour relax exponentially towards [`Appearance::RESTING`]
    /// with time constant `decay_seconds`, so the result depends only on the
    /// total time elapsed and not on how it was split into frames. The
    /// indicator drifts right at a speed proportional to the tempo and to the
    /// slot spacing, and stops at the last slot.
    pub fn advance_frame(&mut self, delta: Duration, tempo: &TempoConfig) {
        let dt = delta.as_secs_f32();
        if dt <= 0.0 {
            return;
        }

        let factor = if self.decay_seconds > 0.0 {
            (-dt / self.decay_seconds).exp()
        } else {
            0.0
        };
        self.state.appearance.decay_towards(Appearance::RESTING, factor);

        let speed =
            DRIFT_FRACTION * self.track.step(tempo.beats_per_measure) * tempo.beats_per_second();
        let x = self.state.position.x + speed * dt;
        self.state.position.x = if x > self.track.right {
            self.track.slot(tempo.beats_per_measure, tempo.beats_per_measure)
        } else {
            self.track.clamp(x)
        };
    }

    /// Moves to a new track (e.g. after a resize), keeping the indicator at
    /// the same relative position.
    pub fn set_track(&mut self, track: Track) {
        let fraction = self.track.fraction(self.state.position.x);
        self.track = track;
        self.state.position = Point::new(track.clamp(track.left + track.length() * fraction), track.y);
    }

    /// Puts the indicator back on the first slot at rest. Called when a new
    /// measure starts without a beat firing.
    pub fn reset(&mut self) {
        *self = Self::new(self.track, self.decay_seconds);
    }

    pub fn state(&self) -> &VisualState {
        &self.state
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Beat slot markers for the current measure, accented ones emphasised.
    pub fn markers(&self, beats_per_measure: u32, accents: &AccentMap) -> Vec<Marker> {
        (1..=beats_per_measure)
            .map(|beat| {
                let accented = accents.is_accented(beat);
                Marker {
                    beat,
                    position: Point::new(self.track.slot(beat, beats_per_measure), self.track.y),
                    appearance: if accented {
                        Appearance::ACCENT_MARKER
                    } else {
                        Appearance::NORMAL_MARKER
                    },
                    accented,
                    current: self.last_beat == Some(beat),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MAX_BPM, MAX_SIGNATURE, MIN_BPM};

    fn frame() -> Duration {
        Duration::from_secs_f64(1.0 / 120.0)
    }

    #[test]
    fn beat_snaps_to_exact_slot() {
        let track = Track::default();
        let (left, right) = (track.left, track.right);
        let mut visual = VisualInterpolator::new(track, 0.25);

        for n in MIN_SIGNATURE..=MAX_SIGNATURE {
            for k in 1..=n {
                visual.advance_frame(frame() * 7, &TempoConfig::new(180, n));
                visual.on_beat_fired(k, n, false);
                let expected = if k == n {
                    right
                } else {
                    left + (right - left) / (n - 1) as f32 * (k - 1) as f32
                };
                assert_eq!(visual.state().position.x, expected, "beat {k} of {n}");
                assert_eq!(visual.state().position.y, track.y);
            }
        }
    }

    #[test]
    fn position_never_leaves_the_track() {
        let track = Track::default();
        for bpm in [MIN_BPM, 120, MAX_BPM] {
            for n in [MIN_SIGNATURE, 4, MAX_SIGNATURE] {
                let tempo = TempoConfig::new(bpm, n);
                let mut visual = VisualInterpolator::new(track, 0.25);
                visual.on_beat_fired(n, n, false);
                for i in 0..2_000 {
                    let delta = if i % 50 == 0 { Duration::from_secs(3) } else { frame() };
                    visual.advance_frame(delta, &tempo);
                    let x = visual.state().position.x;
                    assert!(x >= track.left && x <= track.right, "x = {x}");
                }
                assert_eq!(visual.state().position.x, track.right);
            }
        }
    }

    #[test]
    fn indicator_drifts_towards_the_next_slot() {
        let tempo = TempoConfig::new(120, 4);
        let mut visual = VisualInterpolator::default();
        visual.on_beat_fired(1, 4, true);
        let start = visual.state().position.x;
        visual.advance_frame(frame(), &tempo);
        let after = visual.state().position.x;
        assert!(after > start);
        assert!(after < visual.track().slot(2, 4));
    }

    #[test]
    fn faster_tempo_and_shorter_measure_drift_faster() {
        let run = |tempo: TempoConfig| {
            let mut visual = VisualInterpolator::default();
            visual.on_beat_fired(1, tempo.beats_per_measure, false);
            visual.advance_frame(Duration::from_millis(100), &tempo);
            visual.state().position.x - visual.track().left
        };
        assert!(run(TempoConfig::new(200, 4)) > run(TempoConfig::new(100, 4)));
        assert!(run(TempoConfig::new(120, 3)) > run(TempoConfig::new(120, 8)));
    }

    #[test]
    fn accented_strike_is_larger_and_brighter() {
        let mut visual = VisualInterpolator::default();
        visual.on_beat_fired(1, 4, true);
        let accent = visual.state().appearance;
        visual.on_beat_fired(2, 4, false);
        let normal = visual.state().appearance;

        assert_eq!(accent, Appearance::ACCENT_STRIKE);
        assert_eq!(normal, Appearance::NORMAL_STRIKE);
        assert!(accent.scale > normal.scale);
        assert!(accent.gray() > normal.gray());
    }

    #[test]
    fn strike_decays_towards_rest_without_overshoot() {
        let tempo = TempoConfig::new(60, 4);
        let mut visual = VisualInterpolator::default();
        visual.on_beat_fired(1, 4, true);

        let mut previous = visual.state().appearance;
        for _ in 0..600 {
            visual.advance_frame(frame(), &tempo);
            let current = visual.state().appearance;
            assert!(current.scale <= previous.scale);
            assert!(current.scale >= Appearance::RESTING.scale);
            assert!(current.intensity >= Appearance::RESTING.intensity);
            previous = current;
        }
        assert!((previous.scale - Appearance::RESTING.scale).abs() < 1e-3);
    }

    #[test]
    fn decay_is_frame_rate_independent() {
        let tempo = TempoConfig::new(60, 4);
        let run = |fps: u32| {
            let mut visual = VisualInterpolator::default();
            visual.on_beat_fired(1, 4, true);
            let delta = Duration::from_secs_f64(1.0 / f64::from(fps));
            for _ in 0..(fps / 4) {
                visual.advance_frame(delta, &tempo);
            }
            *visual.state()
        };
        let slow = run(40);
        let fast = run(240);
        assert!((slow.appearance.scale - fast.appearance.scale).abs() < 1e-3);
        assert!((slow.appearance.intensity - fast.appearance.intensity).abs() < 1e-3);
        assert!((slow.position.x - fast.position.x).abs() < 1e-2);
    }

    #[test]
    fn zero_delta_changes_nothing() {
        let mut visual = VisualInterpolator::default();
        visual.on_beat_fired(2, 4, false);
        let before = *visual.state();
        visual.advance_frame(Duration::ZERO, &TempoConfig::default());
        assert_eq!(*visual.state(), before);
    }

    #[test]
    fn markers_flag_accents_and_the_current_beat() {
        let mut visual = VisualInterpolator::default();
        let accents = AccentMap::from_beats([1, 3, 9]);
        visual.on_beat_fired(3, 4, true);

        let markers = visual.markers(4, &accents);
        assert_eq!(markers.len(), 4);
        assert_eq!(markers[0].position.x, visual.track().left);
        assert_eq!(markers[3].position.x, visual.track().right);
        assert!(markers[0].accented && markers[2].accented);
        assert!(!markers[1].accented && !markers[3].accented);
        assert_eq!(markers[2].appearance, Appearance::ACCENT_MARKER);
        assert!(markers[2].current);
        assert_eq!(markers.iter().filter(|m| m.current).count(), 1);
    }

    #[test]
    fn reset_returns_to_the_first_slot_at_rest() {
        let mut visual = VisualInterpolator::default();
        visual.on_beat_fired(3, 4, true);
        visual.advance_frame(frame(), &TempoConfig::new(120, 4));

        visual.reset();
        assert_eq!(visual.state().position.x, visual.track().left);
        assert_eq!(visual.state().appearance, Appearance::RESTING);
        assert!(visual
            .markers(4, &AccentMap::default())
            .iter()
            .all(|m| !m.current));
    }

    #[test]
    fn resizing_keeps_relative_position() {
        let mut visual = VisualInterpolator::new(Track::new(0.0, 100.0, 5.0), 0.25);
        visual.on_beat_fired(2, 3, false);
        visual.set_track(Track::new(10.0, 210.0, 7.0));
        assert_eq!(visual.state().position, Point::new(110.0, 7.0));
    }
}
