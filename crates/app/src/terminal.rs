use std::io::{self, Write};

use crossterm::{
    cursor,
    event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{self, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use metronome_core::{Command, Metronome, Track};

/// Columns kept free on each side of the track.
const MARGIN: u16 = 2;
/// Rows the indicator spans at scale 1.0.
const BAR_HEIGHT: f32 = 5.0;
/// Cells in the beat progress gauge.
const GAUGE_WIDTH: usize = 16;

/// Raw mode and the alternate screen for as long as the guard lives.
#[derive(Debug)]
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, cursor::Hide)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), ResetColor, cursor::Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// What a key press asks the frame loop to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Edit(Command),
    CursorNext,
    CursorPrev,
    ToggleAtCursor,
    Quit,
}

pub fn map_key(key: KeyEvent) -> Option<Action> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }

    let action = match key.code {
        KeyCode::Esc | KeyCode::Char('q') => Action::Quit,
        KeyCode::Up => Action::Edit(Command::IncreaseBpm),
        KeyCode::Down => Action::Edit(Command::DecreaseBpm),
        KeyCode::Right => Action::Edit(Command::IncreaseSignature),
        KeyCode::Left => Action::Edit(Command::DecreaseSignature),
        KeyCode::Char('r') => Action::Edit(Command::Reset),
        KeyCode::Char(digit @ '1'..='9') => {
            Action::Edit(Command::ToggleAccent(digit.to_digit(10)?))
        }
        KeyCode::Tab => Action::CursorNext,
        KeyCode::BackTab => Action::CursorPrev,
        KeyCode::Char(' ') => Action::ToggleAtCursor,
        _ => return None,
    };
    Some(action)
}

/// Track laid out across a terminal of `cols` x `rows`, in cell units.
pub fn track_for(cols: u16, rows: u16) -> Track {
    let right = cols.saturating_sub(MARGIN + 1).max(MARGIN + 1);
    Track::new(f32::from(MARGIN), f32::from(right), f32::from(rows / 2))
}

/// Terminal rendering surface plus the little UI state the core does not
/// own: the accent cursor and the screen size.
#[derive(Debug)]
pub struct Screen {
    cols: u16,
    rows: u16,
    cursor: u32,
}

impl Screen {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols,
            rows,
            cursor: 1,
        }
    }

    pub fn resize(&mut self, cols: u16, rows: u16) -> Track {
        self.cols = cols;
        self.rows = rows;
        track_for(cols, rows)
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Applies a cursor action against the current measure length. Returns
    /// the command to forward to the metronome, if any.
    pub fn handle(&mut self, action: Action, beats_per_measure: u32) -> Option<Command> {
        self.cursor = self.cursor.clamp(1, beats_per_measure);
        match action {
            Action::Edit(command) => return Some(command),
            Action::CursorNext => {
                self.cursor = if self.cursor >= beats_per_measure {
                    1
                } else {
                    self.cursor + 1
                };
            }
            Action::CursorPrev => {
                self.cursor = if self.cursor <= 1 {
                    beats_per_measure
                } else {
                    self.cursor - 1
                };
            }
            Action::ToggleAtCursor => return Some(Command::ToggleAccent(self.cursor)),
            Action::Quit => {}
        }
        None
    }

    pub fn draw(&mut self, out: &mut impl Write, metronome: &Metronome) -> io::Result<()> {
        let tempo = metronome.tempo();
        self.cursor = self.cursor.clamp(1, tempo.beats_per_measure);
        let track = *metronome.visual().track();
        let baseline = track.y.round() as u16;

        queue!(out, ResetColor, terminal::Clear(ClearType::All), cursor::MoveTo(0, 0))?;
        queue!(
            out,
            SetAttribute(Attribute::Bold),
            Print(format!(
                "{} BPM   {} beats per measure   next beat {}",
                tempo.bpm,
                tempo.beats_per_measure,
                metronome.current_beat()
            )),
            SetAttribute(Attribute::Reset),
            cursor::MoveTo(0, 1),
            Print(format!(
                "[{}]   accents {}",
                gauge(metronome.phase()),
                accent_list(metronome)
            )),
        )?;

        for marker in metronome.markers() {
            let col = marker.position.x.round() as u16;
            let glyph = if marker.accented { '▲' } else { '|' };
            let gray = if marker.current {
                255
            } else {
                marker.appearance.gray()
            };
            queue!(
                out,
                cursor::MoveTo(col, baseline.saturating_add(3)),
                SetForegroundColor(grey(gray)),
                Print(glyph),
            )?;

            let label_row = baseline.saturating_add(5);
            queue!(out, cursor::MoveTo(col, label_row))?;
            if marker.beat == self.cursor() {
                queue!(out, SetAttribute(Attribute::Reverse))?;
            }
            queue!(out, Print(marker.beat % 10), SetAttribute(Attribute::Reset))?;
        }

        let indicator = metronome.indicator();
        let col = indicator.position.x.round() as u16;
        let height = (indicator.appearance.scale * BAR_HEIGHT).round().max(1.0) as u16;
        let top = baseline.saturating_sub(height / 2);
        queue!(out, SetForegroundColor(grey(indicator.appearance.gray())))?;
        for row in top..top.saturating_add(height) {
            if row >= self.rows.saturating_sub(2) {
                break;
            }
            queue!(out, cursor::MoveTo(col, row), Print('█'))?;
        }

        queue!(
            out,
            ResetColor,
            cursor::MoveTo(0, self.rows.saturating_sub(1)),
            Print(
                "up/down bpm  left/right beats  1-9 accent  tab+space accent  r reset  q quit"
                    .chars()
                    .take(usize::from(self.cols))
                    .collect::<String>()
            ),
        )?;
        out.flush()
    }
}

/// Progress through the current beat as a row of filled cells.
fn gauge(phase: f32) -> String {
    let filled = (phase.clamp(0.0, 1.0) * GAUGE_WIDTH as f32).round() as usize;
    let mut bar = "#".repeat(filled);
    bar.push_str(&".".repeat(GAUGE_WIDTH - filled));
    bar
}

fn accent_list(metronome: &Metronome) -> String {
    let beats: Vec<String> = metronome
        .accents()
        .beats_within(metronome.tempo().beats_per_measure)
        .map(|beat| beat.to_string())
        .collect();
    if beats.is_empty() {
        "none".to_string()
    } else {
        beats.join(" ")
    }
}

fn grey(level: u8) -> Color {
    Color::Rgb {
        r: level,
        g: level,
        b: level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;
    use metronome_core::{AccentMap, AppConfig};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn arrows_edit_tempo_and_signature() {
        assert_eq!(map_key(press(KeyCode::Up)), Some(Action::Edit(Command::IncreaseBpm)));
        assert_eq!(map_key(press(KeyCode::Down)), Some(Action::Edit(Command::DecreaseBpm)));
        assert_eq!(
            map_key(press(KeyCode::Right)),
            Some(Action::Edit(Command::IncreaseSignature))
        );
        assert_eq!(
            map_key(press(KeyCode::Left)),
            Some(Action::Edit(Command::DecreaseSignature))
        );
        assert_eq!(map_key(press(KeyCode::Char('r'))), Some(Action::Edit(Command::Reset)));
    }

    #[test]
    fn digits_toggle_accents_and_escape_quits() {
        assert_eq!(
            map_key(press(KeyCode::Char('3'))),
            Some(Action::Edit(Command::ToggleAccent(3)))
        );
        assert_eq!(map_key(press(KeyCode::Char('0'))), None);
        assert_eq!(map_key(press(KeyCode::Esc)), Some(Action::Quit));
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        );
    }

    #[test]
    fn key_releases_are_ignored() {
        let release = KeyEvent {
            code: KeyCode::Up,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(map_key(release), None);
    }

    #[test]
    fn cursor_wraps_within_the_measure() {
        let mut screen = Screen::new(80, 24);
        assert_eq!(screen.handle(Action::CursorPrev, 4), None);
        assert_eq!(screen.cursor(), 4);
        screen.handle(Action::CursorNext, 4);
        assert_eq!(screen.cursor(), 1);
        assert_eq!(
            screen.handle(Action::ToggleAtCursor, 4),
            Some(Command::ToggleAccent(1))
        );

        screen.handle(Action::CursorPrev, 12);
        assert_eq!(screen.cursor(), 12);
        // Shrinking the measure pulls the cursor back in range.
        screen.handle(Action::CursorNext, 4);
        assert_eq!(screen.cursor(), 1);
    }

    #[test]
    fn gauge_fills_with_beat_progress() {
        assert_eq!(gauge(0.0), ".".repeat(GAUGE_WIDTH));
        assert_eq!(gauge(0.5), format!("{}{}", "#".repeat(8), ".".repeat(8)));
        assert_eq!(gauge(2.0), "#".repeat(GAUGE_WIDTH));
    }

    #[test]
    fn accent_list_hides_beats_past_the_measure() {
        let config = AppConfig {
            accents: AccentMap::from_beats([1, 3, 7]),
            ..AppConfig::default()
        };
        let mut metronome = Metronome::new(&config, track_for(80, 24));
        assert_eq!(accent_list(&metronome), "1 3");

        metronome.apply(Command::ToggleAccent(1));
        metronome.apply(Command::ToggleAccent(3));
        assert_eq!(accent_list(&metronome), "none");
    }

    #[test]
    fn track_spans_the_terminal_width() {
        let track = track_for(80, 24);
        assert_eq!(track.left, 2.0);
        assert_eq!(track.right, 77.0);
        assert_eq!(track.y, 12.0);

        let tiny = track_for(1, 1);
        assert!(tiny.right >= tiny.left);
    }

    #[test]
    fn draws_status_line_and_markers() {
        let metronome = Metronome::new(&AppConfig::default(), track_for(80, 24));
        let mut screen = Screen::new(80, 24);
        let mut out = Vec::new();
        screen.draw(&mut out, &metronome).unwrap();

        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("120 BPM"));
        assert!(text.contains("accents 1"));
        assert!(text.contains(&format!("[{}]", ".".repeat(GAUGE_WIDTH))));
        assert!(text.contains("4 beats per measure"));
        assert!(text.contains('▲'));
        assert!(text.contains('█'));
    }
}
