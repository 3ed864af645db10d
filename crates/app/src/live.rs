use std::{
    io, thread,
    time::{Duration, Instant},
};

use crossterm::{
    event::{self, Event},
    terminal,
};
use metronome_core::{AppConfig, Clock, ClickOutput, Metronome, Result, SystemClock};

use crate::terminal::{map_key, Action, Screen, TerminalGuard};

/// What happened during a live session, logged once the terminal is back.
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionSummary {
    pub frames: u64,
    pub beats: u64,
    pub elapsed: Duration,
}

/// Runs the interactive metronome until the user quits.
///
/// One thread does everything: drain input, measure the frame delta, run the
/// metronome, draw, then sleep out the rest of the frame budget.
pub fn run(config: &AppConfig, mut output: impl ClickOutput) -> Result<SessionSummary> {
    let (cols, rows) = terminal::size()?;
    let mut screen = Screen::new(cols, rows);
    let mut metronome = Metronome::new(config, screen.resize(cols, rows));
    let budget = config.display.frame_budget();

    let guard = TerminalGuard::enter()?;
    let mut stdout = io::stdout();
    let mut clock = SystemClock::start();
    let mut summary = SessionSummary::default();
    let started = Instant::now();

    'frames: loop {
        let frame_start = Instant::now();

        while event::poll(Duration::ZERO)? {
            match event::read()? {
                Event::Key(key) => {
                    let Some(action) = map_key(key) else {
                        continue;
                    };
                    if action == Action::Quit {
                        break 'frames;
                    }
                    let beats = metronome.tempo().beats_per_measure;
                    if let Some(command) = screen.handle(action, beats) {
                        metronome.apply(command);
                    }
                }
                Event::Resize(cols, rows) => metronome.set_track(screen.resize(cols, rows)),
                _ => {}
            }
        }

        let delta = clock.restart();
        if metronome.frame(delta, &mut output).is_some() {
            summary.beats += 1;
        }
        screen.draw(&mut stdout, &metronome)?;
        summary.frames += 1;

        if let Some(rest) = budget.checked_sub(frame_start.elapsed()) {
            thread::sleep(rest);
        }
    }

    drop(guard);
    summary.elapsed = started.elapsed();
    Ok(summary)
}
