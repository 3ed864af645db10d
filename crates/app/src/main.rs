use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Mutex,
    time::Duration,
};

use clap::{Args, Parser, Subcommand};
use metronome_core::{
    AccentMap, AppConfig, Click, Metronome, MetronomeError, MutedOutput, Result, SamplePaths,
    Track,
};
use tracing_subscriber::EnvFilter;

mod live;
mod sound;
mod terminal;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // The live screen owns the terminal, so its logs go to a file.
    let log_path = log_file(&cli.command).map(Path::to_path_buf);
    if let Err(err) = init_tracing(log_path.as_deref()) {
        eprintln!("error: cannot open log file: {err}");
        return ExitCode::from(1);
    }

    let result = match cli.command {
        Commands::Run { settings, sound_dir, fps, mute, .. } => {
            run_live(&settings, sound_dir, fps, mute)
        }
        Commands::Simulate { settings, seconds, fps } => run_simulate(&settings, seconds, fps),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "metronome stopped");
            if log_path.is_some() {
                eprintln!("error: {err}");
            }
            ExitCode::from(err.exit_code())
        }
    }
}

fn run_live(
    settings: &Settings,
    sound_dir: Option<PathBuf>,
    fps: Option<u32>,
    mute: bool,
) -> Result<()> {
    let mut config = settings.resolve()?;
    if let Some(dir) = sound_dir {
        config.sound_dir = dir;
    }
    if let Some(fps) = fps {
        config.display.fps = fps;
    }

    tracing::info!(
        bpm = config.tempo.bpm,
        beats = config.tempo.beats_per_measure,
        accents = ?config.accents,
        sound_dir = %config.sound_dir.display(),
        "starting live mode"
    );

    let samples = sound::ClickSamples::load(&SamplePaths::in_dir(&config.sound_dir))?;
    let summary = if mute {
        live::run(&config, MutedOutput::new())?
    } else {
        live::run(&config, sound::DeviceOutput::open(samples)?)?
    };

    tracing::info!(
        frames = summary.frames,
        beats = summary.beats,
        seconds = summary.elapsed.as_secs_f32(),
        "live mode finished"
    );
    Ok(())
}

fn run_simulate(settings: &Settings, seconds: f64, fps: u32) -> Result<()> {
    let config = settings.resolve()?;
    let frame = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));
    let duration = Duration::try_from_secs_f64(seconds.max(0.0))
        .map_err(|err| MetronomeError::msg(format!("invalid duration: {err}")))?;
    tracing::info!(?frame, ?duration, "running offline simulation");

    let mut metronome = Metronome::new(&config, Track::default());
    let beats = metronome.simulate(frame, duration);

    let mut stdout = io::stdout().lock();
    for beat in &beats {
        let line = serde_json::to_string(beat)
            .map_err(|err| MetronomeError::msg(format!("cannot encode beat: {err}")))?;
        writeln!(stdout, "{line}")?;
    }

    let high = beats.iter().filter(|b| b.click == Click::High).count();
    tracing::info!(beats = beats.len(), accented = high, "simulation finished");
    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Logs to stderr, or appends to `file` when one is given.
fn init_tracing(file: Option<&Path>) -> io::Result<()> {
    match file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let _ = tracing_subscriber::fmt()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_env_filter(env_filter())
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_writer(io::stderr)
                .with_env_filter(env_filter())
                .try_init();
        }
    }
    Ok(())
}

/// Where a subcommand sends its logs. `None` means stderr.
fn log_file(command: &Commands) -> Option<&Path> {
    match command {
        Commands::Run { log_file, .. } => Some(log_file.as_path()),
        Commands::Simulate { .. } => None,
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal metronome with accented beats", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the interactive metronome in the terminal.
    Run {
        #[command(flatten)]
        settings: Settings,
        /// Directory holding `low.wav` and `high.wav`.
        #[arg(long)]
        sound_dir: Option<PathBuf>,
        /// Frame-rate cap of the display loop.
        #[arg(long)]
        fps: Option<u32>,
        /// Validate the samples but do not open an audio device.
        #[arg(long)]
        mute: bool,
        /// Log file; the terminal is taken by the display while running.
        #[arg(long, default_value = "metronome.log")]
        log_file: PathBuf,
    },
    /// Drive the metronome with a simulated clock and print each beat as JSON.
    Simulate {
        #[command(flatten)]
        settings: Settings,
        /// Length of the simulated run.
        #[arg(long, default_value_t = 4.0)]
        seconds: f64,
        /// Simulated frame rate.
        #[arg(long, default_value_t = 120)]
        fps: u32,
    },
}

/// Tempo options shared by every subcommand. Out of range values are clamped.
#[derive(Args, Debug)]
struct Settings {
    /// JSON configuration file read before applying the flags below.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Beats per minute (30-300).
    #[arg(long, allow_negative_numbers = true)]
    bpm: Option<i64>,
    /// Beats per measure (2-32).
    #[arg(long, allow_negative_numbers = true)]
    signature: Option<i64>,
    /// Accented beat, 1-based. Repeat for several; replaces the configured set.
    #[arg(long = "accent")]
    accents: Vec<u32>,
}

impl Settings {
    fn resolve(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::default(),
        };
        if let Some(bpm) = self.bpm {
            config.tempo = config.tempo.with_bpm(bpm);
        }
        if let Some(signature) = self.signature {
            config.tempo = config.tempo.with_signature(signature);
        }
        if !self.accents.is_empty() {
            config.accents = AccentMap::from_beats(self.accents.iter().copied());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metronome_core::TempoConfig;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn flags_override_defaults_and_clamp() {
        let cli = parse(&["metronome", "simulate", "--bpm", "1000", "--signature", "-2"]);
        let Commands::Simulate { settings, .. } = cli.command else {
            panic!("expected simulate");
        };
        let config = settings.resolve().unwrap();
        assert_eq!(config.tempo, TempoConfig::new(300, 2));
        assert_eq!(config.accents, AccentMap::default());
    }

    #[test]
    fn repeated_accents_replace_the_default_set() {
        let cli = parse(&["metronome", "run", "--accent", "2", "--accent", "4", "--mute"]);
        let Commands::Run { settings, mute, .. } = cli.command else {
            panic!("expected run");
        };
        assert!(mute);
        let config = settings.resolve().unwrap();
        assert_eq!(config.accents, AccentMap::from_beats([2, 4]));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = parse(&["metronome", "simulate", "--config", "no/such/metronome.json"]);
        let Commands::Simulate { settings, .. } = cli.command else {
            panic!("expected simulate");
        };
        assert!(settings.resolve().is_err());
    }

    #[test]
    fn live_mode_logs_to_a_file_and_simulation_to_stderr() {
        let run = parse(&["metronome", "run"]);
        assert_eq!(log_file(&run.command), Some(Path::new("metronome.log")));

        let run = parse(&["metronome", "run", "--log-file", "/tmp/click.log"]);
        assert_eq!(log_file(&run.command), Some(Path::new("/tmp/click.log")));

        let simulate = parse(&["metronome", "simulate"]);
        assert_eq!(log_file(&simulate.command), None);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
