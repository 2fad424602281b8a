//! Command-line interface for chirp.
//!
//! Without a subcommand chirp wraps the shell; the subcommands are
//! configuration and tuning helpers that exit immediately.

use crate::audio::{self, AudioFormat, PlayOutcome, PlaybackGate};
use anyhow::{Context, Result, anyhow};
use chirp_config::Config;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// chirp - audible feedback for your shell
#[derive(Parser, Debug)]
#[command(name = "chirp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file (default: ~/.config/chirp/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Shell to run (overrides config and $SHELL)
    #[arg(long, value_name = "PATH")]
    pub shell: Option<String>,

    /// Play nothing; log what would have played
    #[arg(long, global = true)]
    pub silent: bool,

    /// Shorthand for --log-level debug
    #[arg(long, global = true)]
    pub debug: bool,

    /// Set debug log level (overrides --debug and CHIRP_LOG)
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log file (default: /tmp/chirp_debug.log)
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

/// Log level argument for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevelArg {
    /// Convert to `log::LevelFilter`
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevelArg::Off => log::LevelFilter::Off,
            LogLevelArg::Error => log::LevelFilter::Error,
            LogLevelArg::Warn => log::LevelFilter::Warn,
            LogLevelArg::Info => log::LevelFilter::Info,
            LogLevelArg::Debug => log::LevelFilter::Debug,
            LogLevelArg::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Print the built-in default configuration as TOML
    PrintConfig,

    /// Load and validate the configuration, then print a summary
    CheckConfig,

    /// Play a configured sample (for tuning tones)
    Play {
        /// Sample name from the [samples] table
        sample: String,

        /// Number of times to play it
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
}

/// Runtime options passed from CLI to the application
#[derive(Clone, Debug)]
pub struct RuntimeOptions {
    /// Explicit configuration file
    pub config: Option<PathBuf>,
    /// Shell override
    pub shell: Option<String>,
    /// Use the simulated audio device
    pub silent: bool,
    /// Effective log level
    pub log_level: log::LevelFilter,
    /// Log file override
    pub log_file: Option<PathBuf>,
}

impl RuntimeOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            config: cli.config.clone(),
            shell: cli.shell.clone(),
            silent: cli.silent,
            log_level: crate::debug::resolve_level(
                cli.log_level.map(LogLevelArg::to_level_filter),
                cli.debug,
            ),
            log_file: cli.log_file.clone(),
        }
    }
}

/// Result of CLI processing
pub enum CliResult {
    /// Continue with normal startup
    Continue(RuntimeOptions),
    /// Exit with the given code (subcommand completed)
    Exit(i32),
}

/// Process CLI arguments and handle subcommands
pub fn process_cli() -> CliResult {
    process(Cli::parse())
}

pub fn process(cli: Cli) -> CliResult {
    let options = RuntimeOptions::from_cli(&cli);

    let result = match cli.command {
        None => return CliResult::Continue(options),
        Some(Commands::PrintConfig) => print_config(),
        Some(Commands::CheckConfig) => check_config(options.config.as_deref()),
        Some(Commands::Play { sample, count }) => {
            crate::debug::init_log_bridge(options.log_level, options.log_file.clone());
            play_sample(&options, &sample, count)
        }
    };

    match result {
        Ok(()) => CliResult::Exit(0),
        Err(e) => {
            eprintln!("chirp: error: {e:#}");
            CliResult::Exit(1)
        }
    }
}

fn print_config() -> Result<()> {
    let toml = Config::default()
        .to_toml()
        .context("Failed to serialize default configuration")?;
    print!("{toml}");
    Ok(())
}

fn check_config(path: Option<&Path>) -> Result<()> {
    let config = Config::load(path).context("Invalid configuration")?;
    let source = match path {
        Some(p) => p.display().to_string(),
        None => match Config::config_path() {
            Some(p) if p.exists() => p.display().to_string(),
            _ => "built-in defaults".to_string(),
        },
    };

    println!("Configuration OK ({source})");
    println!("Shell: {}", config.settings.resolve_shell());
    println!(
        "Audio: {} Hz x{}, min gap {} ms, echo timeout {} ms",
        config.settings.sample_rate,
        config.settings.channels,
        config.settings.min_gap_ms,
        config.settings.echo_timeout_ms
    );
    println!("Samples:");
    for sample in config.samples.values() {
        println!(
            "  {:<12} {:>7.1} Hz  {:>4} ms  volume {:.2}",
            sample.name, sample.frequency, sample.duration, sample.volume
        );
    }
    println!("Triggers:");
    for trigger in config.triggers.values() {
        println!(
            "  {:<12} {:?} -> {} (max {}, {:?}){}",
            trigger.name,
            trigger.patterns,
            trigger.sample,
            trigger.max_length,
            trigger.source,
            if trigger.enabled { "" } else { " [disabled]" }
        );
    }
    Ok(())
}

fn play_sample(options: &RuntimeOptions, name: &str, count: u32) -> Result<()> {
    let config = Config::load(options.config.as_deref()).context("Invalid configuration")?;
    let sample = config
        .samples
        .get(name)
        .ok_or_else(|| anyhow!("No sample named '{name}'"))?;
    let device = audio::open_device(&config.settings, options.silent)?;
    let settings = &config.settings;
    let gate = PlaybackGate::new(
        device,
        AudioFormat::from_settings(settings),
        settings.min_gap(),
        settings.envelope,
    );

    for _ in 0..count {
        match gate.request_play(sample) {
            PlayOutcome::Played => println!(
                "Played '{}' ({:.1} Hz, {} ms, volume {:.2})",
                sample.name, sample.frequency, sample.duration, sample.volume
            ),
            PlayOutcome::Suppressed => println!("Suppressed by the minimum gap"),
            PlayOutcome::Empty => println!("'{}' is silent", sample.name),
            PlayOutcome::Failed => return Err(anyhow!("Playback failed, see the log")),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_runs_shell() {
        let cli = Cli::try_parse_from(["chirp", "--shell", "/bin/zsh", "--silent"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.shell.as_deref(), Some("/bin/zsh"));
        assert!(cli.silent);
    }

    #[test]
    fn test_play_subcommand() {
        let cli = Cli::try_parse_from(["chirp", "play", "local", "--count", "3"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Play {
                sample: "local".to_string(),
                count: 3
            })
        );
    }

    #[test]
    fn test_log_level_flag_beats_debug() {
        let cli =
            Cli::try_parse_from(["chirp", "--debug", "--log-level", "trace"]).unwrap();
        let options = RuntimeOptions::from_cli(&cli);
        assert_eq!(options.log_level, log::LevelFilter::Trace);
    }

    #[test]
    fn test_print_config_exits_cleanly() {
        let cli = Cli::try_parse_from(["chirp", "print-config"]).unwrap();
        assert!(matches!(process(cli), CliResult::Exit(0)));
    }

    #[test]
    fn test_check_config_with_missing_file_fails() {
        let cli = Cli::try_parse_from([
            "chirp",
            "check-config",
            "--config",
            "/nonexistent/chirp/config.toml",
        ])
        .unwrap();
        assert!(matches!(process(cli), CliResult::Exit(1)));
    }
}
