use anyhow::{Context, Result};
use chirp::app::Chirp;
use chirp::cli::{self, RuntimeOptions};
use chirp::config::Config;
use chirp::terminal::{SessionIo, signals};

fn main() {
    // Process CLI arguments first (before logging init for cleaner output)
    let options = match cli::process_cli() {
        cli::CliResult::Exit(code) => std::process::exit(code),
        cli::CliResult::Continue(options) => options,
    };
    // Route log::info!() etc. to the debug log file; the terminal belongs to the shell.
    chirp::debug::init_log_bridge(options.log_level, options.log_file.clone());

    log::info!("Starting chirp {}", chirp::VERSION);

    let code = match run(options) {
        Ok(code) => code,
        Err(e) => {
            log::error!("Fatal: {e:#}");
            eprintln!("chirp: error: {e:#}");
            1
        }
    };
    // Every component has been dropped by now, so exiting skips no cleanup.
    std::process::exit(code);
}

/// Load configuration, open audio, and run the wrapped shell. Returns the
/// shell's exit code.
fn run(options: RuntimeOptions) -> Result<i32> {
    let config = Config::load(options.config.as_deref()).context("Failed to load configuration")?;
    let device = chirp::audio::open_device(&config.settings, options.silent)
        .context("Failed to initialize audio")?;
    signals::install().context("Failed to install signal handlers")?;

    let shell = options
        .shell
        .unwrap_or_else(|| config.settings.resolve_shell());
    log::info!("Wrapping shell {}", shell);

    let app = Chirp::new(&config, device, shell)?;
    app.run(SessionIo::stdio())
}
