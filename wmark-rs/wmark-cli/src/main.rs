use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use wmark_config::{Config, ConfigError, WatermarkSource, load, load_from};
use wmark_image::{Editor, FsCodec, RasterOps};

mod flow;
mod prompt;

use prompt::TerminalPrompt;

/// wmark CLI entry point.
///
/// Walks the user through picking an image, an optional quick edit and a
/// text or image watermark, then writes `<name>-with-watermark.<ext>` next to
/// the source.
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "wmark",
    author,
    version,
    about = "Add text or image watermarks to pictures, with optional quick edits.",
    long_about = None
)]
struct Cli {
    /// Directory holding source images, watermarks and generated files.
    #[arg(long, value_name = "DIR")]
    image_dir: Option<PathBuf>,
    /// File the watermark is applied to after an edit: `edited` or `original`.
    #[arg(long, value_name = "SOURCE")]
    watermark_source: Option<WatermarkSource>,
    /// Exit after one session instead of starting over.
    #[arg(long)]
    once: bool,
    /// Append a random token to output names so earlier results are kept.
    #[arg(long)]
    unique_names: bool,
    /// Read settings from this file instead of ~/.wmark/config.toml.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Log debug output to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Error: failed to load wmark configuration ({error}).");
            return ExitCode::FAILURE;
        }
    };

    let editor = Editor::new(FsCodec, RasterOps);
    let mut prompt = TerminalPrompt::new(io::stdin().lock(), io::stdout());

    match flow::run(&config, &editor, &mut prompt) {
        Ok(summary) => {
            debug!(
                sessions = summary.sessions,
                completed = summary.completed,
                "exiting"
            );
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

/// Load the configuration file and apply command-line overrides.
///
/// A home directory that cannot be resolved falls back to defaults; an
/// unreadable or malformed file is an error.
fn resolve_config(cli: &Cli) -> Result<Config, ConfigError> {
    let loaded = match cli.config.as_deref() {
        Some(path) => load_from(path),
        None => load(),
    };

    let mut config = match loaded {
        Ok(outcome) => {
            if outcome.found {
                info!(path = %outcome.path.display(), "loaded configuration");
            }
            outcome.config
        }
        Err(ConfigError::ConfigDirUnavailable) => {
            warn!("could not determine home directory, using default configuration");
            Config::default()
        }
        Err(error) => return Err(error),
    };

    if let Some(dir) = &cli.image_dir {
        config.image_dir = dir.to_string_lossy().into_owned();
    }
    if let Some(source) = cli.watermark_source {
        config.watermark_source = source;
    }
    if cli.once {
        config.restart = false;
    }
    if cli.unique_names {
        config.unique_output_names = true;
    }

    Ok(config)
}

#[cfg(test)]
mod tests;
