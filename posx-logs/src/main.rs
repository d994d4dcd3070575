use std::{io, path::PathBuf};

use anyhow::Result;
use clap::Parser;
use posx_logs::{write_report, ViewOptions, DEFAULT_TAIL_LINES};
use posx_shell_core::{runtime_paths, system_open, LOG_FILTER_ENV};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "posx-logs",
    version,
    about = "Show where the POSX desktop app writes its logs and print recent errors"
)]
struct Cli {
    /// Logs directory (defaults to the platform location)
    #[arg(long)]
    dir: Option<PathBuf>,
    /// Number of error.log lines to print
    #[arg(long, default_value_t = DEFAULT_TAIL_LINES)]
    lines: usize,
    /// Do not open the directory in the file browser
    #[arg(long)]
    no_open: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let Some(dir) = cli.dir.or_else(runtime_paths::default_log_dir) else {
        println!("Could not determine the home directory; pass --dir to locate the logs.");
        return Ok(());
    };
    let options = ViewOptions {
        dir,
        lines: cli.lines,
        open: !cli.no_open,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_report(&mut out, &options, |path| {
        tracing::debug!(path = %path.display(), "opening logs directory");
        system_open::open_in_file_browser(path)
    })?;
    Ok(())
}
