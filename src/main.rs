use std::fs;
use std::io;
use std::path::PathBuf;

use clap::Parser;
use cobra_interpreter::{Config, Mode, Outcome, Session, Terminal};
use miette::IntoDiagnostic;
use miette::WrapErr;
use tracing_subscriber::EnvFilter;

/// A tiny line-oriented scripting language.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Script to run. Without it an interactive session reads from stdin.
    filename: Option<PathBuf>,
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let mut session = Session::new(Terminal::new(io::stdout()), Config::default());

    match args.filename {
        None => session.repl(io::stdin().lock(), io::stderr())?,
        Some(filename) => {
            let file_contents = fs::read_to_string(&filename)
                .into_diagnostic()
                .wrap_err_with(|| format!("reading `{}` failed", filename.display()))?;

            let outcome = session.run_source(filename.to_str(), &file_contents, Mode::Script)?;
            if outcome == Outcome::Quit {
                tracing::debug!(file = %filename.display(), "script ended with quit");
            }
        }
    }
    Ok(())
}
