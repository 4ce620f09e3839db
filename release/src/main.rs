//! Beacon Code release CLI entrypoint.
//!
//! `beacon-release install` downloads a CI run's native binaries into the
//! vendor tree; `beacon-release package` packs one npm tarball per platform
//! from that tree.

use beacon_release::archive::StandardExtractor;
use beacon_release::cli::{Cli, Command};
use beacon_release::config::ReleaseConfig;
use beacon_release::error::{ReleaseError, Result};
use beacon_release::exec::SystemCommandExecutor;
use beacon_release::fetch::GhCliFetcher;
use beacon_release::matrix::Registry;
use beacon_release::orchestrator::{InstallDeps, run_install, run_package};
use beacon_release::output::{Progress, RunSummary, write_stderr_line};
use camino::Utf8PathBuf;
use clap::Parser;
use log::LevelFilter;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    init_logging(log_level(cli.verbosity, cli.quiet));
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// `RUST_LOG` still takes precedence over the flag-derived level.
fn init_logging(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn log_level(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<RunSummary> {
    let config = ReleaseConfig::load(cli.config.as_deref())?;
    let registry = Registry::standard()?;
    let cwd = current_dir()?;
    let mut progress = Progress::new(stderr, cli.quiet);

    match &cli.command {
        Command::Install(args) => {
            let request = args.to_request(&cwd)?;
            let executor = SystemCommandExecutor;
            let fetcher = GhCliFetcher::new(&executor, config.github_repo.clone());
            let deps = InstallDeps {
                fetcher: &fetcher,
                extractor: &StandardExtractor,
            };
            run_install(&registry, &request, &deps, &mut progress)
        }
        Command::Package(args) => run_package(
            &registry,
            &config,
            &args.to_request(&cwd),
            &SystemCommandExecutor,
            &mut progress,
        ),
    }
}

fn current_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir()?;
    Utf8PathBuf::try_from(cwd).map_err(|err| ReleaseError::Configuration {
        reason: format!("current directory is not valid UTF-8: {err}"),
    })
}

fn exit_code_for_run_result(result: Result<RunSummary>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(summary) => {
            log::info!("run finished: {summary}");
            0
        }
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}
