mod catalog;
mod config;
mod install;
mod matching;
mod predict;
mod repl;
mod store;
mod tracker;

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser};
use log::LevelFilter;

use crate::catalog::HttpCatalogSource;
use crate::config::Config;
use crate::predict::{Ephemeris, Sgp4Ephemeris};
use crate::repl::{Console, Repl, ReplError};
use crate::store::DataDir;
use crate::tracker::{ConsoleNotifier, DesktopNotifier, Notify, TrackingSession};

const APP_NAME: &str = "satTracker";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "sat-tracker")]
#[command(about = "Track a satellite from your ground station")]
#[command(after_help = repl::USAGE)]
struct Cli {
    /// Directory holding the catalog, ground station and tracked object
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// YAML config file [default: <data-dir>/config.yaml]
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print pass notifications to the console only
    #[arg(long)]
    no_notify: bool,
    /// More log output, repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let store = DataDir::new(cli.data_dir.unwrap_or_else(DataDir::default_location));
    let config_path = cli.config.unwrap_or_else(|| store.config_path());
    let config = match Config::load_or_default(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading {}: {}", config_path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    match run(&store, &config, cli.no_notify) {
        Ok(()) => {
            terminating();
            ExitCode::SUCCESS
        }
        // Already explained to the operator.
        Err(ReplError::Declined) => ExitCode::FAILURE,
        Err(e) => {
            report(&e);
            terminating();
            ExitCode::FAILURE
        }
    }
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(store: &DataDir, config: &Config, no_notify: bool) -> Result<(), ReplError> {
    let source = HttpCatalogSource::new(config.catalog_url.clone())?;
    let mut console = Console::new(io::stdin().lock(), io::stdout());

    let (ground, object) = install::bootstrap(&mut console, store, &source, config)?;
    let session = TrackingSession::new(ground, object);

    let engine: Arc<dyn Ephemeris> = match chrono::Duration::from_std(config.pass_search_window) {
        Ok(window) => Arc::new(Sgp4Ephemeris::new(window)),
        Err(_) => {
            log::warn!("pass_search_window out of range, using the default");
            Arc::new(Sgp4Ephemeris::default())
        }
    };
    let notifier: Arc<dyn Notify> = if no_notify || !config.notifications {
        Arc::new(ConsoleNotifier)
    } else {
        Arc::new(DesktopNotifier::new(APP_NAME))
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    let (worker, refresh) =
        session.spawn_refresh(runtime.handle(), engine, notifier, config.refresh_interval);

    // The refresh loop has no restart path; losing it ends the process.
    runtime.spawn(async move {
        match refresh.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => fatal(e),
            Err(e) => fatal(e),
        }
    });

    runtime.spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            terminating();
            std::process::exit(0);
        }
    });

    log::info!("Session started");
    let result = Repl::new(session, store, &source, console).run();

    worker.stop();
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    log::info!("Session stopped");
    result
}

fn report<E: fmt::Debug + fmt::Display>(err: &E) {
    eprintln!("{err:?}");
    eprintln!("{err}");
}

fn fatal<E: fmt::Debug + fmt::Display>(err: E) -> ! {
    log::error!("Refresh loop failed: {}", err);
    report(&err);
    terminating();
    std::process::exit(1)
}

fn terminating() {
    println!("\nProgram is terminating.");
}
