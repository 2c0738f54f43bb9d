use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use vine_monitor::cli::Args;
use vine_monitor::cookies::{cookie_jar, load_cookies};
use vine_monitor::extract::VineExtractor;
use vine_monitor::fetch::HttpFetcher;
use vine_monitor::opener::{ItemOpener, SystemBrowser};
use vine_monitor::{Config, Monitor, logging};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match Config::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("vine-monitor: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(config.log_file.as_deref()) {
        eprintln!("vine-monitor: could not set up logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(config, args.once).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config, once: bool) -> anyhow::Result<()> {
    info!("Vine Monitor starting up.");
    info!("Using browser: {}", config.session.browser);
    info!(
        "Check interval: {} minutes",
        config.monitor.wait_interval.as_secs() / 60
    );

    let session = &config.session;
    let cookies = load_cookies(
        session.browser,
        session.cookie_db.as_deref(),
        &session.cookie_domain,
    )
    .context("loading browser cookies")?;
    let fetcher = HttpFetcher::login(session, cookie_jar(&cookies)).await?;

    let extractor = VineExtractor::new(&config.extractor)?;
    let opener = ItemOpener::new(SystemBrowser, config.monitor.open_delay)?;
    let mut monitor = Monitor::new(config.monitor, fetcher, extractor, opener);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received shutdown signal");
            shutdown.cancel();
        }
    });

    monitor.run(&cancel, once.then_some(1)).await?;
    Ok(())
}
