//! Binary entrypoint: hosts the portfolio page slideshows headlessly.
//!
//! Project cards autoplay on the tokio clock, the hero portrait takes
//! interactions from stdin, and every repaint is logged.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use portfolio_slideshow::clock::{Timer, TokioTimer};
use portfolio_slideshow::config::Configuration;
use portfolio_slideshow::events::HostCommand;
use portfolio_slideshow::page::{self, Page};
use portfolio_slideshow::preload::{PreloadCache, Preloader};
use portfolio_slideshow::tasks::{input, loader::FetchPreloader, view};
use tokio::io::BufReader;
use tokio::select;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, LocalSet};
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(
    name = "portfolio-slideshow",
    version,
    about = "Crossfade slideshows for a portfolio page"
)]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
    /// Stop after this long (e.g. "30s"); default runs until Ctrl-C, or end of input on a terminal
    #[arg(long = "run-for", value_name = "DURATION", value_parser = humantime::parse_duration)]
    run_for: Option<Duration>,
    /// Print every project-card transition up to this horizon without running live
    #[arg(long = "dry-run", value_name = "DURATION", value_parser = humantime::parse_duration)]
    dry_run: Option<Duration>,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(
            format!("portfolio_slideshow={level}")
                .parse()
                .context("invalid log directive")?,
        );
    fmt().with_env_filter(filter).with_target(false).compact().init();
    Ok(())
}

fn main() -> Result<()> {
    let Args {
        config,
        run_for,
        dry_run,
        verbose,
    } = Args::parse();
    init_tracing(verbose)?;

    let cfg = Configuration::from_yaml_file(&config)
        .with_context(|| format!("failed to load configuration from {}", config.display()))?
        .validated()
        .context("invalid configuration values")?;
    tracing::debug!("Loaded configuration from {}:\n{:#?}", config.display(), cfg);

    if let Some(horizon) = dry_run {
        print_timeline(&cfg, horizon);
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    let local = LocalSet::new();
    let result = runtime.block_on(local.run_until(run_live(cfg, run_for)));
    // A pending stdin read parks a blocking thread until the next line arrives.
    runtime.shutdown_timeout(Duration::from_millis(250));
    result
}

fn print_timeline(cfg: &Configuration, horizon: Duration) {
    for entry in page::simulate(cfg, horizon) {
        let (base, overlay, opacity) = match &entry.layers {
            Some(layers) => (
                layers.base.to_string(),
                layers.overlay.to_string(),
                layers.overlay_opacity,
            ),
            None => (String::from("-"), String::from("-"), 0.0),
        };
        println!(
            "{:>8}  {:<24} current={} next={} fading={:<5} base={} overlay={} opacity={}",
            humantime::format_duration(entry.at).to_string(),
            entry.slideshow,
            entry.state.current_index,
            entry.state.next_index,
            entry.state.is_fading,
            base,
            overlay,
            opacity,
        );
    }
}

async fn run_live(cfg: Configuration, run_for: Option<Duration>) -> Result<()> {
    let cancel = CancellationToken::new();
    let timer: Rc<dyn Timer> = Rc::new(TokioTimer::new(cancel.child_token()));

    let cache = Arc::new(PreloadCache::new());
    let preloader: Option<Rc<dyn Preloader>> = if cfg.preload.enabled {
        let fetch = FetchPreloader::new(&cfg.preload, cache.clone(), cancel.child_token())?;
        Some(Rc::new(fetch))
    } else {
        info!("preloading disabled");
        None
    };

    let mut page = Page::build(&cfg, timer, preloader.clone());

    let mut views: Vec<JoinHandle<Result<()>>> = Vec::new();
    for entry in page.entries() {
        let view = view::View {
            label: entry.label.clone(),
            cache: preloader.as_ref().map(|_| cache.clone()),
            fallback: entry.fallback.clone(),
        };
        views.push(tokio::task::spawn_local(view::run(
            view,
            entry.slideshow.subscribe(),
            cancel.clone(),
        )));
    }
    page.mount();

    let stdin_is_terminal = std::io::stdin().is_terminal();
    let eof_ends_session = input::eof_ends_session(stdin_is_terminal, run_for);
    if !stdin_is_terminal {
        info!("stdin is not a terminal; end of input will not stop the host");
    }
    let (command_tx, mut command_rx) = mpsc::channel::<HostCommand>(16); // Input -> Host
    let mut input_open = true;
    let input_task = tokio::task::spawn_local(input::run(
        BufReader::new(tokio::io::stdin()),
        command_tx,
        cancel.clone(),
    ));

    let deadline = async {
        match run_for {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(err) = res {
                    warn!("ctrl-c handler failed: {err}");
                }
                info!("interrupt received; shutting down");
                break;
            }
            _ = &mut deadline => {
                info!("run time elapsed; shutting down");
                break;
            }
            command = command_rx.recv(), if input_open => match command {
                Some(HostCommand::Hero(interaction)) => {
                    page.handle_hero(interaction);
                }
                Some(HostCommand::Shutdown) => break,
                None if eof_ends_session => {
                    info!("input closed; shutting down");
                    break;
                }
                None => input_open = false,
            },
        }
    }

    page.unmount();
    cancel.cancel();

    for result in futures::future::join_all(views).await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!("view task failed: {err:?}"),
            Err(err) => warn!("view task panicked: {err}"),
        }
    }
    match input_task.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!("input task failed: {err:?}"),
        Err(err) => warn!("input task panicked: {err}"),
    }
    Ok(())
}
