use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use rankfinder::aggregator::BatchSummary;
use rankfinder::api::{self, AppState};
use rankfinder::config::CONFIG;
use rankfinder::data_models::SearchQuery;
use rankfinder::driver::{self, BatchRunner, Limits, Pacing, PacingProfile};
use rankfinder::engine::{RankEngine, StopSignal};
use rankfinder::html::{self, HttpSourceFactory};
use rankfinder::ledger::Ledger;
use rankfinder::presets;
use rankfinder::status::StatusBoard;

#[derive(Parser, Debug)]
#[command(name = "rankfinder")]
#[command(about = "Finds where a business ranks in local search results")]
#[command(version)]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Track a batch of keywords for a preset or a custom business
    Track {
        /// Preset key (malad, andheri, palghar) or "all"
        #[arg(short, long, conflicts_with = "business")]
        preset: Option<String>,

        /// Business name for a custom setup
        #[arg(short, long, requires = "location")]
        business: Option<String>,

        /// Extra accepted spellings of the business
        #[arg(long = "variant")]
        variants: Vec<String>,

        /// Location for a custom setup
        #[arg(short, long)]
        location: Option<String>,

        /// Keywords to search; defaults to the built-in list
        #[arg(short, long = "keyword")]
        keywords: Vec<String>,

        #[arg(long)]
        max_positions: Option<usize>,

        #[arg(long)]
        max_pages: Option<u32>,

        /// Concurrent searches
        #[arg(short = 'j', long)]
        workers: Option<usize>,

        #[arg(long)]
        ledger: Option<PathBuf>,

        #[arg(long)]
        export_dir: Option<PathBuf>,

        /// Skip the random wait between searches
        #[arg(long)]
        no_pace: bool,
    },
    /// Run one search against saved result pages, in page order
    Replay {
        #[arg(short, long)]
        keyword: String,

        #[arg(short, long, default_value = "")]
        location: String,

        /// Accepted spellings of the business, first one is the display name
        #[arg(short, long = "name", required = true)]
        names: Vec<String>,

        #[arg(long)]
        max_positions: Option<usize>,

        #[arg(required = true)]
        pages: Vec<PathBuf>,
    },
    /// Serve the tracking API
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
    /// Write a timestamped snapshot of the ledger
    Export {
        #[arg(long)]
        ledger: Option<PathBuf>,

        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn limits(max_positions: Option<usize>, max_pages: Option<u32>) -> Limits {
    Limits {
        max_positions: max_positions.unwrap_or(CONFIG.max_positions),
        max_pages: max_pages.unwrap_or(CONFIG.max_pages),
    }
}

fn ledger_at(path: Option<PathBuf>) -> Arc<Ledger> {
    Arc::new(Ledger::new(
        path.unwrap_or_else(|| PathBuf::from(&CONFIG.ledger_path)),
    ))
}

fn pacing_profile(pace: bool) -> PacingProfile {
    if !pace {
        return PacingProfile::none();
    }
    PacingProfile {
        single: Pacing::between_secs(CONFIG.single_pace_min_secs, CONFIG.single_pace_max_secs),
        multi: Pacing::between_secs(CONFIG.pace_min_secs, CONFIG.pace_max_secs),
    }
}

fn http_runner(ledger: Arc<Ledger>, workers: usize, pacing: Pacing) -> anyhow::Result<BatchRunner<HttpSourceFactory>> {
    let factory = HttpSourceFactory::new(&CONFIG.search_url, CONFIG.request_timeout())?;
    Ok(
        BatchRunner::new(Arc::new(factory), ledger, Arc::new(StatusBoard::new()))
            .with_pacing(pacing)
            .with_workers(workers)
            .with_session_timeout(CONFIG.session_timeout()),
    )
}

fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupt received, stopping after the current page");
            token.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber (handles both tracing and log crate)
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_target(true)
        .init();

    match cli.command {
        Command::Track {
            preset,
            business,
            variants,
            location,
            keywords,
            max_positions,
            max_pages,
            workers,
            ledger,
            export_dir,
            no_pace,
        } => {
            let limits = limits(max_positions, max_pages);
            let keywords = if keywords.is_empty() {
                presets::default_keywords()
            } else {
                keywords
            };

            let pacing = pacing_profile(!no_pace).for_preset(preset.as_deref());
            let jobs = match (preset, business) {
                (Some(key), _) => {
                    let selected = presets::select(&key);
                    if selected.is_empty() {
                        bail!("unknown preset '{key}'");
                    }
                    driver::preset_jobs(&selected, &keywords, limits)?
                }
                (None, Some(business)) => driver::custom_jobs(
                    &business,
                    &variants,
                    location.as_deref().unwrap_or_default(),
                    &keywords,
                    limits,
                )?,
                (None, None) => bail!("pass --preset or --business"),
            };

            let ledger = ledger_at(ledger);
            let runner = Arc::new(http_runner(
                ledger.clone(),
                workers.unwrap_or(CONFIG.workers),
                pacing,
            )?);

            let token = CancellationToken::new();
            cancel_on_ctrl_c(token.clone());

            log::info!("tracking {} searches", jobs.len());
            let findings = runner.run(jobs, token).await;
            println!("{}", BatchSummary::from_findings(&findings));

            let dir = export_dir.unwrap_or_else(|| PathBuf::from(&CONFIG.export_dir));
            if ledger.exists() {
                let path = ledger.export(&dir)?;
                println!("Full report saved: {}", path.display());
            }
        }
        Command::Replay {
            keyword,
            location,
            names,
            max_positions,
            pages,
        } => {
            let mut html_pages = Vec::with_capacity(pages.len());
            for path in &pages {
                html_pages.push(
                    std::fs::read_to_string(path)
                        .with_context(|| format!("failed to read {}", path.display()))?,
                );
            }
            let query = SearchQuery::new(
                keyword,
                location,
                names,
                max_positions.unwrap_or(CONFIG.max_positions),
                html_pages.len().try_into().unwrap_or(u32::MAX),
            )?;

            let mut source = html::saved_pages_source(&html_pages);
            let report = RankEngine::default()
                .run(&query, &mut source, &StopSignal::default())
                .await;

            for entry in &report.entries {
                println!("{:>4}  p{:<3} {}", entry.position, entry.page, entry.label);
            }
            println!("{}", serde_json::to_string_pretty(&report.finding)?);
        }
        Command::Serve { bind } => {
            let ledger = ledger_at(None);
            let runner = Arc::new(http_runner(ledger.clone(), CONFIG.workers, Pacing::none())?);
            let state = Arc::new(
                AppState::new(runner, ledger, &CONFIG.export_dir, limits(None, None))
                    .with_pacing(pacing_profile(true)),
            );
            let app = api::create_router(state);

            let addr = bind.unwrap_or_else(|| CONFIG.bind_addr.clone());
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            log::info!("listening on {addr}");
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await?;
        }
        Command::Export { ledger, dir } => {
            let ledger = ledger_at(ledger);
            let dir = dir.unwrap_or_else(|| PathBuf::from(&CONFIG.export_dir));
            let path = ledger.export(&dir)?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
