use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::aggregator;
use crate::data_models::{Finding, SearchQuery};
use crate::engine::{Outcome, RankEngine, StopSignal};
use crate::error::QueryError;
use crate::ledger::Ledger;
use crate::page_source::SourceFactory;
use crate::presets::Preset;
use crate::status::StatusBoard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_positions: usize,
    pub max_pages: u32,
}

/// One search of a batch: a query plus the short location name shown in logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackJob {
    pub location_name: String,
    pub query: SearchQuery,
}

/// One job per (preset, keyword), presets outermost.
pub fn preset_jobs(
    presets: &[&Preset],
    keywords: &[String],
    limits: Limits,
) -> Result<Vec<TrackJob>, QueryError> {
    let mut jobs = Vec::with_capacity(presets.len() * keywords.len());
    for preset in presets {
        for keyword in keywords {
            jobs.push(TrackJob {
                location_name: preset.location_name.to_string(),
                query: SearchQuery::new(
                    keyword.as_str(),
                    preset.location,
                    preset.target_names(),
                    limits.max_positions,
                    limits.max_pages,
                )?,
            });
        }
    }
    Ok(jobs)
}

/// Jobs for a business that has no preset. `variants` are extra accepted
/// spellings on top of `business`.
pub fn custom_jobs(
    business: &str,
    variants: &[String],
    location: &str,
    keywords: &[String],
    limits: Limits,
) -> Result<Vec<TrackJob>, QueryError> {
    let mut names = vec![business.to_string()];
    names.extend(variants.iter().cloned());

    keywords
        .iter()
        .filter(|k| !k.trim().is_empty())
        .map(|keyword| {
            Ok(TrackJob {
                location_name: "Custom".to_string(),
                query: SearchQuery::new(
                    keyword.as_str(),
                    location,
                    names.clone(),
                    limits.max_positions,
                    limits.max_pages,
                )?,
            })
        })
        .collect()
}

/// Random wait between successive searches so the upstream provider is not hammered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub min: Duration,
    pub max: Duration,
}

impl Pacing {
    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn between_secs(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_secs(min.min(max)),
            max: Duration::from_secs(max.max(min)),
        }
    }

    pub fn pick(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let ms = rand::thread_rng().gen_range(self.min.as_millis()..=self.max.as_millis());
        Duration::from_millis(ms as u64)
    }
}

/// Waits for single-preset batches and for multi-location or custom batches.
/// A single location is searched with longer gaps than a spread-out batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingProfile {
    pub single: Pacing,
    pub multi: Pacing,
}

impl PacingProfile {
    pub fn none() -> Self {
        Self {
            single: Pacing::none(),
            multi: Pacing::none(),
        }
    }

    /// `preset` is the selected preset key, `None` for a custom business.
    pub fn for_preset(&self, preset: Option<&str>) -> Pacing {
        match preset {
            Some(key) if !key.trim().eq_ignore_ascii_case("all") => self.single,
            _ => self.multi,
        }
    }
}

/// Runs a batch of searches. Each search gets its own page source from the
/// factory; a failing search becomes an error finding and the batch moves on.
pub struct BatchRunner<F: SourceFactory> {
    engine: RankEngine,
    factory: Arc<F>,
    ledger: Arc<Ledger>,
    status: Arc<StatusBoard>,
    pacing: Pacing,
    workers: usize,
    session_timeout: Option<Duration>,
}

impl<F: SourceFactory> BatchRunner<F> {
    pub fn new(factory: Arc<F>, ledger: Arc<Ledger>, status: Arc<StatusBoard>) -> Self {
        Self {
            engine: RankEngine::default(),
            factory,
            ledger,
            status,
            pacing: Pacing::none(),
            workers: 1,
            session_timeout: None,
        }
    }

    pub fn with_engine(mut self, engine: RankEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = Some(timeout);
        self
    }

    pub fn status(&self) -> &Arc<StatusBoard> {
        &self.status
    }

    /// Runs every job and returns one finding per job, in job order.
    ///
    /// Once `cancel` fires no further job is started. Each job that never
    /// started still gets a `cancelled` finding, recorded in the ledger and
    /// the status log, so a cancelled batch always leaves one row per job.
    pub async fn run(self: Arc<Self>, jobs: Vec<TrackJob>, cancel: CancellationToken) -> Vec<Finding> {
        let pacing = self.pacing;
        self.run_paced(jobs, pacing, cancel).await
    }

    /// Same as [`run`](Self::run) with `pacing` between searches instead of
    /// the runner's own.
    pub async fn run_paced(
        self: Arc<Self>,
        jobs: Vec<TrackJob>,
        pacing: Pacing,
        cancel: CancellationToken,
    ) -> Vec<Finding> {
        let total = jobs.len();
        let slots = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        let mut pending = jobs.into_iter().enumerate();
        let mut skipped = Vec::new();

        for (idx, job) in pending.by_ref() {
            let permit = tokio::select! {
                permit = slots.clone().acquire_owned() => permit.ok(),
                _ = cancel.cancelled() => None,
            };
            let Some(permit) = permit.filter(|_| !cancel.is_cancelled()) else {
                skipped.push((idx, job));
                break;
            };

            let runner = self.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let finding = runner.run_job(idx, total, &job, &cancel).await;
                if idx + 1 < total {
                    runner.pace(pacing, &cancel).await;
                }
                drop(permit);
                (idx, finding)
            });
        }
        skipped.extend(pending);

        let mut findings = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(pair) => findings.push(pair),
                Err(e) => tracing::error!(error = %e, "search task aborted"),
            }
        }

        if !skipped.is_empty() {
            self.status
                .log(format!(
                    "Batch cancelled after {} of {} searches",
                    total - skipped.len(),
                    total
                ))
                .await;
        }
        for (idx, job) in skipped {
            let finding = self.skip_job(idx, total, &job).await;
            findings.push((idx, finding));
        }

        findings.sort_by_key(|(idx, _)| *idx);
        findings.into_iter().map(|(_, finding)| finding).collect()
    }

    async fn skip_job(&self, idx: usize, total: usize, job: &TrackJob) -> Finding {
        let query = &job.query;
        self.status
            .log(format!(
                "[{}/{}] {} - {}",
                idx + 1,
                total,
                job.location_name,
                query.keyword
            ))
            .await;
        tracing::debug!(keyword = %query.keyword, "search skipped, batch cancelled");

        let outcome = Outcome::Cancelled("search cancelled".to_string());
        let finding = aggregator::finalize(&outcome, &[], 0, query);
        self.record(&finding).await;
        finding
    }

    async fn run_job(
        &self,
        idx: usize,
        total: usize,
        job: &TrackJob,
        cancel: &CancellationToken,
    ) -> Finding {
        let query = &job.query;
        self.status
            .log(format!(
                "[{}/{}] {} - {}",
                idx + 1,
                total,
                job.location_name,
                query.keyword
            ))
            .await;
        tracing::info!(
            keyword = %query.keyword,
            location = %query.location,
            "starting search {}/{}",
            idx + 1,
            total
        );

        let mut stop = StopSignal::new(cancel.clone());
        if let Some(timeout) = self.session_timeout {
            stop = stop.with_deadline(tokio::time::Instant::now() + timeout);
        }

        let finding = match self.factory.open(query).await {
            Ok(mut source) => self.engine.run(query, &mut source, &stop).await.finding,
            Err(e) => aggregator::finalize(&Outcome::Failed(e), &[], 0, query),
        };

        self.record(&finding).await;
        finding
    }

    /// Appends `finding` to the ledger and reports it on the status board.
    async fn record(&self, finding: &Finding) {
        if let Err(e) = self.ledger.append(finding).await {
            tracing::error!(error = %e, keyword = %finding.keyword, "failed to record finding");
        }

        let line = match (&finding.matched_label, finding.position, finding.page) {
            (Some(label), Some(position), Some(page)) => {
                format!("  FOUND #{position} (page {page}): {label}")
            }
            _ => match &finding.error {
                Some(e) => format!("  ERROR after {} results: {e}", finding.total_checked),
                None => format!(
                    "  NOT FOUND in {} results ({})",
                    finding.total_checked, finding.outcome
                ),
            },
        };
        self.status.log(line).await;
        self.status.advance().await;
    }

    async fn pace(&self, pacing: Pacing, cancel: &CancellationToken) {
        let delay = pacing.pick();
        if delay.is_zero() {
            return;
        }
        log::info!("waiting {:.1}s before next keyword", delay.as_secs_f64());
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => {}
        }
    }
}
