//! High-level entry point: settings in, run report out.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cancellation::CancellationToken;
use crate::config::{resolve, ScraperSettings, SearchInput};
use crate::core::RunReport;
use crate::errors::{ConfigurationError, SerpResult};
use crate::export::{export_all, RecordSink};
use crate::fetch::Fetcher;
use crate::orchestrator::{JobOrchestrator, SearchJob};
use crate::query::QueryBuilder;
use crate::retry::RetryEngine;
use crate::snapshot::FileSnapshotStore;

/// Wires settings, fetcher, retry engine and orchestrator together.
#[derive(Debug, Clone)]
pub struct SerpScraper {
    settings: ScraperSettings,
    builder: QueryBuilder,
    orchestrator: JobOrchestrator,
}

impl SerpScraper {
    /// Creates a scraper that fetches over HTTP.
    #[cfg(feature = "http")]
    pub fn new(settings: ScraperSettings) -> SerpResult<Self> {
        settings.validate()?;
        let fetcher = crate::fetch::ReqwestFetcher::new(&settings.fetch_config())?;
        Self::with_fetcher(settings, Arc::new(fetcher))
    }

    /// Creates a scraper around any [`Fetcher`].
    pub fn with_fetcher(settings: ScraperSettings, fetcher: Arc<dyn Fetcher>) -> SerpResult<Self> {
        settings.validate()?;
        let builder = QueryBuilder::new();

        let mut engine = RetryEngine::new(fetcher, settings.retry_policy())
            .with_classifier(settings.classifier())
            .with_include_html(settings.include_html);
        if let Some(dir) = &settings.snapshot_dir {
            engine = engine.with_snapshots(Arc::new(FileSnapshotStore::new(dir.clone())));
        }
        let orchestrator = JobOrchestrator::new(engine, settings.orchestrator_config())
            .with_builder(builder.clone());

        Ok(Self {
            settings,
            builder,
            orchestrator,
        })
    }

    /// The settings in use.
    #[must_use]
    pub fn settings(&self) -> &ScraperSettings {
        &self.settings
    }

    /// Resolves inputs into jobs without fetching anything.
    pub fn jobs(&self, inputs: &[SearchInput]) -> Result<Vec<SearchJob>, ConfigurationError> {
        resolve(&self.settings, inputs, &self.builder)
    }

    /// Runs every input.
    ///
    /// Only invalid inputs fail the call, and they do so before the first
    /// fetch. Page and job failures end up in the report.
    pub async fn run(
        &self,
        inputs: &[SearchInput],
        cancel: Arc<CancellationToken>,
    ) -> SerpResult<RunReport> {
        let jobs = self.jobs(inputs).map_err(|e| {
            warn!(error = %e, "Rejected inputs");
            e
        })?;
        info!(jobs = jobs.len(), "Resolved inputs");
        let report = self.orchestrator.run(jobs, cancel).await;
        for (term, page) in report.aborted_pages() {
            if let Some(err) = page.error() {
                warn!(term, page = page.page, error = %err, "Page aborted");
            }
        }
        Ok(report)
    }

    /// Runs every input and hands the records to `sink`.
    pub async fn run_into(
        &self,
        inputs: &[SearchInput],
        cancel: Arc<CancellationToken>,
        sink: &dyn RecordSink,
    ) -> SerpResult<RunReport> {
        let report = self.run(inputs, cancel).await?;
        let records: Vec<_> = report.records().cloned().collect();
        sink.write(&records).await?;
        Ok(report)
    }

    /// Writes the report's records in every format listed in the output
    /// settings and returns the written paths.
    pub fn export(&self, report: &RunReport) -> SerpResult<Vec<PathBuf>> {
        let output = &self.settings.output;
        let records: Vec<_> = report.records().cloned().collect();
        export_all(&records, &output.dir, output.formats.as_slice(), &output.base_filename)
    }
}
