//! Run-wide scraper settings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::classifier::PageClassifier;
use crate::errors::{ConfigurationError, SerpResult};
use crate::fetch::FetchConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::pagination::PaginationPolicy;
use crate::retry::RetryPolicy;

/// Request and retry settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSettings {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    /// Retries after a soft block.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff multiplier between retries.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Cap on the backoff delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Proxy URL.
    #[serde(default)]
    pub proxy: Option<String>,
    /// Retry transport failures like soft blocks instead of aborting the page.
    #[serde(default)]
    pub retry_transport_failures: bool,
}

fn default_timeout() -> f64 {
    10.0
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_factor() -> f64 {
    1.5
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            max_retries: default_max_retries(),
            backoff_factor: default_backoff_factor(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            proxy: None,
            retry_transport_failures: false,
        }
    }
}

/// Where and how [`crate::runner::SerpScraper::export`] writes files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSettings {
    /// Format names (`json`, `csv`, `xml`); unknown names are skipped with a warning.
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
    /// Output directory.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// File name without extension.
    #[serde(default = "default_base_filename")]
    pub base_filename: String,
}

fn default_formats() -> Vec<String> {
    vec!["json".to_string()]
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_base_filename() -> String {
    "results".to_string()
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            formats: default_formats(),
            dir: default_output_dir(),
            base_filename: default_base_filename(),
        }
    }
}

/// Settings shared by every job of a run.
///
/// Every field has a default, so `{}` is a valid settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScraperSettings {
    /// Default market.
    #[serde(default = "default_market_code")]
    pub market_code: String,
    /// Default interface language.
    #[serde(default = "default_language_code")]
    pub language_code: String,
    /// Default page size; clamped when queries are built.
    #[serde(default = "default_results_per_page")]
    pub results_per_page: u32,
    /// Default number of pages per job.
    #[serde(default = "default_pages")]
    pub pages: u32,
    /// Keep raw HTML in each record.
    #[serde(default)]
    pub include_html: bool,
    /// Directory for HTML snapshots; no snapshots when unset.
    #[serde(default)]
    pub snapshot_dir: Option<PathBuf>,
    /// Jobs allowed to run at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Lower bound of the pause between pages of a job, in milliseconds.
    #[serde(default = "default_page_delay_min_ms")]
    pub page_delay_min_ms: u64,
    /// Upper bound of the pause between pages of a job, in milliseconds.
    #[serde(default = "default_page_delay_max_ms")]
    pub page_delay_max_ms: u64,
    /// Request and retry settings.
    #[serde(default)]
    pub request: RequestSettings,
    /// When to stop paginating.
    #[serde(default)]
    pub pagination: PaginationPolicy,
    /// Output files.
    #[serde(default)]
    pub output: OutputSettings,
}

fn default_market_code() -> String {
    "en-US".to_string()
}

fn default_language_code() -> String {
    "en".to_string()
}

fn default_results_per_page() -> u32 {
    10
}

fn default_pages() -> u32 {
    1
}

fn default_max_concurrency() -> usize {
    10
}

fn default_page_delay_min_ms() -> u64 {
    800
}

fn default_page_delay_max_ms() -> u64 {
    1600
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            market_code: default_market_code(),
            language_code: default_language_code(),
            results_per_page: default_results_per_page(),
            pages: default_pages(),
            include_html: false,
            snapshot_dir: None,
            max_concurrency: default_max_concurrency(),
            page_delay_min_ms: default_page_delay_min_ms(),
            page_delay_max_ms: default_page_delay_max_ms(),
            request: RequestSettings::default(),
            pagination: PaginationPolicy::default(),
            output: OutputSettings::default(),
        }
    }
}

impl ScraperSettings {
    /// Parses and validates settings from JSON text.
    pub fn from_json_str(json: &str) -> SerpResult<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads, parses and validates a settings file.
    pub fn from_file(path: impl AsRef<Path>) -> SerpResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Sets the concurrency limit.
    #[must_use]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Disables the pause between pages.
    #[must_use]
    pub fn without_page_delay(mut self) -> Self {
        self.page_delay_min_ms = 0;
        self.page_delay_max_ms = 0;
        self
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.market_code.trim().is_empty() {
            return Err(ConfigurationError::Empty { field: "marketCode" });
        }
        if self.language_code.trim().is_empty() {
            return Err(ConfigurationError::Empty { field: "languageCode" });
        }
        if self.pages == 0 {
            return Err(ConfigurationError::Zero { field: "pages" });
        }
        if self.max_concurrency == 0 {
            return Err(ConfigurationError::Zero { field: "maxConcurrency" });
        }
        if !self.request.timeout.is_finite() || self.request.timeout <= 0.0 {
            return Err(ConfigurationError::Invalid(format!(
                "request.timeout must be positive, got {}",
                self.request.timeout
            )));
        }
        if self.output.base_filename.trim().is_empty() {
            return Err(ConfigurationError::Empty {
                field: "output.baseFilename",
            });
        }
        if self.page_delay_min_ms > self.page_delay_max_ms {
            return Err(ConfigurationError::Invalid(
                "pageDelayMinMs is above pageDelayMaxMs".to_string(),
            ));
        }
        self.retry_policy().validate()
    }

    /// Retry policy derived from the request settings.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .with_max_retries(self.request.max_retries)
            .with_backoff_factor(self.request.backoff_factor)
            .with_base_delay_ms(self.request.base_delay_ms)
            .with_max_delay_ms(self.request.max_delay_ms)
    }

    /// Page classifier derived from the request settings.
    #[must_use]
    pub fn classifier(&self) -> PageClassifier {
        PageClassifier::default().with_transport_retries(self.request.retry_transport_failures)
    }

    /// HTTP client settings.
    #[must_use]
    pub fn fetch_config(&self) -> FetchConfig {
        let config = FetchConfig::default().with_timeout(self.request.timeout);
        match &self.request.proxy {
            Some(proxy) => config.with_proxy(proxy.clone()),
            None => config,
        }
    }

    /// Orchestrator settings.
    #[must_use]
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig::default()
            .with_max_concurrency(self.max_concurrency)
            .with_pagination(self.pagination)
            .with_page_delay_ms(self.page_delay_min_ms, self.page_delay_max_ms)
    }
}
