//! In-memory [`Fetcher`] implementations for tests and benchmarks.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::SerpError;
use crate::fetch::{FetchRequest, FetchResponse, Fetcher};

/// One scripted reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Reply with a status and body.
    Respond {
        /// HTTP status.
        status: u16,
        /// Body.
        body: String,
    },
    /// Fail below HTTP with this message.
    Fail(String),
}

impl ScriptStep {
    /// A 200 reply.
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self::status(200, body)
    }

    /// A reply with an arbitrary status.
    #[must_use]
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Respond {
            status,
            body: body.into(),
        }
    }

    /// A transport failure.
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }

    fn into_result(self, url: &str) -> Result<FetchResponse, SerpError> {
        match self {
            Self::Respond { status, body } => Ok(FetchResponse {
                status,
                body,
                final_url: url.to_string(),
                duration_ms: 0,
            }),
            Self::Fail(message) => Err(SerpError::transport(url, message)),
        }
    }
}

/// Replays a fixed script; the last step repeats once the script runs out.
#[derive(Debug)]
pub struct ScriptedFetcher {
    steps: Vec<ScriptStep>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl ScriptedFetcher {
    /// Creates a fetcher from a non-empty script.
    #[must_use]
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Number of fetches made.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    /// Requests received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, SerpError> {
        let index = {
            let mut requests = self.requests.lock();
            requests.push(request.clone());
            requests.len() - 1
        };
        let step = self
            .steps
            .get(index)
            .or_else(|| self.steps.last())
            .cloned()
            .unwrap_or_else(|| ScriptStep::fail("empty script"));
        step.into_result(&request.url)
    }
}

type Route = dyn Fn(&FetchRequest) -> ScriptStep + Send + Sync;

/// Answers each request through a closure, optionally after a delay.
///
/// Tracks the peak number of requests in flight at once.
pub struct FnFetcher {
    route: Box<Route>,
    latency: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl std::fmt::Debug for FnFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFetcher")
            .field("latency", &self.latency)
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}

impl FnFetcher {
    /// Creates a fetcher that answers with `route`.
    pub fn new<F>(route: F) -> Self
    where
        F: Fn(&FetchRequest) -> ScriptStep + Send + Sync + 'static,
    {
        Self {
            route: Box::new(route),
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Sleeps this long before answering.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of fetches made.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent fetches observed.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FnFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, SerpError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let step = (self.route)(request);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        step.into_result(&request.url)
    }
}
