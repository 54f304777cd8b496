//! In-memory `ChatBackend` doubles shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::assessment::models::{FeatureDescriptor, TaxonomyEntry};
use crate::llm_client::{ChatBackend, ChatRequest, LlmClient, LlmError, RetryPolicy};

pub fn api_error(message: &str) -> LlmError {
    LlmError::Api {
        status: 500,
        message: message.to_string(),
    }
}

/// What the backend saw for one attempt.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl RecordedRequest {
    fn from_request(request: &ChatRequest<'_>) -> Self {
        Self {
            system: request.system.to_string(),
            user: request.user.to_string(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

/// Replies with a fixed script, in order. Once the script runs out every
/// further attempt fails.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn complete(&self, request: &ChatRequest<'_>) -> Result<String, LlmError> {
        self.requests
            .lock()
            .unwrap()
            .push(RecordedRequest::from_request(request));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(api_error("script exhausted")))
    }
}

type Route = Box<dyn Fn(&ChatRequest<'_>) -> Result<String, LlmError> + Send + Sync>;
type Latency = Box<dyn Fn(&ChatRequest<'_>) -> Duration + Send + Sync>;

/// Replies based on the request contents, optionally after a simulated
/// latency. Tracks the peak number of concurrent in-flight attempts.
pub struct RoutedBackend {
    route: Route,
    latency: Latency,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl RoutedBackend {
    pub fn new(
        route: impl Fn(&ChatRequest<'_>) -> Result<String, LlmError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            route: Box::new(route),
            latency: Box::new(|_| Duration::ZERO),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(
        mut self,
        latency: impl Fn(&ChatRequest<'_>) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.latency = Box::new(latency);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatBackend for RoutedBackend {
    async fn complete(&self, request: &ChatRequest<'_>) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = (self.latency)(request);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let reply = (self.route)(request);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply
    }
}

pub fn client_for(backend: Arc<dyn ChatBackend>) -> LlmClient {
    LlmClient::new(backend, RetryPolicy::default())
}

pub fn wbc_catalog() -> Vec<FeatureDescriptor> {
    vec![FeatureDescriptor {
        code: "LBXWBCSI".to_string(),
        analyte: "White blood cell count".to_string(),
        units: "1000 cells/uL".to_string(),
    }]
}

pub fn entry(code: &str, parent_code: &str, name: &str) -> TaxonomyEntry {
    TaxonomyEntry {
        code: code.to_string(),
        parent_code: parent_code.to_string(),
        name: name.to_string(),
        description: None,
    }
}

pub fn dic_entry() -> TaxonomyEntry {
    entry("D65", "D60-D77", "Disseminated intravascular coagulation")
}
