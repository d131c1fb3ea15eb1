//! # Application State Management
//!
//! This module owns the single instances shared by every HTTP handler and WebSocket
//! actor: the configuration, the request metrics, and the service graph (registry,
//! rooms, router, orchestrator).
//!
//! ## Service graph:
//! ```text
//! ConnectionRegistry ◄── RoomDirectory ◄── MessageRouter ──► TranslationOrchestrator
//!                                                               │
//!                                      TranslationCache ◄───────┤
//!                                      upstream Adapters ◄──────┘
//! ```
//! Everything is built once in [`AppState::with_adapters`] and shared through `Arc`;
//! nothing is global.
//!
//! ### Arc<RwLock<T>> Pattern
//! - **Arc**: Multiple ownership (many HTTP handlers can hold a reference)
//! - **RwLock**: Multiple readers OR one writer at a time
//!
//! Metrics locks recover from poisoning instead of panicking.

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::realtime::{ConnectionRegistry, MessageRouter, RoomDirectory};
use crate::translation::providers::{OpenAiProvider, PlaceholderSynthesizer};
use crate::translation::{Adapters, TranslationCache, TranslationOrchestrator};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Instant;

/// The main application state that's shared across all HTTP request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Loaded once at startup; read-only afterwards
    pub config: Arc<AppConfig>,

    /// Performance metrics (constantly being updated by requests)
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started
    pub start_time: Instant,

    pub router: Arc<MessageRouter>,
    pub orchestrator: Arc<TranslationOrchestrator>,
}

/// Performance metrics collected across all HTTP requests.
#[derive(Debug, Default)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start
    pub request_count: u64,

    /// Total number of errors encountered since server start
    pub error_count: u64,

    /// Detailed metrics for each API endpoint
    /// Key: endpoint name (e.g., "GET /health")
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Detailed performance metrics for a specific API endpoint.
///
/// ## Performance calculations:
/// - **Average response time**: total_duration_ms / request_count
/// - **Error rate**: error_count / request_count
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    /// Build the production service graph: one OpenAI adapter for every capability.
    pub fn from_config(config: AppConfig) -> AppResult<Self> {
        let provider = Arc::new(OpenAiProvider::new(&config)?);
        Ok(Self::with_adapters(config, Adapters::single(provider)))
    }

    /// Build the service graph around the given upstream adapters.
    pub fn with_adapters(config: AppConfig, adapters: Adapters) -> Self {
        let cache = Arc::new(TranslationCache::new(config.cache.capacity, config.cache_ttl()));
        let placeholder =
            PlaceholderSynthesizer::new(&config.audio.output_dir, config.audio.public_url_prefix.clone());
        let orchestrator = Arc::new(TranslationOrchestrator::new(
            adapters,
            placeholder,
            cache,
            config.upstream_timeout(),
        ));

        let registry = Arc::new(ConnectionRegistry::new());
        let rooms = Arc::new(RoomDirectory::new(registry.clone()));
        let router = Arc::new(MessageRouter::new(registry, rooms, orchestrator.clone()));

        Self {
            config: Arc::new(config),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
            router,
            orchestrator,
        }
    }

    fn metrics_mut(&self) -> RwLockWriteGuard<'_, AppMetrics> {
        self.metrics.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Increment the total request counter (called by middleware for every request).
    pub fn increment_request_count(&self) {
        self.metrics_mut().request_count += 1;
    }

    /// Increment the total error counter (4xx and 5xx responses).
    pub fn increment_error_count(&self) {
        self.metrics_mut().error_count += 1;
    }

    /// Record detailed metrics for a specific endpoint.
    ///
    /// ## Parameters:
    /// - **endpoint**: The API endpoint (e.g., "GET /health", "POST /api/translation")
    /// - **duration_ms**: How long the request took to process (in milliseconds)
    /// - **is_error**: Whether this request resulted in an error
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics_mut();
        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;
        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Get a snapshot of current metrics (used for the /metrics endpoint).
    ///
    /// Clones the data so the lock is not held while the response is serialized.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap_or_else(PoisonError::into_inner);
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    /// Average response time in milliseconds; 0.0 before the first request.
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Error rate between 0.0 and 1.0.
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}
