//! Exchange rate service - cache-first rate lookups with layered fallback.
//!
//! Lookup order: fresh cache entry, live upstream call with bounded retry,
//! last known-good snapshot, operator-configured static rates. The caller
//! always gets a result value; upstream trouble shows up as fallback flags
//! and a warning, or as a structured error when every layer is empty.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::ExchangeConfig;
use crate::freshness_cache::FreshnessCache;

/// Primary cache TTL
const CACHE_TTL: Duration = Duration::from_secs(5 * 60);
/// Last-known-good slot TTL
const FALLBACK_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
/// Prefix for per-lookup cache keys
const CACHE_PREFIX: &str = "exchange_rate_";
/// Key of the last-known-good slot
const FALLBACK_KEY: &str = "exchange_rate_last_successful";
/// Upstream request timeout
const TIMEOUT: Duration = Duration::from_secs(10);
/// Transport retries after the initial attempt
const RETRIES: u32 = 2;
/// Fixed pause between attempts
const RETRY_DELAY: Duration = Duration::from_millis(100);
/// Default upstream endpoint
const DEFAULT_BASE_URL: &str = "https://api.exchangerate.host";

// ============================================================================
// Result types
// ============================================================================

/// A fetched rate table, as cached and as served
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateQuote {
    pub base: String,
    /// As-of date reported by the upstream, `YYYY-MM-DD`
    pub date: String,
    /// Currency code to rate, values passed through unrounded
    pub rates: HashMap<String, f64>,
}

/// Structured error reported when every fallback layer is empty
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Result of a rate lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateQuoteResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rates: Option<HashMap<String, f64>>,
    pub cached: bool,
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RateError>,
}

impl RateQuoteResult {
    fn from_quote(quote: RateQuote, cached: bool) -> Self {
        Self {
            success: true,
            base: Some(quote.base),
            date: Some(quote.date),
            rates: Some(quote.rates),
            cached,
            fallback: false,
            warning: None,
            error: None,
        }
    }
}

// ============================================================================
// Provider seam
// ============================================================================

/// Upstream provider errors. Transport and business failures stay
/// distinguishable for logging, but both feed the same fallback chain.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RateProviderError {
    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("{0}")]
    Api(String),
}

/// Seam over the upstream rate API
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn fetch_latest(
        &self,
        base: &str,
        symbols: &[String],
    ) -> Result<RateQuote, RateProviderError>;
}

/// Wire shape of the upstream `/latest` response
#[derive(Debug, Deserialize)]
struct LatestResponse {
    success: Option<bool>,
    base: Option<String>,
    date: Option<String>,
    rates: Option<HashMap<String, f64>>,
    error: Option<LatestResponseError>,
}

#[derive(Debug, Deserialize)]
struct LatestResponseError {
    info: Option<String>,
}

/// Production provider for api.exchangerate.host
pub struct HttpRateProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRateProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn request_once(
        &self,
        base: &str,
        symbols: &[String],
    ) -> Result<LatestResponse, RateProviderError> {
        let url = format!("{}/latest", self.base_url);
        let mut query: Vec<(&str, String)> = vec![("base", base.to_string())];
        if !symbols.is_empty() {
            query.push(("symbols", symbols.join(",")));
        }

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| RateProviderError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RateProviderError::Status(response.status().as_u16()));
        }

        response
            .json::<LatestResponse>()
            .await
            .map_err(|e| RateProviderError::Transport(e.to_string()))
    }
}

impl Default for HttpRateProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    async fn fetch_latest(
        &self,
        base: &str,
        symbols: &[String],
    ) -> Result<RateQuote, RateProviderError> {
        let mut last_error = None;

        for attempt in 0..=RETRIES {
            if attempt > 0 {
                tokio::time::sleep(RETRY_DELAY).await;
            }

            match self.request_once(base, symbols).await {
                Ok(data) => {
                    // The upstream signals its own failures in-band; those are
                    // final, not retryable
                    if data.success == Some(false) {
                        let info = data
                            .error
                            .and_then(|e| e.info)
                            .unwrap_or_else(|| "Unknown API error".to_string());
                        return Err(RateProviderError::Api(info));
                    }

                    return Ok(RateQuote {
                        base: data.base.unwrap_or_else(|| base.to_string()),
                        date: data
                            .date
                            .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string()),
                        rates: data.rates.unwrap_or_default(),
                    });
                }
                Err(e) => {
                    warn!(
                        "Exchange rate request attempt {}/{} failed: {}",
                        attempt + 1,
                        RETRIES + 1,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| RateProviderError::Transport("retries exhausted".to_string())))
    }
}

/// Scripted outcome for [`FakeRateProvider`]
#[derive(Debug, Clone)]
pub enum FakeRateOutcome {
    Quote(RateQuote),
    ApiError(String),
    TransportError(String),
}

/// Fake provider for deterministic tests: queued outcomes plus a default,
/// with call counting for cache assertions.
pub struct FakeRateProvider {
    outcomes: Mutex<VecDeque<FakeRateOutcome>>,
    default_outcome: FakeRateOutcome,
    calls: Mutex<usize>,
}

impl FakeRateProvider {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            default_outcome: FakeRateOutcome::TransportError("no scripted response".to_string()),
            calls: Mutex::new(0),
        }
    }

    /// Provider that always serves the given quote
    pub fn with_quote(quote: RateQuote) -> Self {
        let mut provider = Self::new();
        provider.default_outcome = FakeRateOutcome::Quote(quote);
        provider
    }

    /// Provider that always fails at the transport level
    pub fn always_failing(message: &str) -> Self {
        let mut provider = Self::new();
        provider.default_outcome = FakeRateOutcome::TransportError(message.to_string());
        provider
    }

    /// Queue one outcome ahead of the default
    pub fn then(self, outcome: FakeRateOutcome) -> Self {
        self.outcomes.lock().unwrap().push_back(outcome);
        self
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Default for FakeRateProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateProvider for FakeRateProvider {
    async fn fetch_latest(
        &self,
        _base: &str,
        _symbols: &[String],
    ) -> Result<RateQuote, RateProviderError> {
        *self.calls.lock().unwrap() += 1;

        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_outcome.clone());

        match outcome {
            FakeRateOutcome::Quote(quote) => Ok(quote),
            FakeRateOutcome::ApiError(info) => Err(RateProviderError::Api(info)),
            FakeRateOutcome::TransportError(message) => {
                Err(RateProviderError::Transport(message))
            }
        }
    }
}

// ============================================================================
// Service
// ============================================================================

/// Cache-first exchange rate service
pub struct ExchangeRateService {
    provider: Arc<dyn RateProvider>,
    cache: FreshnessCache<String, RateQuote>,
    config: ExchangeConfig,
}

impl ExchangeRateService {
    /// Production service talking to api.exchangerate.host
    pub fn new(config: ExchangeConfig) -> Self {
        Self::with_provider(Arc::new(HttpRateProvider::new()), config, FreshnessCache::new())
    }

    pub fn with_provider(
        provider: Arc<dyn RateProvider>,
        config: ExchangeConfig,
        cache: FreshnessCache<String, RateQuote>,
    ) -> Self {
        Self {
            provider,
            cache,
            config,
        }
    }

    pub async fn get_rates(&self, base: &str, symbols: &[String]) -> RateQuoteResult {
        let cache_key = Self::cache_key(base, symbols);

        if let Some(quote) = self.cache.get(&cache_key) {
            info!("Exchange rates served from cache: base={} symbols={:?}", base, symbols);
            return RateQuoteResult::from_quote(quote, true);
        }

        match self.provider.fetch_latest(base, symbols).await {
            Ok(quote) => {
                self.cache.put(cache_key, quote.clone(), CACHE_TTL);
                self.cache
                    .put(FALLBACK_KEY.to_string(), quote.clone(), FALLBACK_TTL);

                info!("Exchange rate API call successful: base={} symbols={:?}", base, symbols);
                RateQuoteResult::from_quote(quote, false)
            }
            Err(e) => {
                warn!(
                    "Exchange rate API failed: base={} symbols={:?} error={}",
                    base, symbols, e
                );
                self.use_fallback(base, &e.to_string())
            }
        }
    }

    /// Drop one cached lookup, or everything when no base is given
    pub fn clear_cache(&self, base: Option<&str>, symbols: &[String]) {
        match base {
            Some(base) => self.cache.evict(&Self::cache_key(base, symbols)),
            None => self.cache.clear(),
        }
    }

    fn use_fallback(&self, base: &str, reason: &str) -> RateQuoteResult {
        if let Some(quote) = self.cache.get(&FALLBACK_KEY.to_string()) {
            info!("Exchange rates served from last-known-good data: base={}", base);
            let mut result = RateQuoteResult::from_quote(quote, true);
            result.fallback = true;
            result.warning = Some(format!("Using cached data due to API failure: {}", reason));
            return result;
        }

        if self.config.use_static_fallback && !self.config.static_fallback.rates.is_empty() {
            warn!("Exchange rates served from static fallback: base={}", base);
            let quote = RateQuote {
                base: self.config.static_fallback.base.clone(),
                date: Utc::now().format("%Y-%m-%d").to_string(),
                rates: self.config.static_fallback.rates.clone(),
            };
            let mut result = RateQuoteResult::from_quote(quote, true);
            result.fallback = true;
            result.warning = Some(format!("Using static fallback due to API failure: {}", reason));
            return result;
        }

        error!("Exchange rate API unavailable and no fallback data: base={}", base);
        RateQuoteResult {
            success: false,
            base: None,
            date: None,
            rates: None,
            cached: false,
            fallback: false,
            warning: None,
            error: Some(RateError {
                code: "api_unavailable".to_string(),
                message: "Exchange rate API is currently unavailable and no cached data is \
                          available."
                    .to_string(),
                details: Some(reason.to_string()),
            }),
        }
    }

    /// Symbol order and duplicates never change the key
    fn cache_key(base: &str, symbols: &[String]) -> String {
        let mut sorted: Vec<String> = symbols.to_vec();
        sorted.sort();
        sorted.dedup();
        format!("{}{}_{}", CACHE_PREFIX, base, sorted.join("_"))
    }
}
