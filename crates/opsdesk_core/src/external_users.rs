//! External user profiles - enrich tickets with a third-party directory entry.
//!
//! Reporter ids map onto JSONPlaceholder's ten-user id space. Lookups are
//! cached per ticket. A forbidden upstream answer degrades to a profile
//! synthesized from the locally known reporter; other failures pass through
//! as structured errors and are never cached, so the next call retries
//! upstream.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::freshness_cache::FreshnessCache;
use crate::ticket::TicketSnapshot;

/// Upstream request timeout
const TIMEOUT: Duration = Duration::from_secs(5);
/// Cache TTL for successful and synthesized profiles
const PROFILE_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
/// Default upstream endpoint
const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";
/// Size of the upstream user directory
const UPSTREAM_USER_COUNT: u64 = 10;

// ============================================================================
// Result types
// ============================================================================

/// Where profile data came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileSource {
    Jsonplaceholder,
    Cache,
    LocalFallback,
}

impl ProfileSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileSource::Jsonplaceholder => "jsonplaceholder",
            ProfileSource::Cache => "cache",
            ProfileSource::LocalFallback => "local-fallback",
        }
    }
}

impl std::fmt::Display for ProfileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External profile mapped into our shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalUserProfile {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub source: ProfileSource,
}

/// Structured error payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalUserError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Result of a profile lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalUserResult {
    pub success: bool,
    pub ticket_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<ExternalUserProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExternalUserError>,
}

impl ExternalUserResult {
    fn ok(ticket_id: u64, user: ExternalUserProfile) -> Self {
        Self {
            success: true,
            ticket_id,
            user: Some(user),
            error: None,
        }
    }

    fn err(ticket_id: u64, error: ExternalUserError) -> Self {
        Self {
            success: false,
            ticket_id,
            user: None,
            error: Some(error),
        }
    }
}

// ============================================================================
// Provider seam
// ============================================================================

/// Raw upstream user record; every field may be missing
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamUser {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub company: Option<UpstreamCompany>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamCompany {
    pub name: Option<String>,
}

/// Upstream profile provider errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProfileProviderError {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("{0}")]
    Transport(String),
}

/// Seam over the upstream user directory
#[async_trait]
pub trait ProfileProvider: Send + Sync {
    async fn fetch_user(&self, user_id: u64) -> Result<UpstreamUser, ProfileProviderError>;
}

/// Production provider for jsonplaceholder.typicode.com
pub struct HttpProfileProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProfileProvider {
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
}

impl Default for HttpProfileProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileProvider for HttpProfileProvider {
    async fn fetch_user(&self, user_id: u64) -> Result<UpstreamUser, ProfileProviderError> {
        let url = format!("{}/users/{}", self.base_url, user_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProfileProviderError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProfileProviderError::Status(response.status().as_u16()));
        }

        response
            .json::<UpstreamUser>()
            .await
            .map_err(|e| ProfileProviderError::Transport(e.to_string()))
    }
}

/// Fake provider for deterministic tests: queued outcomes plus a default,
/// with call counting for cache assertions.
pub struct FakeProfileProvider {
    outcomes: Mutex<VecDeque<Result<UpstreamUser, ProfileProviderError>>>,
    default_outcome: Result<UpstreamUser, ProfileProviderError>,
    calls: Mutex<usize>,
}

impl FakeProfileProvider {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            default_outcome: Err(ProfileProviderError::Transport(
                "no scripted response".to_string(),
            )),
            calls: Mutex::new(0),
        }
    }

    /// Provider that always serves the given user
    pub fn with_user(user: UpstreamUser) -> Self {
        let mut provider = Self::new();
        provider.default_outcome = Ok(user);
        provider
    }

    /// Provider that always answers with the given HTTP status
    pub fn with_status(status: u16) -> Self {
        let mut provider = Self::new();
        provider.default_outcome = Err(ProfileProviderError::Status(status));
        provider
    }

    /// Provider that always fails at the transport level
    pub fn always_failing(message: &str) -> Self {
        let mut provider = Self::new();
        provider.default_outcome = Err(ProfileProviderError::Transport(message.to_string()));
        provider
    }

    /// Queue one outcome ahead of the default
    pub fn then(self, outcome: Result<UpstreamUser, ProfileProviderError>) -> Self {
        self.outcomes.lock().unwrap().push_back(outcome);
        self
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Default for FakeProfileProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileProvider for FakeProfileProvider {
    async fn fetch_user(&self, _user_id: u64) -> Result<UpstreamUser, ProfileProviderError> {
        *self.calls.lock().unwrap() += 1;

        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_outcome.clone())
    }
}

// ============================================================================
// Service
// ============================================================================

/// External user lookup with per-ticket caching and graceful degradation
pub struct ExternalUserService {
    provider: Arc<dyn ProfileProvider>,
    cache: FreshnessCache<u64, ExternalUserProfile>,
}

impl ExternalUserService {
    /// Production service talking to jsonplaceholder.typicode.com
    pub fn new() -> Self {
        Self::with_provider(Arc::new(HttpProfileProvider::new()), FreshnessCache::new())
    }

    pub fn with_provider(
        provider: Arc<dyn ProfileProvider>,
        cache: FreshnessCache<u64, ExternalUserProfile>,
    ) -> Self {
        Self { provider, cache }
    }

    /// Map a reporter id onto the upstream's bounded id space
    pub fn placeholder_id(reporter_id: u64) -> u64 {
        (reporter_id.saturating_sub(1) % UPSTREAM_USER_COUNT) + 1
    }

    pub async fn get_user_for_ticket(&self, ticket: &TicketSnapshot) -> ExternalUserResult {
        if let Some(profile) = self.cache.get(&ticket.id) {
            debug!("External user served from cache: ticket={}", ticket.id);
            return ExternalUserResult::ok(
                ticket.id,
                ExternalUserProfile {
                    source: ProfileSource::Cache,
                    ..profile
                },
            );
        }

        let placeholder_id = Self::placeholder_id(ticket.reporter.id);

        match self.provider.fetch_user(placeholder_id).await {
            Ok(user) => {
                let profile = ExternalUserProfile {
                    id: user.id.unwrap_or(placeholder_id),
                    name: user.name,
                    username: user.username,
                    email: user.email,
                    company: user.company.and_then(|c| c.name),
                    source: ProfileSource::Jsonplaceholder,
                };
                self.cache.put(ticket.id, profile.clone(), PROFILE_CACHE_TTL);
                ExternalUserResult::ok(ticket.id, profile)
            }
            Err(ProfileProviderError::Status(403)) => {
                warn!(
                    "External user provider returned 403, synthesizing local profile: ticket={}",
                    ticket.id
                );
                let profile = ExternalUserProfile {
                    id: placeholder_id,
                    name: Some(ticket.reporter.name.clone()),
                    username: None,
                    email: Some(ticket.reporter.email.clone()),
                    company: None,
                    source: ProfileSource::LocalFallback,
                };
                self.cache.put(ticket.id, profile.clone(), PROFILE_CACHE_TTL);
                ExternalUserResult::ok(ticket.id, profile)
            }
            Err(ProfileProviderError::Status(status)) => {
                warn!(
                    "External user HTTP failure: ticket={} status={}",
                    ticket.id, status
                );
                ExternalUserResult::err(
                    ticket.id,
                    ExternalUserError {
                        code: "external_user_http_error".to_string(),
                        message: "Failed to fetch external user".to_string(),
                        status: Some(status),
                        details: None,
                    },
                )
            }
            Err(ProfileProviderError::Transport(message)) => {
                error!(
                    "External user lookup failed: ticket={} error={}",
                    ticket.id, message
                );
                ExternalUserResult::err(
                    ticket.id,
                    ExternalUserError {
                        code: "external_user_exception".to_string(),
                        message: "Unexpected error fetching external user".to_string(),
                        status: None,
                        details: Some(message),
                    },
                )
            }
        }
    }
}

impl Default for ExternalUserService {
    fn default() -> Self {
        Self::new()
    }
}
