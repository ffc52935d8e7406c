//! Opsdesk core - triage suggestions and resilient external data access.
//!
//! Ticket CRUD, persistence and the HTTP layer live outside this crate. What
//! lives here is the decision logic: deterministic triage rules with
//! confidence scoring, and cache-first fetchers that keep answering when
//! upstream APIs misbehave.

pub mod config;
pub mod exchange_rates;
pub mod external_users;
pub mod freshness_cache;
pub mod ticket;
pub mod triage_engine;
pub mod triage_service;

pub use config::{CoreConfig, ExchangeConfig, KeywordConfig, LlmConfig, StaticFallback, TriageConfig};
pub use exchange_rates::{ExchangeRateService, RateProvider, RateQuote, RateQuoteResult};
pub use external_users::{
    ExternalUserProfile, ExternalUserResult, ExternalUserService, ProfileProvider, ProfileSource,
};
pub use freshness_cache::FreshnessCache;
pub use ticket::{Reporter, TicketPriority, TicketSnapshot, TicketStatus};
pub use triage_service::{TriageError, TriageMethod, TriageService, TriageSuggestion};
