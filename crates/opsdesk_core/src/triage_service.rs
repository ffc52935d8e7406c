//! Triage suggestion service.
//!
//! Wraps the rule engine behind a strategy seam. The rule-based strategy
//! reports the rule results directly; the mock LLM strategy reuses the same
//! rules but produces a narrative summary and reasoning, standing in for a
//! real model integration behind the same interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use crate::config::TriageConfig;
use crate::ticket::{TicketPriority, TicketSnapshot, TicketStatus};
use crate::triage_engine;

/// Fixed confidence reported by the mock LLM analysis
const LLM_CONFIDENCE: f64 = 0.85;

/// How a suggestion was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriageMethod {
    Rules,
    Llm,
}

impl TriageMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriageMethod::Rules => "rules",
            TriageMethod::Llm => "llm",
        }
    }
}

impl std::fmt::Display for TriageMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated triage suggestion. Created fresh per call, never persisted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageSuggestion {
    pub ticket_id: u64,
    pub suggested_priority: TicketPriority,
    pub suggested_status: TicketStatus,
    pub summary: String,
    pub confidence: f64,
    pub method: TriageMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// Triage service errors
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("Failed to generate triage suggestion for ticket {ticket_id}: {cause}")]
    GenerationFailed { ticket_id: u64, cause: String },
}

impl TriageError {
    /// Stable machine code for the transport layer
    pub fn code(&self) -> &'static str {
        match self {
            TriageError::GenerationFailed { .. } => "triage_failed",
        }
    }
}

// ============================================================================
// Strategies
// ============================================================================

/// Seam over suggestion generation, so analysis backends are swappable
#[async_trait]
pub trait TriageStrategy: Send + Sync {
    async fn analyze(
        &self,
        ticket: &TicketSnapshot,
        now: DateTime<Utc>,
    ) -> Result<TriageSuggestion, String>;
}

/// Rule-based strategy: report the rule engine results directly
pub struct RuleBasedStrategy {
    config: TriageConfig,
}

impl RuleBasedStrategy {
    pub fn new(config: TriageConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TriageStrategy for RuleBasedStrategy {
    async fn analyze(
        &self,
        ticket: &TicketSnapshot,
        now: DateTime<Utc>,
    ) -> Result<TriageSuggestion, String> {
        let priority = triage_engine::determine_priority(ticket, &self.config);
        let status = triage_engine::determine_status(ticket, &self.config, now);

        Ok(TriageSuggestion {
            ticket_id: ticket.id,
            suggested_priority: priority,
            suggested_status: status,
            summary: triage_engine::summarize_changes(ticket, priority, status),
            confidence: triage_engine::calculate_confidence(ticket, priority, status),
            method: TriageMethod::Rules,
            reasoning: None,
            fallback: None,
            fallback_reason: None,
        })
    }
}

/// Mock LLM strategy: same rules underneath, narrative output on top.
///
/// The simulated delay mimics inference latency; set `simulated_delay_ms = 0`
/// in tests.
pub struct MockLlmStrategy {
    config: TriageConfig,
    delay: Duration,
}

impl MockLlmStrategy {
    pub fn new(config: TriageConfig) -> Self {
        let delay = Duration::from_millis(config.llm.simulated_delay_ms);
        Self { config, delay }
    }

    fn narrative_summary(
        ticket: &TicketSnapshot,
        priority: TicketPriority,
        status: TicketStatus,
    ) -> String {
        let mut changes = Vec::new();

        if priority != ticket.current_priority() {
            changes.push(format!("priority to {}", priority));
        }
        if status != ticket.status {
            changes.push(format!("status to {}", status));
        }

        if changes.is_empty() {
            return "After analyzing the ticket content, the current triage settings appear \
                    appropriate. No changes recommended at this time."
                .to_string();
        }

        format!(
            "Based on the ticket content analysis, I recommend updating the {}. This will help \
             ensure proper prioritization and workflow.",
            changes.join(" and ")
        )
    }

    fn reasoning(
        ticket: &TicketSnapshot,
        priority: TicketPriority,
        status: TicketStatus,
    ) -> String {
        let mut factors = Vec::new();

        factors.push(
            match priority {
                TicketPriority::High => "The ticket contains urgent or critical indicators",
                TicketPriority::Low => "This appears to be a non-critical enhancement or minor issue",
                TicketPriority::Medium => "The issue severity appears to be moderate",
            }
            .to_string(),
        );

        if status == TicketStatus::InProgress && ticket.has_assignee() {
            factors.push("An assignee is set, suggesting active work".to_string());
        } else if status == TicketStatus::Resolved {
            factors.push("Resolution indicators were found in the ticket".to_string());
        }

        format!("{}.", factors.join(". "))
    }
}

#[async_trait]
impl TriageStrategy for MockLlmStrategy {
    async fn analyze(
        &self,
        ticket: &TicketSnapshot,
        now: DateTime<Utc>,
    ) -> Result<TriageSuggestion, String> {
        tokio::time::sleep(self.delay).await;

        let priority = triage_engine::determine_priority(ticket, &self.config);
        let status = triage_engine::determine_status(ticket, &self.config, now);

        Ok(TriageSuggestion {
            ticket_id: ticket.id,
            suggested_priority: priority,
            suggested_status: status,
            summary: Self::narrative_summary(ticket, priority, status),
            confidence: LLM_CONFIDENCE,
            method: TriageMethod::Llm,
            reasoning: Some(Self::reasoning(ticket, priority, status)),
            fallback: None,
            fallback_reason: None,
        })
    }
}

// ============================================================================
// Service
// ============================================================================

/// Entry point for triage suggestions, strategy chosen from configuration
pub struct TriageService {
    strategy: Box<dyn TriageStrategy>,
}

impl TriageService {
    pub fn new(config: &TriageConfig) -> Self {
        let strategy: Box<dyn TriageStrategy> = if config.llm.enabled {
            Box::new(MockLlmStrategy::new(config.clone()))
        } else {
            Box::new(RuleBasedStrategy::new(config.clone()))
        };
        Self::with_strategy(strategy)
    }

    pub fn with_strategy(strategy: Box<dyn TriageStrategy>) -> Self {
        Self { strategy }
    }

    pub async fn suggest(&self, ticket: &TicketSnapshot) -> Result<TriageSuggestion, TriageError> {
        self.suggest_at(ticket, Utc::now()).await
    }

    /// Explicit-clock variant, used for reproducible tests
    pub async fn suggest_at(
        &self,
        ticket: &TicketSnapshot,
        now: DateTime<Utc>,
    ) -> Result<TriageSuggestion, TriageError> {
        let suggestion = self
            .strategy
            .analyze(ticket, now)
            .await
            .map_err(|cause| TriageError::GenerationFailed {
                ticket_id: ticket.id,
                cause,
            })?;

        info!(
            "Triage suggestion generated ({}): ticket={} priority={} status={} confidence={}",
            suggestion.method,
            suggestion.ticket_id,
            suggestion.suggested_priority,
            suggestion.suggested_status,
            suggestion.confidence
        );

        Ok(suggestion)
    }
}
