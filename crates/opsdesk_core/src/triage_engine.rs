//! Deterministic triage rules.
//!
//! Pure classification of a ticket snapshot into a suggested priority and
//! status, with a confidence score and a short change summary. No I/O; the
//! clock is an explicit parameter so results are reproducible.
//!
//! Rules:
//! - Tags outrank keyword scanning for priority
//! - First matching rule wins; unmatched tickets keep their current values
//! - Confidence grows with data quality and with suggested changes

use chrono::{DateTime, Utc};

use crate::config::TriageConfig;
use crate::ticket::{TicketPriority, TicketSnapshot, TicketStatus};

/// Base confidence before any bonus
const BASE_CONFIDENCE: f64 = 0.5;
/// Upper bound on reported confidence
const MAX_CONFIDENCE: f64 = 0.95;
/// Description length above which the ticket counts as well-described
const RICH_DESCRIPTION_LEN: usize = 50;

/// Suggest a priority from tags, then keywords, then the current value
pub fn determine_priority(ticket: &TicketSnapshot, config: &TriageConfig) -> TicketPriority {
    let tags: Vec<String> = ticket.tags.iter().map(|t| t.to_lowercase()).collect();
    let content = format!(
        "{} {}",
        ticket.title.to_lowercase(),
        ticket.description.to_lowercase()
    );

    if tags.iter().any(|t| t == "urgent" || t == "critical") {
        return TicketPriority::High;
    }
    if tags.iter().any(|t| t == "enhancement" || t == "feature") {
        return TicketPriority::Low;
    }

    if config
        .keywords
        .high_priority
        .iter()
        .any(|keyword| content.contains(keyword.as_str()))
    {
        return TicketPriority::High;
    }
    if config
        .keywords
        .low_priority
        .iter()
        .any(|keyword| content.contains(keyword.as_str()))
    {
        return TicketPriority::Low;
    }

    ticket.current_priority()
}

/// Suggest a status from assignment, age, then resolution keywords
pub fn determine_status(
    ticket: &TicketSnapshot,
    config: &TriageConfig,
    now: DateTime<Utc>,
) -> TicketStatus {
    if ticket.has_assignee() && ticket.status == TicketStatus::Open {
        return TicketStatus::InProgress;
    }

    if ticket.status == TicketStatus::InProgress
        && ticket.age_days(now) > config.resolved_after_days
    {
        return TicketStatus::Resolved;
    }

    let description = ticket.description.to_lowercase();
    if config
        .keywords
        .resolution
        .iter()
        .any(|keyword| description.contains(keyword.as_str()))
    {
        return TicketStatus::Resolved;
    }

    ticket.status
}

/// Confidence in the suggestion, in [0, 0.95], rounded to 2 decimals
pub fn calculate_confidence(
    ticket: &TicketSnapshot,
    suggested_priority: TicketPriority,
    suggested_status: TicketStatus,
) -> f64 {
    let mut confidence = BASE_CONFIDENCE;

    if ticket.description.len() > RICH_DESCRIPTION_LEN {
        confidence += 0.1;
    }
    if !ticket.tags.is_empty() {
        confidence += 0.1;
    }
    if ticket.has_assignee() {
        confidence += 0.05;
    }
    if suggested_priority != ticket.current_priority() {
        confidence += 0.1;
    }
    if suggested_status != ticket.status {
        confidence += 0.05;
    }

    (confidence.min(MAX_CONFIDENCE) * 100.0).round() / 100.0
}

/// One clause per changed field, or a fixed no-change sentence
pub fn summarize_changes(
    ticket: &TicketSnapshot,
    suggested_priority: TicketPriority,
    suggested_status: TicketStatus,
) -> String {
    let mut reasons = Vec::new();

    if suggested_priority != ticket.current_priority() {
        reasons.push(format!(
            "Priority changed from {} to {}",
            ticket.current_priority(),
            suggested_priority
        ));
    }
    if suggested_status != ticket.status {
        reasons.push(format!(
            "Status changed from {} to {}",
            ticket.status, suggested_status
        ));
    }

    if reasons.is_empty() {
        return "Current triage appears appropriate for this ticket.".to_string();
    }

    format!("Suggested changes: {}.", reasons.join(". "))
}

// ============================================================================
// Tests
// ============================================================================
