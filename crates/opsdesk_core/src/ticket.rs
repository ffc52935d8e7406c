//! Ticket snapshot types shared by the triage and external-data services.
//!
//! The ticket store (outside this crate) produces `TicketSnapshot` values;
//! nothing in here mutates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ticket priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
}

impl TicketPriority {
    /// Canonical string form, matching the serialized representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
        }
    }
}

impl std::fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    /// Canonical string form, matching the serialized representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Locally known identity of the user who filed the ticket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reporter {
    pub id: u64,
    pub name: String,
    pub email: String,
}

impl Reporter {
    pub fn new(id: u64, name: &str, email: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            email: email.to_string(),
        }
    }
}

/// Read-only view of a ticket at the moment a service is invoked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketSnapshot {
    pub id: u64,
    pub title: String,
    pub description: String,
    /// Current priority; unset tickets are treated as medium at the rule seam
    #[serde(default)]
    pub priority: Option<TicketPriority>,
    pub status: TicketStatus,
    #[serde(default)]
    pub assignee_id: Option<u64>,
    /// Unordered label set
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub reporter: Reporter,
}

impl TicketSnapshot {
    /// New open ticket with no priority, assignee or tags
    pub fn new(id: u64, title: &str, description: &str, reporter: Reporter) -> Self {
        Self {
            id,
            title: title.to_string(),
            description: description.to_string(),
            priority: None,
            status: TicketStatus::Open,
            assignee_id: None,
            tags: Vec::new(),
            created_at: Utc::now(),
            reporter,
        }
    }

    pub fn with_priority(mut self, priority: TicketPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_assignee(mut self, assignee_id: u64) -> Self {
        self.assignee_id = Some(assignee_id);
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Current priority with the medium default applied
    pub fn current_priority(&self) -> TicketPriority {
        self.priority.unwrap_or(TicketPriority::Medium)
    }

    pub fn has_assignee(&self) -> bool {
        self.assignee_id.is_some()
    }

    /// Whole days elapsed since the ticket was created
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn reporter() -> Reporter {
        Reporter::new(1, "Jane Doe", "jane@example.com")
    }

    #[test]
    fn test_priority_canonical_strings() {
        assert_eq!(TicketPriority::Low.as_str(), "low");
        assert_eq!(TicketPriority::Medium.as_str(), "medium");
        assert_eq!(TicketPriority::High.as_str(), "high");
    }

    #[test]
    fn test_status_canonical_strings() {
        assert_eq!(TicketStatus::Open.as_str(), "open");
        assert_eq!(TicketStatus::InProgress.as_str(), "in_progress");
        assert_eq!(TicketStatus::Resolved.as_str(), "resolved");
        assert_eq!(TicketStatus::Closed.as_str(), "closed");
    }

    #[test]
    fn test_serde_matches_canonical_strings() {
        let json = serde_json::to_string(&TicketStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let json = serde_json::to_string(&TicketPriority::High).unwrap();
        assert_eq!(json, "\"high\"");
    }

    #[test]
    fn test_current_priority_defaults_to_medium() {
        let ticket = TicketSnapshot::new(1, "Issue", "Problem", reporter());
        assert_eq!(ticket.current_priority(), TicketPriority::Medium);

        let ticket = ticket.with_priority(TicketPriority::High);
        assert_eq!(ticket.current_priority(), TicketPriority::High);
    }

    #[test]
    fn test_age_days() {
        let now = Utc::now();
        let ticket = TicketSnapshot::new(1, "Issue", "Problem", reporter())
            .with_created_at(now - Duration::days(8));
        assert_eq!(ticket.age_days(now), 8);
    }
}
