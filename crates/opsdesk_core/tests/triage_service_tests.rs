//! Triage service tests - strategy selection, LLM variant, error wrapping.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opsdesk_core::config::TriageConfig;
use opsdesk_core::ticket::{Reporter, TicketPriority, TicketSnapshot, TicketStatus};
use opsdesk_core::triage_service::{
    TriageError, TriageMethod, TriageService, TriageStrategy, TriageSuggestion,
};

fn reporter() -> Reporter {
    Reporter::new(1, "Jane Doe", "jane@example.com")
}

fn llm_config() -> TriageConfig {
    let mut config = TriageConfig::default();
    config.llm.enabled = true;
    config.llm.simulated_delay_ms = 0;
    config
}

#[tokio::test]
async fn suggest_uses_rules_method_by_default() {
    let service = TriageService::new(&TriageConfig::default());
    let ticket = TicketSnapshot::new(1, "Issue", "Some description", reporter());

    let suggestion = service.suggest(&ticket).await.unwrap();

    assert_eq!(suggestion.method, TriageMethod::Rules);
    assert_eq!(suggestion.ticket_id, 1);
    assert!(suggestion.reasoning.is_none());
}

#[tokio::test]
async fn suggest_confidence_stays_within_bounds() {
    let service = TriageService::new(&TriageConfig::default());
    let ticket = TicketSnapshot::new(1, "System is down - URGENT", "Critical error 500 on production. Cannot login.", reporter())
        .with_priority(TicketPriority::Low)
        .with_tags(&["urgent", "critical"])
        .with_assignee(2);

    let suggestion = service.suggest(&ticket).await.unwrap();

    assert!(suggestion.confidence >= 0.0);
    assert!(suggestion.confidence <= 0.95);
}

#[tokio::test]
async fn suggest_identifies_high_priority_from_urgent_keywords() {
    let service = TriageService::new(&TriageConfig::default());
    let ticket = TicketSnapshot::new(
        2,
        "System is down - URGENT",
        "Critical error 500 on production. Cannot login.",
        reporter(),
    )
    .with_priority(TicketPriority::Low);

    let suggestion = service.suggest(&ticket).await.unwrap();

    assert_eq!(suggestion.suggested_priority, TicketPriority::High);
}

#[tokio::test]
async fn suggest_suggests_in_progress_when_assignee_set() {
    let service = TriageService::new(&TriageConfig::default());
    let ticket = TicketSnapshot::new(3, "Bug to fix", "Need to fix this bug", reporter())
        .with_priority(TicketPriority::Medium)
        .with_assignee(7);

    let suggestion = service.suggest(&ticket).await.unwrap();

    assert_eq!(suggestion.suggested_status, TicketStatus::InProgress);
}

#[tokio::test]
async fn llm_variant_reports_fixed_confidence_and_reasoning() {
    let service = TriageService::new(&llm_config());
    let ticket = TicketSnapshot::new(4, "Issue with system", "Some problem occurred", reporter())
        .with_priority(TicketPriority::Low)
        .with_tags(&["urgent", "critical"]);

    let suggestion = service.suggest(&ticket).await.unwrap();

    assert_eq!(suggestion.method, TriageMethod::Llm);
    assert_eq!(suggestion.confidence, 0.85);
    let reasoning = suggestion.reasoning.unwrap();
    assert!(reasoning.contains("urgent or critical indicators"));
    assert!(suggestion.summary.contains("I recommend updating"));
}

#[tokio::test]
async fn llm_variant_reports_no_changes_for_settled_ticket() {
    let service = TriageService::new(&llm_config());
    let ticket = TicketSnapshot::new(5, "Question", "How do I change my avatar?", reporter())
        .with_priority(TicketPriority::Medium);

    let suggestion = service.suggest(&ticket).await.unwrap();

    assert!(suggestion.summary.contains("No changes recommended"));
    assert!(suggestion
        .reasoning
        .unwrap()
        .contains("severity appears to be moderate"));
}

#[tokio::test]
async fn llm_and_rules_agree_on_priority_and_status() {
    let ticket = TicketSnapshot::new(
        6,
        "Getting error 500",
        "The system returns error 500 when submitting the form",
        reporter(),
    )
    .with_priority(TicketPriority::Low)
    .with_assignee(2);

    let rules = TriageService::new(&TriageConfig::default());
    let llm = TriageService::new(&llm_config());
    let now = Utc::now();

    let from_rules = rules.suggest_at(&ticket, now).await.unwrap();
    let from_llm = llm.suggest_at(&ticket, now).await.unwrap();

    assert_eq!(from_rules.suggested_priority, from_llm.suggested_priority);
    assert_eq!(from_rules.suggested_status, from_llm.suggested_status);
}

struct FailingStrategy;

#[async_trait]
impl TriageStrategy for FailingStrategy {
    async fn analyze(
        &self,
        _ticket: &TicketSnapshot,
        _now: DateTime<Utc>,
    ) -> Result<TriageSuggestion, String> {
        Err("LLM service unavailable".to_string())
    }
}

#[tokio::test]
async fn strategy_failure_is_wrapped_with_ticket_id() {
    let service = TriageService::with_strategy(Box::new(FailingStrategy));
    let ticket = TicketSnapshot::new(42, "Issue", "Problem", reporter());

    let err = service.suggest(&ticket).await.unwrap_err();

    assert_eq!(err.code(), "triage_failed");
    let TriageError::GenerationFailed { ticket_id, cause } = err;
    assert_eq!(ticket_id, 42);
    assert_eq!(cause, "LLM service unavailable");
}

#[tokio::test]
async fn suggestion_serializes_without_empty_optionals() {
    let service = TriageService::new(&TriageConfig::default());
    let ticket = TicketSnapshot::new(7, "Issue", "Problem", reporter());

    let suggestion = service.suggest(&ticket).await.unwrap();
    let json = serde_json::to_value(&suggestion).unwrap();

    assert_eq!(json["ticket_id"], 7);
    assert_eq!(json["method"], "rules");
    assert!(json.get("reasoning").is_none());
    assert!(json.get("fallback").is_none());
}
