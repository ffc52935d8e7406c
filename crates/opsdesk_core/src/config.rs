//! Core configuration - triage keyword rules and exchange fallback data.
//!
//! Loaded from a TOML file. Every section and field has a default, so a
//! missing or partial file still yields a working configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

// ============================================================================
// Triage
// ============================================================================

/// Keyword lists driving the priority and status rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    /// Substrings of title+description that force high priority
    #[serde(default = "default_high_priority_keywords")]
    pub high_priority: Vec<String>,

    /// Substrings that indicate low-priority work
    #[serde(default = "default_low_priority_keywords")]
    pub low_priority: Vec<String>,

    /// Substrings of the description that indicate the issue is resolved
    #[serde(default = "default_resolution_keywords")]
    pub resolution: Vec<String>,
}

fn default_high_priority_keywords() -> Vec<String> {
    [
        "urgent",
        "critical",
        "down",
        "outage",
        "broken",
        "error 500",
        "cannot login",
        "security",
        "data loss",
        "crash",
        "fatal",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_low_priority_keywords() -> Vec<String> {
    [
        "feature request",
        "enhancement",
        "nice to have",
        "cosmetic",
        "minor",
        "typo",
        "documentation",
        "suggestion",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_resolution_keywords() -> Vec<String> {
    ["fixed", "resolved", "completed", "done", "solved"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            high_priority: default_high_priority_keywords(),
            low_priority: default_low_priority_keywords(),
            resolution: default_resolution_keywords(),
        }
    }
}

/// Mock LLM analysis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Route triage through the mock LLM analysis instead of plain rules
    #[serde(default)]
    pub enabled: bool,

    /// Simulated processing delay in milliseconds
    #[serde(default = "default_llm_delay_ms")]
    pub simulated_delay_ms: u64,
}

fn default_llm_delay_ms() -> u64 {
    100
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            simulated_delay_ms: default_llm_delay_ms(),
        }
    }
}

/// Triage rule configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfig {
    #[serde(default)]
    pub keywords: KeywordConfig,

    /// In-progress tickets older than this many whole days get a resolved suggestion
    #[serde(default = "default_resolved_after_days")]
    pub resolved_after_days: i64,

    #[serde(default)]
    pub llm: LlmConfig,
}

fn default_resolved_after_days() -> i64 {
    7
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            keywords: KeywordConfig::default(),
            resolved_after_days: default_resolved_after_days(),
            llm: LlmConfig::default(),
        }
    }
}

// ============================================================================
// Exchange rates
// ============================================================================

/// Operator-configured constant rate table, used as the last fallback layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticFallback {
    #[serde(default = "default_base_currency")]
    pub base: String,

    #[serde(default = "default_static_rates")]
    pub rates: HashMap<String, f64>,
}

fn default_base_currency() -> String {
    "USD".to_string()
}

fn default_static_rates() -> HashMap<String, f64> {
    HashMap::from([("EUR".to_string(), 0.92), ("PLN".to_string(), 4.10)])
}

impl Default for StaticFallback {
    fn default() -> Self {
        Self {
            base: default_base_currency(),
            rates: default_static_rates(),
        }
    }
}

/// Exchange rate service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default = "default_base_currency")]
    pub default_base: String,

    #[serde(default = "default_symbols")]
    pub default_symbols: Vec<String>,

    /// Serve the static rate table when the API is down and nothing is cached
    #[serde(default = "default_true")]
    pub use_static_fallback: bool,

    #[serde(default)]
    pub static_fallback: StaticFallback,
}

fn default_symbols() -> Vec<String> {
    vec!["EUR".to_string(), "PLN".to_string()]
}

fn default_true() -> bool {
    true
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            default_base: default_base_currency(),
            default_symbols: default_symbols(),
            use_static_fallback: true,
            static_fallback: StaticFallback::default(),
        }
    }
}

// ============================================================================
// Top level
// ============================================================================

/// Full core configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub triage: TriageConfig,

    #[serde(default)]
    pub exchange: ExchangeConfig,
}

impl CoreConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load from a path, falling back to defaults when the file is missing
    /// or unreadable
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            warn!("Using default configuration: {:#}", e);
            Self::default()
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_carry_keyword_lists() {
        let config = CoreConfig::default();

        assert!(config
            .triage
            .keywords
            .high_priority
            .contains(&"error 500".to_string()));
        assert!(config
            .triage
            .keywords
            .low_priority
            .contains(&"enhancement".to_string()));
        assert!(config
            .triage
            .keywords
            .resolution
            .contains(&"fixed".to_string()));
        assert_eq!(config.triage.resolved_after_days, 7);
        assert!(!config.triage.llm.enabled);
        assert_eq!(config.triage.llm.simulated_delay_ms, 100);
    }

    #[test]
    fn test_defaults_carry_static_fallback() {
        let config = CoreConfig::default();

        assert_eq!(config.exchange.default_base, "USD");
        assert_eq!(config.exchange.default_symbols, vec!["EUR", "PLN"]);
        assert!(config.exchange.use_static_fallback);
        assert_eq!(config.exchange.static_fallback.base, "USD");
        assert_eq!(config.exchange.static_fallback.rates["EUR"], 0.92);
        assert_eq!(config.exchange.static_fallback.rates["PLN"], 4.10);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config: CoreConfig = toml::from_str(
            r#"
            [triage]
            resolved_after_days = 14

            [triage.llm]
            enabled = true
            simulated_delay_ms = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.triage.resolved_after_days, 14);
        assert!(config.triage.llm.enabled);
        assert_eq!(config.triage.llm.simulated_delay_ms, 0);
        // Untouched sections keep their defaults
        assert!(!config.triage.keywords.high_priority.is_empty());
        assert_eq!(config.exchange.default_base, "USD");
    }

    #[test]
    fn test_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("core.toml");

        let mut config = CoreConfig::default();
        config.exchange.use_static_fallback = false;
        std::fs::write(&path, toml::to_string(&config).unwrap()).unwrap();

        let loaded = CoreConfig::load(&path).unwrap();
        assert!(!loaded.exchange.use_static_fallback);
        assert_eq!(loaded.triage.resolved_after_days, 7);
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let config = CoreConfig::load_or_default(Path::new("/nonexistent/core.toml"));
        assert_eq!(config.exchange.default_base, "USD");
    }
}
