//! Configuration types for the bot traffic analytics service.

use serde::{Deserialize, Serialize};

/// Main configuration for the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Classification and aggregation settings
    pub classifier: ClassifierConfig,

    /// Bot signature settings
    pub patterns: PatternConfig,

    /// Visit store settings
    pub store: StoreConfig,

    /// HTTP server settings
    pub server: ServerConfig,
}

/// Thresholds and caps used by the visit classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// User-Agents shorter than this (in characters) are treated as fake
    pub min_user_agent_length: usize,

    /// An IP with strictly more requests than this is suspicious
    pub suspicious_ip_min_requests: usize,

    /// Visits sampled per suspicious IP
    pub suspicious_ip_sample_size: usize,

    /// Mean interval below which an IP is rapid-fire (ms)
    pub rapid_fire_avg_interval_ms: f64,

    /// Minimum interval below which an IP is rapid-fire (ms)
    pub rapid_fire_min_interval_ms: i64,

    /// Number of User-Agents kept in the report
    pub top_user_agents: usize,

    /// Maximum reported User-Agent length (characters)
    pub user_agent_display_length: usize,

    /// Bot visits sampled for manual inspection
    pub bot_sample_size: usize,

    /// Per-IP profile: mean interval below which the IP is suspicious (ms)
    pub ip_suspicious_avg_interval_ms: f64,

    /// Per-IP profile: an IP with more visits than this is suspicious
    pub ip_suspicious_max_visits: usize,

    /// Per-IP profile: recent visits included
    pub ip_recent_visits: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_user_agent_length: 20,
            suspicious_ip_min_requests: 20,
            suspicious_ip_sample_size: 10,
            rapid_fire_avg_interval_ms: 5000.0,
            rapid_fire_min_interval_ms: 1000,
            top_user_agents: 20,
            user_agent_display_length: 100,
            bot_sample_size: 50,
            ip_suspicious_avg_interval_ms: 5000.0,
            ip_suspicious_max_visits: 50,
            ip_recent_visits: 20,
        }
    }
}

/// A named bot signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureDef {
    /// Identifier reported when the signature matches
    pub name: String,

    /// Regular expression, matched case-insensitively
    pub pattern: String,
}

/// Bot signature configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Ordered signatures replacing the built-in set when non-empty
    pub signatures: Vec<SignatureDef>,
}

/// Visit store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum records held in memory
    pub max_records: usize,

    /// Records older than this are purged
    pub retention_days: u32,

    /// Interval between retention passes in seconds
    pub purge_interval_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_records: 1_000_000,
            retention_days: 90,
            purge_interval_seconds: 3600,
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Largest window a report may request
    pub max_window_days: u32,

    /// Trust X-Forwarded-For / X-Real-IP for the client address
    pub trust_proxy_headers: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_window_days: 365,
            trust_proxy_headers: true,
        }
    }
}
