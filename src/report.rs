//! Classification results and report types.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Why a visit was classified as a bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotReason {
    /// No User-Agent header, or an empty one
    NoUserAgent,
    /// Matched the named bot signature
    Pattern(String),
    /// User-Agent below the minimum plausible length
    TooShort,
}

impl fmt::Display for BotReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BotReason::NoUserAgent => f.write_str("no user-agent"),
            BotReason::Pattern(name) => write!(f, "matched bot pattern: {}", name),
            BotReason::TooShort => f.write_str("too short, likely fake"),
        }
    }
}

impl Serialize for BotReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Verdict for a single visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub is_bot: bool,
    pub reason: Option<BotReason>,
}

impl ClassificationResult {
    pub fn bot(reason: BotReason) -> Self {
        Self {
            is_bot: true,
            reason: Some(reason),
        }
    }

    pub fn human() -> Self {
        Self {
            is_bot: false,
            reason: None,
        }
    }
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part / total * 100`, with an empty total yielding zero.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(part as f64 / total as f64 * 100.0)
}

/// Truncate to at most `max_chars` characters.
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

/// A visit as shown in report samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitSample {
    pub timestamp: DateTime<Utc>,
    pub ip: String,
    pub path: String,
    pub user_agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<BotReason>,
}

/// Headline counts for the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub window_days: u32,
    pub total_visits: usize,
    pub bot_visits: usize,
    pub human_visits: usize,
    pub bot_percentage: f64,
    pub human_percentage: f64,
}

/// An IP that exceeded the request-count threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspiciousIp {
    pub ip: String,
    pub count: usize,
    pub avg_requests_per_day: f64,
    pub recent_visits: Vec<VisitSample>,
}

/// An IP whose consecutive requests arrive too close together.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RapidFireIp {
    pub ip: String,
    pub request_count: usize,
    pub average_interval_ms: f64,
    pub min_interval_ms: i64,
}

/// Frequency of one User-Agent string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAgentStat {
    pub user_agent: String,
    pub count: usize,
    pub percentage: f64,
    pub is_bot: bool,
    pub reason: Option<BotReason>,
}

/// Bot share of one path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStat {
    pub path: String,
    pub total: usize,
    pub bots: usize,
    pub humans: usize,
    pub bot_percentage: f64,
}

/// Everything computed for one analysis window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    pub summary: ReportSummary,
    pub suspicious_ips: Vec<SuspiciousIp>,
    pub rapid_fire_ips: Vec<RapidFireIp>,
    pub user_agents: Vec<UserAgentStat>,
    pub paths: Vec<PathStat>,
    pub devices: BTreeMap<String, usize>,
    pub browsers: BTreeMap<String, usize>,
    pub bot_samples: Vec<VisitSample>,
}

/// Consecutive-request timing for one IP.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalStats {
    pub average_interval_ms: f64,
    pub min_interval_ms: i64,
    pub max_interval_ms: i64,
}

/// Activity of a single IP over the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpActivityProfile {
    pub ip: String,
    pub window_days: u32,
    pub total_visits: usize,
    pub avg_visits_per_day: f64,
    pub bot_visits: usize,
    pub unique_paths: usize,
    pub unique_user_agents: usize,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Absent with fewer than two requests
    pub timing: Option<IntervalStats>,
    pub is_suspicious: bool,
    pub recent_visits: Vec<VisitSample>,
}
