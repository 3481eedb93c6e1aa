//! Visit classification and traffic analysis.
//!
//! The classifier is a pure component: it never performs I/O and holds no
//! state between calls. Records are fetched by the caller and passed in as
//! a materialized slice.

mod aggregate;
pub mod patterns;
mod profile;
pub mod timing;

pub use patterns::{BotPatternSet, BotSignature};

use crate::config::{AnalyticsConfig, ClassifierConfig};
use crate::report::{truncate_chars, BotReason, ClassificationResult, VisitSample};
use crate::visit::VisitRecord;
use std::collections::HashMap;
use std::hash::Hash;

/// Label used for visits without a User-Agent in reports.
pub const UNKNOWN_USER_AGENT: &str = "Unknown";

/// Classifies visits as bot or human and aggregates them into reports.
#[derive(Debug, Clone)]
pub struct VisitClassifier {
    patterns: BotPatternSet,
    config: ClassifierConfig,
}

impl VisitClassifier {
    /// Create a classifier with an explicit signature set.
    pub fn new(patterns: BotPatternSet, config: ClassifierConfig) -> Self {
        Self { patterns, config }
    }

    /// Build from service configuration, compiling any custom signatures.
    pub fn from_config(config: &AnalyticsConfig) -> anyhow::Result<Self> {
        let patterns = BotPatternSet::from_config_or_default(&config.patterns.signatures)?;
        Ok(Self::new(patterns, config.classifier.clone()))
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn patterns(&self) -> &BotPatternSet {
        &self.patterns
    }

    /// Classify a single User-Agent.
    ///
    /// Absent and empty values are bots, as are values matching a signature
    /// or shorter than the configured minimum length.
    pub fn classify(&self, user_agent: Option<&str>) -> ClassificationResult {
        let ua = match user_agent {
            Some(ua) if !ua.is_empty() => ua,
            _ => return ClassificationResult::bot(BotReason::NoUserAgent),
        };

        if let Some(name) = self.patterns.first_match(ua) {
            return ClassificationResult::bot(BotReason::Pattern(name.to_string()));
        }

        if ua.chars().count() < self.config.min_user_agent_length {
            return ClassificationResult::bot(BotReason::TooShort);
        }

        ClassificationResult::human()
    }

    /// Report view of a visit, with the User-Agent truncated for display.
    fn sample(&self, record: &VisitRecord, verdict: &ClassificationResult) -> VisitSample {
        VisitSample {
            timestamp: record.timestamp,
            ip: record.ip_key().to_string(),
            path: record.path.clone(),
            user_agent: truncate_chars(
                user_agent_label(record),
                self.config.user_agent_display_length,
            ),
            reason: verdict.reason.clone(),
        }
    }
}

impl Default for VisitClassifier {
    fn default() -> Self {
        Self::new(BotPatternSet::default(), ClassifierConfig::default())
    }
}

/// User-Agent as grouped in reports; absent and empty values share a label.
fn user_agent_label(record: &VisitRecord) -> &str {
    match record.user_agent.as_deref() {
        Some(ua) if !ua.is_empty() => ua,
        _ => UNKNOWN_USER_AGENT,
    }
}

/// Group item indices by key, keeping groups in first-seen order.
fn group_indices<K, I>(keys: I) -> Vec<(K, Vec<usize>)>
where
    K: Hash + Eq + Clone,
    I: IntoIterator<Item = K>,
{
    let mut positions: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<usize>)> = Vec::new();

    for (idx, key) in keys.into_iter().enumerate() {
        match positions.get(&key) {
            Some(&pos) => groups[pos].1.push(idx),
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push((key, vec![idx]));
            }
        }
    }

    groups
}
