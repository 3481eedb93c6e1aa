//! Single-IP activity profile.

use super::timing::interval_stats;
use super::{user_agent_label, VisitClassifier};
use crate::error::AnalysisError;
use crate::report::{round2, ClassificationResult, IpActivityProfile};
use crate::visit::{VisitRecord, WindowDays};
use std::collections::HashSet;

impl VisitClassifier {
    /// Profile one IP's activity over the window.
    ///
    /// Only records whose IP equals `ip` are considered. Unlike
    /// [`VisitClassifier::analyze`], having no such records is an error.
    pub fn analyze_ip(
        &self,
        ip: &str,
        records: &[VisitRecord],
        window: WindowDays,
    ) -> Result<IpActivityProfile, AnalysisError> {
        let visits: Vec<&VisitRecord> = records.iter().filter(|r| r.ip_key() == ip).collect();

        let first_seen = visits.iter().map(|r| r.timestamp).min();
        let last_seen = visits.iter().map(|r| r.timestamp).max();
        let (Some(first_seen), Some(last_seen)) = (first_seen, last_seen) else {
            return Err(AnalysisError::IpNotFound(ip.to_string()));
        };

        let verdicts: Vec<ClassificationResult> = visits
            .iter()
            .map(|r| self.classify(r.user_agent.as_deref()))
            .collect();
        let bot_visits = verdicts.iter().filter(|v| v.is_bot).count();

        let timestamps: Vec<i64> = visits.iter().map(|r| r.timestamp_ms()).collect();
        let timing = interval_stats(&timestamps);
        let fast = timing
            .is_some_and(|t| t.average_interval_ms < self.config.ip_suspicious_avg_interval_ms);

        let unique_paths = visits.iter().map(|r| r.path.as_str()).collect::<HashSet<_>>().len();
        let unique_user_agents = visits
            .iter()
            .map(|r| user_agent_label(r))
            .collect::<HashSet<_>>()
            .len();

        let mut order: Vec<usize> = (0..visits.len()).collect();
        order.sort_by(|&a, &b| visits[b].timestamp.cmp(&visits[a].timestamp));
        let recent_visits = order
            .into_iter()
            .take(self.config.ip_recent_visits)
            .map(|i| self.sample(visits[i], &verdicts[i]))
            .collect();

        let total_visits = visits.len();

        Ok(IpActivityProfile {
            ip: ip.to_string(),
            window_days: window.days(),
            total_visits,
            avg_visits_per_day: round2(total_visits as f64 / f64::from(window.days())),
            bot_visits,
            unique_paths,
            unique_user_agents,
            first_seen,
            last_seen,
            timing: timing.map(|t| t.rounded()),
            is_suspicious: fast || total_visits > self.config.ip_suspicious_max_visits,
            recent_visits,
        })
    }
}
