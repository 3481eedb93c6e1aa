//! Window-wide traffic aggregation.

use super::timing::interval_stats;
use super::{group_indices, user_agent_label, VisitClassifier};
use crate::report::{
    percentage, round2, truncate_chars, AggregateReport, ClassificationResult, PathStat,
    RapidFireIp, ReportSummary, SuspiciousIp, UserAgentStat, VisitSample,
};
use crate::visit::{VisitRecord, WindowDays};
use std::collections::BTreeMap;

const UNKNOWN_DEVICE: &str = "unknown";
const UNKNOWN_BROWSER: &str = "Unknown";

impl VisitClassifier {
    /// Classify every record and aggregate the window into a report.
    ///
    /// Records are expected to be already limited to the window. An empty
    /// slice yields a zero-filled report.
    pub fn analyze(&self, records: &[VisitRecord], window: WindowDays) -> AggregateReport {
        let verdicts: Vec<ClassificationResult> = records
            .iter()
            .map(|r| self.classify(r.user_agent.as_deref()))
            .collect();

        let total = records.len();
        let bot_visits = verdicts.iter().filter(|v| v.is_bot).count();
        let human_visits = total - bot_visits;

        let summary = ReportSummary {
            window_days: window.days(),
            total_visits: total,
            bot_visits,
            human_visits,
            bot_percentage: percentage(bot_visits, total),
            human_percentage: percentage(human_visits, total),
        };

        let by_ip = group_indices(records.iter().map(|r| r.ip_key()));

        AggregateReport {
            summary,
            suspicious_ips: self.suspicious_ips(records, &verdicts, &by_ip, window),
            rapid_fire_ips: self.rapid_fire_ips(records, &by_ip),
            user_agents: self.user_agent_stats(records, &verdicts),
            paths: path_stats(records, &verdicts),
            devices: tally(records.iter().map(|r| r.device.as_deref().unwrap_or(UNKNOWN_DEVICE))),
            browsers: tally(records.iter().map(|r| r.browser.as_deref().unwrap_or(UNKNOWN_BROWSER))),
            bot_samples: self.bot_samples(records, &verdicts),
        }
    }

    fn suspicious_ips(
        &self,
        records: &[VisitRecord],
        verdicts: &[ClassificationResult],
        by_ip: &[(&str, Vec<usize>)],
        window: WindowDays,
    ) -> Vec<SuspiciousIp> {
        let mut suspicious: Vec<SuspiciousIp> = by_ip
            .iter()
            .filter(|(_, idxs)| idxs.len() > self.config.suspicious_ip_min_requests)
            .map(|(ip, idxs)| SuspiciousIp {
                ip: ip.to_string(),
                count: idxs.len(),
                avg_requests_per_day: round2(idxs.len() as f64 / f64::from(window.days())),
                recent_visits: self.most_recent(
                    records,
                    verdicts,
                    idxs,
                    self.config.suspicious_ip_sample_size,
                ),
            })
            .collect();

        // Stable: equal counts keep first-seen order
        suspicious.sort_by(|a, b| b.count.cmp(&a.count));
        suspicious
    }

    fn rapid_fire_ips(&self, records: &[VisitRecord], by_ip: &[(&str, Vec<usize>)]) -> Vec<RapidFireIp> {
        let mut rapid: Vec<RapidFireIp> = Vec::new();

        for (ip, idxs) in by_ip {
            let timestamps: Vec<i64> = idxs.iter().map(|&i| records[i].timestamp_ms()).collect();
            let Some(stats) = interval_stats(&timestamps) else {
                continue;
            };

            if stats.average_interval_ms < self.config.rapid_fire_avg_interval_ms
                || stats.min_interval_ms < self.config.rapid_fire_min_interval_ms
            {
                rapid.push(RapidFireIp {
                    ip: ip.to_string(),
                    request_count: idxs.len(),
                    average_interval_ms: round2(stats.average_interval_ms),
                    min_interval_ms: stats.min_interval_ms,
                });
            }
        }

        rapid.sort_by_key(|r| r.min_interval_ms);
        rapid
    }

    fn user_agent_stats(
        &self,
        records: &[VisitRecord],
        verdicts: &[ClassificationResult],
    ) -> Vec<UserAgentStat> {
        let total = records.len();
        let mut groups = group_indices(records.iter().map(user_agent_label));
        groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

        groups
            .into_iter()
            .take(self.config.top_user_agents)
            .map(|(ua, idxs)| {
                let verdict = &verdicts[idxs[0]];
                UserAgentStat {
                    user_agent: truncate_chars(ua, self.config.user_agent_display_length),
                    count: idxs.len(),
                    percentage: percentage(idxs.len(), total),
                    is_bot: verdict.is_bot,
                    reason: verdict.reason.clone(),
                }
            })
            .collect()
    }

    fn bot_samples(&self, records: &[VisitRecord], verdicts: &[ClassificationResult]) -> Vec<VisitSample> {
        let bot_idxs: Vec<usize> = (0..records.len()).filter(|&i| verdicts[i].is_bot).collect();
        self.most_recent(records, verdicts, &bot_idxs, self.config.bot_sample_size)
    }

    /// Up to `limit` of the given records, newest first.
    fn most_recent(
        &self,
        records: &[VisitRecord],
        verdicts: &[ClassificationResult],
        idxs: &[usize],
        limit: usize,
    ) -> Vec<VisitSample> {
        let mut sorted = idxs.to_vec();
        sorted.sort_by(|&a, &b| records[b].timestamp.cmp(&records[a].timestamp));
        sorted
            .into_iter()
            .take(limit)
            .map(|i| self.sample(&records[i], &verdicts[i]))
            .collect()
    }
}

fn path_stats(records: &[VisitRecord], verdicts: &[ClassificationResult]) -> Vec<PathStat> {
    let mut stats: Vec<PathStat> = group_indices(records.iter().map(|r| r.path.as_str()))
        .into_iter()
        .map(|(path, idxs)| {
            let bots = idxs.iter().filter(|&&i| verdicts[i].is_bot).count();
            PathStat {
                path: path.to_string(),
                total: idxs.len(),
                bots,
                humans: idxs.len() - bots,
                bot_percentage: percentage(bots, idxs.len()),
            }
        })
        .collect();

    stats.sort_by(|a, b| b.total.cmp(&a.total));
    stats
}

fn tally<'a>(keys: impl Iterator<Item = &'a str>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }
    counts
}
