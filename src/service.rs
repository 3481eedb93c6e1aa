//! Analysis service.
//!
//! Each request runs in two phases: fetch the window from the store, then
//! hand the materialized records to the classifier.

use crate::classifier::VisitClassifier;
use crate::config::AnalyticsConfig;
use crate::error::AnalysisError;
use crate::ingest::describe_user_agent;
use crate::report::{AggregateReport, ClassificationResult, IpActivityProfile};
use crate::store::VisitStore;
use crate::visit::{VisitRecord, WindowDays};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Visit to be recorded, as received from a page view.
#[derive(Debug, Clone, Default)]
pub struct TrackRequest {
    pub path: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub session_id: Option<String>,
}

/// Bot traffic analysis over a visit store.
pub struct BotAnalysisService {
    config: AnalyticsConfig,
    classifier: VisitClassifier,
    store: Arc<dyn VisitStore>,
}

impl BotAnalysisService {
    /// Create a service from configuration.
    pub fn new(config: AnalyticsConfig, store: Arc<dyn VisitStore>) -> anyhow::Result<Self> {
        let classifier = VisitClassifier::from_config(&config)?;
        info!(
            signatures = classifier.patterns().len(),
            custom = !config.patterns.signatures.is_empty(),
            "Visit classifier ready"
        );
        Ok(Self {
            config,
            classifier,
            store,
        })
    }

    /// Create with an explicit classifier.
    pub fn with_classifier(
        config: AnalyticsConfig,
        classifier: VisitClassifier,
        store: Arc<dyn VisitStore>,
    ) -> Self {
        Self {
            config,
            classifier,
            store,
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn classifier(&self) -> &VisitClassifier {
        &self.classifier
    }

    pub fn store(&self) -> &Arc<dyn VisitStore> {
        &self.store
    }

    /// Parse a window from a query value, applying the configured maximum.
    pub fn parse_window(&self, raw: Option<&str>) -> Result<WindowDays, AnalysisError> {
        match raw {
            None => Ok(WindowDays::default()),
            Some(raw) => WindowDays::parse_bounded(raw, self.config.server.max_window_days),
        }
    }

    pub fn classify(&self, user_agent: Option<&str>) -> ClassificationResult {
        self.classifier.classify(user_agent)
    }

    /// Aggregate report for the window ending now.
    pub async fn report(&self, window: WindowDays) -> Result<AggregateReport, AnalysisError> {
        self.report_at(window, Utc::now()).await
    }

    /// Aggregate report for the window ending at `now`.
    pub async fn report_at(
        &self,
        window: WindowDays,
        now: DateTime<Utc>,
    ) -> Result<AggregateReport, AnalysisError> {
        let (start, end) = window.range_ending(now);
        let records = self.store.fetch_visits(start, end).await?;

        let report = self.classifier.analyze(&records, window);

        info!(
            window = %window,
            total = report.summary.total_visits,
            bots = report.summary.bot_visits,
            suspicious_ips = report.suspicious_ips.len(),
            rapid_fire_ips = report.rapid_fire_ips.len(),
            "Bot analysis complete"
        );

        Ok(report)
    }

    /// Activity profile of one IP for the window ending now.
    pub async fn ip_profile(
        &self,
        ip: &str,
        window: WindowDays,
    ) -> Result<IpActivityProfile, AnalysisError> {
        self.ip_profile_at(ip, window, Utc::now()).await
    }

    /// Activity profile of one IP for the window ending at `now`.
    pub async fn ip_profile_at(
        &self,
        ip: &str,
        window: WindowDays,
        now: DateTime<Utc>,
    ) -> Result<IpActivityProfile, AnalysisError> {
        let (start, end) = window.range_ending(now);
        let records = self.store.fetch_visits_for_ip(ip, start, end).await?;

        let profile = self.classifier.analyze_ip(ip, &records, window)?;

        debug!(
            ip = %ip,
            window = %window,
            visits = profile.total_visits,
            suspicious = profile.is_suspicious,
            "IP analysis complete"
        );

        Ok(profile)
    }

    /// Record a page view, deriving device and browser from the User-Agent.
    pub async fn track(&self, request: TrackRequest) -> anyhow::Result<()> {
        self.track_at(request, Utc::now()).await
    }

    pub async fn track_at(&self, request: TrackRequest, now: DateTime<Utc>) -> anyhow::Result<()> {
        let (device, browser) = describe_user_agent(request.user_agent.as_deref());
        let record = VisitRecord {
            timestamp: now,
            ip: request.ip,
            user_agent: request.user_agent,
            path: request.path,
            session_id: request.session_id,
            device: Some(device),
            browser: Some(browser),
        };

        debug!(
            ip = record.ip.as_deref().unwrap_or("-"),
            path = %record.path,
            "Recording visit"
        );

        self.store.record_visit(record).await
    }

    /// Remove visits beyond the retention period.
    pub async fn purge_expired(&self) -> anyhow::Result<usize> {
        let cutoff = Utc::now() - Duration::days(i64::from(self.config.store.retention_days));
        let removed = self.store.purge_before(cutoff).await?;
        if removed > 0 {
            info!(removed, cutoff = %cutoff, "Purged expired visits");
        }
        Ok(removed)
    }
}
