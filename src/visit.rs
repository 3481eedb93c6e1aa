//! Visit records and the analysis window.

use crate::error::AnalysisError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Key used when a record carries no client IP.
pub const UNKNOWN_IP: &str = "unknown";

/// One recorded page view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecord {
    /// When the visit happened
    pub timestamp: DateTime<Utc>,

    /// Client IP address, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    /// Raw User-Agent header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Requested path
    pub path: String,

    /// Session grouping key assigned at ingestion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Coarse device type assigned at ingestion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,

    /// Browser family assigned at ingestion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
}

impl VisitRecord {
    /// Create a record with only the required fields.
    pub fn new(timestamp: DateTime<Utc>, path: impl Into<String>) -> Self {
        Self {
            timestamp,
            ip: None,
            user_agent: None,
            path: path.into(),
            session_id: None,
            device: None,
            browser: None,
        }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_device(mut self, device: impl Into<String>, browser: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self.browser = Some(browser.into());
        self
    }

    /// IP used for grouping; absent addresses share one bucket.
    pub fn ip_key(&self) -> &str {
        self.ip.as_deref().unwrap_or(UNKNOWN_IP)
    }

    /// Milliseconds since the Unix epoch.
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// Number of trailing days covered by an analysis.
///
/// Always at least one; construct through [`WindowDays::new`] or parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct WindowDays(u32);

impl WindowDays {
    pub const DEFAULT: WindowDays = WindowDays(7);

    pub fn new(days: u32) -> Result<Self, AnalysisError> {
        if days == 0 {
            return Err(AnalysisError::InvalidWindow(
                "window must be at least one day".to_string(),
            ));
        }
        Ok(Self(days))
    }

    /// Parse and additionally enforce an upper bound.
    pub fn parse_bounded(raw: &str, max_days: u32) -> Result<Self, AnalysisError> {
        let window: WindowDays = raw.parse()?;
        if window.0 > max_days {
            return Err(AnalysisError::InvalidWindow(format!(
                "window of {} days exceeds the maximum of {}",
                window.0, max_days
            )));
        }
        Ok(window)
    }

    pub fn days(&self) -> u32 {
        self.0
    }

    /// Time range `[now - days, now]`.
    pub fn range_ending(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now - Duration::days(i64::from(self.0)), now)
    }
}

impl Default for WindowDays {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for WindowDays {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let days: i64 = trimmed.parse().map_err(|_| {
            AnalysisError::InvalidWindow(format!("'{}' is not a whole number of days", trimmed))
        })?;
        if days <= 0 {
            return Err(AnalysisError::InvalidWindow(
                "window must be at least one day".to_string(),
            ));
        }
        let days = u32::try_from(days)
            .map_err(|_| AnalysisError::InvalidWindow(format!("window of {} days is too large", days)))?;
        Self::new(days)
    }
}

impl fmt::Display for WindowDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.0)
    }
}
