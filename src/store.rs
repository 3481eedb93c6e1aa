//! Visit storage.
//!
//! The store is the only stateful collaborator of the analysis service. It
//! answers time-range queries with a materialized list of records.

use crate::visit::VisitRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Source and sink of visit records.
#[async_trait]
pub trait VisitStore: Send + Sync {
    /// Visits with `start <= timestamp <= end`, oldest first.
    async fn fetch_visits(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<VisitRecord>>;

    /// Visits from one IP with `start <= timestamp <= end`, oldest first.
    ///
    /// `ip` is matched against [`VisitRecord::ip_key`], so `"unknown"`
    /// selects the visits recorded without an address.
    async fn fetch_visits_for_ip(
        &self,
        ip: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<VisitRecord>>;

    /// Persist a new visit.
    async fn record_visit(&self, record: VisitRecord) -> anyhow::Result<()>;

    /// Drop visits older than `cutoff`, returning how many were removed.
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> anyhow::Result<usize>;
}

/// Bounded in-memory visit store.
///
/// Records are kept in timestamp order; once `max_records` is reached the
/// oldest record is evicted. A record older than everything held by a full
/// store is dropped instead.
pub struct MemoryVisitStore {
    records: RwLock<VecDeque<VisitRecord>>,
    max_records: usize,
}

impl MemoryVisitStore {
    pub fn new(max_records: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            max_records: max_records.max(1),
        }
    }

    /// Create a store seeded from a JSON array of visit records.
    pub fn from_json_file(path: &Path, max_records: usize) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
        let mut visits: Vec<VisitRecord> = serde_json::from_str(&content)?;
        visits.sort_by_key(|v| v.timestamp);

        let skip = visits.len().saturating_sub(max_records.max(1));
        let records: VecDeque<VisitRecord> = visits.into_iter().skip(skip).collect();

        info!(
            path = %path.display(),
            loaded = records.len(),
            dropped = skip,
            "Seeded visit store"
        );

        Ok(Self {
            records: RwLock::new(records),
            max_records: max_records.max(1),
        })
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn in_range(record: &VisitRecord, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        record.timestamp >= start && record.timestamp <= end
    }
}

impl Default for MemoryVisitStore {
    fn default() -> Self {
        Self::new(1_000_000)
    }
}

#[async_trait]
impl VisitStore for MemoryVisitStore {
    async fn fetch_visits(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<VisitRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| Self::in_range(r, start, end))
            .cloned()
            .collect())
    }

    async fn fetch_visits_for_ip(
        &self,
        ip: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<VisitRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.ip_key() == ip && Self::in_range(r, start, end))
            .cloned()
            .collect())
    }

    async fn record_visit(&self, record: VisitRecord) -> anyhow::Result<()> {
        let mut records = self.records.write().await;

        // Late arrivals are inserted in order; the common case appends.
        let mut pos = records.partition_point(|r| r.timestamp <= record.timestamp);

        if records.len() >= self.max_records {
            if pos == 0 {
                debug!(timestamp = %record.timestamp, "Dropped visit older than a full store");
                return Ok(());
            }
            records.pop_front();
            pos -= 1;
        }

        records.insert(pos, record);
        Ok(())
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> anyhow::Result<usize> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.timestamp >= cutoff);
        let removed = before - records.len();
        debug!(removed, remaining = records.len(), "Purged old visits");
        Ok(removed)
    }
}
