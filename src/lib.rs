//! Bot traffic analytics for a small content website.
//!
//! Records page views and reports how much of the traffic is automated.
//!
//! # Features
//!
//! - User-Agent classification against an ordered signature table
//! - Window reports: bot share, suspicious and rapid-fire IPs, top
//!   User-Agents, per-path bot share, device and browser tallies
//! - Per-IP activity profiles with request timing statistics
//! - Bounded in-memory visit store with retention
//!
//! # Example
//!
//! ```ignore
//! use bot_traffic_analytics::{VisitClassifier, WindowDays};
//!
//! let classifier = VisitClassifier::default();
//! let report = classifier.analyze(&records, WindowDays::new(7)?);
//! ```

pub mod classifier;
pub mod config;
pub mod error;
pub mod ingest;
pub mod report;
pub mod server;
pub mod service;
pub mod store;
pub mod visit;

pub use classifier::{BotPatternSet, VisitClassifier};
pub use config::AnalyticsConfig;
pub use error::AnalysisError;
pub use report::{AggregateReport, BotReason, ClassificationResult, IpActivityProfile};
pub use service::BotAnalysisService;
pub use store::{MemoryVisitStore, VisitStore};
pub use visit::{VisitRecord, WindowDays};
