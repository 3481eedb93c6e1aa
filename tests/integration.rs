//! Integration tests for bot traffic analytics.
//!
//! These tests exercise the public API end to end: configuration parsing,
//! User-Agent classification, window reports, IP profiles, the visit store
//! and the HTTP surface.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bot_traffic_analytics::config::{ClassifierConfig, SignatureDef};
use bot_traffic_analytics::{
    server, AnalysisError, AnalyticsConfig, BotAnalysisService, BotPatternSet, BotReason,
    MemoryVisitStore, VisitClassifier, VisitRecord, VisitStore, WindowDays,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use tower::ServiceExt;

const CHROME_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0 Safari/537.36";

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap()
}

fn visit(ip: &str, ua: &str, path: &str, offset_ms: i64) -> VisitRecord {
    VisitRecord::new(base() + Duration::milliseconds(offset_ms), path)
        .with_ip(ip)
        .with_user_agent(ua)
}

fn week() -> WindowDays {
    WindowDays::new(7).unwrap()
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_config_from_json() {
    let json = r#"{
        "classifier": {
            "min_user_agent_length": 25,
            "suspicious_ip_min_requests": 10
        },
        "patterns": {
            "signatures": [
                { "name": "internal-checker", "pattern": "checker/\\d+" }
            ]
        },
        "server": { "max_window_days": 30 }
    }"#;

    let config: AnalyticsConfig = serde_json::from_str(json).unwrap();

    assert_eq!(config.classifier.min_user_agent_length, 25);
    assert_eq!(config.classifier.suspicious_ip_min_requests, 10);
    assert_eq!(config.classifier.top_user_agents, 20);
    assert_eq!(config.patterns.signatures.len(), 1);
    assert_eq!(config.server.max_window_days, 30);
}

#[test]
fn test_empty_config_uses_defaults() {
    let config: AnalyticsConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config.classifier.min_user_agent_length, 20);
    assert_eq!(config.store.retention_days, 90);
    assert!(config.server.trust_proxy_headers);
}

#[test]
fn test_custom_signatures_replace_defaults() {
    let mut config = AnalyticsConfig::default();
    config.patterns.signatures = vec![
        SignatureDef { name: "healthcheck".to_string(), pattern: "healthcheck".to_string() },
        SignatureDef { name: "monitor".to_string(), pattern: "monitor".to_string() },
    ];

    let classifier = VisitClassifier::from_config(&config).unwrap();
    assert_eq!(classifier.patterns().len(), 2);
    assert_eq!(
        classifier.patterns().names().collect::<Vec<_>>(),
        vec!["healthcheck", "monitor"]
    );
    // curl is no longer a signature, but the string is too short
    assert_eq!(classifier.classify(Some("curl/8.0")).reason, Some(BotReason::TooShort));
}

// =============================================================================
// Classification Tests
// =============================================================================

#[test]
fn test_short_user_agents_always_bots() {
    let classifier = VisitClassifier::default();
    let mut ua = String::new();
    for _ in 0..20 {
        assert!(classifier.classify(Some(&ua)).is_bot, "'{}' should be a bot", ua);
        ua.push('a');
    }
}

#[test]
fn test_absent_and_empty_agree() {
    let classifier = VisitClassifier::default();
    assert_eq!(classifier.classify(None).is_bot, classifier.classify(Some("")).is_bot);
    assert_eq!(classifier.classify(None), classifier.classify(Some("")));
}

#[test]
fn test_blank_user_agent_is_not_missing() {
    let classifier = VisitClassifier::default();
    assert_eq!(classifier.classify(Some("    ")).reason, Some(BotReason::TooShort));
    assert!(!classifier.classify(Some(&" ".repeat(25))).is_bot);
}

#[test]
fn test_known_signatures() {
    let classifier = VisitClassifier::default();
    let cases = [
        "Mozilla/5.0 compatible; Googlebot/2.1",
        "Mozilla/5.0 (compatible; bingbot/2.0; +http://www.bing.com/bingbot.htm)",
        "facebookexternalhit/1.1 (+http://www.facebook.com/externalhit_uatext.php)",
        "python-requests/2.31.0",
        "Wget/1.21.4 (linux-gnu)",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 HeadlessChrome/120.0 Safari/537.36",
        "Mozilla/5.0 (compatible; AhrefsBot/7.0; +http://ahrefs.com/robot/)",
    ];
    for ua in cases {
        let result = classifier.classify(Some(ua));
        assert!(result.is_bot, "{} should be a bot", ua);
        assert!(
            matches!(result.reason, Some(BotReason::Pattern(_))),
            "{} should match a signature",
            ua
        );
    }
}

#[test]
fn test_regular_browsers_are_human() {
    let classifier = VisitClassifier::default();
    let cases = [
        CHROME_UA,
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
        "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1",
    ];
    for ua in cases {
        assert!(!VisitClassifier::default().classify(Some(ua)).is_bot, "{} should be human", ua);
        assert!(classifier.classify(Some(ua)).reason.is_none());
    }
}

#[test]
fn test_injected_pattern_set() {
    let patterns = BotPatternSet::from_defs(&[SignatureDef {
        name: "firefox".to_string(),
        pattern: "firefox".to_string(),
    }])
    .unwrap();
    let classifier = VisitClassifier::new(patterns, ClassifierConfig::default());
    let result = classifier.classify(Some(
        "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
    ));
    assert_eq!(result.reason, Some(BotReason::Pattern("firefox".to_string())));
}

// =============================================================================
// Report Tests
// =============================================================================

#[test]
fn test_empty_report() {
    let report = VisitClassifier::default().analyze(&[], week());
    assert_eq!(report.summary.total_visits, 0);
    assert_eq!(report.summary.bot_visits, 0);
    assert_eq!(report.summary.human_visits, 0);
    assert_eq!(report.summary.bot_percentage, 0.0);
    assert_eq!(report.summary.human_percentage, 0.0);
    assert!(report.suspicious_ips.is_empty());
    assert!(report.rapid_fire_ips.is_empty());
    assert!(report.user_agents.is_empty());
    assert!(report.paths.is_empty());
}

#[test]
fn test_suspicious_ip_counts() {
    let records: Vec<VisitRecord> = (0..25)
        .map(|i| visit("203.0.113.9", CHROME_UA, "/", i * 3_600_000))
        .collect();

    let report = VisitClassifier::default().analyze(&records, week());

    assert_eq!(report.suspicious_ips.len(), 1);
    let entry = &report.suspicious_ips[0];
    assert_eq!(entry.ip, "203.0.113.9");
    assert_eq!(entry.count, 25);
    assert_eq!(entry.avg_requests_per_day, 3.57);
    assert_eq!(entry.recent_visits.len(), 10);
    assert!(entry.recent_visits[0].timestamp > entry.recent_visits[9].timestamp);
}

#[test]
fn test_rapid_fire_pair() {
    let records = vec![
        visit("198.51.100.4", CHROME_UA, "/", 0),
        visit("198.51.100.4", CHROME_UA, "/tips", 500),
    ];

    let report = VisitClassifier::default().analyze(&records, week());

    assert_eq!(report.rapid_fire_ips.len(), 1);
    assert_eq!(report.rapid_fire_ips[0].ip, "198.51.100.4");
    assert_eq!(report.rapid_fire_ips[0].min_interval_ms, 500);
    assert_eq!(report.rapid_fire_ips[0].average_interval_ms, 500.0);
}

#[test]
fn test_report_is_identical_across_runs() {
    let mut records = Vec::new();
    for i in 0..120 {
        let ua = match i % 4 {
            0 => "curl/8.4.0",
            1 => "Mozilla/5.0 compatible; Googlebot/2.1",
            _ => CHROME_UA,
        };
        records.push(visit(&format!("192.0.2.{}", i % 7), ua, &format!("/match/{}", i % 9), i * 450));
    }

    let classifier = VisitClassifier::default();
    let first = serde_json::to_vec(&classifier.analyze(&records, week())).unwrap();
    let second = serde_json::to_vec(&classifier.analyze(&records, week())).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_missing_ip_grouped_as_unknown() {
    let records: Vec<VisitRecord> = (0..21)
        .map(|i| VisitRecord::new(base() + Duration::minutes(i), "/").with_user_agent(CHROME_UA))
        .collect();
    let report = VisitClassifier::default().analyze(&records, week());
    assert_eq!(report.suspicious_ips[0].ip, "unknown");
}

// =============================================================================
// IP Profile Tests
// =============================================================================

#[test]
fn test_ip_profile_not_found() {
    let result = VisitClassifier::default().analyze_ip("192.0.2.1", &[], week());
    assert!(matches!(result, Err(AnalysisError::IpNotFound(_))));
}

#[test]
fn test_ip_profile_ignores_other_ips() {
    let records = vec![
        visit("192.0.2.1", CHROME_UA, "/a", 0),
        visit("192.0.2.2", "curl/8.0", "/b", 100),
        visit("192.0.2.1", CHROME_UA, "/c", 30_000),
    ];
    let profile = VisitClassifier::default().analyze_ip("192.0.2.1", &records, week()).unwrap();
    assert_eq!(profile.total_visits, 2);
    assert_eq!(profile.bot_visits, 0);
    assert_eq!(profile.timing.unwrap().min_interval_ms, 30_000);
}

#[test]
fn test_ip_profile_order_independent() {
    let mut records: Vec<VisitRecord> = [0, 800, 12_000, 12_300, 45_000]
        .iter()
        .enumerate()
        .map(|(i, &t)| visit("192.0.2.5", CHROME_UA, &format!("/p{}", i % 2), t))
        .collect();

    let classifier = VisitClassifier::default();
    let forward = classifier.analyze_ip("192.0.2.5", &records, week()).unwrap();
    records.swap(0, 4);
    records.swap(1, 3);
    let shuffled = classifier.analyze_ip("192.0.2.5", &records, week()).unwrap();

    assert_eq!(forward.timing, shuffled.timing);
    assert_eq!(forward.unique_paths, shuffled.unique_paths);
    assert_eq!(forward.is_suspicious, shuffled.is_suspicious);
    assert_eq!(forward.first_seen, shuffled.first_seen);
    assert_eq!(forward.last_seen, shuffled.last_seen);
}

// =============================================================================
// Store Tests
// =============================================================================

#[tokio::test]
async fn test_store_round_trip_through_service() {
    let store = Arc::new(MemoryVisitStore::new(100));
    for i in 0..3 {
        store.record_visit(visit("192.0.2.8", CHROME_UA, "/", i * 1_000)).await.unwrap();
    }
    let service = BotAnalysisService::new(AnalyticsConfig::default(), store).unwrap();

    let profile = service
        .ip_profile_at("192.0.2.8", week(), base() + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(profile.total_visits, 3);
    assert!(profile.is_suspicious);
}

#[tokio::test]
async fn test_unknown_ip_from_report_has_profile() {
    let store = Arc::new(MemoryVisitStore::new(100));
    for i in 0..25 {
        let record = VisitRecord::new(base() + Duration::minutes(i), "/").with_user_agent(CHROME_UA);
        store.record_visit(record).await.unwrap();
    }
    let service = BotAnalysisService::new(AnalyticsConfig::default(), store).unwrap();
    let now = base() + Duration::hours(1);

    let report = service.report_at(week(), now).await.unwrap();
    assert_eq!(report.suspicious_ips[0].ip, "unknown");
    assert_eq!(report.suspicious_ips[0].count, 25);

    let profile = service.ip_profile_at("unknown", week(), now).await.unwrap();
    assert_eq!(profile.total_visits, 25);
}

// =============================================================================
// HTTP Tests
// =============================================================================

fn app() -> axum::Router {
    let service =
        BotAnalysisService::new(AnalyticsConfig::default(), Arc::new(MemoryVisitStore::new(100)))
            .unwrap();
    server::router(Arc::new(service))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_http_health() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_http_invalid_window() {
    for days in ["abc", "0", "-2"] {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/bot-analysis?days={}", days))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "days={}", days);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("invalid window"));
    }
}

#[tokio::test]
async fn test_http_empty_report() {
    let response = app()
        .oneshot(Request::builder().uri("/api/bot-analysis?days=3").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["summary"]["windowDays"], 3);
    assert_eq!(json["summary"]["totalVisits"], 0);
    assert_eq!(json["summary"]["botPercentage"], 0.0);
}

#[tokio::test]
async fn test_http_unknown_ip() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/bot-analysis/ip/192.0.2.77")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_http_classify() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/classify")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"userAgent":"curl/8.4.0"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["isBot"], true);
    assert_eq!(json["reason"], "matched bot pattern: curl");
}

#[tokio::test]
async fn test_http_track_then_report() {
    let app = app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/track")
                .header("content-type", "application/json")
                .header("user-agent", CHROME_UA)
                .header("x-forwarded-for", "203.0.113.50")
                .body(Body::from(r#"{"path":"/match-of-the-day","sessionId":"abc"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/bot-analysis").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["summary"]["totalVisits"], 1);
    assert_eq!(json["summary"]["humanVisits"], 1);
    assert_eq!(json["devices"]["desktop"], 1);
    assert_eq!(json["browsers"]["Chrome"], 1);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/bot-analysis/ip/203.0.113.50?days=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["totalVisits"], 1);
    assert!(json["timing"].is_null());
}
