//! Visit ingestion helpers.
//!
//! Device and browser are derived once when a visit is recorded and stored
//! on the record; reports only tally the stored values.

use axum::http::HeaderMap;
use regex::Regex;
use std::net::SocketAddr;
use std::sync::LazyLock;

/// Device classes, checked in order.
static DEVICE_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"(?i)bot|crawl|spider|curl|wget").unwrap(), "bot"),
        (Regex::new(r"(?i)ipad|tablet|kindle|silk|playbook").unwrap(), "tablet"),
        (Regex::new(r"(?i)mobi|iphone|ipod|android|blackberry|opera mini|iemobile").unwrap(), "mobile"),
        (Regex::new(r"(?i)windows|macintosh|x11|linux|cros").unwrap(), "desktop"),
    ]
});

/// Browser families, checked in order. Chromium derivatives come first
/// because they also advertise Chrome and Safari.
static BROWSER_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"Edg(e|A|iOS)?/").unwrap(), "Edge"),
        (Regex::new(r"OPR/|Opera").unwrap(), "Opera"),
        (Regex::new(r"SamsungBrowser/").unwrap(), "Samsung Internet"),
        (Regex::new(r"Firefox/|FxiOS/").unwrap(), "Firefox"),
        (Regex::new(r"Chrome/|CriOS/").unwrap(), "Chrome"),
        (Regex::new(r"Safari/").unwrap(), "Safari"),
        (Regex::new(r"MSIE |Trident/").unwrap(), "IE"),
    ]
});

/// Coarse `(device, browser)` description of a User-Agent.
pub fn describe_user_agent(user_agent: Option<&str>) -> (String, String) {
    let ua = match user_agent {
        Some(ua) if !ua.trim().is_empty() => ua,
        _ => return ("unknown".to_string(), "Unknown".to_string()),
    };

    let mut device = DEVICE_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(ua))
        .map(|(_, name)| *name)
        .unwrap_or("unknown");

    // Android tablets omit the "Mobile" token
    let lower = ua.to_lowercase();
    if device == "mobile" && lower.contains("android") && !lower.contains("mobile") {
        device = "tablet";
    }

    let browser = BROWSER_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(ua))
        .map(|(_, name)| *name)
        .unwrap_or("Unknown");

    (device.to_string(), browser.to_string())
}

/// Client address: first `X-Forwarded-For` hop, then `X-Real-IP`, then the
/// socket peer. Proxy headers are ignored unless `trust_proxy` is set.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> Option<String> {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return Some(ip.to_string());
        }

        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = real_ip {
            return Some(ip.to_string());
        }
    }

    peer.map(|addr| addr.ip().to_string())
}

/// The request's User-Agent header, if it is valid text.
pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
