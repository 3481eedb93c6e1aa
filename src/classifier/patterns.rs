//! Bot signature table.
//!
//! Signatures are checked in declaration order and the first match wins,
//! so generic terms are listed before the named crawlers they overlap with.

use crate::config::SignatureDef;
use regex::Regex;
use std::sync::LazyLock;

/// Built-in signatures as `(name, pattern)` pairs.
const DEFAULT_SIGNATURES: &[(&str, &str)] = &[
    // Generic indicators
    ("bot", r"bot"),
    ("crawler", r"crawl"),
    ("spider", r"spider"),
    ("scraper", r"scrap"),
    // Command-line tools and HTTP libraries
    ("curl", r"curl"),
    ("wget", r"wget"),
    ("httpie", r"httpie"),
    ("python-requests", r"python-requests"),
    ("python-urllib", r"python-urllib"),
    ("python-httpx", r"python-httpx"),
    ("aiohttp", r"aiohttp"),
    ("go-http-client", r"go-http-client"),
    ("java", r"java/"),
    ("node-fetch", r"node-fetch"),
    ("axios", r"axios"),
    ("undici", r"undici"),
    ("okhttp", r"okhttp"),
    ("libwww-perl", r"libwww-perl"),
    ("php", r"^php|php/"),
    // Headless automation
    ("headless", r"headless"),
    ("phantomjs", r"phantomjs"),
    ("puppeteer", r"puppeteer"),
    ("playwright", r"playwright"),
    ("selenium", r"selenium"),
    // Search engines. Crawlers whose name contains "bot" or "spider" are
    // already caught by the generic entries above.
    ("google", r"google-inspectiontool|googleother"),
    ("bing", r"bingpreview"),
    ("yandex", r"yandex"),
    ("baidu", r"baidu"),
    ("duckduckgo", r"duckduckgo"),
    ("slurp", r"slurp"),
    // Social media preview fetchers
    ("facebook", r"facebookexternalhit|meta-externalagent"),
    ("whatsapp", r"whatsapp"),
    ("slack", r"slack-imgproxy"),
    ("pinterest", r"pinterest"),
    // SEO audit tools and other crawlers
    ("ahrefs", r"ahrefs"),
    ("semrush", r"semrush"),
    ("chatgpt", r"chatgpt-user"),
    ("lighthouse", r"lighthouse"),
    // Monitoring
    ("pingdom", r"pingdom"),
];

static DEFAULT_SET: LazyLock<BotPatternSet> = LazyLock::new(|| {
    let signatures = DEFAULT_SIGNATURES
        .iter()
        .map(|(name, pattern)| BotSignature {
            name: (*name).to_string(),
            regex: Regex::new(&format!("(?i){}", pattern))
                .unwrap_or_else(|e| panic!("built-in signature '{}' is invalid: {}", name, e)),
        })
        .collect();
    BotPatternSet { signatures }
});

/// A compiled bot signature.
#[derive(Debug, Clone)]
pub struct BotSignature {
    name: String,
    regex: Regex,
}

impl BotSignature {
    /// Compile a signature; matching is always case-insensitive.
    pub fn new(name: impl Into<String>, pattern: &str) -> anyhow::Result<Self> {
        let name = name.into();
        let regex = Regex::new(&format!("(?i){}", pattern))
            .map_err(|e| anyhow::anyhow!("invalid bot signature '{}': {}", name, e))?;
        Ok(Self { name, regex })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_match(&self, user_agent: &str) -> bool {
        self.regex.is_match(user_agent)
    }
}

/// Ordered, immutable set of bot signatures.
#[derive(Debug, Clone)]
pub struct BotPatternSet {
    signatures: Vec<BotSignature>,
}

impl BotPatternSet {
    /// Build a set from signatures, preserving their order.
    pub fn new(signatures: Vec<BotSignature>) -> Self {
        Self { signatures }
    }

    /// Compile configured signature definitions.
    pub fn from_defs(defs: &[SignatureDef]) -> anyhow::Result<Self> {
        let signatures = defs
            .iter()
            .map(|def| BotSignature::new(def.name.clone(), &def.pattern))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self { signatures })
    }

    /// The configured set, or the built-in one when none is configured.
    pub fn from_config_or_default(defs: &[SignatureDef]) -> anyhow::Result<Self> {
        if defs.is_empty() {
            Ok(Self::default())
        } else {
            Self::from_defs(defs)
        }
    }

    /// Name of the first signature matching the User-Agent.
    pub fn first_match(&self, user_agent: &str) -> Option<&str> {
        self.signatures
            .iter()
            .find(|sig| sig.is_match(user_agent))
            .map(|sig| sig.name())
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.signatures.iter().map(|s| s.name())
    }
}

impl Default for BotPatternSet {
    fn default() -> Self {
        DEFAULT_SET.clone()
    }
}
