use crate::signals::{Severity, UrlIssue, UrlSignal};
use url::{Host, Url};

/// Version of the penalty rule table below. Bump when rules are added,
/// removed, or recalibrated.
pub const RULE_TABLE_VERSION: u32 = 1;

const FULL_TRUST: i32 = 100;
const MAX_HOST_LABELS: usize = 4;
const MAX_PATH_CHARS: usize = 200;
const MIN_KEYWORD_HITS: usize = 2;

/// TLDs with disproportionate abuse rates in phishing feeds.
const SUSPICIOUS_TLDS: &[&str] = &[
    "tk", "ml", "ga", "cf", "gq", "xyz", "top", "work", "click", "loan", "icu", "buzz", "rest",
    "cam", "quest", "monster",
];

/// Path/query keywords that co-occur on credential-harvesting pages.
const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "login", "verify", "secure", "account", "update", "confirm", "signin", "banking", "wallet",
    "password", "billing",
];

/// Brand tokens and the legitimate domain forms each brand is allowed to
/// appear under. Coverage is deliberately limited to `.com`/`.co.jp`/`.jp`
/// forms; regional variants outside that set will false-positive.
const BRAND_DOMAINS: &[(&str, &[&str])] = &[
    ("amazon", &["amazon.com", "amazon.co.jp", "amazon.jp"]),
    ("rakuten", &["rakuten.com", "rakuten.co.jp", "rakuten.jp"]),
    ("paypal", &["paypal.com", "paypal.jp"]),
    ("apple", &["apple.com", "apple.co.jp", "apple.jp"]),
    ("google", &["google.com", "google.co.jp", "google.jp"]),
    ("microsoft", &["microsoft.com", "microsoft.co.jp", "microsoft.jp"]),
    ("netflix", &["netflix.com", "netflix.jp"]),
    ("yahoo", &["yahoo.com", "yahoo.co.jp", "yahoo.jp"]),
    ("instagram", &["instagram.com"]),
    ("facebook", &["facebook.com"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PenaltyTarget {
    DomainTrust,
    TechSafety,
}

/// One row of the heuristic table: a condition, the score it penalizes,
/// and the issue it reports when triggered.
struct PenaltyRule {
    target: PenaltyTarget,
    penalty: i32,
    severity: Severity,
    title: &'static str,
    check: fn(&UrlFacts) -> Option<String>,
}

const PENALTY_RULES: &[PenaltyRule] = &[
    PenaltyRule {
        target: PenaltyTarget::TechSafety,
        penalty: 30,
        severity: Severity::High,
        title: "Connection is not encrypted",
        check: check_insecure_scheme,
    },
    PenaltyRule {
        target: PenaltyTarget::DomainTrust,
        penalty: 30,
        severity: Severity::High,
        title: "Host is a bare IP address",
        check: check_ip_literal_host,
    },
    PenaltyRule {
        target: PenaltyTarget::DomainTrust,
        penalty: 20,
        severity: Severity::Medium,
        title: "Top-level domain is frequently abused",
        check: check_suspicious_tld,
    },
    PenaltyRule {
        target: PenaltyTarget::DomainTrust,
        penalty: 15,
        severity: Severity::Medium,
        title: "Unusually deep subdomain nesting",
        check: check_host_depth,
    },
    PenaltyRule {
        target: PenaltyTarget::DomainTrust,
        penalty: 40,
        severity: Severity::Critical,
        title: "Hostname imitates a well-known brand",
        check: check_brand_typosquat,
    },
    PenaltyRule {
        target: PenaltyTarget::DomainTrust,
        penalty: 35,
        severity: Severity::Critical,
        title: "Hostname mixes character scripts",
        check: check_mixed_script_host,
    },
    PenaltyRule {
        target: PenaltyTarget::DomainTrust,
        penalty: 15,
        severity: Severity::Medium,
        title: "Path stacks credential-bait keywords",
        check: check_suspicious_keywords,
    },
    PenaltyRule {
        target: PenaltyTarget::DomainTrust,
        penalty: 10,
        severity: Severity::Low,
        title: "Path is abnormally long",
        check: check_path_length,
    },
];

/// Pre-parsed pieces of the URL the rule checks operate on.
struct UrlFacts {
    scheme: String,
    host: String,
    is_ip_literal: bool,
    path: String,
    query: String,
}

impl UrlFacts {
    fn from_url(url: &Url) -> Self {
        let is_ip_literal = matches!(url.host(), Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)));
        Self {
            scheme: url.scheme().to_string(),
            host: url.host_str().unwrap_or_default().to_ascii_lowercase(),
            is_ip_literal,
            path: url.path().to_string(),
            query: url.query().unwrap_or_default().to_string(),
        }
    }
}

/// Scores a URL on structural trust. Total: any input yields a well-formed
/// signal, unparsable input collapsing to zero trust with a single critical
/// issue. Pure and deterministic.
pub fn analyze_url(raw: &str) -> UrlSignal {
    let url = match Url::parse(raw.trim()) {
        Ok(url) => url,
        Err(_) => {
            return UrlSignal {
                domain_trust: 0,
                tech_safety: 0,
                issues: vec![UrlIssue {
                    title: "URL could not be parsed".to_string(),
                    severity: Severity::Critical,
                    description: format!("'{}' is not a valid absolute URL", raw.trim()),
                }],
            }
        }
    };

    let facts = UrlFacts::from_url(&url);
    let mut domain_trust = FULL_TRUST;
    let mut tech_safety = FULL_TRUST;
    let mut issues = Vec::new();

    for rule in PENALTY_RULES {
        if let Some(description) = (rule.check)(&facts) {
            match rule.target {
                PenaltyTarget::DomainTrust => domain_trust -= rule.penalty,
                PenaltyTarget::TechSafety => tech_safety -= rule.penalty,
            }
            issues.push(UrlIssue {
                title: rule.title.to_string(),
                severity: rule.severity,
                description,
            });
        }
    }

    UrlSignal {
        domain_trust: domain_trust.clamp(0, 100) as u8,
        tech_safety: tech_safety.clamp(0, 100) as u8,
        issues,
    }
}

fn check_insecure_scheme(facts: &UrlFacts) -> Option<String> {
    if facts.scheme == "https" {
        None
    } else {
        Some(format!(
            "Page is served over '{}' so traffic can be read or altered in transit",
            facts.scheme
        ))
    }
}

fn check_ip_literal_host(facts: &UrlFacts) -> Option<String> {
    if facts.is_ip_literal {
        Some(format!(
            "Host '{}' is a raw IP address rather than a registered domain",
            facts.host
        ))
    } else {
        None
    }
}

fn check_suspicious_tld(facts: &UrlFacts) -> Option<String> {
    if facts.is_ip_literal || facts.host.is_empty() {
        return None;
    }
    let tld = facts.host.rsplit('.').next()?;
    if SUSPICIOUS_TLDS.contains(&tld) {
        Some(format!(
            "The '.{}' top-level domain is heavily used by throwaway scam sites",
            tld
        ))
    } else {
        None
    }
}

fn check_host_depth(facts: &UrlFacts) -> Option<String> {
    if facts.is_ip_literal || facts.host.is_empty() {
        return None;
    }
    let labels = facts.host.split('.').count();
    if labels > MAX_HOST_LABELS {
        Some(format!(
            "Hostname has {} labels; deep nesting is a common cloaking tactic",
            labels
        ))
    } else {
        None
    }
}

/// First brand whose token appears in the host decides the outcome; later
/// brands are not consulted.
fn check_brand_typosquat(facts: &UrlFacts) -> Option<String> {
    if facts.is_ip_literal || facts.host.is_empty() {
        return None;
    }
    let (brand, legitimate) = BRAND_DOMAINS
        .iter()
        .find(|(token, _)| facts.host.contains(token))?;
    let is_legitimate = legitimate
        .iter()
        .any(|domain| facts.host == *domain || facts.host.ends_with(&format!(".{}", domain)));
    if is_legitimate {
        None
    } else {
        Some(format!(
            "Hostname '{}' contains '{}' but is not an official {} domain",
            facts.host, brand, brand
        ))
    }
}

fn check_mixed_script_host(facts: &UrlFacts) -> Option<String> {
    for label in facts.host.split('.') {
        let encoded = match label.strip_prefix("xn--") {
            Some(rest) => rest,
            None => continue,
        };
        let decoded = match idna::punycode::decode_to_string(encoded) {
            Some(decoded) => decoded,
            None => continue,
        };
        if mixes_scripts(&decoded) {
            return Some(format!(
                "Label '{}' decodes to '{}', mixing Latin with lookalike characters",
                label, decoded
            ));
        }
    }
    None
}

/// True when a decoded label contains both Latin and non-Latin letters.
/// A label written purely in one non-Latin script is legitimate.
fn mixes_scripts(decoded: &str) -> bool {
    let mut has_latin = false;
    let mut has_other = false;
    for ch in decoded.chars().filter(|c| c.is_alphabetic()) {
        if is_latin(ch) {
            has_latin = true;
        } else {
            has_other = true;
        }
    }
    has_latin && has_other
}

fn is_latin(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ('\u{00C0}'..='\u{024F}').contains(&ch)
}

fn check_suspicious_keywords(facts: &UrlFacts) -> Option<String> {
    let haystack = format!("{}?{}", facts.path, facts.query).to_ascii_lowercase();
    let hits: Vec<&str> = SUSPICIOUS_KEYWORDS
        .iter()
        .filter(|keyword| haystack.contains(**keyword))
        .copied()
        .collect();
    if hits.len() >= MIN_KEYWORD_HITS {
        Some(format!(
            "Path and query combine {} credential-bait keywords: {}",
            hits.len(),
            hits.join(", ")
        ))
    } else {
        None
    }
}

fn check_path_length(facts: &UrlFacts) -> Option<String> {
    let length = facts.path.chars().count();
    if length > MAX_PATH_CHARS {
        Some(format!(
            "Path is {} characters long; legitimate pages rarely exceed {}",
            length, MAX_PATH_CHARS
        ))
    } else {
        None
    }
}
