use serde::{Deserialize, Serialize};

/// Overall risk verdict. Variant order is the escalation order, so the
/// derived `Ord` makes `max()` pick the more severe level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// Parses the wire form used by the classifier contract.
    pub fn parse(value: &str) -> Option<RiskLevel> {
        match value.trim().to_ascii_lowercase().as_str() {
            "safe" => Some(RiskLevel::Safe),
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            "critical" => Some(RiskLevel::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a single structural issue or classifier finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// One structural problem found while analyzing a URL.
#[derive(Debug, Clone, Serialize)]
pub struct UrlIssue {
    pub title: String,
    pub severity: Severity,
    pub description: String,
}

/// Structural trust assessment of a URL. Produced once per scan; scores are
/// always within [0,100].
#[derive(Debug, Clone, Serialize)]
pub struct UrlSignal {
    pub domain_trust: u8,
    pub tech_safety: u8,
    pub issues: Vec<UrlIssue>,
}

/// Whether a disclosure was found in visible page text, only behind a link,
/// or not at all. Disclosures split across pages surface as `via_link`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DisclosureCheck {
    pub in_text: bool,
    pub via_link: bool,
}

impl DisclosureCheck {
    pub fn present(&self) -> bool {
        self.in_text || self.via_link
    }
}

/// Operator-transparency disclosures extracted from page content.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TransparencySignals {
    pub organization: DisclosureCheck,
    pub contact: DisclosureCheck,
    pub privacy_policy: DisclosureCheck,
    pub commerce_law: DisclosureCheck,
}

/// Metadata for one form on the page.
#[derive(Debug, Clone, Serialize)]
pub struct FormSignal {
    pub method: String,
    pub action: String,
    pub input_count: usize,
    pub has_password_field: bool,
    pub has_card_field: bool,
}

/// Structured evidence extracted from fetched HTML.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContentSignal {
    pub title: String,
    pub headings: Vec<String>,
    pub body_excerpt: String,
    pub external_domains: Vec<String>,
    pub external_link_total: usize,
    pub forms: Vec<FormSignal>,
    pub script_obfuscation: bool,
    pub hidden_field_count: usize,
    pub transparency: TransparencySignals,
}

/// The six scored dimensions composing the trust assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionScores {
    pub domain_trust: u8,
    pub tech_safety: u8,
    pub content_quality: u8,
    pub transparency: u8,
    pub scam_pattern: u8,
    pub legal_compliance: u8,
}

impl DimensionScores {
    pub fn as_array(&self) -> [u8; 6] {
        [
            self.domain_trust,
            self.tech_safety,
            self.content_quality,
            self.transparency,
            self.scam_pattern,
            self.legal_compliance,
        ]
    }

    pub fn uniform(value: u8) -> Self {
        Self {
            domain_trust: value,
            tech_safety: value,
            content_quality: value,
            transparency: value,
            scam_pattern: value,
            legal_compliance: value,
        }
    }
}

/// Classifier confidence for a detected scam category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// One scam category the classifier believes applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedCategory {
    pub category: String,
    pub confidence: Confidence,
    pub evidence: String,
}

/// One concrete finding reported by the classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierFinding {
    pub dimension: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
}

/// Validated response from the external classifier. Arrives as untrusted
/// input; `classifier::validate_response` is the only constructor path.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifierResult {
    pub scores: DimensionScores,
    pub overall_risk: RiskLevel,
    pub categories: Vec<DetectedCategory>,
    pub findings: Vec<ClassifierFinding>,
    pub summary: String,
}

/// Final blended verdict. Derived from its inputs, never persisted alone.
#[derive(Debug, Clone, Serialize)]
pub struct IntegratedScore {
    pub scores: DimensionScores,
    pub risk: RiskLevel,
}

/// Clamps an arbitrary numeric score into the [0,100] dimension range.
pub fn clamp_score(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_ordering_matches_escalation_order() {
        assert!(RiskLevel::Safe < RiskLevel::Low);
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
        assert_eq!(
            RiskLevel::Medium.max(RiskLevel::High),
            RiskLevel::High
        );
    }

    #[test]
    fn risk_level_parses_wire_values() {
        assert_eq!(RiskLevel::parse("safe"), Some(RiskLevel::Safe));
        assert_eq!(RiskLevel::parse(" HIGH "), Some(RiskLevel::High));
        assert_eq!(RiskLevel::parse("unknown"), None);
    }

    #[test]
    fn clamp_score_bounds() {
        assert_eq!(clamp_score(-5.0), 0);
        assert_eq!(clamp_score(0.4), 0);
        assert_eq!(clamp_score(49.5), 50);
        assert_eq!(clamp_score(100.0), 100);
        assert_eq!(clamp_score(240.0), 100);
    }

    #[test]
    fn disclosure_present_covers_both_paths() {
        let text_only = DisclosureCheck {
            in_text: true,
            via_link: false,
        };
        let link_only = DisclosureCheck {
            in_text: false,
            via_link: true,
        };
        assert!(text_only.present());
        assert!(link_only.present());
        assert!(!DisclosureCheck::default().present());
    }
}
