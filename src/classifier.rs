use crate::config::ClassifierConfig;
use crate::signals::{
    clamp_score, ClassifierFinding, ClassifierResult, ContentSignal, DetectedCategory,
    DimensionScores, RiskLevel, UrlSignal,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Failure modes of the external classifier, kept distinct so the caller
/// can show a specific message for rate limiting.
#[derive(Debug)]
pub enum ClassifierError {
    Unavailable(String),
    RateLimited,
    MalformedResponse(String),
}

impl std::fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifierError::Unavailable(detail) => {
                write!(f, "classifier unavailable: {}", detail)
            }
            ClassifierError::RateLimited => write!(f, "classifier rate limit reached"),
            ClassifierError::MalformedResponse(detail) => {
                write!(f, "classifier returned a malformed response: {}", detail)
            }
        }
    }
}

impl std::error::Error for ClassifierError {}

/// Evidence bundle posted to the classifier: the URL, the structural
/// signal, the extracted content, and the fetch response headers.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifierEvidence {
    pub url: String,
    pub url_signal: UrlSignal,
    pub content: ContentSignal,
    pub response_headers: BTreeMap<String, String>,
}

/// Seam for the external AI classifier. Only the I/O contract lives here;
/// the service's internal reasoning is out of scope.
#[async_trait]
pub trait RiskClassifier: Send + Sync {
    async fn classify(
        &self,
        evidence: &ClassifierEvidence,
    ) -> Result<ClassifierResult, ClassifierError>;
}

/// Wire document as received. Everything is optional: the response is
/// untrusted input until `validate_response` accepts it.
#[derive(Debug, Deserialize)]
struct RawResponse {
    scores: Option<RawScores>,
    overall_risk: Option<String>,
    #[serde(default)]
    categories: Vec<DetectedCategory>,
    #[serde(default)]
    findings: Vec<ClassifierFinding>,
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawScores {
    domain_trust: Option<f64>,
    tech_safety: Option<f64>,
    content_quality: Option<f64>,
    transparency: Option<f64>,
    scam_pattern: Option<f64>,
    legal_compliance: Option<f64>,
}

/// HTTP implementation of the classifier contract.
pub struct HttpClassifier {
    config: ClassifierConfig,
    client: reqwest::Client,
}

impl HttpClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl RiskClassifier for HttpClassifier {
    async fn classify(
        &self,
        evidence: &ClassifierEvidence,
    ) -> Result<ClassifierResult, ClassifierError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.timeout)
            .json(evidence)
            .send()
            .await
            .map_err(|e| ClassifierError::Unavailable(e.to_string()))?;

        if let Some(failure) = status_failure(response.status()) {
            return Err(failure);
        }

        let raw: RawResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::MalformedResponse(format!("undecodable body: {}", e)))?;
        validate_response(raw)
    }
}

/// Maps non-success statuses; 429 stays distinguishable from every other
/// failure.
fn status_failure(status: StatusCode) -> Option<ClassifierError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        Some(ClassifierError::RateLimited)
    } else if !status.is_success() {
        Some(ClassifierError::Unavailable(format!(
            "classifier returned HTTP {}",
            status.as_u16()
        )))
    } else {
        None
    }
}

/// Accepts a raw response only when all six numeric dimensions and a known
/// overall risk are present. Scores are clamped on ingestion.
fn validate_response(raw: RawResponse) -> Result<ClassifierResult, ClassifierError> {
    let scores = raw
        .scores
        .ok_or_else(|| ClassifierError::MalformedResponse("missing scores object".to_string()))?;

    let dimensions = DimensionScores {
        domain_trust: require_dimension(scores.domain_trust, "domain_trust")?,
        tech_safety: require_dimension(scores.tech_safety, "tech_safety")?,
        content_quality: require_dimension(scores.content_quality, "content_quality")?,
        transparency: require_dimension(scores.transparency, "transparency")?,
        scam_pattern: require_dimension(scores.scam_pattern, "scam_pattern")?,
        legal_compliance: require_dimension(scores.legal_compliance, "legal_compliance")?,
    };

    let overall_risk = raw
        .overall_risk
        .as_deref()
        .and_then(RiskLevel::parse)
        .ok_or_else(|| {
            ClassifierError::MalformedResponse("overall_risk missing or unknown".to_string())
        })?;

    Ok(ClassifierResult {
        scores: dimensions,
        overall_risk,
        categories: raw.categories,
        findings: raw.findings,
        summary: raw.summary.unwrap_or_default(),
    })
}

fn require_dimension(value: Option<f64>, name: &str) -> Result<u8, ClassifierError> {
    value
        .filter(|v| v.is_finite())
        .map(clamp_score)
        .ok_or_else(|| {
            ClassifierError::MalformedResponse(format!("dimension '{}' missing or not numeric", name))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url_analyzer::analyze_url;

    fn raw(json: &str) -> RawResponse {
        serde_json::from_str(json).expect("test document should deserialize")
    }

    const COMPLETE: &str = r#"{
        "scores": {
            "domain_trust": 72,
            "tech_safety": 65,
            "content_quality": 40,
            "transparency": 55,
            "scam_pattern": 80,
            "legal_compliance": 140
        },
        "overall_risk": "medium",
        "categories": [
            {"category": "fake-shop", "confidence": "medium", "evidence": "price anomalies"}
        ],
        "findings": [
            {"dimension": "content_quality", "severity": "high",
             "title": "Pressure tactics", "description": "countdown banner",
             "quote": "only 2 left!"}
        ],
        "summary": "Suspicious storefront."
    }"#;

    #[test]
    fn complete_response_validates_and_clamps() {
        let result = validate_response(raw(COMPLETE)).expect("complete response should pass");
        assert_eq!(result.scores.domain_trust, 72);
        assert_eq!(result.scores.legal_compliance, 100);
        assert_eq!(result.overall_risk, RiskLevel::Medium);
        assert_eq!(result.categories.len(), 1);
        assert_eq!(result.findings[0].quote.as_deref(), Some("only 2 left!"));
    }

    #[test]
    fn missing_dimension_is_malformed() {
        let document = r#"{
            "scores": {
                "domain_trust": 72, "tech_safety": 65, "content_quality": 40,
                "transparency": 55, "scam_pattern": 80, "legal_compliance": null
            },
            "overall_risk": "low"
        }"#;
        let result = validate_response(raw(document));
        assert!(matches!(
            result,
            Err(ClassifierError::MalformedResponse(detail)) if detail.contains("legal_compliance")
        ));
    }

    #[test]
    fn missing_scores_object_is_malformed() {
        let result = validate_response(raw(r#"{"overall_risk": "safe"}"#));
        assert!(matches!(result, Err(ClassifierError::MalformedResponse(_))));
    }

    #[test]
    fn unknown_overall_risk_is_malformed() {
        let document = r#"{
            "scores": {
                "domain_trust": 50, "tech_safety": 50, "content_quality": 50,
                "transparency": 50, "scam_pattern": 50, "legal_compliance": 50
            },
            "overall_risk": "catastrophic"
        }"#;
        let result = validate_response(raw(document));
        assert!(matches!(result, Err(ClassifierError::MalformedResponse(_))));
    }

    #[test]
    fn categories_and_findings_default_when_absent() {
        let document = r#"{
            "scores": {
                "domain_trust": 50, "tech_safety": 50, "content_quality": 50,
                "transparency": 50, "scam_pattern": 50, "legal_compliance": 50
            },
            "overall_risk": "safe"
        }"#;
        let result = validate_response(raw(document)).expect("lenient fields default");
        assert!(result.categories.is_empty());
        assert!(result.findings.is_empty());
        assert!(result.summary.is_empty());
    }

    #[test]
    fn rate_limit_status_stays_distinct() {
        assert!(matches!(
            status_failure(StatusCode::TOO_MANY_REQUESTS),
            Some(ClassifierError::RateLimited)
        ));
        assert!(matches!(
            status_failure(StatusCode::BAD_GATEWAY),
            Some(ClassifierError::Unavailable(_))
        ));
        assert!(status_failure(StatusCode::OK).is_none());
    }

    #[test]
    fn evidence_serializes_for_the_wire() {
        let evidence = ClassifierEvidence {
            url: "https://example.com/".to_string(),
            url_signal: analyze_url("https://example.com/"),
            content: Default::default(),
            response_headers: BTreeMap::new(),
        };
        let value = serde_json::to_value(&evidence).expect("evidence must serialize");
        assert!(value.get("url_signal").is_some());
        assert!(value.get("content").is_some());
    }
}
