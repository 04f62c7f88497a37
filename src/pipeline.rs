use crate::classifier::{ClassifierError, ClassifierEvidence, HttpClassifier, RiskClassifier};
use crate::config::{ScannerConfig, SensitivityProfile};
use crate::content_extractor::extract_content;
use crate::fetch_proxy::{is_sensitive_redirect_target, FetchError, SafeFetcher};
use crate::integrator::integrate;
use crate::observability;
use crate::signals::{ClassifierResult, ContentSignal, IntegratedScore, UrlSignal};
use crate::url_analyzer::analyze_url;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Pipeline-level failures. Stage failures inside a scan degrade into the
/// report instead of surfacing here.
#[derive(Debug)]
pub enum PipelineError {
    Busy,
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Busy => write!(f, "a scan is already in flight"),
        }
    }
}

impl std::error::Error for PipelineError {}

/// Which stage degraded the scan to a partial result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedStage {
    Fetch,
    Classifier,
}

/// Complete output of one scan. Always renderable: a failed stage leaves
/// its slot empty and explains itself in `notices`.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub url: String,
    pub final_url: Option<String>,
    pub redirected: bool,
    pub url_signal: UrlSignal,
    pub content: Option<ContentSignal>,
    pub classifier: Option<ClassifierResult>,
    pub integrated: IntegratedScore,
    pub sensitivity: SensitivityProfile,
    pub notices: Vec<String>,
    pub incomplete: Option<FailedStage>,
}

/// Orchestrates the scan stages: structural analysis and fetch run
/// concurrently, extraction and classification follow sequentially, the
/// integrator blends whatever survived. One scan at a time; no retries.
pub struct ScanPipeline {
    fetcher: SafeFetcher,
    classifier: Option<Arc<dyn RiskClassifier>>,
    sensitivity: SensitivityProfile,
    in_flight: AtomicBool,
}

impl ScanPipeline {
    pub fn new(config: &ScannerConfig) -> Self {
        let classifier = config
            .classifier
            .clone()
            .map(|c| Arc::new(HttpClassifier::new(c)) as Arc<dyn RiskClassifier>);
        Self {
            fetcher: SafeFetcher::new(config.fetch.clone()),
            classifier,
            sensitivity: config.sensitivity,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Swaps the classifier seam; used to wire in alternate backends.
    pub fn with_classifier(mut self, classifier: Arc<dyn RiskClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub async fn run(&self, raw_url: &str) -> Result<ScanReport, PipelineError> {
        self.run_with_profile(raw_url, self.sensitivity).await
    }

    pub async fn run_with_profile(
        &self,
        raw_url: &str,
        profile: SensitivityProfile,
    ) -> Result<ScanReport, PipelineError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            observability::record_scan_rejected_busy();
            return Err(PipelineError::Busy);
        }
        let _guard = scopeguard::guard(&self.in_flight, |flag| {
            flag.store(false, Ordering::SeqCst);
        });

        observability::record_scan_started();
        info!(url = raw_url, profile = profile.name, "scan started");

        // The structural analyzer needs no fetched content, so it runs
        // alongside the network retrieval.
        let (url_signal, fetch_result) =
            tokio::join!(async { analyze_url(raw_url) }, self.fetcher.fetch(raw_url));

        let mut notices: Vec<String> = Vec::new();
        let mut incomplete: Option<FailedStage> = None;
        let mut final_url: Option<String> = None;
        let mut redirected = false;
        let mut content: Option<ContentSignal> = None;
        let mut classifier_result: Option<ClassifierResult> = None;

        match fetch_result {
            Ok(outcome) => {
                redirected = outcome.redirected;
                final_url = Some(outcome.final_url.clone());
                if outcome.truncated {
                    notices.push(
                        "Page body exceeded the 200 KB limit; analysis used the truncated body"
                            .to_string(),
                    );
                }
                match Url::parse(&outcome.final_url) {
                    Ok(base) => {
                        if outcome.redirected && is_sensitive_redirect_target(&base) {
                            notices.push(format!(
                                "Page redirected to a credential-style path: {}",
                                base.path()
                            ));
                        }
                        let extracted = extract_content(&outcome.html, &base);
                        classifier_result = self
                            .classify_stage(raw_url, &url_signal, &extracted, &outcome.headers, &mut notices, &mut incomplete)
                            .await;
                        content = Some(extracted);
                    }
                    Err(_) => {
                        incomplete = Some(FailedStage::Fetch);
                        notices.push(format!(
                            "Final URL '{}' was not parseable; content extraction skipped",
                            outcome.final_url
                        ));
                    }
                }
            }
            Err(error) => {
                match &error {
                    FetchError::PolicyRejected { .. } => {
                        observability::record_fetch_ssrf_rejection()
                    }
                    FetchError::Timeout { .. } => observability::record_fetch_timeout(),
                    _ => {}
                }
                warn!(url = raw_url, error = %error, "fetch stage failed");
                incomplete = Some(FailedStage::Fetch);
                notices.push(format!(
                    "Page fetch failed ({}); scores reflect URL structure only",
                    error.reason()
                ));
            }
        }

        let integrated = integrate(&url_signal, classifier_result.as_ref(), &profile);
        observability::record_scan_completed();
        info!(url = raw_url, risk = %integrated.risk, "scan completed");

        Ok(ScanReport {
            url: raw_url.to_string(),
            final_url,
            redirected,
            url_signal,
            content,
            classifier: classifier_result,
            integrated,
            sensitivity: profile,
            notices,
            incomplete,
        })
    }

    async fn classify_stage(
        &self,
        raw_url: &str,
        url_signal: &UrlSignal,
        content: &ContentSignal,
        response_headers: &std::collections::BTreeMap<String, String>,
        notices: &mut Vec<String>,
        incomplete: &mut Option<FailedStage>,
    ) -> Option<ClassifierResult> {
        let classifier = match &self.classifier {
            Some(classifier) => classifier,
            None => {
                notices.push(
                    "No classifier configured; scores reflect structural checks only".to_string(),
                );
                return None;
            }
        };

        let evidence = ClassifierEvidence {
            url: raw_url.to_string(),
            url_signal: url_signal.clone(),
            content: content.clone(),
            response_headers: response_headers.clone(),
        };

        match classifier.classify(&evidence).await {
            Ok(result) => Some(result),
            Err(error) => {
                observability::record_classifier_failure();
                warn!(url = raw_url, error = %error, "classifier stage failed");
                incomplete.get_or_insert(FailedStage::Classifier);
                notices.push(match error {
                    ClassifierError::RateLimited => {
                        "AI classifier is rate limited; retry in a moment. AI dimensions fell back to neutral defaults".to_string()
                    }
                    ClassifierError::MalformedResponse(_) => {
                        "AI classifier returned an unusable response; AI dimensions fell back to neutral defaults".to_string()
                    }
                    ClassifierError::Unavailable(_) => {
                        "AI classifier was unreachable; AI dimensions fell back to neutral defaults".to_string()
                    }
                });
                None
            }
        }
    }
}
