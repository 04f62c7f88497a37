use serde::Serialize;
use std::time::Duration;

/// Retrieval limits enforced by the fetch proxy.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub timeout: Duration,
    pub max_body_bytes: usize,
    pub max_redirects: u32,
    pub user_agent: String,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_body_bytes: 200 * 1024,
            max_redirects: 5,
            user_agent: concat!("site-trust-scanner/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Connection settings for the external classifier service.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
}

/// Named threshold set controlling how aggressively ambiguous signals
/// escalate risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SensitivityProfile {
    pub name: &'static str,
    pub critical_dim: u8,
    pub warn_dim: u8,
    pub scam_pattern_threshold: u8,
}

impl SensitivityProfile {
    pub fn high() -> Self {
        Self {
            name: "high",
            critical_dim: 25,
            warn_dim: 45,
            scam_pattern_threshold: 40,
        }
    }

    pub fn standard() -> Self {
        Self {
            name: "standard",
            critical_dim: 15,
            warn_dim: 35,
            scam_pattern_threshold: 25,
        }
    }

    pub fn low() -> Self {
        Self {
            name: "low",
            critical_dim: 10,
            warn_dim: 25,
            scam_pattern_threshold: 15,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::high()),
            "standard" => Some(Self::standard()),
            "low" => Some(Self::low()),
            _ => None,
        }
    }
}

impl Default for SensitivityProfile {
    fn default() -> Self {
        Self::standard()
    }
}

/// Top-level configuration handed to the pipeline and server per call.
/// Built once in `main`; never read from ambient global state.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub bind_addr: String,
    pub fetch: FetchPolicy,
    pub classifier: Option<ClassifierConfig>,
    pub sensitivity: SensitivityProfile,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8787".to_string(),
            fetch: FetchPolicy::default(),
            classifier: None,
            sensitivity: SensitivityProfile::standard(),
        }
    }
}

impl ScannerConfig {
    /// Builds the configuration from environment variables. The classifier
    /// stays disabled unless both endpoint and key are present; the scanner
    /// then runs heuristic-only.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("SCANNER_BIND_ADDR") {
            if !addr.is_empty() {
                config.bind_addr = addr;
            }
        }

        if let Ok(name) = std::env::var("SCANNER_SENSITIVITY") {
            if let Some(profile) = SensitivityProfile::from_name(&name) {
                config.sensitivity = profile;
            }
        }

        let endpoint = std::env::var("CLASSIFIER_ENDPOINT").unwrap_or_default();
        let api_key = std::env::var("CLASSIFIER_API_KEY").unwrap_or_default();
        if !endpoint.is_empty() && !api_key.is_empty() {
            config.classifier = Some(ClassifierConfig {
                endpoint,
                api_key,
                timeout: Duration::from_secs(30),
            });
        }

        config
    }
}
