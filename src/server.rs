use crate::config::{ScannerConfig, SensitivityProfile};
use crate::fetch_proxy::{FetchError, FetchOutcome, SafeFetcher};
use crate::observability;
use crate::pipeline::{PipelineError, ScanPipeline};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

const MAX_REQUEST_BYTES: usize = 8 * 1024;

/// Wire shape of a successful fetch: the page body plus enough routing
/// metadata for the caller to flag redirects.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchResponseBody<'a> {
    html: &'a str,
    status: u16,
    headers: &'a BTreeMap<String, String>,
    redirected: bool,
    final_url: &'a str,
    truncated: bool,
}

/// JSON-over-TCP API surface: health probe, fetch proxy, full scan.
pub struct ApiServer {
    listener: TcpListener,
    fetcher: Arc<SafeFetcher>,
    pipeline: Arc<ScanPipeline>,
}

impl ApiServer {
    pub async fn bind(config: &ScannerConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        Ok(Self {
            listener,
            fetcher: Arc::new(SafeFetcher::new(config.fetch.clone())),
            pipeline: Arc::new(ScanPipeline::new(config)),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the process stops, one task per client.
    pub async fn serve(self) -> std::io::Result<()> {
        info!(addr = %self.listener.local_addr()?, "api server listening");
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let fetcher = Arc::clone(&self.fetcher);
            let pipeline = Arc::clone(&self.pipeline);
            tokio::spawn(async move {
                if let Err(error) = handle_connection(stream, fetcher, pipeline).await {
                    warn!(peer = %peer, error = %error, "connection handling failed");
                }
            });
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    fetcher: Arc<SafeFetcher>,
    pipeline: Arc<ScanPipeline>,
) -> std::io::Result<()> {
    let mut buffer = vec![0u8; MAX_REQUEST_BYTES];
    let read = stream.read(&mut buffer).await?;
    let request = String::from_utf8_lossy(&buffer[..read]);
    let request_line = request.lines().next().unwrap_or("");

    let (status, body) = match parse_request_line(request_line) {
        Some(("GET", target)) => route(target, &fetcher, &pipeline).await,
        Some((_, _)) => (405, json!({ "error": "method not allowed" }).to_string()),
        None => (400, json!({ "error": "malformed request line" }).to_string()),
    };

    write_response(&mut stream, status, &body).await
}

async fn route(
    target: &str,
    fetcher: &SafeFetcher,
    pipeline: &ScanPipeline,
) -> (u16, String) {
    match target.split('?').next().unwrap_or(target) {
        "/api/health" => handle_health(),
        "/api/fetch" => handle_fetch(target, fetcher).await,
        "/api/analyze" => handle_analyze(target, pipeline).await,
        _ => (404, json!({ "error": "not found" }).to_string()),
    }
}

/// Liveness probe: no side effects, no input.
fn handle_health() -> (u16, String) {
    let snapshot = observability::snapshot();
    let body = json!({
        "status": observability::get_health().as_str(),
        "scans_started": snapshot.scans_started,
        "scans_completed": snapshot.scans_completed,
        "fetch_ssrf_rejections": snapshot.fetch_ssrf_rejections,
    });
    (200, body.to_string())
}

async fn handle_fetch(target: &str, fetcher: &SafeFetcher) -> (u16, String) {
    let url = match query_param(target, "url") {
        Some(url) => url,
        None => return (400, json!({ "error": "missing url parameter" }).to_string()),
    };

    match fetcher.fetch(&url).await {
        Ok(outcome) => (200, fetch_body(&outcome)),
        Err(error) => {
            match &error {
                FetchError::PolicyRejected { .. } => observability::record_fetch_ssrf_rejection(),
                FetchError::Timeout { .. } => observability::record_fetch_timeout(),
                _ => {}
            }
            (
                fetch_error_status(&error),
                json!({ "error": error.reason() }).to_string(),
            )
        }
    }
}

async fn handle_analyze(target: &str, pipeline: &ScanPipeline) -> (u16, String) {
    let url = match query_param(target, "url") {
        Some(url) => url,
        None => return (400, json!({ "error": "missing url parameter" }).to_string()),
    };
    let profile = query_param(target, "sensitivity")
        .as_deref()
        .and_then(SensitivityProfile::from_name);

    let result = match profile {
        Some(profile) => pipeline.run_with_profile(&url, profile).await,
        None => pipeline.run(&url).await,
    };

    match result {
        Ok(report) => match serde_json::to_string(&report) {
            Ok(body) => (200, body),
            Err(error) => (
                500,
                json!({ "error": format!("report serialization failed: {}", error) }).to_string(),
            ),
        },
        Err(PipelineError::Busy) => (
            409,
            json!({ "error": "a scan is already in flight" }).to_string(),
        ),
    }
}

fn fetch_body(outcome: &FetchOutcome) -> String {
    let body = FetchResponseBody {
        html: &outcome.html,
        status: outcome.status,
        headers: &outcome.headers,
        redirected: outcome.redirected,
        final_url: &outcome.final_url,
        truncated: outcome.truncated,
    };
    serde_json::to_string(&body)
        .unwrap_or_else(|_| json!({ "error": "response serialization failed" }).to_string())
}

/// SSRF rejection and timeout share the `{error}` shape with every other
/// failure; only the status differs.
fn fetch_error_status(error: &FetchError) -> u16 {
    match error {
        FetchError::InvalidUrl(_) => 400,
        FetchError::PolicyRejected { .. } => 403,
        FetchError::Timeout { .. } => 504,
        FetchError::Network(_) => 502,
    }
}

fn parse_request_line(line: &str) -> Option<(&str, &str)> {
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    Some((method, target))
}

fn query_param(target: &str, name: &str) -> Option<String> {
    let (_, query) = target.split_once('?')?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

async fn write_response(stream: &mut TcpStream, status: u16, body: &str) -> std::io::Result<()> {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        504 => "Gateway Timeout",
        _ => "OK",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
