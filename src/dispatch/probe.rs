//! HTTP probing and outcome classification.
//!
//! A target website being unreachable is expected, recordable data, not an
//! error: every probe produces a report, and transport failures classify to
//! `Down` with a human-readable cause kept for logging only.

use std::error::Error as _;
use std::io;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use crate::db::enums::TickStatus;

/// Total per-probe time budget, covering connect, redirects and body.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(30);
/// Redirect ceiling per probe.
pub const MAX_REDIRECTS: usize = 3;
/// Fixed identifying user agent sent with every probe.
pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; UpTime-Monitor/1.0)";

/// What one probe attempt observed, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The server answered with an HTTP response.
    HttpStatus(u16),
    ConnectionRefused,
    DnsFailure,
    ConnectionReset,
    /// Explicit timeout or the elapsed budget running out.
    TimedOut,
    /// Any other transport-level failure.
    NetworkError(String),
}

impl ProbeOutcome {
    /// Cause label used in logs. The persisted status never carries it.
    pub fn label(&self) -> String {
        match self {
            ProbeOutcome::HttpStatus(code) if *code >= 500 => format!("Server Error {code}"),
            ProbeOutcome::HttpStatus(code) => format!("HTTP {code}"),
            ProbeOutcome::ConnectionRefused => "Connection Refused".to_string(),
            ProbeOutcome::DnsFailure => "DNS Resolution Failed".to_string(),
            ProbeOutcome::ConnectionReset => "Connection Reset".to_string(),
            ProbeOutcome::TimedOut => "Timeout".to_string(),
            ProbeOutcome::NetworkError(cause) => format!("Network Error: {cause}"),
        }
    }
}

/// Maps a probe outcome to the persisted status. Any HTTP response below
/// 500 means the server is reachable; 5xx and every transport failure are
/// `Down`. `Unknown` is never produced here.
pub fn classify(outcome: &ProbeOutcome) -> TickStatus {
    match outcome {
        ProbeOutcome::HttpStatus(code) if (200..500).contains(code) => TickStatus::Up,
        _ => TickStatus::Down,
    }
}

/// Result of one probe attempt: classified status, caller-measured
/// wall-clock latency, and the raw outcome for logging.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub status: TickStatus,
    pub response_time_ms: i32,
    pub outcome: ProbeOutcome,
}

/// Seam the worker probes through, so dispatch tests can substitute
/// deterministic outcomes.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeReport;
}

/// Prepends `https://` to stored scheme-less URLs.
pub fn normalize_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Probes websites over HTTP with a long-lived configured client.
pub struct Prober {
    client: reqwest::Client,
}

impl Prober {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Probe for Prober {
    async fn probe(&self, url: &str) -> ProbeReport {
        let target = normalize_url(url);
        let start = Instant::now();
        let result = self.client.get(&target).send().await;
        let response_time_ms = start.elapsed().as_millis() as i32;

        let outcome = match result {
            Ok(response) => ProbeOutcome::HttpStatus(response.status().as_u16()),
            Err(err) => outcome_from_error(&err),
        };
        let status = classify(&outcome);
        debug!(
            url = %target,
            %status,
            response_time_ms,
            cause = %outcome.label(),
            "Probe finished."
        );
        ProbeReport {
            status,
            response_time_ms,
            outcome,
        }
    }
}

/// Maps a transport failure to its cause by walking the error source chain.
fn outcome_from_error(err: &reqwest::Error) -> ProbeOutcome {
    if err.is_timeout() {
        return ProbeOutcome::TimedOut;
    }

    let mut source = err.source();
    while let Some(cause) = source {
        let rendered = cause.to_string();
        if rendered.contains("dns error") || rendered.contains("failed to lookup address") {
            return ProbeOutcome::DnsFailure;
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::ConnectionRefused => return ProbeOutcome::ConnectionRefused,
                io::ErrorKind::ConnectionReset => return ProbeOutcome::ConnectionReset,
                io::ErrorKind::TimedOut => return ProbeOutcome::TimedOut,
                _ => {}
            }
        }
        source = cause.source();
    }
    ProbeOutcome::NetworkError(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reachable_statuses_classify_as_up() {
        assert_eq!(classify(&ProbeOutcome::HttpStatus(200)), TickStatus::Up);
        assert_eq!(classify(&ProbeOutcome::HttpStatus(301)), TickStatus::Up);
        assert_eq!(classify(&ProbeOutcome::HttpStatus(404)), TickStatus::Up);
    }

    #[test]
    fn server_errors_classify_as_down() {
        assert_eq!(classify(&ProbeOutcome::HttpStatus(500)), TickStatus::Down);
        assert_eq!(classify(&ProbeOutcome::HttpStatus(503)), TickStatus::Down);
    }

    #[test]
    fn transport_failures_classify_as_down() {
        assert_eq!(classify(&ProbeOutcome::ConnectionRefused), TickStatus::Down);
        assert_eq!(classify(&ProbeOutcome::DnsFailure), TickStatus::Down);
        assert_eq!(classify(&ProbeOutcome::ConnectionReset), TickStatus::Down);
        assert_eq!(classify(&ProbeOutcome::TimedOut), TickStatus::Down);
        assert_eq!(
            classify(&ProbeOutcome::NetworkError("tls handshake eof".to_string())),
            TickStatus::Down
        );
    }

    #[test]
    fn normalize_prepends_https_to_bare_hosts() {
        assert_eq!(normalize_url("example.com"), "https://example.com");
        assert_eq!(normalize_url("http://example.com"), "http://example.com");
        assert_eq!(normalize_url("https://example.com"), "https://example.com");
    }

    #[test]
    fn labels_distinguish_server_errors_from_reachable_responses() {
        assert_eq!(ProbeOutcome::HttpStatus(404).label(), "HTTP 404");
        assert_eq!(ProbeOutcome::HttpStatus(503).label(), "Server Error 503");
        assert_eq!(ProbeOutcome::TimedOut.label(), "Timeout");
    }
}
