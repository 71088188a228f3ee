//! Resilient HTTP client for the dashboard API.
//!
//! Wraps a `Transport` with three cross-cutting concerns:
//! - a fixed per-request timeout,
//! - bounded retry with jitter on explicit overload signals (429/503 only),
//! - a per-attempt observability sink (method, path, status, latency).
//!
//! Retry is a decorator around the transport call; adapters never retry on
//! their own. Timeouts are terminal here - a request that timed out is not
//! replayed.

use std::sync::Arc;
use std::time::Duration;

use rand::{thread_rng, Rng};
use serde_json::Value;
use tokio::time::{sleep, Instant};

use crate::error::ApiError;
use crate::session::SessionContext;
use crate::transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};

/// Extra attempts after the original request. The cap is per logical
/// request, not per error class.
pub const MAX_RETRIES: u8 = 2;
/// Jittered backoff window before each retry, drawn uniformly.
pub const RETRY_DELAY_MIN_MS: u64 = 1000;
pub const RETRY_DELAY_MAX_MS: u64 = 3000;

/// One observed attempt. Pure side channel - never affects control flow.
#[derive(Debug, Clone)]
pub struct RequestEntry {
    pub method: &'static str,
    pub path: String,
    pub status: Option<u16>,
    pub latency_ms: u64,
    pub attempt: u8,
}

impl RequestEntry {
    pub fn summary(&self) -> String {
        match self.status {
            Some(s) => format!(
                "{} {} -> {} ({} ms, attempt {})",
                self.method, self.path, s, self.latency_ms, self.attempt
            ),
            None => format!(
                "{} {} -> (no response) ({} ms, attempt {})",
                self.method, self.path, self.latency_ms, self.attempt
            ),
        }
    }
}

pub trait RequestObserver: Send + Sync {
    fn record(&self, entry: &RequestEntry);
}

/// Default sink: forwards to the `log` facade.
pub struct LogObserver;

impl RequestObserver for LogObserver {
    fn record(&self, entry: &RequestEntry) {
        log::info!("[client] {}", entry.summary());
    }
}

pub struct ApiClient {
    base_url: String,
    timeout: Duration,
    session: SessionContext,
    transport: Arc<dyn Transport>,
    observer: Arc<dyn RequestObserver>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout_ms: u64,
        session: SessionContext,
        transport: Arc<dyn Transport>,
        observer: Arc<dyn RequestObserver>,
    ) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            timeout: Duration::from_millis(timeout_ms),
            session,
            transport,
            observer,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.send(Method::Get, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.send(Method::Post, path, Some(body)).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let req = HttpRequest {
            method,
            url: format!("{}/{}", self.base_url, path.trim_start_matches('/')),
            body,
            headers: self
                .session
                .headers()
                .iter()
                .map(|(k, v)| (*k, v.to_string()))
                .collect(),
            timeout: self.timeout,
        };

        let mut attempt: u8 = 0;
        loop {
            let started = Instant::now();
            let res = self.transport.execute(&req).await;
            let latency_ms = started.elapsed().as_millis() as u64;
            self.observer.record(&RequestEntry {
                method: method.as_str(),
                path: path.to_string(),
                status: res.as_ref().ok().map(|r| r.status),
                latency_ms,
                attempt,
            });

            match res {
                Ok(resp) if resp.is_success() => {
                    return serde_json::from_str(&resp.body)
                        .map_err(|e| ApiError::Decode(e.to_string()));
                }
                Ok(resp) => {
                    let err = classify(&resp);
                    if err.is_transient_overload() && attempt < MAX_RETRIES {
                        attempt += 1;
                        let delay = jitter_delay_ms();
                        log::warn!(
                            "[client] {} {} overloaded, retry {}/{} in {} ms",
                            method.as_str(),
                            path,
                            attempt,
                            MAX_RETRIES,
                            delay
                        );
                        sleep(Duration::from_millis(delay)).await;
                        continue;
                    }
                    return Err(err);
                }
                Err(TransportError::Timeout) => {
                    return Err(ApiError::Timeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    });
                }
                Err(TransportError::Other(msg)) => {
                    return Err(ApiError::Network(msg));
                }
            }
        }
    }
}

/// Map a non-2xx response into the error taxonomy, pulling the server's
/// `detail` field when the body carries one.
fn classify(resp: &HttpResponse) -> ApiError {
    let detail = serde_json::from_str::<Value>(&resp.body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| {
            let trimmed = resp.body.trim();
            if trimmed.is_empty() {
                format!("HTTP {}", resp.status)
            } else {
                trimmed.to_string()
            }
        });
    ApiError::from_status(resp.status, detail)
}

fn jitter_delay_ms() -> u64 {
    thread_rng().gen_range(RETRY_DELAY_MIN_MS..=RETRY_DELAY_MAX_MS)
}
