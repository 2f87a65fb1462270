//! Resilient outbound execution.
//!
//! Wraps a single logical backend call in per-instance retry and circuit
//! breaking, rotating through instances via the resolver. Exhaustion
//! surfaces as `Unavailable`, never a crash.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, Uri};
use http_body_util::BodyExt;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde_json::Value;

use crate::config::ResilienceConfig;
use crate::error::{GatewayError, Result};
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resolver::InstanceResolver;

/// One outbound call: method, relative path, optional JSON body, and
/// headers to forward.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub headers: HeaderMap,
}

impl RequestSpec {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
            headers: HeaderMap::new(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

/// Response from a backend instance.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    /// Parse the body as JSON, if it parses.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

enum CallOutcome {
    Response(UpstreamResponse),
    TransportFailure(String),
}

/// Transport-level failures: infrastructure statuses, not application
/// responses. 4xx and other 5xx are passed through to the caller.
fn is_transport_failure(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Executes outbound calls with per-instance retry and circuit breaking.
pub struct ResilienceExecutor {
    resolver: Arc<InstanceResolver>,
    circuits: CircuitBreaker,
    client: Client<HttpConnector, Body>,
    config: ResilienceConfig,
}

impl ResilienceExecutor {
    pub fn new(resolver: Arc<InstanceResolver>, config: ResilienceConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let circuits = CircuitBreaker::new(
            config.retry_limit,
            Duration::from_secs(config.circuit_breaker_timeout_secs),
        );
        Self {
            resolver,
            circuits,
            client,
            config,
        }
    }

    /// Execute one logical call against a service, rotating through up to
    /// `max_instance_attempts` instances with `retry_limit` tries each.
    pub async fn execute(
        &self,
        service_name: &str,
        spec: &RequestSpec,
    ) -> Result<UpstreamResponse> {
        for instance_attempt in 0..self.config.max_instance_attempts {
            let address = match self.resolver.resolve(service_name).await {
                Ok(address) => address,
                Err(e) => {
                    tracing::warn!(service = %service_name, error = %e, "Resolution failed");
                    return Err(GatewayError::Unavailable(format!(
                        "could not resolve an instance of '{}'",
                        service_name
                    )));
                }
            };

            if self.circuits.is_open(&address) {
                tracing::debug!(
                    service = %service_name,
                    address = %address,
                    attempt = instance_attempt,
                    "Skipping circuit-open instance"
                );
                continue;
            }

            // Retries against one instance are strictly sequential.
            while self.circuits.failure_count(&address) < self.config.retry_limit {
                match self.send_once(&address, spec).await {
                    CallOutcome::Response(response) => {
                        self.circuits.record_success(&address);
                        return Ok(response);
                    }
                    CallOutcome::TransportFailure(reason) => {
                        tracing::warn!(
                            service = %service_name,
                            address = %address,
                            reason = %reason,
                            "Upstream call failed"
                        );
                        if self.circuits.record_failure(&address) {
                            break;
                        }
                        let delay = calculate_backoff(
                            self.circuits.failure_count(&address),
                            self.config.backoff_base_ms,
                            self.config.backoff_max_ms,
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(GatewayError::Unavailable(format!(
            "all instances of '{}' failed or are circuit-open",
            service_name
        )))
    }

    /// Single-shot call to a fixed, already-resolved address: per-call
    /// timeout, no retry, no circuit accounting. Used by the transaction
    /// coordinator, which owns its own failure semantics.
    pub async fn call(&self, address: &str, spec: &RequestSpec) -> Result<UpstreamResponse> {
        match self.send_once(address, spec).await {
            CallOutcome::Response(response) => Ok(response),
            CallOutcome::TransportFailure(reason) => Err(GatewayError::Upstream(reason)),
        }
    }

    async fn send_once(&self, address: &str, spec: &RequestSpec) -> CallOutcome {
        let uri: Uri = match format!("{}{}", address, spec.path).parse() {
            Ok(uri) => uri,
            Err(e) => return CallOutcome::TransportFailure(format!("bad uri: {}", e)),
        };

        let mut builder = Request::builder().method(spec.method.clone()).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            for (name, value) in spec.headers.iter() {
                headers.insert(name.clone(), value.clone());
            }
        }

        let body = match &spec.body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                match serde_json::to_vec(value) {
                    Ok(bytes) => Body::from(bytes),
                    Err(e) => return CallOutcome::TransportFailure(format!("bad body: {}", e)),
                }
            }
            None => Body::empty(),
        };

        let request = match builder.body(body) {
            Ok(request) => request,
            Err(e) => return CallOutcome::TransportFailure(format!("bad request: {}", e)),
        };

        let timeout = Duration::from_secs(self.config.per_call_timeout_secs);
        let round_trip = async {
            let response = self.client.request(request).await?;
            let (parts, body) = response.into_parts();
            let collected = body.collect().await?;
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(UpstreamResponse {
                status: parts.status,
                body: collected.to_bytes().to_vec(),
            })
        };

        match tokio::time::timeout(timeout, round_trip).await {
            Ok(Ok(response)) if is_transport_failure(response.status) => {
                CallOutcome::TransportFailure(format!("status {}", response.status))
            }
            Ok(Ok(response)) => CallOutcome::Response(response),
            Ok(Err(e)) => CallOutcome::TransportFailure(e.to_string()),
            Err(_) => CallOutcome::TransportFailure("timeout".into()),
        }
    }
}
