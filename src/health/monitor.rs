//! Background liveness probing.
//!
//! Independent of the request path: probe outcomes are recorded as
//! observability counters only and never mutate circuit state, which is
//! owned by the resilience executor and updated by real traffic.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::observability::metrics;
use crate::registry::ServiceRegistry;
use crate::resolver::InstanceResolver;

pub struct HealthMonitor {
    registry: Arc<ServiceRegistry>,
    resolver: Arc<InstanceResolver>,
    services: Vec<String>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        resolver: Arc<InstanceResolver>,
        services: Vec<String>,
        config: HealthCheckConfig,
    ) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            registry,
            resolver,
            services,
            config,
            client,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Health probes disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            path = %self.config.path,
            "Health monitor starting"
        );

        let interval = Duration::from_secs(self.config.interval_secs);
        let mut ticker = time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.probe_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn probe_all(&self) {
        for service in &self.services {
            let templates = match self.registry.lookup(service).await {
                Ok(templates) => templates,
                Err(e) => {
                    tracing::debug!(service = %service, error = %e, "No instances to probe");
                    continue;
                }
            };

            for template in &templates {
                let address = self.resolver.transform(service, template);
                let healthy = self.probe(&address).await;
                metrics::record_probe(service, &address, healthy);
            }
        }
    }

    /// Best-effort single probe, no retry.
    async fn probe(&self, address: &str) -> bool {
        let uri = format!("{}{}", address, self.config.path);
        let request = match Request::builder()
            .method("GET")
            .uri(uri)
            .header("user-agent", "game-gateway-health-check")
            .body(Body::empty())
        {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(address = %address, error = %e, "Failed to build probe request");
                return false;
            }
        };

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let round_trip = async {
            let response = self.client.request(request).await?;
            let status = response.status();
            // Drain the body so the connection can be reused.
            let _ = response.into_body().collect().await;
            Ok::<_, hyper_util::client::legacy::Error>(status)
        };

        match time::timeout(timeout, round_trip).await {
            Ok(Ok(status)) => {
                let healthy = status.is_success();
                if !healthy {
                    tracing::warn!(address = %address, status = %status, "Probe failed: non-success status");
                }
                healthy
            }
            Ok(Err(e)) => {
                tracing::warn!(address = %address, error = %e, "Probe failed: connection error");
                false
            }
            Err(_) => {
                tracing::warn!(address = %address, "Probe failed: timeout");
                false
            }
        }
    }
}
