//! Admission control.
//!
//! A gateway-wide gate applied before any dispatch: requests over the
//! in-flight limit are rejected immediately with 429, no queueing. A
//! separate request-rate sampler is observational only and never rejects
//! traffic.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::AdmissionConfig;
use crate::error::GatewayError;
use crate::observability::metrics;

/// Gateway-wide concurrency and rate accounting.
pub struct AdmissionController {
    concurrent_tasks: AtomicUsize,
    concurrent_task_limit: usize,
    request_count: AtomicU64,
    config: AdmissionConfig,
}

impl AdmissionController {
    pub fn new(config: AdmissionConfig) -> Self {
        Self {
            concurrent_tasks: AtomicUsize::new(0),
            concurrent_task_limit: config.concurrent_task_limit,
            request_count: AtomicU64::new(0),
            config,
        }
    }

    /// Try to enter the gate. Every request is counted toward the rate
    /// sample, admitted or not. The returned guard releases the slot on
    /// every exit path.
    pub fn try_acquire(self: &Arc<Self>) -> Option<AdmissionGuard> {
        self.request_count.fetch_add(1, Ordering::Relaxed);

        let mut current = self.concurrent_tasks.load(Ordering::Relaxed);
        loop {
            if current >= self.concurrent_task_limit {
                metrics::record_admission_rejected();
                return None;
            }
            match self.concurrent_tasks.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        Some(AdmissionGuard {
            controller: self.clone(),
        })
    }

    /// Current in-flight request count.
    pub fn in_flight(&self) -> usize {
        self.concurrent_tasks.load(Ordering::Relaxed)
    }

    /// Background sampler: reads and resets the request counter each
    /// interval and emits an overload signal when it exceeds the
    /// threshold. Purely observational.
    pub async fn run_sampler(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let interval = Duration::from_millis(self.config.sample_interval_ms);
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let sampled = self.request_count.swap(0, Ordering::Relaxed);
                    metrics::record_request_rate_sample(sampled);
                    if sampled > self.config.overload_threshold {
                        tracing::warn!(
                            sampled,
                            threshold = self.config.overload_threshold,
                            "Request rate over threshold"
                        );
                        metrics::record_overload();
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Admission sampler received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

/// RAII guard for one in-flight request.
pub struct AdmissionGuard {
    controller: Arc<AdmissionController>,
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        self.controller
            .concurrent_tasks
            .fetch_sub(1, Ordering::Relaxed);
    }
}

/// Middleware applying the gate to dispatching routes.
pub async fn admission_middleware(
    State(controller): State<Arc<AdmissionController>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match controller.try_acquire() {
        Some(_guard) => next.run(request).await,
        None => {
            tracing::warn!(
                in_flight = controller.in_flight(),
                "Admission rejected: concurrent task limit reached"
            );
            GatewayError::AdmissionRejected.into_response()
        }
    }
}
