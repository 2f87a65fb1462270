//! HTTP server setup and request handlers.
//!
//! # Responsibilities
//! - Create the Axum router with all gateway routes
//! - Wire up middleware (tracing, request ID, admission gate)
//! - Spawn background loops (health monitor, admission sampler)
//! - Dispatch simple operations through the resilience executor and
//!   transactional ones through the coordinator

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::admission::{admission_middleware, AdmissionController};
use crate::config::GatewayConfig;
use crate::health::HealthMonitor;
use crate::http::dispatch;
use crate::http::request::RequestIdLayer;
use crate::http::ws;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::registry::{RegistryStore, ServiceRegistry};
use crate::resilience::{RequestSpec, ResilienceExecutor};
use crate::resolver::replica::ReplicaNaming;
use crate::resolver::{InstanceResolver, PassthroughNaming, PortDigitNaming};
use crate::transaction::{Participant, TransactionCoordinator};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub registry: Arc<ServiceRegistry>,
    pub resolver: Arc<InstanceResolver>,
    pub executor: Arc<ResilienceExecutor>,
    pub coordinator: Arc<TransactionCoordinator>,
    pub admission: Arc<AdmissionController>,
    pub metrics_handle: Option<PrometheusHandle>,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: Arc<GatewayConfig>,
    state: AppState,
}

impl GatewayServer {
    /// Wire up all subsystems against the given registry store.
    pub fn new(
        config: GatewayConfig,
        store: Arc<dyn RegistryStore>,
        metrics_handle: Option<PrometheusHandle>,
    ) -> Self {
        let config = Arc::new(config);

        let naming: Arc<dyn ReplicaNaming> = match config.resolver.replica_naming.as_str() {
            "passthrough" => Arc::new(PassthroughNaming),
            _ => Arc::new(PortDigitNaming),
        };

        let registry = Arc::new(ServiceRegistry::new(store));
        let resolver = Arc::new(InstanceResolver::new(registry.clone(), naming));
        let executor = Arc::new(ResilienceExecutor::new(
            resolver.clone(),
            config.resilience.clone(),
        ));
        let coordinator = Arc::new(TransactionCoordinator::new(
            resolver.clone(),
            executor.clone(),
        ));
        let admission = Arc::new(AdmissionController::new(config.admission.clone()));

        let state = AppState {
            config: config.clone(),
            registry,
            resolver,
            executor,
            coordinator,
            admission,
            metrics_handle,
        };

        let router = Self::build_router(state.clone());
        Self {
            router,
            config,
            state,
        }
    }

    /// Build the Axum router with all middleware layers. The admission
    /// gate wraps only the dispatching routes; liveness and debug routes
    /// stay reachable under overload.
    fn build_router(state: AppState) -> Router {
        let dispatch_routes = Router::new()
            .route("/auth/{action}", post(auth_handler))
            .route("/game/finish", post(game_finish_handler))
            .route("/game/{action}", post(game_action_handler))
            .route("/ws", get(ws::ws_handler))
            .route("/{service}/status", get(service_status_handler))
            .layer(middleware::from_fn_with_state(
                state.admission.clone(),
                admission_middleware,
            ));

        Router::new()
            .route("/", get(root_handler))
            .route("/status", get(status_handler))
            .route("/registry/status", get(registry_status_handler))
            .route("/metrics", get(metrics_handler))
            .route("/register", post(register_handler))
            .route("/lookup/{service}", get(lookup_handler))
            .route("/{service}/instance", get(service_instance_handler))
            .merge(dispatch_routes)
            .with_state(state)
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway starting");

        if self.config.health_check.enabled {
            let monitor = HealthMonitor::new(
                self.state.registry.clone(),
                self.state.resolver.clone(),
                self.config.services.names.clone(),
                self.config.health_check.clone(),
            );
            let receiver = shutdown.subscribe();
            tokio::spawn(async move {
                monitor.run(receiver).await;
            });
        }

        {
            let sampler = self.state.admission.clone();
            let receiver = shutdown.subscribe();
            tokio::spawn(async move {
                sampler.run_sampler(receiver).await;
            });
        }

        let mut receiver = shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = receiver.recv().await;
            })
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

async fn root_handler() -> &'static str {
    "Welcome to the Battleship API Gateway!"
}

async fn status_handler() -> impl IntoResponse {
    Json(json!({ "message": "API Gateway is running" }))
}

async fn registry_status_handler(State(state): State<AppState>) -> Response {
    match state.registry.status().await {
        Ok(status) => Json(json!({
            "message": status.message,
            "store": status.store_token,
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    #[serde(rename = "serviceName", default)]
    service_name: Option<String>,
    #[serde(rename = "serviceAddress", default)]
    service_address: Option<String>,
}

async fn register_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Response {
    let service_name = request.service_name.unwrap_or_default();
    let service_address = request.service_address.unwrap_or_default();

    match state.registry.register(&service_name, &service_address).await {
        Ok(()) => Json(json!({
            "message": format!("{} registered successfully", service_name),
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn lookup_handler(State(state): State<AppState>, Path(service): Path<String>) -> Response {
    match state.registry.lookup(&service).await {
        Ok(addresses) => Json(json!({ "serviceAddresses": addresses })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Proxied health check: 200 with the backend's body, 503 on exhaustion.
async fn service_status_handler(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> Response {
    let start_time = Instant::now();
    match state
        .executor
        .execute(&service, &RequestSpec::get("/status"))
        .await
    {
        Ok(response) => {
            metrics::record_request("GET", response.status.as_u16(), &service, start_time);
            let body = response
                .json()
                .unwrap_or_else(|| json!({ "status": response.status.as_u16() }));
            (response.status, Json(body)).into_response()
        }
        Err(e) => {
            metrics::record_request("GET", e.status_code().as_u16(), &service, start_time);
            e.into_response()
        }
    }
}

/// Debug: the concrete instance the next round-robin pick would hit.
async fn service_instance_handler(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> Response {
    match state.resolver.peek(&service).await {
        Ok(instance) => Json(json!({ "service": service, "instance": instance })).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn auth_handler(
    State(state): State<AppState>,
    Path(action): Path<String>,
    headers: HeaderMap,
    data: Option<Json<Value>>,
) -> Response {
    forward_action(&state, "profile", &action, headers, data).await
}

async fn game_action_handler(
    State(state): State<AppState>,
    Path(action): Path<String>,
    headers: HeaderMap,
    data: Option<Json<Value>>,
) -> Response {
    forward_action(&state, "battleship", &action, headers, data).await
}

async fn forward_action(
    state: &AppState,
    service: &str,
    action: &str,
    headers: HeaderMap,
    data: Option<Json<Value>>,
) -> Response {
    let start_time = Instant::now();
    let auth_header = headers.get(AUTHORIZATION);
    let data = data.map(|Json(value)| value);

    match dispatch::dispatch_action(&state.executor, service, action, data, auth_header).await {
        Ok((status, body)) => {
            metrics::record_request("POST", status.as_u16(), service, start_time);
            (status, Json(body)).into_response()
        }
        Err(e) => {
            metrics::record_request("POST", e.status_code().as_u16(), service, start_time);
            e.into_response()
        }
    }
}

/// Finish a game: the result must land in both backends, so this goes
/// through the transaction coordinator.
async fn game_finish_handler(
    State(state): State<AppState>,
    data: Option<Json<Value>>,
) -> Response {
    let start_time = Instant::now();
    let payload = data.map(|Json(value)| value).unwrap_or_else(|| json!({}));

    let participants: Vec<Participant> = state
        .config
        .transaction
        .participants
        .iter()
        .map(|service| Participant {
            service: service.clone(),
            payload: payload.clone(),
        })
        .collect();

    match state.coordinator.run_transaction(participants).await {
        Ok(report) => {
            metrics::record_request("POST", 200, "transaction", start_time);
            Json(json!({
                "message": "Game result committed",
                "transactionId": report.transaction_id,
            }))
            .into_response()
        }
        Err(e) => {
            metrics::record_request("POST", e.status_code().as_u16(), "transaction", start_time);
            e.into_response()
        }
    }
}
