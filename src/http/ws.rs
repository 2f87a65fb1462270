//! WebSocket dispatch surface.
//!
//! Clients send JSON frames `{service, action, data, authHeader}` and get
//! one JSON reply per frame. Frames flow through the same admission gate
//! and dispatch rules as the REST surface.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::HeaderValue;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::http::dispatch;
use crate::http::server::AppState;

#[derive(Debug, Deserialize)]
struct WsRequest {
    service: String,
    action: String,
    #[serde(default)]
    data: Option<Value>,
    #[serde(rename = "authHeader", default)]
    auth_header: Option<String>,
}

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    tracing::debug!("Client connected via WebSocket");
    let (mut sender, mut receiver) = socket.split();

    while let Some(Ok(message)) = receiver.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let reply = handle_frame(&state, text.as_str()).await;
        if sender
            .send(Message::Text(reply.to_string().into()))
            .await
            .is_err()
        {
            break;
        }
    }

    tracing::debug!("WebSocket client disconnected");
}

async fn handle_frame(state: &AppState, text: &str) -> Value {
    let request: WsRequest = match serde_json::from_str(text) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "Failed to parse WebSocket frame");
            return json!({ "error": "Invalid message format" });
        }
    };

    match (request.service.as_str(), request.action.as_str()) {
        ("gateway", "status") => json!({ "status": 200, "message": "API Gateway is running" }),
        ("registry", "status") => match state.registry.status().await {
            Ok(status) => json!({
                "status": 200,
                "message": status.message,
                "store": status.store_token,
            }),
            Err(e) => json!({ "status": 503, "error": e.to_string() }),
        },
        (service @ ("battleship" | "profile"), action) => {
            let Some(_guard) = state.admission.try_acquire() else {
                return json!({ "status": 429, "error": "too many requests" });
            };

            let auth_value = request
                .auth_header
                .as_deref()
                .and_then(|h| HeaderValue::from_str(h).ok());

            match dispatch::dispatch_action(
                &state.executor,
                service,
                action,
                request.data,
                auth_value.as_ref(),
            )
            .await
            {
                Ok((status, _)) if action == "status" && status.is_success() => json!({
                    "status": 200,
                    "message": format!("{} service is healthy", service),
                }),
                Ok((status, _)) if action == "status" => json!({
                    "status": status.as_u16(),
                    "error": format!("{} service is down", service),
                }),
                Ok((_, body)) => body,
                Err(e) => json!({
                    "status": e.status_code().as_u16(),
                    "error": e.to_string(),
                }),
            }
        }
        _ => json!({ "error": "Unknown service" }),
    }
}
