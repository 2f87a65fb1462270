//! Action dispatch rules.
//!
//! Maps a (service, action) pair to the backend endpoint it reaches and
//! enforces the authorization table before any network call is issued.

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderValue, StatusCode};
use serde_json::{json, Value};

use crate::error::{GatewayError, Result};
use crate::resilience::{RequestSpec, ResilienceExecutor};

/// Actions reachable without an Authorization header.
pub fn requires_authorization(service: &str, action: &str) -> bool {
    !matches!(
        (service, action),
        ("battleship", "status")
            | ("profile", "register" | "login" | "status")
            | ("gateway", "status")
            | ("registry", "status")
    )
}

fn profile_spec(action: &str, data: Value) -> Result<RequestSpec> {
    let spec = match action {
        "status" => RequestSpec::get("/status"),
        "register" => RequestSpec::post("/auth/register", data),
        "login" => RequestSpec::post("/auth/login", data),
        "profile" => RequestSpec::get("/auth/profile"),
        "update-stats" => RequestSpec::post("/update-stats", data),
        _ => {
            return Err(GatewayError::InvalidArgument(
                "unsupported action for profile service".into(),
            ))
        }
    };
    Ok(spec)
}

fn battleship_spec(action: &str, data: Value) -> Result<RequestSpec> {
    let spec = match action {
        "status" => RequestSpec::get("/status"),
        action => RequestSpec::post(format!("/game/{}", action), data),
    };
    Ok(spec)
}

/// Dispatch one action to its backend through the resilience executor.
/// Returns the backend's status and JSON body.
pub async fn dispatch_action(
    executor: &ResilienceExecutor,
    service: &str,
    action: &str,
    data: Option<Value>,
    auth_header: Option<&HeaderValue>,
) -> Result<(StatusCode, Value)> {
    if requires_authorization(service, action) && auth_header.is_none() {
        return Err(GatewayError::InvalidArgument(
            "Authorization header is required".into(),
        ));
    }

    let data = data.unwrap_or_else(|| json!({}));
    let mut spec = match service {
        "profile" => profile_spec(action, data)?,
        "battleship" => battleship_spec(action, data)?,
        other => {
            return Err(GatewayError::InvalidArgument(format!(
                "unknown service '{}'",
                other
            )))
        }
    };

    if let Some(value) = auth_header {
        spec.headers.insert(AUTHORIZATION, value.clone());
    }

    let response = executor.execute(service, &spec).await?;
    let body = response
        .json()
        .unwrap_or_else(|| json!({ "status": response.status.as_u16() }));
    Ok((response.status, body))
}
