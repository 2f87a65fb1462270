//! Request ID injection.
//!
//! Every inbound request gets an `x-request-id` header (UUID v4) as early
//! as possible; the same ID is forwarded to backends so one logical call
//! can be correlated across services.

use std::task::{Context, Poll};

use axum::http::{HeaderValue, Request};
use tower::{Layer, Service};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Layer that assigns a request ID when the client did not send one.
#[derive(Debug, Clone, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S, B> Service<Request<B>> for RequestIdService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        if !request.headers().contains_key(X_REQUEST_ID) {
            let id = Uuid::new_v4().to_string();
            if let Ok(value) = HeaderValue::from_str(&id) {
                request.headers_mut().insert(X_REQUEST_ID, value);
            }
        }
        self.inner.call(request)
    }
}
