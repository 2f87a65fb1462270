//! Two-phase transaction coordination.
//!
//! # Data Flow
//! ```text
//! POST /game/finish
//!     → resolve each participant once
//!     → prepare all (every participant is always asked)
//!     → unanimous ready? commit all : rollback ready voters → Aborted
//!     → commit error? rollback ready voters → Failed
//! ```
//!
//! # Design Decisions
//! - The rollback after a commit error is compensating, not a textbook
//!   pre-commit abort; participants treat /rollback as idempotent
//! - Rollback failures are recorded, never retried
//! - Every phase call carries the per-call timeout; the coordinator never
//!   blocks indefinitely and keeps no state beyond the call

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{GatewayError, Result};
use crate::observability::metrics;
use crate::resilience::{RequestSpec, ResilienceExecutor, UpstreamResponse};
use crate::resolver::InstanceResolver;

/// Coordinator-side transaction states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Started,
    Preparing,
    Committing,
    Committed,
    RollingBack,
    RolledBack,
    Aborted,
}

/// One transaction participant: a logical service and the payload it
/// receives in every phase.
#[derive(Debug, Clone)]
pub struct Participant {
    pub service: String,
    pub payload: Value,
}

/// Outcome of a completed transaction.
#[derive(Debug, Clone)]
pub struct TransactionReport {
    pub transaction_id: String,
    pub state: TxState,
}

/// Coordinates one logical state change across two participants.
pub struct TransactionCoordinator {
    resolver: Arc<InstanceResolver>,
    executor: Arc<ResilienceExecutor>,
}

impl TransactionCoordinator {
    pub fn new(resolver: Arc<InstanceResolver>, executor: Arc<ResilienceExecutor>) -> Self {
        Self { resolver, executor }
    }

    /// Run the prepare/commit protocol. Returns `TransactionAborted` when
    /// prepare was not unanimously ready, `TransactionFailed` when a
    /// commit call errored; both after a best-effort rollback pass over
    /// the participants that voted ready.
    pub async fn run_transaction(
        &self,
        participants: Vec<Participant>,
    ) -> Result<TransactionReport> {
        let transaction_id = generate_transaction_id();
        self.transition(&transaction_id, TxState::Started);

        // Resolved once per participant for the lifetime of the
        // transaction, not re-resolved per phase.
        let mut resolved = Vec::with_capacity(participants.len());
        for participant in participants {
            match self.resolver.resolve(&participant.service).await {
                Ok(address) => resolved.push((participant, address)),
                Err(e) => {
                    tracing::error!(
                        transaction_id = %transaction_id,
                        service = %participant.service,
                        error = %e,
                        "Participant resolution failed"
                    );
                    metrics::record_transaction("failed");
                    return Err(GatewayError::TransactionFailed(transaction_id));
                }
            }
        }

        self.transition(&transaction_id, TxState::Preparing);
        let mut ready_list = Vec::new();
        for (participant, address) in &resolved {
            match self.phase_call(address, "/prepare", participant, &transaction_id).await {
                Ok(response) if voted_ready(&response) => {
                    ready_list.push((participant.clone(), address.clone()));
                }
                Ok(response) => {
                    tracing::warn!(
                        transaction_id = %transaction_id,
                        service = %participant.service,
                        status = %response.status,
                        "Participant did not vote ready"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        transaction_id = %transaction_id,
                        service = %participant.service,
                        error = %e,
                        "Prepare call failed"
                    );
                }
            }
        }

        if ready_list.len() != resolved.len() {
            self.transition(&transaction_id, TxState::RollingBack);
            self.rollback_all(&ready_list, &transaction_id).await;
            self.transition(&transaction_id, TxState::Aborted);
            metrics::record_transaction("aborted");
            return Err(GatewayError::TransactionAborted(transaction_id));
        }

        self.transition(&transaction_id, TxState::Committing);
        let mut commit_failed = false;
        for (participant, address) in &resolved {
            match self.phase_call(address, "/commit", participant, &transaction_id).await {
                Ok(response) if response.status.is_success() => {}
                Ok(response) => {
                    tracing::error!(
                        transaction_id = %transaction_id,
                        service = %participant.service,
                        status = %response.status,
                        "Commit rejected"
                    );
                    commit_failed = true;
                }
                Err(e) => {
                    tracing::error!(
                        transaction_id = %transaction_id,
                        service = %participant.service,
                        error = %e,
                        "Commit call failed"
                    );
                    commit_failed = true;
                }
            }
        }

        if commit_failed {
            self.transition(&transaction_id, TxState::RollingBack);
            self.rollback_all(&ready_list, &transaction_id).await;
            self.transition(&transaction_id, TxState::RolledBack);
            metrics::record_transaction("failed");
            return Err(GatewayError::TransactionFailed(transaction_id));
        }

        self.transition(&transaction_id, TxState::Committed);
        metrics::record_transaction("committed");
        Ok(TransactionReport {
            transaction_id,
            state: TxState::Committed,
        })
    }

    async fn phase_call(
        &self,
        address: &str,
        phase_path: &str,
        participant: &Participant,
        transaction_id: &str,
    ) -> Result<UpstreamResponse> {
        let body = with_transaction_id(&participant.payload, transaction_id);
        self.executor
            .call(address, &RequestSpec::post(phase_path, body))
            .await
    }

    /// Best-effort rollback to every prepare-phase voter. Failures are
    /// recorded, never retried, and do not change the reported outcome.
    async fn rollback_all(&self, ready_list: &[(Participant, String)], transaction_id: &str) {
        for (participant, address) in ready_list {
            let body = json!({ "transactionId": transaction_id });
            if let Err(e) = self
                .executor
                .call(address, &RequestSpec::post("/rollback", body))
                .await
            {
                tracing::error!(
                    transaction_id = %transaction_id,
                    service = %participant.service,
                    error = %e,
                    "Rollback call failed"
                );
            }
        }
    }

    fn transition(&self, transaction_id: &str, state: TxState) {
        tracing::info!(
            transaction_id = %transaction_id,
            state = ?state,
            "Transaction state"
        );
    }
}

/// Time-based token, unique enough to correlate the phases of one logical
/// operation.
fn generate_transaction_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let suffix = Uuid::new_v4().simple().to_string();
    format!("tx-{}-{}", millis, &suffix[..8])
}

fn voted_ready(response: &UpstreamResponse) -> bool {
    response.status.is_success()
        && response
            .json()
            .and_then(|v| v.get("status").and_then(|s| s.as_str().map(String::from)))
            .is_some_and(|status| status == "ready")
}

fn with_transaction_id(payload: &Value, transaction_id: &str) -> Value {
    match payload {
        Value::Object(fields) => {
            let mut fields = fields.clone();
            fields.insert("transactionId".to_string(), json!(transaction_id));
            Value::Object(fields)
        }
        other => json!({ "transactionId": transaction_id, "data": other }),
    }
}
