//! HTTP status surface (§9.5): `/health` and `/audits/:audit_id/status`,
//! mirroring `prover-coordinator`'s `/health` and `/batch/:id/status`.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use rla_chain::{AuditChain, AuditId, Phase};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApiResponse<T> {
    Success { data: T },
    Error { message: String },
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse::Success { data }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ApiResponse::Error { message: message.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditStatusResponse {
    pub audit_id: AuditId,
    pub phase: Phase,
    pub pm_sample_count: u64,
    pub tv_sample_count: u64,
    pub pm_proofs_verified: u64,
    pub tv_proofs_verified: u64,
    pub proof_deadline: u64,
    pub tentative_timestamp: Option<u64>,
    pub challenge_deadline: Option<u64>,
}

struct AppState<C> {
    chain: Arc<C>,
}

pub fn router<C: AuditChain + 'static>(chain: Arc<C>) -> Router {
    let state = Arc::new(AppState { chain });
    Router::new()
        .route("/health", get(health_handler))
        .route("/audits/:audit_id/status", get(audit_status_handler::<C>))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health_handler() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse { status: "ok".to_string() }))
}

async fn audit_status_handler<C: AuditChain + 'static>(
    State(state): State<Arc<AppState<C>>>,
    Path(audit_id): Path<AuditId>,
) -> Json<ApiResponse<AuditStatusResponse>> {
    match state.chain.get_record(audit_id).await {
        Ok(record) => Json(ApiResponse::success(AuditStatusResponse {
            audit_id: record.audit_id,
            phase: record.phase,
            pm_sample_count: record.pm_sample_count,
            tv_sample_count: record.tv_sample_count,
            pm_proofs_verified: record.pm_proofs_verified,
            tv_proofs_verified: record.tv_proofs_verified,
            proof_deadline: record.proof_deadline,
            tentative_timestamp: record.tentative_timestamp,
            challenge_deadline: record.challenge_deadline,
        })),
        Err(err) => Json(ApiResponse::error(err.to_string())),
    }
}
