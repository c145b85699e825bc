//! HTTP endpoints
//!
//! Lead intake, call initiation, the media-stream WebSocket, health, and
//! metrics.

use axum::{
    extract::{Json, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use fixline_core::CallType;
use fixline_pipeline::CallRequest;

use crate::bridge;
use crate::metrics::{self, metrics_handler};
use crate::setup::{call_setup_document, validate_document};
use crate::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(&state.config.server.cors_origins);

    Router::new()
        // Lead intake
        .route("/api/leads", post(submit_lead))
        // Call initiation
        .route("/api/calls", post(initiate_call))
        // Telephony media stream
        .route("/media-stream", get(media_stream_handler))
        // Health and metrics
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new();
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Lead submission request
#[derive(Debug, Deserialize)]
struct SubmitLeadRequest {
    description: String,
}

/// Lead submission response
#[derive(Debug, Serialize)]
struct SubmitLeadResponse {
    lead_id: Uuid,
    status: &'static str,
    quality_score: f64,
    matches: Vec<MatchSummary>,
}

#[derive(Debug, Serialize)]
struct MatchSummary {
    business_id: Uuid,
    business_name: String,
    confidence: u32,
    reasons: Vec<String>,
    subject: String,
    message: String,
    call_to_action: String,
}

/// Run a description through the intake pipeline.
async fn submit_lead(
    State(state): State<AppState>,
    Json(request): Json<SubmitLeadRequest>,
) -> Result<Json<SubmitLeadResponse>, StatusCode> {
    let processed = match state.pipeline.process(&request.description).await {
        Ok(processed) => processed,
        Err(fixline_pipeline::PipelineError::Classification(
            fixline_classifier::ClassifierError::EmptyInput,
        )) => {
            return Err(StatusCode::BAD_REQUEST);
        }
        Err(e) => {
            tracing::error!(error = %e, "Lead processing failed");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    metrics::record_lead_processed(processed.lead.status.as_str());

    let mut matches = Vec::with_capacity(processed.matches.len());
    for (m, (business_id, notification)) in processed
        .matches
        .iter()
        .zip(processed.notifications.iter())
    {
        matches.push(MatchSummary {
            business_id: *business_id,
            business_name: m.business_name.clone(),
            confidence: m.confidence,
            reasons: m.reasons.clone(),
            subject: notification.subject.clone(),
            message: notification.message.clone(),
            call_to_action: notification.call_to_action.clone(),
        });
    }

    Ok(Json(SubmitLeadResponse {
        lead_id: processed.lead.id,
        status: processed.lead.status.as_str(),
        quality_score: processed.lead.classification.quality_score,
        matches,
    }))
}

/// Call initiation request
#[derive(Debug, Deserialize)]
struct InitiateCallRequest {
    lead_id: Uuid,
    #[serde(default)]
    business_id: Option<Uuid>,
    call_type: CallType,
    /// Telephony call identifier assigned by the provider
    telephony_call_id: String,
    #[serde(default)]
    target_phone: Option<String>,
}

/// Register the call context and return the call-setup document the
/// telephony provider consumes.
async fn initiate_call(
    State(state): State<AppState>,
    Json(request): Json<InitiateCallRequest>,
) -> Result<Response, StatusCode> {
    let context = state
        .pipeline
        .request_call(CallRequest {
            lead_id: request.lead_id,
            business_id: request.business_id,
            call_type: request.call_type,
            telephony_call_id: request.telephony_call_id.clone(),
            target_phone: request.target_phone,
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Call initiation failed");
            match e {
                fixline_pipeline::PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
                fixline_pipeline::PipelineError::InvalidState(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        })?;

    let document = call_setup_document(
        &state.config.telephony.greeting,
        &state.config.telephony.stream_url,
        &request.telephony_call_id,
    );
    if let Err(e) = validate_document(&document) {
        // an ill-formed document would strand the call; fail initiation
        tracing::error!(call_id = %context.call_id, error = %e, "Call-setup document invalid");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        document,
    )
        .into_response())
}

/// Telephony media-stream WebSocket
async fn media_stream_handler(
    ws: axum::extract::ws::WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| bridge::handle_media_stream(socket, state))
}

/// Health check: uptime and live session count
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.uptime_secs(),
        "active_sessions": state.sessions.count(),
    }))
}
