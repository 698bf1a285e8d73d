use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::core::{MatchError, Matcher};
use crate::models::{ErrorResponse, HealthResponse, MatchRequest, MatchResponse, ParseRequest, QualityThresholds};
use crate::services::PostgresStore;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub matcher: Matcher,
    pub thresholds: QualityThresholds,
    /// Absent when running against an in-memory pool
    pub store: Option<PostgresStore>,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/matches", web::post().to(find_matches))
        .route("/requirements/parse", web::post().to(parse_requirement));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let db_healthy = match &state.store {
        Some(store) => store.health_check().await.unwrap_or(false),
        None => true,
    };

    let status = if db_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Find matches endpoint
///
/// POST /api/v1/matches
///
/// Request body:
/// ```json
/// {
///   "requirement": "Senior Python engineer, 3+ years AWS"
/// }
/// ```
async fn find_matches(state: web::Data<AppState>, req: web::Json<MatchRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for match request: {}", errors);
        return validation_error(errors);
    }

    match state.matcher.run(&req.requirement).await {
        Ok(run) => {
            let response = MatchResponse::from_run(&run, &state.thresholds);
            tracing::info!(
                "Returning {} candidates for run {} ({} considered)",
                response.candidates.len(),
                response.run_id,
                response.candidates_considered
            );
            HttpResponse::Ok().json(response)
        }
        Err(e) => match_error_response(&e),
    }
}

/// Parse a requirement without matching
///
/// POST /api/v1/requirements/parse
async fn parse_requirement(state: web::Data<AppState>, req: web::Json<ParseRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state.matcher.parse(&req.requirement).await {
        Ok(requirement) => HttpResponse::Ok().json(requirement),
        Err(e) => match_error_response(&e),
    }
}

fn validation_error(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::UnprocessableEntity().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: StatusCode::UNPROCESSABLE_ENTITY.as_u16(),
    })
}

/// HTTP status for a terminal run error
pub fn status_for(err: &MatchError) -> StatusCode {
    match err {
        MatchError::EmptyRequirement => StatusCode::UNPROCESSABLE_ENTITY,
        MatchError::RetrievalUnavailable { .. } | MatchError::EmbeddingUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        MatchError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
        MatchError::DimensionMismatch { .. } | MatchError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn match_error_response(err: &MatchError) -> HttpResponse {
    let status = status_for(err);
    if status.is_server_error() {
        tracing::error!("Matching run failed: {}", err);
    }

    let error = match err {
        MatchError::EmptyRequirement => "Empty requirement",
        MatchError::RetrievalUnavailable { .. } => "Retrieval unavailable",
        MatchError::EmbeddingUnavailable(_) => "Embedding unavailable",
        MatchError::DimensionMismatch { .. } => "Embedding dimension mismatch",
        MatchError::Repository(_) => "Profile repository error",
        MatchError::DeadlineExceeded(_) => "Run timed out",
    };

    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message: err.to_string(),
        status_code: status.as_u16(),
    })
}
