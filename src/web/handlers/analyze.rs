use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::debug;

use crate::models::{AnalyzeRequest, AnalyzeResponse};
use crate::web::responses::validation_error;
use crate::web::AppState;

/// `POST /api/analyze` — run the full analysis pipeline for one
/// manifest reference.
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, Response> {
    let Some(url) = request.url else {
        return Err(validation_error("missing required field: url"));
    };
    let url = url.trim();
    if url.is_empty() {
        return Err(validation_error("url must not be empty"));
    }
    // a syntactically broken URL is a request-validation failure; the
    // gate's 400s are reserved for well-formed references that break a
    // business rule (suffix, blocked host)
    if url::Url::parse(url).is_err() {
        return Err(validation_error("url is not a valid absolute URL"));
    }

    debug!("Analyze request for {}", url);
    state
        .analyzer
        .analyze(url)
        .await
        .map(Json)
        .map_err(IntoResponse::into_response)
}
