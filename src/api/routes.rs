use axum::{
    routing::post,
    Router,
    extract::{rejection::JsonRejection, Json, State},
    response::{IntoResponse, Response},
};
use std::path::Path;
use tower_http::cors::{CorsLayer, Any};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::api::models::{SummarizeRequest, SummarizeResponse};
use crate::api::response;
use crate::error::PipelineError;
use crate::AppState;

/// `POST /summarize`, plus the form page and its script from `static_dir`
/// when that directory exists.
pub fn create_router(app_state: AppState, static_dir: Option<&Path>) -> Router {
    let mut router = Router::new()
        .route("/summarize", post(summarize_handler))
        .with_state(app_state);

    if let Some(dir) = static_dir.filter(|dir| dir.is_dir()) {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn summarize_handler(
    State(state): State<AppState>,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        // A body that is not declared as JSON carries no url.
        Err(JsonRejection::MissingJsonContentType(_)) => {
            return response::error(PipelineError::missing_url());
        }
        Err(rejection) => {
            warn!(reason = %rejection.body_text(), "Rejected summarize request body");
            return response::error(PipelineError::ClientRequest(rejection.body_text()));
        }
    };

    let Some(url) = req.url() else {
        return response::error(PipelineError::missing_url());
    };

    info!(%url, "Received request to summarize");
    let start_time = std::time::Instant::now();

    match state.pipeline.run(url).await {
        Ok(summary) => {
            info!(%url, elapsed = ?start_time.elapsed(), "Successfully summarized");
            response::success(SummarizeResponse { summary }).into_response()
        }
        Err(err) => {
            error!(%url, error = %err, status = err.status_code().as_u16(), "Summarization failed");
            response::error(err)
        }
    }
}
