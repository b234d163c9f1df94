//! Text-to-speech endpoint

use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use super::ApiState;

/// Build speech synthesis router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/text-to-speech", get(text_to_speech))
        .with_state(state)
}

/// Query parameters for synthesis
#[derive(Debug, Deserialize)]
struct SpeechQuery {
    #[serde(default)]
    text: String,
}

/// Synthesize the query text and return MP3 audio
///
/// One upstream synthesis call per request; the response body is the raw
/// audio exactly as the upstream returned it.
async fn text_to_speech(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<SpeechQuery>,
) -> Result<Response, SpeechError> {
    let text = query.text.trim();
    if text.is_empty() {
        return Err(SpeechError::MissingText);
    }

    let audio = state.synthesizer.synthesize(text).await.map_err(|e| {
        // Detail stays server-side; the client gets a generic failure
        tracing::error!(error = %e, "synthesis request failed");
        SpeechError::Upstream
    })?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "audio/mpeg")],
        audio,
    )
        .into_response())
}

/// Speech endpoint errors
#[derive(Debug)]
enum SpeechError {
    MissingText,
    Upstream,
}

impl IntoResponse for SpeechError {
    fn into_response(self) -> Response {
        match self {
            Self::MissingText => {
                (StatusCode::BAD_REQUEST, "Missing text parameter").into_response()
            }
            Self::Upstream => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error processing text-to-speech",
            )
                .into_response(),
        }
    }
}
