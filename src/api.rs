use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::{
    app_state::AppState,
    classifier::ClassificationError,
    ingest::{LoadError, UploadedFile},
    llm::StructuredLlm,
    pipeline::{ClaimError, ClaimOutcome},
};

// --- Respuestas de la API ---

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub request_id: Uuid,
    pub processed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: ClaimOutcome,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Upload(#[from] MultipartError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Claim(#[from] ClaimError),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Upload(e) => (e.status(), "bad_request"),
            Self::Load(LoadError::Pdf { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "document_processing_failed")
            }
            Self::Load(e) if e.is_client_error() => (StatusCode::BAD_REQUEST, "bad_request"),
            Self::Load(_) => (StatusCode::INTERNAL_SERVER_ERROR, "document_processing_failed"),
            Self::Claim(ClaimError::Classification(ClassificationError::NoPages)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "document_processing_failed")
            }
            Self::Claim(ClaimError::Classification(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "classification_failed")
            }
            Self::Claim(ClaimError::Extraction(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "extraction_failed")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let detail = match &self {
            Self::Upload(e) => e.body_text(),
            other => other.to_string(),
        };
        if status.is_server_error() {
            error!("Error procesando la reclamación ({}): {}", code, detail);
        }
        (status, Json(json!({ "error": code, "detail": detail }))).into_response()
    }
}

// --- Router ---

pub fn create_router<L: StructuredLlm>(app_state: AppState<L>) -> Router {
    let body_limit = app_state.config.max_upload_bytes;
    Router::new()
        .route("/", get(health_handler))
        .route("/generate-claim", post(generate_claim_handler::<L>))
        .route("/generate-claim-fast", post(generate_claim_fast_handler::<L>))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(app_state)
}

// --- Handlers ---

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "message": "API is running" }))
}

async fn generate_claim_handler<L: StructuredLlm>(
    State(state): State<AppState<L>>,
    multipart: Multipart,
) -> Result<Json<ClaimResponse>, ApiError> {
    process_claim(state, multipart, false).await
}

async fn generate_claim_fast_handler<L: StructuredLlm>(
    State(state): State<AppState<L>>,
    multipart: Multipart,
) -> Result<Json<ClaimResponse>, ApiError> {
    process_claim(state, multipart, true).await
}

async fn process_claim<L: StructuredLlm>(
    state: AppState<L>,
    multipart: Multipart,
    fast: bool,
) -> Result<Json<ClaimResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("claim", %request_id, fast);

    async move {
        let files = read_files(multipart).await?;
        info!(files = files.len(), "Petición de reclamación recibida");

        let pages = state.loader.load(request_id, files).await?;
        let outcome = if fast {
            state.pipeline.generate_claim_fast(pages.into()).await?
        } else {
            state.pipeline.generate_claim(pages.into()).await?
        };

        Ok(Json(ClaimResponse {
            request_id,
            processed_at: Utc::now(),
            outcome,
        }))
    }
    .instrument(span)
    .await
}

/// Recoge las partes `files` del formulario; el resto se ignora.
async fn read_files(mut multipart: Multipart) -> Result<Vec<UploadedFile>, ApiError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("files") {
            continue;
        }
        let name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await?;
        files.push(UploadedFile {
            name,
            bytes: bytes.to_vec(),
        });
    }
    Ok(files)
}
