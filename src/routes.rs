use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::identify::{Identification, RecognitionError, Recognizer};
use crate::models::{IdentificationResult, IdentifyResponse, Outcome};
use crate::upload::{self, UploadError, UploadedImage};

const IMAGES_FIELD: &str = "images";
const MISSING_IMAGES: &str = "No images provided. Use field name 'images'.";

const INDEX_HTML: &str = include_str!("../templates/index.html");
const ABOUT_HTML: &str = include_str!("../templates/about.html");

pub struct AppState {
    pub config: Config,
    pub recognizer: Recognizer,
}

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_body_bytes;

    let api = Router::new()
        .route("/api/identify", post(identify_endpoint))
        .layer(CorsLayer::permissive());

    Router::new()
        .route("/", get(index))
        .route("/about", get(about))
        .route("/health", get(health))
        .merge(api)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn about() -> Html<&'static str> {
    Html(ABOUT_HTML)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

// ── Identification ───────────────────────────────────────────────────────────

/// One `images` field after reading, before recognition.
enum Slot {
    Ready(UploadedImage),
    Rejected(IdentificationResult),
}

async fn identify_endpoint(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let Ok(mut multipart) = multipart else {
        return error_response(StatusCode::BAD_REQUEST, MISSING_IMAGES);
    };

    let slots = match read_images(&mut multipart, state.config.max_body_bytes).await {
        Ok(slots) => slots,
        Err(resp) => return resp,
    };
    if slots.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, MISSING_IMAGES);
    }

    tracing::info!(count = slots.len(), "identifying images");

    let mut results = Vec::with_capacity(slots.len());
    for (index, slot) in slots.into_iter().enumerate() {
        let result = match slot {
            Slot::Rejected(result) => result,
            Slot::Ready(image) => {
                let outcome = recognition_outcome(
                    state.recognizer.identify(&image.bytes, image.mime_type).await,
                );
                IdentificationResult {
                    index,
                    filename: Some(image.filename),
                    outcome,
                }
            }
        };
        if let Outcome::Failed { error, .. } = &result.outcome {
            tracing::warn!(index, filename = ?result.filename, %error, "image not identified");
        }
        results.push(result);
    }

    (StatusCode::OK, Json(IdentifyResponse { results })).into_response()
}

/// Drains the form, keeping `images` fields in order. Oversized bodies abort
/// the whole request; any other read failure ends the form at that field.
async fn read_images(multipart: &mut Multipart, body_limit: usize) -> Result<Vec<Slot>, Response> {
    let mut slots = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                return Err(too_large(body_limit));
            }
            Err(e) if slots.is_empty() => {
                return Err(error_response(StatusCode::BAD_REQUEST, &e.body_text()));
            }
            Err(e) => {
                tracing::warn!(error = %e.body_text(), "malformed multipart body, keeping earlier images");
                break;
            }
        };
        // Parts without a filename are plain form values, not files.
        if field.name() != Some(IMAGES_FIELD) || field.file_name().is_none() {
            continue;
        }

        let index = slots.len();
        let Some(filename) = upload::resolve_filename(index, field.file_name()) else {
            slots.push(Slot::Rejected(IdentificationResult::failed(
                index,
                None,
                UploadError::EmptyFilename,
            )));
            continue;
        };

        match field.bytes().await {
            Ok(bytes) => match UploadedImage::new(filename.clone(), bytes.to_vec()) {
                Ok(image) => slots.push(Slot::Ready(image)),
                Err(e) => slots.push(Slot::Rejected(IdentificationResult::failed(
                    index,
                    Some(filename),
                    e,
                ))),
            },
            Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                return Err(too_large(body_limit));
            }
            Err(e) => {
                slots.push(Slot::Rejected(IdentificationResult::failed(
                    index,
                    Some(filename),
                    UploadError::Read(e.body_text()),
                )));
                break;
            }
        }
    }

    Ok(slots)
}

fn recognition_outcome(result: Result<Identification, RecognitionError>) -> Outcome {
    match result {
        Ok(id) => Outcome::Identified {
            name: id.name,
            description: id.description,
        },
        Err(e) => {
            let error = e.to_string();
            let raw = match e {
                RecognitionError::UnexpectedFormat { raw } => Some(raw),
                RecognitionError::Request(_) => None,
            };
            Outcome::Failed { error, raw }
        }
    }
}

fn too_large(body_limit: usize) -> Response {
    error_response(
        StatusCode::PAYLOAD_TOO_LARGE,
        &format!(
            "Upload too large. Requests are limited to {} MiB.",
            body_limit / (1024 * 1024)
        ),
    )
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": message}))).into_response()
}
