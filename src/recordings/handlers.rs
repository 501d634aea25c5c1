use axum::{
    extract::{
        multipart::MultipartError, multipart::MultipartRejection, DefaultBodyLimit, Multipart,
        Path, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{DeletedResponse, RecordingListResponse, RecordingResponse},
    services::{self, UploadItem},
};
use crate::{auth::extractors::AuthUser, error::ApiError, state::AppState};

pub fn recording_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/recordings", get(list_recordings).post(upload_recording))
        .route("/recordings/:id", delete(delete_recording))
        .route("/recordings/:id/file", get(download_recording))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// POST /recordings (multipart): `file` part plus optional `fileName` text field.
#[instrument(skip(state, mp))]
pub async fn upload_recording(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<Json<RecordingResponse>, ApiError> {
    info!(%user_id, "file upload request received");
    let mut mp = mp?;

    let mut file_name = None;
    let mut file = None;
    while let Some(field) = mp.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("fileName") => {
                file_name = Some(field.text().await.map_err(bad_multipart)?);
            }
            Some("file") => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let part_name = field.file_name().map(str::to_string);
                let body = field.bytes().await.map_err(bad_multipart)?;
                file = Some(UploadItem {
                    body,
                    content_type,
                    file_name: part_name,
                });
            }
            _ => {}
        }
    }

    let recording = services::upload_recording(&state, user_id, file_name, file).await?;
    Ok(Json(RecordingResponse {
        status: "ok",
        recording,
    }))
}

#[instrument(skip(state))]
pub async fn list_recordings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<RecordingListResponse>, ApiError> {
    let recordings = services::list_recordings(&state, user_id).await?;
    Ok(Json(RecordingListResponse {
        status: "ok",
        recordings,
    }))
}

#[instrument(skip(state))]
pub async fn delete_recording(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let id = parse_id(&id)?;
    services::delete_recording(&state, user_id, id).await?;
    Ok(Json(DeletedResponse { status: "ok" }))
}

#[instrument(skip(state))]
pub async fn download_recording(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let file = services::download_recording(&state, user_id, id).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        file.file_name.replace(['"', '\\', '\r', '\n'], "_")
    );
    Ok((
        [
            (header::CONTENT_TYPE, file.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.body,
    ))
}

// A malformed id cannot name an existing recording.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        warn!(id = %raw, "recording not found");
        ApiError::NotFound("Recording not found".into())
    })
}

fn bad_multipart(e: MultipartError) -> ApiError {
    warn!(error = %e, status = %e.status(), "multipart body rejected");
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::PayloadTooLarge("File too large".into());
    }
    ApiError::BadRequest("Malformed multipart body".into())
}
