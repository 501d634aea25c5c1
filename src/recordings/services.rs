use bytes::Bytes;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::repo_types::{NewRecording, Recording};
use crate::{error::ApiError, state::AppState, storage::StorageError};

/// A file part received from the client.
pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
    /// Filename the client attached to the part, if any.
    pub file_name: Option<String>,
}

/// Bytes and metadata for a download.
pub struct RecordingFile {
    pub file_name: String,
    pub content_type: String,
    pub body: Bytes,
}

pub fn blob_key(file_id: Uuid) -> String {
    format!("recordings/{file_id}")
}

/// Writes the blob, then the metadata row. No row is created unless the blob
/// write fully succeeded.
pub async fn upload_recording(
    st: &AppState,
    user_id: Uuid,
    file_name: Option<String>,
    file: Option<UploadItem>,
) -> Result<Recording, ApiError> {
    let Some(file) = file.filter(|f| !f.body.is_empty()) else {
        error!(%user_id, "no file received");
        return Err(ApiError::BadRequest("No file received".into()));
    };

    let file_name = file_name
        .or(file.file_name)
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::BadRequest("fileName is required".into()))?;

    let file_id = Uuid::new_v4();
    let key = blob_key(file_id);
    let size = file.body.len();
    st.storage
        .put_object(&key, file.body, &file.content_type)
        .await
        .map_err(|e| ApiError::internal("Failed to upload file", e))?;
    info!(%user_id, %file_id, size, content_type = %file.content_type, "blob stored");

    let created = st
        .recordings
        .create(NewRecording {
            user_id,
            file_name,
            file_id,
        })
        .await;

    match created {
        Ok(recording) => {
            info!(%user_id, recording_id = %recording.id, %file_id, "recording saved");
            Ok(recording)
        }
        Err(e) => {
            if let Err(cleanup) = st.storage.delete_object(&key).await {
                warn!(error = %cleanup, %file_id, "orphaned blob left behind");
            }
            Err(ApiError::internal("Failed to save recording", e))
        }
    }
}

pub async fn list_recordings(st: &AppState, user_id: Uuid) -> Result<Vec<Recording>, ApiError> {
    let recordings = st
        .recordings
        .list_by_user(user_id)
        .await
        .map_err(|e| ApiError::internal("Failed to retrieve recordings", e))?;
    info!(%user_id, count = recordings.len(), "recordings retrieved");
    Ok(recordings)
}

/// Removes the blob and then the metadata row.
///
/// The lookup is not scoped to the caller, so any authenticated user can
/// delete any recording by id. Cross-user deletions are logged.
pub async fn delete_recording(
    st: &AppState,
    caller_id: Uuid,
    recording_id: Uuid,
) -> Result<(), ApiError> {
    let recording = st
        .recordings
        .find_by_id(recording_id)
        .await
        .map_err(|e| ApiError::internal("Failed to delete recording", e))?
        .ok_or_else(|| {
            error!(%recording_id, "recording not found");
            ApiError::NotFound("Recording not found".into())
        })?;

    if recording.user_id != caller_id {
        warn!(
            %recording_id,
            owner_id = %recording.user_id,
            %caller_id,
            "deleting a recording owned by another user"
        );
    }

    match st.storage.delete_object(&blob_key(recording.file_id)).await {
        Ok(()) => info!(file_id = %recording.file_id, "blob deleted"),
        Err(StorageError::NotFound(_)) => {
            warn!(file_id = %recording.file_id, "blob not found, skipping deletion");
        }
        Err(e) => return Err(ApiError::internal("Failed to delete recording file", e)),
    }

    st.recordings
        .delete(recording_id)
        .await
        .map_err(|e| ApiError::internal("Failed to delete recording", e))?;
    info!(%recording_id, "recording deleted");
    Ok(())
}

/// Fetches the blob behind one of the caller's recordings.
pub async fn download_recording(
    st: &AppState,
    caller_id: Uuid,
    recording_id: Uuid,
) -> Result<RecordingFile, ApiError> {
    let recording = st
        .recordings
        .find_by_id(recording_id)
        .await
        .map_err(|e| ApiError::internal("Failed to retrieve recording", e))?
        .filter(|r| r.user_id == caller_id)
        .ok_or_else(|| ApiError::NotFound("Recording not found".into()))?;

    let object = match st.storage.get_object(&blob_key(recording.file_id)).await {
        Ok(obj) => obj,
        Err(StorageError::NotFound(_)) => {
            warn!(%recording_id, file_id = %recording.file_id, "blob missing for recording");
            return Err(ApiError::NotFound("Recording file not found".into()));
        }
        Err(e) => return Err(ApiError::internal("Failed to retrieve recording", e)),
    };

    Ok(RecordingFile {
        file_name: recording.file_name,
        content_type: object.content_type,
        body: object.body,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;

    use super::*;
    use crate::{
        recordings::repo::MemoryRecordingRepo,
        storage::{MemoryStorage, StorageClient},
    };

    fn audio(bytes: &'static [u8]) -> Option<UploadItem> {
        Some(UploadItem {
            body: Bytes::from_static(bytes),
            content_type: "audio/m4a".into(),
            file_name: Some("clip.m4a".into()),
        })
    }

    fn state_with(recordings: Arc<MemoryRecordingRepo>, storage: Arc<MemoryStorage>) -> AppState {
        let mut state = AppState::fake();
        state.recordings = recordings;
        state.storage = storage;
        state
    }

    #[tokio::test]
    async fn upload_stores_exact_bytes_and_one_row() {
        let repo = Arc::new(MemoryRecordingRepo::default());
        let storage = Arc::new(MemoryStorage::new());
        let st = state_with(repo.clone(), storage.clone());
        let user = Uuid::new_v4();

        let rec = upload_recording(&st, user, Some("Morning memo".into()), audio(b"RIFF....WAVE"))
            .await
            .expect("upload");

        assert_eq!(rec.user_id, user);
        assert_eq!(rec.file_name, "Morning memo");
        assert_eq!(repo.count().await, 1);
        let obj = storage.get_object(&blob_key(rec.file_id)).await.unwrap();
        assert_eq!(obj.body, Bytes::from_static(b"RIFF....WAVE"));
        assert_eq!(obj.content_type, "audio/m4a");
    }

    #[tokio::test]
    async fn upload_without_file_is_bad_request() {
        let repo = Arc::new(MemoryRecordingRepo::default());
        let storage = Arc::new(MemoryStorage::new());
        let st = state_with(repo.clone(), storage.clone());

        let err = upload_recording(&st, Uuid::new_v4(), Some("x".into()), None)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = upload_recording(&st, Uuid::new_v4(), Some("x".into()), audio(b""))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        assert_eq!(repo.count().await, 0);
        assert_eq!(storage.len().await, 0);
    }

    #[tokio::test]
    async fn upload_falls_back_to_part_filename() {
        let st = AppState::fake();
        let rec = upload_recording(&st, Uuid::new_v4(), None, audio(b"data"))
            .await
            .unwrap();
        assert_eq!(rec.file_name, "clip.m4a");
    }

    #[tokio::test]
    async fn failed_blob_write_creates_no_row() {
        let repo = Arc::new(MemoryRecordingRepo::default());
        let st = state_with(repo.clone(), Arc::new(MemoryStorage::failing_writes()));

        let err = upload_recording(&st, Uuid::new_v4(), Some("a".into()), audio(b"data"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(repo.count().await, 0);
    }

    #[tokio::test]
    async fn failed_metadata_write_cleans_up_blob() {
        let storage = Arc::new(MemoryStorage::new());
        let st = state_with(Arc::new(MemoryRecordingRepo::failing_inserts()), storage.clone());

        let err = upload_recording(&st, Uuid::new_v4(), Some("a".into()), audio(b"data"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(storage.len().await, 0);
    }

    #[tokio::test]
    async fn listing_is_scoped_to_caller() {
        let st = AppState::fake();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        upload_recording(&st, alice, Some("a1".into()), audio(b"1")).await.unwrap();
        upload_recording(&st, alice, Some("a2".into()), audio(b"2")).await.unwrap();
        upload_recording(&st, bob, Some("b1".into()), audio(b"3")).await.unwrap();

        let mine = list_recordings(&st, alice).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|r| r.user_id == alice));

        let theirs = list_recordings(&st, bob).await.unwrap();
        assert_eq!(theirs.len(), 1);
        assert_eq!(theirs[0].file_name, "b1");
    }

    #[tokio::test]
    async fn delete_removes_blob_and_row_then_not_found() {
        let repo = Arc::new(MemoryRecordingRepo::default());
        let storage = Arc::new(MemoryStorage::new());
        let st = state_with(repo.clone(), storage.clone());
        let user = Uuid::new_v4();
        let rec = upload_recording(&st, user, Some("memo".into()), audio(b"abc"))
            .await
            .unwrap();

        delete_recording(&st, user, rec.id).await.expect("delete");
        assert_eq!(repo.count().await, 0);
        assert_eq!(storage.len().await, 0);

        let err = delete_recording(&st, user, rec.id).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_tolerates_missing_blob() {
        let repo = Arc::new(MemoryRecordingRepo::default());
        let storage = Arc::new(MemoryStorage::new());
        let st = state_with(repo.clone(), storage.clone());
        let user = Uuid::new_v4();
        let rec = upload_recording(&st, user, Some("memo".into()), audio(b"abc"))
            .await
            .unwrap();

        storage.delete_object(&blob_key(rec.file_id)).await.unwrap();

        delete_recording(&st, user, rec.id).await.expect("delete");
        assert_eq!(repo.count().await, 0);
    }

    #[tokio::test]
    async fn delete_keeps_row_when_blob_store_fails() {
        let repo = Arc::new(MemoryRecordingRepo::default());
        let st = state_with(repo.clone(), Arc::new(MemoryStorage::failing_deletes()));
        let user = Uuid::new_v4();
        let rec = upload_recording(&st, user, Some("memo".into()), audio(b"abc"))
            .await
            .unwrap();

        let err = delete_recording(&st, user, rec.id).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(repo.count().await, 1);
    }

    #[tokio::test]
    async fn delete_is_not_owner_scoped() {
        let st = AppState::fake();
        let owner = Uuid::new_v4();
        let rec = upload_recording(&st, owner, Some("memo".into()), audio(b"abc"))
            .await
            .unwrap();

        delete_recording(&st, Uuid::new_v4(), rec.id)
            .await
            .expect("any authenticated caller may delete");
        assert!(list_recordings(&st, owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn download_is_owner_scoped() {
        let st = AppState::fake();
        let owner = Uuid::new_v4();
        let rec = upload_recording(&st, owner, Some("memo".into()), audio(b"payload"))
            .await
            .unwrap();

        let file = download_recording(&st, owner, rec.id).await.unwrap();
        assert_eq!(file.body, Bytes::from_static(b"payload"));
        assert_eq!(file.content_type, "audio/m4a");
        assert_eq!(file.file_name, "memo");

        let err = download_recording(&st, Uuid::new_v4(), rec.id)
            .await
            .err()
            .unwrap();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
