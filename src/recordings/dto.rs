use serde::Serialize;

use crate::recordings::repo_types::Recording;

#[derive(Debug, Serialize)]
pub struct RecordingResponse {
    pub status: &'static str,
    pub recording: Recording,
}

#[derive(Debug, Serialize)]
pub struct RecordingListResponse {
    pub status: &'static str,
    pub recordings: Vec<Recording>,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub status: &'static str,
}
