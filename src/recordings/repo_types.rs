use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Metadata row describing one uploaded recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub file_id: Uuid, // blob id in the recordings bucket
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewRecording {
    pub user_id: Uuid,
    pub file_name: String,
    pub file_id: Uuid,
}
