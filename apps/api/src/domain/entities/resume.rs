use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const DEFAULT_COLOR_HEX: &str = "#000000";
pub const DEFAULT_BORDER_STYLE: &str = "squircle";

/// Stored resume metadata. The editor's form contents live on the client
/// until saved; this service only tracks what entitlement checks and the
/// document list need.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resume {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub color_hex: String,
    pub border_style: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
