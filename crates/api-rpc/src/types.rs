//! RPC Request/Response Types

use boothline_core::domain::{
    EntryView, QueueSettings, QueueStatus, SettingsUpdate, TokenNumber, UserPosition,
};
use serde::{Deserialize, Serialize};

/// queue.join.v1
#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRequest {
    pub booth_id: String,
    pub event_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinResponse {
    pub booth_id: String,
    pub token_number: TokenNumber,
    pub position: usize,
    pub estimated_wait_time: u32,
}

/// queue.leave.v1
#[derive(Debug, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub booth_id: String,
    pub user_id: String,
    #[serde(default)]
    pub leave_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveResponse {
    pub booth_id: String,
    pub token_number: TokenNumber,
    pub actual_wait_time: u32,
}

/// queue.serve_next.v1 / queue.complete.v1 / queue.status.v1 / queue.subscribe.v1
#[derive(Debug, Serialize, Deserialize)]
pub struct BoothRequest {
    pub booth_id: String,
}

/// `served: None` with `queue_empty: true` is the "no one to serve" answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeNextResponse {
    pub booth_id: String,
    pub served: Option<EntryView>,
    pub queue_empty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteResponse {
    pub booth_id: String,
    pub completed: Option<EntryView>,
}

/// queue.position.v1
#[derive(Debug, Serialize, Deserialize)]
pub struct PositionRequest {
    pub booth_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionResponse {
    pub booth_id: String,
    pub user_id: String,
    pub position: Option<UserPosition>,
}

/// admin.settings.v1
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateSettingsRequest {
    pub booth_id: String,
    #[serde(flatten)]
    pub update: SettingsUpdate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub booth_id: String,
    pub settings: QueueSettings,
}

/// admin.status.v1
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub booth_id: String,
    pub status: QueueStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeResponse {
    pub booth_id: String,
    pub previous: QueueStatus,
    pub status: QueueStatus,
}
