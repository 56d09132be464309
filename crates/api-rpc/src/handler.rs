//! RPC Method Handlers
//!
//! Thin translation between wire types and `QueueDirectory` calls.

use crate::error::to_rpc_error;
use crate::types::{
    BoothRequest, CompleteResponse, JoinRequest, JoinResponse, LeaveRequest, LeaveResponse,
    PositionRequest, PositionResponse, ServeNextResponse, SettingsResponse, StatusChangeResponse,
    UpdateSettingsRequest, UpdateStatusRequest,
};
use boothline_core::application::QueueDirectory;
use boothline_core::domain::QueueSnapshot;
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use tracing::debug;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    directory: Arc<QueueDirectory>,
}

impl RpcHandler {
    pub fn new(directory: Arc<QueueDirectory>) -> Self {
        Self { directory }
    }

    /// queue.join.v1
    pub async fn join(&self, params: JoinRequest) -> Result<JoinResponse, ErrorObjectOwned> {
        let receipt = self
            .directory
            .join(&params.booth_id, &params.event_id, &params.user_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(JoinResponse {
            booth_id: params.booth_id,
            token_number: receipt.token_number,
            position: receipt.position,
            estimated_wait_time: receipt.estimated_wait_time,
        })
    }

    /// queue.leave.v1
    pub async fn leave(&self, params: LeaveRequest) -> Result<LeaveResponse, ErrorObjectOwned> {
        let receipt = self
            .directory
            .leave(&params.booth_id, &params.user_id, params.leave_message)
            .await
            .map_err(to_rpc_error)?;

        Ok(LeaveResponse {
            booth_id: params.booth_id,
            token_number: receipt.token_number,
            actual_wait_time: receipt.actual_wait_time,
        })
    }

    /// queue.serve_next.v1
    pub async fn serve_next(
        &self,
        params: BoothRequest,
    ) -> Result<ServeNextResponse, ErrorObjectOwned> {
        let served = self
            .directory
            .serve_next(&params.booth_id)
            .await
            .map_err(to_rpc_error)?;

        if served.is_none() {
            debug!(booth_id = %params.booth_id, "ServeNext with nobody waiting");
        }

        Ok(ServeNextResponse {
            booth_id: params.booth_id,
            queue_empty: served.is_none(),
            served,
        })
    }

    /// queue.complete.v1
    pub async fn complete(&self, params: BoothRequest) -> Result<CompleteResponse, ErrorObjectOwned> {
        let completed = self
            .directory
            .complete_current(&params.booth_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(CompleteResponse {
            booth_id: params.booth_id,
            completed,
        })
    }

    /// queue.status.v1
    pub async fn status(&self, params: BoothRequest) -> Result<QueueSnapshot, ErrorObjectOwned> {
        self.directory
            .status(&params.booth_id)
            .await
            .map_err(to_rpc_error)
    }

    /// queue.position.v1
    pub async fn position(
        &self,
        params: PositionRequest,
    ) -> Result<PositionResponse, ErrorObjectOwned> {
        let position = self
            .directory
            .user_position(&params.booth_id, &params.user_id)
            .await
            .map_err(to_rpc_error)?;

        Ok(PositionResponse {
            booth_id: params.booth_id,
            user_id: params.user_id,
            position,
        })
    }

    /// admin.settings.v1
    pub async fn update_settings(
        &self,
        params: UpdateSettingsRequest,
    ) -> Result<SettingsResponse, ErrorObjectOwned> {
        let settings = self
            .directory
            .update_settings(&params.booth_id, params.update)
            .await
            .map_err(to_rpc_error)?;

        Ok(SettingsResponse {
            booth_id: params.booth_id,
            settings,
        })
    }

    /// admin.status.v1
    pub async fn update_status(
        &self,
        params: UpdateStatusRequest,
    ) -> Result<StatusChangeResponse, ErrorObjectOwned> {
        let previous = self
            .directory
            .update_status(&params.booth_id, params.status)
            .await
            .map_err(to_rpc_error)?;

        Ok(StatusChangeResponse {
            booth_id: params.booth_id,
            previous,
            status: params.status,
        })
    }
}
