//! HTTP calls: room creation and existence checks.

use portal_protocol::{CreateRoomResponse, RoomCode, RoomExistsResponse};

use crate::{ClientConfig, ClientError};

/// Asks the server for a new room and returns its code.
///
/// A response without a `roomID` field, or with one that isn't six digits,
/// is a [`ClientError::CreationFailure`].
pub async fn create_room(config: &ClientConfig) -> Result<RoomCode, ClientError> {
    let response = reqwest::Client::new()
        .post(config.create_url())
        .send()
        .await?
        .error_for_status()?;

    let body: CreateRoomResponse = response
        .json()
        .await
        .map_err(|e| ClientError::CreationFailure(e.to_string()))?;

    let code = body
        .room_id
        .ok_or_else(|| ClientError::CreationFailure("response has no roomID".into()))?;
    tracing::info!(room = %code, "room created");
    Ok(code)
}

/// Returns whether a room with this code is currently open.
pub async fn room_exists(
    config: &ClientConfig,
    code: RoomCode,
) -> Result<bool, ClientError> {
    let body: RoomExistsResponse = reqwest::Client::new()
        .get(config.exists_url(code))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(body.exists)
}
