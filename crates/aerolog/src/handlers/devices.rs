//! device registry endpoints.
//!
//! endpoints:
//! - `POST /devices/register` - explicit registration by an owner
//! - `GET /devices/user/{user_id}` - list an owner's devices
//! - `GET /devices/{mac}` - look up a device by mac

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::AppState;
use crate::handlers::{ApiError, OptionExt, ResultExt};
use aerolog_db::Database;
use aerolog_types::{Device, MacAddr, UserId};

/// request body for explicit device registration.
#[derive(Debug, Deserialize)]
pub struct RegisterDeviceRequest {
    /// device identifier: a mac address in any common format.
    pub id: String,
    /// human-readable name.
    pub name: Option<String>,
    /// where the device is installed.
    pub location: Option<String>,
    /// the registering owner.
    #[serde(rename = "userId")]
    pub user_id: u64,
}

/// device representation in api responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceResponse {
    /// device id.
    pub id: u64,
    /// canonical mac address.
    pub mac: String,
    /// human-readable name.
    pub name: String,
    /// where the device is installed.
    pub location: String,
    /// the owning user.
    pub user_id: u64,
    /// when the device was registered.
    pub registered_at: String,
    /// last successful upload, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<String>,
}

impl From<&Device> for DeviceResponse {
    fn from(device: &Device) -> Self {
        Self {
            id: device.id.0,
            mac: device.mac.as_str().to_string(),
            name: device.name.clone(),
            location: device.location.clone(),
            user_id: device.user_id.0,
            registered_at: device.registered_at.to_rfc3339(),
            last_seen_at: device.last_seen_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

/// parse a mac out of a request, mapping failures to 400.
pub(crate) fn parse_mac(input: &str) -> Result<MacAddr, ApiError> {
    MacAddr::parse(input).map_err(|e| ApiError::validation(format!("invalid mac address: {}", e)))
}

/// POST /devices/register - register a device for an owner.
///
/// rejects a mac that is already registered (409) and a name+location
/// pair the owner already uses, case-insensitively (409) - the latter is
/// confusion prevention, not a security boundary.
pub async fn register_device(
    State(state): State<AppState>,
    Json(request): Json<RegisterDeviceRequest>,
) -> Result<Json<Value>, ApiError> {
    let mac = parse_mac(&request.id)?;
    let user_id = UserId(request.user_id);

    state
        .db
        .get_user(user_id)
        .await
        .map_internal()?
        .or_not_found("user not found")?;

    let name = request
        .name
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| aerolog_types::AUTO_REGISTERED_NAME.to_string());
    let location = request
        .location
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| aerolog_types::AUTO_REGISTERED_LOCATION.to_string());

    let existing = state
        .db
        .list_devices_for_user(user_id)
        .await
        .map_internal()?;
    let duplicate_label = existing.iter().any(|d| {
        d.name.eq_ignore_ascii_case(&name) && d.location.eq_ignore_ascii_case(&location)
    });
    if duplicate_label {
        return Err(ApiError::conflict(
            "a device with this name and location already exists",
        ));
    }

    let device = Device::new(mac, name, location, user_id);
    let created = match state.db.create_device(&device).await {
        Ok(created) => created,
        Err(aerolog_db::Error::Conflict) => {
            return Err(ApiError::conflict("device already registered"));
        }
        Err(e) => return Err(ApiError::internal(e)),
    };

    tracing::info!(device_id = created.id.0, mac = %created.mac, "device registered");

    Ok(Json(json!({
        "message": "device registered",
        "data": DeviceResponse::from(&created),
    })))
}

/// GET /devices/user/{user_id} - list an owner's devices.
pub async fn list_user_devices(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    state
        .db
        .get_user(UserId(user_id))
        .await
        .map_internal()?
        .or_not_found("user not found")?;

    let mut devices = state
        .db
        .list_devices_for_user(UserId(user_id))
        .await
        .map_internal()?;
    // newest first
    devices.reverse();

    Ok(Json(json!({
        "count": devices.len(),
        "items": devices.iter().map(DeviceResponse::from).collect::<Vec<_>>(),
    })))
}

/// GET /devices/{mac} - look up a device by mac address.
pub async fn get_device(
    State(state): State<AppState>,
    Path(mac): Path<String>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let mac = parse_mac(&mac)?;
    let device = state
        .db
        .get_device_by_mac(&mac)
        .await
        .map_internal()?
        .or_not_found("device not found")?;
    Ok(Json(DeviceResponse::from(&device)))
}
