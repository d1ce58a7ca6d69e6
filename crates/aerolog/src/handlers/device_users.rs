//! device enrollment handshake endpoints.
//!
//! endpoints:
//! - `POST /device-users/login` - the device-initiated handshake: a
//!   device presents its mac plus its owner's credentials and receives
//!   its long-lived device key exactly once
//! - `POST /device-users/enroll` - owner-initiated, create-only
//!   enrollment that always issues a fresh key
//!
//! both paths rely on the database's unique constraints for atomicity:
//! a lost insert race surfaces as a conflict and is resolved by
//! re-reading the winner's row once.

use axum::{Json, extract::State};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::handlers::devices::parse_mac;
use crate::handlers::{ApiError, OptionExt, ResultExt};
use aerolog_db::Database;
use aerolog_types::{Device, DeviceKeyToken, DeviceUserLink, MacAddr, User, UserId, password};

/// request body for the device login handshake.
#[derive(Debug, Deserialize)]
pub struct DeviceLoginRequest {
    /// device mac address, any common format.
    pub mac: String,
    /// owner's username.
    pub username: String,
    /// owner's password.
    pub password: String,
}

/// request body for owner-initiated enrollment.
#[derive(Debug, Deserialize)]
pub struct DeviceEnrollRequest {
    /// device mac address, any common format.
    #[serde(rename = "deviceId")]
    pub device_id: String,
    /// the enrolling owner.
    #[serde(rename = "userId")]
    pub user_id: u64,
}

/// response body for the device login handshake.
///
/// `device_key` is populated exactly once, on the login that issued the
/// key; every later login returns `key_issued = false` and no key.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceLoginResponse {
    /// the device-user link id.
    pub device_users_id: u64,
    /// the device id.
    pub device_id: u64,
    /// canonical mac address.
    pub mac: String,
    /// the raw device key, only on the issuing login.
    pub device_key: Option<String>,
    /// whether this login issued the key.
    pub key_issued: bool,
}

/// response body for owner-initiated enrollment.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEnrollResponse {
    /// the device-user link id.
    pub device_users_id: u64,
    /// the raw device key - shown only here.
    pub device_key: String,
}

/// verify a username + password pair, undifferentiated on failure.
async fn verify_owner(
    state: &AppState,
    username: &str,
    plaintext: &str,
) -> Result<User, ApiError> {
    let user = state
        .db
        .get_user_by_username(&username.to_lowercase())
        .await
        .map_internal()?;

    let verified = user
        .as_ref()
        .map(|u| password::verify(&u.password_hash, plaintext))
        .unwrap_or(false);
    if !verified {
        return Err(ApiError::unauthorized("invalid credentials"));
    }
    user.or_unauthorized("invalid credentials")
}

/// fetch the device for a mac, creating an auto-registered row owned by
/// `owner` on first contact. never reassigns ownership.
///
/// a concurrent first contact for the same mac makes the insert race on
/// the unique mac index; the loser re-reads the winner's row.
async fn get_or_register_device(
    state: &AppState,
    mac: &MacAddr,
    owner: UserId,
) -> Result<Device, ApiError> {
    if let Some(device) = state.db.get_device_by_mac(mac).await.map_internal()? {
        return Ok(device);
    }

    match state
        .db
        .create_device(&Device::auto_registered(mac.clone(), owner))
        .await
    {
        Ok(device) => {
            tracing::info!(device_id = device.id.0, mac = %device.mac, "device auto-registered");
            Ok(device)
        }
        Err(aerolog_db::Error::Conflict) => state
            .db
            .get_device_by_mac(mac)
            .await
            .map_internal()?
            .ok_or_else(|| ApiError::internal("device insert conflict but row not found")),
        Err(e) => Err(ApiError::internal(e)),
    }
}

/// fetch the link for (device, user), creating a keyless one if absent.
async fn get_or_create_link(
    state: &AppState,
    device_id: aerolog_types::DeviceId,
    user_id: UserId,
) -> Result<DeviceUserLink, ApiError> {
    if let Some(link) = state.db.find_link(device_id, user_id).await.map_internal()? {
        return Ok(link);
    }

    match state
        .db
        .create_link(&DeviceUserLink::new(device_id, user_id))
        .await
    {
        Ok(link) => Ok(link),
        Err(aerolog_db::Error::Conflict) => state
            .db
            .find_link(device_id, user_id)
            .await
            .map_internal()?
            .ok_or_else(|| ApiError::internal("link insert conflict but row not found")),
        Err(e) => Err(ApiError::internal(e)),
    }
}

/// update the device's last_seen_at without blocking the response.
fn touch_last_seen(state: &AppState, device_id: aerolog_types::DeviceId) {
    let db = state.db.clone();
    tokio::spawn(async move {
        if let Err(e) = db.touch_device_last_seen(device_id, Utc::now()).await {
            tracing::warn!(device_id = device_id.0, error = %e, "failed to touch last_seen_at");
        }
    });
}

/// POST /device-users/login - the device key handshake.
///
/// idempotent: the key is issued on the first login after the link
/// exists and never again; repeating the call does not rotate it.
pub async fn device_login(
    State(state): State<AppState>,
    Json(request): Json<DeviceLoginRequest>,
) -> Result<Json<DeviceLoginResponse>, ApiError> {
    let mac = parse_mac(&request.mac)?;
    let user = verify_owner(&state, &request.username, &request.password).await?;

    let device = get_or_register_device(&state, &mac, user.id).await?;
    if device.user_id != user.id {
        return Err(ApiError::forbidden("device is registered to another user"));
    }

    touch_last_seen(&state, device.id);

    let link = get_or_create_link(&state, device.id, user.id).await?;

    if link.is_keyed() {
        return Ok(Json(DeviceLoginResponse {
            device_users_id: link.id.0,
            device_id: device.id.0,
            mac: mac.into_inner(),
            device_key: None,
            key_issued: false,
        }));
    }

    // issue-once: the conditional update loses cleanly if another login
    // issued the key in between
    let token = DeviceKeyToken::generate();
    let issued = state
        .db
        .set_link_key_hash(link.id, &token.hash_hex())
        .await
        .map_internal()?;

    if issued {
        tracing::info!(
            link_id = link.id.0,
            device_id = device.id.0,
            key_prefix = token.prefix(),
            "device key issued"
        );
    }

    Ok(Json(DeviceLoginResponse {
        device_users_id: link.id.0,
        device_id: device.id.0,
        mac: mac.into_inner(),
        device_key: issued.then(|| token.into_inner()),
        key_issued: issued,
    }))
}

/// POST /device-users/enroll - owner-initiated, create-only enrollment.
///
/// unlike login this never reuses an existing link: a link that already
/// exists is a conflict, and a successful call always carries a fresh key.
pub async fn device_enroll(
    State(state): State<AppState>,
    Json(request): Json<DeviceEnrollRequest>,
) -> Result<Json<DeviceEnrollResponse>, ApiError> {
    let mac = parse_mac(&request.device_id)?;
    let user_id = UserId(request.user_id);

    state
        .db
        .get_user(user_id)
        .await
        .map_internal()?
        .or_not_found("user not found")?;

    let device = get_or_register_device(&state, &mac, user_id).await?;
    if device.user_id != user_id {
        return Err(ApiError::forbidden("device is registered to another user"));
    }

    let token = DeviceKeyToken::generate();
    let mut link = DeviceUserLink::new(device.id, user_id);
    link.set_key(&token);

    let created = match state.db.create_link(&link).await {
        Ok(created) => created,
        Err(aerolog_db::Error::Conflict) => {
            return Err(ApiError::conflict("device already enrolled for this user"));
        }
        Err(e) => return Err(ApiError::internal(e)),
    };

    tracing::info!(
        link_id = created.id.0,
        device_id = device.id.0,
        key_prefix = token.prefix(),
        "device enrolled"
    );

    Ok(Json(DeviceEnrollResponse {
        device_users_id: created.id.0,
        device_key: token.into_inner(),
    }))
}
