//! measurement ingestion and query endpoints.
//!
//! endpoints:
//! - `POST /measurements` - device upload, authenticated by device key
//! - `GET /measurements/{mac}` - paged history for a device
//! - `GET /measurements/{mac}/latest` - most recent sample
//! - `GET /measurements/recent` - most recent samples, optionally per user
//!
//! ## Upload authentication
//!
//! 1. Normalize and validate the mac (400 on failure)
//! 2. Resolve the device and its links - an unknown or unenrolled
//!    device is 401
//! 3. Verify the `X-Api-Key` token against the stored hashes
//!    (constant-time per link, lowest link id first)
//! 4. Cross-check device owner against the matched link's user - a
//!    mismatch is 403 and logged, it means the registry is inconsistent
//!
//! all 401 responses share one message so a probe cannot distinguish
//! "unknown device" from "wrong key". the body never selects the user:
//! identity comes from the key (or, with `ingest.allow_unverified`, from
//! the link itself).

use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::AppState;
use crate::handlers::devices::parse_mac;
use crate::handlers::{ApiError, OptionExt, ResultExt};
use aerolog_db::Database;
use aerolog_types::{Device, DeviceKeyToken, DeviceUserLink, Measurement};

/// header carrying the raw device key on uploads.
const API_KEY_HEADER: &str = "x-api-key";

/// uniform message for every upload authentication failure.
const UNAUTHORIZED_MSG: &str = "unauthorized device";

/// default page size for history queries.
const DEFAULT_LIMIT: u64 = 100;

/// upper bound for client-supplied limits.
const MAX_LIMIT: u64 = 1000;

/// request body for a measurement upload.
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    /// device mac address, any common format.
    #[serde(rename = "deviceId")]
    pub device_id: String,
    /// co2 concentration in ppm.
    pub co2: f64,
    /// temperature in degrees celsius.
    pub temperature: f64,
    /// relative humidity in percent.
    pub humidity: f64,
    /// optional client timestamp; normalized to utc. server time is
    /// used when absent.
    pub timestamp: Option<DateTime<Utc>>,
}

/// paging parameters for history queries.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// page size, clamped to 1..=1000.
    pub limit: Option<u64>,
    /// rows to skip.
    pub offset: Option<u64>,
}

/// parameters for the recent-measurements query.
#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    /// number of samples, clamped to 1..=1000.
    pub limit: Option<u64>,
    /// restrict to one user's devices.
    #[serde(rename = "userId")]
    pub user_id: Option<u64>,
}

/// measurement representation in api responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementResponse {
    /// measurement id.
    pub id: u64,
    /// the device that produced the sample.
    pub device_id: u64,
    /// the owning user.
    pub user_id: u64,
    /// co2 concentration in ppm.
    pub co2: f64,
    /// temperature in degrees celsius.
    pub temperature: f64,
    /// relative humidity in percent.
    pub humidity: f64,
    /// utc receive timestamp.
    pub recorded_at: String,
}

impl From<&Measurement> for MeasurementResponse {
    fn from(m: &Measurement) -> Self {
        Self {
            id: m.id.0,
            device_id: m.device_id.0,
            user_id: m.user_id.0,
            co2: m.co2,
            temperature: m.temperature,
            humidity: m.humidity,
            recorded_at: m.recorded_at.to_rfc3339(),
        }
    }
}

fn clamp_limit(limit: Option<u64>) -> u64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// pick the link the upload authenticates against.
///
/// with key verification on, the presented token is checked against
/// every link's stored hash, lowest link id first, and the matching
/// link wins. with `allow_unverified` the oldest link is used directly.
fn authenticate_upload(
    state: &AppState,
    headers: &HeaderMap,
    links: &[DeviceUserLink],
) -> Result<DeviceUserLink, ApiError> {
    if state.config.ingest.allow_unverified {
        return links
            .first()
            .cloned()
            .or_unauthorized(UNAUTHORIZED_MSG);
    }

    let raw = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_unauthorized(UNAUTHORIZED_MSG)?;

    let token =
        DeviceKeyToken::new(raw).map_err(|_| ApiError::unauthorized(UNAUTHORIZED_MSG))?;

    links
        .iter()
        .find(|link| link.verify_key(&token))
        .cloned()
        .or_unauthorized(UNAUTHORIZED_MSG)
}

/// POST /measurements - authenticated device upload.
pub async fn ingest_measurement(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<IngestRequest>,
) -> Result<Json<Value>, ApiError> {
    let mac = parse_mac(&request.device_id)?;

    let device = state
        .db
        .get_device_by_mac(&mac)
        .await
        .map_internal()?
        .or_unauthorized(UNAUTHORIZED_MSG)?;

    let links = state
        .db
        .list_links_for_device(device.id)
        .await
        .map_internal()?;

    let link = authenticate_upload(&state, &headers, &links)?;

    // registry consistency check: the matched link must agree with the
    // device row about who owns this device
    if link.user_id != device.user_id {
        tracing::error!(
            device_id = device.id.0,
            link_id = link.id.0,
            device_owner = device.user_id.0,
            link_owner = link.user_id.0,
            "device owner and link owner disagree, rejecting upload"
        );
        return Err(ApiError::forbidden("device ownership mismatch"));
    }

    let mut measurement = Measurement::new(
        device.id,
        link.user_id,
        link.id,
        request.co2,
        request.temperature,
        request.humidity,
    )
    .map_err(|e| ApiError::validation(e.to_string()))?;
    if let Some(ts) = request.timestamp {
        measurement.recorded_at = ts;
    }

    let stored = state
        .db
        .create_measurement(&measurement)
        .await
        .map_internal()?;

    touch_last_seen(&state, &device);

    Ok(Json(json!({
        "message": "measurement stored",
        "data": MeasurementResponse::from(&stored),
    })))
}

/// update last_seen_at off the request path; failures are logged only.
fn touch_last_seen(state: &AppState, device: &Device) {
    let db = state.db.clone();
    let device_id = device.id;
    tokio::spawn(async move {
        if let Err(e) = db.touch_device_last_seen(device_id, Utc::now()).await {
            tracing::warn!(device_id = device_id.0, error = %e, "failed to touch last_seen_at");
        }
    });
}

/// GET /measurements/{mac} - paged history, newest first.
pub async fn list_measurements(
    State(state): State<AppState>,
    Path(mac): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let mac = parse_mac(&mac)?;
    let device = state
        .db
        .get_device_by_mac(&mac)
        .await
        .map_internal()?
        .or_not_found("device not found")?;

    let limit = clamp_limit(query.limit);
    let offset = query.offset.unwrap_or(0);

    let page = state
        .db
        .list_measurements_for_device(device.id, limit, offset)
        .await
        .map_internal()?;

    Ok(Json(json!({
        "total": page.total,
        "limit": limit,
        "offset": offset,
        "items": page.items.iter().map(MeasurementResponse::from).collect::<Vec<_>>(),
    })))
}

/// GET /measurements/{mac}/latest - most recent sample for a device.
pub async fn latest_measurement(
    State(state): State<AppState>,
    Path(mac): Path<String>,
) -> Result<Json<MeasurementResponse>, ApiError> {
    let mac = parse_mac(&mac)?;
    let device = state
        .db
        .get_device_by_mac(&mac)
        .await
        .map_internal()?
        .or_not_found("device not found")?;

    let latest = state
        .db
        .latest_measurement_for_device(device.id)
        .await
        .map_internal()?
        .or_not_found("no measurements for device")?;

    Ok(Json(MeasurementResponse::from(&latest)))
}

/// GET /measurements/recent - newest samples, optionally for one user.
pub async fn recent_measurements(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = clamp_limit(query.limit);

    let items = match query.user_id {
        Some(user_id) => state
            .db
            .recent_measurements_for_user(aerolog_types::UserId(user_id), limit)
            .await
            .map_internal()?,
        None => state.db.recent_measurements(limit).await.map_internal()?,
    };

    Ok(Json(json!({
        "count": items.len(),
        "items": items.iter().map(MeasurementResponse::from).collect::<Vec<_>>(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_helpers::{
        get_json, post_json, post_json_with_headers, seed_user, test_app, test_app_with_config,
    };
    use aerolog_types::Config;
    use axum::http::StatusCode;
    use serde_json::json;

    const MAC: &str = "aa:bb:cc:dd:ee:ff";

    /// enroll a device and return its raw key.
    async fn enroll(app: &axum::Router, mac: &str, user_id: u64) -> String {
        let (status, body) = post_json(
            app,
            "/device-users/enroll",
            json!({"deviceId": mac, "userId": user_id}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["deviceKey"].as_str().unwrap().to_string()
    }

    fn sample(mac: &str) -> serde_json::Value {
        json!({"deviceId": mac, "co2": 412.0, "temperature": 21.5, "humidity": 45.0})
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(50)), 50);
        assert_eq!(clamp_limit(Some(10_000)), MAX_LIMIT);
    }

    #[tokio::test]
    async fn test_upload_with_valid_key() {
        let app = test_app().await;
        let user_id = seed_user(&app, "alice").await;
        let key = enroll(&app, MAC, user_id).await;

        let (status, body) =
            post_json_with_headers(&app, "/measurements", &[("X-Api-Key", &key)], sample(MAC))
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["co2"], 412.0);
        assert_eq!(body["data"]["userId"], user_id);
    }

    #[tokio::test]
    async fn test_upload_accepts_any_mac_format() {
        let app = test_app().await;
        let user_id = seed_user(&app, "alice").await;
        let key = enroll(&app, MAC, user_id).await;

        // enrolled with colons, uploads with dashes
        let (status, _) = post_json_with_headers(
            &app,
            "/measurements",
            &[("X-Api-Key", &key)],
            sample("AA-BB-CC-DD-EE-FF"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_upload_auth_failures() {
        let app = test_app().await;
        let user_id = seed_user(&app, "alice").await;
        let key = enroll(&app, MAC, user_id).await;

        // missing header
        let (status, _) = post_json(&app, "/measurements", sample(MAC)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // wrong key
        let wrong = aerolog_types::DeviceKeyToken::generate();
        let (status, _) = post_json_with_headers(
            &app,
            "/measurements",
            &[("X-Api-Key", wrong.as_str())],
            sample(MAC),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // unknown device, valid key
        let (status, _) = post_json_with_headers(
            &app,
            "/measurements",
            &[("X-Api-Key", &key)],
            sample("11:22:33:44:55:66"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // malformed mac is a validation error, not auth
        let (status, _) = post_json_with_headers(
            &app,
            "/measurements",
            &[("X-Api-Key", &key)],
            sample("bogus"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // nothing was stored along the way
        let (_, body) = get_json(&app, &format!("/measurements/{}", MAC)).await;
        assert_eq!(body["total"], 0);
    }

    #[tokio::test]
    async fn test_key_does_not_transfer_between_devices() {
        let app = test_app().await;
        let user_id = seed_user(&app, "alice").await;
        let key_a = enroll(&app, MAC, user_id).await;
        let _key_b = enroll(&app, "11:22:33:44:55:66", user_id).await;

        // device B rejects device A's key
        let (status, _) = post_json_with_headers(
            &app,
            "/measurements",
            &[("X-Api-Key", &key_a)],
            sample("11:22:33:44:55:66"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_upload_range_validation() {
        let app = test_app().await;
        let user_id = seed_user(&app, "alice").await;
        let key = enroll(&app, MAC, user_id).await;

        let bad = [
            json!({"deviceId": MAC, "co2": 0.0, "temperature": 21.0, "humidity": 45.0}),
            json!({"deviceId": MAC, "co2": 412.0, "temperature": 250.0, "humidity": 45.0}),
            json!({"deviceId": MAC, "co2": 412.0, "temperature": 21.0, "humidity": 101.0}),
        ];
        for body in bad {
            let (status, _) =
                post_json_with_headers(&app, "/measurements", &[("X-Api-Key", &key)], body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_upload_with_client_timestamp() {
        let app = test_app().await;
        let user_id = seed_user(&app, "alice").await;
        let key = enroll(&app, MAC, user_id).await;

        // offset timestamp is normalized to utc
        let body = json!({
            "deviceId": MAC,
            "co2": 412.0,
            "temperature": 21.5,
            "humidity": 45.0,
            "timestamp": "2026-08-20T12:00:00+02:00",
        });
        let (status, body) =
            post_json_with_headers(&app, "/measurements", &[("X-Api-Key", &key)], body).await;
        assert_eq!(status, StatusCode::OK);
        assert!(
            body["data"]["recordedAt"]
                .as_str()
                .unwrap()
                .starts_with("2026-08-20T10:00:00")
        );
    }

    #[tokio::test]
    async fn test_allow_unverified_skips_key_but_not_enrollment() {
        let mut config = Config::default();
        config.ingest.allow_unverified = true;
        let app = test_app_with_config(config).await;
        let user_id = seed_user(&app, "alice").await;
        enroll(&app, MAC, user_id).await;

        // enrolled device uploads without a key
        let (status, _) = post_json(&app, "/measurements", sample(MAC)).await;
        assert_eq!(status, StatusCode::OK);

        // an unenrolled device is still rejected
        let (status, _) = post_json(&app, "/measurements", sample("11:22:33:44:55:66")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_history_paging_and_latest() {
        let app = test_app().await;
        let user_id = seed_user(&app, "alice").await;
        let key = enroll(&app, MAC, user_id).await;

        for i in 0..3 {
            let body = json!({
                "deviceId": MAC,
                "co2": 400.0 + i as f64,
                "temperature": 21.0,
                "humidity": 45.0,
                "timestamp": format!("2026-08-20T12:0{}:00Z", i),
            });
            let (status, _) =
                post_json_with_headers(&app, "/measurements", &[("X-Api-Key", &key)], body).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) =
            get_json(&app, &format!("/measurements/{}?limit=2&offset=0", MAC)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        assert_eq!(body["items"].as_array().unwrap().len(), 2);
        assert_eq!(body["items"][0]["co2"], 402.0);

        let (status, body) = get_json(&app, &format!("/measurements/{}/latest", MAC)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["co2"], 402.0);

        let (status, body) = get_json(&app, "/measurements/recent?limit=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);

        let (status, body) =
            get_json(&app, &format!("/measurements/recent?userId={}", user_id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);
    }

    #[tokio::test]
    async fn test_history_for_unknown_device() {
        let app = test_app().await;

        let (status, _) = get_json(&app, "/measurements/aa:bb:cc:dd:ee:ff").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = get_json(&app, "/measurements/aa:bb:cc:dd:ee:ff/latest").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_latest_for_device_without_samples() {
        let app = test_app().await;
        let user_id = seed_user(&app, "alice").await;
        enroll(&app, MAC, user_id).await;

        let (status, _) = get_json(&app, &format!("/measurements/{}/latest", MAC)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
