//! Device registry endpoints.
//!
//! Devices are the physical players schedules are attached to. Deleting a
//! device decommissions it: its schedule, scheduled jingles and last known
//! playback state are removed, play counters are kept.

use rocket::{Route, State, http::Status, response::status, serde::json::Json};

use crate::{
    error::{ApiError, ScheduleError},
    live_playback::LivePlaybackTracker,
    logged_json::LoggedJson,
    models::{Device, DeviceInput},
    orm::{
        DbConn,
        device::{delete_device, get_all_devices, get_device_by_id, insert_device},
    },
};

/// Loads a device or fails with 404. Shared by endpoints that take a
/// device id in the path.
pub(crate) async fn require_device(db: &DbConn, device_id: i32) -> Result<Device, ScheduleError> {
    db.run(move |conn| get_device_by_id(conn, device_id))
        .await?
        .ok_or_else(|| ScheduleError::NotFound(format!("Device {} not found", device_id)))
}

/// Create Device endpoint.
///
/// - **URL:** `/api/devices`
/// - **Method:** `POST`
///
/// ```json
/// { "name": "Central Mall Entrance", "location": "Level 0" }
/// ```
///
/// Returns 201 with the device, 400 for an empty name and 409 when the name
/// is taken.
#[post("/devices", data = "<input>")]
pub async fn create_device(
    db: DbConn,
    input: LoggedJson<DeviceInput>,
) -> Result<status::Created<Json<Device>>, ApiError> {
    let mut input = input.into_inner();
    input.name = input.name.trim().to_string();
    if input.name.is_empty() {
        return Err(ScheduleError::validation("name", "must not be empty").into());
    }

    let device = db.run(move |conn| insert_device(conn, input)).await.map_err(|e| {
        let err = ScheduleError::from(e);
        if err.is_unique_violation() {
            ScheduleError::Conflict("A device with this name already exists".to_string())
        } else {
            err
        }
    })?;

    info!("Registered device {} ({})", device.id, device.name);
    Ok(status::Created::new(format!("/api/devices/{}", device.id)).body(Json(device)))
}

/// List Devices endpoint, ordered by id.
#[get("/devices")]
pub async fn list_devices(db: DbConn) -> Result<Json<Vec<Device>>, ApiError> {
    let devices = db.run(get_all_devices).await.map_err(ScheduleError::from)?;
    Ok(Json(devices))
}

#[get("/devices/<device_id>")]
pub async fn get_device(db: DbConn, device_id: i32) -> Result<Json<Device>, ApiError> {
    Ok(Json(require_device(&db, device_id).await?))
}

/// Decommission Device endpoint. Returns 204, or 404 for an unknown id.
#[delete("/devices/<device_id>")]
pub async fn decommission_device(
    db: DbConn,
    tracker: &State<LivePlaybackTracker>,
    device_id: i32,
) -> Result<Status, ApiError> {
    let deleted =
        db.run(move |conn| delete_device(conn, device_id)).await.map_err(ScheduleError::from)?;
    if deleted == 0 {
        return Err(ScheduleError::NotFound(format!("Device {} not found", device_id)).into());
    }
    tracker.forget_device(device_id);
    info!("Decommissioned device {}", device_id);
    Ok(Status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![create_device, list_devices, get_device, decommission_device]
}
