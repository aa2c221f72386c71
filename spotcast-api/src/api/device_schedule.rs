//! Device schedule endpoints.
//!
//! A device has at most one schedule: a daily playback window plus the
//! jingles assigned to it with their daily spot counts and date ranges.
//! Effectiveness and play order are derived on every read.
//!
//! Read endpoints accept `?at=YYYY-MM-DDTHH:MM:SS` (or a bare date) to
//! evaluate another instant; the default is the server's local time.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rocket::{Route, State, http::Status, response::status, serde::json::Json};

use crate::{
    error::{ApiError, ScheduleError},
    logged_json::LoggedJson,
    models::{
        AddScheduledJingleRequest, BulkAssignRequest, BulkAssignResult, DeviceSchedule,
        DeviceScheduleInput, DeviceScheduleWithJingles, ScheduledJingle, ScheduledJingleDetail,
        ScheduledJingleUpdate,
    },
    orm::{DbConn, DbPool},
    play_order::PlayOrderResult,
    schedule_service::{DATE_FORMAT, DeviceScheduleService},
};

const INSTANT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn resolve_instant(at: Option<&str>) -> Result<NaiveDateTime, ScheduleError> {
    let Some(at) = at else {
        return Ok(chrono::Local::now().naive_local());
    };
    NaiveDateTime::parse_from_str(at, INSTANT_FORMAT)
        .or_else(|_| {
            NaiveDate::parse_from_str(at, DATE_FORMAT).map(|d| d.and_time(NaiveTime::MIN))
        })
        .map_err(|_| {
            ScheduleError::validation("at", format!("'{}' is not a YYYY-MM-DDTHH:MM:SS instant", at))
        })
}

/// Upsert Device Schedule endpoint.
///
/// - **URL:** `/api/device-schedules`
/// - **Method:** `POST`
///
/// ```json
/// {
///   "deviceId": 4,
///   "playbackWindowStart": "22:00:00",
///   "playbackWindowEnd": "06:00:00",
///   "isActive": true
/// }
/// ```
///
/// A start later than the end is an overnight window. The schedule is
/// updated in place when the device already has one, keeping its id.
///
/// **Error Responses:** 400 for a malformed time, 404 for an unknown device.
#[post("/device-schedules", data = "<input>")]
pub async fn upsert_device_schedule(
    db: DbConn,
    service: &State<DeviceScheduleService>,
    input: LoggedJson<DeviceScheduleInput>,
) -> Result<Json<DeviceSchedule>, ApiError> {
    let schedule = service.create_or_update(&db, input.into_inner()).await?;
    Ok(Json(schedule))
}

/// Get Device Schedule endpoint: the schedule with every entry, each
/// carrying its jingle's title and filename and its lifecycle `status`
/// (`pending`, `active`, `expired` or `disabled`). 404 without a schedule.
#[get("/device-schedules/device/<device_id>?<at>")]
pub async fn get_device_schedule(
    db: DbConn,
    service: &State<DeviceScheduleService>,
    device_id: i32,
    at: Option<&str>,
) -> Result<Json<DeviceScheduleWithJingles>, ApiError> {
    let date = resolve_instant(at)?.date();
    Ok(Json(service.get_schedule(&db, device_id, date).await?))
}

#[delete("/device-schedules/device/<device_id>")]
pub async fn delete_device_schedule(
    db: DbConn,
    service: &State<DeviceScheduleService>,
    device_id: i32,
) -> Result<Status, ApiError> {
    service.delete_schedule(&db, device_id).await?;
    info!("Removed schedule of device {}", device_id);
    Ok(Status::NoContent)
}

/// Get Active Jingles endpoint: entries effective at the instant.
#[get("/device-schedules/device/<device_id>/active?<at>")]
pub async fn get_active_jingles(
    db: DbConn,
    service: &State<DeviceScheduleService>,
    device_id: i32,
    at: Option<&str>,
) -> Result<Json<Vec<ScheduledJingleDetail>>, ApiError> {
    let at = resolve_instant(at)?;
    Ok(Json(service.get_active_jingles(&db, device_id, at).await?))
}

/// Get Play Order endpoint.
///
/// - **URL:** `/api/device-schedules/device/<device_id>/play-order`
/// - **Method:** `GET`
///
/// ```json
/// {
///   "playOrder": [{"jingleId": 1, "title": "A", "filename": "a.mp3"}, ...],
///   "gcd": 2,
///   "adCounts": {"1": 4, "2": 2, "3": 1},
///   "totalAds": 7
/// }
/// ```
///
/// A schedule without effective jingles yields an empty loop with `gcd` 0;
/// a device without a schedule is 404.
#[get("/device-schedules/device/<device_id>/play-order?<at>")]
pub async fn get_play_order(
    db: DbConn,
    service: &State<DeviceScheduleService>,
    device_id: i32,
    at: Option<&str>,
) -> Result<Json<PlayOrderResult>, ApiError> {
    let at = resolve_instant(at)?;
    Ok(Json(service.get_play_order(&db, device_id, at).await?))
}

/// Add Scheduled Jingle endpoint.
///
/// - **URL:** `/api/device-schedules/jingles`
/// - **Method:** `POST`
///
/// ```json
/// {
///   "deviceScheduleId": 2,
///   "jingleId": 7,
///   "spots": 12,
///   "startDate": "2024-05-01",
///   "endDate": "2024-05-31",
///   "isActive": true
/// }
/// ```
///
/// `percentage` is accepted in place of `spots`. Returns 201 with the entry;
/// 400 when `spots < 1`, the dates are inverted or malformed, or the
/// schedule does not exist; 404 for an unknown jingle.
#[post("/device-schedules/jingles", data = "<request>")]
pub async fn add_scheduled_jingle(
    db: DbConn,
    service: &State<DeviceScheduleService>,
    request: LoggedJson<AddScheduledJingleRequest>,
) -> Result<status::Created<Json<ScheduledJingle>>, ApiError> {
    let entry = service.add_jingle(&db, request.into_inner()).await?;
    Ok(status::Created::new(format!("/api/device-schedules/jingles/{}", entry.id)).body(Json(entry)))
}

/// Bulk Add endpoint.
///
/// - **URL:** `/api/device-schedules/jingles/bulk`
/// - **Method:** `POST`
///
/// ```json
/// {
///   "deviceIds": [1, 2, 3],
///   "jingles": [{"jingleId": 7, "spots": 6, "startDate": "2024-05-01", "endDate": "2024-05-31"}]
/// }
/// ```
///
/// Always 200 once the entries are valid, with one result per device:
///
/// ```json
/// [
///   {"deviceId": 1, "success": true, "created": [...]},
///   {"deviceId": 2, "success": false, "error": "Configure the device schedule time first"}
/// ]
/// ```
#[post("/device-schedules/jingles/bulk", data = "<request>")]
pub async fn bulk_add_scheduled_jingles(
    pool: DbPool<'_>,
    service: &State<DeviceScheduleService>,
    request: LoggedJson<BulkAssignRequest>,
) -> Result<Json<Vec<BulkAssignResult>>, ApiError> {
    let results = service.add_jingles_to_multiple_devices(&pool, request.into_inner()).await?;
    let failed = results.iter().filter(|r| !r.success).count();
    info!("Bulk assignment: {} devices, {} failed", results.len(), failed);
    Ok(Json(results))
}

/// Update Scheduled Jingle endpoint. Absent fields keep their value.
#[put("/device-schedules/jingles/<entry_id>", data = "<update>")]
pub async fn update_scheduled_jingle(
    db: DbConn,
    service: &State<DeviceScheduleService>,
    entry_id: i32,
    update: LoggedJson<ScheduledJingleUpdate>,
) -> Result<Json<ScheduledJingle>, ApiError> {
    Ok(Json(service.update_jingle(&db, entry_id, update.into_inner()).await?))
}

#[delete("/device-schedules/jingles/<entry_id>")]
pub async fn remove_scheduled_jingle(
    db: DbConn,
    service: &State<DeviceScheduleService>,
    entry_id: i32,
) -> Result<Status, ApiError> {
    service.remove_jingle(&db, entry_id).await?;
    Ok(Status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![
        upsert_device_schedule,
        get_device_schedule,
        delete_device_schedule,
        get_active_jingles,
        get_play_order,
        add_scheduled_jingle,
        bulk_add_scheduled_jingles,
        update_scheduled_jingle,
        remove_scheduled_jingle
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_instant_formats() {
        let full = resolve_instant(Some("2024-05-02T23:30:00")).unwrap();
        assert_eq!(full.to_string(), "2024-05-02 23:30:00");
        let date_only = resolve_instant(Some("2024-05-02")).unwrap();
        assert_eq!(date_only.to_string(), "2024-05-02 00:00:00");
        assert!(resolve_instant(Some("tomorrow")).is_err());
    }
}
