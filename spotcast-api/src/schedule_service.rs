//! Device schedule lifecycle.
//!
//! The free functions run against a single connection and are what the
//! admin CLI calls directly. [`DeviceScheduleService`] wraps them for the
//! HTTP layer: it validates input before touching the database, serializes
//! read-modify-write sequences per schedule and fans bulk assignments out
//! over pooled connections.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use diesel::prelude::*;
use futures_util::future::join_all;

use crate::error::ScheduleError;
use crate::locks::{LockKey, ScheduleLocks};
use crate::models::{
    AddScheduledJingleRequest, BulkAssignRequest, BulkAssignResult, DeviceSchedule,
    DeviceScheduleInput, DeviceScheduleWithJingles, JingleAssignment, NewDeviceSchedule,
    NewScheduledJingle, ScheduledJingle, ScheduledJingleChanges, ScheduledJingleDetail,
    ScheduledJingleUpdate,
};
use crate::orm::{DbConn, DbPool};
use crate::orm::campaign::get_jingle_by_id;
use crate::orm::device::get_device_by_id;
use crate::orm::device_schedule::{
    delete_schedule_for_device, delete_scheduled_jingle, get_schedule_by_device,
    get_schedule_by_id, get_scheduled_jingle_by_id, get_scheduled_jingles_with_jingles,
    insert_scheduled_jingle, update_scheduled_jingle, upsert_schedule,
};
use crate::play_order::{EffectiveJingle, PlayOrderResult, compute_play_order};

pub const TIME_FORMAT: &str = "%H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const NO_SCHEDULE_MESSAGE: &str = "Configure the device schedule time first";

/// Highest daily spot count accepted for one entry.
pub const MAX_SPOTS: i32 = 10_000;

pub fn parse_time_of_day(field: &str, value: &str) -> Result<NaiveTime, ScheduleError> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT).map_err(|_| {
        ScheduleError::validation(field, format!("'{}' is not a valid HH:MM:SS time", value))
    })
}

pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, ScheduleError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        ScheduleError::validation(field, format!("'{}' is not a valid YYYY-MM-DD date", value))
    })
}

fn check_spots(spots: i32) -> Result<(), ScheduleError> {
    if spots < 1 {
        return Err(ScheduleError::validation("spots", "must be at least 1"));
    }
    if spots > MAX_SPOTS {
        return Err(ScheduleError::validation("spots", format!("must be at most {}", MAX_SPOTS)));
    }
    Ok(())
}

fn check_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), ScheduleError> {
    if start > end {
        return Err(ScheduleError::validation("endDate", "must not be before startDate"));
    }
    Ok(())
}

/// A jingle assignment whose fields have been parsed and checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAssignment {
    pub jingle_id: i32,
    pub spots: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
}

impl ValidatedAssignment {
    fn for_schedule(&self, device_schedule_id: i32) -> NewScheduledJingle {
        NewScheduledJingle {
            device_schedule_id,
            jingle_id: self.jingle_id,
            spots: self.spots,
            start_date: self.start_date,
            end_date: self.end_date,
            is_active: self.is_active,
        }
    }
}

pub fn validate_assignment(
    assignment: &JingleAssignment,
) -> Result<ValidatedAssignment, ScheduleError> {
    check_spots(assignment.spots)?;
    let start_date = parse_date("startDate", &assignment.start_date)?;
    let end_date = parse_date("endDate", &assignment.end_date)?;
    check_date_range(start_date, end_date)?;
    Ok(ValidatedAssignment {
        jingle_id: assignment.jingle_id,
        spots: assignment.spots,
        start_date,
        end_date,
        is_active: assignment.is_active,
    })
}

/// Parses the supplied fields of a partial update. Cross-field checks need
/// the stored row and happen in [`update_jingle`].
pub fn validate_update(update: &ScheduledJingleUpdate) -> Result<ScheduledJingleChanges, ScheduleError> {
    if let Some(spots) = update.spots {
        check_spots(spots)?;
    }
    Ok(ScheduledJingleChanges {
        jingle_id: update.jingle_id,
        spots: update.spots,
        start_date: update.start_date.as_deref().map(|d| parse_date("startDate", d)).transpose()?,
        end_date: update.end_date.as_deref().map(|d| parse_date("endDate", d)).transpose()?,
        is_active: update.is_active,
    })
}

fn require_jingle(conn: &mut SqliteConnection, jingle_id: i32) -> Result<(), ScheduleError> {
    match get_jingle_by_id(conn, jingle_id)? {
        Some(_) => Ok(()),
        None => Err(ScheduleError::NotFound(format!("Jingle {} not found", jingle_id))),
    }
}

fn require_schedule(
    conn: &mut SqliteConnection,
    device_id: i32,
) -> Result<DeviceSchedule, ScheduleError> {
    get_schedule_by_device(conn, device_id)?.ok_or_else(|| {
        ScheduleError::NotFound(format!("No schedule configured for device {}", device_id))
    })
}

/// Creates the device's schedule or updates its window and switch in place.
/// A start later than the end is an overnight window, not an error.
pub fn create_or_update_schedule(
    conn: &mut SqliteConnection,
    input: &DeviceScheduleInput,
) -> Result<DeviceSchedule, ScheduleError> {
    let start = parse_time_of_day("playbackWindowStart", &input.playback_window_start)?;
    let end = parse_time_of_day("playbackWindowEnd", &input.playback_window_end)?;
    let device_id = input.device_id;

    conn.immediate_transaction(|conn| {
        if get_device_by_id(conn, device_id)?.is_none() {
            return Err(ScheduleError::NotFound(format!("Device {} not found", device_id)));
        }
        let schedule = upsert_schedule(
            conn,
            NewDeviceSchedule {
                device_id,
                playback_window_start: start,
                playback_window_end: end,
                is_active: input.is_active,
            },
        )?;
        Ok(schedule)
    })
}

pub fn add_jingle(
    conn: &mut SqliteConnection,
    device_schedule_id: i32,
    assignment: &ValidatedAssignment,
) -> Result<ScheduledJingle, ScheduleError> {
    conn.immediate_transaction(|conn| {
        if get_schedule_by_id(conn, device_schedule_id)?.is_none() {
            return Err(ScheduleError::validation(
                "deviceScheduleId",
                format!("Device schedule {} does not exist", device_schedule_id),
            ));
        }
        require_jingle(conn, assignment.jingle_id)?;
        Ok(insert_scheduled_jingle(conn, &assignment.for_schedule(device_schedule_id))?)
    })
}

/// Adds every assignment to one device's schedule, all or nothing for that
/// device.
pub fn assign_to_device(
    conn: &mut SqliteConnection,
    device_id: i32,
    assignments: &[ValidatedAssignment],
) -> Result<Vec<ScheduledJingle>, ScheduleError> {
    conn.immediate_transaction(|conn| {
        let schedule = match get_schedule_by_device(conn, device_id)? {
            Some(schedule) => schedule,
            None if get_device_by_id(conn, device_id)?.is_none() => {
                return Err(ScheduleError::NotFound(format!("Device {} not found", device_id)));
            }
            None => return Err(ScheduleError::Conflict(NO_SCHEDULE_MESSAGE.to_string())),
        };

        let mut created = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            require_jingle(conn, assignment.jingle_id)?;
            created.push(insert_scheduled_jingle(conn, &assignment.for_schedule(schedule.id))?);
        }
        Ok(created)
    })
}

pub fn update_jingle(
    conn: &mut SqliteConnection,
    entry_id: i32,
    changes: &ScheduledJingleChanges,
) -> Result<ScheduledJingle, ScheduleError> {
    conn.immediate_transaction(|conn| {
        let current = get_scheduled_jingle_by_id(conn, entry_id)?.ok_or_else(|| {
            ScheduleError::NotFound(format!("Scheduled jingle {} not found", entry_id))
        })?;

        check_date_range(
            changes.start_date.unwrap_or(current.start_date),
            changes.end_date.unwrap_or(current.end_date),
        )?;
        if let Some(jingle_id) = changes.jingle_id {
            require_jingle(conn, jingle_id)?;
        }

        let unchanged = changes.jingle_id.is_none()
            && changes.spots.is_none()
            && changes.start_date.is_none()
            && changes.end_date.is_none()
            && changes.is_active.is_none();
        if unchanged {
            return Ok(current);
        }
        Ok(update_scheduled_jingle(conn, entry_id, changes)?)
    })
}

pub fn remove_jingle(conn: &mut SqliteConnection, entry_id: i32) -> Result<(), ScheduleError> {
    match delete_scheduled_jingle(conn, entry_id)? {
        0 => Err(ScheduleError::NotFound(format!("Scheduled jingle {} not found", entry_id))),
        _ => Ok(()),
    }
}

pub fn delete_schedule(conn: &mut SqliteConnection, device_id: i32) -> Result<(), ScheduleError> {
    match delete_schedule_for_device(conn, device_id)? {
        0 => Err(ScheduleError::NotFound(format!(
            "No schedule configured for device {}",
            device_id
        ))),
        _ => Ok(()),
    }
}

/// Schedule with every entry and its lifecycle status on `date`.
pub fn get_schedule_with_jingles(
    conn: &mut SqliteConnection,
    device_id: i32,
    date: NaiveDate,
) -> Result<DeviceScheduleWithJingles, ScheduleError> {
    conn.transaction(|conn| {
        let schedule = require_schedule(conn, device_id)?;
        let scheduled_jingles = get_scheduled_jingles_with_jingles(conn, schedule.id)?
            .into_iter()
            .map(|(entry, jingle)| ScheduledJingleDetail::new(entry, jingle, date))
            .collect();
        Ok(DeviceScheduleWithJingles { schedule, scheduled_jingles })
    })
}

/// Entries effective at `at`: active, within their date range, on an active
/// schedule. Effectiveness is decided by calendar date only.
pub fn get_active_jingles(
    conn: &mut SqliteConnection,
    device_id: i32,
    at: NaiveDateTime,
) -> Result<Vec<ScheduledJingleDetail>, ScheduleError> {
    let date = at.date();
    conn.transaction(|conn| {
        let schedule = require_schedule(conn, device_id)?;
        Ok(get_scheduled_jingles_with_jingles(conn, schedule.id)?
            .into_iter()
            .filter(|(entry, _)| entry.is_effective_on(&schedule, date))
            .map(|(entry, jingle)| ScheduledJingleDetail::new(entry, jingle, date))
            .collect())
    })
}

/// Play loop for the entries effective at `at`. A schedule without
/// effective entries yields an empty loop; a device without a schedule is
/// not found.
pub fn get_play_order(
    conn: &mut SqliteConnection,
    device_id: i32,
    at: NaiveDateTime,
) -> Result<PlayOrderResult, ScheduleError> {
    let effective: Vec<EffectiveJingle> = get_active_jingles(conn, device_id, at)?
        .into_iter()
        .map(|detail| EffectiveJingle {
            jingle_id: detail.entry.jingle_id,
            title: detail.title,
            filename: detail.filename,
            spots: detail.entry.spots.max(0) as u32,
        })
        .collect();
    compute_play_order(&effective).map_err(ScheduleError::from)
}

/// Schedule operations for request handlers.
#[derive(Debug, Default)]
pub struct DeviceScheduleService {
    locks: ScheduleLocks,
}

impl DeviceScheduleService {
    pub fn new() -> Self {
        Self::default()
    }

    async fn schedule_id_for_device(&self, db: &DbConn, device_id: i32) -> Result<i32, ScheduleError> {
        db.run(move |conn| require_schedule(conn, device_id)).await.map(|s| s.id)
    }

    pub async fn create_or_update(
        &self,
        db: &DbConn,
        input: DeviceScheduleInput,
    ) -> Result<DeviceSchedule, ScheduleError> {
        let _device = self.locks.lock(LockKey::Device(input.device_id)).await;
        db.run(move |conn| create_or_update_schedule(conn, &input)).await
    }

    pub async fn add_jingle(
        &self,
        db: &DbConn,
        request: AddScheduledJingleRequest,
    ) -> Result<ScheduledJingle, ScheduleError> {
        let (schedule_id, assignment) = request.into_parts();
        let assignment = validate_assignment(&assignment)?;

        let _schedule = self.locks.lock(LockKey::Schedule(schedule_id)).await;
        db.run(move |conn| add_jingle(conn, schedule_id, &assignment)).await
    }

    pub async fn update_jingle(
        &self,
        db: &DbConn,
        entry_id: i32,
        update: ScheduledJingleUpdate,
    ) -> Result<ScheduledJingle, ScheduleError> {
        let changes = validate_update(&update)?;
        let schedule_id = self.owning_schedule(db, entry_id).await?;

        let _schedule = self.locks.lock(LockKey::Schedule(schedule_id)).await;
        db.run(move |conn| update_jingle(conn, entry_id, &changes)).await
    }

    pub async fn remove_jingle(&self, db: &DbConn, entry_id: i32) -> Result<(), ScheduleError> {
        let schedule_id = self.owning_schedule(db, entry_id).await?;

        let _schedule = self.locks.lock(LockKey::Schedule(schedule_id)).await;
        db.run(move |conn| remove_jingle(conn, entry_id)).await
    }

    async fn owning_schedule(&self, db: &DbConn, entry_id: i32) -> Result<i32, ScheduleError> {
        let entry = db.run(move |conn| get_scheduled_jingle_by_id(conn, entry_id)).await?;
        entry.map(|e| e.device_schedule_id).ok_or_else(|| {
            ScheduleError::NotFound(format!("Scheduled jingle {} not found", entry_id))
        })
    }

    pub async fn delete_schedule(&self, db: &DbConn, device_id: i32) -> Result<(), ScheduleError> {
        let _device = self.locks.lock(LockKey::Device(device_id)).await;
        let schedule_id = self.schedule_id_for_device(db, device_id).await?;

        let _schedule = self.locks.lock(LockKey::Schedule(schedule_id)).await;
        db.run(move |conn| delete_schedule(conn, device_id)).await
    }

    pub async fn get_schedule(
        &self,
        db: &DbConn,
        device_id: i32,
        date: NaiveDate,
    ) -> Result<DeviceScheduleWithJingles, ScheduleError> {
        db.run(move |conn| get_schedule_with_jingles(conn, device_id, date)).await
    }

    pub async fn get_active_jingles(
        &self,
        db: &DbConn,
        device_id: i32,
        at: NaiveDateTime,
    ) -> Result<Vec<ScheduledJingleDetail>, ScheduleError> {
        db.run(move |conn| get_active_jingles(conn, device_id, at)).await
    }

    /// Recomputes the loop while holding the schedule lock so it never
    /// observes half of a concurrent edit sequence.
    pub async fn get_play_order(
        &self,
        db: &DbConn,
        device_id: i32,
        at: NaiveDateTime,
    ) -> Result<PlayOrderResult, ScheduleError> {
        let schedule_id = self.schedule_id_for_device(db, device_id).await?;

        let _schedule = self.locks.lock(LockKey::Schedule(schedule_id)).await;
        db.run(move |conn| get_play_order(conn, device_id, at)).await
    }

    /// Assigns the same jingles to many devices.
    ///
    /// Every entry is validated up front; an invalid entry fails the whole
    /// request before anything is written. Devices then run concurrently,
    /// each on its own pooled connection, lock and transaction, and one
    /// device failing never affects another. Results follow the request's
    /// device order.
    pub async fn add_jingles_to_multiple_devices(
        &self,
        pool: &DbPool<'_>,
        request: BulkAssignRequest,
    ) -> Result<Vec<BulkAssignResult>, ScheduleError> {
        if request.device_ids.is_empty() {
            return Err(ScheduleError::validation("deviceIds", "at least one device is required"));
        }
        if request.jingles.is_empty() {
            return Err(ScheduleError::validation("jingles", "at least one jingle is required"));
        }
        let assignments = request
            .jingles
            .iter()
            .map(validate_assignment)
            .collect::<Result<Vec<_>, _>>()?;

        let tasks = request
            .device_ids
            .iter()
            .map(|&device_id| self.assign_to_one_device(pool, device_id, assignments.clone()));
        Ok(join_all(tasks).await)
    }

    async fn assign_to_one_device(
        &self,
        pool: &DbPool<'_>,
        device_id: i32,
        assignments: Vec<ValidatedAssignment>,
    ) -> BulkAssignResult {
        let Some(conn) = pool.get().await else {
            error!("No database connection available for device {}", device_id);
            return bulk_failure(device_id, "Database unavailable".to_string());
        };

        let _device = self.locks.lock(LockKey::Device(device_id)).await;
        let schedule_id = match conn.run(move |c| get_schedule_by_device(c, device_id)).await {
            Ok(Some(schedule)) => Some(schedule.id),
            Ok(None) => None,
            Err(e) => return bulk_failure(device_id, describe(ScheduleError::from(e))),
        };
        let _schedule = match schedule_id {
            Some(id) => Some(self.locks.lock(LockKey::Schedule(id)).await),
            None => None,
        };

        match conn.run(move |c| assign_to_device(c, device_id, &assignments)).await {
            Ok(created) => BulkAssignResult { device_id, success: true, error: None, created },
            Err(e) => {
                let message = describe(e);
                warn!("Bulk assignment failed for device {}: {}", device_id, message);
                bulk_failure(device_id, message)
            }
        }
    }
}

fn bulk_failure(device_id: i32, error: String) -> BulkAssignResult {
    BulkAssignResult { device_id, success: false, error: Some(error), created: Vec::new() }
}

/// Per-device error text; database details stay in the log.
fn describe(err: ScheduleError) -> String {
    match err {
        ScheduleError::Database(e) => {
            error!("Database error during bulk assignment: {}", e);
            "Database error".to_string()
        }
        ScheduleError::Validation { field, message } => format!("{}: {}", field, message),
        other => other.to_string(),
    }
}
