//! Storage for device schedules and their scheduled jingles.

use diesel::prelude::*;

use crate::models::{
    DeviceSchedule, Jingle, NewDeviceSchedule, NewScheduledJingle, ScheduledJingle,
    ScheduledJingleChanges,
};

pub fn get_schedule_by_device(
    conn: &mut SqliteConnection,
    schedule_device_id: i32,
) -> Result<Option<DeviceSchedule>, diesel::result::Error> {
    use crate::schema::device_schedules::dsl::*;
    device_schedules
        .filter(device_id.eq(schedule_device_id))
        .select(DeviceSchedule::as_select())
        .first(conn)
        .optional()
}

pub fn get_schedule_by_id(
    conn: &mut SqliteConnection,
    schedule_id: i32,
) -> Result<Option<DeviceSchedule>, diesel::result::Error> {
    use crate::schema::device_schedules::dsl::*;
    device_schedules
        .filter(id.eq(schedule_id))
        .select(DeviceSchedule::as_select())
        .first(conn)
        .optional()
}

/// Inserts the device's schedule or updates the existing one in place, so
/// the schedule id survives reconfiguration.
pub fn upsert_schedule(
    conn: &mut SqliteConnection,
    schedule: NewDeviceSchedule,
) -> Result<DeviceSchedule, diesel::result::Error> {
    use crate::schema::device_schedules::dsl::*;

    match get_schedule_by_device(conn, schedule.device_id)? {
        Some(existing) => {
            diesel::update(device_schedules.filter(id.eq(existing.id)))
                .set((
                    playback_window_start.eq(schedule.playback_window_start),
                    playback_window_end.eq(schedule.playback_window_end),
                    is_active.eq(schedule.is_active),
                ))
                .execute(conn)?;
            device_schedules.find(existing.id).select(DeviceSchedule::as_select()).first(conn)
        }
        None => {
            diesel::insert_into(device_schedules).values(&schedule).execute(conn)?;
            device_schedules.order(id.desc()).select(DeviceSchedule::as_select()).first(conn)
        }
    }
}

/// Removes the device's schedule together with its entries.
pub fn delete_schedule_for_device(
    conn: &mut SqliteConnection,
    schedule_device_id: i32,
) -> Result<usize, diesel::result::Error> {
    use crate::schema::device_schedules::dsl::*;
    diesel::delete(device_schedules.filter(device_id.eq(schedule_device_id))).execute(conn)
}

pub fn insert_scheduled_jingle(
    conn: &mut SqliteConnection,
    entry: &NewScheduledJingle,
) -> Result<ScheduledJingle, diesel::result::Error> {
    use crate::schema::scheduled_jingles::dsl::*;

    diesel::insert_into(scheduled_jingles).values(entry).execute(conn)?;
    scheduled_jingles.order(id.desc()).select(ScheduledJingle::as_select()).first(conn)
}

pub fn get_scheduled_jingle_by_id(
    conn: &mut SqliteConnection,
    entry_id: i32,
) -> Result<Option<ScheduledJingle>, diesel::result::Error> {
    use crate::schema::scheduled_jingles::dsl::*;
    scheduled_jingles
        .filter(id.eq(entry_id))
        .select(ScheduledJingle::as_select())
        .first(conn)
        .optional()
}

/// Applies a non-empty changeset and returns the updated row.
pub fn update_scheduled_jingle(
    conn: &mut SqliteConnection,
    entry_id: i32,
    changes: &ScheduledJingleChanges,
) -> Result<ScheduledJingle, diesel::result::Error> {
    use crate::schema::scheduled_jingles::dsl::*;

    diesel::update(scheduled_jingles.filter(id.eq(entry_id))).set(changes).execute(conn)?;
    scheduled_jingles.find(entry_id).select(ScheduledJingle::as_select()).first(conn)
}

pub fn delete_scheduled_jingle(
    conn: &mut SqliteConnection,
    entry_id: i32,
) -> Result<usize, diesel::result::Error> {
    use crate::schema::scheduled_jingles::dsl::*;
    diesel::delete(scheduled_jingles.filter(id.eq(entry_id))).execute(conn)
}

/// Entries of a schedule joined with their jingles, in insertion order.
pub fn get_scheduled_jingles_with_jingles(
    conn: &mut SqliteConnection,
    schedule_id: i32,
) -> Result<Vec<(ScheduledJingle, Jingle)>, diesel::result::Error> {
    use crate::schema::{jingles, scheduled_jingles};

    scheduled_jingles::table
        .inner_join(jingles::table)
        .filter(scheduled_jingles::device_schedule_id.eq(schedule_id))
        .order(scheduled_jingles::id.asc())
        .select((ScheduledJingle::as_select(), Jingle::as_select()))
        .load(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::device::delete_device;
    use crate::orm::testing::{create_test_device, create_test_jingle, setup_test_db};
    use chrono::{NaiveDate, NaiveTime};

    fn window(device_id: i32, start: u32, end: u32) -> NewDeviceSchedule {
        NewDeviceSchedule {
            device_id,
            playback_window_start: NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
            playback_window_end: NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
            is_active: true,
        }
    }

    fn entry(schedule_id: i32, jingle_id: i32, spots: i32) -> NewScheduledJingle {
        NewScheduledJingle {
            device_schedule_id: schedule_id,
            jingle_id,
            spots,
            start_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
            is_active: true,
        }
    }

    #[test]
    fn test_upsert_keeps_schedule_id() {
        let mut conn = setup_test_db();
        let device = create_test_device(&mut conn, "Kiosk");

        let created = upsert_schedule(&mut conn, window(device.id, 8, 20)).unwrap();
        let updated = upsert_schedule(&mut conn, window(device.id, 22, 6)).unwrap();

        assert_eq!(created.id, updated.id);
        assert_eq!(updated.playback_window_start, NaiveTime::from_hms_opt(22, 0, 0).unwrap());
        assert!(updated.playback_window().is_overnight());
        assert_eq!(get_schedule_by_device(&mut conn, device.id).unwrap().unwrap().id, created.id);
    }

    #[test]
    fn test_entries_join_jingles_in_insertion_order() {
        let mut conn = setup_test_db();
        let device = create_test_device(&mut conn, "Kiosk");
        let schedule = upsert_schedule(&mut conn, window(device.id, 8, 20)).unwrap();
        let a = create_test_jingle(&mut conn, "A");
        let b = create_test_jingle(&mut conn, "B");

        insert_scheduled_jingle(&mut conn, &entry(schedule.id, b.id, 2)).unwrap();
        insert_scheduled_jingle(&mut conn, &entry(schedule.id, a.id, 4)).unwrap();

        let rows = get_scheduled_jingles_with_jingles(&mut conn, schedule.id).unwrap();
        let titles: Vec<&str> = rows.iter().map(|(_, j)| j.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "A"]);
        assert_eq!(rows[1].0.spots, 4);
    }

    #[test]
    fn test_update_and_delete_entry() {
        let mut conn = setup_test_db();
        let device = create_test_device(&mut conn, "Kiosk");
        let schedule = upsert_schedule(&mut conn, window(device.id, 8, 20)).unwrap();
        let jingle = create_test_jingle(&mut conn, "A");
        let created = insert_scheduled_jingle(&mut conn, &entry(schedule.id, jingle.id, 3)).unwrap();

        let changes = ScheduledJingleChanges {
            spots: Some(5),
            is_active: Some(false),
            ..Default::default()
        };
        let updated = update_scheduled_jingle(&mut conn, created.id, &changes).unwrap();
        assert_eq!(updated.spots, 5);
        assert!(!updated.is_active);
        assert_eq!(updated.start_date, created.start_date);

        assert_eq!(delete_scheduled_jingle(&mut conn, created.id).unwrap(), 1);
        assert!(get_scheduled_jingle_by_id(&mut conn, created.id).unwrap().is_none());
    }

    #[test]
    fn test_database_rejects_invalid_entries() {
        let mut conn = setup_test_db();
        let device = create_test_device(&mut conn, "Kiosk");
        let schedule = upsert_schedule(&mut conn, window(device.id, 8, 20)).unwrap();
        let jingle = create_test_jingle(&mut conn, "A");

        assert!(insert_scheduled_jingle(&mut conn, &entry(schedule.id, jingle.id, 0)).is_err());

        let mut inverted = entry(schedule.id, jingle.id, 1);
        inverted.end_date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        assert!(insert_scheduled_jingle(&mut conn, &inverted).is_err());
    }

    #[test]
    fn test_deleting_device_cascades() {
        let mut conn = setup_test_db();
        let device = create_test_device(&mut conn, "Kiosk");
        let schedule = upsert_schedule(&mut conn, window(device.id, 8, 20)).unwrap();
        let jingle = create_test_jingle(&mut conn, "A");
        let created = insert_scheduled_jingle(&mut conn, &entry(schedule.id, jingle.id, 1)).unwrap();

        delete_device(&mut conn, device.id).unwrap();
        assert!(get_schedule_by_id(&mut conn, schedule.id).unwrap().is_none());
        assert!(get_scheduled_jingle_by_id(&mut conn, created.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_schedule_for_device() {
        let mut conn = setup_test_db();
        let device = create_test_device(&mut conn, "Kiosk");
        upsert_schedule(&mut conn, window(device.id, 8, 20)).unwrap();
        assert_eq!(delete_schedule_for_device(&mut conn, device.id).unwrap(), 1);
        assert!(get_schedule_by_device(&mut conn, device.id).unwrap().is_none());
    }
}
