use diesel::prelude::*;

use crate::models::{Device, DeviceInput, NewDevice};

pub fn insert_device(
    conn: &mut SqliteConnection,
    device_input: DeviceInput,
) -> Result<Device, diesel::result::Error> {
    use crate::schema::devices::dsl::*;

    let new_device = NewDevice {
        name: device_input.name,
        location: device_input.location,
    };

    diesel::insert_into(devices).values(&new_device).execute(conn)?;

    // Return the inserted device
    devices.order(id.desc()).select(Device::as_select()).first(conn)
}

pub fn get_device_by_id(
    conn: &mut SqliteConnection,
    device_id: i32,
) -> Result<Option<Device>, diesel::result::Error> {
    use crate::schema::devices::dsl::*;
    devices.filter(id.eq(device_id)).select(Device::as_select()).first(conn).optional()
}

pub fn get_device_by_name(
    conn: &mut SqliteConnection,
    device_name: &str,
) -> Result<Option<Device>, diesel::result::Error> {
    use crate::schema::devices::dsl::*;
    devices.filter(name.eq(device_name)).select(Device::as_select()).first(conn).optional()
}

/// Gets all devices in the system.
pub fn get_all_devices(conn: &mut SqliteConnection) -> Result<Vec<Device>, diesel::result::Error> {
    use crate::schema::devices::dsl::*;
    devices.order(id.asc()).select(Device::as_select()).load(conn)
}

/// Deletes a device. Its schedule and scheduled jingles go with it through
/// the foreign key cascades; play counters are kept.
pub fn delete_device(
    conn: &mut SqliteConnection,
    device_id: i32,
) -> Result<usize, diesel::result::Error> {
    use crate::schema::devices::dsl::*;
    diesel::delete(devices.filter(id.eq(device_id))).execute(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::testing::setup_test_db;

    fn input(name: &str) -> DeviceInput {
        DeviceInput { name: name.to_string(), location: Some("Lobby".to_string()) }
    }

    #[test]
    fn test_insert_and_get_device() {
        let mut conn = setup_test_db();
        let device = insert_device(&mut conn, input("Mall A")).unwrap();
        assert_eq!(device.name, "Mall A");

        let loaded = get_device_by_id(&mut conn, device.id).unwrap().unwrap();
        assert_eq!(loaded.location.as_deref(), Some("Lobby"));
        assert!(get_device_by_name(&mut conn, "Mall A").unwrap().is_some());
        assert!(get_device_by_id(&mut conn, device.id + 100).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let mut conn = setup_test_db();
        insert_device(&mut conn, input("Station")).unwrap();
        let result = insert_device(&mut conn, input("Station"));
        assert!(matches!(
            result,
            Err(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _
            ))
        ));
    }

    #[test]
    fn test_list_and_delete() {
        let mut conn = setup_test_db();
        let a = insert_device(&mut conn, input("A")).unwrap();
        let b = insert_device(&mut conn, input("B")).unwrap();
        let all = get_all_devices(&mut conn).unwrap();
        assert_eq!(all.iter().map(|d| d.id).collect::<Vec<_>>(), vec![a.id, b.id]);

        assert_eq!(delete_device(&mut conn, a.id).unwrap(), 1);
        assert_eq!(delete_device(&mut conn, a.id).unwrap(), 0);
        assert_eq!(get_all_devices(&mut conn).unwrap().len(), 1);
    }
}
