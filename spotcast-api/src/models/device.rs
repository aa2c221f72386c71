use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::devices;

/// A physical playback unit installed at a venue.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize, TS)]
#[diesel(table_name = devices)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Device {
    pub id: i32,
    pub name: String,
    pub location: Option<String>,
    #[ts(type = "string")]
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = devices)]
pub struct NewDevice {
    pub name: String,
    pub location: Option<String>,
}

// For API inputs and validation
#[derive(Debug, Deserialize, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DeviceInput {
    pub name: String,
    pub location: Option<String>,
}
