//! Database fixtures for unit and integration tests.

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use rocket::figment::{
    util::map,
    value::{Map, Value},
};
use rocket::{Build, Rocket};
use uuid::Uuid;

use super::db::{run_pending_migrations, set_foreign_keys};
use crate::models::{CampaignInput, Device, DeviceInput, Jingle, JingleInput};
use crate::orm::campaign::{get_all_campaigns, insert_campaign, insert_jingle};
use crate::orm::device::insert_device;

/// Live-stream wait used by `test_rocket`, short enough to keep timeout
/// tests fast.
pub const TEST_LIVE_STREAM_TIMEOUT_MS: u64 = 200;

/// Opens a migrated in-memory database with foreign keys enabled.
///
/// # Panics
/// Panics if the connection or migrations fail.
pub fn setup_test_db() -> SqliteConnection {
    let mut conn =
        SqliteConnection::establish(":memory:").expect("Failed to create in-memory database");
    set_foreign_keys(&mut conn).expect("Failed to enable foreign keys");
    run_pending_migrations(&mut conn);
    conn
}

pub fn create_test_device(conn: &mut SqliteConnection, name: &str) -> Device {
    insert_device(conn, DeviceInput { name: name.to_string(), location: None })
        .expect("Failed to create test device")
}

/// Creates a jingle in the first campaign, creating that campaign when the
/// database has none yet.
pub fn create_test_jingle(conn: &mut SqliteConnection, title: &str) -> Jingle {
    let campaign = match get_all_campaigns(conn).expect("Failed to load campaigns").into_iter().next()
    {
        Some(campaign) => campaign,
        None => insert_campaign(
            conn,
            CampaignInput { name: "Test Campaign".to_string(), brand: "Test Brand".to_string() },
        )
        .expect("Failed to create test campaign"),
    };
    insert_jingle(
        conn,
        campaign.id,
        JingleInput {
            title: title.to_string(),
            filename: format!("{}.mp3", title.to_lowercase()),
            duration_seconds: Some(30),
        },
    )
    .expect("Failed to create test jingle")
}

/// Builds the full application on a fresh SQLite file in the temp directory.
///
/// A file rather than a shared in-memory database keeps concurrent pooled
/// writers on SQLite's busy-wait path instead of failing with table locks.
pub fn test_rocket() -> Rocket<Build> {
    let db_path = std::env::temp_dir().join(format!("spotcast_test_{}.db", Uuid::new_v4()));

    let db_config: Map<_, Value> = map! {
        "url" => db_path.to_string_lossy().into_owned().into(),
        "pool_size" => 5.into(),
        "timeout" => 5.into(),
    };

    let figment = rocket::Config::figment()
        .merge(("databases", map!["sqlite_db" => db_config]))
        .merge(("spotcast.live_stream_timeout_ms", TEST_LIVE_STREAM_TIMEOUT_MS));

    crate::build_rocket(rocket::custom(figment))
}
