#[macro_use]
extern crate rocket;

use std::sync::Arc;

use rocket::figment::value::Map;
use rocket::figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use rocket::fs::FileServer;
use rocket::request::Request;
use rocket::serde::json::{Json, Value, json};
use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod live_playback;
pub mod locks;
pub mod logged_json;
pub mod models;
pub mod orm;
pub mod play_order;
pub mod playback_counter;
pub mod schedule_service;
pub mod schema;

#[cfg(test)]
pub mod generate_types;

pub use orm::{DbConn, MIGRATIONS};

use config::SpotcastConfig;
use events::PlaybackHub;
use live_playback::LivePlaybackTracker;
use schedule_service::DeviceScheduleService;

fn error_body(error: &str, status: u16, req: &Request) -> Json<Value> {
    Json(json!({
        "error": error,
        "path": req.uri().path().to_string(),
        "status": status
    }))
}

#[catch(400)]
fn bad_request(req: &Request) -> Json<Value> {
    error_body("Bad Request", 400, req)
}

#[catch(404)]
fn not_found(req: &Request) -> Json<Value> {
    error_body("Not Found", 404, req)
}

#[catch(409)]
fn conflict(req: &Request) -> Json<Value> {
    error_body("Conflict", 409, req)
}

#[catch(422)]
fn unprocessable_entity(req: &Request) -> Json<Value> {
    error_body("Unprocessable Entity", 422, req)
}

#[catch(500)]
fn internal_server_error(req: &Request) -> Json<Value> {
    error_body("Internal Server Error", 500, req)
}

#[catch(default)]
fn default_catcher(status: rocket::http::Status, req: &Request) -> Json<Value> {
    error_body(status.reason().unwrap_or("Unknown Error"), status.code, req)
}

pub fn mount_api_routes(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket.mount("/api", api::routes())
}

/// Attaches the database, shared state, catchers and API routes to a
/// configured Rocket. Used by both the server and `test_rocket`.
pub fn build_rocket(rocket: Rocket<Build>) -> Rocket<Build> {
    let config = SpotcastConfig::from_figment(rocket.figment());
    let hub = Arc::new(PlaybackHub::new(config.event_channel_capacity));
    let tracker = LivePlaybackTracker::new(hub.clone(), &config);

    let rocket = rocket
        .attach(DbConn::fairing())
        .attach(orm::set_foreign_keys_fairing())
        .attach(orm::run_migrations_fairing())
        .manage(config)
        .manage(hub)
        .manage(tracker)
        .manage(DeviceScheduleService::new())
        .register(
            "/",
            catchers![
                bad_request,
                not_found,
                conflict,
                unprocessable_entity,
                internal_server_error,
                default_catcher
            ],
        );

    mount_api_routes(rocket)
}

fn log_rocket_info(rocket: &Rocket<Build>) {
    let figment = rocket.figment();

    if let Ok(address) = figment.extract_inner::<String>("address") {
        info!("Rocket is running at: {}", address);
    }

    if let Ok(port) = figment.extract_inner::<u16>("port") {
        info!("Rocket is listening on port: {}", port);
    }

    match figment.extract_inner::<Map<String, Value>>("databases.sqlite_db") {
        Ok(db_config) => {
            if let Some(Value::String(url)) = db_config.get("url") {
                info!("Database URL: {}", url);
            } else {
                warn!("Database URL not found in configuration");
            }
        }
        Err(e) => {
            warn!("Failed to extract database configuration: {}", e);
        }
    }

    if let Some(config) = rocket.state::<SpotcastConfig>() {
        info!(
            "Live-stream timeout {} ms, playback stale after {} s, event buffer {}",
            config.live_stream_timeout_ms,
            config.playback_stale_after_secs,
            config.event_channel_capacity
        );
    }
}

/// Server entry point. Tests build through `orm::testing::test_rocket`
/// instead, which skips the environment lookups here.
pub fn rocket() -> Rocket<Build> {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let figment = Figment::from(rocket::Config::default())
        .merge(Toml::file("Rocket.toml").nested())
        .merge(Env::prefixed("ROCKET_").global())
        .merge(("databases.sqlite_db.url", database_url));

    let rocket = build_rocket(rocket::custom(figment));
    log_rocket_info(&rocket);

    let static_dir =
        std::env::var("SPOTCAST_STATIC_DIR").unwrap_or_else(|_| "static".to_string());
    rocket.mount("/", FileServer::from(static_dir).rank(10))
}
