//! Read access to play counters.

use rocket::{Route, serde::json::Json};

use crate::{
    error::{ApiError, ScheduleError},
    models::{CampaignPlayCounts, DevicePlayCount},
    orm::{
        DbConn,
        play_counter::{get_campaign_play_counts, get_device_play_counts},
    },
};

/// Campaign total and per-jingle totals; zero for a campaign that never
/// played.
#[get("/play-counts/campaigns/<campaign_id>")]
pub async fn campaign_play_counts(
    db: DbConn,
    campaign_id: i32,
) -> Result<Json<CampaignPlayCounts>, ApiError> {
    let counts = db
        .run(move |conn| get_campaign_play_counts(conn, campaign_id))
        .await
        .map_err(ScheduleError::from)?;
    Ok(Json(counts))
}

/// Per campaign and jingle totals of one device. Counters outlive the
/// device, so a decommissioned id still answers.
#[get("/play-counts/devices/<device_id>")]
pub async fn device_play_counts(
    db: DbConn,
    device_id: i32,
) -> Result<Json<Vec<DevicePlayCount>>, ApiError> {
    let counts = db
        .run(move |conn| get_device_play_counts(conn, device_id))
        .await
        .map_err(ScheduleError::from)?;
    Ok(Json(counts))
}

pub fn routes() -> Vec<Route> {
    routes![campaign_play_counts, device_play_counts]
}
