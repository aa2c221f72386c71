//! Live playback relay between devices and admin clients.
//!
//! Devices post heartbeats and counted plays here and listen on `/events`
//! for `live:request`; admin clients read state, ask for a fresh report and
//! follow `playback:status` / `playback:new` on the same stream.

use std::sync::Arc;

use rocket::{
    Route, Shutdown, State,
    response::stream::{Event, EventStream},
    serde::json::Json,
    tokio::select,
    tokio::sync::broadcast::error::RecvError,
};

use crate::{
    api::device::require_device,
    error::{ApiError, ScheduleError},
    events::{PlaybackEvent, PlaybackHub, PlayRecordedEvent},
    live_playback::LivePlaybackTracker,
    logged_json::LoggedJson,
    models::{
        LivePlaybackResponse, LivePlaybackState, PlaybackReport, RecordPlayRequest,
        RecordPlayResponse,
    },
    orm::DbConn,
    playback_counter::{PlayRecord, record_play},
};

fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

#[derive(FromForm)]
pub struct EventFilter {
    #[field(name = "deviceId")]
    pub device_id: Option<i32>,
}

/// Real-time event stream (Server-Sent Events).
///
/// - **URL:** `/api/events?deviceId=<id>`
/// - **Method:** `GET`
///
/// Each message uses the channel name as the SSE event name
/// (`playback:status`, `playback:new`, `live:request`) and the JSON payload
/// as data. `deviceId` limits the stream to one device.
#[get("/events?<filter..>")]
pub fn events(
    hub: &State<Arc<PlaybackHub>>,
    filter: EventFilter,
    mut shutdown: Shutdown,
) -> EventStream![] {
    let mut rx = hub.subscribe();
    let device_filter = filter.device_id;

    EventStream! {
        loop {
            let event = select! {
                received = rx.recv() => match received {
                    Ok(event) => event,
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Event stream subscriber lagged, {} events skipped", skipped);
                        continue;
                    }
                },
                _ = &mut shutdown => break,
            };

            if device_filter.is_some_and(|id| id != event.device_id()) {
                continue;
            }
            yield Event::json(&event).event(event.name());
        }
    }
}

/// Playback Report endpoint.
///
/// - **URL:** `/api/live-relay/device/<device_id>/playback`
/// - **Method:** `POST`
///
/// ```json
/// { "jingleId": 7, "positionMs": 12500, "isPlaying": true }
/// ```
///
/// `currentJingle` and `position` are accepted as older field names. The
/// report replaces the device's previous state and is broadcast as
/// `playback:status`. 404 for an unknown device.
#[post("/live-relay/device/<device_id>/playback", data = "<report>")]
pub async fn report_playback(
    db: DbConn,
    tracker: &State<LivePlaybackTracker>,
    device_id: i32,
    report: LoggedJson<PlaybackReport>,
) -> Result<Json<LivePlaybackState>, ApiError> {
    require_device(&db, device_id).await?;
    Ok(Json(tracker.report_playback(device_id, report.into_inner(), now())))
}

/// Playback State endpoint.
///
/// Returns `{"deviceId", "active", "stale", "state"}`; `active: false` with
/// `state: null` means nothing is known to be playing, either because the
/// device never reported or because its last report is too old.
#[get("/live-relay/device/<device_id>/state")]
pub async fn get_playback_state(
    db: DbConn,
    tracker: &State<LivePlaybackTracker>,
    device_id: i32,
) -> Result<Json<LivePlaybackResponse>, ApiError> {
    require_device(&db, device_id).await?;
    Ok(Json(tracker.get_state(device_id, now())))
}

/// Live Stream Request endpoint.
///
/// - **URL:** `/api/live-relay/device/<device_id>/live-stream`
/// - **Method:** `POST`
///
/// Publishes `live:request` for the device and waits for its next report,
/// up to the configured `live_stream_timeout_ms`. A device that does not
/// answer in time still gets a 200: the last known state comes back with
/// `stale: true` and a `timeout` message.
#[post("/live-relay/device/<device_id>/live-stream")]
pub async fn request_live_stream(
    db: DbConn,
    tracker: &State<LivePlaybackTracker>,
    device_id: i32,
) -> Result<Json<LivePlaybackResponse>, ApiError> {
    require_device(&db, device_id).await?;
    let outcome = tracker.request_live_stream(device_id).await;
    Ok(Json(tracker.to_response(device_id, outcome, now())))
}

/// Record Play endpoint.
///
/// - **URL:** `/api/live-relay/device/<device_id>/plays`
/// - **Method:** `POST`
///
/// ```json
/// { "eventId": "0b6f...", "jingleId": 7, "campaignId": 2 }
/// ```
///
/// Counts one physical play. `eventId` makes the call idempotent: a repeated
/// id answers 200 with `recorded: false` and changes no counter.
#[post("/live-relay/device/<device_id>/plays", data = "<request>")]
pub async fn record_device_play(
    db: DbConn,
    hub: &State<Arc<PlaybackHub>>,
    device_id: i32,
    request: LoggedJson<RecordPlayRequest>,
) -> Result<Json<RecordPlayResponse>, ApiError> {
    let request = request.into_inner();
    let jingle_id = request.jingle_id;
    let event_id = request.event_id.clone();

    let record = db
        .run(move |conn| -> Result<PlayRecord, ScheduleError> {
            record_play(conn, device_id, &request, now())
        })
        .await?;

    let recorded = match record {
        PlayRecord::Recorded { campaign_id } => {
            hub.publish(PlaybackEvent::NewPlay(PlayRecordedEvent {
                device_id,
                jingle_id,
                campaign_id,
            }));
            true
        }
        PlayRecord::Duplicate => false,
    };
    Ok(Json(RecordPlayResponse { event_id, recorded }))
}

pub fn routes() -> Vec<Route> {
    routes![events, report_playback, get_playback_state, request_live_stream, record_device_play]
}
