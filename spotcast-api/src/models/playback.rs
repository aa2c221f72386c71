use chrono::NaiveDateTime;
use diesel::{Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::{device_play_counts, play_events};

/// Last playback report received from a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LivePlaybackState {
    pub device_id: i32,
    pub current_jingle_id: Option<i32>,
    /// Offset into the current jingle.
    #[ts(type = "number")]
    pub position_ms: i64,
    pub is_playing: bool,
    #[ts(type = "string")]
    pub last_updated_at: NaiveDateTime,
}

/// Heartbeat body posted by devices. Older players send `currentJingle`
/// and `position`.
#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PlaybackReport {
    #[serde(alias = "currentJingle")]
    pub jingle_id: Option<i32>,
    #[serde(alias = "position", default)]
    #[ts(type = "number")]
    pub position_ms: i64,
    pub is_playing: bool,
}

/// Answer of the state and live-stream endpoints. `active == false` with no
/// state is the "nothing playing" sentinel.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LivePlaybackResponse {
    pub device_id: i32,
    pub active: bool,
    /// Set when the state returned is older than the freshness the caller
    /// asked for.
    pub stale: bool,
    pub state: Option<LivePlaybackState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = play_events)]
pub struct NewPlayEvent {
    pub event_id: String,
    pub device_id: i32,
    pub jingle_id: i32,
    pub campaign_id: i32,
    pub played_at: NaiveDateTime,
}

/// One physical play reported by a device. `eventId` must be unique per
/// play; redelivery of the same id is ignored.
#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RecordPlayRequest {
    pub event_id: String,
    pub jingle_id: i32,
    pub campaign_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RecordPlayResponse {
    pub event_id: String,
    /// False when the event id had already been counted.
    pub recorded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct JinglePlayCount {
    pub jingle_id: i32,
    #[ts(type = "number")]
    pub plays: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CampaignPlayCounts {
    pub campaign_id: i32,
    #[ts(type = "number")]
    pub plays: i64,
    pub jingles: Vec<JinglePlayCount>,
}

#[derive(Queryable, Selectable, Debug, Clone, Serialize, Deserialize, TS)]
#[diesel(table_name = device_play_counts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DevicePlayCount {
    pub device_id: i32,
    pub campaign_id: i32,
    pub jingle_id: i32,
    #[ts(type = "number")]
    pub plays: i64,
}
