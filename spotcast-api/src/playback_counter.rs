//! Counting of physical plays.
//!
//! Each play carries a caller-chosen event id. The id is stored with the
//! play, so a redelivered report finds it and changes nothing.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::error::ScheduleError;
use crate::models::{NewPlayEvent, RecordPlayRequest};
use crate::orm::campaign::get_jingle_by_id;
use crate::orm::device::get_device_by_id;
use crate::orm::play_counter::{increment_play_counters, insert_play_event};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayRecord {
    /// First delivery; every counter moved by one.
    Recorded { campaign_id: i32 },
    /// The event id was already counted.
    Duplicate,
}

/// Records one play of `request.jingle_id` on `device_id`.
///
/// The campaign defaults to the jingle's own; an explicit campaign that
/// does not own the jingle is rejected.
pub fn record_play(
    conn: &mut SqliteConnection,
    device_id: i32,
    request: &RecordPlayRequest,
    played_at: NaiveDateTime,
) -> Result<PlayRecord, ScheduleError> {
    let event_id = request.event_id.trim();
    if event_id.is_empty() {
        return Err(ScheduleError::validation("eventId", "must not be empty"));
    }

    conn.immediate_transaction(|conn| {
        if get_device_by_id(conn, device_id)?.is_none() {
            return Err(ScheduleError::NotFound(format!("Device {} not found", device_id)));
        }
        let jingle = get_jingle_by_id(conn, request.jingle_id)?.ok_or_else(|| {
            ScheduleError::NotFound(format!("Jingle {} not found", request.jingle_id))
        })?;
        if let Some(campaign_id) = request.campaign_id {
            if campaign_id != jingle.campaign_id {
                return Err(ScheduleError::validation(
                    "campaignId",
                    format!("jingle {} does not belong to campaign {}", jingle.id, campaign_id),
                ));
            }
        }

        let event = NewPlayEvent {
            event_id: event_id.to_string(),
            device_id,
            jingle_id: jingle.id,
            campaign_id: jingle.campaign_id,
            played_at,
        };
        if !insert_play_event(conn, &event)? {
            info!("Ignoring duplicate play event {} from device {}", event_id, device_id);
            return Ok(PlayRecord::Duplicate);
        }

        increment_play_counters(conn, device_id, jingle.campaign_id, jingle.id)?;
        Ok(PlayRecord::Recorded { campaign_id: jingle.campaign_id })
    })
}
