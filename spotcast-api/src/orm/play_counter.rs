//! Play events and the counters derived from them.
//!
//! These functions do not open transactions themselves; callers wrap the
//! event insert and the increments in one.

use diesel::prelude::*;

use crate::models::{CampaignPlayCounts, DevicePlayCount, JinglePlayCount, NewPlayEvent};

/// Stores the event unless its id was seen before. Returns whether a row
/// was written.
pub fn insert_play_event(
    conn: &mut SqliteConnection,
    event: &NewPlayEvent,
) -> Result<bool, diesel::result::Error> {
    use crate::schema::play_events::dsl::*;
    let inserted = diesel::insert_or_ignore_into(play_events).values(event).execute(conn)?;
    Ok(inserted == 1)
}

/// Adds one play to the campaign, campaign/jingle and device counters.
pub fn increment_play_counters(
    conn: &mut SqliteConnection,
    device: i32,
    campaign: i32,
    jingle: i32,
) -> Result<(), diesel::result::Error> {
    {
        use crate::schema::campaign_play_counts::dsl::*;
        diesel::insert_into(campaign_play_counts)
            .values((campaign_id.eq(campaign), plays.eq(1i64)))
            .on_conflict(campaign_id)
            .do_update()
            .set(plays.eq(plays + 1i64))
            .execute(conn)?;
    }
    {
        use crate::schema::campaign_jingle_play_counts::dsl::*;
        diesel::insert_into(campaign_jingle_play_counts)
            .values((campaign_id.eq(campaign), jingle_id.eq(jingle), plays.eq(1i64)))
            .on_conflict((campaign_id, jingle_id))
            .do_update()
            .set(plays.eq(plays + 1i64))
            .execute(conn)?;
    }
    {
        use crate::schema::device_play_counts::dsl::*;
        diesel::insert_into(device_play_counts)
            .values((
                device_id.eq(device),
                campaign_id.eq(campaign),
                jingle_id.eq(jingle),
                plays.eq(1i64),
            ))
            .on_conflict((device_id, campaign_id, jingle_id))
            .do_update()
            .set(plays.eq(plays + 1i64))
            .execute(conn)?;
    }
    Ok(())
}

/// Campaign total plus per-jingle totals. A campaign that never played
/// reports zero.
pub fn get_campaign_play_counts(
    conn: &mut SqliteConnection,
    campaign: i32,
) -> Result<CampaignPlayCounts, diesel::result::Error> {
    use crate::schema::{campaign_jingle_play_counts, campaign_play_counts};

    let total = campaign_play_counts::table
        .filter(campaign_play_counts::campaign_id.eq(campaign))
        .select(campaign_play_counts::plays)
        .first::<i64>(conn)
        .optional()?
        .unwrap_or(0);

    let jingles = campaign_jingle_play_counts::table
        .filter(campaign_jingle_play_counts::campaign_id.eq(campaign))
        .order(campaign_jingle_play_counts::jingle_id.asc())
        .select((campaign_jingle_play_counts::jingle_id, campaign_jingle_play_counts::plays))
        .load::<(i32, i64)>(conn)?
        .into_iter()
        .map(|(jingle_id, plays)| JinglePlayCount { jingle_id, plays })
        .collect();

    Ok(CampaignPlayCounts { campaign_id: campaign, plays: total, jingles })
}

pub fn get_device_play_counts(
    conn: &mut SqliteConnection,
    device: i32,
) -> Result<Vec<DevicePlayCount>, diesel::result::Error> {
    use crate::schema::device_play_counts::dsl::*;
    device_play_counts
        .filter(device_id.eq(device))
        .order((campaign_id.asc(), jingle_id.asc()))
        .select(DevicePlayCount::as_select())
        .load(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::testing::setup_test_db;

    fn event(id: &str) -> NewPlayEvent {
        NewPlayEvent {
            event_id: id.to_string(),
            device_id: 1,
            jingle_id: 2,
            campaign_id: 3,
            played_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_event_id_is_unique() {
        let mut conn = setup_test_db();
        assert!(insert_play_event(&mut conn, &event("evt-1")).unwrap());
        assert!(!insert_play_event(&mut conn, &event("evt-1")).unwrap());
        assert!(insert_play_event(&mut conn, &event("evt-2")).unwrap());
    }

    #[test]
    fn test_counters_accumulate() {
        let mut conn = setup_test_db();
        increment_play_counters(&mut conn, 1, 3, 2).unwrap();
        increment_play_counters(&mut conn, 1, 3, 2).unwrap();
        increment_play_counters(&mut conn, 2, 3, 5).unwrap();

        let campaign = get_campaign_play_counts(&mut conn, 3).unwrap();
        assert_eq!(campaign.plays, 3);
        assert_eq!(campaign.jingles.len(), 2);
        assert_eq!(campaign.jingles[0].jingle_id, 2);
        assert_eq!(campaign.jingles[0].plays, 2);

        let device = get_device_play_counts(&mut conn, 1).unwrap();
        assert_eq!(device.len(), 1);
        assert_eq!(device[0].plays, 2);
    }

    #[test]
    fn test_unplayed_campaign_reports_zero() {
        let mut conn = setup_test_db();
        let counts = get_campaign_play_counts(&mut conn, 42).unwrap();
        assert_eq!(counts.plays, 0);
        assert!(counts.jingles.is_empty());
    }
}
