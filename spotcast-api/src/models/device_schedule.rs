use chrono::{NaiveTime, TimeDelta};
use diesel::{Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::models::{Device, ScheduledJingleDetail};
use crate::schema::device_schedules;

/// Per-device playback configuration. At most one exists per device.
#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(Device))]
#[diesel(table_name = device_schedules)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DeviceSchedule {
    pub id: i32,
    pub device_id: i32,
    #[ts(type = "string")]
    pub playback_window_start: NaiveTime,
    #[ts(type = "string")]
    pub playback_window_end: NaiveTime,
    /// Master switch; when off no entry of this schedule is effective.
    pub is_active: bool,
}

impl DeviceSchedule {
    pub fn playback_window(&self) -> PlaybackWindow {
        PlaybackWindow::new(self.playback_window_start, self.playback_window_end)
    }
}

#[derive(Insertable)]
#[diesel(table_name = device_schedules)]
pub struct NewDeviceSchedule {
    pub device_id: i32,
    pub playback_window_start: NaiveTime,
    pub playback_window_end: NaiveTime,
    pub is_active: bool,
}

/// Upsert payload. Times stay strings here so a malformed value can be
/// reported against its field instead of failing JSON decoding.
#[derive(Debug, Deserialize, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DeviceScheduleInput {
    pub device_id: i32,
    pub playback_window_start: String,
    pub playback_window_end: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

pub(crate) fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DeviceScheduleWithJingles {
    #[serde(flatten)]
    pub schedule: DeviceSchedule,
    pub scheduled_jingles: Vec<ScheduledJingleDetail>,
}

/// Daily time-of-day range in which a device may play scheduled jingles.
///
/// The range is half-open (`start` inclusive, `end` exclusive). A start later
/// than the end wraps past midnight, and `start == end` covers the whole day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl PlaybackWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn is_overnight(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start == self.end {
            true
        } else if self.is_overnight() {
            time >= self.start || time < self.end
        } else {
            time >= self.start && time < self.end
        }
    }

    /// Length of the window within one day.
    pub fn duration(&self) -> TimeDelta {
        let day = TimeDelta::days(1);
        if self.start == self.end {
            day
        } else if self.is_overnight() {
            day - (self.start - self.end)
        } else {
            self.end - self.start
        }
    }
}
