use chrono::NaiveDate;
use diesel::{AsChangeset, Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::models::device_schedule::default_true;
use crate::models::{DeviceSchedule, Jingle};
use crate::schema::scheduled_jingles;

/// A jingle assigned to a device schedule with its daily spot quota and
/// calendar validity.
#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(DeviceSchedule))]
#[diesel(belongs_to(Jingle))]
#[diesel(table_name = scheduled_jingles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ScheduledJingle {
    pub id: i32,
    pub device_schedule_id: i32,
    pub jingle_id: i32,
    /// Minimum plays per day inside the playback window.
    pub spots: i32,
    #[ts(type = "string")]
    pub start_date: NaiveDate,
    /// Inclusive.
    #[ts(type = "string")]
    pub end_date: NaiveDate,
    pub is_active: bool,
}

impl ScheduledJingle {
    /// Lifecycle state on `date`. Nothing transitions in the background; the
    /// state is derived from the dates every time it is read.
    pub fn status_on(&self, date: NaiveDate) -> ScheduledJingleStatus {
        if !self.is_active {
            ScheduledJingleStatus::Disabled
        } else if date < self.start_date {
            ScheduledJingleStatus::Pending
        } else if date > self.end_date {
            ScheduledJingleStatus::Expired
        } else {
            ScheduledJingleStatus::Active
        }
    }

    /// Whether the entry may play on `date` given its owning schedule.
    pub fn is_effective_on(&self, schedule: &DeviceSchedule, date: NaiveDate) -> bool {
        schedule.is_active && self.status_on(date) == ScheduledJingleStatus::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ScheduledJingleStatus {
    Pending,
    Active,
    Expired,
    Disabled,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = scheduled_jingles)]
pub struct NewScheduledJingle {
    pub device_schedule_id: i32,
    pub jingle_id: i32,
    pub spots: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
}

/// Column changes applied by a partial update.
#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = scheduled_jingles)]
pub struct ScheduledJingleChanges {
    pub jingle_id: Option<i32>,
    pub spots: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

/// Reconciles `spots` with its legacy name `percentage`. Either may be sent,
/// or both when they carry the same value.
fn spot_count(spots: Option<i32>, percentage: Option<i32>) -> Result<Option<i32>, String> {
    match (spots, percentage) {
        (Some(spots), Some(percentage)) if spots != percentage => Err(format!(
            "spots ({}) and percentage ({}) disagree",
            spots, percentage
        )),
        (spots, percentage) => Ok(spots.or(percentage)),
    }
}

fn required_spot_count(spots: Option<i32>, percentage: Option<i32>) -> Result<i32, String> {
    spot_count(spots, percentage)?.ok_or_else(|| "missing field `spots`".to_string())
}

/// One jingle assignment as sent by clients. `percentage` is accepted on
/// input only.
#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[serde(try_from = "JingleAssignmentBody")]
#[ts(export)]
pub struct JingleAssignment {
    pub jingle_id: i32,
    pub spots: i32,
    pub start_date: String,
    pub end_date: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[serde(try_from = "AddScheduledJingleBody")]
#[ts(export)]
pub struct AddScheduledJingleRequest {
    pub device_schedule_id: i32,
    pub jingle_id: i32,
    pub spots: i32,
    pub start_date: String,
    pub end_date: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl AddScheduledJingleRequest {
    pub fn into_parts(self) -> (i32, JingleAssignment) {
        (
            self.device_schedule_id,
            JingleAssignment {
                jingle_id: self.jingle_id,
                spots: self.spots,
                start_date: self.start_date,
                end_date: self.end_date,
                is_active: self.is_active,
            },
        )
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BulkAssignRequest {
    pub device_ids: Vec<i32>,
    pub jingles: Vec<JingleAssignment>,
}

/// Outcome for one device of a bulk assignment.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BulkAssignResult {
    pub device_id: i32,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub created: Vec<ScheduledJingle>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[serde(try_from = "ScheduledJingleUpdateBody")]
#[ts(export)]
pub struct ScheduledJingleUpdate {
    pub jingle_id: Option<i32>,
    pub spots: Option<i32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JingleAssignmentBody {
    jingle_id: i32,
    spots: Option<i32>,
    percentage: Option<i32>,
    start_date: String,
    end_date: String,
    #[serde(default = "default_true")]
    is_active: bool,
}

impl TryFrom<JingleAssignmentBody> for JingleAssignment {
    type Error = String;

    fn try_from(body: JingleAssignmentBody) -> Result<Self, Self::Error> {
        Ok(Self {
            jingle_id: body.jingle_id,
            spots: required_spot_count(body.spots, body.percentage)?,
            start_date: body.start_date,
            end_date: body.end_date,
            is_active: body.is_active,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddScheduledJingleBody {
    device_schedule_id: i32,
    jingle_id: i32,
    spots: Option<i32>,
    percentage: Option<i32>,
    start_date: String,
    end_date: String,
    #[serde(default = "default_true")]
    is_active: bool,
}

impl TryFrom<AddScheduledJingleBody> for AddScheduledJingleRequest {
    type Error = String;

    fn try_from(body: AddScheduledJingleBody) -> Result<Self, Self::Error> {
        Ok(Self {
            device_schedule_id: body.device_schedule_id,
            jingle_id: body.jingle_id,
            spots: required_spot_count(body.spots, body.percentage)?,
            start_date: body.start_date,
            end_date: body.end_date,
            is_active: body.is_active,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduledJingleUpdateBody {
    jingle_id: Option<i32>,
    spots: Option<i32>,
    percentage: Option<i32>,
    start_date: Option<String>,
    end_date: Option<String>,
    is_active: Option<bool>,
}

impl TryFrom<ScheduledJingleUpdateBody> for ScheduledJingleUpdate {
    type Error = String;

    fn try_from(body: ScheduledJingleUpdateBody) -> Result<Self, Self::Error> {
        Ok(Self {
            jingle_id: body.jingle_id,
            spots: spot_count(body.spots, body.percentage)?,
            start_date: body.start_date,
            end_date: body.end_date,
            is_active: body.is_active,
        })
    }
}

/// Scheduled entry joined with its jingle, as shown in schedule listings.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ScheduledJingleDetail {
    #[serde(flatten)]
    pub entry: ScheduledJingle,
    pub title: String,
    pub filename: String,
    pub campaign_id: i32,
    pub status: ScheduledJingleStatus,
}

impl ScheduledJingleDetail {
    pub fn new(entry: ScheduledJingle, jingle: Jingle, date: NaiveDate) -> Self {
        let status = entry.status_on(date);
        Self {
            entry,
            title: jingle.title,
            filename: jingle.filename,
            campaign_id: jingle.campaign_id,
            status,
        }
    }
}
