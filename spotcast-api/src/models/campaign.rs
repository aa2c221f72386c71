use diesel::{Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::{campaigns, jingles};

/// A brand's advertising buy; owns the jingles that get scheduled.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize, TS)]
#[diesel(table_name = campaigns)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Campaign {
    pub id: i32,
    pub name: String,
    pub brand: String,
    #[ts(type = "string")]
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = campaigns)]
pub struct NewCampaign {
    pub name: String,
    pub brand: String,
}

#[derive(Debug, Deserialize, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CampaignInput {
    pub name: String,
    pub brand: String,
}

/// Metadata of an uploaded audio spot. The audio itself lives in external
/// storage under `filename`.
#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(Campaign))]
#[diesel(table_name = jingles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Jingle {
    pub id: i32,
    pub campaign_id: i32,
    pub title: String,
    pub filename: String,
    pub duration_seconds: Option<i32>,
}

#[derive(Insertable)]
#[diesel(table_name = jingles)]
pub struct NewJingle {
    pub campaign_id: i32,
    pub title: String,
    pub filename: String,
    pub duration_seconds: Option<i32>,
}

#[derive(Debug, Deserialize, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct JingleInput {
    pub title: String,
    pub filename: String,
    pub duration_seconds: Option<i32>,
}

/// Campaign with its jingles embedded, so clients can filter jingles by
/// campaign without a second round trip.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CampaignWithJingles {
    #[serde(flatten)]
    pub campaign: Campaign,
    pub jingles: Vec<Jingle>,
}
