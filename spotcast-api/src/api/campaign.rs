//! Campaign and jingle metadata endpoints.
//!
//! Audio upload happens elsewhere; these endpoints only register the
//! metadata the scheduler needs (title and stored filename).

use rocket::{Route, response::status, serde::json::Json};

use crate::{
    error::{ApiError, ScheduleError},
    logged_json::LoggedJson,
    models::{Campaign, CampaignInput, CampaignWithJingles, Jingle, JingleInput},
    orm::{
        DbConn,
        campaign::{
            get_all_campaigns, get_campaign_by_id, get_jingles_for_campaign, insert_campaign,
            insert_jingle,
        },
    },
};

fn require_text(field: &str, value: &str) -> Result<(), ScheduleError> {
    if value.trim().is_empty() {
        return Err(ScheduleError::validation(field, "must not be empty"));
    }
    Ok(())
}

#[post("/campaigns", data = "<input>")]
pub async fn create_campaign(
    db: DbConn,
    input: LoggedJson<CampaignInput>,
) -> Result<status::Created<Json<Campaign>>, ApiError> {
    let input = input.into_inner();
    require_text("name", &input.name)?;
    require_text("brand", &input.brand)?;

    let campaign =
        db.run(move |conn| insert_campaign(conn, input)).await.map_err(ScheduleError::from)?;
    Ok(status::Created::new(format!("/api/campaigns/{}", campaign.id)).body(Json(campaign)))
}

#[get("/campaigns")]
pub async fn list_campaigns(db: DbConn) -> Result<Json<Vec<Campaign>>, ApiError> {
    Ok(Json(db.run(get_all_campaigns).await.map_err(ScheduleError::from)?))
}

/// Get Campaign endpoint.
///
/// - **URL:** `/api/campaigns/<campaign_id>`
/// - **Method:** `GET`
///
/// Returns the campaign with its jingles embedded:
///
/// ```json
/// {
///   "id": 1, "name": "Summer", "brand": "Fizz", "createdAt": "2024-05-01T10:00:00",
///   "jingles": [{"id": 3, "campaignId": 1, "title": "Beach", "filename": "beach.mp3", "durationSeconds": 30}]
/// }
/// ```
#[get("/campaigns/<campaign_id>")]
pub async fn get_campaign(
    db: DbConn,
    campaign_id: i32,
) -> Result<Json<CampaignWithJingles>, ApiError> {
    let result = db
        .run(move |conn| -> Result<CampaignWithJingles, ScheduleError> {
            let campaign = get_campaign_by_id(conn, campaign_id)?.ok_or_else(|| {
                ScheduleError::NotFound(format!("Campaign {} not found", campaign_id))
            })?;
            let jingles = get_jingles_for_campaign(conn, &campaign)?;
            Ok(CampaignWithJingles { campaign, jingles })
        })
        .await?;
    Ok(Json(result))
}

#[post("/campaigns/<campaign_id>/jingles", data = "<input>")]
pub async fn create_jingle(
    db: DbConn,
    campaign_id: i32,
    input: LoggedJson<JingleInput>,
) -> Result<status::Created<Json<Jingle>>, ApiError> {
    let input = input.into_inner();
    require_text("title", &input.title)?;
    require_text("filename", &input.filename)?;
    if input.duration_seconds.is_some_and(|d| d < 1) {
        return Err(ScheduleError::validation("durationSeconds", "must be positive").into());
    }

    let jingle = db
        .run(move |conn| -> Result<Jingle, ScheduleError> {
            if get_campaign_by_id(conn, campaign_id)?.is_none() {
                return Err(ScheduleError::NotFound(format!("Campaign {} not found", campaign_id)));
            }
            Ok(insert_jingle(conn, campaign_id, input)?)
        })
        .await?;
    Ok(status::Created::new(format!("/api/campaigns/{}", campaign_id)).body(Json(jingle)))
}

pub fn routes() -> Vec<Route> {
    routes![create_campaign, list_campaigns, get_campaign, create_jingle]
}
