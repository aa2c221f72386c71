use diesel::prelude::*;

use crate::models::{Campaign, CampaignInput, Jingle, JingleInput, NewCampaign, NewJingle};

pub fn insert_campaign(
    conn: &mut SqliteConnection,
    input: CampaignInput,
) -> Result<Campaign, diesel::result::Error> {
    use crate::schema::campaigns::dsl::*;

    let new_campaign = NewCampaign { name: input.name, brand: input.brand };
    diesel::insert_into(campaigns).values(&new_campaign).execute(conn)?;
    campaigns.order(id.desc()).select(Campaign::as_select()).first(conn)
}

pub fn get_campaign_by_id(
    conn: &mut SqliteConnection,
    campaign_id: i32,
) -> Result<Option<Campaign>, diesel::result::Error> {
    use crate::schema::campaigns::dsl::*;
    campaigns.filter(id.eq(campaign_id)).select(Campaign::as_select()).first(conn).optional()
}

pub fn get_all_campaigns(
    conn: &mut SqliteConnection,
) -> Result<Vec<Campaign>, diesel::result::Error> {
    use crate::schema::campaigns::dsl::*;
    campaigns.order(id.asc()).select(Campaign::as_select()).load(conn)
}

pub fn insert_jingle(
    conn: &mut SqliteConnection,
    jingle_campaign_id: i32,
    input: JingleInput,
) -> Result<Jingle, diesel::result::Error> {
    use crate::schema::jingles::dsl::*;

    let new_jingle = NewJingle {
        campaign_id: jingle_campaign_id,
        title: input.title,
        filename: input.filename,
        duration_seconds: input.duration_seconds,
    };
    diesel::insert_into(jingles).values(&new_jingle).execute(conn)?;
    jingles.order(id.desc()).select(Jingle::as_select()).first(conn)
}

pub fn get_jingle_by_id(
    conn: &mut SqliteConnection,
    jingle_id: i32,
) -> Result<Option<Jingle>, diesel::result::Error> {
    use crate::schema::jingles::dsl::*;
    jingles.filter(id.eq(jingle_id)).select(Jingle::as_select()).first(conn).optional()
}

pub fn get_jingles_for_campaign(
    conn: &mut SqliteConnection,
    campaign: &Campaign,
) -> Result<Vec<Jingle>, diesel::result::Error> {
    use crate::schema::jingles::dsl::*;
    Jingle::belonging_to(campaign).order(id.asc()).select(Jingle::as_select()).load(conn)
}
