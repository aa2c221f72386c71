use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use spotcast_api::{
    models::{CampaignInput, JingleInput},
    orm::{
        campaign::{
            get_all_campaigns, get_campaign_by_id, get_jingles_for_campaign, insert_campaign,
            insert_jingle,
        },
        play_counter::get_campaign_play_counts,
    },
};

use crate::admin_cli::utils::search_matcher;

#[derive(Subcommand)]
pub enum CampaignAction {
    #[command(about = "List campaigns and their jingles, optionally filtered by search term")]
    Ls {
        #[arg(help = "Search term on name or brand (regex by default, use -F for fixed string)")]
        search_term: Option<String>,
        #[arg(
            short = 'F',
            long = "fixed-string",
            help = "Treat search term as fixed string instead of regex"
        )]
        fixed_string: bool,
    },
    #[command(about = "Create a new campaign")]
    Add {
        #[arg(short, long, help = "Campaign name")]
        name: String,
        #[arg(short, long, help = "Advertised brand")]
        brand: String,
    },
    #[command(about = "Register an uploaded audio file as a jingle of a campaign")]
    AddJingle {
        #[arg(help = "Campaign ID")]
        campaign_id: i32,
        #[arg(short, long, help = "Jingle title")]
        title: String,
        #[arg(short, long, help = "Stored audio filename")]
        filename: String,
        #[arg(short, long, help = "Duration in seconds")]
        duration: Option<i32>,
    },
    #[command(about = "Show play counters of a campaign")]
    Counts {
        #[arg(help = "Campaign ID")]
        campaign_id: i32,
    },
}

pub fn handle_campaign_command_with_conn(
    conn: &mut SqliteConnection,
    action: CampaignAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        CampaignAction::Ls { search_term, fixed_string } => {
            campaign_ls_impl(conn, search_term, fixed_string)?;
        }
        CampaignAction::Add { name, brand } => {
            if name.trim().is_empty() || brand.trim().is_empty() {
                return Err("Campaign name and brand must not be empty".into());
            }
            let campaign = insert_campaign(conn, CampaignInput { name, brand })?;
            println!("Campaign created successfully!");
            println!("ID: {}", campaign.id);
            println!("Name: {}", campaign.name);
            println!("Brand: {}", campaign.brand);
        }
        CampaignAction::AddJingle { campaign_id, title, filename, duration } => {
            if get_campaign_by_id(conn, campaign_id)?.is_none() {
                return Err(format!("Campaign with ID {} does not exist", campaign_id).into());
            }
            if duration.is_some_and(|d| d < 1) {
                return Err("Duration must be positive".into());
            }
            let jingle = insert_jingle(
                conn,
                campaign_id,
                JingleInput { title, filename, duration_seconds: duration },
            )?;
            println!("Jingle created successfully!");
            println!("ID: {}", jingle.id);
            println!("Title: {}", jingle.title);
            println!("Filename: {}", jingle.filename);
        }
        CampaignAction::Counts { campaign_id } => {
            let counts = get_campaign_play_counts(conn, campaign_id)?;
            println!("Campaign {}: {} play(s)", counts.campaign_id, counts.plays);
            for jingle in counts.jingles {
                println!("  Jingle ID: {}, Plays: {}", jingle.jingle_id, jingle.plays);
            }
        }
    }
    Ok(())
}

pub fn campaign_ls_impl(
    conn: &mut SqliteConnection,
    search_term: Option<String>,
    fixed_string: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut campaigns = get_all_campaigns(conn)?;
    if let Some(term) = search_term {
        let matches = search_matcher(&term, fixed_string)?;
        campaigns.retain(|c| matches(&c.name) || matches(&c.brand));
    }

    if campaigns.is_empty() {
        println!("No campaigns found.");
        return Ok(());
    }

    println!("Campaigns:");
    for campaign in &campaigns {
        println!("  ID: {}, Name: {}, Brand: {}", campaign.id, campaign.name, campaign.brand);
        for jingle in get_jingles_for_campaign(conn, campaign)? {
            println!("    Jingle {}: {} ({})", jingle.id, jingle.title, jingle.filename);
        }
    }
    Ok(())
}
