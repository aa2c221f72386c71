use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use spotcast_api::{
    models::{DeviceScheduleInput, JingleAssignment, ScheduledJingleChanges},
    orm::device_schedule::{get_schedule_by_device, get_scheduled_jingle_by_id},
    schedule_service::{
        NO_SCHEDULE_MESSAGE, add_jingle, create_or_update_schedule, delete_schedule,
        get_play_order, get_schedule_with_jingles, remove_jingle, update_jingle,
        validate_assignment,
    },
};

use crate::admin_cli::utils::{confirm, resolve_at, resolve_device_id};

#[derive(Subcommand)]
pub enum ScheduleAction {
    #[command(about = "Show a device's playback window and scheduled jingles")]
    Show {
        #[arg(help = "Device ID or name")]
        device: String,
        #[arg(long, help = "Instant to evaluate (YYYY-MM-DD[ HH:MM:SS], defaults to now)")]
        at: Option<String>,
    },
    #[command(about = "Create or update a device's playback window")]
    Set {
        #[arg(help = "Device ID or name")]
        device: String,
        #[arg(short, long, help = "Window start (HH:MM:SS)")]
        start: String,
        #[arg(short, long, help = "Window end (HH:MM:SS), earlier than start for overnight")]
        end: String,
        #[arg(long, help = "Disable the schedule without deleting it")]
        inactive: bool,
    },
    #[command(about = "Delete a device's schedule and all its jingles")]
    Clear {
        #[arg(help = "Device ID or name")]
        device: String,
        #[arg(short = 'y', long = "yes", help = "Skip confirmation prompt")]
        yes: bool,
    },
    #[command(about = "Print the play loop a device would run")]
    PlayOrder {
        #[arg(help = "Device ID or name")]
        device: String,
        #[arg(long, help = "Instant to evaluate (YYYY-MM-DD[ HH:MM:SS], defaults to now)")]
        at: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum JingleAction {
    #[command(about = "Schedule a jingle on a device")]
    Add {
        #[arg(help = "Device ID or name")]
        device: String,
        #[arg(short, long, help = "Jingle ID")]
        jingle: i32,
        #[arg(long, help = "Minimum plays per day")]
        spots: i32,
        #[arg(long, help = "First day (YYYY-MM-DD)")]
        start_date: String,
        #[arg(long, help = "Last day, inclusive (YYYY-MM-DD)")]
        end_date: String,
        #[arg(long, help = "Add the entry disabled")]
        inactive: bool,
    },
    #[command(about = "Remove a scheduled jingle entry")]
    Rm {
        #[arg(help = "Scheduled jingle entry ID")]
        entry_id: i32,
    },
    #[command(about = "Enable or disable a scheduled jingle entry")]
    Toggle {
        #[arg(help = "Scheduled jingle entry ID")]
        entry_id: i32,
    },
}

pub fn handle_schedule_command_with_conn(
    conn: &mut SqliteConnection,
    action: ScheduleAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ScheduleAction::Show { device, at } => {
            let device_id = resolve_device_id(conn, &device)?;
            schedule_show_impl(conn, device_id, at)?;
        }
        ScheduleAction::Set { device, start, end, inactive } => {
            let device_id = resolve_device_id(conn, &device)?;
            let input = DeviceScheduleInput {
                device_id,
                playback_window_start: start,
                playback_window_end: end,
                is_active: !inactive,
            };
            let schedule = create_or_update_schedule(conn, &input)?;
            println!("Schedule saved!");
            println!("ID: {}", schedule.id);
            println!(
                "Window: {} - {}{}",
                schedule.playback_window_start,
                schedule.playback_window_end,
                if schedule.playback_window().is_overnight() { " (overnight)" } else { "" }
            );
        }
        ScheduleAction::Clear { device, yes } => {
            let device_id = resolve_device_id(conn, &device)?;
            if !yes
                && !confirm(&format!(
                    "Delete the schedule of device {} and all its jingles?",
                    device_id
                ))?
            {
                println!("Operation cancelled.");
                return Ok(());
            }
            delete_schedule(conn, device_id)?;
            println!("Deleted schedule of device {}.", device_id);
        }
        ScheduleAction::PlayOrder { device, at } => {
            let device_id = resolve_device_id(conn, &device)?;
            play_order_impl(conn, device_id, at)?;
        }
    }
    Ok(())
}

pub fn handle_jingle_command_with_conn(
    conn: &mut SqliteConnection,
    action: JingleAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        JingleAction::Add { device, jingle, spots, start_date, end_date, inactive } => {
            let device_id = resolve_device_id(conn, &device)?;
            let schedule =
                get_schedule_by_device(conn, device_id)?.ok_or(NO_SCHEDULE_MESSAGE)?;
            let assignment = validate_assignment(&JingleAssignment {
                jingle_id: jingle,
                spots,
                start_date,
                end_date,
                is_active: !inactive,
            })?;
            let entry = add_jingle(conn, schedule.id, &assignment)?;
            println!("Scheduled jingle {} as entry {}.", entry.jingle_id, entry.id);
        }
        JingleAction::Rm { entry_id } => {
            remove_jingle(conn, entry_id)?;
            println!("Removed entry {}.", entry_id);
        }
        JingleAction::Toggle { entry_id } => {
            let entry = get_scheduled_jingle_by_id(conn, entry_id)?
                .ok_or_else(|| format!("Scheduled jingle {} does not exist", entry_id))?;
            let changes =
                ScheduledJingleChanges { is_active: Some(!entry.is_active), ..Default::default() };
            let updated = update_jingle(conn, entry_id, &changes)?;
            println!(
                "Entry {} is now {}.",
                updated.id,
                if updated.is_active { "enabled" } else { "disabled" }
            );
        }
    }
    Ok(())
}

pub fn schedule_show_impl(
    conn: &mut SqliteConnection,
    device_id: i32,
    at: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let at = resolve_at(at)?;
    let schedule = get_schedule_with_jingles(conn, device_id, at.date())?;
    let window = schedule.schedule.playback_window();

    println!(
        "Schedule {} for device {}: {} - {} ({})",
        schedule.schedule.id,
        device_id,
        schedule.schedule.playback_window_start,
        schedule.schedule.playback_window_end,
        if schedule.schedule.is_active { "active" } else { "inactive" }
    );
    println!(
        "  Window length: {} min, inside window at {}: {}",
        window.duration().num_minutes(),
        at,
        if window.contains(at.time()) { "yes" } else { "no" }
    );
    if schedule.scheduled_jingles.is_empty() {
        println!("  No jingles scheduled.");
    }
    for detail in &schedule.scheduled_jingles {
        println!(
            "  Entry {}: {} (jingle {}), {} spots, {} to {}, {:?}",
            detail.entry.id,
            detail.title,
            detail.entry.jingle_id,
            detail.entry.spots,
            detail.entry.start_date,
            detail.entry.end_date,
            detail.status
        );
    }
    Ok(())
}

pub fn play_order_impl(
    conn: &mut SqliteConnection,
    device_id: i32,
    at: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let at = resolve_at(at)?;
    let result = get_play_order(conn, device_id, at)?;

    if result.play_order.is_empty() {
        println!("Nothing to play for device {} at {}.", device_id, at);
        return Ok(());
    }

    println!(
        "Play loop for device {} at {} ({} ads, reduced by {}):",
        device_id, at, result.total_ads, result.gcd
    );
    for (position, entry) in result.play_order.iter().enumerate() {
        println!("  {:>3}. {} ({})", position + 1, entry.title, entry.filename);
    }
    Ok(())
}
