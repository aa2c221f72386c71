/*!
 * Spotcast Administrative CLI
 *
 * Command-line management of a spotcast-api SQLite database: devices,
 * campaigns and jingles, device schedules, play loops and play counters.
 * Every command goes through the same ORM and scheduling functions the
 * HTTP API uses, so validation and cascades behave identically.
 *
 * DATABASE_URL (environment or .env) selects the database; pending
 * migrations are applied on connect. Run with --help for usage.
 */

use clap::{Parser, Subcommand};

mod admin_cli {
    pub mod campaign_commands;
    pub mod device_commands;
    pub mod schedule_commands;
    pub mod utils;
}

use admin_cli::{
    campaign_commands::{CampaignAction, handle_campaign_command_with_conn},
    device_commands::{DeviceAction, handle_device_command_with_conn},
    schedule_commands::{
        JingleAction, ScheduleAction, handle_jingle_command_with_conn,
        handle_schedule_command_with_conn, play_order_impl,
    },
    utils::{establish_connection, resolve_device_id},
};

#[derive(Parser)]
#[command(name = "spotcast-admin")]
#[command(about = "Administrative CLI for Spotcast database management")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Device {
        #[command(subcommand)]
        action: DeviceAction,
    },
    Campaign {
        #[command(subcommand)]
        action: CampaignAction,
    },
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },
    Jingle {
        #[command(subcommand)]
        action: JingleAction,
    },
    #[command(about = "Print the play loop a device would run (same as `schedule play-order`)")]
    PlayOrder {
        #[arg(help = "Device ID or name")]
        device: String,
        #[arg(long, help = "Instant to evaluate (YYYY-MM-DD[ HH:MM:SS], defaults to now)")]
        at: Option<String>,
    },
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = establish_connection()?;

    match cli.command {
        Commands::Device { action } => handle_device_command_with_conn(&mut conn, action),
        Commands::Campaign { action } => handle_campaign_command_with_conn(&mut conn, action),
        Commands::Schedule { action } => handle_schedule_command_with_conn(&mut conn, action),
        Commands::Jingle { action } => handle_jingle_command_with_conn(&mut conn, action),
        Commands::PlayOrder { device, at } => {
            let device_id = resolve_device_id(&mut conn, &device)?;
            play_order_impl(&mut conn, device_id, at)
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
