use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use spotcast_api::{
    models::{Device, DeviceInput},
    orm::{
        device::{delete_device, get_all_devices, get_device_by_name, insert_device},
        play_counter::get_device_play_counts,
    },
};

use crate::admin_cli::utils::{confirm, resolve_device_id, search_matcher};

#[derive(Subcommand)]
pub enum DeviceAction {
    #[command(about = "List devices, optionally filtered by search term")]
    Ls {
        #[arg(help = "Search term (regex by default, use -F for fixed string)")]
        search_term: Option<String>,
        #[arg(
            short = 'F',
            long = "fixed-string",
            help = "Treat search term as fixed string instead of regex"
        )]
        fixed_string: bool,
    },
    #[command(about = "Register a new device")]
    Add {
        #[arg(short, long, help = "Device name (unique)")]
        name: String,
        #[arg(short, long, help = "Where the device is installed")]
        location: Option<String>,
    },
    #[command(about = "Decommission devices matching search term")]
    Rm {
        #[arg(
            help = "Search term to match devices for removal (regex by default, use -F for fixed string)"
        )]
        search_term: String,
        #[arg(
            short = 'F',
            long = "fixed-string",
            help = "Treat search term as fixed string instead of regex"
        )]
        fixed_string: bool,
        #[arg(short = 'y', long = "yes", help = "Skip confirmation prompt")]
        yes: bool,
    },
    #[command(about = "Show play counters of a device")]
    Counts {
        #[arg(help = "Device ID or name")]
        device: String,
    },
}

pub fn handle_device_command_with_conn(
    conn: &mut SqliteConnection,
    action: DeviceAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        DeviceAction::Ls { search_term, fixed_string } => {
            device_ls_impl(conn, search_term, fixed_string)?;
        }
        DeviceAction::Add { name, location } => {
            device_add_impl(conn, DeviceInput { name, location })?;
        }
        DeviceAction::Rm { search_term, fixed_string, yes } => {
            device_rm_impl(conn, search_term, fixed_string, yes)?;
        }
        DeviceAction::Counts { device } => {
            // Counters outlive the device, so a bare ID is taken as is.
            let device_id = match device.parse::<i32>() {
                Ok(id) => id,
                Err(_) => resolve_device_id(conn, &device)?,
            };
            device_counts_impl(conn, device_id)?;
        }
    }
    Ok(())
}

fn matching_devices(
    conn: &mut SqliteConnection,
    search_term: Option<&str>,
    fixed_string: bool,
) -> Result<Vec<Device>, Box<dyn std::error::Error>> {
    let devices = get_all_devices(conn)?;
    let Some(term) = search_term else {
        return Ok(devices);
    };

    let matches = search_matcher(term, fixed_string)?;
    Ok(devices
        .into_iter()
        .filter(|device| {
            matches(&device.name) || device.location.as_deref().is_some_and(|l| matches(l))
        })
        .collect())
}

fn print_device(device: &Device) {
    match &device.location {
        Some(location) => {
            println!("  ID: {}, Name: {}, Location: {}", device.id, device.name, location)
        }
        None => println!("  ID: {}, Name: {}", device.id, device.name),
    }
}

pub fn device_ls_impl(
    conn: &mut SqliteConnection,
    search_term: Option<String>,
    fixed_string: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let devices = matching_devices(conn, search_term.as_deref(), fixed_string)?;

    if devices.is_empty() {
        println!("No devices found.");
    } else {
        println!("Devices:");
        for device in &devices {
            print_device(device);
        }
    }
    Ok(())
}

pub fn device_add_impl(
    conn: &mut SqliteConnection,
    mut input: DeviceInput,
) -> Result<(), Box<dyn std::error::Error>> {
    input.name = input.name.trim().to_string();
    if input.name.is_empty() {
        return Err("Device name must not be empty".into());
    }

    if let Some(existing) = get_device_by_name(conn, &input.name)? {
        println!("Device already exists!");
        println!("ID: {}", existing.id);
        println!("Name: {}", existing.name);
        return Ok(());
    }

    let created = insert_device(conn, input)?;
    println!("Device created successfully!");
    println!("ID: {}", created.id);
    println!("Name: {}", created.name);
    if let Some(location) = &created.location {
        println!("Location: {}", location);
    }
    Ok(())
}

/// Deleting a device also removes its schedule and scheduled jingles; play
/// counters are kept.
pub fn device_rm_impl(
    conn: &mut SqliteConnection,
    search_term: String,
    fixed_string: bool,
    yes: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let devices = matching_devices(conn, Some(&search_term), fixed_string)?;

    if devices.is_empty() {
        println!("No devices found matching the search term.");
        return Ok(());
    }

    println!("Found {} device(s) matching the search term:", devices.len());
    for device in &devices {
        print_device(device);
    }

    if !yes
        && !confirm(&format!(
            "Are you sure you want to decommission these {} device(s)?",
            devices.len()
        ))?
    {
        println!("Operation cancelled.");
        return Ok(());
    }

    let mut deleted_count = 0;
    let mut errors = Vec::new();

    for device in devices {
        match delete_device(conn, device.id) {
            Ok(rows_affected) => {
                if rows_affected > 0 {
                    deleted_count += 1;
                    println!("Deleted device: {} (ID: {})", device.name, device.id);
                }
            }
            Err(e) => {
                errors.push(format!(
                    "Failed to delete device {} (ID: {}): {}",
                    device.name, device.id, e
                ));
            }
        }
    }

    println!("Successfully deleted {} device(s).", deleted_count);

    if !errors.is_empty() {
        println!("Errors encountered:");
        for error in errors {
            println!("  {}", error);
        }
        return Err("Some deletions failed".into());
    }

    Ok(())
}

pub fn device_counts_impl(
    conn: &mut SqliteConnection,
    device_id: i32,
) -> Result<(), Box<dyn std::error::Error>> {
    let counts = get_device_play_counts(conn, device_id)?;
    if counts.is_empty() {
        println!("No plays recorded for device {}.", device_id);
        return Ok(());
    }

    println!("Plays for device {}:", device_id);
    for count in counts {
        println!(
            "  Campaign ID: {}, Jingle ID: {}, Plays: {}",
            count.campaign_id, count.jingle_id, count.plays
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotcast_api::orm::testing::{create_test_device, setup_test_db};

    #[test]
    fn test_add_is_idempotent_by_name() {
        let mut conn = setup_test_db();
        let input = || DeviceInput { name: " Mall ".to_string(), location: None };

        device_add_impl(&mut conn, input()).unwrap();
        device_add_impl(&mut conn, input()).unwrap();

        let devices = get_all_devices(&mut conn).unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "Mall");
    }

    #[test]
    fn test_rm_only_removes_matches() {
        let mut conn = setup_test_db();
        create_test_device(&mut conn, "Mall North");
        create_test_device(&mut conn, "Mall South");
        create_test_device(&mut conn, "Airport");

        device_rm_impl(&mut conn, "^Mall".to_string(), false, true).unwrap();

        let names: Vec<String> =
            get_all_devices(&mut conn).unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["Airport".to_string()]);
    }

    #[test]
    fn test_matching_by_location() {
        let mut conn = setup_test_db();
        insert_device(
            &mut conn,
            DeviceInput { name: "Gate 4".to_string(), location: Some("Terminal B".to_string()) },
        )
        .unwrap();
        create_test_device(&mut conn, "Gate 5");

        let found = matching_devices(&mut conn, Some("Terminal"), true).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Gate 4");
    }
}
