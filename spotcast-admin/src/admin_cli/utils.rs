use std::io::{self, Write};

use chrono::{Local, NaiveDateTime, NaiveTime};
use diesel::{prelude::*, sqlite::SqliteConnection};
use diesel_migrations::MigrationHarness;
use dotenvy::dotenv;
use regex::Regex;
use spotcast_api::{
    MIGRATIONS,
    orm::{
        device::{get_device_by_id, get_device_by_name},
        set_foreign_keys,
    },
    schedule_service::{DATE_FORMAT, parse_date},
};

pub fn establish_connection() -> Result<SqliteConnection, Box<dyn std::error::Error>> {
    dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;
    let mut conn = SqliteConnection::establish(&database_url)?;
    set_foreign_keys(&mut conn)?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| format!("Failed to run migrations: {}", e))?;
    Ok(conn)
}

/// Resolve a device identifier (either ID or name) to a device ID. A number
/// is treated as an ID and must exist; anything else is looked up by name.
pub fn resolve_device_id(
    conn: &mut SqliteConnection,
    device_identifier: &str,
) -> Result<i32, Box<dyn std::error::Error>> {
    if let Ok(id) = device_identifier.parse::<i32>() {
        match get_device_by_id(conn, id)? {
            Some(_) => Ok(id),
            None => Err(format!("Device with ID {} does not exist", id).into()),
        }
    } else {
        match get_device_by_name(conn, device_identifier)? {
            Some(device) => Ok(device.id),
            None => Err(format!("Device with name '{}' does not exist", device_identifier).into()),
        }
    }
}

/// Builds a matcher for `ls`/`rm` search terms: regex by default, plain
/// substring with `-F`.
pub fn search_matcher(
    search_term: &str,
    fixed_string: bool,
) -> Result<Box<dyn Fn(&str) -> bool>, Box<dyn std::error::Error>> {
    if fixed_string {
        let term = search_term.to_string();
        Ok(Box::new(move |s: &str| s.contains(&term)))
    } else {
        let regex = Regex::new(search_term)
            .map_err(|e| format!("Invalid regex pattern '{}': {}", search_term, e))?;
        Ok(Box::new(move |s: &str| regex.is_match(s)))
    }
}

/// Parses `--at`: a full `YYYY-MM-DD HH:MM:SS` or a bare date at midnight,
/// defaulting to the local clock.
pub fn resolve_at(at: Option<String>) -> Result<NaiveDateTime, Box<dyn std::error::Error>> {
    let Some(value) = at else {
        return Ok(Local::now().naive_local());
    };
    if let Ok(instant) = NaiveDateTime::parse_from_str(&value, "%Y-%m-%d %H:%M:%S") {
        return Ok(instant);
    }
    let date = parse_date("at", &value).map_err(|_| {
        format!("Invalid date '{}'. Use {} or YYYY-MM-DD HH:MM:SS", value, DATE_FORMAT)
    })?;
    Ok(date.and_time(NaiveTime::MIN))
}

/// Asks for a y/N confirmation on stdin.
pub fn confirm(prompt: &str) -> Result<bool, Box<dyn std::error::Error>> {
    print!("{} [y/N]: ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotcast_api::orm::testing::{create_test_device, setup_test_db};

    #[test]
    fn test_resolve_device_by_id_or_name() {
        let mut conn = setup_test_db();
        let device = create_test_device(&mut conn, "Food Court");

        assert_eq!(resolve_device_id(&mut conn, &device.id.to_string()).unwrap(), device.id);
        assert_eq!(resolve_device_id(&mut conn, "Food Court").unwrap(), device.id);
        assert!(resolve_device_id(&mut conn, "999").is_err());
        assert!(resolve_device_id(&mut conn, "Elsewhere").is_err());
    }

    #[test]
    fn test_search_matcher_modes() {
        let regex = search_matcher("^Mall", false).unwrap();
        assert!(regex("Mall North"));
        assert!(!regex("North Mall"));

        let fixed = search_matcher("a.b", true).unwrap();
        assert!(fixed("xa.by"));
        assert!(!fixed("axb"));

        assert!(search_matcher("(", false).is_err());
    }

    #[test]
    fn test_resolve_at() {
        let at = resolve_at(Some("2024-05-01".to_string())).unwrap();
        assert_eq!(at.to_string(), "2024-05-01 00:00:00");

        let at = resolve_at(Some("2024-05-01 13:30:00".to_string())).unwrap();
        assert_eq!(at.to_string(), "2024-05-01 13:30:00");

        assert!(resolve_at(Some("tomorrow".to_string())).is_err());
    }
}
