//! Per-user financial settings: monthly salary and spending limit.
//!
//! Both values parametrize the monthly summary and the rewards engine. They
//! default to zero before the user first saves them; a zero limit means "no
//! limit set" to the Budget Sniper evaluation.

use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::Error;

/// A user's self-declared monthly salary and spending limit, in dollars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Monthly salary. Never negative.
    pub salary: f64,
    /// Monthly spending limit. Never negative. Zero means not set.
    pub limit: f64,
}

/// Retrieve a user's settings from the database.
///
/// Returns zeroed [Settings] if the user has never saved any.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn get_settings(user_id: &str, connection: &Connection) -> Result<Settings, Error> {
    let settings = connection
        .prepare("SELECT salary, \"limit\" FROM settings WHERE user_id = :user_id")?
        .query_row(&[(":user_id", user_id)], map_settings_row)
        .optional()?;

    Ok(settings.unwrap_or_default())
}

/// Save a user's settings, replacing any previously saved values.
///
/// # Errors
/// This function will return a:
/// - [Error::NegativeAmount] if the salary or limit is below zero,
/// - or [Error::SqlError] if there is a SQL error.
pub fn put_settings(
    user_id: &str,
    settings: Settings,
    connection: &Connection,
) -> Result<(), Error> {
    if settings.salary < 0.0 {
        return Err(Error::NegativeAmount(settings.salary));
    }

    if settings.limit < 0.0 {
        return Err(Error::NegativeAmount(settings.limit));
    }

    connection.execute(
        "INSERT INTO settings (user_id, salary, \"limit\") VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id) DO UPDATE SET salary = excluded.salary, \"limit\" = excluded.\"limit\"",
        (user_id, settings.salary, settings.limit),
    )?;

    Ok(())
}

/// Create the settings table in the database.
pub(crate) fn create_settings_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS settings (
                user_id TEXT PRIMARY KEY,
                salary REAL NOT NULL,
                \"limit\" REAL NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Settings.
fn map_settings_row(row: &Row) -> Result<Settings, rusqlite::Error> {
    let salary = row.get(0)?;
    let limit = row.get(1)?;

    Ok(Settings { salary, limit })
}

#[cfg(test)]
mod settings_tests {
    use rusqlite::Connection;

    use crate::{
        Error, db::initialize,
        settings::{Settings, get_settings, put_settings},
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    #[test]
    fn get_settings_defaults_to_zero_before_first_save() {
        let connection = get_test_connection();

        let settings = get_settings("alice", &connection).unwrap();

        assert_eq!(
            settings,
            Settings {
                salary: 0.0,
                limit: 0.0
            }
        );
    }

    #[test]
    fn put_settings_round_trips_and_overwrites() {
        let connection = get_test_connection();

        put_settings(
            "alice",
            Settings {
                salary: 5000.0,
                limit: 2000.0,
            },
            &connection,
        )
        .unwrap();
        put_settings(
            "alice",
            Settings {
                salary: 5500.0,
                limit: 1800.0,
            },
            &connection,
        )
        .unwrap();

        let settings = get_settings("alice", &connection).unwrap();

        assert_eq!(settings.salary, 5500.0);
        assert_eq!(settings.limit, 1800.0);
    }

    #[test]
    fn put_settings_rejects_negative_values() {
        let connection = get_test_connection();

        let result = put_settings(
            "alice",
            Settings {
                salary: -1.0,
                limit: 100.0,
            },
            &connection,
        );

        assert_eq!(result, Err(Error::NegativeAmount(-1.0)));
    }

    #[test]
    fn settings_are_stored_per_user() {
        let connection = get_test_connection();

        put_settings(
            "alice",
            Settings {
                salary: 5000.0,
                limit: 2000.0,
            },
            &connection,
        )
        .unwrap();

        let other = get_settings("bob", &connection).unwrap();

        assert_eq!(other, Settings::default());
    }
}
