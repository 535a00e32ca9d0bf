//! Implements a struct that holds the shared state of the application.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use time::UtcOffset;

use crate::{Error, db::initialize, timezone::get_local_offset};

/// The shared state of the application: the database connection and the
/// resolved local timezone.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,

    /// The local timezone as a canonical timezone name, e.g.
    /// "Pacific/Auckland".
    pub local_timezone: String,

    /// The local timezone as a UTC offset, resolved at startup.
    pub local_offset: UtcOffset,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for
    /// the domain models. `local_timezone` should be a valid, canonical
    /// timezone name, e.g. "Pacific/Auckland".
    ///
    /// # Errors
    /// Returns an error if the timezone name is unknown or if the database
    /// cannot be initialized.
    pub fn new(db_connection: Connection, local_timezone: &str) -> Result<Self, Error> {
        let local_offset = get_local_offset(local_timezone)
            .ok_or_else(|| Error::InvalidTimezone(local_timezone.to_owned()))?;

        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
            local_timezone: local_timezone.to_owned(),
            local_offset,
        })
    }
}
