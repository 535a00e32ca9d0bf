//! Database initialization for the domain models.

use rusqlite::Connection;

use crate::{
    rewards::create_reward_ledger_table, settings::create_settings_table,
    transaction::create_transaction_table,
};

/// Create the tables for the domain models, if they do not already exist.
///
/// # Errors
/// Returns an error if a table cannot be created or if there is an SQL
/// error.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    create_transaction_table(connection)?;
    create_settings_table(connection)?;
    create_reward_ledger_table(connection)?;

    Ok(())
}

#[cfg(test)]
mod db_tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn initialize_is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();
        initialize(&connection).unwrap();
    }
}
