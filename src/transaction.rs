//! Transaction recording and querying.
//!
//! Transactions are the source of truth for all aggregation: an append-only
//! log of expenses, one row per receipt or manual entry. Rows are never
//! updated; they are deleted only by explicit user action through the
//! presentation layer.

use std::ops::RangeInclusive;

use rusqlite::{Connection, Row, params_from_iter, types::Value};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, UtcOffset};

use crate::Error;

/// The category assigned to transactions that the upload pipeline could not
/// classify.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// A recorded expense: money spent at a merchant on a given date.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: i64,
    /// The user the expense belongs to.
    pub user_id: String,
    /// The name of the merchant the money was spent at.
    pub merchant: String,
    /// The amount of money spent, in dollars. Never negative.
    pub amount: f64,
    /// The date the purchase happened.
    pub date: Date,
    /// The spending category, e.g. "Groceries". Defaults to
    /// [UNCATEGORIZED].
    pub category: String,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(merchant: &str, amount: f64, date: Date) -> TransactionBuilder {
        TransactionBuilder {
            merchant: merchant.to_owned(),
            amount,
            date,
            category: UNCATEGORIZED.to_owned(),
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// The builder holds the caller-supplied fields; the database assigns the ID
/// when the transaction is inserted by [create_transaction].
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionBuilder {
    /// The name of the merchant the money was spent at.
    pub merchant: String,
    /// The amount of money spent, in dollars.
    pub amount: f64,
    /// The date the purchase happened.
    pub date: Date,
    /// The spending category. Defaults to [UNCATEGORIZED].
    pub category: String,
}

impl TransactionBuilder {
    /// Set the spending category for the transaction.
    pub fn category(mut self, category: &str) -> Self {
        self.category = category.to_owned();
        self
    }

    /// Check that the builder describes a recordable expense.
    ///
    /// `local_timezone` is used to check that `date` is not a future date.
    ///
    /// # Errors
    /// Returns [Error::FutureDate] if `date` is later than today in the
    /// local timezone, or [Error::NegativeAmount] if `amount` is below zero.
    fn validate(&self, local_timezone: UtcOffset) -> Result<(), Error> {
        if self.date > OffsetDateTime::now_utc().to_offset(local_timezone).date() {
            return Err(Error::FutureDate(self.date));
        }

        if self.amount < 0.0 {
            return Err(Error::NegativeAmount(self.amount));
        }

        Ok(())
    }
}

/// Create a new transaction in the database.
///
/// Dates must be no later than today in `local_timezone`, and amounts must
/// not be negative.
///
/// # Errors
/// This function will return a:
/// - [Error::FutureDate] if the builder's date is in the future,
/// - [Error::NegativeAmount] if the builder's amount is below zero,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    user_id: &str,
    builder: TransactionBuilder,
    local_timezone: UtcOffset,
    connection: &Connection,
) -> Result<Transaction, Error> {
    builder.validate(local_timezone)?;

    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\" (user_id, merchant, amount, date, category)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, user_id, merchant, amount, date, category",
        )?
        .query_row(
            (
                user_id,
                builder.merchant,
                builder.amount,
                builder.date,
                builder.category,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Defines how transactions should be fetched from [query_transactions].
#[derive(Default)]
pub struct TransactionQuery {
    /// Include transactions within `date_range` (inclusive).
    pub date_range: Option<RangeInclusive<Date>>,
    /// Selects up to the first N (`limit`) transactions.
    pub limit: Option<u64>,
    /// Orders transactions by date in the order `sort_date`. None returns
    /// transactions in the order they are stored, which is not meaningful.
    pub sort_date: Option<SortOrder>,
}

/// The order to sort transactions in a [TransactionQuery].
pub enum SortOrder {
    /// Sort in order of increasing value.
    Ascending,
    /// Sort in order of decreasing value.
    Descending,
}

/// Query for a user's transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is a SQL error.
pub fn query_transactions(
    user_id: &str,
    filter: TransactionQuery,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let mut query_string_parts = vec![
        "SELECT id, user_id, merchant, amount, date, category FROM \"transaction\"".to_string(),
    ];
    let mut where_clause_parts = vec!["user_id = ?1".to_string()];
    let mut query_parameters = vec![Value::Text(user_id.to_owned())];

    if let Some(date_range) = filter.date_range {
        where_clause_parts.push(format!(
            "date BETWEEN ?{} AND ?{}",
            query_parameters.len() + 1,
            query_parameters.len() + 2,
        ));
        query_parameters.push(Value::Text(date_range.start().to_string()));
        query_parameters.push(Value::Text(date_range.end().to_string()));
    }

    query_string_parts.push(String::from("WHERE ") + &where_clause_parts.join(" AND "));

    match filter.sort_date {
        Some(SortOrder::Ascending) => query_string_parts.push("ORDER BY date ASC".to_string()),
        Some(SortOrder::Descending) => query_string_parts.push("ORDER BY date DESC".to_string()),
        None => {}
    }

    if let Some(limit) = filter.limit {
        query_string_parts.push(format!("LIMIT {limit}"));
    }

    let query_string = query_string_parts.join(" ");
    let params = params_from_iter(query_parameters.iter());

    connection
        .prepare(&query_string)?
        .query_map(params, map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL
/// error.
pub(crate) fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                merchant TEXT NOT NULL,
                amount REAL NOT NULL,
                date TEXT NOT NULL,
                category TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = row.get(1)?;
    let merchant = row.get(2)?;
    let amount = row.get(3)?;
    let date = row.get(4)?;
    let category = row.get(5)?;

    Ok(Transaction {
        id,
        user_id,
        merchant,
        amount,
        date,
        category,
    })
}
