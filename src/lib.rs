//! Rewardeur is an expense tracking companion that pays you (in points) for
//! staying under budget.
//!
//! The library turns an append-only transaction log into calendar-month
//! summaries, and turns spending behavior into a points/badge ledger:
//! under-spending a self-declared monthly limit earns "Budget Sniper" points,
//! uploading a receipt within an hour of purchase can earn a "Speed Demon"
//! bonus, and points are redeemable for cash in fixed batches.
//!
//! Receipt extraction, chat, and the web UI are external collaborators; this
//! crate owns the accounting rules and their persistence.

#![warn(missing_docs)]

use time::Date;

mod app_state;
mod db;
mod format;
mod receipt;
mod rewards;
mod settings;
mod summary;
mod timezone;
mod transaction;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use format::format_currency;
pub use receipt::{ExtractedReceipt, UploadOutcome, process_receipt_upload};
pub use rewards::{
    BUDGET_SNIPER_BADGE, BudgetSniperOutcome, POINTS_PER_DOLLAR, POINTS_PER_SAVED_DOLLAR,
    REDEMPTION_BATCH_POINTS, RedemptionOutcome, RewardLedger, SPEED_DEMON_BADGE,
    SPEED_DEMON_POINTS, SPEED_DEMON_PROBABILITY, SPEED_DEMON_WINDOW, evaluate_budget_sniper,
    get_reward_ledger, put_reward_ledger, redeem, try_speed_demon,
};
pub use settings::{Settings, get_settings, put_settings};
pub use summary::{MonthBucket, MonthlySummary, month_of, month_total, previous_month, summarize};
pub use timezone::get_local_offset;
pub use transaction::{
    SortOrder, Transaction, TransactionBuilder, TransactionQuery, UNCATEGORIZED,
    create_transaction, query_transactions,
};

/// The errors that may occur in the application.
///
/// Business outcomes such as "not enough points to redeem" are not errors;
/// they are returned as data by the rewards module.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A date in the future was used to create a transaction.
    ///
    /// Transactions record purchases that have already happened, therefore
    /// future dates are not allowed.
    #[error("{0} is a date in the future, which is not allowed")]
    FutureDate(Date),

    /// A negative amount was used for a transaction or a settings field.
    ///
    /// Expenses, salaries, and limits are recorded as non-negative dollar
    /// values.
    #[error("{0} is negative, which is not allowed here")]
    NegativeAmount(f64),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical
    /// timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// The badge list stored for a reward ledger could not be encoded or
    /// decoded as JSON.
    ///
    /// This indicates a corrupt row and should never occur for ledgers
    /// written by this crate.
    #[error("could not read or write the badge list: {0}")]
    BadgeEncoding(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}
