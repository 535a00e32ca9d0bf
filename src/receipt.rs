//! The receipt upload hook.
//!
//! The OCR/extraction pipeline is an external collaborator; it hands this
//! module the fields it pulled off a receipt. The hook records the expense
//! and gives the Speed Demon trigger a chance to fire. A failure on the
//! reward side is logged and swallowed: it never fails the upload itself.

use rand::Rng;
use rusqlite::Connection;
use time::{OffsetDateTime, UtcOffset};

use crate::{
    Error,
    rewards::{get_reward_ledger, put_reward_ledger, try_speed_demon},
    transaction::{Transaction, UNCATEGORIZED},
};

/// The fields the extraction pipeline pulled off an uploaded receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedReceipt {
    /// The merchant name printed on the receipt.
    pub merchant: String,
    /// The receipt's total, in dollars.
    pub total_amount: f64,
    /// When the purchase happened, from the receipt's timestamp.
    pub purchase_time: OffsetDateTime,
    /// The spending category, if the pipeline classified one.
    pub category: Option<String>,
}

/// The result of a successful receipt upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    /// The stored transaction.
    pub transaction: Transaction,
    /// Whether the Speed Demon bonus fired for this upload. Informational
    /// only; the upload succeeds either way.
    pub speed_demon_awarded: bool,
}

/// Record an uploaded receipt as a transaction and run the Speed Demon
/// trigger.
///
/// The transaction's civil date is the receipt's purchase time viewed in
/// `local_timezone`. Persistence failures on the transaction fail the
/// upload; failures while reading or writing the reward ledger are logged
/// at warn level and do not.
///
/// # Errors
/// This function will return a:
/// - [Error::FutureDate] if the purchase date resolves to the future,
/// - [Error::NegativeAmount] if the receipt total is below zero,
/// - or [Error::SqlError] if storing the transaction fails.
pub fn process_receipt_upload(
    user_id: &str,
    receipt: ExtractedReceipt,
    upload_time: OffsetDateTime,
    local_timezone: UtcOffset,
    rng: &mut impl Rng,
    connection: &Connection,
) -> Result<UploadOutcome, Error> {
    let purchase_date = receipt.purchase_time.to_offset(local_timezone).date();
    let category = receipt.category.as_deref().unwrap_or(UNCATEGORIZED);

    let builder = Transaction::build(&receipt.merchant, receipt.total_amount, purchase_date)
        .category(category);
    let transaction =
        crate::transaction::create_transaction(user_id, builder, local_timezone, connection)?;

    let speed_demon_awarded =
        apply_speed_demon(user_id, receipt.purchase_time, upload_time, rng, connection);

    Ok(UploadOutcome {
        transaction,
        speed_demon_awarded,
    })
}

/// Run the Speed Demon trigger for an upload, swallowing ledger failures.
fn apply_speed_demon(
    user_id: &str,
    purchase_time: OffsetDateTime,
    upload_time: OffsetDateTime,
    rng: &mut impl Rng,
    connection: &Connection,
) -> bool {
    let mut ledger = match get_reward_ledger(user_id, connection) {
        Ok(ledger) => ledger,
        Err(error) => {
            tracing::warn!("skipping speed demon bonus, could not read reward ledger: {error}");
            return false;
        }
    };

    if !try_speed_demon(&mut ledger, purchase_time, upload_time, rng) {
        return false;
    }

    match put_reward_ledger(user_id, &ledger, connection) {
        Ok(()) => true,
        Err(error) => {
            // The previously stored ledger stays authoritative.
            tracing::warn!("could not save reward ledger after speed demon bonus: {error}");
            false
        }
    }
}
