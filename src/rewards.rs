//! The points and badge ledger, and the rules that feed it.
//!
//! Two independent triggers mutate a user's [RewardLedger]:
//!
//! - **Budget Sniper**: caller-invoked evaluation of a closed prior month.
//!   Spending under the declared limit earns points per whole dollar saved.
//! - **Speed Demon**: fired on receipt upload. Uploading within an hour of
//!   purchase earns a probabilistic bonus.
//!
//! Both outcomes, and point redemption, are returned as data: "no reward" and
//! "not enough points" are expected results, never errors. Callers persist
//! the mutated ledger with [put_reward_ledger]; all operations here are
//! read-modify-write over a ledger snapshot, so a store that serializes
//! writes per user is assumed.

use rand::Rng;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime};

use crate::{Error, settings::Settings, summary::month_total, transaction::Transaction};

/// The badge granted for under-spending the monthly limit.
pub const BUDGET_SNIPER_BADGE: &str = "Budget Sniper";

/// The badge granted for uploading a receipt within an hour of purchase.
pub const SPEED_DEMON_BADGE: &str = "Speed Demon";

/// Points granted per whole dollar saved under the monthly limit.
pub const POINTS_PER_SAVED_DOLLAR: u64 = 10;

/// Points granted when the Speed Demon bonus fires.
pub const SPEED_DEMON_POINTS: u64 = 50;

/// The chance that a qualifying upload earns the Speed Demon bonus.
///
/// The draw itself comes from the caller-supplied generator so that tests
/// stay deterministic.
pub const SPEED_DEMON_PROBABILITY: f64 = 0.5;

/// How soon after purchase a receipt must be uploaded to qualify for the
/// Speed Demon bonus.
pub const SPEED_DEMON_WINDOW: Duration = Duration::HOUR;

/// The conversion rate from points to cash: 100 points = $1.00.
pub const POINTS_PER_DOLLAR: u64 = 100;

/// The number of points redeemed per call: one $10.00 batch.
pub const REDEMPTION_BATCH_POINTS: u64 = 1000;

/// A user's accumulated reward points and badges.
///
/// Points never go below zero and are only ever decreased by [redeem].
/// Badge names are unique; insertion order is preserved for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardLedger {
    /// The user's point balance.
    pub points: u64,
    /// The badges the user has earned, in the order they were earned.
    pub badges: Vec<String>,
}

impl RewardLedger {
    /// Add a badge to the ledger if it is not already present.
    ///
    /// Granting a badge the user already holds is a no-op: membership, not
    /// count, is the persisted signal.
    pub fn grant_badge(&mut self, badge: &str) {
        if !self.badges.iter().any(|existing| existing == badge) {
            self.badges.push(badge.to_owned());
        }
    }
}

/// The result of a Budget Sniper evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BudgetSniperOutcome {
    /// The user has not set a spending limit; nothing was evaluated.
    NoLimitSet,
    /// Spending met or exceeded the limit; no points were granted.
    NoReward {
        /// Total spend in the evaluated month.
        spend: f64,
        /// The user's monthly limit.
        limit: f64,
    },
    /// Spending stayed under the limit; points were granted.
    RewardGranted {
        /// Total spend in the evaluated month.
        spend: f64,
        /// The user's monthly limit.
        limit: f64,
        /// The points added to the ledger.
        points_awarded: u64,
    },
}

/// Evaluate the Budget Sniper reward for `reference_month`.
///
/// Grants [POINTS_PER_SAVED_DOLLAR] points for every whole dollar of spend
/// under `settings.limit` in the month, and the [BUDGET_SNIPER_BADGE] badge
/// on the first grant. The ledger is only mutated on
/// [BudgetSniperOutcome::RewardGranted].
///
/// This operation is caller-invoked, not scheduled: evaluating the same
/// month twice grants points twice. Callers needing exactly-once semantics
/// per month must track the last evaluated month themselves.
pub fn evaluate_budget_sniper(
    ledger: &mut RewardLedger,
    transactions: &[Transaction],
    settings: &Settings,
    reference_month: Date,
) -> BudgetSniperOutcome {
    if settings.limit == 0.0 {
        return BudgetSniperOutcome::NoLimitSet;
    }

    let spend = month_total(transactions, reference_month);

    if spend < settings.limit {
        let saved = settings.limit - spend;
        let points_awarded = saved.floor() as u64 * POINTS_PER_SAVED_DOLLAR;

        ledger.points += points_awarded;
        ledger.grant_badge(BUDGET_SNIPER_BADGE);

        tracing::info!(
            "granted {points_awarded} points for spending {spend} of a {} limit",
            settings.limit
        );

        BudgetSniperOutcome::RewardGranted {
            spend,
            limit: settings.limit,
            points_awarded,
        }
    } else {
        BudgetSniperOutcome::NoReward {
            spend,
            limit: settings.limit,
        }
    }
}

/// Maybe grant the Speed Demon bonus for a receipt upload.
///
/// The bonus only qualifies when the upload happened no later than
/// [SPEED_DEMON_WINDOW] after the purchase (uploads timestamped before the
/// purchase never qualify). A qualifying upload then earns
/// [SPEED_DEMON_POINTS] points and the [SPEED_DEMON_BADGE] badge with
/// probability [SPEED_DEMON_PROBABILITY], drawn from `rng`.
///
/// Returns whether the bonus fired.
pub fn try_speed_demon(
    ledger: &mut RewardLedger,
    purchase_time: OffsetDateTime,
    upload_time: OffsetDateTime,
    rng: &mut impl Rng,
) -> bool {
    let elapsed = upload_time - purchase_time;

    if elapsed < Duration::ZERO || elapsed > SPEED_DEMON_WINDOW {
        return false;
    }

    if rng.r#gen::<f64>() >= SPEED_DEMON_PROBABILITY {
        return false;
    }

    ledger.points += SPEED_DEMON_POINTS;
    ledger.grant_badge(SPEED_DEMON_BADGE);

    true
}

/// The result of a point redemption attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RedemptionOutcome {
    /// The balance was below one redemption batch; nothing was redeemed.
    InsufficientPoints {
        /// The user's current point balance.
        current_points: u64,
        /// The points required for one batch.
        required: u64,
    },
    /// Exactly one batch was redeemed.
    Success {
        /// The point balance after redemption.
        new_balance: u64,
    },
}

/// Redeem one batch of [REDEMPTION_BATCH_POINTS] points for cash.
///
/// Never redeems a partial batch and never more than one batch per call;
/// callers wanting multiple batches call repeatedly, with each call
/// re-checking the threshold against the post-mutation balance. The
/// threshold check happens before the subtraction, so the balance can never
/// go negative.
pub fn redeem(ledger: &mut RewardLedger) -> RedemptionOutcome {
    if ledger.points < REDEMPTION_BATCH_POINTS {
        return RedemptionOutcome::InsufficientPoints {
            current_points: ledger.points,
            required: REDEMPTION_BATCH_POINTS,
        };
    }

    ledger.points -= REDEMPTION_BATCH_POINTS;

    RedemptionOutcome::Success {
        new_balance: ledger.points,
    }
}

/// Retrieve a user's reward ledger from the database.
///
/// Returns an empty ledger (zero points, no badges) if the user has never
/// earned a reward.
///
/// # Errors
/// This function will return a:
/// - [Error::BadgeEncoding] if the stored badge list is not valid JSON,
/// - or [Error::SqlError] if there is a SQL error.
pub fn get_reward_ledger(user_id: &str, connection: &Connection) -> Result<RewardLedger, Error> {
    let row = connection
        .prepare("SELECT points, badges FROM reward_ledger WHERE user_id = :user_id")?
        .query_row(&[(":user_id", user_id)], map_reward_ledger_row)
        .optional()?;

    match row {
        Some((points, badges_json)) => {
            let badges = serde_json::from_str(&badges_json)
                .map_err(|error| Error::BadgeEncoding(error.to_string()))?;

            Ok(RewardLedger {
                points: points as u64,
                badges,
            })
        }
        None => Ok(RewardLedger::default()),
    }
}

/// Save a user's reward ledger, replacing any previously saved state.
///
/// The write is a single upsert: if it fails, the previously stored ledger
/// remains authoritative.
///
/// # Errors
/// This function will return a:
/// - [Error::BadgeEncoding] if the badge list cannot be encoded as JSON,
/// - or [Error::SqlError] if there is a SQL error.
pub fn put_reward_ledger(
    user_id: &str,
    ledger: &RewardLedger,
    connection: &Connection,
) -> Result<(), Error> {
    let badges_json = serde_json::to_string(&ledger.badges)
        .map_err(|error| Error::BadgeEncoding(error.to_string()))?;

    connection.execute(
        "INSERT INTO reward_ledger (user_id, points, badges) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id) DO UPDATE SET points = excluded.points, badges = excluded.badges",
        (user_id, ledger.points as i64, badges_json),
    )?;

    Ok(())
}

/// Create the reward ledger table in the database.
pub(crate) fn create_reward_ledger_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS reward_ledger (
                user_id TEXT PRIMARY KEY,
                points INTEGER NOT NULL,
                badges TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Map a database row to the raw (points, badges JSON) pair.
fn map_reward_ledger_row(row: &Row) -> Result<(i64, String), rusqlite::Error> {
    let points = row.get(0)?;
    let badges_json = row.get(1)?;

    Ok((points, badges_json))
}


#[cfg(test)]
mod speed_demon_tests {
    use rand::rngs::mock::StepRng;
    use time::macros::datetime;

    use crate::rewards::{RewardLedger, SPEED_DEMON_BADGE, SPEED_DEMON_POINTS, try_speed_demon};

    /// A generator whose next draw is guaranteed below the bonus probability.
    fn always_winning_rng() -> StepRng {
        StepRng::new(0, 0)
    }

    /// A generator whose next draw is guaranteed at or above the bonus
    /// probability.
    fn always_losing_rng() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    #[test]
    fn upload_within_an_hour_can_fire() {
        let mut ledger = RewardLedger::default();

        let fired = try_speed_demon(
            &mut ledger,
            datetime!(2024-01-12 12:00 UTC),
            datetime!(2024-01-12 12:59 UTC),
            &mut always_winning_rng(),
        );

        assert!(fired);
        assert_eq!(ledger.points, SPEED_DEMON_POINTS);
        assert_eq!(ledger.badges, vec![SPEED_DEMON_BADGE]);
    }

    #[test]
    fn upload_exactly_one_hour_after_purchase_can_fire() {
        let mut ledger = RewardLedger::default();

        let fired = try_speed_demon(
            &mut ledger,
            datetime!(2024-01-12 12:00 UTC),
            datetime!(2024-01-12 13:00 UTC),
            &mut always_winning_rng(),
        );

        assert!(fired);
    }

    #[test]
    fn slow_upload_never_fires_for_any_draw() {
        let mut ledger = RewardLedger::default();

        let fired = try_speed_demon(
            &mut ledger,
            datetime!(2024-01-12 12:00 UTC),
            datetime!(2024-01-12 13:01 UTC),
            &mut always_winning_rng(),
        );

        assert!(!fired);
        assert_eq!(ledger, RewardLedger::default());
    }

    #[test]
    fn upload_before_purchase_never_fires() {
        let mut ledger = RewardLedger::default();

        let fired = try_speed_demon(
            &mut ledger,
            datetime!(2024-01-12 12:00 UTC),
            datetime!(2024-01-12 11:30 UTC),
            &mut always_winning_rng(),
        );

        assert!(!fired);
    }

    #[test]
    fn losing_draw_leaves_ledger_untouched() {
        let mut ledger = RewardLedger::default();

        let fired = try_speed_demon(
            &mut ledger,
            datetime!(2024-01-12 12:00 UTC),
            datetime!(2024-01-12 12:10 UTC),
            &mut always_losing_rng(),
        );

        assert!(!fired);
        assert_eq!(ledger, RewardLedger::default());
    }

    #[test]
    fn repeated_bonuses_keep_a_single_badge() {
        let mut ledger = RewardLedger::default();

        for _ in 0..3 {
            try_speed_demon(
                &mut ledger,
                datetime!(2024-01-12 12:00 UTC),
                datetime!(2024-01-12 12:10 UTC),
                &mut always_winning_rng(),
            );
        }

        assert_eq!(ledger.points, 3 * SPEED_DEMON_POINTS);
        assert_eq!(ledger.badges, vec![SPEED_DEMON_BADGE]);
    }
}


#[cfg(test)]
mod ledger_store_tests {
    use rusqlite::Connection;

    use crate::{
        db::initialize,
        rewards::{RewardLedger, get_reward_ledger, put_reward_ledger},
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    #[test]
    fn first_access_yields_an_empty_ledger() {
        let connection = get_test_connection();

        let ledger = get_reward_ledger("alice", &connection).unwrap();

        assert_eq!(ledger, RewardLedger::default());
    }

    #[test]
    fn ledger_round_trips_with_badge_order_preserved() {
        let connection = get_test_connection();
        let ledger = RewardLedger {
            points: 850,
            badges: vec!["Speed Demon".to_owned(), "Budget Sniper".to_owned()],
        };

        put_reward_ledger("alice", &ledger, &connection).unwrap();
        let loaded = get_reward_ledger("alice", &connection).unwrap();

        assert_eq!(loaded, ledger);
    }

    #[test]
    fn put_overwrites_the_previous_ledger() {
        let connection = get_test_connection();

        put_reward_ledger(
            "alice",
            &RewardLedger {
                points: 100,
                badges: vec![],
            },
            &connection,
        )
        .unwrap();
        put_reward_ledger(
            "alice",
            &RewardLedger {
                points: 2500,
                badges: vec!["Budget Sniper".to_owned()],
            },
            &connection,
        )
        .unwrap();

        let loaded = get_reward_ledger("alice", &connection).unwrap();

        assert_eq!(loaded.points, 2500);
        assert_eq!(loaded.badges, vec!["Budget Sniper"]);
    }

    #[test]
    fn ledgers_are_stored_per_user() {
        let connection = get_test_connection();

        put_reward_ledger(
            "alice",
            &RewardLedger {
                points: 100,
                badges: vec![],
            },
            &connection,
        )
        .unwrap();

        let other = get_reward_ledger("bob", &connection).unwrap();

        assert_eq!(other, RewardLedger::default());
    }
}
