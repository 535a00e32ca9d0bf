//! Calendar-month aggregation of transactions.
//!
//! Transactions are partitioned into buckets by the calendar month of their
//! own date (the local civil calendar, not elapsed-time windows such as
//! "last 30 days"). Buckets are recomputed on demand from the transaction
//! log and never cached: everything in this module is a pure function of its
//! inputs, so it is safe to call on every read.

use std::collections::HashMap;

use time::Date;

use crate::{settings::Settings, transaction::Transaction};

/// The set of transactions whose date falls within one calendar month,
/// together with their total.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthBucket {
    /// The first day of the bucket's month.
    pub month: Date,
    /// The transactions in the bucket, sorted by date ascending.
    pub transactions: Vec<Transaction>,
    /// The sum of the bucket's transaction amounts.
    pub total: f64,
}

/// A month-centric view over a user's transactions and settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySummary {
    /// The first day of the month the summary is centred on.
    pub reference_month: Date,
    /// Total spend in the reference month. Zero when nothing was spent.
    pub current_month_total: f64,
    /// `settings.limit` minus the reference month's spend. Negative values
    /// signal over-budget, not an error.
    pub remaining_limit: f64,
    /// `settings.salary` minus the reference month's spend.
    pub projected_savings: f64,
    /// Buckets for every month other than the reference month, most recent
    /// first.
    pub history: Vec<MonthBucket>,
}

/// The first day of the month that `date` falls in.
pub fn month_of(date: Date) -> Date {
    date.replace_day(1).unwrap()
}

/// The first day of the month before the one `date` falls in.
pub fn previous_month(date: Date) -> Date {
    month_of(month_of(date).previous_day().unwrap())
}

/// Total spend in the calendar month that `month` falls in.
pub fn month_total(transactions: &[Transaction], month: Date) -> f64 {
    let month = month_of(month);

    transactions
        .iter()
        .filter(|transaction| month_of(transaction.date) == month)
        .map(|transaction| transaction.amount)
        .sum()
}

/// Partition transactions into calendar-month buckets, sorted by month
/// ascending.
///
/// Every transaction lands in exactly one bucket, keyed by the month of its
/// own date.
fn bucket_by_month(transactions: &[Transaction]) -> Vec<MonthBucket> {
    let mut by_month: HashMap<Date, Vec<Transaction>> = HashMap::new();

    for transaction in transactions {
        by_month
            .entry(month_of(transaction.date))
            .or_default()
            .push(transaction.clone());
    }

    let mut buckets: Vec<MonthBucket> = by_month
        .into_iter()
        .map(|(month, mut transactions)| {
            transactions.sort_by_key(|transaction| transaction.date);
            let total = transactions
                .iter()
                .map(|transaction| transaction.amount)
                .sum();

            MonthBucket {
                month,
                transactions,
                total,
            }
        })
        .collect();

    buckets.sort_by_key(|bucket| bucket.month);
    buckets
}

/// Summarize a user's transactions around `reference_month`.
///
/// The input order of `transactions` carries no meaning; buckets re-sort by
/// date. History buckets are ordered by comparing bucket start dates, most
/// recent first, never by formatted month labels (a string sort on labels
/// such as "Dec 2023"/"Jan 2024" does not equal chronological order).
pub fn summarize(
    transactions: &[Transaction],
    reference_month: Date,
    settings: &Settings,
) -> MonthlySummary {
    let reference_month = month_of(reference_month);
    let buckets = bucket_by_month(transactions);

    let current_month_total = buckets
        .iter()
        .find(|bucket| bucket.month == reference_month)
        .map_or(0.0, |bucket| bucket.total);

    let mut history: Vec<MonthBucket> = buckets
        .into_iter()
        .filter(|bucket| bucket.month != reference_month)
        .collect();
    history.sort_by(|a, b| b.month.cmp(&a.month));

    MonthlySummary {
        reference_month,
        current_month_total,
        remaining_limit: settings.limit - current_month_total,
        projected_savings: settings.salary - current_month_total,
        history,
    }
}

#[cfg(test)]
mod summary_tests {
    use time::{Date, macros::date};

    use crate::{
        settings::Settings,
        summary::{month_of, month_total, previous_month, summarize},
        transaction::Transaction,
    };

    fn make_transaction(id: i64, amount: f64, date: Date) -> Transaction {
        Transaction {
            id,
            user_id: "alice".to_owned(),
            merchant: "Test Merchant".to_owned(),
            amount,
            date,
            category: "Groceries".to_owned(),
        }
    }

    #[test]
    fn month_of_normalizes_to_first_day() {
        assert_eq!(month_of(date!(2024 - 02 - 29)), date!(2024 - 02 - 01));
    }

    #[test]
    fn previous_month_crosses_year_boundary() {
        assert_eq!(previous_month(date!(2024 - 01 - 15)), date!(2023 - 12 - 01));
    }

    #[test]
    fn current_month_total_matches_bucket_sum() {
        let transactions = vec![
            make_transaction(1, 100.0, date!(2024 - 03 - 02)),
            make_transaction(2, 20.5, date!(2024 - 03 - 28)),
            make_transaction(3, 999.0, date!(2024 - 02 - 15)),
        ];

        let summary = summarize(
            &transactions,
            date!(2024 - 03 - 10),
            &Settings::default(),
        );

        assert_eq!(summary.current_month_total, 120.5);
        assert_eq!(
            summary.current_month_total,
            month_total(&transactions, date!(2024 - 03 - 01))
        );
    }

    #[test]
    fn bucketing_is_a_partition() {
        let transactions = vec![
            make_transaction(1, 10.0, date!(2023 - 11 - 30)),
            make_transaction(2, 20.0, date!(2023 - 12 - 01)),
            make_transaction(3, 30.0, date!(2023 - 12 - 31)),
            make_transaction(4, 40.0, date!(2024 - 01 - 01)),
        ];

        let summary = summarize(
            &transactions,
            date!(2024 - 02 - 01),
            &Settings::default(),
        );

        let transaction_count: usize = summary
            .history
            .iter()
            .map(|bucket| bucket.transactions.len())
            .sum();
        let total: f64 = summary.history.iter().map(|bucket| bucket.total).sum();

        assert_eq!(transaction_count, transactions.len());
        assert_eq!(total, 100.0);
    }

    #[test]
    fn history_is_ordered_chronologically_descending_across_year_boundary() {
        // A lexical sort on labels like "Dec 2023" vs "Jan 2024" would put
        // December after January. Bucket start dates must win.
        let transactions = vec![
            make_transaction(1, 10.0, date!(2023 - 12 - 05)),
            make_transaction(2, 20.0, date!(2024 - 01 - 05)),
            make_transaction(3, 30.0, date!(2023 - 11 - 05)),
        ];

        let summary = summarize(
            &transactions,
            date!(2024 - 02 - 01),
            &Settings::default(),
        );

        let months: Vec<Date> = summary.history.iter().map(|bucket| bucket.month).collect();
        assert_eq!(
            months,
            vec![
                date!(2024 - 01 - 01),
                date!(2023 - 12 - 01),
                date!(2023 - 11 - 01)
            ]
        );
    }

    #[test]
    fn history_excludes_the_reference_month() {
        let transactions = vec![
            make_transaction(1, 10.0, date!(2024 - 03 - 05)),
            make_transaction(2, 20.0, date!(2024 - 02 - 05)),
        ];

        let summary = summarize(
            &transactions,
            date!(2024 - 03 - 15),
            &Settings::default(),
        );

        assert_eq!(summary.history.len(), 1);
        assert_eq!(summary.history[0].month, date!(2024 - 02 - 01));
    }

    #[test]
    fn absent_reference_bucket_yields_zero_total() {
        let transactions = vec![make_transaction(1, 10.0, date!(2024 - 01 - 05))];

        let summary = summarize(
            &transactions,
            date!(2024 - 06 - 01),
            &Settings {
                salary: 5000.0,
                limit: 2000.0,
            },
        );

        assert_eq!(summary.current_month_total, 0.0);
        assert_eq!(summary.remaining_limit, 2000.0);
        assert_eq!(summary.projected_savings, 5000.0);
    }

    #[test]
    fn overspending_yields_negative_remaining_limit() {
        let transactions = vec![make_transaction(1, 2500.0, date!(2024 - 01 - 05))];

        let summary = summarize(
            &transactions,
            date!(2024 - 01 - 31),
            &Settings {
                salary: 5000.0,
                limit: 2000.0,
            },
        );

        assert_eq!(summary.remaining_limit, -500.0);
        assert_eq!(summary.projected_savings, 2500.0);
    }

    #[test]
    fn bucket_transactions_are_sorted_by_date() {
        let transactions = vec![
            make_transaction(1, 10.0, date!(2024 - 01 - 20)),
            make_transaction(2, 20.0, date!(2024 - 01 - 05)),
            make_transaction(3, 30.0, date!(2024 - 01 - 12)),
        ];

        let summary = summarize(
            &transactions,
            date!(2024 - 02 - 01),
            &Settings::default(),
        );

        let dates: Vec<Date> = summary.history[0]
            .transactions
            .iter()
            .map(|transaction| transaction.date)
            .collect();
        assert_eq!(
            dates,
            vec![
                date!(2024 - 01 - 05),
                date!(2024 - 01 - 12),
                date!(2024 - 01 - 20)
            ]
        );
    }
}
