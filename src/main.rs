//! The rewardeur command line interface.
//!
//! This is the presentation collaborator for the accounting engine: it owns
//! argument parsing and terminal output, and delegates every business
//! decision to the library.

use std::{error::Error, process::exit};

use clap::{Parser, Subcommand};
use rusqlite::Connection;
use time::{Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description};

use rewardeur::{
    AppState, BudgetSniperOutcome, ExtractedReceipt, POINTS_PER_DOLLAR, REDEMPTION_BATCH_POINTS,
    RedemptionOutcome, Settings, SortOrder, Transaction, TransactionQuery, evaluate_budget_sniper,
    format_currency, get_reward_ledger, get_settings, previous_month, process_receipt_upload,
    put_reward_ledger, put_settings, query_transactions, redeem, summarize,
};

/// Track expenses against a monthly limit and earn points for staying under
/// budget.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// File path to the application SQLite database.
    #[arg(long, default_value = "rewardeur.db")]
    db_path: String,

    /// The user the command acts on behalf of.
    #[arg(long, default_value = "local")]
    user: String,

    /// The local timezone as a canonical timezone name, e.g.
    /// "Pacific/Auckland".
    #[arg(long, default_value = "Etc/UTC")]
    timezone: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record an expense manually.
    Add {
        /// The merchant the money was spent at.
        #[arg(long)]
        merchant: String,

        /// The amount spent, in dollars.
        #[arg(long)]
        amount: f64,

        /// The purchase date as YYYY-MM-DD. Defaults to today.
        #[arg(long)]
        date: Option<String>,

        /// The spending category.
        #[arg(long)]
        category: Option<String>,
    },

    /// Record an uploaded receipt, giving the Speed Demon bonus a chance to
    /// fire.
    Upload {
        /// The merchant name extracted from the receipt.
        #[arg(long)]
        merchant: String,

        /// The receipt total, in dollars.
        #[arg(long)]
        amount: f64,

        /// The purchase timestamp as RFC 3339, e.g.
        /// "2024-03-05T12:30:00Z".
        #[arg(long)]
        purchase_time: String,

        /// The spending category, if known.
        #[arg(long)]
        category: Option<String>,
    },

    /// List the most recent transactions.
    List {
        /// The maximum number of transactions to show.
        #[arg(long, default_value_t = 20)]
        limit: u64,
    },

    /// Show the spending summary for a month (the current month by default).
    Summary {
        /// The month to summarize as YYYY-MM.
        #[arg(long)]
        month: Option<String>,
    },

    /// Show the saved salary and spending limit.
    Settings,

    /// Save the monthly salary and spending limit.
    SetSettings {
        /// Monthly salary, in dollars.
        #[arg(long)]
        salary: f64,

        /// Monthly spending limit, in dollars.
        #[arg(long)]
        limit: f64,
    },

    /// Show the reward point balance and badges.
    Rewards,

    /// Evaluate the Budget Sniper reward for a closed month (the previous
    /// month by default).
    Evaluate {
        /// The month to evaluate as YYYY-MM.
        #[arg(long)]
        month: Option<String>,
    },

    /// Redeem one batch of 1000 points for $10.
    Redeem,
}

fn main() {
    setup_logging();

    let cli = Cli::parse();

    if let Err(error) = run(cli) {
        eprintln!("Error: {error}");
        exit(1);
    }
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let state = AppState::new(Connection::open(&cli.db_path)?, &cli.timezone)?;
    let connection = state.db_connection.lock().unwrap();
    let today = OffsetDateTime::now_utc().to_offset(state.local_offset).date();

    match cli.command {
        Command::Add {
            merchant,
            amount,
            date,
            category,
        } => {
            let date = match date {
                Some(text) => parse_date(&text)?,
                None => today,
            };
            let mut builder = Transaction::build(&merchant, amount, date);
            if let Some(category) = category {
                builder = builder.category(&category);
            }

            let transaction = rewardeur::create_transaction(
                &cli.user,
                builder,
                state.local_offset,
                &connection,
            )?;
            println!(
                "Recorded {} at {} on {}.",
                format_currency(transaction.amount),
                transaction.merchant,
                transaction.date
            );
        }
        Command::Upload {
            merchant,
            amount,
            purchase_time,
            category,
        } => {
            let receipt = ExtractedReceipt {
                merchant,
                total_amount: amount,
                purchase_time: OffsetDateTime::parse(&purchase_time, &Rfc3339)?,
                category,
            };

            let outcome = process_receipt_upload(
                &cli.user,
                receipt,
                OffsetDateTime::now_utc(),
                state.local_offset,
                &mut rand::thread_rng(),
                &connection,
            )?;

            println!(
                "Recorded {} at {} on {}.",
                format_currency(outcome.transaction.amount),
                outcome.transaction.merchant,
                outcome.transaction.date
            );
            if outcome.speed_demon_awarded {
                println!("Speed Demon! +50 points for the quick upload.");
            }
        }
        Command::List { limit } => {
            let transactions = query_transactions(
                &cli.user,
                TransactionQuery {
                    limit: Some(limit),
                    sort_date: Some(SortOrder::Descending),
                    ..Default::default()
                },
                &connection,
            )?;

            if transactions.is_empty() {
                println!("No transactions recorded yet.");
            }

            for transaction in transactions {
                println!(
                    "{}  {:>12}  {}  ({})",
                    transaction.date,
                    format_currency(transaction.amount),
                    transaction.merchant,
                    transaction.category
                );
            }
        }
        Command::Summary { month } => {
            let reference_month = match month {
                Some(text) => parse_month(&text)?,
                None => today,
            };
            let transactions =
                query_transactions(&cli.user, TransactionQuery::default(), &connection)?;
            let settings = get_settings(&cli.user, &connection)?;

            let summary = summarize(&transactions, reference_month, &settings);

            println!("Summary for {}", format_month(summary.reference_month)?);
            println!(
                "  Spent this month:  {}",
                format_currency(summary.current_month_total)
            );
            println!(
                "  Remaining limit:   {}",
                format_currency(summary.remaining_limit)
            );
            println!(
                "  Projected savings: {}",
                format_currency(summary.projected_savings)
            );

            if !summary.history.is_empty() {
                println!("History:");
            }
            for bucket in &summary.history {
                println!(
                    "  {}: {} over {} transactions",
                    format_month(bucket.month)?,
                    format_currency(bucket.total),
                    bucket.transactions.len()
                );
            }
        }
        Command::Settings => {
            let settings = get_settings(&cli.user, &connection)?;
            println!("Monthly salary: {}", format_currency(settings.salary));
            println!("Monthly limit:  {}", format_currency(settings.limit));
        }
        Command::SetSettings { salary, limit } => {
            put_settings(&cli.user, Settings { salary, limit }, &connection)?;
            println!("Financial settings updated.");
        }
        Command::Rewards => {
            let ledger = get_reward_ledger(&cli.user, &connection)?;
            let cash_value = ledger.points as f64 / POINTS_PER_DOLLAR as f64;

            println!(
                "Points: {} (worth {})",
                ledger.points,
                format_currency(cash_value)
            );
            if ledger.badges.is_empty() {
                println!("No badges yet. Start logging expenses to earn them!");
            } else {
                println!("Badges: {}", ledger.badges.join(", "));
            }
        }
        Command::Evaluate { month } => {
            let reference_month = match month {
                Some(text) => parse_month(&text)?,
                None => previous_month(today),
            };
            let transactions =
                query_transactions(&cli.user, TransactionQuery::default(), &connection)?;
            let settings = get_settings(&cli.user, &connection)?;
            let mut ledger = get_reward_ledger(&cli.user, &connection)?;

            let outcome =
                evaluate_budget_sniper(&mut ledger, &transactions, &settings, reference_month);

            match outcome {
                BudgetSniperOutcome::RewardGranted {
                    spend,
                    limit,
                    points_awarded,
                } => {
                    put_reward_ledger(&cli.user, &ledger, &connection)?;
                    println!(
                        "You earned {points_awarded} points! You spent {} and stayed under your {} limit.",
                        format_currency(spend),
                        format_currency(limit)
                    );
                }
                BudgetSniperOutcome::NoReward { spend, limit } => {
                    println!(
                        "No points this time. You spent {}, which was over your {} limit.",
                        format_currency(spend),
                        format_currency(limit)
                    );
                }
                BudgetSniperOutcome::NoLimitSet => {
                    println!("Set your spending limit first with `set-settings`.");
                }
            }
        }
        Command::Redeem => {
            let mut ledger = get_reward_ledger(&cli.user, &connection)?;

            match redeem(&mut ledger) {
                RedemptionOutcome::Success { new_balance } => {
                    put_reward_ledger(&cli.user, &ledger, &connection)?;
                    println!(
                        "You redeemed {REDEMPTION_BATCH_POINTS} points for {}! New balance: {new_balance} points.",
                        format_currency(
                            REDEMPTION_BATCH_POINTS as f64 / POINTS_PER_DOLLAR as f64
                        )
                    );
                }
                RedemptionOutcome::InsufficientPoints {
                    current_points,
                    required,
                } => {
                    println!(
                        "Not enough points to redeem. You need {required} points (you have {current_points})."
                    );
                }
            }
        }
    }

    Ok(())
}

fn parse_date(text: &str) -> Result<Date, time::error::Parse> {
    Date::parse(text, format_description!("[year]-[month]-[day]"))
}

fn parse_month(text: &str) -> Result<Date, time::error::Parse> {
    Date::parse(
        &format!("{text}-01"),
        format_description!("[year]-[month]-[day]"),
    )
}

fn format_month(month: Date) -> Result<String, time::error::Format> {
    month.format(format_description!("[month repr:long] [year]"))
}
