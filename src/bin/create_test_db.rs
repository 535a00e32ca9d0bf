use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime, UtcOffset};

use rewardeur::{
    RewardLedger, Settings, Transaction, create_transaction, initialize_db, put_reward_ledger,
    put_settings,
};

/// A utility for creating a test database for rewardeur.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The user to seed data for.
    #[arg(long, default_value = "local")]
    user: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Saving settings...");
    put_settings(
        &args.user,
        Settings {
            salary: 5000.0,
            limit: 2000.0,
        },
        &conn,
    )?;

    println!("Creating transactions...");
    let today = OffsetDateTime::now_utc().date();
    let expenses = [
        ("Coffee Collective", 4.50, 2, "Dining"),
        ("Supermarket", 87.20, 5, "Groceries"),
        ("Gas Station", 62.00, 9, "Transport"),
        ("Book Nook", 24.99, 12, "Entertainment"),
        ("Supermarket", 103.45, 34, "Groceries"),
        ("Hardware Store", 56.80, 41, "Home"),
        ("Pharmacy", 18.30, 48, "Health"),
        ("Supermarket", 92.10, 65, "Groceries"),
        ("Cinema", 32.00, 70, "Entertainment"),
    ];

    for (merchant, amount, days_ago, category) in expenses {
        let date = today - Duration::days(days_ago);
        create_transaction(
            &args.user,
            Transaction::build(merchant, amount, date).category(category),
            UtcOffset::UTC,
            &conn,
        )?;
    }

    println!("Seeding reward ledger...");
    put_reward_ledger(
        &args.user,
        &RewardLedger {
            points: 1150,
            badges: vec!["Budget Sniper".to_owned()],
        },
        &conn,
    )?;

    println!("Success!");

    Ok(())
}
