//! # Seed Data Generator
//!
//! Populates the database with a demo month for development.
//!
//! ## Usage
//! ```bash
//! # Seed the current month into ./dues_dev.db
//! cargo run -p dues-db --bin seed
//!
//! # Pick month and database
//! cargo run -p dues-db --bin seed -- --db ./dues.db --month 2026-05
//! ```
//!
//! ## Generated Data
//! - 2 FIXED and 3 SINGLE members
//! - Practices every Tuesday, one match, one tournament, one social
//! - Registrations with varied attendance
//! - A few payments: one FIXED settled, SINGLE members partly paid
//!
//! Fees and category come from `DUES_*` variables (see `LedgerConfig`).

use std::env;

use chrono::{Datelike, Utc, Weekday};
use dues_core::{BillingModel, BillingMonth, EventType};
use dues_db::{Database, DbConfig, LedgerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const MEMBERS: &[(&str, BillingModel)] = &[
    ("Aiko Tanaka", BillingModel::Fixed),
    ("Bruno Silva", BillingModel::Fixed),
    ("Chen Wei", BillingModel::Single),
    ("Dana Okafor", BillingModel::Single),
    ("Emil Novak", BillingModel::Single),
];

/// Share of the month's events each member attends, in percent.
const ATTENDANCE_PCT: &[usize] = &[100, 60, 80, 50, 30];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,dues=debug,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut db_path = env::var("DUES_DB_PATH").unwrap_or_else(|_| String::from("./dues_dev.db"));
    let mut month = BillingMonth::of(Utc::now().date_naive());

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--month" | "-m" => {
                if i + 1 < args.len() {
                    month = args[i + 1].parse()?;
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Dues Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (default: $DUES_DB_PATH or ./dues_dev.db)");
                println!("  -m, --month <YYYY-MM> Month to seed (default: current month)");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            other => warn!(argument = other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let config = LedgerConfig::from_env()?;
    info!(db = %db_path, %month, "Seeding dues ledger");

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let roster = db.roster();
    let ledger = db.ledger(&config);

    if !roster.list_active_members().await?.is_empty() {
        println!("Database already has members; skipping seed.");
        println!("Delete the database file to regenerate.");
        return Ok(());
    }

    // Members
    let mut members = Vec::new();
    for (name, model) in MEMBERS {
        members.push(roster.register_member(name, *model).await?);
    }

    // Events: every Tuesday is practice, plus one of each special kind
    let (start, end) = month.date_range();
    let mut events = Vec::new();
    for date in start.iter_days().take_while(|d| *d < end) {
        if date.weekday() == Weekday::Tue {
            events.push(roster.schedule_event("Weekly practice", EventType::Practice, date).await?);
        }
        match date.day() {
            9 => events.push(roster.schedule_event("League match", EventType::Match, date).await?),
            18 => events.push(
                roster
                    .schedule_event("Club tournament", EventType::Tournament, date)
                    .await?,
            ),
            27 => events.push(roster.schedule_event("Team dinner", EventType::Social, date).await?),
            _ => {}
        }
    }

    // Registrations
    for (member, pct) in members.iter().zip(ATTENDANCE_PCT) {
        let attending = (events.len() * pct).div_ceil(100);
        for event in events.iter().take(attending) {
            roster.register_attendance(&member.id, &event.id).await?;
        }
    }

    // Payments
    let key = month.to_string();
    ledger.mark_paid_fixed(&members[0].id, &key).await?;
    ledger.mark_paid_single(&members[2].id, &key, 2).await?;
    ledger.mark_paid_single(&members[3].id, &key, 1).await?;
    ledger.mark_paid_single(&members[3].id, &key, 1).await?;

    println!();
    println!("Dues overview for {}", month);
    println!("{:<16} {:>7} {:>9} {:>9} {:>11}  STATE", "MEMBER", "MODEL", "OWED", "PAID", "OUTSTANDING");
    for s in ledger.month_overview(&key).await? {
        println!(
            "{:<16} {:>7} {:>9} {:>9} {:>11}  {:?}",
            s.display_name,
            s.billing_model.as_str(),
            s.owed,
            s.paid,
            s.outstanding,
            s.state
        );
    }

    let violations = ledger.audit_month(&key).await?;
    println!();
    println!("Audit: {} inconsistencies", violations.len());

    db.close().await;
    Ok(())
}
