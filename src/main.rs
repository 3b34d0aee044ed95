use std::io::{self, BufRead};

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use expiry_tracker::cli::{Cli, Commands, SettingsCommands};
use expiry_tracker::config::AppConfig;
use expiry_tracker::lookup::LookupChain;
use expiry_tracker::scan::Scanner;
use expiry_tracker::types::{HistoryEdit, ScanOutcome};
use expiry_tracker::{barcode, db, reports};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    if let Commands::Parse { code } = &cli.command {
        let parsed = barcode::parse(code);
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        } else {
            println!("GS1:    {}", parsed.is_gs1);
            println!("GTIN:   {}", parsed.gtin);
            println!("Expiry: {} ({})", parsed.expiry_display, parsed.expiry_iso);
            println!("Batch:  {}", parsed.batch);
            println!("Serial: {}", parsed.serial);
        }
        return Ok(());
    }

    let mut config = AppConfig::from_env();
    if let Some(path) = &cli.db {
        config.db_path = path.clone();
    }
    let conn = db::init_db(&config.db_path)?;
    let config = config.with_settings(&conn)?;
    let lookup = LookupChain::http(config.api_enabled, config.lookup_timeout)?;
    let mut scanner = Scanner::new(conn, lookup, config)?;

    match cli.command {
        Commands::Parse { .. } => {}
        Commands::Scan { codes } => {
            if codes.is_empty() {
                for line in io::stdin().lock().lines() {
                    let outcome = scanner.process(&line?)?;
                    print_outcome(outcome.as_ref(), cli.json)?;
                }
            } else {
                for code in codes {
                    let outcome = scanner.process(&code)?;
                    print_outcome(outcome.as_ref(), cli.json)?;
                }
            }
        }
        Commands::Import { file, append } => {
            let text = std::fs::read_to_string(&file)?;
            let count = scanner.import_master(&text, append)?;
            println!(
                "{} {} products",
                if append { "Appended" } else { "Uploaded" },
                count
            );
        }
        Commands::History => {
            let entries = db::get_history(scanner.conn())?;
            if cli.json {
                let rows: Vec<ScanOutcome> = entries
                    .into_iter()
                    .map(|entry| ScanOutcome {
                        status: scanner.status_of(&entry),
                        entry,
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for entry in &entries {
                    println!(
                        "{:>5}  {}  {:<10}  {:<9}  {:<20}  {}",
                        entry.id,
                        entry.gtin,
                        entry.expiry_display,
                        scanner.status_of(entry).as_str(),
                        entry.batch,
                        entry.name
                    );
                }
            }
        }
        Commands::Edit {
            id,
            name,
            qty,
            expiry,
            batch,
        } => {
            let edit = HistoryEdit {
                name,
                qty,
                expiry,
                batch,
            };
            let entry = scanner.edit_entry(id, &edit)?;
            println!("Item {} updated", entry.id);
        }
        Commands::Delete { id } => {
            db::delete_history(scanner.conn(), id)?;
            println!("Item {} deleted", id);
        }
        Commands::ClearHistory => {
            let removed = db::clear_history(scanner.conn())?;
            println!("{} items deleted", removed);
        }
        Commands::ResetMaster => {
            scanner.reset_master()?;
            println!("Master data cleared");
        }
        Commands::Report { out } => {
            let entries = db::get_history(scanner.conn())?;
            let files = reports::export_history(
                &entries,
                scanner.today(),
                scanner.config().expiry_soon_days,
                &out,
            )?;
            println!("{}\n{}", files.csv.display(), files.html.display());
        }
        Commands::Settings { command } => match command {
            SettingsCommands::Get { key } => {
                let value = db::get_setting(scanner.conn(), &key)?;
                println!("{}", value.unwrap_or_default());
            }
            SettingsCommands::Set { key, value } => {
                db::set_setting(scanner.conn(), &key, &value)?;
                println!("{} = {}", key, value);
            }
        },
    }

    Ok(())
}

fn print_outcome(outcome: Option<&ScanOutcome>, json: bool) -> expiry_tracker::Result<()> {
    let Some(outcome) = outcome else {
        return Ok(());
    };
    if json {
        println!("{}", serde_json::to_string(outcome)?);
    } else {
        let entry = &outcome.entry;
        let name = if entry.name.is_empty() {
            "(unknown product)"
        } else {
            entry.name.as_str()
        };
        println!(
            "{}  {}  {}  {}",
            entry.gtin, name, entry.expiry_display, outcome.status
        );
    }
    Ok(())
}
