use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use spendsense_core::ParseState;

mod config;
mod dashboard;
mod ingest_cmd;
mod state;
mod store;

#[derive(Parser, Debug)]
#[command(name = "spendsense", version, about = "Statement ingestion and spending insights")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest statement files: extract text, parse entries, store the results
    Ingest {
        /// Statement files (PDF, image, text, or CSV export)
        files: Vec<PathBuf>,

        /// Bank/account identifier the statements belong to
        #[arg(long)]
        bank: String,

        /// Display name for the statement (single file only)
        #[arg(long)]
        name: Option<String>,

        /// Media type override: pdf, text, csv, or image
        #[arg(long)]
        media_type: Option<String>,

        /// Extraction function URL (overrides config)
        #[arg(long)]
        extractor_url: Option<String>,
    },

    /// Recognize text in a statement image, printing progress
    Ocr {
        image: PathBuf,

        /// Recognition language (default from config)
        #[arg(long)]
        lang: Option<String>,
    },

    /// Show aggregate spending insights over all parsed statements
    Dashboard {
        /// Also list every entry in chronological order
        #[arg(long)]
        transactions: bool,
    },

    /// Inspect stored statements
    Statements {
        #[command(subcommand)]
        command: StatementsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum StatementsCommand {
    /// List stored statement records
    List,

    /// Remove a statement and its parsed entries
    Rm { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Ingest {
            files,
            bank,
            name,
            media_type,
            extractor_url,
        } => {
            ingest_cmd::run_ingest(files, bank, name, media_type, extractor_url).await?;
        }

        Command::Ocr { image, lang } => {
            ingest_cmd::run_ocr(image, lang).await?;
        }

        Command::Dashboard { transactions } => {
            dashboard::run_dashboard(transactions)?;
        }

        Command::Statements { command } => match command {
            StatementsCommand::List => {
                let store = store::StatementStore::load(state::statements_path()?)?;
                if store.statements().is_empty() {
                    println!("No statements stored.");
                }
                for s in store.statements() {
                    let parsed = match &s.parsed {
                        ParseState::Parsed(entries) => format!("{} entries", entries.len()),
                        ParseState::NotRun => "no parsed data".to_string(),
                    };
                    println!(
                        "{}  {}  bank={}  {}  uploaded {}",
                        s.record.id,
                        s.record.name,
                        s.record.bank_id,
                        parsed,
                        s.record.upload_date.format("%Y-%m-%d")
                    );
                }
            }
            StatementsCommand::Rm { id } => {
                let mut store = store::StatementStore::load(state::statements_path()?)?;
                if !store.remove(&id) {
                    bail!("no statement with id {id}");
                }
                store.save()?;
                println!("Removed {id}");
            }
        },
    }

    Ok(())
}
