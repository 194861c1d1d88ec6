pub mod backup;
pub mod import;
pub mod init;
pub mod status;
pub mod summary;
pub mod transactions;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::models::{PaymentMethod, TxnType};
use crate::settings::{get_data_dir, ledger_db_path};

/// Open the configured ledger, creating the data dir and schema on first use.
pub(crate) fn open_ledger() -> Result<Connection> {
    std::fs::create_dir_all(get_data_dir())?;
    let conn = get_connection(&ledger_db_path())?;
    init_db(&conn)?;
    Ok(conn)
}

#[derive(Parser)]
#[command(
    name = "church-ledger",
    about = "Tithe and offering ledger with bank CSV import."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the ledger database.
    Init {
        /// Path for ledger data (default: ~/Documents/church-ledger)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Church name shown in status and backups
        #[arg(long)]
        church: Option<String>,
    },
    /// Import transactions from a comma or semicolon separated file.
    Import {
        /// Path to the CSV file
        file: String,
        /// Append without asking for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
        /// Only show what would be imported
        #[arg(long = "dry-run")]
        dry_run: bool,
        /// Import even if this exact file was imported before
        #[arg(long)]
        force: bool,
    },
    /// Record a transaction by hand.
    Add {
        /// Description, e.g. 'Dízimo - Maria'
        description: String,
        /// Amount, e.g. 450,00 or 450.00
        amount: String,
        /// income or expense
        #[arg(long = "type", default_value = "income")]
        txn_type: TxnType,
        /// Category name
        #[arg(long, default_value = "Dízimos")]
        category: String,
        /// Payment method: pix, cash, card, other
        #[arg(long, default_value = "pix")]
        method: PaymentMethod,
        /// Date: YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// List ledger transactions, newest first.
    List {
        /// Filter by description or category
        #[arg(long)]
        search: Option<String>,
        /// Maximum number of rows
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete a transaction by ID.
    Delete {
        /// Transaction ID (shown in `church-ledger list`)
        id: i64,
    },
    /// Income, expenses and balance.
    Summary {
        /// Year filter: YYYY
        #[arg(long)]
        year: Option<i32>,
    },
    /// Write a JSON backup of the ledger.
    Backup {
        /// Output path (default: <data_dir>/backups/backup_YYYY-MM-DD.json)
        #[arg(long)]
        output: Option<String>,
    },
    /// Show current settings and ledger statistics.
    Status,
}
