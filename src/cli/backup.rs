use std::path::PathBuf;

use crate::cli::open_ledger;
use crate::error::{LedgerError, Result};
use crate::ledger::backup_snapshot;
use crate::settings::{get_data_dir, load_settings};

pub fn run(output: Option<String>) -> Result<()> {
    let conn = open_ledger()?;
    let settings = load_settings();

    let dest_path = match output {
        Some(p) => PathBuf::from(p),
        None => {
            let backups_dir = get_data_dir().join("backups");
            std::fs::create_dir_all(&backups_dir)?;
            let stamp = chrono::Local::now().format("%Y-%m-%d");
            backups_dir.join(format!("backup_{stamp}.json"))
        }
    };

    let snapshot = backup_snapshot(&conn, &settings.church_name)?;
    let json = serde_json::to_string_pretty(&snapshot)
        .map_err(|e| LedgerError::Other(format!("Failed to serialize backup: {e}")))?;
    std::fs::write(&dest_path, format!("{json}\n"))?;

    println!("Backup saved to {}", dest_path.display());
    println!("Transactions: {}", snapshot.transactions.len());
    Ok(())
}
