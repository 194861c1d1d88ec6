use std::io::Write;
use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_ledger;
use crate::error::Result;
use crate::fmt::money;
use crate::importer::{read_source, Importer};
use crate::ledger::{append_batch, checksum, is_imported, ImportSource};
use crate::models::{ImportedTransaction, TxnType};

const PREVIEW_ROWS: usize = 20;

pub fn run(file: &str, yes: bool, dry_run: bool, force: bool) -> Result<()> {
    let path = PathBuf::from(file);
    let bytes = read_source(&path)?;
    let digest = checksum(&bytes);

    let conn = open_ledger()?;
    if !force && is_imported(&conn, &digest)? {
        println!("This file has already been imported (duplicate checksum). Use --force to import it again.");
        return Ok(());
    }

    let outcome = Importer::new().import_bytes(&bytes)?;
    let skipped = outcome.skipped.len();

    if skipped > 0 {
        println!("{skipped} row(s) skipped:");
        for skip in &outcome.skipped {
            println!("  line {}: {}", skip.line, skip.reason);
        }
    }

    if outcome.count == 0 {
        println!("No transactions could be recognized in {}.", path.display());
        println!("Check that the file has a header line with recognizable columns (e.g. Descrição, Valor, Data).");
        return Ok(());
    }

    print_preview(&outcome.transactions);
    println!("{} transaction(s) recognized.", outcome.count);

    if dry_run {
        println!("Dry run: nothing was written.");
        return Ok(());
    }
    if !yes && !confirm(&format!("Append {} transaction(s) to the ledger? [y/N] ", outcome.count))? {
        println!("Import cancelled.");
        return Ok(());
    }

    let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let source = ImportSource {
        filename,
        checksum: &digest,
        skipped,
    };
    let result = append_batch(&conn, outcome.transactions, Some(source), force)?;
    println!("{} transaction(s) appended.", result.appended);
    Ok(())
}

fn print_preview(transactions: &[ImportedTransaction]) {
    let mut table = Table::new();
    table.set_header(vec!["Date", "Description", "Type", "Category", "Method", "Amount"]);
    for txn in transactions.iter().take(PREVIEW_ROWS) {
        let kind = match txn.txn_type {
            TxnType::Income => txn.txn_type.as_str().green(),
            TxnType::Expense => txn.txn_type.as_str().red(),
        };
        table.add_row(vec![
            Cell::new(&txn.date),
            Cell::new(&txn.description),
            Cell::new(kind),
            Cell::new(&txn.category),
            Cell::new(txn.payment_method),
            Cell::new(money(txn.amount)),
        ]);
    }
    println!("{table}");
    if transactions.len() > PREVIEW_ROWS {
        println!("... and {} more", transactions.len() - PREVIEW_ROWS);
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(matches!(
        input.trim().to_lowercase().as_str(),
        "y" | "yes" | "s" | "sim"
    ))
}
