use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_ledger;
use crate::error::Result;
use crate::fmt::money;
use crate::importer::parse_amount;
use crate::ledger::{add_transaction, delete_transaction, list_transactions, NewTransaction};
use crate::models::{PaymentMethod, TxnType};

pub fn add(
    description: &str,
    amount: &str,
    txn_type: TxnType,
    category: &str,
    method: PaymentMethod,
    date: Option<&str>,
) -> Result<()> {
    let conn = open_ledger()?;
    let date = match date {
        Some(d) => d.to_string(),
        None => chrono::Local::now().format("%Y-%m-%d").to_string(),
    };
    let new = NewTransaction {
        description: description.to_string(),
        amount: parse_amount(amount),
        txn_type,
        category: category.to_string(),
        payment_method: method,
        date,
    };
    let id = add_transaction(&conn, &new)?;
    println!("Added transaction {id}: {} {}", new.description.trim(), money(new.amount));
    Ok(())
}

pub fn list(search: Option<&str>, limit: Option<usize>) -> Result<()> {
    let conn = open_ledger()?;
    let rows = list_transactions(&conn, search, limit)?;
    if rows.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Description", "Category", "Method", "Amount"]);
    for txn in rows {
        let amount = match txn.txn_type {
            TxnType::Income => money(txn.amount).green(),
            TxnType::Expense => money(-txn.amount).red(),
        };
        table.add_row(vec![
            Cell::new(txn.id),
            Cell::new(txn.date),
            Cell::new(txn.description),
            Cell::new(txn.category),
            Cell::new(txn.payment_method),
            Cell::new(amount),
        ]);
    }
    println!("Transactions\n{table}");
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let conn = open_ledger()?;
    delete_transaction(&conn, id)?;
    println!("Deleted transaction {id}");
    Ok(())
}
