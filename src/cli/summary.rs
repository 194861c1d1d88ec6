use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_ledger;
use crate::error::Result;
use crate::fmt::money;
use crate::ledger::summary;
use crate::models::TxnType;

pub fn run(year: Option<i32>) -> Result<()> {
    let conn = open_ledger()?;
    let report = summary(&conn, year)?;

    let mut table = Table::new();
    table.set_header(vec!["Category", "Amount"]);

    for (kind, label, total) in [
        (TxnType::Income, "INCOME".green().bold(), report.income),
        (TxnType::Expense, "EXPENSES".red().bold(), report.expense),
    ] {
        let items: Vec<_> = report.by_category.iter().filter(|c| c.txn_type == kind).collect();
        if items.is_empty() {
            continue;
        }
        table.add_row(vec![Cell::new(label), Cell::new("")]);
        for item in items {
            table.add_row(vec![
                Cell::new(format!("  {}", item.category)),
                Cell::new(money(item.total)),
            ]);
        }
        table.add_row(vec![
            Cell::new(format!("Total {}", kind.as_str()).bold()),
            Cell::new(money(total)),
        ]);
        table.add_row(vec![Cell::new(""), Cell::new("")]);
    }

    let balance_label = if report.balance >= 0.0 {
        "BALANCE".green().bold()
    } else {
        "BALANCE".red().bold()
    };
    table.add_row(vec![Cell::new(balance_label), Cell::new(money(report.balance))]);

    match year {
        Some(y) => println!("Summary {y}\n{table}"),
        None => println!("Summary\n{table}"),
    }
    Ok(())
}
