use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::fmt::money;
use crate::ledger::summary;
use crate::settings::{ledger_db_path, load_settings};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = ledger_db_path();

    let church = if settings.church_name.is_empty() {
        "(not set)"
    } else {
        settings.church_name.as_str()
    };
    println!("Church:     {church}");
    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `church-ledger init` to set up.");
        return Ok(());
    }

    let conn = get_connection(&db_path)?;
    init_db(&conn)?;
    let transactions: i64 = conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))?;
    let imports: i64 = conn.query_row("SELECT count(*) FROM imports", [], |r| r.get(0))?;
    let last_import: Option<String> =
        conn.query_row("SELECT max(import_date) FROM imports", [], |r| r.get(0))?;
    let totals = summary(&conn, None)?;

    println!();
    println!("Transactions:  {transactions}");
    println!("Imports:       {imports}");
    println!("Last import:   {}", last_import.as_deref().unwrap_or("never"));
    println!("Balance:       {}", money(totals.balance));
    Ok(())
}
