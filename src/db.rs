use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const DB_FILE: &str = "ledger.db";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    record_count INTEGER,
    skipped_count INTEGER DEFAULT 0,
    date_range_start TEXT,
    date_range_end TEXT,
    checksum TEXT
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    description TEXT NOT NULL,
    amount REAL NOT NULL CHECK (amount >= 0),
    txn_type TEXT NOT NULL CHECK (txn_type IN ('income', 'expense')),
    category TEXT NOT NULL,
    payment_method TEXT NOT NULL DEFAULT 'Other',
    date TEXT NOT NULL,
    import_id INTEGER,
    source_ref TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
CREATE INDEX IF NOT EXISTS idx_imports_checksum ON imports(checksum);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
