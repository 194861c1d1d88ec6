use chrono::{Local, NaiveDate};
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{LedgerError, Result};
use crate::models::{ImportedTransaction, PaymentMethod, Transaction, TxnType};

// ---------------------------------------------------------------------------
// Appending imported batches
// ---------------------------------------------------------------------------

pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// The file a batch came from, recorded in the `imports` table.
pub struct ImportSource<'a> {
    pub filename: &'a str,
    pub checksum: &'a str,
    pub skipped: usize,
}

pub struct AppendResult {
    pub appended: usize,
    pub import_id: Option<i64>,
    pub duplicate_file: bool,
}

pub fn is_imported(conn: &Connection, checksum: &str) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT 1 FROM imports WHERE checksum = ?1")?;
    Ok(stmt.exists([checksum])?)
}

/// Append a confirmed batch in one SQL transaction. A source file that was
/// already imported is refused unless `force` is set.
pub fn append_batch(
    conn: &Connection,
    batch: Vec<ImportedTransaction>,
    source: Option<ImportSource<'_>>,
    force: bool,
) -> Result<AppendResult> {
    if let Some(src) = &source {
        if !force && is_imported(conn, src.checksum)? {
            return Ok(AppendResult {
                appended: 0,
                import_id: None,
                duplicate_file: true,
            });
        }
    }

    let tx = conn.unchecked_transaction()?;
    let import_id = match &source {
        Some(src) => {
            let min_date = batch.iter().map(|t| t.date.as_str()).min();
            let max_date = batch.iter().map(|t| t.date.as_str()).max();
            tx.execute(
                "INSERT INTO imports (filename, record_count, skipped_count, date_range_start, date_range_end, checksum) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    src.filename,
                    batch.len() as i64,
                    src.skipped as i64,
                    min_date,
                    max_date,
                    src.checksum,
                ],
            )?;
            Some(tx.last_insert_rowid())
        }
        None => None,
    };

    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO transactions (description, amount, txn_type, category, payment_method, date, import_id, source_ref) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for txn in &batch {
            stmt.execute(params![
                txn.description,
                txn.amount,
                txn.txn_type,
                txn.category,
                txn.payment_method,
                txn.date,
                import_id,
                txn.id,
            ])?;
        }
    }
    tx.commit()?;

    info!(appended = batch.len(), ?import_id, "appended batch to ledger");
    Ok(AppendResult {
        appended: batch.len(),
        import_id,
        duplicate_file: false,
    })
}

// ---------------------------------------------------------------------------
// Manual entry
// ---------------------------------------------------------------------------

pub struct NewTransaction {
    pub description: String,
    pub amount: f64,
    pub txn_type: TxnType,
    pub category: String,
    pub payment_method: PaymentMethod,
    pub date: String,
}

pub fn add_transaction(conn: &Connection, new: &NewTransaction) -> Result<i64> {
    let description = new.description.trim();
    if description.is_empty() {
        return Err(LedgerError::InvalidTransaction("description is required".to_string()));
    }
    if !new.amount.is_finite() || new.amount <= 0.0 {
        return Err(LedgerError::InvalidTransaction(
            "amount must be greater than zero".to_string(),
        ));
    }
    NaiveDate::parse_from_str(&new.date, "%Y-%m-%d").map_err(|_| {
        LedgerError::InvalidTransaction(format!("date must be YYYY-MM-DD, got '{}'", new.date))
    })?;
    let category = match new.category.trim() {
        "" => crate::importer::DEFAULT_CATEGORY,
        c => c,
    };

    conn.execute(
        "INSERT INTO transactions (description, amount, txn_type, category, payment_method, date) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            description,
            new.amount,
            new.txn_type,
            category,
            new.payment_method,
            new.date,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn delete_transaction(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn.execute("DELETE FROM transactions WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(LedgerError::UnknownTransaction(id));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        description: row.get(1)?,
        amount: row.get(2)?,
        txn_type: row.get(3)?,
        category: row.get(4)?,
        payment_method: row.get(5)?,
        date: row.get(6)?,
        import_id: row.get(7)?,
        source_ref: row.get(8)?,
    })
}

/// Newest first. `search` matches description or category, ignoring case.
pub fn list_transactions(
    conn: &Connection,
    search: Option<&str>,
    limit: Option<usize>,
) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, description, amount, txn_type, category, payment_method, date, import_id, source_ref \
         FROM transactions ORDER BY date DESC, id DESC",
    )?;
    let rows = stmt
        .query_map([], row_to_transaction)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let needle = search.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());
    let matching = rows.into_iter().filter(|t| match &needle {
        Some(n) => t.description.to_lowercase().contains(n) || t.category.to_lowercase().contains(n),
        None => true,
    });
    Ok(match limit {
        Some(n) => matching.take(n).collect(),
        None => matching.collect(),
    })
}

pub struct CategoryTotal {
    pub txn_type: TxnType,
    pub category: String,
    pub total: f64,
}

pub struct LedgerSummary {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
    pub by_category: Vec<CategoryTotal>,
}

pub fn summary(conn: &Connection, year: Option<i32>) -> Result<LedgerSummary> {
    let year_prefix = year.map(|y| format!("{y:04}-%"));
    let mut stmt = conn.prepare(
        "SELECT txn_type, category, SUM(amount) AS total FROM transactions \
         WHERE (?1 IS NULL OR date LIKE ?1) \
         GROUP BY txn_type, category \
         ORDER BY txn_type DESC, total DESC",
    )?;
    let by_category = stmt
        .query_map([year_prefix], |row| {
            Ok(CategoryTotal {
                txn_type: row.get(0)?,
                category: row.get(1)?,
                total: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let total_of = |kind: TxnType| -> f64 {
        by_category
            .iter()
            .filter(|c| c.txn_type == kind)
            .map(|c| c.total)
            .sum()
    };
    let income = total_of(TxnType::Income);
    let expense = total_of(TxnType::Expense);

    Ok(LedgerSummary {
        income,
        expense,
        balance: income - expense,
        by_category,
    })
}

// ---------------------------------------------------------------------------
// Backup
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    pub church: String,
    pub generated_at: String,
    pub transactions: Vec<Transaction>,
}

pub fn backup_snapshot(conn: &Connection, church: &str) -> Result<BackupSnapshot> {
    Ok(BackupSnapshot {
        church: church.to_string(),
        generated_at: Local::now().to_rfc3339(),
        transactions: list_transactions(conn, None, None)?,
    })
}
