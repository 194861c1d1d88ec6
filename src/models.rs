use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxnType {
    Income,
    Expense,
}

impl TxnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl fmt::Display for TxnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(format!("unknown transaction type '{other}' (expected income or expense)")),
        }
    }
}

/// Closed set of payment methods the ledger tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PaymentMethod {
    Pix,
    Cash,
    Card,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pix => "Pix",
            Self::Cash => "Cash",
            Self::Card => "Card",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pix" => Ok(Self::Pix),
            "cash" => Ok(Self::Cash),
            "card" => Ok(Self::Card),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown payment method '{other}' (expected pix, cash, card or other)")),
        }
    }
}

macro_rules! sql_text_enum {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: String| FromSqlError::Other(e.into()))
            }
        }
    };
}

sql_text_enum!(TxnType);
sql_text_enum!(PaymentMethod);

/// Normalized output of the CSV importer, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedTransaction {
    /// Provisional id, unique within one import batch.
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub date: String,
    pub txn_type: TxnType,
    pub category: String,
    pub payment_method: PaymentMethod,
}

/// A row as stored in the ledger.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub description: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub txn_type: TxnType,
    pub category: String,
    pub payment_method: PaymentMethod,
    pub date: String,
    pub import_id: Option<i64>,
    pub source_ref: Option<String>,
}

/// Why the importer dropped a data row.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    TooFewCells(usize),
    MissingDescription,
    Malformed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewCells(n) => write!(f, "only {n} cell(s), need at least 3"),
            Self::MissingDescription => f.write_str("no description"),
            Self::Malformed(msg) => write!(f, "malformed row: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    /// 1-based line number in the source file.
    pub line: u64,
    pub reason: SkipReason,
}
