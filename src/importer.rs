use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

use chrono::{Local, NaiveDate};
use rand::Rng;
use regex::Regex;
use tracing::{debug, info};

use crate::error::{LedgerError, Result};
use crate::models::{ImportedTransaction, PaymentMethod, SkipReason, SkippedRow, TxnType};

pub const DEFAULT_CATEGORY: &str = "Outros";

const MIN_CELLS: usize = 3;
const ID_LEN: usize = 9;
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const INCOME_MARKERS: &[&str] = &["entrada", "receita", "credito", "crédito", "income"];

// ---------------------------------------------------------------------------
// Dialect
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Semicolon,
}

impl Delimiter {
    /// Semicolon when the header line has one, comma otherwise.
    pub fn detect(first_line: &str) -> Self {
        if first_line.contains(';') {
            Self::Semicolon
        } else {
            Self::Comma
        }
    }

    fn as_byte(self) -> u8 {
        match self {
            Self::Comma => b',',
            Self::Semicolon => b';',
        }
    }
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Description,
    Amount,
    Date,
    Category,
    Type,
    PaymentMethod,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Description,
        Field::Amount,
        Field::Date,
        Field::Category,
        Field::Type,
        Field::PaymentMethod,
    ];

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Description => &["desc", "historico"],
            Self::Amount => &["valor", "amount", "quantia"],
            Self::Date => &["data", "date"],
            Self::Category => &["cat", "class"],
            Self::Type => &["tipo", "type"],
            Self::PaymentMethod => &["forma", "pagamento", "method"],
        }
    }
}

/// Header-derived lookup from logical field to column index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    description: Option<usize>,
    amount: Option<usize>,
    date: Option<usize>,
    category: Option<usize>,
    txn_type: Option<usize>,
    payment_method: Option<usize>,
}

impl ColumnMap {
    /// Each field takes the first header cell containing one of its keywords.
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| clean_cell(h.as_ref()).to_lowercase())
            .collect();
        let mut map = Self::default();
        for field in Field::ALL {
            *map.slot_mut(field) = cells
                .iter()
                .position(|cell| field.keywords().iter().any(|k| cell.contains(k)));
        }
        map
    }

    pub fn get(&self, field: Field) -> Option<usize> {
        match field {
            Field::Description => self.description,
            Field::Amount => self.amount,
            Field::Date => self.date,
            Field::Category => self.category,
            Field::Type => self.txn_type,
            Field::PaymentMethod => self.payment_method,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<usize> {
        match field {
            Field::Description => &mut self.description,
            Field::Amount => &mut self.amount,
            Field::Date => &mut self.date,
            Field::Category => &mut self.category,
            Field::Type => &mut self.txn_type,
            Field::PaymentMethod => &mut self.payment_method,
        }
    }

    /// The row's cell for `field`, if the field is mapped and the row is long enough.
    fn cell<'r>(&self, row: &'r RawRow, field: Field) -> Option<&'r str> {
        self.get(field)
            .and_then(|idx| row.cells.get(idx))
            .map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Row production
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub line: u64,
    pub cells: Vec<String>,
}

/// Lazy sequence of split, trimmed and unquoted lines. Blank lines are not yielded.
///
/// Each line is split on its own, so a broken line never swallows the ones after it.
pub struct RawRows<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    delimiter: Delimiter,
}

impl<'a> RawRows<'a> {
    pub fn new(text: &'a str, delimiter: Delimiter) -> Self {
        Self {
            lines: text.lines().enumerate(),
            delimiter,
        }
    }
}

impl Iterator for RawRows<'_> {
    type Item = std::result::Result<RawRow, SkippedRow>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (idx, text) = self.lines.next()?;
            if text.trim().is_empty() {
                continue;
            }
            let line = idx as u64 + 1;
            match split_line(text, self.delimiter) {
                Ok(cells) if cells.iter().all(|c| c.is_empty()) => continue,
                Ok(cells) => return Some(Ok(RawRow { line, cells })),
                Err(msg) => {
                    return Some(Err(SkippedRow {
                        line,
                        reason: SkipReason::Malformed(msg),
                    }))
                }
            }
        }
    }
}

/// Split one line, honouring quoted cells. An unclosed quote is an error.
fn split_line(text: &str, delimiter: Delimiter) -> std::result::Result<Vec<String>, String> {
    if text.matches('"').count() % 2 == 1 {
        return Err("unbalanced quote".to_string());
    }
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter.as_byte())
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    match reader.records().next() {
        Some(Ok(record)) => Ok(record.iter().map(|c| clean_cell(c).to_string()).collect()),
        Some(Err(e)) => Err(e.to_string()),
        None => Ok(Vec::new()),
    }
}

fn clean_cell(raw: &str) -> &str {
    let s = raw.trim();
    let s = s.strip_prefix('"').unwrap_or(s);
    let s = s.strip_suffix('"').unwrap_or(s);
    s.trim()
}

// ---------------------------------------------------------------------------
// Field normalization
// ---------------------------------------------------------------------------

fn amount_noise() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^0-9,.\-]").expect("amount pattern is valid"))
}

/// Reduce an amount cell to a plain decimal string (`1.234,56` -> `1234.56`).
pub fn normalize_amount_text(raw: &str) -> String {
    let cleaned = amount_noise().replace_all(raw, "");
    let commas = cleaned.matches(',').count();
    let periods = cleaned.matches('.').count();
    match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(period)) if comma > period => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) if commas == 1 => cleaned.replace(',', "."),
        (Some(_), None) => cleaned.replace(',', ""),
        (None, Some(_)) if periods > 1 => cleaned.replace('.', ""),
        _ => cleaned.into_owned(),
    }
}

/// Non-negative amount; anything unparseable is 0.
pub fn parse_amount(raw: &str) -> f64 {
    normalize_amount_text(raw)
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map_or(0.0, f64::abs)
}

fn parse_dmy(raw: &str) -> Option<NaiveDate> {
    let mut parts = raw.split('/').map(str::trim);
    let (d, m, y) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let day: u32 = d.parse().ok()?;
    let month: u32 = m.parse().ok()?;
    let mut year: i32 = y.parse().ok()?;
    if y.len() <= 2 {
        year += if year < 70 { 2000 } else { 1900 };
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_iso(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    // Timestamps such as 2023-12-25T10:00:00 keep their calendar day.
    let (date, rest) = (raw.get(..10)?, raw.get(10..)?);
    if rest.starts_with('T') || rest.starts_with(' ') {
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
    } else {
        None
    }
}

/// `DD/MM/YYYY` or ISO input to `YYYY-MM-DD`; anything else becomes `today`.
pub fn normalize_date(raw: &str, today: NaiveDate) -> String {
    let raw = raw.trim();
    let parsed = if raw.contains('/') {
        raw.split_whitespace().next().and_then(parse_dmy)
    } else {
        parse_iso(raw)
    };
    parsed.unwrap_or(today).format("%Y-%m-%d").to_string()
}

/// Income only when the type cell says so; no type column means expense.
pub fn detect_type(cell: Option<&str>) -> TxnType {
    let Some(cell) = cell else {
        return TxnType::Expense;
    };
    let lower = cell.to_lowercase();
    if INCOME_MARKERS.iter().any(|m| lower.contains(m)) {
        TxnType::Income
    } else {
        TxnType::Expense
    }
}

pub fn detect_payment_method(cell: Option<&str>) -> PaymentMethod {
    let lower = cell.unwrap_or_default().to_lowercase();
    if lower.contains("pix") {
        PaymentMethod::Pix
    } else if lower.contains("dinheiro") {
        PaymentMethod::Cash
    } else if lower.contains("cart") {
        PaymentMethod::Card
    } else {
        PaymentMethod::Other
    }
}

fn provisional_id(rng: &mut impl Rng, taken: &mut HashSet<String>) -> String {
    loop {
        let id: String = (0..ID_LEN)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();
        if taken.insert(id.clone()) {
            return id;
        }
    }
}

// ---------------------------------------------------------------------------
// Importer
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ImportOutcome {
    pub transactions: Vec<ImportedTransaction>,
    pub count: usize,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Clone)]
pub struct Importer {
    today: NaiveDate,
}

impl Default for Importer {
    fn default() -> Self {
        Self::new()
    }
}

impl Importer {
    pub fn new() -> Self {
        Self::with_today(Local::now().date_naive())
    }

    /// Pin the date used for missing or invalid dates.
    pub fn with_today(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Fails only when the bytes are not UTF-8 text.
    pub fn import_bytes(&self, bytes: &[u8]) -> Result<ImportOutcome> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| LedgerError::Unreadable(format!("not UTF-8 text ({e})")))?;
        Ok(self.import(text))
    }

    pub fn import(&self, contents: &str) -> ImportOutcome {
        let text = contents.strip_prefix('\u{feff}').unwrap_or(contents);
        let header_line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
        let delimiter = Delimiter::detect(header_line);

        let mut rows = RawRows::new(text, delimiter);
        let Some(Ok(header)) = rows.next() else {
            return ImportOutcome::default();
        };
        let columns = ColumnMap::from_headers(header.cells.as_slice());
        debug!(?delimiter, ?columns, "mapped CSV header");

        let mut rng = rand::thread_rng();
        let mut ids = HashSet::new();
        let mut transactions = Vec::new();
        let mut skipped = Vec::new();

        for row in rows {
            let row = match row {
                Ok(row) => row,
                Err(skip) => {
                    debug!(line = skip.line, reason = %skip.reason, "skipped CSV row");
                    skipped.push(skip);
                    continue;
                }
            };
            match self.normalize_row(&columns, &row) {
                Ok(txn) => transactions.push(ImportedTransaction {
                    id: provisional_id(&mut rng, &mut ids),
                    ..txn
                }),
                Err(reason) => {
                    debug!(line = row.line, reason = %reason, "skipped CSV row");
                    skipped.push(SkippedRow {
                        line: row.line,
                        reason,
                    });
                }
            }
        }

        info!(
            recognized = transactions.len(),
            skipped = skipped.len(),
            "parsed CSV import"
        );
        ImportOutcome {
            count: transactions.len(),
            transactions,
            skipped,
        }
    }

    fn normalize_row(
        &self,
        columns: &ColumnMap,
        row: &RawRow,
    ) -> std::result::Result<ImportedTransaction, SkipReason> {
        if row.cells.len() < MIN_CELLS {
            return Err(SkipReason::TooFewCells(row.cells.len()));
        }
        let description = match columns.cell(row, Field::Description) {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => return Err(SkipReason::MissingDescription),
        };

        let amount = parse_amount(columns.cell(row, Field::Amount).unwrap_or("0"));
        let date = match columns.cell(row, Field::Date) {
            Some(raw) => normalize_date(raw, self.today),
            None => self.today.format("%Y-%m-%d").to_string(),
        };
        let category = columns
            .cell(row, Field::Category)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
            .to_string();

        Ok(ImportedTransaction {
            id: String::new(),
            description,
            amount,
            date,
            txn_type: detect_type(columns.cell(row, Field::Type)),
            category,
            payment_method: detect_payment_method(columns.cell(row, Field::PaymentMethod)),
        })
    }
}

/// Read an import file, reporting any failure as an unreadable file.
pub fn read_source(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| LedgerError::Unreadable(format!("{}: {e}", path.display())))
}
