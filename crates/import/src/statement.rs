use chrono::NaiveDate;
use fieldbook_core::Money;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Placeholder description for rows whose statement has no description
/// column. Rows carrying it are discarded.
const UNKNOWN_DESCRIPTION: &str = "Unknown";

/// One usable statement row, not yet assigned an id or owning statement.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementRow {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Money,
}

/// Logical fields the header resolver must locate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnField {
    Date,
    Amount,
}

impl fmt::Display for ColumnField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnField::Date => write!(f, "date"),
            ColumnField::Amount => write!(f, "amount"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("no {0} column found in header row")]
    Unresolved(ColumnField),
    #[error("file is empty")]
    Empty,
}

/// Where row amounts come from once the header is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AmountColumns {
    /// Separate debit (negated) and/or credit (as-is) columns.
    Split {
        debit: Option<usize>,
        credit: Option<usize>,
    },
    /// A single signed amount column.
    Single(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnMap {
    date: usize,
    description: Option<usize>,
    amount: AmountColumns,
}

/// First header containing any of `candidates`, checked in candidate order.
fn find_column(headers: &[String], candidates: &[&str]) -> Option<usize> {
    candidates
        .iter()
        .find_map(|needle| headers.iter().position(|h| h.contains(needle)))
}

fn resolve_columns(headers: &[String]) -> Result<ColumnMap, ParseError> {
    let date = find_column(headers, &["date"])
        .ok_or(ParseError::Unresolved(ColumnField::Date))?;
    let description = find_column(headers, &["description", "details"]);

    let debit = find_column(headers, &["debit", "withdrawal"]);
    let credit = find_column(headers, &["credit", "deposit"]);
    let amount = if debit.is_some() || credit.is_some() {
        AmountColumns::Split { debit, credit }
    } else if let Some(col) = find_column(headers, &["amount"]) {
        AmountColumns::Single(col)
    } else {
        return Err(ParseError::Unresolved(ColumnField::Amount));
    };

    Ok(ColumnMap {
        date,
        description,
        amount,
    })
}

/// Most frequent candidate delimiter in the header row; comma by default.
fn sniff_delimiter(header_line: &str) -> u8 {
    [b',', b';', b'\t', b'|']
        .into_iter()
        .max_by_key(|&d| header_line.bytes().filter(|&b| b == d).count())
        .filter(|&d| header_line.bytes().any(|b| b == d))
        .unwrap_or(b',')
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for fmt in &[
        "%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%m-%d-%Y", "%d-%m-%Y",
    ] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    None
}

fn parse_amount(s: &str) -> Option<Money> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let (negative, s) = if s.starts_with('(') && s.ends_with(')') {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };
    let cleaned = s.replace([',', '$', ' '], "");
    let mut dec = Decimal::from_str(&cleaned).ok()?;
    if negative {
        dec = -dec;
    }
    Some(Money::from_decimal(dec))
}

/// Parse raw statement file content into usable rows.
///
/// One header row, then one transaction per line, all fields sharing a
/// single delimiter. Rows whose description is `"Unknown"` or whose amount
/// resolves to zero are discarded; that (plus an unparseable date) is the
/// only row-level validation. Pure and deterministic.
pub fn parse(content: &str) -> Result<Vec<StatementRow>, ParseError> {
    let header_line = content.lines().next().ok_or(ParseError::Empty)?;
    let delimiter = sniff_delimiter(header_line);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    let columns = resolve_columns(&headers)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        let Some(date) = record.get(columns.date).and_then(parse_date) else {
            continue;
        };

        let description = columns
            .description
            .and_then(|col| record.get(col))
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| UNKNOWN_DESCRIPTION.to_string());

        let amount = match &columns.amount {
            AmountColumns::Single(col) => record.get(*col).and_then(parse_amount),
            AmountColumns::Split { debit, credit } => {
                // Some exports fill the unused column with 0.00 instead of
                // leaving it blank; a zero debit means "no debit", not a
                // zero-amount row.
                let debit_amount = debit
                    .and_then(|col| record.get(col))
                    .and_then(parse_amount)
                    .filter(|d| !d.is_zero());
                match debit_amount {
                    Some(d) => Some(-d),
                    None => credit.and_then(|col| record.get(col)).and_then(parse_amount),
                }
            }
        };
        let Some(amount) = amount else { continue };

        if description == UNKNOWN_DESCRIPTION || amount.is_zero() {
            continue;
        }

        rows.push(StatementRow {
            date,
            description,
            amount,
        });
    }

    Ok(rows)
}
