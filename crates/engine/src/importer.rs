use fieldbook_core::{bank::period_label, BankStatement, BankTransaction};
use fieldbook_import::statement;
use thiserror::Error;

/// An uploaded statement file, as handed to the engine by the UI.
#[derive(Debug, Clone)]
pub struct StatementFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl StatementFile {
    pub fn new(name: &str, bytes: Vec<u8>) -> Self {
        StatementFile {
            name: name.to_string(),
            bytes,
        }
    }
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("unsupported statement format: {0}")]
    Parse(#[from] statement::ParseError),
    #[error("statement contains no usable transactions")]
    NoUsableRows,
}

/// Outcome of importing one file from a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported {
        statement_id: String,
        transactions: usize,
    },
    /// Same content hash already imported; not an error.
    DuplicateSkipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub file_name: String,
    pub outcome: ImportOutcome,
}

/// Per-file outcomes plus the automatic matches made along the way.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub files: Vec<FileOutcome>,
    pub auto_matched: usize,
}

impl ImportReport {
    pub fn imported_files(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, ImportOutcome::Imported { .. }))
            .count()
    }
}

/// Parse one uploaded file into a statement header plus its tagged
/// transaction rows. `file_hash` is computed by the caller so the dedup
/// check and the stored header share one hash.
pub fn prepare_statement(
    file: &StatementFile,
    file_hash: &str,
) -> Result<(BankStatement, Vec<BankTransaction>), ImportError> {
    let content = String::from_utf8_lossy(&file.bytes);
    let rows = statement::parse(&content)?;
    if rows.is_empty() {
        return Err(ImportError::NoUsableRows);
    }

    // Rows are guaranteed non-empty here, so min/max always exist.
    let first = rows.iter().map(|r| r.date).min().unwrap_or_default();
    let last = rows.iter().map(|r| r.date).max().unwrap_or_default();

    let header = BankStatement::new(&file.name, file_hash, rows.len(), &period_label(first, last));
    let transactions = rows
        .into_iter()
        .map(|row| BankTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            date: row.date,
            description: row.description,
            amount: row.amount,
            is_reconciled: false,
            statement_id: Some(header.id.clone()),
            category: None,
        })
        .collect();

    Ok((header, transactions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldbook_import::content_hash;

    const SAMPLE: &str = "Date,Description,Amount\n\
        2025-01-03,SHELL OIL 5742,-45.00\n\
        2025-01-28,HOME DEPOT #123,-102.50\n";

    fn file(name: &str, content: &str) -> StatementFile {
        StatementFile::new(name, content.as_bytes().to_vec())
    }

    #[test]
    fn builds_header_and_tagged_transactions() {
        let f = file("january.csv", SAMPLE);
        let hash = content_hash(&f.bytes);
        let (header, transactions) = prepare_statement(&f, &hash).unwrap();

        assert_eq!(header.file_name, "january.csv");
        assert_eq!(header.file_hash, hash);
        assert_eq!(header.transaction_count, 2);
        assert_eq!(header.statement_period, "Jan 03, 2025 – Jan 28, 2025");
        assert_eq!(transactions.len(), 2);
        assert!(transactions
            .iter()
            .all(|t| t.statement_id.as_deref() == Some(header.id.as_str())));
    }

    #[test]
    fn zero_usable_rows_is_a_failure() {
        let f = file("empty.csv", "Date,Description,Amount\n");
        let err = prepare_statement(&f, "hash").unwrap_err();
        assert!(matches!(err, ImportError::NoUsableRows));
    }

    #[test]
    fn unresolvable_header_is_a_failure() {
        let f = file("weird.csv", "foo,bar\n1,2\n");
        let err = prepare_statement(&f, "hash").unwrap_err();
        assert!(matches!(err, ImportError::Parse(_)));
    }
}
