use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::expense::SpendingCategory;
use super::money::Money;

/// One row from an imported bank statement.
///
/// Created only by statement import; deleted only when the owning statement
/// is deleted. The amount is signed: negative means a debit (outflow).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankTransaction {
    pub id: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Money,
    pub is_reconciled: bool,
    pub statement_id: Option<String>,
    pub category: Option<SpendingCategory>,
}

impl BankTransaction {
    pub fn is_debit(&self) -> bool {
        self.amount.is_negative()
    }
}

/// Metadata for one imported statement file. Immutable after import;
/// `file_hash` is the dedup key for repeat uploads of the same content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankStatement {
    pub id: String,
    pub file_name: String,
    pub file_hash: String,
    pub uploaded_at: DateTime<Utc>,
    pub transaction_count: usize,
    pub statement_period: String,
}

impl BankStatement {
    pub fn new(file_name: &str, file_hash: &str, transaction_count: usize, period: &str) -> Self {
        BankStatement {
            id: uuid::Uuid::new_v4().to_string(),
            file_name: file_name.to_string(),
            file_hash: file_hash.to_string(),
            uploaded_at: Utc::now(),
            transaction_count,
            statement_period: period.to_string(),
        }
    }
}

/// Display label for the date span a statement covers.
pub fn period_label(first: NaiveDate, last: NaiveDate) -> String {
    if first == last {
        first.format("%b %d, %Y").to_string()
    } else {
        format!("{} – {}", first.format("%b %d, %Y"), last.format("%b %d, %Y"))
    }
}

/// Keyword-to-category mapping evaluated in list order; the first rule
/// whose keyword is a case-insensitive substring of a transaction's
/// description wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizationRule {
    pub id: String,
    pub keyword: String,
    pub category: SpendingCategory,
}

impl CategorizationRule {
    pub fn new(keyword: &str, category: SpendingCategory) -> Self {
        CategorizationRule {
            id: uuid::Uuid::new_v4().to_string(),
            keyword: keyword.to_string(),
            category,
        }
    }
}
