use fieldbook_core::{BankStatement, BankTransaction, CategorizationRule, Expense};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A persisted record type bound to its named collection.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
}

impl Document for Expense {
    const COLLECTION: &'static str = "expenses";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Document for BankTransaction {
    const COLLECTION: &'static str = "bank_transactions";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Document for BankStatement {
    const COLLECTION: &'static str = "bank_statements";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Document for CategorizationRule {
    const COLLECTION: &'static str = "categorization_rules";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Upserts and deletions from one logical engine operation, grouped so a
/// backend can apply them as a single write.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    pub expenses: Vec<Expense>,
    pub transactions: Vec<BankTransaction>,
    pub statements: Vec<BankStatement>,
    pub rules: Vec<CategorizationRule>,
    pub deleted_expenses: Vec<String>,
    pub deleted_transactions: Vec<String>,
    pub deleted_statements: Vec<String>,
    pub deleted_rules: Vec<String>,
}

impl WriteBatch {
    pub fn is_empty(&self) -> bool {
        self.expenses.is_empty()
            && self.transactions.is_empty()
            && self.statements.is_empty()
            && self.rules.is_empty()
            && self.deleted_expenses.is_empty()
            && self.deleted_transactions.is_empty()
            && self.deleted_statements.is_empty()
            && self.deleted_rules.is_empty()
    }
}

/// Persistence adapter consumed by the engine. Implementation-agnostic: a
/// local embedded store or a cloud document database both fit.
///
/// `get_all` must return records in insertion order — matching semantics
/// depend on the original order of imported transactions.
#[allow(async_fn_in_trait)]
pub trait DocumentStore: Send + Sync {
    async fn get_all<T: Document>(&self) -> Result<Vec<T>, StoreError>;

    /// Upsert by id.
    async fn save_many<T: Document>(&self, records: &[T]) -> Result<(), StoreError>;

    async fn delete_many<T: Document>(&self, ids: &[String]) -> Result<(), StoreError>;

    /// Apply a whole batch. Best-effort sequential by default; backends
    /// that support it override this with a single atomic write.
    async fn apply(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        self.save_many(&batch.statements).await?;
        self.save_many(&batch.transactions).await?;
        self.save_many(&batch.expenses).await?;
        self.save_many(&batch.rules).await?;
        self.delete_many::<Expense>(&batch.deleted_expenses).await?;
        self.delete_many::<BankTransaction>(&batch.deleted_transactions)
            .await?;
        self.delete_many::<BankStatement>(&batch.deleted_statements)
            .await?;
        self.delete_many::<CategorizationRule>(&batch.deleted_rules)
            .await?;
        Ok(())
    }
}
