use fieldbook_core::{
    BankStatement, BankTransaction, CategorizationRule, Expense, ExpenseLineItem, Money,
    SpendingCategory,
};
use fieldbook_import::content_hash;
use fieldbook_storage::{DocumentStore, StoreError, WriteBatch};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::importer::{self, FileOutcome, ImportOutcome, ImportReport, StatementFile};
use crate::{matcher, rules};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("unknown expense: {0}")]
    UnknownExpense(String),
    #[error("unknown bank transaction: {0}")]
    UnknownTransaction(String),
    #[error("unknown bank statement: {0}")]
    UnknownStatement(String),
    #[error("unknown categorization rule: {0}")]
    UnknownRule(String),
    #[error("a receipt with this content hash already exists ({0})")]
    DuplicateReceipt(String),
}

/// Engine tuning knobs, loaded from the app config.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Card processing fee rate charged by the payment processor. When
    /// present, manual payable matching synthesizes a fee expense for the
    /// gap between the invoiced total and the deposited amount.
    pub processing_fee_rate: Option<Decimal>,
}

/// In-memory working set of all reconciliation collections, loaded once at
/// startup and kept authoritative between commits.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    pub expenses: Vec<Expense>,
    pub transactions: Vec<BankTransaction>,
    pub statements: Vec<BankStatement>,
    pub rules: Vec<CategorizationRule>,
}

impl Ledger {
    /// No expense may claim to be reconciled while holding no transaction
    /// links or a link to a transaction that no longer exists.
    pub fn invariant_holds(&self) -> bool {
        self.expenses.iter().all(|e| {
            if !e.is_reconciled {
                return true;
            }
            !e.bank_transaction_ids.is_empty()
                && e.bank_transaction_ids
                    .iter()
                    .all(|id| self.transactions.iter().any(|t| &t.id == id))
        })
    }
}

/// The reconciliation engine: every mutation goes through [`Engine::commit`],
/// which swaps the new state in optimistically, awaits the persistence
/// write, and restores the previous state if the write fails.
pub struct Engine<S> {
    store: S,
    config: EngineConfig,
    ledger: Ledger,
}

impl<S: DocumentStore> Engine<S> {
    pub async fn load(store: S, config: EngineConfig) -> Result<Self, EngineError> {
        let ledger = Ledger {
            expenses: store.get_all().await?,
            transactions: store.get_all().await?,
            statements: store.get_all().await?,
            rules: store.get_all().await?,
        };
        Ok(Engine {
            store,
            config,
            ledger,
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Expenses awaiting manual review: not yet matched to a transaction.
    pub fn unmatched_expenses(&self) -> impl Iterator<Item = &Expense> {
        self.ledger.expenses.iter().filter(|e| !e.is_reconciled)
    }

    /// Debits awaiting manual review: outflows not yet claimed by an expense.
    pub fn unmatched_transactions(&self) -> impl Iterator<Item = &BankTransaction> {
        self.ledger
            .transactions
            .iter()
            .filter(|t| !t.is_reconciled && t.is_debit())
    }

    pub fn statements(&self) -> &[BankStatement] {
        &self.ledger.statements
    }

    pub fn rules(&self) -> &[CategorizationRule] {
        &self.ledger.rules
    }

    /// Apply `next` optimistically, persist `batch`, and roll back to the
    /// pre-operation snapshot if the write fails.
    async fn commit(&mut self, next: Ledger, batch: WriteBatch) -> Result<(), EngineError> {
        let previous = std::mem::replace(&mut self.ledger, next);
        if let Err(e) = self.store.apply(&batch).await {
            tracing::warn!("persistence write failed, rolling back: {e}");
            self.ledger = previous;
            return Err(e.into());
        }
        Ok(())
    }

    // ── Statement import ─────────────────────────────────────────────────

    /// Import a batch of statement files. Files are processed sequentially
    /// and independently: a duplicate or parse failure in one never blocks
    /// the rest. Each successful import triggers an automatic matching pass.
    pub async fn import_statements(&mut self, files: &[StatementFile]) -> ImportReport {
        let mut report = ImportReport::default();

        for file in files {
            let outcome = self.import_one(file).await;
            if matches!(outcome, ImportOutcome::Imported { .. }) {
                match self.reconcile().await {
                    Ok(matched) => report.auto_matched += matched,
                    Err(e) => {
                        tracing::warn!(file = %file.name, "post-import match pass failed: {e}")
                    }
                }
            }
            report.files.push(FileOutcome {
                file_name: file.name.clone(),
                outcome,
            });
        }

        report
    }

    async fn import_one(&mut self, file: &StatementFile) -> ImportOutcome {
        let hash = content_hash(&file.bytes);
        if self.ledger.statements.iter().any(|s| s.file_hash == hash) {
            tracing::info!(file = %file.name, "duplicate statement content, skipping");
            return ImportOutcome::DuplicateSkipped;
        }

        let (header, transactions) = match importer::prepare_statement(file, &hash) {
            Ok(parsed) => parsed,
            Err(e) => return ImportOutcome::Failed(e.to_string()),
        };

        let mut next = self.ledger.clone();
        next.statements.push(header.clone());
        next.transactions.extend(transactions.iter().cloned());

        let batch = WriteBatch {
            statements: vec![header.clone()],
            transactions: transactions.clone(),
            ..Default::default()
        };

        match self.commit(next, batch).await {
            Ok(()) => {
                tracing::info!(
                    file = %file.name,
                    transactions = transactions.len(),
                    "statement imported"
                );
                ImportOutcome::Imported {
                    statement_id: header.id,
                    transactions: transactions.len(),
                }
            }
            Err(e) => ImportOutcome::Failed(e.to_string()),
        }
    }

    // ── Automatic matching ───────────────────────────────────────────────

    /// Run one automatic matching pass and persist the changed records.
    /// Returns the number of matches made; zero is not an error, and
    /// running again with no new data makes no further matches.
    pub async fn reconcile(&mut self) -> Result<usize, EngineError> {
        let pairs = matcher::match_candidates(&self.ledger.expenses, &self.ledger.transactions);
        if pairs.is_empty() {
            return Ok(0);
        }

        let mut next = self.ledger.clone();
        let mut batch = WriteBatch::default();
        for pair in &pairs {
            if let Some(expense) = next.expenses.iter_mut().find(|e| e.id == pair.expense_id) {
                expense.is_reconciled = true;
                expense.bank_transaction_ids = vec![pair.transaction_id.clone()];
                batch.expenses.push(expense.clone());
            }
            if let Some(tx) = next
                .transactions
                .iter_mut()
                .find(|t| t.id == pair.transaction_id)
            {
                tx.is_reconciled = true;
                batch.transactions.push(tx.clone());
            }
        }

        self.commit(next, batch).await?;
        tracing::info!(matched = pairs.len(), "automatic reconciliation pass");
        Ok(pairs.len())
    }

    // ── Expenses ─────────────────────────────────────────────────────────

    /// Insert or update an expense, then run an automatic matching pass.
    /// A new expense whose receipt hash is already on file is rejected.
    pub async fn save_expense(&mut self, expense: Expense) -> Result<usize, EngineError> {
        if let Some(hash) = &expense.receipt_hash {
            let duplicate = self
                .ledger
                .expenses
                .iter()
                .any(|e| e.id != expense.id && e.receipt_hash.as_deref() == Some(hash));
            if duplicate {
                return Err(EngineError::DuplicateReceipt(hash.clone()));
            }
        }

        let mut next = self.ledger.clone();
        match next.expenses.iter_mut().find(|e| e.id == expense.id) {
            Some(slot) => *slot = expense.clone(),
            None => next.expenses.push(expense.clone()),
        }
        let batch = WriteBatch {
            expenses: vec![expense],
            ..Default::default()
        };
        self.commit(next, batch).await?;

        self.reconcile().await
    }

    /// Delete an expense; any transactions it was linked to become
    /// unreconciled in the same commit.
    pub async fn delete_expense(&mut self, expense_id: &str) -> Result<(), EngineError> {
        let Some(expense) = self
            .ledger
            .expenses
            .iter()
            .find(|e| e.id == expense_id)
            .cloned()
        else {
            return Err(EngineError::UnknownExpense(expense_id.to_string()));
        };

        let mut next = self.ledger.clone();
        let mut batch = WriteBatch::default();
        release_transactions(&mut next, &mut batch, &expense.bank_transaction_ids);
        next.expenses.retain(|e| e.id != expense_id);
        batch.deleted_expenses.push(expense_id.to_string());

        self.commit(next, batch).await
    }

    /// Undo a reconciliation without deleting anything: the expense loses
    /// its links and flags, and its transactions become matchable again.
    pub async fn unlink_expense(&mut self, expense_id: &str) -> Result<(), EngineError> {
        if !self.ledger.expenses.iter().any(|e| e.id == expense_id) {
            return Err(EngineError::UnknownExpense(expense_id.to_string()));
        }

        let mut next = self.ledger.clone();
        let mut batch = WriteBatch::default();
        if let Some(expense) = next.expenses.iter_mut().find(|e| e.id == expense_id) {
            let linked = std::mem::take(&mut expense.bank_transaction_ids);
            expense.is_reconciled = false;
            batch.expenses.push(expense.clone());
            release_transactions(&mut next, &mut batch, &linked);
        }

        self.commit(next, batch).await
    }

    // ── Manual payable matching ──────────────────────────────────────────

    /// Link a deferred expense (payable) to the transaction that paid it.
    /// A missing expense or transaction makes this a silent no-op.
    ///
    /// When a processing-fee rate is configured and the invoiced total
    /// exceeds the deposited amount by more than the tolerance, a second,
    /// already-reconciled fee expense is created for the gap so the
    /// discrepancy stays auditable. A deposit larger than the invoice
    /// creates no fee record.
    pub async fn match_payable(
        &mut self,
        transaction_id: &str,
        expense_id: &str,
    ) -> Result<(), EngineError> {
        let Some(tx) = self
            .ledger
            .transactions
            .iter()
            .find(|t| t.id == transaction_id)
            .cloned()
        else {
            tracing::warn!(%transaction_id, "payable match target missing, skipping");
            return Ok(());
        };
        let Some(expense) = self
            .ledger
            .expenses
            .iter()
            .find(|e| e.id == expense_id)
            .cloned()
        else {
            tracing::warn!(%expense_id, "payable match target missing, skipping");
            return Ok(());
        };

        let fee = expense.total - tx.amount.abs();

        let mut next = self.ledger.clone();
        let mut batch = WriteBatch::default();

        if let Some(slot) = next.expenses.iter_mut().find(|e| e.id == expense_id) {
            slot.is_reconciled = true;
            slot.bank_transaction_ids = vec![tx.id.clone()];
            slot.is_deferred = false;
            batch.expenses.push(slot.clone());
        }

        if self.config.processing_fee_rate.is_some() && fee > Money::TOLERANCE {
            let mut fee_expense = Expense::new(&expense.vendor, tx.date, fee);
            fee_expense.line_items = vec![ExpenseLineItem::new(
                "Card processing fee",
                fee,
                SpendingCategory::ProcessingFees,
            )];
            fee_expense.is_reconciled = true;
            fee_expense.bank_transaction_ids = vec![tx.id.clone()];
            next.expenses.push(fee_expense.clone());
            batch.expenses.push(fee_expense);
            tracing::info!(vendor = %expense.vendor, fee = %fee, "processing fee expense created");
        }

        if let Some(slot) = next
            .transactions
            .iter_mut()
            .find(|t| t.id == transaction_id)
        {
            slot.is_reconciled = true;
            batch.transactions.push(slot.clone());
        }

        self.commit(next, batch).await
    }

    // ── Categorization ───────────────────────────────────────────────────

    /// Apply the ordered rule list to every eligible transaction. Returns
    /// the number of transactions categorized.
    pub async fn apply_rules(&mut self) -> Result<usize, EngineError> {
        let assignments = rules::assign_categories(&self.ledger.transactions, &self.ledger.rules);
        if assignments.is_empty() {
            return Ok(0);
        }

        let mut next = self.ledger.clone();
        let mut batch = WriteBatch::default();
        for (transaction_id, category) in &assignments {
            if let Some(tx) = next.transactions.iter_mut().find(|t| &t.id == transaction_id) {
                tx.category = Some(*category);
                batch.transactions.push(tx.clone());
            }
        }

        self.commit(next, batch).await?;
        Ok(assignments.len())
    }

    /// Direct per-transaction override: set or clear the category without
    /// touching reconciliation state.
    pub async fn categorize(
        &mut self,
        transaction_id: &str,
        category: Option<SpendingCategory>,
    ) -> Result<(), EngineError> {
        if !self
            .ledger
            .transactions
            .iter()
            .any(|t| t.id == transaction_id)
        {
            return Err(EngineError::UnknownTransaction(transaction_id.to_string()));
        }

        let mut next = self.ledger.clone();
        let mut batch = WriteBatch::default();
        if let Some(tx) = next
            .transactions
            .iter_mut()
            .find(|t| t.id == transaction_id)
        {
            tx.category = category;
            batch.transactions.push(tx.clone());
        }
        self.commit(next, batch).await
    }

    /// Append a rule to the end of the ordered list.
    pub async fn add_rule(
        &mut self,
        keyword: &str,
        category: SpendingCategory,
    ) -> Result<CategorizationRule, EngineError> {
        let rule = CategorizationRule::new(keyword, category);
        let mut next = self.ledger.clone();
        next.rules.push(rule.clone());
        let batch = WriteBatch {
            rules: vec![rule.clone()],
            ..Default::default()
        };
        self.commit(next, batch).await?;
        Ok(rule)
    }

    pub async fn remove_rule(&mut self, rule_id: &str) -> Result<(), EngineError> {
        if !self.ledger.rules.iter().any(|r| r.id == rule_id) {
            return Err(EngineError::UnknownRule(rule_id.to_string()));
        }
        let mut next = self.ledger.clone();
        next.rules.retain(|r| r.id != rule_id);
        let batch = WriteBatch {
            deleted_rules: vec![rule_id.to_string()],
            ..Default::default()
        };
        self.commit(next, batch).await
    }

    // ── Statement deletion cascades ──────────────────────────────────────

    /// Delete a statement and every transaction it owns. Expenses that
    /// were reconciled against those transactions are unreconciled but
    /// kept.
    pub async fn delete_statement(&mut self, statement_id: &str) -> Result<(), EngineError> {
        if !self.ledger.statements.iter().any(|s| s.id == statement_id) {
            return Err(EngineError::UnknownStatement(statement_id.to_string()));
        }

        let owned: Vec<String> = self
            .ledger
            .transactions
            .iter()
            .filter(|t| t.statement_id.as_deref() == Some(statement_id))
            .map(|t| t.id.clone())
            .collect();

        let mut next = self.ledger.clone();
        let mut batch = WriteBatch::default();

        next.transactions
            .retain(|t| t.statement_id.as_deref() != Some(statement_id));
        next.statements.retain(|s| s.id != statement_id);
        batch.deleted_transactions = owned.clone();
        batch.deleted_statements.push(statement_id.to_string());

        unlink_expenses_referencing(&mut next, &mut batch, |id| owned.contains(id));

        self.commit(next, batch).await?;
        tracing::info!(%statement_id, transactions = owned.len(), "statement deleted");
        Ok(())
    }

    /// Remove every statement and transaction, unreconciling every expense
    /// that referenced them. Expense records themselves are kept.
    pub async fn clear_bank_data(&mut self) -> Result<(), EngineError> {
        let mut next = self.ledger.clone();
        let mut batch = WriteBatch::default();

        batch.deleted_transactions = next.transactions.iter().map(|t| t.id.clone()).collect();
        batch.deleted_statements = next.statements.iter().map(|s| s.id.clone()).collect();
        next.transactions.clear();
        next.statements.clear();

        unlink_expenses_referencing(&mut next, &mut batch, |_| true);

        self.commit(next, batch).await
    }
}

/// Mark the named transactions unreconciled so they can be matched again.
fn release_transactions(next: &mut Ledger, batch: &mut WriteBatch, ids: &[String]) {
    for tx in next
        .transactions
        .iter_mut()
        .filter(|t| ids.contains(&t.id))
    {
        if tx.is_reconciled {
            tx.is_reconciled = false;
            batch.transactions.push(tx.clone());
        }
    }
}

/// Unreconcile every expense holding a link that `gone` matches, clearing
/// all of its transaction links.
fn unlink_expenses_referencing(
    next: &mut Ledger,
    batch: &mut WriteBatch,
    gone: impl Fn(&String) -> bool,
) {
    for expense in next.expenses.iter_mut() {
        if expense.bank_transaction_ids.iter().any(&gone) {
            expense.is_reconciled = false;
            expense.bank_transaction_ids.clear();
            batch.expenses.push(expense.clone());
        }
    }
}
