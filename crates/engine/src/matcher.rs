use fieldbook_core::{BankTransaction, Expense};

/// One accepted pairing from an automatic matching pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPair {
    pub expense_id: String,
    pub transaction_id: String,
}

/// Pair unreconciled, non-deferred expenses with unreconciled bank debits
/// by amount.
///
/// Single-pass greedy: each expense takes the FIRST transaction (in list
/// order) whose absolute amount is within [`Money::TOLERANCE`] of the
/// expense total — not the closest one. A transaction is claimed at most
/// once per pass. Pure; the caller applies and persists the pairs.
///
/// [`Money::TOLERANCE`]: fieldbook_core::Money::TOLERANCE
pub fn match_candidates(expenses: &[Expense], transactions: &[BankTransaction]) -> Vec<MatchPair> {
    let mut claimed = vec![false; transactions.len()];
    let mut pairs = Vec::new();

    for expense in expenses.iter().filter(|e| !e.is_reconciled && !e.is_deferred) {
        for (idx, tx) in transactions.iter().enumerate() {
            if claimed[idx] || tx.is_reconciled || !tx.is_debit() {
                continue;
            }
            if tx.amount.abs().within_tolerance(expense.total) {
                claimed[idx] = true;
                pairs.push(MatchPair {
                    expense_id: expense.id.clone(),
                    transaction_id: tx.id.clone(),
                });
                break;
            }
        }
    }

    pairs
}
