use fieldbook_core::{BankTransaction, CategorizationRule, SpendingCategory};

/// First rule (in list order) whose keyword is a case-insensitive
/// substring of `description`. Later rules are not checked once one hits.
pub fn first_match(
    description: &str,
    rules: &[CategorizationRule],
) -> Option<SpendingCategory> {
    let haystack = description.to_lowercase();
    rules
        .iter()
        .find(|rule| haystack.contains(&rule.keyword.to_lowercase()))
        .map(|rule| rule.category)
}

/// Category assignments for every eligible transaction: unreconciled
/// debits with no category yet. Transactions matching no rule are left
/// alone (not an error).
pub fn assign_categories(
    transactions: &[BankTransaction],
    rules: &[CategorizationRule],
) -> Vec<(String, SpendingCategory)> {
    transactions
        .iter()
        .filter(|tx| !tx.is_reconciled && tx.is_debit() && tx.category.is_none())
        .filter_map(|tx| first_match(&tx.description, rules).map(|c| (tx.id.clone(), c)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fieldbook_core::Money;

    fn tx(id: &str, description: &str, cents: i64) -> BankTransaction {
        BankTransaction {
            id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            description: description.to_string(),
            amount: Money::from_cents(cents),
            is_reconciled: false,
            statement_id: None,
            category: None,
        }
    }

    #[test]
    fn earlier_rule_short_circuits_later_ones() {
        let rules = vec![
            CategorizationRule::new("home depot", SpendingCategory::BuildingMaterials),
            CategorizationRule::new("home", SpendingCategory::Travel),
        ];
        assert_eq!(
            first_match("HOME DEPOT #123", &rules),
            Some(SpendingCategory::BuildingMaterials)
        );
        // The broader keyword still applies where the first one misses.
        assert_eq!(
            first_match("HOMEWOOD SUITES", &rules),
            Some(SpendingCategory::Travel)
        );
    }

    #[test]
    fn keyword_match_is_case_insensitive_substring() {
        let rules = vec![CategorizationRule::new("Shell", SpendingCategory::Fuel)];
        assert_eq!(first_match("SHELL OIL 5742", &rules), Some(SpendingCategory::Fuel));
        assert_eq!(first_match("CHEVRON", &rules), None);
    }

    #[test]
    fn only_uncategorized_unreconciled_debits_are_assigned() {
        let rules = vec![CategorizationRule::new("shell", SpendingCategory::Fuel)];

        let mut reconciled = tx("t1", "SHELL OIL", -4500);
        reconciled.is_reconciled = true;
        let credit = tx("t2", "SHELL REFUND", 4500);
        let mut categorized = tx("t3", "SHELL OIL", -4500);
        categorized.category = Some(SpendingCategory::Other);
        let eligible = tx("t4", "SHELL OIL", -4500);

        let assigned = assign_categories(&[reconciled, credit, categorized, eligible], &rules);
        assert_eq!(assigned, vec![("t4".to_string(), SpendingCategory::Fuel)]);
    }

    #[test]
    fn unmatched_transactions_stay_uncategorized() {
        let rules = vec![CategorizationRule::new("home depot", SpendingCategory::BuildingMaterials)];
        assert!(assign_categories(&[tx("t1", "STARBUCKS", -500)], &rules).is_empty());
    }
}
