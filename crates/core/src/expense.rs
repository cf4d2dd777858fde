use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::money::Money;

/// Spending categories used across expenses and bank transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpendingCategory {
    BuildingMaterials,
    Tools,
    Fuel,
    Vehicle,
    Insurance,
    OfficeSupplies,
    Software,
    Subcontractors,
    Utilities,
    Travel,
    Meals,
    ProcessingFees,
    Other,
}

impl fmt::Display for SpendingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SpendingCategory::BuildingMaterials => "Building Materials",
            SpendingCategory::Tools => "Tools",
            SpendingCategory::Fuel => "Fuel",
            SpendingCategory::Vehicle => "Vehicle",
            SpendingCategory::Insurance => "Insurance",
            SpendingCategory::OfficeSupplies => "Office Supplies",
            SpendingCategory::Software => "Software",
            SpendingCategory::Subcontractors => "Subcontractors",
            SpendingCategory::Utilities => "Utilities",
            SpendingCategory::Travel => "Travel",
            SpendingCategory::Meals => "Meals",
            SpendingCategory::ProcessingFees => "Processing Fees",
            SpendingCategory::Other => "Other",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown spending category: '{0}'")]
pub struct UnknownCategory(String);

impl FromStr for SpendingCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace([' ', '-', '_'], "").as_str() {
            "buildingmaterials" | "materials" => Ok(SpendingCategory::BuildingMaterials),
            "tools" => Ok(SpendingCategory::Tools),
            "fuel" => Ok(SpendingCategory::Fuel),
            "vehicle" => Ok(SpendingCategory::Vehicle),
            "insurance" => Ok(SpendingCategory::Insurance),
            "officesupplies" | "office" => Ok(SpendingCategory::OfficeSupplies),
            "software" => Ok(SpendingCategory::Software),
            "subcontractors" => Ok(SpendingCategory::Subcontractors),
            "utilities" => Ok(SpendingCategory::Utilities),
            "travel" => Ok(SpendingCategory::Travel),
            "meals" => Ok(SpendingCategory::Meals),
            "processingfees" | "fees" => Ok(SpendingCategory::ProcessingFees),
            "other" => Ok(SpendingCategory::Other),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseLineItem {
    pub id: String,
    pub description: String,
    pub amount: Money,
    pub category: SpendingCategory,
}

impl ExpenseLineItem {
    pub fn new(description: &str, amount: Money, category: SpendingCategory) -> Self {
        ExpenseLineItem {
            id: uuid::Uuid::new_v4().to_string(),
            description: description.to_string(),
            amount,
            category,
        }
    }
}

/// A recorded business expense, created from receipt capture or by hand.
///
/// Invariant: `is_reconciled` implies `bank_transaction_ids` is non-empty
/// and every referenced transaction still exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub vendor: String,
    pub date: NaiveDate,
    pub total: Money,
    pub tax: Money,
    pub line_items: Vec<ExpenseLineItem>,
    pub is_reconciled: bool,
    pub bank_transaction_ids: Vec<String>,
    /// Deferred expenses (payables) are excluded from automatic matching.
    pub is_deferred: bool,
    /// Content hash of the source receipt, used to reject duplicate captures.
    pub receipt_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    pub fn new(vendor: &str, date: NaiveDate, total: Money) -> Self {
        Expense {
            id: uuid::Uuid::new_v4().to_string(),
            vendor: vendor.to_string(),
            date,
            total,
            tax: Money::zero(),
            line_items: Vec::new(),
            is_reconciled: false,
            bank_transaction_ids: Vec::new(),
            is_deferred: false,
            receipt_hash: None,
            created_at: Utc::now(),
        }
    }

    pub fn invariant_holds(&self) -> bool {
        !self.is_reconciled || !self.bank_transaction_ids.is_empty()
    }
}
