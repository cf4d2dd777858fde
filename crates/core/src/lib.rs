pub mod bank;
pub mod expense;
pub mod money;

pub use bank::{BankStatement, BankTransaction, CategorizationRule};
pub use expense::{Expense, ExpenseLineItem, SpendingCategory};
pub use money::Money;
