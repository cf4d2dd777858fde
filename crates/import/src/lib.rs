pub mod hash;
pub mod statement;

pub use hash::content_hash;
pub use statement::{ColumnField, ParseError, StatementRow};
