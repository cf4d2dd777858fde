use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use fieldbook_core::{Expense, Money, SpendingCategory};
use fieldbook_engine::{Engine, EngineConfig, ImportOutcome, StatementFile};
use fieldbook_storage::SqliteStore;
use std::path::PathBuf;

mod config;

#[derive(Parser, Debug)]
#[command(name = "fieldbook", version, about = "Bank reconciliation for field-service books")]
struct Cli {
    /// Database file (overrides the config file and the default location)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import one or more bank statement CSV files
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Run an automatic matching pass over unreconciled records
    Reconcile,

    /// List imported statements
    Statements,

    /// List unreconciled expenses and unclaimed bank debits
    Unmatched,

    /// Link a deferred expense (payable) to the transaction that paid it
    Pay {
        transaction_id: String,
        expense_id: String,
    },

    /// Set or clear the category of one transaction
    Categorize {
        transaction_id: String,
        category: Option<SpendingCategory>,
        #[arg(long, conflicts_with = "category")]
        clear: bool,
    },

    /// Apply the categorization rule list to uncategorized debits
    ApplyRules,

    /// Manage categorization rules
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },

    /// Manage expenses
    Expense {
        #[command(subcommand)]
        command: ExpenseCommand,
    },

    /// Delete a statement and all transactions it owns
    DeleteStatement { statement_id: String },

    /// Delete all statements and transactions, keeping expenses
    ClearBankData {
        /// Confirm: this cannot be undone
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum RulesCommand {
    /// List rules in evaluation order
    List,
    /// Append a rule (keyword substring, case-insensitive)
    Add {
        keyword: String,
        category: SpendingCategory,
    },
    Remove { rule_id: String },
}

#[derive(Subcommand, Debug)]
enum ExpenseCommand {
    /// Record an expense by hand
    Add {
        vendor: String,
        total: Money,
        /// Expense date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Mark as a payable awaiting manual matching
        #[arg(long)]
        deferred: bool,
    },
    List,
    /// Delete an expense, releasing any linked transactions
    Delete { expense_id: String },
    /// Undo a reconciliation without deleting anything
    Unlink { expense_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let data_dir = config::data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating {}", data_dir.display()))?;
    let config = config::Config::load(&data_dir.join("fieldbook.toml"))?;

    let db_path = cli
        .database
        .or(config.database_path)
        .unwrap_or_else(|| data_dir.join("fieldbook.db"));
    let store = SqliteStore::connect(&db_path)
        .await
        .with_context(|| format!("opening {}", db_path.display()))?;

    let engine_config = EngineConfig {
        processing_fee_rate: config.processing_fee_rate,
    };
    let mut engine = Engine::load(store, engine_config).await?;

    match cli.command {
        Command::Import { files } => import(&mut engine, &files).await?,

        Command::Reconcile => {
            let matched = engine.reconcile().await?;
            println!("Matched {matched} expense(s)");
        }

        Command::Statements => {
            for s in engine.statements() {
                println!(
                    "{}  {}  {} transactions  {}",
                    s.id, s.statement_period, s.transaction_count, s.file_name
                );
            }
        }

        Command::Unmatched => {
            println!("## Unreconciled expenses\n");
            for e in engine.unmatched_expenses() {
                let deferred = if e.is_deferred { "  (payable)" } else { "" };
                println!("{}  {}  {}  {}{deferred}", e.id, e.date, e.total, e.vendor);
            }
            println!("\n## Unclaimed debits\n");
            for t in engine.unmatched_transactions() {
                println!("{}  {}  {}  {}", t.id, t.date, t.amount, t.description);
            }
        }

        Command::Pay {
            transaction_id,
            expense_id,
        } => {
            engine.match_payable(&transaction_id, &expense_id).await?;
            println!("Linked expense {expense_id} to transaction {transaction_id}");
        }

        Command::Categorize {
            transaction_id,
            category,
            clear,
        } => {
            if category.is_none() && !clear {
                bail!("provide a category, or --clear to remove one");
            }
            engine.categorize(&transaction_id, category).await?;
        }

        Command::ApplyRules => {
            let categorized = engine.apply_rules().await?;
            println!("Categorized {categorized} transaction(s)");
        }

        Command::Rules { command } => match command {
            RulesCommand::List => {
                for (i, rule) in engine.rules().iter().enumerate() {
                    println!("{:>3}. {}  \"{}\" -> {}", i + 1, rule.id, rule.keyword, rule.category);
                }
            }
            RulesCommand::Add { keyword, category } => {
                let rule = engine.add_rule(&keyword, category).await?;
                println!("Added rule {}", rule.id);
            }
            RulesCommand::Remove { rule_id } => {
                engine.remove_rule(&rule_id).await?;
            }
        },

        Command::Expense { command } => match command {
            ExpenseCommand::Add {
                vendor,
                total,
                date,
                deferred,
            } => {
                let date = date.unwrap_or_else(|| Utc::now().date_naive());
                let mut expense = Expense::new(&vendor, date, total);
                expense.is_deferred = deferred;
                let id = expense.id.clone();
                let matched = engine.save_expense(expense).await?;
                println!("Recorded expense {id}");
                if matched > 0 {
                    println!("Auto-matched {matched} expense(s)");
                }
            }
            ExpenseCommand::List => {
                for e in &engine.ledger().expenses {
                    let status = if e.is_reconciled {
                        "reconciled"
                    } else if e.is_deferred {
                        "payable"
                    } else {
                        "open"
                    };
                    println!("{}  {}  {}  {}  [{status}]", e.id, e.date, e.total, e.vendor);
                }
            }
            ExpenseCommand::Delete { expense_id } => {
                engine.delete_expense(&expense_id).await?;
            }
            ExpenseCommand::Unlink { expense_id } => {
                engine.unlink_expense(&expense_id).await?;
            }
        },

        Command::DeleteStatement { statement_id } => {
            engine.delete_statement(&statement_id).await?;
            println!("Deleted statement {statement_id}");
        }

        Command::ClearBankData { yes } => {
            if !yes {
                bail!("pass --yes to confirm deleting all bank data");
            }
            engine.clear_bank_data().await?;
            println!("All statements and transactions deleted; expenses kept");
        }
    }

    Ok(())
}

async fn import(engine: &mut Engine<SqliteStore>, files: &[PathBuf]) -> Result<()> {
    let mut uploads = Vec::with_capacity(files.len());
    for path in files {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("statement.csv");
        uploads.push(StatementFile::new(name, bytes));
    }

    let report = engine.import_statements(&uploads).await;
    for file in &report.files {
        match &file.outcome {
            ImportOutcome::Imported { transactions, .. } => {
                println!("{}: imported {transactions} transaction(s)", file.file_name);
            }
            ImportOutcome::DuplicateSkipped => {
                println!("{}: already imported, skipped", file.file_name);
            }
            ImportOutcome::Failed(reason) => {
                println!("{}: failed: {reason}", file.file_name);
            }
        }
    }
    if report.auto_matched > 0 {
        println!("Auto-matched {} expense(s)", report.auto_matched);
    }

    Ok(())
}
