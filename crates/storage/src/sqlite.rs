use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;

use crate::store::{Document, DocumentStore, StoreError, WriteBatch};

pub type DbPool = Pool<Sqlite>;

/// SQLite-backed document store: one `documents` table keyed by
/// (collection, id) with JSON bodies. `rowid` order preserves insertion
/// order because upserts update in place.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub async fn connect(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous = NORMAL").execute(&pool).await?;
        sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

        run_migrations(&pool).await?;

        Ok(SqliteStore { pool })
    }
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            body TEXT NOT NULL,
            PRIMARY KEY (collection, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn save_in_tx<T: Document>(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    records: &[T],
) -> Result<(), StoreError> {
    for record in records {
        let body = serde_json::to_string(record)?;
        sqlx::query(
            "INSERT INTO documents (collection, id, body) VALUES (?, ?, ?) \
             ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body",
        )
        .bind(T::COLLECTION)
        .bind(record.id())
        .bind(body)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn delete_in_tx(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    collection: &str,
    ids: &[String],
) -> Result<(), StoreError> {
    for id in ids {
        sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

impl DocumentStore for SqliteStore {
    async fn get_all<T: Document>(&self) -> Result<Vec<T>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT body FROM documents WHERE collection = ? ORDER BY rowid",
        )
        .bind(T::COLLECTION)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(body,)| serde_json::from_str(&body).map_err(StoreError::from))
            .collect()
    }

    async fn save_many<T: Document>(&self, records: &[T]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        save_in_tx(&mut tx, records).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_many<T: Document>(&self, ids: &[String]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        delete_in_tx(&mut tx, T::COLLECTION, ids).await?;
        tx.commit().await?;
        Ok(())
    }

    /// One SQLite transaction per batch: a cascade either lands whole or
    /// not at all.
    async fn apply(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;

        save_in_tx(&mut tx, &batch.statements).await?;
        save_in_tx(&mut tx, &batch.transactions).await?;
        save_in_tx(&mut tx, &batch.expenses).await?;
        save_in_tx(&mut tx, &batch.rules).await?;

        delete_in_tx(&mut tx, fieldbook_core::Expense::COLLECTION, &batch.deleted_expenses).await?;
        delete_in_tx(
            &mut tx,
            fieldbook_core::BankTransaction::COLLECTION,
            &batch.deleted_transactions,
        )
        .await?;
        delete_in_tx(
            &mut tx,
            fieldbook_core::BankStatement::COLLECTION,
            &batch.deleted_statements,
        )
        .await?;
        delete_in_tx(
            &mut tx,
            fieldbook_core::CategorizationRule::COLLECTION,
            &batch.deleted_rules,
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
