use crate::models::{DeleteResult, Document, DocumentRow, ID_FIELD, InsertResult, UpdateResult};
use async_trait::async_trait;
use serde_json::{Value, json};
use sqlx::{PgPool, types::Json};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// RepoError
///
/// Faults raised by the persistence layer. Not-found is never an error here;
/// lookups return `Option` instead.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Collection
///
/// The five independently addressed collections. Each one is a Postgres table of
/// `(id UUID PRIMARY KEY, doc JSONB)` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Games,
    Reviews,
    Users,
    Orders,
    Payments,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Games,
        Collection::Reviews,
        Collection::Users,
        Collection::Orders,
        Collection::Payments,
    ];

    pub fn table(self) -> &'static str {
        match self {
            Collection::Games => "games",
            Collection::Reviews => "reviews",
            Collection::Users => "users",
            Collection::Orders => "orders",
            Collection::Payments => "payments",
        }
    }
}

/// Repository Trait
///
/// The persistence contract the handlers depend on. Every method is a single
/// logical operation against the store; only `confirm_order_payment` spans two
/// collections, and it must commit both writes or neither.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Catalogue ---
    async fn list_games(&self) -> Result<Vec<Document>, RepoError>;
    async fn get_game(&self, id: Uuid) -> Result<Option<Document>, RepoError>;
    async fn list_reviews(&self) -> Result<Vec<Document>, RepoError>;

    // --- Users ---
    /// Inserts or merges the profile keyed by `email`. Top-level fields of `profile`
    /// overwrite stored ones; `email` always ends up equal to the key.
    async fn upsert_user(&self, email: &str, profile: Document) -> Result<UpdateResult, RepoError>;

    // --- Orders ---
    async fn insert_order(&self, order: Document) -> Result<InsertResult, RepoError>;
    /// Exact, case-sensitive match on the `customer` field.
    async fn find_orders_by_customer(&self, customer: &str) -> Result<Vec<Document>, RepoError>;
    async fn get_order(&self, id: Uuid) -> Result<Option<Document>, RepoError>;
    /// Marks the order paid with `transaction_id` and records `payment`, atomically.
    /// When no order matches `id` nothing is written.
    async fn confirm_order_payment(
        &self,
        id: Uuid,
        transaction_id: &str,
        payment: Document,
    ) -> Result<UpdateResult, RepoError>;
    async fn delete_order(&self, id: Uuid) -> Result<DeleteResult, RepoError>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer held by `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

/// Removes any client-supplied identifier; keys are always generated server-side.
pub fn strip_id(mut doc: Document) -> Document {
    doc.remove(ID_FIELD);
    doc
}

/// PostgresRepository
///
/// `Repository` backed by Postgres JSONB tables.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// ensure_collections
    ///
    /// Creates the collection tables and the unique email index on `users` if they
    /// are missing. Idempotent, called once at startup.
    pub async fn ensure_collections(&self) -> Result<(), RepoError> {
        for collection in Collection::ALL {
            let ddl = format!(
                "CREATE TABLE IF NOT EXISTS {} (id UUID PRIMARY KEY, doc JSONB NOT NULL)",
                collection.table()
            );
            sqlx::query(&ddl).execute(&self.pool).await?;
        }

        sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users ((doc->>'email'))")
            .execute(&self.pool)
            .await?;

        tracing::info!("document collections ready");
        Ok(())
    }

    async fn fetch_all(&self, collection: Collection) -> Result<Vec<Document>, RepoError> {
        let sql = format!("SELECT id, doc FROM {}", collection.table());
        let rows = sqlx::query_as::<_, DocumentRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(DocumentRow::into_document).collect())
    }

    async fn fetch_one(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, RepoError> {
        let sql = format!("SELECT id, doc FROM {} WHERE id = $1", collection.table());
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(DocumentRow::into_document))
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list_games(&self) -> Result<Vec<Document>, RepoError> {
        self.fetch_all(Collection::Games).await
    }

    async fn get_game(&self, id: Uuid) -> Result<Option<Document>, RepoError> {
        self.fetch_one(Collection::Games, id).await
    }

    async fn list_reviews(&self) -> Result<Vec<Document>, RepoError> {
        self.fetch_all(Collection::Reviews).await
    }

    /// upsert_user
    ///
    /// `INSERT ... ON CONFLICT` against the unique `doc->>'email'` index. The
    /// conditional `DO UPDATE ... WHERE` skips no-op merges, so an unchanged profile
    /// returns no row and is reported as matched-but-unmodified.
    async fn upsert_user(&self, email: &str, profile: Document) -> Result<UpdateResult, RepoError> {
        let mut doc = strip_id(profile);
        doc.insert("email".to_string(), Value::String(email.to_string()));

        let candidate_id = Uuid::new_v4();
        let row: Option<(Uuid, bool)> = sqlx::query_as(
            r#"
            INSERT INTO users (id, doc) VALUES ($1, $2)
            ON CONFLICT ((doc->>'email')) DO UPDATE
                SET doc = users.doc || EXCLUDED.doc
                WHERE users.doc IS DISTINCT FROM users.doc || EXCLUDED.doc
            RETURNING id, (xmax = 0) AS inserted
            "#,
        )
        .bind(candidate_id)
        .bind(Json(&doc))
        .fetch_optional(&self.pool)
        .await?;

        let result = match row {
            Some((id, true)) => UpdateResult::upserted(id),
            Some((_, false)) => UpdateResult::matched(true),
            None => UpdateResult::matched(false),
        };
        tracing::debug!(
            upserted = result.upserted_count,
            modified = result.modified_count,
            "user upserted"
        );
        Ok(result)
    }

    async fn insert_order(&self, order: Document) -> Result<InsertResult, RepoError> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO orders (id, doc) VALUES ($1, $2)")
            .bind(id)
            .bind(Json(strip_id(order)))
            .execute(&self.pool)
            .await?;
        tracing::debug!(order_id = %id, "order inserted");
        Ok(InsertResult::new(id))
    }

    async fn find_orders_by_customer(&self, customer: &str) -> Result<Vec<Document>, RepoError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, doc FROM orders WHERE doc->>'customer' = $1",
        )
        .bind(customer)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(DocumentRow::into_document).collect())
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Document>, RepoError> {
        self.fetch_one(Collection::Orders, id).await
    }

    /// confirm_order_payment
    ///
    /// Locks the order row, patches `paid`/`transactionId` and inserts the payment in
    /// one transaction. An absent order rolls back, so no orphan payment is stored.
    async fn confirm_order_payment(
        &self,
        id: Uuid,
        transaction_id: &str,
        payment: Document,
    ) -> Result<UpdateResult, RepoError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(Json<Document>,)> =
            sqlx::query_as("SELECT doc FROM orders WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((Json(current),)) = current else {
            tx.rollback().await?;
            tracing::debug!(order_id = %id, "payment confirmation matched no order");
            return Ok(UpdateResult::unmatched());
        };

        let modified = current.get("paid") != Some(&Value::Bool(true))
            || current.get("transactionId").and_then(Value::as_str) != Some(transaction_id);

        let patch = json!({ "paid": true, "transactionId": transaction_id });
        sqlx::query("UPDATE orders SET doc = doc || $2 WHERE id = $1")
            .bind(id)
            .bind(Json(patch))
            .execute(&mut *tx)
            .await?;

        let payment_id = Uuid::new_v4();
        sqlx::query("INSERT INTO payments (id, doc) VALUES ($1, $2)")
            .bind(payment_id)
            .bind(Json(strip_id(payment)))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(order_id = %id, payment_id = %payment_id, "order marked paid");
        Ok(UpdateResult::matched(modified))
    }

    async fn delete_order(&self, id: Uuid) -> Result<DeleteResult, RepoError> {
        let outcome = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(DeleteResult::new(outcome.rows_affected()))
    }
}
