//! Durable document tier of the read model.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use sqlx::PgPool;
use sqlx::types::Json;
use tokio::sync::RwLock;

use crate::Result;
use crate::model::OrderProjection;

/// Durable store holding one projection document per order.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, order_id: OrderId) -> Result<Option<OrderProjection>>;

    /// Inserts or replaces the document for the projection's order.
    async fn save(&self, projection: &OrderProjection) -> Result<()>;

    /// Removes the document. Returns true if one existed.
    async fn delete(&self, order_id: OrderId) -> Result<bool>;
}

/// PostgreSQL document store over the `order_projections` JSONB table.
#[derive(Debug, Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the read-model migrations.
    ///
    /// Other components may migrate the same database, so versions this
    /// migrator does not know are ignored.
    pub async fn run_migrations(&self) -> Result<()> {
        let mut migrator = sqlx::migrate!("../../migrations/read_model");
        migrator.set_ignore_missing(true);
        migrator.run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn find(&self, order_id: OrderId) -> Result<Option<OrderProjection>> {
        let row: Option<(Json<OrderProjection>,)> =
            sqlx::query_as("SELECT document FROM order_projections WHERE order_id = $1")
                .bind(order_id.as_i64())
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(Json(projection),)| projection))
    }

    async fn save(&self, projection: &OrderProjection) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_projections (order_id, document, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (order_id)
            DO UPDATE SET document = EXCLUDED.document, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(projection.order_id.as_i64())
        .bind(Json(projection))
        .bind(projection.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, order_id: OrderId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM order_projections WHERE order_id = $1")
            .bind(order_id.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// In-memory document store for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<RwLock<HashMap<OrderId, OrderProjection>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find(&self, order_id: OrderId) -> Result<Option<OrderProjection>> {
        Ok(self.documents.read().await.get(&order_id).cloned())
    }

    async fn save(&self, projection: &OrderProjection) -> Result<()> {
        self.documents
            .write()
            .await
            .insert(projection.order_id, projection.clone());
        Ok(())
    }

    async fn delete(&self, order_id: OrderId) -> Result<bool> {
        Ok(self.documents.write().await.remove(&order_id).is_some())
    }
}
