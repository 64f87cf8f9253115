use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    EventToken, NewOutboxRecord, OutboxRecord, OutboxStatus, PollOrder, Result,
    store::{OutboxStore, OutboxWriter},
};

const SELECT_NEWEST_FIRST: &str = r#"
    SELECT id, event_token, entity_key, status, payload, registered_at, published_at
    FROM outbox_events
    WHERE status = 'REGISTERED'
    ORDER BY registered_at DESC, id DESC
    LIMIT $1
"#;

const SELECT_OLDEST_FIRST: &str = r#"
    SELECT id, event_token, entity_key, status, payload, registered_at, published_at
    FROM outbox_events
    WHERE status = 'REGISTERED'
    ORDER BY registered_at ASC, id ASC
    LIMIT $1
"#;

/// Inserts through the connection of an open transaction: `appender.append(&mut *tx, ..)`.
#[async_trait]
impl OutboxWriter for PgConnection {
    async fn insert(&mut self, record: NewOutboxRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO outbox_events (event_token, entity_key, status, payload, registered_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.event_token.as_uuid())
        .bind(&record.entity_key)
        .bind(OutboxStatus::Registered.as_str())
        .bind(&record.payload)
        .bind(record.registered_at)
        .execute(&mut *self)
        .await?;

        Ok(())
    }
}

/// PostgreSQL-backed outbox store used by the publisher.
#[derive(Clone)]
pub struct PostgresOutboxStore {
    pool: PgPool,
}

impl PostgresOutboxStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the outbox migrations.
    ///
    /// Migrations applied by other components sharing the database are tolerated.
    pub async fn run_migrations(&self) -> Result<()> {
        let mut migrator = sqlx::migrate!("../../migrations/outbox");
        migrator.set_ignore_missing(true);
        migrator.run(&self.pool).await?;
        Ok(())
    }

    fn row_to_record(row: PgRow) -> Result<OutboxRecord> {
        let status: String = row.try_get("status")?;

        Ok(OutboxRecord {
            id: row.try_get("id")?,
            event_token: EventToken::from_uuid(row.try_get::<Uuid, _>("event_token")?),
            entity_key: row.try_get("entity_key")?,
            status: status.parse()?,
            payload: row.try_get("payload")?,
            registered_at: row.try_get("registered_at")?,
            published_at: row.try_get::<Option<DateTime<Utc>>, _>("published_at")?,
        })
    }
}

#[async_trait]
impl OutboxStore for PostgresOutboxStore {
    async fn fetch_registered(&self, limit: usize, order: PollOrder) -> Result<Vec<OutboxRecord>> {
        let sql = match order {
            PollOrder::NewestFirst => SELECT_NEWEST_FIRST,
            PollOrder::OldestFirst => SELECT_OLDEST_FIRST,
        };

        let rows = sqlx::query(sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn mark_published(&self, id: i64, published_at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_events
            SET status = 'PUBLISHED', published_at = $2
            WHERE id = $1 AND status = 'REGISTERED'
            "#,
        )
        .bind(id)
        .bind(published_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_by_token(&self, token: EventToken) -> Result<Option<OutboxRecord>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, event_token, entity_key, status, payload, registered_at, published_at
            FROM outbox_events
            WHERE event_token = $1
            "#,
        )
        .bind(token.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn count_by_status(&self, status: OutboxStatus) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM outbox_events WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }
}
