use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::db::error::{DbError, DbResult};
use crate::models::{QuotaState, UsageOutcome, UsageRecord, UsageSummary};
use crate::pricing::Cost;

/// Storage for the usage ledger.
#[async_trait]
pub trait UsageRepo: Send + Sync {
    /// Append one record. Records are immutable after insert.
    async fn insert(&self, record: &UsageRecord) -> DbResult<()>;

    /// Number of successful, still-counted operations for `user_id` with
    /// `created_at >= since`. This is the quota-window count: errors and
    /// forgiven records are excluded.
    async fn count_quota_success(&self, user_id: Uuid, since: DateTime<Utc>) -> DbResult<i64>;

    /// Flip successful counted records since `since` to forgiven, so they
    /// stop counting toward quota windows. Returns the number of rows
    /// flipped. History is kept; nothing is deleted.
    async fn forgive_since(&self, user_id: Uuid, since: DateTime<Utc>) -> DbResult<u64>;

    /// Aggregate usage since `since`, optionally scoped to one user.
    /// Counts every attempt regardless of quota state.
    async fn summary(&self, user_id: Option<Uuid>, since: DateTime<Utc>) -> DbResult<UsageSummary>;

    /// Most recent records for one user, newest first.
    async fn list_recent(&self, user_id: Uuid, limit: i64) -> DbResult<Vec<UsageRecord>>;

    /// Delete every record belonging to `user_id`. The one path that
    /// removes ledger rows, reserved for account deletion.
    async fn purge_user(&self, user_id: Uuid) -> DbResult<u64>;
}

pub struct SqliteUsageRepo {
    pool: SqlitePool,
}

impl SqliteUsageRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> DbResult<UsageRecord> {
        let id: String = row.get("id");
        let user_id: String = row.get("user_id");
        let display: String = row.get("cost_display");
        let metadata: String = row.get("metadata");
        let outcome: String = row.get("outcome");
        let quota_state: String = row.get("quota_state");

        Ok(UsageRecord {
            id: Uuid::parse_str(&id).map_err(|e| DbError::Internal(e.to_string()))?,
            user_id: Uuid::parse_str(&user_id).map_err(|e| DbError::Internal(e.to_string()))?,
            provider: row.get("provider"),
            model: row.get("model"),
            feature: row.get("feature"),
            input_tokens: row.get("input_tokens"),
            output_tokens: row.get("output_tokens"),
            total_tokens: row.get("total_tokens"),
            cost: Cost {
                microcents: row.get("cost_microcents"),
                display: display
                    .parse::<Decimal>()
                    .map_err(|e| DbError::Internal(e.to_string()))?,
                currency: row.get("cost_currency"),
            },
            latency_ms: row.get("latency_ms"),
            outcome: UsageOutcome::parse(&outcome),
            error_message: row.get("error_message"),
            quota_state: QuotaState::parse(&quota_state),
            metadata: serde_json::from_str(&metadata)?,
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl UsageRepo for SqliteUsageRepo {
    async fn insert(&self, record: &UsageRecord) -> DbResult<()> {
        let metadata = serde_json::to_string(&record.metadata)?;

        // INSERT OR IGNORE keeps a retried write idempotent on the id.
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO usage_records (
                id, user_id, provider, model, feature,
                input_tokens, output_tokens, total_tokens,
                cost_microcents, cost_display, cost_currency,
                latency_ms, outcome, error_message, quota_state,
                metadata, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.user_id.to_string())
        .bind(&record.provider)
        .bind(&record.model)
        .bind(&record.feature)
        .bind(record.input_tokens)
        .bind(record.output_tokens)
        .bind(record.total_tokens)
        .bind(record.cost.microcents)
        .bind(record.cost.display.to_string())
        .bind(&record.cost.currency)
        .bind(record.latency_ms)
        .bind(record.outcome.as_str())
        .bind(&record.error_message)
        .bind(record.quota_state.as_str())
        .bind(metadata)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_quota_success(&self, user_id: Uuid, since: DateTime<Utc>) -> DbResult<i64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) as count
            FROM usage_records
            WHERE user_id = ?
              AND outcome = 'success'
              AND quota_state = 'counted'
              AND created_at >= ?
            "#,
        )
        .bind(user_id.to_string())
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("count"))
    }

    async fn forgive_since(&self, user_id: Uuid, since: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE usage_records
            SET quota_state = 'forgiven'
            WHERE user_id = ?
              AND outcome = 'success'
              AND quota_state = 'counted'
              AND created_at >= ?
            "#,
        )
        .bind(user_id.to_string())
        .bind(since)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn summary(&self, user_id: Option<Uuid>, since: DateTime<Utc>) -> DbResult<UsageSummary> {
        let mut sql = String::from(
            r#"
            SELECT
                COUNT(*) as request_count,
                COALESCE(SUM(CASE WHEN outcome = 'success' THEN 1 ELSE 0 END), 0) as success_count,
                COALESCE(SUM(CASE WHEN outcome = 'error' THEN 1 ELSE 0 END), 0) as error_count,
                COALESCE(SUM(input_tokens), 0) as input_tokens,
                COALESCE(SUM(output_tokens), 0) as output_tokens,
                COALESCE(SUM(total_tokens), 0) as total_tokens,
                COALESCE(SUM(cost_microcents), 0) as cost_microcents
            FROM usage_records
            WHERE created_at >= ?
            "#,
        );
        if user_id.is_some() {
            sql.push_str(" AND user_id = ?");
        }

        let mut query = sqlx::query(&sql).bind(since);
        if let Some(user_id) = user_id {
            query = query.bind(user_id.to_string());
        }

        let row = query.fetch_one(&self.pool).await?;

        Ok(UsageSummary {
            request_count: row.get("request_count"),
            success_count: row.get("success_count"),
            error_count: row.get("error_count"),
            input_tokens: row.get("input_tokens"),
            output_tokens: row.get("output_tokens"),
            total_tokens: row.get("total_tokens"),
            cost_microcents: row.get("cost_microcents"),
        })
    }

    async fn list_recent(&self, user_id: Uuid, limit: i64) -> DbResult<Vec<UsageRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM usage_records
            WHERE user_id = ?
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(user_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::record_from_row).collect()
    }

    async fn purge_user(&self, user_id: Uuid) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM usage_records WHERE user_id = ?")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
