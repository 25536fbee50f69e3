//! 积分流水 PostgreSQL 仓储

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::error::Result;
use crate::models::{EntryFilter, LoyaltyEntry};

use super::traits::LedgerRepository;

/// 积分流水仓储（PostgreSQL）
///
/// 表 `loyalty_point_entries` 只接受 INSERT，汇总和列表均为纯读。
pub struct PgLedgerRepository {
    pool: PgPool,
}

impl PgLedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerRepository for PgLedgerRepository {
    async fn insert(&self, entry: &LoyaltyEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO loyalty_point_entries
                (id, customer_id, program_id, company_id, points,
                 purchase_amount, posting_time, expiry_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.customer_id)
        .bind(&entry.program_id)
        .bind(&entry.company_id)
        .bind(entry.points)
        .bind(entry.purchase_amount)
        .bind(entry.posting_time)
        .bind(entry.expiry_date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn sum_points(
        &self,
        filter: &EntryFilter,
        expiry_cutoff: Option<NaiveDate>,
    ) -> Result<i64> {
        let sum: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(points)::BIGINT
            FROM loyalty_point_entries
            WHERE customer_id = $1
              AND ($2::TEXT IS NULL OR program_id = $2)
              AND ($3::TEXT IS NULL OR company_id = $3)
              AND ($4::DATE IS NULL OR expiry_date >= $4)
            "#,
        )
        .bind(&filter.customer_id)
        .bind(&filter.program_id)
        .bind(&filter.company_id)
        .bind(expiry_cutoff)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum.unwrap_or(0))
    }

    async fn list(&self, filter: &EntryFilter) -> Result<Vec<LoyaltyEntry>> {
        let entries = sqlx::query_as::<_, LoyaltyEntry>(
            r#"
            SELECT id, customer_id, program_id, company_id, points,
                   purchase_amount, posting_time, expiry_date
            FROM loyalty_point_entries
            WHERE customer_id = $1
              AND ($2::TEXT IS NULL OR program_id = $2)
              AND ($3::TEXT IS NULL OR company_id = $3)
            ORDER BY posting_time DESC
            "#,
        )
        .bind(&filter.customer_id)
        .bind(&filter.program_id)
        .bind(&filter.company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
