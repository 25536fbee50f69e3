//! 常客卡 PostgreSQL 仓储
//!
//! 状态推进（到店计数、核销、过期翻转）全部采用条件 UPDATE 实现 CAS，
//! 竞争失败表现为 0 行命中而非部分写入。

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::error::Result;
use crate::models::FrequentCard;

use super::traits::CardRepository;
use uuid::Uuid;

/// 常客卡仓储（PostgreSQL）
pub struct PgCardRepository {
    pool: PgPool,
}

impl PgCardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CARD_COLUMNS: &str = "id, customer_id, service_id, company_id, visits, required_visits, \
     issue_date, expiry_date, status, redeemed_at, created_at";

#[async_trait]
impl CardRepository for PgCardRepository {
    async fn insert(&self, card: &FrequentCard) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO frequent_cards
                (id, customer_id, service_id, company_id, visits, required_visits,
                 issue_date, expiry_date, status, redeemed_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(card.id)
        .bind(&card.customer_id)
        .bind(&card.service_id)
        .bind(&card.company_id)
        .bind(card.visits)
        .bind(card.required_visits)
        .bind(card.issue_date)
        .bind(card.expiry_date)
        .bind(card.status)
        .bind(card.redeemed_at)
        .bind(card.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<FrequentCard>> {
        let card = sqlx::query_as::<_, FrequentCard>(&format!(
            "SELECT {CARD_COLUMNS} FROM frequent_cards WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    async fn list_open(
        &self,
        customer_id: &str,
        company_id: Option<String>,
    ) -> Result<Vec<FrequentCard>> {
        let cards = sqlx::query_as::<_, FrequentCard>(&format!(
            r#"
            SELECT {CARD_COLUMNS}
            FROM frequent_cards
            WHERE customer_id = $1
              AND ($2::TEXT IS NULL OR company_id = $2)
              AND status IN ('active', 'completed')
            ORDER BY expiry_date DESC
            "#
        ))
        .bind(customer_id)
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(cards)
    }

    async fn latest_open_for_service(
        &self,
        customer_id: &str,
        service_id: &str,
        today: NaiveDate,
    ) -> Result<Option<FrequentCard>> {
        let card = sqlx::query_as::<_, FrequentCard>(&format!(
            r#"
            SELECT {CARD_COLUMNS}
            FROM frequent_cards
            WHERE customer_id = $1
              AND service_id = $2
              AND status IN ('active', 'completed')
              AND expiry_date >= $3
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(customer_id)
        .bind(service_id)
        .bind(today)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    async fn oldest_completed_for_service(
        &self,
        customer_id: &str,
        service_id: &str,
        today: NaiveDate,
    ) -> Result<Option<FrequentCard>> {
        let card = sqlx::query_as::<_, FrequentCard>(&format!(
            r#"
            SELECT {CARD_COLUMNS}
            FROM frequent_cards
            WHERE customer_id = $1
              AND service_id = $2
              AND status = 'completed'
              AND expiry_date >= $3
            ORDER BY created_at ASC
            LIMIT 1
            "#
        ))
        .bind(customer_id)
        .bind(service_id)
        .bind(today)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    async fn advance_visit(&self, id: Uuid) -> Result<Option<FrequentCard>> {
        // 单条 UPDATE 内完成计数与集满翻转，避免读改写竞争
        let card = sqlx::query_as::<_, FrequentCard>(&format!(
            r#"
            UPDATE frequent_cards
            SET visits = visits + 1,
                status = CASE
                    WHEN visits + 1 >= required_visits THEN 'completed'
                    ELSE status
                END
            WHERE id = $1 AND status = 'active'
            RETURNING {CARD_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    async fn redeem_completed(
        &self,
        id: Uuid,
        redeemed_at: DateTime<Utc>,
    ) -> Result<Option<FrequentCard>> {
        // CAS：仅状态仍为 completed 的调用方能赢得这次 UPDATE
        let card = sqlx::query_as::<_, FrequentCard>(&format!(
            r#"
            UPDATE frequent_cards
            SET status = 'redeemed', redeemed_at = $2
            WHERE id = $1 AND status = 'completed'
            RETURNING {CARD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(redeemed_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    async fn expire_overdue(&self, customer_id: &str, today: NaiveDate) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE frequent_cards
            SET status = 'expired'
            WHERE customer_id = $1
              AND status IN ('active', 'completed')
              AND expiry_date < $2
            "#,
        )
        .bind(customer_id)
        .bind(today)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
