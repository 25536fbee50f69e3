//! 内存仓储实现
//!
//! 基于 parking_lot 读写锁的进程内存储，用于测试和单机嵌入场景。
//! 条件更新在写锁内完成，与 PostgreSQL 实现保持相同的 CAS 语义。

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{CardStatus, EntryFilter, FrequentCard, LoyaltyEntry};

use super::traits::{CardRepository, LedgerRepository};

/// 内存奖励存储
///
/// 同时实现流水和卡片两个仓储接口；卡片按插入顺序保存，
/// "最近/最早创建"直接由顺序决定。
#[derive(Default)]
pub struct MemoryRewardsStore {
    entries: RwLock<Vec<LoyaltyEntry>>,
    cards: RwLock<Vec<FrequentCard>>,
}

impl MemoryRewardsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前流水条数（测试断言用）
    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }
}

#[async_trait]
impl LedgerRepository for MemoryRewardsStore {
    async fn insert(&self, entry: &LoyaltyEntry) -> Result<()> {
        self.entries.write().push(entry.clone());
        Ok(())
    }

    async fn sum_points(
        &self,
        filter: &EntryFilter,
        expiry_cutoff: Option<NaiveDate>,
    ) -> Result<i64> {
        let sum = self
            .entries
            .read()
            .iter()
            .filter(|e| filter.matches(e))
            .filter(|e| expiry_cutoff.is_none_or(|today| e.expiry_date >= today))
            .map(|e| e.points)
            .sum();
        Ok(sum)
    }

    async fn list(&self, filter: &EntryFilter) -> Result<Vec<LoyaltyEntry>> {
        let mut entries: Vec<LoyaltyEntry> = self
            .entries
            .read()
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.posting_time.cmp(&a.posting_time));
        Ok(entries)
    }
}

#[async_trait]
impl CardRepository for MemoryRewardsStore {
    async fn insert(&self, card: &FrequentCard) -> Result<()> {
        self.cards.write().push(card.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<FrequentCard>> {
        Ok(self.cards.read().iter().find(|c| c.id == id).cloned())
    }

    async fn list_open(
        &self,
        customer_id: &str,
        company_id: Option<String>,
    ) -> Result<Vec<FrequentCard>> {
        let mut cards: Vec<FrequentCard> = self
            .cards
            .read()
            .iter()
            .filter(|c| c.customer_id == customer_id)
            .filter(|c| {
                company_id
                    .as_deref()
                    .is_none_or(|co| c.company_id.as_deref() == Some(co))
            })
            .filter(|c| c.status.is_open())
            .cloned()
            .collect();
        cards.sort_by(|a, b| b.expiry_date.cmp(&a.expiry_date));
        Ok(cards)
    }

    async fn latest_open_for_service(
        &self,
        customer_id: &str,
        service_id: &str,
        today: NaiveDate,
    ) -> Result<Option<FrequentCard>> {
        Ok(self
            .cards
            .read()
            .iter()
            .rev()
            .find(|c| {
                c.customer_id == customer_id && c.service_id == service_id && c.is_open(today)
            })
            .cloned())
    }

    async fn oldest_completed_for_service(
        &self,
        customer_id: &str,
        service_id: &str,
        today: NaiveDate,
    ) -> Result<Option<FrequentCard>> {
        Ok(self
            .cards
            .read()
            .iter()
            .find(|c| {
                c.customer_id == customer_id
                    && c.service_id == service_id
                    && c.status == CardStatus::Completed
                    && !c.is_expired(today)
            })
            .cloned())
    }

    async fn advance_visit(&self, id: Uuid) -> Result<Option<FrequentCard>> {
        let mut cards = self.cards.write();
        let Some(card) = cards
            .iter_mut()
            .find(|c| c.id == id && c.status == CardStatus::Active)
        else {
            return Ok(None);
        };

        card.visits += 1;
        if card.visits >= card.required_visits {
            card.status = CardStatus::Completed;
        }
        Ok(Some(card.clone()))
    }

    async fn redeem_completed(
        &self,
        id: Uuid,
        redeemed_at: DateTime<Utc>,
    ) -> Result<Option<FrequentCard>> {
        let mut cards = self.cards.write();
        let Some(card) = cards
            .iter_mut()
            .find(|c| c.id == id && c.status == CardStatus::Completed)
        else {
            return Ok(None);
        };

        card.status = CardStatus::Redeemed;
        card.redeemed_at = Some(redeemed_at);
        Ok(Some(card.clone()))
    }

    async fn expire_overdue(&self, customer_id: &str, today: NaiveDate) -> Result<u64> {
        let mut flipped = 0;
        for card in self.cards.write().iter_mut() {
            if card.customer_id == customer_id && card.status.is_open() && card.is_expired(today) {
                card.status = CardStatus::Expired;
                flipped += 1;
            }
        }
        Ok(flipped)
    }
}
