//! 奖励门面服务
//!
//! 对外暴露完整的操作集合，负责参数校验与路由；
//! 自身不持有任何业务状态，全部状态在账本与卡片引擎之下。
//!
//! 调用约定（结账工作流）：账本失败应阻断结账，
//! 到店记录失败按尽力而为处理，由调用方决定是否忽略。

use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use rewards_shared::config::RewardsConfig;
use rewards_shared::database::Database;

use crate::error::{Result, RewardsError};
use crate::lock::ScopeLock;
use crate::models::{FrequentCard, LoyaltyEntry};
use crate::registry::ProgramRegistry;
use crate::repository::{MemoryRewardsStore, PgCardRepository, PgLedgerRepository};
use crate::service::card_service::{CardPolicy, FrequentCardEngine};
use crate::service::dto::{AutoApplyCheck, CustomerSummary, EntryReceipt, VisitOutcome};
use crate::service::ledger_service::{LedgerPolicy, LoyaltyLedger};

/// 奖励门面服务
pub struct RewardsService {
    ledger: LoyaltyLedger,
    cards: FrequentCardEngine,
}

impl RewardsService {
    pub fn new(ledger: LoyaltyLedger, cards: FrequentCardEngine) -> Self {
        Self { ledger, cards }
    }

    /// 组装 PostgreSQL 后端的门面
    pub fn with_postgres(
        db: &Database,
        registry: Arc<dyn ProgramRegistry>,
        config: &RewardsConfig,
    ) -> Self {
        let lock = Arc::new(ScopeLock::new());
        let ledger = LoyaltyLedger::new(
            Arc::new(PgLedgerRepository::new(db.pool().clone())),
            registry,
            lock.clone(),
            LedgerPolicy::from(config),
        );
        let cards = FrequentCardEngine::new(
            Arc::new(PgCardRepository::new(db.pool().clone())),
            lock,
            CardPolicy::from(config),
        );
        Self::new(ledger, cards)
    }

    /// 组装内存后端的门面（测试与单机嵌入场景）
    pub fn with_memory_store(
        store: Arc<MemoryRewardsStore>,
        registry: Arc<dyn ProgramRegistry>,
        config: &RewardsConfig,
    ) -> Self {
        let lock = Arc::new(ScopeLock::new());
        let ledger = LoyaltyLedger::new(
            store.clone(),
            registry,
            lock.clone(),
            LedgerPolicy::from(config),
        );
        let cards = FrequentCardEngine::new(store, lock, CardPolicy::from(config));
        Self::new(ledger, cards)
    }

    // ==================== 积分账本 ====================

    /// 查询积分余额（纯读，客户不存在返回 0）
    #[instrument(skip(self))]
    pub async fn get_balance(
        &self,
        customer_id: &str,
        program_id: Option<&str>,
        company_id: Option<&str>,
    ) -> Result<i64> {
        require_id(customer_id, "客户 ID")?;
        self.ledger
            .get_balance(customer_id, program_id, company_id)
            .await
    }

    /// 列出积分流水
    #[instrument(skip(self))]
    pub async fn entries(
        &self,
        customer_id: &str,
        program_id: Option<&str>,
        company_id: Option<&str>,
    ) -> Result<Vec<LoyaltyEntry>> {
        require_id(customer_id, "客户 ID")?;
        self.ledger
            .entries(customer_id, program_id, company_id)
            .await
    }

    /// 累积积分（发票结算调用）
    #[instrument(skip(self))]
    pub async fn earn(
        &self,
        customer_id: &str,
        program_id: Option<&str>,
        company_id: Option<&str>,
        points: i64,
    ) -> Result<EntryReceipt> {
        require_id(customer_id, "客户 ID")?;
        self.ledger
            .earn(customer_id, program_id, company_id, points)
            .await
    }

    /// 兑换积分（发票结算调用，失败应阻断结账）
    #[instrument(skip(self))]
    pub async fn redeem(
        &self,
        customer_id: &str,
        program_id: Option<&str>,
        company_id: Option<&str>,
        points: i64,
    ) -> Result<EntryReceipt> {
        require_id(customer_id, "客户 ID")?;
        self.ledger
            .redeem(customer_id, program_id, company_id, points)
            .await
    }

    // ==================== 常客卡 ====================

    /// 列出客户未关闭的常客卡（附带惰性过期扫描）
    #[instrument(skip(self))]
    pub async fn list_cards(
        &self,
        customer_id: &str,
        company_id: Option<&str>,
    ) -> Result<Vec<FrequentCard>> {
        require_id(customer_id, "客户 ID")?;
        self.cards.list_cards(customer_id, company_id).await
    }

    /// 记录一次到店（服务完成时调用，尽力而为）
    #[instrument(skip(self))]
    pub async fn record_visit(
        &self,
        customer_id: &str,
        service_id: &str,
        company_id: Option<&str>,
    ) -> Result<VisitOutcome> {
        require_id(customer_id, "客户 ID")?;
        require_id(service_id, "服务项目 ID")?;
        self.cards
            .record_visit(customer_id, service_id, company_id)
            .await
    }

    /// 核销免费服务（结账时调用）
    #[instrument(skip(self))]
    pub async fn apply_free_service(
        &self,
        card_id: Uuid,
        customer_id: &str,
        service_id: &str,
    ) -> Result<FrequentCard> {
        require_id(customer_id, "客户 ID")?;
        require_id(service_id, "服务项目 ID")?;
        self.cards
            .apply_free_service(card_id, customer_id, service_id)
            .await
    }

    /// 探测可自动核销的卡片（只读）
    #[instrument(skip(self))]
    pub async fn check_auto_apply(
        &self,
        customer_id: &str,
        service_id: &str,
    ) -> Result<AutoApplyCheck> {
        require_id(customer_id, "客户 ID")?;
        require_id(service_id, "服务项目 ID")?;
        self.cards.check_auto_apply(customer_id, service_id).await
    }

    // ==================== 组合查询 ====================

    /// 结账前的客户奖励概览：全范围余额 + 未关闭卡片
    #[instrument(skip(self))]
    pub async fn customer_summary(&self, customer_id: &str) -> Result<CustomerSummary> {
        require_id(customer_id, "客户 ID")?;

        let balance = self.ledger.get_balance(customer_id, None, None).await?;
        let open_cards = self.cards.list_cards(customer_id, None).await?;

        Ok(CustomerSummary {
            customer_id: customer_id.to_string(),
            balance,
            open_cards,
        })
    }
}

fn require_id(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RewardsError::Validation(format!("{} 不能为空", field)));
    }
    Ok(())
}
