//! 积分账本服务
//!
//! 处理积分累积与兑换的核心业务逻辑，包括：
//! - 金额校验（非正数一律拒绝）
//! - 计划参数解析（转换系数、有效期）
//! - 余额校验与流水写入的原子化（同客户范围锁）
//!
//! ## 兑换流程
//!
//! 1. 金额校验 -> 2. 计划解析 -> 3. 取客户范围锁
//!    -> 4. 余额校验 -> 5. 追加负向流水 -> 6. 返回回执

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use rewards_shared::config::RewardsConfig;

use crate::error::{Result, RewardsError};
use crate::lock::ScopeLock;
use crate::models::{EntryFilter, LoyaltyEntry, LoyaltyProgram};
use crate::registry::ProgramRegistry;
use crate::repository::LedgerRepository;
use crate::service::dto::EntryReceipt;

/// 过期积分的余额口径
///
/// 是否剔除过期积分按计划运营口径不同而不同，做成显式策略（默认剔除）。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExpiryPolicy {
    /// 余额只计入未过期流水
    #[default]
    Enforce,
    /// 无条件汇总，包含已过期流水
    IncludeExpired,
}

/// 账本策略参数
#[derive(Debug, Clone)]
pub struct LedgerPolicy {
    pub expiry: ExpiryPolicy,
    /// 计划未配置有效期时的默认积分有效期（天）
    pub default_expiry_days: i64,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            expiry: ExpiryPolicy::Enforce,
            default_expiry_days: 365,
        }
    }
}

impl From<&RewardsConfig> for LedgerPolicy {
    fn from(config: &RewardsConfig) -> Self {
        Self {
            expiry: if config.enforce_points_expiry {
                ExpiryPolicy::Enforce
            } else {
                ExpiryPolicy::IncludeExpired
            },
            default_expiry_days: config.default_expiry_days,
        }
    }
}

/// 积分账本服务
///
/// 账本为 append-only：累积写正向流水，兑换写负向流水，余额为流水之和。
pub struct LoyaltyLedger {
    repo: Arc<dyn LedgerRepository>,
    registry: Arc<dyn ProgramRegistry>,
    lock: Arc<ScopeLock>,
    policy: LedgerPolicy,
}

impl LoyaltyLedger {
    pub fn new(
        repo: Arc<dyn LedgerRepository>,
        registry: Arc<dyn ProgramRegistry>,
        lock: Arc<ScopeLock>,
        policy: LedgerPolicy,
    ) -> Self {
        Self {
            repo,
            registry,
            lock,
            policy,
        }
    }

    /// 查询积分余额
    ///
    /// 纯读操作：客户无流水时返回 0，从不因"不存在"报错。
    #[instrument(skip(self))]
    pub async fn get_balance(
        &self,
        customer_id: &str,
        program_id: Option<&str>,
        company_id: Option<&str>,
    ) -> Result<i64> {
        let filter = self.filter(customer_id, program_id, company_id);
        self.repo.sum_points(&filter, self.expiry_cutoff()).await
    }

    /// 列出范围内的积分流水（按入账时间倒序）
    #[instrument(skip(self))]
    pub async fn entries(
        &self,
        customer_id: &str,
        program_id: Option<&str>,
        company_id: Option<&str>,
    ) -> Result<Vec<LoyaltyEntry>> {
        let filter = self.filter(customer_id, program_id, company_id);
        self.repo.list(&filter).await
    }

    /// 累积积分
    ///
    /// `program_id` 为 None 时按客户归属计划解析。
    /// 失效日期 = 今天 + 计划有效期（计划未配置时取默认 365 天）。
    #[instrument(skip(self), fields(customer_id = %customer_id, points = points))]
    pub async fn earn(
        &self,
        customer_id: &str,
        program_id: Option<&str>,
        company_id: Option<&str>,
        points: i64,
    ) -> Result<EntryReceipt> {
        if points <= 0 {
            return Err(RewardsError::InvalidAmount(points));
        }

        let program = self.resolve_program(customer_id, program_id).await?;
        let today = Utc::now().date_naive();
        let expiry_days = program
            .expiry_duration_days
            .unwrap_or(self.policy.default_expiry_days);

        let entry = LoyaltyEntry {
            id: Uuid::new_v4(),
            customer_id: customer_id.to_string(),
            program_id: program.id.clone(),
            company_id: company_id.map(String::from),
            points,
            purchase_amount: 0.0,
            posting_time: Utc::now(),
            expiry_date: add_days(today, expiry_days),
        };

        // 与同客户的兑换串行化，保证回执余额与账本一致
        let _guard = self.lock.acquire(&ScopeLock::ledger_key(customer_id)).await;

        self.repo.insert(&entry).await?;
        let filter = self.filter(customer_id, Some(&program.id), company_id);
        let balance = self.repo.sum_points(&filter, self.expiry_cutoff()).await?;

        info!(
            customer_id = %customer_id,
            program_id = %program.id,
            points = points,
            balance = balance,
            "积分累积成功"
        );

        Ok(EntryReceipt { entry, balance })
    }

    /// 兑换积分
    ///
    /// 余额校验与流水写入在同一客户范围锁内完成：并发兑换串行执行，
    /// 余额不足的一方收到 `InsufficientPoints` 且不产生任何写入。
    #[instrument(skip(self), fields(customer_id = %customer_id, points = points))]
    pub async fn redeem(
        &self,
        customer_id: &str,
        program_id: Option<&str>,
        company_id: Option<&str>,
        points: i64,
    ) -> Result<EntryReceipt> {
        if points <= 0 {
            return Err(RewardsError::InvalidAmount(points));
        }

        let program = self.resolve_program(customer_id, program_id).await?;
        let filter = self.filter(customer_id, Some(&program.id), company_id);

        let _guard = self.lock.acquire(&ScopeLock::ledger_key(customer_id)).await;

        let available = self.repo.sum_points(&filter, self.expiry_cutoff()).await?;
        if available < points {
            return Err(RewardsError::InsufficientPoints {
                available,
                requested: points,
            });
        }

        let today = Utc::now().date_naive();
        // 负向流水与正向流水同口径取计划有效期：失效日期更短会让
        // 扣减流水先于其抵扣的正向流水出账，被扣积分凭空复活
        let expiry_days = program
            .expiry_duration_days
            .unwrap_or(self.policy.default_expiry_days);
        let entry = LoyaltyEntry {
            id: Uuid::new_v4(),
            customer_id: customer_id.to_string(),
            program_id: program.id.clone(),
            company_id: company_id.map(String::from),
            points: -points,
            purchase_amount: program.redemption_amount(points),
            posting_time: Utc::now(),
            expiry_date: add_days(today, expiry_days),
        };
        self.repo.insert(&entry).await?;

        // 锁内余额精确可推，无需二次汇总
        let balance = available - points;

        info!(
            customer_id = %customer_id,
            program_id = %program.id,
            points = points,
            purchase_amount = entry.purchase_amount,
            balance = balance,
            "积分兑换成功"
        );

        Ok(EntryReceipt { entry, balance })
    }

    // ==================== 私有方法 ====================

    /// 解析客户适用的计划
    async fn resolve_program(
        &self,
        customer_id: &str,
        program_id: Option<&str>,
    ) -> Result<LoyaltyProgram> {
        let pid = match program_id {
            Some(p) => p.to_string(),
            None => self
                .registry
                .customer_program(customer_id)
                .await?
                .ok_or_else(|| RewardsError::NoProgramAssigned(customer_id.to_string()))?,
        };

        self.registry
            .get_program(&pid)
            .await?
            .ok_or(RewardsError::ProgramNotFound(pid))
    }

    fn filter(
        &self,
        customer_id: &str,
        program_id: Option<&str>,
        company_id: Option<&str>,
    ) -> EntryFilter {
        EntryFilter {
            customer_id: customer_id.to_string(),
            program_id: program_id.map(String::from),
            company_id: company_id.map(String::from),
        }
    }

    fn expiry_cutoff(&self) -> Option<NaiveDate> {
        match self.policy.expiry {
            ExpiryPolicy::Enforce => Some(Utc::now().date_naive()),
            ExpiryPolicy::IncludeExpired => None,
        }
    }
}

/// 今天 + n 天；溢出在业务量级内不可达，保底返回原日期
fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    u64::try_from(days)
        .ok()
        .and_then(|d| date.checked_add_days(Days::new(d)))
        .unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MockProgramRegistry;
    use crate::repository::MockLedgerRepository;

    fn ledger(
        repo: MockLedgerRepository,
        registry: MockProgramRegistry,
        policy: LedgerPolicy,
    ) -> LoyaltyLedger {
        LoyaltyLedger::new(
            Arc::new(repo),
            Arc::new(registry),
            Arc::new(ScopeLock::new()),
            policy,
        )
    }

    fn program(factor: f64) -> LoyaltyProgram {
        LoyaltyProgram::new("PROG-A", factor).with_expiry_days(365)
    }

    #[tokio::test]
    async fn test_earn_rejects_non_positive() {
        // 非正数在触达仓储/目录之前就被拒绝
        let svc = ledger(
            MockLedgerRepository::new(),
            MockProgramRegistry::new(),
            LedgerPolicy::default(),
        );

        for bad in [0, -1] {
            let err = svc.earn("CUST-001", Some("PROG-A"), None, bad).await;
            assert!(matches!(err, Err(RewardsError::InvalidAmount(p)) if p == bad));
        }
    }

    #[tokio::test]
    async fn test_earn_creates_positive_entry() {
        let mut repo = MockLedgerRepository::new();
        repo.expect_insert()
            .withf(|e: &LoyaltyEntry| {
                e.points == 50 && e.purchase_amount == 0.0 && e.program_id == "PROG-A"
            })
            .times(1)
            .returning(|_| Ok(()));
        repo.expect_sum_points().returning(|_, _| Ok(50));

        let mut registry = MockProgramRegistry::new();
        registry
            .expect_get_program()
            .returning(|_| Ok(Some(program(1.0))));

        let svc = ledger(repo, registry, LedgerPolicy::default());
        let receipt = svc.earn("CUST-001", Some("PROG-A"), None, 50).await.unwrap();
        assert_eq!(receipt.balance, 50);
        assert_eq!(
            receipt.entry.expiry_date,
            add_days(Utc::now().date_naive(), 365)
        );
    }

    #[tokio::test]
    async fn test_earn_without_program_assignment() {
        let mut registry = MockProgramRegistry::new();
        registry.expect_customer_program().returning(|_| Ok(None));

        let svc = ledger(
            MockLedgerRepository::new(),
            registry,
            LedgerPolicy::default(),
        );
        let err = svc.earn("CUST-001", None, None, 10).await;
        assert!(matches!(err, Err(RewardsError::NoProgramAssigned(_))));
    }

    #[tokio::test]
    async fn test_earn_program_not_found() {
        let mut registry = MockProgramRegistry::new();
        registry.expect_get_program().returning(|_| Ok(None));

        let svc = ledger(
            MockLedgerRepository::new(),
            registry,
            LedgerPolicy::default(),
        );
        let err = svc.earn("CUST-001", Some("PROG-X"), None, 10).await;
        assert!(matches!(err, Err(RewardsError::ProgramNotFound(p)) if p == "PROG-X"));
    }

    #[tokio::test]
    async fn test_redeem_insufficient_writes_nothing() {
        let mut repo = MockLedgerRepository::new();
        // 不设置 expect_insert：若被调用 mock 会 panic
        repo.expect_sum_points().returning(|_, _| Ok(30));

        let mut registry = MockProgramRegistry::new();
        registry
            .expect_get_program()
            .returning(|_| Ok(Some(program(1.0))));

        let svc = ledger(repo, registry, LedgerPolicy::default());
        let err = svc.redeem("CUST-001", Some("PROG-A"), None, 40).await;
        assert!(matches!(
            err,
            Err(RewardsError::InsufficientPoints {
                available: 30,
                requested: 40
            })
        ));
    }

    #[tokio::test]
    async fn test_redeem_applies_conversion_factor() {
        let mut repo = MockLedgerRepository::new();
        repo.expect_sum_points().returning(|_, _| Ok(50));
        repo.expect_insert()
            .withf(|e: &LoyaltyEntry| e.points == -20 && e.purchase_amount == 10.0)
            .times(1)
            .returning(|_| Ok(()));

        let mut registry = MockProgramRegistry::new();
        registry
            .expect_get_program()
            .returning(|_| Ok(Some(program(0.5))));

        let svc = ledger(repo, registry, LedgerPolicy::default());
        let receipt = svc
            .redeem("CUST-001", Some("PROG-A"), None, 20)
            .await
            .unwrap();
        assert_eq!(receipt.balance, 30);
    }

    #[tokio::test]
    async fn test_redeem_entry_expiry_follows_program() {
        // 长有效期计划下，负向流水与正向流水同一天出账，
        // 不会先行过期让已扣积分重新计入余额
        let mut repo = MockLedgerRepository::new();
        repo.expect_sum_points().returning(|_, _| Ok(100));
        repo.expect_insert()
            .withf(|e: &LoyaltyEntry| {
                e.points == -20 && e.expiry_date == add_days(Utc::now().date_naive(), 730)
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut registry = MockProgramRegistry::new();
        registry
            .expect_get_program()
            .returning(|_| Ok(Some(LoyaltyProgram::new("PROG-A", 1.0).with_expiry_days(730))));

        let svc = ledger(repo, registry, LedgerPolicy::default());
        let receipt = svc
            .redeem("CUST-001", Some("PROG-A"), None, 20)
            .await
            .unwrap();
        assert_eq!(
            receipt.entry.expiry_date,
            add_days(Utc::now().date_naive(), 730)
        );
    }

    #[tokio::test]
    async fn test_get_balance_policy_controls_cutoff() {
        let mut repo = MockLedgerRepository::new();
        repo.expect_sum_points()
            .withf(|_, cutoff| cutoff.is_some())
            .returning(|_, _| Ok(1));

        let svc = ledger(
            repo,
            MockProgramRegistry::new(),
            LedgerPolicy {
                expiry: ExpiryPolicy::Enforce,
                default_expiry_days: 365,
            },
        );
        assert_eq!(svc.get_balance("CUST-001", None, None).await.unwrap(), 1);

        let mut repo = MockLedgerRepository::new();
        repo.expect_sum_points()
            .withf(|_, cutoff| cutoff.is_none())
            .returning(|_, _| Ok(2));

        let svc = ledger(
            repo,
            MockProgramRegistry::new(),
            LedgerPolicy {
                expiry: ExpiryPolicy::IncludeExpired,
                default_expiry_days: 365,
            },
        );
        assert_eq!(svc.get_balance("CUST-001", None, None).await.unwrap(), 2);
    }

    #[test]
    fn test_add_days_saturates() {
        let d = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(add_days(d, 1), NaiveDate::from_ymd_opt(2026, 1, 2).unwrap());
        assert_eq!(add_days(d, -5), d);
    }
}
