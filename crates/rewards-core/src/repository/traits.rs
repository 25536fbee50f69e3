//! 仓储 Trait 定义
//!
//! 定义积分流水与常客卡的存储接口，服务层依赖抽象而非具体实现，
//! 支持 PostgreSQL、内存两种后端以及 mock 测试。
//!
//! 并发约定：`advance_visit`、`redeem_completed`、`expire_overdue`
//! 必须由实现保证为原子条件更新（CAS），竞争失败返回 None/0 而非部分写入。

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{EntryFilter, FrequentCard, LoyaltyEntry};

/// 积分流水仓储接口
///
/// 账本为 append-only：接口上不存在更新或删除流水的操作。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// 追加一条流水
    async fn insert(&self, entry: &LoyaltyEntry) -> Result<()>;

    /// 汇总范围内流水的积分和
    ///
    /// `expiry_cutoff` 为 Some(today) 时只计入 `expiry_date >= today` 的流水，
    /// 为 None 时无条件汇总（包含已过期积分）。
    async fn sum_points(&self, filter: &EntryFilter, expiry_cutoff: Option<NaiveDate>)
    -> Result<i64>;

    /// 按入账时间倒序列出范围内的流水
    async fn list(&self, filter: &EntryFilter) -> Result<Vec<LoyaltyEntry>>;
}

/// 常客卡仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CardRepository: Send + Sync {
    /// 写入一张新卡
    async fn insert(&self, card: &FrequentCard) -> Result<()>;

    /// 按 ID 读取卡片
    async fn get(&self, id: Uuid) -> Result<Option<FrequentCard>>;

    /// 列出客户所有未关闭（Active/Completed）的卡片，按失效日期倒序
    async fn list_open(
        &self,
        customer_id: &str,
        company_id: Option<String>,
    ) -> Result<Vec<FrequentCard>>;

    /// 查找（客户, 服务项目）最近创建的未关闭、未过期卡片
    async fn latest_open_for_service(
        &self,
        customer_id: &str,
        service_id: &str,
        today: NaiveDate,
    ) -> Result<Option<FrequentCard>>;

    /// 查找（客户, 服务项目）最早创建的已集满、未过期、未核销卡片
    async fn oldest_completed_for_service(
        &self,
        customer_id: &str,
        service_id: &str,
        today: NaiveDate,
    ) -> Result<Option<FrequentCard>>;

    /// 原子推进一次到店计数
    ///
    /// 仅 Active 状态的卡片会被更新；计数达到 `required_visits` 时
    /// 状态同步翻转为 Completed。卡片不存在或已非 Active 时返回 None。
    async fn advance_visit(&self, id: Uuid) -> Result<Option<FrequentCard>>;

    /// 核销一张已集满的卡片（CAS：仅当状态为 Completed 时成功）
    ///
    /// 并发双核销中只有一个调用方能观察到 Completed 并赢得写入，
    /// 竞争失败方得到 None。
    async fn redeem_completed(
        &self,
        id: Uuid,
        redeemed_at: DateTime<Utc>,
    ) -> Result<Option<FrequentCard>>;

    /// 惰性过期扫描：把客户名下已过失效日期、状态仍为
    /// Active/Completed 的卡片翻转为 Expired，返回翻转数量。
    ///
    /// 幂等：重复调用除首次状态翻转外不产生其他副作用。
    async fn expire_overdue(&self, customer_id: &str, today: NaiveDate) -> Result<u64>;
}
