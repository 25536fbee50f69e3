//! 常客卡实体定义

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 常客卡状态
///
/// 状态机：Active --集满--> Completed --核销--> Redeemed；
/// Active/Completed 过期后进入 Expired（终态）；Redeemed 不受过期影响。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum CardStatus {
    /// 集卡中 - 到店次数未达标
    #[default]
    Active,
    /// 已集满 - 可核销一次免费服务
    Completed,
    /// 已核销 - 免费服务已使用（终态）
    Redeemed,
    /// 已过期 - 超过有效期未核销（终态）
    Expired,
}

impl CardStatus {
    /// 是否为未关闭状态（仍可累计到店或等待核销）
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Active | Self::Completed)
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Redeemed | Self::Expired)
    }
}

/// 常客卡
///
/// 按（客户, 服务项目）维度累计到店次数，集满后可核销一次免费服务。
/// 卡片永不物理删除，过期通过状态翻转表达。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FrequentCard {
    pub id: Uuid,
    /// 客户 ID
    pub customer_id: String,
    /// 服务项目 ID
    pub service_id: String,
    /// 公司/门店范围（可选）
    #[sqlx(default)]
    pub company_id: Option<String>,
    /// 已累计到店次数
    pub visits: i32,
    /// 集满所需到店次数（创建后不可变）
    pub required_visits: i32,
    /// 发卡日期
    pub issue_date: NaiveDate,
    /// 卡片失效日期（含当日）
    pub expiry_date: NaiveDate,
    /// 卡片状态
    pub status: CardStatus,
    /// 核销时间（未核销为 None）
    #[sqlx(default)]
    pub redeemed_at: Option<DateTime<Utc>>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl FrequentCard {
    /// 检查卡片有效期是否已过
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date < today
    }

    /// 检查卡片是否处于未关闭且未过期状态
    pub fn is_open(&self, today: NaiveDate) -> bool {
        self.status.is_open() && !self.is_expired(today)
    }

    /// 检查卡片是否集满且可核销
    pub fn is_redeemable(&self, today: NaiveDate) -> bool {
        self.status == CardStatus::Completed
            && self.visits >= self.required_visits
            && !self.is_expired(today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(status: CardStatus, visits: i32, required: i32, expiry: NaiveDate) -> FrequentCard {
        FrequentCard {
            id: Uuid::new_v4(),
            customer_id: "CUST-001".to_string(),
            service_id: "SRV-洗车".to_string(),
            company_id: None,
            visits,
            required_visits: required,
            issue_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            expiry_date: expiry,
            status,
            redeemed_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_open_and_terminal() {
        assert!(CardStatus::Active.is_open());
        assert!(CardStatus::Completed.is_open());
        assert!(!CardStatus::Redeemed.is_open());
        assert!(CardStatus::Redeemed.is_terminal());
        assert!(CardStatus::Expired.is_terminal());
    }

    #[test]
    fn test_is_redeemable() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let future = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        let past = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();

        assert!(card(CardStatus::Completed, 3, 3, future).is_redeemable(today));
        assert!(!card(CardStatus::Active, 2, 3, future).is_redeemable(today));
        assert!(!card(CardStatus::Completed, 3, 3, past).is_redeemable(today));
        assert!(!card(CardStatus::Redeemed, 3, 3, future).is_redeemable(today));
    }

    #[test]
    fn test_is_open_respects_expiry() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2026, 5, 31).unwrap();
        assert!(card(CardStatus::Active, 1, 3, today).is_open(today));
        assert!(!card(CardStatus::Active, 1, 3, yesterday).is_open(today));
    }
}
