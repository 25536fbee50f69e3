//! 积分流水实体定义

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 积分流水
///
/// 记录一次积分累积或兑换。流水一经写入不可修改，
/// 冲正只能通过追加一笔反向流水完成（append-only 账本）。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyEntry {
    pub id: Uuid,
    /// 客户 ID
    pub customer_id: String,
    /// 忠诚度计划 ID
    pub program_id: String,
    /// 公司/门店范围（可选）
    #[sqlx(default)]
    pub company_id: Option<String>,
    /// 积分变动量：正数为累积，负数为兑换
    pub points: i64,
    /// 兑换对应的货币金额（累积时为 0）
    pub purchase_amount: f64,
    /// 入账时间
    pub posting_time: DateTime<Utc>,
    /// 积分失效日期（含当日）
    pub expiry_date: NaiveDate,
}

impl LoyaltyEntry {
    /// 检查流水是否已过期
    ///
    /// 口径：`expiry_date >= today` 视为有效（失效日当天仍可用）。
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date < today
    }
}

/// 流水查询范围
///
/// `program_id` / `company_id` 为 None 时不按该维度过滤。
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub customer_id: String,
    pub program_id: Option<String>,
    pub company_id: Option<String>,
}

impl EntryFilter {
    pub fn customer(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            ..Default::default()
        }
    }

    pub fn with_program(mut self, program_id: impl Into<String>) -> Self {
        self.program_id = Some(program_id.into());
        self
    }

    pub fn with_company(mut self, company_id: impl Into<String>) -> Self {
        self.company_id = Some(company_id.into());
        self
    }

    /// 判断一条流水是否落在查询范围内
    pub fn matches(&self, entry: &LoyaltyEntry) -> bool {
        entry.customer_id == self.customer_id
            && self
                .program_id
                .as_ref()
                .is_none_or(|p| &entry.program_id == p)
            && self
                .company_id
                .as_ref()
                .is_none_or(|c| entry.company_id.as_ref() == Some(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(customer: &str, program: &str, company: Option<&str>) -> LoyaltyEntry {
        LoyaltyEntry {
            id: Uuid::new_v4(),
            customer_id: customer.to_string(),
            program_id: program.to_string(),
            company_id: company.map(String::from),
            points: 10,
            purchase_amount: 0.0,
            posting_time: Utc::now(),
            expiry_date: NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_is_expired() {
        let e = entry("CUST-001", "PROG-A", None);
        assert!(!e.is_expired(NaiveDate::from_ymd_opt(2027, 1, 1).unwrap()));
        assert!(e.is_expired(NaiveDate::from_ymd_opt(2027, 1, 2).unwrap()));
    }

    #[test]
    fn test_filter_matches_customer_scope() {
        let e = entry("CUST-001", "PROG-A", Some("门店一"));
        assert!(EntryFilter::customer("CUST-001").matches(&e));
        assert!(!EntryFilter::customer("CUST-002").matches(&e));
    }

    #[test]
    fn test_filter_matches_optional_scopes() {
        let e = entry("CUST-001", "PROG-A", Some("门店一"));
        assert!(
            EntryFilter::customer("CUST-001")
                .with_program("PROG-A")
                .with_company("门店一")
                .matches(&e)
        );
        assert!(
            !EntryFilter::customer("CUST-001")
                .with_program("PROG-B")
                .matches(&e)
        );
        assert!(
            !EntryFilter::customer("CUST-001")
                .with_company("门店二")
                .matches(&e)
        );
    }

    #[test]
    fn test_filter_company_none_on_entry() {
        // 流水未标注公司时，不匹配任何显式公司过滤
        let e = entry("CUST-001", "PROG-A", None);
        assert!(
            !EntryFilter::customer("CUST-001")
                .with_company("门店一")
                .matches(&e)
        );
    }
}
