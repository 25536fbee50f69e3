//! 忠诚度计划引用模型
//!
//! 计划由外部系统维护，核心只读取转换系数与积分有效期两项参数。

use serde::{Deserialize, Serialize};

/// 忠诚度计划
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyProgram {
    pub id: String,
    /// 积分兑换货币的转换系数（1 积分 = conversion_factor 货币单位）
    pub conversion_factor: f64,
    /// 积分有效期（天），None 表示计划未配置，由账本使用默认值
    pub expiry_duration_days: Option<i64>,
}

impl LoyaltyProgram {
    pub fn new(id: impl Into<String>, conversion_factor: f64) -> Self {
        Self {
            id: id.into(),
            conversion_factor,
            expiry_duration_days: None,
        }
    }

    pub fn with_expiry_days(mut self, days: i64) -> Self {
        self.expiry_duration_days = Some(days);
        self
    }

    /// 按转换系数计算一笔兑换对应的货币金额
    pub fn redemption_amount(&self, points: i64) -> f64 {
        points as f64 * self.conversion_factor
    }
}
