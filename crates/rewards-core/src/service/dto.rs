//! 服务层请求/响应 DTO

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{FrequentCard, LoyaltyEntry};

/// 一次账本写入的回执：新流水 + 写入后的余额
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryReceipt {
    pub entry: LoyaltyEntry,
    pub balance: i64,
}

/// 一次到店记录对卡片产生的效果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitKind {
    /// 新开卡（本次到店为第 1 次）
    Created,
    /// 已有卡片计数 +1，尚未集满
    Advanced,
    /// 本次到店使卡片集满
    Completed,
    /// 卡片此前已集满，本次到店不改变卡片（等待核销）
    AlreadyCompleted,
}

/// 到店记录结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitOutcome {
    pub card: FrequentCard,
    pub kind: VisitKind,
}

/// 免费服务自动核销探测结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoApplyCheck {
    pub eligible: bool,
    pub card_id: Option<Uuid>,
}

impl AutoApplyCheck {
    pub fn eligible(card_id: Uuid) -> Self {
        Self {
            eligible: true,
            card_id: Some(card_id),
        }
    }

    pub fn not_eligible() -> Self {
        Self {
            eligible: false,
            card_id: None,
        }
    }
}

/// 收银端结账前展示用的客户奖励概览
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub customer_id: String,
    /// 客户全范围积分余额（不限计划/门店）
    pub balance: i64,
    /// 未关闭的常客卡
    pub open_cards: Vec<FrequentCard>,
}
