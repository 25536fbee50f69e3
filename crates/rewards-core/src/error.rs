//! 奖励核心错误类型
//!
//! 定义账本与常客卡引擎的业务错误和系统错误。
//! 所有操作统一返回类型化 Result，不混用异常与错误码字典。

use thiserror::Error;
use uuid::Uuid;

/// 奖励核心错误类型
#[derive(Debug, Error)]
pub enum RewardsError {
    // === 积分账本相关错误 ===
    #[error("积分数量必须为正数: {0}")]
    InvalidAmount(i64),

    #[error("客户未加入任何忠诚度计划: customer_id={0}")]
    NoProgramAssigned(String),

    #[error("忠诚度计划不存在: {0}")]
    ProgramNotFound(String),

    #[error("积分余额不足: 可用 {available}, 请求 {requested}")]
    InsufficientPoints { available: i64, requested: i64 },

    // === 常客卡相关错误 ===
    #[error("常客卡不存在: {0}")]
    CardNotFound(Uuid),

    #[error("卡片与客户或服务项目不匹配: card_id={0}")]
    CardMismatch(Uuid),

    #[error("卡片已过期: card_id={0}")]
    CardExpired(Uuid),

    #[error("卡片已核销，不能重复使用: card_id={0}")]
    AlreadyRedeemed(Uuid),

    #[error("到店次数未达标，不能核销: 已到店 {visits}, 需要 {required}")]
    NotEligible { visits: i32, required: i32 },

    // === 系统错误 ===
    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("存储错误: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 奖励核心 Result 类型别名
pub type Result<T> = std::result::Result<T, RewardsError>;

impl RewardsError {
    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// 检查是否为业务错误（非系统错误）
    ///
    /// 业务错误可直接展示给收银端，系统错误只记日志并返回通用失败。
    pub fn is_business_error(&self) -> bool {
        !matches!(self, Self::Storage(_) | Self::Internal(_))
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::NoProgramAssigned(_) => "NO_PROGRAM_ASSIGNED",
            Self::ProgramNotFound(_) => "PROGRAM_NOT_FOUND",
            Self::InsufficientPoints { .. } => "INSUFFICIENT_POINTS",
            Self::CardNotFound(_) => "CARD_NOT_FOUND",
            Self::CardMismatch(_) => "CARD_MISMATCH",
            Self::CardExpired(_) => "CARD_EXPIRED",
            Self::AlreadyRedeemed(_) => "ALREADY_REDEEMED",
            Self::NotEligible { .. } => "NOT_ELIGIBLE",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_retryable() {
        assert!(RewardsError::Storage(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(
            !RewardsError::InsufficientPoints {
                available: 30,
                requested: 40
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_error_is_business_error() {
        assert!(RewardsError::InvalidAmount(0).is_business_error());
        assert!(RewardsError::AlreadyRedeemed(Uuid::nil()).is_business_error());
        assert!(!RewardsError::Internal("panic".to_string()).is_business_error());
        assert!(!RewardsError::Storage(sqlx::Error::PoolTimedOut).is_business_error());
    }

    #[test]
    fn test_error_code() {
        assert_eq!(
            RewardsError::InsufficientPoints {
                available: 30,
                requested: 40
            }
            .error_code(),
            "INSUFFICIENT_POINTS"
        );
        assert_eq!(
            RewardsError::CardExpired(Uuid::nil()).error_code(),
            "CARD_EXPIRED"
        );
    }

    #[test]
    fn test_error_display_carries_amounts() {
        let err = RewardsError::InsufficientPoints {
            available: 30,
            requested: 40,
        };
        assert!(err.to_string().contains("30"));
        assert!(err.to_string().contains("40"));
    }
}
