//! 基础设施错误类型
//!
//! 配置加载和数据库连接层面的错误，使用 thiserror 提供良好的错误信息。

use thiserror::Error;

/// 基础设施错误
#[derive(Debug, Error)]
pub enum SharedError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("配置加载失败: {0}")]
    Config(#[from] config::ConfigError),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 基础设施 Result 类型别名
pub type SharedResult<T> = std::result::Result<T, SharedError>;
