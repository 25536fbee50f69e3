//! 奖励核心（积分账本 + 常客卡引擎）
//!
//! POS 奖励体系中唯一携带余额与正确性不变量的子系统：
//!
//! - **积分账本**：append-only 流水，按计划转换系数累积/兑换积分，
//!   余额校验与写入在同客户范围内原子执行，并发兑换不会透支。
//! - **常客卡引擎**：按（客户, 服务项目）累计到店次数，集满后
//!   可核销一次免费服务；核销为 CAS，至多成功一次；过期惰性翻转。
//! - **奖励门面**：对结账工作流与收银端暴露统一操作集合。
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `registry`: 忠诚度计划目录接口（外部只读协作方）
//! - `repository`: 存储仓储层（PostgreSQL / 内存）
//! - `lock`: 客户范围串行化锁
//! - `service`: 业务服务层与对外门面

pub mod error;
pub mod lock;
pub mod models;
pub mod registry;
pub mod repository;
pub mod service;

pub use error::{Result, RewardsError};
pub use lock::ScopeLock;
pub use models::{CardStatus, EntryFilter, FrequentCard, LoyaltyEntry, LoyaltyProgram};
pub use registry::{ProgramRegistry, StaticProgramRegistry};
pub use repository::{
    CardRepository, LedgerRepository, MemoryRewardsStore, PgCardRepository, PgLedgerRepository,
};
pub use service::{
    AutoApplyCheck, CardPolicy, CustomerSummary, EntryReceipt, ExpiryPolicy, FrequentCardEngine,
    LedgerPolicy, LoyaltyLedger, RewardsService, VisitKind, VisitOutcome,
};
