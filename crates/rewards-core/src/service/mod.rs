//! 业务服务层
//!
//! - `ledger_service`: 积分账本（累积/兑换/余额）
//! - `card_service`: 常客卡引擎（到店计数/核销/过期）
//! - `rewards_service`: 对外门面（参数校验与路由）

pub mod card_service;
pub mod dto;
pub mod ledger_service;
pub mod rewards_service;

pub use card_service::{CardPolicy, FrequentCardEngine};
pub use dto::{AutoApplyCheck, CustomerSummary, EntryReceipt, VisitKind, VisitOutcome};
pub use ledger_service::{ExpiryPolicy, LedgerPolicy, LoyaltyLedger};
pub use rewards_service::RewardsService;
