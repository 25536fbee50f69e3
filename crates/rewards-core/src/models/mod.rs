//! 领域模型定义
//!
//! 奖励核心的两类余额实体：积分流水（append-only）与常客卡（状态机），
//! 以及外部忠诚度计划的只读引用模型。

mod card;
mod entry;
mod program;

pub use card::{CardStatus, FrequentCard};
pub use entry::{EntryFilter, LoyaltyEntry};
pub use program::LoyaltyProgram;
