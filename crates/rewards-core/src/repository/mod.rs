//! 存储仓储层
//!
//! 提供积分流水与常客卡的数据访问接口，封装 SQL 操作细节。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - 状态推进以条件更新（CAS）表达，调用方据返回值判断是否赢得竞争
//! - 定义 trait 接口以支持 mock 测试和内存后端

mod card_repo;
mod ledger_repo;
mod memory;
mod traits;

pub use card_repo::PgCardRepository;
pub use ledger_repo::PgLedgerRepository;
pub use memory::MemoryRewardsStore;
pub use traits::{CardRepository, LedgerRepository};

#[cfg(test)]
pub use traits::{MockCardRepository, MockLedgerRepository};
