//! 范围锁模块
//!
//! 提供进程内按 key 串行化的互斥锁，用于把"先查后写"的序列
//! （余额校验 + 流水写入、到店计数 + 卡片状态推进）收拢为同一
//! 客户范围内的原子单元。
//!
//! 核心以库形式被单进程服务消费，多实例部署时应叠加存储层的
//! 条件更新（CAS），卡片核销路径已同时具备两层保护。

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// 按 key 互斥的范围锁
///
/// 同一 key 的持锁者依次执行，不同 key 互不阻塞。
/// 锁条目按需创建后常驻，条目数与活跃客户数同阶。
#[derive(Default)]
pub struct ScopeLock {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ScopeLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指定范围的锁，持有返回的 guard 期间该范围内的操作被串行化
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        debug!(key = %key, "acquiring scope lock");
        lock.lock_owned().await
    }

    /// 积分账本的客户范围 key
    pub fn ledger_key(customer_id: &str) -> String {
        format!("ledger:{}", customer_id)
    }

    /// 常客卡的（客户, 服务项目）范围 key
    pub fn card_key(customer_id: &str, service_id: &str) -> String {
        format!("card:{}:{}", customer_id, service_id)
    }
}
