//! 计划目录接口
//!
//! 忠诚度计划与客户归属关系由外部系统（ERP 主数据）维护，
//! 核心通过本接口只读访问；定义 trait 以便服务层依赖抽象并支持 mock 测试。

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::Result;
use crate::models::LoyaltyProgram;

/// 计划目录接口（只读）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgramRegistry: Send + Sync {
    /// 按计划 ID 查询计划参数，不存在时返回 None
    async fn get_program(&self, program_id: &str) -> Result<Option<LoyaltyProgram>>;

    /// 查询客户归属的计划 ID，客户不存在或未加入计划时返回 None
    async fn customer_program(&self, customer_id: &str) -> Result<Option<String>>;
}

/// 内存计划目录
///
/// 用于嵌入式部署和测试；生产环境由调用方提供对接主数据的实现。
#[derive(Default)]
pub struct StaticProgramRegistry {
    programs: RwLock<HashMap<String, LoyaltyProgram>>,
    assignments: RwLock<HashMap<String, String>>,
}

impl StaticProgramRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个计划
    pub fn add_program(&self, program: LoyaltyProgram) {
        self.programs.write().insert(program.id.clone(), program);
    }

    /// 将客户分配到计划
    pub fn assign_customer(&self, customer_id: impl Into<String>, program_id: impl Into<String>) {
        self.assignments
            .write()
            .insert(customer_id.into(), program_id.into());
    }
}

#[async_trait]
impl ProgramRegistry for StaticProgramRegistry {
    async fn get_program(&self, program_id: &str) -> Result<Option<LoyaltyProgram>> {
        Ok(self.programs.read().get(program_id).cloned())
    }

    async fn customer_program(&self, customer_id: &str) -> Result<Option<String>> {
        Ok(self.assignments.read().get(customer_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_registry_lookup() {
        let registry = StaticProgramRegistry::new();
        registry.add_program(LoyaltyProgram::new("PROG-A", 1.0).with_expiry_days(365));
        registry.assign_customer("CUST-001", "PROG-A");

        let program = registry.get_program("PROG-A").await.unwrap().unwrap();
        assert_eq!(program.conversion_factor, 1.0);
        assert_eq!(program.expiry_duration_days, Some(365));

        assert_eq!(
            registry.customer_program("CUST-001").await.unwrap(),
            Some("PROG-A".to_string())
        );
        assert_eq!(registry.customer_program("CUST-002").await.unwrap(), None);
        assert!(registry.get_program("PROG-X").await.unwrap().is_none());
    }
}
