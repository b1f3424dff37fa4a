// ==========================================
// 设备预防性维护系统 - 维护配置读取 Trait
// ==========================================
// 职责: 定义编排器/外层服务所需的配置读取接口 (不包含实现)
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::work_order::IdlePolicy;
use async_trait::async_trait;
use std::error::Error;

// ==========================================
// MaintenanceConfigReader Trait
// ==========================================
// 实现者: ConfigManager (从 config_kv 表读取) / StaticConfig (测试)
#[async_trait]
pub trait MaintenanceConfigReader: Send + Sync {
    /// 批量生成的到期前瞻天数
    ///
    /// 截止日 = today + 前瞻天数; 0 表示只取当日及更早到期的计划
    ///
    /// # 默认值
    /// - 0
    async fn get_generation_lookahead_days(&self)
        -> Result<i64, Box<dyn Error + Send + Sync>>;

    /// 新建工单的默认闲置升级策略
    ///
    /// # 默认值
    /// - 24h 提醒 / 48h 升级 / 72h 建议改派
    async fn get_default_idle_policy(&self) -> Result<IdlePolicy, Box<dyn Error + Send + Sync>>;
}

// ==========================================
// StaticConfig - 固定值配置 (测试与嵌入场景)
// ==========================================
#[derive(Debug, Clone)]
pub struct StaticConfig {
    pub generation_lookahead_days: i64,
    pub default_idle_policy: IdlePolicy,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            generation_lookahead_days: 0,
            default_idle_policy: IdlePolicy::default(),
        }
    }
}

#[async_trait]
impl MaintenanceConfigReader for StaticConfig {
    async fn get_generation_lookahead_days(
        &self,
    ) -> Result<i64, Box<dyn Error + Send + Sync>> {
        Ok(self.generation_lookahead_days)
    }

    async fn get_default_idle_policy(&self) -> Result<IdlePolicy, Box<dyn Error + Send + Sync>> {
        Ok(self.default_idle_policy)
    }
}
