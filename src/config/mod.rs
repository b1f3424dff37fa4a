// ==========================================
// 设备预防性维护系统 - 配置层
// ==========================================
// 职责: 系统配置管理, 引擎只通过读取 trait 消费配置
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use config_trait::{MaintenanceConfigReader, StaticConfig};
