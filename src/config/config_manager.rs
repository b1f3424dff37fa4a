// ==========================================
// 设备预防性维护系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value, scope_id='global')
// ==========================================

use crate::config::config_trait::MaintenanceConfigReader;
use crate::db::configure_sqlite_connection;
use crate::domain::work_order::IdlePolicy;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// 配置键全集
// ==========================================
pub mod config_keys {
    /// 批量生成到期前瞻天数
    pub const GENERATION_LOOKAHEAD_DAYS: &str = "generation.lookahead_days";
    /// 闲置提醒阈值 (小时)
    pub const IDLE_WARNING_HOURS: &str = "idle.warning_hours";
    /// 闲置升级阈值 (小时)
    pub const IDLE_ESCALATION_HOURS: &str = "idle.escalation_hours";
    /// 闲置建议改派阈值 (小时)
    pub const IDLE_AUTO_REASSIGN_HOURS: &str = "idle.auto_reassign_hours";
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明: 为保证连接行为一致, 会对传入连接再次应用统一 PRAGMA (幂等)
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值 (scope_id='global')
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error + Send + Sync>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入配置值 (scope_id='global', upsert)
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            r#"INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
               ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value"#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取整数配置, 缺失或不可解析时回落默认值
    fn get_i64_or(&self, key: &str, default: i64) -> Result<i64, Box<dyn Error + Send + Sync>> {
        Ok(self
            .get_config_value(key)?
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(default))
    }
}

#[async_trait]
impl MaintenanceConfigReader for ConfigManager {
    async fn get_generation_lookahead_days(
        &self,
    ) -> Result<i64, Box<dyn Error + Send + Sync>> {
        self.get_i64_or(config_keys::GENERATION_LOOKAHEAD_DAYS, 0)
    }

    async fn get_default_idle_policy(&self) -> Result<IdlePolicy, Box<dyn Error + Send + Sync>> {
        let warning = self.get_i64_or(config_keys::IDLE_WARNING_HOURS, 24)?;
        let escalation = self.get_i64_or(config_keys::IDLE_ESCALATION_HOURS, 48)?;
        let auto_reassign = self.get_i64_or(config_keys::IDLE_AUTO_REASSIGN_HOURS, 72)?;

        // 三档阈值必须严格递增, 否则回落默认策略
        let policy = IdlePolicy::new(warning, escalation, auto_reassign);
        if !policy.is_increasing() {
            warn!(
                warning_hours = warning,
                escalation_hours = escalation,
                auto_reassign_hours = auto_reassign,
                "闲置阈值配置非递增, 回落默认策略"
            );
            return Ok(IdlePolicy::default());
        }
        Ok(policy)
    }
}
