// ==========================================
// 设备预防性维护系统 - 操作日志仓储
// ==========================================
// 红线: 所有写入必须记录; 日志只增不改
// ==========================================

use crate::domain::action_log::ActionLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    /// 创建新的仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入一条日志
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO action_log (action_id, entity_id, action_type, actor, action_ts, payload_json, detail)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &log.action_id,
                &log.entity_id,
                log.action_type.as_str(),
                &log.actor,
                log.action_ts,
                log.payload_json.as_ref().map(|p| p.to_string()),
                &log.detail,
            ],
        )?;
        Ok(())
    }

    /// 查询某实体的日志 (按时间升序)
    ///
    /// 返回 (action_type, actor, detail) 三元组, 供审计界面展示
    pub fn list_by_entity(
        &self,
        entity_id: &str,
    ) -> RepositoryResult<Vec<(String, String, Option<String>)>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT action_type, actor, detail FROM action_log
               WHERE entity_id = ?
               ORDER BY action_ts"#,
        )?;

        let rows = stmt
            .query_map(params![entity_id], map_summary_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 统计某实体的日志条数
    pub fn count_by_entity(&self, entity_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM action_log WHERE entity_id = ?",
            params![entity_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn map_summary_row(row: &Row<'_>) -> rusqlite::Result<(String, String, Option<String>)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}
