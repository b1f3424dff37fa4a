// ==========================================
// 设备预防性维护系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为, 避免"部分模块外键开启/部分不开启"
// - 统一 busy_timeout, 减少并发写入时的偶发 busy 错误
// - 提供幂等建表入口 (嵌入式场景与测试共用)
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout (毫秒)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明:
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开内存库 (测试用)
pub fn open_in_memory_connection() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 幂等建表
///
/// 结构化子对象 (频率规格/季节规则/任务模板/工单任务) 以 JSON 列存储,
/// 生成台账以 UNIQUE(plan_id, cycle_key) 承载去重键
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS maintenance_plan (
            plan_id            TEXT PRIMARY KEY,
            tenant_id          TEXT NOT NULL,
            asset_id           TEXT NOT NULL,
            plan_name          TEXT NOT NULL,
            trigger_type       TEXT NOT NULL,
            frequency_json     TEXT NOT NULL,
            seasonal_rules_json TEXT NOT NULL DEFAULT '[]',
            task_template_json TEXT NOT NULL DEFAULT '[]',
            priority           TEXT NOT NULL,
            effective_from     TEXT NOT NULL,
            effective_to       TEXT,
            is_active          INTEGER NOT NULL DEFAULT 1,
            last_generated_at  TEXT,
            next_scheduled_at  TEXT,
            generation_count   INTEGER NOT NULL DEFAULT 0,
            created_by         TEXT NOT NULL,
            created_at         TEXT NOT NULL,
            updated_at         TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_plan_tenant_active
            ON maintenance_plan (tenant_id, is_active);
        CREATE INDEX IF NOT EXISTS idx_plan_next_scheduled
            ON maintenance_plan (tenant_id, next_scheduled_at);

        CREATE TABLE IF NOT EXISTS generation_log (
            log_id            TEXT PRIMARY KEY,
            plan_id           TEXT NOT NULL REFERENCES maintenance_plan(plan_id),
            cycle_key         TEXT NOT NULL,
            generated_at      TEXT NOT NULL,
            next_scheduled_at TEXT,
            UNIQUE (plan_id, cycle_key)
        );

        CREATE TABLE IF NOT EXISTS work_order (
            work_order_id      TEXT PRIMARY KEY,
            tenant_id          TEXT NOT NULL,
            asset_id           TEXT NOT NULL,
            origin             TEXT NOT NULL,
            source_plan_id     TEXT,
            source_ticket_id   TEXT,
            status             TEXT NOT NULL,
            priority           TEXT NOT NULL,
            approval_status    TEXT NOT NULL,
            reason             TEXT,
            scheduled_start    TEXT,
            scheduled_end      TEXT,
            actual_start       TEXT,
            actual_end         TEXT,
            sla_target_at      TEXT,
            status_changed_at  TEXT NOT NULL,
            assigned_technician TEXT,
            assigned_team      TEXT,
            tasks_json         TEXT NOT NULL DEFAULT '[]',
            completion_pct     INTEGER NOT NULL DEFAULT 0,
            cost_labor         REAL NOT NULL DEFAULT 0,
            cost_parts         REAL NOT NULL DEFAULT 0,
            cost_external      REAL NOT NULL DEFAULT 0,
            idle_warning_hours      INTEGER NOT NULL DEFAULT 24,
            idle_escalation_hours   INTEGER NOT NULL DEFAULT 48,
            idle_auto_reassign_hours INTEGER NOT NULL DEFAULT 72,
            created_by         TEXT NOT NULL,
            updated_by         TEXT NOT NULL,
            created_at         TEXT NOT NULL,
            updated_at         TEXT NOT NULL,
            revision           INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_wo_tenant_status
            ON work_order (tenant_id, status);
        CREATE INDEX IF NOT EXISTS idx_wo_source_plan
            ON work_order (source_plan_id);

        CREATE TABLE IF NOT EXISTS action_log (
            action_id    TEXT PRIMARY KEY,
            entity_id    TEXT NOT NULL,
            action_type  TEXT NOT NULL,
            actor        TEXT NOT NULL,
            action_ts    TEXT NOT NULL,
            payload_json TEXT,
            detail       TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_action_entity
            ON action_log (entity_id, action_ts);

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key      TEXT NOT NULL,
            value    TEXT NOT NULL,
            PRIMARY KEY (scope_id, key)
        );
        "#,
    )
}
