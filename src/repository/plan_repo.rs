// ==========================================
// 设备预防性维护系统 - 维护计划数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: record_generation 必须单事务完成台账写入 + 排程推进,
//       去重键 (plan_id, cycle_key) 命中时不得变更计划
// ==========================================

use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::plan::{FrequencySpec, MaintenancePlan, SeasonalAdjustment, TaskTemplateItem};
use crate::domain::types::{Priority, TriggerType};
use crate::engine::collaborators::{CollaboratorError, GenerationOutcome, PlanDirectory};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// MaintenancePlanRepository - 维护计划仓储
// ==========================================
pub struct MaintenancePlanRepository {
    conn: Arc<Mutex<Connection>>,
}

const PLAN_COLUMNS: &str = r#"plan_id, tenant_id, asset_id, plan_name, trigger_type,
    frequency_json, seasonal_rules_json, task_template_json, priority,
    effective_from, effective_to, is_active, last_generated_at,
    next_scheduled_at, generation_count, created_by, created_at, updated_at"#;

impl MaintenancePlanRepository {
    /// 创建新的仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建计划
    pub fn create(&self, plan: &MaintenancePlan) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO maintenance_plan (
                plan_id, tenant_id, asset_id, plan_name, trigger_type,
                frequency_json, seasonal_rules_json, task_template_json, priority,
                effective_from, effective_to, is_active, last_generated_at,
                next_scheduled_at, generation_count, created_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &plan.plan_id,
                &plan.tenant_id,
                &plan.asset_id,
                &plan.plan_name,
                plan.trigger_type.to_string(),
                serde_json::to_string(&plan.frequency)?,
                serde_json::to_string(&plan.seasonal_rules)?,
                serde_json::to_string(&plan.task_template)?,
                plan.priority.to_string(),
                plan.effective_from,
                plan.effective_to,
                plan.is_active,
                plan.last_generated_at,
                plan.next_scheduled_at,
                plan.generation_count,
                &plan.created_by,
                plan.created_at,
                plan.updated_at,
            ],
        )?;

        Ok(plan.plan_id.clone())
    }

    /// 按 plan_id 查询计划
    pub fn find_by_id(&self, plan_id: &str) -> RepositoryResult<Option<MaintenancePlan>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!("SELECT {PLAN_COLUMNS} FROM maintenance_plan WHERE plan_id = ?"),
            params![plan_id],
            Self::map_row,
        ) {
            Ok(plan) => Ok(Some(plan)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询租户下所有激活计划
    pub fn find_active(&self, tenant_id: &str) -> RepositoryResult<Vec<MaintenancePlan>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"SELECT {PLAN_COLUMNS} FROM maintenance_plan
               WHERE tenant_id = ? AND is_active = 1
               ORDER BY plan_id"#
        ))?;

        let plans = stmt
            .query_map(params![tenant_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(plans)
    }

    /// 查询 cutoff 之前到期 (或从未生成) 的激活计划
    ///
    /// SQL 只做粗筛, 逐计划的最终到期判定在引擎层完成
    pub fn find_due(
        &self,
        tenant_id: &str,
        cutoff: NaiveDate,
    ) -> RepositoryResult<Vec<MaintenancePlan>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"SELECT {PLAN_COLUMNS} FROM maintenance_plan
               WHERE tenant_id = ?1
                 AND is_active = 1
                 AND effective_from <= ?2
                 AND (effective_to IS NULL OR effective_to >= ?2)
                 AND (next_scheduled_at IS NULL OR next_scheduled_at <= ?2)
               ORDER BY plan_id"#
        ))?;

        let plans = stmt
            .query_map(params![tenant_id, cutoff], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(plans)
    }

    /// 停用/启用计划 (停用而非删除: 存在工单引用时计划不可物理删除)
    pub fn set_active(&self, plan_id: &str, active: bool, actor: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            "UPDATE maintenance_plan SET is_active = ?, updated_at = ? WHERE plan_id = ?",
            params![active, Utc::now(), plan_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "MaintenancePlan".to_string(),
                id: plan_id.to_string(),
            });
        }

        let log = ActionLog::new(plan_id, ActionType::PlanDeactivate, actor)
            .with_detail(if active { "启用计划" } else { "停用计划" });
        Self::insert_action_log(&conn, &log)?;
        Ok(())
    }

    /// 更新计划内容字段 (任务模板/季节规则/优先级)
    ///
    /// 调用方须先通过 TemplateValidator 校验; 本方法不触碰排程字段
    pub fn update_content(&self, plan: &MaintenancePlan, actor: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            r#"UPDATE maintenance_plan SET
                plan_name = ?, frequency_json = ?, seasonal_rules_json = ?,
                task_template_json = ?, priority = ?, effective_from = ?,
                effective_to = ?, updated_at = ?
               WHERE plan_id = ?"#,
            params![
                &plan.plan_name,
                serde_json::to_string(&plan.frequency)?,
                serde_json::to_string(&plan.seasonal_rules)?,
                serde_json::to_string(&plan.task_template)?,
                plan.priority.to_string(),
                plan.effective_from,
                plan.effective_to,
                Utc::now(),
                &plan.plan_id,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "MaintenancePlan".to_string(),
                id: plan.plan_id.clone(),
            });
        }

        let log = ActionLog::new(&plan.plan_id, ActionType::PlanEdit, actor);
        Self::insert_action_log(&conn, &log)?;
        Ok(())
    }

    /// 查询 (plan_id, cycle_key) 是否已有生成台账
    pub fn generation_recorded(&self, plan_id: &str, cycle_key: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM generation_log WHERE plan_id = ? AND cycle_key = ?",
            params![plan_id, cycle_key],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// 记录一次生成并推进排程 (单事务)
    ///
    /// 事务内容: 生成台账插入 + 计划排程字段推进 + 审计日志。
    /// (plan_id, cycle_key) 已存在时整个事务不做任何变更, 返回 Duplicate
    pub fn record_generation_tx(
        &self,
        plan_id: &str,
        generated_at: DateTime<Utc>,
        next_scheduled_at: Option<NaiveDate>,
        cycle_key: &str,
    ) -> RepositoryResult<GenerationOutcome> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let duplicate: bool = tx
            .query_row(
                "SELECT COUNT(*) FROM generation_log WHERE plan_id = ? AND cycle_key = ?",
                params![plan_id, cycle_key],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n > 0)?;

        if duplicate {
            tx.rollback()
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
            return Ok(GenerationOutcome::Duplicate);
        }

        tx.execute(
            r#"INSERT INTO generation_log (log_id, plan_id, cycle_key, generated_at, next_scheduled_at)
               VALUES (?, ?, ?, ?, ?)"#,
            params![
                uuid::Uuid::new_v4().to_string(),
                plan_id,
                cycle_key,
                generated_at,
                next_scheduled_at,
            ],
        )?;

        let affected = tx.execute(
            r#"UPDATE maintenance_plan SET
                last_generated_at = ?,
                next_scheduled_at = ?,
                generation_count = generation_count + 1,
                updated_at = ?
               WHERE plan_id = ?"#,
            params![generated_at, next_scheduled_at, Utc::now(), plan_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "MaintenancePlan".to_string(),
                id: plan_id.to_string(),
            });
        }

        let log = ActionLog::new(plan_id, ActionType::GenerationApply, "system")
            .with_payload(serde_json::json!({
                "cycle_key": cycle_key,
                "next_scheduled_at": next_scheduled_at,
            }));
        Self::insert_action_log(&tx, &log)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(GenerationOutcome::Recorded)
    }

    /// 审计日志写入 (与调用方共用连接/事务)
    fn insert_action_log(conn: &Connection, log: &ActionLog) -> RepositoryResult<()> {
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

    /// 行映射
    fn map_row(row: &Row<'_>) -> rusqlite::Result<MaintenancePlan> {
        let trigger_raw: String = row.get("trigger_type")?;
        let priority_raw: String = row.get("priority")?;
        let frequency_raw: String = row.get("frequency_json")?;
        let seasonal_raw: String = row.get("seasonal_rules_json")?;
        let template_raw: String = row.get("task_template_json")?;

        let frequency: FrequencySpec =
            serde_json::from_str(&frequency_raw).map_err(|e| json_column_err("frequency_json", e))?;
        let seasonal_rules: Vec<SeasonalAdjustment> =
            serde_json::from_str(&seasonal_raw).map_err(|e| json_column_err("seasonal_rules_json", e))?;
        let task_template: Vec<TaskTemplateItem> =
            serde_json::from_str(&template_raw).map_err(|e| json_column_err("task_template_json", e))?;

        Ok(MaintenancePlan {
            plan_id: row.get("plan_id")?,
            tenant_id: row.get("tenant_id")?,
            asset_id: row.get("asset_id")?,
            plan_name: row.get("plan_name")?,
            trigger_type: parse_trigger(&trigger_raw),
            frequency,
            seasonal_rules,
            task_template,
            priority: parse_priority(&priority_raw),
            effective_from: row.get("effective_from")?,
            effective_to: row.get("effective_to")?,
            is_active: row.get("is_active")?,
            last_generated_at: row.get("last_generated_at")?,
            next_scheduled_at: row.get("next_scheduled_at")?,
            generation_count: row.get("generation_count")?,
            created_by: row.get("created_by")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// JSON 列解码失败转换为 rusqlite 错误 (map_row 签名要求)
fn json_column_err(column: &str, e: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{column}: {e}"),
        )),
    )
}

fn parse_trigger(s: &str) -> TriggerType {
    match s {
        "METER" => TriggerType::Meter,
        "CONDITION" => TriggerType::Condition,
        _ => TriggerType::Time,
    }
}

fn parse_priority(s: &str) -> Priority {
    match s {
        "LOW" => Priority::Low,
        "HIGH" => Priority::High,
        "CRITICAL" => Priority::Critical,
        _ => Priority::Medium,
    }
}

// ==========================================
// PlanDirectory 适配 - 供编排器消费
// ==========================================
#[async_trait]
impl PlanDirectory for MaintenancePlanRepository {
    async fn find_active_plans(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<MaintenancePlan>, CollaboratorError> {
        Ok(self.find_active(tenant_id)?)
    }

    async fn find_due_before(
        &self,
        tenant_id: &str,
        cutoff: NaiveDate,
    ) -> Result<Vec<MaintenancePlan>, CollaboratorError> {
        Ok(self.find_due(tenant_id, cutoff)?)
    }

    async fn generation_exists(
        &self,
        plan_id: &str,
        cycle_key: &str,
    ) -> Result<bool, CollaboratorError> {
        Ok(self.generation_recorded(plan_id, cycle_key)?)
    }

    async fn record_generation(
        &self,
        plan_id: &str,
        generated_at: DateTime<Utc>,
        next_scheduled_at: Option<NaiveDate>,
        cycle_key: &str,
    ) -> Result<GenerationOutcome, CollaboratorError> {
        Ok(self.record_generation_tx(plan_id, generated_at, next_scheduled_at, cycle_key)?)
    }
}
