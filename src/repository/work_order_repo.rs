// ==========================================
// 设备预防性维护系统 - 工单数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 并发控制: save 使用乐观锁 (revision 列), 同一工单的两个并发
//           状态转换只有一个能提交成功
// ==========================================

use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::plan::MaintenancePlan;
use crate::domain::types::{
    ApprovalStatus, Priority, WorkOrderOrigin, WorkOrderStatus,
};
use crate::domain::work_order::{CostBreakdown, IdlePolicy, WorkOrder, WorkOrderTask};
use crate::engine::collaborators::{CollaboratorError, WorkOrderFactory};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// WorkOrderRepository - 工单仓储
// ==========================================
pub struct WorkOrderRepository {
    conn: Arc<Mutex<Connection>>,
    /// 新建 PM 工单的默认闲置策略 (配置层提供)
    default_idle_policy: IdlePolicy,
}

const WO_COLUMNS: &str = r#"work_order_id, tenant_id, asset_id, origin, source_plan_id,
    source_ticket_id, status, priority, approval_status, reason,
    scheduled_start, scheduled_end, actual_start, actual_end, sla_target_at,
    status_changed_at, assigned_technician, assigned_team, tasks_json,
    completion_pct, cost_labor, cost_parts, cost_external,
    idle_warning_hours, idle_escalation_hours, idle_auto_reassign_hours,
    created_by, updated_by, created_at, updated_at, revision"#;

impl WorkOrderRepository {
    /// 创建新的仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            default_idle_policy: IdlePolicy::default(),
        }
    }

    /// 指定默认闲置策略 (配置层读出后注入)
    ///
    /// 三档阈值必须严格递增, 否则保留默认策略
    pub fn with_default_idle_policy(mut self, policy: IdlePolicy) -> Self {
        if policy.is_increasing() {
            self.default_idle_policy = policy;
        } else {
            tracing::warn!(
                warning_hours = policy.warning_hours,
                escalation_hours = policy.escalation_hours,
                auto_reassign_hours = policy.auto_reassign_hours,
                "闲置阈值非递增, 保留默认策略"
            );
        }
        self
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建工单 (revision 从 0 起)
    pub fn create(&self, wo: &WorkOrder, actor: &str) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO work_order (
                work_order_id, tenant_id, asset_id, origin, source_plan_id,
                source_ticket_id, status, priority, approval_status, reason,
                scheduled_start, scheduled_end, actual_start, actual_end, sla_target_at,
                status_changed_at, assigned_technician, assigned_team, tasks_json,
                completion_pct, cost_labor, cost_parts, cost_external,
                idle_warning_hours, idle_escalation_hours, idle_auto_reassign_hours,
                created_by, updated_by, created_at, updated_at, revision
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)"#,
            params![
                &wo.work_order_id,
                &wo.tenant_id,
                &wo.asset_id,
                wo.origin.to_string(),
                &wo.source_plan_id,
                &wo.source_ticket_id,
                wo.status.to_string(),
                wo.priority.to_string(),
                wo.approval_status.to_string(),
                &wo.reason,
                wo.scheduled_start,
                wo.scheduled_end,
                wo.actual_start,
                wo.actual_end,
                wo.sla_target_at,
                wo.status_changed_at,
                &wo.assigned_technician,
                &wo.assigned_team,
                serde_json::to_string(&wo.tasks)?,
                wo.completion_pct as i64,
                wo.cost.labor,
                wo.cost.parts,
                wo.cost.external,
                wo.idle_policy.warning_hours,
                wo.idle_policy.escalation_hours,
                wo.idle_policy.auto_reassign_hours,
                &wo.created_by,
                &wo.updated_by,
                wo.created_at,
                wo.updated_at,
            ],
        )?;

        let log = ActionLog::new(&wo.work_order_id, ActionType::WoCreate, actor)
            .with_detail(&format!("origin={}", wo.origin));
        Self::insert_action_log(&conn, &log)?;

        Ok(wo.work_order_id.clone())
    }

    /// 按 work_order_id 查询
    pub fn find_by_id(&self, work_order_id: &str) -> RepositoryResult<Option<(WorkOrder, i64)>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            &format!("SELECT {WO_COLUMNS} FROM work_order WHERE work_order_id = ?"),
            params![work_order_id],
            Self::map_row,
        ) {
            Ok(pair) => Ok(Some(pair)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按租户 + 状态查询
    pub fn list_by_status(
        &self,
        tenant_id: &str,
        status: WorkOrderStatus,
    ) -> RepositoryResult<Vec<WorkOrder>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"SELECT {WO_COLUMNS} FROM work_order
               WHERE tenant_id = ? AND status = ?
               ORDER BY created_at"#
        ))?;

        let orders = stmt
            .query_map(params![tenant_id, status.to_string()], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|(wo, _)| wo)
            .collect();
        Ok(orders)
    }

    /// 保存工单 (乐观锁)
    ///
    /// # 参数
    /// - wo: 已由状态机变更后的工单
    /// - expected_revision: 读出时的 revision
    /// - action: 本次操作类型 (审计)
    ///
    /// # 返回
    /// - Ok(new_revision): 提交成功
    /// - Err(OptimisticLockFailure): revision 已被他人推进
    pub fn save(
        &self,
        wo: &WorkOrder,
        expected_revision: i64,
        action: ActionType,
        actor: &str,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            r#"UPDATE work_order SET
                status = ?, priority = ?, approval_status = ?, reason = ?,
                scheduled_start = ?, scheduled_end = ?, actual_start = ?, actual_end = ?,
                sla_target_at = ?, status_changed_at = ?,
                assigned_technician = ?, assigned_team = ?, tasks_json = ?,
                completion_pct = ?, cost_labor = ?, cost_parts = ?, cost_external = ?,
                updated_by = ?, updated_at = ?, revision = revision + 1
               WHERE work_order_id = ? AND revision = ?"#,
            params![
                wo.status.to_string(),
                wo.priority.to_string(),
                wo.approval_status.to_string(),
                &wo.reason,
                wo.scheduled_start,
                wo.scheduled_end,
                wo.actual_start,
                wo.actual_end,
                wo.sla_target_at,
                wo.status_changed_at,
                &wo.assigned_technician,
                &wo.assigned_team,
                serde_json::to_string(&wo.tasks)?,
                wo.completion_pct as i64,
                wo.cost.labor,
                wo.cost.parts,
                wo.cost.external,
                &wo.updated_by,
                wo.updated_at,
                &wo.work_order_id,
                expected_revision,
            ],
        )?;

        if affected == 0 {
            // 区分"不存在"与"版本冲突"
            let actual: Option<i64> = conn
                .query_row(
                    "SELECT revision FROM work_order WHERE work_order_id = ?",
                    params![&wo.work_order_id],
                    |row| row.get(0),
                )
                .ok();
            return match actual {
                Some(actual) => Err(RepositoryError::OptimisticLockFailure {
                    work_order_id: wo.work_order_id.clone(),
                    expected: expected_revision,
                    actual,
                }),
                None => Err(RepositoryError::NotFound {
                    entity: "WorkOrder".to_string(),
                    id: wo.work_order_id.clone(),
                }),
            };
        }

        let log = ActionLog::new(&wo.work_order_id, action, actor)
            .with_detail(&format!("status={}", wo.status));
        Self::insert_action_log(&conn, &log)?;

        Ok(expected_revision + 1)
    }

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

    /// 行映射, 返回 (工单, revision)
    fn map_row(row: &Row<'_>) -> rusqlite::Result<(WorkOrder, i64)> {
        let tasks_raw: String = row.get("tasks_json")?;
        let tasks: Vec<WorkOrderTask> = serde_json::from_str(&tasks_raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("tasks_json: {e}"),
                )),
            )
        })?;

        let origin_raw: String = row.get("origin")?;
        let status_raw: String = row.get("status")?;
        let priority_raw: String = row.get("priority")?;
        let approval_raw: String = row.get("approval_status")?;
        let completion: i64 = row.get("completion_pct")?;

        let wo = WorkOrder {
            work_order_id: row.get("work_order_id")?,
            tenant_id: row.get("tenant_id")?,
            asset_id: row.get("asset_id")?,
            origin: parse_origin(&origin_raw),
            source_plan_id: row.get("source_plan_id")?,
            source_ticket_id: row.get("source_ticket_id")?,
            status: parse_status(&status_raw),
            priority: parse_priority(&priority_raw),
            approval_status: parse_approval(&approval_raw),
            reason: row.get("reason")?,
            scheduled_start: row.get("scheduled_start")?,
            scheduled_end: row.get("scheduled_end")?,
            actual_start: row.get("actual_start")?,
            actual_end: row.get("actual_end")?,
            sla_target_at: row.get("sla_target_at")?,
            status_changed_at: row.get("status_changed_at")?,
            assigned_technician: row.get("assigned_technician")?,
            assigned_team: row.get("assigned_team")?,
            tasks,
            completion_pct: completion.clamp(0, 100) as u8,
            cost: CostBreakdown {
                labor: row.get("cost_labor")?,
                parts: row.get("cost_parts")?,
                external: row.get("cost_external")?,
            },
            idle_policy: IdlePolicy::new(
                row.get("idle_warning_hours")?,
                row.get("idle_escalation_hours")?,
                row.get("idle_auto_reassign_hours")?,
            ),
            created_by: row.get("created_by")?,
            updated_by: row.get("updated_by")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        };
        let revision: i64 = row.get("revision")?;
        Ok((wo, revision))
    }
}

fn parse_status(s: &str) -> WorkOrderStatus {
    match s {
        "SCHEDULED" => WorkOrderStatus::Scheduled,
        "IN_PROGRESS" => WorkOrderStatus::InProgress,
        "WAITING_PARTS" => WorkOrderStatus::WaitingParts,
        "WAITING_WINDOW" => WorkOrderStatus::WaitingWindow,
        "WAITING_CLIENT" => WorkOrderStatus::WaitingClient,
        "COMPLETED" => WorkOrderStatus::Completed,
        "APPROVED" => WorkOrderStatus::Approved,
        "CLOSED" => WorkOrderStatus::Closed,
        "REJECTED" => WorkOrderStatus::Rejected,
        "CANCELED" => WorkOrderStatus::Canceled,
        _ => WorkOrderStatus::Drafted,
    }
}

fn parse_origin(s: &str) -> WorkOrderOrigin {
    match s {
        "INCIDENT" => WorkOrderOrigin::Incident,
        "MANUAL" => WorkOrderOrigin::Manual,
        "CONDITION" => WorkOrderOrigin::Condition,
        _ => WorkOrderOrigin::Pm,
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

fn parse_approval(s: &str) -> ApprovalStatus {
    match s {
        "APPROVED" => ApprovalStatus::Approved,
        "REJECTED" => ApprovalStatus::Rejected,
        _ => ApprovalStatus::Pending,
    }
}

// ==========================================
// WorkOrderFactory 适配 - 由计划模板物化工单
// ==========================================
// 任务序号/工时/清单/备件/依赖自模板原样复制;
// 当季附加任务追加在模板之后, 标记为可选
#[async_trait]
impl WorkOrderFactory for WorkOrderRepository {
    async fn create_from_plan(
        &self,
        plan: &MaintenancePlan,
        extra_task_ids: &[String],
        actor: &str,
    ) -> Result<WorkOrder, CollaboratorError> {
        let now = Utc::now();

        let mut tasks: Vec<WorkOrderTask> = plan
            .task_template
            .iter()
            .map(|t| WorkOrderTask {
                seq_no: t.seq_no,
                name: t.name.clone(),
                estimated_minutes: t.estimated_minutes,
                depends_on: t.depends_on.clone(),
                checklist: t.checklist.clone(),
                required_parts: t.required_parts.clone(),
                is_optional: t.is_optional,
                is_done: false,
            })
            .collect();

        let mut next_seq = tasks.iter().map(|t| t.seq_no).max().unwrap_or(0);
        for extra in extra_task_ids {
            next_seq += 1;
            tasks.push(WorkOrderTask {
                seq_no: next_seq,
                name: extra.clone(),
                estimated_minutes: 0,
                depends_on: Vec::new(),
                checklist: Vec::new(),
                required_parts: Vec::new(),
                is_optional: true,
                is_done: false,
            });
        }

        let wo = WorkOrder {
            work_order_id: uuid::Uuid::new_v4().to_string(),
            tenant_id: plan.tenant_id.clone(),
            asset_id: plan.asset_id.clone(),
            origin: WorkOrderOrigin::Pm,
            source_plan_id: Some(plan.plan_id.clone()),
            source_ticket_id: None,
            status: WorkOrderStatus::Drafted,
            priority: plan.priority,
            approval_status: ApprovalStatus::Pending,
            reason: None,
            scheduled_start: None,
            scheduled_end: None,
            actual_start: None,
            actual_end: None,
            sla_target_at: None,
            status_changed_at: now,
            assigned_technician: None,
            assigned_team: None,
            tasks,
            completion_pct: 0,
            cost: CostBreakdown::default(),
            idle_policy: self.default_idle_policy,
            created_by: actor.to_string(),
            updated_by: actor.to_string(),
            created_at: now,
            updated_at: now,
        };

        self.create(&wo, actor)?;
        Ok(wo)
    }
}
