// ==========================================
// 设备预防性维护系统 - 工单领域模型
// ==========================================
// 依据: PM_Engine_Specs_v1.0.md - 3. 工单
// 红线: 工单只软关闭 (终态), 不物理删除
// 不变量: completion_pct=100 当且仅当经由 complete 进入 COMPLETED;
//         actual_end 只在 {COMPLETED, APPROVED, CLOSED, REJECTED, CANCELED} 有值
// ==========================================

use crate::domain::types::{
    ApprovalStatus, IdleThresholdKind, Priority, WorkOrderOrigin, WorkOrderStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// IdlePolicy - 闲置升级策略
// ==========================================
// 三档递增阈值 (小时), 自 last_status_change 起算
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IdlePolicy {
    pub warning_hours: i64,       // 提醒阈值
    pub escalation_hours: i64,    // 升级阈值
    pub auto_reassign_hours: i64, // 建议改派阈值
}

impl IdlePolicy {
    pub fn new(warning_hours: i64, escalation_hours: i64, auto_reassign_hours: i64) -> Self {
        Self {
            warning_hours,
            escalation_hours,
            auto_reassign_hours,
        }
    }

    /// 阈值档位对应的小时数
    pub fn hours_for(&self, kind: IdleThresholdKind) -> i64 {
        match kind {
            IdleThresholdKind::Warning => self.warning_hours,
            IdleThresholdKind::Escalation => self.escalation_hours,
            IdleThresholdKind::AutoReassign => self.auto_reassign_hours,
        }
    }

    /// 三档阈值是否严格递增
    pub fn is_increasing(&self) -> bool {
        self.warning_hours < self.escalation_hours
            && self.escalation_hours < self.auto_reassign_hours
    }
}

impl Default for IdlePolicy {
    fn default() -> Self {
        // 默认 24h 提醒 / 48h 升级 / 72h 建议改派
        Self::new(24, 48, 72)
    }
}

// ==========================================
// CostBreakdown - 成本构成
// ==========================================
// 不变量: total = labor + parts + external (派生值, 不单独赋值)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub labor: f64,    // 人工成本
    pub parts: f64,    // 备件成本
    pub external: f64, // 外委成本
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.labor + self.parts + self.external
    }
}

// ==========================================
// WorkOrderTask - 工单任务
// ==========================================
// 由计划任务模板物化而来 (序号/工时/清单/备件/依赖原样复制)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrderTask {
    pub seq_no: i32,                 // 序号 (工单内唯一)
    pub name: String,                // 任务名称
    pub estimated_minutes: i32,      // 预计工时 (分钟)
    pub depends_on: Vec<i32>,        // 前置任务 seq_no
    pub checklist: Vec<String>,      // 检查项清单
    pub required_parts: Vec<String>, // 所需备件
    pub is_optional: bool,           // 是否可选
    pub is_done: bool,               // 是否完成
}

// ==========================================
// WorkOrder - 维护工单
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
    // ===== 主键与归属 =====
    pub work_order_id: String,             // 工单ID
    pub tenant_id: String,                 // 租户ID
    pub asset_id: String,                  // 设备ID

    // ===== 来源 =====
    pub origin: WorkOrderOrigin,           // 工单来源
    pub source_plan_id: Option<String>,    // 来源维护计划 (PM 工单)
    pub source_ticket_id: Option<String>,  // 来源故障单 (故障转入)

    // ===== 状态与优先级 =====
    pub status: WorkOrderStatus,           // 状态 (封闭枚举)
    pub priority: Priority,                // 优先级
    pub approval_status: ApprovalStatus,   // 审批状态
    pub reason: Option<String>,            // 驳回/取消原因

    // ===== 排程与执行时间 =====
    pub scheduled_start: Option<DateTime<Utc>>, // 计划开始
    pub scheduled_end: Option<DateTime<Utc>>,   // 计划结束
    pub actual_start: Option<DateTime<Utc>>,    // 实际开始 (首次 start 固定)
    pub actual_end: Option<DateTime<Utc>>,      // 实际结束 (终态邻近状态才有值)
    pub sla_target_at: Option<DateTime<Utc>>,   // SLA 目标时刻
    pub status_changed_at: DateTime<Utc>,       // 最近状态变更时刻 (闲置计时基准)

    // ===== 指派 (技师与班组互斥) =====
    pub assigned_technician: Option<String>, // 指派技师
    pub assigned_team: Option<String>,       // 指派班组

    // ===== 执行内容 =====
    pub tasks: Vec<WorkOrderTask>,         // 工单任务
    pub completion_pct: u8,                // 完成百分比 (0..=100)
    pub cost: CostBreakdown,               // 成本构成
    pub idle_policy: IdlePolicy,           // 闲置升级策略

    // ===== 审计字段 =====
    pub created_by: String,                // 创建人
    pub updated_by: String,                // 最近操作人
    pub created_at: DateTime<Utc>,         // 创建时间
    pub updated_at: DateTime<Utc>,         // 更新时间
}

impl WorkOrder {
    /// 是否已逾期
    ///
    /// 条件: 设置了 SLA 目标, now 已超过目标, 且工作尚未完结
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.sla_target_at {
            Some(target) => now > target && !self.status.is_settled(),
            None => false,
        }
    }

    /// 是否在 SLA 之内
    ///
    /// 未设置 SLA 目标视为达标; 已完结的工单以 actual_end 比对,
    /// 未完结的以 now 比对
    pub fn is_within_sla(&self, now: DateTime<Utc>) -> bool {
        let target = match self.sla_target_at {
            Some(t) => t,
            None => return true,
        };
        let reference = match self.actual_end {
            Some(end) if self.status.is_settled() => end,
            _ => now,
        };
        reference <= target
    }

    /// 当前闲置时长
    ///
    /// 仅执行中/等待类状态累计; 其余状态视为无闲置
    pub fn idle_duration(&self, now: DateTime<Utc>) -> chrono::Duration {
        if !self.status.tracks_idle() {
            return chrono::Duration::zero();
        }
        now.signed_duration_since(self.status_changed_at)
    }

    /// 已越过的闲置阈值档位 (升序)
    ///
    /// 越档只产生通知信号, 不改变工单状态
    pub fn crossed_idle_thresholds(&self, now: DateTime<Utc>) -> Vec<IdleThresholdKind> {
        let idle_hours = self.idle_duration(now).num_hours();
        let mut crossed = Vec::new();
        for kind in [
            IdleThresholdKind::Warning,
            IdleThresholdKind::Escalation,
            IdleThresholdKind::AutoReassign,
        ] {
            if idle_hours >= self.idle_policy.hours_for(kind) {
                crossed.push(kind);
            }
        }
        crossed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_order(status: WorkOrderStatus) -> WorkOrder {
        let now = Utc::now();
        WorkOrder {
            work_order_id: "WO001".to_string(),
            tenant_id: "T001".to_string(),
            asset_id: "A001".to_string(),
            origin: WorkOrderOrigin::Manual,
            source_plan_id: None,
            source_ticket_id: None,
            status,
            priority: Priority::Medium,
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
            tasks: Vec::new(),
            completion_pct: 0,
            cost: CostBreakdown::default(),
            idle_policy: IdlePolicy::default(),
            created_by: "user01".to_string(),
            updated_by: "user01".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_cost_total_is_derived() {
        let cost = CostBreakdown {
            labor: 100.0,
            parts: 50.5,
            external: 20.0,
        };
        assert!((cost.total() - 170.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_overdue_requires_sla_and_unsettled() {
        let now = Utc::now();
        let mut wo = test_order(WorkOrderStatus::InProgress);

        // 未设置 SLA → 不逾期
        assert!(!wo.is_overdue(now));

        wo.sla_target_at = Some(now - Duration::hours(1));
        assert!(wo.is_overdue(now));

        // 已完结 → 不再计逾期
        wo.status = WorkOrderStatus::Completed;
        assert!(!wo.is_overdue(now));
    }

    #[test]
    fn test_within_sla_uses_actual_end_when_settled() {
        let now = Utc::now();
        let mut wo = test_order(WorkOrderStatus::Completed);
        wo.sla_target_at = Some(now - Duration::hours(2));
        wo.actual_end = Some(now - Duration::hours(3));

        // 完结时刻早于 SLA 目标 → 达标, 即使 now 已超时
        assert!(wo.is_within_sla(now));

        wo.actual_end = Some(now - Duration::hours(1));
        assert!(!wo.is_within_sla(now));
    }

    #[test]
    fn test_idle_only_tracked_in_progress_or_waiting() {
        let now = Utc::now();
        let mut wo = test_order(WorkOrderStatus::Scheduled);
        wo.status_changed_at = now - Duration::hours(100);

        assert_eq!(wo.idle_duration(now), Duration::zero());
        assert!(wo.crossed_idle_thresholds(now).is_empty());

        wo.status = WorkOrderStatus::WaitingParts;
        assert_eq!(
            wo.crossed_idle_thresholds(now),
            vec![
                IdleThresholdKind::Warning,
                IdleThresholdKind::Escalation,
                IdleThresholdKind::AutoReassign
            ]
        );
    }

    #[test]
    fn test_idle_thresholds_partial_crossing() {
        let now = Utc::now();
        let mut wo = test_order(WorkOrderStatus::InProgress);

        // 低于提醒阈值 → 无信号
        wo.status_changed_at = now - Duration::hours(10);
        assert!(wo.crossed_idle_thresholds(now).is_empty());

        // 越过提醒与升级, 未到改派
        wo.status_changed_at = now - Duration::hours(50);
        assert_eq!(
            wo.crossed_idle_thresholds(now),
            vec![IdleThresholdKind::Warning, IdleThresholdKind::Escalation]
        );
    }
}
