// ==========================================
// 设备预防性维护系统 - 工单生命周期状态机
// ==========================================
// 依据: PM_Engine_Specs_v1.0.md - 4. 工单状态机
// 职责: 校验并执行工单状态转换, 维护进度/SLA/闲置不变量
// 红线: allowed() 转换表是唯一事实来源; 所有守卫违例抛出
//       具名错误 (IllegalTransition/InvalidProgress/InvalidScheduleWindow),
//       绝不静默吞掉
// 约定: 同一工单的转换必须由持久层按工单串行化 (乐观/悲观并发控制),
//       两个并发 complete 不得同时成功
// ==========================================

use crate::domain::types::{ApprovalStatus, IdleThresholdKind, WorkOrderStatus};
use crate::domain::work_order::WorkOrder;
use crate::engine::collaborators::MaintenanceNotifier;
use crate::engine::error::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

// ==========================================
// WaitingKind - 等待类状态细分
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitingKind {
    Parts,  // 等待备件
    Window, // 等待检修窗口
    Client, // 等待客户确认
}

impl WaitingKind {
    fn status(self) -> WorkOrderStatus {
        match self {
            WaitingKind::Parts => WorkOrderStatus::WaitingParts,
            WaitingKind::Window => WorkOrderStatus::WaitingWindow,
            WaitingKind::Client => WorkOrderStatus::WaitingClient,
        }
    }
}

// ==========================================
// WorkOrderLifecycle - 工单状态机 (无状态)
// ==========================================
pub struct WorkOrderLifecycle;

impl WorkOrderLifecycle {
    /// 状态转换表 - 唯一事实来源
    ///
    /// 主干: DRAFTED → SCHEDULED → IN_PROGRESS ⇄ WAITING_* → COMPLETED
    ///       → APPROVED → CLOSED
    /// 旁路: REJECTED 可自任何未关闭状态进入;
    ///       CANCELED 可自任何未完结状态进入
    pub fn allowed(from: WorkOrderStatus, to: WorkOrderStatus) -> bool {
        use WorkOrderStatus::*;
        match (from, to) {
            (Drafted, Scheduled) => true,
            (Scheduled, InProgress) => true,
            (InProgress, WaitingParts | WaitingWindow | WaitingClient) => true,
            (WaitingParts | WaitingWindow | WaitingClient, InProgress) => true,
            (InProgress, Completed) => true,
            (Completed, Approved) => true,
            (Approved, Closed) => true,
            // 驳回: 关闭前任何时点均可记录
            (f, Rejected) => !f.is_terminal(),
            // 取消: 已完结 (COMPLETED/APPROVED/CLOSED) 与终态不可取消
            (f, Canceled) => !f.is_settled() && !f.is_terminal(),
            _ => false,
        }
    }

    /// 排程: 设置计划窗口, 草稿态推进到已排程
    ///
    /// 守卫: start < end; 已完结/终态工单不可再排程
    pub fn schedule(
        wo: &mut WorkOrder,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        actor: &str,
    ) -> EngineResult<()> {
        if start >= end {
            return Err(EngineError::InvalidScheduleWindow {
                work_order_id: wo.work_order_id.clone(),
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        if wo.status.is_settled() || wo.status.is_terminal() {
            return Err(Self::illegal(wo, "schedule", "工单已完结或处于终态"));
        }

        wo.scheduled_start = Some(start);
        wo.scheduled_end = Some(end);
        if wo.status == WorkOrderStatus::Drafted {
            Self::transition(wo, WorkOrderStatus::Scheduled, "schedule", actor)?;
        } else {
            Self::touch(wo, actor);
            debug!(work_order_id = %wo.work_order_id, "仅更新排程窗口, 状态不变");
        }
        Ok(())
    }

    /// 指派技师 (与班组互斥, 指派一方清除另一方)
    pub fn assign_technician(wo: &mut WorkOrder, technician: &str, actor: &str) -> EngineResult<()> {
        if wo.status.is_settled() || wo.status.is_terminal() {
            return Err(Self::illegal(wo, "assign_technician", "工单已完结或处于终态"));
        }
        wo.assigned_technician = Some(technician.to_string());
        wo.assigned_team = None;
        Self::touch(wo, actor);
        Ok(())
    }

    /// 指派班组 (与技师互斥)
    pub fn assign_team(wo: &mut WorkOrder, team: &str, actor: &str) -> EngineResult<()> {
        if wo.status.is_settled() || wo.status.is_terminal() {
            return Err(Self::illegal(wo, "assign_team", "工单已完结或处于终态"));
        }
        wo.assigned_team = Some(team.to_string());
        wo.assigned_technician = None;
        Self::touch(wo, actor);
        Ok(())
    }

    /// 开工: 仅限已排程且已指派技师; actual_start 仅首次设置
    pub fn start(wo: &mut WorkOrder, now: DateTime<Utc>, actor: &str) -> EngineResult<()> {
        if wo.status != WorkOrderStatus::Scheduled {
            return Err(Self::illegal(wo, "start", "仅允许自 SCHEDULED 开工"));
        }
        if wo.assigned_technician.is_none() {
            return Err(Self::illegal(wo, "start", "未指派技师"));
        }
        Self::transition(wo, WorkOrderStatus::InProgress, "start", actor)?;
        if wo.actual_start.is_none() {
            wo.actual_start = Some(now);
        }
        Ok(())
    }

    /// 进入等待: 仅限执行中
    pub fn hold(wo: &mut WorkOrder, kind: WaitingKind, actor: &str) -> EngineResult<()> {
        Self::transition(wo, kind.status(), "hold", actor)
    }

    /// 恢复执行: 仅限等待类状态
    pub fn resume(wo: &mut WorkOrder, actor: &str) -> EngineResult<()> {
        Self::transition(wo, WorkOrderStatus::InProgress, "resume", actor)
    }

    /// 更新完成百分比: 0..=100, 不单独改变状态
    pub fn update_progress(wo: &mut WorkOrder, progress: u8, actor: &str) -> EngineResult<()> {
        if wo.status.is_settled() || wo.status.is_terminal() {
            return Err(Self::illegal(wo, "update_progress", "工单已完结或处于终态"));
        }
        if progress > 100 {
            return Err(EngineError::InvalidProgress {
                work_order_id: wo.work_order_id.clone(),
                progress: progress as i64,
            });
        }
        wo.completion_pct = progress;
        Self::touch(wo, actor);
        Ok(())
    }

    /// 完工: 仅限执行中且进度恰为 100; 设置 actual_end
    pub fn complete(wo: &mut WorkOrder, now: DateTime<Utc>, actor: &str) -> EngineResult<()> {
        if wo.status != WorkOrderStatus::InProgress {
            return Err(Self::illegal(wo, "complete", "仅允许自 IN_PROGRESS 完工"));
        }
        if wo.completion_pct != 100 {
            return Err(Self::illegal(
                wo,
                "complete",
                &format!("completion_pct={}, 要求恰为 100", wo.completion_pct),
            ));
        }
        Self::transition(wo, WorkOrderStatus::Completed, "complete", actor)?;
        wo.completion_pct = 100;
        wo.actual_end = Some(now);
        Ok(())
    }

    /// 审批通过: 仅限已完工
    pub fn approve(wo: &mut WorkOrder, actor: &str) -> EngineResult<()> {
        Self::transition(wo, WorkOrderStatus::Approved, "approve", actor)?;
        wo.approval_status = ApprovalStatus::Approved;
        Ok(())
    }

    /// 驳回: 关闭前任何时点; 记录原因
    pub fn reject(
        wo: &mut WorkOrder,
        reason: &str,
        now: DateTime<Utc>,
        actor: &str,
    ) -> EngineResult<()> {
        Self::transition(wo, WorkOrderStatus::Rejected, "reject", actor)?;
        wo.approval_status = ApprovalStatus::Rejected;
        wo.reason = Some(reason.to_string());
        if wo.actual_end.is_none() {
            wo.actual_end = Some(now);
        }
        Ok(())
    }

    /// 取消: 已完结工单不可取消; 记录原因
    pub fn cancel(
        wo: &mut WorkOrder,
        reason: &str,
        now: DateTime<Utc>,
        actor: &str,
    ) -> EngineResult<()> {
        Self::transition(wo, WorkOrderStatus::Canceled, "cancel", actor)?;
        wo.reason = Some(reason.to_string());
        if wo.actual_end.is_none() {
            wo.actual_end = Some(now);
        }
        Ok(())
    }

    /// 关闭: 仅限已审批
    pub fn close(wo: &mut WorkOrder, actor: &str) -> EngineResult<()> {
        Self::transition(wo, WorkOrderStatus::Closed, "close", actor)
    }

    /// 闲置评估 (只读): 越过的阈值逐档发信号, 不改变状态
    pub fn evaluate_idle(
        wo: &WorkOrder,
        now: DateTime<Utc>,
        notifier: &dyn MaintenanceNotifier,
    ) -> Vec<IdleThresholdKind> {
        let crossed = wo.crossed_idle_thresholds(now);
        for kind in &crossed {
            notifier.idle_threshold_crossed(&wo.work_order_id, *kind);
        }
        crossed
    }

    /// SLA 评估 (只读): 逾期则发击穿信号
    pub fn evaluate_sla(
        wo: &WorkOrder,
        now: DateTime<Utc>,
        notifier: &dyn MaintenanceNotifier,
    ) -> bool {
        let overdue = wo.is_overdue(now);
        if overdue {
            notifier.sla_breached(&wo.work_order_id);
        }
        overdue
    }

    // ===== 内部辅助 =====

    /// 按转换表执行状态变更, 刷新闲置计时基准
    fn transition(
        wo: &mut WorkOrder,
        to: WorkOrderStatus,
        operation: &str,
        actor: &str,
    ) -> EngineResult<()> {
        if !Self::allowed(wo.status, to) {
            return Err(Self::illegal(
                wo,
                operation,
                &format!("转换表不允许 {} → {}", wo.status, to),
            ));
        }
        let from = wo.status;
        wo.status = to;
        wo.status_changed_at = Utc::now();
        Self::touch(wo, actor);
        info!(
            work_order_id = %wo.work_order_id,
            operation = operation,
            from = %from,
            to = %to,
            actor = actor,
            "工单状态转换"
        );
        Ok(())
    }

    fn touch(wo: &mut WorkOrder, actor: &str) {
        wo.updated_by = actor.to_string();
        wo.updated_at = Utc::now();
    }

    fn illegal(wo: &WorkOrder, operation: &str, reason: &str) -> EngineError {
        EngineError::IllegalTransition {
            work_order_id: wo.work_order_id.clone(),
            operation: operation.to_string(),
            from: wo.status,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use WorkOrderStatus::*;

    const ALL: [WorkOrderStatus; 11] = [
        Drafted,
        Scheduled,
        InProgress,
        WaitingParts,
        WaitingWindow,
        WaitingClient,
        Completed,
        Approved,
        Closed,
        Rejected,
        Canceled,
    ];

    #[test]
    fn test_mainline_edges() {
        assert!(WorkOrderLifecycle::allowed(Drafted, Scheduled));
        assert!(WorkOrderLifecycle::allowed(Scheduled, InProgress));
        assert!(WorkOrderLifecycle::allowed(InProgress, WaitingParts));
        assert!(WorkOrderLifecycle::allowed(WaitingClient, InProgress));
        assert!(WorkOrderLifecycle::allowed(InProgress, Completed));
        assert!(WorkOrderLifecycle::allowed(Completed, Approved));
        assert!(WorkOrderLifecycle::allowed(Approved, Closed));
    }

    #[test]
    fn test_no_skipping_mainline() {
        assert!(!WorkOrderLifecycle::allowed(Drafted, InProgress));
        assert!(!WorkOrderLifecycle::allowed(Scheduled, Completed));
        assert!(!WorkOrderLifecycle::allowed(WaitingParts, Completed));
        assert!(!WorkOrderLifecycle::allowed(Completed, Closed));
        assert!(!WorkOrderLifecycle::allowed(Drafted, Approved));
    }

    #[test]
    fn test_reject_from_any_non_terminal() {
        for from in ALL {
            let expect = !from.is_terminal();
            assert_eq!(
                WorkOrderLifecycle::allowed(from, Rejected),
                expect,
                "reject from {from}"
            );
        }
    }

    #[test]
    fn test_cancel_blocked_after_settled() {
        assert!(WorkOrderLifecycle::allowed(Drafted, Canceled));
        assert!(WorkOrderLifecycle::allowed(WaitingWindow, Canceled));
        assert!(!WorkOrderLifecycle::allowed(Completed, Canceled));
        assert!(!WorkOrderLifecycle::allowed(Approved, Canceled));
        assert!(!WorkOrderLifecycle::allowed(Closed, Canceled));
        assert!(!WorkOrderLifecycle::allowed(Canceled, Canceled));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for to in ALL {
            assert!(!WorkOrderLifecycle::allowed(Closed, to), "closed -> {to}");
            assert!(!WorkOrderLifecycle::allowed(Canceled, to), "canceled -> {to}");
            // REJECTED 自身也是终态
            assert!(!WorkOrderLifecycle::allowed(Rejected, to), "rejected -> {to}");
        }
    }
}
