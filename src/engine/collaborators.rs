// ==========================================
// 设备预防性维护系统 - 引擎层协作方接口
// ==========================================
// 职责: 定义批量生成所依赖的外部协作方 trait, 实现依赖倒置
// 说明: Engine 层定义 trait, Repository/外层服务实现适配器
// 红线: Engine 不拼 SQL, 不负责通知投递, 只消费这些接口
// ==========================================

use crate::domain::plan::MaintenancePlan;
use crate::domain::types::IdleThresholdKind;
use crate::domain::work_order::WorkOrder;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::error::Error;

/// 协作方统一错误类型
pub type CollaboratorError = Box<dyn Error + Send + Sync>;

// ==========================================
// 生成落账结果
// ==========================================
// 去重键命中已有记录时返回 Duplicate, 计划排程不重复推进
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    Recorded,  // 首次落账, 排程已推进
    Duplicate, // 去重键重复, 本次为重试, 未做任何变更
}

// ==========================================
// PlanDirectory - 计划查询与落账协作方
// ==========================================
// 实现者: repository::MaintenancePlanRepository
#[async_trait]
pub trait PlanDirectory: Send + Sync {
    /// 查询租户下所有激活计划
    async fn find_active_plans(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<MaintenancePlan>, CollaboratorError>;

    /// 查询租户下 cutoff 之前到期 (或从未生成) 的激活计划
    async fn find_due_before(
        &self,
        tenant_id: &str,
        cutoff: NaiveDate,
    ) -> Result<Vec<MaintenancePlan>, CollaboratorError>;

    /// 查询 (plan_id, cycle_key) 是否已有生成台账
    ///
    /// 编排器在建单前调用: 重试已落账的周期不得再物化工单
    async fn generation_exists(
        &self,
        plan_id: &str,
        cycle_key: &str,
    ) -> Result<bool, CollaboratorError>;

    /// 记录一次生成并推进排程
    ///
    /// 必须作为单个事务执行: 写入生成台账 (按 cycle_key 去重) +
    /// 更新 last_generated_at / next_scheduled_at / generation_count。
    /// cycle_key 重复时不得变更计划, 返回 Duplicate
    async fn record_generation(
        &self,
        plan_id: &str,
        generated_at: DateTime<Utc>,
        next_scheduled_at: Option<NaiveDate>,
        cycle_key: &str,
    ) -> Result<GenerationOutcome, CollaboratorError>;
}

// ==========================================
// WorkOrderFactory - 工单创建协作方
// ==========================================
// 由计划任务模板物化工单任务 (序号/工时/清单/备件/依赖原样复制)
#[async_trait]
pub trait WorkOrderFactory: Send + Sync {
    /// 从到期计划创建工单
    ///
    /// # 参数
    /// - plan: 到期计划
    /// - extra_task_ids: 当季附加任务 (季节规则产出)
    /// - actor: 操作人 (编排器运行身份)
    async fn create_from_plan(
        &self,
        plan: &MaintenancePlan,
        extra_task_ids: &[String],
        actor: &str,
    ) -> Result<WorkOrder, CollaboratorError>;
}

// ==========================================
// MaintenanceNotifier - 通知协作方
// ==========================================
// 本核心只决定"何时发信号", 投递渠道由实现方负责
pub trait MaintenanceNotifier: Send + Sync {
    /// 工单越过闲置阈值
    fn idle_threshold_crossed(&self, work_order_id: &str, kind: IdleThresholdKind);

    /// 工单 SLA 已击穿
    fn sla_breached(&self, work_order_id: &str);
}

/// 空操作通知者
///
/// 用于不需要通知的场景 (如单元测试)
#[derive(Debug, Clone, Default)]
pub struct NoOpNotifier;

impl MaintenanceNotifier for NoOpNotifier {
    fn idle_threshold_crossed(&self, work_order_id: &str, kind: IdleThresholdKind) {
        tracing::debug!(
            "NoOpNotifier: 跳过闲置信号 - work_order={}, threshold={}",
            work_order_id,
            kind
        );
    }

    fn sla_breached(&self, work_order_id: &str) {
        tracing::debug!("NoOpNotifier: 跳过SLA信号 - work_order={}", work_order_id);
    }
}
