// ==========================================
// 设备预防性维护系统 - 引擎层错误类型
// ==========================================
// 依据: PM_Engine_Specs_v1.0.md - 7. 错误处理
// 工具: thiserror 派生宏
// 红线: 每个错误必须携带实体 id、所尝试的操作与被违反的约束,
//       使用方无需翻日志即可自诊断
// ==========================================

use crate::domain::types::{ExternalSignal, WorkOrderStatus};
use thiserror::Error;

/// 引擎层错误类型
///
/// 校验类错误 (InvalidFrequencyType/InvalidProgress/InvalidScheduleWindow)
/// 由调用方修正输入后重试; 状态类错误 (IllegalTransition/PlanNotDue/
/// RequiresExternalEvaluation) 表示当前状态下操作不成立, 不应自动重试
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 校验类错误 =====
    #[error("频率类型不合法: plan={plan_id}, trigger={trigger}, frequency={frequency}")]
    InvalidFrequencyType {
        plan_id: String,
        trigger: String,
        frequency: String,
    },

    #[error("频率规格不合法: plan={plan_id}, reason={reason}")]
    InvalidFrequencySpec { plan_id: String, reason: String },

    #[error("进度值越界: work_order={work_order_id}, progress={progress}, 允许范围 0..=100")]
    InvalidProgress { work_order_id: String, progress: i64 },

    #[error("排程窗口不合法: work_order={work_order_id}, start={start}, end={end}, 要求 start < end")]
    InvalidScheduleWindow {
        work_order_id: String,
        start: String,
        end: String,
    },

    // ===== 状态类错误 =====
    #[error("非法状态转换: work_order={work_order_id}, operation={operation}, from={from}, reason={reason}")]
    IllegalTransition {
        work_order_id: String,
        operation: String,
        from: WorkOrderStatus,
        reason: String,
    },

    #[error("计划未到期: plan={plan_id}, next_scheduled_at={next_scheduled_at}")]
    PlanNotDue {
        plan_id: String,
        next_scheduled_at: String,
    },

    #[error("需要外部信号评估: plan={plan_id}, signal={signal}, 无法纯日历计算下次日期")]
    RequiresExternalEvaluation {
        plan_id: String,
        signal: ExternalSignal,
    },

    // ===== 任务模板错误 =====
    #[error("任务模板依赖成环: owner={owner_id}, 环内任务 seq_no={cycle_members:?}")]
    TemplateCycle {
        owner_id: String,
        cycle_members: Vec<i32>,
    },

    #[error("任务模板不合法: owner={owner_id}, reason={reason}")]
    TemplateInvalid { owner_id: String, reason: String },

    // ===== 协作方错误 =====
    #[error("协作方调用失败: {0}")]
    Collaborator(#[from] anyhow::Error),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
