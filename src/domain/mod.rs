// ==========================================
// 设备预防性维护系统 - 领域模型层
// ==========================================
// 依据: PM_Engine_Specs_v1.0.md - 1/3/6 主实体定义
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod plan;
pub mod types;
pub mod work_order;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use plan::{FrequencySpec, MaintenancePlan, SeasonalAdjustment, TaskTemplateItem};
pub use types::{
    ApprovalStatus, ExternalSignal, FrequencyType, IdleThresholdKind, Priority, Season,
    TriggerType, WorkOrderOrigin, WorkOrderStatus,
};
pub use work_order::{CostBreakdown, IdlePolicy, WorkOrder, WorkOrderTask};
