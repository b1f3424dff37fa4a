// ==========================================
// 设备预防性维护系统 - 核心库
// ==========================================
// 依据: PM_Engine_Specs_v1.0.md
// 系统定位: 维护计划到期判定 + 工单批量生成 + 工单生命周期
// 说明: 本库不拥有任何传输/界面表面, 由外层服务调用;
//       通知投递、租户路由、鉴权均为外部协作方
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施 (连接初始化/PRAGMA/建表统一)
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    ApprovalStatus, ExternalSignal, FrequencyType, IdleThresholdKind, Priority, Season,
    TriggerType, WorkOrderOrigin, WorkOrderStatus,
};

// 领域实体
pub use domain::{
    ActionLog, ActionType, CostBreakdown, FrequencySpec, IdlePolicy, MaintenancePlan,
    SeasonalAdjustment, TaskTemplateItem, WorkOrder, WorkOrderTask,
};

// 引擎
pub use engine::{
    EngineError, EngineResult, GenerationError, GenerationOutcome, GenerationRunResult,
    MaintenanceNotifier, NoOpNotifier, PlanDirectory, PlanEligibilityEvaluator,
    RecurrenceCalculator, ScheduledGenerationOrchestrator, SeasonalAdjuster, TemplateValidator,
    WaitingKind, WorkOrderFactory, WorkOrderLifecycle,
};

// 配置
pub use config::{ConfigManager, MaintenanceConfigReader, StaticConfig};

// 仓储
pub use repository::{
    ActionLogRepository, MaintenancePlanRepository, RepositoryError, WorkOrderRepository,
};

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
