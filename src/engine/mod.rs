// ==========================================
// 设备预防性维护系统 - 引擎层
// ==========================================
// 依据: PM_Engine_Specs_v1.0.md - 2/4 引擎体系
// ==========================================
// 职责: 实现周期/到期/生成/状态机业务规则,不拼 SQL
// 红线: Engine 不拼 SQL; 所有守卫违例必须携带实体 id 与原因
// ==========================================

pub mod collaborators;
pub mod eligibility;
pub mod error;
pub mod lifecycle;
pub mod orchestrator;
pub mod recurrence;
pub mod seasonal;
pub mod template;

// 重导出核心引擎
pub use collaborators::{
    CollaboratorError, GenerationOutcome, MaintenanceNotifier, NoOpNotifier, PlanDirectory,
    WorkOrderFactory,
};
pub use eligibility::PlanEligibilityEvaluator;
pub use error::{EngineError, EngineResult};
pub use lifecycle::{WaitingKind, WorkOrderLifecycle};
pub use orchestrator::{GenerationError, GenerationRunResult, ScheduledGenerationOrchestrator};
pub use recurrence::RecurrenceCalculator;
pub use seasonal::SeasonalAdjuster;
pub use template::TemplateValidator;
