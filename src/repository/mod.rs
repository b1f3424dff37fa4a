// ==========================================
// 设备预防性维护系统 - 数据仓储层
// ==========================================
// 职责: SQLite 数据访问, 实现引擎层协作方接口
// 红线: Repository 不含业务逻辑
// ==========================================

pub mod action_log_repo;
pub mod error;
pub mod plan_repo;
pub mod work_order_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use plan_repo::MaintenancePlanRepository;
pub use work_order_repo::WorkOrderRepository;
