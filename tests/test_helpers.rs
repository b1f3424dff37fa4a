// ==========================================
// 集成测试辅助函数
// ==========================================
// 职责: 内存库初始化 + 测试实体构造
// ==========================================

use chrono::{NaiveDate, Utc};
use maintenance_workorder::db::{init_schema, open_in_memory_connection};
use maintenance_workorder::domain::plan::{FrequencySpec, MaintenancePlan, TaskTemplateItem};
use maintenance_workorder::domain::types::{
    ApprovalStatus, Priority, TriggerType, WorkOrderOrigin, WorkOrderStatus,
};
use maintenance_workorder::domain::work_order::{CostBreakdown, IdlePolicy, WorkOrder};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// 初始化内存库并建表
pub fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = open_in_memory_connection().expect("打开内存库失败");
    init_schema(&conn).expect("建表失败");
    Arc::new(Mutex::new(conn))
}

/// 创建测试用维护计划 (月频率, 2024-01-01 生效, 从未生成)
pub fn create_test_plan(plan_id: &str, tenant_id: &str) -> MaintenancePlan {
    let mut lubricate = TaskTemplateItem::new(1, "润滑点检", 30);
    lubricate.checklist = vec!["油位".to_string(), "油质".to_string()];
    lubricate.required_parts = vec!["润滑脂".to_string()];
    let mut retighten = TaskTemplateItem::new(2, "螺栓复紧", 20);
    retighten.depends_on = vec![1];

    MaintenancePlan {
        plan_id: plan_id.to_string(),
        tenant_id: tenant_id.to_string(),
        asset_id: format!("ASSET_{plan_id}"),
        plan_name: format!("测试计划 {plan_id}"),
        trigger_type: TriggerType::Time,
        frequency: FrequencySpec::monthly(1, None),
        seasonal_rules: Vec::new(),
        task_template: vec![lubricate, retighten],
        priority: Priority::Medium,
        effective_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        effective_to: None,
        is_active: true,
        last_generated_at: None,
        next_scheduled_at: None,
        generation_count: 0,
        created_by: "planner01".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// 创建测试用工单
pub fn create_test_work_order(work_order_id: &str, status: WorkOrderStatus) -> WorkOrder {
    let now = Utc::now();
    WorkOrder {
        work_order_id: work_order_id.to_string(),
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
