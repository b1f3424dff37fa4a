// ==========================================
// 数据仓储层集成测试
// ==========================================
// 场景: JSON 列往返 / 到期粗筛 / 生成落账去重 /
//       工单乐观锁 / 审计日志 / 配置读写
// ==========================================

mod test_helpers;

use chrono::{NaiveDate, Utc};
use maintenance_workorder::config::{config_keys, ConfigManager, MaintenanceConfigReader};
use maintenance_workorder::domain::action_log::ActionType;
use maintenance_workorder::domain::types::{Priority, TriggerType, WorkOrderStatus};
use maintenance_workorder::engine::{GenerationOutcome, WorkOrderLifecycle};
use maintenance_workorder::repository::{
    ActionLogRepository, MaintenancePlanRepository, RepositoryError, WorkOrderRepository,
};
use test_helpers::{create_test_plan, create_test_work_order, setup_test_db};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_plan_round_trip_preserves_json_columns() {
    let conn = setup_test_db();
    let repo = MaintenancePlanRepository::new(conn);

    let plan = create_test_plan("PLAN001", "T001");
    repo.create(&plan).unwrap();

    let stored = repo.find_by_id("PLAN001").unwrap().unwrap();
    assert_eq!(stored.plan_name, plan.plan_name);
    assert_eq!(stored.trigger_type, TriggerType::Time);
    assert_eq!(stored.priority, Priority::Medium);
    assert_eq!(stored.frequency, plan.frequency);
    assert_eq!(stored.task_template.len(), 2);
    assert_eq!(stored.task_template[0].checklist, vec!["油位", "油质"]);
    assert_eq!(stored.task_template[1].depends_on, vec![1]);
    assert_eq!(stored.effective_from, date(2024, 1, 1));
    assert!(stored.next_scheduled_at.is_none());

    assert!(repo.find_by_id("NO_SUCH").unwrap().is_none());
}

#[test]
fn test_find_due_coarse_filter() {
    let conn = setup_test_db();
    let repo = MaintenancePlanRepository::new(conn);

    // 从未生成 → 到期
    repo.create(&create_test_plan("P_NEVER", "T001")).unwrap();

    // 排程在截止日之后 → 不到期
    let mut future = create_test_plan("P_FUTURE", "T001");
    future.next_scheduled_at = Some(date(2024, 6, 1));
    repo.create(&future).unwrap();

    // 停用 → 不到期
    let mut inactive = create_test_plan("P_INACTIVE", "T001");
    inactive.is_active = false;
    repo.create(&inactive).unwrap();

    // 尚未生效 → 不到期
    let mut not_yet = create_test_plan("P_NOT_YET", "T001");
    not_yet.effective_from = date(2025, 1, 1);
    repo.create(&not_yet).unwrap();

    // 其他租户 → 不可见
    repo.create(&create_test_plan("P_OTHER", "T002")).unwrap();

    let due = repo.find_due("T001", date(2024, 3, 1)).unwrap();
    let ids: Vec<&str> = due.iter().map(|p| p.plan_id.as_str()).collect();
    assert_eq!(ids, vec!["P_NEVER"]);
}

#[test]
fn test_record_generation_dedup_by_cycle_key() {
    let conn = setup_test_db();
    let repo = MaintenancePlanRepository::new(conn);
    repo.create(&create_test_plan("PLAN002", "T001")).unwrap();

    let next = Some(date(2024, 2, 15));
    let outcome = repo
        .record_generation_tx("PLAN002", Utc::now(), next, "PLAN002:FIRST")
        .unwrap();
    assert_eq!(outcome, GenerationOutcome::Recorded);

    // 同一去重键重试: 不推进排程, 计数不变
    let outcome = repo
        .record_generation_tx("PLAN002", Utc::now(), Some(date(2024, 3, 15)), "PLAN002:FIRST")
        .unwrap();
    assert_eq!(outcome, GenerationOutcome::Duplicate);

    let stored = repo.find_by_id("PLAN002").unwrap().unwrap();
    assert_eq!(stored.generation_count, 1);
    assert_eq!(stored.next_scheduled_at, Some(date(2024, 2, 15)));

    // 新周期键正常落账
    let outcome = repo
        .record_generation_tx("PLAN002", Utc::now(), Some(date(2024, 3, 15)), "PLAN002:2024-02-15")
        .unwrap();
    assert_eq!(outcome, GenerationOutcome::Recorded);
    let stored = repo.find_by_id("PLAN002").unwrap().unwrap();
    assert_eq!(stored.generation_count, 2);
}

#[test]
fn test_set_active_writes_audit_and_rejects_missing() {
    let conn = setup_test_db();
    let repo = MaintenancePlanRepository::new(conn.clone());
    let logs = ActionLogRepository::new(conn);

    repo.create(&create_test_plan("PLAN003", "T001")).unwrap();
    repo.set_active("PLAN003", false, "admin01").unwrap();

    let stored = repo.find_by_id("PLAN003").unwrap().unwrap();
    assert!(!stored.is_active);

    let entries = logs.list_by_entity("PLAN003").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, ActionType::PlanDeactivate.as_str());
    assert_eq!(entries[0].1, "admin01");
    assert_eq!(entries[0].2.as_deref(), Some("停用计划"));

    let err = repo.set_active("NO_SUCH", false, "admin01").unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));
}

#[test]
fn test_work_order_round_trip_and_revision() {
    let conn = setup_test_db();
    let repo = WorkOrderRepository::new(conn);

    let wo = create_test_work_order("WO001", WorkOrderStatus::Drafted);
    repo.create(&wo, "user01").unwrap();

    let (stored, revision) = repo.find_by_id("WO001").unwrap().unwrap();
    assert_eq!(revision, 0);
    assert_eq!(stored.status, WorkOrderStatus::Drafted);
    assert_eq!(stored.idle_policy.warning_hours, 24);
    assert_eq!(stored.completion_pct, 0);
    assert!(stored.tasks.is_empty());
}

#[test]
fn test_optimistic_lock_rejects_stale_revision() {
    let conn = setup_test_db();
    let repo = WorkOrderRepository::new(conn);

    let wo = create_test_work_order("WO002", WorkOrderStatus::Drafted);
    repo.create(&wo, "user01").unwrap();

    // 两个调用方同时读出 revision 0
    let (mut copy_a, rev_a) = repo.find_by_id("WO002").unwrap().unwrap();
    let (mut copy_b, rev_b) = repo.find_by_id("WO002").unwrap().unwrap();
    assert_eq!(rev_a, rev_b);

    let now = Utc::now();
    WorkOrderLifecycle::schedule(
        &mut copy_a,
        now,
        now + chrono::Duration::hours(2),
        "dispatcher01",
    )
    .unwrap();
    let new_rev = repo
        .save(&copy_a, rev_a, ActionType::WoSchedule, "dispatcher01")
        .unwrap();
    assert_eq!(new_rev, 1);

    // 第二个提交携带过期 revision: 必须失败
    WorkOrderLifecycle::cancel(&mut copy_b, "重复操作", now, "dispatcher02").unwrap();
    let err = repo
        .save(&copy_b, rev_b, ActionType::WoCancel, "dispatcher02")
        .unwrap_err();
    match err {
        RepositoryError::OptimisticLockFailure {
            work_order_id,
            expected,
            actual,
        } => {
            assert_eq!(work_order_id, "WO002");
            assert_eq!(expected, 0);
            assert_eq!(actual, 1);
        }
        other => panic!("unexpected error: {other}"),
    }

    // 库内状态是第一个提交的结果
    let (stored, revision) = repo.find_by_id("WO002").unwrap().unwrap();
    assert_eq!(revision, 1);
    assert_eq!(stored.status, WorkOrderStatus::Scheduled);
}

#[test]
fn test_save_missing_work_order_is_not_found() {
    let conn = setup_test_db();
    let repo = WorkOrderRepository::new(conn);

    let ghost = create_test_work_order("WO_GHOST", WorkOrderStatus::Drafted);
    let err = repo
        .save(&ghost, 0, ActionType::WoSchedule, "user01")
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));
}

#[test]
fn test_every_write_leaves_audit_trail() {
    let conn = setup_test_db();
    let repo = WorkOrderRepository::new(conn.clone());
    let logs = ActionLogRepository::new(conn);

    let wo = create_test_work_order("WO003", WorkOrderStatus::Drafted);
    repo.create(&wo, "user01").unwrap();

    let (mut wo, rev) = repo.find_by_id("WO003").unwrap().unwrap();
    let now = Utc::now();
    WorkOrderLifecycle::schedule(&mut wo, now, now + chrono::Duration::hours(2), "d01").unwrap();
    let rev = repo.save(&wo, rev, ActionType::WoSchedule, "d01").unwrap();
    WorkOrderLifecycle::assign_technician(&mut wo, "tech01", "d01").unwrap();
    repo.save(&wo, rev, ActionType::WoAssign, "d01").unwrap();

    assert_eq!(logs.count_by_entity("WO003").unwrap(), 3);
    let entries = logs.list_by_entity("WO003").unwrap();
    assert_eq!(entries[0].0, ActionType::WoCreate.as_str());
    assert_eq!(entries[1].0, ActionType::WoSchedule.as_str());
    assert_eq!(entries[2].0, ActionType::WoAssign.as_str());
}

#[tokio::test]
async fn test_factory_applies_configured_idle_policy() {
    use maintenance_workorder::domain::work_order::IdlePolicy;
    use maintenance_workorder::engine::WorkOrderFactory;

    let conn = setup_test_db();
    let repo = WorkOrderRepository::new(conn).with_default_idle_policy(IdlePolicy::new(8, 16, 24));

    let plan = create_test_plan("PLAN004", "T001");
    let wo = repo.create_from_plan(&plan, &[], "scheduler").await.unwrap();

    let (stored, _) = repo.find_by_id(&wo.work_order_id).unwrap().unwrap();
    assert_eq!(stored.idle_policy.warning_hours, 8);
    assert_eq!(stored.idle_policy.auto_reassign_hours, 24);
    assert!(stored.idle_policy.is_increasing());
}

#[tokio::test]
async fn test_non_increasing_idle_policy_falls_back_to_default() {
    use maintenance_workorder::domain::work_order::IdlePolicy;
    use maintenance_workorder::engine::WorkOrderFactory;

    let conn = setup_test_db();
    // 阈值倒序注入: 保留默认策略
    let repo =
        WorkOrderRepository::new(conn).with_default_idle_policy(IdlePolicy::new(72, 48, 24));

    let plan = create_test_plan("PLAN005", "T001");
    let wo = repo.create_from_plan(&plan, &[], "scheduler").await.unwrap();

    let (stored, _) = repo.find_by_id(&wo.work_order_id).unwrap().unwrap();
    assert_eq!(stored.idle_policy.warning_hours, 24);
    assert_eq!(stored.idle_policy.escalation_hours, 48);
    assert_eq!(stored.idle_policy.auto_reassign_hours, 72);
}

#[test]
fn test_file_backed_schema_init_is_idempotent() {
    use maintenance_workorder::db::{init_schema, open_sqlite_connection};
    use std::sync::{Arc, Mutex};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pm.db");
    let path = path.to_str().unwrap();

    let conn = open_sqlite_connection(path).unwrap();
    init_schema(&conn).unwrap();
    // 重复建表不报错, 数据保留
    init_schema(&conn).unwrap();

    let repo = MaintenancePlanRepository::new(Arc::new(Mutex::new(conn)));
    repo.create(&create_test_plan("PLAN_FILE", "T001")).unwrap();

    let conn = open_sqlite_connection(path).unwrap();
    init_schema(&conn).unwrap();
    let repo = MaintenancePlanRepository::new(Arc::new(Mutex::new(conn)));
    assert!(repo.find_by_id("PLAN_FILE").unwrap().is_some());
}

#[tokio::test]
async fn test_config_manager_reads_with_fallback() {
    let conn = setup_test_db();
    let manager = ConfigManager::from_connection(conn).unwrap();

    // 表空时回落默认值
    assert_eq!(manager.get_generation_lookahead_days().await.unwrap(), 0);
    let policy = manager.get_default_idle_policy().await.unwrap();
    assert_eq!(policy.warning_hours, 24);
    assert_eq!(policy.escalation_hours, 48);
    assert_eq!(policy.auto_reassign_hours, 72);

    // 覆写后读到新值
    manager
        .set_config_value(config_keys::GENERATION_LOOKAHEAD_DAYS, "7")
        .unwrap();
    manager
        .set_config_value(config_keys::IDLE_WARNING_HOURS, "8")
        .unwrap();
    assert_eq!(manager.get_generation_lookahead_days().await.unwrap(), 7);
    assert_eq!(manager.get_default_idle_policy().await.unwrap().warning_hours, 8);

    // 不可解析值回落默认
    manager
        .set_config_value(config_keys::GENERATION_LOOKAHEAD_DAYS, "abc")
        .unwrap();
    assert_eq!(manager.get_generation_lookahead_days().await.unwrap(), 0);
}

#[tokio::test]
async fn test_config_rejects_non_increasing_idle_thresholds() {
    let conn = setup_test_db();
    let manager = ConfigManager::from_connection(conn).unwrap();

    // 提醒阈值被配得比升级阈值还高: 整组回落默认
    manager
        .set_config_value(config_keys::IDLE_WARNING_HOURS, "50")
        .unwrap();
    let policy = manager.get_default_idle_policy().await.unwrap();
    assert_eq!(policy.warning_hours, 24);
    assert_eq!(policy.escalation_hours, 48);
    assert_eq!(policy.auto_reassign_hours, 72);

    // 递增配置正常生效
    manager
        .set_config_value(config_keys::IDLE_WARNING_HOURS, "12")
        .unwrap();
    let policy = manager.get_default_idle_policy().await.unwrap();
    assert_eq!(policy.warning_hours, 12);
    assert!(policy.is_increasing());
}
