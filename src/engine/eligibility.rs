// ==========================================
// 设备预防性维护系统 - 计划到期评估引擎
// ==========================================
// 依据: PM_Engine_Specs_v1.0.md - 2.3 到期判定
// 职责: 仅依据计划自身状态判定"当前是否到期"
// 红线: 纯判定、无副作用; 单查与批量共用同一判定函数
// ==========================================

use crate::domain::plan::MaintenancePlan;
use crate::engine::error::{EngineError, EngineResult};
use chrono::NaiveDate;

// ==========================================
// PlanEligibilityEvaluator - 到期评估器 (纯函数)
// ==========================================
pub struct PlanEligibilityEvaluator;

impl PlanEligibilityEvaluator {
    /// 判定计划当前是否到期
    ///
    /// 四个条件全部成立才到期:
    /// 1. 计划处于激活状态
    /// 2. today ≥ effective_from
    /// 3. effective_to 未设置, 或 today ≤ effective_to
    /// 4. next_scheduled_at 未设置 (从未生成), 或 today ≥ next_scheduled_at
    pub fn is_due(plan: &MaintenancePlan, today: NaiveDate) -> bool {
        if !plan.is_active {
            return false;
        }
        if !plan.is_within_effective_window(today) {
            return false;
        }
        match plan.next_scheduled_at {
            None => true,
            Some(next) => today >= next,
        }
    }

    /// 从候选集中筛出到期子集 (批量生成用)
    pub fn due_set<'a>(
        plans: &'a [MaintenancePlan],
        today: NaiveDate,
    ) -> Vec<&'a MaintenancePlan> {
        plans.iter().filter(|p| Self::is_due(p, today)).collect()
    }

    /// 断言计划到期, 否则返回 PlanNotDue
    ///
    /// 编排器在逐计划处理前调用, 把"查询与处理之间状态已变"
    /// 暴露为显式错误而不是静默跳过
    pub fn ensure_due(plan: &MaintenancePlan, today: NaiveDate) -> EngineResult<()> {
        if Self::is_due(plan, today) {
            Ok(())
        } else {
            Err(EngineError::PlanNotDue {
                plan_id: plan.plan_id.clone(),
                next_scheduled_at: plan
                    .next_scheduled_at
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "UNSET".to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::plan::{FrequencySpec, TaskTemplateItem};
    use crate::domain::types::{Priority, TriggerType};
    use chrono::Utc;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn test_plan() -> MaintenancePlan {
        MaintenancePlan {
            plan_id: "P001".to_string(),
            tenant_id: "T001".to_string(),
            asset_id: "A001".to_string(),
            plan_name: "测试计划".to_string(),
            trigger_type: TriggerType::Time,
            frequency: FrequencySpec::monthly(1, None),
            seasonal_rules: Vec::new(),
            task_template: vec![TaskTemplateItem::new(1, "点检", 20)],
            priority: Priority::Medium,
            effective_from: d(2024, 1, 1),
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

    #[test]
    fn test_inactive_never_due() {
        let mut plan = test_plan();
        plan.is_active = false;
        // 其余条件全部满足也不到期
        assert!(!PlanEligibilityEvaluator::is_due(&plan, d(2024, 6, 1)));
    }

    #[test]
    fn test_never_generated_is_due_within_window() {
        let plan = test_plan();
        assert!(PlanEligibilityEvaluator::is_due(&plan, d(2024, 1, 15)));
    }

    #[test]
    fn test_before_effective_from_not_due() {
        let plan = test_plan();
        assert!(!PlanEligibilityEvaluator::is_due(&plan, d(2023, 12, 31)));
    }

    #[test]
    fn test_after_effective_to_not_due() {
        let mut plan = test_plan();
        plan.effective_to = Some(d(2024, 6, 30));
        assert!(PlanEligibilityEvaluator::is_due(&plan, d(2024, 6, 30)));
        assert!(!PlanEligibilityEvaluator::is_due(&plan, d(2024, 7, 1)));
    }

    #[test]
    fn test_next_scheduled_boundary() {
        let mut plan = test_plan();
        plan.next_scheduled_at = Some(d(2024, 2, 15));
        assert!(!PlanEligibilityEvaluator::is_due(&plan, d(2024, 2, 14)));
        assert!(PlanEligibilityEvaluator::is_due(&plan, d(2024, 2, 15)));
        assert!(PlanEligibilityEvaluator::is_due(&plan, d(2024, 3, 1)));
    }

    #[test]
    fn test_due_set_filters() {
        let due = test_plan();
        let mut inactive = test_plan();
        inactive.plan_id = "P002".to_string();
        inactive.is_active = false;
        let mut future = test_plan();
        future.plan_id = "P003".to_string();
        future.next_scheduled_at = Some(d(2024, 12, 1));

        let plans = vec![due, inactive, future];
        let set = PlanEligibilityEvaluator::due_set(&plans, d(2024, 1, 15));
        assert_eq!(set.len(), 1);
        assert_eq!(set[0].plan_id, "P001");
    }

    #[test]
    fn test_ensure_due_error_carries_context() {
        let mut plan = test_plan();
        plan.next_scheduled_at = Some(d(2024, 2, 15));
        let err = PlanEligibilityEvaluator::ensure_due(&plan, d(2024, 2, 1)).unwrap_err();
        match err {
            EngineError::PlanNotDue {
                plan_id,
                next_scheduled_at,
            } => {
                assert_eq!(plan_id, "P001");
                assert_eq!(next_scheduled_at, "2024-02-15");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
