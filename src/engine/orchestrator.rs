// ==========================================
// 设备预防性维护系统 - 批量生成编排器
// ==========================================
// 依据: PM_Engine_Specs_v1.0.md - 2.4 批量生成
// 职责: 对租户全量到期计划执行"建单 + 排程推进", 逐计划隔离失败
// 红线: 单个计划失败只记录错误, 永不中断整批
// 约定: 同一租户的并发运行必须由调用方串行化 (租户级外部锁),
//       否则两次运行会同时看到同一到期计划并重复建单
// ==========================================

use crate::config::MaintenanceConfigReader;
use crate::domain::plan::MaintenancePlan;
use crate::engine::collaborators::{GenerationOutcome, PlanDirectory, WorkOrderFactory};
use crate::engine::eligibility::PlanEligibilityEvaluator;
use crate::engine::recurrence::RecurrenceCalculator;
use crate::engine::seasonal::SeasonalAdjuster;
use crate::engine::error::{EngineError, EngineResult};
use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// ==========================================
// GenerationError - 单计划失败记录
// ==========================================
#[derive(Debug, Clone)]
pub struct GenerationError {
    pub plan_id: String,
    pub message: String,
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.plan_id, self.message)
    }
}

// ==========================================
// GenerationRunResult - 批量生成结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct GenerationRunResult {
    pub processed: usize,              // 处理的到期计划数
    pub generated: usize,              // 成功生成的工单数
    pub deduplicated: usize,           // 去重键命中的重试数 (未重复生成)
    pub errors: Vec<GenerationError>,  // 逐计划错误列表
}

// ==========================================
// ScheduledGenerationOrchestrator - 批量生成编排器
// ==========================================
pub struct ScheduledGenerationOrchestrator<C>
where
    C: MaintenanceConfigReader,
{
    config: Arc<C>,
    plans: Arc<dyn PlanDirectory>,
    factory: Arc<dyn WorkOrderFactory>,
}

impl<C> ScheduledGenerationOrchestrator<C>
where
    C: MaintenanceConfigReader,
{
    /// 创建新的编排器实例
    pub fn new(
        config: Arc<C>,
        plans: Arc<dyn PlanDirectory>,
        factory: Arc<dyn WorkOrderFactory>,
    ) -> Self {
        Self {
            config,
            plans,
            factory,
        }
    }

    /// 执行一次租户级批量生成
    ///
    /// # 参数
    /// - tenant_id: 租户ID
    /// - today: 当前日期 (判定基准)
    /// - actor: 操作人 (编排器运行身份, 记入工单审计字段)
    ///
    /// # 返回
    /// 批量结果; 仅当到期集查询本身失败才返回 Err,
    /// 逐计划失败一律收敛进 errors
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn run(
        &self,
        tenant_id: &str,
        today: NaiveDate,
        actor: &str,
    ) -> EngineResult<GenerationRunResult> {
        let lookahead_days = self
            .config
            .get_generation_lookahead_days()
            .await
            .map_err(|e| EngineError::Collaborator(anyhow::anyhow!(e.to_string())))?;
        let cutoff = today + Duration::days(lookahead_days);

        let candidates = self
            .plans
            .find_due_before(tenant_id, cutoff)
            .await
            .map_err(|e| EngineError::Collaborator(anyhow::anyhow!(e.to_string())))?;

        info!(
            candidates = candidates.len(),
            cutoff = %cutoff,
            "开始批量生成运行"
        );

        let mut result = GenerationRunResult::default();

        for plan in &candidates {
            result.processed += 1;
            match self.generate_for_plan(plan, today, cutoff, actor).await {
                Ok(GenerationOutcome::Recorded) => {
                    result.generated += 1;
                }
                Ok(GenerationOutcome::Duplicate) => {
                    result.deduplicated += 1;
                    debug!(plan_id = %plan.plan_id, "去重键命中, 跳过重复生成");
                }
                Err(e) => {
                    // 逐计划隔离: 记录并继续
                    warn!(plan_id = %plan.plan_id, error = %e, "计划生成失败, 继续下一个");
                    result.errors.push(GenerationError {
                        plan_id: plan.plan_id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            processed = result.processed,
            generated = result.generated,
            deduplicated = result.deduplicated,
            errors = result.errors.len(),
            "批量生成运行结束"
        );

        Ok(result)
    }

    /// 单计划生成: 建单 + 排程推进 (落账在持久层单事务完成)
    ///
    /// 建单与落账无法跨协作方组成一个事务, 因此整体语义是
    /// at-least-once: 建单前先查 cycle_key, 已落账的周期不再物化工单;
    /// 落账事务内再次去重, 兜住查询与落账之间的并发窗口
    async fn generate_for_plan(
        &self,
        plan: &MaintenancePlan,
        today: NaiveDate,
        cutoff: NaiveDate,
        actor: &str,
    ) -> EngineResult<GenerationOutcome> {
        // 前瞻窗口内视为到期 (默认前瞻 0 天, cutoff == today)
        PlanEligibilityEvaluator::ensure_due(plan, cutoff)?;

        // 触发类型与频率类型不一致的计划拒绝生成
        if !plan.trigger_matches_frequency() {
            return Err(EngineError::InvalidFrequencyType {
                plan_id: plan.plan_id.clone(),
                trigger: plan.trigger_type.to_string(),
                frequency: plan.frequency.frequency_type.to_string(),
            });
        }

        // === 步骤 0: 去重前置检查 (重试不重复建单) ===
        let cycle_key = Self::cycle_key(plan);
        let recorded = self
            .plans
            .generation_exists(&plan.plan_id, &cycle_key)
            .await
            .map_err(|e| EngineError::Collaborator(anyhow::anyhow!(e.to_string())))?;
        if recorded {
            debug!(plan_id = %plan.plan_id, cycle_key = %cycle_key, "周期已落账, 不再建单");
            return Ok(GenerationOutcome::Duplicate);
        }

        // === 步骤 1: 计算下一到期日 ===
        // 基准取生成时刻 today; 非日历频率的排程由外部信号重新武装,
        // next_scheduled_at 置空
        let next_scheduled_at = if plan.frequency.frequency_type.is_calendar_based() {
            let candidate = RecurrenceCalculator::next(&plan.plan_id, &plan.frequency, today)?;
            let adjusted = SeasonalAdjuster::adjust(
                candidate,
                plan.frequency.interval,
                plan.frequency.frequency_type,
                &plan.seasonal_rules,
            );
            Some(adjusted)
        } else {
            debug!(plan_id = %plan.plan_id, "非日历频率, 排程交外部信号重新武装");
            None
        };

        // === 步骤 2: 创建工单 (当季附加任务一并物化) ===
        let extra_tasks = SeasonalAdjuster::season_extra_tasks(today, &plan.seasonal_rules);
        let work_order = self
            .factory
            .create_from_plan(plan, extra_tasks, actor)
            .await
            .map_err(|e| EngineError::Collaborator(anyhow::anyhow!(e.to_string())))?;

        debug!(
            plan_id = %plan.plan_id,
            work_order_id = %work_order.work_order_id,
            "工单已创建"
        );

        // === 步骤 3: 落账 (生成台账 + 排程推进, 持久层单事务) ===
        let outcome = self
            .plans
            .record_generation(&plan.plan_id, Utc::now(), next_scheduled_at, &cycle_key)
            .await
            .map_err(|e| EngineError::Collaborator(anyhow::anyhow!(e.to_string())))?;

        Ok(outcome)
    }

    /// 去重键: 计划 id + 本次满足的到期周期
    ///
    /// 从未生成过的计划用固定标记, 保证首周期重试同样被去重
    pub fn cycle_key(plan: &MaintenancePlan) -> String {
        match plan.next_scheduled_at {
            Some(cycle) => format!("{}:{}", plan.plan_id, cycle),
            None => format!("{}:FIRST", plan.plan_id),
        }
    }
}
