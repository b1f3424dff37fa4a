// ==========================================
// 设备预防性维护系统 - 维护计划领域模型
// ==========================================
// 依据: PM_Engine_Specs_v1.0.md - 1. 维护计划
// 红线: 排程字段(last_generated_at/next_scheduled_at/generation_count)
//       只由评估器/编排器路径写入; 内容字段只由计划编辑写入;
//       两类字段不得在同一操作中同时变更
// ==========================================

use crate::domain::types::{FrequencyType, Priority, Season, TriggerType};
use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

// ==========================================
// FrequencySpec - 频率规格
// ==========================================
// 不变量: interval > 0; month_day ∈ 1..=31
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencySpec {
    pub frequency_type: FrequencyType,   // 频率类型
    pub interval: u32,                   // 周期间隔 (>0)
    pub weekdays: Option<Vec<Weekday>>,  // 周频率的目标星期集合 (可选)
    pub month_day: Option<u32>,          // 月频率的固定日 (可选, 1..=31)
}

impl FrequencySpec {
    /// 按天频率
    pub fn daily(interval: u32) -> Self {
        Self {
            frequency_type: FrequencyType::Daily,
            interval,
            weekdays: None,
            month_day: None,
        }
    }

    /// 按周频率
    pub fn weekly(interval: u32, weekdays: Option<Vec<Weekday>>) -> Self {
        Self {
            frequency_type: FrequencyType::Weekly,
            interval,
            weekdays,
            month_day: None,
        }
    }

    /// 按月频率
    pub fn monthly(interval: u32, month_day: Option<u32>) -> Self {
        Self {
            frequency_type: FrequencyType::Monthly,
            interval,
            weekdays: None,
            month_day,
        }
    }

    /// 按用量频率 (需外部表计信号)
    pub fn usage_based(interval: u32) -> Self {
        Self {
            frequency_type: FrequencyType::UsageBased,
            interval,
            weekdays: None,
            month_day: None,
        }
    }

    /// 按工况频率 (需外部传感器信号)
    pub fn condition_based(interval: u32) -> Self {
        Self {
            frequency_type: FrequencyType::ConditionBased,
            interval,
            weekdays: None,
            month_day: None,
        }
    }

    /// 校验频率规格自身合法性
    ///
    /// # 返回
    /// - Ok(()): 合法
    /// - Err(reason): 违反的约束描述
    pub fn validate(&self) -> Result<(), String> {
        if self.interval == 0 {
            return Err("interval must be positive".to_string());
        }
        if let Some(day) = self.month_day {
            if !(1..=31).contains(&day) {
                return Err(format!("month_day out of range: {}", day));
            }
        }
        Ok(())
    }
}

// ==========================================
// SeasonalAdjustment - 季节调整规则
// ==========================================
// 依据: PM_Engine_Specs 2.2 季节调整
// 语义: multiplier > 1 表示该季节维护频次加密 (周期缩短)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalAdjustment {
    pub season: Season,              // 适用季节
    pub multiplier: f64,             // 频率倍数 (>0)
    pub extra_task_ids: Vec<String>, // 该季节附加的任务模板 id
}

impl SeasonalAdjustment {
    pub fn new(season: Season, multiplier: f64) -> Self {
        Self {
            season,
            multiplier,
            extra_task_ids: Vec::new(),
        }
    }
}

// ==========================================
// TaskTemplateItem - 计划任务模板项
// ==========================================
// seq_no 在同一计划内唯一; depends_on 引用兄弟项的 seq_no,
// 必须构成无环图 (engine/template.rs 在编辑期校验)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskTemplateItem {
    pub seq_no: i32,                  // 序号 (计划内唯一)
    pub name: String,                 // 任务名称
    pub estimated_minutes: i32,       // 预计工时 (分钟)
    pub depends_on: Vec<i32>,         // 前置任务 seq_no 列表
    pub checklist: Vec<String>,       // 检查项清单
    pub required_parts: Vec<String>,  // 所需备件
    pub is_optional: bool,            // 是否可选任务
}

impl TaskTemplateItem {
    pub fn new(seq_no: i32, name: &str, estimated_minutes: i32) -> Self {
        Self {
            seq_no,
            name: name.to_string(),
            estimated_minutes,
            depends_on: Vec::new(),
            checklist: Vec::new(),
            required_parts: Vec::new(),
            is_optional: false,
        }
    }
}

// ==========================================
// MaintenancePlan - 维护计划
// ==========================================
// 不变量: 时间触发计划的 next_scheduled_at 随生成单调不减
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenancePlan {
    // ===== 主键与归属 =====
    pub plan_id: String,               // 计划ID
    pub tenant_id: String,             // 租户ID
    pub asset_id: String,              // 设备ID
    pub plan_name: String,             // 计划名称

    // ===== 触发与频率 =====
    pub trigger_type: TriggerType,     // 触发类型
    pub frequency: FrequencySpec,      // 频率规格
    pub seasonal_rules: Vec<SeasonalAdjustment>, // 季节调整规则 (按季节互斥)

    // ===== 内容字段 (只由计划编辑写入) =====
    pub task_template: Vec<TaskTemplateItem>, // 任务模板 (有序)
    pub priority: Priority,            // 生成工单的优先级

    // ===== 生效窗口 =====
    pub effective_from: NaiveDate,     // 生效起始日
    pub effective_to: Option<NaiveDate>, // 生效截止日 (可选)
    pub is_active: bool,               // 激活标志 (停用而非删除)

    // ===== 排程字段 (只由评估器/编排器路径写入) =====
    pub last_generated_at: Option<DateTime<Utc>>, // 上次生成时间
    pub next_scheduled_at: Option<NaiveDate>,     // 下次到期日 (未生成过则为 None)
    pub generation_count: i64,                    // 累计生成次数 (持久化计数)

    // ===== 审计字段 =====
    pub created_by: String,            // 创建人
    pub created_at: DateTime<Utc>,     // 创建时间
    pub updated_at: DateTime<Utc>,     // 更新时间
}

impl MaintenancePlan {
    /// 判断指定日期是否落在生效窗口内
    pub fn is_within_effective_window(&self, today: NaiveDate) -> bool {
        if today < self.effective_from {
            return false;
        }
        match self.effective_to {
            Some(end) => today <= end,
            None => true,
        }
    }

    /// 是否从未生成过工单
    pub fn never_generated(&self) -> bool {
        self.next_scheduled_at.is_none()
    }

    /// 查找指定季节的调整规则
    pub fn seasonal_rule_for(&self, season: Season) -> Option<&SeasonalAdjustment> {
        self.seasonal_rules.iter().find(|r| r.season == season)
    }

    /// 触发类型与频率类型是否一致
    ///
    /// TIME 触发只允许日历频率; METER 只允许 USAGE_BASED;
    /// CONDITION 只允许 CONDITION_BASED
    pub fn trigger_matches_frequency(&self) -> bool {
        match self.trigger_type {
            TriggerType::Time => self.frequency.frequency_type.is_calendar_based(),
            TriggerType::Meter => self.frequency.frequency_type == FrequencyType::UsageBased,
            TriggerType::Condition => {
                self.frequency.frequency_type == FrequencyType::ConditionBased
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_spec_validate() {
        assert!(FrequencySpec::daily(1).validate().is_ok());
        assert!(FrequencySpec::daily(0).validate().is_err());
        assert!(FrequencySpec::monthly(1, Some(31)).validate().is_ok());
        assert!(FrequencySpec::monthly(1, Some(0)).validate().is_err());
        assert!(FrequencySpec::monthly(1, Some(32)).validate().is_err());
    }

    #[test]
    fn test_effective_window() {
        let mut plan = test_plan();
        plan.effective_from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        plan.effective_to = Some(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());

        assert!(!plan.is_within_effective_window(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()));
        assert!(plan.is_within_effective_window(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert!(plan.is_within_effective_window(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()));
        assert!(!plan.is_within_effective_window(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));

        // 无截止日则一直生效
        plan.effective_to = None;
        assert!(plan.is_within_effective_window(NaiveDate::from_ymd_opt(2030, 6, 1).unwrap()));
    }

    #[test]
    fn test_trigger_frequency_consistency() {
        let mut plan = test_plan();
        assert!(plan.trigger_matches_frequency());

        plan.frequency = FrequencySpec::usage_based(500);
        assert!(!plan.trigger_matches_frequency());

        plan.trigger_type = TriggerType::Meter;
        assert!(plan.trigger_matches_frequency());
    }

    fn test_plan() -> MaintenancePlan {
        MaintenancePlan {
            plan_id: "P001".to_string(),
            tenant_id: "T001".to_string(),
            asset_id: "A001".to_string(),
            plan_name: "月度润滑保养".to_string(),
            trigger_type: TriggerType::Time,
            frequency: FrequencySpec::monthly(1, None),
            seasonal_rules: Vec::new(),
            task_template: vec![TaskTemplateItem::new(1, "润滑", 30)],
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
}
