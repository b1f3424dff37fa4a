// ==========================================
// 设备预防性维护系统 - 季节调整引擎
// ==========================================
// 依据: PM_Engine_Specs_v1.0.md - 2.2 季节调整
// 职责: 候选到期日 + 季节规则 → 可能提前的到期日
// 红线: 只允许把维护拉早, 不允许推迟
//       (multiplier < 1 会推迟周期, 视为无操作)
// ==========================================

use crate::domain::plan::SeasonalAdjustment;
use crate::domain::types::{FrequencyType, Season};
use crate::engine::recurrence::RecurrenceCalculator;
use chrono::{Datelike, Duration, NaiveDate};

// ==========================================
// SeasonalAdjuster - 季节调整器 (纯函数)
// ==========================================
pub struct SeasonalAdjuster;

impl SeasonalAdjuster {
    /// 对候选到期日应用季节调整
    ///
    /// 按候选日所在月份判定季节; 命中规则且 multiplier != 1.0 时,
    /// 有效周期收敛为 round(interval / multiplier), 差值按频率类型的
    /// 单位从候选日中扣减
    ///
    /// # 参数
    /// - candidate: 周期计算得到的候选到期日
    /// - interval: 原始周期间隔
    /// - frequency_type: 频率类型 (决定扣减单位)
    /// - rules: 计划的季节规则集 (季节互斥)
    ///
    /// # 不变量
    /// - 返回值永不晚于 candidate
    pub fn adjust(
        candidate: NaiveDate,
        interval: u32,
        frequency_type: FrequencyType,
        rules: &[SeasonalAdjustment],
    ) -> NaiveDate {
        let season = Season::from_month(candidate.month());
        let rule = match rules.iter().find(|r| r.season == season) {
            Some(r) => r,
            None => return candidate,
        };
        if rule.multiplier <= 0.0 || (rule.multiplier - 1.0).abs() < f64::EPSILON {
            return candidate;
        }

        let adjusted_interval = (interval as f64 / rule.multiplier).round() as i64;
        let shrink = interval as i64 - adjusted_interval;
        if shrink <= 0 {
            // multiplier < 1 会把周期拉长 → 推迟, 违反单向提前约束
            return candidate;
        }

        match frequency_type {
            FrequencyType::Daily => candidate - Duration::days(shrink),
            FrequencyType::Weekly => candidate - Duration::days(shrink * 7),
            FrequencyType::Monthly => Self::minus_months(candidate, shrink as u32),
            // 非日历频率不产生候选日期, 调整器不会被调到; 保守返回原值
            FrequencyType::UsageBased | FrequencyType::ConditionBased => candidate,
        }
    }

    /// 候选日所在季节附加的任务模板 id
    pub fn season_extra_tasks<'a>(
        candidate: NaiveDate,
        rules: &'a [SeasonalAdjustment],
    ) -> &'a [String] {
        let season = Season::from_month(candidate.month());
        rules
            .iter()
            .find(|r| r.season == season)
            .map(|r| r.extra_task_ids.as_slice())
            .unwrap_or(&[])
    }

    /// 月份回退, 日收敛到目标月末
    fn minus_months(date: NaiveDate, months: u32) -> NaiveDate {
        let total_months = date.year() * 12 + date.month0() as i32 - months as i32;
        let year = total_months.div_euclid(12);
        let month = total_months.rem_euclid(12) as u32 + 1;
        let day = date.day().min(RecurrenceCalculator::last_day_of_month(year, month));
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 1).unwrap())
    }
}
