// ==========================================
// 设备预防性维护系统 - 周期计算引擎
// ==========================================
// 依据: PM_Engine_Specs_v1.0.md - 2.1 周期计算
// 职责: 频率规格 + 基准日期 → 下次到期日期的纯计算
// 红线: 无状态、无副作用、无 I/O 操作
// ==========================================
// 月频率固定日策略: 目标月不足该日时收敛到月末 (clamp),
// 不滚动到下个月 (避免同周期重复命中)
// 周频率星期集合策略: 先按 interval*7 天跳跃, 再向后 (0..=6 天)
// 对齐到集合内最近的星期, 不向前回拨
// ==========================================

use crate::domain::plan::FrequencySpec;
use crate::domain::types::{ExternalSignal, FrequencyType};
use crate::engine::error::{EngineError, EngineResult};
use chrono::{Datelike, Duration, NaiveDate};

// ==========================================
// RecurrenceCalculator - 周期计算器 (纯函数)
// ==========================================
pub struct RecurrenceCalculator;

impl RecurrenceCalculator {
    /// 计算下次到期日期
    ///
    /// # 参数
    /// - plan_id: 计划ID (仅用于错误上下文)
    /// - spec: 频率规格
    /// - reference: 基准日期 (上次到期日或生效起始日)
    ///
    /// # 返回
    /// - Ok(NaiveDate): 下次到期日期
    /// - Err(RequiresExternalEvaluation): 非日历频率, 需外部信号
    /// - Err(InvalidFrequencySpec): 规格自身不合法
    pub fn next(
        plan_id: &str,
        spec: &FrequencySpec,
        reference: NaiveDate,
    ) -> EngineResult<NaiveDate> {
        spec.validate()
            .map_err(|reason| EngineError::InvalidFrequencySpec {
                plan_id: plan_id.to_string(),
                reason,
            })?;

        match spec.frequency_type {
            FrequencyType::Daily => Ok(reference + Duration::days(spec.interval as i64)),
            FrequencyType::Weekly => Ok(Self::next_weekly(spec, reference)),
            FrequencyType::Monthly => Ok(Self::next_monthly(spec, reference)),
            FrequencyType::UsageBased => Err(EngineError::RequiresExternalEvaluation {
                plan_id: plan_id.to_string(),
                signal: ExternalSignal::Meter,
            }),
            FrequencyType::ConditionBased => Err(EngineError::RequiresExternalEvaluation {
                plan_id: plan_id.to_string(),
                signal: ExternalSignal::Condition,
            }),
        }
    }

    /// 周频率: interval*7 天跳跃 + 星期集合向后对齐
    fn next_weekly(spec: &FrequencySpec, reference: NaiveDate) -> NaiveDate {
        let jumped = reference + Duration::days(spec.interval as i64 * 7);
        let weekdays = match &spec.weekdays {
            Some(set) if !set.is_empty() => set,
            _ => return jumped,
        };
        // 向后最多 6 天, 必能命中集合中的某个星期
        for offset in 0..7 {
            let candidate = jumped + Duration::days(offset);
            if weekdays.contains(&candidate.weekday()) {
                return candidate;
            }
        }
        jumped
    }

    /// 月频率: 月份前进 interval, 固定日收敛到月末
    fn next_monthly(spec: &FrequencySpec, reference: NaiveDate) -> NaiveDate {
        // 以 0 起始的绝对月序做进位, 跨年安全
        let total_months =
            reference.year() * 12 + reference.month0() as i32 + spec.interval as i32;
        let year = total_months.div_euclid(12);
        let month = total_months.rem_euclid(12) as u32 + 1;

        let wanted_day = spec.month_day.unwrap_or(reference.day());
        let day = wanted_day.min(Self::last_day_of_month(year, month));

        // day 已收敛到月内合法范围, from_ymd_opt 必然成功
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 1).unwrap())
    }

    /// 指定年月的最后一天
    pub fn last_day_of_month(year: i32, month: u32) -> u32 {
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .unwrap()
            .pred_opt()
            .unwrap()
            .day()
    }
}
