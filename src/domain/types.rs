// ==========================================
// 设备预防性维护系统 - 领域类型定义
// ==========================================
// 依据: PM_Engine_Specs_v1.0.md - 0.2 状态与枚举体系
// 红线: 状态一律用封闭枚举,不用开放字符串
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 触发类型 (Trigger Type)
// ==========================================
// 维护到期的信号来源: 日历时间 / 设备表计 / 传感器工况
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerType {
    Time,      // 时间触发
    Meter,     // 表计触发
    Condition, // 工况触发
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerType::Time => write!(f, "TIME"),
            TriggerType::Meter => write!(f, "METER"),
            TriggerType::Condition => write!(f, "CONDITION"),
        }
    }
}

// ==========================================
// 频率类型 (Frequency Type)
// ==========================================
// 依据: PM_Engine_Specs 2.1 周期计算引擎
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrequencyType {
    Daily,          // 按天
    Weekly,         // 按周
    Monthly,        // 按月
    UsageBased,     // 按用量 (表计)
    ConditionBased, // 按工况 (传感器)
}

impl fmt::Display for FrequencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrequencyType::Daily => write!(f, "DAILY"),
            FrequencyType::Weekly => write!(f, "WEEKLY"),
            FrequencyType::Monthly => write!(f, "MONTHLY"),
            FrequencyType::UsageBased => write!(f, "USAGE_BASED"),
            FrequencyType::ConditionBased => write!(f, "CONDITION_BASED"),
        }
    }
}

impl FrequencyType {
    /// 是否可由日历推算下次日期
    ///
    /// USAGE_BASED / CONDITION_BASED 依赖外部信号,无法纯日历计算
    pub fn is_calendar_based(&self) -> bool {
        matches!(
            self,
            FrequencyType::Daily | FrequencyType::Weekly | FrequencyType::Monthly
        )
    }
}

// ==========================================
// 外部评估信号 (External Signal)
// ==========================================
// 非日历频率所需的外部信号种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExternalSignal {
    Meter,     // 表计读数
    Condition, // 工况传感器
}

impl fmt::Display for ExternalSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalSignal::Meter => write!(f, "METER"),
            ExternalSignal::Condition => write!(f, "CONDITION"),
        }
    }
}

// ==========================================
// 季节类型 (Season Type)
// ==========================================
// 依据: PM_Engine_Specs 2.2 季节调整
// 按公历月份划分: 3-5 春 / 6-8 夏 / 9-11 秋 / 12-2 冬
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Season {
    Spring, // 春季
    Summer, // 夏季
    Fall,   // 秋季
    Winter, // 冬季
}

impl Season {
    /// 由公历月份判定季节
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Fall,
            _ => Season::Winter,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Season::Spring => write!(f, "SPRING"),
            Season::Summer => write!(f, "SUMMER"),
            Season::Fall => write!(f, "FALL"),
            Season::Winter => write!(f, "WINTER"),
        }
    }
}

// ==========================================
// 工单状态 (Work Order Status)
// ==========================================
// 依据: PM_Engine_Specs 4. 工单状态机
// 红线: 状态转换表是唯一事实来源 (engine/lifecycle.rs)
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkOrderStatus {
    Drafted,       // 草稿
    Scheduled,     // 已排程
    InProgress,    // 执行中
    WaitingParts,  // 等待备件
    WaitingWindow, // 等待检修窗口
    WaitingClient, // 等待客户确认
    Completed,     // 已完工
    Approved,      // 已审批
    Closed,        // 已关闭
    Rejected,      // 已驳回
    Canceled,      // 已取消
}

impl WorkOrderStatus {
    /// 是否为终态 (不再接受任何转换)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkOrderStatus::Closed | WorkOrderStatus::Rejected | WorkOrderStatus::Canceled
        )
    }

    /// 是否为等待类状态
    pub fn is_waiting(&self) -> bool {
        matches!(
            self,
            WorkOrderStatus::WaitingParts
                | WorkOrderStatus::WaitingWindow
                | WorkOrderStatus::WaitingClient
        )
    }

    /// 是否已完结 (SLA/逾期判定与取消判定用)
    ///
    /// COMPLETED / APPROVED / CLOSED 视为工作已完结:
    /// 不再计逾期,也不允许取消
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            WorkOrderStatus::Completed | WorkOrderStatus::Approved | WorkOrderStatus::Closed
        )
    }

    /// 是否计入闲置时间监控
    ///
    /// 仅执行中与等待类状态累计闲置
    pub fn tracks_idle(&self) -> bool {
        matches!(self, WorkOrderStatus::InProgress) || self.is_waiting()
    }
}

impl fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkOrderStatus::Drafted => write!(f, "DRAFTED"),
            WorkOrderStatus::Scheduled => write!(f, "SCHEDULED"),
            WorkOrderStatus::InProgress => write!(f, "IN_PROGRESS"),
            WorkOrderStatus::WaitingParts => write!(f, "WAITING_PARTS"),
            WorkOrderStatus::WaitingWindow => write!(f, "WAITING_WINDOW"),
            WorkOrderStatus::WaitingClient => write!(f, "WAITING_CLIENT"),
            WorkOrderStatus::Completed => write!(f, "COMPLETED"),
            WorkOrderStatus::Approved => write!(f, "APPROVED"),
            WorkOrderStatus::Closed => write!(f, "CLOSED"),
            WorkOrderStatus::Rejected => write!(f, "REJECTED"),
            WorkOrderStatus::Canceled => write!(f, "CANCELED"),
        }
    }
}

// ==========================================
// 工单来源 (Work Order Origin)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkOrderOrigin {
    Pm,        // 预防性维护计划生成
    Incident,  // 故障工单转入
    Manual,    // 人工创建
    Condition, // 工况告警生成
}

impl fmt::Display for WorkOrderOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkOrderOrigin::Pm => write!(f, "PM"),
            WorkOrderOrigin::Incident => write!(f, "INCIDENT"),
            WorkOrderOrigin::Manual => write!(f, "MANUAL"),
            WorkOrderOrigin::Condition => write!(f, "CONDITION"),
        }
    }
}

// ==========================================
// 审批状态 (Approval Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,  // 待审批
    Approved, // 已通过
    Rejected, // 已驳回
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalStatus::Pending => write!(f, "PENDING"),
            ApprovalStatus::Approved => write!(f, "APPROVED"),
            ApprovalStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

// ==========================================
// 优先级 (Priority)
// ==========================================
// 红线: 等级制,不是评分制
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,      // 低
    Medium,   // 中
    High,     // 高
    Critical, // 紧急
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "LOW"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::High => write!(f, "HIGH"),
            Priority::Critical => write!(f, "CRITICAL"),
        }
    }
}

// ==========================================
// 闲置阈值档位 (Idle Threshold Kind)
// ==========================================
// 依据: PM_Engine_Specs 4.4 闲置升级策略
// 顺序: Warning < Escalation < AutoReassign
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdleThresholdKind {
    Warning,      // 提醒
    Escalation,   // 升级
    AutoReassign, // 建议改派
}

impl fmt::Display for IdleThresholdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdleThresholdKind::Warning => write!(f, "WARNING"),
            IdleThresholdKind::Escalation => write!(f, "ESCALATION"),
            IdleThresholdKind::AutoReassign => write!(f, "AUTO_REASSIGN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_from_month() {
        assert_eq!(Season::from_month(3), Season::Spring);
        assert_eq!(Season::from_month(5), Season::Spring);
        assert_eq!(Season::from_month(6), Season::Summer);
        assert_eq!(Season::from_month(8), Season::Summer);
        assert_eq!(Season::from_month(9), Season::Fall);
        assert_eq!(Season::from_month(11), Season::Fall);
        assert_eq!(Season::from_month(12), Season::Winter);
        assert_eq!(Season::from_month(1), Season::Winter);
        assert_eq!(Season::from_month(2), Season::Winter);
    }

    #[test]
    fn test_status_predicates() {
        assert!(WorkOrderStatus::Closed.is_terminal());
        assert!(WorkOrderStatus::Canceled.is_terminal());
        assert!(!WorkOrderStatus::Completed.is_terminal());

        assert!(WorkOrderStatus::Completed.is_settled());
        assert!(WorkOrderStatus::Approved.is_settled());
        assert!(!WorkOrderStatus::InProgress.is_settled());

        assert!(WorkOrderStatus::WaitingParts.tracks_idle());
        assert!(WorkOrderStatus::InProgress.tracks_idle());
        assert!(!WorkOrderStatus::Scheduled.tracks_idle());
    }

    #[test]
    fn test_status_serde_format() {
        let s = serde_json::to_string(&WorkOrderStatus::WaitingParts).unwrap();
        assert_eq!(s, "\"WAITING_PARTS\"");
        let s = serde_json::to_string(&FrequencyType::UsageBased).unwrap();
        assert_eq!(s, "\"USAGE_BASED\"");
    }
}
