// ==========================================
// 设备预防性维护系统 - 操作日志领域模型
// ==========================================
// 依据: PM_Engine_Specs_v1.0.md - 6. 审计
// 红线: 所有写入必须记录; actor 为身份协作方提供的不透明用户 id
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    // ===== 计划侧 =====
    PlanCreate,      // 创建计划
    PlanEdit,        // 编辑计划内容
    PlanDeactivate,  // 停用计划
    GenerationRun,   // 批量生成运行
    GenerationApply, // 单计划生成落账

    // ===== 工单侧 =====
    WoCreate,         // 创建工单
    WoSchedule,       // 排程
    WoAssign,         // 指派
    WoStart,          // 开工
    WoHold,           // 进入等待
    WoResume,         // 恢复执行
    WoProgress,       // 更新进度
    WoComplete,       // 完工
    WoApprove,        // 审批通过
    WoReject,         // 驳回
    WoCancel,         // 取消
    WoClose,          // 关闭
}

impl ActionType {
    /// 转换为字符串标识 (数据库存储格式)
    pub fn as_str(&self) -> &str {
        match self {
            ActionType::PlanCreate => "PLAN_CREATE",
            ActionType::PlanEdit => "PLAN_EDIT",
            ActionType::PlanDeactivate => "PLAN_DEACTIVATE",
            ActionType::GenerationRun => "GENERATION_RUN",
            ActionType::GenerationApply => "GENERATION_APPLY",
            ActionType::WoCreate => "WO_CREATE",
            ActionType::WoSchedule => "WO_SCHEDULE",
            ActionType::WoAssign => "WO_ASSIGN",
            ActionType::WoStart => "WO_START",
            ActionType::WoHold => "WO_HOLD",
            ActionType::WoResume => "WO_RESUME",
            ActionType::WoProgress => "WO_PROGRESS",
            ActionType::WoComplete => "WO_COMPLETE",
            ActionType::WoApprove => "WO_APPROVE",
            ActionType::WoReject => "WO_REJECT",
            ActionType::WoCancel => "WO_CANCEL",
            ActionType::WoClose => "WO_CLOSE",
        }
    }
}

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,               // 日志ID
    pub entity_id: String,               // 关联实体 (计划或工单)
    pub action_type: ActionType,         // 操作类型
    pub actor: String,                   // 操作人 (不透明用户 id)
    pub action_ts: DateTime<Utc>,        // 操作时间戳
    pub payload_json: Option<JsonValue>, // 操作参数 (JSON)
    pub detail: Option<String>,          // 详细描述
}

impl ActionLog {
    /// 创建一条操作日志
    pub fn new(entity_id: &str, action_type: ActionType, actor: &str) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            entity_id: entity_id.to_string(),
            action_type,
            actor: actor.to_string(),
            action_ts: Utc::now(),
            payload_json: None,
            detail: None,
        }
    }

    /// 附加 JSON 负载
    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload_json = Some(payload);
        self
    }

    /// 附加描述
    pub fn with_detail(mut self, detail: &str) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}
