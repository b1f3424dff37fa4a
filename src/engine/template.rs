// ==========================================
// 设备预防性维护系统 - 任务模板校验引擎
// ==========================================
// 依据: PM_Engine_Specs_v1.0.md - 1.3 任务模板
// 职责: 计划编辑期校验任务模板 (生成期不再猜执行顺序)
// 规则: seq_no 唯一 / 依赖只指向兄弟项 / 依赖图无环 (Kahn 可行性)
// ==========================================

use crate::domain::plan::TaskTemplateItem;
use crate::engine::error::{EngineError, EngineResult};
use std::collections::{HashMap, HashSet};

// ==========================================
// TemplateValidator - 模板校验器 (纯函数)
// ==========================================
pub struct TemplateValidator;

impl TemplateValidator {
    /// 校验任务模板
    ///
    /// # 参数
    /// - owner_id: 模板归属实体 (计划或工单)
    /// - items: 模板项
    ///
    /// # 返回
    /// - Err(TemplateInvalid): seq_no 重复 / 依赖指向不存在的项 / 自依赖
    /// - Err(TemplateCycle): 依赖成环, 携带环内成员
    pub fn validate(owner_id: &str, items: &[TaskTemplateItem]) -> EngineResult<()> {
        // === 步骤 1: seq_no 唯一性 ===
        let mut seen = HashSet::new();
        for item in items {
            if !seen.insert(item.seq_no) {
                return Err(EngineError::TemplateInvalid {
                    owner_id: owner_id.to_string(),
                    reason: format!("duplicate seq_no: {}", item.seq_no),
                });
            }
        }

        // === 步骤 2: 依赖指向存在的兄弟项, 禁止自依赖 ===
        for item in items {
            for dep in &item.depends_on {
                if *dep == item.seq_no {
                    return Err(EngineError::TemplateInvalid {
                        owner_id: owner_id.to_string(),
                        reason: format!("task {} depends on itself", item.seq_no),
                    });
                }
                if !seen.contains(dep) {
                    return Err(EngineError::TemplateInvalid {
                        owner_id: owner_id.to_string(),
                        reason: format!("task {} depends on unknown seq_no {}", item.seq_no, dep),
                    });
                }
            }
        }

        // === 步骤 3: Kahn 拓扑可行性, 检出环 ===
        let mut indegree: HashMap<i32, usize> =
            items.iter().map(|i| (i.seq_no, i.depends_on.len())).collect();
        let mut dependents: HashMap<i32, Vec<i32>> = HashMap::new();
        for item in items {
            for dep in &item.depends_on {
                dependents.entry(*dep).or_default().push(item.seq_no);
            }
        }

        let mut queue: Vec<i32> = indegree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(seq, _)| *seq)
            .collect();
        let mut resolved = 0usize;

        while let Some(seq) = queue.pop() {
            resolved += 1;
            if let Some(next) = dependents.get(&seq) {
                for n in next {
                    let deg = indegree.get_mut(n).unwrap();
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push(*n);
                    }
                }
            }
        }

        if resolved < items.len() {
            let mut cycle_members: Vec<i32> = indegree
                .into_iter()
                .filter(|(_, deg)| *deg > 0)
                .map(|(seq, _)| seq)
                .collect();
            cycle_members.sort_unstable();
            return Err(EngineError::TemplateCycle {
                owner_id: owner_id.to_string(),
                cycle_members,
            });
        }

        Ok(())
    }
}
