//! Caller-overridable generation rules for initial mode.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Rule-set used when the caller does not supply one.
pub const DEFAULT_RULE_SET: &str = "\
1. **核心线索**：以文件内容为主。
2. **体锻活动（7:45-8:40）**：
   - 内容限定：参考文件内的体育活动。
   - 重点：围绕动作技能发展（平衡、核心力量）、坚持性、创意组合和规则意识。
3. **区域游戏（08:40-09:50）**：
   - 每天必须列出**至少两个**具体的区域（如美工区、科学区、建构区、语言区等）。
   - 活动内容要结合主题。
4. **生活活动（11:10-14:40）**：
   - 必须包含四个完整环节且**不能缩写**：**午餐活动、如厕/盥洗、散步活动、午睡活动**。
   - 内容要具体、细致，体现常规培养。
5. **反思（重点）**：
   - 格式必须包含：★ 亮点（含百分比数据）、▲ 不足之处（含具体现象）、◎ 改进措施（具体策略）。
   - **强制换行**：★、▲、◎ 每一条写完后必须换行，确保视觉上分行显示。
   - 内容需详实深刻，字数要求300字左右。
6. **集体活动**：根据文件中的教学计划，包含名称、目标（3条）、准备、过程、反思。
7. **游戏活动**：根据文档内容。
8. **格式要求（全局强制）**：
   - **分条列述**：所有“活动安排”和“观察要点”必须使用序号（1. 2. 3.）分条列述。
   - **强制换行**：每一条序号内容结束后必须换行。
   - **内容精简**：“活动安排”请简略描写，指出活动名称和大致内容即可，避免冗长描述。";

/// The rule text embedded in initial-mode prompts.
///
/// Fully overridable; a blank rule-set falls back to [`DEFAULT_RULE_SET`]
/// so a prompt never goes out without rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet(String);

impl RuleSet {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim().is_empty() {
            Self::default()
        } else {
            Self(text)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_RULE_SET
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self(DEFAULT_RULE_SET.to_string())
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
