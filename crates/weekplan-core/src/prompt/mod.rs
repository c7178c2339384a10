//! Prompt construction for initial generation and refinement.
//!
//! Both templates are deterministic and end with the same block of hard
//! formatting constraints, so formatting drifts as little as possible between
//! the two modes. This module contains pure logic (no I/O).

mod rules;

use crate::error::PlanError;
use crate::record::WeeklyPlanRecord;

pub use rules::{DEFAULT_RULE_SET, RuleSet};

// ---------------------------------------------------------------------------
// Shared blocks
// ---------------------------------------------------------------------------

/// Hard formatting constraints appended to both templates.
pub const FORMATTING_CONSTRAINTS: &str = r#"**关键格式约束（必须严格执行）：**
1. **换行规则**：在 JSON 字符串中，请使用 "\n" 来表示换行。
2. **列表格式**：“活动安排”和“观察要点”字段必须使用 "1. ...\n2. ...\n3. ..." 的格式，序号明确且换行。
3. **反思格式**：“反思”字段必须使用 "★ ...\n▲ ...\n◎ ..." 的格式，确保三个部分在视觉上是分行的。
4. **内容简洁**：“活动安排”要言简意赅，核心在于活动名称和主要内容，不要写长篇大论。
"#;

const ROLE: &str = "你是一名资深的幼儿园教师。";

/// Header fields the backend must copy verbatim from the document.
const HEADER_EXTRACTION: &str = r#"**表头信息提取：**
请仔细识别文件中的表头信息，必须提取以下内容填入 JSON 的 `weeklyInfo` 中，**必须与文件完全一致**：
1. **时间/日期范围** (dateRange)
2. **班级** (classStr)
3. **教师** (teachers)
4. **主题** (theme)
"#;

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// Build the initial-mode prompt: extract the header, expand the document
/// into a complete five-day plan following `rules`.
pub fn build_initial_prompt(rules: &RuleSet) -> String {
    let mut prompt = String::with_capacity(4096);

    prompt.push_str(ROLE);
    prompt.push_str(
        "请分析这个文件（图片或PDF）中的周工作计划，\
         并将其扩写成一份非常详尽的“幼儿园一周（周一至周五）每日活动计划”。\
         dailyPlans 必须恰好包含五天，按周一、周二、周三、周四、周五的顺序排列，\
         day 字段依次填写“周一”至“周五”，date 字段填写与日期范围一致的具体日期。\n\n",
    );

    prompt.push_str(HEADER_EXTRACTION);
    prompt.push('\n');

    prompt.push_str("**生成规则（请严格遵守以下用户设定的初始要求）：**\n");
    prompt.push_str(rules.as_str().trim_end());
    prompt.push_str("\n\n");

    prompt.push_str(FORMATTING_CONSTRAINTS);
    prompt.push('\n');

    prompt.push_str("**输出格式：**\n请直接返回 JSON 数据。\n");
    prompt
}

/// Build the refinement-mode prompt from the current record and a free-text
/// modification instruction.
///
/// Fails fast with [`PlanError::Validation`] when the instruction is blank,
/// so no backend call is ever issued for it.
pub fn build_refinement_prompt(
    current: &WeeklyPlanRecord,
    instruction: &str,
) -> Result<String, PlanError> {
    let instruction = instruction.trim();
    if instruction.is_empty() {
        return Err(PlanError::Validation(
            "modification instruction is empty".to_string(),
        ));
    }

    let current_json = serde_json::to_string(current)
        .map_err(|e| PlanError::Validation(format!("current plan cannot be serialized: {e}")))?;

    let mut prompt = String::with_capacity(current_json.len() + 2048);

    prompt.push_str(ROLE);
    prompt.push_str(
        "请基于提供的【周工作计划文件】和【当前的一周详细计划数据】，\
         根据用户的【修改意见】对计划进行修正。\n\n",
    );

    prompt.push_str("**用户修改意见：**\n");
    prompt.push_str(&format!("\"{instruction}\"\n\n"));

    prompt.push_str("**任务要求：**\n");
    prompt.push_str("1. 只修改修改意见所针对的天数或板块，其余所有字段必须与当前数据逐字保持一致，不得改写、润色或重新排版。\n");
    prompt.push_str("2. 针对用户提出的意见，精准调整对应天数或板块的内容。\n");
    prompt.push_str("3. 保持原有的专业度、反思格式（★▲◎）和详细程度。\n");
    prompt.push_str("4. **表头信息（日期范围、主题、班级、教师）必须继续保持与文件一致。**\n");
    prompt.push_str("5. 返回完整的一周数据（五天全部返回），而不是只返回修改的部分。\n\n");

    prompt.push_str(FORMATTING_CONSTRAINTS);
    prompt.push('\n');

    prompt.push_str("**当前计划数据（参考用）：**\n");
    prompt.push_str(&current_json);
    prompt.push('\n');

    Ok(prompt)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
