//! Response schema for structured generation.
//!
//! The schema is written in the generative backend's structured-output
//! dialect (upper-case `OBJECT` / `ARRAY` / `STRING` type names). It is sent
//! verbatim with every request, initial or refinement, and the same value is
//! used locally by [`validate`] before a payload is accepted.
//!
//! Only structure is constrained: every leaf is free text, nothing is an
//! enum or a number.

mod validate;

use std::sync::LazyLock;

use serde_json::{Value, json};

use crate::record::{DAYS_PER_WEEK, GOALS_PER_ACTIVITY};

pub use validate::{SchemaViolation, validate};

static RESPONSE_SCHEMA: LazyLock<Value> = LazyLock::new(build_schema);

/// The response schema attached to every generation request.
pub fn response_schema() -> &'static Value {
    &RESPONSE_SCHEMA
}

fn string() -> Value {
    json!({ "type": "STRING" })
}

/// An object whose listed properties are all strings and all required.
fn string_object(fields: &[&str]) -> Value {
    let properties: serde_json::Map<String, Value> = fields
        .iter()
        .map(|f| ((*f).to_string(), string()))
        .collect();
    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": fields,
    })
}

fn build_schema() -> Value {
    let routine = string_object(&["activity", "observation", "reflection"]);
    let titled = string_object(&["title", "content", "observation", "reflection"]);
    let content = string_object(&["content", "observation", "reflection"]);

    let collective = json!({
        "type": "OBJECT",
        "properties": {
            "title": string(),
            "goals": {
                "type": "ARRAY",
                "items": string(),
                "minItems": GOALS_PER_ACTIVITY,
                "maxItems": GOALS_PER_ACTIVITY,
            },
            "prep": string(),
            "process": string(),
            "reflection": string(),
        },
        "required": ["title", "goals", "prep", "process", "reflection"],
    });

    let daily_plan = json!({
        "type": "OBJECT",
        "properties": {
            "day": string(),
            "date": string(),
            "morningExercise": routine.clone(),
            "areaPlay": routine,
            "collectiveActivity": collective,
            "gameActivity": titled.clone(),
            "lifeActivity": content.clone(),
            "outdoorActivity": titled,
            "dismissal": content,
        },
        "required": [
            "day",
            "date",
            "morningExercise",
            "areaPlay",
            "collectiveActivity",
            "gameActivity",
            "lifeActivity",
            "outdoorActivity",
            "dismissal",
        ],
    });

    json!({
        "type": "OBJECT",
        "properties": {
            "weeklyInfo": string_object(&["dateRange", "theme", "classStr", "teachers"]),
            "dailyPlans": {
                "type": "ARRAY",
                "items": daily_plan,
                "minItems": DAYS_PER_WEEK,
                "maxItems": DAYS_PER_WEEK,
            },
        },
        "required": ["weeklyInfo", "dailyPlans"],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SegmentKind;

    fn required_of(v: &Value) -> Vec<&str> {
        v["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s.as_str().unwrap())
            .collect()
    }

    #[test]
    fn root_requires_both_sections() {
        let schema = response_schema();
        assert_eq!(schema["type"], "OBJECT");
        assert_eq!(required_of(schema), vec!["weeklyInfo", "dailyPlans"]);
    }

    #[test]
    fn weekly_info_requires_four_header_fields() {
        let info = &response_schema()["properties"]["weeklyInfo"];
        assert_eq!(
            required_of(info),
            vec!["dateRange", "theme", "classStr", "teachers"]
        );
    }

    #[test]
    fn daily_plan_requires_nine_fields() {
        let day = &response_schema()["properties"]["dailyPlans"]["items"];
        let required = required_of(day);
        assert_eq!(required.len(), 9);
        for kind in SegmentKind::ALL {
            assert!(required.contains(&kind.wire_key()));
        }
    }

    #[test]
    fn collective_goals_is_a_three_element_array() {
        let goals = &response_schema()["properties"]["dailyPlans"]["items"]["properties"]
            ["collectiveActivity"]["properties"]["goals"];
        assert_eq!(goals["type"], "ARRAY");
        assert_eq!(goals["minItems"], 3);
        assert_eq!(goals["maxItems"], 3);
    }

    #[test]
    fn no_leaf_is_enum_or_numeric() {
        fn walk(v: &Value) {
            if let Some(obj) = v.as_object() {
                assert!(!obj.contains_key("enum"));
                if let Some(t) = obj.get("type").and_then(Value::as_str) {
                    assert!(matches!(t, "OBJECT" | "ARRAY" | "STRING"), "unexpected type {t}");
                }
                for child in obj.values() {
                    walk(child);
                }
            }
        }
        walk(response_schema());
    }

    #[test]
    fn schema_is_built_once() {
        assert!(std::ptr::eq(response_schema(), response_schema()));
    }
}
