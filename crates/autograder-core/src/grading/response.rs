//! Grade JSON extraction from model responses

use crate::{AutograderError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One student's grade as returned by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeEntry {
    pub student_name: String,
    #[serde(default)]
    pub filename: Option<String>,
    pub grade: f64,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Pull a JSON object out of model text.
///
/// The whole text is tried as strict JSON first. Failing that, each `{` is
/// tried in order as the start of a balanced object (string and escape
/// aware) and the first one that parses wins.
pub fn extract_json_object(text: &str) -> Result<Value> {
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(text.trim()) {
        return Ok(value);
    }

    let mut from = 0;
    while let Some(offset) = text[from..].find('{') {
        let start = from + offset;
        if let Some(end) = balanced_object_end(&text[start..]) {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..start + end]) {
                return Ok(value);
            }
        }
        from = start + 1;
    }

    Err(AutograderError::Parse {
        message: "no JSON object found".into(),
        raw: text.to_string(),
    })
}

/// Parse the `grades` array of a model response
pub fn parse_grades(text: &str) -> Result<Vec<GradeEntry>> {
    let value = extract_json_object(text)?;
    let grades = value.get("grades").cloned().ok_or_else(|| AutograderError::Parse {
        message: "response has no \"grades\" field".into(),
        raw: text.to_string(),
    })?;
    serde_json::from_value(grades).map_err(|e| AutograderError::Parse {
        message: e.to_string(),
        raw: text.to_string(),
    })
}

/// Byte length of the object starting at `text[0] == '{'`, if it closes
fn balanced_object_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strict_json_passes_through() {
        let value = extract_json_object(r#"  {"grades": []}  "#).unwrap();
        assert_eq!(value, json!({"grades": []}));
    }

    #[test]
    fn finds_object_in_prose() {
        let text = concat!(
            "Here are the grades:\n```json\n",
            r#"{"grades": [{"student_name": "Ann", "grade": 9}]}"#,
            "\n```\nLet me know!",
        );
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["grades"][0]["student_name"], "Ann");
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_matching() {
        let text = r#"Result: {"comment": "use {} and \"quotes\" }", "grade": 7} trailing {"#;
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["grade"], 7);
        assert_eq!(value["comment"], "use {} and \"quotes\" }");
    }

    #[test]
    fn takes_first_object_not_greedy_span() {
        // a greedy first-to-last-brace match would swallow both objects
        let text = r#"{"a": 1} and then {"b": 2}"#;
        assert_eq!(extract_json_object(text).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn skips_unparseable_candidates() {
        let text = r#"{not json} but {"ok": true}"#;
        assert_eq!(extract_json_object(text).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn failure_keeps_raw_text() {
        let text = "Sorry, I cannot grade this. {unbalanced";
        match extract_json_object(text) {
            Err(AutograderError::Parse { raw, .. }) => assert_eq!(raw, text),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn parses_grade_entries() {
        let text = r#"{"grades": [
            {"student_name": "Ann Lee", "filename": "hw1.py", "grade": 8.5, "comment": "Nice"},
            {"student_name": "Bo", "grade": 10}
        ]}"#;
        let grades = parse_grades(text).unwrap();
        assert_eq!(grades.len(), 2);
        assert_eq!(grades[0].filename.as_deref(), Some("hw1.py"));
        assert!((grades[0].grade - 8.5).abs() < f64::EPSILON);
        assert!(grades[1].strengths.is_empty());
    }

    #[test]
    fn missing_grades_field_is_a_parse_error() {
        assert!(matches!(
            parse_grades(r#"{"error": "rate limited"}"#),
            Err(AutograderError::Parse { .. })
        ));
    }
}
