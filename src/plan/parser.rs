//! Parses normalized model text into an [`ExecutionPlan`].

use super::{ExecutionPlan, Step};
use crate::error::{ReplicatorError, Result};
use serde_json::{Map, Value};
use tracing::debug;

/// Parse candidate JSON text into an execution plan.
///
/// Fails with [`ReplicatorError::MalformedPlan`] rather than returning a
/// partially populated plan. Steps that carry neither `cmd` nor `code` are
/// rejected, not skipped.
pub fn parse(text: &str) -> Result<ExecutionPlan> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| ReplicatorError::malformed(format!("invalid JSON: {}", e), text))?;

    let object = value
        .as_object()
        .ok_or_else(|| ReplicatorError::malformed("top-level value is not an object", text))?;

    let goal = object
        .get("goal")
        .and_then(Value::as_str)
        .ok_or_else(|| ReplicatorError::malformed("missing string field 'goal'", text))?
        .to_string();

    let required_tools = string_list(object, "required_tools", text)?;

    let mut missing_secrets: Vec<String> = Vec::new();
    for secret in string_list(object, "missing_secrets", text)? {
        if !missing_secrets.contains(&secret) {
            missing_secrets.push(secret);
        }
    }

    let raw_steps = object
        .get("execution_steps")
        .and_then(Value::as_array)
        .ok_or_else(|| ReplicatorError::malformed("missing array field 'execution_steps'", text))?;

    let execution_steps = raw_steps
        .iter()
        .enumerate()
        .map(|(index, step)| parse_step(index, step, text))
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "Parsed plan with {} tools, {} secrets, {} steps",
        required_tools.len(),
        missing_secrets.len(),
        execution_steps.len()
    );

    Ok(ExecutionPlan {
        goal,
        required_tools,
        missing_secrets,
        execution_steps,
    })
}

/// Read an optional array-of-strings field. Absent or `null` yields an empty list.
fn string_list(object: &Map<String, Value>, key: &str, raw: &str) -> Result<Vec<String>> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    ReplicatorError::malformed(format!("'{}' must contain only strings", key), raw)
                })
            })
            .collect(),
        Some(_) => Err(ReplicatorError::malformed(
            format!("'{}' must be an array of strings", key),
            raw,
        )),
    }
}

/// Dispatch a single step object. `cmd` wins when both keys are present.
fn parse_step(index: usize, step: &Value, raw: &str) -> Result<Step> {
    let object = step.as_object().ok_or_else(|| {
        ReplicatorError::malformed(format!("step {} is not an object", index + 1), raw)
    })?;

    let payload = |key: &str| -> Result<Option<String>> {
        match object.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(ReplicatorError::malformed(
                format!("step {} has a non-string '{}'", index + 1, key),
                raw,
            )),
        }
    };

    if let Some(cmd) = payload("cmd")? {
        return Ok(Step::Command(cmd));
    }
    if let Some(code) = payload("code")? {
        return Ok(Step::CodeFragment(code));
    }

    Err(ReplicatorError::malformed(
        format!("step {} has neither 'cmd' nor 'code'", index + 1),
        raw,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::normalize;
    use tokio_test::assert_err;

    fn reason(err: ReplicatorError) -> String {
        match err {
            ReplicatorError::MalformedPlan { reason, .. } => reason,
            other => panic!("expected MalformedPlan, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_full_plan() {
        let text = r#"{
            "goal": "Build a bot",
            "required_tools": ["python", "docker"],
            "missing_secrets": ["API_KEY"],
            "execution_steps": [
                {"step": 1, "cmd": "pip install x"},
                {"step": 2, "code": "import x"}
            ]
        }"#;

        let plan = parse(text).unwrap();
        assert_eq!(plan.goal, "Build a bot");
        assert_eq!(plan.required_tools, vec!["python", "docker"]);
        assert_eq!(plan.missing_secrets, vec!["API_KEY"]);
        assert_eq!(
            plan.execution_steps,
            vec![
                Step::Command("pip install x".into()),
                Step::CodeFragment("import x".into()),
            ]
        );
    }

    #[test]
    fn test_optional_lists_default_to_empty() {
        let plan = parse(r#"{"goal": "g", "execution_steps": []}"#).unwrap();
        assert!(plan.required_tools.is_empty());
        assert!(plan.missing_secrets.is_empty());
        assert!(plan.execution_steps.is_empty());

        let plan = parse(r#"{"goal": "g", "required_tools": null, "execution_steps": []}"#).unwrap();
        assert!(plan.required_tools.is_empty());
    }

    #[test]
    fn test_duplicate_secrets_collapse() {
        let plan = parse(
            r#"{"goal": "g", "missing_secrets": ["A", "B", "A"], "execution_steps": []}"#,
        )
        .unwrap();
        assert_eq!(plan.missing_secrets, vec!["A", "B"]);
    }

    #[test]
    fn test_not_json_is_malformed() {
        let err = assert_err!(parse("not json at all"));
        assert_eq!(err.raw_response(), Some("not json at all"));
        assert!(reason(err).starts_with("invalid JSON"));
    }

    #[test]
    fn test_missing_goal() {
        let err = parse(r#"{"execution_steps": []}"#).unwrap_err();
        assert_eq!(reason(err), "missing string field 'goal'");

        let err = parse(r#"{"goal": 42, "execution_steps": []}"#).unwrap_err();
        assert_eq!(reason(err), "missing string field 'goal'");
    }

    #[test]
    fn test_steps_must_be_an_array() {
        let err = parse(r#"{"goal": "g"}"#).unwrap_err();
        assert_eq!(reason(err), "missing array field 'execution_steps'");

        let err = parse(r#"{"goal": "g", "execution_steps": {"cmd": "ls"}}"#).unwrap_err();
        assert_eq!(reason(err), "missing array field 'execution_steps'");
    }

    #[test]
    fn test_ambiguous_step_is_rejected() {
        let err = parse(
            r#"{"goal": "g", "execution_steps": [{"cmd": "ls"}, {"step": 2, "note": "??"}]}"#,
        )
        .unwrap_err();
        assert_eq!(reason(err), "step 2 has neither 'cmd' nor 'code'");
    }

    #[test]
    fn test_non_string_payload_is_rejected() {
        let err = parse(r#"{"goal": "g", "execution_steps": [{"code": 5}]}"#).unwrap_err();
        assert_eq!(reason(err), "step 1 has a non-string 'code'");
    }

    #[test]
    fn test_bad_tool_list_is_rejected() {
        let err = parse(r#"{"goal": "g", "required_tools": "python", "execution_steps": []}"#)
            .unwrap_err();
        assert_eq!(reason(err), "'required_tools' must be an array of strings");

        let err = parse(r#"{"goal": "g", "required_tools": [1], "execution_steps": []}"#)
            .unwrap_err();
        assert_eq!(reason(err), "'required_tools' must contain only strings");
    }

    #[test]
    fn test_command_wins_over_code() {
        let plan = parse(r#"{"goal": "g", "execution_steps": [{"cmd": "ls", "code": "x = 1"}]}"#)
            .unwrap();
        assert_eq!(plan.execution_steps, vec![Step::Command("ls".into())]);
    }

    #[test]
    fn test_top_level_array_is_rejected() {
        let err = parse("[1, 2, 3]").unwrap_err();
        assert_eq!(reason(err), "top-level value is not an object");
    }

    #[test]
    fn test_parse_is_idempotent_on_canonical_form() {
        let text = r#"{"goal": "Deploy", "required_tools": ["gcloud"], "missing_secrets": ["TOKEN"],
            "execution_steps": [{"step": 1, "cmd": "gcloud init"}, {"step": 2, "code": "print(1)"}]}"#;
        let first = parse(text).unwrap();
        let second = parse(&first.to_json().unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_normalize_then_parse_fenced_response() {
        let raw = "```json\n{\"goal\":\"Build a bot\",\"required_tools\":[\"python\"],\"missing_secrets\":[],\"execution_steps\":[{\"step\":1,\"code\":\"print('hi')\"}]}\n```";
        let plan = parse(&normalize(raw)).unwrap();
        assert_eq!(plan.goal, "Build a bot");
        assert_eq!(plan.execution_steps, vec![Step::CodeFragment("print('hi')".into())]);
    }
}
