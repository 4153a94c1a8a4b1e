//! Request-body resolution
//!
//! A catalog item collects its inputs either through a structured form
//! schema or through a raw JSON request-body template containing
//! `{{form.<key>}}` placeholders. This module turns submitted values
//! into the concrete body sent to the orchestration server.
//!
//! JSON-mode resolution is a two-pass design: the template is parsed
//! once (syntax errors block the launch), then the value tree is walked
//! and every placeholder node is swapped for the typed value. A string
//! node that consists of exactly one token takes the submitted value
//! with its type preserved; tokens embedded inside longer strings are
//! spliced in textually. The same token appearing several times is
//! replaced identically each time, and tokens with no submitted value
//! are left verbatim so the echoed body shows what was missing.

use std::collections::HashMap;

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};

/// Pattern for `{{form.<identifier>}}` tokens
const FORM_TOKEN_PATTERN: &str = r"\{\{form\.(\w+)\}\}";

fn form_token_regex() -> Regex {
    Regex::new(FORM_TOKEN_PATTERN).expect("form token pattern is valid")
}

/// Field input types supported by the form renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Password,
    Number,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Toggle,
    Date,
    Json,
}

/// One input definition within a catalog item's form schema
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    /// Unique within the schema; doubles as the template variable name
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// Token template resolved against the session user at render time,
    /// e.g. `{{current_user.username}}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predefined_value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
}

/// Session user attributes available to predefined values
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentUser {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub role: Option<String>,
    pub groups: Vec<String>,
}

impl CurrentUser {
    /// Display identity for audit records: name, else email, else "system"
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| "system".to_string())
    }
}

/// Reject a form schema with duplicate or malformed field keys.
///
/// Keys double as template variables, so they must be `\w+` and unique
/// within the schema; violations are caught before save, never at launch.
pub fn validate_schema(fields: &[FormField]) -> Result<()> {
    let key_pattern = Regex::new(r"^\w+$").expect("key pattern is valid");
    let mut seen = std::collections::HashSet::new();

    for field in fields {
        if !key_pattern.is_match(&field.key) {
            return Err(Error::TemplateResolution(format!(
                "field key '{}' must contain only letters, digits, and underscores",
                field.key
            )));
        }
        if !seen.insert(field.key.as_str()) {
            return Err(Error::TemplateResolution(format!(
                "duplicate field key '{}' in form schema",
                field.key
            )));
        }
    }

    Ok(())
}

/// Distinct `{{form.<key>}}` identifiers referenced by a template, in
/// order of first appearance. In JSON mode these are the inputs to
/// collect, independent of any form schema.
pub fn template_variables(template: &str) -> Vec<String> {
    let regex = form_token_regex();
    let mut seen = std::collections::HashSet::new();
    let mut variables = Vec::new();

    for capture in regex.captures_iter(template) {
        let name = capture[1].to_string();
        if seen.insert(name.clone()) {
            variables.push(name);
        }
    }

    variables
}

/// Resolve a predefined-value template against the session user.
///
/// Plain string replacement; tokens without a matching attribute become
/// the empty string rather than failing.
pub fn resolve_predefined(template: &str, user: &CurrentUser) -> String {
    let now = Utc::now();
    let attr = |value: &Option<String>| value.clone().unwrap_or_default();

    template
        .replace(
            "{{current_user.username}}",
            &user
                .name
                .clone()
                .or_else(|| user.email.clone())
                .unwrap_or_default(),
        )
        .replace("{{current_user.email}}", &attr(&user.email))
        .replace("{{current_user.id}}", &attr(&user.id))
        .replace("{{current_user.department}}", &attr(&user.department))
        .replace("{{current_user.role}}", &attr(&user.role))
        .replace("{{current_date}}", &now.format("%Y-%m-%d").to_string())
        .replace("{{current_time}}", &now.format("%H:%M:%S").to_string())
        .replace(
            "{{current_datetime}}",
            &now.format("%Y-%m-%d %H:%M:%S").to_string(),
        )
}

/// Initial form value for a field: resolved predefined value first, then
/// the static default, then empty.
pub fn initial_value(field: &FormField, user: &CurrentUser) -> String {
    if let Some(predefined) = &field.predefined_value {
        let resolved = resolve_predefined(predefined, user);
        if !resolved.is_empty() {
            return resolved;
        }
    }
    field.default_value.clone().unwrap_or_default()
}

/// Resolve the concrete request body for one execution.
///
/// JSON mode (`custom_body` present) ignores the form schema entirely;
/// form mode builds `{inventory, extra_vars}`, omitting either key when
/// there is nothing to put in it.
pub fn resolve_request_body(
    custom_body: Option<&str>,
    inventory_id: Option<&str>,
    values: &HashMap<String, Value>,
) -> Result<Value> {
    match custom_body {
        Some(template) => resolve_custom_body(template, values),
        None => Ok(build_form_body(inventory_id, values)),
    }
}

/// Form mode: inventory plus submitted values as `extra_vars`
pub fn build_form_body(inventory_id: Option<&str>, values: &HashMap<String, Value>) -> Value {
    let mut body = Map::new();

    if let Some(inventory) = inventory_id.filter(|id| !id.is_empty()) {
        body.insert("inventory".to_string(), json!(inventory));
    }

    if !values.is_empty() {
        let extra_vars: Map<String, Value> =
            values.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        body.insert("extra_vars".to_string(), Value::Object(extra_vars));
    }

    Value::Object(body)
}

/// JSON mode: parse the template, then substitute placeholder nodes
pub fn resolve_custom_body(template: &str, values: &HashMap<String, Value>) -> Result<Value> {
    let mut tree: Value = serde_json::from_str(template)
        .map_err(|e| Error::TemplateSyntax(format!("request body template is not valid JSON: {}", e)))?;

    let regex = form_token_regex();
    substitute_node(&mut tree, values, &regex);
    Ok(tree)
}

fn substitute_node(node: &mut Value, values: &HashMap<String, Value>, regex: &Regex) {
    match node {
        Value::Array(items) => {
            for item in items {
                substitute_node(item, values, regex);
            }
            return;
        }
        Value::Object(map) => {
            for value in map.values_mut() {
                substitute_node(value, values, regex);
            }
            return;
        }
        _ => {}
    }

    let Value::String(text) = &*node else { return };

    let replacement = if let Some(key) = whole_token_key(text, regex) {
        // No submitted value: the token stays verbatim
        values.get(&key).map(typed_value)
    } else if regex.is_match(text) {
        let replaced = regex.replace_all(text, |caps: &regex::Captures<'_>| {
            match values.get(&caps[1]) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => caps[0].to_string(),
            }
        });
        Some(Value::String(replaced.into_owned()))
    } else {
        None
    };

    if let Some(new_value) = replacement {
        *node = new_value;
    }
}

/// The key when the string is exactly one `{{form.<key>}}` token
fn whole_token_key(text: &str, regex: &Regex) -> Option<String> {
    let capture = regex.captures(text)?;
    let whole = capture.get(0)?;
    if whole.start() == 0 && whole.end() == text.len() {
        Some(capture[1].to_string())
    } else {
        None
    }
}

/// Typed substitution: a submitted string that itself parses as JSON
/// becomes that parsed value, anything else stays a string. Non-string
/// submissions pass through unchanged.
fn typed_value(submitted: &Value) -> Value {
    match submitted {
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(parsed) => parsed,
            Err(_) => Value::String(text.clone()),
        },
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn form_mode_with_nothing_submitted_is_empty() {
        let body = resolve_request_body(None, None, &HashMap::new()).unwrap();
        assert_eq!(body, json!({}));
    }

    #[test]
    fn form_mode_builds_inventory_and_extra_vars() {
        let body = resolve_request_body(
            None,
            Some("inv-1"),
            &values(&[("host", json!("srv1"))]),
        )
        .unwrap();
        assert_eq!(body, json!({"inventory": "inv-1", "extra_vars": {"host": "srv1"}}));
    }

    #[test]
    fn form_mode_omits_extra_vars_without_values() {
        let body = resolve_request_body(None, Some("inv-1"), &HashMap::new()).unwrap();
        assert_eq!(body, json!({"inventory": "inv-1"}));
    }

    #[test]
    fn custom_body_substitutes_a_string_value() {
        let body = resolve_request_body(
            Some(r#"{"extra_vars":{"name":"{{form.name}}"}}"#),
            None,
            &values(&[("name", json!("prod-01"))]),
        )
        .unwrap();
        assert_eq!(body, json!({"extra_vars": {"name": "prod-01"}}));
    }

    #[test]
    fn repeated_tokens_substitute_identically() {
        let body = resolve_custom_body(
            r#"{"extra_vars":{"primary":"{{form.host}}","backup":"{{form.host}}"}}"#,
            &values(&[("host", json!("srv1"))]),
        )
        .unwrap();
        assert_eq!(body["extra_vars"]["primary"], body["extra_vars"]["backup"]);
        assert_eq!(body["extra_vars"]["primary"], json!("srv1"));
    }

    #[test]
    fn json_parseable_string_keeps_its_type() {
        let body = resolve_custom_body(
            r#"{"extra_vars":{"count":"{{form.count}}","hosts":"{{form.hosts}}"}}"#,
            &values(&[
                ("count", json!("3")),
                ("hosts", json!(r#"["a", "b"]"#)),
            ]),
        )
        .unwrap();
        assert_eq!(body["extra_vars"]["count"], json!(3));
        assert_eq!(body["extra_vars"]["hosts"], json!(["a", "b"]));
    }

    #[test]
    fn non_json_string_falls_back_to_string() {
        let body = resolve_custom_body(
            r#"{"extra_vars":{"name":"{{form.name}}"}}"#,
            &values(&[("name", json!("not json at all"))]),
        )
        .unwrap();
        assert_eq!(body["extra_vars"]["name"], json!("not json at all"));
    }

    #[test]
    fn non_string_submissions_pass_through() {
        let body = resolve_custom_body(
            r#"{"instance_groups":["{{form.group}}"],"extra_vars":{"retries":"{{form.retries}}"}}"#,
            &values(&[("group", json!(5)), ("retries", json!(2))]),
        )
        .unwrap();
        assert_eq!(body, json!({"instance_groups": [5], "extra_vars": {"retries": 2}}));
    }

    #[test]
    fn embedded_tokens_splice_textually() {
        let body = resolve_custom_body(
            r#"{"extra_vars":{"greeting":"hello {{form.name}} from {{form.site}}"}}"#,
            &values(&[("name", json!("ops")), ("site", json!("fra1"))]),
        )
        .unwrap();
        assert_eq!(body["extra_vars"]["greeting"], json!("hello ops from fra1"));
    }

    #[test]
    fn unresolved_tokens_stay_verbatim() {
        let body = resolve_custom_body(
            r#"{"extra_vars":{"name":"{{form.name}}"}}"#,
            &HashMap::new(),
        )
        .unwrap();
        assert_eq!(body["extra_vars"]["name"], json!("{{form.name}}"));
    }

    #[test]
    fn invalid_template_is_a_syntax_error() {
        let err = resolve_custom_body("{not json", &HashMap::new()).unwrap_err();
        assert!(matches!(err, Error::TemplateSyntax(_)));
    }

    #[test]
    fn resolved_output_reserializes_as_valid_json() {
        let body = resolve_custom_body(
            r#"{"a":"{{form.x}}","b":{"c":["{{form.x}}","{{form.y}}"]}}"#,
            &values(&[("x", json!("plain text")), ("y", json!("{\"k\": 1}"))]),
        )
        .unwrap();
        let round_trip: Value =
            serde_json::from_str(&serde_json::to_string(&body).unwrap()).unwrap();
        assert_eq!(round_trip, body);
    }

    #[test]
    fn template_variables_are_distinct_and_ordered() {
        let vars = template_variables(
            r#"{"a":"{{form.host}}","b":"{{form.port}}","c":"{{form.host}}"}"#,
        );
        assert_eq!(vars, vec!["host", "port"]);
    }

    #[test]
    fn predefined_values_resolve_user_attributes() {
        let user = CurrentUser {
            id: Some("u-7".into()),
            name: Some("jdoe".into()),
            email: Some("jdoe@corp.example".into()),
            ..Default::default()
        };
        assert_eq!(resolve_predefined("{{current_user.username}}", &user), "jdoe");
        assert_eq!(
            resolve_predefined("{{current_user.email}}", &user),
            "jdoe@corp.example"
        );
        assert_eq!(resolve_predefined("{{current_user.id}}", &user), "u-7");
        // Missing attribute resolves to empty, not an error
        assert_eq!(resolve_predefined("{{current_user.department}}", &user), "");
    }

    #[test]
    fn username_falls_back_to_email() {
        let user = CurrentUser {
            email: Some("ops@corp.example".into()),
            ..Default::default()
        };
        assert_eq!(
            resolve_predefined("{{current_user.username}}", &user),
            "ops@corp.example"
        );
    }

    #[test]
    fn initial_value_prefers_predefined_over_default() {
        let user = CurrentUser {
            name: Some("jdoe".into()),
            ..Default::default()
        };
        let field = FormField {
            key: "requester".into(),
            label: "Requester".into(),
            field_type: FieldType::Text,
            required: true,
            default_value: Some("unknown".into()),
            predefined_value: Some("{{current_user.username}}".into()),
            options: vec![],
            help_text: None,
        };
        assert_eq!(initial_value(&field, &user), "jdoe");

        // Unresolvable predefined value falls back to the default
        assert_eq!(initial_value(&field, &CurrentUser::default()), "unknown");
    }

    #[test]
    fn schema_with_duplicate_keys_is_rejected() {
        let field = |key: &str| FormField {
            key: key.into(),
            label: key.into(),
            field_type: FieldType::Text,
            required: false,
            default_value: None,
            predefined_value: None,
            options: vec![],
            help_text: None,
        };

        assert!(validate_schema(&[field("host"), field("port")]).is_ok());
        assert!(validate_schema(&[field("host"), field("host")]).is_err());
        assert!(validate_schema(&[field("bad key")]).is_err());
    }
}
