//! Catalog item models
//!
//! A catalog item describes one launchable automation: which remote job
//! template it drives and how its inputs are collected. Input collection
//! is driven by exactly one of two shapes: a structured form schema, or
//! a raw JSON request-body template with `{{form.<key>}}` placeholders.

use autoportal_core::{template, FormField};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;

/// CatalogItem model - one launchable automation definition
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub description: Option<String>,

    /// Remote job template identifier; locked after first save
    pub template_id: String,
    pub inventory_id: Option<String>,
    pub instance_group_id: Option<String>,

    /// JSON array of form field definitions
    pub form_schema: Option<String>,
    /// JSON request-body template; takes precedence over the schema
    pub custom_body: Option<String>,

    /// JSON array of tag strings
    pub tags: Option<String>,
    pub pinned: bool,
    pub featured: bool,

    /// Launch counter
    pub runs: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogItem {
    /// Parsed form schema, empty when absent or malformed
    pub fn get_form_schema(&self) -> Vec<FormField> {
        self.form_schema
            .as_ref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default()
    }

    /// Parsed tags, empty when absent or malformed
    pub fn get_tags(&self) -> Vec<String> {
        self.tags
            .as_ref()
            .and_then(|t| serde_json::from_str(t).ok())
            .unwrap_or_default()
    }

    /// True when input collection runs through the JSON template
    pub fn is_json_mode(&self) -> bool {
        self.custom_body.as_deref().is_some_and(|b| !b.is_empty())
    }

    /// Template variables referenced by the JSON template, empty in
    /// form mode
    pub fn template_variables(&self) -> Vec<String> {
        self.custom_body
            .as_deref()
            .map(template::template_variables)
            .unwrap_or_default()
    }
}

/// Input for creating a new catalog item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCatalogItem {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub description: Option<String>,
    pub template_id: String,
    pub inventory_id: Option<String>,
    pub instance_group_id: Option<String>,
    pub form_schema: Option<Vec<FormField>>,
    pub custom_body: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub featured: bool,
}

impl CreateCatalogItem {
    /// Convert the schema to its JSON column form
    pub fn form_schema_string(&self) -> Option<String> {
        self.form_schema
            .as_ref()
            .and_then(|s| serde_json::to_string(s).ok())
    }

    /// Convert tags to their JSON column form
    pub fn tags_string(&self) -> Option<String> {
        if self.tags.is_empty() {
            None
        } else {
            serde_json::to_string(&self.tags).ok()
        }
    }

    /// Validate the input before save.
    ///
    /// Schema problems (duplicate keys, malformed keys) and custom-body
    /// syntax errors are rejected here so a launch can never trip over
    /// them later.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Catalog item name cannot be empty".to_string());
        }

        if self.template_id.trim().is_empty() {
            return Err("Job template id cannot be empty".to_string());
        }

        if let Some(schema) = &self.form_schema {
            template::validate_schema(schema).map_err(|e| e.to_string())?;
        }

        if let Some(body) = &self.custom_body {
            if !body.trim().is_empty() {
                serde_json::from_str::<JsonValue>(body)
                    .map_err(|e| format!("Custom request body is not valid JSON: {}", e))?;
            }
        }

        Ok(())
    }
}

fn default_namespace() -> String {
    "default".to_string()
}

/// Input for updating an existing catalog item
///
/// `template_id` is deliberately absent: it is locked after the first
/// save and attempts to change it are rejected at the API layer.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCatalogItem {
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub description: Option<String>,
    pub inventory_id: Option<String>,
    pub instance_group_id: Option<String>,
    pub form_schema: Option<Vec<FormField>>,
    pub custom_body: Option<String>,
    pub tags: Option<Vec<String>>,
    pub pinned: Option<bool>,
    pub featured: Option<bool>,
}

impl UpdateCatalogItem {
    pub fn form_schema_string(&self) -> Option<String> {
        self.form_schema
            .as_ref()
            .and_then(|s| serde_json::to_string(s).ok())
    }

    pub fn tags_string(&self) -> Option<String> {
        self.tags.as_ref().and_then(|t| serde_json::to_string(t).ok())
    }

    /// Validate the changed parts
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err("Catalog item name cannot be empty".to_string());
            }
        }

        if let Some(schema) = &self.form_schema {
            template::validate_schema(schema).map_err(|e| e.to_string())?;
        }

        if let Some(body) = &self.custom_body {
            if !body.trim().is_empty() {
                serde_json::from_str::<JsonValue>(body)
                    .map_err(|e| format!("Custom request body is not valid JSON: {}", e))?;
            }
        }

        Ok(())
    }

    /// Check if this update contains any changes
    pub fn has_changes(&self) -> bool {
        self.name.is_some()
            || self.namespace.is_some()
            || self.description.is_some()
            || self.inventory_id.is_some()
            || self.instance_group_id.is_some()
            || self.form_schema.is_some()
            || self.custom_body.is_some()
            || self.tags.is_some()
            || self.pinned.is_some()
            || self.featured.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoportal_core::FieldType;

    fn field(key: &str) -> FormField {
        FormField {
            key: key.to_string(),
            label: key.to_string(),
            field_type: FieldType::Text,
            required: false,
            default_value: None,
            predefined_value: None,
            options: vec![],
            help_text: None,
        }
    }

    fn create_input() -> CreateCatalogItem {
        CreateCatalogItem {
            name: "Restart service".to_string(),
            namespace: "default".to_string(),
            description: None,
            template_id: "42".to_string(),
            inventory_id: Some("inv-1".to_string()),
            instance_group_id: None,
            form_schema: Some(vec![field("host"), field("service")]),
            custom_body: None,
            tags: vec!["ops".to_string()],
            pinned: false,
            featured: false,
        }
    }

    #[test]
    fn valid_input_passes() {
        assert!(create_input().validate().is_ok());
    }

    #[test]
    fn duplicate_field_keys_are_rejected_before_save() {
        let mut input = create_input();
        input.form_schema = Some(vec![field("host"), field("host")]);
        assert!(input.validate().is_err());
    }

    #[test]
    fn malformed_custom_body_is_rejected_before_save() {
        let mut input = create_input();
        input.form_schema = None;
        input.custom_body = Some("{broken".to_string());
        assert!(input.validate().is_err());

        input.custom_body = Some(r#"{"extra_vars":{"name":"{{form.name}}"}}"#.to_string());
        assert!(input.validate().is_ok());
    }

    #[test]
    fn missing_template_id_is_rejected() {
        let mut input = create_input();
        input.template_id = "  ".to_string();
        assert!(input.validate().is_err());
    }

    #[test]
    fn json_mode_takes_precedence_and_reports_variables() {
        let item = CatalogItem {
            id: "c-1".to_string(),
            name: "Deploy".to_string(),
            namespace: "default".to_string(),
            description: None,
            template_id: "42".to_string(),
            inventory_id: None,
            instance_group_id: None,
            form_schema: Some(r#"[{"key":"ignored","label":"x","type":"text"}]"#.to_string()),
            custom_body: Some(
                r#"{"extra_vars":{"version":"{{form.version}}","env":"{{form.env}}"}}"#.to_string(),
            ),
            tags: None,
            pinned: false,
            featured: false,
            runs: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(item.is_json_mode());
        assert_eq!(item.template_variables(), vec!["version", "env"]);
    }
}
