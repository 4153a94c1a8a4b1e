use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Setting model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Setting {
    pub key: String,
    pub value: String,
    #[sqlx(rename = "type")]
    pub value_type: String, // 'string', 'number', 'boolean', 'json'
    pub description: Option<String>,
    /// Secret values (API tokens, SMTP passwords) are masked on read
    pub is_secret: bool,
    pub updated_at: DateTime<Utc>,
}

/// Update setting input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSetting {
    pub value: String,
}

impl Setting {
    /// Parse value as the appropriate type
    pub fn parse_value<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match self.value_type.as_str() {
            "json" => serde_json::from_str(&self.value),
            "boolean" => {
                let bool_val = self.value == "true" || self.value == "1";
                serde_json::from_value(serde_json::json!(bool_val))
            }
            "number" => {
                if let Ok(num) = self.value.parse::<i64>() {
                    serde_json::from_value(serde_json::json!(num))
                } else if let Ok(num) = self.value.parse::<f64>() {
                    serde_json::from_value(serde_json::json!(num))
                } else {
                    Err(serde_json::Error::io(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "Invalid number",
                    )))
                }
            }
            _ => serde_json::from_value(serde_json::json!(self.value)),
        }
    }

    /// Value as shown to API consumers; secrets are masked but their
    /// presence stays visible.
    pub fn display_value(&self) -> String {
        if self.is_secret && !self.value.is_empty() {
            "********".to_string()
        } else {
            self.value.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setting(value: &str, value_type: &str, is_secret: bool) -> Setting {
        Setting {
            key: "test".to_string(),
            value: value.to_string(),
            value_type: value_type.to_string(),
            description: None,
            is_secret,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn parses_typed_values() {
        let port: i64 = setting("587", "number", false).parse_value().unwrap();
        assert_eq!(port, 587);

        let enabled: bool = setting("true", "boolean", false).parse_value().unwrap();
        assert!(enabled);

        let tags: Vec<String> = setting(r#"["a","b"]"#, "json", false).parse_value().unwrap();
        assert_eq!(tags, vec!["a", "b"]);
    }

    #[test]
    fn secret_values_are_masked_for_display() {
        assert_eq!(setting("tok-123", "string", true).display_value(), "********");
        // Empty secrets stay empty so the UI can tell "unset" apart
        assert_eq!(setting("", "string", true).display_value(), "");
        assert_eq!(setting("plain", "string", false).display_value(), "plain");
    }
}
