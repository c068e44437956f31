//! Runtime configuration surface.
//!
//! Exposes the live logging configuration for reading and partial updates,
//! the way an operations endpoint would. Updates touch only the supplied
//! fields, recompile the masker when masking input changed, and return the
//! full resulting configuration.

use crate::mask::{Masker, SharedMasker};
use crate::properties::SharedProperties;
use serde::Deserialize;

/// Partial configuration update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigUpdate {
    /// Toggle global logging.
    pub enabled: Option<bool>,
    /// Replace the comma-separated structural mask field list.
    pub mask_fields: Option<String>,
    /// Replace the body truncation threshold.
    pub max_body_length: Option<usize>,
}

/// Read/update handle over the shared logging configuration.
#[derive(Clone)]
pub struct ConfigEndpoint {
    properties: SharedProperties,
    masker: SharedMasker,
}

impl ConfigEndpoint {
    /// Build the surface over shared state (the same handles the logging
    /// layer reads from).
    pub fn new(properties: SharedProperties, masker: SharedMasker) -> Self {
        Self { properties, masker }
    }

    /// The current configuration as a JSON document.
    pub fn configuration(&self) -> serde_json::Value {
        serde_json::to_value(self.properties.snapshot()).unwrap_or_default()
    }

    /// Apply a partial update and return the resulting full configuration.
    pub fn update(&self, update: ConfigUpdate) -> serde_json::Value {
        let masking_changed = update.mask_fields.is_some();
        self.properties.update(|props| {
            if let Some(enabled) = update.enabled {
                props.enabled = enabled;
            }
            if let Some(mask_fields) = update.mask_fields {
                props.mask_fields = mask_fields;
            }
            if let Some(max_body_length) = update.max_body_length {
                props.max_body_length = max_body_length;
            }
        });

        if masking_changed {
            // Patterns were validated at load time, so recompilation only
            // picks up the new structural field rules.
            if let Ok(masker) = Masker::compile(&self.properties.snapshot()) {
                self.masker.replace(masker);
            }
        }

        self.configuration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::RequestLoggingProperties;

    fn endpoint() -> ConfigEndpoint {
        let props = RequestLoggingProperties::default();
        let masker = Masker::compile(&props).unwrap();
        ConfigEndpoint::new(SharedProperties::new(props), SharedMasker::new(masker))
    }

    #[test]
    fn configuration_exposes_all_fields() {
        let config = endpoint().configuration();
        assert_eq!(config["enabled"], true);
        assert_eq!(config["includeHeaders"], true);
        assert_eq!(config["includeParameters"], true);
        assert_eq!(config["includeRequestBody"], true);
        assert_eq!(config["includeResponseBody"], true);
        assert_eq!(config["includeTiming"], true);
        assert_eq!(config["maxBodyLength"], 1000);
        assert_eq!(config["excludeHeaders"][0], "Authorization");
        assert_eq!(config["maskFields"], "");
        assert!(config["maskingPatterns"].as_array().unwrap().is_empty());
    }

    #[test]
    fn update_applies_only_supplied_fields() {
        let endpoint = endpoint();
        let config = endpoint.update(ConfigUpdate {
            enabled: Some(false),
            ..Default::default()
        });
        assert_eq!(config["enabled"], false);
        // Everything else keeps its previous value.
        assert_eq!(config["maskFields"], "");
        assert_eq!(config["maxBodyLength"], 1000);
        assert_eq!(config["includeTiming"], true);
    }

    #[test]
    fn update_returns_resulting_full_configuration() {
        let endpoint = endpoint();
        let config = endpoint.update(ConfigUpdate {
            enabled: Some(false),
            mask_fields: Some("password,token".to_string()),
            max_body_length: Some(64),
        });
        assert_eq!(config["enabled"], false);
        assert_eq!(config["maskFields"], "password,token");
        assert_eq!(config["maxBodyLength"], 64);
    }

    #[test]
    fn mask_fields_update_recompiles_the_masker() {
        let props = RequestLoggingProperties::default();
        let masker = SharedMasker::new(Masker::compile(&props).unwrap());
        let shared = SharedProperties::new(props);
        let endpoint = ConfigEndpoint::new(shared, masker.clone());

        let before = masker.current().mask(r#"{"password":"x"}"#, &[]);
        assert_eq!(before.text, r#"{"password":"x"}"#);

        endpoint.update(ConfigUpdate {
            mask_fields: Some("password".to_string()),
            ..Default::default()
        });

        let after = masker.current().mask(r#"{"password":"x"}"#, &[]);
        assert_eq!(after.text, r#"{"password":"***"}"#);
    }
}
