//! Logging configuration: global capture flags, header exclusions, body
//! limits and masking patterns.
//!
//! Properties are loaded once (any serde-compatible source works), validated,
//! then shared read-only across in-flight requests. The only mutation path is
//! the runtime configuration surface in [`crate::endpoint`].

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors raised while validating logging properties at load time.
#[derive(Debug, Error)]
pub enum PropertiesError {
    /// A masking rule carries a regex that does not compile. Rejected at
    /// startup so a bad pattern can never surface mid-request.
    #[error("invalid masking pattern `{pattern}`: {source}")]
    InvalidPattern {
        /// The offending pattern text.
        pattern: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },
}

/// One global masking rule.
///
/// `pattern` is a full regular expression applied to the whole content;
/// `field_name` is informational (structural field masks come from
/// `mask_fields` and endpoint rules). A rule with an empty pattern or
/// replacement is treated as misconfigured and skipped, not an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct MaskingPattern {
    /// Optional field name the rule is meant to cover.
    pub field_name: Option<String>,
    /// Regular expression matched against the content.
    pub pattern: String,
    /// Replacement text for every match.
    pub replacement: String,
}

impl MaskingPattern {
    /// Build a rule from a pattern and replacement.
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            field_name: None,
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

/// Global request-logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestLoggingProperties {
    /// Whether request logging is enabled globally. Routes with an endpoint
    /// override are logged regardless.
    pub enabled: bool,
    /// ANSI color output for console severity labels. Cosmetic only.
    pub enable_ansi_color: bool,
    /// Include request headers in the request record.
    pub include_headers: bool,
    /// Include query parameters in the request record.
    pub include_parameters: bool,
    /// Include the request body in the request record.
    pub include_request_body: bool,
    /// Include the response body in the response record.
    pub include_response_body: bool,
    /// Include the handling duration in the response record.
    pub include_timing: bool,
    /// Maximum number of body bytes captured; longer bodies are truncated
    /// silently.
    pub max_body_length: usize,
    /// Header names omitted from captured headers (case-insensitive).
    pub exclude_headers: Vec<String>,
    /// Global regex masking rules.
    pub masking_patterns: Vec<MaskingPattern>,
    /// Comma-separated field names to mask structurally in bodies.
    /// Updatable at runtime through the configuration surface.
    pub mask_fields: String,
}

impl Default for RequestLoggingProperties {
    fn default() -> Self {
        Self {
            enabled: true,
            enable_ansi_color: true,
            include_headers: true,
            include_parameters: true,
            include_request_body: true,
            include_response_body: true,
            include_timing: true,
            max_body_length: 1000,
            exclude_headers: vec!["Authorization".to_string(), "Cookie".to_string()],
            masking_patterns: Vec::new(),
            mask_fields: String::new(),
        }
    }
}

impl RequestLoggingProperties {
    /// Check that every configured masking regex compiles.
    ///
    /// Rules with an empty pattern or replacement are skipped at apply time
    /// and therefore not validated here.
    pub fn validate(&self) -> Result<(), PropertiesError> {
        for rule in &self.masking_patterns {
            if rule.pattern.is_empty() || rule.replacement.is_empty() {
                continue;
            }
            regex::Regex::new(&rule.pattern).map_err(|source| {
                PropertiesError::InvalidPattern {
                    pattern: rule.pattern.clone(),
                    source,
                }
            })?;
        }
        Ok(())
    }

    /// Field names parsed out of `mask_fields`, trimmed, empties dropped.
    pub fn mask_field_names(&self) -> Vec<String> {
        self.mask_fields
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Whether `name` is excluded from header capture (case-insensitive).
    pub fn is_excluded_header(&self, name: &str) -> bool {
        self.exclude_headers
            .iter()
            .any(|excluded| excluded.eq_ignore_ascii_case(name))
    }
}

/// Shared, read-mostly handle to the logging properties.
///
/// Requests take a cheap snapshot at completion time; the runtime
/// configuration surface is the only writer.
#[derive(Clone, Default)]
pub struct SharedProperties {
    inner: Arc<RwLock<RequestLoggingProperties>>,
}

impl SharedProperties {
    /// Wrap validated properties for concurrent use.
    pub fn new(properties: RequestLoggingProperties) -> Self {
        Self {
            inner: Arc::new(RwLock::new(properties)),
        }
    }

    /// Clone the current properties.
    pub fn snapshot(&self) -> RequestLoggingProperties {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Apply a mutation under the write lock.
    pub fn update<F: FnOnce(&mut RequestLoggingProperties)>(&self, apply: F) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        apply(&mut guard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let props = RequestLoggingProperties::default();
        assert!(props.enabled);
        assert!(props.include_headers);
        assert!(props.include_parameters);
        assert!(props.include_request_body);
        assert!(props.include_response_body);
        assert!(props.include_timing);
        assert_eq!(props.max_body_length, 1000);
        assert_eq!(props.exclude_headers, vec!["Authorization", "Cookie"]);
        assert!(props.masking_patterns.is_empty());
        assert!(props.mask_fields.is_empty());
    }

    #[test]
    fn validate_rejects_bad_regex() {
        let mut props = RequestLoggingProperties::default();
        props.masking_patterns.push(MaskingPattern::new("([unclosed", "***"));
        let err = props.validate().unwrap_err();
        assert!(matches!(err, PropertiesError::InvalidPattern { .. }));
        assert!(err.to_string().contains("([unclosed"));
    }

    #[test]
    fn validate_skips_empty_rules() {
        let mut props = RequestLoggingProperties::default();
        props.masking_patterns.push(MaskingPattern::new("", "***"));
        props.masking_patterns.push(MaskingPattern::new("secret", ""));
        assert!(props.validate().is_ok());
    }

    #[test]
    fn deserializes_partial_camel_case_document() {
        let props: RequestLoggingProperties = serde_json::from_str(
            r#"{
                "enabled": false,
                "maxBodyLength": 256,
                "excludeHeaders": ["X-Api-Key"],
                "maskingPatterns": [
                    {"fieldName": "ssn", "pattern": "\\d{3}-\\d{2}-\\d{4}", "replacement": "***"}
                ]
            }"#,
        )
        .unwrap();
        assert!(!props.enabled);
        // Unsupplied fields keep their defaults.
        assert!(props.include_headers);
        assert_eq!(props.max_body_length, 256);
        assert_eq!(props.exclude_headers, vec!["X-Api-Key"]);
        assert_eq!(props.masking_patterns[0].field_name.as_deref(), Some("ssn"));
    }

    #[test]
    fn mask_field_names_splits_and_trims() {
        let mut props = RequestLoggingProperties::default();
        props.mask_fields = "password, token ,,ssn".to_string();
        assert_eq!(props.mask_field_names(), vec!["password", "token", "ssn"]);
    }

    #[test]
    fn header_exclusion_is_case_insensitive() {
        let props = RequestLoggingProperties::default();
        assert!(props.is_excluded_header("authorization"));
        assert!(props.is_excluded_header("COOKIE"));
        assert!(!props.is_excluded_header("X-Custom"));
    }

    #[test]
    fn shared_properties_update_is_visible_to_snapshots() {
        let shared = SharedProperties::new(RequestLoggingProperties::default());
        shared.update(|props| props.enabled = false);
        assert!(!shared.snapshot().enabled);
    }
}
