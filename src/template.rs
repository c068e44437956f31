//! Log line templates.
//!
//! A template is plain text with `{{name}}` placeholders. Rendering is a
//! single literal-substitution pass: values are never re-scanned for further
//! placeholders, and placeholders with no matching record entry are left
//! verbatim so callers can simply omit keys for disabled fields.

use regex::Regex;
use std::sync::OnceLock;

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{\{([^{}]*)\}\}").expect("placeholder regex compiles"))
}

/// Ordered key/value bag built fresh for each log phase and consumed by
/// [`LoggingTemplate::format`].
#[derive(Debug, Clone, Default)]
pub struct LogRecord {
    entries: Vec<(String, String)>,
}

impl LogRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a key/value pair; a later insert for the same key wins.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Look up a value, last insert first.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A log line template.
#[derive(Debug, Clone)]
pub struct LoggingTemplate {
    template: Option<String>,
}

impl LoggingTemplate {
    /// Create a template from its text.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: Some(template.into()),
        }
    }

    /// A template that renders to the empty string.
    pub fn empty() -> Self {
        Self { template: None }
    }

    /// Substitute every `{{key}}` with the record's value for `key`.
    ///
    /// Missing keys stay verbatim; an empty template renders `""`.
    pub fn format(&self, record: &LogRecord) -> String {
        let Some(template) = &self.template else {
            return String::new();
        };
        placeholder_regex()
            .replace_all(template, |caps: &regex::Captures<'_>| {
                match record.get(&caps[1]) {
                    Some(value) => value.to_string(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

const DEFAULT_REQUEST_TEMPLATE: &str = "Request Details:\n\
Correlation-Id: {{correlationId}}\n\
Method: {{method}}\n\
URI: {{uri}}\n\
Headers: {{headers}}\n\
Parameters: {{parameters}}\n\
Body: {{body}}";

const DEFAULT_RESPONSE_TEMPLATE: &str = "Response Details:\n\
Correlation-Id: {{correlationId}}\n\
Status: {{status}}\n\
Duration: {{duration}}ms\n\
Headers: {{headers}}\n\
Body: {{body}}";

/// The request and response templates used by the pipeline.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    /// Template for the request-phase record.
    pub request: LoggingTemplate,
    /// Template for the response-phase record.
    pub response: LoggingTemplate,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl TemplateSet {
    /// Start a builder seeded with the default templates.
    pub fn builder() -> TemplateSetBuilder {
        TemplateSetBuilder {
            request: LoggingTemplate::new(DEFAULT_REQUEST_TEMPLATE),
            response: LoggingTemplate::new(DEFAULT_RESPONSE_TEMPLATE),
        }
    }
}

/// Builder for [`TemplateSet`]; custom templates may replace either default.
#[derive(Debug, Clone)]
pub struct TemplateSetBuilder {
    request: LoggingTemplate,
    response: LoggingTemplate,
}

impl TemplateSetBuilder {
    /// Replace the request template.
    pub fn request_template(mut self, template: impl Into<String>) -> Self {
        self.request = LoggingTemplate::new(template);
        self
    }

    /// Replace the response template.
    pub fn response_template(mut self, template: impl Into<String>) -> Self {
        self.response = LoggingTemplate::new(template);
        self
    }

    /// Finish the set.
    pub fn build(self) -> TemplateSet {
        TemplateSet {
            request: self.request,
            response: self.response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> LogRecord {
        let mut record = LogRecord::new();
        for (k, v) in pairs {
            record.insert(*k, *v);
        }
        record
    }

    #[test]
    fn substitutes_every_present_key() {
        let template = LoggingTemplate::new("{{a}} and {{b}} and {{a}}");
        let out = template.format(&record(&[("a", "1"), ("b", "2")]));
        assert_eq!(out, "1 and 2 and 1");
        assert!(!out.contains("{{a}}"));
    }

    #[test]
    fn missing_keys_stay_verbatim() {
        let template = LoggingTemplate::new("Status: {{status}} Duration: {{duration}}ms");
        let out = template.format(&record(&[("status", "200")]));
        assert_eq!(out, "Status: 200 Duration: {{duration}}ms");
    }

    #[test]
    fn empty_template_renders_empty_string() {
        let out = LoggingTemplate::empty().format(&record(&[("a", "1")]));
        assert_eq!(out, "");
    }

    #[test]
    fn empty_value_substitutes_to_empty_string() {
        let template = LoggingTemplate::new("[{{gone}}]");
        assert_eq!(template.format(&record(&[("gone", "")])), "[]");
    }

    #[test]
    fn values_are_not_rescanned_for_placeholders() {
        let template = LoggingTemplate::new("{{body}} {{status}}");
        let out = template.format(&record(&[("body", "{{status}}"), ("status", "200")]));
        assert_eq!(out, "{{status}} 200");
    }

    #[test]
    fn default_templates_carry_named_fields() {
        let set = TemplateSet::default();
        let mut rec = LogRecord::new();
        rec.insert("correlationId", "cid-1");
        rec.insert("method", "POST");
        rec.insert("uri", "/users");
        rec.insert("headers", "-");
        rec.insert("parameters", "-");
        rec.insert("body", "-");
        let line = set.request.format(&rec);
        assert!(line.contains("Method: POST"));
        assert!(line.contains("URI: /users"));
        assert!(line.contains("Correlation-Id: cid-1"));
    }

    #[test]
    fn builder_replaces_only_the_given_template() {
        let set = TemplateSet::builder()
            .response_template("S={{status}}")
            .build();
        let mut rec = LogRecord::new();
        rec.insert("status", "503");
        assert_eq!(set.response.format(&rec), "S=503");
        rec.insert("method", "GET");
        assert!(set.request.format(&rec).contains("Method: GET"));
    }

    #[test]
    fn record_last_insert_wins() {
        let rec = record(&[("k", "first"), ("k", "second")]);
        assert_eq!(rec.get("k"), Some("second"));
    }
}
