//! Masking engine: rewrites sensitive values before a record reaches the
//! log sink.
//!
//! Two rule sources run over the same text in a fixed order: endpoint rules
//! (structural, field-name based) first, then the global rules compiled from
//! [`RequestLoggingProperties`]. Both passes are plain regex substitutions,
//! so a later pass may further transform content already rewritten by an
//! earlier one; that ordering is deliberate and covered by tests.
//!
//! Masking is best-effort by contract: malformed rules are skipped and no
//! code path here can abort a log record.

use crate::properties::{PropertiesError, RequestLoggingProperties};
use regex::{NoExpand, Regex};

const DEFAULT_REPLACEMENT: &str = "***";

/// A per-endpoint structural masking rule, parsed from a
/// `field:pattern:replacement` triple.
///
/// The match is structural: a JSON-style assignment `"field":"<value>"` is
/// rewritten to `"field":"<replacement>"`. The field name is escaped so the
/// rule cannot fire inside a longer field name, and the middle `pattern`
/// component is accepted for compatibility but does not drive the match.
#[derive(Clone, Debug)]
pub struct MaskRule {
    field: String,
    regex: Regex,
    rendered: String,
}

impl MaskRule {
    /// Parse a rule triple. Returns `None` for malformed specs (fewer than
    /// two components or an empty field name); callers skip those silently.
    pub fn parse(spec: &str) -> Option<Self> {
        let mut parts = spec.splitn(3, ':');
        let field = parts.next()?;
        parts.next()?;
        let replacement = parts.next().unwrap_or(DEFAULT_REPLACEMENT);
        if field.is_empty() {
            return None;
        }
        Some(Self::structural(field, replacement))
    }

    /// Build a structural rule for `field` directly.
    pub fn structural(field: &str, replacement: &str) -> Self {
        let regex = Regex::new(&format!("\"{}\":\"[^\"]*\"", regex::escape(field)))
            .expect("escaped field pattern always compiles");
        Self {
            field: field.to_string(),
            regex,
            rendered: format!("\"{field}\":\"{replacement}\""),
        }
    }

    /// The field name this rule covers.
    pub fn field(&self) -> &str {
        &self.field
    }

    fn apply(&self, content: &str) -> (String, usize) {
        let hits = self.regex.find_iter(content).count();
        if hits == 0 {
            return (content.to_string(), 0);
        }
        (
            self.regex
                .replace_all(content, NoExpand(&self.rendered))
                .into_owned(),
            hits,
        )
    }
}

/// Result of one masking pass: the rewritten text and how many
/// substitutions were made (reported to the metrics collaborator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskOutcome {
    /// The redacted text.
    pub text: String,
    /// Number of substitutions across all rules.
    pub masked: usize,
}

/// Compiled global masking rules.
///
/// Built once from validated properties; recompiled only when the runtime
/// configuration surface changes `mask_fields`. Cheap to clone (compiled
/// regexes are reference-counted).
#[derive(Clone, Default)]
pub struct Masker {
    field_rules: Vec<MaskRule>,
    global_rules: Vec<(Regex, String)>,
}

impl Masker {
    /// Compile the masker from properties. Fails on a regex that does not
    /// compile, mirroring [`RequestLoggingProperties::validate`].
    pub fn compile(properties: &RequestLoggingProperties) -> Result<Self, PropertiesError> {
        let field_rules = properties
            .mask_field_names()
            .iter()
            .map(|field| MaskRule::structural(field, DEFAULT_REPLACEMENT))
            .collect();

        let mut global_rules = Vec::new();
        for rule in &properties.masking_patterns {
            // Misconfigured rule, not an error.
            if rule.pattern.is_empty() || rule.replacement.is_empty() {
                continue;
            }
            let regex = Regex::new(&rule.pattern).map_err(|source| {
                PropertiesError::InvalidPattern {
                    pattern: rule.pattern.clone(),
                    source,
                }
            })?;
            global_rules.push((regex, rule.replacement.clone()));
        }

        Ok(Self {
            field_rules,
            global_rules,
        })
    }

    /// Redact `content`, endpoint rules first, then the global rules.
    pub fn mask(&self, content: &str, endpoint_rules: &[MaskRule]) -> MaskOutcome {
        if content.is_empty() {
            return MaskOutcome {
                text: String::new(),
                masked: 0,
            };
        }

        let mut text = content.to_string();
        let mut masked = 0;

        for rule in endpoint_rules {
            let (next, hits) = rule.apply(&text);
            text = next;
            masked += hits;
        }

        let outcome = self.apply_global(&text);
        MaskOutcome {
            text: outcome.text,
            masked: masked + outcome.masked,
        }
    }

    /// Key-masking mode for parameter names and values: the global rules
    /// only, applied to one key or one value at a time. Kept separate from
    /// the structural body path on purpose; the two modes behave differently
    /// and are tested independently.
    pub fn mask_parameter(&self, text: &str) -> MaskOutcome {
        if text.is_empty() {
            return MaskOutcome {
                text: String::new(),
                masked: 0,
            };
        }
        self.apply_global(text)
    }

    fn apply_global(&self, content: &str) -> MaskOutcome {
        let mut text = content.to_string();
        let mut masked = 0;

        for rule in &self.field_rules {
            let (next, hits) = rule.apply(&text);
            text = next;
            masked += hits;
        }

        for (regex, replacement) in &self.global_rules {
            let hits = regex.find_iter(&text).count();
            if hits > 0 {
                text = regex.replace_all(&text, replacement.as_str()).into_owned();
                masked += hits;
            }
        }

        MaskOutcome { text, masked }
    }
}

/// Shared handle to the compiled masker.
///
/// Requests clone the current masker (compiled regexes are reference
/// counted); the runtime configuration surface swaps in a recompiled one
/// when `mask_fields` changes.
#[derive(Clone, Default)]
pub struct SharedMasker {
    inner: std::sync::Arc<std::sync::RwLock<Masker>>,
}

impl SharedMasker {
    /// Wrap a compiled masker.
    pub fn new(masker: Masker) -> Self {
        Self {
            inner: std::sync::Arc::new(std::sync::RwLock::new(masker)),
        }
    }

    /// Clone the current masker.
    pub fn current(&self) -> Masker {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Swap in a recompiled masker.
    pub fn replace(&self, masker: Masker) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = masker;
    }
}
