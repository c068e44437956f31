//! Capture decisions: which facets of a request get recorded.
//!
//! A route can carry an [`EndpointOverride`] whose flags fully replace the
//! global defaults for that route (no per-field merge). Overrides live in an
//! [`OverrideRegistry`] built once at route-registration time and looked up
//! as a plain value per request; no runtime reflection or metadata scanning.

use crate::mask::MaskRule;
use crate::properties::RequestLoggingProperties;
use http::Method;
use std::collections::HashMap;

/// A request/response facet controlled by a capture flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureField {
    /// Request headers.
    Headers,
    /// Query parameters.
    Parameters,
    /// Request body.
    RequestBody,
    /// Response body.
    ResponseBody,
    /// Handling duration.
    Timing,
}

/// Per-route capture configuration.
///
/// When attached to a route, each flag and the header-exclude set replace the
/// global value outright; mask rules are applied in addition to the global
/// rules, never instead of them.
#[derive(Debug, Clone)]
pub struct EndpointOverride {
    include_headers: bool,
    include_parameters: bool,
    include_request_body: bool,
    include_response_body: bool,
    include_timing: bool,
    exclude_headers: Vec<String>,
    mask_rules: Vec<MaskRule>,
    max_body_length: Option<usize>,
    message: String,
}

impl Default for EndpointOverride {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointOverride {
    /// An override with every facet enabled and the default header
    /// exclusions (`Authorization`, `Cookie`).
    pub fn new() -> Self {
        Self {
            include_headers: true,
            include_parameters: true,
            include_request_body: true,
            include_response_body: true,
            include_timing: true,
            exclude_headers: vec!["Authorization".to_string(), "Cookie".to_string()],
            mask_rules: Vec::new(),
            max_body_length: None,
            message: String::new(),
        }
    }

    /// Set the headers flag.
    pub fn include_headers(mut self, enabled: bool) -> Self {
        self.include_headers = enabled;
        self
    }

    /// Set the parameters flag.
    pub fn include_parameters(mut self, enabled: bool) -> Self {
        self.include_parameters = enabled;
        self
    }

    /// Set the request-body flag.
    pub fn include_request_body(mut self, enabled: bool) -> Self {
        self.include_request_body = enabled;
        self
    }

    /// Set the response-body flag.
    pub fn include_response_body(mut self, enabled: bool) -> Self {
        self.include_response_body = enabled;
        self
    }

    /// Set the timing flag.
    pub fn include_timing(mut self, enabled: bool) -> Self {
        self.include_timing = enabled;
        self
    }

    /// Replace the header-exclusion set for this route.
    pub fn exclude_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Add a `field:pattern:replacement` masking triple. Malformed triples
    /// are dropped silently; masking must never fail a request.
    pub fn mask_pattern(mut self, spec: &str) -> Self {
        if let Some(rule) = MaskRule::parse(spec) {
            self.mask_rules.push(rule);
        }
        self
    }

    /// Cap captured body bytes for this route, overriding the global limit.
    pub fn max_body_length(mut self, limit: usize) -> Self {
        self.max_body_length = Some(limit);
        self
    }

    /// Attach a free-form note included in the request record.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// The capture flag for `field`.
    pub fn flag(&self, field: CaptureField) -> bool {
        match field {
            CaptureField::Headers => self.include_headers,
            CaptureField::Parameters => self.include_parameters,
            CaptureField::RequestBody => self.include_request_body,
            CaptureField::ResponseBody => self.include_response_body,
            CaptureField::Timing => self.include_timing,
        }
    }

    /// This route's masking rules.
    pub fn mask_rules(&self) -> &[MaskRule] {
        &self.mask_rules
    }

    /// The per-route body limit, if any.
    pub fn body_limit(&self) -> Option<usize> {
        self.max_body_length
    }

    /// The free-form note, if any.
    pub fn note(&self) -> Option<&str> {
        if self.message.is_empty() {
            None
        } else {
            Some(&self.message)
        }
    }

    fn excludes_header(&self, name: &str) -> bool {
        self.exclude_headers
            .iter()
            .any(|excluded| excluded.eq_ignore_ascii_case(name))
    }

    fn has_exclusions(&self) -> bool {
        !self.exclude_headers.is_empty()
    }
}

/// Decide whether `field` is captured for this request: an override's flag
/// wins outright, otherwise the global flag applies.
pub fn should_capture(
    field: CaptureField,
    endpoint: Option<&EndpointOverride>,
    properties: &RequestLoggingProperties,
) -> bool {
    match endpoint {
        Some(over) => over.flag(field),
        None => match field {
            CaptureField::Headers => properties.include_headers,
            CaptureField::Parameters => properties.include_parameters,
            CaptureField::RequestBody => properties.include_request_body,
            CaptureField::ResponseBody => properties.include_response_body,
            CaptureField::Timing => properties.include_timing,
        },
    }
}

/// Whether this request produces log lines at all: yes when an override
/// exists for its route or logging is globally enabled.
pub fn should_log(
    endpoint: Option<&EndpointOverride>,
    properties: &RequestLoggingProperties,
) -> bool {
    endpoint.is_some() || properties.enabled
}

/// Whether a header name is withheld from the captured set.
///
/// A non-empty override set replaces the global one; otherwise the global
/// exclusions apply. Independent of the whole-field headers flag.
pub fn is_excluded_header(
    name: &str,
    endpoint: Option<&EndpointOverride>,
    properties: &RequestLoggingProperties,
) -> bool {
    if let Some(over) = endpoint {
        if over.has_exclusions() {
            return over.excludes_header(name);
        }
    }
    properties.is_excluded_header(name)
}

/// An instrumented route, with or without an override.
#[derive(Debug, Clone, Default)]
pub struct RegisteredRoute {
    endpoint: Option<EndpointOverride>,
}

impl RegisteredRoute {
    /// The route's override, if one was attached.
    pub fn endpoint_override(&self) -> Option<&EndpointOverride> {
        self.endpoint.as_ref()
    }
}

/// Static lookup table of instrumented routes, built once at registration.
///
/// Requests whose method+path are not registered pass through the logging
/// layer untouched (the pipeline never creates a context for them).
#[derive(Debug, Clone, Default)]
pub struct OverrideRegistry {
    routes: HashMap<String, RegisteredRoute>,
}

impl OverrideRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instrumented route using the global configuration.
    pub fn route(mut self, method: Method, path: &str) -> Self {
        self.routes
            .insert(route_key(&method, path), RegisteredRoute::default());
        self
    }

    /// Register an instrumented route with an override.
    pub fn route_with(mut self, method: Method, path: &str, endpoint: EndpointOverride) -> Self {
        self.routes.insert(
            route_key(&method, path),
            RegisteredRoute {
                endpoint: Some(endpoint),
            },
        );
        self
    }

    /// Resolve a request to its registered route, if any.
    pub fn lookup(&self, method: &Method, path: &str) -> Option<&RegisteredRoute> {
        self.routes.get(&route_key(method, path))
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn route_key(method: &Method, path: &str) -> String {
    format!("{} {}", method.as_str(), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_flag_wins_outright() {
        let props = RequestLoggingProperties {
            include_headers: true,
            ..Default::default()
        };
        let over = EndpointOverride::new().include_headers(false);
        assert!(!should_capture(CaptureField::Headers, Some(&over), &props));
        assert!(should_capture(CaptureField::Headers, None, &props));
    }

    #[test]
    fn global_flag_applies_without_override() {
        let props = RequestLoggingProperties {
            include_request_body: false,
            ..Default::default()
        };
        assert!(!should_capture(CaptureField::RequestBody, None, &props));
        assert!(should_capture(CaptureField::ResponseBody, None, &props));
    }

    #[test]
    fn request_logged_when_override_present_even_if_disabled() {
        let props = RequestLoggingProperties {
            enabled: false,
            ..Default::default()
        };
        let over = EndpointOverride::new();
        assert!(should_log(Some(&over), &props));
        assert!(!should_log(None, &props));
    }

    #[test]
    fn default_exclusions_drop_authorization_and_cookie() {
        let props = RequestLoggingProperties::default();
        assert!(is_excluded_header("Authorization", None, &props));
        assert!(is_excluded_header("cookie", None, &props));
        assert!(!is_excluded_header("X-Custom", None, &props));
    }

    #[test]
    fn override_exclusions_replace_global_set() {
        let props = RequestLoggingProperties::default();
        let over = EndpointOverride::new().exclude_headers(["X-Secret"]);
        assert!(is_excluded_header("X-Secret", Some(&over), &props));
        // Authorization is only in the global set, which the override
        // replaced wholesale.
        assert!(!is_excluded_header("Authorization", Some(&over), &props));
    }

    #[test]
    fn empty_override_exclusions_fall_back_to_global() {
        let props = RequestLoggingProperties::default();
        let over = EndpointOverride::new().exclude_headers(Vec::<String>::new());
        assert!(is_excluded_header("Authorization", Some(&over), &props));
    }

    #[test]
    fn malformed_mask_pattern_is_dropped() {
        let over = EndpointOverride::new()
            .mask_pattern("password:.*:***")
            .mask_pattern("nonsense");
        assert_eq!(over.mask_rules().len(), 1);
        assert_eq!(over.mask_rules()[0].field(), "password");
    }

    #[test]
    fn registry_lookup_is_method_and_path_exact() {
        let registry = OverrideRegistry::new()
            .route(Method::GET, "/public")
            .route_with(
                Method::POST,
                "/login",
                EndpointOverride::new().mask_pattern("password:.*:***"),
            );
        assert_eq!(registry.len(), 2);

        let public = registry.lookup(&Method::GET, "/public").unwrap();
        assert!(public.endpoint_override().is_none());

        let login = registry.lookup(&Method::POST, "/login").unwrap();
        assert!(login.endpoint_override().is_some());

        assert!(registry.lookup(&Method::GET, "/login").is_none());
        assert!(registry.lookup(&Method::GET, "/missing").is_none());
    }
}
