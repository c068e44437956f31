//! The interception pipeline.
//!
//! [`RequestLoggingLayer`] wraps handler dispatch and emits two log lines
//! per intercepted request: a request record before-the-fact data
//! (method/URI/headers/parameters/body) and a response record
//! (status/duration/body), both filtered by the capture decision, redacted
//! by the masking engine and rendered through the templates. Logging is
//! best-effort throughout: nothing in this layer can fail a request that
//! would otherwise have succeeded.

use crate::capture::{self, CaptureField, EndpointOverride, OverrideRegistry};
use crate::endpoint::{ConfigEndpoint, ConfigUpdate};
use crate::mask::{Masker, SharedMasker};
use crate::middleware::{BoxedNext, MiddlewareLayer};
use crate::properties::{PropertiesError, RequestLoggingProperties, SharedProperties};
use crate::request::Request;
use crate::response::{buffer_body, json_response, Response};
use crate::template::{LogRecord, TemplateSet};
use crate::util;
use http::{HeaderMap, Method, StatusCode};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

/// Severity attached to an emitted log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Normal completion records.
    Info,
    /// Degraded extraction and other recoverable conditions.
    Warn,
}

impl LogLevel {
    /// The severity label.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
        }
    }
}

/// Destination for finished log lines.
///
/// The pipeline hands over a fully rendered string plus a severity; the sink
/// decides where it goes. [`TracingSink`] is the default; tests inject a
/// recording sink.
pub trait LogSink: Send + Sync + 'static {
    /// Write one finished line.
    fn emit(&self, level: LogLevel, line: &str);
}

/// Default sink: forwards lines to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, level: LogLevel, line: &str) {
        match level {
            LogLevel::Info => tracing::info!("{line}"),
            LogLevel::Warn => tracing::warn!("{line}"),
        }
    }
}

/// Stdout sink with optional ANSI-colored severity labels.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleSink {
    enable_ansi_color: bool,
}

impl ConsoleSink {
    /// Create a console sink; coloring follows `enableAnsiColor`.
    pub fn new(enable_ansi_color: bool) -> Self {
        Self { enable_ansi_color }
    }
}

impl LogSink for ConsoleSink {
    fn emit(&self, level: LogLevel, line: &str) {
        println!(
            "{} {line}",
            util::colorize(level.as_str(), self.enable_ansi_color)
        );
    }
}

/// Per-request correlation id, stored in the request extensions so handlers
/// and other layers can read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

/// Marker inserted into the response extensions by the application's error
/// layer when the handler failed. The pipeline appends the message to the
/// status line; it never suppresses or rewrites the response itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError(pub String);

const EMPTY_FIELD: &str = "-";

/// Request/response logging middleware.
#[derive(Clone)]
pub struct RequestLoggingLayer {
    properties: SharedProperties,
    masker: SharedMasker,
    registry: Option<Arc<OverrideRegistry>>,
    templates: Arc<TemplateSet>,
    metrics: Option<crate::metrics::RequestLoggingMetrics>,
    sink: Arc<dyn LogSink>,
    config_path: Option<String>,
}

impl RequestLoggingLayer {
    /// Validate `properties`, compile the masker and build the layer with
    /// defaults: no registry (every route instrumented, no overrides), no
    /// metrics, default templates, `tracing` sink.
    pub fn new(properties: RequestLoggingProperties) -> Result<Self, PropertiesError> {
        properties.validate()?;
        let masker = Masker::compile(&properties)?;
        Ok(Self {
            properties: SharedProperties::new(properties),
            masker: SharedMasker::new(masker),
            registry: None,
            templates: Arc::new(TemplateSet::default()),
            metrics: None,
            sink: Arc::new(TracingSink),
            config_path: None,
        })
    }

    /// Attach the instrumented-route table. Requests not registered in it
    /// pass through without any logging context.
    pub fn with_registry(mut self, registry: OverrideRegistry) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// Attach the metrics collaborator. Without one, metric updates are a
    /// no-op and logging is unaffected.
    pub fn with_metrics(mut self, metrics: crate::metrics::RequestLoggingMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Replace the log sink.
    pub fn with_sink(mut self, sink: impl LogSink) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Replace the request/response templates.
    pub fn with_templates(mut self, templates: TemplateSet) -> Self {
        self.templates = Arc::new(templates);
        self
    }

    /// Serve the runtime configuration surface over HTTP at `path`:
    /// GET returns the configuration, POST applies a partial update.
    pub fn with_config_endpoint(mut self, path: impl Into<String>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// A read/update handle over this layer's live configuration.
    pub fn config_endpoint(&self) -> ConfigEndpoint {
        ConfigEndpoint::new(self.properties.clone(), self.masker.clone())
    }

    fn serve_config(&self, req: &Request) -> Option<Response> {
        let path = self.config_path.as_deref()?;
        if req.path() != path {
            return None;
        }
        let endpoint = self.config_endpoint();
        if req.method() == Method::GET {
            Some(json_response(StatusCode::OK, &endpoint.configuration()))
        } else if req.method() == Method::POST {
            match serde_json::from_slice::<ConfigUpdate>(req.body()) {
                Ok(update) => Some(json_response(StatusCode::OK, &endpoint.update(update))),
                Err(e) => Some(json_response(
                    StatusCode::BAD_REQUEST,
                    &serde_json::json!({ "error": e.to_string() }),
                )),
            }
        } else {
            Some(json_response(
                StatusCode::METHOD_NOT_ALLOWED,
                &serde_json::json!({ "error": "use GET or POST" }),
            ))
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_request_record(
        &self,
        correlation_id: &str,
        method: &Method,
        path: &str,
        headers: &HeaderMap,
        params: &[(String, String)],
        body: &[u8],
        endpoint: Option<&EndpointOverride>,
        properties: &RequestLoggingProperties,
        masker: &Masker,
        masked_total: &mut usize,
    ) -> LogRecord {
        let mut record = LogRecord::new();
        record.insert("correlationId", correlation_id);
        record.insert("method", method.as_str());
        record.insert("uri", path);
        if let Some(note) = endpoint.and_then(EndpointOverride::note) {
            record.insert("message", note);
        }

        if capture::should_capture(CaptureField::Headers, endpoint, properties) {
            let rendered = render_headers(headers, endpoint, properties);
            record.insert("headers", non_empty_or_dash(rendered));
        }

        if capture::should_capture(CaptureField::Parameters, endpoint, properties) {
            let rendered = render_parameters(params, masker, masked_total);
            record.insert("parameters", non_empty_or_dash(rendered));
        }

        let limit = body_limit(endpoint, properties);
        if capture::should_capture(CaptureField::RequestBody, endpoint, properties)
            && !body.is_empty()
        {
            let text = util::truncate_utf8(body, limit);
            if text.is_empty() {
                tracing::warn!("failed to decode request body for logging");
                record.insert("body", EMPTY_FIELD);
            } else {
                let endpoint_rules = endpoint.map(EndpointOverride::mask_rules).unwrap_or(&[]);
                let outcome = masker.mask(&text, endpoint_rules);
                *masked_total += outcome.masked;
                record.insert("body", outcome.text);
            }
        } else {
            record.insert("body", EMPTY_FIELD);
        }

        record
    }

    #[allow(clippy::too_many_arguments)]
    fn build_response_record(
        &self,
        correlation_id: &str,
        status: StatusCode,
        error: Option<&HandlerError>,
        elapsed_ms: u128,
        body: &[u8],
        endpoint: Option<&EndpointOverride>,
        properties: &RequestLoggingProperties,
        masker: &Masker,
        masked_total: &mut usize,
    ) -> LogRecord {
        let mut record = LogRecord::new();
        record.insert("correlationId", correlation_id);

        let status_text = match error {
            Some(HandlerError(message)) => format!("{} (Error: {message})", status.as_u16()),
            None => status.as_u16().to_string(),
        };
        record.insert("status", status_text);

        if capture::should_capture(CaptureField::Timing, endpoint, properties) {
            record.insert("duration", elapsed_ms.to_string());
        }

        // The response headers are not captured; the template slot stays
        // filled with the sentinel.
        record.insert("headers", EMPTY_FIELD);

        let limit = body_limit(endpoint, properties);
        if capture::should_capture(CaptureField::ResponseBody, endpoint, properties)
            && !body.is_empty()
        {
            let text = util::truncate_utf8(body, limit);
            if text.is_empty() {
                tracing::warn!("failed to decode response body for logging");
                record.insert("body", EMPTY_FIELD);
            } else {
                let endpoint_rules = endpoint.map(EndpointOverride::mask_rules).unwrap_or(&[]);
                let outcome = masker.mask(&text, endpoint_rules);
                *masked_total += outcome.masked;
                record.insert("body", outcome.text);
            }
        } else {
            record.insert("body", EMPTY_FIELD);
        }

        record
    }
}

fn body_limit(
    endpoint: Option<&EndpointOverride>,
    properties: &RequestLoggingProperties,
) -> usize {
    endpoint
        .and_then(EndpointOverride::body_limit)
        .unwrap_or(properties.max_body_length)
}

fn non_empty_or_dash(rendered: String) -> String {
    if rendered.is_empty() {
        EMPTY_FIELD.to_string()
    } else {
        rendered
    }
}

fn render_headers(
    headers: &HeaderMap,
    endpoint: Option<&EndpointOverride>,
    properties: &RequestLoggingProperties,
) -> String {
    let mut entries: Vec<(String, String)> = headers
        .iter()
        .filter(|(name, _)| !capture::is_excluded_header(name.as_str(), endpoint, properties))
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    if entries.is_empty() {
        return String::new();
    }
    // Deterministic order; HeaderMap iteration order is arbitrary.
    entries.sort();
    let joined: Vec<String> = entries
        .into_iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    format!("{{{}}}", joined.join(", "))
}

fn render_parameters(
    params: &[(String, String)],
    masker: &Masker,
    masked_total: &mut usize,
) -> String {
    if params.is_empty() {
        return String::new();
    }
    let joined: Vec<String> = params
        .iter()
        .map(|(key, value)| {
            let key = masker.mask_parameter(key);
            let value = masker.mask_parameter(value);
            *masked_total += key.masked + value.masked;
            format!("{}={}", key.text, value.text)
        })
        .collect();
    format!("{{{}}}", joined.join(", "))
}

impl MiddlewareLayer for RequestLoggingLayer {
    fn call(
        &self,
        mut req: Request,
        next: BoxedNext,
    ) -> Pin<Box<dyn Future<Output = Response> + Send + 'static>> {
        let layer = self.clone();

        Box::pin(async move {
            if let Some(response) = layer.serve_config(&req) {
                return response;
            }

            let method = req.method().clone();
            let path = req.path().to_string();

            // Route resolution: with a registry attached, unregistered
            // routes are a pure pass-through and no context is created.
            let endpoint: Option<EndpointOverride> = match &layer.registry {
                Some(registry) => match registry.lookup(&method, &path) {
                    Some(route) => route.endpoint_override().cloned(),
                    None => return next(req).await,
                },
                None => None,
            };

            // STARTED: stamp the clock and the correlation id.
            let start = Instant::now();
            let correlation_id = util::generate_correlation_id();
            req.extensions_mut()
                .insert(CorrelationId(correlation_id.clone()));

            // Snapshot request data now; the request is handed to the
            // handler and the body bytes are only cheaply refcounted here.
            let headers = req.headers().clone();
            let params = req.query_params();
            let request_body = req.body().clone();

            let response = next(req).await;

            // COMPLETING: runs whether or not the handler succeeded.
            let properties = layer.properties.snapshot();
            if !capture::should_log(endpoint.as_ref(), &properties) {
                return response;
            }
            let masker = layer.masker.current();
            let mut masked_total = 0usize;

            let request_record = layer.build_request_record(
                &correlation_id,
                &method,
                &path,
                &headers,
                &params,
                &request_body,
                endpoint.as_ref(),
                &properties,
                &masker,
                &mut masked_total,
            );
            layer
                .sink
                .emit(LogLevel::Info, &layer.templates.request.format(&request_record));

            let error = response.extensions().get::<HandlerError>().cloned();
            let status = response.status();
            let capture_response_body =
                capture::should_capture(CaptureField::ResponseBody, endpoint.as_ref(), &properties);
            let (response, response_body) = if capture_response_body {
                buffer_body(response).await
            } else {
                (response, bytes::Bytes::new())
            };

            let response_record = layer.build_response_record(
                &correlation_id,
                status,
                error.as_ref(),
                start.elapsed().as_millis(),
                &response_body,
                endpoint.as_ref(),
                &properties,
                &masker,
                &mut masked_total,
            );
            layer
                .sink
                .emit(LogLevel::Info, &layer.templates.response.format(&response_record));

            // DONE: fire metrics once, iff a collaborator is attached.
            if let Some(metrics) = &layer.metrics {
                metrics.increment_total_requests();
                metrics.add_masked_fields(masked_total);
                if error.is_some() {
                    metrics.increment_errors();
                }
                metrics.observe_duration(start.elapsed().as_secs_f64());
            }

            response
        })
    }

    fn clone_box(&self) -> Box<dyn MiddlewareLayer> {
        Box::new(self.clone())
    }
}
