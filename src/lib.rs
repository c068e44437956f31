//! # request-logger
//!
//! Request/response logging middleware with sensitive-data masking.
//!
//! The [`RequestLoggingLayer`] intercepts each request routed through the
//! middleware chain, captures method, URI, headers, query parameters, bodies
//! and timing, redacts sensitive values through configurable masking rules,
//! renders the result through `{{placeholder}}` templates and hands two
//! finished lines (request, response) to a log sink.
//!
//! What gets captured is decided per request: a route can carry an
//! [`EndpointOverride`] whose flags replace the global
//! [`RequestLoggingProperties`] outright, and whose masking rules run in
//! addition to the global ones. Logging is best-effort everywhere; a request
//! that would have succeeded can never fail because of this layer.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use request_logger::{
//!     EndpointOverride, OverrideRegistry, RequestLoggingLayer, RequestLoggingMetrics,
//!     RequestLoggingProperties,
//! };
//!
//! let registry = OverrideRegistry::new()
//!     .route(Method::GET, "/health")
//!     .route_with(
//!         Method::POST,
//!         "/users",
//!         EndpointOverride::new()
//!             .mask_pattern("password:.*:***")
//!             .include_timing(false),
//!     );
//!
//! let layer = RequestLoggingLayer::new(RequestLoggingProperties::default())
//!     .expect("valid configuration")
//!     .with_registry(registry)
//!     .with_metrics(RequestLoggingMetrics::new())
//!     .with_config_endpoint("/request-logger/config");
//! # let _ = layer;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod capture;
pub mod endpoint;
pub mod interceptor;
pub mod mask;
pub mod metrics;
pub mod middleware;
pub mod properties;
pub mod request;
pub mod response;
pub mod template;
pub mod util;

pub use capture::{
    is_excluded_header, should_capture, should_log, CaptureField, EndpointOverride,
    OverrideRegistry, RegisteredRoute,
};
pub use endpoint::{ConfigEndpoint, ConfigUpdate};
pub use interceptor::{
    ConsoleSink, CorrelationId, HandlerError, LogLevel, LogSink, RequestLoggingLayer, TracingSink,
};
pub use mask::{MaskOutcome, MaskRule, Masker, SharedMasker};
pub use metrics::RequestLoggingMetrics;
pub use middleware::{BoxedNext, LayerStack, MiddlewareLayer};
pub use properties::{
    MaskingPattern, PropertiesError, RequestLoggingProperties, SharedProperties,
};
pub use request::Request;
pub use response::{buffer_body, json_response, Response};
pub use template::{LogRecord, LoggingTemplate, TemplateSet, TemplateSetBuilder};
