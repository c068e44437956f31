//! Buffered request wrapper handed to the logging layer.
//!
//! The host server is responsible for reading the body into memory before the
//! chain runs (the content-caching role); the layer only inspects the
//! already-buffered bytes and never performs I/O itself.

use bytes::Bytes;
use http::{request::Parts, Extensions, HeaderMap, Method, Uri};

/// An HTTP request with its body fully buffered.
pub struct Request {
    parts: Parts,
    body: Bytes,
}

impl Request {
    /// Wrap a buffered `http::Request`.
    pub fn from_http(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self { parts, body }
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// The request URI.
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// The request path.
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// The request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Request extensions (correlation id is stored here).
    pub fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    /// Mutable request extensions.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.parts.extensions
    }

    /// The buffered body bytes. Cloning `Bytes` is cheap, so the logging
    /// layer can capture the body without consuming it.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Decoded query parameters, in query-string order.
    ///
    /// Bare keys (no `=`) map to an empty value; undecodable percent
    /// sequences keep their raw text.
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(query) = self.parts.uri.query() {
            for pair in query.split('&') {
                if pair.is_empty() {
                    continue;
                }
                let mut halves = pair.splitn(2, '=');
                let key = halves.next().unwrap_or_default();
                let value = halves.next().unwrap_or_default();
                params.push((decode_component(key), decode_component(value)));
            }
        }
        params
    }
}

fn decode_component(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("body_len", &self.body.len())
            .finish()
    }
}
