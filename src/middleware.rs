//! Minimal middleware seam the logging layer plugs into.
//!
//! The host framework is expected to drive a chain of [`MiddlewareLayer`]s
//! around its handler. [`LayerStack`] is a reference executor used by the
//! integration tests; any server that can call `layer.call(req, next)` can
//! host the logging layer directly.

use crate::request::Request;
use crate::response::Response;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Continuation invoking the rest of the chain (and ultimately the handler).
pub type BoxedNext =
    Arc<dyn Fn(Request) -> Pin<Box<dyn Future<Output = Response> + Send + 'static>> + Send + Sync>;

/// A middleware layer wrapping request handling.
pub trait MiddlewareLayer: Send + Sync + 'static {
    /// Process `req`, calling `next` to continue the chain.
    fn call(
        &self,
        req: Request,
        next: BoxedNext,
    ) -> Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

    /// Clone this layer into a boxed trait object.
    fn clone_box(&self) -> Box<dyn MiddlewareLayer>;
}

impl Clone for Box<dyn MiddlewareLayer> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// An ordered stack of middleware layers.
///
/// Layers execute outermost-first on the way in and unwind in reverse on the
/// way out, which is what lets the logging layer observe both phases of a
/// request around the handler.
#[derive(Clone, Default)]
pub struct LayerStack {
    layers: Vec<Box<dyn MiddlewareLayer>>,
}

impl LayerStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Append a layer; earlier layers run outermost.
    pub fn push(&mut self, layer: Box<dyn MiddlewareLayer>) {
        self.layers.push(layer);
    }

    /// Whether the stack holds no layers.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Number of layers in the stack.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Run `req` through every layer and finally `handler`.
    pub fn execute(
        &self,
        req: Request,
        handler: BoxedNext,
    ) -> Pin<Box<dyn Future<Output = Response> + Send + 'static>> {
        if self.layers.is_empty() {
            return handler(req);
        }

        // Build the chain from the inside out so the first layer pushed
        // ends up outermost.
        let mut next = handler;
        for layer in self.layers.iter().rev() {
            let layer = layer.clone_box();
            let current_next = next;
            next = Arc::new(move |req: Request| {
                let layer = layer.clone_box();
                let next = current_next.clone();
                Box::pin(async move { layer.call(req, next).await })
                    as Pin<Box<dyn Future<Output = Response> + Send + 'static>>
            });
        }

        next(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use http_body_util::Full;

    fn make_request(method: Method, path: &str) -> Request {
        Request::from_http(
            http::Request::builder()
                .method(method)
                .uri(path)
                .body(Bytes::new())
                .unwrap(),
        )
    }

    fn text_handler(status: StatusCode, body: &'static str) -> BoxedNext {
        Arc::new(move |_req: Request| {
            Box::pin(async move {
                http::Response::builder()
                    .status(status)
                    .body(Full::new(Bytes::from(body)))
                    .unwrap()
            }) as Pin<Box<dyn Future<Output = Response> + Send + 'static>>
        })
    }

    #[derive(Clone)]
    struct TagLayer {
        tag: &'static str,
        seen: Arc<std::sync::Mutex<Vec<(&'static str, &'static str)>>>,
    }

    impl MiddlewareLayer for TagLayer {
        fn call(
            &self,
            req: Request,
            next: BoxedNext,
        ) -> Pin<Box<dyn Future<Output = Response> + Send + 'static>> {
            let tag = self.tag;
            let seen = self.seen.clone();
            Box::pin(async move {
                seen.lock().unwrap().push((tag, "pre"));
                let response = next(req).await;
                seen.lock().unwrap().push((tag, "post"));
                response
            })
        }

        fn clone_box(&self) -> Box<dyn MiddlewareLayer> {
            Box::new(self.clone())
        }
    }

    #[tokio::test]
    async fn empty_stack_calls_handler_directly() {
        let stack = LayerStack::new();
        let req = make_request(Method::GET, "/ping");
        let response = stack.execute(req, text_handler(StatusCode::OK, "pong")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn layers_wrap_handler_in_order() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut stack = LayerStack::new();
        stack.push(Box::new(TagLayer { tag: "outer", seen: seen.clone() }));
        stack.push(Box::new(TagLayer { tag: "inner", seen: seen.clone() }));
        assert_eq!(stack.len(), 2);

        let req = make_request(Method::GET, "/order");
        let response = stack.execute(req, text_handler(StatusCode::OK, "ok")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let order = seen.lock().unwrap();
        assert_eq!(
            *order,
            vec![
                ("outer", "pre"),
                ("inner", "pre"),
                ("inner", "post"),
                ("outer", "post"),
            ]
        );
    }
}
