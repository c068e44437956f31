//! Response type and body re-buffering.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};

/// HTTP response type flowing back through the middleware chain.
pub type Response = http::Response<Full<Bytes>>;

/// Collect the response body and reattach it.
///
/// Returns the captured bytes alongside a response carrying an identical
/// body, so logging the body never changes what the client receives. A
/// collection failure yields empty bytes and an empty body; the status and
/// headers survive either way.
pub async fn buffer_body(response: Response) -> (Response, Bytes) {
    let (parts, body) = response.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => Bytes::new(),
    };
    let response = http::Response::from_parts(parts, Full::new(bytes.clone()));
    (response, bytes)
}

/// Build a JSON response with the given status.
pub fn json_response(status: http::StatusCode, value: &serde_json::Value) -> Response {
    let body = serde_json::to_vec(value).unwrap_or_default();
    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
