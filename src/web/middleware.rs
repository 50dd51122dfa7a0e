use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use std::time::Instant;

/// Logs every request with its outcome; level follows the response status.
pub async fn request_logging(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let client_ip = extract_client_ip(request.headers());

    let response = next.run(request).await;
    let status = response.status();
    let duration_ms = start.elapsed().as_millis() as u64;

    if status.is_server_error() {
        tracing::error!(%method, %uri, %client_ip, %status, duration_ms, "Request completed");
    } else if status.is_client_error() {
        tracing::warn!(%method, %uri, %client_ip, %status, duration_ms, "Request completed");
    } else {
        tracing::info!(%method, %uri, %client_ip, %status, duration_ms, "Request completed");
    }

    response
}

fn extract_client_ip(headers: &HeaderMap) -> String {
    ["x-forwarded-for", "x-real-ip", "cf-connecting-ip"]
        .iter()
        .filter_map(|name| headers.get(*name)?.to_str().ok())
        .filter_map(|value| value.split(',').next())
        .map(str::trim)
        .find(|ip| !ip.is_empty())
        .unwrap_or("unknown")
        .to_string()
}
