// src/proxy/forward.rs

use axum::body::{Body, to_bytes};
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderName, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

/// Connection-scoped headers that must not be copied across a proxy hop.
static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Build the HTTP client used for forwarding. Redirects are passed through
/// to the client untouched.
pub fn client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
}

/// Forward `req` to `http://{authority}` and stream the backend's response
/// back with its status, headers and body.
pub async fn forward(client: &reqwest::Client, authority: &str, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("http://{authority}{path}");

    let body = match to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(err) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("lime: failed to read request body: {err}"),
            );
        }
    };

    let mut headers = strip_hop_by_hop(&parts.headers);
    headers.remove(header::HOST);

    debug!(method = %parts.method, %url, "forwarding request");

    let upstream = client
        .request(parts.method.clone(), &url)
        .headers(headers)
        .body(body)
        .send()
        .await;

    let upstream = match upstream {
        Ok(resp) => resp,
        Err(err) => {
            warn!(%url, error = %err, "backend request failed");
            return error_response(
                StatusCode::BAD_GATEWAY,
                format!("lime: backend request to {url} failed: {err}"),
            );
        }
    };

    let status = upstream.status();
    let headers = strip_hop_by_hop(upstream.headers());
    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut out = headers.clone();
    for name in HOP_BY_HOP.iter() {
        out.remove(name);
    }
    out
}

/// Plain-text response produced by lime itself rather than the backend.
pub fn error_response(status: StatusCode, message: String) -> Response {
    (status, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], message).into_response()
}
