//! Request forwarding to a chosen backend.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the backend (joining its base path)
//! - Rewrite `Host` to the backend's host (port only when explicit)
//! - Strip hop-by-hop headers, append `X-Forwarded-For`
//! - Stream the request body out and the response back unmodified
//!
//! No retries: a failed forward is reported to the caller as-is.

use axum::{
    body::Body,
    http::{
        header::{self, HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue},
        uri::Scheme,
        Request, Response, Uri, Version,
    },
};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use std::net::SocketAddr;
use thiserror::Error;
use crate::load_balancer::Backend;

/// Upstream client shared by all requests.
pub type UpstreamClient = Client<HttpConnector, Body>;

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
];

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("failed to build upstream URI: {0}")]
    Uri(#[from] axum::http::Error),

    #[error("invalid header value: {0}")]
    Header(#[from] InvalidHeaderValue),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

/// Forward `request` to `backend` and return its response.
pub async fn forward(
    client: &UpstreamClient,
    backend: &Backend,
    request: Request<Body>,
    client_addr: Option<SocketAddr>,
) -> Result<Response<Body>, ForwardError> {
    let (mut parts, body) = request.into_parts();

    parts.uri = upstream_uri(backend, &parts.uri)?;
    // The upstream leg is always plain HTTP/1.1.
    parts.version = Version::HTTP_11;

    strip_hop_by_hop(&mut parts.headers);
    // Upgrades are not proxied.
    parts.headers.remove(header::UPGRADE);
    parts
        .headers
        .insert(header::HOST, HeaderValue::from_str(backend.host_header())?);
    if let Some(addr) = client_addr {
        append_forwarded_for(&mut parts.headers, addr)?;
    }

    let response = client.request(Request::from_parts(parts, body)).await?;

    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Ok(Response::from_parts(parts, Body::new(body)))
}

/// Map the inbound URI onto the backend: scheme and authority replaced,
/// backend base path prepended, query kept.
pub fn upstream_uri(backend: &Backend, inbound: &Uri) -> Result<Uri, ForwardError> {
    let base = backend.url().path();
    let path = join_paths(base, inbound.path());
    let path_and_query = match inbound.query() {
        Some(q) => format!("{}?{}", path, q),
        None => path,
    };

    Ok(Uri::builder()
        .scheme(Scheme::HTTP)
        .authority(backend.authority())
        .path_and_query(path_and_query)
        .build()?)
}

/// Join with exactly one slash at the seam; any further slashes in the
/// inbound path are kept.
fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers listed in `Connection` are hop-by-hop too.
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, addr: SocketAddr) -> Result<(), InvalidHeaderValue> {
    let ip = addr.ip().to_string();
    let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{}, {}", prior, ip),
        None => ip,
    };
    headers.insert(X_FORWARDED_FOR, HeaderValue::from_str(&value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_uri_replaces_authority() {
        let backend = Backend::parse("http://10.0.0.1:8081").unwrap();
        let uri: Uri = "/users/7?verbose=1".parse().unwrap();
        assert_eq!(
            upstream_uri(&backend, &uri).unwrap().to_string(),
            "http://10.0.0.1:8081/users/7?verbose=1"
        );
    }

    #[test]
    fn test_upstream_uri_joins_base_path() {
        let backend = Backend::parse("http://api.internal:9000/v2/").unwrap();
        let uri: Uri = "/items".parse().unwrap();
        assert_eq!(
            upstream_uri(&backend, &uri).unwrap().to_string(),
            "http://api.internal:9000/v2/items"
        );

        let root: Uri = "/".parse().unwrap();
        assert_eq!(upstream_uri(&backend, &root).unwrap().path(), "/v2/");
    }

    #[test]
    fn test_upstream_uri_keeps_repeated_slashes() {
        let backend = Backend::parse("http://10.0.0.1:8081").unwrap();
        let uri: Uri = "//files/a".parse().unwrap();
        assert_eq!(upstream_uri(&backend, &uri).unwrap().path(), "//files/a");

        let uri: Uri = "/static//img.png".parse().unwrap();
        assert_eq!(upstream_uri(&backend, &uri).unwrap().path(), "/static//img.png");

        let based = Backend::parse("http://api.internal:9000/v2").unwrap();
        let uri: Uri = "//items".parse().unwrap();
        assert_eq!(upstream_uri(&based, &uri).unwrap().path(), "/v2//items");
    }

    #[test]
    fn test_join_paths_single_seam_slash() {
        assert_eq!(join_paths("/v2/", "/items"), "/v2/items");
        assert_eq!(join_paths("/v2", "items"), "/v2/items");
        assert_eq!(join_paths("/v2", "/items"), "/v2/items");
        assert_eq!(join_paths("/", "//a"), "//a");
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-session"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-session", HeaderValue::from_static("abc"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));

        strip_hop_by_hop(&mut headers);
        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::ACCEPT));
    }

    #[test]
    fn test_forwarded_for_appends() {
        let mut headers = HeaderMap::new();
        append_forwarded_for(&mut headers, "192.0.2.1:5000".parse().unwrap()).unwrap();
        append_forwarded_for(&mut headers, "198.51.100.2:6000".parse().unwrap()).unwrap();
        assert_eq!(headers[&X_FORWARDED_FOR], "192.0.2.1, 198.51.100.2");
    }
}
