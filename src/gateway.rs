//! The single seam every screen and command talks to the backend through.
//!
//! [`Transport`] is the contract: a relative path plus [`RequestOptions`] in,
//! the parsed JSON body out. [`HttpGateway`] is the reqwest implementation
//! used at runtime; it attaches the shared cookie jar and the JSON content
//! type to every call and turns non-success statuses into
//! [`ClientError::Request`].

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode, Url};
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{ClientError, GENERIC_REQUEST_FAILURE};

pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api/v1";

#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        RequestOptions {
            method: Method::GET,
            body: None,
            headers: Vec::new(),
        }
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: Option<Value>) -> Self {
        RequestOptions {
            method: Method::POST,
            body,
            ..Default::default()
        }
    }

    pub fn patch(body: Value) -> Self {
        RequestOptions {
            method: Method::PATCH,
            body: Some(body),
            ..Default::default()
        }
    }

    pub fn delete() -> Self {
        RequestOptions {
            method: Method::DELETE,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues one round trip and returns the parsed body of a success response.
    async fn request(&self, path: &str, options: RequestOptions) -> Result<Value, ClientError>;
}

/// The ambient credentials: a reqwest [`Jar`] that can be swapped for an
/// empty one when the session ends.
#[derive(Default)]
pub struct SessionCookies {
    jar: RwLock<Jar>,
}

impl SessionCookies {
    fn add(&self, cookie: &str, url: &Url) {
        self.jar
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .add_cookie_str(cookie, url);
    }

    fn clear(&self) {
        *self.jar.write().unwrap_or_else(PoisonError::into_inner) = Jar::default();
    }
}

impl CookieStore for SessionCookies {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        self.jar
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .set_cookies(cookie_headers, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.jar
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .cookies(url)
    }
}

pub struct HttpGateway {
    client: Client,
    base_url: String,
    cookies: Arc<SessionCookies>,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| ClientError::Config(format!("{base_url}: {e}")))?;

        let cookies = Arc::new(SessionCookies::default());
        let client = Client::builder().cookie_provider(Arc::clone(&cookies)).build()?;
        Ok(Self {
            client,
            base_url,
            cookies,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self) -> Result<Url, ClientError> {
        Url::parse(&self.base_url).map_err(|e| ClientError::Config(e.to_string()))
    }

    /// Cookie header the jar would send to the backend, if any.
    pub fn cookie_header(&self) -> Option<String> {
        let url = self.url().ok()?;
        self.cookies
            .cookies(&url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    /// Re-seeds the jar from a previously saved cookie header.
    ///
    /// The backend issues its session cookie at `/`, so restored cookies get
    /// that path too; a later `Set-Cookie` for the same name then replaces or
    /// expires them instead of sitting beside them.
    pub fn restore_cookies(&self, header: &str) -> Result<(), ClientError> {
        let url = self.url()?;
        for pair in header.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            self.cookies.add(&format!("{pair}; Path=/"), &url);
        }
        Ok(())
    }

    /// Forgets every cookie, whatever the backend said on logout.
    pub fn clear_cookies(&self) {
        self.cookies.clear();
    }
}

#[async_trait]
impl Transport for HttpGateway {
    async fn request(&self, path: &str, options: RequestOptions) -> Result<Value, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", options.method, path);

        let mut builder = self
            .client
            .request(options.method.clone(), &url)
            .headers(merge_headers(&options.headers)?);
        if let Some(body) = &options.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = builder.send().await.map_err(|e| {
            warn!("{} {} failed: {}", options.method, path, e);
            ClientError::Network(e)
        })?;
        let status = response.status();
        let bytes = response.bytes().await?;

        let result = normalize(status, &bytes);
        if let Err(e) = &result {
            warn!("{} {} -> {}: {}", options.method, path, status.as_u16(), e);
        }
        result
    }
}

/// JSON content type first, then caller headers, which win on collision.
pub fn merge_headers(extra: &[(String, String)]) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    for (name, value) in extra {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ClientError::Config(format!("header {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ClientError::Config(format!("header value {value}: {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

pub fn normalize(status: StatusCode, bytes: &[u8]) -> Result<Value, ClientError> {
    let parsed = if bytes.iter().all(u8::is_ascii_whitespace) {
        Ok(Value::Null)
    } else {
        serde_json::from_slice::<Value>(bytes)
    };

    if status.is_success() {
        return Ok(parsed?);
    }

    let message = parsed
        .ok()
        .as_ref()
        .and_then(detail_message)
        .unwrap_or_else(|| GENERIC_REQUEST_FAILURE.to_string());
    Err(ClientError::Request {
        status: status.as_u16(),
        message,
    })
}

fn detail_message(body: &Value) -> Option<String> {
    match body.get("detail")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::String(_) | Value::Null | Value::Bool(false) => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request_error(result: Result<Value, ClientError>) -> (u16, String) {
        match result {
            Err(ClientError::Request { status, message }) => (status, message),
            other => panic!("expected request error, got {other:?}"),
        }
    }

    #[test]
    fn test_success_returns_parsed_body() {
        let body = br#"{"email":"a@x.com","role":"admin"}"#;
        let value = normalize(StatusCode::OK, body).unwrap();
        assert_eq!(value, json!({ "email": "a@x.com", "role": "admin" }));
    }

    #[test]
    fn test_empty_success_body_is_null() {
        assert_eq!(normalize(StatusCode::NO_CONTENT, b"").unwrap(), Value::Null);
    }

    #[test]
    fn test_failure_carries_backend_detail() {
        let body = br#"{"detail":"Invalid password"}"#;
        let (status, message) = request_error(normalize(StatusCode::UNAUTHORIZED, body));
        assert_eq!(status, 401);
        assert_eq!(message, "Invalid password");
    }

    #[test]
    fn test_failure_without_detail_uses_generic_message() {
        let (_, message) = request_error(normalize(StatusCode::INTERNAL_SERVER_ERROR, b"{}"));
        assert_eq!(message, GENERIC_REQUEST_FAILURE);

        let (_, message) = request_error(normalize(StatusCode::BAD_GATEWAY, b"<html>"));
        assert_eq!(message, GENERIC_REQUEST_FAILURE);

        let (_, message) = request_error(normalize(StatusCode::BAD_REQUEST, br#"{"detail":""}"#));
        assert_eq!(message, GENERIC_REQUEST_FAILURE);
    }

    #[test]
    fn test_structured_detail_is_rendered_as_json() {
        let body = br#"{"detail":[{"loc":["body","email"],"msg":"field required"}]}"#;
        let (status, message) = request_error(normalize(StatusCode::UNPROCESSABLE_ENTITY, body));
        assert_eq!(status, 422);
        assert!(message.contains("field required"));
    }

    #[test]
    fn test_malformed_success_body_is_decode_error() {
        let result = normalize(StatusCode::OK, b"not json");
        assert!(matches!(result, Err(ClientError::Decode(_))));
    }

    #[test]
    fn test_caller_headers_override_content_type() {
        let headers = merge_headers(&[
            ("Content-Type".to_string(), "text/plain".to_string()),
            ("X-Trace".to_string(), "abc".to_string()),
        ])
        .unwrap();
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(headers.get("x-trace").unwrap(), "abc");
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_default_headers_are_json() {
        let headers = merge_headers(&[]).unwrap();
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let result = HttpGateway::new("not a url");
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn test_cookies_round_trip_through_jar() {
        let gateway = HttpGateway::new(DEFAULT_API_BASE).unwrap();
        assert_eq!(gateway.cookie_header(), None);

        gateway.restore_cookies("access_token=abc123").unwrap();
        assert_eq!(gateway.cookie_header().as_deref(), Some("access_token=abc123"));
    }

    fn backend_sets(gateway: &HttpGateway, path: &str, set_cookie: &'static str) {
        let url = Url::parse(&format!("{}{}", gateway.base_url(), path)).unwrap();
        let header = HeaderValue::from_static(set_cookie);
        gateway
            .cookies
            .set_cookies(&mut std::iter::once(&header), &url);
    }

    #[test]
    fn test_logout_cookie_expires_restored_session() {
        let gateway = HttpGateway::new(DEFAULT_API_BASE).unwrap();
        gateway.restore_cookies("access_token=old").unwrap();

        backend_sets(
            &gateway,
            "/auth/logout",
            "access_token=\"\"; expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; Path=/; SameSite=lax",
        );
        assert_eq!(gateway.cookie_header(), None);
    }

    #[test]
    fn test_new_login_replaces_restored_cookie() {
        let gateway = HttpGateway::new(DEFAULT_API_BASE).unwrap();
        gateway.restore_cookies("access_token=old").unwrap();

        backend_sets(&gateway, "/auth/login", "access_token=new; HttpOnly; Path=/; SameSite=lax");
        assert_eq!(gateway.cookie_header().as_deref(), Some("access_token=new"));
    }

    #[test]
    fn test_clear_cookies_drops_session() {
        let gateway = HttpGateway::new(DEFAULT_API_BASE).unwrap();
        gateway.restore_cookies("access_token=old").unwrap();
        gateway.clear_cookies();
        assert_eq!(gateway.cookie_header(), None);
    }

    // One-shot HTTP listener; yields the raw request text it received.
    async fn serve_once(response: String) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/api/v1", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_ascii_lowercase();
                let complete = text.find("\r\n\r\n").is_some_and(|end| {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .map(|v| v.trim().parse::<usize>().unwrap())
                        .unwrap_or(0);
                    raw.len() >= end + 4 + length
                });
                if complete || n == 0 {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&raw).into_owned()
        });
        (base, handle)
    }

    fn http_response(status: &str, extra_headers: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\n{extra_headers}connection: close\r\n\r\n{body}",
            body.len()
        )
    }

    #[tokio::test]
    async fn test_request_sends_merged_headers_body_and_cookies() {
        let response = http_response(
            "200 OK",
            "set-cookie: access_token=new; HttpOnly; Path=/\r\n",
            r#"{"message":"Login successful"}"#,
        );
        let (base, server) = serve_once(response).await;
        let gateway = HttpGateway::new(base).unwrap();
        gateway.restore_cookies("access_token=old").unwrap();

        let options = RequestOptions::post(Some(json!({ "email": "a@x.com" })))
            .with_header("X-Trace", "abc");
        let value = gateway.request("/auth/login", options).await.unwrap();
        assert_eq!(value, json!({ "message": "Login successful" }));

        let raw = server.await.unwrap();
        let lower = raw.to_ascii_lowercase();
        assert!(raw.starts_with("POST /api/v1/auth/login "));
        assert!(lower.contains("content-type: application/json"));
        assert!(lower.contains("x-trace: abc"));
        assert!(lower.contains("cookie: access_token=old"));
        assert!(raw.ends_with(r#"{"email":"a@x.com"}"#));

        assert_eq!(gateway.cookie_header().as_deref(), Some("access_token=new"));
    }

    #[tokio::test]
    async fn test_request_failure_status_uses_detail() {
        let response = http_response("401 Unauthorized", "", r#"{"detail":"Invalid password"}"#);
        let (base, server) = serve_once(response).await;
        let gateway = HttpGateway::new(base).unwrap();

        let result = gateway.request("/auth/login", RequestOptions::post(None)).await;
        assert_eq!(request_error(result), (401, "Invalid password".to_string()));
        server.await.unwrap();
    }
}
