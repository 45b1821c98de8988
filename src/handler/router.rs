//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: body size limits, route
//! matching, method checks and access logging.

use crate::config::AppState;
use crate::handler::pages;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Bytes;
use hyper::header::{HeaderValue, SERVER};
use hyper::{Method, Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// A request with its body already read
#[derive(Debug, Clone)]
pub struct WikiRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[cfg(test)]
impl WikiRequest {
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::GET,
            path: path.to_string(),
            query: None,
            content_type: None,
            body: Bytes::new(),
        }
    }

    pub fn post_form(path: &str, form: &str) -> Self {
        Self::post(path, "application/x-www-form-urlencoded", form)
    }

    pub fn post(path: &str, content_type: &str, body: &str) -> Self {
        Self {
            method: Method::POST,
            path: path.to_string(),
            query: None,
            content_type: Some(content_type.to_string()),
            body: Bytes::from(body.to_owned()),
        }
    }
}

/// Page endpoints, matched by path prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageRoute {
    View,
    Edit,
    Save,
}

const PAGE_ROUTES: [(&str, PageRoute); 3] = [
    ("/view/", PageRoute::View),
    ("/edit/", PageRoute::Edit),
    ("/save/", PageRoute::Save),
];

impl PageRoute {
    fn allows(self, method: &Method) -> bool {
        match self {
            Self::View | Self::Edit => matches!(*method, Method::GET | Method::HEAD),
            Self::Save => *method == Method::POST,
        }
    }

    const fn allow_header(self) -> &'static str {
        match self {
            Self::View | Self::Edit => "GET, HEAD",
            Self::Save => "POST",
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let (parts, body) = req.into_parts();
    let max_body_size = state.config.http.max_body_size;

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        parts.method.to_string(),
        parts.uri.path().to_string(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.http_version = format_version(parts.version).to_string();
    entry.referer = header_string(&parts.headers, "referer");
    entry.user_agent = header_string(&parts.headers, "user-agent");

    let mut response = if exceeds_body_limit(&parts.headers, max_body_size) {
        http::build_413_response()
    } else {
        let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
        match Limited::new(body, limit).collect().await {
            Ok(collected) => {
                let wiki_req = WikiRequest {
                    method: parts.method.clone(),
                    path: parts.uri.path().to_string(),
                    query: parts.uri.query().map(ToString::to_string),
                    content_type: header_string(&parts.headers, "content-type"),
                    body: collected.to_bytes(),
                };
                route(&wiki_req, &state).await
            }
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                logger::log_warning(&format!("Request body exceeded {max_body_size} bytes"));
                http::build_413_response()
            }
            Err(e) => {
                logger::log_error(&format!("Failed to read request body: {e}"));
                http::build_500_response(&format!("failed to read request body: {e}"))
            }
        }
    };

    if let Ok(name) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, name);
    }

    if state.config.logging.access_log {
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Dispatch a fully read request
pub async fn route(req: &WikiRequest, state: &AppState) -> Response<Full<Bytes>> {
    let http_config = &state.config.http;
    if http_config.enable_health && req.path == http_config.health_path {
        return http::build_health_response("ok");
    }

    if req.path == "/" {
        return http::build_redirect_response(&pages::view_path(&state.config.wiki.front_page));
    }

    let Some((raw_title, page_route)) = PAGE_ROUTES
        .iter()
        .find_map(|(prefix, r)| req.path.strip_prefix(prefix).map(|t| (t, *r)))
    else {
        return http::build_404_response();
    };

    if !page_route.allows(&req.method) {
        logger::log_warning(&format!("Method not allowed: {} {}", req.method, req.path));
        return http::build_405_response(page_route.allow_header());
    }

    let is_head = req.method == Method::HEAD;
    match page_route {
        PageRoute::View => pages::view(raw_title, is_head, state).await,
        PageRoute::Edit => pages::edit(raw_title, is_head, state).await,
        PageRoute::Save => {
            pages::save(
                raw_title,
                req.content_type.as_deref(),
                &req.body,
                req.query.as_deref(),
                state,
            )
            .await
        }
    }
}

/// Reject early on a declared Content-Length above the limit
fn exceeds_body_limit(headers: &hyper::HeaderMap, max_body_size: u64) -> bool {
    let Some(content_length) = headers.get("content-length") else {
        return false;
    };
    match content_length.to_str().ok().and_then(|s| s.parse::<u64>().ok()) {
        Some(size) if size > max_body_size => {
            logger::log_error(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            true
        }
        Some(_) => false,
        None => {
            logger::log_warning("Invalid Content-Length header, skipping size check");
            false
        }
    }
}

fn header_string(headers: &hyper::HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn format_version(version: Version) -> &'static str {
    if version == Version::HTTP_09 {
        "0.9"
    } else if version == Version::HTTP_10 {
        "1.0"
    } else if version == Version::HTTP_2 {
        "2"
    } else if version == Version::HTTP_3 {
        "3"
    } else {
        "1.1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::wiki::{FileStore, Templates};
    use std::path::Path;

    fn test_state(dir: &Path) -> AppState {
        let config = Config::load_from("does-not-exist/config").unwrap();
        let templates = Templates::from_sources(
            "<h1>{{.Title}}</h1><div>{{.Body}}</div>",
            "<form action=\"/save/{{.Title}}\"><textarea>{{.Body}}</textarea></form>",
        )
        .unwrap();
        AppState::new(config, FileStore::new(dir), templates)
    }

    async fn body_string(resp: Response<Full<Bytes>>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(resp: &Response<Full<Bytes>>) -> &str {
        resp.headers()["Location"].to_str().unwrap()
    }

    #[tokio::test]
    async fn test_view_missing_page_redirects_to_edit() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let resp = route(&WikiRequest::get("/view/NewPage"), &state).await;
        assert_eq!(resp.status(), 302);
        assert_eq!(location(&resp), "/edit/NewPage");
    }

    #[tokio::test]
    async fn test_view_existing_page_renders() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Home.txt"), "a <b>bold</b> claim").unwrap();
        let state = test_state(dir.path());

        let resp = route(&WikiRequest::get("/view/Home"), &state).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(
            body_string(resp).await,
            "<h1>Home</h1><div>a &lt;b&gt;bold&lt;/b&gt; claim</div>"
        );
    }

    #[tokio::test]
    async fn test_edit_missing_page_renders_empty_form() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let resp = route(&WikiRequest::get("/edit/Fresh"), &state).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(
            body_string(resp).await,
            "<form action=\"/save/Fresh\"><textarea></textarea></form>"
        );
    }

    #[tokio::test]
    async fn test_edit_existing_page_is_prefilled() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Draft.txt"), "old text").unwrap();
        let state = test_state(dir.path());

        let resp = route(&WikiRequest::get("/edit/Draft"), &state).await;
        assert!(body_string(resp).await.contains("<textarea>old text</textarea>"));
    }

    #[tokio::test]
    async fn test_save_writes_file_and_redirects_to_view() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let resp = route(
            &WikiRequest::post_form("/save/Test1", "body=hello+world"),
            &state,
        )
        .await;
        assert_eq!(resp.status(), 302);
        assert_eq!(location(&resp), "/view/Test1");
        assert_eq!(
            std::fs::read(dir.path().join("Test1.txt")).unwrap(),
            b"hello world"
        );

        let resp = route(&WikiRequest::get("/view/Test1"), &state).await;
        assert!(body_string(resp).await.contains("<div>hello world</div>"));
    }

    #[tokio::test]
    async fn test_save_without_body_field_stores_empty_page() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let resp = route(&WikiRequest::post_form("/save/Blank", ""), &state).await;
        assert_eq!(resp.status(), 302);
        assert_eq!(std::fs::read(dir.path().join("Blank.txt")).unwrap(), b"");
    }

    #[tokio::test]
    async fn test_save_failure_is_500_with_message() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir.path().join("missing"));

        let resp = route(&WikiRequest::post_form("/save/Lost", "body=x"), &state).await;
        assert_eq!(resp.status(), 500);
        assert!(body_string(resp).await.contains("failed to save page 'Lost'"));
    }

    #[tokio::test]
    async fn test_invalid_titles_are_404() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("secret.txt"), "hidden").unwrap();
        let state = test_state(&dir.path().join("pages"));

        for path in [
            "/view/../etc/passwd",
            "/view/../secret",
            "/edit/a.b",
            "/view/",
            "/edit/with%20space",
        ] {
            let resp = route(&WikiRequest::get(path), &state).await;
            assert_eq!(resp.status(), 404, "{path}");
        }

        let resp = route(&WikiRequest::post_form("/save/../secret", "body=pwned"), &state).await;
        assert_eq!(resp.status(), 404);
        assert_eq!(
            std::fs::read(dir.path().join("secret.txt")).unwrap(),
            b"hidden"
        );
    }

    #[tokio::test]
    async fn test_wrong_method_is_405() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let resp = route(&WikiRequest::get("/save/Page"), &state).await;
        assert_eq!(resp.status(), 405);
        assert_eq!(resp.headers()["Allow"], "POST");

        let resp = route(&WikiRequest::post_form("/view/Page", ""), &state).await;
        assert_eq!(resp.status(), 405);
        assert_eq!(resp.headers()["Allow"], "GET, HEAD");
    }

    #[tokio::test]
    async fn test_head_has_no_body() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let mut req = WikiRequest::get("/edit/Page");
        req.method = Method::HEAD;
        let resp = route(&req, &state).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(body_string(resp).await, "");
    }

    #[tokio::test]
    async fn test_root_health_and_unknown_paths() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let resp = route(&WikiRequest::get("/"), &state).await;
        assert_eq!(location(&resp), "/view/FrontPage");

        let resp = route(&WikiRequest::get("/healthz"), &state).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(body_string(resp).await, "ok");

        let resp = route(&WikiRequest::get("/history/Page"), &state).await;
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_multipart_save_is_refused_and_page_kept() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Home.txt"), "precious").unwrap();
        let state = test_state(dir.path());

        let form = "--XyZ\r\nContent-Disposition: form-data; name=\"body\"\r\n\r\nnew text\r\n--XyZ--\r\n";
        let req = WikiRequest::post("/save/Home", "multipart/form-data; boundary=XyZ", form);
        let resp = route(&req, &state).await;
        assert_eq!(resp.status(), 415);
        assert_eq!(
            std::fs::read(dir.path().join("Home.txt")).unwrap(),
            b"precious"
        );
    }

    #[tokio::test]
    async fn test_save_keeps_raw_body_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let resp = route(&WikiRequest::post_form("/save/Bin", "body=%FF%FE"), &state).await;
        assert_eq!(resp.status(), 302);
        assert_eq!(
            std::fs::read(dir.path().join("Bin.txt")).unwrap(),
            vec![0xFF, 0xFE]
        );
    }

    #[tokio::test]
    async fn test_non_form_body_is_ignored_in_favor_of_query() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let mut req = WikiRequest::post("/save/Plain", "text/plain", "body=from-body");
        req.query = Some("body=from-query".to_string());
        let resp = route(&req, &state).await;
        assert_eq!(resp.status(), 302);
        assert_eq!(
            std::fs::read(dir.path().join("Plain.txt")).unwrap(),
            b"from-query"
        );
    }

    #[test]
    fn test_content_length_limit() {
        let mut headers = hyper::HeaderMap::new();
        assert!(!exceeds_body_limit(&headers, 10));
        headers.insert("content-length", HeaderValue::from_static("11"));
        assert!(exceeds_body_limit(&headers, 10));
        headers.insert("content-length", HeaderValue::from_static("10"));
        assert!(!exceeds_body_limit(&headers, 10));
    }
}
