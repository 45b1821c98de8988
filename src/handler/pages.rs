//! Page handlers
//!
//! Each handler receives the raw title taken from the URL path. Titles are
//! validated before the store is touched; an invalid title ends the request
//! with a 404.

use crate::config::AppState;
use crate::http::{self, FormEncoding};
use crate::logger;
use crate::wiki::{is_valid_title, template, Page};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

/// Show a page, or send the client to the editor if it does not exist yet
pub async fn view(raw_title: &str, is_head: bool, state: &AppState) -> Response<Full<Bytes>> {
    let Some(title) = valid_title(raw_title) else {
        return http::build_404_response();
    };

    match state.store.load(title).await {
        Ok(page) => render(state, template::VIEW, &page, is_head),
        Err(_) => http::build_redirect_response(&edit_path(title)),
    }
}

/// Show the edit form, empty for a page that does not exist yet
pub async fn edit(raw_title: &str, is_head: bool, state: &AppState) -> Response<Full<Bytes>> {
    let Some(title) = valid_title(raw_title) else {
        return http::build_404_response();
    };

    let page = state
        .store
        .load(title)
        .await
        .unwrap_or_else(|_| Page::empty(title));
    render(state, template::EDIT, &page, is_head)
}

/// Store the submitted `body` form field and redirect to the page
///
/// Only urlencoded bodies are read. Multipart is refused with 415 so that a
/// form the wiki cannot decode never overwrites a page with an empty body.
pub async fn save(
    raw_title: &str,
    content_type: Option<&str>,
    form: &[u8],
    query: Option<&str>,
    state: &AppState,
) -> Response<Full<Bytes>> {
    let Some(title) = valid_title(raw_title) else {
        return http::build_404_response();
    };

    let form_body: &[u8] = match http::form_encoding(content_type) {
        FormEncoding::UrlEncoded => form,
        FormEncoding::Multipart => {
            logger::log_warning(&format!("Refused multipart save of '{title}'"));
            return http::build_415_response(
                "multipart/form-data is not supported; submit the form urlencoded",
            );
        }
        FormEncoding::Other => &[],
    };

    let body = http::form_value(form_body, query, "body").unwrap_or_default();
    let page = Page::new(title, body);

    if let Err(e) = state.store.save(&page).await {
        logger::log_error(&e.to_string());
        return http::build_500_response(&e.to_string());
    }

    http::build_redirect_response(&view_path(title))
}

pub fn view_path(title: &str) -> String {
    format!("/view/{title}")
}

pub fn edit_path(title: &str) -> String {
    format!("/edit/{title}")
}

fn valid_title(raw: &str) -> Option<&str> {
    if is_valid_title(raw) {
        Some(raw)
    } else {
        logger::log_warning(&format!("Rejected page title: {raw:?}"));
        None
    }
}

fn render(state: &AppState, name: &str, page: &Page, is_head: bool) -> Response<Full<Bytes>> {
    match state.templates.render(name, page) {
        Ok(html) => http::build_html_response(html, is_head),
        Err(e) => {
            logger::log_error(&format!("Failed to render '{}': {e}", page.title));
            http::build_500_response(&e.to_string())
        }
    }
}
