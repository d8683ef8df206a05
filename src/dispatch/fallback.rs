//! Built-in responses for exhausted chains.

use super::outcome::{build, TEXT_HTML, TEXT_PLAIN};
use super::Context;
use crate::config::Mode;
use crate::Response;

use std::fmt::Write;

use http::header::HeaderValue;
use http::StatusCode;
use tracing::error;

pub const DEBUG_HEADER: &str = "x-switchback-debug";

pub(super) fn not_found(mode: Mode, cx: &Context) -> Response {
    match mode {
        Mode::Production => build(StatusCode::NOT_FOUND, TEXT_PLAIN, "404 Not Found".into()),
        Mode::Development => {
            let mut page = String::new();
            let _ = write!(
                page,
                "<!DOCTYPE html><html><head><title>404 Not Found</title></head><body>\
                 <h1>404 Not Found</h1><p>No route matched <code>{} {}</code>.</p>\
                 </body></html>",
                escape(cx.method().as_str()),
                escape(cx.path()),
            );
            debug_page(StatusCode::NOT_FOUND, page, "not-found")
        }
    }
}

pub(super) fn server_error(mode: Mode, cx: &Context) -> Response {
    match cx.error() {
        Some(err) => error!(method = %cx.method(), path = %cx.path(), error = %err, "unhandled fault"),
        None => error!(method = %cx.method(), path = %cx.path(), "unhandled fault"),
    }

    match mode {
        Mode::Production => build(
            StatusCode::INTERNAL_SERVER_ERROR,
            TEXT_PLAIN,
            "500 Server Error".into(),
        ),
        Mode::Development => {
            let mut page = String::from(
                "<!DOCTYPE html><html><head><title>500 Server Error</title></head><body>\
                 <h1>500 Server Error</h1>",
            );
            match cx.error() {
                Some(err) => {
                    let _ = write!(page, "<p><strong>{}</strong></p>", escape(&err.to_string()));
                    let mut source = err.source();
                    if source.is_some() {
                        page.push_str("<h2>Caused by</h2><ol>");
                    }
                    while let Some(cause) = source {
                        let _ = write!(page, "<li>{}</li>", escape(&cause.to_string()));
                        source = cause.source();
                    }
                    if err.source().is_some() {
                        page.push_str("</ol>");
                    }
                    let _ = write!(page, "<h2>Trace</h2><pre>{}</pre>", escape(&format!("{:#?}", err)));
                }
                None => page.push_str("<p>The request failed without an error value.</p>"),
            }
            let _ = write!(
                page,
                "<p><code>{} {}</code></p></body></html>",
                escape(cx.method().as_str()),
                escape(cx.path()),
            );
            debug_page(StatusCode::INTERNAL_SERVER_ERROR, page, "server-error")
        }
    }
}

fn debug_page(status: StatusCode, page: String, kind: &'static str) -> Response {
    let mut res = build(status, TEXT_HTML, page.into());
    res.headers_mut()
        .insert(DEBUG_HEADER, HeaderValue::from_static(kind));
    res
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
