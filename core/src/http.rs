//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. A
//! `RequestDescriptor` renders into an `HttpRequest`; an `HttpClient`
//! performs the I/O and hands back an `HttpResponse`; the executor classifies
//! it and produces a typed `Response<T>`. Keeping the wire shape as plain data
//! lets tests script a client without touching the network.
//!
//! All fields use owned types (`String`, `Vec`) so values can move freely
//! between threads and across await points. Response bodies are raw bytes:
//! raw-content calls (archives, repository files) must come back unchanged,
//! and a body that is not UTF-8 is still a received response.

use std::fmt;
use std::time::Duration;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
        }
    }

    /// Whether `QueryOrBody` parameters travel in the query string for this
    /// method. Methods that carry a request body send them form-encoded.
    pub fn params_in_query(&self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Head | HttpMethod::Delete)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// Built by `RequestDescriptor::to_request`. `url` is absolute and already
/// carries the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// Upper bound for the whole round-trip, if the caller set one.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    /// First header value whose name matches exactly.
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    /// Set a header, replacing every existing header of the same name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// First header value whose name matches exactly (case-sensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    /// The body as text, or `None` if it is not valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// A classified, successful response together with its deserialized payload.
///
/// `data` is `None` when the call shape carries no payload (raw content) or
/// the body was empty, e.g. on `304 Not Modified`.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub data: Option<T>,
}

impl<T> Response<T> {
    pub(crate) fn from_http(raw: HttpResponse, data: Option<T>) -> Self {
        Self {
            status: raw.status,
            headers: raw.headers,
            body: raw.body,
            data,
        }
    }

    /// First header value whose name matches exactly (case-sensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    /// The body as text, or `None` if it is not valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// Canonical capitalisation of a header name: `x-total-pages` becomes
/// `X-Total-Pages`. Transports built on the `http` crate lowercase every
/// name, so they run received headers through this before handing them on.
pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_header_lookup_is_case_sensitive_and_first_wins() {
        let response = HttpResponse {
            status: 200,
            headers: vec![
                ("x-page".to_string(), "9".to_string()),
                ("X-Page".to_string(), "1".to_string()),
                ("X-Page".to_string(), "2".to_string()),
            ],
            body: Vec::new(),
        };
        assert_eq!(response.header("X-Page"), Some("1"));
        assert_eq!(response.header("X-PAGE"), None);
    }

    #[test]
    fn text_is_none_for_binary_bodies() {
        let mut response = HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: b"README".to_vec(),
        };
        assert_eq!(response.text(), Some("README"));
        response.body = vec![0x50, 0x4b, 0xff, 0xfe];
        assert_eq!(response.text(), None);
    }

    #[test]
    fn set_header_replaces_existing() {
        let mut req = HttpRequest::new(HttpMethod::Get, "http://localhost/api/v4/projects");
        req.set_header("PRIVATE-TOKEN", "old");
        req.set_header("PRIVATE-TOKEN", "new");
        assert_eq!(req.headers, vec![("PRIVATE-TOKEN".to_string(), "new".to_string())]);
    }

    #[test]
    fn canonicalises_header_names() {
        assert_eq!(canonical_header_name("x-total-pages"), "X-Total-Pages");
        assert_eq!(canonical_header_name("content-type"), "Content-Type");
        assert_eq!(canonical_header_name("X-Page"), "X-Page");
        assert_eq!(canonical_header_name("etag"), "Etag");
    }

    #[test]
    fn body_methods_keep_params_out_of_query() {
        assert!(HttpMethod::Get.params_in_query());
        assert!(HttpMethod::Delete.params_in_query());
        assert!(!HttpMethod::Post.params_in_query());
        assert!(!HttpMethod::Patch.params_in_query());
    }
}
