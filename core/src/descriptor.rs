//! Request descriptors: one not-yet-executed API call as data.
//!
//! # Design
//! A descriptor is a resource template (`projects/{id}/issues`), a method and
//! an ordered parameter list where each parameter is tagged with where it
//! goes on the wire. Builder methods take any `ParamValue`; an absent value
//! (`None`) is dropped at the builder, so optional endpoint arguments can be
//! passed straight through without `if let` at every call site.
//!
//! Once built the descriptor is immutable. `to_request` renders it against a
//! base URL into a plain `HttpRequest`.

use std::time::Duration;

use serde::Serialize;
use url::Url;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Where a parameter is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Substituted into a `{name}` placeholder of the resource template.
    UrlSegment,
    /// Query string for GET/HEAD/DELETE, form body otherwise.
    QueryOrBody,
    Header,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub value: String,
    pub placement: Placement,
}

/// A value that may be attached as a parameter. `None` means "leave it out".
pub trait ParamValue {
    fn into_param(self) -> Option<String>;
}

impl ParamValue for String {
    fn into_param(self) -> Option<String> {
        Some(self)
    }
}

impl ParamValue for &str {
    fn into_param(self) -> Option<String> {
        Some(self.to_string())
    }
}

impl ParamValue for &String {
    fn into_param(self) -> Option<String> {
        Some(self.clone())
    }
}

impl<T: ParamValue> ParamValue for Option<T> {
    fn into_param(self) -> Option<String> {
        self.and_then(ParamValue::into_param)
    }
}

macro_rules! display_param_value {
    ($($ty:ty),*) => {
        $(
            impl ParamValue for $ty {
                fn into_param(self) -> Option<String> {
                    Some(self.to_string())
                }
            }
        )*
    };
}

display_param_value!(bool, u8, u16, u32, u64, usize, i32, i64);

/// Method, resource template and tagged parameters of one API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    method: HttpMethod,
    resource: String,
    params: Vec<Parameter>,
    json_body: Option<String>,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, resource: impl Into<String>) -> Self {
        Self {
            method,
            resource: resource.into(),
            params: Vec::new(),
            json_body: None,
        }
    }

    pub fn get(resource: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, resource)
    }

    pub fn post(resource: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, resource)
    }

    pub fn put(resource: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, resource)
    }

    pub fn delete(resource: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, resource)
    }

    pub fn head(resource: impl Into<String>) -> Self {
        Self::new(HttpMethod::Head, resource)
    }

    pub fn patch(resource: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, resource)
    }

    pub fn segment(self, name: &str, value: impl ParamValue) -> Self {
        self.with(name, value, Placement::UrlSegment)
    }

    pub fn param(self, name: &str, value: impl ParamValue) -> Self {
        self.with(name, value, Placement::QueryOrBody)
    }

    pub fn header(self, name: &str, value: impl ParamValue) -> Self {
        self.with(name, value, Placement::Header)
    }

    /// Ask for one page of a collection.
    pub fn page(self, page: u64, per_page: u64) -> Self {
        self.param("page", page).param("per_page", per_page)
    }

    /// Send `body` as JSON. `QueryOrBody` parameters then move to the query
    /// string.
    pub fn json_body<T: Serialize>(mut self, body: &T) -> Result<Self, ApiError> {
        let json = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.json_body = Some(json);
        Ok(self)
    }

    fn with(mut self, name: &str, value: impl ParamValue, placement: Placement) -> Self {
        if let Some(value) = value.into_param() {
            self.params.push(Parameter {
                name: name.to_string(),
                value,
                placement,
            });
        }
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    pub fn body(&self) -> Option<&str> {
        self.json_body.as_deref()
    }

    /// Check that the descriptor can be rendered, without rendering it.
    pub fn validate(&self) -> Result<(), ApiError> {
        self.resolved_segments().map(|_| ())
    }

    /// Render against `base_url` into a plain request.
    pub fn to_request(
        &self,
        base_url: &Url,
        timeout: Option<Duration>,
    ) -> Result<HttpRequest, ApiError> {
        let segments = self.resolved_segments()?;

        let mut url = base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ApiError::InvalidArgument(format!("base url `{base_url}` cannot carry a path"))
            })?
            .pop_if_empty()
            .extend(segments.iter());

        let fields: Vec<&Parameter> = self.placed(Placement::QueryOrBody).collect();
        let mut request = HttpRequest::new(self.method, String::new());
        request.timeout = timeout;

        if self.method.params_in_query() || self.json_body.is_some() {
            if !fields.is_empty() {
                let mut query = url.query_pairs_mut();
                for p in &fields {
                    query.append_pair(&p.name, &p.value);
                }
            }
        } else if !fields.is_empty() {
            let mut form = url::form_urlencoded::Serializer::new(String::new());
            for p in &fields {
                form.append_pair(&p.name, &p.value);
            }
            request.body = Some(form.finish());
            request.headers.push(("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string()));
        }

        if let Some(json) = &self.json_body {
            request.body = Some(json.clone());
            request.headers.push(("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string()));
        }

        for p in self.placed(Placement::Header) {
            request.headers.push((p.name.clone(), p.value.clone()));
        }

        request.url = url.to_string();
        Ok(request)
    }

    fn placed(&self, placement: Placement) -> impl Iterator<Item = &Parameter> {
        self.params.iter().filter(move |p| p.placement == placement)
    }

    fn segment_value(&self, name: &str) -> Option<&str> {
        self.placed(Placement::UrlSegment)
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    /// Path segments of the resource with every `{name}` substituted.
    fn resolved_segments(&self) -> Result<Vec<String>, ApiError> {
        let segments: Vec<&str> = self.resource.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err(ApiError::InvalidArgument(
                "request resource is empty".to_string(),
            ));
        }
        segments.into_iter().map(|s| self.substitute(s)).collect()
    }

    fn substitute(&self, segment: &str) -> Result<String, ApiError> {
        let mut out = String::with_capacity(segment.len());
        let mut rest = segment;
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}').map(|i| open + i) else {
                break;
            };
            let name = &rest[open + 1..close];
            let value = self.segment_value(name).ok_or_else(|| {
                ApiError::InvalidArgument(format!(
                    "no value for url segment `{name}` in `{}`",
                    self.resource
                ))
            })?;
            out.push_str(&rest[..open]);
            out.push_str(value);
            rest = &rest[close + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}
