//! Request descriptors for the uniform admin REST shape and the transport that executes them.
//!
//! Every admin collection answers the same six endpoints under
//! `/api/admin/{domain}/{collection}`. Request builders here are pure: they only describe the
//! call. An [`ApiTransport`] turns a descriptor into an [`ApiReply`]; HTTP statuses other than
//! 2xx are replies, not errors, so callers branch on `reply.status` the same way for every
//! endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use store::models::{form_schema::FormData, pagination::Pagination};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;
use utils::response::{ApiResponse, PageInfo};

use super::config::AdminConfig;

const CSRF_HEADER: &str = "X-CSRFToken";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn is_mutating(self) -> bool {
        !matches!(self, HttpMethod::Get)
    }
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

/// A declarative HTTP call: nothing is sent until a transport executes it.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Post, url).with_body(body)
    }

    pub fn patch(url: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Patch, url).with_body(body)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, url)
    }

    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Which server-side form definition to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum FormKind {
    Search,
    Edit,
}

/// Endpoints of one admin collection, e.g. `media/presentations`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionApi {
    domain: String,
    collection: String,
}

impl CollectionApi {
    pub fn new(domain: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            collection: collection.into(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn base_path(&self) -> String {
        format!("/api/admin/{}/{}", self.domain, self.collection)
    }

    pub fn list(&self, params: Vec<(String, String)>) -> ApiRequest {
        ApiRequest::get(self.base_path()).with_params(params)
    }

    pub fn get(&self, id: &str) -> ApiRequest {
        ApiRequest::get(self.item_path(id))
    }

    pub fn create(&self, body: FormData) -> ApiRequest {
        ApiRequest::post(self.base_path(), Value::Object(body))
    }

    pub fn patch(&self, id: &str, body: FormData) -> ApiRequest {
        ApiRequest::patch(self.item_path(id), Value::Object(body))
    }

    pub fn delete(&self, id: &str) -> ApiRequest {
        ApiRequest::delete(self.item_path(id))
    }

    pub fn form(&self, kind: FormKind) -> ApiRequest {
        ApiRequest::get(format!("{}/forms/{}", self.base_path(), kind))
    }

    fn item_path(&self, id: &str) -> String {
        format!("{}/{}", self.base_path(), id)
    }
}

/// Flatten search form-data into query pairs followed by `page`/`page_size`.
///
/// Nulls and empty strings are left out; lists (date ranges) are joined with a comma. Objects
/// have no query representation and are skipped.
pub fn search_params(formdata: &FormData, pagination: &Pagination) -> Vec<(String, String)> {
    let mut params = Vec::with_capacity(formdata.len() + 2);
    for (key, value) in formdata {
        match query_value(value) {
            Some(rendered) => params.push((key.clone(), rendered)),
            None if value.is_object() => {
                debug!(field = %key, "search field has no query form, skipping");
            }
            None => {}
        }
    }
    params.push(("page".to_string(), pagination.page.to_string()));
    params.push(("page_size".to_string(), pagination.page_size.to_string()));
    params
}

fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Object(_) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            if items.is_empty() {
                return None;
            }
            let parts: Vec<String> = items
                .iter()
                .map(|item| query_value(item).unwrap_or_default())
                .collect();
            Some(parts.join(","))
        }
    }
}

/// The `id` of an entity row, whether the backend sends it as a number or a string.
pub fn entity_id(row: &Value) -> Option<String> {
    match row.get("id")? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Status plus decoded envelope of a completed call.
#[derive(Debug, Clone)]
pub struct ApiReply {
    pub status: u16,
    pub body: ApiResponse<Value>,
}

impl ApiReply {
    pub fn new(status: u16, body: ApiResponse<Value>) -> Self {
        Self { status, body }
    }

    pub fn ok(data: Value) -> Self {
        Self::new(200, ApiResponse::success(data))
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn data(&self) -> Option<&Value> {
        self.body.data.as_ref()
    }

    pub fn into_data(self) -> Option<Value> {
        self.body.data
    }

    pub fn pagination(&self) -> Option<&PageInfo> {
        self.body.pagination.as_ref()
    }
}

/// The call never produced an HTTP status.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("timeout")]
    Timeout,
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiReply, TransportError>;
}

/// `reqwest`-backed transport. Keeps the session cookie between calls.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    base_url: Url,
    csrf_token: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &AdminConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .user_agent(concat!("admin-services/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let base_url =
            Url::parse(&config.base_url).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            csrf_token: config.csrf_token.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiReply, TransportError> {
        let url = self
            .base_url
            .join(&request.url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {e}", request.url)))?;

        let mut builder = self.http.request(request.method.into(), url);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if request.method.is_mutating() {
            if let Some(token) = &self.csrf_token {
                builder = builder.header(CSRF_HEADER, token);
            }
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let res = builder.send().await.map_err(map_reqwest_error)?;
        let status = res.status().as_u16();
        let text = res.text().await.map_err(map_reqwest_error)?;

        debug!(
            method = %request.method,
            url = %request.url,
            status,
            "admin api call completed"
        );

        Ok(ApiReply::new(status, decode_envelope(status, &text)))
    }
}

fn decode_envelope(status: u16, text: &str) -> ApiResponse<Value> {
    if text.trim().is_empty() {
        return ApiResponse::default();
    }
    serde_json::from_str(text).unwrap_or_else(|e| {
        warn!(status, error = %e, "response body is not an api envelope");
        ApiResponse::error(i64::from(status), text.chars().take(500).collect::<String>())
    })
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_collection_endpoints() {
        let api = CollectionApi::new("media", "presentations");
        assert_eq!(api.list(vec![]).url, "/api/admin/media/presentations");
        assert_eq!(api.get("4").url, "/api/admin/media/presentations/4");
        assert_eq!(api.delete("4").method, HttpMethod::Delete);
        assert_eq!(
            api.form(FormKind::Search).url,
            "/api/admin/media/presentations/forms/search"
        );

        let patch = api.patch("4", FormData::new());
        assert_eq!(patch.method, HttpMethod::Patch);
        assert_eq!(patch.body, Some(json!({})));
    }

    #[test]
    fn test_search_params_flattening() {
        let formdata = match json!({
            "title": "rust",
            "author_name": "",
            "publish_range": ["2019-01-01", "2019-02-01"],
            "status": null,
            "published": false,
            "owner": { "id": 3 },
            "level": 2
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        let params = search_params(&formdata, &Pagination::default());
        let lookup = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(lookup("title"), Some("rust"));
        assert_eq!(lookup("author_name"), None);
        assert_eq!(lookup("publish_range"), Some("2019-01-01,2019-02-01"));
        assert_eq!(lookup("status"), None);
        assert_eq!(lookup("published"), Some("false"));
        assert_eq!(lookup("owner"), None);
        assert_eq!(lookup("level"), Some("2"));
        assert_eq!(lookup("page"), Some("1"));
        assert_eq!(lookup("page_size"), Some("10"));
    }

    #[test]
    fn test_entity_id_accepts_numbers_and_strings() {
        assert_eq!(entity_id(&json!({ "id": 12 })), Some("12".to_string()));
        assert_eq!(entity_id(&json!({ "id": "a1" })), Some("a1".to_string()));
        assert_eq!(entity_id(&json!({ "id": null })), None);
        assert_eq!(entity_id(&json!({})), None);
    }

    #[test]
    fn test_decode_envelope_tolerates_non_json() {
        let body = decode_envelope(502, "<html>Bad Gateway</html>");
        assert_eq!(body.code, 502);
        assert!(body.message.contains("Bad Gateway"));

        let empty = decode_envelope(204, "");
        assert!(empty.data.is_none());
    }

    #[test]
    fn test_only_get_is_safe() {
        assert!(!HttpMethod::Get.is_mutating());
        assert!(HttpMethod::Delete.is_mutating());
        assert_eq!(HttpMethod::Patch.to_string(), "PATCH");
    }
}
