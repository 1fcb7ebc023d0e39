//! The request gateway: URL building, body encoding, response
//! classification.
//!
//! Every verb funnels into [`RequestGateway::request_raw`], so there is a
//! single place where a response turns into either a payload or an
//! [`ApiError`].

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{
    ApiError, HttpRequest, HttpResponse, Method, Page, PageQuery, Part,
    QueryParams, RequestBody, Transport,
};

/// Same-origin API root used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "/api";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// API root every endpoint is appended to.
    pub base_url: String,
    /// Headers sent with every request (per-request headers come after).
    pub default_headers: Vec<(String, String)>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_headers: vec![("Accept".into(), "application/json".into())],
        }
    }
}

impl GatewayConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

/// Body supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(serde_json::Value),
    /// File upload; content-type negotiation is left to the transport.
    Multipart(Vec<Part>),
}

/// Per-request options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub params: QueryParams,
    pub body: Option<Body>,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    /// Serializes `body` as the JSON payload.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(ApiError::encode)?;
        self.body = Some(Body::Json(value));
        Ok(self)
    }

    #[must_use]
    pub fn multipart(mut self, parts: Vec<Part>) -> Self {
        self.body = Some(Body::Multipart(parts));
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// JSON-typed response, parsed.
    Json(serde_json::Value),
    /// Anything else (CSV exports, PDFs, empty 204s), untouched.
    Raw(HttpResponse),
}

impl Reply {
    /// Deserializes the payload. A raw reply is presented as JSON `null`,
    /// which satisfies `()` and `Option<_>` targets.
    pub fn into_typed<T: DeserializeOwned>(self, status: u16) -> Result<T, ApiError> {
        let value = match self {
            Self::Json(value) => value,
            Self::Raw(_) => serde_json::Value::Null,
        };
        serde_json::from_value(value).map_err(|e| ApiError::decode(status, e))
    }
}

/// Issues requests against the API and normalizes every failure into an
/// [`ApiError`].
///
/// Cheap to clone: the transport is shared behind an `Arc`.
pub struct RequestGateway<T: Transport> {
    transport: Arc<T>,
    config: Arc<GatewayConfig>,
}

impl<T: Transport> Clone for RequestGateway<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: Arc::clone(&self.config),
        }
    }
}

impl<T: Transport> RequestGateway<T> {
    pub fn new(transport: T, config: GatewayConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Full URL for `endpoint` with present `params` appended.
    pub fn url_for(&self, endpoint: &str, params: &QueryParams) -> String {
        let mut url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );
        if !params.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&params.to_query_string());
        }
        url
    }

    /// Sends a request and classifies the response.
    ///
    /// # Errors
    /// - `status == 0` if the transport produced no response
    /// - the response status otherwise, with body fields when JSON
    pub async fn request_raw(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<(u16, Reply), ApiError> {
        let url = self.url_for(endpoint, &options.params);
        let mut headers = self.config.default_headers.clone();

        let body = match options.body {
            None => RequestBody::Empty,
            Some(Body::Json(value)) => {
                headers.push(("Content-Type".into(), "application/json".into()));
                let bytes = serde_json::to_vec(&value)
                    .map_err(ApiError::encode)?;
                RequestBody::Json(bytes)
            }
            Some(Body::Multipart(parts)) => RequestBody::Multipart(parts),
        };
        headers.extend(options.headers);

        tracing::debug!(%method, %url, "api request");

        let response = self
            .transport
            .send(HttpRequest {
                method,
                url: url.clone(),
                headers,
                body,
            })
            .await
            .map_err(|e| {
                tracing::debug!(%method, %url, error = %e, "api request failed in transport");
                ApiError::network(e)
            })?;

        let status = response.status;
        interpret(response)
            .map(|reply| (status, reply))
            .inspect_err(|err| {
                tracing::debug!(
                    %method,
                    %url,
                    status = err.status,
                    code = err.code.as_deref().unwrap_or(""),
                    "api request rejected"
                );
            })
    }

    /// Sends a request and deserializes the successful payload.
    pub async fn request<R: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<R, ApiError> {
        let (status, reply) = self.request_raw(method, endpoint, options).await?;
        reply.into_typed(status)
    }

    pub async fn get<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: QueryParams,
    ) -> Result<R, ApiError> {
        self.request(Method::Get, endpoint, RequestOptions::new().params(params))
            .await
    }

    pub async fn post<R: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        self.request(Method::Post, endpoint, RequestOptions::new().json(body)?)
            .await
    }

    pub async fn put<R: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        self.request(Method::Put, endpoint, RequestOptions::new().json(body)?)
            .await
    }

    pub async fn patch<R: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        self.request(Method::Patch, endpoint, RequestOptions::new().json(body)?)
            .await
    }

    pub async fn delete<R: DeserializeOwned>(&self, endpoint: &str) -> Result<R, ApiError> {
        self.request(Method::Delete, endpoint, RequestOptions::new())
            .await
    }

    /// Multipart POST (file upload).
    pub async fn upload<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        parts: Vec<Part>,
    ) -> Result<R, ApiError> {
        self.request(Method::Post, endpoint, RequestOptions::new().multipart(parts))
            .await
    }

    /// Paginated listing: `GET {endpoint}?page=&pageSize=&sort=&order=&...`.
    pub async fn list<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &PageQuery,
    ) -> Result<Page<R>, ApiError> {
        self.get(endpoint, query.to_params()).await
    }

    /// Free-text search: `GET {endpoint}/search?q={term}&...`.
    pub async fn search<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        term: &str,
        extra: QueryParams,
    ) -> Result<Vec<R>, ApiError> {
        let mut params = QueryParams::new().with("q", term);
        params.extend(extra);
        let path = format!("{}/search", endpoint.trim_end_matches('/'));
        self.get(&path, params).await
    }

    /// `POST {endpoint}/bulk-delete { ids }`.
    pub async fn bulk_delete<R: DeserializeOwned, I: Serialize>(
        &self,
        endpoint: &str,
        ids: &[I],
    ) -> Result<R, ApiError> {
        let path = format!("{}/bulk-delete", endpoint.trim_end_matches('/'));
        self.post(&path, &BulkRequest { ids, data: None::<&()> }).await
    }

    /// `POST {endpoint}/bulk-update { ids, data }`.
    pub async fn bulk_update<R: DeserializeOwned, I: Serialize, P: Serialize>(
        &self,
        endpoint: &str,
        ids: &[I],
        patch: &P,
    ) -> Result<R, ApiError> {
        let path = format!("{}/bulk-update", endpoint.trim_end_matches('/'));
        self.post(&path, &BulkRequest { ids, data: Some(patch) }).await
    }
}

#[derive(Serialize)]
struct BulkRequest<'a, I, P> {
    ids: &'a [I],
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a P>,
}

/// Turns a raw response into a reply or an error.
fn interpret(response: HttpResponse) -> Result<Reply, ApiError> {
    if !response.is_json() {
        return if response.is_success() {
            Ok(Reply::Raw(response))
        } else {
            Err(ApiError::from_status(response.status, &response.status_text))
        };
    }

    // An empty JSON-typed body (204 with a stray content type) is not an error.
    let parsed = if response.body.iter().all(u8::is_ascii_whitespace) {
        Ok(serde_json::Value::Null)
    } else {
        serde_json::from_slice::<serde_json::Value>(&response.body)
    };

    match (response.is_success(), parsed) {
        (true, Ok(value)) => Ok(Reply::Json(value)),
        (true, Err(e)) => Err(ApiError::decode(response.status, e)),
        (false, Ok(value)) => Err(ApiError::from_body(
            response.status,
            &response.status_text,
            &value,
        )),
        (false, Err(_)) => Err(ApiError::from_status(response.status, &response.status_text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_body_unserializable_is_encode_error() {
        let body: std::collections::HashMap<(u8, u8), u8> = [((1, 2), 3)].into();

        let err = RequestOptions::new().json(&body).unwrap_err();

        assert_eq!(err.code.as_deref(), Some(crate::ENCODE_ERROR));
        assert!(!err.is_retryable());
    }

    fn json_response(status: u16, status_text: &str, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            status_text: status_text.into(),
            content_type: Some("application/json".into()),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_interpret_success_json_returns_value() {
        let reply = interpret(json_response(200, "OK", r#"{"data":1}"#)).unwrap();

        assert_eq!(reply, Reply::Json(serde_json::json!({ "data": 1 })));
    }

    #[test]
    fn test_interpret_success_non_json_returns_raw() {
        let response = HttpResponse {
            status: 200,
            status_text: "OK".into(),
            content_type: Some("text/csv".into()),
            body: b"a,b\n1,2".to_vec(),
        };

        let reply = interpret(response.clone()).unwrap();

        assert_eq!(reply, Reply::Raw(response));
    }

    #[test]
    fn test_interpret_failure_non_json_uses_status_text() {
        let response = HttpResponse {
            status: 502,
            status_text: "Bad Gateway".into(),
            content_type: Some("text/html".into()),
            body: b"<h1>oops</h1>".to_vec(),
        };

        let err = interpret(response).unwrap_err();

        assert_eq!(err.status, 502);
        assert_eq!(err.message, "HTTP 502: Bad Gateway");
    }

    #[test]
    fn test_interpret_failure_with_unparseable_json_uses_status_text() {
        let err = interpret(json_response(500, "Internal Server Error", "{oops")).unwrap_err();

        assert_eq!(err.message, "HTTP 500: Internal Server Error");
    }

    #[test]
    fn test_interpret_success_with_unparseable_json_is_decode_error() {
        let err = interpret(json_response(200, "OK", "{oops")).unwrap_err();

        assert_eq!(err.status, 200);
        assert_eq!(err.code.as_deref(), Some(crate::DECODE_ERROR));
    }

    #[test]
    fn test_interpret_empty_json_body_is_null() {
        let reply = interpret(json_response(204, "No Content", "")).unwrap();

        assert_eq!(reply, Reply::Json(serde_json::Value::Null));
    }

    #[test]
    fn test_into_typed_raw_reply_satisfies_unit() {
        let raw = Reply::Raw(HttpResponse {
            status: 204,
            status_text: "No Content".into(),
            content_type: None,
            body: Vec::new(),
        });

        assert!(raw.into_typed::<()>(204).is_ok());
    }
}
