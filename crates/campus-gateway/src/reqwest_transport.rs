//! [`Transport`] backed by `reqwest`.

use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part as FormPart};

use crate::{HttpRequest, HttpResponse, Method, Part, RequestBody, Transport, TransportError};

/// Production transport.
///
/// The gateway builds URLs from a base that may be relative (`/api`, the
/// same-origin default). `origin` resolves such URLs; absolute URLs are
/// sent as-is.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    origin: Option<Url>,
}

impl ReqwestTransport {
    pub fn new(origin: Option<Url>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| TransportError::Failed(e.to_string()))?;
        Ok(Self { client, origin })
    }

    /// Like [`new`](Self::new), parsing `origin` first.
    pub fn for_origin(origin: &str) -> Result<Self, TransportError> {
        let origin =
            Url::parse(origin).map_err(|_| TransportError::InvalidUrl(origin.to_string()))?;
        Self::new(Some(origin))
    }

    /// Uses an existing client (shared connection pool, custom TLS, ...).
    pub fn with_client(client: reqwest::Client, origin: Option<Url>) -> Self {
        Self { client, origin }
    }

    fn resolve(&self, url: &str) -> Result<Url, TransportError> {
        match Url::parse(url) {
            Ok(absolute) => Ok(absolute),
            Err(_) => match &self.origin {
                Some(origin) => origin
                    .join(url)
                    .map_err(|_| TransportError::InvalidUrl(url.to_string())),
                None => Err(TransportError::InvalidUrl(url.to_string())),
            },
        }
    }
}

impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse, TransportError> {
        let url = self.resolve(&request.url)?;
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(bytes) => builder.body(bytes),
            RequestBody::Multipart(parts) => builder.multipart(build_form(parts)?),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Failed(e.to_string()))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Failed(e.to_string()))?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            content_type,
            body: body.to_vec(),
        })
    }
}

fn build_form(parts: Vec<Part>) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for part in parts {
        let mut field = FormPart::bytes(part.bytes);
        if let Some(file_name) = part.file_name {
            field = field.file_name(file_name);
        }
        if let Some(mime) = part.mime {
            field = field
                .mime_str(&mime)
                .map_err(|e| TransportError::Failed(e.to_string()))?;
        }
        form = form.part(part.name, field);
    }
    Ok(form)
}
