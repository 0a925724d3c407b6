//! reqwest transport.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{
    Client, Url,
    cookie::{CookieStore, Jar},
    header::ACCEPT,
};
use serde_json::Value;
use tracing::{Span, field, instrument, trace};
use uuid::Uuid;

use crate::{
    api::{ApiRequest, ApiResponse, Method, Transport, TransportError},
    auth::Session,
};

/// Default backend base URL.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api/v1";

const REQUEST_ID_HEADER: &str = "x-request-id";

/// JSON over HTTP, with the backend session cookie kept in step with the [`Session`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    base: Url,
    jar: Arc<Jar>,
    session: Arc<Session>,
}

impl HttpTransport {
    /// Build a transport for `base_url`, seeding the cookie jar from the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the client cannot be built.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: Arc<Session>,
    ) -> Result<Self, TransportError> {
        let base = base_url_from(base_url)?;
        let jar = Arc::new(Jar::default());

        if let Some(cookie) = session.cookie() {
            for pair in cookie.split(';').map(str::trim).filter(|p| !p.is_empty()) {
                jar.add_cookie_str(pair, &base);
            }
        }

        let http = Client::builder()
            .cookie_provider(jar.clone())
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base,
            jar,
            session,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, TransportError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|error| TransportError::InvalidUrl(format!("{path}: {error}")))
    }

    fn remember_cookies(&self) {
        let cookie = self
            .jar
            .cookies(&self.base)
            .and_then(|value| value.to_str().ok().map(str::to_string));

        self.session.set_cookie(cookie);
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(
        name = "api.request",
        skip_all,
        fields(method = %request.method, path = %request.path, request_id = field::Empty, status = field::Empty)
    )]
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let request_id = Uuid::now_v7();

        Span::current().record("request_id", field::display(request_id));

        let mut builder = self
            .http
            .request(http_method(request.method), self.url(&request.path)?)
            .header(REQUEST_ID_HEADER, request_id.to_string())
            .header(ACCEPT, "application/json");

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token.expose());
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;

        Span::current().record("status", status);
        trace!(len = bytes.len(), "response body received");

        self.remember_cookies();

        Ok(ApiResponse::new(status, parse_body(&bytes)))
    }
}

fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Parse the configured base, making sure relative paths join beneath it.
fn base_url_from(raw: &str) -> Result<Url, TransportError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };

    let url = Url::parse(&with_slash)
        .map_err(|error| TransportError::InvalidUrl(format!("{raw}: {error}")))?;

    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(TransportError::InvalidUrl(raw.to_string()));
    }

    Ok(url)
}

fn parse_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }

    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
