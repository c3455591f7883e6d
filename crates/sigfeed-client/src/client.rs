//! HTTP client for the signal list, enrichment and translation endpoints.

use crate::error::{ClientError, ClientResult};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sigfeed_core::{
    ApiError, ApiResult, BoxFuture, EnrichmentRecord, EnrichmentSource, Language, SignalFilters,
    SignalId, SignalPage, SignalSource, Translator,
};
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Connection settings for `ApiClient`.
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL, e.g. `https://api.example.com/v1`.
    pub base_url: String,
    pub request_timeout_ms: u64,
    /// Bearer token issued by the authentication provider.
    pub auth_token: Option<String>,
}

impl ApiClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
            auth_token: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    texts: &'a [String],
    target_language: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translations: Vec<String>,
}

/// REST client for the signal feed backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl ApiClient {
    pub fn new(config: ApiClientConfig) -> ClientResult<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidBaseUrl(config.base_url));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| ClientError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            auth_token: config.auth_token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ApiError::Network(format!("HTTP request failed: {e}")))?;
        decode(response).await
    }

    /// `GET /signals` with the non-empty filter fields as query parameters.
    pub async fn fetch_signals(&self, filters: &SignalFilters) -> ApiResult<SignalPage> {
        debug!(?filters, "Fetching signal list");
        let request = self.client.get(self.url("/signals")).query(filters);
        self.send_json(request).await
    }

    pub async fn fetch_enrichment(&self, signal_id: SignalId) -> ApiResult<EnrichmentRecord> {
        debug!(signal_id = %signal_id, "Fetching enrichment");
        let request = self
            .client
            .get(self.url(&format!("/signals/{signal_id}/enrichment")));
        self.send_json(request).await
    }

    /// Translate `texts` into `target`, preserving order.
    ///
    /// A response of a different length than the input is a translation failure.
    pub async fn translate(&self, texts: &[String], target: &Language) -> ApiResult<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = TranslateRequest {
            texts,
            target_language: target.code(),
        };
        let request = self.client.post(self.url("/translate")).json(&body);
        let response: TranslateResponse = self.send_json(request).await?;

        if response.translations.len() != texts.len() {
            warn!(
                expected = texts.len(),
                actual = response.translations.len(),
                language = %target,
                "Translation length mismatch"
            );
            return Err(ApiError::Translation(format!(
                "expected {} texts, got {}",
                texts.len(),
                response.translations.len()
            )));
        }

        Ok(response.translations)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Http {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ApiError::Network(format!("Failed to read response body: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

impl SignalSource for ApiClient {
    fn fetch_signals(&self, filters: SignalFilters) -> BoxFuture<'_, ApiResult<SignalPage>> {
        Box::pin(async move { ApiClient::fetch_signals(self, &filters).await })
    }
}

impl EnrichmentSource for ApiClient {
    fn fetch_enrichment(&self, signal_id: SignalId) -> BoxFuture<'_, ApiResult<EnrichmentRecord>> {
        Box::pin(ApiClient::fetch_enrichment(self, signal_id))
    }
}

impl Translator for ApiClient {
    fn translate(
        &self,
        texts: Vec<String>,
        target: Language,
    ) -> BoxFuture<'_, ApiResult<Vec<String>>> {
        Box::pin(async move {
            ApiClient::translate(self, &texts, &target)
                .await
                .map_err(|e| match e {
                    ApiError::Translation(_) => e,
                    other => ApiError::Translation(other.to_string()),
                })
        })
    }
}
