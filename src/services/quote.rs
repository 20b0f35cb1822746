//! Inspirational quotes from a generative text API
//!
//! The quote panel never shows an error: any failure is logged with a short
//! reason and replaced by a fixed fallback quote. The API key is sent in a
//! request header only, so it never ends up in URLs or error messages.

use std::{fmt, time::Duration};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

pub const DEFAULT_QUOTE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_QUOTE_MODEL: &str = "gemini-3-flash-preview";

pub const FALLBACK_TEXT: &str = "静かな水面は、心を映し出す鏡のようなものです。";
pub const FALLBACK_AUTHOR: &str = "湖畔の知恵";

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteData {
    pub text: String,
    pub author: String,
}

impl QuoteData {
    pub fn fallback() -> Self {
        Self {
            text: FALLBACK_TEXT.to_string(),
            author: FALLBACK_AUTHOR.to_string(),
        }
    }
}

/// API credential; `Debug` output is redacted
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    /// Returns `None` for blank keys
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            None
        } else {
            Some(Self(key))
        }
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[async_trait]
pub trait QuoteProvider: Send + Sync + fmt::Debug {
    async fn generate_quote(&self) -> Result<QuoteData>;
}

/// Fetch one quote, falling back to [`QuoteData::fallback`] on any failure
pub async fn fetch_quote(provider: &dyn QuoteProvider) -> QuoteData {
    match provider.generate_quote().await {
        Ok(quote) => {
            debug!("Fetched quote by {}", quote.author);
            quote
        }
        Err(e) => {
            error!("Failed to fetch zen quote: {:#}", e);
            QuoteData::fallback()
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: Option<ApiKey>,
    http: Client,
}

impl GeminiClient {
    pub fn new(base_url: String, model: String, api_key: Option<ApiKey>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client for the quote service")?;

        Ok(Self {
            base_url,
            model,
            api_key,
            http,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn request_body() -> serde_json::Value {
        json!({
            "contents": [{ "parts": [{ "text": "" }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "text": { "type": "STRING" },
                        "author": { "type": "STRING" }
                    },
                    "required": ["text", "author"]
                }
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct GmPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GmContent {
    #[serde(default)]
    parts: Vec<GmPart>,
}

#[derive(Debug, Deserialize)]
struct GmCandidate {
    content: Option<GmContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmResponse {
    #[serde(default)]
    candidates: Vec<GmCandidate>,
}

#[async_trait]
impl QuoteProvider for GeminiClient {
    async fn generate_quote(&self) -> Result<QuoteData> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("No API key configured for the quote service"))?;

        let res = self
            .http
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key.expose())
            .json(&Self::request_body())
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("Failed to send request to the quote service")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| e.without_url())
            .context("Failed to read quote response body")?;

        if !status.is_success() {
            return Err(anyhow!("Quote request failed with status {}", status));
        }

        parse_quote(&body)
    }
}

/// Extract the generated quote from a `generateContent` response
pub fn parse_quote(body: &str) -> Result<QuoteData> {
    let parsed: GmResponse =
        serde_json::from_str(body).context("Failed to parse quote response JSON")?;

    let text = parsed
        .candidates
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .find_map(|part| part.text)
        .ok_or_else(|| anyhow!("Quote response contained no text"))?;

    let quote: QuoteData =
        serde_json::from_str(&text).context("Generated quote does not match the expected shape")?;

    Ok(quote)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, http::StatusCode, routing::post, Router};
    use std::{
        io::Write,
        sync::{Arc, Mutex},
    };
    use tokio::net::TcpListener;
    use tracing_subscriber::fmt::MakeWriter;

    const SECRET: &str = "test-secret-key-8c1f";

    /// Collects formatted log output
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            let bytes = self.0.lock().expect("log buffer").clone();
            String::from_utf8_lossy(&bytes).into_owned()
        }
    }

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("log buffer").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("fake backend");
        });
        format!("http://{addr}")
    }

    fn candidate_body(quote_json: &str) -> String {
        json!({
            "candidates": [{ "content": { "parts": [{ "text": quote_json }], "role": "model" } }]
        })
        .to_string()
    }

    #[test]
    fn parses_generated_quote() {
        let body = candidate_body(r#"{"text": "一期一会", "author": "千利休"}"#);
        let quote = parse_quote(&body).expect("valid quote");
        assert_eq!(quote.text, "一期一会");
        assert_eq!(quote.author, "千利休");
    }

    #[test]
    fn rejects_quote_of_wrong_shape() {
        let body = candidate_body(r#"{"quote": "missing fields"}"#);
        assert!(parse_quote(&body).is_err());
        assert!(parse_quote(r#"{"candidates": []}"#).is_err());
    }

    #[test]
    fn api_key_debug_is_redacted() {
        let key = ApiKey::new(SECRET).expect("non-blank key");
        assert!(!format!("{key:?}").contains(SECRET));
        assert!(ApiKey::new("   ").is_none());
    }

    #[tokio::test]
    async fn sends_key_in_header_and_returns_quote() {
        let router = Router::new().route(
            "/v1beta/models/:model",
            post(|headers: HeaderMap| async move {
                let key = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
                if key == Some(SECRET) {
                    (
                        StatusCode::OK,
                        candidate_body(r#"{"text": "水は方円の器に随う", "author": "荀子"}"#),
                    )
                } else {
                    (StatusCode::FORBIDDEN, String::new())
                }
            }),
        );
        let url = serve(router).await;

        let client = GeminiClient::new(url, DEFAULT_QUOTE_MODEL.to_string(), ApiKey::new(SECRET))
            .expect("client");
        let quote = fetch_quote(&client).await;
        assert_eq!(quote.author, "荀子");
    }

    #[tokio::test]
    async fn missing_key_yields_fallback() {
        let client = GeminiClient::new(
            "http://127.0.0.1:9".to_string(),
            DEFAULT_QUOTE_MODEL.to_string(),
            None,
        )
        .expect("client");

        assert_eq!(fetch_quote(&client).await, QuoteData::fallback());
    }

    #[tokio::test]
    async fn backend_failure_yields_fallback_without_leaking_key() {
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let router = Router::new().route(
            "/v1beta/models/:model",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "backend exploded") }),
        );
        let url = serve(router).await;

        let client = GeminiClient::new(url, DEFAULT_QUOTE_MODEL.to_string(), ApiKey::new(SECRET))
            .expect("client");
        let quote = fetch_quote(&client).await;

        assert_eq!(quote.text, FALLBACK_TEXT);
        assert_eq!(quote.author, FALLBACK_AUTHOR);

        let output = logs.contents();
        assert!(output.contains("Failed to fetch zen quote"));
        assert!(!output.contains(SECRET));
    }
}
