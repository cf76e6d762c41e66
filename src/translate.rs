//! Optional translation of normalised entries.
//!
//! The backend sits behind the [`Translator`] trait and is handed to the
//! crawl explicitly, so tests can substitute a double.  [`TranslationAdapter`]
//! translates title, description and content independently: a failure on one
//! field leaves that field untranslated and never affects the other two.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::TranslationError;
use crate::normalize::{first_non_empty, NormalizedEntry};

/// A translation backend.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError>;
}

/// Original and translated text for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// Translated title, or the original if its translation failed.
    pub title: String,
    /// Translated description, or the original if its translation failed.
    pub description: String,
    /// First non-empty of translated content, description, title; the
    /// untranslated `text` if none of them produced anything.
    pub text: String,
    pub src_title: String,
    pub src_description: String,
    /// Untranslated content, `None` when the entry had none.
    pub src_content: Option<String>,
}

/// Binds a [`Translator`] to a language pair.
pub struct TranslationAdapter {
    translator: Arc<dyn Translator>,
    source_lang: String,
    target_lang: String,
}

impl TranslationAdapter {
    pub fn new(
        translator: Arc<dyn Translator>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            translator,
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
        }
    }

    /// Translate the three text fields of `entry` concurrently.
    pub async fn translate(&self, entry: &NormalizedEntry) -> Translation {
        let (title, description, content) = tokio::join!(
            self.field("title", &entry.link, &entry.title),
            self.field("description", &entry.link, &entry.description),
            self.field("content", &entry.link, &entry.content),
        );

        let text = first_non_empty([
            content.as_deref().unwrap_or(""),
            description.as_deref().unwrap_or(""),
            title.as_deref().unwrap_or(""),
        ]);
        let text = if text.is_empty() { entry.text.clone() } else { text.to_string() };

        Translation {
            title: title.unwrap_or_else(|| entry.title.clone()),
            description: description.unwrap_or_else(|| entry.description.clone()),
            text,
            src_title: entry.title.clone(),
            src_description: entry.description.clone(),
            src_content: Some(entry.content.clone()).filter(|c| !c.is_empty()),
        }
    }

    /// `None` when the field failed; empty input is never sent.
    async fn field(&self, field: &'static str, link: &str, text: &str) -> Option<String> {
        if text.is_empty() {
            return Some(String::new());
        }
        match self
            .translator
            .translate(text, &self.source_lang, &self.target_lang)
            .await
        {
            Ok(translated) => Some(translated),
            Err(e) => {
                warn!(field, link, error = %e, "keeping untranslated text");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// LibreTranslate-compatible backend
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// Translator speaking the LibreTranslate `POST /translate` protocol.
pub struct HttpTranslator {
    client: Client,
    endpoint: String,
}

impl HttpTranslator {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/translate", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        let request = TranslateRequest {
            q: text,
            source: source_lang,
            target: target_lang,
            format: "text",
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| TranslationError::Unavailable(e.to_string()))?;

        let status = response.status();
        if let Some(err) = classify_status(status) {
            return Err(err);
        }

        let body: TranslateResponse = response
            .json()
            .await
            .map_err(|e| TranslationError::Failed(format!("bad response body: {e}")))?;
        Ok(body.translated_text)
    }
}

/// Rate limits, quota and backend outages are "unavailable"; anything else
/// that is not a success is a plain failure.
fn classify_status(status: StatusCode) -> Option<TranslationError> {
    if status.is_success() {
        None
    } else if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::FORBIDDEN
        || status.is_server_error()
    {
        Some(TranslationError::Unavailable(format!("HTTP {status}")))
    } else {
        Some(TranslationError::Failed(format!("HTTP {status}")))
    }
}
