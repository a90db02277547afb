use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};
use crate::services::prompt_service;

/// The two calls the quiz flow needs from a generative AI provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizProvider: Send + Sync {
    /// Returns the raw response text, expected to be the JSON quiz document.
    async fn generate_quiz(&self, instruction: &str, schema: &JsonValue) -> Result<String>;

    /// Returns an inline `data:` URL, or `None` when the provider produced no image.
    async fn generate_image(&self, prompt: &str) -> Result<Option<String>>;
}

#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    quiz_model: String,
    image_model: String,
    timeout: Duration,
}

impl GeminiProvider {
    pub fn new(
        client: Client,
        api_key: String,
        base_url: String,
        quiz_model: String,
        image_model: String,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url,
            quiz_model,
            image_model,
            timeout,
        }
    }

    pub fn from_config(config: &crate::config::Config, client: Client) -> Self {
        Self::new(
            client,
            config.gemini_api_key.clone(),
            config.gemini_base_url.clone(),
            config.quiz_model.clone(),
            config.image_model.clone(),
            Duration::from_secs(config.ai_timeout_secs),
        )
    }

    fn endpoint(&self, model: &str) -> Result<Url> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("Invalid GEMINI_BASE_URL: {}", e)))?;
        let mut url = base
            .join(&format!("v1beta/models/{}:generateContent", model))
            .map_err(|e| Error::Config(format!("Invalid model endpoint: {}", e)))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn generate_content(&self, model: &str, payload: JsonValue) -> Result<JsonValue> {
        let res = self
            .client
            .post(self.endpoint(model)?)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::GenerationTransport(format!(
                "Gemini API Error {}: {}",
                status, text
            )));
        }

        let text = res.text().await?;
        decode_body(&text)
    }
}

#[async_trait]
impl QuizProvider for GeminiProvider {
    async fn generate_quiz(&self, instruction: &str, schema: &JsonValue) -> Result<String> {
        let payload = serde_json::json!({
            "contents": [
                { "role": "user", "parts": [{ "text": instruction }] }
            ],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": to_gemini_schema(schema)
            }
        });

        tracing::info!(model = %self.quiz_model, "Sending quiz generation request to Gemini");
        let body = self.generate_content(&self.quiz_model, payload).await?;

        let text = response_parts(&body)
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect::<String>();
        if text.trim().is_empty() {
            return Err(Error::ResponseFormat(
                "Gemini returned no text content".to_string(),
            ));
        }
        tracing::info!(bytes = text.len(), "Quiz generation response received");
        Ok(text)
    }

    async fn generate_image(&self, prompt: &str) -> Result<Option<String>> {
        let payload = serde_json::json!({
            "contents": [
                { "parts": [{ "text": prompt_service::image_prompt(prompt) }] }
            ]
        });

        let body = self.generate_content(&self.image_model, payload).await?;
        for part in response_parts(&body) {
            if let Some(url) = inline_data_url(part)? {
                return Ok(Some(url));
            }
        }
        Ok(None)
    }
}

/// A 2xx body that is not JSON is a malformed response, not a transport failure.
fn decode_body(text: &str) -> Result<JsonValue> {
    serde_json::from_str(text)
        .map_err(|e| Error::ResponseFormat(format!("Gemini returned a non-JSON body: {}", e)))
}

fn response_parts(body: &JsonValue) -> &[JsonValue] {
    body.get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// `inlineData` part -> `data:<mime>;base64,<payload>`.
fn inline_data_url(part: &JsonValue) -> Result<Option<String>> {
    let Some(inline) = part.get("inlineData").or_else(|| part.get("inline_data")) else {
        return Ok(None);
    };
    let data = inline
        .get("data")
        .and_then(|d| d.as_str())
        .filter(|d| !d.is_empty())
        .ok_or_else(|| Error::ImageResolution("inline image without data".to_string()))?;
    BASE64
        .decode(data)
        .map_err(|e| Error::ImageResolution(format!("inline image is not base64: {}", e)))?;
    let mime = inline
        .get("mimeType")
        .or_else(|| inline.get("mime_type"))
        .and_then(|m| m.as_str())
        .unwrap_or("image/png");
    Ok(Some(format!("data:{};base64,{}", mime, data)))
}

/// Gemini's response schema wants upper-case type names and rejects
/// keywords outside its OpenAPI subset.
pub fn to_gemini_schema(schema: &JsonValue) -> JsonValue {
    match schema {
        JsonValue::Object(map) => {
            let mut out = serde_json::Map::new();
            for (key, value) in map {
                match key.as_str() {
                    "type" => {
                        let upper = value
                            .as_str()
                            .map(|t| JsonValue::String(t.to_ascii_uppercase()))
                            .unwrap_or_else(|| value.clone());
                        out.insert(key.clone(), upper);
                    }
                    "additionalProperties" | "$schema" => {}
                    "properties" => {
                        let props = value
                            .as_object()
                            .map(|p| {
                                p.iter()
                                    .map(|(name, prop)| (name.clone(), to_gemini_schema(prop)))
                                    .collect::<serde_json::Map<_, _>>()
                            })
                            .unwrap_or_default();
                        out.insert(key.clone(), JsonValue::Object(props));
                    }
                    _ => {
                        out.insert(key.clone(), to_gemini_schema(value));
                    }
                }
            }
            JsonValue::Object(out)
        }
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(to_gemini_schema).collect()),
        other => other.clone(),
    }
}
