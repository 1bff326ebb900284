// src/llm/client.rs

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;

use crate::error::Error;

/// Fixed generation model; the pipeline is single-model by design.
pub const GENERATION_MODEL: &str = "gemini-2.0-flash";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug)]
pub struct GenerationClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GenerationClient {
    pub fn new(api_key: String, base_url: Option<String>) -> Result<Self, Error> {
        if api_key.trim().is_empty() {
            return Err(Error::Validation(
                "model API key is not configured; run `testloom configure`".into(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.into()),
        })
    }

    /// Send one prompt and return the first candidate's text.
    ///
    /// An envelope without the expected candidate path yields an empty
    /// string; callers treat that as "no usable output", not as an error.
    pub fn invoke(&self, prompt: &str) -> Result<String, Error> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, GENERATION_MODEL, self.api_key
        );

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let resp = self.client.post(&url).json(&body).send()?;

        let status = resp.status();
        let raw = resp.text()?;

        if !status.is_success() {
            return Err(Error::Provider {
                status: status.as_u16(),
                message: provider_message(&raw),
            });
        }

        let Ok(envelope) = serde_json::from_str::<Value>(&raw) else {
            return Ok(String::new());
        };
        Ok(extract_candidate_text(&envelope))
    }
}

/// First candidate, first part. Missing fields degrade to "".
fn extract_candidate_text(v: &Value) -> String {
    v.pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn provider_message(raw: &str) -> String {
    serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
        .unwrap_or_else(|| raw.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_first_candidate_text() {
        let envelope = json!({
            "candidates": [
                { "content": { "parts": [ { "text": "1. Test add()" } ] } },
                { "content": { "parts": [ { "text": "ignored" } ] } }
            ]
        });
        assert_eq!(extract_candidate_text(&envelope), "1. Test add()");
    }

    #[test]
    fn missing_candidates_yield_empty_string() {
        assert_eq!(extract_candidate_text(&json!({})), "");
        assert_eq!(extract_candidate_text(&json!({ "candidates": [] })), "");
        assert_eq!(
            extract_candidate_text(&json!({ "candidates": [ { "content": {} } ] })),
            ""
        );
    }

    #[test]
    fn provider_message_prefers_error_envelope() {
        let raw = r#"{"error":{"code":429,"message":"quota exhausted"}}"#;
        assert_eq!(provider_message(raw), "quota exhausted");
        assert_eq!(provider_message("plain failure text"), "plain failure text");
    }

    #[test]
    fn empty_api_key_is_rejected_before_any_request() {
        let err = GenerationClient::new("  ".into(), None).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn request_body_matches_provider_shape() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: "hello" }],
            }],
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({ "contents": [ { "parts": [ { "text": "hello" } ] } ] })
        );
    }
}
