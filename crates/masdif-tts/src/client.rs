// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for a Tiro-compatible speech synthesis API.
//!
//! Rate limiting (429) and empty audio bodies are retried with linearly
//! increasing backoff; any other non-success status fails immediately.

use std::time::Duration;

use masdif_core::MasdifError;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, warn};

use crate::voices::Voice;

/// Body of a speech request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpeechRequest {
    pub engine: String,
    pub language_code: String,
    pub lexicon_names: Vec<String>,
    pub output_format: String,
    pub sample_rate: String,
    pub text: String,
    pub text_type: String,
    pub voice_id: String,
}

/// Outcome of a voices lookup.
#[derive(Debug)]
pub enum VoicesOutcome {
    Voices(Vec<Voice>),
    RateLimited,
}

#[derive(Debug, Clone)]
pub struct TtsClient {
    client: reqwest::Client,
    base_url: String,
    voices_path: String,
    speech_path: String,
    retry_attempts: u32,
    retry_backoff: Duration,
}

impl TtsClient {
    pub fn new(
        base_url: &str,
        voices_path: &str,
        speech_path: &str,
        timeout: Duration,
    ) -> Result<Self, MasdifError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| tts_error("failed to build HTTP client", e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            voices_path: voices_path.to_string(),
            speech_path: speech_path.to_string(),
            retry_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        })
    }

    /// Sets the attempt budget and the backoff unit.
    pub fn with_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.retry_attempts = attempts.max(1);
        self.retry_backoff = backoff;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Fetches the provider's voice list. A 429 is reported as [`VoicesOutcome::RateLimited`].
    pub async fn voices(&self) -> Result<VoicesOutcome, MasdifError> {
        let response = self
            .client
            .get(self.url(&self.voices_path))
            .send()
            .await
            .map_err(|e| tts_error("voices request failed", e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(VoicesOutcome::RateLimited);
        }
        if !status.is_success() {
            return Err(MasdifError::Tts {
                message: format!("voices endpoint returned {status}"),
                source: None,
            });
        }

        let voices = response
            .json::<Vec<Voice>>()
            .await
            .map_err(|e| tts_error("failed to parse voices", e))?;
        Ok(VoicesOutcome::Voices(voices))
    }

    /// Requests synthesized audio, retrying on rate limiting and empty bodies.
    pub async fn speech(&self, request: &SpeechRequest) -> Result<Vec<u8>, MasdifError> {
        let url = self.url(&self.speech_path);

        for attempt in 1..=self.retry_attempts {
            let response = self
                .client
                .post(&url)
                .json(request)
                .send()
                .await
                .map_err(|e| tts_error("speech request failed", e))?;

            let status = response.status();
            debug!(status = %status, attempt, "speech response received");

            let retryable = if status == StatusCode::TOO_MANY_REQUESTS {
                true
            } else if status.is_success() {
                let audio = response
                    .bytes()
                    .await
                    .map_err(|e| tts_error("failed to read audio", e))?;
                if !audio.is_empty() {
                    return Ok(audio.to_vec());
                }
                true
            } else {
                let body = response.text().await.unwrap_or_default();
                return Err(MasdifError::Tts {
                    message: format!("speech endpoint returned {status}: {body}"),
                    source: None,
                });
            };

            if retryable && attempt < self.retry_attempts {
                let pause = self.retry_backoff * attempt;
                warn!(status = %status, attempt, pause_ms = pause.as_millis() as u64, "speech not ready, retrying");
                tokio::time::sleep(pause).await;
            }
        }

        Err(MasdifError::Tts {
            message: format!(
                "no audio received after {} attempts",
                self.retry_attempts
            ),
            source: None,
        })
    }
}

fn tts_error(message: &str, e: reqwest::Error) -> MasdifError {
    MasdifError::Tts {
        message: format!("{message}: {e}"),
        source: Some(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> TtsClient {
        TtsClient::new(base_url, "/v0/voices", "/v0/speech", Duration::from_secs(2))
            .unwrap()
            .with_retry(3, Duration::from_millis(10))
    }

    fn request() -> SpeechRequest {
        SpeechRequest {
            engine: "standard".into(),
            language_code: "en-US".into(),
            lexicon_names: vec![],
            output_format: "mp3".into(),
            sample_rate: "22050".into(),
            text: "Hello".into(),
            text_type: "text".into(),
            voice_id: "Joanna".into(),
        }
    }

    #[tokio::test]
    async fn speech_request_uses_pascal_case_and_requested_language() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v0/speech"))
            .and(body_partial_json(json!({
                "LanguageCode": "en-US",
                "VoiceId": "Joanna",
                "TextType": "text",
                "OutputFormat": "mp3"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .expect(1)
            .mount(&server)
            .await;

        let audio = test_client(&server.uri()).speech(&request()).await.unwrap();
        assert_eq!(audio, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn rate_limit_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v0/speech"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v0/speech"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![9u8]))
            .mount(&server)
            .await;

        let audio = test_client(&server.uri()).speech(&request()).await.unwrap();
        assert_eq!(audio, vec![9]);
    }

    #[tokio::test]
    async fn retry_budget_is_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v0/speech"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).speech(&request()).await.unwrap_err();
        assert!(err.to_string().contains("3 attempts"), "got: {err}");
    }

    #[tokio::test]
    async fn empty_body_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v0/speech"))
            .respond_with(ResponseTemplate::new(200))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v0/speech"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8]))
            .mount(&server)
            .await;

        let audio = test_client(&server.uri()).speech(&request()).await.unwrap();
        assert_eq!(audio, vec![7]);
    }

    #[tokio::test]
    async fn server_error_fails_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v0/speech"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad voice"))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).speech(&request()).await.unwrap_err();
        assert!(err.to_string().contains("bad voice"));
    }

    #[tokio::test]
    async fn voices_reports_rate_limiting() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v0/voices"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let outcome = test_client(&server.uri()).voices().await.unwrap();
        assert!(matches!(outcome, VoicesOutcome::RateLimited));
    }
}
