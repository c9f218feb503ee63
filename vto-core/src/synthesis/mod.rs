//! Client for the external image-synthesis service.
//!
//! One POST per image pair, bearer-authenticated, JSON body. Any transport
//! error or non-success status is a failure; there is no retry.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::{SynthesisOutput, SynthesisRequest};

/// Default try-on endpoint
pub const DEFAULT_SYNTHESIS_URL: &str =
    "https://huggingface.co/spaces/Kwai-Kolors/Kolors-Virtual-Try-On";

/// Longest upstream error body kept in log and error messages
const MAX_ERROR_BODY: usize = 200;

/// Composes a person image and a garment image into a try-on result.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisOutput>;
}

/// Synthesis client configuration
#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    /// Endpoint receiving the JSON request
    pub url: String,
    /// Bearer credential
    pub token: String,
    /// Per-request timeout (default: 120 seconds)
    pub timeout: Duration,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SYNTHESIS_URL.to_string(),
            token: String::new(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// HTTP implementation of [`Synthesizer`]
#[derive(Clone)]
pub struct HttpSynthesizer {
    config: SynthesisConfig,
    client: reqwest::Client,
}

impl HttpSynthesizer {
    pub fn new(config: SynthesisConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisOutput> {
        debug!(
            url = %self.config.url,
            person = %request.person_image_ref,
            garment = %request.garment_image_ref,
            "Synthesis request"
        );

        let resp = self
            .client
            .post(&self.config.url)
            .bearer_auth(&self.config.token)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::synthesis_failed(format!("request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let mut body = resp.text().await.unwrap_or_default();
            body.truncate(
                body.char_indices()
                    .nth(MAX_ERROR_BODY)
                    .map_or(body.len(), |(i, _)| i),
            );
            warn!(status = %status, body = %body, "Synthesis service returned an error");
            return Err(Error::synthesis_failed(format!("status {}: {}", status, body)));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::synthesis_failed(format!("failed to read body: {}", e)))?;

        debug!(len = bytes.len(), "Synthesis response received");

        Ok(SynthesisOutput {
            bytes,
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn synthesizer(url: String) -> HttpSynthesizer {
        HttpSynthesizer::new(SynthesisConfig {
            url,
            token: "hf_test".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_synthesize_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/tryon")
            .match_header("authorization", "Bearer hf_test")
            .match_body(Matcher::Json(serde_json::json!({
                "person_image": "https://m/person.jpg",
                "garment_image": "https://m/garment.jpg"
            })))
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(b"\x89PNG-data")
            .create_async()
            .await;

        let output = synthesizer(format!("{}/tryon", server.url()))
            .synthesize(&SynthesisRequest::new(
                "https://m/person.jpg",
                "https://m/garment.jpg",
            ))
            .await
            .unwrap();

        assert_eq!(&output.bytes[..], b"\x89PNG-data");
        assert_eq!(output.content_type.as_deref(), Some("image/png"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_synthesize_non_success_is_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/tryon")
            .with_status(503)
            .with_body("model is loading")
            .create_async()
            .await;

        let err = synthesizer(format!("{}/tryon", server.url()))
            .synthesize(&SynthesisRequest::new("a", "b"))
            .await
            .unwrap_err();

        assert!(err.is_synthesis());
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_synthesize_empty_body_is_empty_output() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/tryon")
            .with_status(200)
            .create_async()
            .await;

        let output = synthesizer(format!("{}/tryon", server.url()))
            .synthesize(&SynthesisRequest::new("a", "b"))
            .await
            .unwrap();

        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_synthesize_unreachable_is_failure() {
        // Port 9 (discard) is not expected to be listening
        let err = synthesizer("http://127.0.0.1:9/tryon".to_string())
            .synthesize(&SynthesisRequest::new("a", "b"))
            .await
            .unwrap_err();

        assert!(err.is_synthesis());
    }
}
