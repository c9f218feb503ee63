//! Test doubles for the external services.

use async_trait::async_trait;
use std::sync::Mutex;
use vto_core::{Error, Notifier, Result, SynthesisOutput, SynthesisRequest, Synthesizer};

/// Synthesizer that returns a fixed outcome and records every request
pub struct FakeSynthesizer {
    payload: Option<&'static [u8]>,
    requests: Mutex<Vec<SynthesisRequest>>,
}

impl FakeSynthesizer {
    pub fn succeeding(payload: &'static [u8]) -> Self {
        Self {
            payload: Some(payload),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            payload: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<SynthesisRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Synthesizer for FakeSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisOutput> {
        self.requests.lock().unwrap().push(request.clone());
        match self.payload {
            Some(payload) => Ok(SynthesisOutput {
                bytes: payload.to_vec().into(),
                content_type: Some("image/png".to_string()),
            }),
            None => Err(Error::synthesis_failed("status 503: unavailable")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: String,
    pub text: String,
    pub media_url: Option<String>,
}

/// Notifier that records messages instead of sending them
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMessage>>,
    fail: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts_for(&self, recipient: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|m| m.recipient == recipient)
            .map(|m| m.text)
            .collect()
    }

    /// Make every following send return an error
    pub fn fail_sends(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    fn record(&self, recipient: &str, text: &str, media_url: Option<&str>) -> Result<()> {
        if *self.fail.lock().unwrap() {
            return Err(Error::notify_failed(recipient, "simulated outage"));
        }
        self.sent.lock().unwrap().push(SentMessage {
            recipient: recipient.to_string(),
            text: text.to_string(),
            media_url: media_url.map(String::from),
        });
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, recipient: &str, text: &str) -> Result<()> {
        self.record(recipient, text, None)
    }

    async fn notify_with_media(&self, recipient: &str, text: &str, media_url: &str) -> Result<()> {
        self.record(recipient, text, Some(media_url))
    }
}
