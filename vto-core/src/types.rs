//! Shared domain types.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Per-sender upload state: the person image arrives first, then the garment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub person_image_ref: Option<String>,
    pub garment_image_ref: Option<String>,
}

impl Session {
    /// True when no image has been received yet.
    pub fn is_empty(&self) -> bool {
        self.person_image_ref.is_none() && self.garment_image_ref.is_none()
    }

    /// True when the person image is held and the garment is still missing.
    pub fn awaiting_garment(&self) -> bool {
        self.person_image_ref.is_some() && self.garment_image_ref.is_none()
    }

    pub fn clear(&mut self) {
        self.person_image_ref = None;
        self.garment_image_ref = None;
    }
}

/// Raw webhook form as posted by the messaging provider.
///
/// Every field is optional here; validation happens in the conversion to
/// [`InboundEvent`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundForm {
    #[serde(rename = "Body")]
    pub body: Option<String>,
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "NumMedia")]
    pub num_media: Option<String>,
    #[serde(rename = "MediaUrl0")]
    pub media_url0: Option<String>,
}

/// A single inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub sender: String,
    pub body: String,
    pub attachment_count: u32,
    pub first_attachment_url: Option<String>,
}

impl InboundEvent {
    /// The attachment URL if the message carries media.
    pub fn attachment(&self) -> Option<&str> {
        if self.attachment_count > 0 {
            self.first_attachment_url.as_deref()
        } else {
            None
        }
    }

    /// Whether the text body is the onboarding keyword.
    pub fn is_start_command(&self) -> bool {
        self.body.eq_ignore_ascii_case("start")
    }
}

impl TryFrom<InboundForm> for InboundEvent {
    type Error = Error;

    fn try_from(form: InboundForm) -> Result<Self> {
        let sender = form
            .from
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::invalid_event("missing sender (From)"))?;

        let attachment_count = match form.num_media.as_deref().map(str::trim) {
            None | Some("") => 0,
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| Error::invalid_event(format!("invalid NumMedia: {raw:?}")))?,
        };

        let first_attachment_url = form
            .media_url0
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if attachment_count > 0 && first_attachment_url.is_none() {
            return Err(Error::invalid_event(
                "NumMedia > 0 but MediaUrl0 is missing",
            ));
        }

        Ok(Self {
            sender,
            body: form.body.unwrap_or_default(),
            attachment_count,
            first_attachment_url,
        })
    }
}

/// The image pair sent to the synthesis service, in submission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    #[serde(rename = "person_image")]
    pub person_image_ref: String,
    #[serde(rename = "garment_image")]
    pub garment_image_ref: String,
}

impl SynthesisRequest {
    pub fn new(person: impl Into<String>, garment: impl Into<String>) -> Self {
        Self {
            person_image_ref: person.into(),
            garment_image_ref: garment.into(),
        }
    }
}

/// Opaque payload returned by the synthesis service.
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

impl SynthesisOutput {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(
        from: Option<&str>,
        body: Option<&str>,
        num: Option<&str>,
        url: Option<&str>,
    ) -> InboundForm {
        InboundForm {
            body: body.map(String::from),
            from: from.map(String::from),
            num_media: num.map(String::from),
            media_url0: url.map(String::from),
        }
    }

    #[test]
    fn test_inbound_text_message() {
        let event =
            InboundEvent::try_from(form(Some("whatsapp:+1555"), Some("START"), Some("0"), None))
                .unwrap();
        assert_eq!(event.sender, "whatsapp:+1555");
        assert_eq!(event.attachment_count, 0);
        assert!(event.attachment().is_none());
        assert!(event.is_start_command());
    }

    #[test]
    fn test_inbound_media_message() {
        let event = InboundEvent::try_from(form(
            Some("whatsapp:+1555"),
            None,
            Some("1"),
            Some("https://media.example/x.jpg"),
        ))
        .unwrap();
        assert_eq!(event.body, "");
        assert_eq!(event.attachment(), Some("https://media.example/x.jpg"));
        assert!(!event.is_start_command());
    }

    #[test]
    fn test_inbound_num_media_defaults_to_zero() {
        let event = InboundEvent::try_from(form(Some("a"), Some("hi"), None, None)).unwrap();
        assert_eq!(event.attachment_count, 0);
    }

    #[test]
    fn test_inbound_rejects_missing_sender() {
        let err = InboundEvent::try_from(form(None, Some("start"), Some("0"), None)).unwrap_err();
        assert!(matches!(err, Error::InvalidEvent(_)));

        let err = InboundEvent::try_from(form(Some("  "), Some("start"), None, None)).unwrap_err();
        assert!(matches!(err, Error::InvalidEvent(_)));
    }

    #[test]
    fn test_inbound_rejects_bad_num_media() {
        let err = InboundEvent::try_from(form(Some("a"), None, Some("two"), None)).unwrap_err();
        assert!(err.to_string().contains("NumMedia"));
    }

    #[test]
    fn test_inbound_rejects_media_without_url() {
        let err = InboundEvent::try_from(form(Some("a"), None, Some("1"), None)).unwrap_err();
        assert!(matches!(err, Error::InvalidEvent(_)));
    }

    #[test]
    fn test_start_command_is_exact_word() {
        let mut event = InboundEvent {
            sender: "a".into(),
            body: "StArT".into(),
            attachment_count: 0,
            first_attachment_url: None,
        };
        assert!(event.is_start_command());

        for body in [" start", "start\n", " StArT ", "start now"] {
            event.body = body.into();
            assert!(!event.is_start_command(), "{:?}", body);
        }
    }

    #[test]
    fn test_synthesis_request_wire_format() {
        let req = SynthesisRequest::new("https://x/person.jpg", "https://x/garment.jpg");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["person_image"], "https://x/person.jpg");
        assert_eq!(json["garment_image"], "https://x/garment.jpg");
    }

    #[test]
    fn test_session_states() {
        let mut session = Session::default();
        assert!(session.is_empty());
        assert!(!session.awaiting_garment());

        session.person_image_ref = Some("x".into());
        assert!(session.awaiting_garment());

        session.clear();
        assert!(session.is_empty());
    }
}
