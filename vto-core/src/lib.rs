//! vto-core - Core library for the virtual try-on relay
//!
//! This crate holds everything the webhook server needs that is not HTTP
//! server plumbing:
//!
//! - **session**: per-sender two-step upload tracking
//! - **synthesis**: client for the external image-synthesis service
//! - **notify**: outbound chat messages to the user
//! - **results**: short-lived cache of synthesis payloads

pub mod error;
pub mod notify;
pub mod results;
pub mod session;
pub mod synthesis;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use notify::{Notifier, TwilioConfig, TwilioNotifier};
pub use results::{ResultConfig, ResultStore, StoredResult};
pub use session::{AttachmentOutcome, InMemorySessionStore, SessionConfig, SessionStore};
pub use synthesis::{HttpSynthesizer, SynthesisConfig, Synthesizer};
pub use types::{InboundEvent, Session, SynthesisOutput, SynthesisRequest};
