//! Inbound messaging webhook.

use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    Form,
};
use std::sync::Arc;
use tracing::{debug, error};
use vto_core::types::InboundForm;
use vto_core::{Error, InboundEvent};

use crate::state::AppState;

/// POST /webhook - one inbound chat message
///
/// The messaging provider only needs to know whether the message was
/// accepted, so the body is always `OK` or `Error`. The actual reply to the
/// user goes out through the notifier.
pub async fn receive_message(
    State(state): State<Arc<AppState>>,
    form: Result<Form<InboundForm>, FormRejection>,
) -> (StatusCode, &'static str) {
    let event = form
        .map_err(|rejection| Error::invalid_event(rejection.body_text()))
        .and_then(|Form(raw)| InboundEvent::try_from(raw));

    match event {
        Ok(event) => {
            debug!(
                sender = %event.sender,
                attachments = event.attachment_count,
                "Inbound message"
            );
            state.relay.handle(&event).await;
            (StatusCode::OK, "OK")
        }
        Err(e) => {
            error!(error = %e, "Error in webhook");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error")
        }
    }
}
