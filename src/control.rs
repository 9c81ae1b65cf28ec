//! Control channel.
//!
//! The dashboard's postMessage vocabulary, re-expressed as typed enums
//! over an in-process channel. Requests travel over `mpsc` with a
//! `oneshot` reply slot; the serve loop drives the dispatcher. Replies
//! carry a bounded timeout, a missing or slow consumer is never fatal to
//! the sender.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::dispatch::Dispatcher;
use crate::models::Manifest;

/// Bound on waiting for a reply.
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Commands a control surface can send the loader.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControlRequest {
    GetStatus,
    RunModule { module_id: String },
    ToggleUtility { module_id: String, enabled: bool },
    /// Dismiss the control surface; the serve loop exits.
    Close,
}

/// Replies back to the control surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControlResponse {
    StatusResponse {
        active_modules: Vec<String>,
        enabled_utilities: Vec<String>,
    },
    Ack,
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Control channel closed")]
    Closed,
    #[error("Timed out waiting for control reply")]
    Timeout,
}

/// One request in flight, with its reply slot.
pub struct ControlMessage {
    pub request: ControlRequest,
    pub reply: oneshot::Sender<ControlResponse>,
}

/// Cheap cloneable sender side of the control channel.
#[derive(Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<ControlMessage>,
}

impl ControlHandle {
    /// Send a request and wait (bounded) for the reply.
    pub async fn send(&self, request: ControlRequest) -> Result<ControlResponse, ControlError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ControlMessage {
                request,
                reply: reply_tx,
            })
            .await
            .map_err(|_| ControlError::Closed)?;

        match tokio::time::timeout(REPLY_TIMEOUT, reply_rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(ControlError::Closed),
            Err(_) => Err(ControlError::Timeout),
        }
    }
}

/// Create a control channel pair.
pub fn channel(capacity: usize) -> (ControlHandle, mpsc::Receiver<ControlMessage>) {
    let (tx, rx) = mpsc::channel(capacity);
    (ControlHandle { tx }, rx)
}

/// Drive the dispatcher from control requests until `Close` arrives or
/// every handle is dropped.
pub async fn serve(
    dispatcher: Arc<Dispatcher>,
    manifest: Manifest,
    page_url: String,
    mut rx: mpsc::Receiver<ControlMessage>,
) {
    while let Some(msg) = rx.recv().await {
        let response = match msg.request {
            ControlRequest::GetStatus => ControlResponse::StatusResponse {
                active_modules: dispatcher.active_ids(),
                enabled_utilities: dispatcher.enabled_utilities(),
            },
            ControlRequest::RunModule { ref module_id } => {
                dispatcher.run_module(&manifest, module_id, &page_url).await;
                ControlResponse::Ack
            }
            ControlRequest::ToggleUtility {
                ref module_id,
                enabled,
            } => {
                dispatcher
                    .toggle_utility(&manifest, module_id, enabled, &page_url)
                    .await;
                ControlResponse::Ack
            }
            ControlRequest::Close => {
                let _ = msg.reply.send(ControlResponse::Ack);
                break;
            }
        };
        // A dropped reply slot just means the surface went away.
        let _ = msg.reply.send(response);
    }
    tracing::debug!("Control channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_shapes() {
        let req = ControlRequest::GetStatus;
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"action":"get_status"}"#
        );

        let req: ControlRequest =
            serde_json::from_str(r#"{"action":"toggle_utility","module_id":"m1","enabled":false}"#)
                .unwrap();
        assert_eq!(
            req,
            ControlRequest::ToggleUtility {
                module_id: "m1".to_string(),
                enabled: false,
            }
        );
    }

    #[test]
    fn status_response_wire_shape() {
        let resp = ControlResponse::StatusResponse {
            active_modules: vec!["m1".to_string()],
            enabled_utilities: vec![],
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""action":"status_response""#));
        assert!(json.contains("active_modules"));
    }
}
