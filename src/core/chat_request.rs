//! Async dispatch seam between the event loop and the transport.
//!
//! The event loop owns all chat state and must never block on the network,
//! so each accepted submission is handed to a spawned task here. Results
//! come back over an unbounded channel tagged with the request id the
//! controller issued; the controller discards anything with a stale id,
//! which is how late responses against a cleared session are handled.

use tokio::sync::mpsc;

use crate::api::client::BankingClient;
use crate::api::ChatRequest;

/// Terminal result of one round trip.
#[derive(Clone, Debug)]
pub enum RequestOutcome {
    Success { response: String, agent_name: String },
    Failure(String),
}

/// An accepted submission, ready to dispatch. Produced by
/// [`crate::core::session::ChatController::submit`].
#[derive(Clone, Debug)]
pub struct OutboundChat {
    pub message: String,
    pub user_id: String,
    pub session_id: String,
    pub request_id: u64,
}

#[derive(Clone)]
pub struct ChatRequestService {
    tx: mpsc::UnboundedSender<(RequestOutcome, u64)>,
}

impl ChatRequestService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(RequestOutcome, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Fire the transport call on the runtime. Exactly one outcome is sent
    /// back per spawn; a closed receiver (app shutdown) is ignored.
    pub fn spawn_request(&self, client: BankingClient, endpoint: String, outbound: OutboundChat) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let request = ChatRequest {
                message: outbound.message,
                user_id: outbound.user_id,
                session_id: outbound.session_id,
            };

            let outcome = match client.send_chat(&endpoint, &request).await {
                Ok(response) => RequestOutcome::Success {
                    response: response.response,
                    agent_name: response.agent_name,
                },
                Err(error) => RequestOutcome::Failure(error.to_string()),
            };

            let _ = tx.send((outcome, outbound.request_id));
        });
    }
}
