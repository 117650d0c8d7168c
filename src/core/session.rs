//! Chat session lifecycle.
//!
//! [`ChatController`] owns the transcript and is the only writer into the
//! history store while a session is live. It enforces the two invariants
//! the rest of the client leans on:
//!
//! - **Single-flight**: at most one request is in flight per session. A
//!   submit while one is pending is rejected with no side effect. The
//!   in-flight flag flips synchronously inside [`ChatController::submit`],
//!   before control returns, so a rapid double-submit cannot slip past it.
//! - **One terminal per round trip**: every accepted submission appends
//!   exactly one user message and, later, exactly one agent or error
//!   message. Outcomes carrying a stale request id (after a clear, or after
//!   the round trip already settled) are discarded.
//!
//! Every mutation persists the updated transcript before returning. A
//! persistence failure is logged, never shown in the transcript.

use chrono::Utc;
use tracing::{debug, warn};

use crate::core::chat_request::{OutboundChat, RequestOutcome};
use crate::core::message::Message;
use crate::core::notify::{NoopNotifier, Notifier, Severity};
use crate::core::routing::MAIN_AGENT;
use crate::core::store::{self, ChatExport, HistoryStore};

/// Fixed transcript entry appended when a round trip fails.
pub const ERROR_REPLY: &str =
    "Sorry, I encountered an error processing your request. Please try again.";

/// Banner shown outside the transcript on a failed round trip.
pub const SEND_FAILED_BANNER: &str = "Failed to send message. Please try again.";

pub const DEFAULT_USER_ID: &str = "web_user";

const WELCOME: &str = "\
# Welcome to Banking Master Agent! 🏦

I'm your intelligent banking assistant. I automatically route your questions \
to the most appropriate specialist:

- 🏦 **Account Management** - Balances, profiles, deposits
- 💳 **Card Services** - Credit/debit cards, limits, rewards
- 💸 **Transactions** - History, transfers, payments
- 📈 **Loans & Investments** - EMIs, mutual funds, insurance
- 🔄 **Payees & Payments** - Recurring payments, beneficiaries
- 🛠️ **General Banking** - Credit scores, alerts, services

**Just ask me anything!** For example: \"What's my account balance?\" or \
\"When is my next EMI due?\"";

pub struct ChatController {
    session_id: String,
    user_id: String,
    messages: Vec<Message>,
    store: Box<dyn HistoryStore>,
    notifier: Box<dyn Notifier>,
    in_flight: Option<u64>,
    next_request_id: u64,
    error: Option<String>,
}

impl ChatController {
    /// Open a session, restoring whatever the store holds for this id.
    /// Unparsable persisted data comes back as an empty transcript.
    pub fn new(session_id: impl Into<String>, user_id: impl Into<String>, store: Box<dyn HistoryStore>) -> Self {
        let session_id = session_id.into();
        let messages = store.load(&session_id);
        Self {
            session_id,
            user_id: user_id.into(),
            messages,
            store,
            notifier: Box::new(NoopNotifier),
            in_flight: None,
            next_request_id: 1,
            error: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Opaque session identifier for a fresh session.
    pub fn generate_session_id() -> String {
        format!("main_session_{}", Utc::now().timestamp_millis())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_sending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Current error banner, if a failed round trip has not been dismissed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Seed the welcome entry on a brand-new session. An ordinary agent
    /// append attributed to the routing agent; does nothing once the
    /// transcript has any content.
    pub fn seed_welcome(&mut self) {
        if !self.messages.is_empty() {
            return;
        }
        self.append(Message::agent(WELCOME, MAIN_AGENT, None));
    }

    /// Accept or reject a submission.
    ///
    /// Rejected (returning `None`, with no side effect) when a request is
    /// already in flight or the trimmed input is empty. On acceptance the
    /// user message is appended and persisted and the returned request is
    /// ready for [`crate::core::chat_request::ChatRequestService`].
    pub fn submit(&mut self, input: &str) -> Option<OutboundChat> {
        if self.in_flight.is_some() {
            debug!("submit rejected: request already in flight");
            return None;
        }
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }

        self.append(Message::user(trimmed, self.last_id()));

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.in_flight = Some(request_id);

        Some(OutboundChat {
            message: trimmed.to_string(),
            user_id: self.user_id.clone(),
            session_id: self.session_id.clone(),
            request_id,
        })
    }

    /// Settle a round trip. Outcomes whose id does not match the in-flight
    /// request are dropped; this covers both duplicate deliveries and late
    /// responses against a session that was cleared mid-flight.
    pub fn apply(&mut self, outcome: RequestOutcome, request_id: u64) {
        if self.in_flight != Some(request_id) {
            debug!(request_id, "dropping outcome for a request no longer in flight");
            return;
        }
        self.in_flight = None;

        match outcome {
            RequestOutcome::Success { response, agent_name } => {
                self.append(Message::agent(response, agent_name, self.last_id()));
                self.error = None;
            }
            RequestOutcome::Failure(detail) => {
                warn!(session_id = %self.session_id, %detail, "chat request failed");
                self.append(Message::error(ERROR_REPLY, self.last_id()));
                self.error = Some(SEND_FAILED_BANNER.to_string());
                self.notifier.notify(SEND_FAILED_BANNER, Severity::Error, 5000);
            }
        }
    }

    /// Drop the transcript and its persisted entry. Any in-flight request is
    /// invalidated; its outcome will be ignored when it arrives.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.in_flight = None;
        self.error = None;
        if let Err(error) = self.store.clear(&self.session_id) {
            warn!(session_id = %self.session_id, %error, "failed to clear persisted history");
        }
    }

    /// Snapshot the session for external handoff. Stored state is untouched.
    pub fn export(&self) -> ChatExport {
        store::export(&self.session_id, &self.messages)
    }

    fn last_id(&self) -> Option<u64> {
        self.messages.last().map(|message| message.id)
    }

    fn append(&mut self, message: Message) {
        self.messages.push(message);
        if let Err(error) = self.store.save(&self.session_id, &self.messages) {
            warn!(session_id = %self.session_id, %error, "failed to persist chat history");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Role;
    use crate::core::notify::testing::RecordingNotifier;
    use crate::core::store::MemoryStore;

    fn controller(store: &MemoryStore) -> ChatController {
        ChatController::new("s1", DEFAULT_USER_ID, Box::new(store.clone()))
    }

    fn succeed(c: &mut ChatController, outbound: &OutboundChat, text: &str, agent: &str) {
        c.apply(
            RequestOutcome::Success {
                response: text.to_string(),
                agent_name: agent.to_string(),
            },
            outbound.request_id,
        );
    }

    #[test]
    fn successful_round_trip_appends_user_then_agent() {
        let store = MemoryStore::new();
        let mut c = controller(&store);

        let outbound = c.submit("What's my account balance?").unwrap();
        assert!(c.is_sending());
        assert_eq!(outbound.session_id, "s1");
        assert_eq!(outbound.user_id, "web_user");

        succeed(&mut c, &outbound, "Your balance is $100", "AccountMasterAgent");

        assert!(!c.is_sending());
        assert!(c.error().is_none());
        let messages = c.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Agent);
        assert_eq!(messages[1].agent_name.as_deref(), Some("AccountMasterAgent"));
    }

    #[test]
    fn n_round_trips_yield_2n_alternating_messages() {
        let store = MemoryStore::new();
        let mut c = controller(&store);

        for i in 0..4 {
            let outbound = c.submit(&format!("question {i}")).unwrap();
            succeed(&mut c, &outbound, &format!("answer {i}"), "CardMasterAgent");
        }

        let messages = c.messages();
        assert_eq!(messages.len(), 8);
        for (index, message) in messages.iter().enumerate() {
            let expected = if index % 2 == 0 { Role::User } else { Role::Agent };
            assert_eq!(message.role, expected);
            if index > 0 {
                assert!(message.id > messages[index - 1].id);
            }
        }
    }

    #[test]
    fn failed_round_trip_appends_one_error_and_raises_the_banner() {
        let store = MemoryStore::new();
        let notifier = RecordingNotifier::default();
        let mut c = controller(&store).with_notifier(Box::new(notifier.clone()));

        let outbound = c.submit("Show transactions").unwrap();
        c.apply(RequestOutcome::Failure("connection refused".to_string()), outbound.request_id);

        assert!(!c.is_sending());
        assert_eq!(c.error(), Some(SEND_FAILED_BANNER));
        let messages = c.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::Error);
        assert_eq!(messages[1].content, ERROR_REPLY);

        let notices = notifier.notices.borrow();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].1, Severity::Error);
    }

    #[test]
    fn mixed_outcomes_still_give_one_terminal_per_round_trip() {
        let store = MemoryStore::new();
        let mut c = controller(&store);

        let a = c.submit("one").unwrap();
        succeed(&mut c, &a, "ok", "AccountMasterAgent");
        let b = c.submit("two").unwrap();
        c.apply(RequestOutcome::Failure("boom".to_string()), b.request_id);
        let d = c.submit("three").unwrap();
        succeed(&mut c, &d, "ok again", "TransactionMasterAgent");

        let messages = c.messages();
        assert_eq!(messages.len(), 6);
        for pair in messages.chunks(2) {
            assert!(pair[0].role.is_user());
            assert!(pair[1].role.is_terminal());
        }
    }

    #[test]
    fn second_submit_while_in_flight_is_rejected() {
        let store = MemoryStore::new();
        let mut c = controller(&store);

        let first = c.submit("first").unwrap();
        assert!(c.submit("second").is_none());
        assert_eq!(c.messages().len(), 1);

        succeed(&mut c, &first, "done", "AccountMasterAgent");
        assert_eq!(c.messages().len(), 2);

        // Idle again, so the next submit is accepted.
        assert!(c.submit("third").is_some());
    }

    #[test]
    fn empty_and_whitespace_submissions_are_rejected_silently() {
        let store = MemoryStore::new();
        let mut c = controller(&store);
        assert!(c.submit("").is_none());
        assert!(c.submit("   \n\t").is_none());
        assert!(c.messages().is_empty());
        assert!(!c.is_sending());
        assert!(c.error().is_none());
    }

    #[test]
    fn submitted_content_is_trimmed() {
        let store = MemoryStore::new();
        let mut c = controller(&store);
        let outbound = c.submit("  hello  ").unwrap();
        assert_eq!(outbound.message, "hello");
        assert_eq!(c.messages()[0].content, "hello");
    }

    #[test]
    fn outcome_after_clear_is_ignored() {
        let store = MemoryStore::new();
        let mut c = controller(&store);

        let outbound = c.submit("pending question").unwrap();
        c.clear();
        assert!(c.messages().is_empty());
        assert!(!c.is_sending());

        succeed(&mut c, &outbound, "late answer", "AccountMasterAgent");
        assert!(c.messages().is_empty());
        assert!(c.error().is_none());
    }

    #[test]
    fn duplicate_outcome_delivery_is_ignored() {
        let store = MemoryStore::new();
        let mut c = controller(&store);

        let outbound = c.submit("question").unwrap();
        succeed(&mut c, &outbound, "answer", "AccountMasterAgent");
        succeed(&mut c, &outbound, "answer again", "AccountMasterAgent");
        assert_eq!(c.messages().len(), 2);
    }

    #[test]
    fn persisted_state_tracks_every_mutation() {
        let store = MemoryStore::new();
        let mut c = controller(&store);

        let outbound = c.submit("question").unwrap();
        assert_eq!(store.load("s1"), c.messages());

        succeed(&mut c, &outbound, "answer", "AccountMasterAgent");
        assert_eq!(store.load("s1"), c.messages());

        c.clear();
        assert!(store.load("s1").is_empty());
        assert!(!store.contains("s1"));
    }

    #[test]
    fn a_new_controller_restores_the_persisted_transcript() {
        let store = MemoryStore::new();
        let mut c = controller(&store);
        let outbound = c.submit("question").unwrap();
        succeed(&mut c, &outbound, "answer", "CardMasterAgent");
        let expected = c.messages().to_vec();
        drop(c);

        let restored = controller(&store);
        assert_eq!(restored.messages(), expected.as_slice());
    }

    #[test]
    fn corrupted_history_opens_as_an_empty_session() {
        let store = MemoryStore::new();
        store.insert_raw("s1", "definitely not json");
        let c = controller(&store);
        assert!(c.messages().is_empty());
    }

    #[test]
    fn welcome_is_seeded_once_and_only_on_empty_sessions() {
        let store = MemoryStore::new();
        let mut c = controller(&store);
        c.seed_welcome();
        c.seed_welcome();
        assert_eq!(c.messages().len(), 1);
        assert_eq!(c.messages()[0].agent_name.as_deref(), Some(MAIN_AGENT));
        drop(c);

        // Reopening the session finds history, so no second welcome.
        let mut restored = controller(&store);
        restored.seed_welcome();
        assert_eq!(restored.messages().len(), 1);
    }

    #[test]
    fn error_banner_clears_on_dismissal_or_next_success() {
        let store = MemoryStore::new();
        let mut c = controller(&store);

        let failed = c.submit("one").unwrap();
        c.apply(RequestOutcome::Failure("down".to_string()), failed.request_id);
        assert!(c.error().is_some());

        // The banner never blocks new submissions.
        let retried = c.submit("one again").unwrap();
        assert!(c.error().is_some());
        succeed(&mut c, &retried, "recovered", "AccountMasterAgent");
        assert!(c.error().is_none());

        let failed = c.submit("two").unwrap();
        c.apply(RequestOutcome::Failure("down".to_string()), failed.request_id);
        c.dismiss_error();
        assert!(c.error().is_none());
    }

    #[test]
    fn generated_session_ids_use_the_shared_prefix() {
        let id = ChatController::generate_session_id();
        assert!(id.starts_with("main_session_"));
    }

    #[test]
    fn export_reflects_the_live_transcript() {
        let store = MemoryStore::new();
        let mut c = controller(&store);
        let outbound = c.submit("balance?").unwrap();
        succeed(&mut c, &outbound, "$100", "AccountMasterAgent");

        let artifact = c.export();
        assert_eq!(artifact.session_id, "s1");
        assert_eq!(artifact.messages.len(), 2);
        assert_eq!(artifact.messages[1].routed_to.as_deref(), Some("Account Specialist"));
        // Exporting mutates nothing.
        assert_eq!(store.load("s1"), c.messages());
    }
}
