//! Cross-cutting notification channel.
//!
//! The controller publishes transient notices (send failures, export
//! confirmations) to whatever the embedding application injected here. The
//! default is a no-op, so the core functions unchanged when no notification
//! surface exists.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

pub trait Notifier {
    fn notify(&self, message: &str, severity: Severity, duration_ms: u64);
}

/// Default notifier: silently drops every notice.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _message: &str, _severity: Severity, _duration_ms: u64) {}
}
