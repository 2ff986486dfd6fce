//! Event vocabulary, callback types and observability hooks.
//!
//! The engine reports to its owner through two per-call-ID callbacks:
//! a **message callback** delivering interesting inbound payloads tagged
//! with the resulting transaction state, and an **event callback**
//! signalling discrete named occurrences ([`SipEvent`]) tagged with the
//! transaction state at the time. Network conditions (loss, timeout)
//! surface exclusively through these, never as errors.
//!
//! [`EngineHooks`] is the tracing surface: subscriber lists fired
//! synchronously at every state transition, send and receive, used by
//! trace writers and tests.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::RwLock;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use sipsim_sip_core::SipHeader;

use crate::dialog::DialogState;
use crate::transaction::TransactionState;

/// Transport send capability supplied by the owner:
/// `(packet, destination, header)`.
pub type SendCallback = Arc<dyn Fn(Bytes, SocketAddr, &SipHeader) + Send + Sync>;

/// Per-call-ID inbound payload delivery:
/// `(payload without header, header, resulting transaction state)`.
pub type MessageCallback = Arc<dyn Fn(Bytes, &SipHeader, TransactionState) + Send + Sync>;

/// Per-call-ID event notification:
/// `(event, transaction state at the time)`.
pub type EventCallback = Arc<dyn Fn(SipEvent, TransactionState) + Send + Sync>;

/// Discrete occurrences reported via the event callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SipEvent {
    /// An ACK request arrived
    AckReceived,
    /// A 100 Trying response arrived
    TryingReceived,
    /// A request timed out end-to-end
    RequestTimeout,
    /// Timer A fired (INVITE retransmitted)
    TimerAExpired,
    /// Timer B fired (INVITE gave up)
    TimerBExpired,
    /// Timer C fired (relay bound on a forwarded INVITE; reserved)
    TimerCExpired,
    /// Timer E fired (non-INVITE retransmitted)
    TimerEExpired,
    /// Timer F fired (non-INVITE gave up)
    TimerFExpired,
    /// Timer I fired (ACK absorption window closed)
    TimerIExpired,
    /// Timer J fired (server linger window closed)
    TimerJExpired,
    /// Timer K fired (client linger window closed)
    TimerKExpired,
}

impl fmt::Display for SipEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SipEvent::AckReceived => "ACK received",
            SipEvent::TryingReceived => "Trying received",
            SipEvent::RequestTimeout => "Request timeout",
            SipEvent::TimerAExpired => "Timer A expired",
            SipEvent::TimerBExpired => "Timer B expired",
            SipEvent::TimerCExpired => "Timer C expired",
            SipEvent::TimerEExpired => "Timer E expired",
            SipEvent::TimerFExpired => "Timer F expired",
            SipEvent::TimerIExpired => "Timer I expired",
            SipEvent::TimerJExpired => "Timer J expired",
            SipEvent::TimerKExpired => "Timer K expired",
        };
        write!(f, "{}", name)
    }
}

/// Dialog state change subscriber:
/// `(call ID, low URI, high URI, new state)`.
pub type DialogStateHook = Arc<dyn Fn(u16, u32, u32, DialogState) + Send + Sync>;

/// Transaction state change subscriber:
/// `(call ID, from, to, new state)`.
pub type TransactionStateHook = Arc<dyn Fn(u16, u32, u32, TransactionState) + Send + Sync>;

/// Send/receive subscriber, invoked with the message header.
pub type MessageHook = Arc<dyn Fn(&SipHeader) + Send + Sync>;

/// Synchronous trace subscriber lists for one engine instance.
///
/// Hooks fire inline at every state transition, send and receive, and
/// must not call back into the engine.
#[derive(Default)]
pub struct EngineHooks {
    dialog_state: RwLock<Vec<DialogStateHook>>,
    transaction_state: RwLock<Vec<TransactionStateHook>>,
    message_sent: RwLock<Vec<MessageHook>>,
    message_received: RwLock<Vec<MessageHook>>,
}

impl EngineHooks {
    /// Subscribe to dialog state changes.
    pub fn on_dialog_state_changed(&self, hook: DialogStateHook) {
        self.dialog_state.write().push(hook);
    }

    /// Subscribe to transaction state changes.
    pub fn on_transaction_state_changed(&self, hook: TransactionStateHook) {
        self.transaction_state.write().push(hook);
    }

    /// Subscribe to outbound messages.
    pub fn on_message_sent(&self, hook: MessageHook) {
        self.message_sent.write().push(hook);
    }

    /// Subscribe to inbound messages.
    pub fn on_message_received(&self, hook: MessageHook) {
        self.message_received.write().push(hook);
    }

    pub(crate) fn notify_dialog_state(
        &self,
        call_id: u16,
        low_uri: u32,
        high_uri: u32,
        state: DialogState,
    ) {
        for hook in self.dialog_state.read().iter() {
            hook(call_id, low_uri, high_uri, state);
        }
    }

    pub(crate) fn notify_transaction_state(
        &self,
        call_id: u16,
        from: u32,
        to: u32,
        state: TransactionState,
    ) {
        for hook in self.transaction_state.read().iter() {
            hook(call_id, from, to, state);
        }
    }

    pub(crate) fn notify_message_sent(&self, header: &SipHeader) {
        for hook in self.message_sent.read().iter() {
            hook(header);
        }
    }

    pub(crate) fn notify_message_received(&self, header: &SipHeader) {
        for hook in self.message_received.read().iter() {
            hook(header);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_display_is_human_readable() {
        assert_eq!(SipEvent::AckReceived.to_string(), "ACK received");
        assert_eq!(SipEvent::TryingReceived.to_string(), "Trying received");
        assert_eq!(SipEvent::TimerAExpired.to_string(), "Timer A expired");
        assert_eq!(SipEvent::TimerKExpired.to_string(), "Timer K expired");
    }
}
