//! The transaction entity owned by the protocol engine.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use tokio::task::JoinHandle;

use sipsim_sip_core::SipHeader;

use crate::events::SendCallback;
use crate::transaction::{TimerKind, TransactionState};

/// Per-request-exchange state: the retransmission cache and the timer
/// set for one (call ID, from, to) exchange.
pub struct Transaction {
    /// Call identifier this transaction belongs to
    pub call_id: u16,
    /// Transport callback used for retransmissions
    pub send_callback: SendCallback,
    /// Current lifecycle state
    pub state: TransactionState,
    /// Serialized request kept for retransmission; absent once a
    /// provisional or final response has made retransmission moot
    pub cached_packet: Option<Bytes>,
    /// Destination of the cached request
    pub cached_address: Option<SocketAddr>,
    /// Header of the cached request
    pub cached_header: Option<SipHeader>,
    timers: HashMap<TimerKind, JoinHandle<()>>,
}

impl Transaction {
    /// Create a transaction in the `Idle` state with no cache and no
    /// armed timers.
    pub fn new(call_id: u16, send_callback: SendCallback) -> Self {
        Transaction {
            call_id,
            send_callback,
            state: TransactionState::Idle,
            cached_packet: None,
            cached_address: None,
            cached_header: None,
            timers: HashMap::new(),
        }
    }

    /// Store a copy of an outbound request for later retransmission.
    pub fn cache_packet(&mut self, packet: Bytes, address: SocketAddr, header: SipHeader) {
        self.cached_packet = Some(packet);
        self.cached_address = Some(address);
        self.cached_header = Some(header);
    }

    /// Release the retransmission cache.
    pub fn free_packet(&mut self) {
        self.cached_packet = None;
        self.cached_address = None;
        self.cached_header = None;
    }

    /// Record `handle` as the live instance of `kind`, aborting any
    /// prior instance. At most one live instance of each kind exists.
    pub fn arm_timer(&mut self, kind: TimerKind, handle: JoinHandle<()>) {
        if let Some(previous) = self.timers.insert(kind, handle) {
            previous.abort();
        }
    }

    /// Cancel the live instance of `kind`, if any. Cancelling an
    /// already-fired or never-armed timer is a no-op.
    pub fn cancel_timer(&mut self, kind: TimerKind) {
        if let Some(handle) = self.timers.remove(&kind) {
            handle.abort();
        }
    }

    /// Cancel every armed timer of this transaction.
    pub fn cancel_all_timers(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        self.cancel_all_timers();
    }
}
