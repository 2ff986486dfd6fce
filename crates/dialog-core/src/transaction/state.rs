//! Transaction lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The states a transaction progresses through, based on the state
/// diagrams of RFC 3261 Section 17.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionState {
    /// Created or re-armed for reuse, nothing in flight (not in RFC 3261)
    Idle,
    /// Initial client state for an INVITE transaction
    Calling,
    /// Initial client and server state for a non-INVITE transaction,
    /// and initial server state for INVITE
    Trying,
    /// Server sent 100, or client received 100
    Proceeding,
    /// A final response has been sent or received; linger timers may run
    Completed,
    /// INVITE server side: ACK received, absorbing duplicates
    Confirmed,
    /// The exchange is over; no timer of this transaction fires again
    Terminated,
    /// Terminal failure (Timer B/F expiry); the engine retries no further
    Failed,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionState::Idle => "IDLE",
            TransactionState::Calling => "CALLING",
            TransactionState::Trying => "TRYING",
            TransactionState::Proceeding => "PROCEEDING",
            TransactionState::Completed => "COMPLETED",
            TransactionState::Confirmed => "CONFIRMED",
            TransactionState::Terminated => "TERMINATED",
            TransactionState::Failed => "FAILED",
        };
        write!(f, "{}", name)
    }
}

impl TransactionState {
    /// Whether the transaction has reached a state from which no timer
    /// belonging to it may fire again.
    pub fn is_final(&self) -> bool {
        matches!(self, TransactionState::Terminated | TransactionState::Failed)
    }
}
