//! The forwarding role: an element that relays signalling between legs.

use std::ops::Deref;

use crate::engine::{EngineRole, ProtocolEngine};
use crate::errors::DialogResult;
use crate::transaction::{TimerSettings, TransactionId};

/// A forwarding element.
///
/// A relay maintains its own dialogs and transactions toward each leg of
/// a multi-party exchange, so its engine runs with [`EngineRole::Relay`]:
/// when forwarding a 200 OK, the source dialog may legitimately already
/// be `Confirmed` (a second leg's OK arriving after the first), and
/// `send_response` accepts that without re-entering `Confirmed`.
#[derive(Clone)]
pub struct Relay {
    engine: ProtocolEngine,
}

impl Relay {
    /// Create a relay with the given timing configuration.
    pub fn new(settings: TimerSettings) -> Self {
        Relay {
            engine: ProtocolEngine::new(EngineRole::Relay, settings),
        }
    }

    /// The underlying engine.
    pub fn engine(&self) -> &ProtocolEngine {
        &self.engine
    }

    /// Arm Timer C on a forwarded INVITE transaction, bounding how long
    /// the relay waits for a downstream final response.
    ///
    /// Expiry is reported through the event callback only; teardown of
    /// the abandoned leg stays with the call-control layer.
    pub fn bound_forwarded_invite(&self, transaction_id: TransactionId) -> DialogResult<()> {
        self.engine.schedule_timer_c(transaction_id)
    }
}

impl Deref for Relay {
    type Target = ProtocolEngine;

    fn deref(&self) -> &ProtocolEngine {
        &self.engine
    }
}
