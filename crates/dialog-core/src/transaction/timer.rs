//! Timer vocabulary and duration configuration.
//!
//! RFC 3261 Section 17 attaches a set of one-shot timers to every
//! transaction. This engine uses:
//!
//! - **A** / **B**: INVITE client retransmission and give-up
//! - **C**: relay-side bound on a forwarded INVITE (reserved hook)
//! - **E** / **F**: non-INVITE client retransmission and give-up
//! - **I**: INVITE server ACK absorption window
//! - **J** / **K**: non-INVITE server/client linger before reclaim
//!
//! Durations derive from the base estimates T1/T2/T4 of RFC 3261
//! Section 17.1.1.1, held in [`TimerSettings`].

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The timers a transaction may have armed, at most one live instance
/// of each kind per transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    /// INVITE client request retransmission
    A,
    /// INVITE client transaction timeout
    B,
    /// Relay bound on a forwarded INVITE transaction (reserved)
    C,
    /// Non-INVITE client request retransmission
    E,
    /// Non-INVITE client transaction timeout
    F,
    /// INVITE server wait in Confirmed, absorbing duplicate ACKs
    I,
    /// Non-INVITE server linger in Completed
    J,
    /// Non-INVITE client linger in Completed
    K,
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimerKind::A => "A",
            TimerKind::B => "B",
            TimerKind::C => "C",
            TimerKind::E => "E",
            TimerKind::F => "F",
            TimerKind::I => "I",
            TimerKind::J => "J",
            TimerKind::K => "K",
        };
        write!(f, "{}", name)
    }
}

/// Base timing configuration for one engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    /// Round-trip time estimate (RFC 3261 default 500 ms)
    pub t1: Duration,
    /// Maximum retransmit interval for non-INVITE requests and INVITE
    /// responses (RFC 3261 default 4 s). Reserved: the current retry
    /// math does not cap at T2.
    pub t2: Duration,
    /// Maximum duration a message will remain in the network
    /// (RFC 3261 default 5 s)
    pub t4: Duration,
    /// Whether the underlying transport guarantees delivery. When true
    /// the linger timers I, J and K fire immediately.
    pub reliable_transport: bool,
}

impl Default for TimerSettings {
    fn default() -> Self {
        TimerSettings {
            t1: Duration::from_millis(500),
            t2: Duration::from_secs(4),
            t4: Duration::from_secs(5),
            reliable_transport: false,
        }
    }
}

impl TimerSettings {
    /// Retransmission delay for the given backoff multiplier
    /// (timers A and E): `backoff * T1`.
    pub fn retransmit_interval(&self, backoff: u32) -> Duration {
        self.t1 * backoff
    }

    /// Absolute give-up delay for timers B and F: `64 * T1`.
    pub fn timeout_interval(&self) -> Duration {
        self.t1 * 64
    }

    /// Delay for timers I and K: T4, or zero on a reliable transport.
    pub fn linger_interval(&self) -> Duration {
        if self.reliable_transport {
            Duration::ZERO
        } else {
            self.t4
        }
    }

    /// Delay for timer J: `64 * T1`, or zero on a reliable transport.
    pub fn timer_j_interval(&self) -> Duration {
        if self.reliable_transport {
            Duration::ZERO
        } else {
            self.t1 * 64
        }
    }

    /// Delay for the reserved relay timer C. RFC 3261 Section 16.6
    /// requires a proxy to wait longer than 3 minutes for a final
    /// response to a forwarded INVITE.
    pub fn timer_c_interval(&self) -> Duration {
        Duration::from_secs(180)
    }
}
