//! # sipsim-dialog-core
//!
//! Dialog, transaction and timer machinery for the simplified SIP
//! signalling layer used by the sipsim discrete-event call models.
//!
//! This crate is the protocol engine behind call setup and teardown
//! between one caller and one or more callees via an intermediary relay.
//! It implements the client and server transaction state machines of
//! RFC 3261 Section 17 over the fixed binary header from
//! [`sipsim_sip_core`], including:
//!
//! - per-call, per-peer-pair **dialogs** (RFC 3261 dialogs, RFC 4235
//!   state vocabulary), keyed symmetrically by `(call id, uri, uri)`
//! - per-request-exchange **transactions**, keyed by the order-dependent
//!   `(call id, from, to)` triple, each owning a retransmission cache and
//!   its timer set
//! - timers A/B (INVITE client), E/F (non-INVITE client), I (INVITE
//!   server ACK absorption), J/K (non-INVITE linger), with exponential
//!   retransmission backoff
//!
//! The engine is not an application: it is owned by a call-control layer
//! (e.g. a push-to-talk call machine) that supplies a transport send
//! callback per operation, registers per-call message/event callbacks,
//! and feeds inbound datagrams through [`ProtocolEngine::receive`].
//!
//! ## Layering
//!
//! ```text
//! call-control layer (PTT call machines, test scenarios)
//!        │  send_invite / send_bye / send_response      ▲ message + event
//!        ▼                                              │   callbacks
//! ┌──────────────────────────────────────────────────────────────┐
//! │ ProtocolEngine   (dialogs, transactions, timers)             │
//! └──────────────────────────────────────────────────────────────┘
//!        │  send callback (payload, address, header)    ▲ receive()
//!        ▼                                              │
//! transport (UDP-like channel owned by the simulation host)
//! ```
//!
//! [`Agent`] and [`Relay`] are thin role specializations: an agent
//! originates and answers calls; a relay additionally forwards between
//! legs and tolerates the response orderings that fan-out produces.

pub mod agent;
pub mod dialog;
pub mod engine;
pub mod errors;
pub mod events;
pub mod relay;
pub mod transaction;

pub use agent::Agent;
pub use dialog::{Dialog, DialogId, DialogState};
pub use engine::{EngineRole, ProtocolEngine};
pub use errors::{DialogError, DialogResult};
pub use events::{
    DialogStateHook, EngineHooks, EventCallback, MessageCallback, MessageHook, SendCallback,
    SipEvent, TransactionStateHook,
};
pub use relay::Relay;
pub use transaction::{TimerKind, TimerSettings, Transaction, TransactionId, TransactionState};
