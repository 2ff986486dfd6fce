//! Transaction types and timer configuration.
//!
//! A transaction is one request/response exchange and its retries
//! (RFC 3261 Section 17). Each transaction owns the cached copy of its
//! outbound request (for retransmission) and a small map of armed timers.
//!
//! ## Transaction lifecycles
//!
//! ```text
//! INVITE client:      Idle → Calling → Proceeding → Terminated
//!                                 │
//!                                 └──────────────→ Failed   (Timer B)
//! non-INVITE client:  Idle → Trying → Completed → Terminated (Timer K)
//! INVITE server:      Idle → Trying → Proceeding → Completed
//!                                       → Confirmed → Terminated (Timer I)
//! non-INVITE server:  Idle → Trying → Completed → Terminated (Timer J)
//! ```

pub mod key;
pub mod state;
pub mod timer;
pub mod transaction_impl;

pub use key::TransactionId;
pub use state::TransactionState;
pub use timer::{TimerKind, TimerSettings};
pub use transaction_impl::Transaction;
