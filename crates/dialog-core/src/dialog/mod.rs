//! Core dialog types.
//!
//! A dialog is the logical session between two endpoints for one call,
//! spanning possibly several transactions (INVITE then BYE). Dialogs are
//! created and mutated exclusively by the owning
//! [`ProtocolEngine`](crate::ProtocolEngine).
//!
//! ## Dialog lifecycle
//!
//! ```text
//! Uninitialized → Trying → Proceeding → Confirmed → Terminated
//!                   │          │           │           │
//!                 INVITE     100 sent    200 sent    BYE sent
//!                 sent/rcvd  or rcvd     or rcvd     or rcvd
//! ```
//!
//! `Confirmed` may be re-entered idempotently; a terminated dialog never
//! resurrects.

pub mod dialog_id;
pub mod dialog_impl;
pub mod dialog_state;

pub use dialog_id::DialogId;
pub use dialog_impl::Dialog;
pub use dialog_state::DialogState;
