//! Error types for dialog-core.
//!
//! The taxonomy separates *protocol misuse* (caller invariant violations:
//! missing callback registration, double dialog creation, must-exist
//! lookups that fail) from *network conditions*. Network conditions are
//! never errors: loss and timeout are recovered by the timer machinery
//! and surface to the owner only as [`SipEvent`](crate::SipEvent)s.

use thiserror::Error;

use sipsim_sip_core::WireError;

use crate::dialog::{DialogId, DialogState};
use crate::transaction::TransactionId;

/// Result alias used throughout dialog-core.
pub type DialogResult<T> = Result<T, DialogError>;

/// Errors returned by the protocol engine's public operations.
///
/// Every variant except [`DialogError::Wire`] is a contract violation by
/// the caller, not a runtime condition of the simulated network.
#[derive(Debug, Clone, Error)]
pub enum DialogError {
    /// A dialog was created twice for the same key.
    #[error("dialog {0} already exists")]
    DialogExists(DialogId),

    /// An operation required a dialog that has never been created.
    #[error("dialog {0} not found")]
    DialogNotFound(DialogId),

    /// An operation required a transaction that has never been created.
    #[error("transaction {0} not found")]
    TransactionNotFound(TransactionId),

    /// A packet arrived for a call ID with no registered callbacks.
    #[error("call ID {0} has no registered callbacks")]
    CallbacksNotSet(u16),

    /// `set_callbacks` was invoked twice for the same call ID.
    #[error("call ID {0} already has registered callbacks")]
    CallbacksAlreadySet(u16),

    /// An inbound request needed the default send callback before one
    /// was configured.
    #[error("no default send callback configured")]
    NoDefaultSendCallback,

    /// A response was sent or received while the dialog was in a state
    /// that does not admit it.
    #[error("{status_code} response not valid while dialog is {state}")]
    InvalidResponseState {
        /// The offending status code
        status_code: u16,
        /// The dialog state at the time
        state: DialogState,
    },

    /// `send_response` was asked for a status code outside the engine's
    /// vocabulary (100, 200, 408).
    #[error("unsupported status code {0}")]
    UnsupportedStatusCode(u16),

    /// An inbound packet could not be decoded.
    #[error("wire format error: {0}")]
    Wire(#[from] WireError),
}
