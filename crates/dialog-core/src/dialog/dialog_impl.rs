//! The dialog entity owned by the protocol engine.

use crate::dialog::DialogState;
use crate::events::SendCallback;

/// Per-call, per-peer-pair session state.
///
/// A dialog holds little beyond its state and the transport send callback
/// to use for follow-on messages. The callback is rebound on every
/// outbound request or response call, since the owner may supply a fresh
/// one each time.
pub struct Dialog {
    /// Call identifier this dialog belongs to
    pub call_id: u16,
    /// Transport callback for follow-on messages in this dialog
    pub send_callback: SendCallback,
    /// Current lifecycle state
    pub state: DialogState,
}

impl Dialog {
    /// Create a dialog in the `Uninitialized` state.
    pub fn new(call_id: u16, send_callback: SendCallback) -> Self {
        Dialog {
            call_id,
            send_callback,
            state: DialogState::Uninitialized,
        }
    }
}
