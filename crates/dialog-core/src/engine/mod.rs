//! The protocol engine: owner of all dialogs and transactions.
//!
//! [`ProtocolEngine`] exposes the operations to originate INVITE/BYE and
//! responses, the single inbound-packet entry point
//! ([`ProtocolEngine::receive`]), per-call-ID callback registration, and
//! all timer-driven retry and expiry logic of RFC 3261 Section 17.
//!
//! ## Execution model
//!
//! Every public operation is a synchronous function; the engine never
//! blocks. The only asynchrony is the timer set: arming a timer spawns a
//! Tokio task that sleeps and then re-enters the engine exactly like an
//! inbound packet would, so all operations must run inside a Tokio
//! runtime. Within one engine, callers are expected to serialize access
//! (one engine per simulated node); timer guards make a late firing of a
//! cancelled timer harmless.
//!
//! No internal lock is held across a user-callback invocation: message
//! and event callbacks may synchronously re-enter the engine (a message
//! callback that answers an INVITE with `send_response`, for instance).

use std::sync::Arc;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, warn};

use sipsim_sip_core::{SipHeader, SipMessageType, SipMethod};

use crate::dialog::{Dialog, DialogId, DialogState};
use crate::errors::{DialogError, DialogResult};
use crate::events::{EngineHooks, EventCallback, MessageCallback, SendCallback, SipEvent};
use crate::transaction::{
    TimerKind, TimerSettings, Transaction, TransactionId, TransactionState,
};

/// Role of the element owning an engine instance.
///
/// The role only changes how tolerant `send_response` is of fan-out
/// orderings; see [`Relay`](crate::Relay).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineRole {
    /// An endpoint that originates and answers calls
    Agent,
    /// A forwarding element with its own dialogs toward each leg
    Relay,
}

struct EngineInner {
    role: EngineRole,
    settings: TimerSettings,
    dialogs: DashMap<DialogId, Dialog>,
    transactions: DashMap<TransactionId, Transaction>,
    message_callbacks: DashMap<u16, MessageCallback>,
    event_callbacks: DashMap<u16, EventCallback>,
    default_send_callback: RwLock<Option<SendCallback>>,
    hooks: EngineHooks,
}

/// The SIP signalling engine for one simulated element.
///
/// Cloning is cheap and yields another handle to the same engine; timer
/// tasks hold such a clone.
#[derive(Clone)]
pub struct ProtocolEngine {
    inner: Arc<EngineInner>,
}

impl ProtocolEngine {
    /// Create an engine with the given role and timing configuration.
    pub fn new(role: EngineRole, settings: TimerSettings) -> Self {
        ProtocolEngine {
            inner: Arc::new(EngineInner {
                role,
                settings,
                dialogs: DashMap::new(),
                transactions: DashMap::new(),
                message_callbacks: DashMap::new(),
                event_callbacks: DashMap::new(),
                default_send_callback: RwLock::new(None),
                hooks: EngineHooks::default(),
            }),
        }
    }

    /// The role this engine was created with.
    pub fn role(&self) -> EngineRole {
        self.inner.role
    }

    /// The timing configuration of this engine.
    pub fn settings(&self) -> &TimerSettings {
        &self.inner.settings
    }

    /// Trace subscriber registration.
    pub fn hooks(&self) -> &EngineHooks {
        &self.inner.hooks
    }

    /// Register the message and event callbacks for `call_id`.
    ///
    /// Exactly once per call ID; re-registration is a contract violation.
    pub fn set_callbacks(
        &self,
        call_id: u16,
        message_callback: MessageCallback,
        event_callback: EventCallback,
    ) -> DialogResult<()> {
        match self.inner.message_callbacks.entry(call_id) {
            Entry::Vacant(entry) => entry.insert(message_callback),
            Entry::Occupied(_) => return Err(DialogError::CallbacksAlreadySet(call_id)),
        };
        match self.inner.event_callbacks.entry(call_id) {
            Entry::Vacant(entry) => entry.insert(event_callback),
            Entry::Occupied(_) => return Err(DialogError::CallbacksAlreadySet(call_id)),
        };
        Ok(())
    }

    /// Set the send callback used to answer inbound requests before the
    /// owner has supplied a dialog-specific one.
    pub fn set_default_send_callback(&self, send_callback: SendCallback) {
        *self.inner.default_send_callback.write() = Some(send_callback);
    }

    /// Current state of a dialog, if one exists.
    pub fn dialog_state(&self, dialog_id: DialogId) -> Option<DialogState> {
        self.inner.dialogs.get(&dialog_id).map(|dialog| dialog.state)
    }

    /// Current state of a transaction, if one exists.
    pub fn transaction_state(&self, transaction_id: TransactionId) -> Option<TransactionState> {
        self.inner
            .transactions
            .get(&transaction_id)
            .map(|transaction| transaction.state)
    }

    /// Start an INVITE transaction.
    ///
    /// Creates the dialog (there must not already be one for this call
    /// and peer pair) and the transaction, serializes the INVITE header
    /// onto `payload`, sends it, and arms timers A and B.
    pub fn send_invite(
        &self,
        payload: Bytes,
        address: SocketAddr,
        request_uri: u32,
        from: u32,
        to: u32,
        call_id: u16,
        send_callback: SendCallback,
    ) -> DialogResult<()> {
        let dialog_id = DialogId::new(call_id, from, to);
        let transaction_id = TransactionId::new(call_id, from, to);
        debug!(dialog = %dialog_id, "sending INVITE");

        self.create_dialog(dialog_id, send_callback.clone())?;
        self.set_dialog_state(dialog_id, DialogState::Trying)?;
        self.create_transaction(transaction_id, send_callback.clone());
        self.set_transaction_state(transaction_id, TransactionState::Calling)?;

        let header = SipHeader::request(SipMethod::Invite, request_uri, from, to, call_id);
        let packet = header.encode_with_payload(&payload);
        self.cache_packet(transaction_id, packet.clone(), address, header.clone())?;

        send_callback(packet, address, &header);
        self.inner.hooks.notify_message_sent(&header);

        self.schedule_retransmit(transaction_id, TimerKind::A, 1);
        self.schedule_timeout(transaction_id, TimerKind::B);
        Ok(())
    }

    /// Start a BYE transaction.
    ///
    /// The dialog must exist; it is terminated immediately (idempotently
    /// safe). The transaction is created, or re-armed if the exchange
    /// reuses an ID previously used by an INVITE on the same leg, which
    /// cancels any lingering I/J/K timer first. Arms timers E and F.
    pub fn send_bye(
        &self,
        payload: Bytes,
        address: SocketAddr,
        request_uri: u32,
        from: u32,
        to: u32,
        call_id: u16,
        send_callback: SendCallback,
    ) -> DialogResult<()> {
        let dialog_id = DialogId::new(call_id, from, to);
        let transaction_id = TransactionId::new(call_id, from, to);
        debug!(dialog = %dialog_id, "sending BYE");

        self.rebind_dialog_send_callback(dialog_id, send_callback.clone())?;
        self.set_dialog_state(dialog_id, DialogState::Terminated)?;
        self.create_transaction(transaction_id, send_callback.clone());
        self.set_transaction_state(transaction_id, TransactionState::Trying)?;

        let header = SipHeader::request(SipMethod::Bye, request_uri, from, to, call_id);
        let packet = header.encode_with_payload(&payload);
        self.cache_packet(transaction_id, packet.clone(), address, header.clone())?;

        send_callback(packet, address, &header);
        self.inner.hooks.notify_message_sent(&header);

        self.schedule_retransmit(transaction_id, TimerKind::E, 1);
        self.schedule_timeout(transaction_id, TimerKind::F);
        Ok(())
    }

    /// Send a response with the given status code (100, 200 or 408).
    ///
    /// `from` and `to` must repeat the values the request carried; the
    /// header fields are not swapped on a response, by design.
    pub fn send_response(
        &self,
        payload: Bytes,
        address: SocketAddr,
        status_code: u16,
        from: u32,
        to: u32,
        call_id: u16,
        send_callback: SendCallback,
    ) -> DialogResult<()> {
        let dialog_id = DialogId::new(call_id, from, to);
        let transaction_id = TransactionId::new(call_id, from, to);
        debug!(dialog = %dialog_id, status_code, "sending response");

        let dialog_state = self.rebind_dialog_send_callback(dialog_id, send_callback.clone())?;
        match status_code {
            100 => {
                self.set_dialog_state(dialog_id, DialogState::Proceeding)?;
                self.set_transaction_state(transaction_id, TransactionState::Proceeding)?;
            }
            200 => match dialog_state {
                DialogState::Trying | DialogState::Proceeding => {
                    // Answering an INVITE.
                    self.set_dialog_state(dialog_id, DialogState::Confirmed)?;
                    self.set_transaction_state(transaction_id, TransactionState::Completed)?;
                }
                DialogState::Terminated => {
                    // Answering a BYE; linger to absorb retransmissions.
                    self.set_transaction_state(transaction_id, TransactionState::Completed)?;
                    self.schedule_timer_j(transaction_id);
                }
                DialogState::Confirmed if self.inner.role == EngineRole::Relay => {
                    // Forwarding another leg's 200 after the first one
                    // already confirmed this dialog. Send without
                    // re-entering Confirmed.
                    debug!(dialog = %dialog_id, "200 on confirmed dialog, forwarding without state change");
                }
                state => {
                    return Err(DialogError::InvalidResponseState { status_code, state });
                }
            },
            408 => {
                self.set_dialog_state(dialog_id, DialogState::Terminated)?;
                self.set_transaction_state(transaction_id, TransactionState::Completed)?;
            }
            other => return Err(DialogError::UnsupportedStatusCode(other)),
        }

        let header = SipHeader::response(status_code, from, to, call_id);
        let packet = header.encode_with_payload(&payload);
        send_callback(packet, address, &header);
        self.inner.hooks.notify_message_sent(&header);
        Ok(())
    }

    /// Process one inbound datagram.
    ///
    /// The signalling header must be the next thing in `packet`; the
    /// remainder is the payload delivered to the message callback.
    /// Callbacks must already be registered for the header's call ID.
    pub fn receive(&self, mut packet: Bytes, source: SocketAddr) -> DialogResult<()> {
        let header = SipHeader::decode(&mut packet)?;
        let body = packet;
        self.inner.hooks.notify_message_received(&header);

        let transaction_id = TransactionId::new(header.call_id, header.from, header.to);
        let dialog_id = DialogId::new(header.call_id, header.from, header.to);
        debug!(transaction = %transaction_id, %header, "received packet");

        let message_callback = self.message_callback(header.call_id)?;
        let event_callback = self.event_callback(header.call_id)?;

        match header.message_type {
            SipMessageType::Response => self.receive_response(
                header,
                body,
                source,
                dialog_id,
                transaction_id,
                message_callback,
                event_callback,
            ),
            SipMessageType::Request => self.receive_request(
                header,
                body,
                dialog_id,
                transaction_id,
                message_callback,
                event_callback,
            ),
            SipMessageType::Invalid => {
                debug!(%header, "ignoring message with invalid type");
                Ok(())
            }
        }
    }

    fn receive_response(
        &self,
        header: SipHeader,
        body: Bytes,
        source: SocketAddr,
        dialog_id: DialogId,
        transaction_id: TransactionId,
        message_callback: MessageCallback,
        event_callback: EventCallback,
    ) -> DialogResult<()> {
        match header.status_code {
            100 => {
                event_callback(SipEvent::TryingReceived, TransactionState::Proceeding);
                self.set_dialog_state(dialog_id, DialogState::Proceeding)?;
                self.set_transaction_state(transaction_id, TransactionState::Proceeding)?;
                self.cancel_timer(transaction_id, TimerKind::A);
                self.cancel_timer(transaction_id, TimerKind::B);
                self.free_packet(transaction_id);
            }
            200 => {
                let dialog_state = self
                    .dialog_state(dialog_id)
                    .ok_or(DialogError::DialogNotFound(dialog_id))?;
                match dialog_state {
                    DialogState::Trying | DialogState::Proceeding => {
                        self.set_dialog_state(dialog_id, DialogState::Confirmed)?;
                        self.cancel_timer(transaction_id, TimerKind::A);
                        self.cancel_timer(transaction_id, TimerKind::B);
                        self.set_transaction_state(transaction_id, TransactionState::Terminated)?;
                        self.free_packet(transaction_id);
                        // Deliver: the OK may carry session description.
                        message_callback(body, &header, TransactionState::Terminated);
                        self.send_ack(dialog_id, &header, source)?;
                    }
                    DialogState::Confirmed => {
                        // Transaction already terminated; our ACK was
                        // probably lost. Re-send it, touch nothing else.
                        debug!(dialog = %dialog_id, "duplicate 200 OK, re-sending ACK");
                        self.send_ack(dialog_id, &header, source)?;
                    }
                    DialogState::Terminated => {
                        // Reply to our BYE; no ACK for a non-INVITE final.
                        self.set_transaction_state(transaction_id, TransactionState::Completed)?;
                        message_callback(body, &header, TransactionState::Completed);
                        self.cancel_timer(transaction_id, TimerKind::E);
                        self.cancel_timer(transaction_id, TimerKind::F);
                        self.schedule_timer_k(transaction_id);
                    }
                    state => {
                        return Err(DialogError::InvalidResponseState {
                            status_code: 200,
                            state,
                        });
                    }
                }
            }
            408 => {
                self.cancel_timer(transaction_id, TimerKind::A);
                self.cancel_timer(transaction_id, TimerKind::B);
                self.free_packet(transaction_id);
                self.set_dialog_state(dialog_id, DialogState::Terminated)?;
                self.set_transaction_state(transaction_id, TransactionState::Failed)?;
                message_callback(body, &header, TransactionState::Failed);
            }
            other => {
                debug!(status_code = other, "ignoring unknown response");
            }
        }
        Ok(())
    }

    fn receive_request(
        &self,
        header: SipHeader,
        body: Bytes,
        dialog_id: DialogId,
        transaction_id: TransactionId,
        message_callback: MessageCallback,
        event_callback: EventCallback,
    ) -> DialogResult<()> {
        match header.method {
            SipMethod::Invite => {
                if self.inner.dialogs.contains_key(&dialog_id) {
                    debug!(dialog = %dialog_id, "dialog exists, ignoring INVITE retransmission");
                    return Ok(());
                }
                let default_send = self.default_send_callback()?;
                self.create_dialog(dialog_id, default_send.clone())?;
                self.set_dialog_state(dialog_id, DialogState::Trying)?;
                self.create_transaction(transaction_id, default_send);
                self.set_transaction_state(transaction_id, TransactionState::Trying)?;
                message_callback(body, &header, TransactionState::Trying);
            }
            SipMethod::Bye => {
                self.set_dialog_state(dialog_id, DialogState::Terminated)?;
                if self.inner.transactions.contains_key(&transaction_id) {
                    // A BYE may reach a server transaction still in
                    // Confirmed with Timer I pending.
                    self.cancel_timer(transaction_id, TimerKind::I);
                } else {
                    let default_send = self.default_send_callback()?;
                    self.create_transaction(transaction_id, default_send);
                }
                self.set_transaction_state(transaction_id, TransactionState::Trying)?;
                message_callback(body, &header, TransactionState::Trying);
            }
            SipMethod::Ack => {
                event_callback(SipEvent::AckReceived, TransactionState::Confirmed);
                self.set_transaction_state(transaction_id, TransactionState::Confirmed)?;
                self.schedule_timer_i(transaction_id);
            }
            SipMethod::Cancel | SipMethod::Invalid => {
                debug!(method = %header.method, "ignoring unsupported request method");
            }
        }
        Ok(())
    }

    /// Synthesize an ACK for a 200 OK and send it to the address the OK
    /// came from, over the dialog's send callback.
    fn send_ack(&self, dialog_id: DialogId, ok_header: &SipHeader, source: SocketAddr) -> DialogResult<()> {
        let send_callback = {
            let dialog = self
                .inner
                .dialogs
                .get(&dialog_id)
                .ok_or(DialogError::DialogNotFound(dialog_id))?;
            dialog.send_callback.clone()
        };
        let header = SipHeader::request(
            SipMethod::Ack,
            ok_header.request_uri,
            ok_header.from,
            ok_header.to,
            ok_header.call_id,
        );
        let packet = header.encode_with_payload(&[]);
        send_callback(packet, source, &header);
        self.inner.hooks.notify_message_sent(&header);
        Ok(())
    }

    // --- Dialog and transaction bookkeeping -----------------------------

    fn create_dialog(&self, dialog_id: DialogId, send_callback: SendCallback) -> DialogResult<()> {
        match self.inner.dialogs.entry(dialog_id) {
            Entry::Vacant(entry) => {
                entry.insert(Dialog::new(dialog_id.call_id, send_callback));
                Ok(())
            }
            Entry::Occupied(_) => Err(DialogError::DialogExists(dialog_id)),
        }
    }

    /// Rebind the dialog's send callback, returning its current state.
    fn rebind_dialog_send_callback(
        &self,
        dialog_id: DialogId,
        send_callback: SendCallback,
    ) -> DialogResult<DialogState> {
        let mut dialog = self
            .inner
            .dialogs
            .get_mut(&dialog_id)
            .ok_or(DialogError::DialogNotFound(dialog_id))?;
        dialog.send_callback = send_callback;
        Ok(dialog.state)
    }

    fn set_dialog_state(&self, dialog_id: DialogId, state: DialogState) -> DialogResult<()> {
        {
            let mut dialog = self
                .inner
                .dialogs
                .get_mut(&dialog_id)
                .ok_or(DialogError::DialogNotFound(dialog_id))?;
            dialog.state = state;
        }
        debug!(dialog = %dialog_id, %state, "dialog state changed");
        self.inner
            .hooks
            .notify_dialog_state(dialog_id.call_id, dialog_id.low_uri, dialog_id.high_uri, state);
        Ok(())
    }

    /// Create a transaction, or re-arm an existing one for a new logical
    /// exchange on the same (call ID, from, to). Re-arming cancels any
    /// lingering I/J/K timer, resets the state to `Idle` and rebinds the
    /// send callback.
    fn create_transaction(&self, transaction_id: TransactionId, send_callback: SendCallback) {
        match self.inner.transactions.entry(transaction_id) {
            Entry::Vacant(entry) => {
                entry.insert(Transaction::new(transaction_id.call_id, send_callback));
            }
            Entry::Occupied(mut entry) => {
                let transaction = entry.get_mut();
                if transaction.state != TransactionState::Idle {
                    transaction.cancel_timer(TimerKind::I);
                    transaction.cancel_timer(TimerKind::J);
                    transaction.cancel_timer(TimerKind::K);
                }
                transaction.state = TransactionState::Idle;
                transaction.send_callback = send_callback;
            }
        }
    }

    fn set_transaction_state(
        &self,
        transaction_id: TransactionId,
        state: TransactionState,
    ) -> DialogResult<()> {
        {
            let mut transaction = self
                .inner
                .transactions
                .get_mut(&transaction_id)
                .ok_or(DialogError::TransactionNotFound(transaction_id))?;
            transaction.state = state;
        }
        debug!(transaction = %transaction_id, %state, "transaction state changed");
        self.inner.hooks.notify_transaction_state(
            transaction_id.call_id,
            transaction_id.from,
            transaction_id.to,
            state,
        );
        Ok(())
    }

    fn cache_packet(
        &self,
        transaction_id: TransactionId,
        packet: Bytes,
        address: SocketAddr,
        header: SipHeader,
    ) -> DialogResult<()> {
        let mut transaction = self
            .inner
            .transactions
            .get_mut(&transaction_id)
            .ok_or(DialogError::TransactionNotFound(transaction_id))?;
        transaction.cache_packet(packet, address, header);
        Ok(())
    }

    fn free_packet(&self, transaction_id: TransactionId) {
        if let Some(mut transaction) = self.inner.transactions.get_mut(&transaction_id) {
            transaction.free_packet();
        }
    }

    fn message_callback(&self, call_id: u16) -> DialogResult<MessageCallback> {
        self.inner
            .message_callbacks
            .get(&call_id)
            .map(|callback| callback.clone())
            .ok_or(DialogError::CallbacksNotSet(call_id))
    }

    fn event_callback(&self, call_id: u16) -> DialogResult<EventCallback> {
        self.inner
            .event_callbacks
            .get(&call_id)
            .map(|callback| callback.clone())
            .ok_or(DialogError::CallbacksNotSet(call_id))
    }

    fn default_send_callback(&self) -> DialogResult<SendCallback> {
        self.inner
            .default_send_callback
            .read()
            .clone()
            .ok_or(DialogError::NoDefaultSendCallback)
    }

    // --- Timers ---------------------------------------------------------

    /// Arm `kind` on `transaction_id` to fire after `delay`, implicitly
    /// cancelling any prior instance of the same kind.
    fn schedule_timer(
        &self,
        transaction_id: TransactionId,
        kind: TimerKind,
        delay: Duration,
        backoff: u32,
    ) {
        let engine = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            engine.on_timer(transaction_id, kind, backoff);
        });
        match self.inner.transactions.get_mut(&transaction_id) {
            Some(mut transaction) => transaction.arm_timer(kind, handle),
            None => handle.abort(),
        }
    }

    /// Arm a retransmission timer (A or E) with the given backoff
    /// multiplier, at `backoff * T1`.
    fn schedule_retransmit(&self, transaction_id: TransactionId, kind: TimerKind, backoff: u32) {
        let delay = self.inner.settings.retransmit_interval(backoff);
        self.schedule_timer(transaction_id, kind, delay, backoff);
    }

    /// Arm a give-up timer (B or F) at `64 * T1`.
    fn schedule_timeout(&self, transaction_id: TransactionId, kind: TimerKind) {
        let delay = self.inner.settings.timeout_interval();
        self.schedule_timer(transaction_id, kind, delay, 0);
    }

    fn schedule_timer_i(&self, transaction_id: TransactionId) {
        let delay = self.inner.settings.linger_interval();
        self.schedule_timer(transaction_id, TimerKind::I, delay, 0);
    }

    fn schedule_timer_j(&self, transaction_id: TransactionId) {
        let delay = self.inner.settings.timer_j_interval();
        self.schedule_timer(transaction_id, TimerKind::J, delay, 0);
    }

    fn schedule_timer_k(&self, transaction_id: TransactionId) {
        let delay = self.inner.settings.linger_interval();
        self.schedule_timer(transaction_id, TimerKind::K, delay, 0);
    }

    /// Arm the reserved relay-side Timer C bounding a forwarded INVITE.
    pub(crate) fn schedule_timer_c(&self, transaction_id: TransactionId) -> DialogResult<()> {
        if !self.inner.transactions.contains_key(&transaction_id) {
            return Err(DialogError::TransactionNotFound(transaction_id));
        }
        let delay = self.inner.settings.timer_c_interval();
        self.schedule_timer(transaction_id, TimerKind::C, delay, 0);
        Ok(())
    }

    fn cancel_timer(&self, transaction_id: TransactionId, kind: TimerKind) {
        if let Some(mut transaction) = self.inner.transactions.get_mut(&transaction_id) {
            transaction.cancel_timer(kind);
        }
    }

    /// Timer expiry entry point, invoked from the spawned timer task.
    ///
    /// Every arm is guarded by the state that legitimizes it; a timer
    /// whose transaction has moved on (the task fired in the window
    /// between expiry and cancellation) does nothing.
    fn on_timer(&self, transaction_id: TransactionId, kind: TimerKind, backoff: u32) {
        let event_callback = match self.event_callback(transaction_id.call_id) {
            Ok(callback) => callback,
            Err(error) => {
                warn!(transaction = %transaction_id, %error, "timer fired without callbacks");
                return;
            }
        };
        let dialog_id = DialogId::new(transaction_id.call_id, transaction_id.from, transaction_id.to);
        debug!(transaction = %transaction_id, timer = %kind, "timer expired");

        match kind {
            TimerKind::A | TimerKind::E => {
                let guard_state = match kind {
                    TimerKind::A => TransactionState::Calling,
                    _ => TransactionState::Trying,
                };
                let retransmit = {
                    let Some(transaction) = self.inner.transactions.get(&transaction_id) else {
                        return;
                    };
                    if transaction.state != guard_state {
                        debug!(transaction = %transaction_id, timer = %kind, "stale timer, ignoring");
                        return;
                    }
                    (
                        transaction.send_callback.clone(),
                        transaction.cached_packet.clone(),
                        transaction.cached_address,
                        transaction.cached_header.clone(),
                    )
                };
                let event = if kind == TimerKind::A {
                    SipEvent::TimerAExpired
                } else {
                    SipEvent::TimerEExpired
                };
                event_callback(event, guard_state);
                if let (send, Some(packet), Some(address), Some(header)) =
                    (retransmit.0, retransmit.1, retransmit.2, retransmit.3)
                {
                    send(packet, address, &header);
                }
                // Double the backoff multiplier and re-arm.
                self.schedule_retransmit(transaction_id, kind, backoff << 1);
            }
            TimerKind::B => {
                if self.transaction_state(transaction_id) != Some(TransactionState::Calling) {
                    debug!(transaction = %transaction_id, "stale Timer B, ignoring");
                    return;
                }
                self.cancel_timer(transaction_id, TimerKind::A);
                if let Err(error) = self.set_transaction_state(transaction_id, TransactionState::Failed) {
                    warn!(transaction = %transaction_id, %error, "Timer B state update failed");
                }
                if let Err(error) = self.set_dialog_state(dialog_id, DialogState::Terminated) {
                    warn!(dialog = %dialog_id, %error, "Timer B state update failed");
                }
                event_callback(SipEvent::TimerBExpired, TransactionState::Failed);
            }
            TimerKind::F => {
                if self.transaction_state(transaction_id) != Some(TransactionState::Trying) {
                    debug!(transaction = %transaction_id, "stale Timer F, ignoring");
                    return;
                }
                event_callback(SipEvent::TimerFExpired, TransactionState::Trying);
                self.cancel_timer(transaction_id, TimerKind::E);
                if let Err(error) = self.set_transaction_state(transaction_id, TransactionState::Failed) {
                    warn!(transaction = %transaction_id, %error, "Timer F state update failed");
                }
            }
            TimerKind::I => {
                self.fire_linger_timer(
                    transaction_id,
                    TransactionState::Confirmed,
                    SipEvent::TimerIExpired,
                    event_callback,
                );
            }
            TimerKind::J => {
                self.fire_linger_timer(
                    transaction_id,
                    TransactionState::Completed,
                    SipEvent::TimerJExpired,
                    event_callback,
                );
            }
            TimerKind::K => {
                self.fire_linger_timer(
                    transaction_id,
                    TransactionState::Completed,
                    SipEvent::TimerKExpired,
                    event_callback,
                );
            }
            TimerKind::C => {
                // Reserved hook: report only, no state change.
                let state = self.transaction_state(transaction_id);
                if let Some(state) = state {
                    if !state.is_final() {
                        event_callback(SipEvent::TimerCExpired, state);
                    }
                }
            }
        }
    }

    /// Shared expiry path for the linger timers I, J and K: move the
    /// transaction from its absorb/linger state to `Terminated`.
    fn fire_linger_timer(
        &self,
        transaction_id: TransactionId,
        guard_state: TransactionState,
        event: SipEvent,
        event_callback: EventCallback,
    ) {
        if self.transaction_state(transaction_id) != Some(guard_state) {
            debug!(transaction = %transaction_id, %event, "stale linger timer, ignoring");
            return;
        }
        event_callback(event, guard_state);
        if let Err(error) = self.set_transaction_state(transaction_id, TransactionState::Terminated) {
            warn!(transaction = %transaction_id, %error, "linger timer state update failed");
        }
    }
}
