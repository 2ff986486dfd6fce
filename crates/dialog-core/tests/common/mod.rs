//! Shared in-memory network harness for the end-to-end call scenarios.
//!
//! Topology: agent 1 originates, agents 2 and 3 answer, relay 0 forwards
//! between them. Links are loss-injectable one-hop queues: a send
//! callback spawns a delivery task that sleeps for [`LINK_DELAY`] and
//! then feeds the packet to the engine registered at the destination
//! address, mimicking a discrete-event channel. Tests run on a paused
//! Tokio clock, so delivery and timer order is fully deterministic.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::time::Instant;

use sipsim_dialog_core::{
    Agent, DialogState, EventCallback, MessageCallback, ProtocolEngine, Relay, SendCallback,
    SipEvent, TimerSettings, TransactionState,
};
use sipsim_sip_core::{SipHeader, SipMessageType, SipMethod};

/// Call identifier shared by every scenario.
pub const CALL_ID: u16 = 1000;
/// Request target carried by INVITE and BYE in the scenarios.
pub const GROUP_URI: u32 = 71;
/// One-way latency of every link.
pub const LINK_DELAY: Duration = Duration::from_millis(1);

/// Deterministic address for a node id.
pub fn addr(id: u32) -> SocketAddr {
    SocketAddr::from(([10, 0, 0, (id + 1) as u8], 5060))
}

/// Install the test log subscriber once; honors `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

type DropPredicate = Box<dyn Fn(&SipHeader, SocketAddr, SocketAddr) -> bool + Send + Sync>;

struct DropRule {
    predicate: DropPredicate,
    remaining: Mutex<usize>,
}

#[derive(Default)]
struct NetworkInner {
    engines: Mutex<HashMap<SocketAddr, ProtocolEngine>>,
    rules: Mutex<Vec<DropRule>>,
    dropped: Mutex<Vec<SipHeader>>,
}

/// The simulated network: an address-to-engine map plus loss rules.
#[derive(Clone, Default)]
pub struct Network {
    inner: Arc<NetworkInner>,
}

impl Network {
    pub fn new() -> Self {
        Network::default()
    }

    pub fn register(&self, id: u32, engine: ProtocolEngine) {
        self.inner.engines.lock().insert(addr(id), engine);
    }

    /// Drop up to `count` packets matching `predicate`
    /// (`(header, source, destination)`); `usize::MAX` drops every match.
    pub fn drop_matching(
        &self,
        count: usize,
        predicate: impl Fn(&SipHeader, SocketAddr, SocketAddr) -> bool + Send + Sync + 'static,
    ) {
        self.inner.rules.lock().push(DropRule {
            predicate: Box::new(predicate),
            remaining: Mutex::new(count),
        });
    }

    /// Drop up to `count` requests of `method` sent from node `from` to
    /// node `to`.
    pub fn drop_requests(&self, method: SipMethod, from: u32, to: u32, count: usize) {
        let (source, destination) = (addr(from), addr(to));
        self.drop_matching(count, move |header, src, dst| {
            header.message_type == SipMessageType::Request
                && header.method == method
                && src == source
                && dst == destination
        });
    }

    /// Headers of every packet the loss rules swallowed so far.
    pub fn dropped(&self) -> Vec<SipHeader> {
        self.inner.dropped.lock().clone()
    }

    /// A send callback delivering from node `from` over the network.
    pub fn sender(&self, from: u32) -> SendCallback {
        let net = self.clone();
        let source = addr(from);
        Arc::new(move |packet: Bytes, destination: SocketAddr, header: &SipHeader| {
            if net.should_drop(header, source, destination) {
                return;
            }
            let engine = net.inner.engines.lock().get(&destination).cloned();
            if let Some(engine) = engine {
                tokio::spawn(async move {
                    tokio::time::sleep(LINK_DELAY).await;
                    engine
                        .receive(packet, source)
                        .expect("inbound packet rejected");
                });
            }
        })
    }

    fn should_drop(&self, header: &SipHeader, source: SocketAddr, destination: SocketAddr) -> bool {
        for rule in self.inner.rules.lock().iter() {
            if (rule.predicate)(header, source, destination) {
                let mut remaining = rule.remaining.lock();
                if *remaining > 0 {
                    *remaining -= 1;
                    self.inner.dropped.lock().push(header.clone());
                    return true;
                }
            }
        }
        false
    }
}

/// Records every event callback invocation with its virtual timestamp.
#[derive(Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<(SipEvent, TransactionState, Instant)>>>,
}

impl EventRecorder {
    pub fn callback(&self) -> EventCallback {
        let recorder = self.clone();
        Arc::new(move |event, state| {
            recorder.events.lock().push((event, state, Instant::now()));
        })
    }

    pub fn events(&self) -> Vec<(SipEvent, TransactionState)> {
        self.events
            .lock()
            .iter()
            .map(|(event, state, _)| (*event, *state))
            .collect()
    }

    pub fn count(&self, event: SipEvent) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|(recorded, _, _)| *recorded == event)
            .count()
    }

    /// Offsets of every occurrence of `event` from `start`.
    pub fn offsets(&self, event: SipEvent, start: Instant) -> Vec<Duration> {
        self.events
            .lock()
            .iter()
            .filter(|(recorded, _, _)| *recorded == event)
            .map(|(_, _, at)| *at - start)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }
}

/// Records message callback deliveries (header plus tagged state).
#[derive(Clone, Default)]
pub struct MessageRecorder {
    messages: Arc<Mutex<Vec<(SipHeader, TransactionState)>>>,
}

impl MessageRecorder {
    pub fn record(&self, header: &SipHeader, state: TransactionState) {
        self.messages.lock().push((header.clone(), state));
    }

    pub fn messages(&self) -> Vec<(SipHeader, TransactionState)> {
        self.messages.lock().clone()
    }

    /// Status codes of recorded responses, in delivery order.
    pub fn response_codes(&self) -> Vec<u16> {
        self.messages
            .lock()
            .iter()
            .filter(|(header, _)| header.message_type == SipMessageType::Response)
            .map(|(header, _)| header.status_code)
            .collect()
    }
}

/// Records dialog and transaction state transitions via the engine hooks.
#[derive(Clone, Default)]
pub struct StateTrace {
    dialogs: Arc<Mutex<Vec<(u16, u32, u32, DialogState)>>>,
    transactions: Arc<Mutex<Vec<(u16, u32, u32, TransactionState)>>>,
}

impl StateTrace {
    pub fn attach(&self, engine: &ProtocolEngine) {
        let dialogs = self.dialogs.clone();
        engine
            .hooks()
            .on_dialog_state_changed(Arc::new(move |call_id, low, high, state| {
                dialogs.lock().push((call_id, low, high, state));
            }));
        let transactions = self.transactions.clone();
        engine
            .hooks()
            .on_transaction_state_changed(Arc::new(move |call_id, from, to, state| {
                transactions.lock().push((call_id, from, to, state));
            }));
    }

    /// State history of the dialog between `a` and `b` (order agnostic).
    pub fn dialog_states(&self, call_id: u16, a: u32, b: u32) -> Vec<DialogState> {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        self.dialogs
            .lock()
            .iter()
            .filter(|(c, l, h, _)| *c == call_id && *l == low && *h == high)
            .map(|(_, _, _, state)| *state)
            .collect()
    }

    /// State history of the transaction keyed by `(call_id, from, to)`.
    pub fn transaction_states(&self, call_id: u16, from: u32, to: u32) -> Vec<TransactionState> {
        self.transactions
            .lock()
            .iter()
            .filter(|(c, f, t, _)| *c == call_id && *f == from && *t == to)
            .map(|(_, _, _, state)| *state)
            .collect()
    }
}

/// The three-endpoint, one-relay topology every scenario uses.
///
/// Control logic lives in the registered callbacks:
/// - the relay answers a caller INVITE with 100 and fans the INVITE out
///   to both answerers; it forwards each leg's 200 toward the caller and
///   answers with 408 once every leg has timed out; a caller BYE is
///   answered 200 and fanned out to the legs that had answered
/// - each answerer answers INVITE and BYE with 200 immediately
pub struct Topology {
    pub net: Network,
    pub caller: Agent,
    pub relay: Relay,
    pub answerers: Vec<Agent>,
    pub caller_events: EventRecorder,
    pub caller_messages: MessageRecorder,
    pub relay_events: EventRecorder,
    pub relay_messages: MessageRecorder,
    pub answerer_events: Vec<EventRecorder>,
    pub caller_trace: StateTrace,
    pub relay_trace: StateTrace,
}

pub const CALLER: u32 = 1;
pub const RELAY: u32 = 0;
pub const ANSWERERS: [u32; 2] = [2, 3];

pub fn build_topology(settings: TimerSettings) -> Topology {
    init_tracing();
    let net = Network::new();

    let caller = Agent::new(settings.clone());
    let relay = Relay::new(settings.clone());
    let answerers: Vec<Agent> = ANSWERERS.iter().map(|_| Agent::new(settings.clone())).collect();

    net.register(CALLER, caller.engine().clone());
    net.register(RELAY, relay.engine().clone());
    for (answerer, id) in answerers.iter().zip(ANSWERERS) {
        net.register(id, answerer.engine().clone());
    }

    caller.set_default_send_callback(net.sender(CALLER));
    relay.set_default_send_callback(net.sender(RELAY));
    for (answerer, id) in answerers.iter().zip(ANSWERERS) {
        answerer.set_default_send_callback(net.sender(id));
    }

    let caller_trace = StateTrace::default();
    caller_trace.attach(caller.engine());
    let relay_trace = StateTrace::default();
    relay_trace.attach(relay.engine());

    // Caller: record only; the test drives send_invite/send_bye.
    let caller_events = EventRecorder::default();
    let caller_messages = MessageRecorder::default();
    {
        let recorder = caller_messages.clone();
        let message_callback: MessageCallback = Arc::new(move |_payload, header, state| {
            recorder.record(header, state);
        });
        caller
            .set_callbacks(CALL_ID, message_callback, caller_events.callback())
            .expect("caller callbacks");
    }

    // Relay call control.
    let relay_events = EventRecorder::default();
    let relay_messages = MessageRecorder::default();
    let answered = Arc::new(Mutex::new(Vec::<u32>::new()));
    {
        let recorder = relay_messages.clone();
        let engine = relay.engine().clone();
        let relay_net = net.clone();
        let answered_legs = answered.clone();
        let message_callback: MessageCallback = Arc::new(move |payload, header, state| {
            recorder.record(header, state);
            match (header.message_type, header.method) {
                (SipMessageType::Request, SipMethod::Invite) => {
                    // Caller INVITE: acknowledge progress, fan out.
                    engine
                        .send_response(
                            Bytes::new(),
                            addr(CALLER),
                            100,
                            header.from,
                            header.to,
                            CALL_ID,
                            relay_net.sender(RELAY),
                        )
                        .expect("relay 100");
                    for leg in ANSWERERS {
                        engine
                            .send_invite(
                                payload.clone(),
                                addr(leg),
                                header.request_uri,
                                RELAY,
                                leg,
                                CALL_ID,
                                relay_net.sender(RELAY),
                            )
                            .expect("relay INVITE fan-out");
                    }
                }
                (SipMessageType::Request, SipMethod::Bye) => {
                    // Caller BYE: answer it, tear down the answered legs.
                    engine
                        .send_response(
                            Bytes::new(),
                            addr(CALLER),
                            200,
                            header.from,
                            header.to,
                            CALL_ID,
                            relay_net.sender(RELAY),
                        )
                        .expect("relay BYE answer");
                    for leg in answered_legs.lock().iter().copied() {
                        engine
                            .send_bye(
                                payload.clone(),
                                addr(leg),
                                header.request_uri,
                                RELAY,
                                leg,
                                CALL_ID,
                                relay_net.sender(RELAY),
                            )
                            .expect("relay BYE fan-out");
                    }
                }
                (SipMessageType::Response, _)
                    if header.status_code == 200 && state == TransactionState::Terminated =>
                {
                    // A leg answered our INVITE; forward toward the
                    // caller. (A 200 answering our BYE arrives tagged
                    // Completed and needs no forwarding.) The second
                    // leg's 200 finds the caller dialog already
                    // Confirmed, which the relay role accepts.
                    answered_legs.lock().push(header.to);
                    engine
                        .send_response(
                            Bytes::new(),
                            addr(CALLER),
                            200,
                            CALLER,
                            RELAY,
                            CALL_ID,
                            relay_net.sender(RELAY),
                        )
                        .expect("relay 200 forward");
                }
                _ => {}
            }
        });

        let recorder = relay_events.clone();
        let engine = relay.engine().clone();
        let relay_net = net.clone();
        let answered_legs = answered.clone();
        let failed = Arc::new(Mutex::new(0usize));
        let event_callback: EventCallback = Arc::new(move |event, state| {
            recorder.events.lock().push((event, state, Instant::now()));
            if event == SipEvent::TimerBExpired {
                // A fan-out leg gave up. Only once every leg has failed
                // does the caller get a final 408.
                let mut failed_legs = failed.lock();
                *failed_legs += 1;
                if *failed_legs == ANSWERERS.len() && answered_legs.lock().is_empty() {
                    engine
                        .send_response(
                            Bytes::new(),
                            addr(CALLER),
                            408,
                            CALLER,
                            RELAY,
                            CALL_ID,
                            relay_net.sender(RELAY),
                        )
                        .expect("relay 408");
                }
            }
        });

        relay
            .set_callbacks(CALL_ID, message_callback, event_callback)
            .expect("relay callbacks");
    }

    // Answerers: answer INVITE and BYE with 200 immediately.
    let mut answerer_events = Vec::new();
    for (answerer, id) in answerers.iter().zip(ANSWERERS) {
        let events = EventRecorder::default();
        let engine = answerer.engine().clone();
        let answerer_net = net.clone();
        let message_callback: MessageCallback = Arc::new(move |_payload, header, _state| {
            if header.message_type == SipMessageType::Request
                && matches!(header.method, SipMethod::Invite | SipMethod::Bye)
            {
                engine
                    .send_response(
                        Bytes::new(),
                        addr(RELAY),
                        200,
                        header.from,
                        header.to,
                        CALL_ID,
                        answerer_net.sender(id),
                    )
                    .expect("answerer 200");
            }
        });
        answerer
            .set_callbacks(CALL_ID, message_callback, events.callback())
            .expect("answerer callbacks");
        answerer_events.push(events);
    }

    Topology {
        net,
        caller,
        relay,
        answerers,
        caller_events,
        caller_messages,
        relay_events,
        relay_messages,
        answerer_events,
        caller_trace,
        relay_trace,
    }
}

impl Topology {
    /// Originate the call: caller INVITEs the relay.
    pub fn place_call(&self) {
        self.caller
            .send_invite(
                Bytes::from_static(b"sdp"),
                addr(RELAY),
                GROUP_URI,
                CALLER,
                RELAY,
                CALL_ID,
                self.net.sender(CALLER),
            )
            .expect("send_invite");
    }

    /// Tear the call down: caller BYEs the relay.
    pub fn hang_up(&self) {
        self.caller
            .send_bye(
                Bytes::new(),
                addr(RELAY),
                GROUP_URI,
                CALLER,
                RELAY,
                CALL_ID,
                self.net.sender(CALLER),
            )
            .expect("send_bye");
    }
}
