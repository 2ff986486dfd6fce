//! The endpoint role: an element that originates and answers calls.

use std::ops::Deref;

use crate::engine::{EngineRole, ProtocolEngine};
use crate::transaction::TimerSettings;

/// A call endpoint.
///
/// An agent adds no behavior beyond [`ProtocolEngine`]; it is the role
/// label for an element that both originates and answers calls, and it
/// derefs to its engine so all engine operations are available directly.
#[derive(Clone)]
pub struct Agent {
    engine: ProtocolEngine,
}

impl Agent {
    /// Create an agent with the given timing configuration.
    pub fn new(settings: TimerSettings) -> Self {
        Agent {
            engine: ProtocolEngine::new(EngineRole::Agent, settings),
        }
    }

    /// The underlying engine.
    pub fn engine(&self) -> &ProtocolEngine {
        &self.engine
    }
}

impl Deref for Agent {
    type Target = ProtocolEngine;

    fn deref(&self) -> &ProtocolEngine {
        &self.engine
    }
}
