//! Order-dependent transaction identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a transaction by `(call ID, from, to)`.
///
/// Unlike [`DialogId`](crate::DialogId) this key is *not* symmetric: a
/// request and its matching response share an ID only because the
/// response repeats the request's (from, to) values unswapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId {
    /// Call identifier
    pub call_id: u16,
    /// From URI as carried in the request
    pub from: u32,
    /// To URI as carried in the request
    pub to: u32,
}

impl TransactionId {
    /// Build the transaction ID for one request exchange.
    pub fn new(call_id: u16, from: u32, to: u32) -> Self {
        TransactionId { call_id, from, to }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.call_id, self.from, self.to)
    }
}
