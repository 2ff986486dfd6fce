//! Symmetric dialog identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a dialog by call ID plus the unordered pair of endpoint
/// URIs.
///
/// The constructor stores the URIs low-then-high, so two requests
/// traveling in opposite directions between the same endpoints map to the
/// same dialog. The key is a real composite value, deliberately not a
/// hand-rolled combined hash, so distinct (call ID, URI, URI) triples can
/// never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DialogId {
    /// Call identifier
    pub call_id: u16,
    /// Lower of the two endpoint URIs
    pub low_uri: u32,
    /// Higher of the two endpoint URIs
    pub high_uri: u32,
}

impl DialogId {
    /// Build the dialog ID for `call_id` between `uri_a` and `uri_b`,
    /// in either order.
    pub fn new(call_id: u16, uri_a: u32, uri_b: u32) -> Self {
        if uri_a < uri_b {
            DialogId {
                call_id,
                low_uri: uri_a,
                high_uri: uri_b,
            }
        } else {
            DialogId {
                call_id,
                low_uri: uri_b,
                high_uri: uri_a,
            }
        }
    }
}

impl fmt::Display for DialogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.call_id, self.low_uri, self.high_uri)
    }
}
