//! Dialog lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The states a dialog progresses through, based on Figure 3 of
/// RFC 4235.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialogState {
    /// Created, nothing sent or received yet (not in RFC 4235)
    Uninitialized,
    /// Entered before send or receipt of 100 Trying
    Trying,
    /// Entered after send or receipt of 100 Trying
    Proceeding,
    /// Not presently used
    Early,
    /// Entered after send or receipt of 200 OK
    Confirmed,
    /// Entered after send or receipt of BYE, or on terminal failure
    Terminated,
}

impl fmt::Display for DialogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DialogState::Uninitialized => "UNINITIALIZED",
            DialogState::Trying => "TRYING",
            DialogState::Proceeding => "PROCEEDING",
            DialogState::Early => "EARLY",
            DialogState::Confirmed => "CONFIRMED",
            DialogState::Terminated => "TERMINATED",
        };
        write!(f, "{}", name)
    }
}
