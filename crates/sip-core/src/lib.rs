//! # sipsim-sip-core
//!
//! Wire format for the simplified SIP signalling layer used by the sipsim
//! discrete-event call models.
//!
//! Unlike textual SIP (RFC 3261 Section 7), the simulated messages carry a
//! fixed 18-byte binary header in network byte order:
//!
//! ```text
//! u8 message type | u8 method | u16 status code | u32 request URI |
//! u32 from | u32 to | u16 call ID
//! ```
//!
//! URIs and call IDs are opaque integers assigned by the scenario layer.
//! The layout is bit-exact and must be preserved for interoperability with
//! any component that still speaks it.
//!
//! ## Key types
//!
//! - [`SipHeader`]: the header value type with [`SipHeader::encode`] /
//!   [`SipHeader::decode`]
//! - [`SipMessageType`] and [`SipMethod`]: the request/response and method
//!   vocabularies
//! - [`WireError`]: decode failures

mod error;
mod header;

pub use error::WireError;
pub use header::{
    SipHeader, SipMessageType, SipMethod, status_code_name, INVALID_CALL_ID, INVALID_STATUS_CODE,
    INVALID_URI, SERIALIZED_LEN,
};
