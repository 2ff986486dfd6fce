//! The fixed-size signalling header.
//!
//! The header is a pure value type: [`SipHeader::encode`] and
//! [`SipHeader::decode`] round-trip exactly. Unset fields use sentinel
//! "invalid" constants rather than zero, so that "unset" is always
//! distinguishable from a legitimate identifier of 0.

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::WireError;

/// Serialized header length in bytes (1 + 1 + 2 + 4 + 4 + 4 + 2).
pub const SERIALIZED_LEN: usize = 18;

/// Sentinel for an unset URI field.
pub const INVALID_URI: u32 = 0xFFFF_FFFF;

/// Sentinel for an unset call ID.
pub const INVALID_CALL_ID: u16 = 0xFFFF;

/// Sentinel for an unset status code.
pub const INVALID_STATUS_CODE: u16 = 0xFFFF;

/// Whether a message is a request or a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SipMessageType {
    /// A SIP request (INVITE, BYE, ACK, CANCEL)
    Request = 0,
    /// A SIP response (100, 200, 408)
    Response = 1,
    /// Unset
    Invalid = 2,
}

impl SipMessageType {
    fn from_wire(octet: u8) -> Result<Self, WireError> {
        match octet {
            0 => Ok(SipMessageType::Request),
            1 => Ok(SipMessageType::Response),
            2 => Ok(SipMessageType::Invalid),
            other => Err(WireError::InvalidMessageType(other)),
        }
    }
}

impl fmt::Display for SipMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SipMessageType::Request => "Request",
            SipMessageType::Response => "Response",
            SipMessageType::Invalid => "Invalid",
        };
        write!(f, "{}", name)
    }
}

/// Request method. Meaningful only when the message type is
/// [`SipMessageType::Request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SipMethod {
    /// Begin a call
    Invite = 0,
    /// End a call
    Bye = 1,
    /// Confirm a final response
    Ack = 2,
    /// Cancel a pending request
    Cancel = 3,
    /// Unset
    Invalid = 4,
}

impl SipMethod {
    fn from_wire(octet: u8) -> Result<Self, WireError> {
        match octet {
            0 => Ok(SipMethod::Invite),
            1 => Ok(SipMethod::Bye),
            2 => Ok(SipMethod::Ack),
            3 => Ok(SipMethod::Cancel),
            4 => Ok(SipMethod::Invalid),
            other => Err(WireError::InvalidMethod(other)),
        }
    }
}

impl fmt::Display for SipMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SipMethod::Invite => "INVITE",
            SipMethod::Bye => "BYE",
            SipMethod::Ack => "ACK",
            SipMethod::Cancel => "CANCEL",
            SipMethod::Invalid => "Invalid",
        };
        write!(f, "{}", name)
    }
}

/// Human-readable name for the status codes this engine uses.
pub fn status_code_name(status_code: u16) -> &'static str {
    match status_code {
        100 => "100 Trying",
        200 => "200 OK",
        408 => "408 Request Timeout",
        _ => "Unknown",
    }
}

/// The fixed 18-byte signalling header.
///
/// A request carries `method` and `request_uri`; a response carries
/// `status_code`. `from` and `to` are *not* swapped on a response, by
/// design: a response matches its request's transaction precisely because
/// it repeats the request's (from, to) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SipHeader {
    /// Request or response discriminator
    pub message_type: SipMessageType,
    /// Request method (requests only)
    pub method: SipMethod,
    /// Response status code (responses only)
    pub status_code: u16,
    /// Request target URI (requests only)
    pub request_uri: u32,
    /// Originating endpoint URI
    pub from: u32,
    /// Destination endpoint URI
    pub to: u32,
    /// Call identifier scoping the whole exchange
    pub call_id: u16,
}

impl Default for SipHeader {
    fn default() -> Self {
        SipHeader {
            message_type: SipMessageType::Invalid,
            method: SipMethod::Invalid,
            status_code: INVALID_STATUS_CODE,
            request_uri: INVALID_URI,
            from: INVALID_URI,
            to: INVALID_URI,
            call_id: INVALID_CALL_ID,
        }
    }
}

impl SipHeader {
    /// Build a request header.
    pub fn request(method: SipMethod, request_uri: u32, from: u32, to: u32, call_id: u16) -> Self {
        SipHeader {
            message_type: SipMessageType::Request,
            method,
            request_uri,
            from,
            to,
            call_id,
            ..Default::default()
        }
    }

    /// Build a response header.
    pub fn response(status_code: u16, from: u32, to: u32, call_id: u16) -> Self {
        SipHeader {
            message_type: SipMessageType::Response,
            status_code,
            from,
            to,
            call_id,
            ..Default::default()
        }
    }

    /// Append the serialized header to `buf` in network byte order.
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(self.message_type as u8);
        buf.put_u8(self.method as u8);
        buf.put_u16(self.status_code);
        buf.put_u32(self.request_uri);
        buf.put_u32(self.from);
        buf.put_u32(self.to);
        buf.put_u16(self.call_id);
    }

    /// Serialize the header followed by `payload` into a fresh buffer.
    ///
    /// This is the "add header to packet" step every outbound message goes
    /// through before it reaches the transport callback.
    pub fn encode_with_payload(&self, payload: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(SERIALIZED_LEN + payload.len());
        self.encode(&mut buf);
        buf.put_slice(payload);
        buf.freeze()
    }

    /// Read a header from the front of `buf`, consuming exactly
    /// [`SERIALIZED_LEN`] bytes on success.
    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self, WireError> {
        if buf.remaining() < SERIALIZED_LEN {
            return Err(WireError::Truncated {
                needed: SERIALIZED_LEN,
                have: buf.remaining(),
            });
        }
        let message_type = SipMessageType::from_wire(buf.get_u8())?;
        let method = SipMethod::from_wire(buf.get_u8())?;
        Ok(SipHeader {
            message_type,
            method,
            status_code: buf.get_u16(),
            request_uri: buf.get_u32(),
            from: buf.get_u32(),
            to: buf.get_u32(),
            call_id: buf.get_u16(),
        })
    }
}

impl fmt::Display for SipHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message_type {
            SipMessageType::Request => write!(
                f,
                "{} {} RequestUri={} ",
                self.message_type, self.method, self.request_uri
            )?,
            SipMessageType::Response => write!(
                f,
                "{} {} ",
                self.message_type,
                status_code_name(self.status_code)
            )?,
            SipMessageType::Invalid => write!(f, "{} ", self.message_type)?,
        }
        write!(f, "From={} To={} CallId={}", self.from, self.to, self.call_id)
    }
}
