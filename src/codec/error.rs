//! Error types for frame encoding and decoding

use core::fmt;

/// A frame-level codec error.
///
/// Every variant except [`Error::MalformedVbi`] describes a problem confined to a
/// single frame: the caller may drop that frame and keep the connection. A
/// malformed variable byte integer in the fixed header means the stream can no
/// longer be delimited, which the [`reader`](crate::reader) escalates to a
/// [`FramingError`](crate::reader::FramingError).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The buffer ended before a declared field was complete.
    Truncated,
    /// A length-prefixed string was not valid UTF-8.
    InvalidUtf8,
    /// The packet type nibble is not defined for the protocol version.
    UnknownPacketType(u8),
    /// The body length disagrees with the remaining length in the fixed header,
    /// or bytes were left over after the last field.
    LengthMismatch,
    /// A variable byte integer used a fifth continuation byte.
    MalformedVbi,
    /// A v5 property identifier is not defined.
    UnknownProperty(u8),
    /// A QoS field held the reserved value 3.
    InvalidQoS(u8),
    /// A reason code is not valid in this position.
    InvalidReasonCode(u8),
    /// Fixed header flags or reserved bits do not match the packet type.
    InvalidFlags(u8),
    /// The CONNECT protocol name or level is not `MQTT` 4/5.
    InvalidProtocol,
    /// A PUBLISH topic name was empty.
    EmptyTopic,
    /// A packet identifier was zero where a nonzero one is required.
    InvalidPacketId,
    /// A SUBSCRIBE or UNSUBSCRIBE carried no topic filters.
    EmptyPayload,
    /// A value does not fit its wire representation.
    TooLarge,
    /// The frame is not defined for the protocol version (e.g. AUTH on 3.1.1).
    Unsupported,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Truncated => write!(f, "truncated frame"),
            Error::InvalidUtf8 => write!(f, "invalid UTF-8 string"),
            Error::UnknownPacketType(t) => write!(f, "unknown packet type {}", t),
            Error::LengthMismatch => write!(f, "length mismatch"),
            Error::MalformedVbi => write!(f, "malformed variable byte integer"),
            Error::UnknownProperty(id) => write!(f, "unknown property 0x{:02x}", id),
            Error::InvalidQoS(q) => write!(f, "invalid QoS {}", q),
            Error::InvalidReasonCode(c) => write!(f, "invalid reason code 0x{:02x}", c),
            Error::InvalidFlags(b) => write!(f, "invalid flags 0x{:02x}", b),
            Error::InvalidProtocol => write!(f, "invalid protocol name or level"),
            Error::EmptyTopic => write!(f, "empty topic name"),
            Error::InvalidPacketId => write!(f, "invalid packet identifier"),
            Error::EmptyPayload => write!(f, "no topic filters"),
            Error::TooLarge => write!(f, "value too large to encode"),
            Error::Unsupported => write!(f, "unsupported for protocol version"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Truncated => defmt::write!(f, "Truncated"),
            Error::InvalidUtf8 => defmt::write!(f, "InvalidUtf8"),
            Error::UnknownPacketType(t) => defmt::write!(f, "UnknownPacketType({})", t),
            Error::LengthMismatch => defmt::write!(f, "LengthMismatch"),
            Error::MalformedVbi => defmt::write!(f, "MalformedVbi"),
            Error::UnknownProperty(id) => defmt::write!(f, "UnknownProperty({=u8:#x})", id),
            Error::InvalidQoS(q) => defmt::write!(f, "InvalidQoS({})", q),
            Error::InvalidReasonCode(c) => defmt::write!(f, "InvalidReasonCode({=u8:#x})", c),
            Error::InvalidFlags(b) => defmt::write!(f, "InvalidFlags({=u8:#x})", b),
            Error::InvalidProtocol => defmt::write!(f, "InvalidProtocol"),
            Error::EmptyTopic => defmt::write!(f, "EmptyTopic"),
            Error::InvalidPacketId => defmt::write!(f, "InvalidPacketId"),
            Error::EmptyPayload => defmt::write!(f, "EmptyPayload"),
            Error::TooLarge => defmt::write!(f, "TooLarge"),
            Error::Unsupported => defmt::write!(f, "Unsupported"),
        }
    }
}
