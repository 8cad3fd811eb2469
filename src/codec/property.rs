//! MQTT 5 properties.
//!
//! A property block is a VBI byte length followed by `(identifier, value)` pairs.
//! The value layout depends on the identifier. Properties are kept as an ordered
//! list so a decoded frame re-encodes byte for byte.

use super::buf::{Decoder, put_binary, put_len, put_string, put_u16, put_u32};
use super::varint::put_vbi;
use super::{Error, Version};
use alloc::string::String;
use alloc::vec::Vec;

/// A single typed v5 property.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Property {
    /// 0x01, byte.
    PayloadFormatIndicator(u8),
    /// 0x02, four byte integer.
    MessageExpiryInterval(u32),
    /// 0x03, UTF-8 string.
    ContentType(String),
    /// 0x08, UTF-8 string.
    ResponseTopic(String),
    /// 0x09, binary data.
    CorrelationData(Vec<u8>),
    /// 0x0B, variable byte integer.
    SubscriptionIdentifier(u32),
    /// 0x11, four byte integer.
    SessionExpiryInterval(u32),
    /// 0x12, UTF-8 string.
    AssignedClientIdentifier(String),
    /// 0x13, two byte integer.
    ServerKeepAlive(u16),
    /// 0x15, UTF-8 string.
    AuthenticationMethod(String),
    /// 0x16, binary data.
    AuthenticationData(Vec<u8>),
    /// 0x17, byte.
    RequestProblemInformation(u8),
    /// 0x18, four byte integer.
    WillDelayInterval(u32),
    /// 0x19, byte.
    RequestResponseInformation(u8),
    /// 0x1A, UTF-8 string.
    ResponseInformation(String),
    /// 0x1C, UTF-8 string.
    ServerReference(String),
    /// 0x1F, UTF-8 string.
    ReasonString(String),
    /// 0x21, two byte integer.
    ReceiveMaximum(u16),
    /// 0x22, two byte integer.
    TopicAliasMaximum(u16),
    /// 0x23, two byte integer.
    TopicAlias(u16),
    /// 0x24, byte.
    MaximumQoS(u8),
    /// 0x25, byte.
    RetainAvailable(u8),
    /// 0x26, UTF-8 string pair. May repeat.
    UserProperty(String, String),
    /// 0x27, four byte integer.
    MaximumPacketSize(u32),
    /// 0x28, byte.
    WildcardSubscriptionAvailable(u8),
    /// 0x29, byte.
    SubscriptionIdentifierAvailable(u8),
    /// 0x2A, byte.
    SharedSubscriptionAvailable(u8),
}

impl Property {
    /// The one-byte property identifier.
    pub fn identifier(&self) -> u8 {
        match self {
            Property::PayloadFormatIndicator(_) => 0x01,
            Property::MessageExpiryInterval(_) => 0x02,
            Property::ContentType(_) => 0x03,
            Property::ResponseTopic(_) => 0x08,
            Property::CorrelationData(_) => 0x09,
            Property::SubscriptionIdentifier(_) => 0x0B,
            Property::SessionExpiryInterval(_) => 0x11,
            Property::AssignedClientIdentifier(_) => 0x12,
            Property::ServerKeepAlive(_) => 0x13,
            Property::AuthenticationMethod(_) => 0x15,
            Property::AuthenticationData(_) => 0x16,
            Property::RequestProblemInformation(_) => 0x17,
            Property::WillDelayInterval(_) => 0x18,
            Property::RequestResponseInformation(_) => 0x19,
            Property::ResponseInformation(_) => 0x1A,
            Property::ServerReference(_) => 0x1C,
            Property::ReasonString(_) => 0x1F,
            Property::ReceiveMaximum(_) => 0x21,
            Property::TopicAliasMaximum(_) => 0x22,
            Property::TopicAlias(_) => 0x23,
            Property::MaximumQoS(_) => 0x24,
            Property::RetainAvailable(_) => 0x25,
            Property::UserProperty(_, _) => 0x26,
            Property::MaximumPacketSize(_) => 0x27,
            Property::WildcardSubscriptionAvailable(_) => 0x28,
            Property::SubscriptionIdentifierAvailable(_) => 0x29,
            Property::SharedSubscriptionAvailable(_) => 0x2A,
        }
    }

    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), Error> {
        buf.push(self.identifier());
        match self {
            Property::PayloadFormatIndicator(v)
            | Property::RequestProblemInformation(v)
            | Property::RequestResponseInformation(v)
            | Property::MaximumQoS(v)
            | Property::RetainAvailable(v)
            | Property::WildcardSubscriptionAvailable(v)
            | Property::SubscriptionIdentifierAvailable(v)
            | Property::SharedSubscriptionAvailable(v) => buf.push(*v),
            Property::ServerKeepAlive(v)
            | Property::ReceiveMaximum(v)
            | Property::TopicAliasMaximum(v)
            | Property::TopicAlias(v) => put_u16(buf, *v),
            Property::MessageExpiryInterval(v)
            | Property::SessionExpiryInterval(v)
            | Property::WillDelayInterval(v)
            | Property::MaximumPacketSize(v) => put_u32(buf, *v),
            Property::SubscriptionIdentifier(v) => put_vbi(buf, *v)?,
            Property::ContentType(s)
            | Property::ResponseTopic(s)
            | Property::AssignedClientIdentifier(s)
            | Property::AuthenticationMethod(s)
            | Property::ResponseInformation(s)
            | Property::ServerReference(s)
            | Property::ReasonString(s) => put_string(buf, s)?,
            Property::CorrelationData(b) | Property::AuthenticationData(b) => put_binary(buf, b)?,
            Property::UserProperty(k, v) => {
                put_string(buf, k)?;
                put_string(buf, v)?;
            }
        }
        Ok(())
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, Error> {
        let id = dec.read_u8()?;
        Ok(match id {
            0x01 => Property::PayloadFormatIndicator(dec.read_u8()?),
            0x02 => Property::MessageExpiryInterval(dec.read_u32()?),
            0x03 => Property::ContentType(dec.read_string()?),
            0x08 => Property::ResponseTopic(dec.read_string()?),
            0x09 => Property::CorrelationData(dec.read_binary()?),
            0x0B => Property::SubscriptionIdentifier(dec.read_vbi()?),
            0x11 => Property::SessionExpiryInterval(dec.read_u32()?),
            0x12 => Property::AssignedClientIdentifier(dec.read_string()?),
            0x13 => Property::ServerKeepAlive(dec.read_u16()?),
            0x15 => Property::AuthenticationMethod(dec.read_string()?),
            0x16 => Property::AuthenticationData(dec.read_binary()?),
            0x17 => Property::RequestProblemInformation(dec.read_u8()?),
            0x18 => Property::WillDelayInterval(dec.read_u32()?),
            0x19 => Property::RequestResponseInformation(dec.read_u8()?),
            0x1A => Property::ResponseInformation(dec.read_string()?),
            0x1C => Property::ServerReference(dec.read_string()?),
            0x1F => Property::ReasonString(dec.read_string()?),
            0x21 => Property::ReceiveMaximum(dec.read_u16()?),
            0x22 => Property::TopicAliasMaximum(dec.read_u16()?),
            0x23 => Property::TopicAlias(dec.read_u16()?),
            0x24 => Property::MaximumQoS(dec.read_u8()?),
            0x25 => Property::RetainAvailable(dec.read_u8()?),
            0x26 => Property::UserProperty(dec.read_string()?, dec.read_string()?),
            0x27 => Property::MaximumPacketSize(dec.read_u32()?),
            0x28 => Property::WildcardSubscriptionAvailable(dec.read_u8()?),
            0x29 => Property::SubscriptionIdentifierAvailable(dec.read_u8()?),
            0x2A => Property::SharedSubscriptionAvailable(dec.read_u8()?),
            other => return Err(Error::UnknownProperty(other)),
        })
    }
}

/// Encode a property block (length prefix included).
pub(crate) fn put_properties(buf: &mut Vec<u8>, properties: &[Property]) -> Result<(), Error> {
    let mut body = Vec::new();
    for property in properties {
        property.encode(&mut body)?;
    }
    put_len(buf, body.len())?;
    buf.extend_from_slice(&body);
    Ok(())
}

/// Encode a property block only for v5.
pub(crate) fn put_properties_for(
    buf: &mut Vec<u8>,
    properties: &[Property],
    version: Version,
) -> Result<(), Error> {
    if version.is_v5() {
        put_properties(buf, properties)
    } else if properties.is_empty() {
        Ok(())
    } else {
        Err(Error::Unsupported)
    }
}

/// Decode a property block (length prefix included).
///
/// Parsing stops at the first unrecognized identifier, failing the frame with
/// [`Error::UnknownProperty`].
pub(crate) fn read_properties(dec: &mut Decoder<'_>) -> Result<Vec<Property>, Error> {
    let len = dec.read_vbi()? as usize;
    let mut block = dec.sub(len)?;
    let mut properties = Vec::new();
    while !block.is_empty() {
        properties.push(Property::decode(&mut block)?);
    }
    Ok(properties)
}

/// Decode a property block only for v5.
pub(crate) fn read_properties_for(
    dec: &mut Decoder<'_>,
    version: Version,
) -> Result<Vec<Property>, Error> {
    if version.is_v5() {
        read_properties(dec)
    } else {
        Ok(Vec::new())
    }
}
