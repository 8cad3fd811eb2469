//! SUBSCRIBE, SUBACK, UNSUBSCRIBE and UNSUBACK.

use super::buf::{Decoder, put_string, put_u16};
use super::property::{Property, put_properties_for, read_properties_for};
use super::{Error, QoS, ReasonCode, Version};
use alloc::string::String;
use alloc::vec::Vec;

/// When the server sends retained messages for a new subscription (v5).
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RetainHandling {
    /// Send retained messages at subscribe time.
    #[default]
    OnSubscribe = 0,
    /// Send only if the subscription did not already exist.
    OnNewSubscribe = 1,
    /// Never send retained messages.
    Never = 2,
}

/// The options byte following each SUBSCRIBE topic filter.
///
/// ```rust
/// use libmqtt::codec::{QoS, RetainHandling, SubscriptionOptions};
///
/// let options = SubscriptionOptions {
///     qos: QoS::AtLeastOnce,
///     no_local: true,
///     retain_as_published: false,
///     retain_handling: RetainHandling::Never,
/// };
/// assert_eq!(options.to_byte(), 0b0010_0101);
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SubscriptionOptions {
    /// Maximum QoS the client accepts.
    pub qos: QoS,
    /// Do not forward the client's own publishes back to it (v5).
    pub no_local: bool,
    /// Keep the retain flag as published (v5).
    pub retain_as_published: bool,
    /// Retained message policy (v5).
    pub retain_handling: RetainHandling,
}

impl SubscriptionOptions {
    const QOS_MASK: u8 = 0b0000_0011;
    const NO_LOCAL: u8 = 0b0000_0100;
    const RETAIN_AS_PUBLISHED: u8 = 0b0000_1000;
    const RETAIN_HANDLING_MASK: u8 = 0b0011_0000;
    const RETAIN_HANDLING_SHIFT: u8 = 4;

    /// Options requesting `qos` with every v5 flag cleared.
    pub fn qos(qos: QoS) -> Self {
        Self {
            qos,
            ..Default::default()
        }
    }

    /// Pack into the wire byte.
    pub fn to_byte(self) -> u8 {
        let mut byte = self.qos as u8;
        if self.no_local {
            byte |= Self::NO_LOCAL;
        }
        if self.retain_as_published {
            byte |= Self::RETAIN_AS_PUBLISHED;
        }
        byte | ((self.retain_handling as u8) << Self::RETAIN_HANDLING_SHIFT)
    }

    /// Unpack a wire byte. 3.1.1 only defines the QoS bits.
    pub fn from_byte(byte: u8, version: Version) -> Result<Self, Error> {
        let allowed = if version.is_v5() {
            Self::QOS_MASK | Self::NO_LOCAL | Self::RETAIN_AS_PUBLISHED | Self::RETAIN_HANDLING_MASK
        } else {
            Self::QOS_MASK
        };
        if byte & !allowed != 0 {
            return Err(Error::InvalidFlags(byte));
        }
        let retain_handling = match (byte & Self::RETAIN_HANDLING_MASK) >> Self::RETAIN_HANDLING_SHIFT {
            0 => RetainHandling::OnSubscribe,
            1 => RetainHandling::OnNewSubscribe,
            2 => RetainHandling::Never,
            _ => return Err(Error::InvalidFlags(byte)),
        };
        Ok(Self {
            qos: QoS::try_from(byte & Self::QOS_MASK)?,
            no_local: byte & Self::NO_LOCAL != 0,
            retain_as_published: byte & Self::RETAIN_AS_PUBLISHED != 0,
            retain_handling,
        })
    }
}

/// A topic filter and its options.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Filter {
    /// Topic filter, wildcards passed through uninterpreted.
    pub path: String,
    /// Requested options.
    pub options: SubscriptionOptions,
}

impl Filter {
    /// Filter at `qos` with default options.
    pub fn new(path: impl Into<String>, qos: QoS) -> Self {
        Self {
            path: path.into(),
            options: SubscriptionOptions::qos(qos),
        }
    }
}

/// Subscribe request.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Subscribe {
    /// Nonzero packet identifier.
    pub packet_id: u16,
    /// SUBSCRIBE properties (v5).
    pub properties: Vec<Property>,
    /// At least one filter.
    pub filters: Vec<Filter>,
}

impl Subscribe {
    pub(crate) fn encode_body(&self, buf: &mut Vec<u8>, version: Version) -> Result<(), Error> {
        check_id(self.packet_id)?;
        if self.filters.is_empty() {
            return Err(Error::EmptyPayload);
        }
        put_u16(buf, self.packet_id);
        put_properties_for(buf, &self.properties, version)?;
        for filter in &self.filters {
            put_string(buf, &filter.path)?;
            buf.push(filter.options.to_byte());
        }
        Ok(())
    }

    pub(crate) fn decode_body(body: &[u8], version: Version) -> Result<Self, Error> {
        let mut dec = Decoder::new(body);
        let packet_id = check_id(dec.read_u16()?)?;
        let properties = read_properties_for(&mut dec, version)?;
        let mut filters = Vec::new();
        while !dec.is_empty() {
            let path = dec.read_string()?;
            let options = SubscriptionOptions::from_byte(dec.read_u8()?, version)?;
            filters.push(Filter { path, options });
        }
        if filters.is_empty() {
            return Err(Error::EmptyPayload);
        }
        Ok(Self {
            packet_id,
            properties,
            filters,
        })
    }
}

/// Subscribe acknowledgment, one code per requested filter in request order.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct SubAck {
    /// Identifier of the SUBSCRIBE being acknowledged.
    pub packet_id: u16,
    /// SUBACK properties (v5).
    pub properties: Vec<Property>,
    /// Granted QoS or failure per filter.
    pub codes: Vec<ReasonCode>,
}

impl SubAck {
    pub(crate) fn encode_body(&self, buf: &mut Vec<u8>, version: Version) -> Result<(), Error> {
        check_id(self.packet_id)?;
        put_u16(buf, self.packet_id);
        put_properties_for(buf, &self.properties, version)?;
        for code in &self.codes {
            buf.push(code.check_suback(version.is_v5())?.value());
        }
        Ok(())
    }

    pub(crate) fn decode_body(body: &[u8], version: Version) -> Result<Self, Error> {
        let mut dec = Decoder::new(body);
        let packet_id = check_id(dec.read_u16()?)?;
        let properties = read_properties_for(&mut dec, version)?;
        let codes = dec
            .rest()
            .iter()
            .map(|&byte| ReasonCode(byte).check_suback(version.is_v5()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            packet_id,
            properties,
            codes,
        })
    }
}

/// Unsubscribe request.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Unsubscribe {
    /// Nonzero packet identifier.
    pub packet_id: u16,
    /// UNSUBSCRIBE properties (v5).
    pub properties: Vec<Property>,
    /// At least one filter.
    pub filters: Vec<String>,
}

impl Unsubscribe {
    pub(crate) fn encode_body(&self, buf: &mut Vec<u8>, version: Version) -> Result<(), Error> {
        check_id(self.packet_id)?;
        if self.filters.is_empty() {
            return Err(Error::EmptyPayload);
        }
        put_u16(buf, self.packet_id);
        put_properties_for(buf, &self.properties, version)?;
        for filter in &self.filters {
            put_string(buf, filter)?;
        }
        Ok(())
    }

    pub(crate) fn decode_body(body: &[u8], version: Version) -> Result<Self, Error> {
        let mut dec = Decoder::new(body);
        let packet_id = check_id(dec.read_u16()?)?;
        let properties = read_properties_for(&mut dec, version)?;
        let mut filters = Vec::new();
        while !dec.is_empty() {
            filters.push(dec.read_string()?);
        }
        if filters.is_empty() {
            return Err(Error::EmptyPayload);
        }
        Ok(Self {
            packet_id,
            properties,
            filters,
        })
    }
}

/// Unsubscribe acknowledgment.
///
/// 3.1.1 carries only the packet identifier, so `codes` is always empty there.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct UnsubAck {
    /// Identifier of the UNSUBSCRIBE being acknowledged.
    pub packet_id: u16,
    /// UNSUBACK properties (v5).
    pub properties: Vec<Property>,
    /// One reason code per filter (v5).
    pub codes: Vec<ReasonCode>,
}

impl UnsubAck {
    pub(crate) fn encode_body(&self, buf: &mut Vec<u8>, version: Version) -> Result<(), Error> {
        check_id(self.packet_id)?;
        put_u16(buf, self.packet_id);
        if !version.is_v5() {
            return if self.codes.is_empty() && self.properties.is_empty() {
                Ok(())
            } else {
                Err(Error::Unsupported)
            };
        }
        put_properties_for(buf, &self.properties, version)?;
        for code in &self.codes {
            buf.push(code.check_v5()?.value());
        }
        Ok(())
    }

    pub(crate) fn decode_body(body: &[u8], version: Version) -> Result<Self, Error> {
        let mut dec = Decoder::new(body);
        let packet_id = check_id(dec.read_u16()?)?;
        let properties = read_properties_for(&mut dec, version)?;
        let mut codes = Vec::new();
        if version.is_v5() {
            for &byte in dec.rest() {
                codes.push(ReasonCode(byte).check_v5()?);
            }
        }
        dec.finish()?;
        Ok(Self {
            packet_id,
            properties,
            codes,
        })
    }
}

fn check_id(packet_id: u16) -> Result<u16, Error> {
    if packet_id == 0 {
        Err(Error::InvalidPacketId)
    } else {
        Ok(packet_id)
    }
}
