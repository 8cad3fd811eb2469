//! Fixed header: packet type nibble, flag bits, QoS levels and protocol versions.

use super::Error;
use core::fmt;
use serde::Deserialize;

/// MQTT protocol version, carried as the CONNECT protocol level byte.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Deserialize)]
#[serde(try_from = "u8")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Version {
    /// MQTT 3.1.1 (protocol level 4).
    #[default]
    V311 = 4,
    /// MQTT 5.0 (protocol level 5).
    V5 = 5,
}

impl Version {
    /// The protocol level byte written in CONNECT.
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Whether frames carry v5 properties and reason codes.
    pub fn is_v5(self) -> bool {
        self == Version::V5
    }
}

impl TryFrom<u8> for Version {
    type Error = Error;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            4 => Ok(Version::V311),
            5 => Ok(Version::V5),
            _ => Err(Error::InvalidProtocol),
        }
    }
}

/// Quality of Service levels for MQTT messages.
///
/// ```rust
/// use libmqtt::codec::QoS;
///
/// assert_eq!(QoS::AtMostOnce as u8, 0);
/// assert_eq!(QoS::try_from(2), Ok(QoS::ExactlyOnce));
/// assert!(QoS::try_from(3).is_err());
/// ```
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QoS {
    /// At most once delivery. Fire and forget.
    #[default]
    AtMostOnce = 0,
    /// At least once delivery, acknowledged by PUBACK.
    AtLeastOnce = 1,
    /// Exactly once delivery via PUBREC / PUBREL / PUBCOMP.
    ExactlyOnce = 2,
}

impl TryFrom<u8> for QoS {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(Error::InvalidQoS(other)),
        }
    }
}

/// MQTT control packet types, the high nibble of the fixed header.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketType {
    /// Client request to connect.
    Connect = 1,
    /// Connect acknowledgment.
    ConnAck = 2,
    /// Publish message.
    Publish = 3,
    /// QoS 1 publish acknowledgment.
    PubAck = 4,
    /// QoS 2 publish received.
    PubRec = 5,
    /// QoS 2 publish release.
    PubRel = 6,
    /// QoS 2 publish complete.
    PubComp = 7,
    /// Subscribe request.
    Subscribe = 8,
    /// Subscribe acknowledgment.
    SubAck = 9,
    /// Unsubscribe request.
    Unsubscribe = 10,
    /// Unsubscribe acknowledgment.
    UnsubAck = 11,
    /// Ping request.
    PingReq = 12,
    /// Ping response.
    PingResp = 13,
    /// Disconnect notification.
    Disconnect = 14,
    /// Authentication exchange (v5 only).
    Auth = 15,
}

impl PacketType {
    /// Look up a packet type by its nibble.
    pub fn from_nibble(nibble: u8) -> Result<Self, Error> {
        Ok(match nibble {
            1 => PacketType::Connect,
            2 => PacketType::ConnAck,
            3 => PacketType::Publish,
            4 => PacketType::PubAck,
            5 => PacketType::PubRec,
            6 => PacketType::PubRel,
            7 => PacketType::PubComp,
            8 => PacketType::Subscribe,
            9 => PacketType::SubAck,
            10 => PacketType::Unsubscribe,
            11 => PacketType::UnsubAck,
            12 => PacketType::PingReq,
            13 => PacketType::PingResp,
            14 => PacketType::Disconnect,
            15 => PacketType::Auth,
            other => return Err(Error::UnknownPacketType(other)),
        })
    }

    /// The fixed low nibble this type must carry. PUBLISH has none.
    pub fn required_flags(self) -> Option<u8> {
        match self {
            PacketType::Publish => None,
            PacketType::PubRel | PacketType::Subscribe | PacketType::Unsubscribe => Some(0b0010),
            _ => Some(0),
        }
    }

    /// Upper-case protocol name, e.g. `"PUBLISH"`.
    pub fn as_str(self) -> &'static str {
        match self {
            PacketType::Connect => "CONNECT",
            PacketType::ConnAck => "CONNACK",
            PacketType::Publish => "PUBLISH",
            PacketType::PubAck => "PUBACK",
            PacketType::PubRec => "PUBREC",
            PacketType::PubRel => "PUBREL",
            PacketType::PubComp => "PUBCOMP",
            PacketType::Subscribe => "SUBSCRIBE",
            PacketType::SubAck => "SUBACK",
            PacketType::Unsubscribe => "UNSUBSCRIBE",
            PacketType::UnsubAck => "UNSUBACK",
            PacketType::PingReq => "PINGREQ",
            PacketType::PingResp => "PINGRESP",
            PacketType::Disconnect => "DISCONNECT",
            PacketType::Auth => "AUTH",
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The first byte of every frame.
///
/// Bits 7-4 hold the packet type, bit 3 DUP, bits 2-1 QoS and bit 0 RETAIN. Each
/// setter masks its own bits and leaves the others untouched.
///
/// ```rust
/// use libmqtt::codec::{HeaderFlags, PacketType, QoS};
///
/// let mut flags = HeaderFlags::new(PacketType::Publish);
/// flags.set_qos(QoS::ExactlyOnce);
/// flags.set_retain(true);
/// flags.set_dup(true);
/// assert_eq!(flags.bits(), 0x3D);
///
/// flags.set_qos(QoS::AtLeastOnce);
/// assert!(flags.dup() && flags.retain());
/// assert_eq!(flags.bits(), 0x3B);
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HeaderFlags(u8);

impl HeaderFlags {
    const TYPE_MASK: u8 = 0xF0;
    const DUP_MASK: u8 = 0b0000_1000;
    const QOS_MASK: u8 = 0b0000_0110;
    const QOS_SHIFT: u8 = 1;
    const RETAIN_MASK: u8 = 0b0000_0001;

    /// Header for `packet_type` with its mandatory low nibble.
    pub fn new(packet_type: PacketType) -> Self {
        let low = packet_type.required_flags().unwrap_or(0);
        Self(((packet_type as u8) << 4) | low)
    }

    /// Wrap a raw header byte.
    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// The raw header byte.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// The packet type nibble, unvalidated.
    pub fn type_nibble(self) -> u8 {
        (self.0 & Self::TYPE_MASK) >> 4
    }

    /// The low four flag bits.
    pub fn low_nibble(self) -> u8 {
        self.0 & 0x0F
    }

    /// Decoded packet type.
    pub fn packet_type(self) -> Result<PacketType, Error> {
        PacketType::from_nibble(self.type_nibble())
    }

    /// DUP flag, meaningful for PUBLISH only.
    pub fn dup(self) -> bool {
        self.0 & Self::DUP_MASK != 0
    }

    /// Set or clear DUP.
    pub fn set_dup(&mut self, dup: bool) {
        self.0 = (self.0 & !Self::DUP_MASK) | if dup { Self::DUP_MASK } else { 0 };
    }

    /// QoS bits.
    pub fn qos(self) -> Result<QoS, Error> {
        QoS::try_from((self.0 & Self::QOS_MASK) >> Self::QOS_SHIFT)
    }

    /// Replace the QoS bits.
    pub fn set_qos(&mut self, qos: QoS) {
        self.0 = (self.0 & !Self::QOS_MASK) | ((qos as u8) << Self::QOS_SHIFT);
    }

    /// RETAIN flag.
    pub fn retain(self) -> bool {
        self.0 & Self::RETAIN_MASK != 0
    }

    /// Set or clear RETAIN.
    pub fn set_retain(&mut self, retain: bool) {
        self.0 = (self.0 & !Self::RETAIN_MASK) | if retain { Self::RETAIN_MASK } else { 0 };
    }

    /// Check the low nibble against the packet type's fixed value.
    pub(crate) fn validate(self, packet_type: PacketType) -> Result<(), Error> {
        match packet_type.required_flags() {
            Some(required) if required != self.low_nibble() => {
                Err(Error::InvalidFlags(self.0))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters_do_not_disturb_other_bits() {
        let mut flags = HeaderFlags::from_bits(0x3F & !0x06);
        flags.set_qos(QoS::AtLeastOnce);
        assert!(flags.dup());
        assert!(flags.retain());
        assert_eq!(flags.qos(), Ok(QoS::AtLeastOnce));

        flags.set_dup(false);
        assert_eq!(flags.qos(), Ok(QoS::AtLeastOnce));
        assert!(flags.retain());
        assert_eq!(flags.type_nibble(), 3);

        flags.set_retain(false);
        assert_eq!(flags.bits(), 0x32);
    }

    #[test]
    fn test_qos_three_is_invalid() {
        assert_eq!(HeaderFlags::from_bits(0x36).qos(), Err(Error::InvalidQoS(3)));
    }

    #[test]
    fn test_required_flags() {
        assert_eq!(HeaderFlags::new(PacketType::PubRel).bits(), 0x62);
        assert_eq!(HeaderFlags::new(PacketType::Subscribe).bits(), 0x82);
        assert_eq!(HeaderFlags::new(PacketType::Unsubscribe).bits(), 0xA2);
        assert_eq!(HeaderFlags::new(PacketType::PingReq).bits(), 0xC0);
        assert!(HeaderFlags::from_bits(0x60).validate(PacketType::PubRel).is_err());
        assert!(HeaderFlags::from_bits(0x3F).validate(PacketType::Publish).is_ok());
    }

    #[test]
    fn test_packet_type_nibbles() {
        for nibble in 1..=15u8 {
            let packet_type = PacketType::from_nibble(nibble).unwrap();
            assert_eq!(packet_type as u8, nibble);
        }
        assert_eq!(PacketType::from_nibble(0), Err(Error::UnknownPacketType(0)));
    }
}
