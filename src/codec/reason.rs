//! Reason codes for acknowledgments, DISCONNECT and AUTH.
//!
//! MQTT 5 reuses numeric values with context-dependent meaning (`0x00` is both
//! "Success" and "Granted QoS 0"), so reason codes are a transparent byte with
//! named constants rather than a closed enum. MQTT 3.1.1 CONNACK return codes and
//! SUBACK granted-QoS / failure bytes fit the same representation.

use super::{Error, QoS};
use core::fmt;

/// A one-byte reason code.
///
/// ```rust
/// use libmqtt::codec::ReasonCode;
///
/// assert!(ReasonCode::SUCCESS.is_success());
/// assert!(ReasonCode::UNSPECIFIED_ERROR.is_error());
/// assert_eq!(ReasonCode::GRANTED_QOS_1.granted_qos().map(|q| q as u8), Some(1));
/// ```
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReasonCode(pub u8);

#[allow(missing_docs)]
impl ReasonCode {
    pub const SUCCESS: Self = Self(0x00);
    pub const NORMAL_DISCONNECTION: Self = Self(0x00);
    pub const GRANTED_QOS_0: Self = Self(0x00);
    pub const GRANTED_QOS_1: Self = Self(0x01);
    pub const GRANTED_QOS_2: Self = Self(0x02);
    pub const DISCONNECT_WITH_WILL: Self = Self(0x04);
    pub const NO_MATCHING_SUBSCRIBERS: Self = Self(0x10);
    pub const NO_SUBSCRIPTION_EXISTED: Self = Self(0x11);
    pub const CONTINUE_AUTHENTICATION: Self = Self(0x18);
    pub const RE_AUTHENTICATE: Self = Self(0x19);
    pub const UNSPECIFIED_ERROR: Self = Self(0x80);
    pub const MALFORMED_PACKET: Self = Self(0x81);
    pub const PROTOCOL_ERROR: Self = Self(0x82);
    pub const IMPLEMENTATION_SPECIFIC_ERROR: Self = Self(0x83);
    pub const UNSUPPORTED_PROTOCOL_VERSION: Self = Self(0x84);
    pub const CLIENT_IDENTIFIER_NOT_VALID: Self = Self(0x85);
    pub const BAD_USER_NAME_OR_PASSWORD: Self = Self(0x86);
    pub const NOT_AUTHORIZED: Self = Self(0x87);
    pub const SERVER_UNAVAILABLE: Self = Self(0x88);
    pub const SERVER_BUSY: Self = Self(0x89);
    pub const BANNED: Self = Self(0x8A);
    pub const SERVER_SHUTTING_DOWN: Self = Self(0x8B);
    pub const BAD_AUTHENTICATION_METHOD: Self = Self(0x8C);
    pub const KEEP_ALIVE_TIMEOUT: Self = Self(0x8D);
    pub const SESSION_TAKEN_OVER: Self = Self(0x8E);
    pub const TOPIC_FILTER_INVALID: Self = Self(0x8F);
    pub const TOPIC_NAME_INVALID: Self = Self(0x90);
    pub const PACKET_IDENTIFIER_IN_USE: Self = Self(0x91);
    pub const PACKET_IDENTIFIER_NOT_FOUND: Self = Self(0x92);
    pub const RECEIVE_MAXIMUM_EXCEEDED: Self = Self(0x93);
    pub const TOPIC_ALIAS_INVALID: Self = Self(0x94);
    pub const PACKET_TOO_LARGE: Self = Self(0x95);
    pub const MESSAGE_RATE_TOO_HIGH: Self = Self(0x96);
    pub const QUOTA_EXCEEDED: Self = Self(0x97);
    pub const ADMINISTRATIVE_ACTION: Self = Self(0x98);
    pub const PAYLOAD_FORMAT_INVALID: Self = Self(0x99);
    pub const RETAIN_NOT_SUPPORTED: Self = Self(0x9A);
    pub const QOS_NOT_SUPPORTED: Self = Self(0x9B);
    pub const USE_ANOTHER_SERVER: Self = Self(0x9C);
    pub const SERVER_MOVED: Self = Self(0x9D);
    pub const SHARED_SUBSCRIPTIONS_NOT_SUPPORTED: Self = Self(0x9E);
    pub const CONNECTION_RATE_EXCEEDED: Self = Self(0x9F);
    pub const MAXIMUM_CONNECT_TIME: Self = Self(0xA0);
    pub const SUBSCRIPTION_IDENTIFIERS_NOT_SUPPORTED: Self = Self(0xA1);
    pub const WILDCARD_SUBSCRIPTIONS_NOT_SUPPORTED: Self = Self(0xA2);

    /// MQTT 3.1.1 SUBACK failure byte.
    pub const SUBSCRIBE_FAILURE: Self = Self(0x80);

    /// The raw byte.
    pub fn value(self) -> u8 {
        self.0
    }

    /// `0x00`.
    pub fn is_success(self) -> bool {
        self.0 == 0x00
    }

    /// Codes `0x80` and above signal failure.
    pub fn is_error(self) -> bool {
        self.0 >= 0x80
    }

    /// The granted QoS when this is a SUBACK success code.
    pub fn granted_qos(self) -> Option<QoS> {
        QoS::try_from(self.0).ok()
    }

    /// SUBACK success code for `qos`.
    pub fn granted(qos: QoS) -> Self {
        Self(qos as u8)
    }

    /// Whether the byte is one of the codes MQTT 5 defines.
    pub fn is_defined_v5(self) -> bool {
        matches!(
            self.0,
            0x00 | 0x01 | 0x02 | 0x04 | 0x10 | 0x11 | 0x18 | 0x19 | 0x80..=0xA2
        )
    }

    /// Validate a SUBACK payload byte.
    ///
    /// MQTT 3.1.1 allows a granted QoS or `0x80`. MQTT 5 allows any defined
    /// reason code.
    pub(crate) fn check_suback(self, v5: bool) -> Result<Self, Error> {
        let valid = if v5 {
            self.is_defined_v5()
        } else {
            matches!(self.0, 0x00 | 0x01 | 0x02 | 0x80)
        };
        if valid {
            Ok(self)
        } else {
            Err(Error::InvalidReasonCode(self.0))
        }
    }

    /// Validate a v5 reason code byte.
    pub(crate) fn check_v5(self) -> Result<Self, Error> {
        if self.is_defined_v5() {
            Ok(self)
        } else {
            Err(Error::InvalidReasonCode(self.0))
        }
    }
}

impl From<u8> for ReasonCode {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// How much of the optional tail of a v5 acknowledgment, DISCONNECT or AUTH
/// body is present on the wire.
///
/// Peers may send a success reason byte or an empty property block that the
/// shortest encoding leaves out. Decoding records such a longer form so
/// encoding reproduces it. Content that needs a longer form always gets one,
/// so `Minimal` means "whatever the content requires".
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReasonForm {
    /// Shortest form that carries the content.
    #[default]
    Minimal,
    /// Reason code byte, no property length.
    Reason,
    /// Reason code byte and property length, even when zero.
    Properties,
}

impl ReasonForm {
    /// The shortest form that can carry `reason` and `properties`.
    pub(crate) fn required(reason: ReasonCode, has_properties: bool) -> Self {
        if has_properties {
            Self::Properties
        } else if !reason.is_success() {
            Self::Reason
        } else {
            Self::Minimal
        }
    }

    /// The form to record for a decoded body: `Minimal` unless the peer sent
    /// more than the content requires.
    pub(crate) fn seen(self, reason: ReasonCode, has_properties: bool) -> Self {
        if self > Self::required(reason, has_properties) {
            self
        } else {
            Self::Minimal
        }
    }

    /// The form to encode: at least what the content requires.
    pub(crate) fn effective(self, reason: ReasonCode, has_properties: bool) -> Self {
        self.max(Self::required(reason, has_properties))
    }
}

/// MQTT 3.1.1 CONNACK return codes.
#[allow(missing_docs)]
pub mod connect_return {
    use super::ReasonCode;

    pub const ACCEPTED: ReasonCode = ReasonCode(0);
    pub const UNACCEPTABLE_PROTOCOL_VERSION: ReasonCode = ReasonCode(1);
    pub const IDENTIFIER_REJECTED: ReasonCode = ReasonCode(2);
    pub const SERVER_UNAVAILABLE: ReasonCode = ReasonCode(3);
    pub const BAD_USERNAME_OR_PASSWORD: ReasonCode = ReasonCode(4);
    pub const NOT_AUTHORIZED: ReasonCode = ReasonCode(5);
}
