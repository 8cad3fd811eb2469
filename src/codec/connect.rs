//! CONNECT and CONNACK.

use super::buf::{Decoder, put_binary, put_string, put_u16};
use super::property::{Property, put_properties_for, read_properties_for};
use super::{Error, QoS, ReasonCode, Version};
use alloc::string::String;
use alloc::vec::Vec;

const PROTOCOL_NAME: &str = "MQTT";

const USERNAME_FLAG: u8 = 0b1000_0000;
const PASSWORD_FLAG: u8 = 0b0100_0000;
const WILL_RETAIN_FLAG: u8 = 0b0010_0000;
const WILL_QOS_MASK: u8 = 0b0001_1000;
const WILL_QOS_SHIFT: u8 = 3;
const WILL_FLAG: u8 = 0b0000_0100;
const CLEAN_SESSION_FLAG: u8 = 0b0000_0010;
const RESERVED_FLAG: u8 = 0b0000_0001;

/// Last will and testament carried in CONNECT.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Will {
    /// Topic the will is published to.
    pub topic: String,
    /// Will message body.
    pub payload: Vec<u8>,
    /// Delivery QoS of the will.
    pub qos: QoS,
    /// Whether the broker retains the will.
    pub retain: bool,
    /// Will properties (v5).
    pub properties: Vec<Property>,
}

/// Client request to open a session.
///
/// The protocol level is part of the frame, so CONNECT is always encoded and
/// decoded with its own [`Version`] regardless of the version passed to
/// [`encode`](super::encode) / [`decode`](super::decode).
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Connect {
    /// Protocol level written after the protocol name.
    pub version: Version,
    /// Client identifier. May be empty when `clean_session` is set.
    pub client_id: String,
    /// Keep-alive interval in seconds.
    pub keep_alive: u16,
    /// Clean session (3.1.1) / clean start (5.0).
    pub clean_session: bool,
    /// Optional will message.
    pub will: Option<Will>,
    /// Optional user name.
    pub username: Option<String>,
    /// Optional password.
    pub password: Option<Vec<u8>>,
    /// CONNECT properties (v5).
    pub properties: Vec<Property>,
}

impl Connect {
    fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.username.is_some() {
            flags |= USERNAME_FLAG;
        }
        if self.password.is_some() {
            flags |= PASSWORD_FLAG;
        }
        if let Some(will) = &self.will {
            flags |= WILL_FLAG;
            flags |= (will.qos as u8) << WILL_QOS_SHIFT;
            if will.retain {
                flags |= WILL_RETAIN_FLAG;
            }
        }
        if self.clean_session {
            flags |= CLEAN_SESSION_FLAG;
        }
        flags
    }

    pub(crate) fn encode_body(&self, buf: &mut Vec<u8>) -> Result<(), Error> {
        let version = self.version;

        // --- Variable Header ---
        put_string(buf, PROTOCOL_NAME)?;
        buf.push(version.level());
        buf.push(self.flags());
        put_u16(buf, self.keep_alive);
        put_properties_for(buf, &self.properties, version)?;

        // --- Payload ---
        put_string(buf, &self.client_id)?;
        if let Some(will) = &self.will {
            put_properties_for(buf, &will.properties, version)?;
            put_string(buf, &will.topic)?;
            put_binary(buf, &will.payload)?;
        }
        if let Some(username) = &self.username {
            put_string(buf, username)?;
        }
        if let Some(password) = &self.password {
            put_binary(buf, password)?;
        }
        Ok(())
    }

    pub(crate) fn decode_body(body: &[u8]) -> Result<Self, Error> {
        let mut dec = Decoder::new(body);
        if dec.read_string()? != PROTOCOL_NAME {
            return Err(Error::InvalidProtocol);
        }
        let version = Version::try_from(dec.read_u8()?)?;
        let flags = dec.read_u8()?;
        if flags & RESERVED_FLAG != 0 {
            return Err(Error::InvalidFlags(flags));
        }
        let has_will = flags & WILL_FLAG != 0;
        let will_qos = QoS::try_from((flags & WILL_QOS_MASK) >> WILL_QOS_SHIFT)?;
        let will_retain = flags & WILL_RETAIN_FLAG != 0;
        if !has_will && (will_qos != QoS::AtMostOnce || will_retain) {
            return Err(Error::InvalidFlags(flags));
        }
        let keep_alive = dec.read_u16()?;
        let properties = read_properties_for(&mut dec, version)?;

        let client_id = dec.read_string()?;
        let will = if has_will {
            let properties = read_properties_for(&mut dec, version)?;
            Some(Will {
                topic: dec.read_string()?,
                payload: dec.read_binary()?,
                qos: will_qos,
                retain: will_retain,
                properties,
            })
        } else {
            None
        };
        let username = if flags & USERNAME_FLAG != 0 {
            Some(dec.read_string()?)
        } else {
            None
        };
        let password = if flags & PASSWORD_FLAG != 0 {
            Some(dec.read_binary()?)
        } else {
            None
        };
        dec.finish()?;

        Ok(Self {
            version,
            client_id,
            keep_alive,
            clean_session: flags & CLEAN_SESSION_FLAG != 0,
            will,
            username,
            password,
            properties,
        })
    }
}

/// Server response to CONNECT.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct ConnAck {
    /// Whether the server resumed stored session state.
    pub session_present: bool,
    /// v5 reason code, or a 3.1.1 return code from
    /// [`connect_return`](super::connect_return).
    pub code: ReasonCode,
    /// CONNACK properties (v5).
    pub properties: Vec<Property>,
}

impl ConnAck {
    /// Whether the server accepted the connection.
    pub fn is_accepted(&self) -> bool {
        self.code.is_success()
    }

    pub(crate) fn encode_body(&self, buf: &mut Vec<u8>, version: Version) -> Result<(), Error> {
        buf.push(u8::from(self.session_present));
        buf.push(self.code.value());
        put_properties_for(buf, &self.properties, version)
    }

    pub(crate) fn decode_body(body: &[u8], version: Version) -> Result<Self, Error> {
        let mut dec = Decoder::new(body);
        let ack_flags = dec.read_u8()?;
        if ack_flags & !0x01 != 0 {
            return Err(Error::InvalidFlags(ack_flags));
        }
        let code = ReasonCode(dec.read_u8()?);
        let code = if version.is_v5() {
            code.check_v5()?
        } else if code.value() <= 5 {
            code
        } else {
            return Err(Error::InvalidReasonCode(code.value()));
        };
        let properties = read_properties_for(&mut dec, version)?;
        dec.finish()?;
        Ok(Self {
            session_present: ack_flags & 0x01 != 0,
            code,
            properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_minimal_v311_connect_layout() {
        let connect = Connect {
            client_id: "c".into(),
            keep_alive: 60,
            clean_session: true,
            ..Default::default()
        };
        let mut body = Vec::new();
        connect.encode_body(&mut body).unwrap();
        assert_eq!(
            body,
            [0, 4, b'M', b'Q', b'T', b'T', 4, 0x02, 0, 60, 0, 1, b'c']
        );
        assert_eq!(Connect::decode_body(&body).unwrap(), connect);
    }

    #[test]
    fn test_connect_flags_byte() {
        let connect = Connect {
            version: Version::V5,
            client_id: "dev".into(),
            username: Some("user".into()),
            password: Some(vec![1, 2]),
            will: Some(Will {
                topic: "gone".into(),
                payload: vec![],
                qos: QoS::ExactlyOnce,
                retain: true,
                properties: vec![Property::WillDelayInterval(5)],
            }),
            ..Default::default()
        };
        assert_eq!(connect.flags(), 0b1111_0100);
        let mut body = Vec::new();
        connect.encode_body(&mut body).unwrap();
        assert_eq!(Connect::decode_body(&body).unwrap(), connect);
    }

    #[test]
    fn test_reserved_connect_flag_rejected() {
        let body = [0, 4, b'M', b'Q', b'T', b'T', 4, 0x03, 0, 60, 0, 0];
        assert_eq!(Connect::decode_body(&body), Err(Error::InvalidFlags(0x03)));
    }

    #[test]
    fn test_will_qos_without_will_rejected() {
        let body = [0, 4, b'M', b'Q', b'T', b'T', 4, 0x08, 0, 60, 0, 0];
        assert_eq!(Connect::decode_body(&body), Err(Error::InvalidFlags(0x08)));
    }

    #[test]
    fn test_bad_protocol_name() {
        let body = [0, 4, b'M', b'Q', b'I', b's', 4, 0x02, 0, 60, 0, 0];
        assert_eq!(Connect::decode_body(&body), Err(Error::InvalidProtocol));
        let body = [0, 4, b'M', b'Q', b'T', b'T', 3, 0x02, 0, 60, 0, 0];
        assert_eq!(Connect::decode_body(&body), Err(Error::InvalidProtocol));
    }

    #[test]
    fn test_v311_connack_return_codes() {
        let ack = ConnAck::decode_body(&[0x01, 0x00], Version::V311).unwrap();
        assert!(ack.session_present && ack.is_accepted());
        let refused = ConnAck::decode_body(&[0x00, 0x05], Version::V311).unwrap();
        assert_eq!(refused.code, super::super::connect_return::NOT_AUTHORIZED);
        assert_eq!(
            ConnAck::decode_body(&[0x00, 0x06], Version::V311),
            Err(Error::InvalidReasonCode(6))
        );
    }
}
