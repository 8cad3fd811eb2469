//! DISCONNECT and AUTH.

use super::buf::Decoder;
use super::property::{Property, put_properties, read_properties};
use super::{Error, ReasonCode, ReasonForm, Version};
use alloc::vec::Vec;

/// Reason code plus optional properties; both omitted on the wire when the
/// reason is success and there are no properties.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Disconnect {
    /// Disconnect reason (v5).
    pub reason: ReasonCode,
    /// DISCONNECT properties (v5).
    pub properties: Vec<Property>,
    /// Wire form of the body (v5).
    pub form: ReasonForm,
}

/// Extended authentication exchange (v5 only).
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Auth {
    /// `SUCCESS`, `CONTINUE_AUTHENTICATION` or `RE_AUTHENTICATE`.
    pub reason: ReasonCode,
    /// AUTH properties.
    pub properties: Vec<Property>,
    /// Wire form of the body.
    pub form: ReasonForm,
}

fn encode_reason(
    buf: &mut Vec<u8>,
    reason: ReasonCode,
    properties: &[Property],
    form: ReasonForm,
) -> Result<(), Error> {
    match form.effective(reason, !properties.is_empty()) {
        ReasonForm::Minimal => Ok(()),
        ReasonForm::Reason => {
            buf.push(reason.value());
            Ok(())
        }
        ReasonForm::Properties => {
            buf.push(reason.value());
            put_properties(buf, properties)
        }
    }
}

fn decode_reason(body: &[u8]) -> Result<(ReasonCode, Vec<Property>, ReasonForm), Error> {
    let mut dec = Decoder::new(body);
    if dec.is_empty() {
        return Ok((ReasonCode::SUCCESS, Vec::new(), ReasonForm::Minimal));
    }
    let reason = ReasonCode(dec.read_u8()?).check_v5()?;
    let (properties, form) = if dec.is_empty() {
        (Vec::new(), ReasonForm::Reason)
    } else {
        (read_properties(&mut dec)?, ReasonForm::Properties)
    };
    dec.finish()?;
    let form = form.seen(reason, !properties.is_empty());
    Ok((reason, properties, form))
}

impl Disconnect {
    pub(crate) fn encode_body(&self, buf: &mut Vec<u8>, version: Version) -> Result<(), Error> {
        if version.is_v5() {
            encode_reason(buf, self.reason, &self.properties, self.form)
        } else if self.reason.is_success() && self.properties.is_empty() {
            Ok(())
        } else {
            Err(Error::Unsupported)
        }
    }

    pub(crate) fn decode_body(body: &[u8], version: Version) -> Result<Self, Error> {
        if !version.is_v5() {
            return if body.is_empty() {
                Ok(Self::default())
            } else {
                Err(Error::LengthMismatch)
            };
        }
        let (reason, properties, form) = decode_reason(body)?;
        Ok(Self {
            reason,
            properties,
            form,
        })
    }
}

impl Auth {
    pub(crate) fn encode_body(&self, buf: &mut Vec<u8>, version: Version) -> Result<(), Error> {
        if !version.is_v5() {
            return Err(Error::Unsupported);
        }
        encode_reason(buf, self.reason, &self.properties, self.form)
    }

    pub(crate) fn decode_body(body: &[u8], version: Version) -> Result<Self, Error> {
        if !version.is_v5() {
            return Err(Error::UnknownPacketType(15));
        }
        let (reason, properties, form) = decode_reason(body)?;
        if !matches!(
            reason,
            ReasonCode::SUCCESS | ReasonCode::CONTINUE_AUTHENTICATION | ReasonCode::RE_AUTHENTICATE
        ) {
            return Err(Error::InvalidReasonCode(reason.value()));
        }
        Ok(Self {
            reason,
            properties,
            form,
        })
    }
}
