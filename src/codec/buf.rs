//! Cursor reads and appending writes for MQTT primitive field types.

use super::Error;
use super::varint::{decode_vbi, put_vbi};
use alloc::string::String;
use alloc::vec::Vec;

/// A forward-only cursor over a frame body.
///
/// Every read fails with [`Error::Truncated`] instead of panicking when the
/// buffer is shorter than the field it declares.
#[derive(Debug, Clone)]
pub(crate) struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, Error> {
        let byte = *self.buf.get(self.pos).ok_or(Error::Truncated)?;
        self.pos += 1;
        Ok(byte)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, Error> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, Error> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn read_vbi(&mut self) -> Result<u32, Error> {
        match decode_vbi(&self.buf[self.pos..])? {
            Some((value, used)) => {
                self.pos += used;
                Ok(value)
            }
            None => Err(Error::Truncated),
        }
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if self.remaining() < len {
            return Err(Error::Truncated);
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Length-prefixed UTF-8 string.
    pub(crate) fn read_string(&mut self) -> Result<String, Error> {
        let len = usize::from(self.read_u16()?);
        let bytes = self.read_bytes(len)?;
        let text = core::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)?;
        Ok(String::from(text))
    }

    /// Length-prefixed binary data.
    pub(crate) fn read_binary(&mut self) -> Result<Vec<u8>, Error> {
        let len = usize::from(self.read_u16()?);
        Ok(self.read_bytes(len)?.to_vec())
    }

    /// Split off the next `len` bytes as an independent cursor.
    pub(crate) fn sub(&mut self, len: usize) -> Result<Decoder<'a>, Error> {
        Ok(Decoder::new(self.read_bytes(len)?))
    }

    /// Everything not yet consumed.
    pub(crate) fn rest(&mut self) -> &'a [u8] {
        let bytes = &self.buf[self.pos..];
        self.pos = self.buf.len();
        bytes
    }

    /// Fail unless every byte was consumed.
    pub(crate) fn finish(&self) -> Result<(), Error> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::LengthMismatch)
        }
    }
}

pub(crate) fn put_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_be_bytes());
}

pub(crate) fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

pub(crate) fn put_binary(buf: &mut Vec<u8>, bytes: &[u8]) -> Result<(), Error> {
    let len = u16::try_from(bytes.len()).map_err(|_| Error::TooLarge)?;
    put_u16(buf, len);
    buf.extend_from_slice(bytes);
    Ok(())
}

pub(crate) fn put_string(buf: &mut Vec<u8>, text: &str) -> Result<(), Error> {
    put_binary(buf, text.as_bytes())
}

pub(crate) fn put_len(buf: &mut Vec<u8>, len: usize) -> Result<(), Error> {
    put_vbi(buf, u32::try_from(len).map_err(|_| Error::TooLarge)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_declared_length_exceeds_buffer() {
        let mut dec = Decoder::new(&[0x00, 0x05, b'a', b'b']);
        assert_eq!(dec.read_string(), Err(Error::Truncated));
    }

    #[test]
    fn test_string_rejects_invalid_utf8() {
        let mut dec = Decoder::new(&[0x00, 0x02, 0xC3, 0x28]);
        assert_eq!(dec.read_string(), Err(Error::InvalidUtf8));
    }

    #[test]
    fn test_string_round_trip() {
        let mut buf = Vec::new();
        put_string(&mut buf, "a/b").unwrap();
        assert_eq!(buf, [0x00, 0x03, b'a', b'/', b'b']);
        let mut dec = Decoder::new(&buf);
        assert_eq!(dec.read_string().unwrap(), "a/b");
        assert!(dec.finish().is_ok());
    }

    #[test]
    fn test_oversized_binary_rejected() {
        let big = alloc::vec![0u8; 65_536];
        assert_eq!(put_binary(&mut Vec::new(), &big), Err(Error::TooLarge));
    }

    #[test]
    fn test_finish_detects_leftovers() {
        let mut dec = Decoder::new(&[0x00, 0x01, 0xFF]);
        dec.read_u16().unwrap();
        assert_eq!(dec.finish(), Err(Error::LengthMismatch));
    }
}
