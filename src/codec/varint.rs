//! Variable byte integer (VBI) encoding.
//!
//! MQTT encodes the remaining length, and in v5 every property length and the
//! subscription identifier, as a little-endian sequence of 7-bit groups. The high
//! bit of each byte signals that another byte follows. At most four bytes are
//! allowed, which caps the value at 268,435,455 (`0xFF 0xFF 0xFF 0x7F`).

use super::Error;
use alloc::vec::Vec;

/// Largest value representable in four VBI bytes.
pub const VBI_MAX: u32 = 268_435_455;

/// Maximum number of bytes in an encoded VBI.
pub const VBI_MAX_LEN: usize = 4;

/// Encode `value` into its minimal VBI representation.
///
/// # Errors
///
/// * [`Error::TooLarge`] - `value` exceeds [`VBI_MAX`]
///
/// # Examples
///
/// ```rust
/// use libmqtt::codec::encode_vbi;
///
/// assert_eq!(&encode_vbi(0).unwrap()[..], &[0x00]);
/// assert_eq!(&encode_vbi(128).unwrap()[..], &[0x80, 0x01]);
/// assert_eq!(&encode_vbi(268_435_455).unwrap()[..], &[0xFF, 0xFF, 0xFF, 0x7F]);
/// assert!(encode_vbi(268_435_456).is_err());
/// ```
pub fn encode_vbi(mut value: u32) -> Result<heapless::Vec<u8, VBI_MAX_LEN>, Error> {
    if value > VBI_MAX {
        return Err(Error::TooLarge);
    }
    let mut buf = heapless::Vec::new();
    loop {
        let mut byte = (value % 128) as u8;
        value /= 128;
        if value > 0 {
            byte |= 0x80;
        }
        // value <= VBI_MAX guarantees at most four groups
        buf.push(byte).map_err(|_| Error::TooLarge)?;
        if value == 0 {
            break;
        }
    }
    Ok(buf)
}

/// Append the VBI encoding of `value` to `buf`.
pub fn put_vbi(buf: &mut Vec<u8>, value: u32) -> Result<(), Error> {
    buf.extend_from_slice(&encode_vbi(value)?);
    Ok(())
}

/// Number of bytes the minimal encoding of `value` occupies.
pub fn vbi_len(value: u32) -> usize {
    match value {
        0..=127 => 1,
        128..=16_383 => 2,
        16_384..=2_097_151 => 3,
        _ => 4,
    }
}

/// Decode a VBI from the front of `bytes`.
///
/// Returns `Ok(Some((value, consumed)))` once a byte with the high bit clear is
/// seen, `Ok(None)` if `bytes` ends while a continuation bit is still set.
///
/// # Errors
///
/// * [`Error::MalformedVbi`] - a fifth byte would be required
pub fn decode_vbi(bytes: &[u8]) -> Result<Option<(u32, usize)>, Error> {
    let mut value: u32 = 0;
    let mut multiplier: u32 = 1;
    for (i, &byte) in bytes.iter().enumerate() {
        if i == VBI_MAX_LEN {
            return Err(Error::MalformedVbi);
        }
        value += u32::from(byte & 0x7F) * multiplier;
        if byte & 0x80 == 0 {
            return Ok(Some((value, i + 1)));
        }
        multiplier *= 128;
    }
    if bytes.len() >= VBI_MAX_LEN {
        return Err(Error::MalformedVbi);
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARIES: [u32; 8] = [
        0, 127, 128, 16_383, 16_384, 2_097_151, 2_097_152, 268_435_455,
    ];

    #[test]
    fn test_boundaries_round_trip() {
        for &n in BOUNDARIES.iter() {
            let encoded = encode_vbi(n).unwrap();
            assert_eq!(encoded.len(), vbi_len(n), "length of {}", n);
            assert_eq!(decode_vbi(&encoded).unwrap(), Some((n, encoded.len())));
        }
    }

    #[test]
    fn test_maximum_uses_four_bytes() {
        assert_eq!(&encode_vbi(VBI_MAX).unwrap()[..], &[0xFF, 0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn test_value_needing_fifth_byte_is_rejected() {
        assert_eq!(encode_vbi(VBI_MAX + 1), Err(Error::TooLarge));
        assert_eq!(
            decode_vbi(&[0xFF, 0xFF, 0xFF, 0xFF, 0x01]),
            Err(Error::MalformedVbi)
        );
        assert_eq!(decode_vbi(&[0x80, 0x80, 0x80, 0x80]), Err(Error::MalformedVbi));
    }

    #[test]
    fn test_incomplete_input() {
        assert_eq!(decode_vbi(&[]), Ok(None));
        assert_eq!(decode_vbi(&[0x80, 0x80]), Ok(None));
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        assert_eq!(decode_vbi(&[0x05, 0xAA, 0xBB]), Ok(Some((5, 1))));
    }
}
