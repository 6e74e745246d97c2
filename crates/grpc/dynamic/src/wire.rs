//! Schema-less extraction of a single field from an encoded message.
//!
//! Used where a nested value is opaquely typed (an `Any` whose schema is not worth loading) but
//! the number of the wanted field is known. Malformed input yields `None`, never an error.

use crate::descriptor::WireKind;
use unsigned_varint::decode;

/// Returns the payload of the first length-delimited field numbered `target`.
///
/// Varint and length-delimited fields are skipped. Any other wire kind, a truncated buffer or
/// an exhausted buffer yields `None`.
pub fn extract_field(mut buf: &[u8], target: u32) -> Option<&[u8]> {
    while !buf.is_empty() {
        let (key, rest) = decode::u64(buf).ok()?;
        let number = key >> 3;
        buf = match WireKind::from_bits(key & 0x7)? {
            WireKind::Varint => decode::u64(rest).ok()?.1,
            WireKind::LengthDelimited => {
                let (len, rest) = decode::u64(rest).ok()?;
                let len = usize::try_from(len).ok()?;
                if rest.len() < len {
                    return None;
                }
                let (payload, rest) = rest.split_at(len);
                if number == u64::from(target) {
                    return Some(payload);
                }
                rest
            }
            _ => return None,
        };
    }
    None
}

/// Like [`extract_field`], decoding the payload as UTF-8 text.
pub fn extract_string_field(buf: &[u8], target: u32) -> Option<String> {
    extract_field(buf, target).and_then(|payload| String::from_utf8(payload.to_vec()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    // field 1 = "chain-42", field 2 = varint 300
    const CLIENT_STATE: &[u8] = &[
        0x0a, 0x08, b'c', b'h', b'a', b'i', b'n', b'-', b'4', b'2', 0x10, 0xac, 0x02,
    ];

    #[test]
    fn extracts_length_delimited_field() {
        assert_eq!(extract_string_field(CLIENT_STATE, 1).as_deref(), Some("chain-42"));
    }

    #[test]
    fn skips_varints_before_the_target() {
        let buf = [0x10, 0xac, 0x02, 0x0a, 0x02, b'o', b'k'];
        assert_eq!(extract_string_field(&buf, 1).as_deref(), Some("ok"));
    }

    #[test]
    fn missing_field_is_not_found() {
        let buf = [0x10, 0xac, 0x02, 0x1a, 0x01, b'x'];
        assert_eq!(extract_field(&buf, 1), None);
        assert_eq!(extract_field(&[], 1), None);
    }

    #[test]
    fn malformed_input_is_not_found() {
        // Truncated payload.
        assert_eq!(extract_field(&[0x0a, 0x05, b'a'], 1), None);
        // Unterminated varint.
        assert_eq!(extract_field(&[0x10, 0xff], 1), None);
        // Fixed64 is not walked.
        assert_eq!(extract_field(&[0x09, 0, 0, 0, 0, 0, 0, 0, 0, 0x0a, 0x00], 1), None);
        // Not UTF-8.
        assert_eq!(extract_string_field(&[0x0a, 0x02, 0xc3, 0x28], 1), None);
    }
}
