//! Magic and mask pattern decoding.
//!
//! Registrations store binary patterns as text where any byte may be
//! written as a `\xHH` escape. Everything that is not a well-formed escape
//! is copied through unchanged, so a dangling `\x4` at the end of a pattern
//! is three literal bytes rather than an error.

use memchr::memchr;

/// Decode a textual pattern into raw bytes.
///
/// The result is never longer than `src`.
pub fn decode(src: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len());
    let mut rest = src;

    while let Some(pos) = memchr(b'\\', rest) {
        out.extend_from_slice(&rest[..pos]);
        rest = &rest[pos..];
        match decode_escape(rest) {
            Some(byte) => {
                out.push(byte);
                rest = &rest[4..];
            }
            None => {
                out.push(b'\\');
                rest = &rest[1..];
            }
        }
    }
    out.extend_from_slice(rest);
    out
}

/// Decode a `\xHH` escape at the start of `s`.
fn decode_escape(s: &[u8]) -> Option<u8> {
    if s.len() < 4 || s[1] != b'x' {
        return None;
    }
    let mut byte = [0u8; 1];
    hex::decode_to_slice(&s[2..4], &mut byte).ok()?;
    Some(byte[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_hex_escapes() {
        assert_eq!(decode(br"\x41\x42"), vec![0x41, 0x42]);
        assert_eq!(decode(br"\x7fELF"), vec![0x7F, b'E', b'L', b'F']);
    }

    #[test]
    fn test_mixed_case_hex() {
        assert_eq!(decode(br"\xCa\xfe"), vec![0xCA, 0xFE]);
    }

    #[test]
    fn test_plain_text_unchanged() {
        let plain = b"jar";
        assert_eq!(decode(plain), plain.to_vec());
        // Decoding escape-free output again changes nothing.
        assert_eq!(decode(&decode(plain)), plain.to_vec());
    }

    #[test]
    fn test_incomplete_escape_is_literal() {
        assert_eq!(decode(br"ab\x4"), b"ab\\x4".to_vec());
        assert_eq!(decode(br"\x"), b"\\x".to_vec());
        assert_eq!(decode(br"\"), b"\\".to_vec());
    }

    #[test]
    fn test_invalid_hex_is_literal() {
        assert_eq!(decode(br"\xZZ"), b"\\xZZ".to_vec());
        assert_eq!(decode(br"\x4g\x41"), b"\\x4gA".to_vec());
    }

    #[test]
    fn test_escaped_nul() {
        assert_eq!(decode(br"\x00\x01"), vec![0x00, 0x01]);
    }

    #[test]
    fn test_backslash_before_escape() {
        assert_eq!(decode(br"\\x41"), b"\\A".to_vec());
    }

    #[test]
    fn test_never_longer() {
        let cases: [&[u8]; 4] = [br"\x41\x4", br"abc", br"\\\\", br"\x00\xff\x"];
        for src in cases {
            assert!(decode(src).len() <= src.len());
        }
    }
}
