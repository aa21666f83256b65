//! RFC 4648 Base32 codec for shared secrets.
//!
//! This module provides:
//! - [`decode`] — Base32 text to raw secret bytes, with implicit `=` padding
//! - [`encode`] — raw secret bytes to Base32 text
//!
//! Shared secrets are handed out by servers as Base32 text (alphabet A–Z,
//! 2–7). Callers may omit the trailing `=` padding; [`decode`] restores it
//! before decoding, so `"MZXW6YTB"` and `"MZXW6YTBOI"` are both accepted.

use crate::error::CryptoError;

/// Base32 quantum in characters — encoded text is padded to this multiple.
const QUANTUM: usize = 8;

/// Decode an RFC 4648 Base32 string into raw bytes.
///
/// The input is first padded with `=` to a multiple of 8 characters, then
/// decoded with the standard uppercase alphabet.
///
/// # Errors
///
/// Returns [`CryptoError::Encoding`] when the padded input contains
/// characters outside the Base32 alphabet, misplaced padding, or a length
/// that cannot form whole Base32 quanta.
pub fn decode(text: &str) -> Result<Vec<u8>, CryptoError> {
    // remainder < QUANTUM, so the subtraction cannot underflow.
    let remainder = text.len() % QUANTUM;
    #[allow(clippy::arithmetic_side_effects)]
    let pad_len = (QUANTUM - remainder) % QUANTUM;

    let mut padded = String::with_capacity(text.len().saturating_add(pad_len));
    padded.push_str(text);
    for _ in 0..pad_len {
        padded.push('=');
    }

    data_encoding::BASE32
        .decode(padded.as_bytes())
        .map_err(|e| CryptoError::Encoding(format!("{e}")))
}

/// Encode raw bytes as RFC 4648 Base32 text, including trailing `=` padding.
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    data_encoding::BASE32.encode(bytes)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 4648 §10 test vectors.
    const RFC4648_VECTORS: [(&str, &[u8]); 7] = [
        ("", b""),
        ("MY======", b"f"),
        ("MZXQ====", b"fo"),
        ("MZXW6===", b"foo"),
        ("MZXW6YQ=", b"foob"),
        ("MZXW6YTB", b"fooba"),
        ("MZXW6YTBOI======", b"foobar"),
    ];

    #[test]
    fn decode_rfc4648_vectors() {
        for (text, expected) in RFC4648_VECTORS {
            let decoded = decode(text).expect("decode should succeed");
            assert_eq!(decoded, expected, "decode mismatch for {text:?}");
        }
    }

    #[test]
    fn encode_rfc4648_vectors() {
        for (expected, bytes) in RFC4648_VECTORS {
            assert_eq!(encode(bytes), expected, "encode mismatch for {bytes:?}");
        }
    }

    #[test]
    fn decode_pads_unpadded_input() {
        // Same vectors with the trailing `=` stripped.
        assert_eq!(decode("MY").expect("decode"), b"f");
        assert_eq!(decode("MZXW6YQ").expect("decode"), b"foob");
        assert_eq!(decode("MZXW6YTBOI").expect("decode"), b"foobar");
    }

    #[test]
    fn decode_rejects_invalid_alphabet() {
        // `0`, `1`, `8`, `9` are not in the Base32 alphabet.
        let result = decode("MZXW60TB");
        assert!(
            matches!(result, Err(CryptoError::Encoding(_))),
            "invalid character should yield CryptoError::Encoding, got {result:?}"
        );
    }

    #[test]
    fn decode_rejects_lowercase() {
        let result = decode("mzxw6ytb");
        assert!(
            matches!(result, Err(CryptoError::Encoding(_))),
            "lowercase input should yield CryptoError::Encoding, got {result:?}"
        );
    }

    #[test]
    fn decode_rejects_misplaced_padding() {
        let result = decode("MZ=W6YTB");
        assert!(
            matches!(result, Err(CryptoError::Encoding(_))),
            "embedded padding should yield CryptoError::Encoding, got {result:?}"
        );
    }

    #[test]
    fn decode_rejects_embedded_whitespace() {
        let result = decode("MZXW 6YTB");
        assert!(
            matches!(result, Err(CryptoError::Encoding(_))),
            "whitespace should yield CryptoError::Encoding, got {result:?}"
        );
    }

    #[test]
    fn roundtrip_five_byte_multiples() {
        // 5 bytes encode to exactly 8 characters with no padding, so the
        // round-trip is exact for any multiple-of-5 input length.
        for len in [0usize, 5, 10, 20, 40] {
            let bytes: Vec<u8> = (0..len).map(|i| u8::try_from(i % 251).expect("fits u8")).collect();
            let text = encode(&bytes);
            assert_eq!(text.len() % 8, 0);
            assert!(!text.contains('='), "multiple-of-5 input needs no padding");
            assert_eq!(decode(&text).expect("decode"), bytes);
        }
    }
}
