//! 32-bit string hash used to compress entropy signals.
//!
//! `h = h * 31 + c` over UTF-16 code units with two's-complement
//! wraparound, so the value matches what a JavaScript page computes with
//! `charCodeAt` and `| 0`. Identity compression only: collisions are
//! expected and acceptable.

/// Hash text to a signed 32-bit value. Empty text hashes to 0.
pub fn hash_str(text: &str) -> i32 {
    text.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(hash_str(""), 0);
    }

    #[test]
    fn test_known_values() {
        assert_eq!(hash_str("a"), 97);
        assert_eq!(hash_str("ab"), 97 * 31 + 98);
        assert_eq!(hash_str("hello"), 99162322);
    }

    #[test]
    fn test_wraps_instead_of_overflowing() {
        assert_eq!(hash_str("polygenelubricants"), i32::MIN);

        let long = "fingerprint ".repeat(1000);
        assert_eq!(hash_str(&long), hash_str(&long));
    }

    #[test]
    fn test_hashes_utf16_code_units() {
        // U+1F600 is the surrogate pair D83D DE00
        assert_eq!(hash_str("\u{1F600}"), 0xD83D * 31 + 0xDE00);
        assert_eq!(hash_str("é"), 0xE9);
    }

    #[test]
    fn test_determinism() {
        for text in ["", "A | B | C | D", "UserAgent: Mozilla/5.0", "null"] {
            assert_eq!(hash_str(text), hash_str(text));
        }
        assert_ne!(hash_str("A | B | C | D"), hash_str("A | null | C | D"));
    }
}
