//! Character sets used when decoding strings stored in binary tables.

/// How raw string bytes are turned into text.
///
/// Decoding is always lossy and never fails; bytes that cannot be
/// represented become U+FFFD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    /// 7-bit ASCII. Bytes above 0x7F are replaced.
    Ascii,
    /// ISO-8859-1. Every byte maps to the code point of the same value.
    Latin1,
    /// UTF-8, invalid sequences replaced.
    #[default]
    Utf8,
}

impl Charset {
    /// Decode `bytes` into an owned string.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Charset::Ascii => bytes
                .iter()
                .map(|&b| {
                    if b.is_ascii() {
                        b as char
                    } else {
                        char::REPLACEMENT_CHARACTER
                    }
                })
                .collect(),
            Charset::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            Charset::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_ascii_identical() {
        for charset in [Charset::Ascii, Charset::Latin1, Charset::Utf8] {
            assert_eq!(charset.decode(b"materials/brick"), "materials/brick");
        }
    }

    #[test]
    fn test_high_bytes() {
        let bytes = [b'a', 0xE9, b'b'];
        assert_eq!(Charset::Ascii.decode(&bytes), "a\u{FFFD}b");
        assert_eq!(Charset::Latin1.decode(&bytes), "a\u{E9}b");
        assert_eq!(Charset::Utf8.decode(&bytes), "a\u{FFFD}b");
    }

    #[test]
    fn test_utf8_multibyte() {
        assert_eq!(Charset::Utf8.decode("größe".as_bytes()), "größe");
    }
}
