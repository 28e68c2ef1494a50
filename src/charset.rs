use std::borrow::Cow;

use charset::Charset as EncodingCharset;
use encoding_rs::Encoding;

lazy_static::lazy_static! {
    static ref UTF7: Option<EncodingCharset> = EncodingCharset::for_label(b"UTF-7");
}

/// Map character set labels to byte <-> text conversion.
///
/// Decoding is strict: a byte sequence that is not valid in the named
/// charset is an error rather than being replaced by U+FFFD, so callers can
/// fall back to the undecoded text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Charset {
    Ascii,
    Utf7,
    Unknown8Bit,
    Encoding(&'static Encoding),
}

impl Default for Charset {
    fn default() -> Self {
        Charset::Ascii
    }
}

impl From<&'static Encoding> for Charset {
    fn from(enc: &'static Encoding) -> Self {
        Charset::Encoding(enc)
    }
}

impl Charset {
    pub fn name(&self) -> &'static str {
        match self {
            Charset::Ascii => "us-ascii",
            Charset::Utf7 => "utf-7",
            Charset::Unknown8Bit => "unknown-8bit",
            Charset::Encoding(encoding) => encoding.name(),
        }
    }

    pub fn for_label(label: &[u8]) -> Option<Self> {
        if let Ok(enc) = std::str::from_utf8(label) {
            let enc = enc.trim().to_lowercase();
            match enc.as_str() {
                "us-ascii" | "ascii" => return Some(Charset::Ascii),
                "utf-7" => return Some(Charset::Utf7),
                "unknown-8bit" => return Some(Charset::Unknown8Bit),
                // Not a WHATWG label, but common in the wild.
                "latin-1" => return Some(Charset::Encoding(encoding_rs::WINDOWS_1252)),
                _ => {}
            }
        }

        Encoding::for_label(label).map(Charset::Encoding)
    }

    /// Convert text to bytes in this charset.
    ///
    /// Returns `None` if any character has no representation in the charset.
    pub fn encode(self, input: &str) -> Option<Cow<'_, [u8]>> {
        match self {
            Charset::Ascii => {
                if input.is_ascii() {
                    Some(Cow::Borrowed(input.as_bytes()))
                } else {
                    None
                }
            }
            Charset::Utf7 | Charset::Unknown8Bit => None,
            Charset::Encoding(encoding) => {
                let (out, _, errors) = encoding.encode(input);
                if errors {
                    None
                } else {
                    Some(out)
                }
            }
        }
    }

    /// Convert bytes in this charset to text.
    ///
    /// Returns `None` on a malformed byte sequence.
    pub fn decode(self, bytes: &[u8]) -> Option<Cow<'_, str>> {
        let (out, errors) = match self {
            Charset::Ascii => {
                if !bytes.is_ascii() {
                    return None;
                }
                encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes)
            }
            Charset::Utf7 => UTF7.as_ref()?.decode_without_bom_handling(bytes),
            Charset::Unknown8Bit => encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes),
            Charset::Encoding(encoding) => encoding.decode_without_bom_handling(bytes),
        };

        if errors {
            None
        } else {
            Some(out)
        }
    }

    /// Return the output character set.
    pub fn get_output_charset(self) -> Charset {
        match self {
            Charset::Ascii | Charset::Utf7 | Charset::Unknown8Bit => Charset::default(),
            Charset::Encoding(encoding) => Charset::Encoding(encoding.output_encoding()),
        }
    }

    /// Whether text can be written in this charset.
    pub fn can_encode(self) -> bool {
        match self {
            Charset::Ascii => true,
            Charset::Utf7 | Charset::Unknown8Bit => false,
            Charset::Encoding(_) => self.get_output_charset() == self,
        }
    }
}
