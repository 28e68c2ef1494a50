//! Encoding of text into RFC 2047-safe header text.
//!
//! Text is split into words on whitespace and each word is classified. Runs
//! of words of the same class are written together: printable ASCII as is
//! (quoted if a phrase needs it), anything else as one or more encoded words
//! that each stay within the 75 character limit of RFC 2047.

use crate::charset::Charset;
use crate::encoded_words::{self, Method};
use crate::error::{Error, Result};

/// Longest encoded word RFC 2047 allows.
pub const ENCODED_WORD_LIMIT: usize = 75;

/// Characters of `=?`, `?`, `?`, `?=` around charset, method and payload.
const ENCODED_WORD_OVERHEAD: usize = 7;

const PHRASE_SPECIALS: &[char] = &[
    '(', ')', '<', '>', '[', ']', ':', ';', '@', '\\', ',', '.', '"',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    /// Printable ASCII in unstructured text.
    Text,
    /// Printable ASCII in a phrase.
    Quoted,
    /// Needs an encoded word.
    Mime,
}

/// Turns text into RFC 2047-safe ASCII.
///
/// An `Encoder` only holds configuration and can be shared freely.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoder {
    charset: Charset,
    charset_name: String,
    method: Method,
}

impl Default for Encoder {
    fn default() -> Self {
        Encoder {
            charset: Charset::Encoding(encoding_rs::UTF_8),
            charset_name: "utf-8".into(),
            method: Method::Q,
        }
    }
}

impl Encoder {
    /// Create an encoder writing encoded words in `charset` with `method`.
    ///
    /// The label is written into encoded words exactly as given.
    pub fn new(charset: &str, method: Method) -> Result<Self> {
        let codec =
            Charset::for_label(charset.as_bytes()).ok_or_else(|| Error::UnknownCharset {
                charset: charset.into(),
            })?;
        if !codec.can_encode() {
            return Err(Error::UnsupportedCharset {
                charset: charset.into(),
            });
        }

        Ok(Encoder {
            charset: codec,
            charset_name: charset.into(),
            method,
        })
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn charset_name(&self) -> &str {
        &self.charset_name
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Encode unstructured header text.
    pub fn encode_text(&self, text: &str) -> String {
        self.encode(text, false)
    }

    /// Encode a display-name phrase.
    ///
    /// Like [`Encoder::encode_text`], but ASCII runs containing RFC 822
    /// specials are written as quoted strings.
    pub fn encode_phrase(&self, text: &str) -> String {
        self.encode(text, true)
    }

    /// Payload budget of a single encoded word.
    ///
    /// For `Q` this counts payload characters. For `B` it counts raw bytes,
    /// chosen so that their Base64 form still fits.
    pub fn payload_budget(&self) -> usize {
        let available = ENCODED_WORD_LIMIT
            .saturating_sub(ENCODED_WORD_OVERHEAD)
            .saturating_sub(self.charset_name.len());
        match self.method {
            Method::Q => available,
            Method::B => available * 3 / 4 / 3 * 3,
        }
    }

    fn encode(&self, text: &str, phrase: bool) -> String {
        let mut out: Vec<String> = Vec::new();
        let mut class = None;
        let mut words: Vec<&str> = Vec::new();

        for word in text.split_ascii_whitespace() {
            let word_class = classify(word, phrase);
            if class != Some(word_class) {
                if let Some(class) = class {
                    self.flush(class, &words, &mut out);
                }
                words.clear();
                class = Some(word_class);
            }
            words.push(word);
        }
        if let Some(class) = class {
            self.flush(class, &words, &mut out);
        }

        out.join(" ")
    }

    fn flush(&self, class: Class, words: &[&str], out: &mut Vec<String>) {
        match class {
            Class::Text => out.push(words.join(" ")),
            Class::Quoted => out.push(quote_if_needed(&words.join(" "))),
            Class::Mime => self.encode_words(words, out),
        }
    }

    /// Pack `words` into as few encoded words as the payload budget allows.
    fn encode_words(&self, words: &[&str], out: &mut Vec<String>) {
        let budget = self.payload_budget();
        let separator = self.char_bytes(' ');
        let mut chunk: Vec<u8> = Vec::new();
        let mut chunk_len = 0;

        for word in words {
            let mut first = true;
            for c in word.chars() {
                if first && !chunk.is_empty() {
                    self.push_unit(&separator, budget, &mut chunk, &mut chunk_len, out);
                }
                first = false;
                let bytes = self.char_bytes(c);
                self.push_unit(&bytes, budget, &mut chunk, &mut chunk_len, out);
            }
        }
        if !chunk.is_empty() {
            out.push(self.encoded_word(&chunk));
        }
    }

    fn push_unit(
        &self,
        unit: &[u8],
        budget: usize,
        chunk: &mut Vec<u8>,
        chunk_len: &mut usize,
        out: &mut Vec<String>,
    ) {
        let unit_len = self.method.payload_len(unit);
        if !chunk.is_empty() && *chunk_len + unit_len > budget {
            out.push(self.encoded_word(chunk));
            chunk.clear();
            *chunk_len = 0;
        }
        chunk.extend_from_slice(unit);
        *chunk_len += unit_len;
    }

    fn encoded_word(&self, bytes: &[u8]) -> String {
        format!(
            "=?{}?{}?{}?=",
            self.charset_name,
            self.method.char(),
            self.method.encode(bytes)
        )
    }

    /// One character in the configured charset.
    fn char_bytes(&self, c: char) -> Vec<u8> {
        let mut buf = [0; 4];
        match self.charset.encode(c.encode_utf8(&mut buf)) {
            Some(bytes) => bytes.into_owned(),
            None => {
                log::warn!(
                    "{:?} cannot be represented in {}, substituting '?'",
                    c,
                    self.charset_name
                );
                b"?".to_vec()
            }
        }
    }
}

fn classify(word: &str, phrase: bool) -> Class {
    let printable = word.bytes().all(|b| (b'!'..=b'~').contains(&b));
    if !printable || encoded_words::contains_encoded_word(word) {
        Class::Mime
    } else if phrase {
        Class::Quoted
    } else {
        Class::Text
    }
}

fn quote_if_needed(text: &str) -> String {
    if !text.contains(PHRASE_SPECIALS) {
        return text.into();
    }

    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}
