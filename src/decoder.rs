//! Decoding of RFC 2047 header text.
//!
//! The decoder walks header text left to right and splits it into literal
//! runs, encoded words and (for phrases) quoted strings. Scanning is driven by
//! an explicit byte offset: every entry point takes the offset to start at and
//! reports the offset where it stopped, so a surrounding parser can keep
//! consuming the same input.

use crate::defects::Defect;
use crate::encoded_words::{self, DecodingError};

/// Encoded words longer than this are not decoded.
pub const MAX_ENCODED_WORD_LEN: usize = 255;

/// RFC 822 specials, which end an unquoted phrase.
pub(crate) fn is_special(byte: u8) -> bool {
    matches!(
        byte,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b':' | b';' | b'@' | b'\\' | b',' | b'.' | b'"'
    )
}

fn is_wsp(byte: u8) -> bool {
    byte.is_ascii_whitespace()
}

/// The text produced by a decode call together with where it stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Normalized text.
    pub text: String,
    /// Offset of the first byte not consumed.
    pub end: usize,
    /// Problems that were worked around while decoding.
    pub defects: Vec<Defect>,
}

/// Turns RFC 2047-bearing header text into plain text.
///
/// A `Decoder` only holds configuration and can be shared freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoder {
    max_encoded_word_len: usize,
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder {
            max_encoded_word_len: MAX_ENCODED_WORD_LEN,
        }
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject encoded words longer than `len` characters.
    pub fn with_max_encoded_word_len(mut self, len: usize) -> Self {
        self.max_encoded_word_len = len;
        self
    }

    pub fn max_encoded_word_len(&self) -> usize {
        self.max_encoded_word_len
    }

    /// Decode unstructured header text, such as a `Subject`.
    pub fn decode_text(&self, input: &str) -> String {
        self.decode_text_at(input, 0).text
    }

    /// Decode unstructured header text starting at byte offset `start`.
    ///
    /// Consumes the input up to its end. An offset inside a multi-byte
    /// character is moved forward to the next character.
    pub fn decode_text_at(&self, input: &str, start: usize) -> Decoded {
        self.scan(input, start, false)
    }

    /// Decode a display-name phrase.
    pub fn decode_phrase(&self, input: &str) -> String {
        self.decode_phrase_at(input, 0).text
    }

    /// Decode a phrase starting at byte offset `start`.
    ///
    /// Quoted strings are unquoted, and decoding stops in front of the first
    /// RFC 822 special outside of a quoted string. `Decoded::end` then points
    /// at that special so the caller can act on it. Like
    /// [`Decoder::decode_text_at`], `start` is moved forward to a character
    /// boundary if needed.
    pub fn decode_phrase_at(&self, input: &str, start: usize) -> Decoded {
        self.scan(input, start, true)
    }

    /// Decode a single encoded word, applying the length ceiling.
    pub fn decode_word(&self, word: &str) -> Result<String, DecodingError> {
        if word.len() > self.max_encoded_word_len {
            return Err(DecodingError::Oversized { length: word.len() });
        }
        encoded_words::decode(word).map(|result| result.decoded)
    }

    fn scan(&self, input: &str, start: usize, phrase: bool) -> Decoded {
        let bytes = input.as_bytes();
        let mut out = String::new();
        let mut defects = Vec::new();
        let mut pos = start.min(input.len());
        while !input.is_char_boundary(pos) {
            pos += 1;
        }
        // Start of the literal run not yet copied to `out`.
        let mut literal = pos;
        // Whether the last token emitted was a decoded encoded word.
        let mut after_word = false;
        // After a failed word everything else in this call is kept verbatim.
        let mut failed = false;

        while pos < bytes.len() {
            let byte = bytes[pos];

            if phrase && byte == b'"' {
                if let Some(end) = scan_quoted_string(bytes, pos) {
                    out.push_str(&input[literal..pos]);
                    if failed {
                        out.push_str(&input[pos..end]);
                    } else {
                        out.push(' ');
                        unquote_into(&input[pos + 1..end - 1], &mut out);
                        out.push(' ');
                    }
                    after_word = false;
                    pos = end;
                    literal = end;
                    continue;
                }
            }

            if phrase && is_special(byte) {
                break;
            }

            if byte == b'=' {
                if let Some(end) = scan_encoded_word(bytes, pos) {
                    if failed {
                        pos = end;
                        continue;
                    }

                    let word = &input[pos..end];
                    match self.decode_word(word) {
                        Ok(text) => {
                            let gap = &input[literal..pos];
                            if !(after_word && gap.bytes().all(is_wsp)) {
                                out.push_str(gap);
                            }
                            out.push_str(&text);
                            after_word = true;
                            literal = end;
                        }
                        Err(error) => {
                            log::warn!("leaving encoded-word {:?} undecoded: {}", word, error);
                            defects.push(Defect::UndecodableWord {
                                word: word.into(),
                                error,
                            });
                            failed = true;
                        }
                    }
                    pos = end;
                    continue;
                }
            }

            pos += 1;
        }

        out.push_str(&input[literal..pos]);

        let (text, non_printables) = normalize(&out);
        if !non_printables.is_empty() {
            log::warn!("stripped control characters {:?} from header text", non_printables);
            defects.push(Defect::NonPrintable { non_printables });
        }

        Decoded {
            text,
            end: pos,
            defects,
        }
    }
}

/// Length-checked scan for `=?charset?method?payload?=` at `start`.
///
/// Returns the offset just past the closing `?=`. No part of the word may
/// contain whitespace, and the payload may not contain `?`.
fn scan_encoded_word(bytes: &[u8], start: usize) -> Option<usize> {
    let rest = bytes.get(start..)?;
    if !rest.starts_with(b"=?") {
        return None;
    }

    let mut pos = 2;
    let charset_start = pos;
    while pos < rest.len() && rest[pos] != b'?' {
        if is_wsp(rest[pos]) || rest[pos].is_ascii_control() {
            return None;
        }
        pos += 1;
    }
    if pos == charset_start || pos + 2 >= rest.len() {
        return None;
    }

    // '?' method '?'
    if !matches!(rest[pos + 1], b'B' | b'b' | b'Q' | b'q') || rest[pos + 2] != b'?' {
        return None;
    }
    pos += 3;

    while pos + 1 < rest.len() {
        match rest[pos] {
            b'?' if rest[pos + 1] == b'=' => return Some(start + pos + 2),
            b'?' => return None,
            b if is_wsp(b) => return None,
            _ => pos += 1,
        }
    }
    None
}

/// Scan a quoted string at `start`, returning the offset past its closing
/// quote.
fn scan_quoted_string(bytes: &[u8], start: usize) -> Option<usize> {
    if bytes.get(start) != Some(&b'"') {
        return None;
    }

    let mut pos = start + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b'"' => return Some(pos + 1),
            _ => pos += 1,
        }
    }
    None
}

fn unquote_into(quoted: &str, out: &mut String) {
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
}

/// Trim, collapse whitespace runs to one space and drop control characters.
///
/// Returns the normalized text and the control bytes that were dropped.
fn normalize(text: &str) -> (String, Vec<u8>) {
    let mut out = String::with_capacity(text.len());
    let mut non_printables = Vec::new();
    let mut pending_space = false;

    for c in text.chars() {
        if c.is_ascii_whitespace() {
            pending_space = true;
        } else if c.is_ascii_control() {
            non_printables.push(c as u8);
        } else {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        }
    }

    (out, non_printables)
}
