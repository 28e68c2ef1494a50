//! Routines for manipulating single RFC 2047 encoded words.
//!
//! An encoded word looks like this: `=?charset[*lang]?cte?encoded_string?=`.
//!
//! cte (Content Transfer Encoding) is either 'q' or 'b' (ignoring case). 'q'
//! is the header flavour of Quoted Printable, where '_' stands for a space and
//! `=HH` for an arbitrary byte. 'b' is standard Base64. 'lang' is the optional
//! RFC 2231 language tag; it is accepted but carries no meaning here.
//!
//! Decoding is strict. A payload that is not valid for its cte, an unknown
//! charset, or bytes that are invalid in the named charset all produce a
//! [`DecodingError`]; callers decide how to degrade.

use std::fmt;
use std::str::FromStr;

use regex::bytes::{Captures, NoExpand, Regex};
use thiserror::Error;

use crate::charset::Charset;
use crate::error::Error;

lazy_static::lazy_static! {
    static ref Q_PAYLOAD_RE: Regex = Regex::new(r"^(?:[!-<>-~]|=[0-9A-Fa-f]{2})*$").unwrap();
    static ref Q_BYTE_RE_1: Regex = Regex::new(r"(_)").unwrap();
    static ref Q_BYTE_RE_2: Regex = Regex::new(r"=([a-fA-F0-9]{2})").unwrap();
    static ref B_PAYLOAD_RE: Regex = Regex::new(
        r"^(?:[A-Za-z0-9+/]{4})*(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=)?$"
    ).unwrap();
    static ref ENCODED_WORD_RE: regex::Regex = regex::Regex::new(
        r"=\?[^? \t\r\n]+\?[BbQq]\?[^? \t\r\n]*\?="
    ).unwrap();
}

// -- Quoted Printable

fn decode_q<T: AsRef<[u8]>>(encoded: T) -> Result<Vec<u8>, DecodingError> {
    if !Q_PAYLOAD_RE.is_match(encoded.as_ref()) {
        return Err(DecodingError::InvalidQuotedPrintable);
    }

    let one = Q_BYTE_RE_1.replace_all(encoded.as_ref(), NoExpand(b" "));
    Ok(Q_BYTE_RE_2
        .replace_all(one.as_ref(), |caps: &Captures| {
            // The capture is two hex digits, so this cannot fail.
            hex::decode(&caps[1]).unwrap_or_default()
        })
        .to_vec())
}

fn is_q_safe(byte: u8) -> bool {
    matches!(byte, b'-' | b'!' | b'*' | b'+' | b'/' | b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z')
}

fn write_q_byte<T: fmt::Write>(mut writer: T, byte: u8) -> fmt::Result {
    match byte {
        b' ' => writer.write_char('_'),
        _ if is_q_safe(byte) => writer.write_char(byte as char),
        _ => write!(writer, "={:02x}", byte),
    }
}

fn encode_q<T: AsRef<[u8]>>(bstring: T) -> String {
    let mut out = String::with_capacity(bstring.as_ref().len());

    for byte in bstring.as_ref() {
        write_q_byte(&mut out, *byte).expect("String writes always succeed");
    }

    out
}

fn len_q_byte(byte: u8) -> usize {
    if byte == b' ' || is_q_safe(byte) {
        1
    } else {
        3
    }
}

// -- Base64

fn decode_b<T: AsRef<[u8]>>(encoded: T) -> Result<Vec<u8>, DecodingError> {
    // Only whole 4-character groups, with padding only at the very end.
    if !B_PAYLOAD_RE.is_match(encoded.as_ref()) {
        return Err(DecodingError::InvalidBase64);
    }

    base64::decode_config(encoded.as_ref(), base64::STANDARD)
        .map_err(|_| DecodingError::InvalidBase64)
}

fn encode_b<T: AsRef<[u8]>>(bstring: T) -> String {
    base64::encode(&bstring)
}

/// Why a single encoded word could not be turned into text.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodingError {
    #[error("Malformed input")]
    MalformedInput,
    #[error("Encoded word is {length} characters long")]
    Oversized { length: usize },
    #[error("Unknown charset {}", charset)]
    UnknownCharset { charset: String },
    #[error("Invalid base64 payload")]
    InvalidBase64,
    #[error("Invalid quoted-printable payload")]
    InvalidQuotedPrintable,
    #[error("Bytes are not valid {}", charset)]
    UndecodableBytes { charset: String },
}

/// The result from decoding an encoded word.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodingResult {
    pub decoded: String,
    pub charset: Charset,
    pub lang: String,
}

/// The content transfer encoding of an encoded word.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// Base64.
    B,
    /// Quoted printable, header flavour.
    Q,
}

impl Method {
    pub fn decode<T: AsRef<[u8]>>(self, payload: T) -> Result<Vec<u8>, DecodingError> {
        match self {
            Method::B => decode_b(payload),
            Method::Q => decode_q(payload),
        }
    }

    pub fn encode<T: AsRef<[u8]>>(self, bstring: T) -> String {
        match self {
            Method::B => encode_b(bstring),
            Method::Q => encode_q(bstring),
        }
    }

    /// Length that `bytes` contribute to an encoded payload.
    ///
    /// For `B` this is the raw byte count; Base64 expansion is accounted for
    /// by the caller's budget.
    pub fn payload_len(self, bytes: &[u8]) -> usize {
        match self {
            Method::B => bytes.len(),
            Method::Q => bytes.iter().copied().map(len_q_byte).sum(),
        }
    }

    pub fn char(self) -> char {
        match self {
            Method::B => 'B',
            Method::Q => 'Q',
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            'B' | 'b' => Some(Method::B),
            'Q' | 'q' => Some(Method::Q),
            _ => None,
        }
    }
}

impl Default for Method {
    fn default() -> Self {
        Method::Q
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.char())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next().and_then(Method::from_char), chars.next()) {
            (Some(method), None) => Ok(method),
            _ => Err(Error::InvalidMethod { method: s.into() }),
        }
    }
}

/// Whether `word` contains something that a decoder would take for an
/// encoded word.
pub fn contains_encoded_word(word: &str) -> bool {
    ENCODED_WORD_RE.is_match(word)
}

/// Decode one encoded word into text.
///
/// An RFC 2047/2231 encoded word has the form: `=?charset*lang?cte?encoded_string?=`
///
/// where '*lang' may be omitted but the other parts may not be. The payload
/// is decoded from its Content Transfer Encoding and the resulting bytes are
/// converted from the named charset. Any failure along the way is reported
/// as an error; nothing is replaced or skipped.
pub fn decode<T: AsRef<str>>(ew: T) -> Result<DecodingResult, DecodingError> {
    let inner = ew
        .as_ref()
        .strip_prefix("=?")
        .and_then(|rest| rest.strip_suffix("?="))
        .ok_or(DecodingError::MalformedInput)?;

    let mut split = inner.splitn(3, '?');
    let charset = split.next().ok_or(DecodingError::MalformedInput)?;
    let cte = split.next().ok_or(DecodingError::MalformedInput)?;
    let cte_string = split.next().ok_or(DecodingError::MalformedInput)?;

    let (charset, lang) = match charset.find('*') {
        Some(index) => (&charset[..index], &charset[index + 1..]),
        None => (charset, ""),
    };
    if charset.is_empty() || !cte_string.is_ascii() {
        return Err(DecodingError::MalformedInput);
    }

    let mut cte_chars = cte.chars();
    let method = match (cte_chars.next().and_then(Method::from_char), cte_chars.next()) {
        (Some(method), None) => method,
        _ => return Err(DecodingError::MalformedInput),
    };

    let codec = Charset::for_label(charset.as_bytes()).ok_or_else(|| {
        DecodingError::UnknownCharset {
            charset: charset.into(),
        }
    })?;

    let bstring = method.decode(cte_string)?;
    let decoded = codec
        .decode(&bstring)
        .ok_or_else(|| DecodingError::UndecodableBytes {
            charset: charset.into(),
        })?;

    Ok(DecodingResult {
        decoded: decoded.into_owned(),
        charset: codec,
        lang: lang.into(),
    })
}
