//! Defects

use thiserror::Error;

use crate::encoded_words::DecodingError;

/// These are decoding defects which the decoder was able to work around.
///
/// A defect never aborts a parse; the affected text is passed through
/// literally instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Defect {
    #[error("encoded-word {word:?} left undecoded: {error}")]
    UndecodableWord { word: String, error: DecodingError },
    #[error(
        "ASCII characters outside the ascii-printable range found: {:?}",
        non_printables
    )]
    NonPrintable { non_printables: Vec<u8> },
}
