//! RFC 2047 encoded words in mail headers, and the RFC 2822 address syntax
//! whose display names carry them.
//!
//! ```
//! use mime_address::{Address, Encoder, Mailbox, Method};
//!
//! let mailbox = Mailbox::parse("=?ISO-8859-1?Q?Andr=E9?= Pirard <PIRARD@vm1.ulg.ac.be>").unwrap();
//! assert_eq!(mailbox.name(), Some("André Pirard"));
//!
//! let encoder = Encoder::new("utf-8", Method::Q).unwrap();
//! assert_eq!(
//!     Address::from(mailbox).format_with(&encoder).unwrap(),
//!     "=?utf-8?Q?Andr=c3=a9?= Pirard <PIRARD@vm1.ulg.ac.be>"
//! );
//! ```

mod address;
mod charset;
mod decoder;
mod defects;
mod encoded_words;
mod encoder;
mod error;
mod grammar;

pub use self::address::{Address, Group, Mailbox, MailboxList};
pub use self::charset::Charset;
pub use self::decoder::{Decoded, Decoder, MAX_ENCODED_WORD_LEN};
pub use self::defects::Defect;
pub use self::encoded_words::{decode, DecodingError, DecodingResult, Method};
pub use self::encoder::Encoder;
pub use self::error::{Error, Result};
pub use self::grammar::is_addr_spec;
