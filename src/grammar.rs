//! Recursive-descent parser for RFC 2822 address syntax.
//!
//! ```text
//! address      := mailbox | group
//! mailbox      := addr-spec | phrase "<" addr-spec ">"
//! group        := phrase ":" [ mailbox-list ] ";"
//! mailbox-list := mailbox ( "," mailbox )*
//! addr-spec    := local-part "@" domain
//! ```
//!
//! Every production takes the offset to start at and returns the value with
//! the offset just past it. Alternatives are chosen by looking at the next
//! character only; the parser never backtracks over a phrase.

use regex::Regex;

use crate::address::{Address, Group, Mailbox, MailboxList};
use crate::decoder::Decoder;
use crate::defects::Defect;
use crate::error::{Error, Result};

const ATEXT: &str = r"[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]";
const LABEL: &str = r"[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?";

lazy_static::lazy_static! {
    static ref ADDR_SPEC: String = format!(
        r"{atext}+(?:\.{atext}+)*@{label}(?:\.{label})*",
        atext = ATEXT,
        label = LABEL
    );
    static ref ADDR_SPEC_PREFIX_RE: Regex = Regex::new(&format!("^{}", *ADDR_SPEC)).unwrap();
    static ref ADDR_SPEC_RE: Regex = Regex::new(&format!("^{}$", *ADDR_SPEC)).unwrap();
}

/// Whether `address` is a complete `addr-spec`.
pub fn is_addr_spec(address: &str) -> bool {
    ADDR_SPEC_RE.is_match(address)
}

pub(crate) struct Parser<'a> {
    input: &'a str,
    decoder: &'a Decoder,
    defects: Vec<Defect>,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(input: &'a str, decoder: &'a Decoder) -> Self {
        Parser {
            input,
            decoder,
            defects: Vec::new(),
        }
    }

    pub(crate) fn into_defects(self) -> Vec<Defect> {
        self.defects
    }

    /// Require that nothing but whitespace and comments follows `end`.
    pub(crate) fn finish<T>(&self, parsed: (T, usize), construct: &'static str) -> Result<T> {
        let (value, end) = parsed;
        let end = self.skip_cfws(end);
        if end == self.input.len() {
            Ok(value)
        } else {
            Err(self.error(construct, end))
        }
    }

    pub(crate) fn address_list(&mut self, pos: usize) -> Result<(Vec<Address>, usize)> {
        let (first, mut end) = self.address(pos)?;
        let mut addresses = vec![first];
        while self.peek(end) == Some(b',') {
            let (address, next) = self.address(end + 1)?;
            addresses.push(address);
            end = next;
        }
        Ok((addresses, end))
    }

    pub(crate) fn address(&mut self, pos: usize) -> Result<(Address, usize)> {
        let start = self.skip_cfws(pos);
        if let Some((address, end)) = self.addr_spec(start) {
            return Ok((Address::Mailbox(Mailbox::new(address)), end));
        }

        let (name, next) = self.phrase(start);
        match self.peek(next) {
            Some(b'<') => {
                let (mailbox, end) = self.name_addr(name, next, "address")?;
                Ok((Address::Mailbox(mailbox), end))
            }
            Some(b':') => {
                if name.is_empty() {
                    return Err(self.error("group", next));
                }
                let (group, end) = self.group_body(name, next + 1)?;
                Ok((Address::Group(group), end))
            }
            _ => Err(self.error("address", next)),
        }
    }

    pub(crate) fn mailbox_list(&mut self, pos: usize) -> Result<(Vec<Mailbox>, usize)> {
        let (first, mut end) = self.mailbox(pos)?;
        let mut mailboxes = vec![first];
        while self.peek(end) == Some(b',') {
            let (mailbox, next) = self.mailbox(end + 1)?;
            mailboxes.push(mailbox);
            end = next;
        }
        Ok((mailboxes, end))
    }

    pub(crate) fn mailbox(&mut self, pos: usize) -> Result<(Mailbox, usize)> {
        let start = self.skip_cfws(pos);
        if let Some((address, end)) = self.addr_spec(start) {
            return Ok((Mailbox::new(address), end));
        }

        let (name, next) = self.phrase(start);
        match self.peek(next) {
            Some(b'<') => self.name_addr(name, next, "mailbox"),
            _ => Err(self.error("mailbox", next)),
        }
    }

    /// The rest of a group after its ':'.
    fn group_body(&mut self, name: String, pos: usize) -> Result<(Group, usize)> {
        let start = self.skip_cfws(pos);
        if self.peek(start) == Some(b';') {
            let group = Group::new(name, MailboxList::default());
            return Ok((group, self.skip_cfws(start + 1)));
        }

        let (mailboxes, end) = self.mailbox_list(start)?;
        if self.peek(end) != Some(b';') {
            return Err(self.error("group", end));
        }
        Ok((Group::new(name, mailboxes), self.skip_cfws(end + 1)))
    }

    /// `"<" addr-spec ">"` at `pos`, with an already decoded display name.
    fn name_addr(
        &self,
        name: String,
        pos: usize,
        construct: &'static str,
    ) -> Result<(Mailbox, usize)> {
        let start = self.skip_cfws(pos + 1);
        let (address, end) = self
            .addr_spec(start)
            .ok_or_else(|| self.error(construct, start))?;
        if self.peek(end) != Some(b'>') {
            return Err(self.error(construct, end));
        }

        let mut mailbox = Mailbox::new(address);
        if !name.is_empty() {
            mailbox.set_name(Some(name));
        }
        Ok((mailbox, self.skip_cfws(end + 1)))
    }

    fn addr_spec(&self, pos: usize) -> Option<(String, usize)> {
        let found = ADDR_SPEC_PREFIX_RE.find(&self.input[pos..])?;
        Some((found.as_str().into(), self.skip_cfws(pos + found.end())))
    }

    fn phrase(&mut self, pos: usize) -> (String, usize) {
        let decoded = self.decoder.decode_phrase_at(self.input, pos);
        self.defects.extend(decoded.defects);
        (decoded.text, self.skip_cfws(decoded.end))
    }

    fn peek(&self, pos: usize) -> Option<u8> {
        self.input.as_bytes().get(pos).copied()
    }

    /// Skip whitespace and (possibly nested) comments.
    ///
    /// Only used between grammar tokens. A phrase ends at `(`, so a comment
    /// in the middle of a display name (`John (x) Smith <a@b>`) leaves the
    /// rest of the name unparsed and is a syntax error.
    fn skip_cfws(&self, mut pos: usize) -> usize {
        let bytes = self.input.as_bytes();
        loop {
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            match skip_comment(bytes, pos) {
                Some(end) => pos = end,
                None => return pos,
            }
        }
    }

    fn error(&self, construct: &'static str, position: usize) -> Error {
        log::debug!(
            "syntax error in {} at {}: {:?}",
            construct,
            position,
            self.input.get(position..).unwrap_or_default()
        );
        Error::Parse {
            construct,
            position,
        }
    }
}

/// Offset past a comment starting at `pos`, if there is a complete one.
fn skip_comment(bytes: &[u8], pos: usize) -> Option<usize> {
    if bytes.get(pos) != Some(&b'(') {
        return None;
    }

    let mut depth = 0;
    let mut pos = pos;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 1,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(pos + 1);
                }
            }
            _ => {}
        }
        pos += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser(input: &str) -> Parser<'_> {
        lazy_static::lazy_static! {
            static ref DECODER: Decoder = Decoder::default();
        }
        Parser::new(input, &DECODER)
    }

    #[test]
    fn test_is_addr_spec() {
        assert!(is_addr_spec("keld@dkuug.dk"));
        assert!(is_addr_spec("first.last+tag@sub-domain.example.org"));
        assert!(is_addr_spec("a@b"));
        assert!(!is_addr_spec("not-an-address"));
        assert!(!is_addr_spec("a@-b.org"));
        assert!(!is_addr_spec("a@b-.org"));
        assert!(!is_addr_spec("a@b..org"));
        assert!(!is_addr_spec(".a@b.org"));
        assert!(!is_addr_spec("a b@c.org"));
        assert!(!is_addr_spec(""));
    }

    #[test]
    fn test_bare_mailbox() {
        let input = "  john@example.com , x";
        let (mailbox, end) = parser(input).mailbox(0).unwrap();
        assert_eq!(mailbox, Mailbox::new("john@example.com"));
        assert_eq!(&input[end..], ", x");
    }

    #[test]
    fn test_named_mailbox() {
        let input = "John Smith <john@example.com>";
        let (mailbox, end) = parser(input).mailbox(0).unwrap();
        assert_eq!(mailbox, Mailbox::with_name("John Smith", "john@example.com"));
        assert_eq!(end, input.len());
    }

    #[test]
    fn test_angle_addr_without_name() {
        let (mailbox, _) = parser("<john@example.com>").mailbox(0).unwrap();
        assert_eq!(mailbox.name(), None);
        assert_eq!(mailbox.address(), "john@example.com");
    }

    #[test]
    fn test_comments_are_skipped() {
        let (mailbox, _) = parser("John (the (real) one) < john@example.com > (work)")
            .mailbox(0)
            .unwrap();
        assert_eq!(mailbox, Mailbox::with_name("John", "john@example.com"));
    }

    #[test]
    fn test_comment_inside_phrase() {
        assert_eq!(
            parser("John (x) Smith <a@b>").mailbox(0),
            Err(Error::Parse {
                construct: "mailbox",
                position: 9
            })
        );
    }

    #[test]
    fn test_missing_closing_angle() {
        let input = "John <john@example.com";
        assert_eq!(
            parser(input).mailbox(0),
            Err(Error::Parse {
                construct: "mailbox",
                position: input.len()
            })
        );
    }

    #[test]
    fn test_mailbox_rejects_group() {
        assert_eq!(
            parser("Friends: a@b;").mailbox(0),
            Err(Error::Parse {
                construct: "mailbox",
                position: 7
            })
        );
    }

    #[test]
    fn test_empty_group() {
        let (address, end) = parser("undisclosed-recipients: ;").address(0).unwrap();
        assert_eq!(
            address,
            Address::Group(Group::new(
                "undisclosed-recipients",
                MailboxList::default()
            ))
        );
        assert_eq!(end, 25);
    }

    #[test]
    fn test_group_needs_name() {
        assert_eq!(
            parser(r#""": a@b;"#).address(0),
            Err(Error::Parse {
                construct: "group",
                position: 2
            })
        );
    }

    #[test]
    fn test_group_needs_semicolon() {
        let input = "G: a@b, c@d";
        assert_eq!(
            parser(input).address(0),
            Err(Error::Parse {
                construct: "group",
                position: input.len()
            })
        );
    }

    #[test]
    fn test_address_list_with_group() {
        let input = "a@b, G: c@d, Eve <e@f>;, Bob <g@h>";
        let mut parser = parser(input);
        let parsed = parser.address_list(0);
        let addresses = parser.finish(parsed.unwrap(), "address-list").unwrap();
        assert_eq!(
            addresses,
            vec![
                Address::Mailbox(Mailbox::new("a@b")),
                Address::Group(Group::new(
                    "G",
                    vec![Mailbox::new("c@d"), Mailbox::with_name("Eve", "e@f")]
                )),
                Address::Mailbox(Mailbox::with_name("Bob", "g@h")),
            ]
        );
    }

    #[test]
    fn test_trailing_input() {
        let input = "a@b <c@d>";
        let parser = parser(input);
        let parsed = (Mailbox::new("a@b"), 4);
        assert_eq!(
            parser.finish(parsed, "mailbox"),
            Err(Error::Parse {
                construct: "mailbox",
                position: 4
            })
        );
    }

    #[test]
    fn test_defects_are_collected() {
        let mut parser = parser("=?bogus?q?x?= <a@b>");
        let (mailbox, _) = parser.mailbox(0).unwrap();
        assert_eq!(mailbox.name(), Some("=?bogus?q?x?="));
        assert_eq!(parser.into_defects().len(), 1);
    }
}
