//! Mailboxes, groups and addresses as found in `From`, `To` and `Cc` headers.

use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use crate::decoder::Decoder;
use crate::defects::Defect;
use crate::encoder::Encoder;
use crate::error::{Error, Result};
use crate::grammar::{self, Parser};

/// A single mailbox: an `addr-spec` with an optional display name.
///
/// The display name is plain text; it is decoded when parsing and encoded
/// again when formatting.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Mailbox {
    name: Option<String>,
    address: String,
}

impl Mailbox {
    pub fn new(address: impl Into<String>) -> Self {
        Mailbox {
            name: None,
            address: address.into(),
        }
    }

    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Self {
        Mailbox {
            name: Some(name.into()),
            address: address.into(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn set_address(&mut self, address: impl Into<String>) {
        self.address = address.into();
    }

    /// Parse a complete mailbox, decoding its display name.
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with(text, &Decoder::default())
    }

    pub fn parse_with(text: &str, decoder: &Decoder) -> Result<Self> {
        let mut parser = Parser::new(text, decoder);
        let parsed = parser.mailbox(0)?;
        parser.finish(parsed, "mailbox")
    }

    /// Format as header text, encoding the display name if needed.
    ///
    /// Fails with [`Error::InvalidAddress`] unless the address is a valid
    /// `addr-spec`.
    pub fn format(&self) -> Result<String> {
        self.format_with(&Encoder::default())
    }

    pub fn format_with(&self, encoder: &Encoder) -> Result<String> {
        if !grammar::is_addr_spec(&self.address) {
            return Err(Error::InvalidAddress {
                address: self.address.clone(),
            });
        }

        let phrase = self
            .name
            .as_deref()
            .map(|name| encoder.encode_phrase(name))
            .unwrap_or_default();
        if phrase.is_empty() {
            Ok(self.address.clone())
        } else {
            Ok(format!("{} <{}>", phrase, self.address))
        }
    }
}

impl FromStr for Mailbox {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Mailbox::parse(s)
    }
}

/// An ordered list of mailboxes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MailboxList(Vec<Mailbox>);

impl Deref for MailboxList {
    type Target = Vec<Mailbox>;

    fn deref(&self) -> &Vec<Mailbox> {
        &self.0
    }
}

impl DerefMut for MailboxList {
    fn deref_mut(&mut self) -> &mut Vec<Mailbox> {
        &mut self.0
    }
}

impl From<Vec<Mailbox>> for MailboxList {
    fn from(mailboxes: Vec<Mailbox>) -> Self {
        MailboxList(mailboxes)
    }
}

impl From<MailboxList> for Vec<Mailbox> {
    fn from(list: MailboxList) -> Self {
        list.0
    }
}

impl std::iter::FromIterator<Mailbox> for MailboxList {
    fn from_iter<I: IntoIterator<Item = Mailbox>>(iter: I) -> Self {
        MailboxList(iter.into_iter().collect())
    }
}

impl MailboxList {
    /// Parse a complete, non-empty `mailbox ("," mailbox)*`.
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with(text, &Decoder::default())
    }

    pub fn parse_with(text: &str, decoder: &Decoder) -> Result<Self> {
        let mut parser = Parser::new(text, decoder);
        let parsed = parser.mailbox_list(0)?;
        parser.finish(parsed, "mailbox-list").map(MailboxList)
    }

    pub fn format(&self) -> Result<String> {
        self.format_with(&Encoder::default())
    }

    /// Format every mailbox and join them with `", "`.
    pub fn format_with(&self, encoder: &Encoder) -> Result<String> {
        let formatted = self
            .0
            .iter()
            .map(|mailbox| mailbox.format_with(encoder))
            .collect::<Result<Vec<_>>>()?;
        Ok(formatted.join(", "))
    }
}

impl FromStr for MailboxList {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        MailboxList::parse(s)
    }
}

/// A named group of mailboxes, e.g. `Friends: a@example.org, b@example.org;`.
///
/// The list may be empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Group {
    name: String,
    mailboxes: MailboxList,
}

impl Group {
    pub fn new(name: impl Into<String>, mailboxes: impl Into<MailboxList>) -> Self {
        Group {
            name: name.into(),
            mailboxes: mailboxes.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn mailboxes(&self) -> &MailboxList {
        &self.mailboxes
    }

    pub fn mailboxes_mut(&mut self) -> &mut MailboxList {
        &mut self.mailboxes
    }

    pub fn format(&self) -> Result<String> {
        self.format_with(&Encoder::default())
    }

    pub fn format_with(&self, encoder: &Encoder) -> Result<String> {
        let name = encoder.encode_phrase(&self.name);
        if name.is_empty() {
            return Err(Error::EmptyGroupName);
        }

        if self.mailboxes.is_empty() {
            Ok(format!("{}:;", name))
        } else {
            Ok(format!("{}: {};", name, self.mailboxes.format_with(encoder)?))
        }
    }
}

/// One element of an address list: a mailbox or a group.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Address {
    Mailbox(Mailbox),
    Group(Group),
}

impl From<Mailbox> for Address {
    fn from(mailbox: Mailbox) -> Self {
        Address::Mailbox(mailbox)
    }
}

impl From<Group> for Address {
    fn from(group: Group) -> Self {
        Address::Group(group)
    }
}

impl Address {
    /// Parse a complete address.
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with(text, &Decoder::default())
    }

    pub fn parse_with(text: &str, decoder: &Decoder) -> Result<Self> {
        Self::parse_with_defects(text, decoder).map(|(address, _)| address)
    }

    /// Parse a complete address and report what had to be passed through
    /// undecoded.
    pub fn parse_with_defects(text: &str, decoder: &Decoder) -> Result<(Self, Vec<Defect>)> {
        let mut parser = Parser::new(text, decoder);
        let parsed = parser.address(0)?;
        let address = parser.finish(parsed, "address")?;
        Ok((address, parser.into_defects()))
    }

    /// Parse a complete `address ("," address)*`, as found in a `To` header.
    pub fn parse_list(text: &str) -> Result<Vec<Self>> {
        Self::parse_list_with(text, &Decoder::default())
    }

    pub fn parse_list_with(text: &str, decoder: &Decoder) -> Result<Vec<Self>> {
        let mut parser = Parser::new(text, decoder);
        let parsed = parser.address_list(0)?;
        parser.finish(parsed, "address-list")
    }

    pub fn format(&self) -> Result<String> {
        self.format_with(&Encoder::default())
    }

    pub fn format_with(&self, encoder: &Encoder) -> Result<String> {
        match self {
            Address::Mailbox(mailbox) => mailbox.format_with(encoder),
            Address::Group(group) => group.format_with(encoder),
        }
    }

    /// Format several addresses as one address list.
    pub fn format_list(addresses: &[Address], encoder: &Encoder) -> Result<String> {
        let formatted = addresses
            .iter()
            .map(|address| address.format_with(encoder))
            .collect::<Result<Vec<_>>>()?;
        Ok(formatted.join(", "))
    }

    /// The display name of a mailbox or the name of a group.
    pub fn name(&self) -> Option<&str> {
        match self {
            Address::Mailbox(mailbox) => mailbox.name(),
            Address::Group(group) => Some(group.name()),
        }
    }

    /// The mailboxes this address stands for.
    pub fn mailboxes(&self) -> &[Mailbox] {
        match self {
            Address::Mailbox(mailbox) => std::slice::from_ref(mailbox),
            Address::Group(group) => group.mailboxes().as_slice(),
        }
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Address::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoded_words::Method;

    #[test]
    fn test_parse_group_with_encoded_names() {
        let address = Address::parse(
            r#""Group 1 (Test)": =?ISO-8859-1?Q?Keld_J=F8rn_Simonsen?= <keld@dkuug.dk>, =?ISO-8859-1?Q?Andr=E9?= Pirard <PIRARD@vm1.ulg.ac.be>;"#,
        )
        .unwrap();
        assert_eq!(
            address,
            Address::Group(Group::new(
                "Group 1 (Test)",
                vec![
                    Mailbox::with_name("Keld Jørn Simonsen", "keld@dkuug.dk"),
                    Mailbox::with_name("André Pirard", "PIRARD@vm1.ulg.ac.be"),
                ]
            ))
        );
        assert_eq!(address.name(), Some("Group 1 (Test)"));
        assert_eq!(address.mailboxes().len(), 2);
    }

    #[test]
    fn test_parse_missing_closing_angle() {
        assert_eq!(
            Address::parse("John <john@example.com"),
            Err(Error::Parse {
                construct: "address",
                position: 22
            })
        );
    }

    #[test]
    fn test_parse_trailing_garbage() {
        assert_eq!(
            Mailbox::parse("john@example.com junk"),
            Err(Error::Parse {
                construct: "mailbox",
                position: 17
            })
        );
    }

    #[test]
    fn test_parse_with_defects() {
        let (address, defects) =
            Address::parse_with_defects("=?x?q?a?= <a@b.c>", &Decoder::default()).unwrap();
        assert_eq!(address.name(), Some("=?x?q?a?="));
        assert_eq!(defects.len(), 1);
    }

    #[test]
    fn test_from_str() {
        let mailbox: Mailbox = "Bob <bob@example.com>".parse().unwrap();
        assert_eq!(mailbox.name(), Some("Bob"));
        let list: MailboxList = "a@b.c, Bob <bob@example.com>".parse().unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_format_invalid_address() {
        assert_eq!(
            Mailbox::new("not-an-address").format(),
            Err(Error::InvalidAddress {
                address: "not-an-address".into()
            })
        );
        assert_eq!(
            Mailbox::default().format(),
            Err(Error::InvalidAddress { address: "".into() })
        );
    }

    #[test]
    fn test_format_mailbox() {
        assert_eq!(
            Mailbox::new("john@example.com").format().unwrap(),
            "john@example.com"
        );
        assert_eq!(
            Mailbox::with_name("John Q. Public", "john@example.com")
                .format()
                .unwrap(),
            r#""John Q. Public" <john@example.com>"#
        );
        assert_eq!(
            Mailbox::with_name("  ", "john@example.com").format().unwrap(),
            "john@example.com"
        );
    }

    #[test]
    fn test_format_encodes_name() {
        let encoder = Encoder::new("ISO-8859-1", Method::Q).unwrap();
        assert_eq!(
            Mailbox::with_name("Keld Jørn Simonsen", "keld@dkuug.dk")
                .format_with(&encoder)
                .unwrap(),
            "Keld =?ISO-8859-1?Q?J=f8rn?= Simonsen <keld@dkuug.dk>"
        );
    }

    #[test]
    fn test_setters() {
        let mut mailbox = Mailbox::new("x");
        mailbox.set_address("a@b.c");
        mailbox.set_name(Some("Ann".into()));
        assert_eq!(mailbox.format().unwrap(), "Ann <a@b.c>");
        mailbox.set_name(None);
        assert_eq!(mailbox.format().unwrap(), "a@b.c");
    }

    #[test]
    fn test_format_group() {
        let mut group = Group::new("Friends", MailboxList::default());
        assert_eq!(group.format().unwrap(), "Friends:;");
        group.mailboxes_mut().push(Mailbox::new("a@b.c"));
        group.mailboxes_mut().push(Mailbox::with_name("Bö", "d@e.f"));
        assert_eq!(
            group.format().unwrap(),
            "Friends: a@b.c, =?utf-8?Q?B=c3=b6?= <d@e.f>;"
        );

        group.set_name("");
        assert_eq!(group.format(), Err(Error::EmptyGroupName));
    }

    #[test]
    fn test_group_format_fails_on_bad_member() {
        let group = Group::new("G", vec![Mailbox::new("nope")]);
        assert_eq!(
            Address::from(group).format(),
            Err(Error::InvalidAddress {
                address: "nope".into()
            })
        );
    }

    #[test]
    fn test_round_trip() {
        let original = Address::Group(Group::new(
            "Team: Zürich",
            vec![
                Mailbox::with_name("Jörg \"JJ\" Müller", "jm@example.ch"),
                Mailbox::new("ops@example.ch"),
            ],
        ));
        let formatted = original.format().unwrap();
        assert_eq!(Address::parse(&formatted).unwrap(), original);
    }

    #[test]
    fn test_address_list() {
        let addresses =
            Address::parse_list("Ann <a@b.c>, undisclosed-recipients:;, d@e.f").unwrap();
        assert_eq!(addresses.len(), 3);
        assert_eq!(
            Address::format_list(&addresses, &Encoder::default()).unwrap(),
            "Ann <a@b.c>, undisclosed-recipients:;, d@e.f"
        );
    }
}
