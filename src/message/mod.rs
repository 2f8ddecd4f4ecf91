//! Provides a strongly typed way to build emails
//!
//! Every message is a `multipart/alternative` with a plain text part and an HTML part.
//! When no plain text is given it is derived from the HTML.
//!
//! ```rust
//! use contact_mailer::message::Message;
//!
//! # use std::error::Error;
//! # fn main() -> Result<(), Box<dyn Error>> {
//! let m = Message::builder()
//!     .from("NoBody", "nobody@domain.tld".parse()?)
//!     .reply_to("yuin@domain.tld".parse()?)
//!     .to("hei@domain.tld".parse()?)
//!     .subject("Happy new year")
//!     .html("<p>Be <b>happy</b>!</p>")
//!     .build()?;
//!
//! assert_eq!(m.plain(), "Be happy!");
//! # Ok(())
//! # }
//! ```
//!
//! Which produces:
//!
//! ```sh
//! From: NoBody <nobody@domain.tld>
//! To: <hei@domain.tld>
//! Reply-To: <yuin@domain.tld>
//! Subject: Happy new year
//! MIME-Version: 1.0
//! X-Mailer: contact-mailer/0.1.0
//! X-Priority: 3
//! Message-ID: <1607790799.5cf8d5a1e4d8c0d37f1bbd86d3c5b2b9@domain.tld>
//! Date: Sat, 12 Dec 2020 16:33:19 -0000
//! Content-Type: multipart/alternative; boundary="0oVZ2r6AoLAhLlb0gPNSKy6BEqdS2IfwxrcbUuo1"
//!
//! --0oVZ2r6AoLAhLlb0gPNSKy6BEqdS2IfwxrcbUuo1
//! Content-Type: text/plain; charset=UTF-8
//! Content-Transfer-Encoding: 8bit
//!
//! Be happy!
//!
//! --0oVZ2r6AoLAhLlb0gPNSKy6BEqdS2IfwxrcbUuo1
//! Content-Type: text/html; charset=UTF-8
//! Content-Transfer-Encoding: 8bit
//!
//! <p>Be <b>happy</b>!</p>
//!
//! --0oVZ2r6AoLAhLlb0gPNSKy6BEqdS2IfwxrcbUuo1--
//! ```

use std::{
    fmt::{self, Display, Formatter, Write},
    time::SystemTime,
};

pub use self::error::Error;
use self::{
    header::{check_value, display_name, encode_word, make_message_id, Date, MAILER},
    mimebody::{format_alternative, make_boundary, SinglePart},
    text::html_to_text,
};
use crate::address::{Address, Envelope};

mod error;
pub mod header;
mod mimebody;
pub mod text;

/// Represents an email address with an optional name for the sender/recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// The name associated with the address.
    pub name: Option<String>,
    /// The email address itself.
    pub email: Address,
}

impl Mailbox {
    /// Creates a new `Mailbox` using an email address and the name of the recipient if there
    /// is one.
    pub fn new(name: Option<String>, email: Address) -> Self {
        Mailbox { name, email }
    }
}

impl Display for Mailbox {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {
                write!(f, "{} <{}>", display_name(name), self.email)
            }
            _ => write!(f, "<{}>", self.email),
        }
    }
}

/// Which header set to render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variant {
    /// Written to an SMTP `DATA` payload, includes `To`
    Smtp,
    /// Piped to the local transport, which supplies `To` itself
    LocalSubmission,
}

/// A builder for messages
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<Mailbox>,
    to: Option<Address>,
    reply_to: Option<Address>,
    subject: Option<String>,
    plain: Option<String>,
    html: Option<String>,
    date: Option<Date>,
    message_id: Option<String>,
}

impl MessageBuilder {
    /// Creates a new default message builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sender, with its display name
    pub fn from<S: Into<String>>(self, name: S, address: Address) -> Self {
        self.from_mailbox(Mailbox::new(Some(name.into()), address))
    }

    /// Set the sender mailbox
    pub fn from_mailbox(mut self, mailbox: Mailbox) -> Self {
        self.from = Some(mailbox);
        self
    }

    /// Set the recipient
    pub fn to(mut self, address: Address) -> Self {
        self.to = Some(address);
        self
    }

    /// Set the address replies should go to
    pub fn reply_to(mut self, address: Address) -> Self {
        self.reply_to = Some(address);
        self
    }

    /// Set the subject
    pub fn subject<S: Into<String>>(mut self, subject: S) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the HTML body
    pub fn html<S: Into<String>>(mut self, html: S) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Set the plain text body
    ///
    /// Derived from the HTML body when not set.
    pub fn plain<S: Into<String>>(mut self, plain: S) -> Self {
        self.plain = Some(plain.into());
        self
    }

    /// Set the `Date` header, the current time by default
    pub fn date(mut self, date: Date) -> Self {
        self.date = Some(date);
        self
    }

    /// Set the `Message-ID` header
    ///
    /// Generated from the date, the recipient, the subject and the sender domain
    /// when not set.
    pub fn message_id<S: Into<String>>(mut self, id: S) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Checks the fields and stamps the message
    pub fn build(self) -> Result<Message, Error> {
        let from = self.from.ok_or(Error::MissingFrom)?;
        let to = self.to.ok_or(Error::MissingTo)?;
        let subject = self.subject.ok_or(Error::MissingSubject)?;
        let html = self.html.ok_or(Error::MissingBody)?;

        check_value("Subject", &subject)?;
        if let Some(name) = &from.name {
            check_value("From", name)?;
        }

        let at = self.date.map_or_else(SystemTime::now, SystemTime::from);
        let message_id = match self.message_id {
            Some(id) => {
                check_value("Message-ID", &id)?;
                id
            }
            None => make_message_id(at, &to, &subject, &from.email),
        };
        let plain = self.plain.unwrap_or_else(|| html_to_text(&html));

        Ok(Message {
            from,
            to,
            reply_to: self.reply_to,
            subject,
            plain,
            html,
            message_id,
            date: Date::new(at),
        })
    }
}

/// Email message which can be formatted
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    from: Mailbox,
    to: Address,
    reply_to: Option<Address>,
    subject: String,
    plain: String,
    html: String,
    message_id: String,
    date: Date,
}

impl Message {
    /// Create a new message builder
    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }

    /// Get the message envelope
    pub fn envelope(&self) -> Envelope {
        Envelope::new(self.from.email.clone(), self.to.clone())
    }

    /// Sender mailbox
    pub fn from(&self) -> &Mailbox {
        &self.from
    }

    /// Recipient address
    pub fn to(&self) -> &Address {
        &self.to
    }

    /// Reply address, if any
    pub fn reply_to(&self) -> Option<&Address> {
        self.reply_to.as_ref()
    }

    /// Subject, unencoded
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Plain text body
    pub fn plain(&self) -> &str {
        &self.plain
    }

    /// HTML body
    pub fn html(&self) -> &str {
        &self.html
    }

    /// `Message-ID` header value
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// `Date` header value
    pub fn date(&self) -> Date {
        self.date
    }

    /// Get message content formatted for an SMTP `DATA` payload
    ///
    /// A new boundary is drawn every time.
    pub fn formatted(&self) -> Vec<u8> {
        self.format(Variant::Smtp, &make_boundary()).into_bytes()
    }

    /// Get message content formatted for local submission, without the `To` header
    pub fn formatted_for_local_submission(&self) -> Vec<u8> {
        self.format(Variant::LocalSubmission, &make_boundary())
            .into_bytes()
    }

    fn format(&self, variant: Variant, boundary: &str) -> String {
        let mut out = String::with_capacity(self.plain.len() + self.html.len() + 1024);

        let _ = write!(out, "From: {}\r\n", self.from);
        if variant == Variant::Smtp {
            let _ = write!(out, "To: <{}>\r\n", self.to);
        }
        if let Some(reply_to) = &self.reply_to {
            let _ = write!(out, "Reply-To: <{reply_to}>\r\n");
        }
        let _ = write!(out, "Subject: {}\r\n", encode_word(&self.subject));
        out.push_str("MIME-Version: 1.0\r\n");
        let _ = write!(out, "X-Mailer: {MAILER}\r\n");
        out.push_str("X-Priority: 3\r\n");
        let _ = write!(out, "Message-ID: {}\r\n", self.message_id);
        let _ = write!(out, "Date: {}\r\n", self.date);
        let _ = write!(
            out,
            "Content-Type: multipart/alternative; boundary=\"{boundary}\"\r\n\r\n"
        );

        format_alternative(
            &mut out,
            boundary,
            &[SinglePart::plain(&self.plain), SinglePart::html(&self.html)],
        );

        out
    }
}

#[cfg(test)]
mod test {
    use std::time::{Duration, SystemTime};

    use pretty_assertions::assert_eq;

    use super::{header::Date, text::html_to_text, Error, Message, MessageBuilder, Variant};

    fn builder() -> MessageBuilder {
        Message::builder()
            .from("myDharm Contact Form", "tech@mydharm.example".parse().unwrap())
            .to("sales@mydharm.example".parse().unwrap())
            .subject("[Contact Form] Web Development - Jane")
            .date(Date::from(
                SystemTime::UNIX_EPOCH + Duration::from_secs(784887151),
            ))
    }

    fn boundary_of(formatted: &str) -> &str {
        let start = formatted.find("boundary=\"").unwrap() + "boundary=\"".len();
        let end = start + formatted[start..].find('"').unwrap();
        &formatted[start..end]
    }

    #[test]
    fn smtp_layout() {
        let message = builder()
            .reply_to("jane@visitor.example".parse().unwrap())
            .message_id("<1.abc@mydharm.example>")
            .html("<p>Hi &amp; bye</p>")
            .build()
            .unwrap();

        assert_eq!(
            message.format(Variant::Smtp, "BOUNDARY"),
            concat!(
                "From: myDharm Contact Form <tech@mydharm.example>\r\n",
                "To: <sales@mydharm.example>\r\n",
                "Reply-To: <jane@visitor.example>\r\n",
                "Subject: [Contact Form] Web Development - Jane\r\n",
                "MIME-Version: 1.0\r\n",
                "X-Mailer: contact-mailer/0.1.0\r\n",
                "X-Priority: 3\r\n",
                "Message-ID: <1.abc@mydharm.example>\r\n",
                "Date: Tue, 15 Nov 1994 08:12:31 -0000\r\n",
                "Content-Type: multipart/alternative; boundary=\"BOUNDARY\"\r\n",
                "\r\n",
                "--BOUNDARY\r\n",
                "Content-Type: text/plain; charset=UTF-8\r\n",
                "Content-Transfer-Encoding: 8bit\r\n",
                "\r\n",
                "Hi & bye\r\n",
                "\r\n",
                "--BOUNDARY\r\n",
                "Content-Type: text/html; charset=UTF-8\r\n",
                "Content-Transfer-Encoding: 8bit\r\n",
                "\r\n",
                "<p>Hi &amp; bye</p>\r\n",
                "\r\n",
                "--BOUNDARY--"
            )
        );
    }

    #[test]
    fn local_submission_omits_to() {
        let message = builder().html("<p>Hi</p>").build().unwrap();
        let formatted =
            String::from_utf8(message.formatted_for_local_submission()).unwrap();

        assert!(!formatted.contains("\r\nTo:"));
        assert!(!formatted.starts_with("To:"));
        assert!(formatted.contains("Subject: [Contact Form] Web Development - Jane\r\n"));
        assert!(!formatted.contains("Reply-To:"));
    }

    #[test]
    fn one_boundary_two_parts() {
        let message = builder()
            .html("<h1>New submission</h1><p>Name: Jane &lt;jane@x&gt;</p>")
            .build()
            .unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();
        let boundary = boundary_of(&formatted);

        assert_eq!(boundary.len(), 40);
        assert_eq!(formatted.matches(&format!("--{boundary}\r\n")).count(), 2);
        assert_eq!(formatted.matches(&format!("--{boundary}--")).count(), 1);
        assert!(formatted.ends_with(&format!("--{boundary}--")));
        // the token shows up in the header and the three delimiters only
        assert_eq!(formatted.matches(boundary).count(), 4);
    }

    #[test]
    fn boundaries_differ_between_renderings() {
        let message = builder().html("<p>Hi</p>").build().unwrap();
        let first = String::from_utf8(message.formatted()).unwrap();
        let second = String::from_utf8(message.formatted()).unwrap();
        assert_ne!(boundary_of(&first), boundary_of(&second));
    }

    #[test]
    fn plain_text_is_derived_from_html() {
        let html = "<p>Name: Jane</p><p>Tom &amp; Jerry&#33;</p>";
        let message = builder().html(html).build().unwrap();

        assert_eq!(message.plain(), html_to_text(html));
        assert_eq!(message.plain(), "Name: JaneTom & Jerry!");
        // deriving twice gives the same part
        let again = builder().html(html).build().unwrap();
        assert_eq!(message.plain(), again.plain());
    }

    #[test]
    fn explicit_plain_text_wins() {
        let message = builder()
            .html("<p>Hi</p>")
            .plain("Hello there")
            .build()
            .unwrap();
        assert_eq!(message.plain(), "Hello there");
    }

    #[test]
    fn generated_message_id_uses_sender_domain() {
        let message = builder().html("<p>Hi</p>").build().unwrap();
        assert!(message.message_id().starts_with("<784887151."));
        assert!(message.message_id().ends_with("@mydharm.example>"));
    }

    #[test]
    fn non_ascii_subject_is_encoded() {
        let message = builder()
            .subject("Привет, мир!")
            .html("<p>Hi</p>")
            .build()
            .unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("Subject: =?utf-8?b?0J/RgNC40LLQtdGCLCDQvNC40YAh?=\r\n"));
    }

    #[test]
    fn missing_fields() {
        assert_eq!(builder().build(), Err(Error::MissingBody));
        assert_eq!(
            Message::builder().html("x").build(),
            Err(Error::MissingFrom)
        );
        assert_eq!(
            Message::builder()
                .from("A", "a@example.com".parse().unwrap())
                .html("x")
                .build(),
            Err(Error::MissingTo)
        );
    }

    #[test]
    fn header_injection_is_a_compose_fault() {
        assert_eq!(
            builder()
                .subject("Hello\r\nBcc: victim@example.com")
                .html("x")
                .build(),
            Err(Error::LineBreakInHeader("Subject"))
        );
        assert_eq!(
            Message::builder()
                .from("Evil\nName", "a@example.com".parse().unwrap())
                .to("b@example.com".parse().unwrap())
                .subject("s")
                .html("x")
                .build(),
            Err(Error::LineBreakInHeader("From"))
        );
    }

    #[test]
    fn envelope_matches_headers() {
        let message = builder().html("<p>Hi</p>").build().unwrap();
        let envelope = message.envelope();
        assert_eq!(envelope.from().to_string(), "tech@mydharm.example");
        assert_eq!(envelope.to().to_string(), "sales@mydharm.example");
    }
}
